//! # Image Loading and Decoding
//!
//! Loads images from file paths, data URIs, or raw base64 strings and prepares
//! them for PDF embedding. JPEG images pass through without re-encoding
//! (PDF readers decode DCTDecode natively). PNG images are decoded to RGB
//! pixels with a separate alpha channel for SMask transparency.
//!
//! All loading happens before layout. The layout engine only ever sees an
//! [`ImageRef`], which carries the pixel size needed for aspect ratios; the
//! PDF back-end fetches the bytes from the [`ImageStore`] by URI.

use std::collections::HashMap;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::ImageFormat;

use crate::warning::{WarningKind, Warnings};

/// A fully decoded/loaded image ready for PDF embedding.
#[derive(Debug, Clone)]
pub struct LoadedImage {
    pub pixel_data: ImagePixelData,
    pub width_px: u32,
    pub height_px: u32,
}

/// The pixel data in a format the PDF serializer can consume directly.
#[derive(Debug, Clone)]
pub enum ImagePixelData {
    /// Raw JPEG bytes, embedded directly with DCTDecode.
    Jpeg {
        data: Vec<u8>,
        color_space: JpegColorSpace,
    },
    /// Decoded RGB pixels + optional alpha channel.
    Decoded {
        /// width * height * 3 bytes (RGB)
        rgb: Vec<u8>,
        /// width * height bytes (grayscale alpha). None if fully opaque.
        alpha: Option<Vec<u8>>,
    },
}

/// JPEG color space for the PDF /ColorSpace entry.
#[derive(Debug, Clone, Copy)]
pub enum JpegColorSpace {
    DeviceRGB,
    DeviceGray,
}

/// Interactive form fields that stand in for an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormWidget {
    CheckedBox,
    UncheckedBox,
    TextField,
}

impl FormWidget {
    /// Recognize the reserved image names.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "<checked-box>" => Some(Self::CheckedBox),
            "<unchecked-box>" => Some(Self::UncheckedBox),
            "<text-field>" => Some(Self::TextField),
            _ => None,
        }
    }
}

/// What the layout engine knows about an image.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageRef {
    Bitmap {
        uri: String,
        width_px: u32,
        height_px: u32,
    },
    Widget(FormWidget),
    /// The image could not be loaded; drawn as a grey placeholder.
    Missing { uri: String },
}

impl ImageRef {
    /// Height divided by width at the image's native size.
    pub fn aspect(&self) -> f64 {
        match self {
            ImageRef::Bitmap {
                width_px,
                height_px,
                ..
            } if *width_px > 0 => *height_px as f64 / *width_px as f64,
            ImageRef::Widget(FormWidget::TextField) => 0.25,
            _ => 1.0,
        }
    }

    pub fn uri(&self) -> Option<&str> {
        match self {
            ImageRef::Bitmap { uri, .. } | ImageRef::Missing { uri } => Some(uri),
            ImageRef::Widget(_) => None,
        }
    }
}

/// Loaded images keyed by the URI the document used.
#[derive(Debug, Default)]
pub struct ImageStore {
    base_dir: Option<PathBuf>,
    images: HashMap<String, Arc<LoadedImage>>,
}

impl ImageStore {
    /// `base_dir` is where relative file paths are resolved from, normally
    /// the directory of the input document.
    pub fn new(base_dir: Option<&Path>) -> Self {
        Self {
            base_dir: base_dir.map(Path::to_path_buf),
            images: HashMap::new(),
        }
    }

    /// Load `uri` once. Failures become a warning and a [`ImageRef::Missing`].
    pub fn load(&mut self, uri: &str, warnings: &mut Warnings) -> ImageRef {
        match self.try_load(uri) {
            Ok(r) => r,
            Err(e) => {
                warnings.push(
                    WarningKind::MissingImage,
                    format!("image '{}' could not be loaded: {e}", short_uri(uri)),
                );
                ImageRef::Missing {
                    uri: uri.to_string(),
                }
            }
        }
    }

    /// Load `uri` once, reporting failure to the caller.
    pub fn try_load(&mut self, uri: &str) -> Result<ImageRef, String> {
        if let Some(widget) = FormWidget::from_name(uri) {
            return Ok(ImageRef::Widget(widget));
        }
        if let Some(img) = self.images.get(uri) {
            return Ok(ImageRef::Bitmap {
                uri: uri.to_string(),
                width_px: img.width_px,
                height_px: img.height_px,
            });
        }
        let img = load_image(uri, self.base_dir.as_deref())?;
        tracing::debug!(uri = short_uri(uri), w = img.width_px, h = img.height_px, "loaded image");
        let r = ImageRef::Bitmap {
            uri: uri.to_string(),
            width_px: img.width_px,
            height_px: img.height_px,
        };
        self.images.insert(uri.to_string(), Arc::new(img));
        Ok(r)
    }

    pub fn get(&self, uri: &str) -> Option<Arc<LoadedImage>> {
        self.images.get(uri).cloned()
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

/// Data URIs can be huge; keep log lines readable.
fn short_uri(uri: &str) -> &str {
    match uri.char_indices().nth(48) {
        Some((i, _)) => &uri[..i],
        None => uri,
    }
}

/// Load an image from a source string.
///
/// Supported `src` formats:
/// - `data:image/...;base64,...` data URI
/// - File path, absolute or relative to `base_dir`
/// - Raw base64-encoded image data
pub fn load_image(src: &str, base_dir: Option<&Path>) -> Result<LoadedImage, String> {
    let raw_bytes = read_source_bytes(src, base_dir)?;
    decode_image_bytes(&raw_bytes)
}

/// Resolve the source string to raw bytes.
pub fn read_source_bytes(src: &str, base_dir: Option<&Path>) -> Result<Vec<u8>, String> {
    if src.starts_with("data:") {
        let comma_pos = src
            .find(',')
            .ok_or_else(|| "Invalid data URI: missing comma".to_string())?;
        return base64_decode(&src[comma_pos + 1..]);
    }

    // Only explicit paths or names that exist on disk are files; anything
    // else is tried as base64, which may itself contain '/'.
    let explicit = src.starts_with('/') || src.starts_with("./") || src.starts_with("../");
    let path = match base_dir {
        Some(dir) if !Path::new(src).is_absolute() => dir.join(src),
        _ => PathBuf::from(src),
    };
    if explicit || path.is_file() {
        return std::fs::read(&path)
            .map_err(|e| format!("Failed to read file '{}': {}", path.display(), e));
    }

    base64_decode(src)
}

fn base64_decode(input: &str) -> Result<Vec<u8>, String> {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD
        .decode(input.trim())
        .map_err(|e| format!("Base64 decode error: {}", e))
}

/// JPEG passes through as-is; anything else the `image` crate can read is
/// decoded to RGB with a separate alpha plane.
fn decode_image_bytes(data: &[u8]) -> Result<LoadedImage, String> {
    let format = image::guess_format(data).map_err(|e| format!("unrecognized image data: {e}"))?;
    match format {
        ImageFormat::Jpeg => {
            let (width_px, height_px) =
                image::io::Reader::with_format(Cursor::new(data), ImageFormat::Jpeg)
                    .into_dimensions()
                    .map_err(|e| format!("bad JPEG header: {e}"))?;
            Ok(LoadedImage {
                pixel_data: ImagePixelData::Jpeg {
                    data: data.to_vec(),
                    color_space: jpeg_color_space(data),
                },
                width_px,
                height_px,
            })
        }
        other => {
            let rgba = image::load_from_memory_with_format(data, other)
                .map_err(|e| format!("could not decode {other:?} image: {e}"))?
                .into_rgba8();
            let (width_px, height_px) = rgba.dimensions();
            let (rgb, alpha): (Vec<[u8; 3]>, Vec<u8>) = rgba
                .pixels()
                .map(|p| ([p[0], p[1], p[2]], p[3]))
                .unzip();
            let opaque = alpha.iter().all(|a| *a == u8::MAX);
            Ok(LoadedImage {
                pixel_data: ImagePixelData::Decoded {
                    rgb: rgb.concat(),
                    alpha: (!opaque).then_some(alpha),
                },
                width_px,
                height_px,
            })
        }
    }
}

/// Grey when the frame header declares a single component.
fn jpeg_color_space(data: &[u8]) -> JpegColorSpace {
    let mut at = 2;
    while at + 9 < data.len() && data[at] == 0xFF {
        let marker = data[at + 1];
        if matches!(marker, 0xC0..=0xC3 | 0xC5..=0xC7 | 0xC9..=0xCB | 0xCD..=0xCF) {
            return match data[at + 9] {
                1 => JpegColorSpace::DeviceGray,
                _ => JpegColorSpace::DeviceRGB,
            };
        }
        at += 2 + u16::from_be_bytes([data[at + 2], data[at + 3]]) as usize;
    }
    JpegColorSpace::DeviceRGB
}
