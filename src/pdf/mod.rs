//! # PDF Canvas
//!
//! A [`Canvas`] that writes a PDF file. Drawing calls append operators to the
//! current page's content stream; [`Canvas::finish`] writes every object the
//! pages refer to and serializes the file.
//!
//! This is a from-scratch PDF 1.7 writer. We write the raw bytes ourselves
//! because it keeps the engine self-contained, and the subset a sheet needs
//! is small.
//!
//! ## PDF Structure (simplified)
//!
//! ```text
//! %PDF-1.7            <- header
//! 1 0 obj ... endobj  <- objects (fonts, pages, content streams, etc.)
//! 2 0 obj ... endobj
//! ...
//! xref                <- cross-reference table (byte offsets of each object)
//! trailer             <- points to the root object
//! %%EOF
//! ```
//!
//! Layout works top-down; PDF user space grows up from the bottom-left, so
//! every y is flipped against the page height as it is written. Translations
//! are tracked here rather than emitted as `cm`, which keeps form widget
//! rectangles (which live outside content streams) in page coordinates.
//!
//! ## Fonts
//!
//! Standard fonts are Type1 references with WinAnsiEncoding; ZapfDingbats
//! keeps its built-in encoding. Registered TrueType fonts are embedded whole
//! as CIDFontType2 with Identity-H, five objects per font: FontFile2,
//! FontDescriptor, CIDFont, ToUnicode CMap and the Type0 root.

use std::collections::{BTreeSet, HashMap};
use std::fmt::Write as FmtWrite; // for write! on String
use std::io::Write as IoWrite; // for write! on Vec<u8>

use miniz_oxide::deflate::compress_to_vec_zlib;

use crate::draw::{Canvas, Flowable};
use crate::error::FolioError;
use crate::font::metrics::{dingbat_code, winansi_code};
use crate::font::{CustomFontMetrics, FontContext, FontData, FontKey};
use crate::geom::{Extent, Point, Rect};
use crate::image_loader::{FormWidget, ImagePixelData, ImageRef, ImageStore, JpegColorSpace, LoadedImage};
use crate::layout::path::{Path, PathOp};
use crate::layout::placed::DrawMethod;
use crate::layout::table::Table;
use crate::style::{Color, ResolvedStyle};
use crate::text::Paragraph;

/// Fill for images that could not be loaded.
const PLACEHOLDER_GREY: f64 = 0.9;
const DIVIDER_WIDTH: f64 = 0.5;

struct PdfObject {
    data: Vec<u8>,
}

#[derive(Default)]
struct PageContent {
    stream: String,
    widgets: Vec<Widget>,
}

/// A form field, with its rectangle already in PDF coordinates.
struct Widget {
    kind: FormWidget,
    rect: [f64; 4],
}

/// Writes drawing calls into a PDF document.
pub struct PdfCanvas<'a> {
    fonts: &'a FontContext,
    images: &'a ImageStore,
    page_size: Extent,
    pages: Vec<PageContent>,
    current: PageContent,
    offset: Point,
    saved: Vec<Point>,
    /// Fonts in resource order (`/F0`, `/F1`, ...) with the characters drawn in each.
    font_keys: Vec<(FontKey, BTreeSet<char>)>,
    /// Image URIs in resource order (`/Im0`, ...).
    image_uris: Vec<String>,
    /// Opacities in thousandths, in resource order (`/GS0`, ...).
    opacities: Vec<u32>,
    output: Option<Vec<u8>>,
}

impl<'a> PdfCanvas<'a> {
    pub fn new(fonts: &'a FontContext, images: &'a ImageStore, page_size: Extent) -> Self {
        Self {
            fonts,
            images,
            page_size,
            pages: Vec::new(),
            current: PageContent::default(),
            offset: Point::default(),
            saved: Vec::new(),
            font_keys: Vec::new(),
            image_uris: Vec::new(),
            opacities: Vec::new(),
            output: None,
        }
    }

    /// The finished file. Fails if [`Canvas::finish`] was not called.
    pub fn into_bytes(self) -> Result<Vec<u8>, FolioError> {
        self.output
            .ok_or_else(|| FolioError::RenderError("PDF canvas was never finished".to_string()))
    }

    fn x(&self, x: f64) -> f64 {
        x + self.offset.x
    }

    fn y(&self, y: f64) -> f64 {
        self.page_size.height - (y + self.offset.y)
    }

    fn font_resource(&mut self, key: &FontKey) -> usize {
        let key = self.fonts.registry().resolved_key(key);
        match self.font_keys.iter().position(|(k, _)| *k == key) {
            Some(i) => i,
            None => {
                self.font_keys.push((key, BTreeSet::new()));
                self.font_keys.len() - 1
            }
        }
    }

    fn opacity_resource(&mut self, opacity: f64) -> usize {
        let milli = (opacity.clamp(0.0, 1.0) * 1000.0).round() as u32;
        match self.opacities.iter().position(|o| *o == milli) {
            Some(i) => i,
            None => {
                self.opacities.push(milli);
                self.opacities.len() - 1
            }
        }
    }

    fn image_resource(&mut self, uri: &str) -> usize {
        match self.image_uris.iter().position(|u| u == uri) {
            Some(i) => i,
            None => {
                self.image_uris.push(uri.to_string());
                self.image_uris.len() - 1
            }
        }
    }

    fn set_opacity(&mut self, opacity: f64) {
        if opacity < 1.0 {
            let gs = self.opacity_resource(opacity);
            let _ = writeln!(self.current.stream, "/GS{gs} gs");
        }
    }

    /// Append `path` placed at `(x, y)` as path construction operators.
    fn write_path(&mut self, path: &Path, x: f64, y: f64) {
        let mut out = String::new();
        let p = |pt: &Point| (self.x(x + pt.x), self.y(y + pt.y));
        for op in path.ops() {
            let _ = match op {
                PathOp::MoveTo(a) => {
                    let (ax, ay) = p(a);
                    writeln!(out, "{ax:.2} {ay:.2} m")
                }
                PathOp::LineTo(a) => {
                    let (ax, ay) = p(a);
                    writeln!(out, "{ax:.2} {ay:.2} l")
                }
                PathOp::CurveTo(c1, c2, to) => {
                    let ((ax, ay), (bx, by), (cx, cy)) = (p(c1), p(c2), p(to));
                    writeln!(out, "{ax:.2} {ay:.2} {bx:.2} {by:.2} {cx:.2} {cy:.2} c")
                }
                PathOp::Close => writeln!(out, "h"),
            };
        }
        self.current.stream.push_str(&out);
    }

    /// Set colors and line width for `method`. Returns the painting operator,
    /// or `None` when the style paints nothing for it.
    fn begin_paint(&mut self, style: &ResolvedStyle, method: DrawMethod) -> Option<&'static str> {
        let fill = match method {
            DrawMethod::Fill | DrawMethod::Both => style.background.filter(|c| c.a > 0.0),
            DrawMethod::Stroke => None,
        };
        let stroke = match method {
            DrawMethod::Stroke | DrawMethod::Both if style.border_width > 0.0 => {
                Some(style.border_color.unwrap_or(Color::BLACK))
            }
            _ => None,
        };
        let op = match (fill, stroke) {
            (Some(_), Some(_)) => "B",
            (Some(_), None) => "f",
            (None, Some(_)) => "S",
            (None, None) => return None,
        };
        self.current.stream.push_str("q\n");
        self.set_opacity(style.opacity);
        if let Some(c) = fill {
            let _ = writeln!(self.current.stream, "{:.3} {:.3} {:.3} rg", c.r, c.g, c.b);
        }
        if let Some(c) = stroke {
            let _ = writeln!(
                self.current.stream,
                "{:.3} {:.3} {:.3} RG\n{:.2} w",
                c.r, c.g, c.b, style.border_width
            );
        }
        Some(op)
    }

    fn fill_plain_rect(&mut self, rect: Rect, grey: f64) {
        let (x, y) = (self.x(rect.left), self.y(rect.bottom));
        let _ = write!(
            self.current.stream,
            "q\n{grey:.3} g\n{x:.2} {y:.2} {:.2} {:.2} re\nf\nQ\n",
            rect.width(),
            rect.height()
        );
    }

    fn write_paragraph(&mut self, p: &Paragraph, left: f64, top: f64) {
        if p.lines.is_empty() {
            return;
        }
        self.current.stream.push_str("BT\n");
        for line in &p.lines {
            let baseline = self.y(top + line.baseline);
            for frag in &line.fragments {
                if frag.text.trim().is_empty() {
                    continue;
                }
                let Some(seg) = p.segments.get(frag.segment) else {
                    continue;
                };
                let font = self.font_resource(&seg.font);
                let encoded = self.encode_text(font, &frag.text);
                let style = &seg.style;
                self.set_opacity(style.opacity);
                let c = style.color;
                let x = self.x(left + frag.x);
                let _ = write!(
                    self.current.stream,
                    "/F{font} {:.2} Tf\n{:.3} {:.3} {:.3} rg\n1 0 0 1 {x:.2} {baseline:.2} Tm\n{encoded} Tj\n",
                    style.font_size, c.r, c.g, c.b
                );
            }
        }
        self.current.stream.push_str("ET\n");
    }

    /// Encode `text` as a PDF string operand for font resource `font`.
    fn encode_text(&mut self, font: usize, text: &str) -> String {
        let (key, used) = &mut self.font_keys[font];
        used.extend(text.chars());
        match self.fonts.resolve(key) {
            FontData::Custom { metrics, .. } => {
                let mut hex = String::from("<");
                for ch in text.chars() {
                    let gid = metrics.glyph_ids.get(&ch).copied().unwrap_or(0);
                    let _ = write!(hex, "{gid:04X}");
                }
                hex.push('>');
                hex
            }
            FontData::Standard(f) => {
                let code: fn(char) -> Option<u8> = if f.is_symbolic() {
                    dingbat_code
                } else {
                    winansi_code
                };
                let bytes: Vec<u8> = text
                    .chars()
                    .filter_map(|ch| code(ch).or((!f.is_symbolic()).then_some(b'?')))
                    .collect();
                format!("({})", escape_pdf_bytes(&bytes))
            }
        }
    }

    fn write_table(&mut self, t: &Table, left: f64, top: f64) {
        for row in &t.rows {
            for cell in &row.cells {
                if let Some(style) = &cell.divider_before {
                    let x = self.x(left + cell.left - t.padding / 2.0);
                    let (y0, y1) = (self.y(top + row.top), self.y(top + row.top + row.height));
                    let c = style.border_color.unwrap_or(style.color);
                    let _ = write!(
                        self.current.stream,
                        "q\n{:.3} {:.3} {:.3} RG\n{DIVIDER_WIDTH:.2} w\n{x:.2} {y0:.2} m\n{x:.2} {y1:.2} l\nS\nQ\n",
                        c.r, c.g, c.b
                    );
                }
                if let Some(p) = &cell.paragraph {
                    self.write_paragraph(p, left + cell.left, top + row.top);
                }
            }
        }
    }

    fn write_widget(&mut self, kind: FormWidget, rect: Rect) {
        let (x0, y0) = (self.x(rect.left), self.y(rect.bottom));
        let (x1, y1) = (self.x(rect.right), self.y(rect.top));
        let _ = write!(
            self.current.stream,
            "q\n0.6 G\n0.5 w\n{x0:.2} {y0:.2} {:.2} {:.2} re\nS\nQ\n",
            x1 - x0,
            y1 - y0
        );
        self.current.widgets.push(Widget {
            kind,
            rect: [x0, y0, x1, y1],
        });
    }

    fn build(&self) -> Result<Vec<u8>, FolioError> {
        let mut objects: Vec<PdfObject> = Vec::new();
        // 0 = placeholder (PDF objects are 1-indexed), 1 = Catalog, 2 = Pages
        for _ in 0..3 {
            objects.push(PdfObject { data: Vec::new() });
        }

        let mut font_ids = Vec::with_capacity(self.font_keys.len());
        for (key, used) in &self.font_keys {
            let id = match self.fonts.resolve(key) {
                FontData::Standard(f) => {
                    let encoding = if f.is_symbolic() {
                        ""
                    } else {
                        " /Encoding /WinAnsiEncoding"
                    };
                    push(
                        &mut objects,
                        format!(
                            "<< /Type /Font /Subtype /Type1 /BaseFont /{}{} >>",
                            f.pdf_name(),
                            encoding
                        ),
                    )
                }
                FontData::Custom { data, metrics } => {
                    write_custom_font_objects(&mut objects, key, data, metrics, used)?
                }
            };
            font_ids.push(id);
        }

        let mut image_ids = Vec::with_capacity(self.image_uris.len());
        for uri in &self.image_uris {
            let img = self.images.get(uri).ok_or_else(|| {
                FolioError::RenderError(format!("image '{uri}' was drawn but never loaded"))
            })?;
            image_ids.push(write_image_xobject(&mut objects, &img));
        }

        let gs_ids: Vec<usize> = self
            .opacities
            .iter()
            .map(|milli| {
                let a = *milli as f64 / 1000.0;
                push(
                    &mut objects,
                    format!("<< /Type /ExtGState /ca {a:.3} /CA {a:.3} >>"),
                )
            })
            .collect();

        let has_widgets = self.pages.iter().any(|p| !p.widgets.is_empty());
        let form_fonts = has_widgets.then(|| {
            (
                push(
                    &mut objects,
                    "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>",
                ),
                push(
                    &mut objects,
                    "<< /Type /Font /Subtype /Type1 /BaseFont /ZapfDingbats >>",
                ),
            )
        });

        let mut resources = String::from("<< /ProcSet [/PDF /Text /ImageB /ImageC]");
        if !font_ids.is_empty() {
            resources.push_str(" /Font <<");
            for (i, id) in font_ids.iter().enumerate() {
                let _ = write!(resources, " /F{i} {id} 0 R");
            }
            resources.push_str(" >>");
        }
        if !image_ids.is_empty() {
            resources.push_str(" /XObject <<");
            for (i, id) in image_ids.iter().enumerate() {
                let _ = write!(resources, " /Im{i} {id} 0 R");
            }
            resources.push_str(" >>");
        }
        if !gs_ids.is_empty() {
            resources.push_str(" /ExtGState <<");
            for (i, id) in gs_ids.iter().enumerate() {
                let _ = write!(resources, " /GS{i} {id} 0 R");
            }
            resources.push_str(" >>");
        }
        resources.push_str(" >>");
        let resources_id = push(&mut objects, resources);

        let mut page_ids = Vec::with_capacity(self.pages.len());
        let mut field_ids = Vec::new();
        for page in &self.pages {
            let compressed = compress_to_vec_zlib(page.stream.as_bytes(), 6);
            let content_id = push_stream(
                &mut objects,
                &format!("<< /Length {} /Filter /FlateDecode >>", compressed.len()),
                &compressed,
            );

            let mut annots = Vec::with_capacity(page.widgets.len());
            if let Some((_, zadb)) = form_fonts {
                for w in &page.widgets {
                    let id = write_widget_objects(&mut objects, w, field_ids.len(), zadb);
                    annots.push(id);
                    field_ids.push(id);
                }
            }
            let annots = if annots.is_empty() {
                String::new()
            } else {
                format!(" /Annots [{}]", refs(&annots))
            };

            let page_id = push(
                &mut objects,
                format!(
                    "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {:.2} {:.2}] \
                     /Contents {content_id} 0 R /Resources {resources_id} 0 R{annots} >>",
                    self.page_size.width, self.page_size.height
                ),
            );
            page_ids.push(page_id);
        }

        let acro_form = match form_fonts {
            Some((helv, zadb)) => format!(
                " /AcroForm << /Fields [{}] /NeedAppearances true /DA (/Helv 0 Tf 0 g) \
                 /DR << /Font << /Helv {helv} 0 R /ZaDb {zadb} 0 R >> >> >>",
                refs(&field_ids)
            ),
            None => String::new(),
        };
        objects[1].data = format!("<< /Type /Catalog /Pages 2 0 R{acro_form} >>").into_bytes();
        objects[2].data = format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            refs(&page_ids),
            page_ids.len()
        )
        .into_bytes();
        let info_id = push(&mut objects, "<< /Producer (Folio 0.1) /Creator (Folio) >>");

        Ok(serialize(&objects, info_id))
    }
}

impl Canvas for PdfCanvas<'_> {
    fn draw_rect(&mut self, rect: Rect, style: &ResolvedStyle, method: DrawMethod, radius: Option<f64>) {
        let Some(op) = self.begin_paint(style, method) else {
            return;
        };
        match radius {
            Some(r) if r > 0.0 => {
                let path = Path::rounded_rect(rect.width(), rect.height(), r);
                self.write_path(&path, rect.left, rect.top);
            }
            _ => {
                let (x, y) = (self.x(rect.left), self.y(rect.bottom));
                let _ = writeln!(
                    self.current.stream,
                    "{x:.2} {y:.2} {:.2} {:.2} re",
                    rect.width(),
                    rect.height()
                );
            }
        }
        let _ = write!(self.current.stream, "{op}\nQ\n");
    }

    fn draw_path(&mut self, path: &Path, x: f64, y: f64, style: &ResolvedStyle, method: DrawMethod) {
        if path.is_empty() {
            return;
        }
        let Some(op) = self.begin_paint(style, method) else {
            return;
        };
        self.write_path(path, x, y);
        let _ = write!(self.current.stream, "{op}\nQ\n");
    }

    fn draw_image(&mut self, image: &ImageRef, rect: Rect, style: &ResolvedStyle) {
        match image {
            ImageRef::Bitmap { uri, .. } if self.images.get(uri).is_some() => {
                let im = self.image_resource(uri);
                let (x, y) = (self.x(rect.left), self.y(rect.bottom));
                self.current.stream.push_str("q\n");
                self.set_opacity(style.opacity);
                let _ = write!(
                    self.current.stream,
                    "{:.4} 0 0 {:.4} {x:.2} {y:.2} cm\n/Im{im} Do\nQ\n",
                    rect.width(),
                    rect.height()
                );
            }
            ImageRef::Bitmap { .. } | ImageRef::Missing { .. } => {
                self.fill_plain_rect(rect, PLACEHOLDER_GREY);
            }
            ImageRef::Widget(kind) => self.write_widget(*kind, rect),
        }
    }

    fn draw_flowable(&mut self, flowable: Flowable<'_>, left: f64, top: f64) {
        match flowable {
            Flowable::Paragraph(p) => self.write_paragraph(p, left, top),
            Flowable::Table(t) => self.write_table(t, left, top),
        }
    }

    fn clip_path(&mut self, path: &Path, x: f64, y: f64) {
        if path.is_empty() {
            return;
        }
        self.write_path(path, x, y);
        self.current.stream.push_str("W n\n");
    }

    fn save_state(&mut self) {
        self.saved.push(self.offset);
        self.current.stream.push_str("q\n");
    }

    fn restore_state(&mut self) {
        if let Some(offset) = self.saved.pop() {
            self.offset = offset;
            self.current.stream.push_str("Q\n");
        }
    }

    fn translate(&mut self, dx: f64, dy: f64) {
        self.offset.x += dx;
        self.offset.y += dy;
    }

    fn page_break(&mut self) {
        for _ in self.saved.drain(..) {
            self.current.stream.push_str("Q\n");
        }
        self.offset = Point::default();
        self.pages.push(std::mem::take(&mut self.current));
    }

    fn finish(&mut self) -> Result<(), FolioError> {
        self.page_break();
        let bytes = self.build()?;
        tracing::debug!(
            pages = self.pages.len(),
            fonts = self.font_keys.len(),
            images = self.image_uris.len(),
            bytes = bytes.len(),
            "wrote PDF"
        );
        self.output = Some(bytes);
        Ok(())
    }
}

fn push(objects: &mut Vec<PdfObject>, data: impl Into<String>) -> usize {
    objects.push(PdfObject {
        data: data.into().into_bytes(),
    });
    objects.len() - 1
}

fn push_stream(objects: &mut Vec<PdfObject>, dict: &str, body: &[u8]) -> usize {
    let mut data = Vec::with_capacity(dict.len() + body.len() + 20);
    let _ = write!(data, "{dict}\nstream\n");
    data.extend_from_slice(body);
    data.extend_from_slice(b"\nendstream");
    objects.push(PdfObject { data });
    objects.len() - 1
}

fn refs(ids: &[usize]) -> String {
    ids.iter()
        .map(|id| format!("{id} 0 R"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Escape bytes for a PDF literal string.
fn escape_pdf_bytes(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for &b in bytes {
        match b {
            b'\\' => out.push_str("\\\\"),
            b'(' => out.push_str("\\("),
            b')' => out.push_str("\\)"),
            0x20..=0x7E => out.push(b as char),
            _ => {
                let _ = write!(out, "\\{b:03o}");
            }
        }
    }
    out
}

/// Write one image as one or two XObjects. Returns the main XObject ID.
fn write_image_xobject(objects: &mut Vec<PdfObject>, image: &LoadedImage) -> usize {
    match &image.pixel_data {
        ImagePixelData::Jpeg { data, color_space } => {
            let color_space = match color_space {
                JpegColorSpace::DeviceRGB => "/DeviceRGB",
                JpegColorSpace::DeviceGray => "/DeviceGray",
            };
            push_stream(
                objects,
                &format!(
                    "<< /Type /XObject /Subtype /Image /Width {} /Height {} \
                     /ColorSpace {color_space} /BitsPerComponent 8 /Filter /DCTDecode /Length {} >>",
                    image.width_px,
                    image.height_px,
                    data.len()
                ),
                data,
            )
        }
        ImagePixelData::Decoded { rgb, alpha } => {
            let smask = alpha.as_ref().map(|alpha| {
                let compressed = compress_to_vec_zlib(alpha, 6);
                let id = push_stream(
                    objects,
                    &format!(
                        "<< /Type /XObject /Subtype /Image /Width {} /Height {} \
                         /ColorSpace /DeviceGray /BitsPerComponent 8 /Filter /FlateDecode /Length {} >>",
                        image.width_px,
                        image.height_px,
                        compressed.len()
                    ),
                    &compressed,
                );
                format!(" /SMask {id} 0 R")
            });
            let compressed = compress_to_vec_zlib(rgb, 6);
            push_stream(
                objects,
                &format!(
                    "<< /Type /XObject /Subtype /Image /Width {} /Height {} \
                     /ColorSpace /DeviceRGB /BitsPerComponent 8 /Filter /FlateDecode /Length {}{} >>",
                    image.width_px,
                    image.height_px,
                    compressed.len(),
                    smask.unwrap_or_default()
                ),
                &compressed,
            )
        }
    }
}

/// Write a form field annotation, with appearance streams for checkboxes.
fn write_widget_objects(
    objects: &mut Vec<PdfObject>,
    widget: &Widget,
    index: usize,
    zadb: usize,
) -> usize {
    let [x0, y0, x1, y1] = widget.rect;
    let (w, h) = (x1 - x0, y1 - y0);
    let rect = format!("[{x0:.2} {y0:.2} {x1:.2} {y1:.2}]");
    match widget.kind {
        FormWidget::CheckedBox | FormWidget::UncheckedBox => {
            let size = (w.min(h) * 0.8).max(1.0);
            let on = format!(
                "q 0 g BT /ZaDb {size:.2} Tf {:.2} {:.2} Td (4) Tj ET Q",
                (w - size * 0.846) / 2.0,
                (h - size * 0.7) / 2.0
            );
            let appearance = |objects: &mut Vec<PdfObject>, body: &str| {
                push_stream(
                    objects,
                    &format!(
                        "<< /Type /XObject /Subtype /Form /BBox [0 0 {w:.2} {h:.2}] \
                         /Resources << /Font << /ZaDb {zadb} 0 R >> >> /Length {} >>",
                        body.len()
                    ),
                    body.as_bytes(),
                )
            };
            let yes = appearance(objects, &on);
            let off = appearance(objects, "");
            let state = if widget.kind == FormWidget::CheckedBox {
                "Yes"
            } else {
                "Off"
            };
            push(
                objects,
                format!(
                    "<< /Type /Annot /Subtype /Widget /FT /Btn /T (check{index}) /Rect {rect} /F 4 \
                     /V /{state} /AS /{state} /DA (/ZaDb 0 Tf 0 g) /MK << /CA (4) >> \
                     /AP << /N << /Yes {yes} 0 R /Off {off} 0 R >> >> >>"
                ),
            )
        }
        FormWidget::TextField => {
            let size = (h * 0.6).clamp(4.0, 12.0);
            push(
                objects,
                format!(
                    "<< /Type /Annot /Subtype /Widget /FT /Tx /T (text{index}) /Rect {rect} /F 4 \
                     /V () /DA (/Helv {size:.1} Tf 0 g) /MK << /BC [0.6 0.6 0.6] >> >>"
                ),
            )
        }
    }
}

/// Write the five CIDFont objects for a custom TrueType font. The whole
/// font is embedded, so glyph IDs are the font's own. Returns the Type0 ID.
fn write_custom_font_objects(
    objects: &mut Vec<PdfObject>,
    key: &FontKey,
    ttf_data: &[u8],
    metrics: &CustomFontMetrics,
    used: &BTreeSet<char>,
) -> Result<usize, FolioError> {
    let face = ttf_parser::Face::parse(ttf_data, 0).map_err(|e| {
        FolioError::FontError(format!("Failed to parse TTF data for font '{}': {e}", key.family))
    })?;
    let upem = metrics.units_per_em.max(1);
    let scale = 1000.0 / upem as f64;
    let name = sanitize_font_name(&key.family, key.bold, key.italic);

    let char_to_gid: HashMap<char, u16> = used
        .iter()
        .filter_map(|ch| metrics.glyph_ids.get(ch).map(|gid| (*ch, *gid)))
        .collect();

    // 1. FontFile2
    let compressed = compress_to_vec_zlib(ttf_data, 6);
    let fontfile2 = push_stream(
        objects,
        &format!(
            "<< /Length {} /Length1 {} /Filter /FlateDecode >>",
            compressed.len(),
            ttf_data.len()
        ),
        &compressed,
    );

    // 2. FontDescriptor
    let bbox = face.global_bounding_box();
    let cap_height = face.capital_height().unwrap_or(metrics.ascender) as f64 * scale;
    let descriptor = push(
        objects,
        format!(
            "<< /Type /FontDescriptor /FontName /{name} /Flags 4 \
             /FontBBox [{} {} {} {}] /ItalicAngle {} \
             /Ascent {} /Descent {} /CapHeight {} /StemV {} /FontFile2 {fontfile2} 0 R >>",
            (bbox.x_min as f64 * scale) as i32,
            (bbox.y_min as f64 * scale) as i32,
            (bbox.x_max as f64 * scale) as i32,
            (bbox.y_max as f64 * scale) as i32,
            if key.italic { -12 } else { 0 },
            (metrics.ascender as f64 * scale) as i32,
            (metrics.descender as f64 * scale) as i32,
            cap_height as i32,
            if key.bold { 120 } else { 80 },
        ),
    );

    // 3. CIDFont
    let default_width = (metrics.default_advance as f64 * scale) as u32;
    let cidfont = push(
        objects,
        format!(
            "<< /Type /Font /Subtype /CIDFontType2 /BaseFont /{name} \
             /CIDSystemInfo << /Registry (Adobe) /Ordering (Identity) /Supplement 0 >> \
             /FontDescriptor {descriptor} 0 R /DW {default_width} /W {} /CIDToGIDMap /Identity >>",
            build_w_array(&char_to_gid, metrics)
        ),
    );

    // 4. ToUnicode
    let cmap = build_tounicode_cmap(&char_to_gid, &name);
    let compressed = compress_to_vec_zlib(cmap.as_bytes(), 6);
    let tounicode = push_stream(
        objects,
        &format!("<< /Length {} /Filter /FlateDecode >>", compressed.len()),
        &compressed,
    );

    // 5. Type0 root
    Ok(push(
        objects,
        format!(
            "<< /Type /Font /Subtype /Type0 /BaseFont /{name} /Encoding /Identity-H \
             /DescendantFonts [{cidfont} 0 R] /ToUnicode {tounicode} 0 R >>"
        ),
    ))
}

/// The /W array: `[gid [width] gid [width] ...]`, sorted by glyph.
fn build_w_array(char_to_gid: &HashMap<char, u16>, metrics: &CustomFontMetrics) -> String {
    let scale = 1000.0 / metrics.units_per_em.max(1) as f64;
    let widths: BTreeSet<(u16, u32)> = char_to_gid
        .iter()
        .map(|(ch, gid)| {
            let advance = metrics
                .advance_widths
                .get(ch)
                .copied()
                .unwrap_or(metrics.default_advance);
            (*gid, (advance as f64 * scale) as u32)
        })
        .collect();
    let mut result = String::from("[");
    let mut last = None;
    for (gid, width) in widths {
        if last == Some(gid) {
            continue;
        }
        last = Some(gid);
        let _ = write!(result, " {gid} [{width}]");
    }
    result.push_str(" ]");
    result
}

/// A ToUnicode CMap so text can be copied out of the PDF.
fn build_tounicode_cmap(char_to_gid: &HashMap<char, u16>, font_name: &str) -> String {
    let mut gid_to_unicode: Vec<(u16, u32)> = char_to_gid
        .iter()
        .map(|(&ch, &gid)| (gid, ch as u32))
        .collect();
    gid_to_unicode.sort_unstable();
    gid_to_unicode.dedup_by_key(|(gid, _)| *gid);

    let mut cmap = String::new();
    cmap.push_str("/CIDInit /ProcSet findresource begin\n12 dict begin\nbegincmap\n");
    cmap.push_str("/CIDSystemInfo\n<< /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n");
    let _ = writeln!(cmap, "/CMapName /{font_name}-UTF16 def");
    cmap.push_str("/CMapType 2 def\n1 begincodespacerange\n<0000> <FFFF>\nendcodespacerange\n");
    // At most 100 entries per bfchar block.
    for chunk in gid_to_unicode.chunks(100) {
        let _ = writeln!(cmap, "{} beginbfchar", chunk.len());
        for &(gid, unicode) in chunk {
            let mut units = [0u16; 2];
            let utf16 = char::from_u32(unicode)
                .map(|c| c.encode_utf16(&mut units).iter().map(|u| format!("{u:04X}")).collect())
                .unwrap_or_else(|| "FFFD".to_string());
            let _ = writeln!(cmap, "<{gid:04X}> <{utf16}>");
        }
        cmap.push_str("endbfchar\n");
    }
    cmap.push_str("endcmap\nCMapName currentdict /CMap defineresource pop\nend\nend\n");
    cmap
}

/// A PDF name for a font: alphanumerics of the family plus style suffixes.
fn sanitize_font_name(family: &str, bold: bool, italic: bool) -> String {
    let mut name: String = family
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    if name.is_empty() {
        name = "CustomFont".to_string();
    }
    if bold {
        name.push_str("-Bold");
    }
    if italic {
        name.push_str("-Italic");
    }
    name
}

/// Serialize all objects into the final PDF byte stream.
fn serialize(objects: &[PdfObject], info_id: usize) -> Vec<u8> {
    let mut output: Vec<u8> = Vec::new();
    let mut offsets: Vec<usize> = vec![0; objects.len()];

    output.extend_from_slice(b"%PDF-1.7\n");
    output.extend_from_slice(b"%\xe2\xe3\xcf\xd3\n");

    for (i, obj) in objects.iter().enumerate().skip(1) {
        offsets[i] = output.len();
        let _ = write!(output, "{i} 0 obj\n");
        output.extend_from_slice(&obj.data);
        output.extend_from_slice(b"\nendobj\n\n");
    }

    let xref_offset = output.len();
    let _ = write!(output, "xref\n0 {}\n", objects.len());
    output.extend_from_slice(b"0000000000 65535 f \n");
    for offset in offsets.iter().skip(1) {
        let _ = write!(output, "{offset:010} 00000 n \n");
    }
    let _ = write!(
        output,
        "trailer\n<< /Size {} /Root 1 0 R /Info {info_id} 0 R >>\nstartxref\n{xref_offset}\n%%EOF\n",
        objects.len()
    );
    output
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::Arc;

    use base64::Engine;

    use super::*;
    use crate::draw::{draw_pages, draw_placed};
    use crate::geom::Margins;
    use crate::layout::placed::Placed;
    use crate::layout::{Page, SheetLayout};
    use crate::model::{Element, ElementKind, Run};
    use crate::style::Align;
    use crate::text::wrap;
    use crate::warning::Warnings;

    fn page() -> Extent {
        Extent::new(200.0, 300.0)
    }

    struct Pdf(Vec<u8>);

    impl Pdf {
        fn has(&self, needle: &str) -> bool {
            String::from_utf8_lossy(&self.0).contains(needle)
        }

        /// Content streams are compressed; inflate the first one for inspection.
        fn first_stream(&self) -> String {
            let marker = b"/FlateDecode >>\nstream\n";
            let start = self.0.windows(marker.len()).position(|w| w == marker).unwrap() + marker.len();
            let end = start
                + self.0[start..]
                    .windows(10)
                    .position(|w| w == b"\nendstream")
                    .unwrap();
            let inflated = miniz_oxide::inflate::decompress_to_vec_zlib(&self.0[start..end]).unwrap();
            String::from_utf8(inflated).unwrap()
        }
    }

    fn output(canvas: PdfCanvas<'_>) -> Pdf {
        let bytes = canvas.into_bytes().unwrap();
        assert!(bytes.starts_with(b"%PDF-1.7"));
        assert!(bytes.windows(5).any(|w| w == b"%%EOF"));
        Pdf(bytes)
    }

    fn finish(mut canvas: PdfCanvas<'_>) -> Pdf {
        canvas.finish().unwrap();
        output(canvas)
    }

    #[test]
    fn escape_pdf_bytes_handles_delimiters() {
        assert_eq!(escape_pdf_bytes(b"Hello (World)"), "Hello \\(World\\)");
        assert_eq!(escape_pdf_bytes(b"back\\slash"), "back\\\\slash");
        assert_eq!(escape_pdf_bytes(&[0xE9]), "\\351");
    }

    #[test]
    fn empty_layout_is_a_valid_pdf() {
        let fonts = FontContext::new();
        let images = ImageStore::new(None);
        let layout = SheetLayout {
            page_size: page(),
            margin: Margins::uniform(10.0),
            pages: vec![Page::default()],
        };
        let mut canvas = PdfCanvas::new(&fonts, &images, page());
        draw_pages(&mut canvas, &layout, None).unwrap();
        let pdf = output(canvas);
        assert!(pdf.has("/Count 1"));
        assert!(pdf.has("/MediaBox [0 0 200.00 300.00]"));
        assert!(pdf.has("xref"));
    }

    #[test]
    fn text_uses_standard_fonts_and_flips_y() {
        let fonts = FontContext::new();
        let images = ImageStore::new(None);
        let style = Arc::new(ResolvedStyle::default());
        let bold = Arc::new(style.strengthened());
        let run = Run::new(
            vec![
                Element::new(ElementKind::Text, "Plain ", style.clone()),
                Element::new(ElementKind::Text, "bold", bold),
            ],
            style,
        );
        let p = wrap(&fonts, &run, 150.0, Align::Left);
        let mut canvas = PdfCanvas::new(&fonts, &images, page());
        draw_placed(&mut canvas, &Placed::paragraph(p, Rect::new(10.0, 20.0, 150.0, 50.0)));
        let pdf = finish(canvas);

        assert!(pdf.has("/BaseFont /Helvetica /Encoding /WinAnsiEncoding"));
        assert!(pdf.has("/BaseFont /Helvetica-Bold"));
        assert!(!pdf.has("CIDFontType2"));
        let stream = pdf.first_stream();
        assert!(stream.contains("(Plain) Tj") || stream.contains("(Plain ) Tj"));
        // Baseline sits below the paragraph top, so its PDF y is under 280.
        let tm = stream.lines().find(|l| l.ends_with(" Tm")).unwrap();
        let y: f64 = tm.split_whitespace().nth(5).unwrap().parse().unwrap();
        assert!(y < 280.0 && y > 260.0);
    }

    #[test]
    fn checkbox_symbols_use_dingbats() {
        let fonts = FontContext::new();
        let images = ImageStore::new(None);
        let style = Arc::new(ResolvedStyle::default());
        let run = Run::new(vec![Element::new(ElementKind::Checkbox, "x", style.clone())], style);
        let p = wrap(&fonts, &run, 50.0, Align::Left);
        let mut canvas = PdfCanvas::new(&fonts, &images, page());
        draw_placed(&mut canvas, &Placed::paragraph(p, Rect::new(0.0, 0.0, 50.0, 20.0)));
        let pdf = finish(canvas);
        assert!(pdf.has("/BaseFont /ZapfDingbats >>"));
        assert!(pdf.first_stream().contains("(4) Tj"));
    }

    #[test]
    fn png_with_alpha_gets_smask() {
        let img = image::RgbaImage::from_pixel(2, 2, image::Rgba([255, 0, 0, 128]));
        let mut png = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut png), image::ImageOutputFormat::Png)
            .unwrap();
        let uri = format!(
            "data:image/png;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(&png)
        );

        let fonts = FontContext::new();
        let mut images = ImageStore::new(None);
        let image = images.load(&uri, &mut Warnings::default());
        let mut canvas = PdfCanvas::new(&fonts, &images, page());
        let style = ResolvedStyle::default();
        canvas.draw_image(&image, Rect::new(10.0, 10.0, 40.0, 40.0), &style);
        let pdf = finish(canvas);
        assert!(pdf.has("/SMask"));
        assert!(pdf.has("/XObject << /Im0"));
    }

    #[test]
    fn widgets_make_an_acro_form() {
        let fonts = FontContext::new();
        let images = ImageStore::new(None);
        let mut canvas = PdfCanvas::new(&fonts, &images, page());
        let style = ResolvedStyle::default();
        canvas.draw_image(
            &ImageRef::Widget(FormWidget::CheckedBox),
            Rect::new(10.0, 10.0, 12.0, 12.0),
            &style,
        );
        canvas.draw_image(
            &ImageRef::Widget(FormWidget::TextField),
            Rect::new(30.0, 10.0, 80.0, 20.0),
            &style,
        );
        let pdf = finish(canvas);
        assert!(pdf.has("/AcroForm"));
        assert!(pdf.has("/NeedAppearances true"));
        assert!(pdf.has("/FT /Btn"));
        assert!(pdf.has("/V /Yes"));
        assert!(pdf.has("/FT /Tx"));
        assert!(pdf.has("/Rect [10.00 278.00 22.00 290.00]"));
    }

    #[test]
    fn opacity_uses_ext_gstate() {
        let fonts = FontContext::new();
        let images = ImageStore::new(None);
        let mut canvas = PdfCanvas::new(&fonts, &images, page());
        let style = ResolvedStyle {
            background: Some(Color::RED),
            opacity: 0.5,
            ..ResolvedStyle::default()
        };
        canvas.draw_rect(Rect::new(0.0, 0.0, 10.0, 10.0), &style, DrawMethod::Fill, Some(2.0));
        let pdf = finish(canvas);
        assert!(pdf.has("/ExtGState << /GS0"));
        assert!(pdf.has("/ca 0.500"));
        let stream = pdf.first_stream();
        assert!(stream.contains("/GS0 gs"));
        assert!(stream.contains(" c\n"));
    }

    #[test]
    fn translation_and_clip_are_balanced() {
        let fonts = FontContext::new();
        let images = ImageStore::new(None);
        let mut canvas = PdfCanvas::new(&fonts, &images, page());
        let style = ResolvedStyle {
            background: Some(Color::BLACK),
            ..ResolvedStyle::default()
        };
        canvas.save_state();
        canvas.translate(10.0, 20.0);
        canvas.clip_path(&Path::rect(50.0, 50.0), 0.0, 0.0);
        canvas.draw_rect(Rect::new(0.0, 0.0, 5.0, 5.0), &style, DrawMethod::Fill, None);
        canvas.restore_state();
        let pdf = finish(canvas);
        let stream = pdf.first_stream();
        assert!(stream.contains("W n"));
        assert!(stream.contains("10.00 275.00 5.00 5.00 re"));
        assert_eq!(stream.matches("q\n").count(), stream.matches("Q\n").count());
    }

    #[test]
    fn sanitize_font_names() {
        assert_eq!(sanitize_font_name("Inter", false, false), "Inter");
        assert_eq!(sanitize_font_name("Inter", true, true), "Inter-Bold-Italic");
        assert_eq!(sanitize_font_name("Noto Sans", false, false), "NotoSans");
        assert_eq!(sanitize_font_name("()", true, false), "CustomFont-Bold");
    }

    #[test]
    fn tounicode_cmap_maps_glyphs() {
        let mut char_to_gid = HashMap::new();
        char_to_gid.insert('A', 36u16);
        char_to_gid.insert('\u{1F600}', 40u16);
        let cmap = build_tounicode_cmap(&char_to_gid, "TestFont");
        assert!(cmap.contains("<0024> <0041>"));
        assert!(cmap.contains("<0028> <D83DDE00>"));
        assert!(cmap.contains("<0000> <FFFF>"));
    }
}
