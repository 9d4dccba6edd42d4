//! # Folio
//!
//! A sheet layout engine. A sheet is a stack of sections; each section is a
//! set of boxed blocks spread over columns. Folio picks the column widths and
//! the assignment of blocks to columns by optimization, wraps the text, and
//! writes fixed pages to PDF.
//!
//! ## Architecture
//!
//! ```text
//! Input (JSON)
//!       ↓
//!   [model]    Sheet tree: sections, blocks, runs of styled elements
//!       ↓
//!   [style]    Named styles resolved through inheritance
//!       ↓
//!   [layout]   Column optimization, block layout, pagination
//!       ↓
//!   [draw]     Walk placed trees against a Canvas
//!       ↓
//!   [pdf]      Serialize to PDF bytes
//! ```

pub mod draw;
pub mod error;
pub mod font;
pub mod geom;
pub mod image_loader;
pub mod layout;
pub mod model;
pub mod pdf;
pub mod style;
pub mod text;
pub mod warning;

use std::path::Path;

pub use error::FolioError;
pub use warning::{Warning, WarningKind, Warnings};

use font::FontContext;
use image_loader::{read_source_bytes, ImageStore};
use layout::{layout_sheet, LayoutContext, LayoutDump, SheetLayout};
use model::{Sheet, SheetSource};
use pdf::PdfCanvas;

/// The result of a render: the PDF file and what went wrong along the way.
#[derive(Debug)]
pub struct RenderOutput {
    pub pdf: Vec<u8>,
    pub warnings: Vec<Warning>,
}

/// A laid-out sheet with everything needed to draw it.
pub struct Prepared {
    pub sheet: Sheet,
    pub layout: SheetLayout,
    pub fonts: FontContext,
    pub images: ImageStore,
    pub warnings: Warnings,
}

/// Render a sheet described as JSON to PDF bytes.
///
/// Relative image and font paths resolve against the working directory.
pub fn render_json(json: &str) -> Result<RenderOutput, FolioError> {
    render_json_with_base(json, None)
}

/// Render a sheet described as JSON, resolving relative paths against
/// `base_dir` (normally the directory holding the document).
pub fn render_json_with_base(
    json: &str,
    base_dir: Option<&Path>,
) -> Result<RenderOutput, FolioError> {
    let source: SheetSource = serde_json::from_str(json)?;
    let Prepared {
        sheet,
        layout,
        fonts,
        images,
        warnings,
    } = prepare(source, base_dir)?;

    let mut canvas = PdfCanvas::new(&fonts, &images, layout.page_size);
    draw::draw_pages(&mut canvas, &layout, sheet.watermark.as_ref())?;
    let pdf = canvas.into_bytes()?;

    if warnings.is_empty() {
        tracing::info!(pages = layout.pages.len(), bytes = pdf.len(), "rendered sheet");
    } else {
        tracing::info!(
            pages = layout.pages.len(),
            bytes = pdf.len(),
            warnings = warnings.len(),
            "rendered sheet with warnings"
        );
    }
    Ok(RenderOutput {
        pdf,
        warnings: warnings.into_vec(),
    })
}

/// Lay out a sheet without drawing it.
pub fn prepare(source: SheetSource, base_dir: Option<&Path>) -> Result<Prepared, FolioError> {
    let mut fonts = FontContext::new();
    register_fonts(&mut fonts, &source, base_dir)?;

    let mut images = ImageStore::new(base_dir);
    let mut warnings = Warnings::default();
    let sheet = Sheet::from_source(source, &fonts, &mut images, &mut warnings)?;
    tracing::debug!(
        sections = sheet.sections.len(),
        blocks = sheet.block_count(),
        images = images.len(),
        "fixed up sheet"
    );

    let mut ctx = LayoutContext::new(&fonts, &sheet.settings);
    let layout = layout_sheet(&mut ctx, &sheet);
    tracing::debug!(
        hits = ctx.stats.cache_hits,
        misses = ctx.stats.cache_misses,
        "block cache"
    );
    warnings.extend(std::mem::take(&mut ctx.warnings));
    drop(ctx);

    Ok(Prepared {
        sheet,
        layout,
        fonts,
        images,
        warnings,
    })
}

/// Lay out a JSON sheet and return the placed pages as JSON, for inspection.
pub fn layout_json(json: &str, base_dir: Option<&Path>) -> Result<String, FolioError> {
    let source: SheetSource = serde_json::from_str(json)?;
    let prepared = prepare(source, base_dir)?;
    let dump = LayoutDump::from_layout(&prepared.layout);
    Ok(serde_json::to_string_pretty(&dump)?)
}

fn register_fonts(
    fonts: &mut FontContext,
    source: &SheetSource,
    base_dir: Option<&Path>,
) -> Result<(), FolioError> {
    for entry in &source.fonts {
        let data = read_source_bytes(&entry.src, base_dir).map_err(|e| {
            FolioError::FontError(format!("font '{}' could not be read: {e}", entry.family))
        })?;
        let bold = entry.weight >= 600;
        fonts
            .registry_mut()
            .register(&entry.family, bold, entry.italic, data)?;
        tracing::debug!(family = %entry.family, bold, italic = entry.italic, "registered font");
    }
    Ok(())
}
