//! # Block Layout
//!
//! A block is a decorated box: an optional title banner across the top,
//! content below it, and optionally an image beside the content.
//!
//! ```text
//!  ┌──────────────────────────┐
//!  │▓▓▓▓▓▓▓ Title plaque ▓▓▓▓▓│
//!  │ ┌──────┐  content ...    │
//!  │ │image │  content ...    │
//!  │ └──────┘                 │
//!  └──────────────────────────┘
//! ```
//!
//! The box shrinks to its content: the bottom edge is the content's bottom
//! plus the inset. Draw order is clip, background, title, content, border,
//! so the plaque is clipped to the box outline and the border sits on top.
//!
//! Results are cached per block and width; a cache hit is cloned and moved,
//! which is constant time because the block is a group.

use std::sync::Arc;

use crate::error::LayoutError;
use crate::font::FontContext;
use crate::geom::{Margins, Rect};
use crate::layout::optimize::{divide_space, minimize, Objective, BAD};
use crate::layout::path::{decoration_seed, Path};
use crate::layout::placed::{DrawMethod, Placed};
use crate::layout::{badge, table, thermometer, LayoutContext};
use crate::model::{Block, BlockImage, BlockMethod, ImageAlign, Run};
use crate::style::{Align, ResolvedStyle};
use crate::text;

/// Narrowest content area a block accepts.
pub const MIN_BLOCK_WIDTH: f64 = 10.0;

/// Lay out `block` at the top of `bounds`, using the cache when possible.
pub fn layout_block(ctx: &mut LayoutContext<'_>, block: &Block, bounds: Rect) -> Placed {
    let width = bounds.width();
    if let Some(mut hit) = ctx.cached_block(block.id, width) {
        hit.move_by(bounds.left - hit.requested.left, bounds.top - hit.requested.top);
        hit.requested = bounds;
        return hit;
    }
    let placed = build_block(ctx, block, bounds);
    ctx.store_block(block.id, width, &placed);
    placed
}

fn build_block(ctx: &mut LayoutContext<'_>, block: &Block, bounds: Rect) -> Placed {
    let fonts = ctx.fonts;
    let error_base = ctx.settings.weights.error_base;
    let style = &block.style;
    let spacing = block.spacing;
    let inset = if style.has_decoration() {
        style.border_width + spacing.margin
    } else {
        0.0
    };
    let inner = bounds - Margins::uniform(inset);
    if inner.width() < MIN_BLOCK_WIDTH {
        return Placed::error(
            bounds,
            LayoutError::TooSmall {
                needed: MIN_BLOCK_WIDTH + 2.0 * inset,
                available: bounds.width(),
            },
            error_base,
        );
    }

    let banner = block
        .visible_title()
        .map(|title| title_banner(fonts, block, title, bounds));
    let content_top = match &banner {
        Some((plaque, _)) => inner.top.max(plaque.bottom + spacing.padding),
        None => inner.top,
    };
    let area = Rect::from_edges(inner.left, content_top, inner.right, inner.bottom.max(content_top));

    let body: Vec<Placed> = match &block.image {
        Some(image) => image_and_content(ctx, block, image, area),
        None if block.content.is_empty() => Vec::new(),
        None => vec![layout_content(ctx, block, area)],
    };

    let mut bottom = body
        .iter()
        .map(|p| p.actual.bottom)
        .chain(banner.as_ref().map(|(plaque, _)| plaque.bottom))
        .fold(bounds.top, f64::max);
    if banner.is_some() && body.is_empty() {
        bottom = bottom.max(bounds.top);
    }
    let outer = bounds.with_bottom(bottom + inset);

    let outline = outline(block, style, outer);
    let mut children = Vec::new();
    if banner.is_some() {
        children.push(Placed::clip(outer, outline.clone()));
    }
    if style.background.is_some() {
        children.push(paint(outer, &outline, style, DrawMethod::Fill));
    }
    if let Some((_, title)) = banner {
        children.extend(title);
    }
    children.extend(body);
    if style.has_border() {
        children.push(paint(outer, &outline, style, DrawMethod::Stroke));
    }

    tracing::trace!(block = %block.id, width = bounds.width(), height = outer.height(), "laid out block");
    Placed::group(bounds, children)
}

/// The block outline relative to its top-left corner.
fn outline(block: &Block, style: &ResolvedStyle, outer: Rect) -> Path {
    let (w, h) = (outer.width(), outer.height().max(0.0));
    let base = match style.border_radius {
        Some(r) if r > 0.0 => Path::rounded_rect(w, h, r),
        _ => Path::rect(w, h),
    };
    let seed = decoration_seed(block.id, w, h);
    let base = match style.roughness {
        Some(amount) if amount > 0.0 => base.roughened(amount, seed),
        _ => base,
    };
    match style.teeth {
        Some(depth) if depth > 0.0 => base.toothed(depth, seed),
        _ => base,
    }
}

fn is_plain(style: &ResolvedStyle) -> bool {
    style.roughness.unwrap_or(0.0) <= 0.0 && style.teeth.unwrap_or(0.0) <= 0.0
}

fn paint(outer: Rect, outline: &Path, style: &Arc<ResolvedStyle>, method: DrawMethod) -> Placed {
    if is_plain(style) {
        Placed::rect(outer, style.clone(), method, style.border_radius)
    } else {
        Placed::path(outer, outline.clone(), style.clone(), method)
    }
}

/// The title plaque rectangle and what to draw for it.
fn title_banner(
    fonts: &FontContext,
    block: &Block,
    title: &Run,
    bounds: Rect,
) -> (Rect, Vec<Placed>) {
    let ts = &block.title_style;
    let pad = block.spacing.padding;
    let text_inset = pad + block.style.border_width;
    let text_width = (bounds.width() - 2.0 * text_inset).max(MIN_BLOCK_WIDTH);
    let paragraph = text::wrap(fonts, title, text_width, ts.align);

    let mut height = ts.leading() + 2.0 * pad;
    let extra_lines = paragraph.line_count().saturating_sub(1);
    height += extra_lines as f64 * ts.font_size * 1.2;
    let plaque = Rect::new(bounds.left, bounds.top, bounds.width(), height);

    let mut parts = Vec::with_capacity(2);
    if let Some(fill) = ts.background.or(block.style.border_color) {
        let plaque_style = Arc::new(ResolvedStyle {
            background: Some(fill),
            border_color: None,
            border_width: 0.0,
            ..(**ts).clone()
        });
        parts.push(Placed::rect(plaque, plaque_style, DrawMethod::Fill, None));
    }

    // Sink the text by half the descender so its cap box sits on the plaque
    // center line.
    let descent = fonts.descent(&ts.font_key(), ts.font_size);
    let top = plaque.top + pad - descent / 2.0;
    parts.push(Placed::paragraph(
        paragraph,
        Rect::new(bounds.left + text_inset, top, text_width, height),
    ));
    (plaque, parts)
}

/// Lay out the block's content (without image) in `area`.
pub fn layout_content(ctx: &mut LayoutContext<'_>, block: &Block, area: Rect) -> Placed {
    let pad = block.spacing.padding;
    match block.method {
        BlockMethod::Paragraphs => stack_paragraphs(ctx.fonts, &block.content, area, pad),
        BlockMethod::Table { equal } => table::layout_table(ctx, &block.content, area, pad, equal),
        BlockMethod::Thermometer => thermometer::layout_thermometer(ctx, block, area),
        BlockMethod::Badge { shape } => badge::layout_badge(ctx, block, shape, area),
    }
}

fn stack_paragraphs(fonts: &FontContext, runs: &[Run], area: Rect, gap: f64) -> Placed {
    let mut children = Vec::with_capacity(runs.len());
    let mut top = area.top;
    for run in runs {
        let p = text::wrap(fonts, run, area.width(), run.style.align);
        let placed = Placed::paragraph(
            p,
            Rect::from_edges(area.left, top, area.right, area.bottom.max(top)),
        );
        top = placed.actual.bottom + gap;
        children.push(placed);
    }
    Placed::group(area, children)
}

/// Place a paragraph so its first line's cap box is centered on `center_y`.
/// Multi-line paragraphs are centered by their full height.
pub fn centered_text(
    fonts: &FontContext,
    run: &Run,
    left: f64,
    width: f64,
    center_y: f64,
    align: Align,
) -> Placed {
    let p = text::wrap(fonts, run, width, align);
    let top = match (p.line_count(), p.lines.first()) {
        (1, Some(line)) => {
            let key = run
                .elements
                .first()
                .map(|e| e.font_key())
                .unwrap_or_else(|| run.style.font_key());
            let size = run.max_font_size();
            let ascent = fonts.ascent(&key, size);
            let descent = fonts.descent(&key, size);
            let baseline = center_y + (ascent + descent) / 2.0;
            baseline - line.baseline
        }
        _ => center_y - p.height / 2.0,
    };
    let height = p.height;
    Placed::paragraph(p, Rect::new(left, top, width, height))
}

/// Image and content side by side: `[image, content]`.
fn image_and_content(
    ctx: &mut LayoutContext<'_>,
    block: &Block,
    image: &BlockImage,
    area: Rect,
) -> Vec<Placed> {
    let gap = block.spacing.padding;
    let aspect = image.image.aspect();
    let width = area.width();

    if block.content.is_empty() {
        let w = image
            .width
            .or(image.height.map(|h| h / aspect))
            .unwrap_or(width)
            .min(width);
        let h = image.height.unwrap_or(w * aspect);
        return vec![place_image(block, image, area, w, w, h)];
    }

    let (image_w, content_w) = if image.has_fixed_size() {
        let most = (width - gap - MIN_BLOCK_WIDTH).max(1.0);
        let w = image
            .width
            .or(image.height.map(|h| h / aspect))
            .unwrap_or(width / 3.0)
            .clamp(1.0, most);
        (w, width - gap - w)
    } else {
        let min = (10.0 + (gap + 1.0) / 2.0).round() as i64;
        let total = (width - gap).floor() as i64;
        let fraction = width - gap - total as f64;
        let settings = ctx.settings;
        let mut search = ImageSearch {
            ctx: &mut *ctx,
            block,
            area,
            gap,
            aspect,
            total,
            min,
            image: image.align,
        };
        match minimize(&mut search, 2, &settings.optimizer) {
            Ok(opt) => (opt.key[0] as f64, opt.key[1] as f64 + fraction),
            Err(e) => {
                return vec![Placed::error(area, e, settings.weights.error_base)];
            }
        }
    };

    let (mut image_col, content_col) = split(area, image.align, image_w, content_w, gap);
    let mut content = layout_content(ctx, block, content_col);
    let content_h = content.actual.height();
    let native_h = image_w * aspect;
    let image_h = match image.height {
        Some(h) => h,
        None if image.width.is_some() => native_h,
        None if content_h > 0.0 => native_h.min(content_h),
        None => native_h,
    };
    let mut col_w = image_w;
    let drawn_w = if image.has_fixed_size() {
        image_w
    } else {
        (image_h / aspect).min(image_w)
    };
    if drawn_w < image_w {
        // Hand the unused image width to the content, unless that changes
        // its height and so unbalances the pair.
        let (narrow, wide) = split(area, image.align, drawn_w, width - gap - drawn_w, gap);
        let relaid = layout_content(ctx, block, wide);
        if !relaid.has_errors() && (relaid.actual.height() - content_h).abs() < 1e-6 {
            image_col = narrow;
            col_w = drawn_w;
            content = relaid;
        }
    }
    vec![
        place_image(block, image, image_col, col_w, drawn_w, image_h),
        content,
    ]
}

/// Columns for the image and the content, in that order.
fn split(area: Rect, align: ImageAlign, image_w: f64, content_w: f64, gap: f64) -> (Rect, Rect) {
    match align {
        ImageAlign::Left => (
            area.column_at(area.left, image_w),
            area.column_at(area.left + image_w + gap, content_w),
        ),
        ImageAlign::Right => (
            area.column_at(area.right - image_w, image_w),
            area.column_at(area.left, content_w),
        ),
    }
}

fn place_image(
    block: &Block,
    image: &BlockImage,
    col: Rect,
    col_w: f64,
    drawn_w: f64,
    drawn_h: f64,
) -> Placed {
    let requested = col.column_at(col.left, col_w);
    let left = match image.align {
        ImageAlign::Left => requested.left,
        ImageAlign::Right => requested.right - drawn_w,
    };
    let actual = Rect::new(left, requested.top, drawn_w, drawn_h);
    Placed::image(image.image.clone(), block.style.clone(), requested, actual)
}

struct ImageSearch<'c, 'f> {
    ctx: &'c mut LayoutContext<'f>,
    block: &'c Block,
    area: Rect,
    gap: f64,
    aspect: f64,
    total: i64,
    min: i64,
    image: ImageAlign,
}

impl Objective for ImageSearch<'_, '_> {
    fn discretize(&self, x: &[f64]) -> Result<Vec<i64>, LayoutError> {
        divide_space(x, self.total, self.min, 1)
    }

    fn score(&mut self, key: &[i64]) -> f64 {
        let (image_w, content_w) = (key[0] as f64, key[1] as f64);
        let (_, col) = split(self.area, self.image, image_w, content_w, self.gap);
        let content = layout_content(self.ctx, self.block, col);
        if content.has_errors() {
            return BAD;
        }
        let w = &self.ctx.settings.weights;
        let content_h = content.actual.height();
        let image_h = (image_w * self.aspect).min(content_h);
        // Column width the image cannot fill counts like missing height.
        let drawn_w = (image_h / self.aspect).min(image_w);
        let q = content.quality;
        (image_h - content_h).powi(2)
            + (image_w - drawn_w).powi(2)
            + w.image_bad_break * q.bad_breaks as f64
            + w.image_ok_break * q.ok_breaks as f64
            + q.internal_variance
            - drawn_w
    }
}
