//! Badge blocks: a row of equal shapes, one per run.
//!
//! A run's cells fill the text slots in order: main label, large number,
//! caption above, caption below. Inside the shape they stack as
//!
//! ```text
//!      above
//!       42
//!      main
//!      below
//! ```
//!
//! and the stack is centered vertically. Every shape in the row gets the
//! height of the tallest one.

use std::sync::Arc;

use crate::error::LayoutError;
use crate::font::FontContext;
use crate::geom::Rect;
use crate::layout::path::Path;
use crate::layout::placed::{DrawMethod, Placed};
use crate::layout::LayoutContext;
use crate::model::{BadgeShape, Block, Element, Run};
use crate::style::{Align, Color, ResolvedStyle};
use crate::text::{self, Paragraph};

pub const MIN_BADGE_WIDTH: f64 = 20.0;

const NUMBER_SCALE: f64 = 2.0;
const CAPTION_SCALE: f64 = 0.75;
const MIN_OUTLINE: f64 = 0.75;

/// A copy of `run` with every font size multiplied by `factor`.
fn scaled_run(run: &Run, factor: f64) -> Run {
    let elements = run
        .elements
        .iter()
        .map(|e| Element {
            style: Arc::new(e.style.with_size(e.style.font_size * factor)),
            ..e.clone()
        })
        .collect();
    Run::new(elements, Arc::new(run.style.with_size(run.style.font_size * factor)))
}

/// Horizontal room lost to the shape's slanted or curved sides.
fn side_inset(shape: BadgeShape, width: f64) -> f64 {
    match shape {
        BadgeShape::Oval | BadgeShape::Hexagon => 0.15 * width,
        BadgeShape::Round | BadgeShape::Rect => 0.0,
    }
}

fn outline(shape: BadgeShape, width: f64, height: f64) -> Path {
    match shape {
        BadgeShape::Oval => Path::oval(width, height),
        BadgeShape::Hexagon => Path::hexagon(width, height),
        BadgeShape::Round => Path::rounded_rect(width, height, height / 4.0),
        BadgeShape::Rect => Path::rect(width, height),
    }
}

/// Wrapped slots of one badge, top to bottom.
fn bands(fonts: &FontContext, run: &Run, width: f64) -> Vec<Paragraph> {
    let mut cells = run.cells().into_iter().map(|c| c.run);
    let main = cells.next();
    let number = cells.next().map(|r| scaled_run(&r, NUMBER_SCALE));
    let above = cells.next().map(|r| scaled_run(&r, CAPTION_SCALE));
    let below = cells.next().map(|r| scaled_run(&r, CAPTION_SCALE));
    [above, number, main, below]
        .into_iter()
        .flatten()
        .filter(|r| !r.is_empty())
        .map(|r| text::wrap(fonts, &r, width, Align::Center))
        .collect()
}

fn stack_height(bands: &[Paragraph], gap: f64) -> f64 {
    let total: f64 = bands.iter().map(|p| p.height).sum();
    total + gap * bands.len().saturating_sub(1) as f64
}

pub fn layout_badge(
    ctx: &mut LayoutContext<'_>,
    block: &Block,
    shape: BadgeShape,
    area: Rect,
) -> Placed {
    let fonts = ctx.fonts;
    let n = block.content.len();
    if n == 0 {
        return Placed::group(area, Vec::new());
    }
    let pad = block.spacing.padding;
    let width = (area.width() - (n - 1) as f64 * pad) / n as f64;
    if width < MIN_BADGE_WIDTH {
        return Placed::error(
            area,
            LayoutError::TooSmall {
                needed: n as f64 * MIN_BADGE_WIDTH + (n - 1) as f64 * pad,
                available: area.width(),
            },
            ctx.settings.weights.error_base,
        );
    }

    let style = &block.style;
    let border = style.border_width.max(MIN_OUTLINE);
    let inset = side_inset(shape, width) + border + pad;
    let text_width = (width - 2.0 * inset).max(1.0);
    let gap = pad / 2.0;

    let all: Vec<Vec<Paragraph>> = block
        .content
        .iter()
        .map(|run| bands(fonts, run, text_width))
        .collect();
    let tallest = all
        .iter()
        .map(|b| stack_height(b, gap))
        .fold(0.0, f64::max);
    let curve_room = match shape {
        BadgeShape::Oval | BadgeShape::Hexagon => 0.3 * tallest,
        BadgeShape::Round | BadgeShape::Rect => 0.0,
    };
    let height = tallest + 2.0 * (border + pad) + curve_room;

    let shape_style = Arc::new(ResolvedStyle {
        border_width: border,
        border_color: Some(style.border_color.unwrap_or(Color::BLACK)),
        ..(**style).clone()
    });
    let method = if style.background.is_some() {
        DrawMethod::Both
    } else {
        DrawMethod::Stroke
    };

    let mut children = Vec::with_capacity(n * 5);
    for (i, paragraphs) in all.into_iter().enumerate() {
        let left = area.left + i as f64 * (width + pad);
        let rect = Rect::new(left, area.top, width, height);
        children.push(Placed::path(rect, outline(shape, width, height), shape_style.clone(), method));

        let mut top = area.top + (height - stack_height(&paragraphs, gap)) / 2.0;
        for p in paragraphs {
            let h = p.height;
            children.push(Placed::paragraph(p, Rect::new(left + inset, top, text_width, h)));
            top += h + gap;
        }
    }
    Placed::group(area, children)
}
