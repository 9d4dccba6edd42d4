//! Thermometer blocks: one row of pills per run.
//!
//! A run's cells are read as `label | value | small`. The value pill spans
//! the row, the label pill sits over its left end and the small pill, when
//! present, stands apart at the right.
//!
//! ```text
//!  (( Label )  value text          )  ( 12 )
//! ```

use std::sync::Arc;

use crate::error::LayoutError;
use crate::geom::Rect;
use crate::layout::block::centered_text;
use crate::layout::placed::{DrawMethod, Placed};
use crate::layout::LayoutContext;
use crate::model::{Block, Run};
use crate::style::{Align, Color, ResolvedStyle};
use crate::text::natural_width;

pub const MIN_THERMOMETER_WIDTH: f64 = 40.0;

/// Fill for label pills when the block style has no border color.
const LABEL_FILL: Color = Color::rgb(0.75, 0.75, 0.75);

struct Row {
    label: Option<Run>,
    value: Run,
    small: Option<Run>,
}

fn rows(block: &Block) -> Vec<Row> {
    block
        .content
        .iter()
        .map(|run| {
            let mut cells = run.cells().into_iter().map(|c| c.run);
            let first = cells.next();
            let second = cells.next();
            let third = cells.next().filter(|r| !r.is_empty());
            match (first, second) {
                (Some(label), Some(value)) => Row {
                    label: Some(label).filter(|r| !r.is_empty()),
                    value,
                    small: third,
                },
                (Some(value), None) => Row {
                    label: None,
                    value,
                    small: None,
                },
                _ => Row {
                    label: None,
                    value: Run::new(Vec::new(), run.style.clone()),
                    small: None,
                },
            }
        })
        .collect()
}

fn pill_style(base: &ResolvedStyle, fill: Color) -> Arc<ResolvedStyle> {
    Arc::new(ResolvedStyle {
        background: Some(fill),
        ..base.clone()
    })
}

fn pill_method(style: &ResolvedStyle) -> DrawMethod {
    if style.has_border() {
        DrawMethod::Both
    } else {
        DrawMethod::Fill
    }
}

pub fn layout_thermometer(ctx: &mut LayoutContext<'_>, block: &Block, area: Rect) -> Placed {
    let fonts = ctx.fonts;
    let width = area.width();
    if width < MIN_THERMOMETER_WIDTH {
        return Placed::error(
            area,
            LayoutError::TooSmall {
                needed: MIN_THERMOMETER_WIDTH,
                available: width,
            },
            ctx.settings.weights.error_base,
        );
    }

    let pad = block.spacing.padding;
    let style = &block.style;
    let value_style = pill_style(style, style.background.unwrap_or(Color::LIGHT_GREY));
    let label_style = pill_style(style, style.border_color.unwrap_or(LABEL_FILL));

    let mut children = Vec::new();
    let mut top = area.top;
    for row in rows(block) {
        let size = [Some(&row.value), row.label.as_ref(), row.small.as_ref()]
            .into_iter()
            .flatten()
            .map(Run::max_font_size)
            .fold(0.0, f64::max);
        let height = size * 1.2 + 2.0 * pad;
        let label_height = row
            .label
            .as_ref()
            .map(|l| l.max_font_size() * 1.2 + 2.0 * pad)
            .unwrap_or(height);
        let radius = match height - label_height {
            r if r > 0.0 => r,
            _ => height / 2.0,
        };
        let center = top + height / 2.0;

        let mut right = area.right;
        if let Some(small) = &row.small {
            let w = (natural_width(fonts, small) + 2.0 * pad).min(width / 4.0);
            let pill = Rect::new(right - w, top, w, height);
            children.push(Placed::rect(pill, value_style.clone(), pill_method(style), Some(radius)));
            children.push(centered_text(fonts, small, pill.left + pad, w - 2.0 * pad, center, Align::Center));
            right = pill.left - pad;
        }

        let value_pill = Rect::from_edges(area.left, top, right.max(area.left), top + height);
        children.push(Placed::rect(
            value_pill,
            value_style.clone(),
            pill_method(style),
            Some(radius),
        ));

        let mut text_left = value_pill.left + pad;
        if let Some(label) = &row.label {
            let w = (natural_width(fonts, label) + 2.0 * pad).min(value_pill.width() / 2.0);
            let pill = Rect::new(value_pill.left, top, w, height);
            children.push(Placed::rect(pill, label_style.clone(), pill_method(style), Some(radius)));
            children.push(centered_text(fonts, label, pill.left + pad, (w - 2.0 * pad).max(1.0), center, Align::Left));
            text_left = pill.right + pad;
        }

        let value_width = (value_pill.right - pad - text_left).max(1.0);
        if !row.value.is_empty() {
            children.push(centered_text(fonts, &row.value, text_left, value_width, center, Align::Left));
        }
        top += height + pad;
    }
    Placed::group(area, children)
}
