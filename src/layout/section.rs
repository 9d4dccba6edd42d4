//! # Section Placement
//!
//! A section is laid out as one column group. When it does not fit in the
//! space left on the page, the longest prefix of its blocks that does fit
//! stays and the rest continues on a new page, as many pages as it takes.
//! Blocks are never split.
//!
//! The prefix is found by bisection, with each guess interpolated from the
//! bottoms of the last fitting and non-fitting attempts so it usually lands
//! in one or two layouts.

use crate::geom::{Margins, Rect};
use crate::layout::block::layout_block;
use crate::layout::columns::place_columns;
use crate::layout::placed::Placed;
use crate::layout::{placeable, LayoutContext, Placeable};
use crate::model::{Section, SectionMethod};
use crate::warning::WarningKind;

const FIT_TOLERANCE: f64 = 1e-6;

/// How a section arranges its items.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Arrangement {
    pub columns: usize,
    pub equal: bool,
    pub padding: f64,
}

/// Lay out `section` starting in `bounds`. `page` is the content area of an
/// empty page. Every group after the first starts a new page.
pub fn place_section(
    ctx: &mut LayoutContext<'_>,
    section: &Section,
    bounds: Rect,
    page: Rect,
) -> Vec<Placed> {
    let SectionMethod::Columns { columns, equal } = section.method;
    let arrangement = Arrangement {
        columns,
        equal,
        padding: section.spacing.padding,
    };
    let inset = Margins::uniform(section.spacing.margin);
    let items: Vec<Placeable<'_>> = section
        .blocks
        .iter()
        .map(|b| placeable(move |ctx, r| layout_block(ctx, b, r)))
        .collect();
    stack_section(ctx, &items, bounds - inset, page - inset, arrangement)
}

fn fits(placed: &Placed, bounds: Rect) -> bool {
    placed.actual.bottom <= bounds.bottom + FIT_TOLERANCE
}

fn is_full_page(bounds: Rect, page: Rect) -> bool {
    bounds.top <= page.top + FIT_TOLERANCE && bounds.bottom >= page.bottom - FIT_TOLERANCE
}

/// Place `items` starting in `bounds`, moving what does not fit onto new
/// pages of size `page`.
pub fn stack_section(
    ctx: &mut LayoutContext<'_>,
    items: &[Placeable<'_>],
    bounds: Rect,
    page: Rect,
    arr: Arrangement,
) -> Vec<Placed> {
    let mut out = Vec::new();
    let mut rest = items;
    let mut bounds = bounds;
    let mut new_page = false;

    while !rest.is_empty() {
        let all = place(ctx, rest, bounds, arr);
        if fits(&all, bounds) {
            out.push(start_page(all, new_page));
            break;
        }

        let row = arr.columns.max(1).min(rest.len());
        let first = place(ctx, &rest[..row], bounds, arr);
        let (placed, used) = if fits(&first, bounds) {
            // `lo` items fit, `hi` items do not.
            let (mut lo, mut lo_placed) = (row, first);
            let (mut hi, mut hi_bottom) = (rest.len(), all.actual.bottom);
            while hi > lo + 1 {
                let lo_bottom = lo_placed.actual.bottom;
                let t = if hi_bottom > lo_bottom {
                    (bounds.bottom - lo_bottom) / (hi_bottom - lo_bottom)
                } else {
                    0.5
                };
                let guess = (lo as f64 + t * (hi - lo) as f64 - 0.5).round();
                let mid = (guess.max(0.0) as usize).clamp(lo + 1, hi - 1);
                let attempt = place(ctx, &rest[..mid], bounds, arr);
                if fits(&attempt, bounds) {
                    lo = mid;
                    lo_placed = attempt;
                } else {
                    hi = mid;
                    hi_bottom = attempt.actual.bottom;
                }
            }
            (lo_placed, lo)
        } else if !is_full_page(bounds, page) {
            bounds = page;
            new_page = true;
            continue;
        } else {
            ctx.warnings.push(
                WarningKind::SectionTooTall,
                format!(
                    "even an empty page cannot fit one row of blocks ({:.1}pt needed, {:.1}pt available)",
                    first.actual.height(),
                    page.height()
                ),
            );
            (first, row)
        };

        tracing::debug!(placed = used, remaining = rest.len() - used, "section continues on a new page");
        out.push(start_page(placed, new_page));
        rest = &rest[used..];
        bounds = page;
        new_page = true;
    }
    out
}

fn place(
    ctx: &mut LayoutContext<'_>,
    items: &[Placeable<'_>],
    bounds: Rect,
    arr: Arrangement,
) -> Placed {
    place_columns(ctx, items, bounds, arr.columns, arr.equal, arr.padding)
}

fn start_page(mut placed: Placed, new_page: bool) -> Placed {
    placed.page_break_before = new_page;
    placed
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::font::FontContext;
    use crate::layout::placed::DrawMethod;
    use crate::layout::LayoutSettings;
    use crate::style::ResolvedStyle;

    fn fixed(height: f64) -> Placeable<'static> {
        placeable(move |_, r: Rect| {
            Placed::rect(
                Rect::new(r.left, r.top, r.width(), height),
                Arc::new(ResolvedStyle::default()),
                DrawMethod::Fill,
                None,
            )
        })
    }

    fn one_column(padding: f64) -> Arrangement {
        Arrangement {
            columns: 1,
            equal: false,
            padding,
        }
    }

    fn items_per_group(groups: &[Placed]) -> Vec<usize> {
        groups
            .iter()
            .map(|g| g.children().iter().map(|c| c.children().len()).sum())
            .collect()
    }

    #[test]
    fn fitting_section_is_one_group() {
        let fonts = FontContext::new();
        let settings = LayoutSettings::default();
        let mut ctx = LayoutContext::new(&fonts, &settings);
        let page = Rect::new(0.0, 0.0, 200.0, 180.0);
        let items = vec![fixed(50.0), fixed(50.0)];
        let groups = stack_section(&mut ctx, &items, page, page, one_column(6.0));
        assert_eq!(groups.len(), 1);
        assert!(!groups[0].page_break_before);
    }

    #[test]
    fn ten_blocks_break_over_four_pages() {
        let fonts = FontContext::new();
        let settings = LayoutSettings::default();
        let mut ctx = LayoutContext::new(&fonts, &settings);
        let page = Rect::new(0.0, 0.0, 200.0, 180.0);
        let items: Vec<Placeable> = (0..10).map(|_| fixed(50.0)).collect();
        let groups = stack_section(&mut ctx, &items, page, page, one_column(6.0));
        assert_eq!(items_per_group(&groups), vec![3, 3, 3, 1]);
        assert!(!groups[0].page_break_before);
        assert!(groups[1..].iter().all(|g| g.page_break_before));
        assert!(groups.iter().all(|g| g.actual.bottom <= 180.0));
        assert!(ctx.warnings.is_empty());
    }

    #[test]
    fn section_moves_to_next_page_when_nothing_fits() {
        let fonts = FontContext::new();
        let settings = LayoutSettings::default();
        let mut ctx = LayoutContext::new(&fonts, &settings);
        let page = Rect::new(0.0, 0.0, 200.0, 180.0);
        let below = Rect::from_edges(0.0, 150.0, 200.0, 180.0);
        let items = vec![fixed(50.0)];
        let groups = stack_section(&mut ctx, &items, below, page, one_column(6.0));
        assert_eq!(groups.len(), 1);
        assert!(groups[0].page_break_before);
        assert_eq!(groups[0].actual.top, 0.0);
    }

    #[test]
    fn oversized_block_warns_and_is_placed() {
        let fonts = FontContext::new();
        let settings = LayoutSettings::default();
        let mut ctx = LayoutContext::new(&fonts, &settings);
        let page = Rect::new(0.0, 0.0, 200.0, 180.0);
        let items = vec![fixed(300.0), fixed(20.0)];
        let groups = stack_section(&mut ctx, &items, page, page, one_column(6.0));
        assert_eq!(ctx.warnings.count(WarningKind::SectionTooTall), 1);
        assert_eq!(items_per_group(&groups), vec![1, 1]);
        assert_eq!(groups[0].actual.height(), 300.0);
        assert!(groups[1].page_break_before);
    }

    #[test]
    fn two_columns_break_by_rows() {
        let fonts = FontContext::new();
        let settings = LayoutSettings::default();
        let mut ctx = LayoutContext::new(&fonts, &settings);
        let page = Rect::new(0.0, 0.0, 300.0, 120.0);
        let items: Vec<Placeable> = (0..6).map(|_| fixed(50.0)).collect();
        let arr = Arrangement {
            columns: 2,
            equal: true,
            padding: 6.0,
        };
        let groups = stack_section(&mut ctx, &items, page, page, arr);
        assert_eq!(items_per_group(&groups), vec![4, 2]);
        assert!(groups.iter().all(|g| g.actual.bottom <= 120.0));
    }
}
