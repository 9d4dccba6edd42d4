//! # Column Allocation
//!
//! Spreads a sequence of placeables over up to `k` columns. Items keep their
//! order: column 0 takes the first items, column 1 the next ones, and so on.
//!
//! Two choices are searched for together. The outer search picks column
//! widths. For each width candidate, the inner search picks how many items
//! each column gets: every split is tried when there are few items, and a
//! second simplex search over item counts is used otherwise.
//!
//! A candidate is scored by laying it out. Tall columns, unbalanced columns,
//! text broken badly and items that did not fit all add to the cost; see
//! [`score_columns`].

use crate::error::LayoutError;
use crate::geom::{ColumnEdge, Rect};
use crate::layout::optimize::{divide_space, minimize, Objective};
use crate::layout::placed::Placed;
use crate::layout::{LayoutContext, LayoutSettings, Placeable};

/// One column of a candidate layout.
#[derive(Debug, Clone)]
pub struct Column {
    pub rect: Rect,
    pub items: Vec<Placed>,
    /// Items assigned to this column that ran past the overflow limit.
    pub unplaced: usize,
}

impl Column {
    pub fn height(&self) -> f64 {
        self.items
            .last()
            .map(|p| p.actual.bottom - self.rect.top)
            .unwrap_or(0.0)
    }
}

/// Place `items` into up to `columns` columns inside `bounds`.
///
/// The result is a group of column groups. Its internal variance is the
/// variance of the column heights.
pub fn place_columns(
    ctx: &mut LayoutContext<'_>,
    items: &[Placeable<'_>],
    bounds: Rect,
    columns: usize,
    equal: bool,
    padding: f64,
) -> Placed {
    let n = items.len();
    if n == 0 {
        return Placed::group(bounds, Vec::new());
    }
    let settings = ctx.settings;
    let requested = columns.max(1);
    let mut k = requested.min(n);

    let mut bounds = bounds;
    if equal && k < requested {
        // Keep the width every column would have had.
        let col = (bounds.width() - padding * (requested - 1) as f64) / requested as f64;
        bounds = bounds.make_column(ColumnEdge::Left, col * k as f64 + padding * (k - 1) as f64);
    }

    let min_col = settings.min_column_width.round().max(1.0) as i64;
    let granularity = settings.column_granularity.round().max(1.0) as i64;
    let available = |k: usize| bounds.width() - padding * (k - 1) as f64;
    while k > 1 && (available(k).floor() as i64) < k as i64 * min_col {
        k -= 1;
    }
    let available = available(k);
    let total = available.floor() as i64;
    let fraction = available - total as f64;

    let key = if k == 1 {
        Ok(vec![total])
    } else if equal {
        divide_space(&vec![1.0; k], total, min_col, granularity)
    } else {
        let mut search = WidthSearch {
            ctx: &mut *ctx,
            items,
            bounds,
            padding,
            total,
            fraction,
            min_col,
            granularity,
        };
        minimize(&mut search, k, &settings.optimizer).map(|o| o.key)
    };

    let widths = match key {
        Ok(key) => to_widths(&key, fraction),
        Err(LayoutError::BadParameters { .. }) | Err(LayoutError::TooSmall { .. }) => {
            return Placed::error(
                bounds,
                LayoutError::TooSmall {
                    needed: (k as i64 * min_col) as f64,
                    available,
                },
                settings.weights.error_base,
            )
        }
    };

    let (counts, score) = best_split(ctx, items, bounds, &widths, padding);
    tracing::debug!(?widths, ?counts, score, "chose column layout");
    let cols = fill_columns(ctx, items, bounds, &widths, &counts, padding, false);
    emit(bounds, cols)
}

fn to_widths(key: &[i64], fraction: f64) -> Vec<f64> {
    let mut widths: Vec<f64> = key.iter().map(|w| *w as f64).collect();
    if let Some(last) = widths.last_mut() {
        *last += fraction;
    }
    widths
}

fn emit(bounds: Rect, cols: Vec<Column>) -> Placed {
    let heights: Vec<f64> = cols.iter().map(Column::height).collect();
    let groups = cols
        .into_iter()
        .map(|c| Placed::group(c.rect, c.items))
        .collect();
    Placed::group(bounds, groups).with_variance(variance(&heights))
}

/// Lay items into columns of the given widths, `counts[i]` items in column
/// `i`. With `stop_at_overflow`, a column stops taking items once one ends
/// below the overflow limit; the rest count as unplaced.
pub fn fill_columns(
    ctx: &mut LayoutContext<'_>,
    items: &[Placeable<'_>],
    bounds: Rect,
    widths: &[f64],
    counts: &[usize],
    padding: f64,
    stop_at_overflow: bool,
) -> Vec<Column> {
    let limit = bounds.bottom + ctx.settings.overflow_allowance * bounds.height();
    let mut cols = Vec::with_capacity(widths.len());
    let mut left = bounds.left;
    let mut next = 0;

    for (width, count) in widths.iter().zip(counts) {
        let rect = bounds.column_at(left, *width);
        let mut col = Column {
            rect,
            items: Vec::with_capacity(*count),
            unplaced: 0,
        };
        let mut top = bounds.top;
        let end = (next + count).min(items.len());
        for (i, item) in items[next..end].iter().enumerate() {
            let slot = Rect::from_edges(rect.left, top, rect.right, bounds.bottom.max(top));
            let placed = item(ctx, slot);
            if stop_at_overflow && placed.actual.bottom > limit {
                col.unplaced = end - next - i;
                break;
            }
            top = placed.actual.bottom + padding;
            col.items.push(placed);
        }
        next = end;
        left += width + padding;
        cols.push(col);
    }
    cols
}

/// Cost of a candidate; lower is better.
pub fn score_columns(cols: &[Column], settings: &LayoutSettings) -> f64 {
    let w = &settings.weights;
    let heights: Vec<f64> = cols.iter().map(Column::height).collect();
    let max_h = heights.iter().copied().fold(0.0, f64::max);
    let min_h = heights.iter().copied().fold(f64::INFINITY, f64::min);

    let mut breaks = 0.0;
    let mut fit = 0.0;
    let mut penalty = 0.0;
    let mut unplaced = 0;
    for col in cols {
        let mut unused: Option<f64> = None;
        for p in &col.items {
            breaks += w.breaks_cost(p.quality.bad_breaks, p.quality.ok_breaks);
            penalty += p.quality.penalty;
            if let Some(u) = p.quality.unused_width {
                unused = Some(unused.map_or(u, |m| m.min(u)));
            }
        }
        fit += w.fit_cost(unused.unwrap_or(0.0));
        unplaced += col.unplaced;
    }

    let stddev = variance(&heights).sqrt();
    let ratio = if min_h > 0.0 && min_h.is_finite() {
        (max_h / min_h - 1.0).max(0.0)
    } else {
        0.0
    };
    let balance = stddev / w.stddev_divisor * (1.0 + ratio).powi(2);

    max_h + breaks + fit + balance + w.unplaced * unplaced as f64 + penalty
}

fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n
}

/// Every way to cut `n` items into `k` non-empty runs, in lexicographic
/// order.
pub fn compositions(n: usize, k: usize) -> Vec<Vec<usize>> {
    fn go(n: usize, k: usize, prefix: &mut Vec<usize>, out: &mut Vec<Vec<usize>>) {
        if k == 1 {
            prefix.push(n);
            out.push(prefix.clone());
            prefix.pop();
            return;
        }
        for first in 1..=n.saturating_sub(k - 1) {
            prefix.push(first);
            go(n - first, k - 1, prefix, out);
            prefix.pop();
        }
    }
    let mut out = Vec::new();
    if k > 0 && n >= k {
        go(n, k, &mut Vec::with_capacity(k), &mut out);
    }
    out
}

/// The best split of the items for fixed column widths, and its score.
fn best_split(
    ctx: &mut LayoutContext<'_>,
    items: &[Placeable<'_>],
    bounds: Rect,
    widths: &[f64],
    padding: f64,
) -> (Vec<usize>, f64) {
    let n = items.len();
    let k = widths.len();
    if k <= 1 {
        let counts = vec![n];
        let cols = fill_columns(ctx, items, bounds, widths, &counts, padding, true);
        let score = score_columns(&cols, ctx.settings);
        return (counts, score);
    }

    let settings = ctx.settings;
    if n < settings.brute_force_limit {
        let mut best: Option<(Vec<usize>, f64)> = None;
        for counts in compositions(n, k) {
            let cols = fill_columns(ctx, items, bounds, widths, &counts, padding, true);
            let score = score_columns(&cols, settings);
            if best.as_ref().map_or(true, |(_, b)| score < *b) {
                best = Some((counts, score));
            }
        }
        if let Some(best) = best {
            return best;
        }
    } else {
        let mut search = CountSearch {
            ctx: &mut *ctx,
            items,
            bounds,
            widths,
            padding,
        };
        if let Ok(opt) = minimize(&mut search, k, &settings.optimizer) {
            let counts = opt.key.iter().map(|c| *c as usize).collect();
            return (counts, opt.score);
        }
    }

    // Fewer items than columns cannot happen here; fall back to even counts.
    let counts = divide_space(&vec![1.0; k], n as i64, 1, 1)
        .map(|c| c.into_iter().map(|v| v as usize).collect())
        .unwrap_or_else(|_| vec![n]);
    let cols = fill_columns(ctx, items, bounds, widths, &counts, padding, true);
    let score = score_columns(&cols, settings);
    (counts, score)
}

struct WidthSearch<'c, 'f, 'i> {
    ctx: &'c mut LayoutContext<'f>,
    items: &'c [Placeable<'i>],
    bounds: Rect,
    padding: f64,
    total: i64,
    fraction: f64,
    min_col: i64,
    granularity: i64,
}

impl Objective for WidthSearch<'_, '_, '_> {
    fn discretize(&self, x: &[f64]) -> Result<Vec<i64>, LayoutError> {
        divide_space(x, self.total, self.min_col, self.granularity)
    }

    fn score(&mut self, key: &[i64]) -> f64 {
        let widths = to_widths(key, self.fraction);
        best_split(self.ctx, self.items, self.bounds, &widths, self.padding).1
    }
}

struct CountSearch<'c, 'f, 'i> {
    ctx: &'c mut LayoutContext<'f>,
    items: &'c [Placeable<'i>],
    bounds: Rect,
    widths: &'c [f64],
    padding: f64,
}

impl Objective for CountSearch<'_, '_, '_> {
    fn discretize(&self, x: &[f64]) -> Result<Vec<i64>, LayoutError> {
        divide_space(x, self.items.len() as i64, 1, 1)
    }

    fn score(&mut self, key: &[i64]) -> f64 {
        let counts: Vec<usize> = key.iter().map(|c| *c as usize).collect();
        let cols = fill_columns(
            self.ctx,
            self.items,
            self.bounds,
            self.widths,
            &counts,
            self.padding,
            true,
        );
        score_columns(&cols, self.ctx.settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::FontContext;
    use crate::layout::placeable;
    use crate::layout::placed::DrawMethod;
    use crate::style::ResolvedStyle;
    use std::sync::Arc;

    /// An item of fixed height that fills its width.
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

    /// An item whose area is fixed: narrower columns make it taller.
    fn area(area: f64) -> Placeable<'static> {
        placeable(move |_, r: Rect| {
            Placed::rect(
                Rect::new(r.left, r.top, r.width(), area / r.width()),
                Arc::new(ResolvedStyle::default()),
                DrawMethod::Fill,
                None,
            )
        })
    }

    fn column_heights(p: &Placed) -> Vec<f64> {
        p.children()
            .iter()
            .map(|c| c.actual.height().max(0.0))
            .collect()
    }

    #[test]
    fn compositions_enumerate_ordered_splits() {
        assert_eq!(
            compositions(4, 2),
            vec![vec![1, 3], vec![2, 2], vec![3, 1]]
        );
        assert_eq!(compositions(5, 3).len(), 6);
        assert!(compositions(2, 3).is_empty());
    }

    #[test]
    fn single_item_takes_the_full_width() {
        let fonts = FontContext::new();
        let settings = LayoutSettings::default();
        let mut ctx = LayoutContext::new(&fonts, &settings);
        let bounds = Rect::new(10.0, 20.0, 180.0, 500.0);
        let items = vec![fixed(30.0)];
        let placed = place_columns(&mut ctx, &items, bounds, 1, false, 6.0);
        let col = &placed.children()[0];
        let item = &col.children()[0];
        assert_eq!(item.actual, Rect::new(10.0, 20.0, 180.0, 30.0));
    }

    #[test]
    fn three_blocks_in_two_columns_balance() {
        let fonts = FontContext::new();
        let settings = LayoutSettings::default();
        let mut ctx = LayoutContext::new(&fonts, &settings);
        let items = vec![fixed(40.0), fixed(40.0), fixed(40.0)];
        let placed = place_columns(&mut ctx, &items, Rect::new(0.0, 0.0, 200.0, 500.0), 2, false, 6.0);
        let heights = column_heights(&placed);
        assert_eq!(heights.len(), 2);
        let counts: Vec<usize> = placed.children().iter().map(|c| c.children().len()).collect();
        assert!(counts == vec![2, 1] || counts == vec![1, 2], "{counts:?}");
        assert!((heights[0] - heights[1]).abs() <= 40.0 + 6.0);
    }

    #[test]
    fn equal_columns_share_width() {
        let fonts = FontContext::new();
        let settings = LayoutSettings::default();
        let mut ctx = LayoutContext::new(&fonts, &settings);
        let items = vec![fixed(10.0), fixed(10.0), fixed(10.0), fixed(10.0)];
        let placed = place_columns(&mut ctx, &items, Rect::new(0.0, 0.0, 312.0, 500.0), 3, true, 6.0);
        let widths: Vec<f64> = placed.children().iter().map(|c| c.requested.width()).collect();
        assert_eq!(widths, vec![100.0, 100.0, 100.0]);
    }

    #[test]
    fn equal_columns_keep_width_with_fewer_items() {
        let fonts = FontContext::new();
        let settings = LayoutSettings::default();
        let mut ctx = LayoutContext::new(&fonts, &settings);
        let items = vec![fixed(10.0)];
        let placed = place_columns(&mut ctx, &items, Rect::new(0.0, 0.0, 312.0, 500.0), 3, true, 6.0);
        assert_eq!(placed.children().len(), 1);
        assert_eq!(placed.children()[0].requested.width(), 100.0);
    }

    #[test]
    fn many_items_use_the_nested_search() {
        let fonts = FontContext::new();
        let settings = LayoutSettings::default();
        let mut ctx = LayoutContext::new(&fonts, &settings);
        let items: Vec<Placeable> = (0..12).map(|_| fixed(20.0)).collect();
        let placed = place_columns(&mut ctx, &items, Rect::new(0.0, 0.0, 300.0, 1000.0), 3, false, 4.0);
        let counts: Vec<usize> = placed.children().iter().map(|c| c.children().len()).collect();
        assert_eq!(counts.iter().sum::<usize>(), 12);
        assert!(counts.iter().all(|c| *c >= 1));
        let heights = column_heights(&placed);
        let spread = heights.iter().copied().fold(0.0, f64::max)
            - heights.iter().copied().fold(f64::INFINITY, f64::min);
        assert!(spread <= 2.0 * 24.0, "{heights:?}");
    }

    #[test]
    fn wider_column_for_taller_content() {
        let fonts = FontContext::new();
        let settings = LayoutSettings::default();
        let mut ctx = LayoutContext::new(&fonts, &settings);
        let items = vec![area(20000.0), area(5000.0)];
        let placed = place_columns(&mut ctx, &items, Rect::new(0.0, 0.0, 305.0, 1000.0), 2, false, 5.0);
        let widths: Vec<f64> = placed.children().iter().map(|c| c.requested.width()).collect();
        assert!(widths[0] > widths[1], "{widths:?}");
        assert!((widths.iter().sum::<f64>() + 5.0 - 305.0).abs() < 1e-9);
    }

    #[test]
    fn narrow_bounds_drop_columns() {
        let fonts = FontContext::new();
        let settings = LayoutSettings::default();
        let mut ctx = LayoutContext::new(&fonts, &settings);
        let items = vec![fixed(10.0), fixed(10.0), fixed(10.0)];
        let placed = place_columns(&mut ctx, &items, Rect::new(0.0, 0.0, 90.0, 500.0), 3, false, 6.0);
        assert_eq!(placed.children().len(), 2);
    }

    #[test]
    fn overflowing_items_count_as_unplaced() {
        let fonts = FontContext::new();
        let settings = LayoutSettings::default();
        let mut ctx = LayoutContext::new(&fonts, &settings);
        let items = vec![fixed(60.0), fixed(60.0)];
        let bounds = Rect::new(0.0, 0.0, 100.0, 100.0);
        let cols = fill_columns(&mut ctx, &items, bounds, &[100.0], &[2], 0.0, true);
        assert_eq!(cols[0].items.len(), 1);
        assert_eq!(cols[0].unplaced, 1);
        assert!(score_columns(&cols, &settings) >= 1e6);
    }
}
