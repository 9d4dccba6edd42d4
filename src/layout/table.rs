//! # Tables
//!
//! A table block turns each run into a row: separators split the run into
//! cells, cell `i` goes in column `i`, and the last cell of a row spans every
//! column that is left. A divider separator draws a thin rule in the gap
//! before its cell, a spacer only separates.
//!
//! [`arrange`] wraps every cell for a given set of column widths.
//! [`layout_table`] picks the widths, either evenly or by searching for the
//! split that makes the table short without breaking words.

use std::sync::Arc;

use serde::Serialize;

use crate::error::LayoutError;
use crate::font::FontContext;
use crate::geom::Rect;
use crate::layout::optimize::{divide_space, minimize, Objective, BAD};
use crate::layout::placed::Placed;
use crate::layout::{LayoutContext, ScoreWeights};
use crate::model::{Cell, ElementKind, Run};
use crate::style::ResolvedStyle;
use crate::text::{self, Paragraph};

/// Narrowest column a table accepts.
pub const MIN_TABLE_COLUMN: f64 = 10.0;

#[derive(Debug, Clone, PartialEq)]
pub struct TableCell {
    pub column: usize,
    /// Number of columns the cell covers.
    pub span: usize,
    /// Offset from the table's left edge.
    pub left: f64,
    pub width: f64,
    /// `None` for an empty cell.
    pub paragraph: Option<Paragraph>,
    /// Style of the rule drawn in the gap before this cell.
    pub divider_before: Option<Arc<ResolvedStyle>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    /// Offset from the table's top edge.
    pub top: f64,
    pub height: f64,
    pub cells: Vec<TableCell>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub rows: Vec<TableRow>,
    pub column_widths: Vec<f64>,
    /// Gap between columns and between rows.
    pub padding: f64,
    pub width: f64,
    pub height: f64,
    pub ok_breaks: usize,
    pub bad_breaks: usize,
    /// Per column, the least unused width of any cell in it.
    pub column_unused: Vec<f64>,
}

/// Width summary reported in layout dumps.
#[derive(Debug, Clone, Serialize)]
pub struct TableSummary {
    pub columns: Vec<f64>,
    pub rows: usize,
}

impl Table {
    pub fn column_count(&self) -> usize {
        self.column_widths.len()
    }

    pub fn summary(&self) -> TableSummary {
        TableSummary {
            columns: self.column_widths.clone(),
            rows: self.rows.len(),
        }
    }
}

/// Cut runs into rows of cells.
pub fn table_rows(runs: &[Run]) -> Vec<Vec<Cell>> {
    runs.iter().map(Run::cells).collect()
}

/// Number of columns the rows need.
pub fn column_count(rows: &[Vec<Cell>]) -> usize {
    rows.iter().map(Vec::len).max().unwrap_or(0).max(1)
}

/// Wrap every cell for the given column widths.
///
/// Fails with [`LayoutError::TooSmall`] when the columns average less than
/// [`MIN_TABLE_COLUMN`].
pub fn arrange(
    fonts: &FontContext,
    rows: &[Vec<Cell>],
    column_widths: &[f64],
    padding: f64,
) -> Result<Table, LayoutError> {
    let ncols = column_widths.len().max(1);
    let total: f64 = column_widths.iter().sum();
    let needed = MIN_TABLE_COLUMN * ncols as f64;
    if column_widths.is_empty() || total < needed {
        return Err(LayoutError::TooSmall {
            needed,
            available: total,
        });
    }

    let mut lefts = Vec::with_capacity(ncols);
    let mut x = 0.0;
    for w in column_widths {
        lefts.push(x);
        x += w + padding;
    }
    let width = total + padding * (ncols - 1) as f64;

    let mut column_unused = vec![f64::INFINITY; ncols];
    let mut ok_breaks = 0;
    let mut bad_breaks = 0;
    let mut out_rows = Vec::with_capacity(rows.len());
    let mut top = 0.0;

    for row in rows {
        let mut cells = Vec::with_capacity(row.len());
        let mut height: f64 = 0.0;
        let n = row.len().min(ncols);
        for (column, cell) in row.iter().take(n).enumerate() {
            let span = if column + 1 == n { ncols - column } else { 1 };
            let cell_width = column_widths[column..column + span].iter().sum::<f64>()
                + padding * (span - 1) as f64;

            let paragraph = if cell.run.is_empty() {
                None
            } else {
                let p = text::wrap(fonts, &cell.run, cell_width, cell.run.style.align);
                ok_breaks += p.ok_breaks;
                bad_breaks += p.bad_breaks;
                let share = p.unused_width / span as f64;
                for u in &mut column_unused[column..column + span] {
                    *u = u.min(share);
                }
                height = height.max(p.height);
                Some(p)
            };

            let divider_before = cell
                .separator_before
                .as_ref()
                .filter(|e| e.kind == ElementKind::Divider && column > 0)
                .map(|e| e.style.clone());

            cells.push(TableCell {
                column,
                span,
                left: lefts[column],
                width: cell_width,
                paragraph,
                divider_before,
            });
        }

        // A row of separators alone still takes a line.
        if height == 0.0 {
            height = row
                .first()
                .map(|c| c.run.style.leading())
                .unwrap_or_default();
        }
        out_rows.push(TableRow {
            top,
            height,
            cells,
        });
        top += height + padding;
    }
    let height = (top - padding).max(0.0);

    for u in &mut column_unused {
        if !u.is_finite() {
            *u = 0.0;
        }
    }

    Ok(Table {
        rows: out_rows,
        column_widths: column_widths.to_vec(),
        padding,
        width,
        height,
        ok_breaks,
        bad_breaks,
        column_unused,
    })
}

/// Score of a table candidate: its height plus the cost of its breaks and
/// of how well its text fills the columns.
pub fn table_cost(table: &Table, weights: &ScoreWeights) -> f64 {
    table.height
        + weights.breaks_cost(table.bad_breaks, table.ok_breaks)
        + table
            .column_unused
            .iter()
            .map(|u| weights.fit_cost(*u))
            .sum::<f64>()
}

struct ColumnSearch<'a> {
    fonts: &'a FontContext,
    weights: &'a ScoreWeights,
    rows: &'a [Vec<Cell>],
    padding: f64,
    total: i64,
    fraction: f64,
}

impl ColumnSearch<'_> {
    fn widths(&self, key: &[i64]) -> Vec<f64> {
        let mut widths: Vec<f64> = key.iter().map(|w| *w as f64).collect();
        if let Some(last) = widths.last_mut() {
            *last += self.fraction;
        }
        widths
    }
}

impl Objective for ColumnSearch<'_> {
    fn discretize(&self, x: &[f64]) -> Result<Vec<i64>, LayoutError> {
        divide_space(x, self.total, MIN_TABLE_COLUMN as i64, 1)
    }

    fn score(&mut self, key: &[i64]) -> f64 {
        match arrange(self.fonts, self.rows, &self.widths(key), self.padding) {
            Ok(t) => table_cost(&t, self.weights),
            Err(_) => BAD,
        }
    }
}

/// Lay out the runs as a table filling the width of `bounds`.
pub fn layout_table(
    ctx: &mut LayoutContext<'_>,
    runs: &[Run],
    bounds: Rect,
    padding: f64,
    equal: bool,
) -> Placed {
    let rows = table_rows(runs);
    let ncols = column_count(&rows);
    let available = bounds.width() - padding * (ncols - 1) as f64;
    let settings = ctx.settings;
    let weights = &settings.weights;

    let total = available.floor() as i64;
    let fraction = available - total as f64;
    let mut search = ColumnSearch {
        fonts: ctx.fonts,
        weights,
        rows: &rows,
        padding,
        total,
        fraction,
    };

    let key = if equal || ncols == 1 {
        divide_space(&vec![1.0; ncols], total, MIN_TABLE_COLUMN as i64, 1)
    } else {
        minimize(&mut search, ncols, &settings.optimizer).map(|o| o.key)
    };
    let result = key.and_then(|key| arrange(ctx.fonts, &rows, &search.widths(&key), padding));

    match result {
        Ok(table) => Placed::table(table, bounds),
        Err(LayoutError::BadParameters { .. }) => Placed::error(
            bounds,
            LayoutError::TooSmall {
                needed: MIN_TABLE_COLUMN * ncols as f64,
                available: available.max(0.0),
            },
            weights.error_base,
        ),
        Err(e) => Placed::error(bounds, e, weights.error_base),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::LayoutSettings;
    use crate::model::Element;

    fn run_of(parts: &[(&str, ElementKind)]) -> Run {
        let style = Arc::new(ResolvedStyle::default());
        Run::new(
            parts
                .iter()
                .map(|(v, k)| Element::new(*k, v, style.clone()))
                .collect(),
            style,
        )
    }

    fn label_value() -> Run {
        run_of(&[
            ("Label", ElementKind::Text),
            ("|", ElementKind::Divider),
            ("Value", ElementKind::Text),
        ])
    }

    #[test]
    fn last_cell_spans_remaining_columns() {
        let fonts = FontContext::new();
        let rows = table_rows(&[
            run_of(&[
                ("a", ElementKind::Text),
                ("", ElementKind::Spacer),
                ("b", ElementKind::Text),
                ("", ElementKind::Spacer),
                ("c", ElementKind::Text),
            ]),
            run_of(&[
                ("wide", ElementKind::Text),
                ("", ElementKind::Spacer),
                ("rest", ElementKind::Text),
            ]),
        ]);
        let t = arrange(&fonts, &rows, &[30.0, 30.0, 30.0], 4.0).unwrap();
        assert_eq!(t.width, 98.0);
        let second = &t.rows[1].cells[1];
        assert_eq!(second.span, 2);
        assert_eq!(second.left, 34.0);
        assert_eq!(second.width, 64.0);
    }

    #[test]
    fn dividers_are_recorded() {
        let fonts = FontContext::new();
        let t = arrange(&fonts, &table_rows(&[label_value()]), &[50.0, 50.0], 4.0).unwrap();
        let cells = &t.rows[0].cells;
        assert!(cells[0].divider_before.is_none());
        assert!(cells[1].divider_before.is_some());
    }

    #[test]
    fn too_narrow_fails() {
        let fonts = FontContext::new();
        let err = arrange(&fonts, &table_rows(&[label_value()]), &[8.0, 8.0], 2.0).unwrap_err();
        assert_eq!(
            err,
            LayoutError::TooSmall {
                needed: 20.0,
                available: 16.0
            }
        );
    }

    #[test]
    fn spacer_only_row_reserves_a_line() {
        let fonts = FontContext::new();
        let rows = table_rows(&[run_of(&[("", ElementKind::Spacer)])]);
        let t = arrange(&fonts, &rows, &[40.0, 40.0], 4.0).unwrap();
        assert_eq!(t.rows.len(), 1);
        assert!(t.rows[0].cells.iter().all(|c| c.paragraph.is_none()));
        assert!((t.height - 9.0 * 1.2).abs() < 1e-9);
    }

    #[test]
    fn layout_fills_the_width() {
        let fonts = FontContext::new();
        let settings = LayoutSettings::default();
        let mut ctx = LayoutContext::new(&fonts, &settings);
        let runs = vec![label_value(), label_value()];
        let bounds = Rect::new(10.0, 10.0, 180.5, 400.0);
        for equal in [true, false] {
            let placed = layout_table(&mut ctx, &runs, bounds, 6.0, equal);
            let crate::layout::placed::Content::Table(t) = &placed.content else {
                panic!("expected a table, got {}", placed.content.kind());
            };
            let sum: f64 = t.column_widths.iter().sum::<f64>() + 6.0;
            assert!((sum - 180.5).abs() < 1e-9);
            assert_eq!(t.rows[0].height, t.rows[1].height);
            assert!(placed.actual.width() <= placed.requested.width());
        }
    }

    #[test]
    fn narrow_table_places_error() {
        let fonts = FontContext::new();
        let settings = LayoutSettings::default();
        let mut ctx = LayoutContext::new(&fonts, &settings);
        let placed = layout_table(&mut ctx, &[label_value()], Rect::new(0.0, 0.0, 15.0, 50.0), 4.0, false);
        assert!(placed.is_error());
    }
}
