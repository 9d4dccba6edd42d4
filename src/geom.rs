//! # Geometry
//!
//! Points, extents, margins and axis-aligned rectangles in points (1/72 inch).
//! The origin is the top-left corner of the page and `y` grows downward, the
//! same convention the layout engine uses everywhere; the PDF back-end flips
//! the axis when it writes content streams.
//!
//! Every operation returns a new value. Nothing here mutates in place.

use std::ops::{Add, Sub};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A width and a height.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub width: f64,
    pub height: f64,
}

impl Extent {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn is_positive(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }
}

/// Edge values (top, right, bottom, left) used for margin and padding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Margins {
    #[serde(default)]
    pub top: f64,
    #[serde(default)]
    pub right: f64,
    #[serde(default)]
    pub bottom: f64,
    #[serde(default)]
    pub left: f64,
}

impl Margins {
    pub fn uniform(v: f64) -> Self {
        Self {
            top: v,
            right: v,
            bottom: v,
            left: v,
        }
    }

    pub fn symmetric(vertical: f64, horizontal: f64) -> Self {
        Self {
            top: vertical,
            right: horizontal,
            bottom: vertical,
            left: horizontal,
        }
    }

    pub fn horizontal(&self) -> f64 {
        self.left + self.right
    }

    pub fn vertical(&self) -> f64 {
        self.top + self.bottom
    }

    pub fn is_zero(&self) -> bool {
        self.top == 0.0 && self.right == 0.0 && self.bottom == 0.0 && self.left == 0.0
    }
}

/// Which edge a column is carved against in [`Rect::make_column`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColumnEdge {
    Left,
    Right,
}

/// An axis-aligned rectangle stored by its edges.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl Rect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            right: left + width,
            bottom: top + height,
        }
    }

    pub fn from_edges(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn from_extent(extent: Extent) -> Self {
        Self::new(0.0, 0.0, extent.width, extent.height)
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    pub fn extent(&self) -> Extent {
        Extent::new(self.width(), self.height())
    }

    pub fn area(&self) -> f64 {
        self.width().max(0.0) * self.height().max(0.0)
    }

    pub fn center(&self) -> Point {
        Point::new((self.left + self.right) / 2.0, (self.top + self.bottom) / 2.0)
    }

    pub fn top_left(&self) -> Point {
        Point::new(self.left, self.top)
    }

    pub fn move_by(&self, dx: f64, dy: f64) -> Self {
        Self {
            left: self.left + dx,
            top: self.top + dy,
            right: self.right + dx,
            bottom: self.bottom + dy,
        }
    }

    /// Move so the top-left corner lands on `(left, top)`.
    pub fn move_to(&self, left: f64, top: f64) -> Self {
        self.move_by(left - self.left, top - self.top)
    }

    /// Keep the top-left corner, change the size.
    pub fn resize(&self, width: f64, height: f64) -> Self {
        Self::new(self.left, self.top, width, height)
    }

    pub fn with_top(&self, top: f64) -> Self {
        Self { top, ..*self }
    }

    pub fn with_bottom(&self, bottom: f64) -> Self {
        Self { bottom, ..*self }
    }

    pub fn with_height(&self, height: f64) -> Self {
        Self {
            bottom: self.top + height,
            ..*self
        }
    }

    /// Carve a full-height column of `width` out of this rectangle, aligned
    /// to the given edge.
    pub fn make_column(&self, edge: ColumnEdge, width: f64) -> Self {
        match edge {
            ColumnEdge::Left => Self {
                right: self.left + width,
                ..*self
            },
            ColumnEdge::Right => Self {
                left: self.right - width,
                ..*self
            },
        }
    }

    /// A full-height column starting at an absolute `left` coordinate.
    pub fn column_at(&self, left: f64, width: f64) -> Self {
        Self {
            left,
            right: left + width,
            ..*self
        }
    }

    pub fn union(&self, other: &Rect) -> Self {
        Self {
            left: self.left.min(other.left),
            top: self.top.min(other.top),
            right: self.right.max(other.right),
            bottom: self.bottom.max(other.bottom),
        }
    }

    /// Union of a sequence of rectangles; `None` when empty.
    pub fn union_all<'a>(rects: impl IntoIterator<Item = &'a Rect>) -> Option<Self> {
        rects.into_iter().fold(None, |acc, r| match acc {
            None => Some(*r),
            Some(u) => Some(u.union(r)),
        })
    }

    pub fn contains_horizontally(&self, other: &Rect, tolerance: f64) -> bool {
        other.left >= self.left - tolerance && other.right <= self.right + tolerance
    }

    /// Round every edge to the nearest whole point.
    pub fn rounded(&self) -> Self {
        Self {
            left: self.left.round(),
            top: self.top.round(),
            right: self.right.round(),
            bottom: self.bottom.round(),
        }
    }
}

impl Add<Margins> for Rect {
    type Output = Rect;

    /// Grow by the margins.
    fn add(self, m: Margins) -> Rect {
        Rect {
            left: self.left - m.left,
            top: self.top - m.top,
            right: self.right + m.right,
            bottom: self.bottom + m.bottom,
        }
    }
}

impl Sub<Margins> for Rect {
    type Output = Rect;

    /// Shrink by the margins.
    fn sub(self, m: Margins) -> Rect {
        Rect {
            left: self.left + m.left,
            top: self.top + m.top,
            right: self.right - m.right,
            bottom: self.bottom - m.bottom,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn margins_grow_and_shrink_round_trip() {
        let r = Rect::new(10.0, 20.0, 100.0, 50.0);
        let m = Margins {
            top: 1.0,
            right: 2.0,
            bottom: 3.0,
            left: 4.0,
        };
        let inner = r - m;
        assert_eq!(inner, Rect::from_edges(14.0, 21.0, 108.0, 67.0));
        assert_eq!(inner + m, r);
    }

    #[test]
    fn move_is_reversible() {
        let r = Rect::new(3.0, 4.0, 10.0, 10.0);
        assert_eq!(r.move_by(17.0, -5.0).move_by(-17.0, 5.0), r);
        assert_eq!(r.move_to(0.0, 0.0), Rect::new(0.0, 0.0, 10.0, 10.0));
    }

    #[test]
    fn columns_carve_from_either_edge() {
        let r = Rect::new(0.0, 0.0, 100.0, 40.0);
        assert_eq!(r.make_column(ColumnEdge::Left, 30.0), Rect::new(0.0, 0.0, 30.0, 40.0));
        assert_eq!(r.make_column(ColumnEdge::Right, 30.0), Rect::new(70.0, 0.0, 30.0, 40.0));
        assert_eq!(r.column_at(50.0, 10.0), Rect::new(50.0, 0.0, 10.0, 40.0));
    }

    #[test]
    fn union_covers_both() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(5.0, -5.0, 10.0, 5.0);
        assert_eq!(a.union(&b), Rect::from_edges(0.0, -5.0, 15.0, 10.0));
        assert_eq!(Rect::union_all([a, b].iter()), Some(a.union(&b)));
        assert_eq!(Rect::union_all(std::iter::empty()), None);
    }

    #[test]
    fn resize_keeps_corner() {
        let r = Rect::new(5.0, 6.0, 1.0, 1.0).resize(20.0, 30.0);
        assert_eq!(r, Rect::new(5.0, 6.0, 20.0, 30.0));
        assert_eq!(r.extent(), Extent::new(20.0, 30.0));
    }
}
