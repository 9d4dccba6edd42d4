//! Placed content: what layout produces and drawing consumes.
//!
//! Every node records the rectangle it was offered (`requested`), the one it
//! actually covers (`actual`) and a [`Quality`] summary the layout search
//! scores. Groups keep their children in their own coordinate frame plus an
//! offset, so moving a group never walks its subtree.

use std::sync::Arc;

use serde::Serialize;

use crate::error::LayoutError;
use crate::geom::{Point, Rect};
use crate::image_loader::ImageRef;
use crate::layout::path::Path;
use crate::layout::table::Table;
use crate::style::{Color, ResolvedStyle};
use crate::text::Paragraph;

/// How a rectangle or path is painted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DrawMethod {
    Fill,
    Stroke,
    Both,
}

/// How good a placement is, summed up the tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Quality {
    pub ok_breaks: usize,
    pub bad_breaks: usize,
    pub internal_variance: f64,
    /// Smallest unused trailing width of any text below; `None` when there
    /// is no text.
    pub unused_width: Option<f64>,
    /// Extra cost from content that failed to place.
    pub penalty: f64,
}

impl Quality {
    pub fn text(ok_breaks: usize, bad_breaks: usize, unused_width: f64) -> Self {
        Self {
            ok_breaks,
            bad_breaks,
            unused_width: Some(unused_width),
            ..Self::default()
        }
    }

    /// Combine the quality of siblings.
    pub fn combine(&self, other: &Quality) -> Quality {
        Quality {
            ok_breaks: self.ok_breaks + other.ok_breaks,
            bad_breaks: self.bad_breaks + other.bad_breaks,
            internal_variance: self.internal_variance + other.internal_variance,
            unused_width: match (self.unused_width, other.unused_width) {
                (Some(a), Some(b)) => Some(a.min(b)),
                (a, b) => a.or(b),
            },
            penalty: self.penalty + other.penalty,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    Paragraph(Paragraph),
    Table(Table),
    Image {
        image: ImageRef,
        style: Arc<ResolvedStyle>,
    },
    Rect {
        style: Arc<ResolvedStyle>,
        method: DrawMethod,
        radius: Option<f64>,
    },
    /// A path relative to the top-left of `actual`.
    Path {
        path: Path,
        style: Arc<ResolvedStyle>,
        method: DrawMethod,
    },
    /// Clips the siblings drawn after it.
    Clip(Path),
    Group {
        children: Vec<Placed>,
        /// Added to every child's coordinates.
        offset: Point,
    },
    /// Content that could not be placed, drawn as a red box.
    Error(LayoutError),
}

impl Content {
    pub fn kind(&self) -> &'static str {
        match self {
            Content::Paragraph(_) => "paragraph",
            Content::Table(_) => "table",
            Content::Image { .. } => "image",
            Content::Rect { .. } => "rect",
            Content::Path { .. } => "path",
            Content::Clip(_) => "clip",
            Content::Group { .. } => "group",
            Content::Error(_) => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Placed {
    pub requested: Rect,
    pub actual: Rect,
    pub quality: Quality,
    pub page_break_before: bool,
    pub content: Content,
}

impl Placed {
    fn leaf(requested: Rect, actual: Rect, quality: Quality, content: Content) -> Self {
        Self {
            requested,
            actual,
            quality,
            page_break_before: false,
            content,
        }
    }

    /// A wrapped paragraph with its top-left at the top-left of `requested`.
    pub fn paragraph(paragraph: Paragraph, requested: Rect) -> Self {
        let actual = Rect::new(
            requested.left,
            requested.top,
            paragraph.width.min(requested.width()),
            paragraph.height,
        );
        let quality = Quality::text(
            paragraph.ok_breaks,
            paragraph.bad_breaks,
            paragraph.unused_width,
        );
        Self::leaf(requested, actual, quality, Content::Paragraph(paragraph))
    }

    pub fn table(table: Table, requested: Rect) -> Self {
        let actual = Rect::new(
            requested.left,
            requested.top,
            table.width.min(requested.width()),
            table.height,
        );
        let unused = table.column_unused.iter().copied().reduce(f64::min);
        let quality = Quality {
            ok_breaks: table.ok_breaks,
            bad_breaks: table.bad_breaks,
            unused_width: unused,
            ..Quality::default()
        };
        Self::leaf(requested, actual, quality, Content::Table(table))
    }

    pub fn image(image: ImageRef, style: Arc<ResolvedStyle>, requested: Rect, actual: Rect) -> Self {
        Self::leaf(
            requested,
            actual,
            Quality::default(),
            Content::Image { image, style },
        )
    }

    pub fn rect(
        rect: Rect,
        style: Arc<ResolvedStyle>,
        method: DrawMethod,
        radius: Option<f64>,
    ) -> Self {
        Self::leaf(
            rect,
            rect,
            Quality::default(),
            Content::Rect {
                style,
                method,
                radius,
            },
        )
    }

    pub fn path(rect: Rect, path: Path, style: Arc<ResolvedStyle>, method: DrawMethod) -> Self {
        Self::leaf(
            rect,
            rect,
            Quality::default(),
            Content::Path {
                path,
                style,
                method,
            },
        )
    }

    pub fn clip(rect: Rect, path: Path) -> Self {
        Self::leaf(rect, rect, Quality::default(), Content::Clip(path))
    }

    /// Marks `requested` as failed. The penalty shrinks as the failed area
    /// grows so the search still prefers giving failing content more room.
    pub fn error(requested: Rect, error: LayoutError, error_base: f64) -> Self {
        let actual = requested.with_height(requested.height().clamp(0.0, 24.0));
        let quality = Quality {
            penalty: error_base - actual.area(),
            ..Quality::default()
        };
        tracing::debug!(%error, "placing error box at {:?}", actual);
        Self::leaf(requested, actual, quality, Content::Error(error))
    }

    /// Group `children` placed inside `requested`.
    pub fn group(requested: Rect, children: Vec<Placed>) -> Self {
        let actual = Rect::union_all(children.iter().map(|c| &c.actual))
            .unwrap_or_else(|| requested.with_height(0.0));
        let quality = children
            .iter()
            .fold(Quality::default(), |q, c| q.combine(&c.quality));
        Self::leaf(
            requested,
            actual,
            quality,
            Content::Group {
                children,
                offset: Point::default(),
            },
        )
    }

    pub fn with_variance(mut self, variance: f64) -> Self {
        self.quality.internal_variance = variance;
        self
    }

    /// Translate. Constant time: groups only shift their offset.
    pub fn move_by(&mut self, dx: f64, dy: f64) {
        self.requested = self.requested.move_by(dx, dy);
        self.actual = self.actual.move_by(dx, dy);
        if let Content::Group { offset, .. } = &mut self.content {
            offset.x += dx;
            offset.y += dy;
        }
    }

    pub fn moved(mut self, dx: f64, dy: f64) -> Self {
        self.move_by(dx, dy);
        self
    }

    pub fn children(&self) -> &[Placed] {
        match &self.content {
            Content::Group { children, .. } => children,
            _ => &[],
        }
    }

    /// Offset of this group's children, zero for leaves.
    pub fn offset(&self) -> Point {
        match &self.content {
            Content::Group { offset, .. } => *offset,
            _ => Point::default(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.content, Content::Error(_))
    }

    /// Whether this node or any node below it failed to place.
    pub fn has_errors(&self) -> bool {
        self.is_error() || self.children().iter().any(Placed::has_errors)
    }

    /// Visit every node with the offset that maps it to page coordinates.
    pub fn walk<'p>(&'p self, f: &mut impl FnMut(&'p Placed, Point)) {
        self.walk_from(Point::default(), f);
    }

    fn walk_from<'p>(&'p self, origin: Point, f: &mut impl FnMut(&'p Placed, Point)) {
        f(self, origin);
        if let Content::Group { children, offset } = &self.content {
            let inner = Point::new(origin.x + offset.x, origin.y + offset.y);
            for c in children {
                c.walk_from(inner, f);
            }
        }
    }
}

/// Style used to paint error boxes.
pub fn error_style() -> Arc<ResolvedStyle> {
    Arc::new(ResolvedStyle {
        name: "error".to_string(),
        background: Some(Color::RED),
        color: Color::RED,
        ..ResolvedStyle::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn style() -> Arc<ResolvedStyle> {
        Arc::new(ResolvedStyle::default())
    }

    fn boxed(left: f64, top: f64, w: f64, h: f64) -> Placed {
        Placed::rect(Rect::new(left, top, w, h), style(), DrawMethod::Fill, None)
    }

    #[test]
    fn group_actual_is_union() {
        let g = Placed::group(
            Rect::new(0.0, 0.0, 100.0, 100.0),
            vec![boxed(0.0, 0.0, 10.0, 10.0), boxed(20.0, 30.0, 10.0, 5.0)],
        );
        assert_eq!(g.actual, Rect::from_edges(0.0, 0.0, 30.0, 35.0));
    }

    #[test]
    fn moving_a_group_only_shifts_offset() {
        let mut g = Placed::group(
            Rect::new(0.0, 0.0, 100.0, 100.0),
            vec![boxed(5.0, 5.0, 10.0, 10.0)],
        );
        let before = g.clone();
        g.move_by(12.0, -7.0);
        assert_eq!(g.children()[0].actual, before.children()[0].actual);
        assert_eq!(g.offset(), Point::new(12.0, -7.0));
        g.move_by(-12.0, 7.0);
        assert_eq!(g, before);
    }

    #[test]
    fn walk_reports_page_coordinates() {
        let inner = Placed::group(
            Rect::new(0.0, 0.0, 50.0, 50.0),
            vec![boxed(1.0, 2.0, 3.0, 4.0)],
        )
        .moved(10.0, 10.0);
        let outer = Placed::group(Rect::new(0.0, 0.0, 100.0, 100.0), vec![inner]).moved(100.0, 0.0);
        let mut leaves = Vec::new();
        outer.walk(&mut |p, origin| {
            if !matches!(p.content, Content::Group { .. }) {
                leaves.push(p.actual.move_by(origin.x, origin.y));
            }
        });
        assert_eq!(leaves, vec![Rect::new(111.0, 12.0, 3.0, 4.0)]);
    }

    #[test]
    fn quality_combines_min_unused() {
        let a = Quality::text(1, 0, 12.0);
        let b = Quality::text(2, 1, 4.0);
        let c = a.combine(&b).combine(&Quality::default());
        assert_eq!(c.ok_breaks, 3);
        assert_eq!(c.bad_breaks, 1);
        assert_eq!(c.unused_width, Some(4.0));
    }

    #[test]
    fn error_penalty_shrinks_with_area() {
        let small = Placed::error(
            Rect::new(0.0, 0.0, 10.0, 10.0),
            LayoutError::TooSmall {
                needed: 40.0,
                available: 10.0,
            },
            1e9,
        );
        let large = Placed::error(
            Rect::new(0.0, 0.0, 30.0, 10.0),
            LayoutError::TooSmall {
                needed: 40.0,
                available: 30.0,
            },
            1e9,
        );
        assert!(small.quality.penalty > large.quality.penalty);
        assert!(small.has_errors());
    }
}
