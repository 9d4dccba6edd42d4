//! Vector outlines for shapes the layout draws: rounded rectangles, ovals,
//! hexagons, and the hand-drawn "rough" and saw-tooth "teeth" variants of
//! any of them.
//!
//! Paths are built in local coordinates with the origin at the top-left of
//! the shape's box and `y` growing downward. They are drawn at an offset, so
//! moving a placed shape never touches its path.

use serde::Serialize;

use crate::geom::{Point, Rect};
use crate::model::BlockId;

/// Bezier handle length for a quarter circle.
const KAPPA: f64 = 0.5522847498;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum PathOp {
    MoveTo(Point),
    LineTo(Point),
    CurveTo(Point, Point, Point),
    Close,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Path {
    ops: Vec<PathOp>,
}

impl Path {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ops(&self) -> &[PathOp] {
        &self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn move_to(mut self, x: f64, y: f64) -> Self {
        self.ops.push(PathOp::MoveTo(Point::new(x, y)));
        self
    }

    pub fn line_to(mut self, x: f64, y: f64) -> Self {
        self.ops.push(PathOp::LineTo(Point::new(x, y)));
        self
    }

    pub fn curve_to(mut self, c1: Point, c2: Point, to: Point) -> Self {
        self.ops.push(PathOp::CurveTo(c1, c2, to));
        self
    }

    /// Circular arc around `center`, angles in radians measured clockwise on
    /// the page (y down). Starts with a line from the current point, or a
    /// move when the path is empty.
    pub fn arc(mut self, center: Point, radius: f64, start: f64, end: f64) -> Self {
        let at = |a: f64| Point::new(center.x + radius * a.cos(), center.y + radius * a.sin());
        let first = at(start);
        self = if self.ops.is_empty() {
            self.move_to(first.x, first.y)
        } else {
            self.line_to(first.x, first.y)
        };
        let sweep = end - start;
        let pieces = (sweep.abs() / std::f64::consts::FRAC_PI_2).ceil().max(1.0) as usize;
        let step = sweep / pieces as f64;
        let k = 4.0 / 3.0 * (step / 4.0).tan();
        for i in 0..pieces {
            let a0 = start + step * i as f64;
            let a1 = a0 + step;
            let p0 = at(a0);
            let p3 = at(a1);
            let c1 = Point::new(p0.x - k * radius * a0.sin(), p0.y + k * radius * a0.cos());
            let c2 = Point::new(p3.x + k * radius * a1.sin(), p3.y - k * radius * a1.cos());
            self = self.curve_to(c1, c2, p3);
        }
        self
    }

    pub fn close(mut self) -> Self {
        self.ops.push(PathOp::Close);
        self
    }

    pub fn rect(width: f64, height: f64) -> Self {
        Path::new()
            .move_to(0.0, 0.0)
            .line_to(width, 0.0)
            .line_to(width, height)
            .line_to(0.0, height)
            .close()
    }

    /// Rectangle with circular corners; the radius is clamped to half the
    /// shorter side.
    pub fn rounded_rect(width: f64, height: f64, radius: f64) -> Self {
        let r = radius.min(width / 2.0).min(height / 2.0).max(0.0);
        if r <= 0.0 {
            return Self::rect(width, height);
        }
        let k = r * KAPPA;
        Path::new()
            .move_to(r, 0.0)
            .line_to(width - r, 0.0)
            .curve_to(
                Point::new(width - r + k, 0.0),
                Point::new(width, r - k),
                Point::new(width, r),
            )
            .line_to(width, height - r)
            .curve_to(
                Point::new(width, height - r + k),
                Point::new(width - r + k, height),
                Point::new(width - r, height),
            )
            .line_to(r, height)
            .curve_to(
                Point::new(r - k, height),
                Point::new(0.0, height - r + k),
                Point::new(0.0, height - r),
            )
            .line_to(0.0, r)
            .curve_to(Point::new(0.0, r - k), Point::new(r - k, 0.0), Point::new(r, 0.0))
            .close()
    }

    pub fn oval(width: f64, height: f64) -> Self {
        let (rx, ry) = (width / 2.0, height / 2.0);
        let (kx, ky) = (rx * KAPPA, ry * KAPPA);
        Path::new()
            .move_to(rx, 0.0)
            .curve_to(Point::new(rx + kx, 0.0), Point::new(width, ry - ky), Point::new(width, ry))
            .curve_to(
                Point::new(width, ry + ky),
                Point::new(rx + kx, height),
                Point::new(rx, height),
            )
            .curve_to(Point::new(rx - kx, height), Point::new(0.0, ry + ky), Point::new(0.0, ry))
            .curve_to(Point::new(0.0, ry - ky), Point::new(rx - kx, 0.0), Point::new(rx, 0.0))
            .close()
    }

    /// Hexagon with pointed left and right ends.
    pub fn hexagon(width: f64, height: f64) -> Self {
        let inset = (height / 2.0 * 0.577).min(width / 2.0);
        Path::new()
            .move_to(inset, 0.0)
            .line_to(width - inset, 0.0)
            .line_to(width, height / 2.0)
            .line_to(width - inset, height)
            .line_to(inset, height)
            .line_to(0.0, height / 2.0)
            .close()
    }

    /// Bounding box of every point, control points included.
    pub fn bounds(&self) -> Option<Rect> {
        let mut points = self.ops.iter().flat_map(|op| match op {
            PathOp::MoveTo(p) | PathOp::LineTo(p) => vec![*p],
            PathOp::CurveTo(a, b, c) => vec![*a, *b, *c],
            PathOp::Close => vec![],
        });
        let first = points.next()?;
        Some(points.fold(Rect::from_edges(first.x, first.y, first.x, first.y), |r, p| {
            Rect::from_edges(r.left.min(p.x), r.top.min(p.y), r.right.max(p.x), r.bottom.max(p.y))
        }))
    }

    /// The outline as closed polylines, curves split into straight pieces
    /// no longer than `step`.
    pub fn flatten(&self, step: f64) -> Vec<Vec<Point>> {
        let step = step.max(0.5);
        let mut polys: Vec<Vec<Point>> = Vec::new();
        let mut current: Vec<Point> = Vec::new();
        for op in &self.ops {
            match *op {
                PathOp::MoveTo(p) => {
                    if current.len() > 1 {
                        polys.push(std::mem::take(&mut current));
                    }
                    current = vec![p];
                }
                PathOp::LineTo(p) => {
                    if let Some(&from) = current.last() {
                        current.extend(subdivide(from, p, step));
                    } else {
                        current.push(p);
                    }
                }
                PathOp::CurveTo(c1, c2, to) => {
                    let Some(&from) = current.last() else {
                        current.push(to);
                        continue;
                    };
                    let approx = distance(from, c1) + distance(c1, c2) + distance(c2, to);
                    let n = (approx / step).ceil().max(1.0) as usize;
                    for i in 1..=n {
                        current.push(bezier(from, c1, c2, to, i as f64 / n as f64));
                    }
                }
                PathOp::Close => {
                    if let (Some(&first), Some(&last)) = (current.first(), current.last()) {
                        if distance(first, last) > 1e-9 {
                            current.extend(subdivide(last, first, step));
                        }
                    }
                    if current.len() > 1 {
                        polys.push(std::mem::take(&mut current));
                    }
                }
            }
        }
        if current.len() > 1 {
            polys.push(current);
        }
        polys
    }

    /// A wobbly hand-drawn version of the outline. Every point is displaced
    /// by up to `amount` in each direction.
    pub fn roughened(&self, amount: f64, seed: u64) -> Path {
        let mut rng = XorShift::new(seed);
        let mut out = Path::new();
        for poly in self.flatten(6.0) {
            let n = closed_len(&poly);
            for (i, p) in poly.iter().take(n).enumerate() {
                let q = Point::new(
                    p.x + rng.symmetric() * amount,
                    p.y + rng.symmetric() * amount,
                );
                out = if i == 0 {
                    out.move_to(q.x, q.y)
                } else {
                    out.line_to(q.x, q.y)
                };
            }
            out = out.close();
        }
        out
    }

    /// A saw-tooth version of the outline: points alternate between the
    /// outline and `depth` inside it, with slightly uneven tooth depths.
    pub fn toothed(&self, depth: f64, seed: u64) -> Path {
        let mut rng = XorShift::new(seed);
        let tooth = (depth * 2.0).max(2.0);
        let mut out = Path::new();
        for poly in self.flatten(tooth) {
            let n = closed_len(&poly);
            let inward = orientation(&poly[..n]);
            for i in 0..n {
                let p = poly[i];
                let q = if i % 2 == 1 {
                    let prev = poly[(i + n - 1) % n];
                    let next = poly[(i + 1) % n];
                    let (dx, dy) = (next.x - prev.x, next.y - prev.y);
                    let len = (dx * dx + dy * dy).sqrt().max(1e-9);
                    let d = depth * (0.75 + 0.5 * rng.unit());
                    // Normal pointing into the shape.
                    Point::new(p.x - inward * dy / len * d, p.y + inward * dx / len * d)
                } else {
                    p
                };
                out = if i == 0 {
                    out.move_to(q.x, q.y)
                } else {
                    out.line_to(q.x, q.y)
                };
            }
            out = out.close();
        }
        out
    }
}

/// Seed for decorative noise. Depends only on the block and the shape size,
/// so a shape keeps its outline wherever it is moved.
pub fn decoration_seed(block: BlockId, width: f64, height: f64) -> u64 {
    let w = width.round().max(0.0) as u64;
    let h = height.round().max(0.0) as u64;
    splitmix64(((block.0 as u64) << 32) ^ (w << 16) ^ h)
}

fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    x = (x ^ (x >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    x ^ (x >> 31)
}

/// Small deterministic generator for decoration noise.
struct XorShift(u64);

impl XorShift {
    fn new(seed: u64) -> Self {
        Self(splitmix64(seed) | 1)
    }

    fn next(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }

    /// Uniform in [0, 1).
    fn unit(&mut self) -> f64 {
        (self.next() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Uniform in [-1, 1).
    fn symmetric(&mut self) -> f64 {
        self.unit() * 2.0 - 1.0
    }
}

fn distance(a: Point, b: Point) -> f64 {
    ((b.x - a.x).powi(2) + (b.y - a.y).powi(2)).sqrt()
}

/// Points after `from` up to and including `to`, at most `step` apart.
fn subdivide(from: Point, to: Point, step: f64) -> Vec<Point> {
    let n = (distance(from, to) / step).ceil().max(1.0) as usize;
    (1..=n)
        .map(|i| {
            let t = i as f64 / n as f64;
            Point::new(from.x + (to.x - from.x) * t, from.y + (to.y - from.y) * t)
        })
        .collect()
}

fn bezier(p0: Point, p1: Point, p2: Point, p3: Point, t: f64) -> Point {
    let u = 1.0 - t;
    let (a, b, c, d) = (u * u * u, 3.0 * u * u * t, 3.0 * u * t * t, t * t * t);
    Point::new(
        a * p0.x + b * p1.x + c * p2.x + d * p3.x,
        a * p0.y + b * p1.y + c * p2.y + d * p3.y,
    )
}

/// Number of distinct points in a closed polyline (drops a repeated start).
fn closed_len(poly: &[Point]) -> usize {
    match (poly.first(), poly.last()) {
        (Some(&a), Some(&b)) if poly.len() > 1 && distance(a, b) < 1e-9 => poly.len() - 1,
        _ => poly.len(),
    }
}

/// +1 for clockwise on the page (y down), -1 otherwise.
fn orientation(poly: &[Point]) -> f64 {
    let n = poly.len();
    let twice_area: f64 = (0..n)
        .map(|i| {
            let (a, b) = (poly[i], poly[(i + 1) % n]);
            a.x * b.y - b.x * a.y
        })
        .sum();
    if twice_area >= 0.0 {
        1.0
    } else {
        -1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close_to(a: Rect, b: Rect, tol: f64) -> bool {
        (a.left - b.left).abs() < tol
            && (a.top - b.top).abs() < tol
            && (a.right - b.right).abs() < tol
            && (a.bottom - b.bottom).abs() < tol
    }

    #[test]
    fn shapes_fill_their_box() {
        let expected = Rect::new(0.0, 0.0, 60.0, 30.0);
        for path in [
            Path::rect(60.0, 30.0),
            Path::rounded_rect(60.0, 30.0, 8.0),
            Path::oval(60.0, 30.0),
            Path::hexagon(60.0, 30.0),
        ] {
            assert!(close_to(path.bounds().unwrap(), expected, 1e-9));
        }
    }

    #[test]
    fn oversized_radius_is_clamped() {
        let p = Path::rounded_rect(20.0, 10.0, 50.0);
        assert!(close_to(p.bounds().unwrap(), Rect::new(0.0, 0.0, 20.0, 10.0), 1e-9));
    }

    #[test]
    fn arc_quarter_ends_on_circle() {
        let p = Path::new().arc(Point::new(0.0, 0.0), 10.0, 0.0, std::f64::consts::FRAC_PI_2);
        match p.ops().last() {
            Some(PathOp::CurveTo(_, _, end)) => {
                assert!(end.x.abs() < 1e-9);
                assert!((end.y - 10.0).abs() < 1e-9);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn flatten_respects_step() {
        let polys = Path::rect(10.0, 10.0).flatten(2.5);
        assert_eq!(polys.len(), 1);
        let poly = &polys[0];
        for pair in poly.windows(2) {
            assert!(distance(pair[0], pair[1]) <= 2.5 + 1e-9);
        }
    }

    #[test]
    fn rough_is_deterministic_and_bounded() {
        let base = Path::rounded_rect(80.0, 40.0, 5.0);
        let seed = decoration_seed(BlockId(3), 80.0, 40.0);
        let a = base.roughened(1.5, seed);
        let b = base.roughened(1.5, seed);
        assert_eq!(a, b);
        let bounds = a.bounds().unwrap();
        assert!(close_to(bounds, Rect::new(0.0, 0.0, 80.0, 40.0), 1.5 + 1e-9));
        assert_ne!(a, base.roughened(1.5, seed + 1));
    }

    #[test]
    fn teeth_stay_inside() {
        let t = Path::rect(50.0, 20.0).toothed(2.0, 7);
        let b = t.bounds().unwrap();
        assert!(b.left >= -1e-9 && b.top >= -1e-9);
        assert!(b.right <= 50.0 + 1e-9 && b.bottom <= 20.0 + 1e-9);
    }

    #[test]
    fn seed_ignores_position_but_not_size() {
        let a = decoration_seed(BlockId(1), 100.0, 50.0);
        assert_eq!(a, decoration_seed(BlockId(1), 100.2, 49.8));
        assert_ne!(a, decoration_seed(BlockId(2), 100.0, 50.0));
        assert_ne!(a, decoration_seed(BlockId(1), 120.0, 50.0));
    }
}
