//! Glyph geometry in y-down pixel space.
//!
//! Everything here is measured in pixels at the resolved point size,
//! relative to the glyph's pen origin on the baseline. Ink above the
//! baseline has negative y, matching the raster the packer draws into.

use serde::{Deserialize, Serialize};

/// Curve flattening step in pixels (approximate chord length).
const FLATTEN_STEP: f32 = 1.5;

/// Upper bound on line segments emitted per curve.
const MAX_CURVE_SEGMENTS: usize = 32;

#[derive(Clone, Copy, Serialize, Deserialize, Debug, Default, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    fn distance(self, other: Point) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    fn lerp(self, other: Point, t: f32) -> Point {
        Point::new(
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
        )
    }
}

/// Axis-aligned box given by its min and max corners.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, Default, PartialEq)]
pub struct Rect {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl Rect {
    pub const ZERO: Rect = Rect::new(0.0, 0.0, 0.0, 0.0);

    pub const fn new(min_x: f32, min_y: f32, max_x: f32, max_y: f32) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Zero-area box sitting at `p`.
    pub const fn at(p: Point) -> Self {
        Self::new(p.x, p.y, p.x, p.y)
    }

    pub fn width(&self) -> f32 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f32 {
        self.max_y - self.min_y
    }

    /// True when the box covers no area.
    pub fn is_empty(&self) -> bool {
        self.width() <= 0.0 || self.height() <= 0.0
    }

    pub fn translate(&self, dx: f32, dy: f32) -> Rect {
        Rect::new(
            self.min_x + dx,
            self.min_y + dy,
            self.max_x + dx,
            self.max_y + dy,
        )
    }

    /// Grow the box to include `p`.
    pub fn include(&mut self, p: Point) {
        self.min_x = self.min_x.min(p.x);
        self.min_y = self.min_y.min(p.y);
        self.max_x = self.max_x.max(p.x);
        self.max_y = self.max_y.max(p.y);
    }
}

/// A filled glyph outline, flattened to polygons.
///
/// Curves are subdivided on insertion so the rasterizer only ever sees
/// straight edges. Contours are implicitly closed; the fill rule is
/// nonzero winding.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OutlinePath {
    contours: Vec<Vec<Point>>,
    start: Point,
    pen: Point,
    open: bool,
}

impl OutlinePath {
    pub fn new() -> Self {
        Self::default()
    }

    /// Closed rectangle, wound clockwise in y-down space.
    pub fn rectangle(rect: Rect) -> Self {
        let mut path = Self::new();
        path.move_to(Point::new(rect.min_x, rect.min_y));
        path.line_to(Point::new(rect.max_x, rect.min_y));
        path.line_to(Point::new(rect.max_x, rect.max_y));
        path.line_to(Point::new(rect.min_x, rect.max_y));
        path.close();
        path
    }

    pub fn move_to(&mut self, to: Point) {
        self.contours.push(vec![to]);
        self.start = to;
        self.pen = to;
        self.open = true;
    }

    pub fn line_to(&mut self, to: Point) {
        if !self.open {
            // Drawing after close() continues from the contour start.
            let start = self.pen;
            self.move_to(start);
        }
        if let Some(contour) = self.contours.last_mut() {
            contour.push(to);
        }
        self.pen = to;
    }

    pub fn quad_to(&mut self, ctrl: Point, to: Point) {
        let from = self.pen;
        let n = segment_count(from.distance(ctrl) + ctrl.distance(to));
        for i in 1..=n {
            let t = i as f32 / n as f32;
            let a = from.lerp(ctrl, t);
            let b = ctrl.lerp(to, t);
            self.line_to(a.lerp(b, t));
        }
    }

    pub fn cubic_to(&mut self, ctrl1: Point, ctrl2: Point, to: Point) {
        let from = self.pen;
        let n = segment_count(from.distance(ctrl1) + ctrl1.distance(ctrl2) + ctrl2.distance(to));
        for i in 1..=n {
            let t = i as f32 / n as f32;
            let a = from.lerp(ctrl1, t);
            let b = ctrl1.lerp(ctrl2, t);
            let c = ctrl2.lerp(to, t);
            let ab = a.lerp(b, t);
            let bc = b.lerp(c, t);
            self.line_to(ab.lerp(bc, t));
        }
    }

    pub fn close(&mut self) {
        self.pen = self.start;
        self.open = false;
    }

    /// Flattened contours. The last point of each connects back to its first.
    pub fn contours(&self) -> &[Vec<Point>] {
        &self.contours
    }

    /// True when no contour encloses any area (e.g. the space glyph).
    pub fn is_empty(&self) -> bool {
        self.contours.iter().all(|c| c.len() < 3)
    }

    /// Bounds of every point on the path, or `None` when it has no ink.
    pub fn bounds(&self) -> Option<Rect> {
        if self.is_empty() {
            return None;
        }
        let mut points = self.contours.iter().filter(|c| c.len() >= 3).flatten();
        let first = *points.next()?;
        let mut rect = Rect::at(first);
        for p in points {
            rect.include(*p);
        }
        Some(rect)
    }

    pub fn translated(&self, dx: f32, dy: f32) -> OutlinePath {
        let shift = |p: &Point| Point::new(p.x + dx, p.y + dy);
        OutlinePath {
            contours: self
                .contours
                .iter()
                .map(|c| c.iter().map(shift).collect())
                .collect(),
            start: shift(&self.start),
            pen: shift(&self.pen),
            open: self.open,
        }
    }
}

fn segment_count(approx_length: f32) -> usize {
    ((approx_length / FLATTEN_STEP).ceil() as usize).clamp(1, MAX_CURVE_SEGMENTS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rectangle_bounds() {
        let path = OutlinePath::rectangle(Rect::new(1.0, -8.0, 5.0, 0.0));
        assert_eq!(path.contours().len(), 1);
        assert_eq!(path.bounds(), Some(Rect::new(1.0, -8.0, 5.0, 0.0)));
    }

    #[test]
    fn test_empty_path_has_no_bounds() {
        let path = OutlinePath::new();
        assert!(path.is_empty());
        assert!(path.bounds().is_none());
    }

    #[test]
    fn test_degenerate_contour_is_empty() {
        let mut path = OutlinePath::new();
        path.move_to(Point::new(0.0, 0.0));
        path.line_to(Point::new(4.0, 0.0));
        path.close();
        assert!(path.is_empty());
    }

    #[test]
    fn test_quad_ends_on_target() {
        let mut path = OutlinePath::new();
        path.move_to(Point::new(0.0, 0.0));
        path.quad_to(Point::new(10.0, 0.0), Point::new(10.0, 10.0));
        let last = *path.contours()[0].last().unwrap();
        assert!((last.x - 10.0).abs() < 1e-5);
        assert!((last.y - 10.0).abs() < 1e-5);
        assert!(path.contours()[0].len() > 3, "curve should be subdivided");
    }

    #[test]
    fn test_cubic_stays_in_hull() {
        let mut path = OutlinePath::new();
        path.move_to(Point::new(0.0, 0.0));
        path.cubic_to(Point::new(0.0, 20.0), Point::new(20.0, 20.0), Point::new(20.0, 0.0));
        path.close();
        let b = path.bounds().unwrap();
        assert!(b.min_x >= 0.0 && b.max_x <= 20.0);
        assert!(b.min_y >= 0.0 && b.max_y <= 20.0);
    }

    #[test]
    fn test_translated() {
        let path = OutlinePath::rectangle(Rect::new(0.0, 0.0, 2.0, 2.0)).translated(3.0, 4.0);
        assert_eq!(path.bounds(), Some(Rect::new(3.0, 4.0, 5.0, 6.0)));
    }

    #[test]
    fn test_line_after_close_starts_new_contour() {
        let mut path = OutlinePath::rectangle(Rect::new(0.0, 0.0, 2.0, 2.0));
        path.line_to(Point::new(5.0, 5.0));
        assert_eq!(path.contours().len(), 2);
        assert_eq!(path.contours()[1][0], Point::new(0.0, 0.0));
    }

    #[test]
    fn test_rect_include_and_empty() {
        let mut r = Rect::at(Point::new(1.0, 1.0));
        assert!(r.is_empty());
        r.include(Point::new(3.0, -1.0));
        assert_eq!(r, Rect::new(1.0, -1.0, 3.0, 1.0));
        assert!(!r.is_empty());
    }
}
