use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};

/// Two directions are considered parallel when the unit cross product falls
/// below this threshold.
const PARALLEL_EPS: f64 = 1e-12;

/// Infinite line in point + direction form.
///
/// `dir` does not need to be normalized; fitted lines keep the scale the
/// fitter produced.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub point: Point2<f64>,
    pub dir: Vector2<f64>,
}

impl Line {
    pub fn new(point: Point2<f64>, dir: Vector2<f64>) -> Self {
        Self { point, dir }
    }

    /// Line through two points, directed from `a` to `b`.
    pub fn through(a: Point2<f64>, b: Point2<f64>) -> Self {
        Self {
            point: a,
            dir: b - a,
        }
    }

    /// Left-hand normal of the direction (y grows downward in image space).
    #[inline]
    pub fn normal(&self) -> Vector2<f64> {
        Vector2::new(-self.dir.y, self.dir.x)
    }

    /// Perpendicular distance from `p` to the line.
    pub fn distance_to(&self, p: &Point2<f64>) -> f64 {
        let n = self.dir.norm();
        if n < PARALLEL_EPS {
            return (p - self.point).norm();
        }
        let d = p - self.point;
        (self.dir.x * d.y - self.dir.y * d.x).abs() / n
    }
}

/// Intersection of two lines in parametric form.
///
/// Solves `a.point + t * a.dir == b.point + s * b.dir` through the 2D cross
/// product. Returns `None` when the directions are parallel (or either
/// direction is degenerate), so callers get a deterministic failure instead
/// of a far-away pseudo intersection.
pub fn line_intersection(a: &Line, b: &Line) -> Option<Point2<f64>> {
    let denom = cross(a.dir, b.dir);
    let scale = a.dir.norm() * b.dir.norm();
    if scale < PARALLEL_EPS || (denom / scale).abs() < PARALLEL_EPS {
        return None;
    }
    let d = b.point - a.point;
    let t = cross(d, b.dir) / denom;
    Some(a.point + a.dir * t)
}

#[inline]
fn cross(a: Vector2<f64>, b: Vector2<f64>) -> f64 {
    a.x * b.y - a.y * b.x
}

/// Axis-aligned integer rectangle in pixel units.
///
/// `x`/`y` is the top-left corner; the rectangle covers
/// `[x, x + width) x [y, y + height)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RectI {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl RectI {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    #[inline]
    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    #[inline]
    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    /// Geometric center of the rectangle.
    pub fn center(&self) -> Point2<f64> {
        Point2::new(
            self.x as f64 + self.width as f64 * 0.5,
            self.y as f64 + self.height as f64 * 0.5,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intersection_of_axis_lines() {
        let horizontal = Line::new(Point2::new(0.0, 3.0), Vector2::new(1.0, 0.0));
        let vertical = Line::new(Point2::new(7.0, -2.0), Vector2::new(0.0, 5.0));

        let p = line_intersection(&horizontal, &vertical).expect("not parallel");
        assert!((p.x - 7.0).abs() < 1e-12);
        assert!((p.y - 3.0).abs() < 1e-12);
    }

    #[test]
    fn intersection_matches_two_point_construction() {
        let a = Line::through(Point2::new(0.0, 0.0), Point2::new(2.0, 2.0));
        let b = Line::through(Point2::new(0.0, 4.0), Point2::new(4.0, 0.0));

        let p = line_intersection(&a, &b).expect("not parallel");
        assert!((p.x - 2.0).abs() < 1e-12);
        assert!((p.y - 2.0).abs() < 1e-12);
    }

    #[test]
    fn parallel_lines_fail_deterministically() {
        let a = Line::new(Point2::new(0.0, 0.0), Vector2::new(3.0, 1.0));
        let b = Line::new(Point2::new(5.0, 5.0), Vector2::new(6.0, 2.0));

        assert!(line_intersection(&a, &b).is_none());
        // repeated calls keep failing the same way
        assert!(line_intersection(&a, &b).is_none());
    }

    #[test]
    fn degenerate_direction_fails() {
        let a = Line::new(Point2::new(0.0, 0.0), Vector2::new(0.0, 0.0));
        let b = Line::new(Point2::new(1.0, 0.0), Vector2::new(0.0, 1.0));
        assert!(line_intersection(&a, &b).is_none());
    }

    #[test]
    fn distance_to_line() {
        let l = Line::new(Point2::new(0.0, 0.0), Vector2::new(1.0, 0.0));
        assert!((l.distance_to(&Point2::new(10.0, 4.0)) - 4.0).abs() < 1e-12);
        assert!(l.distance_to(&Point2::new(-3.0, 0.0)) < 1e-12);
    }

    #[test]
    fn rect_accessors() {
        let r = RectI::new(10, 20, 30, 40);
        assert_eq!(r.right(), 40);
        assert_eq!(r.bottom(), 60);
        assert!(r.contains(10, 20));
        assert!(!r.contains(40, 20));
        let c = r.center();
        assert!((c.x - 25.0).abs() < 1e-12 && (c.y - 40.0).abs() < 1e-12);
    }
}
