//! Planar geometry primitives shared by every pipeline stage.
//!
//! The central type is [`Quad`]: four ordered corners (top-left, top-right,
//! bottom-right, bottom-left, clockwise). All transforms are value-to-value;
//! a `Quad` is never mutated in place.

use serde::{Deserialize, Serialize};

/// A 2D point in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// An axis-aligned rectangle, used as the bounding-box form of a [`Quad`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl Rect {
    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }
}

/// Four ordered corners of a simple quadrilateral.
///
/// Ordering is clockwise starting from the top-left corner and is preserved
/// by every transform. Construct via [`Quad::new`], [`Quad::from_rect`] or
/// [`Quad::ordered`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quad {
    pub top_left: Point,
    pub top_right: Point,
    pub bottom_right: Point,
    pub bottom_left: Point,
}

impl Quad {
    pub fn new(top_left: Point, top_right: Point, bottom_right: Point, bottom_left: Point) -> Self {
        Self {
            top_left,
            top_right,
            bottom_right,
            bottom_left,
        }
    }

    /// Build from an axis-aligned rectangle.
    pub fn from_rect(rect: Rect) -> Self {
        Self {
            top_left: Point::new(rect.left, rect.top),
            top_right: Point::new(rect.right, rect.top),
            bottom_right: Point::new(rect.right, rect.bottom),
            bottom_left: Point::new(rect.left, rect.bottom),
        }
    }

    /// Canonically order four unordered corner points.
    ///
    /// Sorts by y to split the top and bottom pairs, then sorts each pair
    /// by x. Valid only for roughly axis-convex corner sets; near 45° of
    /// in-plane rotation the top/bottom split becomes ambiguous.
    pub fn ordered(points: [Point; 4]) -> Self {
        let mut pts = points;
        pts.sort_by(|a, b| a.y.total_cmp(&b.y));
        let (mut top, mut bottom) = ([pts[0], pts[1]], [pts[2], pts[3]]);
        if top[0].x > top[1].x {
            top.swap(0, 1);
        }
        if bottom[0].x > bottom[1].x {
            bottom.swap(0, 1);
        }
        Self {
            top_left: top[0],
            top_right: top[1],
            bottom_right: bottom[1],
            bottom_left: bottom[0],
        }
    }

    /// Corners in canonical order TL, TR, BR, BL.
    pub fn corners(&self) -> [Point; 4] {
        [
            self.top_left,
            self.top_right,
            self.bottom_right,
            self.bottom_left,
        ]
    }

    /// Axis-aligned bounding box.
    pub fn bounding_rect(&self) -> Rect {
        let c = self.corners();
        let mut left = c[0].x;
        let mut right = c[0].x;
        let mut top = c[0].y;
        let mut bottom = c[0].y;
        for p in &c[1..] {
            left = left.min(p.x);
            right = right.max(p.x);
            top = top.min(p.y);
            bottom = bottom.max(p.y);
        }
        Rect {
            left,
            top,
            right,
            bottom,
        }
    }

    /// In-plane rotation: angle of the top edge (`top_right - top_left`)
    /// relative to horizontal, in degrees.
    pub fn rotation_degrees(&self) -> f64 {
        let dx = self.top_right.x - self.top_left.x;
        let dy = self.top_right.y - self.top_left.y;
        dy.atan2(dx).to_degrees()
    }

    /// Map each corner through a [`Point`]-valued function.
    pub fn map(&self, mut f: impl FnMut(Point) -> Point) -> Self {
        Self {
            top_left: f(self.top_left),
            top_right: f(self.top_right),
            bottom_right: f(self.bottom_right),
            bottom_left: f(self.bottom_left),
        }
    }

    /// Cross-product sign test: `point` is inside iff it lies on the same
    /// side of all four directed edges.
    pub fn contains(&self, point: Point) -> bool {
        let c = self.corners();
        let mut positive = false;
        let mut negative = false;
        for i in 0..4 {
            let a = c[i];
            let b = c[(i + 1) % 4];
            let cross = (b.x - a.x) * (point.y - a.y) - (b.y - a.y) * (point.x - a.x);
            if cross > 0.0 {
                positive = true;
            } else if cross < 0.0 {
                negative = true;
            }
        }
        !(positive && negative)
    }

    /// True when every corner lies within `[0, width] x [0, height]`.
    pub fn is_within(&self, width: f64, height: f64) -> bool {
        self.corners()
            .iter()
            .all(|p| p.x >= 0.0 && p.x <= width && p.y >= 0.0 && p.y <= height)
    }

    /// Largest corner-wise Euclidean displacement to another quad.
    pub fn max_corner_displacement(&self, other: &Quad) -> f64 {
        self.corners()
            .iter()
            .zip(other.corners().iter())
            .map(|(a, b)| a.distance(b))
            .fold(0.0, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_quad() -> Quad {
        Quad::from_rect(Rect {
            left: 0.0,
            top: 0.0,
            right: 1.0,
            bottom: 1.0,
        })
    }

    #[test]
    fn ordered_recovers_canonical_order() {
        let q = Quad::ordered([
            Point::new(9.0, 8.5),
            Point::new(1.0, 0.5),
            Point::new(0.5, 9.0),
            Point::new(10.0, 1.0),
        ]);
        assert_eq!(q.top_left, Point::new(1.0, 0.5));
        assert_eq!(q.top_right, Point::new(10.0, 1.0));
        assert_eq!(q.bottom_right, Point::new(9.0, 8.5));
        assert_eq!(q.bottom_left, Point::new(0.5, 9.0));
    }

    #[test]
    fn rotation_of_axis_aligned_quad_is_zero() {
        assert_relative_eq!(unit_quad().rotation_degrees(), 0.0);
    }

    #[test]
    fn rotation_follows_top_edge() {
        let q = Quad::new(
            Point::new(0.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(0.0, 2.0),
            Point::new(-1.0, 1.0),
        );
        assert_relative_eq!(q.rotation_degrees(), 45.0, epsilon = 1e-12);
    }

    #[test]
    fn contains_interior_and_rejects_exterior() {
        let q = unit_quad();
        assert!(q.contains(Point::new(0.5, 0.5)));
        assert!(!q.contains(Point::new(1.5, 0.5)));
        assert!(!q.contains(Point::new(0.5, -0.1)));
        // Boundary counts as inside (zero cross product).
        assert!(q.contains(Point::new(0.0, 0.5)));
    }

    #[test]
    fn contains_works_for_counterclockwise_winding() {
        // Mirrored quad; all cross products flip sign together.
        let q = Quad::new(
            Point::new(1.0, 0.0),
            Point::new(0.0, 0.0),
            Point::new(0.0, 1.0),
            Point::new(1.0, 1.0),
        );
        assert!(q.contains(Point::new(0.5, 0.5)));
        assert!(!q.contains(Point::new(2.0, 0.5)));
    }

    #[test]
    fn is_within_respects_bounds() {
        let q = Quad::from_rect(Rect {
            left: 10.0,
            top: 10.0,
            right: 90.0,
            bottom: 90.0,
        });
        assert!(q.is_within(100.0, 100.0));
        assert!(!q.is_within(80.0, 100.0));
    }

    #[test]
    fn max_corner_displacement_picks_largest() {
        let a = unit_quad();
        let mut b = a;
        b.bottom_right = Point::new(4.0, 5.0);
        assert_relative_eq!(a.max_corner_displacement(&b), 5.0);
    }

    #[test]
    fn bounding_rect_covers_rotated_quad() {
        let q = Quad::new(
            Point::new(5.0, 0.0),
            Point::new(10.0, 5.0),
            Point::new(5.0, 10.0),
            Point::new(0.0, 5.0),
        );
        let r = q.bounding_rect();
        assert_relative_eq!(r.left, 0.0);
        assert_relative_eq!(r.top, 0.0);
        assert_relative_eq!(r.width(), 10.0);
        assert_relative_eq!(r.height(), 10.0);
    }
}
