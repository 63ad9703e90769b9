// SPDX-License-Identifier: MIT OR Apache-2.0
//! 2D geometry primitives used by the scene and the layout.

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

/// Tolerance below which a length is treated as zero
pub const EPSILON: f32 = 1.0e-6;

/// 2D vector / point
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector2 {
    /// X coordinate
    pub x: f32,
    /// Y coordinate
    pub y: f32,
}

impl Vector2 {
    /// The zero vector
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };
    /// Unit vector along +X
    pub const UNIT_X: Self = Self { x: 1.0, y: 0.0 };

    /// Create a new vector
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Vector with both components set to `v`
    pub const fn splat(v: f32) -> Self {
        Self { x: v, y: v }
    }

    /// Length of the vector
    pub fn len(self) -> f32 {
        self.len_squared().sqrt()
    }

    /// Squared length of the vector
    pub fn len_squared(self) -> f32 {
        self.x * self.x + self.y * self.y
    }

    /// Distance to another point
    pub fn dist(self, other: Vector2) -> f32 {
        (self - other).len()
    }

    /// Dot product
    pub fn dot(self, other: Vector2) -> f32 {
        self.x * other.x + self.y * other.y
    }

    /// 2D cross product (z component of the 3D cross product)
    pub fn cross(self, other: Vector2) -> f32 {
        self.x * other.y - self.y * other.x
    }

    /// Unit vector in the same direction, or `fallback` when the length is zero
    pub fn normalize_or(self, fallback: Vector2) -> Vector2 {
        let len = self.len();
        if len > EPSILON {
            self / len
        } else {
            fallback
        }
    }

    /// Linear interpolation towards `other`
    pub fn lerp(self, other: Vector2, t: f32) -> Vector2 {
        self + (other - self) * t
    }

    /// Midpoint between two points
    pub fn midpoint(self, other: Vector2) -> Vector2 {
        self.lerp(other, 0.5)
    }

    /// Check whether two points are within `tolerance` of each other
    pub fn approx_eq(self, other: Vector2, tolerance: f32) -> bool {
        (self.x - other.x).abs() <= tolerance && (self.y - other.y).abs() <= tolerance
    }
}

impl Add for Vector2 {
    type Output = Vector2;
    fn add(self, rhs: Vector2) -> Vector2 {
        Vector2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vector2 {
    fn add_assign(&mut self, rhs: Vector2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vector2 {
    type Output = Vector2;
    fn sub(self, rhs: Vector2) -> Vector2 {
        Vector2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl SubAssign for Vector2 {
    fn sub_assign(&mut self, rhs: Vector2) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

impl Mul<f32> for Vector2 {
    type Output = Vector2;
    fn mul(self, rhs: f32) -> Vector2 {
        Vector2::new(self.x * rhs, self.y * rhs)
    }
}

impl Div<f32> for Vector2 {
    type Output = Vector2;
    fn div(self, rhs: f32) -> Vector2 {
        Vector2::new(self.x / rhs, self.y / rhs)
    }
}

impl Neg for Vector2 {
    type Output = Vector2;
    fn neg(self) -> Vector2 {
        Vector2::new(-self.x, -self.y)
    }
}

/// Axis-aligned rectangle
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    /// Top-left corner
    pub origin: Vector2,
    /// Width and height
    pub size: Vector2,
}

impl Rect {
    /// Create a new rectangle
    pub const fn new(origin: Vector2, size: Vector2) -> Self {
        Self { origin, size }
    }

    /// Rectangle of `size` centered on `center`
    pub fn from_center(center: Vector2, size: Vector2) -> Self {
        Self {
            origin: center - size / 2.0,
            size,
        }
    }

    /// Bottom-right corner
    pub fn max(&self) -> Vector2 {
        self.origin + self.size
    }

    /// Center point
    pub fn center(&self) -> Vector2 {
        self.origin + self.size / 2.0
    }

    /// Grow (or shrink, for negative `dv`) the rectangle on every side
    pub fn adjust(mut self, dv: f32) -> Self {
        self.origin -= Vector2::splat(dv);
        self.size += Vector2::splat(2.0 * dv);
        self
    }

    /// Move the rectangle by `offset`
    pub fn translate(mut self, offset: Vector2) -> Self {
        self.origin += offset;
        self
    }

    /// Move the rectangle so its center lands on `pos`
    pub fn move_center(mut self, pos: Vector2) -> Self {
        self.origin = pos - self.size / 2.0;
        self
    }

    /// Check whether a point lies inside (borders included)
    pub fn contains(&self, p: Vector2) -> bool {
        let max = self.max();
        p.x >= self.origin.x && p.x <= max.x && p.y >= self.origin.y && p.y <= max.y
    }

    /// The four border segments, clockwise from the top edge
    pub fn edges(&self) -> [LineSegment; 4] {
        let tl = self.origin;
        let br = self.max();
        let tr = Vector2::new(br.x, tl.y);
        let bl = Vector2::new(tl.x, br.y);
        [
            LineSegment::new(tl, tr),
            LineSegment::new(tr, br),
            LineSegment::new(br, bl),
            LineSegment::new(bl, tl),
        ]
    }

    /// First point where `segment` crosses the border, nearest to its start
    pub fn intersect_segment(&self, segment: &LineSegment) -> Option<Vector2> {
        self.edges()
            .iter()
            .filter_map(|edge| segment.intersect(edge))
            .min_by(|a, b| a.dist(segment.start).total_cmp(&b.dist(segment.start)))
    }
}

/// Line segment between two points
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LineSegment {
    /// Start point
    pub start: Vector2,
    /// End point
    pub end: Vector2,
}

impl LineSegment {
    /// Create a new segment
    pub const fn new(start: Vector2, end: Vector2) -> Self {
        Self { start, end }
    }

    /// Segment length
    pub fn length(&self) -> f32 {
        self.start.dist(self.end)
    }

    /// Point at parameter `t` (0 = start, 1 = end)
    pub fn point_at(&self, t: f32) -> Vector2 {
        self.start.lerp(self.end, t)
    }

    /// Intersection point with another segment.
    ///
    /// Parallel and collinear segments yield `None`.
    pub fn intersect(&self, other: &LineSegment) -> Option<Vector2> {
        let r = self.end - self.start;
        let s = other.end - other.start;
        let denom = r.cross(s);
        if denom.abs() <= EPSILON {
            return None;
        }

        let qp = other.start - self.start;
        let t = qp.cross(s) / denom;
        let u = qp.cross(r) / denom;
        if (0.0..=1.0).contains(&t) && (0.0..=1.0).contains(&u) {
            Some(self.point_at(t))
        } else {
            None
        }
    }
}

/// Relative position on a polyline.
///
/// The integer part selects the segment (by its start point index), the
/// fractional part is the offset along that segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelPos {
    /// Index of the segment start point
    pub segment: usize,
    /// Offset along the segment in `[0, 1)`
    pub fraction: f32,
}

impl RelPos {
    /// Midpoint convention used for edge-to-edge attachment
    pub const MIDDLE: f32 = 0.5;

    /// Decode a `segment.fraction` encoded value
    pub fn decode(rel_pos: f32) -> Self {
        let rel_pos = if rel_pos.is_finite() { rel_pos.max(0.0) } else { 0.0 };
        let segment = rel_pos.floor();
        Self {
            segment: segment as usize,
            fraction: rel_pos - segment,
        }
    }
}

/// Point on a polyline at an encoded relative position.
///
/// The segment index is clamped to the last segment; a single point path
/// always yields that point.
pub fn point_on_path(points: &[Vector2], rel_pos: f32) -> Vector2 {
    match points {
        [] => Vector2::ZERO,
        [single] => *single,
        _ => {
            let pos = RelPos::decode(rel_pos);
            let last_segment = points.len() - 2;
            let (segment, fraction) = if pos.segment > last_segment {
                (last_segment, 1.0)
            } else {
                (pos.segment, pos.fraction)
            };
            LineSegment::new(points[segment], points[segment + 1]).point_at(fraction)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_zero_uses_fallback() {
        let v = Vector2::ZERO.normalize_or(Vector2::UNIT_X);
        assert_eq!(v, Vector2::UNIT_X);

        let v = Vector2::new(3.0, 4.0).normalize_or(Vector2::UNIT_X);
        assert!((v.len() - 1.0).abs() < 1e-6);
        assert!(v.approx_eq(Vector2::new(0.6, 0.8), 1e-6));
    }

    #[test]
    fn test_rect_center_and_move() {
        let rect = Rect::new(Vector2::new(10.0, 20.0), Vector2::new(40.0, 20.0));
        assert_eq!(rect.center(), Vector2::new(30.0, 30.0));

        let moved = rect.move_center(Vector2::ZERO);
        assert_eq!(moved.origin, Vector2::new(-20.0, -10.0));
        assert_eq!(moved.size, rect.size);

        let grown = rect.adjust(5.0);
        assert_eq!(grown.origin, Vector2::new(5.0, 15.0));
        assert_eq!(grown.size, Vector2::new(50.0, 30.0));
        assert!(grown.contains(Vector2::new(5.0, 45.0)));
        assert!(!grown.contains(Vector2::new(4.0, 45.0)));
    }

    #[test]
    fn test_segment_intersection() {
        let a = LineSegment::new(Vector2::new(0.0, 0.0), Vector2::new(10.0, 10.0));
        let b = LineSegment::new(Vector2::new(0.0, 10.0), Vector2::new(10.0, 0.0));
        let p = a.intersect(&b).expect("segments cross");
        assert!(p.approx_eq(Vector2::new(5.0, 5.0), 1e-5));

        let parallel = LineSegment::new(Vector2::new(0.0, 1.0), Vector2::new(10.0, 11.0));
        assert!(a.intersect(&parallel).is_none());

        let short = LineSegment::new(Vector2::new(0.0, 10.0), Vector2::new(2.0, 8.0));
        assert!(a.intersect(&short).is_none());
    }

    #[test]
    fn test_rect_segment_intersection() {
        let rect = Rect::from_center(Vector2::ZERO, Vector2::new(20.0, 20.0));
        let ray = LineSegment::new(Vector2::new(-50.0, 0.0), Vector2::ZERO);
        let hit = rect.intersect_segment(&ray).expect("ray enters the rect");
        assert!(hit.approx_eq(Vector2::new(-10.0, 0.0), 1e-5));
    }

    #[test]
    fn test_point_on_path() {
        let path = [
            Vector2::new(0.0, 0.0),
            Vector2::new(10.0, 0.0),
            Vector2::new(10.0, 10.0),
        ];
        assert_eq!(point_on_path(&path, 0.5), Vector2::new(5.0, 0.0));
        assert_eq!(point_on_path(&path, 1.25), Vector2::new(10.0, 2.5));
        // Segment index past the end clamps to the path end
        assert_eq!(point_on_path(&path, 7.3), Vector2::new(10.0, 10.0));
        assert_eq!(point_on_path(&path[..1], 0.5), Vector2::ZERO);
    }

    #[test]
    fn test_rel_pos_decode() {
        let pos = RelPos::decode(3.25);
        assert_eq!(pos.segment, 3);
        assert!((pos.fraction - 0.25).abs() < 1e-6);

        let pos = RelPos::decode(f32::NAN);
        assert_eq!(pos.segment, 0);
        assert_eq!(pos.fraction, 0.0);
    }
}
