#![forbid(unsafe_code)]

//! Geometric primitives.
//!
//! Screen coordinates are `f32` pixels with the origin at the bottom-left and
//! `y` growing upwards, so a positive rotation is counter-clockwise.

use std::ops::{Add, AddAssign, Div, Mul, MulAssign, Neg, Sub, SubAssign};

/// A 2D vector or point in screen space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Self = Self::new(0.0, 0.0);

    /// Create a new vector.
    #[inline]
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    #[inline]
    #[must_use]
    pub fn dot(self, other: Self) -> f32 {
        self.x * other.x + self.y * other.y
    }

    /// Z component of the 3D cross product (perp-dot product).
    #[inline]
    #[must_use]
    pub fn cross(self, other: Self) -> f32 {
        self.x * other.y - self.y * other.x
    }

    #[inline]
    #[must_use]
    pub fn length_squared(self) -> f32 {
        self.dot(self)
    }

    #[inline]
    #[must_use]
    pub fn length(self) -> f32 {
        self.length_squared().sqrt()
    }

    #[inline]
    #[must_use]
    pub fn distance(self, other: Self) -> f32 {
        (self - other).length()
    }

    /// Rotate counter-clockwise by `degrees`.
    #[must_use]
    pub fn rotated(self, degrees: f32) -> Self {
        let (sin, cos) = degrees.to_radians().sin_cos();
        Self::new(self.x * cos - self.y * sin, self.x * sin + self.y * cos)
    }

    /// Lift into 3D on the `z = 0` plane.
    #[inline]
    #[must_use]
    pub const fn extend(self, z: f32) -> Vec3 {
        Vec3::new(self.x, self.y, z)
    }

    /// Centroid of a set of points; `None` when empty.
    #[must_use]
    pub fn centroid(points: impl IntoIterator<Item = Self>) -> Option<Self> {
        let mut sum = Self::ZERO;
        let mut count = 0u32;
        for p in points {
            sum += p;
            count += 1;
        }
        (count > 0).then(|| sum / count as f32)
    }
}

impl From<(f32, f32)> for Vec2 {
    fn from((x, y): (f32, f32)) -> Self {
        Self { x, y }
    }
}

impl Add for Vec2 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vec2 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl SubAssign for Vec2 {
    fn sub_assign(&mut self, rhs: Self) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

impl Mul<f32> for Vec2 {
    type Output = Self;
    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

impl MulAssign<f32> for Vec2 {
    fn mul_assign(&mut self, rhs: f32) {
        self.x *= rhs;
        self.y *= rhs;
    }
}

impl Div<f32> for Vec2 {
    type Output = Self;
    fn div(self, rhs: f32) -> Self {
        Self::new(self.x / rhs, self.y / rhs)
    }
}

impl Neg for Vec2 {
    type Output = Self;
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y)
    }
}

/// A 3D vector used for projected transform deltas.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);
    pub const FORWARD: Self = Self::new(0.0, 0.0, 1.0);

    #[inline]
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    #[inline]
    #[must_use]
    pub fn dot(self, other: Self) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    #[inline]
    #[must_use]
    pub fn cross(self, other: Self) -> Self {
        Self::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    #[inline]
    #[must_use]
    pub fn length(self) -> f32 {
        self.dot(self).sqrt()
    }

    /// Unit vector in the same direction, or zero for a zero vector.
    #[must_use]
    pub fn normalized(self) -> Self {
        let len = self.length();
        if len <= f32::EPSILON {
            Self::ZERO
        } else {
            self * (1.0 / len)
        }
    }

    /// Drop the `z` component.
    #[inline]
    #[must_use]
    pub const fn truncate(self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    /// Signed angle in degrees from `self` to `to`, measured around `normal`.
    ///
    /// The magnitude is the unsigned angle between the vectors; the sign is
    /// negative when `self × to` points against `normal`.
    #[must_use]
    pub fn signed_angle(self, to: Self, normal: Self) -> f32 {
        let denom = self.length() * to.length();
        if denom <= f32::EPSILON {
            return 0.0;
        }
        let cos = (self.dot(to) / denom).clamp(-1.0, 1.0);
        let angle = cos.acos().to_degrees();
        if self.cross(to).dot(normal) < 0.0 {
            -angle
        } else {
            angle
        }
    }
}

impl Add for Vec3 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f32> for Vec3 {
    type Output = Self;
    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Neg for Vec3 {
    type Output = Self;
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}

/// A plane `{ p : normal · p = distance }` with a unit normal.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Plane {
    pub normal: Vec3,
    pub distance: f32,
}

impl Plane {
    /// Plane through `point` with the given normal.
    #[must_use]
    pub fn new(normal: Vec3, point: Vec3) -> Self {
        let normal = normal.normalized();
        Self {
            normal,
            distance: normal.dot(point),
        }
    }

    /// Plane through the origin.
    #[must_use]
    pub fn through_origin(normal: Vec3) -> Self {
        Self::new(normal, Vec3::ZERO)
    }

    /// Intersect the ray `origin + t * direction` with the plane.
    ///
    /// Returns `None` when the ray is parallel to the plane.
    #[must_use]
    pub fn raycast(&self, origin: Vec3, direction: Vec3) -> Option<Vec3> {
        let denom = self.normal.dot(direction);
        if denom.abs() <= f32::EPSILON {
            return None;
        }
        let t = (self.distance - self.normal.dot(origin)) / denom;
        Some(origin + direction * t)
    }
}

impl Default for Plane {
    fn default() -> Self {
        Self::through_origin(Vec3::FORWARD)
    }
}

/// An axis-aligned rectangle in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    #[inline]
    #[must_use]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Right edge (exclusive).
    #[inline]
    #[must_use]
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Top edge (exclusive).
    #[inline]
    #[must_use]
    pub fn top(&self) -> f32 {
        self.y + self.height
    }

    /// Check if a point is inside the rectangle (left/bottom inclusive).
    #[inline]
    #[must_use]
    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.x && point.x < self.right() && point.y >= self.y && point.y < self.top()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn vec2_arithmetic() {
        let a = Vec2::new(3.0, 4.0);
        assert_eq!(a.length(), 5.0);
        assert_eq!(a + Vec2::new(1.0, 1.0), Vec2::new(4.0, 5.0));
        assert_eq!(a - a, Vec2::ZERO);
        assert_eq!(a * 2.0, Vec2::new(6.0, 8.0));
        assert_eq!(-a, Vec2::new(-3.0, -4.0));
    }

    #[test]
    fn rotated_quarter_turn_is_counter_clockwise() {
        let v = Vec2::new(1.0, 0.0).rotated(90.0);
        assert!(approx(v.x, 0.0));
        assert!(approx(v.y, 1.0));
    }

    #[test]
    fn centroid_of_empty_set_is_none() {
        assert_eq!(Vec2::centroid([]), None);
        assert_eq!(
            Vec2::centroid([Vec2::new(0.0, 0.0), Vec2::new(10.0, 20.0)]),
            Some(Vec2::new(5.0, 10.0))
        );
    }

    #[test]
    fn signed_angle_uses_normal_for_sign() {
        let x = Vec3::new(1.0, 0.0, 0.0);
        let y = Vec3::new(0.0, 1.0, 0.0);
        assert!(approx(x.signed_angle(y, Vec3::FORWARD), 90.0));
        assert!(approx(y.signed_angle(x, Vec3::FORWARD), -90.0));
        assert!(approx(x.signed_angle(y, -Vec3::FORWARD), -90.0));
        assert_eq!(Vec3::ZERO.signed_angle(y, Vec3::FORWARD), 0.0);
    }

    #[test]
    fn plane_raycast() {
        let plane = Plane::new(Vec3::FORWARD, Vec3::new(0.0, 0.0, 5.0));
        let hit = plane
            .raycast(Vec3::new(1.0, 2.0, 0.0), Vec3::FORWARD)
            .expect("ray hits plane");
        assert_eq!(hit, Vec3::new(1.0, 2.0, 5.0));
        assert!(plane.raycast(Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0)).is_none());
    }

    #[test]
    fn rect_contains_is_half_open() {
        let r = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(r.contains(Vec2::new(0.0, 0.0)));
        assert!(r.contains(Vec2::new(9.9, 9.9)));
        assert!(!r.contains(Vec2::new(10.0, 5.0)));
    }
}
