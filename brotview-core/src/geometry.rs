use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Sub};

use crate::error::CoreError;

/// A pair of `f64` components.
///
/// Doubles as a pixel coordinate and as a complex number, with `x` the real
/// part and `y` the imaginary part. `Copy` and allocation-free so it can sit
/// in the escape-time loop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vector {
    pub x: f64,
    pub y: f64,
}

impl Vector {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    #[inline]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Complex square: `(x² - y², 2xy)`.
    #[inline]
    pub fn square(self) -> Self {
        Self {
            x: self.x * self.x - self.y * self.y,
            y: 2.0 * self.x * self.y,
        }
    }

    /// Squared modulus `x² + y²`.
    #[inline]
    pub fn norm_sq(self) -> f64 {
        self.x * self.x + self.y * self.y
    }
}

impl Add for Vector {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl Sub for Vector {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

impl Mul<f64> for Vector {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: f64) -> Self {
        Self {
            x: self.x * rhs,
            y: self.y * rhs,
        }
    }
}

impl std::fmt::Display for Vector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.y >= 0.0 {
            write!(f, "{} + {}i", self.x, self.y)
        } else {
            write!(f, "{} - {}i", self.x, -self.y)
        }
    }
}

/// An axis-aligned rectangle: origin plus extents.
///
/// Used both in pixel space (a buffer is `{0, 0, width, height}`) and in
/// plane space (the visible region of the complex plane). A valid rectangle
/// has finite fields and strictly positive extents.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Rect {
    /// Create a rectangle, rejecting non-finite fields and non-positive extents.
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> crate::Result<Self> {
        let rect = Self { x, y, w, h };
        rect.validate()?;
        Ok(rect)
    }

    /// Rectangle of the given extents centred on `center`.
    pub fn from_center(center: Vector, w: f64, h: f64) -> crate::Result<Self> {
        Self::new(center.x - w / 2.0, center.y - h / 2.0, w, h)
    }

    /// Pixel-space rectangle `{0, 0, width, height}` covering a buffer.
    pub fn from_size(width: u32, height: u32) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            w: width as f64,
            h: height as f64,
        }
    }

    pub fn center(&self) -> Vector {
        Vector::new(self.x + self.w / 2.0, self.y + self.h / 2.0)
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Check the rectangle invariant, naming the offending field on failure.
    pub fn validate(&self) -> crate::Result<()> {
        let fields = [("x", self.x), ("y", self.y), ("w", self.w), ("h", self.h)];
        if let Some((name, value)) = fields.iter().find(|(_, v)| !v.is_finite()) {
            return Err(CoreError::InvalidRect {
                reason: format!("{name} must be finite, got {value}"),
            });
        }
        if self.w <= 0.0 || self.h <= 0.0 {
            return Err(CoreError::InvalidRect {
                reason: format!("extents must be positive, got {}×{}", self.w, self.h),
            });
        }
        Ok(())
    }
}

/// Affine remap of `point` from `source` into `target`.
///
/// Converts pixel coordinates to plane coordinates and back (swap the two
/// rectangles). `source` must have non-zero extents; that is enforced where
/// rectangles are accepted, not here.
#[inline]
pub fn map_point(point: Vector, source: &Rect, target: &Rect) -> Vector {
    Vector {
        x: target.x + (point.x - source.x) * target.w / source.w,
        y: target.y + (point.y - source.y) * target.h / source.h,
    }
}

/// `a*(1-t) + b*t`. `t` is not clamped.
#[inline]
pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a * (1.0 - t) + b * t
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-12;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < EPSILON
    }

    #[test]
    fn squaring() {
        // (1 + i)² = 2i
        let z = Vector::new(1.0, 1.0).square();
        assert!(approx_eq(z.x, 0.0));
        assert!(approx_eq(z.y, 2.0));
    }

    #[test]
    fn norm_sq() {
        assert!(approx_eq(Vector::new(3.0, 4.0).norm_sq(), 25.0));
    }

    #[test]
    fn arithmetic() {
        let a = Vector::new(1.0, 2.0);
        let b = Vector::new(3.0, 4.0);
        assert_eq!(a + b, Vector::new(4.0, 6.0));
        assert_eq!(b - a, Vector::new(2.0, 2.0));
        assert_eq!(a * 3.0, Vector::new(3.0, 6.0));
    }

    #[test]
    fn display_signs() {
        assert_eq!(Vector::new(1.0, -2.0).to_string(), "1 - 2i");
        assert_eq!(Vector::new(-0.5, 0.0).to_string(), "-0.5 + 0i");
    }

    #[test]
    fn rect_center() {
        let r = Rect::new(-2.0, -1.5, 3.0, 3.0).unwrap();
        assert_eq!(r.center(), Vector::new(-0.5, 0.0));
    }

    #[test]
    fn rect_validation() {
        assert!(Rect::new(0.0, 0.0, 1.0, 1.0).is_ok());
        assert!(Rect::new(0.0, 0.0, 0.0, 1.0).is_err());
        assert!(Rect::new(0.0, 0.0, 1.0, -1.0).is_err());
        assert!(Rect::new(f64::NAN, 0.0, 1.0, 1.0).is_err());
        assert!(Rect::new(0.0, f64::INFINITY, 1.0, 1.0).is_err());

        let bad = Rect {
            x: 0.0,
            y: 0.0,
            w: f64::NAN,
            h: 1.0,
        };
        assert!(!bad.is_valid());
    }

    #[test]
    fn from_center_round_trips() {
        let r = Rect::from_center(Vector::new(-0.75, 0.1), 2.0, 1.0).unwrap();
        assert!(approx_eq(r.x, -1.75));
        assert!(approx_eq(r.y, -0.4));
        assert!(approx_eq(r.center().x, -0.75));
        assert!(approx_eq(r.center().y, 0.1));
    }

    #[test]
    fn map_pixel_to_plane() {
        let pixels = Rect::from_size(100, 100);
        let plane = Rect::new(-2.0, -1.5, 3.0, 3.0).unwrap();
        let c = map_point(Vector::new(50.0, 50.0), &pixels, &plane);
        assert!(approx_eq(c.x, -0.5));
        assert!(approx_eq(c.y, 0.0));

        let origin = map_point(Vector::ZERO, &pixels, &plane);
        assert_eq!(origin, Vector::new(-2.0, -1.5));
    }

    #[test]
    fn map_point_round_trips() {
        let a = Rect::new(0.0, 0.0, 640.0, 480.0).unwrap();
        let b = Rect::new(-1.768779295, -0.001739398, 1e-6, 1e-6).unwrap();
        for &(x, y) in &[(0.0, 0.0), (17.0, 311.5), (639.0, 479.0), (-20.0, 900.0)] {
            let p = Vector::new(x, y);
            let back = map_point(map_point(p, &a, &b), &b, &a);
            assert!((back.x - p.x).abs() < 1e-6, "{p:?} -> {back:?}");
            assert!((back.y - p.y).abs() < 1e-6, "{p:?} -> {back:?}");
        }
    }

    #[test]
    fn lerp_is_unclamped() {
        assert!(approx_eq(lerp(0.0, 10.0, 0.25), 2.5));
        assert!(approx_eq(lerp(0.0, 10.0, 1.5), 15.0));
        assert!(approx_eq(lerp(4.0, 8.0, -1.0), 0.0));
    }
}
