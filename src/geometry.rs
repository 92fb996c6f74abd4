//! 2D geometry helpers for layout and branch-angle math.
//!
//! Pure value types and free functions with no state. Degenerate inputs
//! (zero-length vectors, zero counts) resolve to zero vectors or empty
//! results instead of dividing by zero.

use std::f64::consts::{PI, TAU};
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub};

use serde::{Deserialize, Serialize};

/// A point or direction in the layout plane.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Unit vector (scaled by `magnitude`) pointing at `angle` radians from +X.
    pub fn from_angle(angle: f64, magnitude: f64) -> Self {
        Self {
            x: angle.cos() * magnitude,
            y: angle.sin() * magnitude,
        }
    }

    pub fn magnitude(self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    /// Unit vector in the same direction, or `ZERO` for a zero-length vector.
    pub fn normalized(self) -> Self {
        let mag = self.magnitude();
        if mag == 0.0 { Self::ZERO } else { self / mag }
    }

    pub fn distance_to(self, other: Vec2) -> f64 {
        (self - other).magnitude()
    }

    pub fn rotate(self, angle: f64) -> Self {
        let (sin_a, cos_a) = angle.sin_cos();
        Self {
            x: self.x * cos_a - self.y * sin_a,
            y: self.x * sin_a + self.y * cos_a,
        }
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Add for Vec2 {
    type Output = Vec2;
    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Vec2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vec2 {
    type Output = Vec2;
    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Vec2 {
    type Output = Vec2;
    fn mul(self, scalar: f64) -> Vec2 {
        Vec2::new(self.x * scalar, self.y * scalar)
    }
}

/// Division by zero yields `ZERO`.
impl Div<f64> for Vec2 {
    type Output = Vec2;
    fn div(self, scalar: f64) -> Vec2 {
        if scalar == 0.0 {
            Vec2::ZERO
        } else {
            Vec2::new(self.x / scalar, self.y / scalar)
        }
    }
}

impl Neg for Vec2 {
    type Output = Vec2;
    fn neg(self) -> Vec2 {
        Vec2::new(-self.x, -self.y)
    }
}

// ============================================================================
// Angle helpers
// ============================================================================

/// Wrap an angle into `[0, 2π)`. Non-finite input maps to 0.
pub fn normalize_angle(angle: f64) -> f64 {
    if !angle.is_finite() {
        return 0.0;
    }
    let wrapped = angle.rem_euclid(TAU);
    // rem_euclid can round up to TAU for tiny negative inputs.
    if wrapped >= TAU { 0.0 } else { wrapped }
}

pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Interpolate from `a` towards `b` along the shorter arc.
pub fn lerp_angle(a: f64, b: f64, t: f64) -> f64 {
    let mut delta = normalize_angle(b - a);
    if delta > PI {
        delta -= TAU;
    }
    normalize_angle(a + delta * t)
}

/// Spread `count` angles evenly across `spread` radians starting at `start`.
///
/// Each angle sits in the middle of its slot, so one angle lands at the
/// centre of the spread.
pub fn distribute_angles(count: usize, start: f64, spread: f64) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![start + spread / 2.0],
        _ => {
            let step = spread / count as f64;
            (0..count)
                .map(|i| start + step * i as f64 + step / 2.0)
                .collect()
        }
    }
}

/// `count` points evenly spaced around a full circle.
pub fn points_on_circle(center: Vec2, radius: f64, count: usize, start: f64) -> Vec<Vec2> {
    points_on_arc(center, radius, count, start, start + TAU)
}

/// `count` points evenly spaced along the arc from `start` to `end`.
pub fn points_on_arc(center: Vec2, radius: f64, count: usize, start: f64, end: f64) -> Vec<Vec2> {
    distribute_angles(count, start, end - start)
        .into_iter()
        .map(|a| center + Vec2::from_angle(a, radius))
        .collect()
}
