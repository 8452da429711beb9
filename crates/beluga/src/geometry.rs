//! 2D vector arithmetic and the simulated point type.

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

/// Smallest distance used by distance-based force terms.
///
/// Every `1 / d` style computation clamps `d` to at least this value so coincident points never
/// produce NaN or infinite forces.
pub const MIN_DISTANCE: f64 = 1e-3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector2D {
    pub x: f64,
    pub y: f64,
}

impl Vector2D {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn magnitude(self) -> f64 {
        self.x.hypot(self.y)
    }

    pub fn magnitude_squared(self) -> f64 {
        self.x * self.x + self.y * self.y
    }

    pub fn distance(self, other: Self) -> f64 {
        (self - other).magnitude()
    }

    pub fn scale(self, factor: f64) -> Self {
        Self::new(self.x * factor, self.y * factor)
    }

    /// Unit vector with the same direction, or zero when the direction is undefined.
    pub fn normalize(self) -> Self {
        let m = self.magnitude();
        if m > 0.0 && m.is_finite() {
            self / m
        } else {
            Self::ZERO
        }
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    pub fn finite_or_zero(self) -> Self {
        if self.is_finite() { self } else { Self::ZERO }
    }

    pub fn clamp_magnitude(self, max: f64) -> Self {
        let m = self.magnitude();
        if m > max && m > 0.0 {
            self.scale(max / m)
        } else {
            self
        }
    }
}

impl Add for Vector2D {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vector2D {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vector2D {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl SubAssign for Vector2D {
    fn sub_assign(&mut self, rhs: Self) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

impl Mul<f64> for Vector2D {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self {
        self.scale(rhs)
    }
}

impl Div<f64> for Vector2D {
    type Output = Self;

    fn div(self, rhs: f64) -> Self {
        Self::new(self.x / rhs, self.y / rhs)
    }
}

impl Neg for Vector2D {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.x, -self.y)
    }
}

impl std::iter::Sum for Vector2D {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

/// A simulated vertex: position, per-step force accumulator, degree and anchoring flag.
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    position: Vector2D,
    force: Vector2D,
    degree: usize,
    fixed: bool,
}

impl Point {
    pub fn new(position: Vector2D, degree: usize) -> Self {
        Self {
            position,
            force: Vector2D::ZERO,
            degree,
            fixed: false,
        }
    }

    pub fn fixed(position: Vector2D, degree: usize) -> Self {
        Self {
            fixed: true,
            ..Self::new(position, degree)
        }
    }

    pub fn position(&self) -> Vector2D {
        self.position
    }

    pub fn force(&self) -> Vector2D {
        self.force
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    pub fn is_fixed(&self) -> bool {
        self.fixed
    }

    /// ForceAtlas2 mass: `degree + 1`, so isolated vertices still repel.
    pub fn mass(&self) -> f64 {
        (self.degree + 1) as f64
    }

    /// Accumulates `force`; non-finite contributions are dropped.
    pub fn apply_force(&mut self, force: Vector2D) {
        self.force += force.finite_or_zero();
    }

    pub fn reset_force(&mut self) {
        self.force = Vector2D::ZERO;
    }

    /// Moves the point by `force * dt`, capped at `max_speed`, then clears the accumulator.
    ///
    /// Returns the applied displacement. Fixed points only have their accumulator cleared.
    pub fn integrate(&mut self, dt: f64, max_speed: f64) -> Vector2D {
        let displacement = if self.fixed {
            Vector2D::ZERO
        } else {
            (self.force * dt).finite_or_zero().clamp_magnitude(max_speed)
        };
        self.position += displacement;
        self.reset_force();
        displacement
    }
}
