//! Planar rigid-body state vector and the arithmetic RK4 needs on it.

use std::ops::{Add, Mul, Sub};

use serde::{Deserialize, Serialize};

/// Instantaneous state of the body: `[x, y, theta, vx, vy, omega]`.
///
/// The same type holds time derivatives, in which case the fields read as
/// `[dx, dy, dtheta, dvx, dvy, domega]`.
///
/// Serialized as a flat array. JSON has no NaN or infinity, so non-finite
/// components are written as `null` and read back as NaN.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[Option<f64>; 6]", into = "[f64; 6]")]
pub struct State {
    pub x: f64,     // Horizontal position (m)
    pub y: f64,     // Vertical position (m)
    pub theta: f64, // Orientation (rad)
    pub vx: f64,    // Horizontal velocity (m/s)
    pub vy: f64,    // Vertical velocity (m/s)
    pub omega: f64, // Angular velocity (rad/s)
}

impl State {
    /// Number of components.
    pub const LEN: usize = 6;

    /// Field names in storage order.
    pub const FIELDS: [&'static str; Self::LEN] = ["x", "y", "theta", "vx", "vy", "omega"];

    /// Creates a new state.
    pub const fn new(x: f64, y: f64, theta: f64, vx: f64, vy: f64, omega: f64) -> Self {
        Self {
            x,
            y,
            theta,
            vx,
            vy,
            omega,
        }
    }

    /// Zero state.
    pub const fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0, 0.0, 0.0, 0.0)
    }

    /// Flat array in field order.
    #[inline(always)]
    pub const fn to_array(&self) -> [f64; Self::LEN] {
        [self.x, self.y, self.theta, self.vx, self.vy, self.omega]
    }

    /// `self + scalar * other`, component-wise.
    #[inline(always)]
    pub fn add_mul(&self, other: &Self, scalar: f64) -> Self {
        Self {
            x: self.x + other.x * scalar,
            y: self.y + other.y * scalar,
            theta: self.theta + other.theta * scalar,
            vx: self.vx + other.vx * scalar,
            vy: self.vy + other.vy * scalar,
            omega: self.omega + other.omega * scalar,
        }
    }

    /// Position `(x, y)`.
    #[inline(always)]
    pub const fn position(&self) -> (f64, f64) {
        (self.x, self.y)
    }

    /// Linear speed `|v|` (unregularized).
    #[inline(always)]
    pub fn speed(&self) -> f64 {
        self.vx.hypot(self.vy)
    }

    /// True when every component is finite.
    pub fn is_finite(&self) -> bool {
        self.to_array().iter().all(|v| v.is_finite())
    }
}

impl From<[f64; 6]> for State {
    fn from(a: [f64; 6]) -> Self {
        Self::new(a[0], a[1], a[2], a[3], a[4], a[5])
    }
}

impl From<[Option<f64>; 6]> for State {
    fn from(a: [Option<f64>; 6]) -> Self {
        a.map(|v| v.unwrap_or(f64::NAN)).into()
    }
}

impl From<State> for [f64; 6] {
    fn from(s: State) -> Self {
        s.to_array()
    }
}

impl Add for State {
    type Output = Self;

    #[inline(always)]
    fn add(self, other: Self) -> Self {
        self.add_mul(&other, 1.0)
    }
}

impl Sub for State {
    type Output = Self;

    #[inline(always)]
    fn sub(self, other: Self) -> Self {
        Self {
            x: self.x - other.x,
            y: self.y - other.y,
            theta: self.theta - other.theta,
            vx: self.vx - other.vx,
            vy: self.vy - other.vy,
            omega: self.omega - other.omega,
        }
    }
}

impl Mul<f64> for State {
    type Output = Self;

    #[inline(always)]
    fn mul(self, scalar: f64) -> Self {
        Self {
            x: self.x * scalar,
            y: self.y * scalar,
            theta: self.theta * scalar,
            vx: self.vx * scalar,
            vy: self.vy * scalar,
            omega: self.omega * scalar,
        }
    }
}
