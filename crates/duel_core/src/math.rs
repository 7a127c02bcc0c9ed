//! Fixed-point math utilities for deterministic simulation.
//!
//! All simulation values (positions, speeds, radii, timers, multipliers)
//! use fixed-point arithmetic so that identical inputs produce identical
//! results on every platform.

use fixed::types::I32F32;
use serde::{Deserialize, Serialize};

/// Fixed-point number type for all simulation math.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
/// Range: approximately -2,147,483,648 to 2,147,483,647
/// Precision: approximately 0.00000000023
pub type Fixed = I32F32;

/// Fixed-point 2D vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Vec2Fixed {
    /// X coordinate.
    #[serde(with = "decimal_serde")]
    pub x: Fixed,
    /// Y coordinate.
    #[serde(with = "decimal_serde")]
    pub y: Fixed,
}

/// Serde support for fixed-point numbers written as decimals.
///
/// Level files are edited by hand, so values are read and written as plain
/// decimal numbers (`2.5`) and converted to fixed-point at the boundary.
/// The conversion itself is deterministic.
pub mod decimal_serde {
    use super::Fixed;
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a fixed-point number as a decimal.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_num::<f64>().serialize(serializer)
    }

    /// Deserialize a fixed-point number from a decimal.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = f64::deserialize(deserializer)?;
        Fixed::checked_from_num(raw)
            .ok_or_else(|| D::Error::custom(format!("{raw} is out of fixed-point range")))
    }
}

/// Serde support for `Option<Fixed>` written as an optional decimal.
pub mod option_decimal_serde {
    use super::Fixed;
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize an optional fixed-point number.
    pub fn serialize<S>(value: &Option<Fixed>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.map(|v| v.to_num::<f64>()).serialize(serializer)
    }

    /// Deserialize an optional fixed-point number.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Fixed>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<f64>::deserialize(deserializer)? {
            Some(raw) => Fixed::checked_from_num(raw)
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("{raw} is out of fixed-point range"))),
            None => Ok(None),
        }
    }
}

impl Vec2Fixed {
    /// Create a new fixed-point vector.
    #[must_use]
    pub const fn new(x: Fixed, y: Fixed) -> Self {
        Self { x, y }
    }

    /// Create a vector from integer coordinates.
    #[must_use]
    pub fn from_ints(x: i32, y: i32) -> Self {
        Self::new(Fixed::from_num(x), Fixed::from_num(y))
    }

    /// Zero vector.
    pub const ZERO: Self = Self {
        x: Fixed::ZERO,
        y: Fixed::ZERO,
    };

    /// Calculate squared distance (avoids sqrt for comparisons).
    ///
    /// Saturates at `Fixed::MAX` once the true value leaves the fixed-point
    /// range, roughly 46,340 units apart.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> Fixed {
        let delta = self - other;
        delta
            .x
            .saturating_mul(delta.x)
            .saturating_add(delta.y.saturating_mul(delta.y))
    }

    /// Euclidean distance. Never overestimates the true distance.
    #[must_use]
    pub fn distance(self, other: Self) -> Fixed {
        (self - other).length()
    }

    /// Ordering key for the distance from `self` to `other`.
    ///
    /// Compares by squared distance; once that saturates the true distance
    /// breaks the tie.
    #[must_use]
    pub fn distance_key(self, other: Self) -> (Fixed, Fixed) {
        let dist_sq = self.distance_squared(other);
        if dist_sq == Fixed::MAX {
            (dist_sq, self.distance(other))
        } else {
            (dist_sq, Fixed::ZERO)
        }
    }

    /// Vector magnitude, computed without squaring the raw components.
    #[must_use]
    pub fn length(self) -> Fixed {
        let ax = self.x.saturating_abs();
        let ay = self.y.saturating_abs();
        let (major, minor) = if ax >= ay { (ax, ay) } else { (ay, ax) };

        if major == Fixed::ZERO {
            return Fixed::ZERO;
        }
        if minor == Fixed::ZERO {
            return major;
        }

        // ratio <= 1, so the sum stays in [1, 2].
        let ratio = minor / major;
        major.saturating_mul(fixed_sqrt(Fixed::ONE + ratio * ratio))
    }

    /// Dot product of two vectors. Saturates instead of overflowing.
    #[must_use]
    pub fn dot(self, other: Self) -> Fixed {
        self.x
            .saturating_mul(other.x)
            .saturating_add(self.y.saturating_mul(other.y))
    }

    /// Scale both components by a scalar. Saturates instead of overflowing.
    #[must_use]
    pub fn scale(self, factor: Fixed) -> Self {
        Self::new(self.x.saturating_mul(factor), self.y.saturating_mul(factor))
    }

    /// Normalize vector using fixed-point math.
    #[must_use]
    pub fn normalize(self) -> Self {
        let len = self.length();
        if len == Fixed::ZERO {
            return Self::ZERO;
        }

        // |component| <= len, so neither division can overflow.
        Self::new(self.x / len, self.y / len)
    }

    /// Step from `self` toward `target` by at most `max_step`.
    ///
    /// Lands exactly on `target` when it is closer than `max_step`.
    #[must_use]
    pub fn move_towards(self, target: Self, max_step: Fixed) -> Self {
        if max_step <= Fixed::ZERO {
            return self;
        }
        if within_radius(self, target, max_step) {
            return target;
        }
        self + (target - self).normalize().scale(max_step)
    }
}

/// Returns true if `a` and `b` are within `radius` of each other (inclusive).
#[must_use]
pub fn within_radius(a: Vec2Fixed, b: Vec2Fixed, radius: Fixed) -> bool {
    if radius < Fixed::ZERO {
        return false;
    }
    let radius_sq = radius.saturating_mul(radius);
    if radius_sq == Fixed::MAX {
        return a.distance(b) <= radius;
    }
    a.distance_squared(b) <= radius_sq
}

/// Computes the square root of a fixed-point number using binary search.
///
/// The result is the largest value whose square does not exceed `value`,
/// so it is never larger than the true root and exact for perfect squares.
pub fn fixed_sqrt(value: Fixed) -> Fixed {
    if value <= Fixed::ZERO {
        return Fixed::ZERO;
    }

    let mut low = Fixed::ZERO;
    let mut high = value.max(Fixed::ONE).saturating_add(Fixed::DELTA);

    for _ in 0..96 {
        let mid = low + (high - low) / Fixed::from_num(2);
        if mid == low {
            break;
        }
        let mid_sq = mid.saturating_mul(mid);

        if mid_sq <= value {
            low = mid;
        } else {
            high = mid;
        }
    }

    low
}

impl std::ops::Add for Vec2Fixed {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x.saturating_add(rhs.x),
            y: self.y.saturating_add(rhs.y),
        }
    }
}

impl std::ops::Sub for Vec2Fixed {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x.saturating_sub(rhs.x),
            y: self.y.saturating_sub(rhs.y),
        }
    }
}
