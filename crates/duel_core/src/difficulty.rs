//! Per-wave difficulty curves.

use serde::{Deserialize, Serialize};

use crate::math::{decimal_serde, Fixed};

/// A multiplier as a function of the 0-based wave index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DifficultyCurve {
    /// Same value for every wave.
    Constant(#[serde(with = "decimal_serde")] Fixed),
    /// `base + per_wave * wave`.
    Linear {
        /// Value at wave 0.
        #[serde(with = "decimal_serde")]
        base: Fixed,
        /// Increment per wave.
        #[serde(with = "decimal_serde")]
        per_wave: Fixed,
    },
    /// `base * growth ^ wave`.
    Exponential {
        /// Value at wave 0.
        #[serde(with = "decimal_serde")]
        base: Fixed,
        /// Factor per wave.
        #[serde(with = "decimal_serde")]
        growth: Fixed,
    },
    /// Explicit values; waves past the end reuse the last entry.
    Table(Vec<TablePoint>),
}

/// One entry of a [`DifficultyCurve::Table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TablePoint(#[serde(with = "decimal_serde")] pub Fixed);

impl Default for DifficultyCurve {
    fn default() -> Self {
        Self::Constant(Fixed::ONE)
    }
}

impl DifficultyCurve {
    /// Multiplier for `wave_index`.
    #[must_use]
    pub fn evaluate(&self, wave_index: u32) -> Fixed {
        match self {
            Self::Constant(value) => *value,
            Self::Linear { base, per_wave } => {
                base.saturating_add(per_wave.saturating_mul(Fixed::saturating_from_num(wave_index)))
            }
            Self::Exponential { base, growth } => {
                let mut value = *base;
                for _ in 0..wave_index {
                    value = value.saturating_mul(*growth);
                }
                value
            }
            Self::Table(points) => {
                let index = (wave_index as usize).min(points.len().saturating_sub(1));
                points.get(index).map_or(Fixed::ONE, |point| point.0)
            }
        }
    }

    /// Whether the curve never decreases from one wave to the next.
    #[must_use]
    pub fn is_monotonic(&self) -> bool {
        match self {
            Self::Constant(_) => true,
            Self::Linear { per_wave, .. } => *per_wave >= Fixed::ZERO,
            Self::Exponential { base, growth } => {
                if *base > Fixed::ZERO {
                    *growth >= Fixed::ONE
                } else {
                    *base == Fixed::ZERO || (Fixed::ZERO..=Fixed::ONE).contains(growth)
                }
            }
            Self::Table(points) => points.windows(2).all(|pair| pair[0].0 <= pair[1].0),
        }
    }
}

/// The three curves applied to every spawned enemy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DifficultyCurves {
    /// Scales enemy health.
    #[serde(default)]
    pub health: DifficultyCurve,
    /// Scales enemy speed.
    #[serde(default)]
    pub speed: DifficultyCurve,
    /// Scales group spawn counts.
    #[serde(default)]
    pub count: DifficultyCurve,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_curve() {
        let curve = DifficultyCurve::Linear {
            base: Fixed::ONE,
            per_wave: Fixed::from_num(0.25),
        };
        assert_eq!(curve.evaluate(0), Fixed::ONE);
        assert_eq!(curve.evaluate(4), Fixed::from_num(2));
        assert!(curve.is_monotonic());
    }

    #[test]
    fn test_exponential_curve() {
        let curve = DifficultyCurve::Exponential {
            base: Fixed::ONE,
            growth: Fixed::from_num(2),
        };
        assert_eq!(curve.evaluate(3), Fixed::from_num(8));
        assert!(curve.is_monotonic());
    }

    #[test]
    fn test_table_curve_holds_last_value() {
        let curve = DifficultyCurve::Table(vec![
            TablePoint(Fixed::ONE),
            TablePoint(Fixed::from_num(1.5)),
        ]);
        assert_eq!(curve.evaluate(1), Fixed::from_num(1.5));
        assert_eq!(curve.evaluate(10), Fixed::from_num(1.5));
        assert_eq!(DifficultyCurve::Table(Vec::new()).evaluate(0), Fixed::ONE);
    }

    #[test]
    fn test_decreasing_curves_detected() {
        let shrinking = DifficultyCurve::Linear {
            base: Fixed::from_num(2),
            per_wave: Fixed::from_num(-0.5),
        };
        assert!(!shrinking.is_monotonic());

        let table = DifficultyCurve::Table(vec![TablePoint(Fixed::from_num(2)), TablePoint(Fixed::ONE)]);
        assert!(!table.is_monotonic());
    }

    #[test]
    fn test_curve_from_ron() {
        let curve: DifficultyCurve = ron::from_str("Linear(base: 1.0, per_wave: 0.5)").unwrap();
        assert_eq!(curve.evaluate(2), Fixed::from_num(2));
    }
}
