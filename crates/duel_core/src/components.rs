//! Component data shared by every combatant.
//!
//! Components are plain data. Behaviour lives in [`crate::entity`] (state
//! machine) and [`crate::systems`] (per-tick driver).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::math::{decimal_serde, Fixed};

/// Identifier of an entity kind (a blueprint), e.g. `"dark_magician"`.
///
/// Kinds are ordered by name so weighted tables and pools iterate in a
/// stable order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KindId(pub String);

impl KindId {
    /// Create a kind identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for KindId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for KindId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for KindId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Which side an entity fights for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Faction {
    /// Defenders deployed by the player.
    Player,
    /// Hostiles produced by waves.
    Enemy,
}

impl Faction {
    /// The faction this one attacks.
    #[must_use]
    pub const fn opponent(self) -> Self {
        match self {
            Self::Player => Self::Enemy,
            Self::Enemy => Self::Player,
        }
    }
}

/// Combat behaviour state. See [`crate::entity::next_state`] for transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CombatState {
    /// No target held, or holding position while the attack recharges.
    #[default]
    Idle,
    /// Closing distance to a target that is outside attack range.
    Seeking,
    /// Target in range; attacks whenever the cooldown has elapsed.
    Attacking,
    /// Health reached zero. Terminal.
    Dead,
}

/// Base or effective combat statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatStats {
    /// Damage dealt per attack.
    pub attack: u32,
    /// Maximum health ("defense" on cards).
    pub max_health: u32,
    /// Movement speed in world units per second (0 = immobile).
    #[serde(default, with = "decimal_serde")]
    pub speed: Fixed,
    /// Attack range in world units.
    #[serde(with = "decimal_serde")]
    pub attack_range: Fixed,
    /// Radius within which hostiles are noticed. Never smaller than range.
    #[serde(default, with = "decimal_serde")]
    pub detection_radius: Fixed,
    /// Seconds between attacks.
    #[serde(with = "decimal_serde")]
    pub attack_cooldown: Fixed,
}

impl CombatStats {
    /// Create stats for an immobile combatant whose detection radius equals its range.
    #[must_use]
    pub fn new(attack: u32, max_health: u32, attack_range: Fixed, attack_cooldown: Fixed) -> Self {
        Self {
            attack,
            max_health,
            speed: Fixed::ZERO,
            attack_range,
            detection_radius: attack_range,
            attack_cooldown,
        }
    }

    /// Builder method to set movement speed.
    #[must_use]
    pub const fn with_speed(mut self, speed: Fixed) -> Self {
        self.speed = speed;
        self
    }

    /// Builder method to set detection radius.
    #[must_use]
    pub const fn with_detection_radius(mut self, radius: Fixed) -> Self {
        self.detection_radius = radius;
        self
    }

    /// Whether this combatant can move.
    #[must_use]
    pub fn is_mobile(&self) -> bool {
        self.speed > Fixed::ZERO
    }

    /// Radius used to acquire new targets.
    ///
    /// Immobile combatants only engage what they can already hit.
    #[must_use]
    pub fn acquisition_radius(&self) -> Fixed {
        if self.is_mobile() {
            self.detection_radius.max(self.attack_range)
        } else {
            self.attack_range
        }
    }

    /// Apply multipliers, producing effective stats.
    ///
    /// Health never drops below 1 so a freshly spawned entity is alive.
    #[must_use]
    pub fn scaled(&self, multipliers: &StatMultipliers) -> Self {
        Self {
            attack: scale_u32(self.attack, multipliers.damage),
            max_health: scale_u32(self.max_health, multipliers.health).max(1),
            speed: self.speed.saturating_mul(multipliers.speed),
            ..*self
        }
    }
}

impl Default for CombatStats {
    fn default() -> Self {
        Self::new(10, 100, Fixed::ONE, Fixed::ONE)
    }
}

fn scale_u32(value: u32, factor: Fixed) -> u32 {
    let scaled = Fixed::saturating_from_num(value).saturating_mul(factor);
    scaled.max(Fixed::ZERO).to_num::<i64>().clamp(0, i64::from(u32::MAX)) as u32
}

/// Health points. Invariant: `current <= max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Health {
    /// Current health points.
    pub current: u32,
    /// Maximum health points.
    pub max: u32,
}

impl Health {
    /// Create new health component at full health.
    #[must_use]
    pub const fn new(max: u32) -> Self {
        Self { current: max, max }
    }

    /// Check if entity is dead (health == 0).
    #[must_use]
    pub const fn is_dead(&self) -> bool {
        self.current == 0
    }

    /// Apply damage, returning actual damage dealt.
    /// Uses saturating subtraction to prevent underflow.
    pub fn apply_damage(&mut self, amount: u32) -> u32 {
        let actual = amount.min(self.current);
        self.current -= actual;
        actual
    }

    /// Heal the entity, returning actual amount healed.
    pub fn heal(&mut self, amount: u32) -> u32 {
        let headroom = self.max.saturating_sub(self.current);
        let actual = amount.min(headroom);
        self.current += actual;
        actual
    }
}

/// Multipliers applied to base stats when an entity spawns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatMultipliers {
    /// Scales maximum health.
    #[serde(default = "one", with = "decimal_serde")]
    pub health: Fixed,
    /// Scales movement speed.
    #[serde(default = "one", with = "decimal_serde")]
    pub speed: Fixed,
    /// Scales attack damage.
    #[serde(default = "one", with = "decimal_serde")]
    pub damage: Fixed,
}

fn one() -> Fixed {
    Fixed::ONE
}

impl StatMultipliers {
    /// No scaling.
    pub const IDENTITY: Self = Self {
        health: Fixed::ONE,
        speed: Fixed::ONE,
        damage: Fixed::ONE,
    };

    /// Create multipliers.
    #[must_use]
    pub const fn new(health: Fixed, speed: Fixed, damage: Fixed) -> Self {
        Self {
            health,
            speed,
            damage,
        }
    }

    /// Multiplicative composition of two multiplier sets.
    #[must_use]
    pub fn compose(&self, other: &Self) -> Self {
        Self {
            health: self.health.saturating_mul(other.health),
            speed: self.speed.saturating_mul(other.speed),
            damage: self.damage.saturating_mul(other.damage),
        }
    }

    /// All multipliers are strictly positive.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.health > Fixed::ZERO && self.speed > Fixed::ZERO && self.damage > Fixed::ZERO
    }
}

impl Default for StatMultipliers {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Splash damage carried by an attacker (e.g. the fireball ability).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaEffect {
    /// Radius around the impact point.
    #[serde(with = "decimal_serde")]
    pub radius: Fixed,
    /// Overrides the level-wide falloff factor when set.
    #[serde(default, with = "crate::math::option_decimal_serde")]
    pub falloff: Option<Fixed>,
}

impl AreaEffect {
    /// Area effect using the level-wide falloff factor.
    #[must_use]
    pub const fn new(radius: Fixed) -> Self {
        Self {
            radius,
            falloff: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_clamps_at_zero() {
        let mut health = Health::new(30);
        assert_eq!(health.apply_damage(50), 30);
        assert!(health.is_dead());
        assert_eq!(health.current, 0);
    }

    #[test]
    fn test_health_heal_respects_max() {
        let mut health = Health::new(100);
        health.apply_damage(40);
        assert_eq!(health.heal(100), 40);
        assert_eq!(health.current, health.max);
    }

    #[test]
    fn test_scaled_stats() {
        let base = CombatStats::new(100, 200, Fixed::from_num(3), Fixed::ONE)
            .with_speed(Fixed::from_num(2));
        let m = StatMultipliers::new(
            Fixed::from_num(1.5),
            Fixed::from_num(0.5),
            Fixed::from_num(2),
        );
        let scaled = base.scaled(&m);
        assert_eq!(scaled.max_health, 300);
        assert_eq!(scaled.attack, 200);
        assert_eq!(scaled.speed, Fixed::ONE);
        assert_eq!(scaled.attack_range, base.attack_range);
    }

    #[test]
    fn test_scaled_health_never_zero() {
        let base = CombatStats::new(1, 1, Fixed::ONE, Fixed::ONE);
        let tiny = StatMultipliers::new(Fixed::from_num(0.1), Fixed::ONE, Fixed::ONE);
        assert_eq!(base.scaled(&tiny).max_health, 1);
    }

    #[test]
    fn test_multiplier_composition() {
        let a = StatMultipliers::new(Fixed::from_num(2), Fixed::ONE, Fixed::from_num(0.5));
        let b = StatMultipliers::new(Fixed::from_num(1.5), Fixed::from_num(3), Fixed::from_num(2));
        let c = a.compose(&b);
        assert_eq!(c.health, Fixed::from_num(3));
        assert_eq!(c.speed, Fixed::from_num(3));
        assert_eq!(c.damage, Fixed::ONE);
        assert!(c.is_valid());
        assert!(!StatMultipliers::new(Fixed::ZERO, Fixed::ONE, Fixed::ONE).is_valid());
    }

    #[test]
    fn test_immobile_acquisition_radius_is_range() {
        let tower = CombatStats::new(5, 50, Fixed::from_num(4), Fixed::ONE)
            .with_detection_radius(Fixed::from_num(10));
        assert_eq!(tower.acquisition_radius(), Fixed::from_num(4));

        let walker = tower.with_speed(Fixed::ONE);
        assert_eq!(walker.acquisition_radius(), Fixed::from_num(10));
    }
}
