//! Damage resolution.
//!
//! An attack deals full damage to its primary target. Attackers carrying an
//! [`AreaEffect`](crate::components::AreaEffect) additionally splash hostiles
//! around the impact point; splash damage falls off linearly with distance
//! and is scaled by the falloff factor, so even a hit at the impact point
//! deals `damage * falloff`.

use crate::entity::EntityId;
use crate::math::Fixed;
use crate::roster::Roster;
use crate::targeting::TargetingSnapshot;

/// Level-wide splash falloff factor when none is configured.
pub const DEFAULT_AREA_FALLOFF: Fixed = Fixed::from_bits(1 << 31);

/// One application of damage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DamageReport {
    /// Entity that attacked.
    pub attacker: EntityId,
    /// Entity that was hit.
    pub target: EntityId,
    /// Health actually removed.
    pub amount: u32,
    /// Whether the hit was lethal.
    pub killed: bool,
    /// Whether this was splash rather than the primary hit.
    pub splash: bool,
}

/// Splash damage at `distance` from the impact point.
///
/// `floor(max(0, damage * (1 - distance / radius) * falloff))`. Zero when
/// the radius is not positive or the distance reaches it.
#[must_use]
pub fn area_damage(damage: u32, distance: Fixed, radius: Fixed, falloff: Fixed) -> u32 {
    if radius <= Fixed::ZERO || distance >= radius || falloff <= Fixed::ZERO {
        return 0;
    }
    let proximity = Fixed::ONE - distance.max(Fixed::ZERO) / radius;
    let raw = Fixed::saturating_from_num(damage)
        .saturating_mul(proximity)
        .saturating_mul(falloff);
    if raw <= Fixed::ZERO {
        return 0;
    }
    raw.floor().to_num::<i64>().clamp(0, i64::from(u32::MAX)) as u32
}

/// Resolve one attack from `attacker` on `target`.
///
/// Returns a report per entity that lost health, primary hit first. A
/// target that is no longer targetable, or was not in `snapshot`, produces
/// no reports. Splash is centred on the target's snapshot position.
pub fn resolve_attack(
    roster: &mut Roster,
    snapshot: &TargetingSnapshot,
    attacker: EntityId,
    target: EntityId,
    default_falloff: Fixed,
) -> Vec<DamageReport> {
    let Some(source) = roster.get(attacker) else {
        return Vec::new();
    };
    let damage = source.stats().attack;
    let hostile = source.faction().opponent();
    let area = source.area_effect();

    if !roster.is_targetable(target) {
        return Vec::new();
    }
    // Impact is where the target stood when targeting ran.
    let Some(impact) = snapshot.position_of(target) else {
        return Vec::new();
    };

    let mut reports = Vec::new();
    if let Some(victim) = roster.get_mut(target) {
        let outcome = victim.apply_damage(damage);
        reports.push(DamageReport {
            attacker,
            target,
            amount: outcome.dealt,
            killed: outcome.killed,
            splash: false,
        });
    }

    let Some(area) = area else {
        return reports;
    };
    let falloff = area.falloff.unwrap_or(default_falloff);

    for candidate in snapshot.within(roster, impact, area.radius, hostile) {
        if candidate.id == target {
            continue;
        }
        let distance = impact.distance(candidate.position);
        let amount = area_damage(damage, distance, area.radius, falloff);
        if amount == 0 {
            continue;
        }
        if let Some(victim) = roster.get_mut(candidate.id) {
            let outcome = victim.apply_damage(amount);
            reports.push(DamageReport {
                attacker,
                target: candidate.id,
                amount: outcome.dealt,
                killed: outcome.killed,
                splash: true,
            });
        }
    }

    reports
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{AreaEffect, CombatStats, Faction, KindId};
    use crate::data::UnitBlueprint;
    use crate::math::Vec2Fixed;

    #[test]
    fn test_area_damage_falloff() {
        // 100 damage, 1.5 from impact, radius 3, falloff 0.5 -> 25.
        let amount = area_damage(
            100,
            Fixed::from_num(1.5),
            Fixed::from_num(3),
            DEFAULT_AREA_FALLOFF,
        );
        assert_eq!(amount, 25);
    }

    #[test]
    fn test_area_damage_at_or_beyond_radius() {
        let r = Fixed::from_num(3);
        assert_eq!(area_damage(100, r, r, Fixed::ONE), 0);
        assert_eq!(area_damage(100, Fixed::from_num(4), r, Fixed::ONE), 0);
        assert_eq!(area_damage(100, Fixed::ZERO, Fixed::ZERO, Fixed::ONE), 0);
    }

    #[test]
    fn test_area_damage_at_impact_point() {
        assert_eq!(area_damage(100, Fixed::ZERO, Fixed::from_num(2), DEFAULT_AREA_FALLOFF), 50);
    }

    fn arena() -> (Roster, EntityId, EntityId, EntityId, EntityId) {
        let mut roster = Roster::new();
        let mage = UnitBlueprint::new(
            "mage",
            Faction::Player,
            CombatStats::new(100, 50, Fixed::from_num(10), Fixed::ONE),
        )
        .with_area_effect(AreaEffect::new(Fixed::from_num(3)));
        let imp = UnitBlueprint::new(
            "imp",
            Faction::Enemy,
            CombatStats::new(1, 200, Fixed::ONE, Fixed::ONE),
        );
        let guard = UnitBlueprint::new(
            "guard",
            Faction::Player,
            CombatStats::new(1, 200, Fixed::ONE, Fixed::ONE),
        );
        roster.register_kind(&mage);
        roster.register_kind(&imp);
        roster.register_kind(&guard);

        let place = |roster: &mut Roster, kind: &str, x: f64| {
            let id = roster.acquire(&KindId::from(kind)).unwrap();
            roster.get_mut(id).unwrap().position = Vec2Fixed::new(Fixed::from_num(x), Fixed::ZERO);
            id
        };
        let caster = place(&mut roster, "mage", -5.0);
        let primary = place(&mut roster, "imp", 0.0);
        let splashed = place(&mut roster, "imp", 1.5);
        let ally = place(&mut roster, "guard", 1.0);
        (roster, caster, primary, splashed, ally)
    }

    #[test]
    fn test_resolve_attack_with_splash() {
        let (mut roster, caster, primary, splashed, ally) = arena();
        let snapshot = TargetingSnapshot::capture(&roster);

        let reports = resolve_attack(&mut roster, &snapshot, caster, primary, DEFAULT_AREA_FALLOFF);

        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].target, primary);
        assert_eq!(reports[0].amount, 100);
        assert!(!reports[0].splash);
        assert_eq!(reports[1].target, splashed);
        assert_eq!(reports[1].amount, 25);
        assert!(reports[1].splash);

        // Same-faction entities are never splashed.
        assert_eq!(roster.get(ally).unwrap().health().current, 200);
        assert_eq!(roster.get(splashed).unwrap().health().current, 175);
    }

    #[test]
    fn test_splash_centres_on_snapshot_position() {
        let (mut roster, caster, primary, splashed, _) = arena();
        let snapshot = TargetingSnapshot::capture(&roster);
        // The target walks onto its neighbour after targeting ran.
        roster.get_mut(primary).unwrap().position = Vec2Fixed::new(Fixed::from_num(1.5), Fixed::ZERO);

        let reports = resolve_attack(&mut roster, &snapshot, caster, primary, DEFAULT_AREA_FALLOFF);

        assert_eq!(reports.len(), 2);
        assert_eq!(reports[1].target, splashed);
        assert_eq!(reports[1].amount, 25);
    }

    #[test]
    fn test_resolve_attack_on_dead_target_does_nothing() {
        let (mut roster, caster, primary, _, _) = arena();
        let snapshot = TargetingSnapshot::capture(&roster);
        roster.get_mut(primary).unwrap().apply_damage(1000);

        let reports = resolve_attack(&mut roster, &snapshot, caster, primary, DEFAULT_AREA_FALLOFF);
        assert!(reports.is_empty());
    }
}
