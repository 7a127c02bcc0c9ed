//! Test fixtures and helpers.
//!
//! Pre-built blueprints and levels for consistent testing.

use duel_core::components::{AreaEffect, CombatStats, Faction, KindId, StatMultipliers};
use duel_core::data::{LevelConfig, UnitBlueprint};
use duel_core::difficulty::{DifficultyCurve, DifficultyCurves};
use duel_core::economy::EconomySettings;
use duel_core::math::Vec2Fixed;
use duel_core::path::WaypointPath;
use duel_core::pool::PoolSettings;
use duel_core::simulation::Simulation;
use duel_core::spawning::SpawnPlacement;
use duel_core::waves::{KindSelector, SchedulerSettings, SpawnGroup, Wave};
use fixed::types::I32F32;

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a fixed-point number from a float (for tests only).
///
/// Note: In real simulation code, never use floats.
/// This is only for convenient test setup.
#[must_use]
pub fn fixed_f(n: f64) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a fixed-point point from integers.
#[must_use]
pub fn point(x: i32, y: i32) -> Vec2Fixed {
    Vec2Fixed::from_ints(x, y)
}

/// Fast enemy walker.
#[must_use]
pub fn goblin() -> UnitBlueprint {
    UnitBlueprint::new(
        "goblin",
        Faction::Enemy,
        CombatStats::new(5, 40, fixed(1), fixed(1)).with_speed(fixed_f(1.5)),
    )
    .with_rewards(5, 10)
}

/// Slow, tough enemy.
#[must_use]
pub fn brute() -> UnitBlueprint {
    UnitBlueprint::new(
        "brute",
        Faction::Enemy,
        CombatStats::new(12, 120, fixed(1), fixed_f(1.5)).with_speed(fixed(1)),
    )
    .with_rewards(12, 25)
}

/// Immobile ranged player unit.
#[must_use]
pub fn archer() -> UnitBlueprint {
    UnitBlueprint::new(
        "archer",
        Faction::Player,
        CombatStats::new(15, 60, fixed(5), fixed(1)),
    )
    .with_deploy(30, fixed(2))
}

/// Mobile melee player unit that chases what it detects.
#[must_use]
pub fn knight() -> UnitBlueprint {
    UnitBlueprint::new(
        "knight",
        Faction::Player,
        CombatStats::new(20, 150, fixed(1), fixed(1))
            .with_speed(fixed_f(1.5))
            .with_detection_radius(fixed(6)),
    )
    .with_deploy(50, fixed(3))
    .with_pool(PoolSettings::new(4, true))
}

/// Immobile player unit with splash damage.
#[must_use]
pub fn mage() -> UnitBlueprint {
    UnitBlueprint::new(
        "mage",
        Faction::Player,
        CombatStats::new(30, 40, fixed(4), fixed(2)),
    )
    .with_area_effect(AreaEffect::new(fixed(3)))
    .with_deploy(60, fixed(4))
}

/// Two-point path along the x axis.
#[must_use]
pub fn straight_path(length: i32) -> WaypointPath {
    WaypointPath::new(vec![point(0, 0), point(length, 0)])
}

/// Scheduler with no delays that starts waves by itself.
#[must_use]
pub fn instant_scheduler() -> SchedulerSettings {
    SchedulerSettings {
        initial_delay: fixed(0),
        announce_duration: fixed(0),
        auto_start: true,
    }
}

/// Economy with no regeneration.
#[must_use]
pub fn flat_economy(starting_balance: u32) -> EconomySettings {
    EconomySettings {
        starting_balance,
        cap: 10_000,
        regen_per_second: fixed(0),
    }
}

/// Single wave of `count` goblins on a straight path, no delays.
#[must_use]
pub fn single_wave_level(count: u32) -> LevelConfig {
    LevelConfig::default()
        .with_economy(flat_economy(100))
        .with_scheduler(instant_scheduler())
        .with_blueprint(goblin())
        .with_wave(Wave::new(vec![SpawnGroup::new("goblin", count)]))
        .with_path(straight_path(40))
}

/// Three-wave level with scaling, a weighted group and a boss wave.
#[must_use]
pub fn skirmish_level(seed: u64) -> LevelConfig {
    let mixed = KindSelector::Weighted(
        [(KindId::from("goblin"), 3), (KindId::from("brute"), 1)]
            .into_iter()
            .collect(),
    );

    LevelConfig::default()
        .with_seed(seed)
        .with_economy(EconomySettings {
            starting_balance: 200,
            cap: 1000,
            regen_per_second: fixed(2),
        })
        .with_scheduler(SchedulerSettings {
            initial_delay: fixed(1),
            announce_duration: fixed(1),
            auto_start: true,
        })
        .with_difficulty(DifficultyCurves {
            health: DifficultyCurve::Linear {
                base: fixed(1),
                per_wave: fixed_f(0.25),
            },
            speed: DifficultyCurve::Constant(fixed(1)),
            count: DifficultyCurve::Linear {
                base: fixed(1),
                per_wave: fixed_f(0.5),
            },
        })
        .with_blueprint(goblin())
        .with_blueprint(brute())
        .with_blueprint(archer())
        .with_blueprint(knight())
        .with_blueprint(mage())
        .with_wave(Wave::new(vec![SpawnGroup::new("goblin", 3)]).with_clear_reward(20))
        .with_wave(
            Wave::new(vec![
                SpawnGroup::new(mixed, 4).with_interval(fixed_f(0.5)),
                SpawnGroup::new("goblin", 2),
            ])
            .with_group_delay(fixed(2))
            .with_clear_reward(30),
        )
        .with_wave(
            Wave::new(vec![SpawnGroup::new("brute", 2)
                .with_multipliers(StatMultipliers::new(fixed(2), fixed(1), fixed_f(1.5)))])
            .as_boss()
            .with_clear_reward(50),
        )
        .with_path(WaypointPath::new(vec![point(0, 0), point(20, 0), point(20, 10)]))
        .with_placement(SpawnPlacement::Scatter {
            center: point(0, 0),
            radius: fixed(1),
        })
}

/// [`skirmish_level`] with an archer, a knight and a mage deployed along the path.
///
/// # Panics
///
/// Panics if a deployment is refused.
#[must_use]
pub fn defended_simulation(seed: u64) -> Simulation {
    let mut sim = Simulation::new(skirmish_level(seed));
    for (kind, position) in [
        ("archer", point(8, 2)),
        ("knight", point(16, 2)),
        ("mage", point(21, 5)),
    ] {
        sim.deploy(&KindId::from(kind), position)
            .unwrap_or_else(|err| panic!("fixture deploy of {kind} failed: {err}"));
    }
    sim
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_levels_are_clean() {
        assert!(single_wave_level(3).validate().is_empty());
        assert!(skirmish_level(1).validate().is_empty());
    }

    #[test]
    fn test_defended_simulation_charges_deployments() {
        let sim = defended_simulation(1);
        assert_eq!(sim.balance(), 200 - 30 - 50 - 60);
        assert_eq!(sim.roster().live_count_of(Faction::Player), 3);
    }
}
