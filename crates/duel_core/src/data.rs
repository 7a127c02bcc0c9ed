//! Level configuration.
//!
//! Pure data deserialized from RON. This module does no IO: callers hand in
//! the file contents and a label for error messages.
//!
//! # Example RON
//!
//! ```ron
//! LevelConfig(
//!     seed: 7,
//!     economy: (starting_balance: 100, cap: 500, regen_per_second: 2.0),
//!     blueprints: [
//!         (
//!             id: "goblin",
//!             faction: Enemy,
//!             stats: (attack: 8, max_health: 60, speed: 1.5, attack_range: 1.0, attack_cooldown: 1.0),
//!             bounty: 5,
//!         ),
//!     ],
//!     waves: [
//!         (groups: [(kind: Single("goblin"), count: 3, spawn_interval: 1.0)]),
//!     ],
//!     path: [(x: 0.0, y: 0.0), (x: 20.0, y: 0.0)],
//! )
//! ```

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::combat::DEFAULT_AREA_FALLOFF;
use crate::components::{AreaEffect, CombatStats, Faction, KindId};
use crate::difficulty::DifficultyCurves;
use crate::economy::{EconomySettings, MAX_CAP};
use crate::error::{GameError, Result};
use crate::math::{decimal_serde, Fixed};
use crate::path::WaypointPath;
use crate::pool::PoolSettings;
use crate::spawning::SpawnPlacement;
use crate::waves::{KindSelector, SchedulerSettings, Wave, MIN_SPAWN_INTERVAL};

/// Definition of one entity kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitBlueprint {
    /// Kind identifier.
    pub id: KindId,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Side the kind fights for.
    pub faction: Faction,
    /// Base stats before multipliers.
    pub stats: CombatStats,
    /// Splash modifier.
    #[serde(default)]
    pub area_effect: Option<AreaEffect>,
    /// Duel points awarded for defeating one in combat.
    #[serde(default)]
    pub bounty: u32,
    /// Duel points drained when one reaches the objective.
    #[serde(default)]
    pub breach_penalty: u32,
    /// Cost to deploy (player kinds).
    #[serde(default)]
    pub deploy_cost: u32,
    /// Seconds before the kind can be deployed again.
    #[serde(default, with = "decimal_serde")]
    pub deploy_cooldown: Fixed,
    /// Pool sizing.
    #[serde(default)]
    pub pool: PoolSettings,
}

impl UnitBlueprint {
    /// Blueprint with no rewards, costs or splash.
    #[must_use]
    pub fn new(id: impl Into<KindId>, faction: Faction, stats: CombatStats) -> Self {
        let id = id.into();
        Self {
            name: id.to_string(),
            id,
            faction,
            stats,
            area_effect: None,
            bounty: 0,
            breach_penalty: 0,
            deploy_cost: 0,
            deploy_cooldown: Fixed::ZERO,
            pool: PoolSettings::default(),
        }
    }

    /// Builder method to add splash damage.
    #[must_use]
    pub fn with_area_effect(mut self, area: AreaEffect) -> Self {
        self.area_effect = Some(area);
        self
    }

    /// Builder method to set bounty and breach penalty.
    #[must_use]
    pub fn with_rewards(mut self, bounty: u32, breach_penalty: u32) -> Self {
        self.bounty = bounty;
        self.breach_penalty = breach_penalty;
        self
    }

    /// Builder method to set deploy cost and cooldown.
    #[must_use]
    pub fn with_deploy(mut self, cost: u32, cooldown: Fixed) -> Self {
        self.deploy_cost = cost;
        self.deploy_cooldown = cooldown;
        self
    }

    /// Builder method to set pool sizing.
    #[must_use]
    pub fn with_pool(mut self, pool: PoolSettings) -> Self {
        self.pool = pool;
        self
    }
}

/// A problem found while validating a level.
///
/// None of these stop a level from running; the affected operation is
/// skipped or falls back at runtime.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigIssue {
    /// The wave list is empty.
    #[error("No waves configured")]
    NoWaves,
    /// A wave has no groups.
    #[error("Wave {wave} has no spawn groups")]
    EmptyWave {
        /// 0-based wave index.
        wave: usize,
    },
    /// A group names a kind with no blueprint.
    #[error("Wave {wave} group {group} references unknown kind '{kind}'")]
    UnknownKind {
        /// 0-based wave index.
        wave: usize,
        /// Group index.
        group: usize,
        /// Missing kind.
        kind: KindId,
    },
    /// A group spawns a player kind.
    #[error("Wave {wave} group {group} spawns player kind '{kind}'")]
    PlayerKindInWave {
        /// 0-based wave index.
        wave: usize,
        /// Group index.
        group: usize,
        /// Player kind.
        kind: KindId,
    },
    /// A weighted table whose weights sum to zero.
    #[error("Wave {wave} group {group} has a zero total weight")]
    ZeroTotalWeight {
        /// 0-based wave index.
        wave: usize,
        /// Group index.
        group: usize,
    },
    /// A multiplier that is zero or negative.
    #[error("Wave {wave} group {group} has a non-positive multiplier")]
    NonPositiveMultiplier {
        /// 0-based wave index.
        wave: usize,
        /// Group index.
        group: usize,
    },
    /// A spawn interval below the minimum; it is raised at runtime.
    #[error("Wave {wave} group {group} spawn interval is below 0.1s and will be clamped")]
    SpawnIntervalTooShort {
        /// 0-based wave index.
        wave: usize,
        /// Group index.
        group: usize,
    },
    /// A difficulty curve that decreases between waves.
    #[error("The {curve} difficulty curve decreases between waves")]
    CurveDecreasing {
        /// Which curve.
        curve: &'static str,
    },
    /// No path waypoints; enemies will not advance.
    #[error("Enemy path is empty; enemies will hold their spawn position")]
    EmptyPath,
    /// Two blueprints share an id.
    #[error("Blueprint '{0}' is defined more than once")]
    DuplicateKind(KindId),
    /// No enemy blueprint to fall back to.
    #[error("No enemy blueprints defined")]
    NoEnemyKinds,
    /// An economy cap the fixed-point balance cannot hold; it is lowered at runtime.
    #[error("Economy cap {cap} exceeds the maximum of {max} and will be clamped")]
    CapOutOfRange {
        /// Configured cap.
        cap: u32,
        /// Largest representable cap.
        max: u32,
    },
}

/// Everything needed to run one level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelConfig {
    /// Seed for all simulation randomness.
    #[serde(default)]
    pub seed: u64,
    /// Currency settings.
    #[serde(default)]
    pub economy: EconomySettings,
    /// Wave timing.
    #[serde(default)]
    pub scheduler: SchedulerSettings,
    /// Per-wave scaling.
    #[serde(default)]
    pub difficulty: DifficultyCurves,
    /// Entity kinds.
    #[serde(default)]
    pub blueprints: Vec<UnitBlueprint>,
    /// Ordered wave list.
    #[serde(default)]
    pub waves: Vec<Wave>,
    /// Enemy path.
    #[serde(default)]
    pub path: WaypointPath,
    /// Where enemies appear.
    #[serde(default)]
    pub placement: SpawnPlacement,
    /// Level-wide splash falloff factor.
    #[serde(default = "default_area_falloff", with = "decimal_serde")]
    pub area_falloff: Fixed,
}

fn default_area_falloff() -> Fixed {
    DEFAULT_AREA_FALLOFF
}

impl Default for LevelConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            economy: EconomySettings::default(),
            scheduler: SchedulerSettings::default(),
            difficulty: DifficultyCurves::default(),
            blueprints: Vec::new(),
            waves: Vec::new(),
            path: WaypointPath::default(),
            placement: SpawnPlacement::default(),
            area_falloff: DEFAULT_AREA_FALLOFF,
        }
    }
}

impl LevelConfig {
    /// Parse a level from RON text. `label` names the source in errors.
    pub fn from_ron_str(text: &str, label: &str) -> Result<Self> {
        ron::from_str(text).map_err(|e| GameError::DataParseError {
            path: label.to_string(),
            message: e.to_string(),
        })
    }

    /// Serialize to pretty RON.
    pub fn to_ron_string(&self) -> Result<String> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default()).map_err(|e| {
            GameError::InvalidState(format!("level could not be serialized: {e}"))
        })
    }

    /// Builder method to set the seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Builder method to set economy settings.
    #[must_use]
    pub fn with_economy(mut self, economy: EconomySettings) -> Self {
        self.economy = economy;
        self
    }

    /// Builder method to set scheduler timing.
    #[must_use]
    pub fn with_scheduler(mut self, scheduler: SchedulerSettings) -> Self {
        self.scheduler = scheduler;
        self
    }

    /// Builder method to set difficulty curves.
    #[must_use]
    pub fn with_difficulty(mut self, difficulty: DifficultyCurves) -> Self {
        self.difficulty = difficulty;
        self
    }

    /// Builder method to add a blueprint.
    #[must_use]
    pub fn with_blueprint(mut self, blueprint: UnitBlueprint) -> Self {
        self.blueprints.push(blueprint);
        self
    }

    /// Builder method to append a wave.
    #[must_use]
    pub fn with_wave(mut self, wave: Wave) -> Self {
        self.waves.push(wave);
        self
    }

    /// Builder method to set the enemy path.
    #[must_use]
    pub fn with_path(mut self, path: WaypointPath) -> Self {
        self.path = path;
        self
    }

    /// Builder method to set spawn placement.
    #[must_use]
    pub fn with_placement(mut self, placement: SpawnPlacement) -> Self {
        self.placement = placement;
        self
    }

    /// Builder method to set the splash falloff factor.
    #[must_use]
    pub fn with_area_falloff(mut self, falloff: Fixed) -> Self {
        self.area_falloff = falloff;
        self
    }

    /// Find a blueprint by kind.
    #[must_use]
    pub fn blueprint(&self, kind: &KindId) -> Option<&UnitBlueprint> {
        self.blueprints.iter().find(|b| &b.id == kind)
    }

    /// Check the level for problems.
    #[must_use]
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        let mut seen = BTreeSet::new();
        for blueprint in &self.blueprints {
            if !seen.insert(&blueprint.id) {
                issues.push(ConfigIssue::DuplicateKind(blueprint.id.clone()));
            }
        }
        if !self.blueprints.iter().any(|b| b.faction == Faction::Enemy) {
            issues.push(ConfigIssue::NoEnemyKinds);
        }

        if self.waves.is_empty() {
            issues.push(ConfigIssue::NoWaves);
        }
        for (wave_index, wave) in self.waves.iter().enumerate() {
            if wave.groups.is_empty() {
                issues.push(ConfigIssue::EmptyWave { wave: wave_index });
            }
            for (group_index, group) in wave.groups.iter().enumerate() {
                for kind in group.kind.kinds() {
                    match self.blueprint(kind) {
                        None => issues.push(ConfigIssue::UnknownKind {
                            wave: wave_index,
                            group: group_index,
                            kind: kind.clone(),
                        }),
                        Some(b) if b.faction == Faction::Player => {
                            issues.push(ConfigIssue::PlayerKindInWave {
                                wave: wave_index,
                                group: group_index,
                                kind: kind.clone(),
                            });
                        }
                        Some(_) => {}
                    }
                }
                if let KindSelector::Weighted(table) = &group.kind {
                    if table.values().all(|&w| w == 0) {
                        issues.push(ConfigIssue::ZeroTotalWeight {
                            wave: wave_index,
                            group: group_index,
                        });
                    }
                }
                if !group.multipliers.is_valid() {
                    issues.push(ConfigIssue::NonPositiveMultiplier {
                        wave: wave_index,
                        group: group_index,
                    });
                }
                if group.spawn_interval < MIN_SPAWN_INTERVAL {
                    issues.push(ConfigIssue::SpawnIntervalTooShort {
                        wave: wave_index,
                        group: group_index,
                    });
                }
            }
        }

        for (name, curve) in [
            ("health", &self.difficulty.health),
            ("speed", &self.difficulty.speed),
            ("count", &self.difficulty.count),
        ] {
            if !curve.is_monotonic() {
                issues.push(ConfigIssue::CurveDecreasing { curve: name });
            }
        }

        if self.path.is_empty() {
            issues.push(ConfigIssue::EmptyPath);
        }

        if self.economy.cap > MAX_CAP {
            issues.push(ConfigIssue::CapOutOfRange {
                cap: self.economy.cap,
                max: MAX_CAP,
            });
        }

        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::difficulty::DifficultyCurve;
    use crate::math::Vec2Fixed;
    use crate::waves::SpawnGroup;

    fn goblin() -> UnitBlueprint {
        UnitBlueprint::new(
            "goblin",
            Faction::Enemy,
            CombatStats::new(8, 60, Fixed::ONE, Fixed::ONE).with_speed(Fixed::ONE),
        )
    }

    fn valid_level() -> LevelConfig {
        LevelConfig::default()
            .with_blueprint(goblin())
            .with_wave(Wave::new(vec![SpawnGroup::new("goblin", 3)]))
            .with_path(WaypointPath::new(vec![
                Vec2Fixed::ZERO,
                Vec2Fixed::from_ints(10, 0),
            ]))
    }

    #[test]
    fn test_valid_level_has_no_issues() {
        assert!(valid_level().validate().is_empty());
    }

    #[test]
    fn test_validate_reports_problems() {
        let mut level = valid_level()
            .with_blueprint(goblin())
            .with_wave(Wave::new(vec![]))
            .with_wave(Wave::new(vec![
                SpawnGroup::new("dragon", 1).with_interval(Fixed::from_num(0.05)),
            ]))
            .with_path(WaypointPath::default());
        level.difficulty.health = DifficultyCurve::Linear {
            base: Fixed::ONE,
            per_wave: Fixed::from_num(-0.1),
        };

        let issues = level.validate();
        assert!(issues.contains(&ConfigIssue::DuplicateKind(KindId::from("goblin"))));
        assert!(issues.contains(&ConfigIssue::EmptyWave { wave: 1 }));
        assert!(issues.contains(&ConfigIssue::UnknownKind {
            wave: 2,
            group: 0,
            kind: KindId::from("dragon"),
        }));
        assert!(issues.contains(&ConfigIssue::SpawnIntervalTooShort { wave: 2, group: 0 }));
        assert!(issues.contains(&ConfigIssue::CurveDecreasing { curve: "health" }));
        assert!(issues.contains(&ConfigIssue::EmptyPath));
    }

    #[test]
    fn test_unrepresentable_cap_reported() {
        let mut level = valid_level();
        level.economy.cap = MAX_CAP;
        assert!(level.validate().is_empty());

        level.economy.cap = u32::MAX;
        assert!(level.validate().contains(&ConfigIssue::CapOutOfRange {
            cap: u32::MAX,
            max: MAX_CAP,
        }));
    }

    #[test]
    fn test_zero_weight_table_reported() {
        let table = [(KindId::from("goblin"), 0)].into_iter().collect();
        let level = valid_level().with_wave(Wave::new(vec![SpawnGroup::new(
            KindSelector::Weighted(table),
            1,
        )]));
        assert!(level
            .validate()
            .contains(&ConfigIssue::ZeroTotalWeight { wave: 1, group: 0 }));
    }

    #[test]
    fn test_parse_level_from_ron() {
        let text = r#"
            LevelConfig(
                seed: 7,
                economy: (starting_balance: 100, cap: 500, regen_per_second: 2.0),
                blueprints: [
                    (
                        id: "goblin",
                        faction: Enemy,
                        stats: (attack: 8, max_health: 60, speed: 1.5, attack_range: 1.0, attack_cooldown: 1.0),
                        bounty: 5,
                    ),
                    (
                        id: "mage",
                        faction: Player,
                        stats: (attack: 100, max_health: 40, attack_range: 4.0, attack_cooldown: 2.0),
                        area_effect: Some((radius: 3.0)),
                        deploy_cost: 50,
                        deploy_cooldown: 5.0,
                    ),
                ],
                waves: [
                    (groups: [(kind: Single("goblin"), count: 3, spawn_interval: 1.0)], boss: true),
                ],
                difficulty: (count: Linear(base: 1.0, per_wave: 0.5)),
                path: [(x: 0.0, y: 0.0), (x: 20.0, y: 0.0)],
            )
        "#;
        let level = LevelConfig::from_ron_str(text, "inline").unwrap();

        assert_eq!(level.seed, 7);
        assert_eq!(level.economy.cap, 500);
        assert_eq!(level.blueprints.len(), 2);
        assert_eq!(level.blueprints[0].stats.speed, Fixed::from_num(1.5));
        assert_eq!(
            level.blueprints[1].area_effect,
            Some(AreaEffect::new(Fixed::from_num(3)))
        );
        assert!(level.waves[0].boss);
        assert_eq!(level.area_falloff, DEFAULT_AREA_FALLOFF);
        assert_eq!(level.path.waypoints().len(), 2);
        assert!(level.validate().is_empty());
    }

    #[test]
    fn test_parse_error_names_source() {
        let err = LevelConfig::from_ron_str("LevelConfig(", "broken.ron").unwrap_err();
        assert!(err.to_string().contains("broken.ron"));
    }

    #[test]
    fn test_ron_roundtrip() {
        let level = valid_level().with_seed(99);
        let text = level.to_ron_string().unwrap();
        let back = LevelConfig::from_ron_str(&text, "roundtrip").unwrap();
        assert_eq!(level, back);
    }
}
