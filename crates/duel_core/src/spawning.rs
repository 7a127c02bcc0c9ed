//! Spawn director: what to spawn, how strong, and where.
//!
//! All randomness in the simulation comes from the director's seeded
//! `ChaCha8Rng`, so a level replayed with the same seed spawns the same
//! kinds at the same positions.

use std::collections::BTreeMap;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::components::{Faction, KindId, StatMultipliers};
use crate::difficulty::DifficultyCurves;
use crate::entity::EntityId;
use crate::math::{decimal_serde, within_radius, Fixed, Vec2Fixed};
use crate::path::PathProvider;
use crate::roster::Roster;
use crate::waves::{KindSelector, SpawnGroup};

/// Attempts at drawing a point inside a scatter circle before using its centre.
const SCATTER_ATTEMPTS: usize = 16;

/// Where wave enemies appear.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpawnPlacement {
    /// At the path provider's spawn point.
    #[default]
    PathStart,
    /// Uniformly inside a circle.
    Scatter {
        /// Circle centre.
        center: Vec2Fixed,
        /// Circle radius.
        #[serde(with = "decimal_serde")]
        radius: Fixed,
    },
    /// Cycling through fixed points.
    Points(Vec<Vec2Fixed>),
}

/// Curve multipliers for one wave.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaveMultipliers {
    /// Health multiplier.
    pub health: Fixed,
    /// Speed multiplier.
    pub speed: Fixed,
    /// Spawn-count multiplier.
    pub count: Fixed,
}

/// Pick a key with probability `weight / total`.
///
/// Draws `r` uniformly from `[0, total)` and walks the table in key order,
/// returning the first key whose cumulative weight exceeds `r`. A table
/// whose weights sum to zero yields its first key.
pub fn select_weighted<'a, K: Ord + std::fmt::Debug, R: Rng>(
    rng: &mut R,
    weights: &'a BTreeMap<K, u32>,
) -> Option<&'a K> {
    let total: u64 = weights.values().map(|&w| u64::from(w)).sum();
    if total == 0 {
        let fallback = weights.keys().next();
        if fallback.is_some() {
            tracing::warn!(?fallback, "Weighted table sums to zero; using first entry");
        }
        return fallback;
    }

    let roll = rng.gen_range(0..total);
    let mut cumulative = 0u64;
    for (key, &weight) in weights {
        cumulative += u64::from(weight);
        if roll < cumulative {
            return Some(key);
        }
    }
    weights.keys().next_back()
}

/// Chooses kinds, multipliers and positions for wave spawns.
#[derive(Debug, Clone)]
pub struct SpawnDirector {
    rng: ChaCha8Rng,
    curves: DifficultyCurves,
    placement: SpawnPlacement,
    point_cursor: usize,
}

impl SpawnDirector {
    /// Create a director with a seeded generator.
    #[must_use]
    pub fn new(seed: u64, curves: DifficultyCurves, placement: SpawnPlacement) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            curves,
            placement,
            point_cursor: 0,
        }
    }

    /// Difficulty curves in use.
    #[must_use]
    pub fn curves(&self) -> &DifficultyCurves {
        &self.curves
    }

    /// Position of the generator in its stream; equal for equal histories.
    #[must_use]
    pub fn rng_position(&self) -> u128 {
        self.rng.get_word_pos()
    }

    /// Evaluate the three difficulty curves for `wave_index`.
    #[must_use]
    pub fn compute_multipliers(&self, wave_index: u32) -> WaveMultipliers {
        WaveMultipliers {
            health: self.curves.health.evaluate(wave_index),
            speed: self.curves.speed.evaluate(wave_index),
            count: self.curves.count.evaluate(wave_index),
        }
    }

    /// Group size after the count curve, rounded half-up, never negative.
    #[must_use]
    pub fn scaled_count(&self, base: u32, wave_index: u32) -> u32 {
        let scaled = Fixed::saturating_from_num(base)
            .saturating_mul(self.compute_multipliers(wave_index).count);
        if scaled <= Fixed::ZERO {
            return 0;
        }
        let rounded = (scaled + Fixed::from_num(0.5)).floor();
        rounded.to_num::<i64>().clamp(0, i64::from(u32::MAX)) as u32
    }

    /// Resolve a selector to a registered kind.
    ///
    /// Unknown kinds fall back to the first registered enemy kind.
    pub fn select_kind(&mut self, selector: &KindSelector, roster: &Roster) -> Option<KindId> {
        let chosen = match selector {
            KindSelector::Single(kind) => Some(kind),
            KindSelector::Weighted(table) => select_weighted(&mut self.rng, table),
        };

        match chosen {
            Some(kind) if roster.has_kind(kind) => Some(kind.clone()),
            other => {
                let fallback = roster.first_kind(Faction::Enemy).cloned();
                tracing::warn!(
                    requested = ?other,
                    fallback = ?fallback,
                    "Unknown spawn kind; falling back"
                );
                fallback
            }
        }
    }

    /// Spawn one entity of `group` for `wave_index`.
    ///
    /// Returns `None` (after logging) when the group's multipliers are not
    /// positive, no kind resolves, or the pool is exhausted.
    pub fn spawn(
        &mut self,
        roster: &mut Roster,
        group: &SpawnGroup,
        wave_index: u32,
        path: &dyn PathProvider,
    ) -> Option<EntityId> {
        if !group.multipliers.is_valid() {
            tracing::warn!(wave = wave_index, multipliers = ?group.multipliers, "Non-positive multiplier; spawn skipped");
            return None;
        }

        let curve = self.compute_multipliers(wave_index);
        let multipliers = StatMultipliers::new(curve.health, curve.speed, Fixed::ONE)
            .compose(&group.multipliers);
        if !multipliers.is_valid() {
            tracing::warn!(wave = wave_index, ?multipliers, "Non-positive curve multiplier; spawn skipped");
            return None;
        }

        let kind = self.select_kind(&group.kind, roster)?;
        let Some(id) = roster.acquire(&kind) else {
            tracing::warn!(%kind, wave = wave_index, "Pool exhausted; spawn skipped");
            return None;
        };

        let position = self.next_position(path);
        if let Some(entity) = roster.get_mut(id) {
            entity.prepare_spawn(&multipliers, position, Some(wave_index));
        }
        tracing::debug!(%id, %kind, wave = wave_index, "Spawned enemy");
        Some(id)
    }

    fn next_position(&mut self, path: &dyn PathProvider) -> Vec2Fixed {
        match &self.placement {
            SpawnPlacement::PathStart => path.spawn_point(),
            SpawnPlacement::Scatter { center, radius } => {
                scatter_point(&mut self.rng, *center, *radius)
            }
            SpawnPlacement::Points(points) if !points.is_empty() => {
                let point = points[self.point_cursor % points.len()];
                self.point_cursor = self.point_cursor.wrapping_add(1);
                point
            }
            SpawnPlacement::Points(_) => path.spawn_point(),
        }
    }
}

fn scatter_point(rng: &mut ChaCha8Rng, center: Vec2Fixed, radius: Fixed) -> Vec2Fixed {
    if radius <= Fixed::ZERO {
        return center;
    }
    let bits = radius.to_bits();
    for _ in 0..SCATTER_ATTEMPTS {
        let offset = Vec2Fixed::new(
            Fixed::from_bits(rng.gen_range(-bits..=bits)),
            Fixed::from_bits(rng.gen_range(-bits..=bits)),
        );
        if within_radius(Vec2Fixed::ZERO, offset, radius) {
            return center + offset;
        }
    }
    center
}
