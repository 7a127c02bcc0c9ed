//! Nearest-hostile target selection.
//!
//! Targeting reads a [`TargetingSnapshot`] captured once at the start of the
//! combat phase, so the result for each entity does not depend on how far
//! earlier entities moved during the same tick. Liveness is still checked
//! against the roster, which means an entity killed earlier in the tick is
//! never selected.

use crate::components::Faction;
use crate::entity::EntityId;
use crate::math::{within_radius, Fixed, Vec2Fixed};
use crate::roster::Roster;

/// A targetable entity as seen by the targeting query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetCandidate {
    /// Entity handle.
    pub id: EntityId,
    /// Side the entity fights for.
    pub faction: Faction,
    /// Position at capture time.
    pub position: Vec2Fixed,
}

/// Find the nearest candidate of `faction` within `radius` of `origin`.
///
/// The radius is inclusive. Equal distances resolve to the lowest id.
#[must_use]
pub fn find_nearest(
    candidates: &[TargetCandidate],
    origin: Vec2Fixed,
    radius: Fixed,
    faction: Faction,
) -> Option<EntityId> {
    candidates
        .iter()
        .filter(|c| c.faction == faction && within_radius(origin, c.position, radius))
        .map(|c| (origin.distance_key(c.position), c.id))
        .min()
        .map(|(_, id)| id)
}

/// Positions of all targetable entities at one instant, sorted by id.
#[derive(Debug, Clone, Default)]
pub struct TargetingSnapshot {
    candidates: Vec<TargetCandidate>,
}

impl TargetingSnapshot {
    /// Capture every targetable entity in the roster.
    #[must_use]
    pub fn capture(roster: &Roster) -> Self {
        let candidates = roster
            .iter()
            .filter(|(_, entity)| entity.is_targetable())
            .map(|(id, entity)| TargetCandidate {
                id,
                faction: entity.faction(),
                position: entity.position,
            })
            .collect();
        Self { candidates }
    }

    /// All captured candidates.
    #[must_use]
    pub fn candidates(&self) -> &[TargetCandidate] {
        &self.candidates
    }

    /// Captured position of `id`.
    #[must_use]
    pub fn position_of(&self, id: EntityId) -> Option<Vec2Fixed> {
        self.candidates
            .binary_search_by_key(&id, |c| c.id)
            .ok()
            .map(|index| self.candidates[index].position)
    }

    /// Nearest live entity of `faction` within `radius` of `origin`.
    #[must_use]
    pub fn find_nearest(
        &self,
        roster: &Roster,
        origin: Vec2Fixed,
        radius: Fixed,
        faction: Faction,
    ) -> Option<EntityId> {
        self.candidates
            .iter()
            .filter(|c| c.faction == faction && within_radius(origin, c.position, radius))
            .filter(|c| roster.is_targetable(c.id))
            .map(|c| (origin.distance_key(c.position), c.id))
            .min()
            .map(|(_, id)| id)
    }

    /// Live entities of `faction` within `radius` of `center`, in id order.
    #[must_use]
    pub fn within(
        &self,
        roster: &Roster,
        center: Vec2Fixed,
        radius: Fixed,
        faction: Faction,
    ) -> Vec<TargetCandidate> {
        self.candidates
            .iter()
            .filter(|c| c.faction == faction && roster.is_targetable(c.id))
            .filter(|c| within_radius(center, c.position, radius))
            .copied()
            .collect()
    }
}
