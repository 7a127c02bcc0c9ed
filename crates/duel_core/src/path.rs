//! Enemy paths.
//!
//! Path geometry is supplied from outside the simulation through
//! [`PathProvider`]. Enemies without a target walk the path; reaching the
//! final waypoint breaches the defended objective.

use serde::{Deserialize, Serialize};

use crate::entity::CombatEntity;
use crate::math::Vec2Fixed;

/// Source of path geometry for marching enemies.
pub trait PathProvider: Send + Sync {
    /// Where new enemies appear when no explicit spawn point is configured.
    fn spawn_point(&self) -> Vec2Fixed;

    /// Next waypoint for `entity`, or `None` when it has none left.
    fn next_waypoint(&self, entity: &CombatEntity) -> Option<Vec2Fixed>;

    /// Whether `entity` has walked the whole path.
    fn has_reached_final_waypoint(&self, entity: &CombatEntity) -> bool;
}

/// A polyline path walked from the first to the last waypoint.
///
/// An empty path has no objective: enemies stay where they spawn.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WaypointPath {
    waypoints: Vec<Vec2Fixed>,
}

impl WaypointPath {
    /// Create a path from its waypoints.
    #[must_use]
    pub fn new(waypoints: Vec<Vec2Fixed>) -> Self {
        Self { waypoints }
    }

    /// All waypoints in walking order.
    #[must_use]
    pub fn waypoints(&self) -> &[Vec2Fixed] {
        &self.waypoints
    }

    /// Whether the path has no waypoints.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }
}

impl PathProvider for WaypointPath {
    fn spawn_point(&self) -> Vec2Fixed {
        self.waypoints.first().copied().unwrap_or(Vec2Fixed::ZERO)
    }

    fn next_waypoint(&self, entity: &CombatEntity) -> Option<Vec2Fixed> {
        self.waypoints.get(entity.waypoint_index()).copied()
    }

    fn has_reached_final_waypoint(&self, entity: &CombatEntity) -> bool {
        !self.waypoints.is_empty() && entity.waypoint_index() >= self.waypoints.len()
    }
}
