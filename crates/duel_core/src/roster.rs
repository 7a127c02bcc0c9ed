//! Per-kind entity pools.
//!
//! Each registered blueprint owns one [`ObjectPool`] of [`CombatEntity`]
//! shells. An [`EntityId`] names the pool and the generational handle, so
//! ids from a released entity never resolve to its successor.

use std::collections::BTreeMap;

use crate::components::{Faction, KindId};
use crate::data::UnitBlueprint;
use crate::entity::{CombatEntity, EntityId};
use crate::pool::ObjectPool;

/// All entity pools of a level.
#[derive(Debug, Default)]
pub struct Roster {
    pools: Vec<ObjectPool<CombatEntity>>,
    factions: Vec<Faction>,
    kinds: BTreeMap<KindId, u32>,
}

impl Roster {
    /// Create an empty roster.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a blueprint, pre-filling its pool.
    ///
    /// Registering the same kind twice keeps the first pool.
    pub fn register_kind(&mut self, blueprint: &UnitBlueprint) -> u32 {
        if let Some(&index) = self.kinds.get(&blueprint.id) {
            tracing::warn!(kind = %blueprint.id, "Kind registered twice; keeping first blueprint");
            return index;
        }

        let shell = CombatEntity::from_blueprint(blueprint);
        let pool = ObjectPool::with_settings(move || shell.clone(), blueprint.pool);
        let index = self.pools.len() as u32;
        self.pools.push(pool);
        self.factions.push(blueprint.faction);
        self.kinds.insert(blueprint.id.clone(), index);
        tracing::debug!(kind = %blueprint.id, pool = index, "Registered entity kind");
        index
    }

    /// Whether a blueprint is registered under `kind`.
    #[must_use]
    pub fn has_kind(&self, kind: &KindId) -> bool {
        self.kinds.contains_key(kind)
    }

    /// Lowest registered kind of `faction`, in name order.
    #[must_use]
    pub fn first_kind(&self, faction: Faction) -> Option<&KindId> {
        self.kinds
            .iter()
            .find(|(_, &index)| self.factions.get(index as usize) == Some(&faction))
            .map(|(kind, _)| kind)
    }

    /// Take an entity of `kind` from its pool.
    ///
    /// Returns `None` for unknown kinds or when the pool is exhausted.
    pub fn acquire(&mut self, kind: &KindId) -> Option<EntityId> {
        let index = *self.kinds.get(kind)?;
        let pool = self.pools.get_mut(index as usize)?;
        let handle = pool.acquire()?;
        let id = EntityId::new(index, handle);
        if let Some(entity) = pool.get_mut(handle) {
            entity.assign_id(id);
        }
        Some(id)
    }

    /// Return an entity to its pool. Stale ids are ignored.
    pub fn release(&mut self, id: EntityId) -> bool {
        self.pools
            .get_mut(id.pool() as usize)
            .is_some_and(|pool| pool.release(id.handle()))
    }

    /// Get a live entity.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&CombatEntity> {
        self.pools.get(id.pool() as usize)?.get(id.handle())
    }

    /// Get a live entity mutably.
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut CombatEntity> {
        self.pools.get_mut(id.pool() as usize)?.get_mut(id.handle())
    }

    /// Whether `id` names a live entity that may be targeted.
    #[must_use]
    pub fn is_targetable(&self, id: EntityId) -> bool {
        self.get(id).is_some_and(CombatEntity::is_targetable)
    }

    /// Ids of all live entities in deterministic order.
    #[must_use]
    pub fn ids(&self) -> Vec<EntityId> {
        self.iter().map(|(id, _)| id).collect()
    }

    /// Iterate live entities in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &CombatEntity)> {
        self.pools.iter().enumerate().flat_map(|(index, pool)| {
            pool.iter_live()
                .map(move |(handle, entity)| (EntityId::new(index as u32, handle), entity))
        })
    }

    /// Number of live entities.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.pools.iter().map(ObjectPool::live_count).sum()
    }

    /// Number of live entities of `faction`.
    #[must_use]
    pub fn live_count_of(&self, faction: Faction) -> usize {
        self.iter()
            .filter(|(_, entity)| entity.faction() == faction)
            .count()
    }

    /// Pool backing `kind`.
    #[must_use]
    pub fn pool(&self, kind: &KindId) -> Option<&ObjectPool<CombatEntity>> {
        let index = *self.kinds.get(kind)?;
        self.pools.get(index as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::CombatStats;
    use crate::math::Fixed;
    use crate::pool::PoolSettings;

    fn blueprint(id: &str, faction: Faction, pool: usize) -> UnitBlueprint {
        UnitBlueprint::new(id, faction, CombatStats::new(5, 20, Fixed::ONE, Fixed::ONE))
            .with_pool(PoolSettings::new(pool, false))
    }

    #[test]
    fn test_acquire_assigns_id() {
        let mut roster = Roster::new();
        roster.register_kind(&blueprint("imp", Faction::Enemy, 2));

        let id = roster.acquire(&KindId::from("imp")).unwrap();
        assert_eq!(roster.get(id).unwrap().id(), Some(id));
        assert!(roster.is_targetable(id));
        assert_eq!(roster.live_count(), 1);
    }

    #[test]
    fn test_unknown_kind_acquires_nothing() {
        let mut roster = Roster::new();
        assert!(roster.acquire(&KindId::from("ghost")).is_none());
    }

    #[test]
    fn test_released_id_stops_resolving() {
        let mut roster = Roster::new();
        roster.register_kind(&blueprint("imp", Faction::Enemy, 1));
        let kind = KindId::from("imp");

        let first = roster.acquire(&kind).unwrap();
        assert!(roster.release(first));
        let second = roster.acquire(&kind).unwrap();

        assert_ne!(first, second);
        assert!(roster.get(first).is_none());
        assert!(!roster.release(first));
    }

    #[test]
    fn test_ids_are_sorted() {
        let mut roster = Roster::new();
        roster.register_kind(&blueprint("b_tower", Faction::Player, 2));
        roster.register_kind(&blueprint("a_imp", Faction::Enemy, 2));

        roster.acquire(&KindId::from("a_imp"));
        roster.acquire(&KindId::from("b_tower"));
        roster.acquire(&KindId::from("a_imp"));

        let ids = roster.ids();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
        assert_eq!(roster.live_count_of(Faction::Enemy), 2);
    }

    #[test]
    fn test_first_kind_by_faction() {
        let mut roster = Roster::new();
        roster.register_kind(&blueprint("zombie", Faction::Enemy, 1));
        roster.register_kind(&blueprint("archer", Faction::Player, 1));
        roster.register_kind(&blueprint("bat", Faction::Enemy, 1));

        assert_eq!(roster.first_kind(Faction::Enemy), Some(&KindId::from("bat")));
        assert_eq!(roster.first_kind(Faction::Player), Some(&KindId::from("archer")));
    }
}
