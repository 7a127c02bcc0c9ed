//! Combat entities and their behaviour state machine.
//!
//! Every combatant, player defender or wave hostile, is a [`CombatEntity`].
//! The transition table lives in [`next_state`]; [`crate::systems`] feeds
//! it an observation each tick and carries out the resulting action.
//!
//! ```text
//!            target out of range              target in range, ready
//!   Idle ─────────────────────────► Seeking ─────────────────────────► Attacking
//!    ▲  ◄──────── target lost ────────┘  ▲                                 │
//!    │                                   └──── target left range ──────────┘
//!    └──────────────────────── target lost ────────────────────────────────┘
//!
//!   any ── health reaches 0 ──► Dead (terminal)
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::components::{AreaEffect, CombatState, CombatStats, Faction, Health, KindId, StatMultipliers};
use crate::data::UnitBlueprint;
use crate::math::{Fixed, Vec2Fixed};
use crate::pool::{PoolHandle, Poolable};

/// Generation-checked entity handle: which pool, which slot, which use.
///
/// Ordering is by pool then slot, which is the deterministic processing
/// order used everywhere in the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId {
    pool: u32,
    handle: PoolHandle,
}

impl EntityId {
    pub(crate) const fn new(pool: u32, handle: PoolHandle) -> Self {
        Self { pool, handle }
    }

    /// Index of the kind pool that owns this entity.
    #[must_use]
    pub const fn pool(self) -> u32 {
        self.pool
    }

    /// Pool handle of this entity.
    #[must_use]
    pub const fn handle(self) -> PoolHandle {
        self.handle
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{}:{}v{}",
            self.pool,
            self.handle.slot(),
            self.handle.generation()
        )
    }
}

/// What an entity can currently see of its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetObservation {
    /// No live target.
    None,
    /// Target held but farther than attack range.
    OutOfRange,
    /// Target within attack range.
    InRange {
        /// Whether the attack cooldown has elapsed.
        cooldown_ready: bool,
    },
}

/// Behaviour transition table, evaluated once per tick.
///
/// `Dead` is terminal. A target within range whose attack is still
/// recharging keeps an attacker in `Attacking`; any other combatant holds
/// position in `Idle` until the attack is ready.
#[must_use]
pub fn next_state(current: CombatState, observation: TargetObservation) -> CombatState {
    use CombatState::{Attacking, Dead, Idle, Seeking};
    use TargetObservation as Obs;

    match (current, observation) {
        (Dead, _) => Dead,

        (_, Obs::None) => Idle,

        (Idle | Seeking | Attacking, Obs::OutOfRange) => Seeking,

        (_, Obs::InRange { cooldown_ready: true }) => Attacking,
        (Attacking, Obs::InRange { cooldown_ready: false }) => Attacking,
        (Idle | Seeking, Obs::InRange { cooldown_ready: false }) => Idle,
    }
}

/// Result of applying damage to an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DamageOutcome {
    /// Health actually removed.
    pub dealt: u32,
    /// Whether this damage killed the entity.
    pub killed: bool,
}

/// Rewards and penalties attached to an entity's kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EntityRewards {
    /// Duel points awarded when this entity is defeated in combat.
    pub bounty: u32,
    /// Duel points lost when this entity reaches the objective.
    pub breach_penalty: u32,
}

/// A simulated combatant.
#[derive(Debug, Clone)]
pub struct CombatEntity {
    id: Option<EntityId>,
    kind: KindId,
    faction: Faction,
    /// World position.
    pub position: Vec2Fixed,
    facing: Vec2Fixed,
    base: CombatStats,
    current: CombatStats,
    health: Health,
    state: CombatState,
    target: Option<EntityId>,
    last_attack_at: Option<Fixed>,
    area_effect: Option<AreaEffect>,
    rewards: EntityRewards,
    waypoint_index: usize,
    wave: Option<u32>,
    objective_reached: bool,
    active: bool,
}

impl CombatEntity {
    /// Build a deactivated shell from a blueprint.
    #[must_use]
    pub fn from_blueprint(blueprint: &UnitBlueprint) -> Self {
        Self {
            id: None,
            kind: blueprint.id.clone(),
            faction: blueprint.faction,
            position: Vec2Fixed::ZERO,
            facing: Vec2Fixed::ZERO,
            base: blueprint.stats,
            current: blueprint.stats,
            health: Health::new(blueprint.stats.max_health.max(1)),
            state: CombatState::Idle,
            target: None,
            last_attack_at: None,
            area_effect: blueprint.area_effect,
            rewards: EntityRewards {
                bounty: blueprint.bounty,
                breach_penalty: blueprint.breach_penalty,
            },
            waypoint_index: 0,
            wave: None,
            objective_reached: false,
            active: false,
        }
    }

    /// Reset for a new use: apply multipliers, refill health, place.
    pub fn prepare_spawn(
        &mut self,
        multipliers: &StatMultipliers,
        position: Vec2Fixed,
        wave: Option<u32>,
    ) {
        self.current = self.base.scaled(multipliers);
        self.health = Health::new(self.current.max_health);
        self.position = position;
        self.facing = Vec2Fixed::ZERO;
        self.state = CombatState::Idle;
        self.target = None;
        self.last_attack_at = None;
        self.waypoint_index = 0;
        self.wave = wave;
        self.objective_reached = false;
    }

    pub(crate) fn assign_id(&mut self, id: EntityId) {
        self.id = Some(id);
    }

    /// Handle of this entity while it is live.
    #[must_use]
    pub fn id(&self) -> Option<EntityId> {
        self.id
    }

    /// Blueprint kind.
    #[must_use]
    pub fn kind(&self) -> &KindId {
        &self.kind
    }

    /// Side this entity fights for.
    #[must_use]
    pub const fn faction(&self) -> Faction {
        self.faction
    }

    /// Unit vector of the last movement or attack direction.
    #[must_use]
    pub const fn facing(&self) -> Vec2Fixed {
        self.facing
    }

    /// Stats before multipliers.
    #[must_use]
    pub const fn base_stats(&self) -> &CombatStats {
        &self.base
    }

    /// Stats after multipliers.
    #[must_use]
    pub const fn stats(&self) -> &CombatStats {
        &self.current
    }

    /// Current health.
    #[must_use]
    pub const fn health(&self) -> Health {
        self.health
    }

    /// Behaviour state.
    #[must_use]
    pub const fn state(&self) -> CombatState {
        self.state
    }

    /// Currently held target. May be stale; always re-validate.
    #[must_use]
    pub const fn target(&self) -> Option<EntityId> {
        self.target
    }

    /// Splash modifier, if any.
    #[must_use]
    pub const fn area_effect(&self) -> Option<AreaEffect> {
        self.area_effect
    }

    /// Bounty and breach penalty of this entity's kind.
    #[must_use]
    pub const fn rewards(&self) -> EntityRewards {
        self.rewards
    }

    /// Index of the next path waypoint.
    #[must_use]
    pub const fn waypoint_index(&self) -> usize {
        self.waypoint_index
    }

    /// Wave that spawned this entity (`None` for player deployments).
    #[must_use]
    pub const fn wave(&self) -> Option<u32> {
        self.wave
    }

    /// Whether this entity has reached the end of its path.
    #[must_use]
    pub const fn objective_reached(&self) -> bool {
        self.objective_reached
    }

    /// Whether this entity is dead.
    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.state == CombatState::Dead
    }

    /// Whether other entities may target this one.
    #[must_use]
    pub fn is_targetable(&self) -> bool {
        self.active && !self.is_dead() && !self.objective_reached
    }

    /// Whether the attack cooldown has elapsed at simulation time `now`.
    #[must_use]
    pub fn cooldown_ready(&self, now: Fixed) -> bool {
        match self.last_attack_at {
            None => true,
            Some(last) => now - last >= self.current.attack_cooldown,
        }
    }

    /// Apply damage through the health invariant.
    ///
    /// Reaching zero health switches the state to `Dead` immediately.
    /// Damage to an already dead entity is ignored.
    pub fn apply_damage(&mut self, amount: u32) -> DamageOutcome {
        if self.is_dead() {
            return DamageOutcome::default();
        }
        let dealt = self.health.apply_damage(amount);
        let killed = self.health.is_dead();
        if killed {
            self.state = CombatState::Dead;
            self.target = None;
        }
        DamageOutcome { dealt, killed }
    }

    /// Restore health up to the effective maximum.
    pub fn heal(&mut self, amount: u32) -> u32 {
        if self.is_dead() {
            return 0;
        }
        self.health.heal(amount)
    }

    pub(crate) fn set_state(&mut self, state: CombatState) {
        // Death is only ever entered through damage.
        if self.is_dead() || state == CombatState::Dead {
            return;
        }
        self.state = state;
    }

    pub(crate) fn set_target(&mut self, target: Option<EntityId>) {
        self.target = target;
    }

    pub(crate) fn face_towards(&mut self, point: Vec2Fixed) {
        let direction = (point - self.position).normalize();
        if direction != Vec2Fixed::ZERO {
            self.facing = direction;
        }
    }

    pub(crate) fn record_attack(&mut self, now: Fixed) {
        self.last_attack_at = Some(now);
    }

    pub(crate) fn advance_waypoint(&mut self) {
        self.waypoint_index += 1;
    }

    pub(crate) fn mark_objective_reached(&mut self) {
        self.objective_reached = true;
        self.target = None;
    }
}

impl Poolable for CombatEntity {
    fn activate(&mut self) {
        self.active = true;
        self.state = CombatState::Idle;
    }

    fn deactivate(&mut self) {
        self.active = false;
        self.id = None;
        self.target = None;
        self.last_attack_at = None;
        self.wave = None;
        self.objective_reached = false;
    }
}
