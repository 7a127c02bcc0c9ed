//! Core simulation loop.
//!
//! The simulation runs at a fixed tick rate and owns every piece of level
//! state: the economy, the entity roster, the wave scheduler, the spawn
//! director and the path provider.
//!
//! # Tick order
//!
//! Each tick runs, in this order:
//! 1. **Economy** - regeneration and cooldowns
//! 2. **Scheduler** - wave timers; due spawns go through the spawn director
//! 3. **Combat** - every live entity, in id order, against a start-of-tick
//!    targeting snapshot
//! 4. **Maintenance** - release dead and breached entities, pay bounties,
//!    drain breach penalties, report defeats to the scheduler
//! 5. **Events** - currency delta, then publish to subscribers
//!
//! # Determinism
//!
//! - No floating-point math (uses fixed-point via [`Fixed`])
//! - One seeded generator owned by the spawn director
//! - Entities are processed in sorted id order
//!
//! # Example
//!
//! ```
//! use duel_core::prelude::*;
//!
//! let level = LevelConfig::default()
//!     .with_blueprint(UnitBlueprint::new(
//!         "goblin",
//!         Faction::Enemy,
//!         CombatStats::new(5, 30, Fixed::ONE, Fixed::ONE).with_speed(Fixed::ONE),
//!     ))
//!     .with_wave(Wave::new(vec![SpawnGroup::new("goblin", 2)]));
//!
//! let mut sim = Simulation::new(level);
//! for _ in 0..200 {
//!     sim.tick();
//! }
//! assert!(sim.stats().enemies_spawned >= 2);
//! ```

use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::components::{Faction, KindId, StatMultipliers};
use crate::data::{LevelConfig, UnitBlueprint};
use crate::economy::{ActionId, ResourceEconomy, SharedEconomy};
use crate::entity::{CombatEntity, DamageOutcome, EntityId};
use crate::error::{GameError, PlacementError, Result};
use crate::events::{DefeatCause, EventBus, EventSink, SimEvent, TickEvents};
use crate::math::{Fixed, Vec2Fixed};
use crate::path::PathProvider;
use crate::roster::Roster;
use crate::spawning::SpawnDirector;
use crate::systems::{combat_system, SystemContext};
use crate::targeting::TargetingSnapshot;
use crate::waves::{WaveScheduler, WaveState};

/// Simulation ticks per second.
pub const TICK_RATE: u32 = 16;

/// Duration of one tick in seconds (1/16, exact in fixed point).
pub const TICK_DURATION: Fixed = Fixed::from_bits(1 << 28);

/// Running totals for a level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationStats {
    /// Wave enemies that entered play.
    pub enemies_spawned: u32,
    /// Wave enemies killed in combat.
    pub enemies_killed: u32,
    /// Wave enemies that reached the objective.
    pub enemies_breached: u32,
    /// Player entities deployed.
    pub units_deployed: u32,
    /// Player entities lost.
    pub units_lost: u32,
    /// Waves cleared.
    pub waves_completed: u32,
}

/// The wave defense simulation.
pub struct Simulation {
    tick: u64,
    elapsed: Fixed,
    economy: SharedEconomy,
    roster: Roster,
    blueprints: BTreeMap<KindId, UnitBlueprint>,
    scheduler: WaveScheduler,
    director: SpawnDirector,
    path: Box<dyn PathProvider>,
    area_falloff: Fixed,
    bus: EventBus,
    pending: Vec<SimEvent>,
    reported_balance: u32,
    stats: SimulationStats,
}

impl Simulation {
    /// Build a simulation from a level.
    ///
    /// Configuration issues are logged; the level still runs and degrades
    /// as described by each issue.
    #[must_use]
    pub fn new(level: LevelConfig) -> Self {
        for issue in level.validate() {
            tracing::warn!(%issue, "Level configuration issue");
        }

        let mut roster = Roster::new();
        let mut blueprints = BTreeMap::new();
        for blueprint in level.blueprints {
            if blueprints.contains_key(&blueprint.id) {
                continue;
            }
            roster.register_kind(&blueprint);
            blueprints.insert(blueprint.id.clone(), blueprint);
        }

        let economy = ResourceEconomy::new(level.economy);
        let reported_balance = economy.balance();

        tracing::info!(
            seed = level.seed,
            waves = level.waves.len(),
            kinds = blueprints.len(),
            "Simulation created"
        );

        Self {
            tick: 0,
            elapsed: Fixed::ZERO,
            economy: SharedEconomy::new(economy),
            roster,
            blueprints,
            scheduler: WaveScheduler::new(level.waves, level.scheduler),
            director: SpawnDirector::new(level.seed, level.difficulty, level.placement),
            path: Box::new(level.path),
            area_falloff: level.area_falloff,
            bus: EventBus::new(),
            pending: Vec::new(),
            reported_balance,
            stats: SimulationStats::default(),
        }
    }

    /// Builder method to replace the path provider.
    #[must_use]
    pub fn with_path_provider(mut self, path: impl PathProvider + 'static) -> Self {
        self.path = Box::new(path);
        self
    }

    /// Add an event subscriber.
    pub fn subscribe(&mut self, sink: impl EventSink + 'static) {
        self.bus.subscribe(sink);
    }

    /// Advance the simulation by one tick.
    pub fn tick(&mut self) -> TickEvents {
        let dt = TICK_DURATION;
        let mut events = TickEvents::new(self.tick);
        events.events.append(&mut self.pending);

        // 1. Economy
        self.economy.tick(dt);

        // 2. Scheduler and spawns
        self.run_scheduler(dt, &mut events);

        // 3. Combat
        let snapshot = TargetingSnapshot::capture(&self.roster);
        let ids = self.roster.ids();
        let mut ctx = SystemContext {
            roster: &mut self.roster,
            snapshot: &snapshot,
            path: self.path.as_ref(),
            now: self.elapsed,
            dt,
            area_falloff: self.area_falloff,
        };
        let output = combat_system(&mut ctx, &ids);
        for report in output.damage {
            events.push(SimEvent::DamageDealt {
                attacker: report.attacker,
                target: report.target,
                amount: report.amount,
                splash: report.splash,
            });
        }

        // 4. Maintenance
        self.run_maintenance(&mut events);

        // 5. Currency
        let balance = self.economy.balance();
        if balance != self.reported_balance {
            events.push(SimEvent::CurrencyChanged {
                delta: i64::from(balance) - i64::from(self.reported_balance),
                balance,
            });
            self.reported_balance = balance;
        }

        self.tick += 1;
        self.elapsed += dt;

        #[cfg(any(debug_assertions, feature = "debug-validation"))]
        {
            self.check_invariants();
            let hash = self.state_hash();
            tracing::trace!(tick = self.tick, state_hash = hash, "Simulation state hash");
        }

        self.bus.publish(&events.events);
        events
    }

    fn run_scheduler(&mut self, dt: Fixed, events: &mut TickEvents) {
        let step = self.scheduler.tick(dt, &self.director);

        for event in step.events {
            if let SimEvent::WaveCompleted { wave } = event {
                self.stats.waves_completed += 1;
                let reward = self.scheduler.wave(wave).map_or(0, |w| w.clear_reward);
                if reward > 0 {
                    self.economy.add(i64::from(reward));
                }
            }
            events.push(event);
        }

        for order in step.spawns {
            let Some(group) = self
                .scheduler
                .wave(order.wave_index)
                .and_then(|wave| wave.groups.get(order.group_index))
            else {
                continue;
            };
            let spawned = self.director.spawn(
                &mut self.roster,
                group,
                order.wave_index,
                self.path.as_ref(),
            );
            let Some(id) = spawned else {
                continue;
            };

            self.scheduler.on_enemy_spawned(order.wave_index);
            self.stats.enemies_spawned += 1;
            if let Some(entity) = self.roster.get(id) {
                events.push(SimEvent::EntitySpawned {
                    id,
                    kind: entity.kind().clone(),
                    faction: entity.faction(),
                    wave: Some(order.wave_index),
                });
            }
        }
    }

    fn run_maintenance(&mut self, events: &mut TickEvents) {
        let departed: Vec<(EntityId, DefeatCause)> = self
            .roster
            .iter()
            .filter_map(|(id, entity)| {
                if entity.is_dead() {
                    Some((id, DefeatCause::Killed))
                } else if entity.objective_reached() {
                    Some((id, DefeatCause::Breached))
                } else {
                    None
                }
            })
            .collect();

        for (id, cause) in departed {
            let Some(entity) = self.roster.get(id) else {
                continue;
            };
            let kind = entity.kind().clone();
            let was_enemy = entity.faction() == Faction::Enemy;
            let wave = entity.wave();
            let rewards = entity.rewards();

            if was_enemy {
                match cause {
                    DefeatCause::Killed => {
                        self.stats.enemies_killed += 1;
                        if rewards.bounty > 0 {
                            self.economy.add(i64::from(rewards.bounty));
                        }
                    }
                    DefeatCause::Breached => {
                        self.stats.enemies_breached += 1;
                        let penalty = self.economy.with(|eco| eco.drain(rewards.breach_penalty));
                        tracing::info!(%id, penalty, "Objective breached");
                        events.push(SimEvent::ObjectiveBreached { id, penalty });
                    }
                }
                if let Some(wave) = wave {
                    self.scheduler.on_enemy_defeated(wave);
                }
            } else {
                self.stats.units_lost += 1;
            }

            self.roster.release(id);
            events.push(SimEvent::EntityDefeated {
                id,
                kind,
                was_enemy,
                cause,
            });
        }
    }

    #[cfg(any(debug_assertions, feature = "debug-validation"))]
    fn check_invariants(&self) {
        for (id, entity) in self.roster.iter() {
            let health = entity.health();
            if health.current > entity.stats().max_health {
                tracing::warn!(%id, ?health, "Health above effective maximum");
            }
            if entity.is_dead() != health.is_dead() {
                tracing::warn!(%id, ?health, state = ?entity.state(), "Dead state out of sync with health");
            }
        }

        if matches!(
            self.scheduler.state(),
            WaveState::Spawning | WaveState::AwaitingClear
        ) {
            let wave = self.scheduler.wave_index();
            let live = self
                .roster
                .iter()
                .filter(|(_, entity)| entity.wave() == Some(wave))
                .count();
            if live != self.scheduler.alive() as usize {
                tracing::warn!(
                    wave,
                    live,
                    alive = self.scheduler.alive(),
                    "Alive count out of sync with roster"
                );
            }
        }
    }

    /// Whether `cost` duel points are available.
    #[must_use]
    pub fn can_afford(&self, cost: u32) -> bool {
        self.economy.can_afford(cost)
    }

    /// Spend duel points outside of deployment (e.g. playing a card).
    pub fn try_spend(&mut self, cost: u32) -> bool {
        self.economy.try_spend(cost)
    }

    /// Deploy a player entity at `position`.
    ///
    /// Charges the blueprint's deploy cost and starts its deploy cooldown.
    pub fn deploy(
        &mut self,
        kind: &KindId,
        position: Vec2Fixed,
    ) -> std::result::Result<EntityId, PlacementError> {
        let blueprint = self
            .blueprints
            .get(kind)
            .ok_or_else(|| PlacementError::UnknownKind(kind.clone()))?;
        if blueprint.faction != Faction::Player {
            return Err(PlacementError::WrongFaction {
                kind: kind.clone(),
                faction: blueprint.faction,
            });
        }
        let cost = blueprint.deploy_cost;
        let cooldown = blueprint.deploy_cooldown;
        let action = ActionId::deploy(kind);

        self.economy.with(|eco| {
            if eco.is_on_cooldown(&action) {
                return Err(PlacementError::OnCooldown { kind: kind.clone() });
            }
            if !eco.can_afford(cost) {
                return Err(PlacementError::InsufficientFunds {
                    required: cost,
                    available: eco.balance(),
                });
            }
            Ok(())
        })?;

        let id = self
            .roster
            .acquire(kind)
            .ok_or_else(|| PlacementError::PoolExhausted(kind.clone()))?;

        let charged = self.economy.with(|eco| {
            if eco.try_spend(cost) {
                eco.start_cooldown(action, cooldown);
                Ok(())
            } else {
                Err(PlacementError::InsufficientFunds {
                    required: cost,
                    available: eco.balance(),
                })
            }
        });
        if let Err(err) = charged {
            self.roster.release(id);
            return Err(err);
        }

        if let Some(entity) = self.roster.get_mut(id) {
            entity.prepare_spawn(&StatMultipliers::IDENTITY, position, None);
        }
        self.stats.units_deployed += 1;
        tracing::debug!(%id, %kind, cost, "Deployed player unit");
        self.pending.push(SimEvent::EntitySpawned {
            id,
            kind: kind.clone(),
            faction: Faction::Player,
            wave: None,
        });
        Ok(id)
    }

    /// Apply damage to an entity from outside the combat loop.
    ///
    /// A lethal hit marks the entity dead at once; it is released and
    /// reported as defeated during the next tick's maintenance.
    pub fn apply_damage(&mut self, id: EntityId, amount: u32) -> Result<DamageOutcome> {
        let entity = self
            .roster
            .get_mut(id)
            .ok_or(GameError::EntityNotFound(id))?;
        Ok(entity.apply_damage(amount))
    }

    /// Announce the next wave now instead of waiting for its delay.
    pub fn start_next_wave(&mut self) -> bool {
        self.scheduler.start_next_wave()
    }

    /// Cancel the running wave and release every live enemy.
    ///
    /// Released handles stop resolving immediately. The wave is retried.
    pub fn abort_wave(&mut self) -> bool {
        if !self.scheduler.abort() {
            return false;
        }
        let enemies: Vec<EntityId> = self
            .roster
            .iter()
            .filter(|(_, entity)| entity.faction() == Faction::Enemy)
            .map(|(id, _)| id)
            .collect();
        for id in &enemies {
            self.roster.release(*id);
        }
        tracing::debug!(released = enemies.len(), "Released enemies of aborted wave");
        true
    }

    /// Current tick number.
    #[must_use]
    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    /// Simulated seconds since the start.
    #[must_use]
    pub fn elapsed(&self) -> Fixed {
        self.elapsed
    }

    /// Whole duel points available.
    #[must_use]
    pub fn balance(&self) -> u32 {
        self.economy.balance()
    }

    /// Handle to the shared economy.
    #[must_use]
    pub fn economy(&self) -> SharedEconomy {
        self.economy.clone()
    }

    /// Entity storage.
    #[must_use]
    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// Get a live entity.
    #[must_use]
    pub fn entity(&self, id: EntityId) -> Option<&CombatEntity> {
        self.roster.get(id)
    }

    /// Wave scheduler.
    #[must_use]
    pub fn scheduler(&self) -> &WaveScheduler {
        &self.scheduler
    }

    /// Registered blueprints.
    #[must_use]
    pub fn blueprint(&self, kind: &KindId) -> Option<&UnitBlueprint> {
        self.blueprints.get(kind)
    }

    /// Running totals.
    #[must_use]
    pub fn stats(&self) -> SimulationStats {
        self.stats
    }

    /// Whether every wave has completed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.scheduler.is_complete()
    }

    /// Compute a hash of the simulation state for determinism checks.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();

        self.tick.hash(&mut hasher);
        self.elapsed.hash(&mut hasher);
        self.economy
            .with(|eco| eco.exact_balance())
            .hash(&mut hasher);

        self.scheduler.state().hash(&mut hasher);
        self.scheduler.wave_index().hash(&mut hasher);
        self.scheduler.alive().hash(&mut hasher);
        self.scheduler.remaining_to_spawn().hash(&mut hasher);
        self.scheduler.timer().hash(&mut hasher);
        self.director.rng_position().hash(&mut hasher);

        // Roster iteration is already in id order.
        for (id, entity) in self.roster.iter() {
            id.hash(&mut hasher);
            entity.kind().hash(&mut hasher);
            entity.position.hash(&mut hasher);
            entity.health().hash(&mut hasher);
            entity.state().hash(&mut hasher);
            entity.target().hash(&mut hasher);
        }

        hasher.finish()
    }
}

impl fmt::Debug for Simulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Simulation")
            .field("tick", &self.tick)
            .field("balance", &self.balance())
            .field("wave_state", &self.scheduler.state())
            .field("wave_index", &self.scheduler.wave_index())
            .field("live_entities", &self.roster.live_count())
            .finish_non_exhaustive()
    }
}
