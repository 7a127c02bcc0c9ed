//! # Duel Core
//!
//! Deterministic wave orchestration and combat resolution for Duel Defense.
//!
//! This crate contains **only** deterministic logic:
//! - No rendering
//! - No IO
//! - No system randomness (one seeded generator per level)
//! - No floating-point math (uses fixed-point)
//!
//! This separation enables:
//! - Headless batch runs and balance sweeps
//! - Replays from a seed and a level file
//! - Determinism testing
//!
//! ## Crate Structure
//!
//! - [`economy`] - Duel point balance, regeneration and action cooldowns
//! - [`pool`] - Generational object pools
//! - [`entity`] - Combat entities and their state machine
//! - [`roster`] - One pool per entity kind
//! - [`targeting`] - Nearest-hostile queries
//! - [`combat`] - Attack and area damage resolution
//! - [`waves`] - Wave scheduling
//! - [`spawning`] - Difficulty scaling, kind selection and placement
//! - [`simulation`] - Core simulation loop
//! - [`math`] - Fixed-point math utilities

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod combat;
pub mod components;
pub mod data;
pub mod difficulty;
pub mod economy;
pub mod entity;
pub mod error;
pub mod events;
pub mod math;
pub mod path;
pub mod pool;
pub mod roster;
pub mod simulation;
pub mod spawning;
pub mod systems;
pub mod targeting;
pub mod waves;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::components::*;
    pub use crate::data::{ConfigIssue, LevelConfig, UnitBlueprint};
    pub use crate::difficulty::{DifficultyCurve, DifficultyCurves};
    pub use crate::economy::{ActionId, EconomySettings, ResourceEconomy, SharedEconomy};
    pub use crate::entity::{CombatEntity, DamageOutcome, EntityId};
    pub use crate::error::{GameError, PlacementError, Result};
    pub use crate::events::{DefeatCause, EventSink, SimEvent, TickEvents};
    pub use crate::math::{Fixed, Vec2Fixed};
    pub use crate::path::{PathProvider, WaypointPath};
    pub use crate::pool::{ObjectPool, PoolHandle, PoolSettings, Poolable};
    pub use crate::spawning::SpawnPlacement;
    pub use crate::simulation::{Simulation, SimulationStats, TICK_DURATION, TICK_RATE};
    pub use crate::waves::{KindSelector, SchedulerSettings, SpawnGroup, Wave, WaveState};
}
