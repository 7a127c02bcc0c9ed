//! Error types for the wave simulation.
//!
//! Expected runtime conditions (insufficient funds, empty pools, stale
//! handles) are modelled as `bool`/`Option` returns at their call sites.
//! The types here cover the outer surface: loading levels and explicit
//! API calls that name something that does not exist.

use thiserror::Error;

use crate::components::{Faction, KindId};
use crate::entity::EntityId;

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Top-level error type for the simulation's public API.
#[derive(Debug, Error)]
pub enum GameError {
    /// Level data failed to parse.
    #[error("Failed to parse level data '{path}': {message}")]
    DataParseError {
        /// Path (or label) of the data that failed to parse.
        path: String,
        /// Error message.
        message: String,
    },

    /// Invalid entity reference.
    #[error("Entity not found: {0}")]
    EntityNotFound(EntityId),

    /// Invalid simulation state.
    #[error("Invalid simulation state: {0}")]
    InvalidState(String),
}

/// Reasons a player deployment was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlacementError {
    /// Not enough duel points for the deployment cost.
    #[error("Insufficient duel points: need {required}, have {available}")]
    InsufficientFunds {
        /// Cost of the deployment.
        required: u32,
        /// Balance at the time of the attempt.
        available: u32,
    },

    /// The kind's deploy cooldown has not elapsed.
    #[error("{kind} is on cooldown")]
    OnCooldown {
        /// Kind that was requested.
        kind: KindId,
    },

    /// No blueprint registered under this kind.
    #[error("Unknown entity kind: {0}")]
    UnknownKind(KindId),

    /// The kind's pool is empty and may not grow.
    #[error("No pooled instance available for {0}")]
    PoolExhausted(KindId),

    /// Only player-faction kinds can be deployed.
    #[error("{kind} belongs to the {faction:?} faction and cannot be deployed")]
    WrongFaction {
        /// Kind that was requested.
        kind: KindId,
        /// Faction of that kind.
        faction: Faction,
    },
}
