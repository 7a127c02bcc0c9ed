//! Headless level runs.
//!
//! A run loads a level, applies scripted player deployments at their
//! ticks, and advances the simulation until every wave is complete or the
//! tick limit is hit.

use std::str::FromStr;
use std::thread;

use duel_core::components::KindId;
use duel_core::data::LevelConfig;
use duel_core::events::SimEvent;
use duel_core::math::{Fixed, Vec2Fixed};
use duel_core::simulation::{Simulation, SimulationStats, TICK_RATE};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default run length: 20 minutes of game time.
pub const DEFAULT_MAX_TICKS: u64 = 20 * 60 * TICK_RATE as u64;

/// A player deployment scheduled for a tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deployment {
    /// Tick before which the deployment is attempted.
    pub tick: u64,
    /// Player kind to deploy.
    pub kind: KindId,
    /// Where to place it.
    pub position: Vec2Fixed,
}

/// Errors parsing a `kind@x,y[:tick]` deployment string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeploymentParseError {
    /// No `@` separating kind and position.
    #[error("Expected kind@x,y[:tick], got '{0}'")]
    MissingPosition(String),
    /// A coordinate that is not a number or is out of range.
    #[error("Invalid coordinate '{0}'")]
    BadCoordinate(String),
    /// A tick that is not a whole number.
    #[error("Invalid tick '{0}'")]
    BadTick(String),
}

fn parse_coordinate(text: &str) -> Result<Fixed, DeploymentParseError> {
    text.trim()
        .parse::<f64>()
        .ok()
        .and_then(Fixed::checked_from_num)
        .ok_or_else(|| DeploymentParseError::BadCoordinate(text.to_string()))
}

impl FromStr for Deployment {
    type Err = DeploymentParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, rest) = s
            .split_once('@')
            .filter(|(kind, _)| !kind.is_empty())
            .ok_or_else(|| DeploymentParseError::MissingPosition(s.to_string()))?;
        let (coords, tick) = match rest.split_once(':') {
            Some((coords, tick)) => (
                coords,
                tick.trim()
                    .parse()
                    .map_err(|_| DeploymentParseError::BadTick(tick.to_string()))?,
            ),
            None => (rest, 0),
        };
        let (x, y) = coords
            .split_once(',')
            .ok_or_else(|| DeploymentParseError::BadCoordinate(coords.to_string()))?;

        Ok(Self {
            tick,
            kind: KindId::from(kind.trim()),
            position: Vec2Fixed::new(parse_coordinate(x)?, parse_coordinate(y)?),
        })
    }
}

/// Settings for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Stop after this many ticks even if waves remain.
    pub max_ticks: u64,
    /// Replaces the level's seed when set.
    pub seed: Option<u64>,
    /// Scripted deployments.
    pub deployments: Vec<Deployment>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_ticks: DEFAULT_MAX_TICKS,
            seed: None,
            deployments: Vec::new(),
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunOutcome {
    /// Every wave completed.
    Complete,
    /// The tick limit was reached first.
    TimedOut,
}

/// Summary of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    /// Seed the run used.
    pub seed: u64,
    /// Ticks simulated.
    pub ticks: u64,
    /// How the run ended.
    pub outcome: RunOutcome,
    /// Whole duel points at the end.
    pub final_balance: u32,
    /// Running totals.
    pub stats: SimulationStats,
    /// Total health removed by attacks.
    pub total_damage: u64,
    /// Deployments the simulation refused, with the reason.
    pub refused_deployments: Vec<String>,
    /// Final state hash.
    pub state_hash: u64,
}

/// Run `level` to completion or the tick limit.
pub fn run_level(mut level: LevelConfig, config: &RunConfig) -> RunReport {
    if let Some(seed) = config.seed {
        level.seed = seed;
    }
    let seed = level.seed;

    let mut deployments = config.deployments.clone();
    deployments.sort_by_key(|deployment| deployment.tick);
    let mut pending = deployments.into_iter().peekable();

    let mut sim = Simulation::new(level);
    let mut refused = Vec::new();
    let mut total_damage = 0u64;
    let mut outcome = RunOutcome::TimedOut;

    while sim.current_tick() < config.max_ticks {
        while let Some(deployment) =
            pending.next_if(|deployment| deployment.tick <= sim.current_tick())
        {
            if let Err(err) = sim.deploy(&deployment.kind, deployment.position) {
                tracing::warn!(kind = %deployment.kind, tick = deployment.tick, error = %err, "Deployment refused");
                refused.push(format!("{}@{}: {err}", deployment.kind, deployment.tick));
            }
        }

        let events = sim.tick();
        total_damage += events.total_damage();
        for event in &events.events {
            if let SimEvent::WaveCompleted { wave } = event {
                tracing::info!(wave, tick = events.tick, balance = sim.balance(), "Wave cleared");
            }
        }

        if sim.is_complete() {
            outcome = RunOutcome::Complete;
            break;
        }
    }

    RunReport {
        seed,
        ticks: sim.current_tick(),
        outcome,
        final_balance: sim.balance(),
        stats: sim.stats(),
        total_damage,
        refused_deployments: refused,
        state_hash: sim.state_hash(),
    }
}

/// Result of running the same level several times.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyReport {
    /// Final state hash of each run.
    pub hashes: Vec<u64>,
    /// Whether every run ended in the same state.
    pub deterministic: bool,
}

/// Run `level` `runs` times on separate threads and compare final hashes.
pub fn verify_level(level: &LevelConfig, config: &RunConfig, runs: usize) -> VerifyReport {
    let hashes: Vec<u64> = thread::scope(|s| {
        let handles: Vec<_> = (0..runs)
            .map(|_| s.spawn(|| run_level(level.clone(), config).state_hash))
            .collect();
        handles
            .into_iter()
            .filter_map(|handle| handle.join().ok())
            .collect()
    });

    let deterministic = hashes.len() == runs && hashes.windows(2).all(|w| w[0] == w[1]);
    if !deterministic {
        tracing::error!(?hashes, "Runs diverged");
    }
    VerifyReport {
        hashes,
        deterministic,
    }
}
