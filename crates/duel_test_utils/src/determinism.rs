//! Determinism testing utilities.
//!
//! Provides a harness for verifying that the simulation
//! produces identical results given identical inputs.
//!
//! # Testing Strategy
//!
//! A level plus a seed must replay identically. Sources of
//! non-determinism include:
//!
//! - **Floating-point math**: Different CPUs can produce different results.
//!   We use fixed-point arithmetic via [`duel_core::math::Fixed`] throughout.
//!
//! - **HashMap iteration order**: Rust's default hasher is randomized.
//!   We always iterate in sorted entity id or kind-name order.
//!
//! - **System randomness**: The spawn director owns the only generator,
//!   seeded from the level.
//!
//! # Test Levels
//!
//! 1. **Unit tests**: Individual module determinism (targeting, waves, etc.)
//! 2. **Property tests**: Random inputs must still produce deterministic outputs
//! 3. **Integration tests**: Full levels are reproducible
//! 4. **Parallel tests**: Running N simulations in parallel all match

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::thread;

use duel_core::data::LevelConfig;
use duel_core::simulation::Simulation;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of ticks simulated.
    pub ticks: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for deterministic simulation).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the simulation was deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the simulation produced different hashes across runs.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Simulation is non-deterministic!\n\
                 Runs: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a simulation multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run the simulation
/// * `ticks` - Number of ticks to simulate per run
/// * `setup` - Function to create initial simulation state
/// * `step` - Function to advance simulation by one tick
/// * `hash` - Function to compute state hash
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    ticks: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for _ in 0..ticks {
            step(&mut state);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        ticks,
    }
}

/// Run a [`Simulation`] twice from the same setup and compare final hashes.
pub fn verify_simulation_determinism<F>(setup_fn: F, num_ticks: u64) -> bool
where
    F: Fn() -> Simulation,
{
    let result = verify_determinism(
        2,
        num_ticks,
        &setup_fn,
        |sim| {
            sim.tick();
        },
        |sim| sim.state_hash(),
    );
    result.is_deterministic
}

/// Result of parallel simulation runs.
#[derive(Debug, Clone)]
pub struct ParallelSimResult {
    /// Final state hash from each simulation.
    pub hashes: Vec<u64>,
    /// Number of ticks each simulation ran.
    pub ticks: u64,
    /// Number of simulations run.
    pub num_sims: usize,
}

impl ParallelSimResult {
    /// Check if all simulations produced identical results.
    #[must_use]
    pub fn is_deterministic(&self) -> bool {
        self.hashes.windows(2).all(|w| w[0] == w[1])
    }

    /// Assert all simulations matched.
    ///
    /// # Panics
    ///
    /// Panics if simulations produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic() {
            let mut unique: Vec<u64> = self.hashes.clone();
            unique.sort_unstable();
            unique.dedup();
            panic!(
                "Parallel simulations diverged!\n\
                 Simulations: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {}\n\
                 All hashes: {:?}",
                self.num_sims,
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run N simulations on scoped threads and collect final hashes.
///
/// Catches non-determinism that only shows up under thread scheduling
/// or memory layout differences.
///
/// # Panics
///
/// Panics if a simulation thread panics.
pub fn run_parallel_simulations_scoped<F>(
    setup_fn: F,
    num_sims: usize,
    num_ticks: u64,
) -> ParallelSimResult
where
    F: Fn() -> Simulation + Sync,
{
    let hashes = thread::scope(|s| {
        let handles: Vec<_> = (0..num_sims)
            .map(|_| {
                s.spawn(|| {
                    let mut sim = setup_fn();
                    for _ in 0..num_ticks {
                        sim.tick();
                    }
                    sim.state_hash()
                })
            })
            .collect();

        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    ParallelSimResult {
        hashes,
        ticks: num_ticks,
        num_sims,
    }
}

/// Compare two simulation runs tick-by-tick, finding first divergence.
///
/// # Returns
///
/// `None` if simulations are deterministic, `Some(tick)` if they diverge
/// at that tick.
pub fn find_first_divergence<F>(setup_fn: F, num_ticks: u64) -> Option<u64>
where
    F: Fn() -> Simulation,
{
    let mut sim1 = setup_fn();
    let mut sim2 = setup_fn();

    if sim1.state_hash() != sim2.state_hash() {
        return Some(0);
    }

    for tick in 1..=num_ticks {
        sim1.tick();
        sim2.tick();

        if sim1.state_hash() != sim2.state_hash() {
            tracing::warn!(tick, "Simulations diverged");
            return Some(tick);
        }
    }

    None
}

/// Verify that writing a level to RON and reading it back replays identically.
pub fn verify_level_round_trip(level: &LevelConfig, num_ticks: u64) -> bool {
    let Ok(text) = level.to_ron_string() else {
        return false;
    };
    let Ok(restored) = LevelConfig::from_ron_str(&text, "round-trip") else {
        return false;
    };

    let mut original = Simulation::new(level.clone());
    let mut reloaded = Simulation::new(restored);
    for _ in 0..num_ticks {
        original.tick();
        reloaded.tick();
    }
    original.state_hash() == reloaded.state_hash()
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Proptest strategies for simulation inputs.
pub mod strategies {
    use std::collections::BTreeMap;

    use duel_core::components::KindId;
    use duel_core::math::{Fixed, Vec2Fixed};
    use duel_core::waves::{SpawnGroup, Wave};
    use proptest::prelude::*;

    /// Generate a fixed-point coordinate.
    ///
    /// Range: -1000 to 1000 (typical arena size)
    pub fn arb_fixed_position() -> impl Strategy<Value = Fixed> {
        (-1000i32..1000i32).prop_map(Fixed::from_num)
    }

    /// Generate a fixed-point 2D vector for positions.
    pub fn arb_vec2_position() -> impl Strategy<Value = Vec2Fixed> {
        (arb_fixed_position(), arb_fixed_position()).prop_map(|(x, y)| Vec2Fixed::new(x, y))
    }

    /// Generate health values (1-1000).
    pub fn arb_health() -> impl Strategy<Value = u32> {
        1u32..1000u32
    }

    /// Generate damage values (1-100).
    pub fn arb_damage() -> impl Strategy<Value = u32> {
        1u32..100u32
    }

    /// Generate a level seed.
    pub fn arb_seed() -> impl Strategy<Value = u64> {
        any::<u64>()
    }

    /// Generate a weight table over up to five kinds with at least one
    /// positive weight.
    pub fn arb_weights() -> impl Strategy<Value = BTreeMap<KindId, u32>> {
        proptest::collection::vec(0u32..20u32, 1..5)
            .prop_filter("needs a positive weight", |weights| {
                weights.iter().any(|&w| w > 0)
            })
            .prop_map(|weights| {
                weights
                    .into_iter()
                    .enumerate()
                    .map(|(i, w)| (KindId::new(format!("kind_{i}")), w))
                    .collect()
            })
    }

    /// Generate a wave of one to three goblin groups.
    pub fn arb_goblin_wave() -> impl Strategy<Value = Wave> {
        proptest::collection::vec((1u32..5u32, 2i32..17i32), 1..4).prop_map(|groups| {
            Wave::new(
                groups
                    .into_iter()
                    .map(|(count, sixteenths)| {
                        SpawnGroup::new("goblin", count)
                            .with_interval(Fixed::from_num(sixteenths) / Fixed::from_num(16))
                    })
                    .collect(),
            )
        })
    }

    /// Generate a list of spend amounts.
    pub fn arb_spends(max_len: usize) -> impl Strategy<Value = Vec<u32>> {
        proptest::collection::vec(0u32..50u32, 0..max_len)
    }
}
