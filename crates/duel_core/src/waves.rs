//! Wave definitions and the wave scheduler.
//!
//! The scheduler is a countdown-driven state machine advanced once per tick:
//!
//! ```text
//!   Idle ──delay──► Announcing ──announce──► Spawning ──all spawned──► AwaitingClear
//!    ▲                                                                      │
//!    └───────────────── alive == 0, more waves ◄────────────────────────────┤
//!                                                                           ▼
//!                                                          alive == 0, last wave: Complete
//! ```
//!
//! Waits are plain timers decremented by `tick`; nothing blocks. The
//! scheduler only decides *when* to spawn: it returns [`SpawnOrder`]s that
//! the simulation hands to the [`SpawnDirector`], reporting successful
//! spawns back through [`WaveScheduler::on_enemy_spawned`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::components::{KindId, StatMultipliers};
use crate::events::SimEvent;
use crate::math::{decimal_serde, Fixed};
use crate::spawning::SpawnDirector;

/// Shortest allowed gap between two spawns of a group (0.1 s).
pub const MIN_SPAWN_INTERVAL: Fixed = Fixed::from_bits(429_496_730);

/// Which kind a spawn group produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum KindSelector {
    /// Always this kind.
    Single(KindId),
    /// Weighted random choice, walked in kind-name order.
    Weighted(BTreeMap<KindId, u32>),
}

impl KindSelector {
    /// Every kind this selector can produce.
    pub fn kinds(&self) -> impl Iterator<Item = &KindId> {
        let (single, weighted) = match self {
            Self::Single(kind) => (Some(kind), None),
            Self::Weighted(table) => (None, Some(table.keys())),
        };
        single.into_iter().chain(weighted.into_iter().flatten())
    }
}

impl From<&str> for KindSelector {
    fn from(kind: &str) -> Self {
        Self::Single(KindId::from(kind))
    }
}

/// A sub-batch of a wave sharing one kind selector and multipliers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnGroup {
    /// What to spawn.
    pub kind: KindSelector,
    /// Base number of entities, before the count curve.
    pub count: u32,
    /// Per-spawn multipliers, composed with the wave's curve multipliers.
    #[serde(default)]
    pub multipliers: StatMultipliers,
    /// Seconds between two spawns of this group.
    #[serde(with = "decimal_serde")]
    pub spawn_interval: Fixed,
}

impl SpawnGroup {
    /// Group of `count` entities spawned one second apart.
    #[must_use]
    pub fn new(kind: impl Into<KindSelector>, count: u32) -> Self {
        Self {
            kind: kind.into(),
            count,
            multipliers: StatMultipliers::IDENTITY,
            spawn_interval: Fixed::ONE,
        }
    }

    /// Builder method to set multipliers.
    #[must_use]
    pub fn with_multipliers(mut self, multipliers: StatMultipliers) -> Self {
        self.multipliers = multipliers;
        self
    }

    /// Builder method to set the spawn interval.
    #[must_use]
    pub fn with_interval(mut self, seconds: Fixed) -> Self {
        self.spawn_interval = seconds;
        self
    }

    /// Spawn interval raised to [`MIN_SPAWN_INTERVAL`].
    #[must_use]
    pub fn effective_interval(&self) -> Fixed {
        self.spawn_interval.max(MIN_SPAWN_INTERVAL)
    }
}

/// One discrete batch of hostile spawns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wave {
    /// Groups spawned in order.
    pub groups: Vec<SpawnGroup>,
    /// Seconds between the last spawn of a group and the first of the next.
    #[serde(default, with = "decimal_serde")]
    pub group_delay: Fixed,
    /// Seconds between clearing this wave and announcing the next.
    #[serde(default, with = "decimal_serde")]
    pub post_wave_delay: Fixed,
    /// Boss wave flag.
    #[serde(default)]
    pub boss: bool,
    /// Duel points awarded when the wave is cleared.
    #[serde(default)]
    pub clear_reward: u32,
}

impl Wave {
    /// Wave with the given groups and no delays.
    #[must_use]
    pub fn new(groups: Vec<SpawnGroup>) -> Self {
        Self {
            groups,
            group_delay: Fixed::ZERO,
            post_wave_delay: Fixed::ZERO,
            boss: false,
            clear_reward: 0,
        }
    }

    /// Builder method to set the delay between groups.
    #[must_use]
    pub fn with_group_delay(mut self, seconds: Fixed) -> Self {
        self.group_delay = seconds;
        self
    }

    /// Builder method to set the post-wave delay.
    #[must_use]
    pub fn with_post_wave_delay(mut self, seconds: Fixed) -> Self {
        self.post_wave_delay = seconds;
        self
    }

    /// Builder method to mark a boss wave.
    #[must_use]
    pub fn as_boss(mut self) -> Self {
        self.boss = true;
        self
    }

    /// Builder method to set the clear reward.
    #[must_use]
    pub fn with_clear_reward(mut self, points: u32) -> Self {
        self.clear_reward = points;
        self
    }
}

/// Scheduler timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerSettings {
    /// Seconds before the first wave is announced.
    #[serde(with = "decimal_serde")]
    pub initial_delay: Fixed,
    /// Seconds between announcing a wave and its first spawn.
    #[serde(with = "decimal_serde")]
    pub announce_duration: Fixed,
    /// Start waves when their delay elapses. When off, waves only start
    /// through [`WaveScheduler::start_next_wave`].
    #[serde(default = "default_auto_start")]
    pub auto_start: bool,
}

const fn default_auto_start() -> bool {
    true
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            initial_delay: Fixed::from_num(3),
            announce_duration: Fixed::from_num(2),
            auto_start: true,
        }
    }
}

/// Scheduler state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WaveState {
    /// Between waves, counting down to the next announcement.
    Idle,
    /// Wave announced, counting down to its first spawn.
    Announcing,
    /// Emitting spawns.
    Spawning,
    /// Everything spawned; waiting for the alive count to reach zero.
    AwaitingClear,
    /// All waves done. Terminal.
    Complete,
}

/// Request to spawn one entity of a wave's group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpawnOrder {
    /// 0-based wave index.
    pub wave_index: u32,
    /// Index of the group inside the wave.
    pub group_index: usize,
}

/// Output of one scheduler tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchedulerStep {
    /// Wave lifecycle events, in order.
    pub events: Vec<SimEvent>,
    /// Spawns due this tick, in order.
    pub spawns: Vec<SpawnOrder>,
}

/// Owns the wave list and decides when each wave announces, spawns and ends.
#[derive(Debug, Clone)]
pub struct WaveScheduler {
    waves: Vec<Wave>,
    settings: SchedulerSettings,
    state: WaveState,
    wave_index: u32,
    timer: Fixed,
    group_counts: Vec<u32>,
    group_cursor: usize,
    remaining_in_group: u32,
    remaining_to_spawn: u32,
    alive: u32,
    spawn_timer: Fixed,
    pending: Vec<SimEvent>,
}

impl WaveScheduler {
    /// Create a scheduler. An empty wave list starts (and stays) complete.
    #[must_use]
    pub fn new(waves: Vec<Wave>, settings: SchedulerSettings) -> Self {
        let state = if waves.is_empty() {
            tracing::warn!("No waves configured; scheduler starts complete");
            WaveState::Complete
        } else {
            WaveState::Idle
        };
        Self {
            waves,
            settings,
            state,
            wave_index: 0,
            timer: settings.initial_delay,
            group_counts: Vec::new(),
            group_cursor: 0,
            remaining_in_group: 0,
            remaining_to_spawn: 0,
            alive: 0,
            spawn_timer: Fixed::ZERO,
            pending: Vec::new(),
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> WaveState {
        self.state
    }

    /// 0-based index of the current (or next) wave.
    #[must_use]
    pub const fn wave_index(&self) -> u32 {
        self.wave_index
    }

    /// Configured waves.
    #[must_use]
    pub fn waves(&self) -> &[Wave] {
        &self.waves
    }

    /// Wave definition by index.
    #[must_use]
    pub fn wave(&self, index: u32) -> Option<&Wave> {
        self.waves.get(index as usize)
    }

    /// Live enemies of the current wave.
    #[must_use]
    pub const fn alive(&self) -> u32 {
        self.alive
    }

    /// Spawns still due in the current wave.
    #[must_use]
    pub const fn remaining_to_spawn(&self) -> u32 {
        self.remaining_to_spawn
    }

    /// Seconds left on the running countdown (delay or announcement).
    #[must_use]
    pub const fn timer(&self) -> Fixed {
        self.timer
    }

    /// Whether every wave has completed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.state == WaveState::Complete
    }

    /// Whether a wave is between announcement and clear.
    #[must_use]
    pub fn wave_in_progress(&self) -> bool {
        matches!(
            self.state,
            WaveState::Announcing | WaveState::Spawning | WaveState::AwaitingClear
        )
    }

    /// Advance by `dt` seconds.
    pub fn tick(&mut self, dt: Fixed, director: &SpawnDirector) -> SchedulerStep {
        let mut step = SchedulerStep {
            events: std::mem::take(&mut self.pending),
            spawns: Vec::new(),
        };

        match self.state {
            WaveState::Idle => {
                if self.settings.auto_start {
                    self.timer -= dt;
                    if self.timer <= Fixed::ZERO {
                        self.announce(&mut step);
                    }
                }
            }
            WaveState::Announcing => self.timer -= dt,
            WaveState::Spawning => self.spawn_timer -= dt,
            WaveState::AwaitingClear => {
                if self.alive == 0 {
                    self.complete_wave(&mut step);
                }
            }
            WaveState::Complete => {}
        }

        if self.state == WaveState::Announcing && self.timer <= Fixed::ZERO {
            self.begin_spawning(director, &mut step);
        }
        if self.state == WaveState::Spawning {
            self.emit_due_spawns(&mut step);
        }

        step
    }

    /// Announce the next wave now, skipping any remaining delay.
    ///
    /// Only valid between waves; returns `false` otherwise.
    pub fn start_next_wave(&mut self) -> bool {
        if self.state != WaveState::Idle {
            tracing::debug!(state = ?self.state, "Start request ignored");
            return false;
        }
        let mut step = SchedulerStep::default();
        self.announce(&mut step);
        self.pending.extend(step.events);
        true
    }

    /// Cancel the running wave: drop pending spawns and reset the alive
    /// count. The same wave is retried after the initial delay.
    ///
    /// The caller releases the wave's live enemies.
    pub fn abort(&mut self) -> bool {
        if !self.wave_in_progress() {
            return false;
        }
        tracing::info!(wave = self.wave_index, "Wave aborted");
        self.pending.push(SimEvent::WaveAborted {
            wave: self.wave_index,
        });
        self.state = WaveState::Idle;
        self.timer = self.settings.initial_delay;
        self.group_counts.clear();
        self.group_cursor = 0;
        self.remaining_in_group = 0;
        self.remaining_to_spawn = 0;
        self.spawn_timer = Fixed::ZERO;
        self.alive = 0;
        true
    }

    /// Record a successful spawn belonging to `wave`.
    pub fn on_enemy_spawned(&mut self, wave: u32) {
        if self.counts(wave) {
            self.alive += 1;
        }
    }

    /// Record the defeat of an enemy belonging to `wave`.
    pub fn on_enemy_defeated(&mut self, wave: u32) {
        if !self.counts(wave) {
            return;
        }
        if self.alive == 0 {
            tracing::warn!(wave, "Defeat reported with no enemies alive");
            return;
        }
        self.alive -= 1;
    }

    fn counts(&self, wave: u32) -> bool {
        wave == self.wave_index
            && matches!(self.state, WaveState::Spawning | WaveState::AwaitingClear)
    }

    fn announce(&mut self, step: &mut SchedulerStep) {
        let boss = self.current_wave().is_some_and(|wave| wave.boss);
        tracing::info!(wave = self.wave_index, boss, "Wave announced");
        step.events.push(SimEvent::WaveAnnounced {
            wave: self.wave_index,
            boss,
        });
        self.state = WaveState::Announcing;
        self.timer = self.settings.announce_duration;
    }

    fn begin_spawning(&mut self, director: &SpawnDirector, step: &mut SchedulerStep) {
        self.group_counts = self
            .current_wave()
            .map(|wave| {
                wave.groups
                    .iter()
                    .map(|group| director.scaled_count(group.count, self.wave_index))
                    .collect()
            })
            .unwrap_or_default();

        self.remaining_to_spawn = self.group_counts.iter().sum();
        self.alive = 0;
        self.group_cursor = 0;
        self.spawn_timer = Fixed::ZERO;
        self.seek_group();
        self.state = WaveState::Spawning;

        tracing::info!(
            wave = self.wave_index,
            total = self.remaining_to_spawn,
            "Wave started"
        );
        step.events.push(SimEvent::WaveStarted {
            wave: self.wave_index,
        });
    }

    fn emit_due_spawns(&mut self, step: &mut SchedulerStep) {
        let group_delay = self
            .current_wave()
            .map_or(Fixed::ZERO, |wave| wave.group_delay);

        while self.spawn_timer <= Fixed::ZERO && self.group_cursor < self.group_counts.len() {
            step.spawns.push(SpawnOrder {
                wave_index: self.wave_index,
                group_index: self.group_cursor,
            });
            self.remaining_in_group = self.remaining_in_group.saturating_sub(1);
            self.remaining_to_spawn = self.remaining_to_spawn.saturating_sub(1);

            if self.remaining_in_group > 0 {
                let interval = self.group_interval(self.group_cursor);
                self.spawn_timer += interval;
            } else {
                self.spawn_timer += group_delay;
                self.group_cursor += 1;
                self.seek_group();
            }
        }

        if self.group_cursor >= self.group_counts.len() {
            tracing::debug!(wave = self.wave_index, "All groups spawned");
            self.state = WaveState::AwaitingClear;
        }
    }

    // Move the cursor to the first group, from the current one, with spawns left.
    fn seek_group(&mut self) {
        while let Some(&count) = self.group_counts.get(self.group_cursor) {
            if count > 0 {
                self.remaining_in_group = count;
                return;
            }
            self.group_cursor += 1;
        }
        self.remaining_in_group = 0;
    }

    fn group_interval(&self, group_index: usize) -> Fixed {
        self.current_wave()
            .and_then(|wave| wave.groups.get(group_index))
            .map_or(MIN_SPAWN_INTERVAL, SpawnGroup::effective_interval)
    }

    fn complete_wave(&mut self, step: &mut SchedulerStep) {
        let finished = self.wave_index;
        let post_wave_delay = self
            .current_wave()
            .map_or(Fixed::ZERO, |wave| wave.post_wave_delay);
        tracing::info!(wave = finished, "Wave completed");
        step.events.push(SimEvent::WaveCompleted { wave: finished });

        self.wave_index += 1;
        if self.wave_index as usize >= self.waves.len() {
            tracing::info!("All waves complete");
            step.events.push(SimEvent::AllWavesComplete);
            self.state = WaveState::Complete;
        } else {
            self.state = WaveState::Idle;
            self.timer = post_wave_delay;
        }
    }

    fn current_wave(&self) -> Option<&Wave> {
        self.waves.get(self.wave_index as usize)
    }
}
