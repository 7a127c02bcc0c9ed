//! Generational object pool.
//!
//! Instances are pre-built by a factory and parked in an idle queue.
//! `acquire` hands out a [`PoolHandle`] to a live slot; `release` parks the
//! instance again (or drops it once the idle queue is full) and bumps the
//! slot generation, so every handle issued before the release stops
//! resolving. Stale and double releases are detected and ignored.

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle hooks for pooled values.
pub trait Poolable {
    /// Prepare a parked instance for use.
    fn activate(&mut self);
    /// Clear per-use state before the instance is parked or dropped.
    fn deactivate(&mut self);
}

/// Generation-checked reference to a pooled slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PoolHandle {
    slot: u32,
    generation: u32,
}

impl PoolHandle {
    /// Slot index inside the pool.
    #[must_use]
    pub const fn slot(self) -> u32 {
        self.slot
    }

    /// Generation the slot had when this handle was issued.
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

/// Sizing policy for a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSettings {
    /// Instances created up front.
    #[serde(default = "default_initial_size")]
    pub initial_size: usize,
    /// Idle instances kept after release. Defaults to `initial_size`.
    #[serde(default)]
    pub max_retained: Option<usize>,
    /// Whether `acquire` may build new instances once the idle queue is empty.
    #[serde(default = "default_expandable")]
    pub expandable: bool,
}

const fn default_initial_size() -> usize {
    8
}

const fn default_expandable() -> bool {
    true
}

impl PoolSettings {
    /// Create settings with `max_retained == initial_size`.
    #[must_use]
    pub const fn new(initial_size: usize, expandable: bool) -> Self {
        Self {
            initial_size,
            max_retained: None,
            expandable,
        }
    }

    /// Idle capacity after release.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.max_retained.unwrap_or(self.initial_size)
    }
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self::new(default_initial_size(), default_expandable())
    }
}

enum SlotState<T> {
    Live(T),
    Idle(T),
    Vacant,
}

struct Slot<T> {
    generation: u32,
    state: SlotState<T>,
}

type Factory<T> = Box<dyn Fn() -> T + Send + Sync>;

/// A pool of reusable instances addressed by generational handles.
pub struct ObjectPool<T> {
    slots: Vec<Slot<T>>,
    idle: VecDeque<u32>,
    vacant: Vec<u32>,
    factory: Factory<T>,
    capacity: usize,
    expandable: bool,
    live: usize,
}

impl<T: Poolable> ObjectPool<T> {
    /// Pre-create `initial_size` deactivated instances.
    pub fn initialize<F>(factory: F, initial_size: usize, expandable: bool) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::with_settings(factory, PoolSettings::new(initial_size, expandable))
    }

    /// Pre-create instances according to `settings`.
    pub fn with_settings<F>(factory: F, settings: PoolSettings) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        let mut pool = Self {
            slots: Vec::with_capacity(settings.initial_size),
            idle: VecDeque::with_capacity(settings.initial_size),
            vacant: Vec::new(),
            factory: Box::new(factory),
            capacity: settings.capacity(),
            expandable: settings.expandable,
            live: 0,
        };

        for _ in 0..settings.initial_size {
            let mut value = (pool.factory)();
            value.deactivate();
            let slot = pool.slots.len() as u32;
            pool.slots.push(Slot {
                generation: 0,
                state: SlotState::Idle(value),
            });
            pool.idle.push_back(slot);
        }

        pool
    }

    /// Hand out an instance.
    ///
    /// Returns `None` when the idle queue is empty and the pool may not grow.
    pub fn acquire(&mut self) -> Option<PoolHandle> {
        let slot = if let Some(slot) = self.idle.pop_front() {
            slot
        } else if self.expandable {
            let mut value = (self.factory)();
            value.deactivate();
            if let Some(slot) = self.vacant.pop() {
                self.slots[slot as usize].state = SlotState::Idle(value);
                slot
            } else {
                let slot = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    state: SlotState::Idle(value),
                });
                slot
            }
        } else {
            tracing::debug!(live = self.live, "Pool exhausted");
            return None;
        };

        let entry = &mut self.slots[slot as usize];
        let mut value = match std::mem::replace(&mut entry.state, SlotState::Vacant) {
            SlotState::Idle(value) => value,
            other => {
                // Idle queue only ever names idle slots.
                entry.state = other;
                tracing::warn!(slot, "Idle queue referenced a non-idle slot");
                return None;
            }
        };
        value.activate();
        entry.state = SlotState::Live(value);
        self.live += 1;

        Some(PoolHandle {
            slot,
            generation: entry.generation,
        })
    }

    /// Return an instance to the pool.
    ///
    /// Returns `false` (and changes nothing) for stale or already-released
    /// handles. If the idle queue is full the instance is dropped.
    pub fn release(&mut self, handle: PoolHandle) -> bool {
        let Some(entry) = self.slots.get_mut(handle.slot as usize) else {
            tracing::warn!(?handle, "Release of unknown pool slot");
            return false;
        };
        if entry.generation != handle.generation || !matches!(entry.state, SlotState::Live(_)) {
            tracing::warn!(?handle, "Stale or double release ignored");
            return false;
        }

        let SlotState::Live(mut value) = std::mem::replace(&mut entry.state, SlotState::Vacant)
        else {
            return false;
        };
        value.deactivate();
        entry.generation = entry.generation.wrapping_add(1);
        self.live -= 1;

        if self.idle.len() < self.capacity {
            entry.state = SlotState::Idle(value);
            self.idle.push_back(handle.slot);
        } else {
            self.vacant.push(handle.slot);
        }
        true
    }

    /// Get a live instance.
    #[must_use]
    pub fn get(&self, handle: PoolHandle) -> Option<&T> {
        let entry = self.slots.get(handle.slot as usize)?;
        match &entry.state {
            SlotState::Live(value) if entry.generation == handle.generation => Some(value),
            _ => None,
        }
    }

    /// Get a live instance mutably.
    pub fn get_mut(&mut self, handle: PoolHandle) -> Option<&mut T> {
        let entry = self.slots.get_mut(handle.slot as usize)?;
        match &mut entry.state {
            SlotState::Live(value) if entry.generation == handle.generation => Some(value),
            _ => None,
        }
    }

    /// Whether `handle` names a live instance.
    #[must_use]
    pub fn is_live(&self, handle: PoolHandle) -> bool {
        self.get(handle).is_some()
    }

    /// Number of instances currently handed out.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.live
    }

    /// Number of parked instances ready for `acquire`.
    #[must_use]
    pub fn idle_count(&self) -> usize {
        self.idle.len()
    }

    /// Idle capacity after release.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Handles of all live instances in slot order.
    #[must_use]
    pub fn live_handles(&self) -> Vec<PoolHandle> {
        self.iter_live().map(|(handle, _)| handle).collect()
    }

    /// Iterate live instances in slot order.
    pub fn iter_live(&self) -> impl Iterator<Item = (PoolHandle, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(slot, entry)| match &entry.state {
                SlotState::Live(value) => Some((
                    PoolHandle {
                        slot: slot as u32,
                        generation: entry.generation,
                    },
                    value,
                )),
                _ => None,
            })
    }
}

impl<T> fmt::Debug for ObjectPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectPool")
            .field("slots", &self.slots.len())
            .field("live", &self.live)
            .field("idle", &self.idle.len())
            .field("capacity", &self.capacity)
            .field("expandable", &self.expandable)
            .finish()
    }
}
