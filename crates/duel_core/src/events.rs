//! Simulation events and subscribers.
//!
//! Every tick collects the events it produced into [`TickEvents`] and then
//! publishes them, in order, to every subscribed [`EventSink`]. The
//! simulation never depends on a sink being present.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::components::{Faction, KindId};
use crate::entity::EntityId;

/// How an entity left play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DefeatCause {
    /// Health reached zero.
    Killed,
    /// Walked off the end of the path into the objective.
    Breached,
}

/// Something observable that happened during a tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimEvent {
    /// A wave is about to start spawning.
    WaveAnnounced {
        /// 0-based wave index.
        wave: u32,
        /// Whether this is a boss wave.
        boss: bool,
    },
    /// A wave started spawning.
    WaveStarted {
        /// 0-based wave index.
        wave: u32,
    },
    /// Every enemy of a wave has been spawned and defeated.
    WaveCompleted {
        /// 0-based wave index.
        wave: u32,
    },
    /// The last configured wave completed.
    AllWavesComplete,
    /// A running wave was cancelled; it will be retried.
    WaveAborted {
        /// 0-based wave index.
        wave: u32,
    },
    /// An entity entered play.
    EntitySpawned {
        /// New entity.
        id: EntityId,
        /// Its kind.
        kind: KindId,
        /// Its faction.
        faction: Faction,
        /// Wave that produced it, `None` for player deployments.
        wave: Option<u32>,
    },
    /// An entity left play and was returned to its pool.
    EntityDefeated {
        /// Released entity. No longer resolves.
        id: EntityId,
        /// Its kind.
        kind: KindId,
        /// Whether it was a wave enemy.
        was_enemy: bool,
        /// How it left play.
        cause: DefeatCause,
    },
    /// Health was removed from an entity.
    DamageDealt {
        /// Attacking entity.
        attacker: EntityId,
        /// Damaged entity.
        target: EntityId,
        /// Health removed.
        amount: u32,
        /// Whether this was area splash.
        splash: bool,
    },
    /// An enemy reached the objective.
    ObjectiveBreached {
        /// Breaching enemy.
        id: EntityId,
        /// Duel points drained from the economy.
        penalty: u32,
    },
    /// The whole-point balance changed during the tick.
    CurrencyChanged {
        /// Signed change over the tick.
        delta: i64,
        /// Balance after the tick.
        balance: u32,
    },
}

/// Receives simulation events.
pub trait EventSink: Send {
    /// Handle one event.
    fn handle(&mut self, event: &SimEvent);
}

impl<F> EventSink for F
where
    F: FnMut(&SimEvent) + Send,
{
    fn handle(&mut self, event: &SimEvent) {
        self(event);
    }
}

/// Fan-out to zero or more subscribers.
#[derive(Default)]
pub struct EventBus {
    sinks: Vec<Box<dyn EventSink>>,
}

impl EventBus {
    /// Create a bus with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a subscriber.
    pub fn subscribe(&mut self, sink: impl EventSink + 'static) {
        self.sinks.push(Box::new(sink));
    }

    /// Deliver `events` in order to every subscriber.
    pub fn publish(&mut self, events: &[SimEvent]) {
        for sink in &mut self.sinks {
            for event in events {
                sink.handle(event);
            }
        }
    }

    /// Number of subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    /// Whether nobody is subscribed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("sinks", &self.sinks.len())
            .finish()
    }
}

/// Events generated by a single tick.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickEvents {
    /// Tick that produced these events.
    pub tick: u64,
    /// Events in the order they happened.
    pub events: Vec<SimEvent>,
}

impl TickEvents {
    pub(crate) fn new(tick: u64) -> Self {
        Self {
            tick,
            events: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, event: SimEvent) {
        self.events.push(event);
    }

    /// Whether the tick produced no events.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Indices of waves that completed this tick.
    pub fn waves_completed(&self) -> impl Iterator<Item = u32> + '_ {
        self.events.iter().filter_map(|event| match event {
            SimEvent::WaveCompleted { wave } => Some(*wave),
            _ => None,
        })
    }

    /// Indices of waves that started spawning this tick.
    pub fn waves_started(&self) -> impl Iterator<Item = u32> + '_ {
        self.events.iter().filter_map(|event| match event {
            SimEvent::WaveStarted { wave } => Some(*wave),
            _ => None,
        })
    }

    /// Entities that entered play this tick.
    pub fn spawned(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.events.iter().filter_map(|event| match event {
            SimEvent::EntitySpawned { id, .. } => Some(*id),
            _ => None,
        })
    }

    /// Entities that left play this tick.
    pub fn defeated(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.events.iter().filter_map(|event| match event {
            SimEvent::EntityDefeated { id, .. } => Some(*id),
            _ => None,
        })
    }

    /// Total health removed this tick.
    #[must_use]
    pub fn total_damage(&self) -> u64 {
        self.events
            .iter()
            .map(|event| match event {
                SimEvent::DamageDealt { amount, .. } => u64::from(*amount),
                _ => 0,
            })
            .sum()
    }

    /// Whether the final wave completed this tick.
    #[must_use]
    pub fn all_waves_complete(&self) -> bool {
        self.events.contains(&SimEvent::AllWavesComplete)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    #[test]
    fn test_bus_with_no_sinks_is_fine() {
        let mut bus = EventBus::new();
        bus.publish(&[SimEvent::AllWavesComplete]);
        assert!(bus.is_empty());
    }

    #[test]
    fn test_every_sink_sees_events_in_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut bus = EventBus::new();
        for _ in 0..2 {
            let seen = Arc::clone(&seen);
            bus.subscribe(move |event: &SimEvent| seen.lock().unwrap().push(event.clone()));
        }

        bus.publish(&[
            SimEvent::WaveStarted { wave: 0 },
            SimEvent::WaveCompleted { wave: 0 },
        ]);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 4);
        assert_eq!(seen[0], SimEvent::WaveStarted { wave: 0 });
        assert_eq!(seen[1], SimEvent::WaveCompleted { wave: 0 });
    }

    #[test]
    fn test_tick_event_helpers() {
        let mut events = TickEvents::new(7);
        events.push(SimEvent::WaveCompleted { wave: 2 });
        events.push(SimEvent::AllWavesComplete);

        assert_eq!(events.waves_completed().collect::<Vec<_>>(), vec![2]);
        assert!(events.all_waves_complete());
        assert_eq!(events.total_damage(), 0);
    }
}
