//! Property tests for the invariants that must hold for any input.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread;

use duel_core::prelude::*;
use duel_core::roster::Roster;
use duel_core::spawning::select_weighted;
use duel_core::targeting::{find_nearest, TargetingSnapshot};
use duel_test_utils::determinism::strategies::{
    arb_goblin_wave, arb_spends, arb_vec2_position, arb_weights,
};
use duel_test_utils::fixtures::{fixed, flat_economy, goblin, instant_scheduler, straight_path};
use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

#[derive(Debug, Default)]
struct Token {
    active: bool,
}

impl Poolable for Token {
    fn activate(&mut self) {
        self.active = true;
    }

    fn deactivate(&mut self) {
        self.active = false;
    }
}

#[test]
fn test_weighted_selection_tracks_weights() {
    let weights: BTreeMap<&str, u32> = [("brute", 1), ("goblin", 3), ("wisp", 0)]
        .into_iter()
        .collect();
    let mut rng = ChaCha8Rng::seed_from_u64(2024);
    let mut counts: BTreeMap<&str, u32> = BTreeMap::new();

    let draws = 40_000;
    for _ in 0..draws {
        let key = select_weighted(&mut rng, &weights).unwrap();
        *counts.entry(*key).or_default() += 1;
    }

    assert_eq!(counts.get("wisp"), None);
    let goblin_share = f64::from(counts["goblin"]) / f64::from(draws);
    assert!((0.73..0.77).contains(&goblin_share), "share {goblin_share}");
}

#[test]
fn test_concurrent_spends_never_overdraw() {
    let economy = SharedEconomy::new(ResourceEconomy::new(flat_economy(100)));
    let economy = Arc::new(economy);

    let successes: u32 = thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let economy = Arc::clone(&economy);
                s.spawn(move || (0..10).filter(|_| economy.try_spend(3)).count() as u32)
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).sum()
    });

    assert_eq!(successes, 33);
    assert_eq!(economy.balance(), 1);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_weighted_never_picks_zero_weight(weights in arb_weights(), seed in any::<u64>()) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        for _ in 0..64 {
            let key = select_weighted(&mut rng, &weights).unwrap();
            prop_assert!(weights[key] > 0);
        }
    }

    #[test]
    fn prop_spending_conserves_points(spends in arb_spends(40)) {
        let mut economy = ResourceEconomy::new(flat_economy(200));
        let mut spent = 0u32;
        for amount in spends {
            let before = economy.balance();
            if economy.try_spend(amount) {
                spent += amount;
                prop_assert_eq!(economy.balance(), before - amount);
            } else {
                prop_assert!(amount > before);
                prop_assert_eq!(economy.balance(), before);
            }
        }
        prop_assert_eq!(economy.balance() + spent, 200);
    }

    #[test]
    fn prop_released_handles_never_resolve(ops in proptest::collection::vec(any::<bool>(), 1..60)) {
        let mut pool = ObjectPool::initialize(Token::default, 4, true);
        let mut live = Vec::new();
        let mut released = Vec::new();

        for acquire in ops {
            if acquire || live.is_empty() {
                let handle = pool.acquire().unwrap();
                prop_assert!(pool.get(handle).unwrap().active);
                live.push(handle);
            } else {
                let handle = live.remove(0);
                prop_assert!(pool.release(handle));
                prop_assert!(!pool.release(handle));
                released.push(handle);
            }
            prop_assert_eq!(pool.live_count(), live.len());
        }

        for handle in released {
            prop_assert!(pool.get(handle).is_none());
        }
    }

    #[test]
    fn prop_nearest_is_never_beaten(
        origin in arb_vec2_position(),
        positions in proptest::collection::vec(arb_vec2_position(), 1..20),
    ) {
        let mut roster = Roster::new();
        roster.register_kind(&goblin());
        for position in positions {
            let id = roster.acquire(&KindId::from("goblin")).unwrap();
            let entity = roster.get_mut(id).unwrap();
            entity.prepare_spawn(&StatMultipliers::IDENTITY, position, None);
        }
        let snapshot = TargetingSnapshot::capture(&roster);
        let candidates = snapshot.candidates();

        let radius = fixed(3000);
        let nearest = find_nearest(candidates, origin, radius, Faction::Enemy).unwrap();
        let best = candidates.iter().find(|c| c.id == nearest).unwrap();
        let best_distance = origin.distance_squared(best.position);
        for candidate in candidates {
            prop_assert!(origin.distance_squared(candidate.position) >= best_distance);
        }
    }

    #[test]
    fn prop_waves_never_overlap(first in arb_goblin_wave(), second in arb_goblin_wave()) {
        let level = LevelConfig::default()
            .with_economy(flat_economy(0))
            .with_scheduler(instant_scheduler())
            .with_blueprint(goblin())
            .with_wave(first)
            .with_wave(second)
            .with_path(straight_path(1_000));
        let mut sim = Simulation::new(level);

        let mut log = Vec::new();
        for _ in 0..2_000 {
            let events = sim.tick();
            for event in &events.events {
                match event {
                    SimEvent::WaveStarted { wave } => log.push(("start", *wave)),
                    SimEvent::WaveCompleted { wave } => log.push(("complete", *wave)),
                    SimEvent::EntitySpawned { id, wave: Some(wave), .. } => {
                        log.push(("spawn", *wave));
                        sim.apply_damage(*id, 10_000).unwrap();
                    }
                    _ => {}
                }
            }
            if sim.is_complete() {
                break;
            }
        }

        prop_assert!(sim.is_complete());
        let wave1_start = log.iter().position(|entry| *entry == ("start", 1)).unwrap();
        let wave0_done = log.iter().position(|entry| *entry == ("complete", 0)).unwrap();
        prop_assert!(wave0_done < wave1_start);
        prop_assert!(log[..wave0_done].iter().all(|(_, wave)| *wave == 0));
        prop_assert_eq!(log.iter().filter(|entry| entry.0 == "complete").count(), 2);
    }
}
