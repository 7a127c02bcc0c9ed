//! End-to-end wave scenarios driven through [`Simulation`].

use duel_core::prelude::*;
use duel_test_utils::fixtures::{
    defended_simulation, fixed, fixed_f, flat_economy, goblin, instant_scheduler, point,
    single_wave_level, straight_path,
};

fn run_until<F>(sim: &mut Simulation, max_ticks: u64, mut done: F) -> Vec<TickEvents>
where
    F: FnMut(&Simulation, &TickEvents) -> bool,
{
    let mut history = Vec::new();
    for _ in 0..max_ticks {
        let events = sim.tick();
        let stop = done(sim, &events);
        history.push(events);
        if stop {
            break;
        }
    }
    history
}

#[test]
fn test_wave_clears_after_every_enemy_is_defeated() {
    let mut sim = Simulation::new(single_wave_level(3));
    let mut spawn_ticks = Vec::new();
    let mut completions = 0;

    for _ in 0..120 {
        let events = sim.tick();
        for id in events.spawned().collect::<Vec<_>>() {
            spawn_ticks.push(events.tick);
            sim.apply_damage(id, 1_000).unwrap();
        }
        completions += events.waves_completed().count();
    }

    // One second apart at 16 ticks per second.
    assert_eq!(spawn_ticks, vec![0, 16, 32]);
    assert_eq!(completions, 1);
    assert_eq!(sim.scheduler().alive(), 0);
    assert!(sim.is_complete());
    assert_eq!(sim.roster().live_count(), 0);
    assert_eq!(sim.stats().enemies_killed, 3);
}

#[test]
fn test_area_damage_falls_off_with_distance() {
    let dummy = UnitBlueprint::new(
        "dummy",
        Faction::Enemy,
        CombatStats::new(0, 1_000, fixed(1), fixed(1)),
    );
    let mage = UnitBlueprint::new(
        "mage",
        Faction::Player,
        CombatStats::new(100, 50, fixed(4), fixed(2)),
    )
    .with_area_effect(AreaEffect::new(fixed(3)))
    .with_deploy(10, fixed(1));

    let level = LevelConfig::default()
        .with_economy(flat_economy(100))
        .with_scheduler(instant_scheduler())
        .with_blueprint(dummy)
        .with_blueprint(mage)
        .with_wave(Wave::new(vec![SpawnGroup::new("dummy", 2)]))
        .with_path(straight_path(10))
        .with_placement(SpawnPlacement::Points(vec![
            point(4, 0),
            Vec2Fixed::new(fixed_f(5.5), fixed(0)),
        ]))
        .with_area_falloff(fixed_f(0.5));
    let mut sim = Simulation::new(level);
    let mage = sim.deploy(&KindId::from("mage"), point(0, 0)).unwrap();

    let history = run_until(&mut sim, 96, |_, events| {
        events.events.iter().any(|event| {
            matches!(event, SimEvent::DamageDealt { splash: true, .. })
        })
    });
    let last = history.last().unwrap();
    let hits: Vec<(u32, bool)> = last
        .events
        .iter()
        .filter_map(|event| match event {
            SimEvent::DamageDealt {
                attacker,
                amount,
                splash,
                ..
            } if *attacker == mage => Some((*amount, *splash)),
            _ => None,
        })
        .collect();

    // Primary hit, then 100 * (1 - 1.5 / 3) * 0.5 to the dummy 1.5 away.
    assert_eq!(hits, vec![(100, false), (25, true)]);
}

#[test]
fn test_deploy_refused_without_funds() {
    let level = single_wave_level(1)
        .with_economy(flat_economy(50))
        .with_blueprint(
            UnitBlueprint::new(
                "paladin",
                Faction::Player,
                CombatStats::new(10, 100, fixed(1), fixed(1)),
            )
            .with_deploy(100, fixed(0)),
        );
    let mut sim = Simulation::new(level);

    let result = sim.deploy(&KindId::from("paladin"), point(2, 2));
    assert_eq!(
        result,
        Err(PlacementError::InsufficientFunds {
            required: 100,
            available: 50,
        })
    );
    assert_eq!(sim.balance(), 50);
    assert_eq!(sim.roster().live_count_of(Faction::Player), 0);
}

#[test]
fn test_next_wave_waits_for_previous_clear() {
    let level = LevelConfig::default()
        .with_economy(flat_economy(100))
        .with_scheduler(instant_scheduler())
        .with_blueprint(goblin())
        .with_wave(Wave::new(vec![SpawnGroup::new("goblin", 2)]).with_post_wave_delay(fixed(1)))
        .with_wave(Wave::new(vec![SpawnGroup::new("goblin", 1)]))
        .with_path(straight_path(40));
    let mut sim = Simulation::new(level);

    let mut first_spawns = Vec::new();
    let mut started = Vec::new();
    let mut completed = Vec::new();
    let mut clear_after = None;
    for tick in 0..400 {
        let events = sim.tick();
        started.extend(events.waves_started().map(|wave| (wave, tick)));
        completed.extend(events.waves_completed().map(|wave| (wave, tick)));
        first_spawns.extend(events.spawned());

        // Hold wave 0 for a while before clearing it.
        if tick == 100 {
            for id in first_spawns.drain(..) {
                sim.apply_damage(id, 1_000).unwrap();
            }
            clear_after = Some(tick);
        }
        if let Some(cleared) = clear_after {
            if tick > cleared {
                for id in first_spawns.drain(..) {
                    sim.apply_damage(id, 1_000).unwrap();
                }
            }
        }
    }

    let wave0_done = completed.iter().find(|(wave, _)| *wave == 0).unwrap().1;
    let wave1_start = started.iter().find(|(wave, _)| *wave == 1).unwrap().1;
    assert!(wave0_done > 100);
    assert!(wave1_start > wave0_done);
    // Wave 1 waits out the 1 second post-wave delay after the clear.
    assert_eq!(wave1_start - wave0_done, 16);
    assert!(sim.is_complete());
}

#[test]
fn test_breaching_enemies_drain_points() {
    let level = LevelConfig::default()
        .with_economy(flat_economy(100))
        .with_scheduler(instant_scheduler())
        .with_blueprint(goblin())
        .with_wave(
            Wave::new(vec![
                SpawnGroup::new("goblin", 3).with_interval(fixed_f(0.5))
            ])
            .with_clear_reward(7),
        )
        .with_path(straight_path(3));
    let mut sim = Simulation::new(level);

    let history = run_until(&mut sim, 200, |_, events| events.all_waves_complete());
    let breaches: Vec<u32> = history
        .iter()
        .flat_map(|events| events.events.iter())
        .filter_map(|event| match event {
            SimEvent::ObjectiveBreached { penalty, .. } => Some(*penalty),
            _ => None,
        })
        .collect();

    assert_eq!(breaches, vec![10, 10, 10]);
    assert!(sim.is_complete());
    assert_eq!(sim.stats().enemies_breached, 3);
    // 100 - 3 * 10 + 7, no bounties for breaches.
    assert_eq!(sim.balance(), 77);
}

#[test]
fn test_defended_level_runs_to_completion() {
    let mut sim = defended_simulation(5);
    let history = run_until(&mut sim, 16 * 600, |sim, _| sim.is_complete());

    assert!(sim.is_complete(), "level did not finish in time");
    let stats = sim.stats();
    assert_eq!(
        stats.enemies_spawned,
        stats.enemies_killed + stats.enemies_breached
    );
    assert_eq!(stats.waves_completed, 3);

    let completions: Vec<u32> = history
        .iter()
        .flat_map(|events| events.waves_completed())
        .collect();
    assert_eq!(completions, vec![0, 1, 2]);
    let announced_boss = history.iter().flat_map(|events| events.events.iter()).any(
        |event| matches!(event, SimEvent::WaveAnnounced { wave: 2, boss: true }),
    );
    assert!(announced_boss);
}
