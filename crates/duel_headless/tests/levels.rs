//! Level files on disk, loaded and run end to end.

use std::fs;
use std::path::PathBuf;

use duel_headless::level_loader::{load_level, load_levels_from_directory, LevelLoadError};
use duel_headless::runner::{run_level, verify_level, RunConfig, RunOutcome};
use duel_test_utils::fixtures::single_wave_level;

fn bundled(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("levels")
        .join(name)
}

#[test]
fn test_bundled_level_is_clean() {
    let level = load_level(&bundled("meadow.ron")).unwrap();
    assert_eq!(level.waves.len(), 3);
    assert!(level.waves[2].boss);
    assert!(level.validate().is_empty(), "{:?}", level.validate());
}

#[test]
fn test_bundled_level_runs_to_completion() {
    let level = load_level(&bundled("meadow.ron")).unwrap();
    let config = RunConfig {
        deployments: vec![
            "archer@8,2".parse().unwrap(),
            "knight@16,2".parse().unwrap(),
            "mage@21,5".parse().unwrap(),
        ],
        ..RunConfig::default()
    };

    let report = run_level(level, &config);
    assert_eq!(report.outcome, RunOutcome::Complete);
    assert!(report.refused_deployments.is_empty());
    assert_eq!(report.stats.waves_completed, 3);
    assert_eq!(
        report.stats.enemies_spawned,
        report.stats.enemies_killed + report.stats.enemies_breached
    );
}

#[test]
fn test_bundled_level_replays() {
    let level = load_level(&bundled("meadow.ron")).unwrap();
    let config = RunConfig {
        max_ticks: 16 * 90,
        ..RunConfig::default()
    };
    assert!(verify_level(&level, &config, 2).deterministic);
}

#[test]
fn test_parse_error_reports_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.ron");
    fs::write(&path, "LevelConfig(waves: [").unwrap();

    let err = load_level(&path).unwrap_err();
    assert!(matches!(err, LevelLoadError::Parse { .. }));
    assert!(err.to_string().contains("broken.ron"));
}

#[test]
fn test_directory_skips_bad_files() {
    let dir = tempfile::tempdir().unwrap();
    let good = single_wave_level(2).to_ron_string().unwrap();
    fs::write(dir.path().join("b_good.ron"), &good).unwrap();
    fs::write(dir.path().join("a_good.ron"), &good).unwrap();
    fs::write(dir.path().join("c_bad.ron"), "not a level").unwrap();
    fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

    let levels = load_levels_from_directory(dir.path()).unwrap();
    let names: Vec<_> = levels
        .iter()
        .filter_map(|(path, _)| path.file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["a_good.ron", "b_good.ron"]);
    assert_eq!(levels[0].1, single_wave_level(2));
}
