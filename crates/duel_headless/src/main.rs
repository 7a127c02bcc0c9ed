//! Headless Duel Defense level runner.
//!
//! # Usage
//!
//! ```bash
//! # Run a level and print a summary
//! cargo run -p duel_headless -- run levels/meadow.ron
//!
//! # Same, as JSON on stdout
//! cargo run -p duel_headless -- --json run levels/meadow.ron --seed 7
//!
//! # Check a level replays identically
//! cargo run -p duel_headless -- verify levels/meadow.ron --runs 8
//!
//! # Report configuration problems
//! cargo run -p duel_headless -- validate levels/
//! ```
//!
//! Reports go to stdout, logs to stderr.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use duel_core::data::LevelConfig;
use duel_headless::{
    level_loader::{default_level_dir, load_level, load_levels_from_directory, LevelLoadError},
    runner::{run_level, verify_level, Deployment, RunConfig, RunOutcome, DEFAULT_MAX_TICKS},
};

#[derive(Parser)]
#[command(name = "duel_headless")]
#[command(about = "Headless Duel Defense level runner for balance testing and CI")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print reports as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a level to completion
    Run {
        /// Level file
        level: PathBuf,

        /// Override the level seed
        #[arg(long)]
        seed: Option<u64>,

        /// Deploy a player unit: kind@x,y[:tick]
        #[arg(short, long = "deploy")]
        deployments: Vec<Deployment>,

        /// Tick limit
        #[arg(long, default_value_t = DEFAULT_MAX_TICKS)]
        max_ticks: u64,
    },

    /// Run a level several times and compare final states
    Verify {
        /// Level file
        level: PathBuf,

        /// Number of runs
        #[arg(short, long, default_value = "4")]
        runs: usize,

        /// Deploy a player unit: kind@x,y[:tick]
        #[arg(short, long = "deploy")]
        deployments: Vec<Deployment>,

        /// Tick limit
        #[arg(long, default_value_t = DEFAULT_MAX_TICKS)]
        max_ticks: u64,
    },

    /// Report configuration problems in a level file or directory
    Validate {
        /// Level file or directory (defaults to the standard level directory)
        path: Option<PathBuf>,

        /// Exit with failure when any problem is found
        #[arg(long)]
        strict: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging to stderr (stdout is for reports). RUST_LOG overrides --verbose.
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(filter)
        .init();

    let result = match cli.command {
        Commands::Run {
            level,
            seed,
            deployments,
            max_ticks,
        } => cmd_run(
            &level,
            RunConfig {
                max_ticks,
                seed,
                deployments,
            },
            cli.json,
        ),
        Commands::Verify {
            level,
            runs,
            deployments,
            max_ticks,
        } => cmd_verify(
            &level,
            runs,
            RunConfig {
                max_ticks,
                seed: None,
                deployments,
            },
            cli.json,
        ),
        Commands::Validate { path, strict } => cmd_validate(path, strict, cli.json),
    };

    match result {
        Ok(code) => code,
        Err(err) => {
            tracing::error!(error = %err, "Command failed");
            ExitCode::FAILURE
        }
    }
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(err) => tracing::error!(error = %err, "Failed to serialize report"),
    }
}

/// Run one level and print its report.
fn cmd_run(path: &Path, config: RunConfig, json: bool) -> Result<ExitCode, LevelLoadError> {
    let level = load_level(path)?;
    tracing::info!(level = %path.display(), deployments = config.deployments.len(), "Starting run");
    let report = run_level(level, &config);

    if json {
        print_json(&report);
    } else {
        println!("Level:     {}", path.display());
        println!("Seed:      {}", report.seed);
        println!("Outcome:   {:?} after {} ticks", report.outcome, report.ticks);
        println!("Balance:   {}", report.final_balance);
        println!(
            "Enemies:   {} spawned, {} killed, {} breached",
            report.stats.enemies_spawned, report.stats.enemies_killed, report.stats.enemies_breached
        );
        println!(
            "Units:     {} deployed, {} lost",
            report.stats.units_deployed, report.stats.units_lost
        );
        println!("Waves:     {}", report.stats.waves_completed);
        println!("Damage:    {}", report.total_damage);
        for refusal in &report.refused_deployments {
            println!("Refused:   {refusal}");
        }
        println!("Hash:      {:016x}", report.state_hash);
    }

    Ok(match report.outcome {
        RunOutcome::Complete => ExitCode::SUCCESS,
        RunOutcome::TimedOut => ExitCode::from(2),
    })
}

/// Run one level repeatedly and compare final hashes.
fn cmd_verify(
    path: &Path,
    runs: usize,
    config: RunConfig,
    json: bool,
) -> Result<ExitCode, LevelLoadError> {
    let level = load_level(path)?;
    let report = verify_level(&level, &config, runs.max(2));

    if json {
        print_json(&report);
    } else if report.deterministic {
        println!("OK: {} runs ended in state {:016x}", report.hashes.len(), report.hashes[0]);
    } else {
        println!("DIVERGED: {:x?}", report.hashes);
    }

    Ok(if report.deterministic {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

#[derive(Serialize)]
struct ValidationEntry {
    path: PathBuf,
    issues: Vec<String>,
}

/// Validate one level file or every level in a directory.
fn cmd_validate(path: Option<PathBuf>, strict: bool, json: bool) -> Result<ExitCode, LevelLoadError> {
    let path = match path.or_else(default_level_dir) {
        Some(path) => path,
        None => return Err(LevelLoadError::DirectoryNotFound(PathBuf::from("levels"))),
    };

    let levels: Vec<(PathBuf, LevelConfig)> = if path.is_dir() {
        load_levels_from_directory(&path)?
    } else {
        vec![(path.clone(), load_level(&path)?)]
    };

    let entries: Vec<ValidationEntry> = levels
        .iter()
        .map(|(path, level)| ValidationEntry {
            path: path.clone(),
            issues: level.validate().iter().map(ToString::to_string).collect(),
        })
        .collect();
    let problems: usize = entries.iter().map(|entry| entry.issues.len()).sum();

    if json {
        print_json(&entries);
    } else {
        for entry in &entries {
            if entry.issues.is_empty() {
                println!("{}: ok", entry.path.display());
            }
            for issue in &entry.issues {
                println!("{}: {issue}", entry.path.display());
            }
        }
    }

    Ok(if strict && problems > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
