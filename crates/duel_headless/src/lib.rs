//! Headless level runner for balance testing and CI verification.
//!
//! Runs Duel Defense levels without graphics. This enables:
//!
//! - **Balance testing**: Run a level with scripted deployments and read
//!   the final balance, kills and breaches
//! - **CI verification**: Check that a level replays identically
//! - **Level validation**: Report configuration problems before play
//!
//! # Example
//!
//! ```bash
//! # Run a level with an archer deployed before the first tick
//! cargo run -p duel_headless -- run crates/duel_headless/levels/meadow.ron --deploy archer@8,2
//!
//! # Verify determinism across four runs
//! cargo run -p duel_headless -- verify crates/duel_headless/levels/meadow.ron --runs 4
//!
//! # Validate every level in the default directory
//! cargo run -p duel_headless -- validate
//! ```

pub mod level_loader;
pub mod runner;
