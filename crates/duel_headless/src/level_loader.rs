//! Level loading for headless runs.
//!
//! Reads [`LevelConfig`] definitions from RON files. The simulation core
//! does no IO; everything touching the filesystem lives here.

use std::fs;
use std::path::{Path, PathBuf};

use duel_core::data::LevelConfig;
use thiserror::Error;

/// Environment variable naming a directory of level files.
pub const LEVEL_DIR_ENV: &str = "DUEL_LEVEL_DIR";

/// Errors that can occur during level loading.
#[derive(Debug, Error)]
pub enum LevelLoadError {
    /// Failed to read file.
    #[error("IO error reading '{path}': {source}")]
    Io {
        /// File or directory being read.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// Failed to parse RON.
    #[error("Parse error in '{path}': {source}")]
    Parse {
        /// File being parsed.
        path: PathBuf,
        /// Underlying error, with line and column.
        #[source]
        source: ron::error::SpannedError,
    },
    /// Directory not found.
    #[error("Directory not found: {0}")]
    DirectoryNotFound(PathBuf),
}

/// Load one level from a RON file.
pub fn load_level(path: &Path) -> Result<LevelConfig, LevelLoadError> {
    let content = fs::read_to_string(path).map_err(|source| LevelLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let level: LevelConfig = ron::from_str(&content).map_err(|source| LevelLoadError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    tracing::debug!(
        path = %path.display(),
        waves = level.waves.len(),
        blueprints = level.blueprints.len(),
        "Loaded level"
    );
    Ok(level)
}

/// Load every `.ron` level in a directory, sorted by file name.
///
/// Files that fail to load are logged and skipped.
pub fn load_levels_from_directory(
    dir: &Path,
) -> Result<Vec<(PathBuf, LevelConfig)>, LevelLoadError> {
    if !dir.exists() {
        return Err(LevelLoadError::DirectoryNotFound(dir.to_path_buf()));
    }

    let entries = fs::read_dir(dir).map_err(|source| LevelLoadError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| LevelLoadError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "ron") {
            paths.push(path);
        }
    }
    paths.sort();

    let mut levels = Vec::with_capacity(paths.len());
    for path in paths {
        match load_level(&path) {
            Ok(level) => levels.push((path, level)),
            Err(err) => tracing::warn!(error = %err, "Skipping level"),
        }
    }
    Ok(levels)
}

/// Resolve the default level directory.
///
/// Looks for level files in standard locations:
/// 1. Environment variable `DUEL_LEVEL_DIR`
/// 2. `./crates/duel_headless/levels/` (repo root)
/// 3. `./levels/` (running from duel_headless)
pub fn default_level_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var(LEVEL_DIR_ENV) {
        let path = PathBuf::from(dir);
        if path.exists() {
            return Some(path);
        }
    }

    ["crates/duel_headless/levels", "levels"]
        .iter()
        .map(PathBuf::from)
        .find(|path| path.exists())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_directory() {
        let err = load_levels_from_directory(Path::new("/definitely/not/here")).unwrap_err();
        assert!(matches!(err, LevelLoadError::DirectoryNotFound(_)));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_level(Path::new("/definitely/not/here.ron")).unwrap_err();
        assert!(matches!(err, LevelLoadError::Io { .. }));
        assert!(err.to_string().contains("here.ron"));
    }
}
