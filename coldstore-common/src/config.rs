//! Configuration loading and resolution
//!
//! The batch job needs four externally supplied locations. Each key resolves
//! in priority order:
//! 1. Environment variable (highest priority)
//! 2. `coldstore.toml` in the working directory
//!
//! The first three keys are required; `index_db` falls back to a file inside
//! the output directory.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default file name of the provenance store, relative to `output_dir`.
const DEFAULT_INDEX_DB: &str = "prep-file-archive.sqlite";

/// Resolved configuration passed into the orchestrator.
///
/// Always constructed explicitly; no component reads the environment on its
/// own after startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Source metadata store (read-only SQLite database)
    pub source_db: PathBuf,
    /// Hot-area root directory that study folders live under
    pub root_dir: PathBuf,
    /// Destination root for ZIP archives
    pub output_dir: PathBuf,
    /// Provenance store (SQLite database, created on first run)
    pub index_db: PathBuf,
}

/// On-disk representation of `coldstore.toml`
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    source_db: Option<PathBuf>,
    root_dir: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    index_db: Option<PathBuf>,
}

impl Config {
    /// Resolve configuration from the environment and `coldstore.toml`.
    pub fn resolve() -> Result<Self> {
        Self::resolve_from(Path::new("coldstore.toml"))
    }

    /// Resolve configuration, reading the TOML fallback from `config_path`.
    pub fn resolve_from(config_path: &Path) -> Result<Self> {
        let file = load_config_file(config_path)?;

        let source_db = resolve_key("COLDSTORE_SOURCE_DB", file.source_db)
            .ok_or_else(|| Error::Config("source_db is not configured".to_string()))?;
        let root_dir = resolve_key("COLDSTORE_ROOT_DIR", file.root_dir)
            .ok_or_else(|| Error::Config("root_dir is not configured".to_string()))?;
        let output_dir = resolve_key("COLDSTORE_OUTPUT_DIR", file.output_dir)
            .ok_or_else(|| Error::Config("output_dir is not configured".to_string()))?;
        let index_db = resolve_key("COLDSTORE_INDEX_DB", file.index_db)
            .unwrap_or_else(|| output_dir.join(DEFAULT_INDEX_DB));

        Ok(Self {
            source_db,
            root_dir,
            output_dir,
            index_db,
        })
    }
}

/// Environment variable wins over the config file value.
fn resolve_key(env_var: &str, file_value: Option<PathBuf>) -> Option<PathBuf> {
    if let Ok(value) = std::env::var(env_var) {
        if !value.is_empty() {
            return Some(PathBuf::from(value));
        }
    }
    file_value
}

/// A missing config file is fine (environment-only setups); a malformed one
/// is a startup error.
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    if !path.exists() {
        return Ok(ConfigFile::default());
    }
    let content = std::fs::read_to_string(path)?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("invalid config file {}: {}", path.display(), e)))
}
