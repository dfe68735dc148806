use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::db::DatabaseConfig;

/// Database file used when nothing else names one
pub const DEFAULT_DATABASE_FILE: &str = "dragon_alm.db";

/// Environment variable overriding the database path
pub const DB_PATH_ENV: &str = "ALM_DB_PATH";

/// Environment variable overriding the config file location
pub const CONFIG_PATH_ENV: &str = "ALM_CONFIG_PATH";

fn default_wal_mode() -> bool {
    true
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

/// User settings read from `config.yaml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlmConfig {
    #[serde(default)]
    pub database_path: Option<PathBuf>,
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `env_logger` filter used when `RUST_LOG` is unset
    #[serde(default)]
    pub log_level: Option<String>,
}

impl Default for AlmConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            wal_mode: default_wal_mode(),
            busy_timeout_ms: default_busy_timeout_ms(),
            log_level: None,
        }
    }
}

impl AlmConfig {
    /// Loads the config from `path`; a missing file gives the defaults
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            log::debug!("No config file at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    /// Loads the config from its default location
    pub fn load_default() -> Result<Self> {
        Self::load(config_path()?)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)?;

        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(&path, content)
            .with_context(|| format!("Failed to write config to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Store configuration for the database at `path`
    pub fn database_config(&self, path: PathBuf) -> DatabaseConfig {
        DatabaseConfig {
            path,
            wal_mode: self.wal_mode,
            busy_timeout: Duration::from_millis(self.busy_timeout_ms),
        }
    }
}

/// Location of the config file
///
/// `$ALM_CONFIG_PATH` wins; otherwise `<config dir>/dragon-alm/config.yaml`.
pub fn config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        if !path.is_empty() {
            return Ok(PathBuf::from(path));
        }
    }

    let config_dir = dirs::config_dir().context("Could not determine config directory")?;
    Ok(config_dir.join("dragon-alm").join("config.yaml"))
}

/// Picks the database path: CLI flag, then environment, then config, then default
pub fn resolve_database_path(
    cli: Option<&Path>,
    env: Option<&str>,
    config: &AlmConfig,
) -> PathBuf {
    if let Some(path) = cli {
        return path.to_path_buf();
    }
    if let Some(path) = env.filter(|p| !p.trim().is_empty()) {
        return PathBuf::from(path);
    }
    if let Some(path) = &config.database_path {
        return path.clone();
    }
    PathBuf::from(DEFAULT_DATABASE_FILE)
}
