//! Relational persistence for requirements, designs and their trace links
//!
//! Every store operation opens its own connection and runs inside a single
//! transaction that is committed before the call returns. There is no
//! long-lived shared connection.

mod design_store;
mod links;
mod requirement_store;
mod traits;

pub use design_store::SqliteDesignStore;
pub use requirement_store::{format_requirement_id, parse_requirement_sequence, SqliteRequirementStore};
pub use traits::{DesignCriteria, DesignRepository, RequirementCriteria, RequirementRepository};

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::error::{AlmError, Result, StorageContext};

/// Current schema version
const SCHEMA_VERSION: i32 = 1;

/// Configuration for the SQLite database
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Path to the database file
    pub path: PathBuf,
    /// Whether to enable write-ahead logging
    pub wal_mode: bool,
    /// How long a connection waits on a locked database before failing
    pub busy_timeout: Duration,
}

impl DatabaseConfig {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            ..Self::default()
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("dragon_alm.db"),
            wal_mode: true,
            busy_timeout: Duration::from_millis(5000),
        }
    }
}

/// Handle to a database file
///
/// Cheap to clone; holds only configuration. Connections are opened per
/// operation through [`Database::connect`].
#[derive(Debug, Clone)]
pub struct Database {
    config: DatabaseConfig,
}

impl Database {
    /// Opens (creating if needed) the database and applies the schema
    pub fn open(config: DatabaseConfig) -> Result<Self> {
        if let Some(parent) = config.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| AlmError::Io {
                    context: format!("Failed to create directory {:?}", parent),
                    source: e,
                })?;
            }
        }

        let db = Self { config };
        db.init_schema()?;
        log::debug!("Opened database at {:?}", db.config.path);
        Ok(db)
    }

    /// Shorthand for opening with default settings at `path`
    pub fn open_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open(DatabaseConfig::new(path))
    }

    /// Returns the path to the database file
    pub fn path(&self) -> &Path {
        &self.config.path
    }

    /// Opens a fresh connection with foreign keys enforced
    pub(crate) fn connect(&self) -> Result<Connection> {
        let conn = Connection::open(&self.config.path)
            .storage_context("Failed to open database")?;
        conn.busy_timeout(self.config.busy_timeout)
            .storage_context("Failed to set busy timeout")?;
        conn.pragma_update(None, "foreign_keys", true)
            .storage_context("Failed to enable foreign keys")?;
        Ok(conn)
    }

    /// Initialize the database schema
    fn init_schema(&self) -> Result<()> {
        let conn = self.connect()?;

        if self.config.wal_mode {
            let mode: String = conn
                .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))
                .storage_context("Failed to enable WAL mode")?;
            log::debug!("Journal mode: {}", mode);
        }

        conn.execute_batch(include_str!("schema.sql"))
            .storage_context("Failed to initialize database")?;
        conn.execute(
            "INSERT OR IGNORE INTO schema_version (id, version) VALUES (1, ?1)",
            [SCHEMA_VERSION],
        )
        .storage_context("Failed to record schema version")?;

        let found: i32 = conn
            .query_row("SELECT version FROM schema_version WHERE id = 1", [], |row| {
                row.get(0)
            })
            .storage_context("Failed to read schema version")?;

        if found != SCHEMA_VERSION {
            return Err(AlmError::SchemaMismatch {
                found,
                expected: SCHEMA_VERSION,
            });
        }

        Ok(())
    }
}

/// Parses an RFC 3339 timestamp column
pub(crate) fn parse_timestamp(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Parses an enum label column, failing on unknown labels
pub(crate) fn parse_label<T>(idx: usize, raw: &str) -> rusqlite::Result<T>
where
    T: FromStr<Err = AlmError>,
{
    raw.parse::<T>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
