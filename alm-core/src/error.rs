//! Error taxonomy for the traceability core
//!
//! Stores wrap every engine fault into [`AlmError::Storage`] with a context
//! string; managers add the business-rule failures. Controllers turn all of
//! these into `(false, message)` outcomes.

use thiserror::Error;

/// Result alias used throughout the core
pub type Result<T> = std::result::Result<T, AlmError>;

/// Errors raised by stores and managers
#[derive(Debug, Error)]
pub enum AlmError {
    /// One or more field invariants were violated
    #[error("Validation failed: {}", .0.join(", "))]
    ValidationFailed(Vec<String>),

    /// The referenced entity does not exist
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    /// A string did not map to a known enumeration member
    #[error("Invalid {kind}: '{value}'")]
    InvalidEnumValue { kind: &'static str, value: String },

    /// Create was asked to insert an id that is already stored
    #[error("{entity} with ID {id} already exists")]
    Conflict { entity: &'static str, id: String },

    /// Underlying engine failure
    #[error("{context}: {source}")]
    Storage {
        context: String,
        #[source]
        source: rusqlite::Error,
    },

    /// Filesystem failure around the database file
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// The database was written by an incompatible schema version
    #[error("Database schema version {found} is not supported, expected {expected}")]
    SchemaMismatch { found: i32, expected: i32 },
}

impl AlmError {
    /// Wraps an engine error with a description of what was being attempted
    pub fn storage(context: impl Into<String>, source: rusqlite::Error) -> Self {
        AlmError::Storage {
            context: context.into(),
            source,
        }
    }

    /// True for the kinds the controller reports as database errors
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            AlmError::Storage { .. }
                | AlmError::Conflict { .. }
                | AlmError::Io { .. }
                | AlmError::SchemaMismatch { .. }
        )
    }
}

/// Extension for attaching context to raw engine results
pub(crate) trait StorageContext<T> {
    fn storage_context(self, context: &str) -> Result<T>;
}

impl<T> StorageContext<T> for std::result::Result<T, rusqlite::Error> {
    fn storage_context(self, context: &str) -> Result<T> {
        self.map_err(|e| AlmError::storage(context, e))
    }
}
