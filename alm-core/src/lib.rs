//! Dragon ALM core: requirement and design traceability over SQLite
//!
//! Layers, from the bottom up: [`db`] stores, [`managers`] for business
//! rules, and [`controllers`] as the boundary presentation code talks to.

pub mod config;
pub mod controllers;
pub mod db;
pub mod error;
pub mod export;
pub mod managers;
pub mod models;
pub mod validation;

// Re-export commonly used types
pub use config::{config_path, resolve_database_path, AlmConfig};
pub use controllers::{ChangeEvent, DesignController, Outcome, RequirementController};
pub use db::{
    Database, DatabaseConfig, DesignCriteria, DesignRepository, RequirementCriteria,
    RequirementRepository, SqliteDesignStore, SqliteRequirementStore,
};
pub use error::{AlmError, Result};
pub use export::{export_matrix_to_json, export_snapshot_to_json, Snapshot, TraceabilityMatrix};
pub use managers::{DesignManager, RequirementManager};
pub use models::{
    Design, DesignId, DesignStatus, DesignType, NewDesign, NewRequirement, Priority, Requirement,
    RequirementId, RequirementPatch, RequirementStatus,
};
pub use validation::{validate_design, validate_requirement, ValidationResult};

/// Opens the database and wires stores, managers and controllers together
pub fn open_controllers(config: DatabaseConfig) -> Result<(RequirementController, DesignController)> {
    let db = Database::open(config)?;
    let requirements = RequirementController::new(RequirementManager::new(Box::new(
        SqliteRequirementStore::new(db.clone()),
    )));
    let designs = DesignController::new(DesignManager::new(Box::new(SqliteDesignStore::new(db))));
    Ok((requirements, designs))
}
