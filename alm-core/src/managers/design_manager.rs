use chrono::Utc;

use crate::db::{DesignCriteria, DesignRepository};
use crate::error::{AlmError, Result};
use crate::models::{Design, DesignId, DesignStatus, DesignType, NewDesign};
use crate::validation::validate_design;

fn not_found(id: Option<DesignId>) -> AlmError {
    AlmError::NotFound {
        entity: "Design",
        id: id.map_or_else(|| "(unsaved)".to_string(), |id| id.to_string()),
    }
}

/// Orchestrates design creation, updates and lookups
pub struct DesignManager {
    repository: Box<dyn DesignRepository>,
}

impl DesignManager {
    /// Wraps the repository the manager reads and writes through
    pub fn new(repository: Box<dyn DesignRepository>) -> Self {
        Self { repository }
    }

    /// Creates a design; the store assigns its id
    pub fn create(&self, data: NewDesign) -> Result<Design> {
        let now = Utc::now();
        let design = Design {
            id: None,
            name: data.name,
            description: data.description,
            design_type: data.design_type,
            status: data.status.unwrap_or(DesignStatus::Draft),
            requirement_ids: data.requirement_ids,
            created_at: now,
            updated_at: now,
        };

        if let Err(e) = validate_design(&design).into_result() {
            log::warn!("Rejected new design '{}': {}", design.name, e);
            return Err(e);
        }

        let created = self.repository.create(&design)?;
        log::info!("Created design {}", created);
        Ok(created)
    }

    /// Replaces the stored design with `design` as a whole
    ///
    /// The caller supplies the complete desired state; `created_at` is kept
    /// from the stored copy.
    pub fn update(&self, mut design: Design) -> Result<Design> {
        let existing = match design.id {
            Some(id) => self.repository.read(id)?,
            None => None,
        }
        .ok_or_else(|| not_found(design.id))?;

        if let Err(e) = validate_design(&design).into_result() {
            log::warn!("Rejected update of design {:?}: {}", design.id, e);
            return Err(e);
        }

        design.created_at = existing.created_at;
        design.updated_at = Utc::now();
        if !self.repository.update(&design)? {
            return Err(not_found(design.id));
        }

        log::info!("Updated design {}", design);
        Ok(design)
    }

    /// Removes a design and its trace links
    pub fn delete(&self, id: DesignId) -> Result<bool> {
        let removed = self.repository.delete(id)?;
        log::info!("Deleted design {}", id);
        Ok(removed)
    }

    /// Looks a design up by id
    pub fn get(&self, id: DesignId) -> Result<Option<Design>> {
        self.repository.read(id)
    }

    /// All designs, ordered by id
    pub fn list(&self) -> Result<Vec<Design>> {
        self.repository.find_all()
    }

    /// Designs matching every criterion that is set
    pub fn find(&self, criteria: &DesignCriteria) -> Result<Vec<Design>> {
        self.repository.find_by_criteria(criteria)
    }

    /// The fixed set of design types
    pub fn design_types(&self) -> &'static [DesignType] {
        &DesignType::ALL
    }
}
