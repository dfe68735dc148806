use chrono::Utc;

use crate::db::{RequirementCriteria, RequirementRepository};
use crate::error::{AlmError, Result};
use crate::models::{NewRequirement, Priority, Requirement, RequirementPatch, RequirementStatus};
use crate::validation::validate_requirement;

fn not_found(id: &str) -> AlmError {
    AlmError::NotFound {
        entity: "Requirement",
        id: id.to_string(),
    }
}

/// Orchestrates requirement creation, updates and lookups
pub struct RequirementManager {
    repository: Box<dyn RequirementRepository>,
}

impl RequirementManager {
    /// Wraps the repository the manager reads and writes through
    pub fn new(repository: Box<dyn RequirementRepository>) -> Self {
        Self { repository }
    }

    /// Creates a requirement, generating its id when none is supplied
    ///
    /// Status defaults to Draft and priority to Medium. Nothing is written if
    /// validation fails.
    pub fn create(&self, data: NewRequirement) -> Result<Requirement> {
        let id = match data.id.filter(|id| !id.trim().is_empty()) {
            Some(id) => id,
            None => self.repository.next_id()?,
        };

        let now = Utc::now();
        let requirement = Requirement {
            id,
            title: data.title,
            description: data.description,
            status: data.status.unwrap_or(RequirementStatus::Draft),
            priority: data.priority.unwrap_or(Priority::Medium),
            category: data.category,
            parent_id: data.parent_id,
            verification_criteria: data.verification_criteria,
            design_ids: data.design_ids,
            created_at: now,
            updated_at: now,
        };

        if let Err(e) = validate_requirement(&requirement).into_result() {
            log::warn!("Rejected new requirement {}: {}", requirement.id, e);
            return Err(e);
        }

        self.repository.create(&requirement)?;
        log::info!("Created requirement {}", requirement.id);
        Ok(requirement)
    }

    /// Applies the fields present in `patch` to an existing requirement
    pub fn update(&self, id: &str, patch: &RequirementPatch) -> Result<Requirement> {
        let mut requirement = self.repository.read(id)?.ok_or_else(|| not_found(id))?;

        patch.apply_to(&mut requirement);

        if let Err(e) = validate_requirement(&requirement).into_result() {
            log::warn!("Rejected update of requirement {}: {}", id, e);
            return Err(e);
        }

        requirement.updated_at = Utc::now();
        if !self.repository.update(&requirement)? {
            return Err(not_found(id));
        }

        log::info!("Updated requirement {}", id);
        Ok(requirement)
    }

    /// Returns whether a requirement was actually removed
    pub fn delete(&self, id: &str) -> Result<bool> {
        let removed = self.repository.delete(id)?;
        if removed {
            log::info!("Deleted requirement {}", id);
        }
        Ok(removed)
    }

    /// Looks a requirement up by id
    pub fn get(&self, id: &str) -> Result<Option<Requirement>> {
        self.repository.read(id)
    }

    /// All requirements, ordered by id
    pub fn list(&self) -> Result<Vec<Requirement>> {
        self.repository.find_all()
    }

    /// Requirements matching every criterion that is set
    pub fn find(&self, criteria: &RequirementCriteria) -> Result<Vec<Requirement>> {
        self.repository.find_by_criteria(criteria)
    }

    /// Direct children of `parent_id` in the hierarchy
    pub fn children(&self, parent_id: &str) -> Result<Vec<Requirement>> {
        self.repository
            .find_by_criteria(&RequirementCriteria::children_of(parent_id))
    }

    /// Case-insensitive substring match on id, title and description
    pub fn search(&self, query: &str) -> Result<Vec<Requirement>> {
        let needle = query.to_lowercase();
        Ok(self
            .repository
            .find_all()?
            .into_iter()
            .filter(|req| {
                req.id.to_lowercase().contains(&needle)
                    || req.title.to_lowercase().contains(&needle)
                    || req.description.to_lowercase().contains(&needle)
            })
            .collect())
    }
}
