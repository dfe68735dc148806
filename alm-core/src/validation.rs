//! Field-level validation for requirements and designs
//!
//! Pure checks with no I/O. Every violation is collected so callers can show
//! the full list at once.

use serde::Serialize;

use crate::error::AlmError;
use crate::models::{Design, Requirement, REQUIREMENT_ID_PREFIX};

pub const MAX_ID_LEN: usize = 20;
pub const MAX_TITLE_LEN: usize = 200;
pub const MAX_CATEGORY_LEN: usize = 50;
pub const MAX_DESIGN_NAME_LEN: usize = 200;

/// Outcome of validating one entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl ValidationResult {
    fn from_errors(errors: Vec<String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }

    /// Converts a failed result into [`AlmError::ValidationFailed`]
    pub fn into_result(self) -> Result<(), AlmError> {
        if self.valid {
            Ok(())
        } else {
            Err(AlmError::ValidationFailed(self.errors))
        }
    }
}

/// Checks the field invariants of a requirement
pub fn validate_requirement(req: &Requirement) -> ValidationResult {
    let mut errors = Vec::new();

    if req.id.is_empty() || !req.id.starts_with(REQUIREMENT_ID_PREFIX) {
        errors.push(format!("ID must start with '{}'", REQUIREMENT_ID_PREFIX));
    }
    if req.id.chars().count() > MAX_ID_LEN {
        errors.push(format!("ID must not exceed {} characters", MAX_ID_LEN));
    }

    if req.title.trim().is_empty() {
        errors.push("Title is required".to_string());
    }
    if req.title.chars().count() > MAX_TITLE_LEN {
        errors.push(format!("Title must not exceed {} characters", MAX_TITLE_LEN));
    }

    if let Some(category) = &req.category {
        if category.chars().count() > MAX_CATEGORY_LEN {
            errors.push(format!(
                "Category must not exceed {} characters",
                MAX_CATEGORY_LEN
            ));
        }
    }

    // status and priority are closed enums, membership holds by construction

    ValidationResult::from_errors(errors)
}

/// Checks the field invariants of a design
pub fn validate_design(design: &Design) -> ValidationResult {
    let mut errors = Vec::new();

    if design.name.trim().is_empty() {
        errors.push("Name is required".to_string());
    }
    if design.name.chars().count() > MAX_DESIGN_NAME_LEN {
        errors.push(format!(
            "Name must not exceed {} characters",
            MAX_DESIGN_NAME_LEN
        ));
    }
    if design.description.trim().is_empty() {
        errors.push("Description is required".to_string());
    }

    ValidationResult::from_errors(errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DesignStatus, DesignType, Priority, RequirementStatus};
    use chrono::Utc;
    use std::collections::BTreeSet;

    fn requirement(id: &str, title: &str) -> Requirement {
        let now = Utc::now();
        Requirement {
            id: id.to_string(),
            title: title.to_string(),
            description: String::new(),
            status: RequirementStatus::Draft,
            priority: Priority::Medium,
            category: None,
            parent_id: None,
            verification_criteria: String::new(),
            design_ids: BTreeSet::new(),
            created_at: now,
            updated_at: now,
        }
    }

    fn design(name: &str, description: &str) -> Design {
        let now = Utc::now();
        Design {
            id: None,
            name: name.to_string(),
            description: description.to_string(),
            design_type: DesignType::Component,
            status: DesignStatus::Draft,
            requirement_ids: BTreeSet::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_valid_requirement() {
        let result = validate_requirement(&requirement("REQ-001", "Login flow"));
        assert!(result.valid);
        assert!(result.errors.is_empty());
        assert!(result.into_result().is_ok());
    }

    #[test]
    fn test_errors_are_accumulated() {
        let mut req = requirement("ISSUE-1", "   ");
        req.category = Some("c".repeat(51));

        let result = validate_requirement(&req);

        assert!(!result.valid);
        assert_eq!(
            result.errors,
            vec![
                "ID must start with 'REQ-'".to_string(),
                "Title is required".to_string(),
                "Category must not exceed 50 characters".to_string(),
            ]
        );
    }

    #[test]
    fn test_length_limits() {
        let long_id = format!("REQ-{}", "9".repeat(17));
        let result = validate_requirement(&requirement(&long_id, &"t".repeat(201)));
        assert_eq!(
            result.errors,
            vec![
                "ID must not exceed 20 characters".to_string(),
                "Title must not exceed 200 characters".to_string(),
            ]
        );

        // limits are inclusive and count characters, not bytes
        let result = validate_requirement(&requirement("REQ-001", &"é".repeat(200)));
        assert!(result.valid);
    }

    #[test]
    fn test_empty_id_rejected() {
        let result = validate_requirement(&requirement("", "Title"));
        assert_eq!(result.errors, vec!["ID must start with 'REQ-'".to_string()]);
    }

    #[test]
    fn test_validation_does_not_mutate() {
        let req = requirement("bad", "");
        let before = req.clone();
        let _ = validate_requirement(&req);
        assert_eq!(req, before);
    }

    #[test]
    fn test_design_requires_name_and_description() {
        assert!(validate_design(&design("Auth service", "Handles login")).valid);

        let result = validate_design(&design(" ", ""));
        assert_eq!(
            result.errors,
            vec!["Name is required".to_string(), "Description is required".to_string()]
        );

        let err = validate_design(&design(&"n".repeat(201), "x"))
            .into_result()
            .unwrap_err();
        assert!(matches!(err, AlmError::ValidationFailed(ref errors) if errors.len() == 1));
    }
}
