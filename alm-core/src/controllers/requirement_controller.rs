use super::{guarded, ChangeEvent, ChangeNotifier, Outcome};
use crate::db::RequirementCriteria;
use crate::error::Result;
use crate::managers::RequirementManager;
use crate::models::{NewRequirement, Requirement, RequirementPatch};

/// Entry point for requirement operations used by the presentation layer
pub struct RequirementController {
    manager: RequirementManager,
    notifier: ChangeNotifier,
}

impl RequirementController {
    /// Creates a controller with no listeners
    pub fn new(manager: RequirementManager) -> Self {
        Self {
            manager,
            notifier: ChangeNotifier::default(),
        }
    }

    /// Registers a listener called after every successful write
    pub fn subscribe<F>(&mut self, listener: F)
    where
        F: Fn(&ChangeEvent) + 'static,
    {
        self.notifier.subscribe(listener);
    }

    /// Creates a requirement and notifies listeners on success
    pub fn create_requirement(&self, data: NewRequirement) -> Outcome<Requirement> {
        match guarded("Create requirement", || self.manager.create(data)) {
            Ok(requirement) => {
                self.notifier
                    .notify(&ChangeEvent::RequirementCreated(requirement.id.clone()));
                Outcome::success(
                    format!("Requirement {} created successfully", requirement.id),
                    Some(requirement),
                )
            }
            Err(message) => Outcome::failure(message),
        }
    }

    /// Applies `patch` and notifies listeners on success
    pub fn update_requirement(&self, id: &str, patch: &RequirementPatch) -> Outcome<Requirement> {
        match guarded("Update requirement", || self.manager.update(id, patch)) {
            Ok(requirement) => {
                self.notifier
                    .notify(&ChangeEvent::RequirementUpdated(requirement.id.clone()));
                Outcome::success(
                    format!("Requirement {} updated successfully", id),
                    Some(requirement),
                )
            }
            Err(message) => Outcome::failure(message),
        }
    }

    /// Deletes by id; a missing id is a failed outcome
    pub fn delete_requirement(&self, id: &str) -> Outcome<()> {
        match guarded("Delete requirement", || self.manager.delete(id)) {
            Ok(true) => {
                self.notifier
                    .notify(&ChangeEvent::RequirementDeleted(id.to_string()));
                Outcome::success(format!("Requirement {} deleted successfully", id), None)
            }
            Ok(false) => Outcome::failure(format!("Requirement {} not found", id)),
            Err(message) => Outcome::failure(message),
        }
    }

    /// All requirements
    pub fn list_requirements(&self) -> Result<Vec<Requirement>> {
        self.manager.list()
    }

    /// Free-text search over id, title and description
    pub fn search_requirements(&self, query: &str) -> Result<Vec<Requirement>> {
        self.manager.search(query)
    }

    /// A single requirement, if it exists
    pub fn get_requirement(&self, id: &str) -> Result<Option<Requirement>> {
        self.manager.get(id)
    }

    /// Requirements filtered by status, priority, category or parent
    pub fn find_requirements(&self, criteria: &RequirementCriteria) -> Result<Vec<Requirement>> {
        self.manager.find(criteria)
    }

    /// Direct children of `parent_id`
    pub fn children(&self, parent_id: &str) -> Result<Vec<Requirement>> {
        self.manager.children(parent_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::temp_database;
    use crate::db::{RequirementRepository, SqliteRequirementStore};
    use crate::error::AlmError;
    use crate::models::RequirementStatus;
    use std::cell::RefCell;
    use std::rc::Rc;
    use tempfile::TempDir;

    fn controller() -> (TempDir, RequirementController) {
        let (dir, db) = temp_database();
        let manager = RequirementManager::new(Box::new(SqliteRequirementStore::new(db)));
        (dir, RequirementController::new(manager))
    }

    fn recorder(controller: &mut RequirementController) -> Rc<RefCell<Vec<ChangeEvent>>> {
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        controller.subscribe(move |event| sink.borrow_mut().push(event.clone()));
        events
    }

    /// Store whose writes fail the way a locked or corrupt database would
    struct BrokenStore;

    impl RequirementRepository for BrokenStore {
        fn create(&self, _: &Requirement) -> Result<String> {
            Err(AlmError::storage("Failed to create requirement", rusqlite::Error::InvalidQuery))
        }
        fn read(&self, _: &str) -> Result<Option<Requirement>> {
            Ok(None)
        }
        fn update(&self, _: &Requirement) -> Result<bool> {
            Ok(false)
        }
        fn delete(&self, _: &str) -> Result<bool> {
            Err(AlmError::storage("Failed to delete requirement", rusqlite::Error::InvalidQuery))
        }
        fn find_by_criteria(&self, _: &RequirementCriteria) -> Result<Vec<Requirement>> {
            Ok(Vec::new())
        }
        fn next_id(&self) -> Result<String> {
            Ok("REQ-001".to_string())
        }
    }

    struct PanickingStore;

    impl RequirementRepository for PanickingStore {
        fn create(&self, _: &Requirement) -> Result<String> {
            panic!("connection pool poisoned")
        }
        fn read(&self, _: &str) -> Result<Option<Requirement>> {
            panic!("connection pool poisoned")
        }
        fn update(&self, _: &Requirement) -> Result<bool> {
            panic!("connection pool poisoned")
        }
        fn delete(&self, _: &str) -> Result<bool> {
            panic!("connection pool poisoned")
        }
        fn find_by_criteria(&self, _: &RequirementCriteria) -> Result<Vec<Requirement>> {
            panic!("connection pool poisoned")
        }
        fn next_id(&self) -> Result<String> {
            panic!("connection pool poisoned")
        }
    }

    #[test]
    fn test_create_success_notifies_before_returning() {
        let (_dir, mut controller) = controller();
        let events = recorder(&mut controller);

        let outcome = controller.create_requirement(NewRequirement::titled("Login flow"));

        assert!(outcome.succeeded);
        assert_eq!(outcome.message, "Requirement REQ-001 created successfully");
        assert_eq!(outcome.entity.unwrap().title, "Login flow");
        assert_eq!(
            *events.borrow(),
            vec![ChangeEvent::RequirementCreated("REQ-001".to_string())]
        );
    }

    #[test]
    fn test_validation_failure_is_reported_without_notification() {
        let (_dir, mut controller) = controller();
        let events = recorder(&mut controller);

        let outcome = controller.create_requirement(NewRequirement::titled(""));

        assert!(!outcome.succeeded);
        assert_eq!(outcome.message, "Validation failed: Title is required");
        assert!(outcome.entity.is_none());
        assert!(events.borrow().is_empty());
    }

    #[test]
    fn test_duplicate_id_reports_database_error() {
        let (_dir, controller) = controller();
        let data = NewRequirement {
            id: Some("REQ-007".to_string()),
            ..NewRequirement::titled("First")
        };
        assert!(controller.create_requirement(data.clone()).succeeded);

        let outcome = controller.create_requirement(data);
        assert!(!outcome.succeeded);
        assert!(outcome.message.starts_with("Database error:"));
    }

    #[test]
    fn test_update_and_delete_messages() {
        let (_dir, mut controller) = controller();
        controller.create_requirement(NewRequirement::titled("Login flow"));
        let events = recorder(&mut controller);

        let patch = RequirementPatch {
            status: Some(RequirementStatus::Approved),
            ..RequirementPatch::default()
        };
        let updated = controller.update_requirement("REQ-001", &patch);
        assert!(updated.succeeded);
        assert_eq!(updated.message, "Requirement REQ-001 updated successfully");

        let missing = controller.update_requirement("REQ-404", &patch);
        assert!(!missing.succeeded);
        assert_eq!(missing.message, "Requirement REQ-404 not found");

        let deleted = controller.delete_requirement("REQ-001");
        assert!(deleted.succeeded);
        assert_eq!(deleted.message, "Requirement REQ-001 deleted successfully");

        let again = controller.delete_requirement("REQ-001");
        assert!(!again.succeeded);
        assert_eq!(again.message, "Requirement REQ-001 not found");

        assert_eq!(
            *events.borrow(),
            vec![
                ChangeEvent::RequirementUpdated("REQ-001".to_string()),
                ChangeEvent::RequirementDeleted("REQ-001".to_string()),
            ]
        );
    }

    #[test]
    fn test_storage_fault_becomes_failed_outcome() {
        let mut controller = RequirementController::new(RequirementManager::new(Box::new(BrokenStore)));
        let events = recorder(&mut controller);

        let created = controller.create_requirement(NewRequirement::titled("Doomed"));
        assert!(!created.succeeded);
        assert!(created.message.starts_with("Database error: Failed to create requirement"));

        let deleted = controller.delete_requirement("REQ-001");
        assert!(!deleted.succeeded);
        assert!(deleted.message.starts_with("Database error: Failed to delete requirement"));

        assert!(events.borrow().is_empty());
    }

    #[test]
    fn test_panic_below_is_contained() {
        let controller = RequirementController::new(RequirementManager::new(Box::new(PanickingStore)));

        let outcome = controller.create_requirement(NewRequirement::titled("Anything"));
        assert!(!outcome.succeeded);
        assert_eq!(outcome.message, "Unexpected error: connection pool poisoned");

        let outcome = controller.update_requirement("REQ-001", &RequirementPatch::default());
        assert_eq!(outcome.message, "Unexpected error: connection pool poisoned");
    }

    #[test]
    fn test_read_pass_throughs() {
        let (_dir, controller) = controller();
        controller.create_requirement(NewRequirement::titled("Login flow"));
        controller.create_requirement(NewRequirement {
            parent_id: Some("REQ-001".to_string()),
            ..NewRequirement::titled("Logout flow")
        });

        assert_eq!(controller.list_requirements().unwrap().len(), 2);
        assert_eq!(controller.search_requirements("LOGOUT").unwrap().len(), 1);
        assert!(controller.get_requirement("REQ-002").unwrap().is_some());
        assert_eq!(controller.children("REQ-001").unwrap()[0].id, "REQ-002");

        let criteria = RequirementCriteria::from_pairs([("status", "Draft")]).unwrap();
        assert_eq!(controller.find_requirements(&criteria).unwrap().len(), 2);
    }
}
