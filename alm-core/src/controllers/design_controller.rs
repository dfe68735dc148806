use super::{guarded, ChangeEvent, ChangeNotifier, Outcome};
use crate::db::DesignCriteria;
use crate::error::Result;
use crate::managers::DesignManager;
use crate::models::{Design, DesignId, DesignType, NewDesign};

/// Entry point for design operations used by the presentation layer
pub struct DesignController {
    manager: DesignManager,
    notifier: ChangeNotifier,
}

impl DesignController {
    /// Creates a controller with no listeners
    pub fn new(manager: DesignManager) -> Self {
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

    /// Creates a design and notifies listeners on success
    pub fn create_design(&self, data: NewDesign) -> Outcome<Design> {
        match guarded("Create design", || self.manager.create(data)) {
            Ok(design) => {
                let id = design.id.unwrap_or_default();
                self.notifier.notify(&ChangeEvent::DesignCreated(id));
                Outcome::success(format!("Design {} created successfully", id), Some(design))
            }
            Err(message) => Outcome::failure(message),
        }
    }

    /// Overwrites the stored design with `design`
    pub fn update_design(&self, design: Design) -> Outcome<Design> {
        match guarded("Update design", || self.manager.update(design)) {
            Ok(design) => {
                let id = design.id.unwrap_or_default();
                self.notifier.notify(&ChangeEvent::DesignUpdated(id));
                Outcome::success(format!("Design {} updated successfully", id), Some(design))
            }
            Err(message) => Outcome::failure(message),
        }
    }

    /// Deletes by id and notifies listeners
    pub fn delete_design(&self, id: DesignId) -> Outcome<()> {
        match guarded("Delete design", || self.manager.delete(id)) {
            Ok(true) => {
                self.notifier.notify(&ChangeEvent::DesignDeleted(id));
                Outcome::success(format!("Design {} deleted successfully", id), None)
            }
            Ok(false) => Outcome::failure(format!("Design {} not found", id)),
            Err(message) => Outcome::failure(message),
        }
    }

    /// All designs
    pub fn list_designs(&self) -> Result<Vec<Design>> {
        self.manager.list()
    }

    /// A single design, if it exists
    pub fn get_design(&self, id: DesignId) -> Result<Option<Design>> {
        self.manager.get(id)
    }

    /// Designs filtered by type and status
    pub fn find_designs(&self, criteria: &DesignCriteria) -> Result<Vec<Design>> {
        self.manager.find(criteria)
    }

    /// The fixed design type vocabulary, for pickers
    pub fn list_design_types(&self) -> &'static [DesignType] {
        self.manager.design_types()
    }
}
