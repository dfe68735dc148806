//! Business rules on top of the stores
//!
//! Managers are the only place that assigns identifiers, applies defaults and
//! stamps timestamps. Nothing reaches a store without passing validation here.

mod design_manager;
mod requirement_manager;

pub use design_manager::DesignManager;
pub use requirement_manager::RequirementManager;
