//! Outermost boundary of the core
//!
//! Controllers turn every manager error (and any panic from below) into an
//! [`Outcome`], so nothing raised inside the core reaches presentation code.
//! Successful writes are announced to subscribers as [`ChangeEvent`]s, in
//! registration order, before the outcome is handed back.

mod design_controller;
mod requirement_controller;

pub use design_controller::DesignController;
pub use requirement_controller::RequirementController;

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use crate::error::{AlmError, Result};
use crate::models::{DesignId, RequirementId};

/// Result of a write operation as seen by a caller
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome<T> {
    pub succeeded: bool,
    pub message: String,
    pub entity: Option<T>,
}

impl<T> Outcome<T> {
    pub fn success(message: impl Into<String>, entity: Option<T>) -> Self {
        Self {
            succeeded: true,
            message: message.into(),
            entity,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            message: message.into(),
            entity: None,
        }
    }
}

/// A committed change to one entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    RequirementCreated(RequirementId),
    RequirementUpdated(RequirementId),
    RequirementDeleted(RequirementId),
    DesignCreated(DesignId),
    DesignUpdated(DesignId),
    DesignDeleted(DesignId),
}

impl fmt::Display for ChangeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeEvent::RequirementCreated(id) => write!(f, "requirement {} created", id),
            ChangeEvent::RequirementUpdated(id) => write!(f, "requirement {} updated", id),
            ChangeEvent::RequirementDeleted(id) => write!(f, "requirement {} deleted", id),
            ChangeEvent::DesignCreated(id) => write!(f, "design {} created", id),
            ChangeEvent::DesignUpdated(id) => write!(f, "design {} updated", id),
            ChangeEvent::DesignDeleted(id) => write!(f, "design {} deleted", id),
        }
    }
}

pub type Listener = Box<dyn Fn(&ChangeEvent)>;

/// Ordered list of change subscribers
#[derive(Default)]
pub struct ChangeNotifier {
    listeners: Vec<Listener>,
}

impl ChangeNotifier {
    pub fn subscribe<F>(&mut self, listener: F)
    where
        F: Fn(&ChangeEvent) + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    /// Delivers `event` to every listener on the calling thread
    pub fn notify(&self, event: &ChangeEvent) {
        for listener in &self.listeners {
            listener(event);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeNotifier")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

/// Message shown to the caller for a failed operation
fn failure_message(err: &AlmError) -> String {
    if err.is_storage() {
        format!("Database error: {}", err)
    } else {
        err.to_string()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "internal panic".to_string()
    }
}

/// Runs `op`, converting errors and panics into a caller-facing message
pub(crate) fn guarded<T>(action: &str, op: impl FnOnce() -> Result<T>) -> std::result::Result<T, String> {
    match panic::catch_unwind(AssertUnwindSafe(op)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => {
            if err.is_storage() {
                log::warn!("{} failed: {}", action, err);
            } else {
                log::debug!("{} rejected: {}", action, err);
            }
            Err(failure_message(&err))
        }
        Err(payload) => {
            let detail = panic_message(payload.as_ref());
            log::error!("{} panicked: {}", action, detail);
            Err(format!("Unexpected error: {}", detail))
        }
    }
}
