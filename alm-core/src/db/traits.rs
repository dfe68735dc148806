//! Repository traits
//!
//! Managers talk to persistence only through these traits, so a store can be
//! swapped (or faked in tests) without touching business logic.

use crate::error::Result;
use crate::models::{
    Design, DesignId, DesignStatus, DesignType, Priority, Requirement, RequirementId,
    RequirementStatus,
};

/// Equality filters for requirements, combined with AND
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequirementCriteria {
    pub status: Option<RequirementStatus>,
    pub priority: Option<Priority>,
    pub category: Option<String>,
    pub parent_id: Option<RequirementId>,
}

impl RequirementCriteria {
    /// Filter matching the direct children of `parent_id`
    pub fn children_of(parent_id: impl Into<RequirementId>) -> Self {
        Self {
            parent_id: Some(parent_id.into()),
            ..Self::default()
        }
    }

    /// Builds criteria from key/value pairs
    ///
    /// Recognised keys are `status`, `priority`, `category` and `parent_id`.
    /// Other keys are ignored; a bad status or priority value is an error.
    pub fn from_pairs<'a, I>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut criteria = Self::default();
        for (key, value) in pairs {
            match key {
                "status" => criteria.status = Some(value.parse()?),
                "priority" => criteria.priority = Some(value.parse()?),
                "category" => criteria.category = Some(value.to_string()),
                "parent_id" => criteria.parent_id = Some(value.to_string()),
                other => log::debug!("Ignoring unsupported requirement filter '{}'", other),
            }
        }
        Ok(criteria)
    }

    /// True when no filter is set
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Equality filters for designs, combined with AND
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DesignCriteria {
    pub design_type: Option<DesignType>,
    pub status: Option<DesignStatus>,
}

/// Persistence for requirements and their side of the trace links
pub trait RequirementRepository {
    /// Inserts a new requirement and its links; fails with `Conflict` on a duplicate id
    fn create(&self, requirement: &Requirement) -> Result<RequirementId>;

    /// Returns `None` when no requirement has this id
    fn read(&self, id: &str) -> Result<Option<Requirement>>;

    /// Rewrites all fields and replaces the link set; `false` if the id is unknown
    fn update(&self, requirement: &Requirement) -> Result<bool>;

    /// Removes the requirement and every link to it; `false` if nothing was removed
    fn delete(&self, id: &str) -> Result<bool>;

    /// All requirements ordered by id
    fn find_all(&self) -> Result<Vec<Requirement>> {
        self.find_by_criteria(&RequirementCriteria::default())
    }

    fn find_by_criteria(&self, criteria: &RequirementCriteria) -> Result<Vec<Requirement>>;

    /// Next free "REQ-###" id; advisory, not reserved
    fn next_id(&self) -> Result<RequirementId>;
}

/// Persistence for designs and their side of the trace links
pub trait DesignRepository {
    /// Inserts a new design and returns it with the assigned id
    fn create(&self, design: &Design) -> Result<Design>;

    fn read(&self, id: DesignId) -> Result<Option<Design>>;

    /// Rewrites all fields and replaces the link set; `false` if the id is unknown
    fn update(&self, design: &Design) -> Result<bool>;

    /// Removes the design and every link to it; always reports success
    fn delete(&self, id: DesignId) -> Result<bool>;

    /// All designs ordered by id
    fn find_all(&self) -> Result<Vec<Design>> {
        self.find_by_criteria(&DesignCriteria::default())
    }

    fn find_by_criteria(&self, criteria: &DesignCriteria) -> Result<Vec<Design>>;
}
