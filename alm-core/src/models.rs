use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::error::AlmError;

/// Key of a requirement, e.g. "REQ-001"
pub type RequirementId = String;

/// Store-assigned key of a design
pub type DesignId = i64;

/// Prefix every requirement id carries
pub const REQUIREMENT_ID_PREFIX: &str = "REQ-";

/// Lowercases and folds `_`/`-` to spaces so "under_review" matches "Under Review"
fn normalize_label(s: &str) -> String {
    s.trim()
        .chars()
        .map(|c| if c == '_' || c == '-' { ' ' } else { c })
        .collect::<String>()
        .to_lowercase()
}

/// Lifecycle status of a requirement
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum RequirementStatus {
    Draft,
    #[serde(rename = "Under Review")]
    UnderReview,
    Approved,
    Implemented,
    Obsolete,
}

impl RequirementStatus {
    pub const ALL: [RequirementStatus; 5] = [
        RequirementStatus::Draft,
        RequirementStatus::UnderReview,
        RequirementStatus::Approved,
        RequirementStatus::Implemented,
        RequirementStatus::Obsolete,
    ];

    /// Label used for display and storage
    pub fn as_str(&self) -> &'static str {
        match self {
            RequirementStatus::Draft => "Draft",
            RequirementStatus::UnderReview => "Under Review",
            RequirementStatus::Approved => "Approved",
            RequirementStatus::Implemented => "Implemented",
            RequirementStatus::Obsolete => "Obsolete",
        }
    }
}

impl fmt::Display for RequirementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RequirementStatus {
    type Err = AlmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_label(s).as_str() {
            "draft" => Ok(RequirementStatus::Draft),
            "under review" => Ok(RequirementStatus::UnderReview),
            "approved" => Ok(RequirementStatus::Approved),
            "implemented" => Ok(RequirementStatus::Implemented),
            "obsolete" => Ok(RequirementStatus::Obsolete),
            _ => Err(AlmError::InvalidEnumValue {
                kind: "requirement status",
                value: s.to_string(),
            }),
        }
    }
}

/// Priority of a requirement
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl Priority {
    pub const ALL: [Priority; 4] = [
        Priority::Low,
        Priority::Medium,
        Priority::High,
        Priority::Critical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
            Priority::Critical => "Critical",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Priority {
    type Err = AlmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_label(s).as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            "critical" => Ok(Priority::Critical),
            _ => Err(AlmError::InvalidEnumValue {
                kind: "priority",
                value: s.to_string(),
            }),
        }
    }
}

/// Kind of design artifact
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum DesignType {
    Architecture,
    Component,
    Interface,
    Database,
    Algorithm,
    Security,
}

impl DesignType {
    /// The fixed set offered to presentation layers
    pub const ALL: [DesignType; 6] = [
        DesignType::Architecture,
        DesignType::Component,
        DesignType::Interface,
        DesignType::Database,
        DesignType::Algorithm,
        DesignType::Security,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DesignType::Architecture => "Architecture",
            DesignType::Component => "Component",
            DesignType::Interface => "Interface",
            DesignType::Database => "Database",
            DesignType::Algorithm => "Algorithm",
            DesignType::Security => "Security",
        }
    }
}

impl fmt::Display for DesignType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DesignType {
    type Err = AlmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_label(s).as_str() {
            "architecture" => Ok(DesignType::Architecture),
            "component" => Ok(DesignType::Component),
            "interface" => Ok(DesignType::Interface),
            "database" => Ok(DesignType::Database),
            "algorithm" => Ok(DesignType::Algorithm),
            "security" => Ok(DesignType::Security),
            _ => Err(AlmError::InvalidEnumValue {
                kind: "design type",
                value: s.to_string(),
            }),
        }
    }
}

/// Lifecycle status of a design
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum DesignStatus {
    Draft,
    #[serde(rename = "In Review")]
    InReview,
    Approved,
    Implemented,
}

impl DesignStatus {
    pub const ALL: [DesignStatus; 4] = [
        DesignStatus::Draft,
        DesignStatus::InReview,
        DesignStatus::Approved,
        DesignStatus::Implemented,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DesignStatus::Draft => "Draft",
            DesignStatus::InReview => "In Review",
            DesignStatus::Approved => "Approved",
            DesignStatus::Implemented => "Implemented",
        }
    }
}

impl fmt::Display for DesignStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DesignStatus {
    type Err = AlmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_label(s).as_str() {
            "draft" => Ok(DesignStatus::Draft),
            // Older databases used "Under Review" for designs too
            "in review" | "under review" => Ok(DesignStatus::InReview),
            "approved" => Ok(DesignStatus::Approved),
            "implemented" => Ok(DesignStatus::Implemented),
            _ => Err(AlmError::InvalidEnumValue {
                kind: "design status",
                value: s.to_string(),
            }),
        }
    }
}

/// A tracked statement of system need
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Requirement {
    /// Key of the form "REQ-001"; never changes after creation
    pub id: RequirementId,

    /// Short title, at most 200 characters
    pub title: String,

    #[serde(default)]
    pub description: String,

    pub status: RequirementStatus,

    pub priority: Priority,

    /// Free-form grouping, at most 50 characters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    /// Parent requirement in the hierarchy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<RequirementId>,

    #[serde(default)]
    pub verification_criteria: String,

    /// Designs this requirement traces to
    #[serde(default)]
    pub design_ids: BTreeSet<DesignId>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} [{}]", self.id, self.title, self.status)
    }
}

/// A tracked design artifact
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Design {
    /// Assigned by the store; `None` until the design has been persisted
    pub id: Option<DesignId>,

    pub name: String,

    /// Markdown text; formatting is left to the presentation layer
    pub description: String,

    #[serde(rename = "type")]
    pub design_type: DesignType,

    pub status: DesignStatus,

    /// Requirements this design traces to
    #[serde(default)]
    pub requirement_ids: BTreeSet<RequirementId>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl fmt::Display for Design {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id {
            Some(id) => write!(f, "{}: {} ({}) [{}]", id, self.name, self.design_type, self.status),
            None => write!(f, "(unsaved): {} ({}) [{}]", self.name, self.design_type, self.status),
        }
    }
}

/// Input for creating a requirement
///
/// Absent `id`, `status` and `priority` are filled in by the manager.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NewRequirement {
    pub id: Option<RequirementId>,
    pub title: String,
    pub description: String,
    pub status: Option<RequirementStatus>,
    pub priority: Option<Priority>,
    pub category: Option<String>,
    pub parent_id: Option<RequirementId>,
    pub verification_criteria: String,
    pub design_ids: BTreeSet<DesignId>,
}

impl NewRequirement {
    /// Creation input with only a title set
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

/// Deserializes a present key as `Some`, so `null` becomes `Some(None)`
fn deserialize_present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Partial update of a requirement
///
/// `None` leaves a field untouched. For the clearable fields the inner
/// option distinguishes "set to a value" from "clear".
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RequirementPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<RequirementStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    /// Omitted when untouched; `null` clears
    #[serde(
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub category: Option<Option<String>>,
    #[serde(
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub parent_id: Option<Option<RequirementId>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_criteria: Option<String>,
    /// Replaces the whole link set when present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub design_ids: Option<BTreeSet<DesignId>>,
}

impl RequirementPatch {
    /// True when no field would change
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Applies the present fields to `req`, leaving the rest untouched
    pub fn apply_to(&self, req: &mut Requirement) {
        if let Some(title) = &self.title {
            req.title = title.clone();
        }
        if let Some(description) = &self.description {
            req.description = description.clone();
        }
        if let Some(status) = self.status {
            req.status = status;
        }
        if let Some(priority) = self.priority {
            req.priority = priority;
        }
        if let Some(category) = &self.category {
            req.category = category.clone();
        }
        if let Some(parent_id) = &self.parent_id {
            req.parent_id = parent_id.clone();
        }
        if let Some(criteria) = &self.verification_criteria {
            req.verification_criteria = criteria.clone();
        }
        if let Some(design_ids) = &self.design_ids {
            req.design_ids = design_ids.clone();
        }
    }
}

/// Input for creating a design
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewDesign {
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub design_type: DesignType,
    #[serde(default)]
    pub status: Option<DesignStatus>,
    #[serde(default)]
    pub requirement_ids: BTreeSet<RequirementId>,
}

impl NewDesign {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        design_type: DesignType,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            design_type,
            status: None,
            requirement_ids: BTreeSet::new(),
        }
    }
}
