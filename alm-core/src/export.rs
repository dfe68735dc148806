use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::models::{Design, DesignId, Requirement, RequirementId, RequirementStatus};

/// Every requirement and design in the database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub requirements: Vec<Requirement>,
    pub designs: Vec<Design>,
}

impl Snapshot {
    pub fn new(requirements: Vec<Requirement>, designs: Vec<Design>) -> Self {
        Self {
            requirements,
            designs,
        }
    }
}

/// A design as referenced from a matrix row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesignRef {
    pub id: DesignId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatrixRow {
    pub requirement_id: RequirementId,
    pub title: String,
    pub status: RequirementStatus,
    pub designs: Vec<DesignRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Coverage {
    pub total: usize,
    pub covered: usize,
    /// Requirements with no linked design
    pub uncovered: Vec<RequirementId>,
}

impl Coverage {
    /// Share of requirements with at least one design, 0-100
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.covered as f64 * 100.0 / self.total as f64
    }
}

/// Requirement to design traceability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceabilityMatrix {
    pub rows: Vec<MatrixRow>,
    pub coverage: Coverage,
    /// Designs that trace to no requirement
    pub orphan_designs: Vec<DesignRef>,
}

impl TraceabilityMatrix {
    pub fn build(requirements: &[Requirement], designs: &[Design]) -> Self {
        let names: BTreeMap<DesignId, &str> = designs
            .iter()
            .filter_map(|d| d.id.map(|id| (id, d.name.as_str())))
            .collect();

        let mut coverage = Coverage {
            total: requirements.len(),
            ..Coverage::default()
        };

        let rows = requirements
            .iter()
            .map(|req| {
                let linked: Vec<DesignRef> = req
                    .design_ids
                    .iter()
                    .map(|id| DesignRef {
                        id: *id,
                        name: names.get(id).map(|n| n.to_string()).unwrap_or_default(),
                    })
                    .collect();

                if linked.is_empty() {
                    coverage.uncovered.push(req.id.clone());
                } else {
                    coverage.covered += 1;
                }

                MatrixRow {
                    requirement_id: req.id.clone(),
                    title: req.title.clone(),
                    status: req.status,
                    designs: linked,
                }
            })
            .collect();

        let orphan_designs = designs
            .iter()
            .filter(|d| d.requirement_ids.is_empty())
            .filter_map(|d| {
                d.id.map(|id| DesignRef {
                    id,
                    name: d.name.clone(),
                })
            })
            .collect();

        Self {
            rows,
            coverage,
            orphan_designs,
        }
    }
}

fn write_pretty_json<T: Serialize>(value: &T, output_path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {:?}", parent))?;
        }
    }

    fs::write(output_path, json)
        .with_context(|| format!("Failed to write export to {:?}", output_path))?;
    Ok(())
}

/// Writes the full dataset as pretty-printed JSON
pub fn export_snapshot_to_json(snapshot: &Snapshot, output_path: &Path) -> Result<()> {
    write_pretty_json(snapshot, output_path)?;
    log::info!(
        "Exported {} requirement(s) and {} design(s) to {}",
        snapshot.requirements.len(),
        snapshot.designs.len(),
        output_path.display()
    );
    Ok(())
}

/// Writes the traceability matrix as pretty-printed JSON
pub fn export_matrix_to_json(matrix: &TraceabilityMatrix, output_path: &Path) -> Result<()> {
    write_pretty_json(matrix, output_path)?;
    log::info!(
        "Exported traceability matrix ({}/{} covered) to {}",
        matrix.coverage.covered,
        matrix.coverage.total,
        output_path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DesignStatus, DesignType, Priority};
    use chrono::Utc;
    use std::collections::BTreeSet;
    use tempfile::tempdir;

    fn requirement(id: &str, title: &str, design_ids: &[DesignId]) -> Requirement {
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
            design_ids: design_ids.iter().copied().collect(),
            created_at: now,
            updated_at: now,
        }
    }

    fn design(id: DesignId, name: &str, requirement_ids: &[&str]) -> Design {
        let now = Utc::now();
        Design {
            id: Some(id),
            name: name.to_string(),
            description: "body".to_string(),
            design_type: DesignType::Component,
            status: DesignStatus::Draft,
            requirement_ids: requirement_ids.iter().map(|s| s.to_string()).collect(),
            created_at: now,
            updated_at: now,
        }
    }

    fn sample() -> (Vec<Requirement>, Vec<Design>) {
        (
            vec![
                requirement("REQ-001", "Login flow", &[1, 2]),
                requirement("REQ-002", "Logout flow", &[]),
                requirement("REQ-003", "Audit trail", &[2]),
            ],
            vec![
                design(1, "Login page", &["REQ-001"]),
                design(2, "Session store", &["REQ-001", "REQ-003"]),
                design(3, "Unused widget", &[]),
            ],
        )
    }

    #[test]
    fn test_matrix_rows_and_coverage() {
        let (requirements, designs) = sample();
        let matrix = TraceabilityMatrix::build(&requirements, &designs);

        assert_eq!(matrix.rows.len(), 3);
        assert_eq!(
            matrix.rows[0].designs,
            vec![
                DesignRef {
                    id: 1,
                    name: "Login page".to_string()
                },
                DesignRef {
                    id: 2,
                    name: "Session store".to_string()
                },
            ]
        );
        assert_eq!(matrix.coverage.total, 3);
        assert_eq!(matrix.coverage.covered, 2);
        assert_eq!(matrix.coverage.uncovered, vec!["REQ-002".to_string()]);
        assert_eq!(matrix.orphan_designs.len(), 1);
        assert_eq!(matrix.orphan_designs[0].id, 3);
    }

    #[test]
    fn test_empty_matrix() {
        let matrix = TraceabilityMatrix::build(&[], &[]);
        assert!(matrix.rows.is_empty());
        assert_eq!(matrix.coverage.percent(), 0.0);
    }

    #[test]
    fn test_coverage_percent() {
        let coverage = Coverage {
            total: 4,
            covered: 3,
            uncovered: vec!["REQ-004".to_string()],
        };
        assert_eq!(coverage.percent(), 75.0);
    }

    #[test]
    fn test_export_snapshot_to_json() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("out").join("snapshot.json");
        let (requirements, designs) = sample();
        let snapshot = Snapshot::new(requirements, designs);

        export_snapshot_to_json(&snapshot, &path)?;

        let loaded: Snapshot = serde_json::from_str(&fs::read_to_string(&path)?)?;
        assert_eq!(loaded, snapshot);
        Ok(())
    }

    #[test]
    fn test_export_matrix_to_json() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("matrix.json");
        let (requirements, designs) = sample();

        export_matrix_to_json(&TraceabilityMatrix::build(&requirements, &designs), &path)?;

        let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path)?)?;
        assert_eq!(value["coverage"]["covered"], 2);
        assert_eq!(value["rows"][0]["requirement_id"], "REQ-001");
        assert_eq!(value["orphan_designs"][0]["name"], "Unused widget");
        Ok(())
    }

    #[test]
    fn test_dangling_design_reference_has_empty_name() {
        let requirements = vec![requirement("REQ-001", "Login", &[9])];
        let matrix = TraceabilityMatrix::build(&requirements, &[]);
        assert_eq!(matrix.rows[0].designs[0].name, "");
        assert_eq!(BTreeSet::from([9]), requirements[0].design_ids);
    }
}
