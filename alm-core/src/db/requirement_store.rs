//! SQLite store for requirements

use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::collections::BTreeSet;

use super::links;
use super::traits::{RequirementCriteria, RequirementRepository};
use super::{parse_label, parse_timestamp, Database};
use crate::error::{AlmError, Result, StorageContext};
use crate::models::{Requirement, RequirementId, REQUIREMENT_ID_PREFIX};

const REQUIREMENT_COLUMNS: &str = "id, title, description, status, priority, category, \
     parent_id, verification_criteria, created_at, updated_at";

/// Extracts the numeric part of "REQ-042"; `None` for any other shape
pub fn parse_requirement_sequence(id: &str) -> Option<u64> {
    let digits = id.strip_prefix(REQUIREMENT_ID_PREFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Formats a sequence number as "REQ-###", padded to at least three digits
pub fn format_requirement_id(sequence: u64) -> RequirementId {
    format!("{}{:03}", REQUIREMENT_ID_PREFIX, sequence)
}

/// Requirement persistence backed by a [`Database`]
#[derive(Debug, Clone)]
pub struct SqliteRequirementStore {
    db: Database,
}

impl SqliteRequirementStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Maps a row (in `REQUIREMENT_COLUMNS` order) without its links
    fn row_to_requirement(row: &Row<'_>) -> rusqlite::Result<Requirement> {
        let status: String = row.get(3)?;
        let priority: String = row.get(4)?;
        let created_at: String = row.get(8)?;
        let updated_at: String = row.get(9)?;

        Ok(Requirement {
            id: row.get(0)?,
            title: row.get(1)?,
            description: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
            status: parse_label(3, &status)?,
            priority: parse_label(4, &priority)?,
            category: row.get(5)?,
            parent_id: row.get(6)?,
            verification_criteria: row.get::<_, Option<String>>(7)?.unwrap_or_default(),
            design_ids: BTreeSet::new(),
            created_at: parse_timestamp(8, &created_at)?,
            updated_at: parse_timestamp(9, &updated_at)?,
        })
    }

    fn with_links(conn: &Connection, mut req: Requirement) -> Result<Requirement> {
        req.design_ids = links::designs_for_requirement(conn, &req.id)?;
        Ok(req)
    }
}

impl RequirementRepository for SqliteRequirementStore {
    fn create(&self, requirement: &Requirement) -> Result<RequirementId> {
        let mut conn = self.db.connect()?;
        let tx = conn
            .transaction()
            .storage_context("Failed to create requirement")?;

        let exists: bool = tx
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM requirements WHERE id = ?1)",
                params![requirement.id],
                |row| row.get(0),
            )
            .storage_context("Failed to create requirement")?;
        if exists {
            return Err(AlmError::Conflict {
                entity: "Requirement",
                id: requirement.id.clone(),
            });
        }

        tx.execute(
            &format!(
                "INSERT INTO requirements ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                REQUIREMENT_COLUMNS
            ),
            params![
                requirement.id,
                requirement.title,
                requirement.description,
                requirement.status.as_str(),
                requirement.priority.as_str(),
                requirement.category,
                requirement.parent_id,
                requirement.verification_criteria,
                requirement.created_at.to_rfc3339(),
                requirement.updated_at.to_rfc3339(),
            ],
        )
        .storage_context("Failed to create requirement")?;

        links::replace_requirement_links(&tx, &requirement.id, &requirement.design_ids)?;

        tx.commit().storage_context("Failed to create requirement")?;
        log::debug!(
            "Inserted requirement {} with {} link(s)",
            requirement.id,
            requirement.design_ids.len()
        );
        Ok(requirement.id.clone())
    }

    fn read(&self, id: &str) -> Result<Option<Requirement>> {
        // row and links come from one read snapshot
        let mut conn = self.db.connect()?;
        let tx = conn.transaction().storage_context("Failed to read requirement")?;
        let row = tx
            .query_row(
                &format!("SELECT {} FROM requirements WHERE id = ?1", REQUIREMENT_COLUMNS),
                params![id],
                Self::row_to_requirement,
            )
            .optional()
            .storage_context("Failed to read requirement")?;

        let found = match row {
            Some(req) => Some(Self::with_links(&tx, req)?),
            None => None,
        };
        tx.commit().storage_context("Failed to read requirement")?;
        Ok(found)
    }

    fn update(&self, requirement: &Requirement) -> Result<bool> {
        let mut conn = self.db.connect()?;
        let tx = conn
            .transaction()
            .storage_context("Failed to update requirement")?;

        let changed = tx
            .execute(
                "UPDATE requirements
                 SET title = ?2, description = ?3, status = ?4, priority = ?5,
                     category = ?6, parent_id = ?7, verification_criteria = ?8,
                     updated_at = ?9
                 WHERE id = ?1",
                params![
                    requirement.id,
                    requirement.title,
                    requirement.description,
                    requirement.status.as_str(),
                    requirement.priority.as_str(),
                    requirement.category,
                    requirement.parent_id,
                    requirement.verification_criteria,
                    requirement.updated_at.to_rfc3339(),
                ],
            )
            .storage_context("Failed to update requirement")?;

        if changed == 0 {
            return Ok(false);
        }

        links::replace_requirement_links(&tx, &requirement.id, &requirement.design_ids)?;

        tx.commit().storage_context("Failed to update requirement")?;
        log::debug!("Updated requirement {}", requirement.id);
        Ok(true)
    }

    fn delete(&self, id: &str) -> Result<bool> {
        let mut conn = self.db.connect()?;
        let tx = conn
            .transaction()
            .storage_context("Failed to delete requirement")?;

        let unlinked = links::clear_requirement_links(&tx, id)?;
        let removed = tx
            .execute("DELETE FROM requirements WHERE id = ?1", params![id])
            .storage_context("Failed to delete requirement")?;

        tx.commit().storage_context("Failed to delete requirement")?;
        log::debug!("Deleted requirement {} ({} link(s) removed)", id, unlinked);
        Ok(removed > 0)
    }

    fn find_by_criteria(&self, criteria: &RequirementCriteria) -> Result<Vec<Requirement>> {
        let mut conditions = Vec::new();
        let mut values: Vec<String> = Vec::new();

        if let Some(status) = criteria.status {
            conditions.push("status = ?");
            values.push(status.as_str().to_string());
        }
        if let Some(priority) = criteria.priority {
            conditions.push("priority = ?");
            values.push(priority.as_str().to_string());
        }
        if let Some(category) = &criteria.category {
            conditions.push("category = ?");
            values.push(category.clone());
        }
        if let Some(parent_id) = &criteria.parent_id {
            conditions.push("parent_id = ?");
            values.push(parent_id.clone());
        }

        let mut sql = format!("SELECT {} FROM requirements", REQUIREMENT_COLUMNS);
        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }
        sql.push_str(" ORDER BY id");

        let mut conn = self.db.connect()?;
        let tx = conn.transaction().storage_context("Failed to search requirements")?;
        let found = {
            let mut stmt = tx.prepare(&sql).storage_context("Failed to search requirements")?;
            let rows = stmt
                .query_map(params_from_iter(values.iter()), Self::row_to_requirement)
                .storage_context("Failed to search requirements")?
                .collect::<rusqlite::Result<Vec<_>>>()
                .storage_context("Failed to search requirements")?;

            rows.into_iter()
                .map(|req| Self::with_links(&tx, req))
                .collect::<Result<Vec<_>>>()?
        };
        tx.commit().storage_context("Failed to search requirements")?;
        Ok(found)
    }

    fn next_id(&self) -> Result<RequirementId> {
        let conn = self.db.connect()?;
        let mut stmt = conn
            .prepare("SELECT id FROM requirements WHERE id LIKE 'REQ-%'")
            .storage_context("Failed to generate ID")?;
        let highest = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .storage_context("Failed to generate ID")?
            .collect::<rusqlite::Result<Vec<_>>>()
            .storage_context("Failed to generate ID")?
            .iter()
            .filter_map(|id| parse_requirement_sequence(id))
            .max()
            .unwrap_or(0);

        Ok(format_requirement_id(highest + 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::temp_database;
    use crate::models::{Priority, RequirementStatus};
    use chrono::Utc;

    fn requirement(id: &str, title: &str) -> Requirement {
        let now = Utc::now();
        Requirement {
            id: id.to_string(),
            title: title.to_string(),
            description: format!("{} description", title),
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

    #[test]
    fn test_sequence_parsing() {
        assert_eq!(parse_requirement_sequence("REQ-001"), Some(1));
        assert_eq!(parse_requirement_sequence("REQ-1000"), Some(1000));
        assert_eq!(parse_requirement_sequence("REQ-"), None);
        assert_eq!(parse_requirement_sequence("REQ-12a"), None);
        assert_eq!(parse_requirement_sequence("req-001"), None);
        assert_eq!(format_requirement_id(1), "REQ-001");
        assert_eq!(format_requirement_id(100), "REQ-100");
        assert_eq!(format_requirement_id(1234), "REQ-1234");
    }

    #[test]
    fn test_create_and_read_round_trip() {
        let (_dir, db) = temp_database();
        let store = SqliteRequirementStore::new(db);

        let mut req = requirement("REQ-001", "Login flow");
        req.category = Some("Auth".to_string());
        req.verification_criteria = "User sees dashboard".to_string();

        assert_eq!(store.create(&req).unwrap(), "REQ-001");
        let loaded = store.read("REQ-001").unwrap().unwrap();
        assert_eq!(loaded, req);
    }

    #[test]
    fn test_read_missing_is_none() {
        let (_dir, db) = temp_database();
        let store = SqliteRequirementStore::new(db);
        assert!(store.read("REQ-404").unwrap().is_none());
    }

    #[test]
    fn test_reads_carry_links_and_release_the_connection() {
        use crate::db::{DesignRepository, SqliteDesignStore};
        use crate::models::{Design, DesignStatus, DesignType};

        let (_dir, db) = temp_database();
        let designs = SqliteDesignStore::new(db.clone());
        let store = SqliteRequirementStore::new(db);
        let now = Utc::now();
        let design = designs
            .create(&Design {
                id: None,
                name: "Gateway".to_string(),
                description: "Routes".to_string(),
                design_type: DesignType::Architecture,
                status: DesignStatus::Draft,
                requirement_ids: BTreeSet::new(),
                created_at: now,
                updated_at: now,
            })
            .unwrap();
        let design_id = design.id.unwrap();

        let mut req = requirement("REQ-001", "Linked");
        req.design_ids.insert(design_id);
        store.create(&req).unwrap();

        let read = store.read("REQ-001").unwrap().unwrap();
        let found = store.find_by_criteria(&RequirementCriteria::default()).unwrap();
        assert_eq!(read.design_ids, BTreeSet::from([design_id]));
        assert_eq!(found, vec![read]);

        // reads leave nothing open, so a following write goes through
        req.title = "Relinked".to_string();
        req.design_ids.clear();
        assert!(store.update(&req).unwrap());
        assert!(store.read("REQ-001").unwrap().unwrap().design_ids.is_empty());
        assert!(designs.read(design_id).unwrap().unwrap().requirement_ids.is_empty());
    }

    #[test]
    fn test_create_duplicate_is_conflict() {
        let (_dir, db) = temp_database();
        let store = SqliteRequirementStore::new(db);
        store.create(&requirement("REQ-001", "First")).unwrap();

        let err = store.create(&requirement("REQ-001", "Second")).unwrap_err();
        assert!(matches!(err, AlmError::Conflict { .. }));
        assert_eq!(store.read("REQ-001").unwrap().unwrap().title, "First");
    }

    #[test]
    fn test_update_missing_returns_false() {
        let (_dir, db) = temp_database();
        let store = SqliteRequirementStore::new(db);
        assert!(!store.update(&requirement("REQ-009", "Ghost")).unwrap());
    }

    #[test]
    fn test_delete() {
        let (_dir, db) = temp_database();
        let store = SqliteRequirementStore::new(db);
        store.create(&requirement("REQ-001", "Doomed")).unwrap();

        assert!(store.delete("REQ-001").unwrap());
        assert!(store.read("REQ-001").unwrap().is_none());
        assert!(!store.delete("REQ-001").unwrap());
    }

    #[test]
    fn test_deleting_parent_clears_child_reference() {
        let (_dir, db) = temp_database();
        let store = SqliteRequirementStore::new(db);
        store.create(&requirement("REQ-001", "Parent")).unwrap();
        let mut child = requirement("REQ-002", "Child");
        child.parent_id = Some("REQ-001".to_string());
        store.create(&child).unwrap();

        store.delete("REQ-001").unwrap();

        assert_eq!(store.read("REQ-002").unwrap().unwrap().parent_id, None);
    }

    #[test]
    fn test_find_by_criteria_combines_filters() {
        let (_dir, db) = temp_database();
        let store = SqliteRequirementStore::new(db);

        let mut a = requirement("REQ-001", "A");
        a.status = RequirementStatus::Approved;
        a.priority = Priority::High;
        let mut b = requirement("REQ-002", "B");
        b.status = RequirementStatus::Approved;
        let c = requirement("REQ-003", "C");
        for req in [&a, &b, &c] {
            store.create(req).unwrap();
        }

        let approved = store
            .find_by_criteria(&RequirementCriteria {
                status: Some(RequirementStatus::Approved),
                ..RequirementCriteria::default()
            })
            .unwrap();
        assert_eq!(
            approved.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(),
            vec!["REQ-001", "REQ-002"]
        );

        let approved_high = store
            .find_by_criteria(&RequirementCriteria {
                status: Some(RequirementStatus::Approved),
                priority: Some(Priority::High),
                ..RequirementCriteria::default()
            })
            .unwrap();
        assert_eq!(approved_high.len(), 1);
        assert_eq!(approved_high[0].id, "REQ-001");

        assert_eq!(store.find_all().unwrap().len(), 3);
    }

    #[test]
    fn test_next_id_sequence() {
        let (_dir, db) = temp_database();
        let store = SqliteRequirementStore::new(db);
        assert_eq!(store.next_id().unwrap(), "REQ-001");

        store.create(&requirement("REQ-099", "Ninety nine")).unwrap();
        assert_eq!(store.next_id().unwrap(), "REQ-100");

        store.create(&requirement("REQ-999", "Last three digit")).unwrap();
        store.create(&requirement("REQ-1000", "Four digits")).unwrap();
        assert_eq!(store.next_id().unwrap(), "REQ-1001");
    }

    #[test]
    fn test_next_id_ignores_non_numeric_ids() {
        let (_dir, db) = temp_database();
        let store = SqliteRequirementStore::new(db);
        store.create(&requirement("REQ-007", "Numbered")).unwrap();
        store.create(&requirement("REQ-UI-1", "Named")).unwrap();
        assert_eq!(store.next_id().unwrap(), "REQ-008");
    }

    #[test]
    fn test_corrupt_status_is_storage_error() {
        let (_dir, db) = temp_database();
        let store = SqliteRequirementStore::new(db.clone());
        store.create(&requirement("REQ-001", "Fine")).unwrap();
        db.connect()
            .unwrap()
            .execute("UPDATE requirements SET status = 'Finished'", [])
            .unwrap();

        let err = store.read("REQ-001").unwrap_err();
        assert!(err.is_storage());
    }
}
