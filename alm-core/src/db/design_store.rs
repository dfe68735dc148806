//! SQLite store for designs

use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::collections::BTreeSet;

use super::links;
use super::traits::{DesignCriteria, DesignRepository};
use super::{parse_label, parse_timestamp, Database};
use crate::error::{Result, StorageContext};
use crate::models::{Design, DesignId};

const DESIGN_COLUMNS: &str = "id, name, description, type, status, created_at, updated_at";

/// Design persistence backed by a [`Database`]
#[derive(Debug, Clone)]
pub struct SqliteDesignStore {
    db: Database,
}

impl SqliteDesignStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn row_to_design(row: &Row<'_>) -> rusqlite::Result<Design> {
        let design_type: String = row.get(3)?;
        let status: String = row.get(4)?;
        let created_at: String = row.get(5)?;
        let updated_at: String = row.get(6)?;

        Ok(Design {
            id: Some(row.get(0)?),
            name: row.get(1)?,
            description: row.get(2)?,
            design_type: parse_label(3, &design_type)?,
            status: parse_label(4, &status)?,
            requirement_ids: BTreeSet::new(),
            created_at: parse_timestamp(5, &created_at)?,
            updated_at: parse_timestamp(6, &updated_at)?,
        })
    }

    fn with_links(conn: &Connection, mut design: Design) -> Result<Design> {
        if let Some(id) = design.id {
            design.requirement_ids = links::requirements_for_design(conn, id)?;
        }
        Ok(design)
    }
}

impl DesignRepository for SqliteDesignStore {
    fn create(&self, design: &Design) -> Result<Design> {
        let mut conn = self.db.connect()?;
        let tx = conn.transaction().storage_context("Failed to create design")?;

        tx.execute(
            "INSERT INTO designs (name, description, type, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                design.name,
                design.description,
                design.design_type.as_str(),
                design.status.as_str(),
                design.created_at.to_rfc3339(),
                design.updated_at.to_rfc3339(),
            ],
        )
        .storage_context("Failed to create design")?;
        let id = tx.last_insert_rowid();

        links::replace_design_links(&tx, id, &design.requirement_ids)?;

        tx.commit().storage_context("Failed to create design")?;
        log::debug!(
            "Inserted design {} with {} link(s)",
            id,
            design.requirement_ids.len()
        );

        let mut created = design.clone();
        created.id = Some(id);
        Ok(created)
    }

    fn read(&self, id: DesignId) -> Result<Option<Design>> {
        // row and links come from one read snapshot
        let mut conn = self.db.connect()?;
        let tx = conn.transaction().storage_context("Failed to read design")?;
        let row = tx
            .query_row(
                &format!("SELECT {} FROM designs WHERE id = ?1", DESIGN_COLUMNS),
                params![id],
                Self::row_to_design,
            )
            .optional()
            .storage_context("Failed to read design")?;

        let found = match row {
            Some(design) => Some(Self::with_links(&tx, design)?),
            None => None,
        };
        tx.commit().storage_context("Failed to read design")?;
        Ok(found)
    }

    fn update(&self, design: &Design) -> Result<bool> {
        let Some(id) = design.id else {
            return Ok(false);
        };

        let mut conn = self.db.connect()?;
        let tx = conn.transaction().storage_context("Failed to update design")?;

        let changed = tx
            .execute(
                "UPDATE designs
                 SET name = ?2, description = ?3, type = ?4, status = ?5, updated_at = ?6
                 WHERE id = ?1",
                params![
                    id,
                    design.name,
                    design.description,
                    design.design_type.as_str(),
                    design.status.as_str(),
                    design.updated_at.to_rfc3339(),
                ],
            )
            .storage_context("Failed to update design")?;

        if changed == 0 {
            return Ok(false);
        }

        links::replace_design_links(&tx, id, &design.requirement_ids)?;

        tx.commit().storage_context("Failed to update design")?;
        log::debug!("Updated design {}", id);
        Ok(true)
    }

    fn delete(&self, id: DesignId) -> Result<bool> {
        let mut conn = self.db.connect()?;
        let tx = conn.transaction().storage_context("Failed to delete design")?;

        let unlinked = links::clear_design_links(&tx, id)?;
        tx.execute("DELETE FROM designs WHERE id = ?1", params![id])
            .storage_context("Failed to delete design")?;

        tx.commit().storage_context("Failed to delete design")?;
        log::debug!("Deleted design {} ({} link(s) removed)", id, unlinked);
        Ok(true)
    }

    fn find_by_criteria(&self, criteria: &DesignCriteria) -> Result<Vec<Design>> {
        let mut conditions = Vec::new();
        let mut values: Vec<&str> = Vec::new();

        if let Some(design_type) = criteria.design_type {
            conditions.push("type = ?");
            values.push(design_type.as_str());
        }
        if let Some(status) = criteria.status {
            conditions.push("status = ?");
            values.push(status.as_str());
        }

        let mut sql = format!("SELECT {} FROM designs", DESIGN_COLUMNS);
        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }
        sql.push_str(" ORDER BY id");

        let mut conn = self.db.connect()?;
        let tx = conn.transaction().storage_context("Failed to fetch designs")?;
        let found = {
            let mut stmt = tx.prepare(&sql).storage_context("Failed to fetch designs")?;
            let rows = stmt
                .query_map(params_from_iter(values.iter()), Self::row_to_design)
                .storage_context("Failed to fetch designs")?
                .collect::<rusqlite::Result<Vec<_>>>()
                .storage_context("Failed to fetch designs")?;

            rows.into_iter()
                .map(|design| Self::with_links(&tx, design))
                .collect::<Result<Vec<_>>>()?
        };
        tx.commit().storage_context("Failed to fetch designs")?;
        Ok(found)
    }
}
