//! Trace link rows
//!
//! `trace_links` is the only place a requirement/design link is recorded.
//! Both stores go through these helpers, each from its own column, so the
//! two directions cannot drift apart.

use rusqlite::{params, Connection};
use std::collections::BTreeSet;

use crate::error::{Result, StorageContext};
use crate::models::{DesignId, RequirementId};

pub(crate) fn designs_for_requirement(
    conn: &Connection,
    requirement_id: &str,
) -> Result<BTreeSet<DesignId>> {
    let mut stmt = conn
        .prepare("SELECT design_id FROM trace_links WHERE requirement_id = ?1")
        .storage_context("Failed to read trace links")?;
    let ids = stmt
        .query_map(params![requirement_id], |row| row.get::<_, DesignId>(0))
        .storage_context("Failed to read trace links")?
        .collect::<rusqlite::Result<BTreeSet<_>>>()
        .storage_context("Failed to read trace links")?;
    Ok(ids)
}

pub(crate) fn requirements_for_design(
    conn: &Connection,
    design_id: DesignId,
) -> Result<BTreeSet<RequirementId>> {
    let mut stmt = conn
        .prepare("SELECT requirement_id FROM trace_links WHERE design_id = ?1")
        .storage_context("Failed to read trace links")?;
    let ids = stmt
        .query_map(params![design_id], |row| row.get::<_, RequirementId>(0))
        .storage_context("Failed to read trace links")?
        .collect::<rusqlite::Result<BTreeSet<_>>>()
        .storage_context("Failed to read trace links")?;
    Ok(ids)
}

/// Deletes every link of `requirement_id`, then inserts one per design
pub(crate) fn replace_requirement_links(
    conn: &Connection,
    requirement_id: &str,
    design_ids: &BTreeSet<DesignId>,
) -> Result<()> {
    clear_requirement_links(conn, requirement_id)?;
    let mut stmt = conn
        .prepare("INSERT INTO trace_links (requirement_id, design_id) VALUES (?1, ?2)")
        .storage_context("Failed to write trace links")?;
    for design_id in design_ids {
        stmt.execute(params![requirement_id, design_id])
            .storage_context("Failed to write trace links")?;
    }
    Ok(())
}

/// Deletes every link of `design_id`, then inserts one per requirement
pub(crate) fn replace_design_links(
    conn: &Connection,
    design_id: DesignId,
    requirement_ids: &BTreeSet<RequirementId>,
) -> Result<()> {
    clear_design_links(conn, design_id)?;
    let mut stmt = conn
        .prepare("INSERT INTO trace_links (requirement_id, design_id) VALUES (?1, ?2)")
        .storage_context("Failed to write trace links")?;
    for requirement_id in requirement_ids {
        stmt.execute(params![requirement_id, design_id])
            .storage_context("Failed to write trace links")?;
    }
    Ok(())
}

pub(crate) fn clear_requirement_links(conn: &Connection, requirement_id: &str) -> Result<usize> {
    conn.execute(
        "DELETE FROM trace_links WHERE requirement_id = ?1",
        params![requirement_id],
    )
    .storage_context("Failed to remove trace links")
}

pub(crate) fn clear_design_links(conn: &Connection, design_id: DesignId) -> Result<usize> {
    conn.execute(
        "DELETE FROM trace_links WHERE design_id = ?1",
        params![design_id],
    )
    .storage_context("Failed to remove trace links")
}
