// SPDX-License-Identifier: Apache-2.0

use rusqlite::{params, Connection};
use simutu_grid_model::{GridError, GridResult, ItemId, Slot};

/// Number of live rows across the item's submissions holding a non-null
/// value in the given slot. The registry consults this before approving
/// slot or type changes: stored text is never reinterpreted blindly.
pub fn slot_occupancy(conn: &Connection, item: ItemId, slot: Slot) -> GridResult<u64> {
    // Column name comes from a validated Slot, never from caller input.
    let sql = format!(
        "SELECT COUNT(*) FROM data_rows d
         JOIN submissions s ON s.id = d.submission_id
         WHERE s.item_id = ?1 AND d.deleted_at IS NULL AND d.{} IS NOT NULL",
        slot.column_name()
    );
    let count: i64 = conn
        .query_row(&sql, params![item.get()], |row| row.get(0))
        .map_err(|e| GridError::Storage(e.to_string()))?;
    Ok(count as u64)
}

/// Number of live rows across all of the item's submissions.
pub fn live_row_count(conn: &Connection, item: ItemId) -> GridResult<u64> {
    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM data_rows d
             JOIN submissions s ON s.id = d.submission_id
             WHERE s.item_id = ?1 AND d.deleted_at IS NULL",
            params![item.get()],
            |row| row.get(0),
        )
        .map_err(|e| GridError::Storage(e.to_string()))?;
    Ok(count as u64)
}

/// Row operations require a configured item (at least one mapping).
pub(crate) fn ensure_configured(conn: &Connection, item: ItemId) -> GridResult<()> {
    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM column_mappings WHERE item_id = ?1",
            params![item.get()],
            |row| row.get(0),
        )
        .map_err(|e| GridError::Storage(e.to_string()))?;
    if count == 0 {
        return Err(GridError::NotConfigured { item });
    }
    Ok(())
}
