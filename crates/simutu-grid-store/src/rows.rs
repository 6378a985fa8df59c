// SPDX-License-Identifier: Apache-2.0

use crate::guard;
use crate::registry;
use crate::schema::slot_column_list;
use chrono::Utc;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Transaction};
use simutu_grid_codec::{decode, DecodedRecord};
use simutu_grid_model::{
    ColumnMapping, GridError, GridResult, ItemId, Record, RowId, Slot, SlotArray, SubmissionId,
    SLOT_POOL_SIZE,
};

/// One persisted row with its decoded logical record. Physical slots
/// never leave this module.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRow {
    pub id: RowId,
    pub submission_id: SubmissionId,
    pub row_number: u32,
    pub record: DecodedRecord,
    pub metadata: Option<serde_json::Value>,
}

/// Links a submission to its owning checklist item. Idempotent for the
/// same item; re-registering under a different item is refused.
pub fn register_submission(
    conn: &Connection,
    submission: SubmissionId,
    item: ItemId,
) -> GridResult<()> {
    conn.execute(
        "INSERT INTO submissions (id, item_id) VALUES (?1, ?2)
         ON CONFLICT(id) DO NOTHING",
        params![submission.get(), item.get()],
    )
    .map_err(|e| GridError::Storage(e.to_string()))?;

    let owner = item_of_submission(conn, submission)?;
    if owner != item {
        return Err(GridError::validation(
            "submission_id",
            format!("submission {submission} already belongs to item {owner}"),
        ));
    }
    Ok(())
}

/// Owning checklist item of a submission.
pub fn item_of_submission(conn: &Connection, submission: SubmissionId) -> GridResult<ItemId> {
    conn.query_row(
        "SELECT item_id FROM submissions WHERE id = ?1",
        params![submission.get()],
        |row| row.get::<_, i64>(0),
    )
    .optional()
    .map_err(|e| GridError::Storage(e.to_string()))?
    .map(ItemId::new)
    .ok_or_else(|| {
        GridError::validation("submission_id", format!("submission {submission} is not registered"))
    })
}

/// Encodes and persists one row, assigning the next row number
/// (max + 1 over all rows including tombstones, so restores never
/// collide with later allocations).
pub fn create_row(
    conn: &mut Connection,
    submission: SubmissionId,
    record: &Record,
) -> GridResult<StoredRow> {
    let tx = conn
        .transaction()
        .map_err(|e| GridError::Storage(e.to_string()))?;
    let mappings = mappings_for_submission(&tx, submission)?;
    let row = insert_row(&tx, &mappings, submission, next_row_number(&tx, submission)?, record)?;
    tx.commit().map_err(|e| GridError::Storage(e.to_string()))?;
    tracing::debug!(
        submission = submission.get(),
        row = row.id.get(),
        number = row.row_number,
        "row created"
    );
    Ok(row)
}

/// Encodes and persists a batch of rows with consecutive numbering, in
/// one transaction. The first invalid record aborts the batch; nothing
/// is persisted.
pub fn bulk_create(
    conn: &mut Connection,
    submission: SubmissionId,
    records: &[Record],
) -> GridResult<Vec<StoredRow>> {
    let tx = conn
        .transaction()
        .map_err(|e| GridError::Storage(e.to_string()))?;
    let mappings = mappings_for_submission(&tx, submission)?;

    let mut number = next_row_number(&tx, submission)?;
    let mut created = Vec::with_capacity(records.len());
    for record in records {
        created.push(insert_row(&tx, &mappings, submission, number, record)?);
        number += 1;
    }

    tx.commit().map_err(|e| GridError::Storage(e.to_string()))?;
    tracing::debug!(submission = submission.get(), rows = created.len(), "bulk create committed");
    Ok(created)
}

/// Re-encodes the record and overwrites the row's slots in place.
/// `row_number` and `submission_id` are immutable after creation.
pub fn update_row(conn: &mut Connection, row: RowId, record: &Record) -> GridResult<StoredRow> {
    let tx = conn
        .transaction()
        .map_err(|e| GridError::Storage(e.to_string()))?;

    let submission = submission_of_live_row(&tx, row)?;
    let mappings = mappings_for_submission(&tx, submission)?;
    let slots = simutu_grid_codec::encode(&mappings, record)?;

    let assignments = Slot::pool()
        .enumerate()
        .map(|(i, s)| format!("{} = ?{}", s.column_name(), i + 1))
        .collect::<Vec<_>>()
        .join(", ");
    let mut values: Vec<Value> = Slot::pool().map(|s| slot_value(&slots, s)).collect();
    values.push(Value::Integer(row.get()));
    tx.execute(
        &format!(
            "UPDATE data_rows SET {assignments} WHERE id = ?{} AND deleted_at IS NULL",
            SLOT_POOL_SIZE + 1
        ),
        params_from_iter(values.iter()),
    )
    .map_err(|e| GridError::Storage(e.to_string()))?;

    let stored = read_row(&tx, &mappings, row)?;
    tx.commit().map_err(|e| GridError::Storage(e.to_string()))?;
    tracing::debug!(row = row.get(), "row updated");
    Ok(stored)
}

/// Soft-deletes a row. Tombstoned rows disappear from listings but are
/// retained for the audit trail and can be restored.
pub fn delete_row(conn: &mut Connection, row: RowId) -> GridResult<()> {
    let affected = conn
        .execute(
            "UPDATE data_rows SET deleted_at = ?1 WHERE id = ?2 AND deleted_at IS NULL",
            params![Utc::now().to_rfc3339(), row.get()],
        )
        .map_err(|e| GridError::Storage(e.to_string()))?;
    if affected == 0 {
        return Err(unknown_row(row));
    }
    tracing::debug!(row = row.get(), "row soft-deleted");
    Ok(())
}

/// Clears a tombstone. Fails if the row is live, unknown, or its row
/// number has been handed out again in the meantime.
pub fn restore_row(conn: &mut Connection, row: RowId) -> GridResult<StoredRow> {
    let tx = conn
        .transaction()
        .map_err(|e| GridError::Storage(e.to_string()))?;

    let found: Option<(i64, i64)> = tx
        .query_row(
            "SELECT submission_id, row_number FROM data_rows
             WHERE id = ?1 AND deleted_at IS NOT NULL",
            params![row.get()],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .optional()
        .map_err(|e| GridError::Storage(e.to_string()))?;
    let (submission_raw, number) = found.ok_or_else(|| {
        GridError::validation("row_id", format!("row {row} is not a deleted row"))
    })?;
    let submission = SubmissionId::new(submission_raw);

    let conflict: i64 = tx
        .query_row(
            "SELECT COUNT(*) FROM data_rows
             WHERE submission_id = ?1 AND row_number = ?2 AND deleted_at IS NULL",
            params![submission_raw, number],
            |r| r.get(0),
        )
        .map_err(|e| GridError::Storage(e.to_string()))?;
    if conflict > 0 {
        return Err(GridError::validation(
            "row_number",
            format!("row number {number} of submission {submission} was reassigned"),
        ));
    }

    tx.execute(
        "UPDATE data_rows SET deleted_at = NULL WHERE id = ?1",
        params![row.get()],
    )
    .map_err(|e| GridError::Storage(e.to_string()))?;

    let mappings = mappings_for_submission(&tx, submission)?;
    let stored = read_row(&tx, &mappings, row)?;
    tx.commit().map_err(|e| GridError::Storage(e.to_string()))?;
    tracing::debug!(row = row.get(), "row restored");
    Ok(stored)
}

/// One live row with its decoded record.
pub fn get_row(conn: &Connection, row: RowId) -> GridResult<StoredRow> {
    let submission = submission_of_live_row(conn, row)?;
    let item = item_of_submission(conn, submission)?;
    let mappings = registry::get_mappings(conn, item)?;
    read_row(conn, &mappings, row)
}

/// Live rows of a submission ordered by row number, decoded under the
/// item's current mapping set. Corrupt stored values surface as
/// per-field markers on the affected rows; the listing itself never
/// fails on them.
pub fn list_rows(conn: &Connection, submission: SubmissionId) -> GridResult<Vec<StoredRow>> {
    let item = item_of_submission(conn, submission)?;
    let mappings = registry::get_mappings(conn, item)?;

    let mut stmt = conn
        .prepare_cached(&format!(
            "SELECT id, submission_id, row_number, metadata, {}
             FROM data_rows WHERE submission_id = ?1 AND deleted_at IS NULL
             ORDER BY row_number",
            slot_column_list()
        ))
        .map_err(|e| GridError::Storage(e.to_string()))?;
    let mapped = stmt
        .query_map(params![submission.get()], |r| raw_row_from_sql(r))
        .map_err(|e| GridError::Storage(e.to_string()))?;

    let mut rows = Vec::new();
    for raw in mapped {
        let raw = raw.map_err(|e| GridError::Storage(e.to_string()))?;
        rows.push(raw.into_stored(&mappings)?);
    }
    Ok(rows)
}

/// Number of live rows in a submission.
pub fn row_count(conn: &Connection, submission: SubmissionId) -> GridResult<u64> {
    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM data_rows WHERE submission_id = ?1 AND deleted_at IS NULL",
            params![submission.get()],
            |r| r.get(0),
        )
        .map_err(|e| GridError::Storage(e.to_string()))?;
    Ok(count as u64)
}

/// Replaces the open metadata side-channel of a live row. Not governed
/// by the column mapping.
pub fn set_row_metadata(
    conn: &Connection,
    row: RowId,
    metadata: Option<&serde_json::Value>,
) -> GridResult<()> {
    let serialized = metadata
        .map(|v| serde_json::to_string(v).map_err(|e| GridError::Storage(e.to_string())))
        .transpose()?;
    let affected = conn
        .execute(
            "UPDATE data_rows SET metadata = ?1 WHERE id = ?2 AND deleted_at IS NULL",
            params![serialized, row.get()],
        )
        .map_err(|e| GridError::Storage(e.to_string()))?;
    if affected == 0 {
        return Err(unknown_row(row));
    }
    Ok(())
}

fn unknown_row(row: RowId) -> GridError {
    GridError::validation("row_id", format!("row {row} does not exist or is deleted"))
}

/// Registry lookup plus the configured-state gate for row operations.
fn mappings_for_submission(
    conn: &Connection,
    submission: SubmissionId,
) -> GridResult<Vec<ColumnMapping>> {
    let item = item_of_submission(conn, submission)?;
    guard::ensure_configured(conn, item)?;
    registry::get_mappings(conn, item)
}

fn submission_of_live_row(conn: &Connection, row: RowId) -> GridResult<SubmissionId> {
    conn.query_row(
        "SELECT submission_id FROM data_rows WHERE id = ?1 AND deleted_at IS NULL",
        params![row.get()],
        |r| r.get::<_, i64>(0),
    )
    .optional()
    .map_err(|e| GridError::Storage(e.to_string()))?
    .map(SubmissionId::new)
    .ok_or_else(|| unknown_row(row))
}

fn next_row_number(conn: &Connection, submission: SubmissionId) -> GridResult<u32> {
    let max: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(row_number), 0) FROM data_rows WHERE submission_id = ?1",
            params![submission.get()],
            |r| r.get(0),
        )
        .map_err(|e| GridError::Storage(e.to_string()))?;
    Ok(max as u32 + 1)
}

fn insert_row(
    tx: &Transaction<'_>,
    mappings: &[ColumnMapping],
    submission: SubmissionId,
    number: u32,
    record: &Record,
) -> GridResult<StoredRow> {
    let slots = simutu_grid_codec::encode(mappings, record)?;

    let placeholders = (1..=SLOT_POOL_SIZE + 2)
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ");
    let mut values: Vec<Value> = vec![
        Value::Integer(submission.get()),
        Value::Integer(i64::from(number)),
    ];
    values.extend(Slot::pool().map(|s| slot_value(&slots, s)));

    tx.execute(
        &format!(
            "INSERT INTO data_rows (submission_id, row_number, {})
             VALUES ({placeholders})",
            slot_column_list()
        ),
        params_from_iter(values.iter()),
    )
    .map_err(|e| GridError::Storage(e.to_string()))?;

    let id = RowId::new(tx.last_insert_rowid());
    Ok(StoredRow {
        id,
        submission_id: submission,
        row_number: number,
        record: decode(mappings, &slots),
        metadata: None,
    })
}

fn slot_value(slots: &SlotArray, slot: Slot) -> Value {
    match slots.get(slot) {
        Some(text) => Value::Text(text.to_string()),
        None => Value::Null,
    }
}

struct RawRow {
    id: i64,
    submission_id: i64,
    row_number: i64,
    metadata: Option<String>,
    slots: SlotArray,
}

impl RawRow {
    fn into_stored(self, mappings: &[ColumnMapping]) -> GridResult<StoredRow> {
        let metadata = self
            .metadata
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
            .map_err(|e| GridError::Storage(e.to_string()))?;
        Ok(StoredRow {
            id: RowId::new(self.id),
            submission_id: SubmissionId::new(self.submission_id),
            row_number: self.row_number as u32,
            record: decode(mappings, &self.slots),
            metadata,
        })
    }
}

fn raw_row_from_sql(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRow> {
    let mut slots = SlotArray::new();
    for (i, slot) in Slot::pool().enumerate() {
        slots.set(slot, row.get::<_, Option<String>>(4 + i)?);
    }
    Ok(RawRow {
        id: row.get(0)?,
        submission_id: row.get(1)?,
        row_number: row.get(2)?,
        metadata: row.get(3)?,
        slots,
    })
}

fn read_row(conn: &Connection, mappings: &[ColumnMapping], row: RowId) -> GridResult<StoredRow> {
    let raw = conn
        .query_row(
            &format!(
                "SELECT id, submission_id, row_number, metadata, {}
                 FROM data_rows WHERE id = ?1",
                slot_column_list()
            ),
            params![row.get()],
            raw_row_from_sql,
        )
        .optional()
        .map_err(|e| GridError::Storage(e.to_string()))?
        .ok_or_else(|| unknown_row(row))?;
    raw.into_stored(mappings)
}
