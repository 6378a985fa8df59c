// SPDX-License-Identifier: Apache-2.0

use rusqlite::Connection;
use simutu_grid_model::{GridError, GridResult, Slot, SLOT_POOL_SIZE};

pub const SCHEMA_VERSION: i64 = 1;

/// Comma-separated physical column list, `c1, c2, .., c30`. Shared by
/// every statement that touches the generic slot columns so the order
/// always matches [`Slot::pool`].
pub(crate) fn slot_column_list() -> String {
    Slot::pool()
        .map(Slot::column_name)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Creates the capture tables if absent.
///
/// `data_rows` carries one untyped TEXT column per pool slot; the
/// partial unique index on `(submission_id, row_number)` over live rows
/// closes the row-numbering race between concurrent writers.
pub fn init_schema(conn: &Connection) -> GridResult<()> {
    conn.execute_batch(
        "
        PRAGMA journal_mode=WAL;
        PRAGMA foreign_keys=ON;
        ",
    )
    .map_err(|e| GridError::Storage(e.to_string()))?;

    let slot_columns = Slot::pool()
        .map(|s| format!("          {} TEXT,\n", s.column_name()))
        .collect::<String>();

    conn.execute_batch(&format!(
        "
        CREATE TABLE IF NOT EXISTS submissions (
          id INTEGER PRIMARY KEY,
          item_id INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_submissions_item ON submissions(item_id);

        CREATE TABLE IF NOT EXISTS column_mappings (
          id INTEGER PRIMARY KEY,
          item_id INTEGER NOT NULL,
          field_name TEXT NOT NULL,
          field_label TEXT NOT NULL,
          slot INTEGER NOT NULL CHECK (slot BETWEEN 1 AND {pool}),
          field_type TEXT NOT NULL,
          field_config TEXT NOT NULL,
          display_order INTEGER NOT NULL,
          width TEXT,
          is_required INTEGER NOT NULL DEFAULT 0,
          help_text TEXT,
          placeholder TEXT,
          UNIQUE (item_id, field_name),
          UNIQUE (item_id, slot),
          UNIQUE (item_id, display_order)
        );

        CREATE TABLE IF NOT EXISTS data_rows (
          id INTEGER PRIMARY KEY,
          submission_id INTEGER NOT NULL REFERENCES submissions(id) ON DELETE CASCADE,
          row_number INTEGER NOT NULL,
          metadata TEXT,
          deleted_at TEXT,
{slot_columns}          CHECK (row_number >= 1)
        );
        CREATE UNIQUE INDEX IF NOT EXISTS idx_data_rows_live_row_number
          ON data_rows(submission_id, row_number) WHERE deleted_at IS NULL;
        CREATE INDEX IF NOT EXISTS idx_data_rows_submission ON data_rows(submission_id);
        ",
        pool = SLOT_POOL_SIZE,
    ))
    .map_err(|e| GridError::Storage(e.to_string()))?;

    conn.execute_batch(&format!("PRAGMA user_version={SCHEMA_VERSION};"))
        .map_err(|e| GridError::Storage(e.to_string()))?;
    Ok(())
}
