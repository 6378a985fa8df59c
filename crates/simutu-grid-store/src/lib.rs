// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]
//! SQLite persistence for the tabular capture core: the column mapping
//! registry, the row store and the schema evolution guard.
//!
//! Every public operation is one transaction; bulk create rolls back
//! entirely on the first invalid record. Mapping reads are a single
//! query so the codec never sees a half-updated mapping set. The
//! registry functions are the only write path to `column_mappings`.

mod guard;
mod registry;
mod rows;
mod schema;

pub use guard::{live_row_count, slot_occupancy};
pub use registry::{
    clear_mappings, get_mappings, is_configured, remove_mapping, setup_mappings, update_mapping,
};
pub use rows::{
    bulk_create, create_row, delete_row, get_row, item_of_submission, list_rows,
    register_submission, restore_row, row_count, set_row_metadata, update_row, StoredRow,
};
pub use schema::{init_schema, SCHEMA_VERSION};

pub const CRATE_NAME: &str = "simutu-grid-store";
