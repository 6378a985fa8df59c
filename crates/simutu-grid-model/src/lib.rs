// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]
//! Domain model SSOT for simutu's dynamic tabular capture.
//!
//! A checklist item ("butir") owns an ordered set of [`ColumnMapping`]s that
//! bind logical, typed fields onto a fixed pool of physical text slots
//! (`c1`..`c30`). Submissions ("pengisian") own rows whose physical storage
//! is a [`SlotArray`]; logical access always goes through the codec crate.

mod error;
mod field;
mod ids;
mod mapping;
mod slot;
mod value;

pub use error::{GridError, GridResult};
pub use field::{FieldConfig, FieldName, FieldType, FIELD_NAME_MAX_LEN};
pub use ids::{ItemId, RowId, SubmissionId};
pub use mapping::{ColumnMapping, FieldDef, MappingPatch};
pub use slot::{Slot, SlotArray, SLOT_POOL_SIZE};
pub use value::{record_from_json, FieldValue, Record};

pub const CRATE_NAME: &str = "simutu-grid-model";
