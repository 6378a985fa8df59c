// SPDX-License-Identifier: Apache-2.0

use crate::ids::ItemId;
use crate::slot::Slot;
use std::fmt::{Display, Formatter};

pub type GridResult<T> = Result<T, GridError>;

/// Error taxonomy of the tabular capture core. Every variant is
/// distinguishable by the caller so the CRUD layer can render per-field
/// form errors versus hard failures.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum GridError {
    /// Setup attempted for a field name already mapped on the item.
    /// Re-setup requires an explicit clear first.
    DuplicateField { item: ItemId, field: String },
    /// More fields requested than the physical slot pool supports.
    SlotExhausted { item: ItemId, requested: usize },
    /// Destructive mapping change refused while dependent rows hold data.
    SchemaLocked {
        item: ItemId,
        reason: String,
        occupied_rows: u64,
    },
    /// Row operation attempted on an item with no mapping set.
    NotConfigured { item: ItemId },
    /// Required field missing, or a value failed its type/range/option
    /// check on encode.
    Validation { field: String, reason: String },
    /// Record carries a field with no mapping (closed-world encoding).
    UnknownField { field: String },
    /// Stored text fails to parse under its declared type on decode.
    /// Indicates a write that bypassed validation.
    CorruptValue {
        slot: Slot,
        raw: String,
        reason: String,
    },
    /// Backend storage failure.
    Storage(String),
}

impl GridError {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn storage(err: impl Display) -> Self {
        Self::Storage(err.to_string())
    }
}

impl Display for GridError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateField { item, field } => {
                write!(f, "field '{field}' is already mapped for item {item}")
            }
            Self::SlotExhausted { item, requested } => {
                write!(
                    f,
                    "item {item} requests {requested} fields, exceeding the {} physical slots",
                    crate::slot::SLOT_POOL_SIZE
                )
            }
            Self::SchemaLocked {
                item,
                reason,
                occupied_rows,
            } => {
                write!(
                    f,
                    "schema locked for item {item}: {reason} ({occupied_rows} row(s) hold data)"
                )
            }
            Self::NotConfigured { item } => {
                write!(f, "item {item} has no column mappings configured")
            }
            Self::Validation { field, reason } => write!(f, "field '{field}': {reason}"),
            Self::UnknownField { field } => {
                write!(f, "field '{field}' has no column mapping")
            }
            Self::CorruptValue { slot, raw, reason } => {
                write!(f, "slot {slot} holds corrupt value '{raw}': {reason}")
            }
            Self::Storage(msg) => write!(f, "storage error: {msg}"),
        }
    }
}

impl std::error::Error for GridError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_offending_field() {
        let err = GridError::validation("tahun", "value 1999 is below minimum 2020");
        assert_eq!(err.to_string(), "field 'tahun': value 1999 is below minimum 2020");

        let err = GridError::UnknownField {
            field: "nidn".to_string(),
        };
        assert!(err.to_string().contains("nidn"));
    }
}
