// SPDX-License-Identifier: Apache-2.0

use crate::error::GridError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

pub const FIELD_NAME_MAX_LEN: usize = 64;

/// Stable logical identifier of a mapped field (e.g. `nama_dosen`).
/// Snake_case, bounded, unique per checklist item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
#[non_exhaustive]
pub struct FieldName(String);

impl FieldName {
    pub fn parse(input: &str) -> Result<Self, GridError> {
        let s = input.trim();
        if s.is_empty() {
            return Err(GridError::validation(
                "field_name",
                "field name must not be empty",
            ));
        }
        if s.len() > FIELD_NAME_MAX_LEN {
            return Err(GridError::validation(
                "field_name",
                format!("field name exceeds max length {FIELD_NAME_MAX_LEN}"),
            ));
        }
        if !s
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        {
            return Err(GridError::validation(
                "field_name",
                format!("field name must match [a-z0-9_]+ in snake_case, got '{s}'"),
            ));
        }
        if !s.starts_with(|c: char| c.is_ascii_lowercase()) {
            return Err(GridError::validation(
                "field_name",
                format!("field name must start with a letter, got '{s}'"),
            ));
        }
        if s.ends_with('_') || s.contains("__") {
            return Err(GridError::validation(
                "field_name",
                "field name must not end with '_' or contain '__'",
            ));
        }
        Ok(Self(s.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl Display for FieldName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Closed enumeration of logical field types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Text,
    Number,
    Currency,
    Email,
    Date,
    Select,
}

impl FieldType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Number => "number",
            Self::Currency => "currency",
            Self::Email => "email",
            Self::Date => "date",
            Self::Select => "select",
        }
    }

    pub fn parse(input: &str) -> Result<Self, GridError> {
        match input {
            "text" => Ok(Self::Text),
            "number" => Ok(Self::Number),
            "currency" => Ok(Self::Currency),
            "email" => Ok(Self::Email),
            "date" => Ok(Self::Date),
            "select" => Ok(Self::Select),
            other => Err(GridError::validation(
                "field_type",
                format!("unknown field type '{other}'"),
            )),
        }
    }

    /// True for types whose stored text must parse numerically.
    #[must_use]
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Number | Self::Currency)
    }
}

impl Display for FieldType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Type-specific constraints. Serialized as JSON next to the mapping.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    /// Select options, code -> display label.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub options: BTreeMap<String, String>,
}

impl FieldConfig {
    /// Checks the config against the field type it is attached to.
    pub fn validate_for(&self, field_type: FieldType) -> Result<(), GridError> {
        if let (Some(min), Some(max)) = (self.min, self.max) {
            if min > max {
                return Err(GridError::validation(
                    "field_config",
                    format!("min {min} exceeds max {max}"),
                ));
            }
        }
        if (self.min.is_some() || self.max.is_some()) && !field_type.is_numeric() {
            return Err(GridError::validation(
                "field_config",
                format!("min/max bounds are only valid for numeric types, not {field_type}"),
            ));
        }
        match field_type {
            FieldType::Select if self.options.is_empty() => Err(GridError::validation(
                "field_config",
                "select fields require at least one option",
            )),
            _ if field_type != FieldType::Select && !self.options.is_empty() => {
                Err(GridError::validation(
                    "field_config",
                    format!("options are only valid for select fields, not {field_type}"),
                ))
            }
            _ => Ok(()),
        }
    }
}
