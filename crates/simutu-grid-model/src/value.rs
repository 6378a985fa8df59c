// SPDX-License-Identifier: Apache-2.0

use crate::error::GridError;
use crate::field::FieldName;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

/// A logical record: field name -> typed value. What the CRUD layer and
/// bulk-import tooling exchange with this core; physical slot arrays
/// never cross the API boundary.
pub type Record = BTreeMap<FieldName, FieldValue>;

/// One logical field value. Select codes and email addresses travel as
/// `Text`; currency amounts as `Number` with two-decimal storage
/// semantics.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Number(f64),
    Date(NaiveDate),
}

impl FieldValue {
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Self::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// Converts a JSON scalar from the REST boundary. Objects, arrays,
    /// booleans and null have no logical field representation.
    pub fn from_json(field: &FieldName, value: &serde_json::Value) -> Result<Self, GridError> {
        match value {
            serde_json::Value::String(s) => Ok(Self::Text(s.clone())),
            serde_json::Value::Number(n) => n.as_f64().map(Self::Number).ok_or_else(|| {
                GridError::validation(field.as_str(), format!("number {n} is not representable"))
            }),
            other => Err(GridError::validation(
                field.as_str(),
                format!("unsupported JSON value {other}"),
            )),
        }
    }

    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Text(s) => serde_json::Value::String(s.clone()),
            Self::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Self::Date(d) => serde_json::Value::String(d.format("%Y-%m-%d").to_string()),
        }
    }
}

impl Display for FieldValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Number(n) => write!(f, "{n}"),
            Self::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

/// Builds a [`Record`] from a JSON object, parsing field names and
/// converting scalar values.
pub fn record_from_json(object: &serde_json::Map<String, serde_json::Value>) -> Result<Record, GridError> {
    let mut record = Record::new();
    for (key, value) in object {
        let name = FieldName::parse(key)?;
        let converted = FieldValue::from_json(&name, value)?;
        record.insert(name, converted);
    }
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_scalars_convert_both_ways() {
        let name = FieldName::parse("tahun").expect("name");
        let v = FieldValue::from_json(&name, &serde_json::json!(2024)).expect("number");
        assert_eq!(v, FieldValue::Number(2024.0));
        assert_eq!(v.to_json(), serde_json::json!(2024.0));

        let v = FieldValue::from_json(&name, &serde_json::json!("abc")).expect("text");
        assert_eq!(v.as_text(), Some("abc"));

        assert!(FieldValue::from_json(&name, &serde_json::json!(true)).is_err());
        assert!(FieldValue::from_json(&name, &serde_json::json!(["x"])).is_err());
    }

    #[test]
    fn dates_render_iso() {
        let d = NaiveDate::from_ymd_opt(2024, 3, 15).expect("date");
        assert_eq!(FieldValue::Date(d).to_string(), "2024-03-15");
        assert_eq!(FieldValue::Date(d).to_json(), serde_json::json!("2024-03-15"));
    }

    #[test]
    fn record_from_json_parses_names() {
        let obj = serde_json::json!({"nama_dosen": "A", "tahun": 2024});
        let record = record_from_json(obj.as_object().expect("object")).expect("record");
        assert_eq!(record.len(), 2);

        let bad = serde_json::json!({"Nama Dosen": "A"});
        assert!(record_from_json(bad.as_object().expect("object")).is_err());
    }
}
