// SPDX-License-Identifier: Apache-2.0

use chrono::NaiveDate;
use simutu_grid_model::{
    ColumnMapping, FieldType, FieldValue, GridError, Record, SlotArray,
};

/// Validates a logical record against the mapping set and serializes it
/// into a full slot array (unmapped slots stay `None`).
///
/// Closed world: a record field with no mapping fails with
/// [`GridError::UnknownField`] regardless of its value, so nothing is
/// ever silently dropped into unmapped slots.
pub fn encode(mappings: &[ColumnMapping], record: &Record) -> Result<SlotArray, GridError> {
    for name in record.keys() {
        if !mappings.iter().any(|m| m.field_name == *name) {
            return Err(GridError::UnknownField {
                field: name.as_str().to_string(),
            });
        }
    }

    let mut slots = SlotArray::new();
    for mapping in mappings {
        let value = record.get(&mapping.field_name);
        let stored = encode_field(mapping, value)?;
        slots.set(mapping.slot, stored);
    }
    Ok(slots)
}

fn encode_field(
    mapping: &ColumnMapping,
    value: Option<&FieldValue>,
) -> Result<Option<String>, GridError> {
    let field = mapping.field_name.as_str();

    let Some(value) = value else {
        if mapping.is_required {
            return Err(GridError::validation(field, "required field is missing"));
        }
        return Ok(None);
    };

    match mapping.field_type {
        FieldType::Text | FieldType::Email => {
            let text = require_text(field, value)?;
            let trimmed = text.trim();
            if trimmed.is_empty() {
                if mapping.is_required {
                    return Err(GridError::validation(field, "required field is empty"));
                }
                // Blank optional text normalizes to absent.
                return Ok(None);
            }
            Ok(Some(text.to_string()))
        }
        FieldType::Select => {
            let code = require_text(field, value)?;
            if code.trim().is_empty() {
                if mapping.is_required {
                    return Err(GridError::validation(field, "required field is empty"));
                }
                return Ok(None);
            }
            if !mapping.field_config.options.contains_key(code) {
                return Err(GridError::validation(
                    field,
                    format!("'{code}' is not one of the configured options"),
                ));
            }
            Ok(Some(code.to_string()))
        }
        FieldType::Number => {
            let number = require_number(field, value)?;
            check_bounds(mapping, field, number)?;
            Ok(Some(format_number(number)))
        }
        FieldType::Currency => {
            let amount = require_number(field, value)?;
            check_bounds(mapping, field, amount)?;
            Ok(Some(format!("{amount:.2}")))
        }
        FieldType::Date => {
            let date = require_date(field, value)?;
            Ok(Some(date.format("%Y-%m-%d").to_string()))
        }
    }
}

fn require_text<'a>(field: &str, value: &'a FieldValue) -> Result<&'a str, GridError> {
    value
        .as_text()
        .ok_or_else(|| GridError::validation(field, format!("expected text, got {value}")))
}

/// Numbers may arrive as text from form inputs; accept text that parses.
fn require_number(field: &str, value: &FieldValue) -> Result<f64, GridError> {
    match value {
        FieldValue::Number(n) if n.is_finite() => Ok(*n),
        FieldValue::Number(n) => Err(GridError::validation(
            field,
            format!("value {n} is not a finite number"),
        )),
        FieldValue::Text(s) => s.trim().parse::<f64>().map_err(|_| {
            GridError::validation(field, format!("value '{s}' is not numeric"))
        }),
        FieldValue::Date(_) => Err(GridError::validation(field, "expected a number, got a date")),
    }
}

/// Dates may arrive as ISO text from form inputs; accept text that parses.
fn require_date(field: &str, value: &FieldValue) -> Result<NaiveDate, GridError> {
    match value {
        FieldValue::Date(d) => Ok(*d),
        FieldValue::Text(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| {
            GridError::validation(field, format!("value '{s}' is not an ISO date (YYYY-MM-DD)"))
        }),
        FieldValue::Number(_) => Err(GridError::validation(field, "expected a date, got a number")),
    }
}

fn check_bounds(mapping: &ColumnMapping, field: &str, value: f64) -> Result<(), GridError> {
    if let Some(min) = mapping.field_config.min {
        if value < min {
            return Err(GridError::validation(
                field,
                format!("value {value} is below minimum {min}"),
            ));
        }
    }
    if let Some(max) = mapping.field_config.max {
        if value > max {
            return Err(GridError::validation(
                field,
                format!("value {value} is above maximum {max}"),
            ));
        }
    }
    Ok(())
}

/// Integral numbers store without a trailing `.0` so the stored text
/// matches what a user typed.
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use simutu_grid_model::{FieldConfig, FieldDef, FieldName, ItemId, Slot};
    use std::collections::BTreeMap;

    fn mapping(name: &str, slot: u8, field_type: FieldType, required: bool) -> ColumnMapping {
        let def = FieldDef::new(name, name, field_type).expect("def");
        ColumnMapping {
            item_id: ItemId::new(1),
            field_name: def.name,
            field_label: def.label,
            slot: Slot::new(slot).expect("slot"),
            field_type,
            field_config: FieldConfig::default(),
            display_order: u32::from(slot),
            width: None,
            is_required: required,
            help_text: None,
            placeholder: None,
        }
    }

    fn record(entries: &[(&str, FieldValue)]) -> Record {
        entries
            .iter()
            .map(|(k, v)| (FieldName::parse(k).expect("name"), v.clone()))
            .collect()
    }

    #[test]
    fn unknown_field_is_rejected_before_any_slot_is_written() {
        let mappings = vec![mapping("nama", 1, FieldType::Text, true)];
        let rec = record(&[
            ("nama", FieldValue::Text("A".to_string())),
            ("nidn", FieldValue::Text("123".to_string())),
        ]);
        let err = encode(&mappings, &rec).expect_err("unknown field");
        assert_eq!(
            err,
            GridError::UnknownField {
                field: "nidn".to_string()
            }
        );
    }

    #[test]
    fn required_field_must_be_present_and_non_empty() {
        let mappings = vec![mapping("nama", 1, FieldType::Text, true)];

        let err = encode(&mappings, &Record::new()).expect_err("missing");
        assert!(matches!(err, GridError::Validation { ref field, .. } if field == "nama"));

        let rec = record(&[("nama", FieldValue::Text("   ".to_string()))]);
        assert!(encode(&mappings, &rec).is_err());
    }

    #[test]
    fn blank_optional_text_normalizes_to_absent() {
        let mappings = vec![mapping("catatan", 4, FieldType::Text, false)];
        let rec = record(&[("catatan", FieldValue::Text(String::new()))]);
        let slots = encode(&mappings, &rec).expect("encode");
        assert!(slots.is_empty());
    }

    #[test]
    fn currency_stores_two_decimals() {
        let mappings = vec![mapping("dana", 3, FieldType::Currency, true)];
        let rec = record(&[("dana", FieldValue::Number(1500.5))]);
        let slots = encode(&mappings, &rec).expect("encode");
        assert_eq!(slots.get(Slot::new(3).expect("slot")), Some("1500.50"));
    }

    #[test]
    fn numbers_accept_numeric_text_and_keep_integral_rendering() {
        let mappings = vec![mapping("tahun", 2, FieldType::Number, true)];

        let rec = record(&[("tahun", FieldValue::Text("2024".to_string()))]);
        let slots = encode(&mappings, &rec).expect("encode");
        assert_eq!(slots.get(Slot::new(2).expect("slot")), Some("2024"));

        let rec = record(&[("tahun", FieldValue::Text("abc".to_string()))]);
        assert!(encode(&mappings, &rec).is_err());

        let rec = record(&[("tahun", FieldValue::Number(f64::NAN))]);
        assert!(encode(&mappings, &rec).is_err());
    }

    #[test]
    fn number_bounds_are_enforced() {
        let mut m = mapping("tahun", 2, FieldType::Number, true);
        m.field_config.min = Some(2020.0);
        m.field_config.max = Some(2030.0);
        let mappings = vec![m];

        let rec = record(&[("tahun", FieldValue::Number(1999.0))]);
        let err = encode(&mappings, &rec).expect_err("below min");
        assert!(matches!(err, GridError::Validation { ref field, .. } if field == "tahun"));

        let rec = record(&[("tahun", FieldValue::Number(2024.0))]);
        assert!(encode(&mappings, &rec).is_ok());
    }

    #[test]
    fn select_values_must_be_configured_options() {
        let mut m = mapping("status", 5, FieldType::Select, true);
        let mut options = BTreeMap::new();
        options.insert("aktif".to_string(), "Aktif".to_string());
        m.field_config.options = options;
        let mappings = vec![m];

        let rec = record(&[("status", FieldValue::Text("aktif".to_string()))]);
        assert!(encode(&mappings, &rec).is_ok());

        let rec = record(&[("status", FieldValue::Text("purna".to_string()))]);
        assert!(encode(&mappings, &rec).is_err());
    }

    #[test]
    fn dates_accept_iso_text_and_reject_garbage() {
        let mappings = vec![mapping("tanggal", 6, FieldType::Date, true)];

        let rec = record(&[("tanggal", FieldValue::Text("2024-03-15".to_string()))]);
        let slots = encode(&mappings, &rec).expect("encode");
        assert_eq!(slots.get(Slot::new(6).expect("slot")), Some("2024-03-15"));

        let rec = record(&[("tanggal", FieldValue::Text("15/03/2024".to_string()))]);
        assert!(encode(&mappings, &rec).is_err());
    }
}
