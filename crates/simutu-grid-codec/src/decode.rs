// SPDX-License-Identifier: Apache-2.0

use chrono::NaiveDate;
use simutu_grid_model::{
    ColumnMapping, FieldName, FieldType, FieldValue, GridError, Record, Slot, SlotArray,
};
use std::collections::BTreeMap;

/// Marker for stored text that does not parse under its declared type.
#[derive(Debug, Clone, PartialEq)]
pub struct CorruptValue {
    pub slot: Slot,
    pub raw: String,
    pub reason: String,
}

/// Result of decoding one physical row under a mapping set.
///
/// Absent slots leave their field out of `values` entirely; required
/// fields that are absent are listed in `missing_required` so the caller
/// knows the record is logically incomplete without the decode failing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedRecord {
    pub values: Record,
    pub corrupt: BTreeMap<FieldName, CorruptValue>,
    pub missing_required: Vec<FieldName>,
}

impl DecodedRecord {
    /// True when every stored value parsed and no required field is
    /// missing.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.corrupt.is_empty() && self.missing_required.is_empty()
    }

    /// Hard-failure view: the first corrupt marker becomes a
    /// [`GridError::CorruptValue`]. Missing required fields are not an
    /// error here; decode tolerates logically incomplete rows.
    pub fn into_strict(self) -> Result<Record, GridError> {
        if let Some((_, c)) = self.corrupt.into_iter().next() {
            return Err(GridError::CorruptValue {
                slot: c.slot,
                raw: c.raw,
                reason: c.reason,
            });
        }
        Ok(self.values)
    }
}

/// Reconstructs the logical record from a physical slot array. Never
/// fails; see [`DecodedRecord`] for the corruption and completeness
/// policy. Slot values with no mapping (orphaned by `remove_mapping`)
/// are ignored.
pub fn decode(mappings: &[ColumnMapping], slots: &SlotArray) -> DecodedRecord {
    let mut out = DecodedRecord::default();

    for mapping in mappings {
        let Some(raw) = slots.get(mapping.slot) else {
            if mapping.is_required {
                out.missing_required.push(mapping.field_name.clone());
            }
            continue;
        };

        match decode_field(mapping.field_type, raw) {
            Ok(value) => {
                out.values.insert(mapping.field_name.clone(), value);
            }
            Err(reason) => {
                out.corrupt.insert(
                    mapping.field_name.clone(),
                    CorruptValue {
                        slot: mapping.slot,
                        raw: raw.to_string(),
                        reason,
                    },
                );
            }
        }
    }

    out
}

fn decode_field(field_type: FieldType, raw: &str) -> Result<FieldValue, String> {
    match field_type {
        // Select codes decode verbatim: options may have changed since
        // the value was written, so they are checked on encode only.
        FieldType::Text | FieldType::Email | FieldType::Select => {
            Ok(FieldValue::Text(raw.to_string()))
        }
        FieldType::Number | FieldType::Currency => raw
            .trim()
            .parse::<f64>()
            .map(FieldValue::Number)
            .map_err(|_| format!("stored text is not numeric under type {field_type}")),
        FieldType::Date => NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
            .map(FieldValue::Date)
            .map_err(|_| "stored text is not an ISO date (YYYY-MM-DD)".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use simutu_grid_model::{FieldConfig, ItemId};

    fn mapping(name: &str, slot: u8, field_type: FieldType, required: bool) -> ColumnMapping {
        ColumnMapping {
            item_id: ItemId::new(1),
            field_name: FieldName::parse(name).expect("name"),
            field_label: name.to_string(),
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

    #[test]
    fn absent_optional_fields_stay_absent() {
        let mappings = vec![
            mapping("nama", 1, FieldType::Text, true),
            mapping("catatan", 2, FieldType::Text, false),
        ];
        let mut slots = SlotArray::new();
        slots.set(Slot::new(1).expect("slot"), Some("A".to_string()));

        let decoded = decode(&mappings, &slots);
        assert!(decoded.is_complete());
        assert_eq!(decoded.values.len(), 1);
        assert!(!decoded
            .values
            .contains_key(&FieldName::parse("catatan").expect("name")));
    }

    #[test]
    fn missing_required_field_is_reported_not_fatal() {
        let mappings = vec![mapping("nama", 1, FieldType::Text, true)];
        let decoded = decode(&mappings, &SlotArray::new());
        assert!(decoded.values.is_empty());
        assert_eq!(
            decoded.missing_required,
            vec![FieldName::parse("nama").expect("name")]
        );
        // Strict view still succeeds: incompleteness is not corruption.
        assert!(decoded.into_strict().is_ok());
    }

    #[test]
    fn non_numeric_stored_text_surfaces_as_corrupt_marker() {
        let mappings = vec![mapping("tahun", 2, FieldType::Number, true)];
        let mut slots = SlotArray::new();
        slots.set(Slot::new(2).expect("slot"), Some("dua ribu".to_string()));

        let decoded = decode(&mappings, &slots);
        assert!(!decoded.is_complete());
        let marker = decoded
            .corrupt
            .get(&FieldName::parse("tahun").expect("name"))
            .expect("marker");
        assert_eq!(marker.raw, "dua ribu");

        let err = decoded.into_strict().expect_err("corrupt");
        assert!(matches!(err, GridError::CorruptValue { .. }));
    }

    #[test]
    fn invalid_stored_date_surfaces_as_corrupt_marker() {
        let mappings = vec![mapping("tanggal", 3, FieldType::Date, false)];
        let mut slots = SlotArray::new();
        slots.set(Slot::new(3).expect("slot"), Some("15/03/2024".to_string()));

        let decoded = decode(&mappings, &slots);
        assert_eq!(decoded.corrupt.len(), 1);
    }

    #[test]
    fn select_codes_decode_verbatim_even_when_unknown() {
        // The option set may have changed since the write; decode must
        // return the stored code as-is.
        let mappings = vec![mapping("status", 4, FieldType::Select, false)];
        let mut slots = SlotArray::new();
        slots.set(Slot::new(4).expect("slot"), Some("purna".to_string()));

        let decoded = decode(&mappings, &slots);
        assert!(decoded.is_complete());
        assert_eq!(
            decoded.values[&FieldName::parse("status").expect("name")],
            FieldValue::Text("purna".to_string())
        );
    }

    #[test]
    fn orphaned_slot_values_are_ignored() {
        let mappings = vec![mapping("nama", 1, FieldType::Text, false)];
        let mut slots = SlotArray::new();
        slots.set(Slot::new(1).expect("slot"), Some("A".to_string()));
        // Slot 9 once belonged to a removed mapping.
        slots.set(Slot::new(9).expect("slot"), Some("orphan".to_string()));

        let decoded = decode(&mappings, &slots);
        assert_eq!(decoded.values.len(), 1);
        assert!(decoded.is_complete());
    }
}
