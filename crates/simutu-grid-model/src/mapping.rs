// SPDX-License-Identifier: Apache-2.0

use crate::field::{FieldConfig, FieldName, FieldType};
use crate::ids::ItemId;
use crate::slot::Slot;
use serde::{Deserialize, Serialize};

/// One logical field of a checklist item, bound to a physical slot.
///
/// Per item, `field_name`, `slot` and `display_order` are each unique;
/// the registry enforces this in code and the store backs it with SQL
/// constraints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMapping {
    pub item_id: ItemId,
    pub field_name: FieldName,
    pub field_label: String,
    pub slot: Slot,
    pub field_type: FieldType,
    pub field_config: FieldConfig,
    /// Presentation order; independent of slot numbering.
    pub display_order: u32,
    /// Presentation width hint (percentage string). Not load-bearing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<String>,
    pub is_required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
}

/// Administrator-supplied definition of one field, input to
/// `setup_mappings`. Slot and display order are allocated by the
/// registry, not chosen here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: FieldName,
    pub label: String,
    pub field_type: FieldType,
    #[serde(default)]
    pub config: FieldConfig,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
}

impl FieldDef {
    pub fn new(
        name: &str,
        label: impl Into<String>,
        field_type: FieldType,
    ) -> Result<Self, crate::error::GridError> {
        Ok(Self {
            name: FieldName::parse(name)?,
            label: label.into(),
            field_type,
            config: FieldConfig::default(),
            required: false,
            width: None,
            help_text: None,
            placeholder: None,
        })
    }
}

/// Partial update of one mapping. `None` fields are left untouched.
/// Slot and type changes are guarded while dependent data exists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MappingPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_type: Option<FieldType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_config: Option<FieldConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slot: Option<Slot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_order: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_required: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
}

impl MappingPatch {
    /// True when the patch touches the physical layout or the stored
    /// type, i.e. the changes the evolution guard must approve.
    #[must_use]
    pub fn is_destructive_against(&self, current: &ColumnMapping) -> bool {
        let type_change = self
            .field_type
            .is_some_and(|ty| ty != current.field_type);
        let slot_change = self.slot.is_some_and(|slot| slot != current.slot);
        type_change || slot_change
    }
}
