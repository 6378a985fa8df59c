// SPDX-License-Identifier: Apache-2.0

use crate::guard;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};
use simutu_grid_model::{
    ColumnMapping, FieldConfig, FieldDef, FieldName, FieldType, GridError, GridResult, ItemId,
    MappingPatch, Slot, SLOT_POOL_SIZE,
};
use std::collections::BTreeSet;

/// Maps field definitions onto physical slots for one checklist item.
///
/// Slots are allocated in definition order from the lowest unused slot;
/// display orders continue after the current maximum, so `setup_mappings`
/// may extend an already-configured item with new fields. Re-defining an
/// existing field name fails with `DuplicateField`: re-setup requires an
/// explicit [`clear_mappings`] first. All checks run before any write.
pub fn setup_mappings(
    conn: &mut Connection,
    item: ItemId,
    defs: &[FieldDef],
) -> GridResult<Vec<ColumnMapping>> {
    if defs.is_empty() {
        return Err(GridError::validation(
            "field_defs",
            "at least one field definition is required",
        ));
    }
    let mut seen = BTreeSet::new();
    for def in defs {
        def.config.validate_for(def.field_type)?;
        if !seen.insert(def.name.clone()) {
            return Err(GridError::DuplicateField {
                item,
                field: def.name.as_str().to_string(),
            });
        }
    }

    let tx = conn
        .transaction()
        .map_err(|e| GridError::Storage(e.to_string()))?;

    let existing = get_mappings(&tx, item)?;
    for def in defs {
        if existing.iter().any(|m| m.field_name == def.name) {
            return Err(GridError::DuplicateField {
                item,
                field: def.name.as_str().to_string(),
            });
        }
    }

    let used: BTreeSet<Slot> = existing.iter().map(|m| m.slot).collect();
    let mut free = Slot::pool().filter(|s| !used.contains(s));
    if existing.len() + defs.len() > SLOT_POOL_SIZE {
        return Err(GridError::SlotExhausted {
            item,
            requested: existing.len() + defs.len(),
        });
    }
    let mut next_order = existing.iter().map(|m| m.display_order).max().unwrap_or(0) + 1;

    let mut created = Vec::with_capacity(defs.len());
    for def in defs {
        let slot = free.next().ok_or(GridError::SlotExhausted {
            item,
            requested: existing.len() + defs.len(),
        })?;
        let config_json = serde_json::to_string(&def.config)
            .map_err(|e| GridError::Storage(e.to_string()))?;
        tx.execute(
            "INSERT INTO column_mappings (
               item_id, field_name, field_label, slot, field_type, field_config,
               display_order, width, is_required, help_text, placeholder
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                item.get(),
                def.name.as_str(),
                def.label,
                i64::from(slot.number()),
                def.field_type.as_str(),
                config_json,
                next_order,
                def.width,
                def.required,
                def.help_text,
                def.placeholder,
            ],
        )
        .map_err(|e| GridError::Storage(e.to_string()))?;

        created.push(ColumnMapping {
            item_id: item,
            field_name: def.name.clone(),
            field_label: def.label.clone(),
            slot,
            field_type: def.field_type,
            field_config: def.config.clone(),
            display_order: next_order,
            width: def.width.clone(),
            is_required: def.required,
            help_text: def.help_text.clone(),
            placeholder: def.placeholder.clone(),
        });
        next_order += 1;
    }

    tx.commit().map_err(|e| GridError::Storage(e.to_string()))?;
    tracing::debug!(item = item.get(), fields = defs.len(), "mappings configured");
    Ok(created)
}

/// All mappings of an item, ordered by display order. One query, so the
/// codec always sees a consistent snapshot of the set.
pub fn get_mappings(conn: &Connection, item: ItemId) -> GridResult<Vec<ColumnMapping>> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT item_id, field_name, field_label, slot, field_type, field_config,
                    display_order, width, is_required, help_text, placeholder
             FROM column_mappings WHERE item_id = ?1 ORDER BY display_order",
        )
        .map_err(|e| GridError::Storage(e.to_string()))?;
    let mapped = stmt
        .query_map(params![item.get()], mapping_from_sql_row)
        .map_err(|e| GridError::Storage(e.to_string()))?;
    mapped
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| GridError::Storage(e.to_string()))
}

/// True when the item has at least one mapping.
pub fn is_configured(conn: &Connection, item: ItemId) -> GridResult<bool> {
    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM column_mappings WHERE item_id = ?1",
            params![item.get()],
            |row| row.get(0),
        )
        .map_err(|e| GridError::Storage(e.to_string()))?;
    Ok(count > 0)
}

/// Applies a partial update to one mapping.
///
/// Label, config, required, display order and presentation metadata are
/// freely editable. Slot and type changes are destructive while live
/// rows hold data in the affected slot: they fail with `SchemaLocked`
/// unless `force` is set, in which case the stored text is left as-is
/// and conversion is the caller's responsibility.
pub fn update_mapping(
    conn: &mut Connection,
    item: ItemId,
    field: &FieldName,
    patch: &MappingPatch,
    force: bool,
) -> GridResult<ColumnMapping> {
    let tx = conn
        .transaction()
        .map_err(|e| GridError::Storage(e.to_string()))?;

    let current = load_mapping(&tx, item, field)?.ok_or_else(|| GridError::UnknownField {
        field: field.as_str().to_string(),
    })?;

    if patch.is_destructive_against(&current) {
        let occupied = guard::slot_occupancy(&tx, item, current.slot)?;
        if occupied > 0 && !force {
            return Err(GridError::SchemaLocked {
                item,
                reason: format!(
                    "slot or type change of field '{field}' over occupied slot {}",
                    current.slot
                ),
                occupied_rows: occupied,
            });
        }
    }

    let slot = patch.slot.unwrap_or(current.slot);
    if slot != current.slot {
        let taken: i64 = tx
            .query_row(
                "SELECT COUNT(*) FROM column_mappings WHERE item_id = ?1 AND slot = ?2",
                params![item.get(), i64::from(slot.number())],
                |row| row.get(0),
            )
            .map_err(|e| GridError::Storage(e.to_string()))?;
        if taken > 0 {
            return Err(GridError::validation(
                "slot",
                format!("slot {slot} is already mapped for item {item}"),
            ));
        }
    }

    let display_order = patch.display_order.unwrap_or(current.display_order);
    if display_order != current.display_order {
        let taken: i64 = tx
            .query_row(
                "SELECT COUNT(*) FROM column_mappings
                 WHERE item_id = ?1 AND display_order = ?2 AND field_name <> ?3",
                params![item.get(), display_order, field.as_str()],
                |row| row.get(0),
            )
            .map_err(|e| GridError::Storage(e.to_string()))?;
        if taken > 0 {
            return Err(GridError::validation(
                "display_order",
                format!("display order {display_order} is already used for item {item}"),
            ));
        }
    }

    let field_type = patch.field_type.unwrap_or(current.field_type);
    let field_config = patch
        .field_config
        .clone()
        .unwrap_or_else(|| current.field_config.clone());
    field_config.validate_for(field_type)?;

    let updated = ColumnMapping {
        item_id: item,
        field_name: current.field_name.clone(),
        field_label: patch
            .field_label
            .clone()
            .unwrap_or_else(|| current.field_label.clone()),
        slot,
        field_type,
        field_config,
        display_order,
        // Empty string clears a presentation field, None leaves it.
        width: apply_text_patch(&patch.width, &current.width),
        is_required: patch.is_required.unwrap_or(current.is_required),
        help_text: apply_text_patch(&patch.help_text, &current.help_text),
        placeholder: apply_text_patch(&patch.placeholder, &current.placeholder),
    };

    let config_json = serde_json::to_string(&updated.field_config)
        .map_err(|e| GridError::Storage(e.to_string()))?;
    tx.execute(
        "UPDATE column_mappings SET
           field_label = ?1, slot = ?2, field_type = ?3, field_config = ?4,
           display_order = ?5, width = ?6, is_required = ?7, help_text = ?8, placeholder = ?9
         WHERE item_id = ?10 AND field_name = ?11",
        params![
            updated.field_label,
            i64::from(updated.slot.number()),
            updated.field_type.as_str(),
            config_json,
            updated.display_order,
            updated.width,
            updated.is_required,
            updated.help_text,
            updated.placeholder,
            item.get(),
            field.as_str(),
        ],
    )
    .map_err(|e| GridError::Storage(e.to_string()))?;

    tx.commit().map_err(|e| GridError::Storage(e.to_string()))?;
    tracing::debug!(item = item.get(), field = field.as_str(), forced = force, "mapping updated");
    Ok(updated)
}

/// Deletes one mapping. Underlying slot values are left in place and
/// become orphaned: ignored on decode from now on, recoverable by
/// mapping the slot again.
pub fn remove_mapping(conn: &mut Connection, item: ItemId, field: &FieldName) -> GridResult<()> {
    let affected = conn
        .execute(
            "DELETE FROM column_mappings WHERE item_id = ?1 AND field_name = ?2",
            params![item.get(), field.as_str()],
        )
        .map_err(|e| GridError::Storage(e.to_string()))?;
    if affected == 0 {
        return Err(GridError::UnknownField {
            field: field.as_str().to_string(),
        });
    }
    tracing::debug!(item = item.get(), field = field.as_str(), "mapping removed");
    Ok(())
}

/// The explicit clear required before a full re-setup. Refused while the
/// item's submissions still hold live rows, unless forced.
pub fn clear_mappings(conn: &mut Connection, item: ItemId, force: bool) -> GridResult<usize> {
    let tx = conn
        .transaction()
        .map_err(|e| GridError::Storage(e.to_string()))?;

    let live = guard::live_row_count(&tx, item)?;
    if live > 0 && !force {
        return Err(GridError::SchemaLocked {
            item,
            reason: "clear of all mappings while rows hold data".to_string(),
            occupied_rows: live,
        });
    }

    let removed = tx
        .execute(
            "DELETE FROM column_mappings WHERE item_id = ?1",
            params![item.get()],
        )
        .map_err(|e| GridError::Storage(e.to_string()))?;
    tx.commit().map_err(|e| GridError::Storage(e.to_string()))?;
    tracing::debug!(item = item.get(), removed, forced = force, "mappings cleared");
    Ok(removed)
}

fn apply_text_patch(patch: &Option<String>, current: &Option<String>) -> Option<String> {
    match patch {
        None => current.clone(),
        Some(s) if s.is_empty() => None,
        Some(s) => Some(s.clone()),
    }
}

fn load_mapping(
    conn: &Connection,
    item: ItemId,
    field: &FieldName,
) -> GridResult<Option<ColumnMapping>> {
    conn.query_row(
        "SELECT item_id, field_name, field_label, slot, field_type, field_config,
                display_order, width, is_required, help_text, placeholder
         FROM column_mappings WHERE item_id = ?1 AND field_name = ?2",
        params![item.get(), field.as_str()],
        mapping_from_sql_row,
    )
    .optional()
    .map_err(|e| GridError::Storage(e.to_string()))
}

fn mapping_from_sql_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ColumnMapping> {
    let field_name = FieldName::parse(&row.get::<_, String>(1)?)
        .map_err(|e| conversion_err(1, e))?;
    let slot = Slot::new(row.get::<_, i64>(3)? as u8).map_err(|e| conversion_err(3, e))?;
    let field_type =
        FieldType::parse(&row.get::<_, String>(4)?).map_err(|e| conversion_err(4, e))?;
    let field_config: FieldConfig = serde_json::from_str(&row.get::<_, String>(5)?)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e)))?;

    Ok(ColumnMapping {
        item_id: ItemId::new(row.get::<_, i64>(0)?),
        field_name,
        field_label: row.get(2)?,
        slot,
        field_type,
        field_config,
        display_order: row.get(6)?,
        width: row.get(7)?,
        is_required: row.get(8)?,
        help_text: row.get(9)?,
        placeholder: row.get(10)?,
    })
}

fn conversion_err(idx: usize, err: GridError) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}
