//! Row/entity boundary translation.
//!
//! [`materialize`] turns one raw store row into a populated entity: physical
//! column names go through the field mapper, values go through the family's
//! value adapter, and the resulting logical map is handed to the entity's
//! serde definition. [`to_row`] is the inverse, used on the write path.
//!
//! Both directions produce fully owned data; nothing in the output refers
//! back to the store session that produced the input.

use serde_json::Map;

use crate::adapter::ValueAdapter;
use crate::error::{DbResult, MaterializeError};
use crate::mapper::FieldMapper;
use crate::model::Entity;
use crate::value::{RawRow, WireValue};

/// Materializes a raw row into an entity.
///
/// With `filter_none` set, columns that decode to "no value" and physical
/// columns the model does not declare are dropped, so the entity's own
/// defaults and required-field validation govern presence. Without it an
/// undeclared column is an error.
pub fn materialize<E: Entity>(
    row: &RawRow,
    mapper: &FieldMapper,
    adapter: &dyn ValueAdapter,
    filter_none: bool,
) -> DbResult<E> {
    let schema = E::schema();
    let mut values = Map::new();

    for (column, wire) in row.iter() {
        let logical = mapper.to_logical(column);
        let Some(field) = schema.field(logical) else {
            if filter_none {
                continue;
            }
            return Err(MaterializeError::UnmappedColumn {
                entity: schema.entity.to_string(),
                column: column.to_string(),
            }
            .into());
        };

        let decoded = adapter.decode(field.kind, wire).map_err(|e| {
            MaterializeError::Decode {
                field: field.logical.to_string(),
                message: e.to_string(),
            }
        })?;

        match decoded {
            Some(value) => {
                values.insert(field.logical.to_string(), value);
            }
            None if filter_none => {}
            None => {
                values.insert(field.logical.to_string(), serde_json::Value::Null);
            }
        }
    }

    E::from_values(values)
}

/// Encodes an entity into a raw row for the write path.
///
/// Logical names are remapped to physical identifiers and values encoded
/// with the family adapter. Fields whose logical value is null are omitted
/// so server-side column defaults apply.
pub fn to_row<E: Entity>(
    entity: &E,
    mapper: &FieldMapper,
    adapter: &dyn ValueAdapter,
) -> DbResult<RawRow> {
    let schema = E::schema();
    let values = entity.to_values()?;
    let mut row = RawRow::new();

    for field in schema.fields {
        let Some(value) = values.get(field.logical) else {
            continue;
        };
        if value.is_null() {
            continue;
        }
        let wire = adapter.encode(value)?;
        if !matches!(wire, WireValue::Null) {
            row.push(mapper.to_physical(field.logical), wire);
        }
    }

    Ok(row)
}
