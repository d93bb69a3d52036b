//! Value adapter for classic relational stores.

use serde_json::Value;

use crate::error::DbResult;
use crate::model::FieldKind;
use crate::value::WireValue;

use super::{BackendFamily, DecodeFailure, ValueAdapter, decode_wire, encode_scalar};

/// Adapter for the relational family.
///
/// JSON values are serialized to compact text (no separator whitespace);
/// booleans become 0/1 integers because not every SQL dialect has a native
/// boolean column type.
#[derive(Debug, Clone, Copy, Default)]
pub struct RelationalAdapter;

impl ValueAdapter for RelationalAdapter {
    fn family(&self) -> BackendFamily {
        BackendFamily::Relational
    }

    fn encode(&self, value: &Value) -> DbResult<WireValue> {
        match value {
            Value::Object(_) | Value::Array(_) => {
                Ok(WireValue::Text(serde_json::to_string(value)?))
            }
            Value::Bool(b) => Ok(WireValue::Integer(i64::from(*b))),
            other => encode_scalar(other),
        }
    }

    fn decode(&self, kind: FieldKind, wire: &WireValue) -> Result<Option<Value>, DecodeFailure> {
        decode_wire(kind, wire)
    }
}
