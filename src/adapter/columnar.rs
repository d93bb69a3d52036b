//! Value adapter for columnar / document stores.

use serde_json::Value;

use crate::error::DbResult;
use crate::model::FieldKind;
use crate::value::WireValue;

use super::{BackendFamily, DecodeFailure, ValueAdapter, decode_wire, encode_scalar};

/// Adapter for the columnar family.
///
/// JSON values are serialized to UTF-8 bytes of the JSON text, matching
/// drivers that expect blob-typed JSON columns. Booleans stay native.
#[derive(Debug, Clone, Copy, Default)]
pub struct ColumnarAdapter;

impl ValueAdapter for ColumnarAdapter {
    fn family(&self) -> BackendFamily {
        BackendFamily::Columnar
    }

    fn encode(&self, value: &Value) -> DbResult<WireValue> {
        match value {
            Value::Object(_) | Value::Array(_) => Ok(WireValue::Bytes(serde_json::to_vec(value)?)),
            Value::Bool(b) => Ok(WireValue::Bool(*b)),
            other => encode_scalar(other),
        }
    }

    fn decode(&self, kind: FieldKind, wire: &WireValue) -> Result<Option<Value>, DecodeFailure> {
        decode_wire(kind, wire)
    }
}
