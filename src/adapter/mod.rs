//! Per-backend value adaptation.
//!
//! Each backend family has its own conventions for structured field values:
//! the relational family stores JSON as compact text and booleans as 0/1
//! integers, the columnar family stores JSON as UTF-8 bytes and keeps native
//! booleans. An adapter is a pure encode/decode pair bound to one family;
//! `decode(kind, encode(v))` returns `Some(v)` for every supported value.
//!
//! Decoding is deliberately tolerant on input shape (a JSON field accepts
//! already-parsed structures as well as serialized text), strict on output
//! (an object field must decode to an object). A NULL wire value decodes to
//! `None`: no value set, not an empty container.

mod columnar;
mod relational;

pub use columnar::ColumnarAdapter;
pub use relational::RelationalAdapter;

use serde_json::Value;
use thiserror::Error;

use crate::error::{BackendError, DbResult};
use crate::model::FieldKind;
use crate::value::WireValue;

/// A category of store with shared value-encoding conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendFamily {
    /// Classic relational store (SQL).
    Relational,
    /// Columnar / document store.
    Columnar,
}

impl BackendFamily {
    /// The adapter set for this family.
    pub fn adapter(self) -> Box<dyn ValueAdapter> {
        match self {
            BackendFamily::Relational => Box::new(RelationalAdapter),
            BackendFamily::Columnar => Box::new(ColumnarAdapter),
        }
    }
}

/// A wire value that could not be decoded for its declared field kind.
#[derive(Error, Debug)]
#[error("{0}")]
pub struct DecodeFailure(pub String);

/// Encode/decode rules for one backend family.
pub trait ValueAdapter: Send + Sync {
    /// The family this adapter serves.
    fn family(&self) -> BackendFamily;

    /// Encodes a logical value into the family's wire representation.
    ///
    /// Encoding is shape-driven: objects and arrays become the family's JSON
    /// form, booleans follow the family's boolean convention, scalars map
    /// directly.
    fn encode(&self, value: &Value) -> DbResult<WireValue>;

    /// Decodes a wire value back into a logical value.
    ///
    /// Returns `None` when the wire value is NULL/absent.
    fn decode(&self, kind: FieldKind, wire: &WireValue) -> Result<Option<Value>, DecodeFailure>;
}

/// Shared decode rules; the families differ only on the encode side.
pub(crate) fn decode_wire(
    kind: FieldKind,
    wire: &WireValue,
) -> Result<Option<Value>, DecodeFailure> {
    if wire.is_null() {
        return Ok(None);
    }

    let value = match kind {
        FieldKind::JsonObject | FieldKind::JsonArray => {
            let parsed = match wire {
                WireValue::Text(text) => serde_json::from_str(text)
                    .map_err(|e| DecodeFailure(format!("invalid JSON text: {e}")))?,
                WireValue::Bytes(bytes) => serde_json::from_slice(bytes)
                    .map_err(|e| DecodeFailure(format!("invalid JSON bytes: {e}")))?,
                WireValue::Json(value) => value.clone(),
                other => {
                    return Err(DecodeFailure(format!(
                        "expected serialized JSON, got {other:?}"
                    )));
                }
            };
            match (kind, &parsed) {
                (FieldKind::JsonObject, Value::Object(_)) => parsed,
                (FieldKind::JsonArray, Value::Array(_)) => parsed,
                _ => {
                    return Err(DecodeFailure(format!(
                        "decoded JSON has wrong shape for {kind:?}"
                    )));
                }
            }
        }
        FieldKind::Bool => match wire {
            WireValue::Bool(b) => Value::Bool(*b),
            WireValue::Integer(i) => Value::Bool(*i != 0),
            other => {
                return Err(DecodeFailure(format!(
                    "expected boolean or integer, got {other:?}"
                )));
            }
        },
        FieldKind::Timestamp => match wire {
            WireValue::Text(text) => Value::String(text.clone()),
            WireValue::Timestamp(ts) => Value::String(ts.to_rfc3339()),
            other => {
                return Err(DecodeFailure(format!("expected timestamp, got {other:?}")));
            }
        },
        FieldKind::Scalar => match wire {
            WireValue::Bool(b) => Value::Bool(*b),
            WireValue::Integer(i) => Value::from(*i),
            WireValue::Real(r) => serde_json::Number::from_f64(*r)
                .map(Value::Number)
                .ok_or_else(|| DecodeFailure(format!("non-finite real value {r}")))?,
            WireValue::Text(text) => Value::String(text.clone()),
            WireValue::Timestamp(ts) => Value::String(ts.to_rfc3339()),
            WireValue::Json(value) => value.clone(),
            WireValue::Bytes(_) => {
                return Err(DecodeFailure(
                    "binary value has no scalar representation".to_string(),
                ));
            }
            WireValue::Null => unreachable!("handled above"),
        },
    };

    Ok(Some(value))
}

/// Shared scalar encode rules for the non-structured shapes.
pub(crate) fn encode_scalar(value: &Value) -> DbResult<WireValue> {
    match value {
        Value::Null => Ok(WireValue::Null),
        Value::String(text) => Ok(WireValue::Text(text.clone())),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(WireValue::Integer(i))
            } else if let Some(r) = n.as_f64() {
                Ok(WireValue::Real(r))
            } else {
                Err(BackendError::Encode {
                    message: format!("number {n} does not fit the wire representation"),
                }
                .into())
            }
        }
        other => Err(BackendError::Encode {
            message: format!("unexpected value shape: {other}"),
        }
        .into()),
    }
}
