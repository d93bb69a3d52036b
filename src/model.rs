//! Static model metadata and the entity contract.
//!
//! Every store entity is described by a [`ModelSchema`]: the display name,
//! the physical table (or column family) it maps to, and a static field
//! registry. The registry is built once per type definition, so field lookups
//! during materialization are checked against declared metadata instead of
//! discovered reflectively at runtime.
//!
//! Logical snapshots are plain JSON maps. An [`Entity`] is any serde-backed
//! struct paired with a schema; serde's deserialization doubles as the
//! required-field validation (a missing non-defaulted field fails to
//! populate).

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{DbResult, MaterializeError};

/// The value category of a declared field.
///
/// The kind decides which value-adapter rule applies when crossing the wire
/// boundary. `Scalar` covers everything that needs no adaptation (integers,
/// floats, plain text).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Plain scalar value, passed through unadapted.
    Scalar,
    /// Boolean; stored as 0/1 on backends without a native boolean type.
    Bool,
    /// JSON object, stored in the backend's serialized JSON form.
    JsonObject,
    /// JSON array, stored in the backend's serialized JSON form.
    JsonArray,
    /// Store-native timestamp; opaque pass-through at this layer.
    Timestamp,
}

/// One declared field on a model.
///
/// Only the logical name lives here. Physical names are derived through the
/// [`FieldMapper`](crate::mapper::FieldMapper) so reserved-word remapping
/// stays in one place.
#[derive(Debug, Clone, Copy)]
pub struct FieldDef {
    /// The model-facing attribute name.
    pub logical: &'static str,
    /// The value category of the field.
    pub kind: FieldKind,
    /// Whether the entity requires a value for this field.
    pub required: bool,
}

impl FieldDef {
    /// A required field of the given kind.
    pub const fn required(logical: &'static str, kind: FieldKind) -> Self {
        Self {
            logical,
            kind,
            required: true,
        }
    }

    /// An optional field of the given kind.
    pub const fn optional(logical: &'static str, kind: FieldKind) -> Self {
        Self {
            logical,
            kind,
            required: false,
        }
    }
}

/// Static per-type field registry.
#[derive(Debug)]
pub struct ModelSchema {
    /// Display name used in diagnostics ("Feature", "Account").
    pub entity: &'static str,
    /// The physical table / column-family identifier.
    pub table: &'static str,
    /// Declared fields, in definition order.
    pub fields: &'static [FieldDef],
}

impl ModelSchema {
    /// Looks up a field by its logical name.
    pub fn field(&self, logical: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.logical == logical)
    }
}

/// A typed store entity.
///
/// Implementors pair a serde-serializable struct with a static
/// [`ModelSchema`]. The default `from_values`/`to_values` go through
/// `serde_json`, which is also where required-field validation happens.
///
/// # Example
///
/// ```
/// use serde::{Deserialize, Serialize};
/// use dbcheck::model::{Entity, FieldDef, FieldKind, ModelSchema};
///
/// #[derive(Debug, Serialize, Deserialize)]
/// struct Account {
///     id: i64,
///     name: String,
///     #[serde(default)]
///     comment: Option<String>,
/// }
///
/// static ACCOUNT: ModelSchema = ModelSchema {
///     entity: "Account",
///     table: "account",
///     fields: &[
///         FieldDef::required("id", FieldKind::Scalar),
///         FieldDef::required("name", FieldKind::Scalar),
///         FieldDef::optional("comment", FieldKind::Scalar),
///     ],
/// };
///
/// impl Entity for Account {
///     fn schema() -> &'static ModelSchema {
///         &ACCOUNT
///     }
/// }
/// ```
pub trait Entity: Serialize + DeserializeOwned + Send + Sync {
    /// The static schema for this entity type.
    fn schema() -> &'static ModelSchema;

    /// Populates an entity from a logical value map.
    fn from_values(values: Map<String, Value>) -> DbResult<Self> {
        serde_json::from_value(Value::Object(values)).map_err(|e| {
            MaterializeError::Entity {
                entity: Self::schema().entity.to_string(),
                message: e.to_string(),
            }
            .into()
        })
    }

    /// Returns the logical snapshot of this entity as a value map.
    fn to_values(&self) -> DbResult<Map<String, Value>> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            other => Err(MaterializeError::Entity {
                entity: Self::schema().entity.to_string(),
                message: format!("entity serialized to non-object value: {other}"),
            }
            .into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        id: i64,
        name: String,
        #[serde(default)]
        comment: Option<String>,
    }

    static SAMPLE: ModelSchema = ModelSchema {
        entity: "Sample",
        table: "sample",
        fields: &[
            FieldDef::required("id", FieldKind::Scalar),
            FieldDef::required("name", FieldKind::Scalar),
            FieldDef::optional("comment", FieldKind::Scalar),
        ],
    };

    impl Entity for Sample {
        fn schema() -> &'static ModelSchema {
            &SAMPLE
        }
    }

    #[test]
    fn test_schema_field_lookup() {
        assert_eq!(SAMPLE.field("id").unwrap().kind, FieldKind::Scalar);
        assert!(SAMPLE.field("missing").is_none());
        assert!(!SAMPLE.field("comment").unwrap().required);
    }

    #[test]
    fn test_from_values_populates_entity() {
        let mut values = Map::new();
        values.insert("id".to_string(), json!(7));
        values.insert("name".to_string(), json!("a"));

        let sample = Sample::from_values(values).unwrap();
        assert_eq!(
            sample,
            Sample {
                id: 7,
                name: "a".to_string(),
                comment: None,
            }
        );
    }

    #[test]
    fn test_from_values_missing_required_field_fails() {
        let mut values = Map::new();
        values.insert("id".to_string(), json!(7));

        let err = Sample::from_values(values).unwrap_err();
        assert!(err.to_string().contains("cannot populate Sample"));
    }

    #[test]
    fn test_to_values_snapshot() {
        let sample = Sample {
            id: 1,
            name: "a".to_string(),
            comment: Some("c".to_string()),
        };
        let values = sample.to_values().unwrap();
        assert_eq!(values.get("name"), Some(&json!("a")));
        assert_eq!(values.get("comment"), Some(&json!("c")));
    }
}
