//! Shared fixtures: a feature-flag style schema exercising every field kind
//! and both reserved-name columns.

#![allow(dead_code)]

use serde::{Deserialize, Serialize};
use serde_json::Value;

use dbcheck::model::{Entity, FieldDef, FieldKind, ModelSchema};

/// Main test entity. The physical table uses the reserved column names
/// `global` and `metadata`; the entity speaks `is_global` and
/// `metadata_column`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub comment: Option<String>,
    pub is_global: bool,
    #[serde(default)]
    pub metadata_column: Option<Value>,
    #[serde(default)]
    pub settings: Option<Value>,
    #[serde(default)]
    pub created_at: Option<String>,
}

static FEATURE: ModelSchema = ModelSchema {
    entity: "Feature",
    table: "feature",
    fields: &[
        FieldDef::optional("id", FieldKind::Scalar),
        FieldDef::required("name", FieldKind::Scalar),
        FieldDef::optional("comment", FieldKind::Scalar),
        FieldDef::required("is_global", FieldKind::Bool),
        FieldDef::optional("metadata_column", FieldKind::JsonObject),
        FieldDef::optional("settings", FieldKind::JsonArray),
        FieldDef::optional("created_at", FieldKind::Timestamp),
    ],
};

impl Entity for Feature {
    fn schema() -> &'static ModelSchema {
        &FEATURE
    }
}

impl Feature {
    pub fn named(name: &str) -> Self {
        Self {
            id: None,
            name: name.to_string(),
            comment: None,
            is_global: false,
            metadata_column: None,
            settings: None,
            created_at: None,
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn global(mut self) -> Self {
        self.is_global = true;
        self
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata_column = Some(metadata);
        self
    }

    pub fn with_settings(mut self, settings: Value) -> Self {
        self.settings = Some(settings);
        self
    }
}

/// Child entity for cascade tests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureFlag {
    #[serde(default)]
    pub id: Option<i64>,
    pub feature_id: i64,
    pub flag: String,
}

static FEATURE_FLAG: ModelSchema = ModelSchema {
    entity: "FeatureFlag",
    table: "feature_flag",
    fields: &[
        FieldDef::optional("id", FieldKind::Scalar),
        FieldDef::required("feature_id", FieldKind::Scalar),
        FieldDef::required("flag", FieldKind::Scalar),
    ],
};

impl Entity for FeatureFlag {
    fn schema() -> &'static ModelSchema {
        &FEATURE_FLAG
    }
}

/// Entity whose columns are all server-generated, for default-only inserts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Heartbeat {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub created_at: Option<String>,
}

static HEARTBEAT: ModelSchema = ModelSchema {
    entity: "Heartbeat",
    table: "heartbeat",
    fields: &[
        FieldDef::optional("id", FieldKind::Scalar),
        FieldDef::optional("created_at", FieldKind::Timestamp),
    ],
};

impl Entity for Heartbeat {
    fn schema() -> &'static ModelSchema {
        &HEARTBEAT
    }
}

/// Schema for the SQLite suite. `name` is unique so mid-batch constraint
/// violations are easy to provoke.
pub const SQLITE_SCHEMA: &str = r#"
CREATE TABLE feature (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    comment TEXT,
    "global" BOOLEAN NOT NULL DEFAULT 0,
    metadata TEXT,
    settings TEXT,
    created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE feature_flag (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    feature_id INTEGER NOT NULL REFERENCES feature(id) ON DELETE CASCADE,
    flag TEXT NOT NULL
);

CREATE TABLE heartbeat (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#;
