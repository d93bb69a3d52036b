//! Wire values and detached raw rows.
//!
//! [`WireValue`] is the narrow contract between the core and a store client:
//! every backend translates its native column values into this enum and back.
//! [`RawRow`] is the store's row representation after that translation. Both
//! own all of their data, so a row handed back from a query is already
//! detached from the connection that produced it and stays usable after the
//! connection cycle ends.

use chrono::{DateTime, Utc};
use serde_json::Value;

/// A single column value in the store's wire representation.
#[derive(Debug, Clone, PartialEq)]
pub enum WireValue {
    /// SQL NULL / unset column.
    Null,
    /// Native boolean, for backends that have one.
    Bool(bool),
    /// Signed integer.
    Integer(i64),
    /// Floating point number.
    Real(f64),
    /// Text column.
    Text(String),
    /// Binary column.
    Bytes(Vec<u8>),
    /// Store-native timestamp.
    Timestamp(DateTime<Utc>),
    /// Already-parsed JSON structure, for backends that return one
    /// (e.g. JSONB columns).
    Json(Value),
}

impl WireValue {
    /// Whether this value is the absent/NULL marker.
    pub fn is_null(&self) -> bool {
        matches!(self, WireValue::Null)
    }
}

/// One raw store row: physical column names paired with wire values.
///
/// Column order is preserved as produced by the backend. The row is ephemeral
/// by convention: it is materialized into an entity and dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRow {
    columns: Vec<(String, WireValue)>,
}

impl RawRow {
    /// Creates an empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a column value.
    pub fn push(&mut self, column: impl Into<String>, value: WireValue) {
        self.columns.push((column.into(), value));
    }

    /// Replaces the value of the named column, appending it when absent.
    pub fn set(&mut self, column: &str, value: WireValue) {
        match self.columns.iter_mut().find(|(name, _)| name == column) {
            Some((_, slot)) => *slot = value,
            None => self.columns.push((column.to_string(), value)),
        }
    }

    /// Returns the value of the named column, if present.
    pub fn get(&self, column: &str) -> Option<&WireValue> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// Iterates over (column, value) pairs in row order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &WireValue)> {
        self.columns
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }

    /// Number of columns in the row.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Whether the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl FromIterator<(String, WireValue)> for RawRow {
    fn from_iter<I: IntoIterator<Item = (String, WireValue)>>(iter: I) -> Self {
        Self {
            columns: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for RawRow {
    type Item = (String, WireValue);
    type IntoIter = std::vec::IntoIter<(String, WireValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.columns.into_iter()
    }
}
