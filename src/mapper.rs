//! Logical/physical field-name mapping.
//!
//! Some model attribute names collide with identifiers the store reserves
//! ("global", "metadata"). The mapper holds an explicit bidirectional table
//! of such pairs; every other name passes through unchanged. Both directions
//! are exercised: physical to logical when materializing a row, logical to
//! physical when writing a model or translating criteria.

/// The fixed reserved-word collision table: (logical, physical).
const RESERVED: &[(&str, &str)] = &[("is_global", "global"), ("metadata_column", "metadata")];

/// Bidirectional translation between logical attribute names and physical
/// column identifiers.
///
/// Round-trip invariant: `to_logical(to_physical(x)) == x` for every mapped
/// pair, and identity for any unmapped name.
#[derive(Debug, Clone)]
pub struct FieldMapper {
    pairs: Vec<(String, String)>,
}

impl FieldMapper {
    /// The standard mapper carrying the reserved-word table.
    pub fn standard() -> Self {
        Self {
            pairs: RESERVED
                .iter()
                .map(|(l, p)| (l.to_string(), p.to_string()))
                .collect(),
        }
    }

    /// A mapper with no remapping at all.
    pub fn identity() -> Self {
        Self { pairs: Vec::new() }
    }

    /// Extends the table with backend-specific pairs.
    ///
    /// Later entries win over earlier ones for the same logical name.
    pub fn with_pairs(mut self, pairs: &[(&str, &str)]) -> Self {
        for (logical, physical) in pairs {
            self.pairs
                .retain(|(l, p)| l != logical && p != physical);
            self.pairs.push((logical.to_string(), physical.to_string()));
        }
        self
    }

    /// Maps a logical attribute name to its physical column identifier.
    pub fn to_physical<'a>(&'a self, logical: &'a str) -> &'a str {
        self.pairs
            .iter()
            .find(|(l, _)| l == logical)
            .map(|(_, p)| p.as_str())
            .unwrap_or(logical)
    }

    /// Maps a physical column identifier back to its logical attribute name.
    pub fn to_logical<'a>(&'a self, physical: &'a str) -> &'a str {
        self.pairs
            .iter()
            .find(|(_, p)| p == physical)
            .map(|(l, _)| l.as_str())
            .unwrap_or(physical)
    }
}

impl Default for FieldMapper {
    fn default() -> Self {
        Self::standard()
    }
}
