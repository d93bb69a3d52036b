//! In-memory store client (columnar family).
//!
//! A map of table name to row list behind a `parking_lot` lock. Serves two
//! purposes: exercising the columnar adapter set without a live cluster, and
//! store-less test setups. Criteria are evaluated directly over wire values.
//!
//! Cascading truncation has no meaning here (there are no dependents), so
//! `truncate_cascade` reports the operation as unsupported rather than
//! silently narrowing it to a plain clear.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::adapter::{BackendFamily, ColumnarAdapter, ValueAdapter};
use crate::client::StoreClient;
use crate::criteria::{Condition, Criteria, Op};
use crate::error::{BackendError, DbResult};
use crate::value::{RawRow, WireValue};

/// Map-backed [`StoreClient`] for the columnar family.
#[derive(Debug, Default)]
pub struct MemoryClient {
    tables: RwLock<BTreeMap<String, Vec<RawRow>>>,
}

impl MemoryClient {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows currently held in a table.
    pub fn row_count(&self, table: &str) -> usize {
        self.tables
            .read()
            .get(table)
            .map(Vec::len)
            .unwrap_or_default()
    }

    fn encode_operand(&self, value: &serde_json::Value) -> DbResult<WireValue> {
        ColumnarAdapter.encode(value)
    }

    fn matches(&self, row: &RawRow, conditions: &[Condition]) -> DbResult<bool> {
        for cond in conditions {
            let cell = row.get(&cond.field).unwrap_or(&WireValue::Null);
            let holds = match cond.op {
                Op::IsNull => cell.is_null(),
                Op::IsNotNull => !cell.is_null(),
                Op::In => {
                    let mut found = false;
                    for value in &cond.values {
                        if wire_eq(cell, &self.encode_operand(value)?) {
                            found = true;
                            break;
                        }
                    }
                    found
                }
                Op::Like => {
                    return Err(BackendError::Unsupported {
                        backend: "memory",
                        operation: "LIKE criteria",
                    }
                    .into());
                }
                op => {
                    let value = cond.values.first().cloned().unwrap_or_default();
                    if value.is_null() {
                        match op {
                            Op::Eq => cell.is_null(),
                            Op::Ne => !cell.is_null(),
                            _ => false,
                        }
                    } else {
                        let operand = self.encode_operand(&value)?;
                        match op {
                            Op::Eq => wire_eq(cell, &operand),
                            Op::Ne => !wire_eq(cell, &operand),
                            ordering_op => match wire_cmp(cell, &operand) {
                                Some(order) => match ordering_op {
                                    Op::Gt => order == Ordering::Greater,
                                    Op::Ge => order != Ordering::Less,
                                    Op::Lt => order == Ordering::Less,
                                    Op::Le => order != Ordering::Greater,
                                    _ => unreachable!("handled above"),
                                },
                                None => false,
                            },
                        }
                    }
                }
            };

            if !holds {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// Equality with the coercions clients are expected to tolerate
/// (integer/real, integer-coded booleans).
fn wire_eq(a: &WireValue, b: &WireValue) -> bool {
    match (a, b) {
        (WireValue::Bool(a), WireValue::Integer(b)) | (WireValue::Integer(b), WireValue::Bool(a)) => {
            *a == (*b != 0)
        }
        (WireValue::Integer(a), WireValue::Real(b)) | (WireValue::Real(b), WireValue::Integer(a)) => {
            (*a as f64) == *b
        }
        (a, b) => a == b,
    }
}

fn wire_cmp(a: &WireValue, b: &WireValue) -> Option<Ordering> {
    match (a, b) {
        (WireValue::Integer(a), WireValue::Integer(b)) => Some(a.cmp(b)),
        (WireValue::Real(a), WireValue::Real(b)) => a.partial_cmp(b),
        (WireValue::Integer(a), WireValue::Real(b)) => (*a as f64).partial_cmp(b),
        (WireValue::Real(a), WireValue::Integer(b)) => a.partial_cmp(&(*b as f64)),
        (WireValue::Text(a), WireValue::Text(b)) => Some(a.cmp(b)),
        (WireValue::Timestamp(a), WireValue::Timestamp(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

#[async_trait]
impl StoreClient for MemoryClient {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    fn family(&self) -> BackendFamily {
        BackendFamily::Columnar
    }

    async fn select(&self, table: &str, criteria: &Criteria) -> DbResult<Vec<RawRow>> {
        let conditions = criteria.read_conditions();
        let tables = self.tables.read();
        let rows = tables.get(table).map(Vec::as_slice).unwrap_or_default();

        let mut matched = Vec::new();
        for row in rows {
            if self.matches(row, &conditions)? {
                matched.push(row.clone());
            }
        }
        drop(tables);

        if let Some(order) = criteria.ordering() {
            matched.sort_by(|a, b| {
                let left = a.get(order).unwrap_or(&WireValue::Null);
                let right = b.get(order).unwrap_or(&WireValue::Null);
                wire_cmp(left, right).unwrap_or(Ordering::Equal)
            });
        }
        Ok(matched)
    }

    async fn insert(&self, table: &str, row: RawRow) -> DbResult<RawRow> {
        let mut tables = self.tables.write();
        tables.entry(table.to_string()).or_default().push(row.clone());
        Ok(row)
    }

    async fn insert_batch(&self, table: &str, rows: Vec<RawRow>) -> DbResult<()> {
        // single append keeps the batch all-or-nothing
        let mut tables = self.tables.write();
        tables.entry(table.to_string()).or_default().extend(rows);
        Ok(())
    }

    async fn update(&self, table: &str, patch: RawRow, criteria: &Criteria) -> DbResult<u64> {
        let conditions = criteria.write_conditions();
        // match and patch under one guard; a concurrent insert or delete
        // between the two steps would shift the rows
        let mut tables = self.tables.write();
        let Some(rows) = tables.get_mut(table) else {
            return Ok(0);
        };

        let mut affected = 0;
        for row in rows.iter_mut() {
            if self.matches(row, &conditions)? {
                for (column, value) in patch.iter() {
                    row.set(column, value.clone());
                }
                affected += 1;
            }
        }
        Ok(affected)
    }

    async fn delete(&self, table: &str, criteria: &Criteria) -> DbResult<u64> {
        let conditions = criteria.write_conditions();
        let mut tables = self.tables.write();
        let Some(rows) = tables.get_mut(table) else {
            return Ok(0);
        };

        let mut kept = Vec::with_capacity(rows.len());
        let mut removed = 0;
        for row in rows.drain(..) {
            if self.matches(&row, &conditions)? {
                removed += 1;
            } else {
                kept.push(row);
            }
        }
        *rows = kept;
        Ok(removed)
    }

    async fn truncate_cascade(&self, _table: &str) -> DbResult<()> {
        Err(BackendError::Unsupported {
            backend: "memory",
            operation: "truncate_cascade",
        }
        .into())
    }

    async fn truncate_all(&self, exclude: &[&str]) -> DbResult<()> {
        let mut tables = self.tables.write();
        for (name, rows) in tables.iter_mut() {
            if !exclude.contains(&name.as_str()) {
                rows.clear();
            }
        }
        Ok(())
    }
}
