//! The data-access facade.
//!
//! [`Database`] ties the pieces together: it remaps logical criteria to
//! physical identifiers, drives the store client for writes, runs reads
//! through the polling retrieval engine, and bridges record verification to
//! the comparison engine.
//!
//! Writes in no-db mode are suppressed per instance, so concurrent test runs
//! in one process cannot leak mode between each other.

use serde_json::Value;

use crate::adapter::ValueAdapter;
use crate::client::StoreClient;
use crate::compare::{CompareRule, Comparer, StructuralComparer};
use crate::criteria::Criteria;
use crate::error::{BackendError, DbResult, PresenceError, RetrievalError};
use crate::mapper::FieldMapper;
use crate::materialize::{materialize, to_row};
use crate::model::Entity;
use crate::poll::{RetryPolicy, wait_until};
use crate::value::{RawRow, WireValue};

/// Whether write operations reach the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    /// Normal operation: writes are executed and committed.
    #[default]
    ReadWrite,
    /// Test-harness mode: `insert`/`insert_records` become no-ops so setup
    /// code can run without a live store.
    NoDb,
}

/// The CRUD facade over one store client.
pub struct Database<C: StoreClient> {
    client: C,
    mapper: FieldMapper,
    adapter: Box<dyn ValueAdapter>,
    comparer: Box<dyn Comparer>,
    mode: WriteMode,
}

impl<C: StoreClient> Database<C> {
    /// Wraps a store client with the standard field mapper, the client
    /// family's value adapter and the structural comparer.
    pub fn new(client: C) -> Self {
        let adapter = client.family().adapter();
        Self {
            client,
            mapper: FieldMapper::standard(),
            adapter,
            comparer: Box::new(StructuralComparer),
            mode: WriteMode::ReadWrite,
        }
    }

    /// Replaces the field mapper (backend-specific reserved-word tables).
    pub fn with_mapper(mut self, mapper: FieldMapper) -> Self {
        self.mapper = mapper;
        self
    }

    /// Replaces the comparison engine used by `verify_record(s)`.
    pub fn with_comparer(mut self, comparer: Box<dyn Comparer>) -> Self {
        self.comparer = comparer;
        self
    }

    /// Sets the write mode at construction time.
    pub fn with_mode(mut self, mode: WriteMode) -> Self {
        self.mode = mode;
        self
    }

    /// Switches the write mode on a live facade.
    pub fn set_mode(&mut self, mode: WriteMode) {
        self.mode = mode;
    }

    /// The current write mode.
    pub fn mode(&self) -> WriteMode {
        self.mode
    }

    /// The wrapped client.
    pub fn client(&self) -> &C {
        &self.client
    }

    fn physical(&self, criteria: &Criteria) -> Criteria {
        criteria.map_fields(|field| self.mapper.to_physical(field).to_string())
    }

    async fn fetch<E: Entity>(&self, criteria: &Criteria) -> DbResult<Vec<E>> {
        let rows = self
            .client
            .select(E::schema().table, &self.physical(criteria))
            .await?;
        rows.iter()
            .map(|row| materialize(row, &self.mapper, self.adapter.as_ref(), true))
            .collect()
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Single query, no waiting: returns whatever is currently visible,
    /// possibly nothing.
    pub async fn get_records_nowait<E: Entity>(&self, criteria: &Criteria) -> DbResult<Vec<E>> {
        self.fetch(criteria).await
    }

    /// Polls until at least one matching record is visible, then returns
    /// all matches.
    pub async fn get_records<E: Entity>(
        &self,
        criteria: &Criteria,
        policy: &RetryPolicy,
    ) -> DbResult<Vec<E>> {
        let schema = E::schema();
        let shown = criteria.to_string();
        let waiting_for = format!("records from {} by: {shown}", schema.table);
        let this = self;

        wait_until(
            policy,
            &waiting_for,
            move || async move {
                let records = this.fetch::<E>(criteria).await?;
                Ok((!records.is_empty()).then_some(records))
            },
            move |timeout_ms| {
                RetrievalError::Timeout {
                    entity: schema.entity.to_string(),
                    criteria: shown,
                    timeout_ms,
                }
                .into()
            },
        )
        .await
    }

    /// Polls like [`get_records`](Self::get_records) and returns the first
    /// match.
    pub async fn get_record<E: Entity>(
        &self,
        criteria: &Criteria,
        policy: &RetryPolicy,
    ) -> DbResult<E> {
        let records = self.get_records::<E>(criteria, policy).await?;
        records.into_iter().next().ok_or_else(|| {
            RetrievalError::NoRows {
                entity: E::schema().entity.to_string(),
            }
            .into()
        })
    }

    /// Polls until no matching row is visible.
    pub async fn verify_absence<E: Entity>(
        &self,
        criteria: &Criteria,
        policy: &RetryPolicy,
    ) -> DbResult<()> {
        let schema = E::schema();
        let physical = self.physical(criteria);
        let shown = criteria.to_string();
        let waiting_for = format!("no {} records by: {shown}", schema.table);
        let physical = &physical;
        let client = &self.client;

        wait_until(
            policy,
            &waiting_for,
            move || async move {
                let rows = client.select(schema.table, physical).await?;
                Ok(rows.is_empty().then_some(()))
            },
            move |timeout_ms| {
                PresenceError::StillPresent {
                    entity: schema.entity.to_string(),
                    criteria: shown,
                    timeout_ms,
                }
                .into()
            },
        )
        .await
    }

    /// Single-shot absence assertion: fails immediately if any row matches.
    pub async fn verify_no_record<E: Entity>(&self, criteria: &Criteria) -> DbResult<()> {
        let schema = E::schema();
        let rows = self
            .client
            .select(schema.table, &self.physical(criteria))
            .await?;
        if rows.is_empty() {
            Ok(())
        } else {
            Err(PresenceError::UnexpectedRecord {
                entity: schema.entity.to_string(),
                criteria: criteria.to_string(),
            }
            .into())
        }
    }

    // ------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------

    /// Inserts one entity and returns its post-commit state, with
    /// server-generated defaults filled in.
    ///
    /// Returns `None` in no-db mode.
    pub async fn insert<E: Entity>(&self, entity: &E) -> DbResult<Option<E>> {
        if self.mode == WriteMode::NoDb {
            tracing::debug!(entity = E::schema().entity, "no-db mode, insert skipped");
            return Ok(None);
        }

        let schema = E::schema();
        let row = to_row(entity, &self.mapper, self.adapter.as_ref())?;
        let stored = self.client.insert(schema.table, row).await?;
        tracing::debug!(entity = schema.entity, table = schema.table, "inserted record");

        materialize(&stored, &self.mapper, self.adapter.as_ref(), true).map(Some)
    }

    /// Inserts a batch of entities under a single commit (all-or-nothing).
    ///
    /// No-op in no-db mode.
    pub async fn insert_records<E: Entity>(&self, entities: &[E]) -> DbResult<()> {
        if self.mode == WriteMode::NoDb {
            tracing::debug!(entity = E::schema().entity, "no-db mode, batch insert skipped");
            return Ok(());
        }

        let schema = E::schema();
        let rows: Vec<RawRow> = entities
            .iter()
            .map(|entity| to_row(entity, &self.mapper, self.adapter.as_ref()))
            .collect::<DbResult<_>>()?;
        let count = rows.len();
        self.client.insert_batch(schema.table, rows).await?;
        tracing::debug!(entity = schema.entity, count, "inserted batch");
        Ok(())
    }

    /// Applies a field patch to all rows matching the criteria in one
    /// statement. `new_values` must be an object of logical field names to
    /// values; explicit nulls clear the column. Returns the affected count.
    pub async fn update<E: Entity>(
        &self,
        new_values: &Value,
        criteria: &Criteria,
    ) -> DbResult<u64> {
        let schema = E::schema();
        let Some(fields) = new_values.as_object() else {
            return Err(BackendError::Encode {
                message: format!("update values must be an object, got: {new_values}"),
            }
            .into());
        };

        let mut patch = RawRow::new();
        for (logical, value) in fields {
            let wire = if value.is_null() {
                WireValue::Null
            } else {
                self.adapter.encode(value)?
            };
            patch.push(self.mapper.to_physical(logical), wire);
        }

        let affected = self
            .client
            .update(schema.table, patch, &self.physical(criteria))
            .await?;
        tracing::debug!(entity = schema.entity, affected, "updated records");
        Ok(affected)
    }

    /// Deletes all rows matching the criteria in one statement. Returns the
    /// affected count.
    pub async fn delete<E: Entity>(&self, criteria: &Criteria) -> DbResult<u64> {
        let schema = E::schema();
        let affected = self
            .client
            .delete(schema.table, &self.physical(criteria))
            .await?;
        tracing::debug!(entity = schema.entity, affected, "deleted records");
        Ok(affected)
    }

    /// Truncates the entity's table, cascading to dependents. Destructive.
    pub async fn cascade_delete<E: Entity>(&self) -> DbResult<()> {
        let schema = E::schema();
        tracing::debug!(entity = schema.entity, table = schema.table, "cascade delete");
        self.client.truncate_cascade(schema.table).await
    }

    /// Clears every managed table except the excluded set. Full state reset
    /// for test isolation.
    pub async fn truncate_all(&self, exclude: &[&str]) -> DbResult<()> {
        tracing::debug!(?exclude, "truncating all tables");
        self.client.truncate_all(exclude).await
    }

    // ------------------------------------------------------------------
    // Verification bridge
    // ------------------------------------------------------------------

    /// Compares the logical snapshots of two entities, failing with a
    /// mismatch naming the entity.
    pub fn verify_record<E: Entity>(
        &self,
        actual: &E,
        expected: &E,
        rules: &[CompareRule],
    ) -> DbResult<()> {
        let target = format!("{} record", E::schema().entity);
        let actual = Value::Object(actual.to_values()?);
        let expected = Value::Object(expected.to_values()?);
        self.comparer
            .compare(&actual, &expected, &target, rules)
            .map_err(Into::into)
    }

    /// Compares two ordered record lists.
    pub fn verify_records<E: Entity>(
        &self,
        actual: &[E],
        expected: &[E],
        rules: &[CompareRule],
    ) -> DbResult<()> {
        let target = format!("{} records", E::schema().entity);
        let actual = Value::Array(
            actual
                .iter()
                .map(|e| e.to_values().map(Value::Object))
                .collect::<DbResult<_>>()?,
        );
        let expected = Value::Array(
            expected
                .iter()
                .map(|e| e.to_values().map(Value::Object))
                .collect::<DbResult<_>>()?,
        );
        self.comparer
            .compare(&actual, &expected, &target, rules)
            .map_err(Into::into)
    }
}
