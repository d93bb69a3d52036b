//! The store client contract.
//!
//! A [`StoreClient`] is the narrow seam between the core and a concrete
//! driver. It speaks physical identifiers only: the facade remaps logical
//! field names before criteria or rows reach a client, and clients encode
//! condition values with their family's adapter when binding statements.
//!
//! Every operation is expected to acquire a connection, run its statements,
//! commit, and release the connection before returning. The polling read
//! path relies on that: no connection is held across a retry sleep.

use async_trait::async_trait;

use crate::adapter::BackendFamily;
use crate::criteria::Criteria;
use crate::error::DbResult;
use crate::value::RawRow;

/// Query/execute/commit contract a backend driver must provide.
#[async_trait]
pub trait StoreClient: Send + Sync {
    /// Human-readable backend name for diagnostics.
    fn backend_name(&self) -> &'static str;

    /// The value-encoding family of this backend.
    fn family(&self) -> BackendFamily;

    /// Runs a query and returns all matching rows, detached.
    ///
    /// Criteria carry physical field names. An empty criteria set selects
    /// every row of the table; the criteria's ordering field, when present,
    /// sorts ascending.
    async fn select(&self, table: &str, criteria: &Criteria) -> DbResult<Vec<RawRow>>;

    /// Inserts one row and commits.
    ///
    /// Returns the post-commit row state, re-read so server-generated
    /// defaults and auto-assigned keys are filled in.
    async fn insert(&self, table: &str, row: RawRow) -> DbResult<RawRow>;

    /// Inserts a batch of rows under a single commit.
    ///
    /// All-or-nothing: if any row is rejected, none of the batch becomes
    /// visible.
    async fn insert_batch(&self, table: &str, rows: Vec<RawRow>) -> DbResult<()>;

    /// Applies a column patch to all matching rows in one statement and
    /// commits. Returns the affected row count.
    async fn update(&self, table: &str, patch: RawRow, criteria: &Criteria) -> DbResult<u64>;

    /// Deletes all matching rows in one statement and commits. Returns the
    /// affected row count.
    async fn delete(&self, table: &str, criteria: &Criteria) -> DbResult<u64>;

    /// Truncates the table, cascading to dependents where the backend
    /// supports it. Destructive and non-reversible.
    async fn truncate_cascade(&self, table: &str) -> DbResult<()>;

    /// Clears every managed table except the excluded set.
    async fn truncate_all(&self, exclude: &[&str]) -> DbResult<()>;
}
