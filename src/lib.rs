//! Eventually-consistent database assertion layer for integration tests.
//!
//! `dbcheck` lets test code insert, mutate and assert on records in a backing
//! store through a uniform model abstraction, tolerating stores where a
//! just-written record is not immediately visible to a subsequent read.
//!
//! # What it does
//!
//! - **CRUD facade**: insert, batch insert, update, delete and truncate
//!   operations expressed over typed entities instead of raw SQL.
//! - **Polling reads**: `get_record(s)` re-run the query under an explicit
//!   [`RetryPolicy`](poll::RetryPolicy) until the record (or its absence)
//!   becomes visible, then materialize detached entities.
//! - **Value adaptation**: structured field values (JSON objects/arrays,
//!   booleans, timestamps) are encoded per backend family: compact JSON text
//!   and 0/1 booleans for relational stores, UTF-8 JSON bytes and native
//!   booleans for columnar stores.
//! - **Reserved-name mapping**: model attributes whose names collide with
//!   reserved identifiers (`is_global` and `global`, `metadata_column` and
//!   `metadata`) are remapped through an explicit bidirectional table.
//!
//! # Backends
//!
//! The SQLite client (feature `sqlite`, on by default) serves the relational
//! family via rusqlite and an r2d2 pool; the always-available in-memory
//! client serves the columnar family. Any driver can participate by
//! implementing [`StoreClient`](client::StoreClient).
//!
//! # Quick start
//!
//! ```no_run
//! use serde::{Deserialize, Serialize};
//! use dbcheck::backends::SqliteClient;
//! use dbcheck::criteria::Criteria;
//! use dbcheck::db::Database;
//! use dbcheck::model::{Entity, FieldDef, FieldKind, ModelSchema};
//! use dbcheck::poll::RetryPolicy;
//!
//! #[derive(Debug, Serialize, Deserialize)]
//! struct Account {
//!     id: i64,
//!     name: String,
//! }
//!
//! static ACCOUNT: ModelSchema = ModelSchema {
//!     entity: "Account",
//!     table: "account",
//!     fields: &[
//!         FieldDef::required("id", FieldKind::Scalar),
//!         FieldDef::required("name", FieldKind::Scalar),
//!     ],
//! };
//!
//! impl Entity for Account {
//!     fn schema() -> &'static ModelSchema {
//!         &ACCOUNT
//!     }
//! }
//!
//! # async fn example() -> dbcheck::error::DbResult<()> {
//! let db = Database::new(SqliteClient::in_memory()?);
//!
//! db.insert(&Account { id: 1, name: "a".to_string() }).await?;
//!
//! // waits up to the default 3 seconds for the row to become visible
//! let stored: Account = db
//!     .get_record(&Criteria::by("id", 1), &RetryPolicy::default())
//!     .await?;
//! assert_eq!(stored.name, "a");
//! # Ok(())
//! # }
//! ```
//!
//! This is a testing utility, not a consistency layer: concurrent writers
//! race with last-writer-wins commit order, and the only cancellation is
//! timeout expiry.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod adapter;
pub mod backends;
pub mod client;
pub mod compare;
pub mod criteria;
pub mod db;
pub mod error;
pub mod mapper;
pub mod materialize;
pub mod model;
pub mod poll;
pub mod value;

// Re-export commonly used types at crate root
pub use adapter::{BackendFamily, ColumnarAdapter, RelationalAdapter, ValueAdapter};
pub use client::StoreClient;
pub use compare::{CompareRule, Comparer, StructuralComparer};
pub use criteria::{Condition, Criteria, Op};
pub use db::{Database, WriteMode};
pub use error::{DbError, DbResult};
pub use mapper::FieldMapper;
pub use model::{Entity, FieldDef, FieldKind, ModelSchema};
pub use poll::{DEFAULT_TIMEOUT, RetryPolicy};
pub use value::{RawRow, WireValue};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
