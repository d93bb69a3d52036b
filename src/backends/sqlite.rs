//! SQLite store client (relational family).
//!
//! Backed by an r2d2 pool over rusqlite, with in-memory (shared-cache URI)
//! and file-based modes. Every operation checks a connection out of the
//! pool, runs its statements, and returns the connection before the caller
//! resumes; the polling read path therefore never holds a connection across
//! a retry sleep.
//!
//! SQLite has no `TRUNCATE ... CASCADE`. `truncate_cascade` issues
//! `DELETE FROM <table>` with foreign-key enforcement on, which drives
//! `ON DELETE CASCADE` schemas the same way.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::OpenFlags;
use rusqlite::types::ValueRef;
use serde::{Deserialize, Serialize};

use crate::adapter::{BackendFamily, RelationalAdapter, ValueAdapter};
use crate::client::StoreClient;
use crate::criteria::{Condition, Criteria, Op};
use crate::error::{BackendError, DbResult};
use crate::value::{RawRow, WireValue};

/// Configuration for the SQLite client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqliteConfig {
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Pool checkout timeout in milliseconds.
    #[serde(default = "default_connection_timeout_ms")]
    pub connection_timeout_ms: u64,

    /// SQLite busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Enable foreign key constraints (needed for cascade deletes).
    #[serde(default = "default_true")]
    pub enable_foreign_keys: bool,
}

fn default_max_connections() -> u32 {
    10
}

fn default_connection_timeout_ms() -> u64 {
    30000
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

fn default_true() -> bool {
    true
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            max_connections: default_max_connections(),
            connection_timeout_ms: default_connection_timeout_ms(),
            busy_timeout_ms: default_busy_timeout_ms(),
            enable_foreign_keys: true,
        }
    }
}

/// SQLite-backed [`StoreClient`].
pub struct SqliteClient {
    pool: Pool<SqliteConnectionManager>,
    adapter: RelationalAdapter,
    is_memory: bool,
}

impl std::fmt::Debug for SqliteClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteClient")
            .field("is_memory", &self.is_memory)
            .finish_non_exhaustive()
    }
}

static MEMORY_DB_SEQ: AtomicU64 = AtomicU64::new(0);

impl SqliteClient {
    /// Opens an in-memory database with the default configuration.
    ///
    /// Uses a uniquely named shared-cache URI so every pooled connection
    /// sees the same data.
    pub fn in_memory() -> DbResult<Self> {
        Self::in_memory_with(SqliteConfig::default())
    }

    /// Opens an in-memory database with an explicit configuration.
    pub fn in_memory_with(config: SqliteConfig) -> DbResult<Self> {
        let seq = MEMORY_DB_SEQ.fetch_add(1, Ordering::Relaxed);
        let uri = format!("file:dbcheck_mem_{seq}?mode=memory&cache=shared");
        let manager = SqliteConnectionManager::file(uri).with_flags(
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_URI,
        );
        Self::build(manager, config, true)
    }

    /// Opens a file-based database with the default configuration.
    pub fn open(path: impl AsRef<Path>) -> DbResult<Self> {
        Self::open_with(path, SqliteConfig::default())
    }

    /// Opens a file-based database with an explicit configuration.
    pub fn open_with(path: impl AsRef<Path>, config: SqliteConfig) -> DbResult<Self> {
        let manager = SqliteConnectionManager::file(path.as_ref());
        Self::build(manager, config, false)
    }

    fn build(
        manager: SqliteConnectionManager,
        config: SqliteConfig,
        is_memory: bool,
    ) -> DbResult<Self> {
        let busy_timeout = config.busy_timeout_ms;
        let foreign_keys = config.enable_foreign_keys;
        let manager = manager.with_init(move |conn| {
            conn.busy_timeout(std::time::Duration::from_millis(busy_timeout))?;
            if foreign_keys {
                conn.execute_batch("PRAGMA foreign_keys = ON;")?;
            }
            Ok(())
        });

        let pool = Pool::builder()
            .max_size(config.max_connections)
            .connection_timeout(std::time::Duration::from_millis(
                config.connection_timeout_ms,
            ))
            .build(manager)
            .map_err(|e| BackendError::Connection {
                backend: "sqlite",
                message: e.to_string(),
            })?;

        Ok(Self {
            pool,
            adapter: RelationalAdapter,
            is_memory,
        })
    }

    /// Whether this client runs against an in-memory database.
    pub fn is_memory(&self) -> bool {
        self.is_memory
    }

    /// Runs a raw SQL batch (schema setup in test fixtures).
    pub fn execute_batch(&self, sql: &str) -> DbResult<()> {
        let conn = self.conn()?;
        conn.execute_batch(sql)?;
        Ok(())
    }

    fn conn(&self) -> DbResult<PooledConnection<SqliteConnectionManager>> {
        Ok(self.pool.get()?)
    }

    fn bind_value(&self, value: &serde_json::Value) -> DbResult<rusqlite::types::Value> {
        Ok(wire_to_sql(&self.adapter.encode(value)?))
    }

    /// Renders an AND-joined WHERE clause with positional placeholders.
    ///
    /// Placeholder numbering starts after `offset` already-bound parameters.
    fn where_clause(
        &self,
        conditions: &[Condition],
        offset: usize,
    ) -> DbResult<(String, Vec<rusqlite::types::Value>)> {
        if conditions.is_empty() {
            return Ok((String::new(), Vec::new()));
        }

        let mut fragments = Vec::with_capacity(conditions.len());
        let mut params = Vec::new();

        for cond in conditions {
            let column = quote_ident(&cond.field);
            match cond.op {
                Op::IsNull => fragments.push(format!("{column} IS NULL")),
                Op::IsNotNull => fragments.push(format!("{column} IS NOT NULL")),
                Op::In => {
                    if cond.values.is_empty() {
                        fragments.push("1 = 0".to_string());
                        continue;
                    }
                    let mut holes = Vec::with_capacity(cond.values.len());
                    for value in &cond.values {
                        params.push(self.bind_value(value)?);
                        holes.push(format!("?{}", offset + params.len()));
                    }
                    fragments.push(format!("{column} IN ({})", holes.join(", ")));
                }
                op => {
                    let value = cond.values.first().unwrap_or(&serde_json::Value::Null);
                    // equality against NULL has to become IS [NOT] NULL
                    if value.is_null() && matches!(op, Op::Eq | Op::Ne) {
                        let check = if op == Op::Eq { "IS NULL" } else { "IS NOT NULL" };
                        fragments.push(format!("{column} {check}"));
                        continue;
                    }
                    params.push(self.bind_value(value)?);
                    let symbol = match op {
                        Op::Eq => "=",
                        Op::Ne => "<>",
                        Op::Gt => ">",
                        Op::Ge => ">=",
                        Op::Lt => "<",
                        Op::Le => "<=",
                        Op::Like => "LIKE",
                        Op::In | Op::IsNull | Op::IsNotNull => unreachable!("handled above"),
                    };
                    fragments.push(format!("{column} {symbol} ?{}", offset + params.len()));
                }
            }
        }

        Ok((format!(" WHERE {}", fragments.join(" AND ")), params))
    }

    fn read_row(
        &self,
        columns: &[String],
        row: &rusqlite::Row<'_>,
    ) -> Result<RawRow, rusqlite::Error> {
        let mut raw = RawRow::new();
        for (index, column) in columns.iter().enumerate() {
            let wire = match row.get_ref(index)? {
                ValueRef::Null => WireValue::Null,
                ValueRef::Integer(i) => WireValue::Integer(i),
                ValueRef::Real(r) => WireValue::Real(r),
                ValueRef::Text(text) => WireValue::Text(String::from_utf8_lossy(text).into_owned()),
                ValueRef::Blob(bytes) => WireValue::Bytes(bytes.to_vec()),
            };
            raw.push(column.clone(), wire);
        }
        Ok(raw)
    }

    fn query_rows(
        &self,
        conn: &rusqlite::Connection,
        sql: &str,
        params: &[rusqlite::types::Value],
    ) -> DbResult<Vec<RawRow>> {
        let mut stmt = conn.prepare(sql)?;
        let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
        let mut rows = stmt.query(rusqlite::params_from_iter(params.iter()))?;

        let mut result = Vec::new();
        while let Some(row) = rows.next()? {
            result.push(self.read_row(&columns, row)?);
        }
        Ok(result)
    }
}

#[async_trait]
impl StoreClient for SqliteClient {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    fn family(&self) -> BackendFamily {
        BackendFamily::Relational
    }

    async fn select(&self, table: &str, criteria: &Criteria) -> DbResult<Vec<RawRow>> {
        let (clause, params) = self.where_clause(&criteria.read_conditions(), 0)?;
        let mut sql = format!("SELECT * FROM {}{clause}", quote_ident(table));
        if let Some(order) = criteria.ordering() {
            sql.push_str(&format!(" ORDER BY {} ASC", quote_ident(order)));
        }

        let conn = self.conn()?;
        self.query_rows(&conn, &sql, &params)
    }

    async fn insert(&self, table: &str, row: RawRow) -> DbResult<RawRow> {
        let (sql, params) = insert_statement(table, &row);

        let conn = self.conn()?;
        conn.execute(&sql, rusqlite::params_from_iter(params.iter()))?;

        // re-read the committed state so generated keys and column defaults
        // come back filled in
        let reread = format!(
            "SELECT * FROM {} WHERE rowid = last_insert_rowid()",
            quote_ident(table)
        );
        let mut rows = self.query_rows(&conn, &reread, &[])?;
        rows.pop().ok_or_else(|| {
            BackendError::Statement {
                backend: "sqlite",
                message: format!("inserted row not found in {table}"),
                source: None,
            }
            .into()
        })
    }

    async fn insert_batch(&self, table: &str, rows: Vec<RawRow>) -> DbResult<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        for row in rows {
            let (sql, params) = insert_statement(table, &row);
            tx.execute(&sql, rusqlite::params_from_iter(params.iter()))?;
        }

        tx.commit()?;
        Ok(())
    }

    async fn update(&self, table: &str, patch: RawRow, criteria: &Criteria) -> DbResult<u64> {
        if patch.is_empty() {
            return Ok(0);
        }

        let mut sets = Vec::with_capacity(patch.len());
        let mut params = Vec::new();
        for (column, wire) in patch.iter() {
            params.push(wire_to_sql(wire));
            sets.push(format!("{} = ?{}", quote_ident(column), params.len()));
        }

        let conditions = criteria.write_conditions();
        let (clause, mut cond_params) = self.where_clause(&conditions, params.len())?;
        params.append(&mut cond_params);

        let sql = format!(
            "UPDATE {} SET {}{clause}",
            quote_ident(table),
            sets.join(", ")
        );

        let conn = self.conn()?;
        let affected = conn.execute(&sql, rusqlite::params_from_iter(params.iter()))?;
        Ok(affected as u64)
    }

    async fn delete(&self, table: &str, criteria: &Criteria) -> DbResult<u64> {
        let (clause, params) = self.where_clause(&criteria.write_conditions(), 0)?;
        let sql = format!("DELETE FROM {}{clause}", quote_ident(table));

        let conn = self.conn()?;
        let affected = conn.execute(&sql, rusqlite::params_from_iter(params.iter()))?;
        Ok(affected as u64)
    }

    async fn truncate_cascade(&self, table: &str) -> DbResult<()> {
        let conn = self.conn()?;
        conn.execute(&format!("DELETE FROM {}", quote_ident(table)), [])?;
        Ok(())
    }

    async fn truncate_all(&self, exclude: &[&str]) -> DbResult<()> {
        let mut conn = self.conn()?;
        let tables: Vec<String> = {
            let mut stmt = conn.prepare(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'",
            )?;
            let names = stmt.query_map([], |row| row.get::<_, String>(0))?;
            names.collect::<Result<_, _>>()?
        };

        let tx = conn.transaction()?;
        tx.execute_batch("PRAGMA defer_foreign_keys = ON;")?;
        for table in &tables {
            if exclude.contains(&table.as_str()) {
                continue;
            }
            tx.execute(&format!("DELETE FROM {}", quote_ident(table)), [])?;
        }
        tx.commit()?;
        Ok(())
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Renders an INSERT for the row. A row with no columns (every field null or
/// omitted) becomes `DEFAULT VALUES`; `() VALUES ()` is a syntax error in
/// SQLite.
fn insert_statement(table: &str, row: &RawRow) -> (String, Vec<rusqlite::types::Value>) {
    if row.is_empty() {
        return (
            format!("INSERT INTO {} DEFAULT VALUES", quote_ident(table)),
            Vec::new(),
        );
    }

    let mut columns = Vec::with_capacity(row.len());
    let mut holes = Vec::with_capacity(row.len());
    let mut params = Vec::with_capacity(row.len());
    for (index, (column, wire)) in row.iter().enumerate() {
        columns.push(quote_ident(column));
        holes.push(format!("?{}", index + 1));
        params.push(wire_to_sql(wire));
    }

    (
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_ident(table),
            columns.join(", "),
            holes.join(", ")
        ),
        params,
    )
}

fn wire_to_sql(wire: &WireValue) -> rusqlite::types::Value {
    use rusqlite::types::Value as Sql;
    match wire {
        WireValue::Null => Sql::Null,
        WireValue::Bool(b) => Sql::Integer(i64::from(*b)),
        WireValue::Integer(i) => Sql::Integer(*i),
        WireValue::Real(r) => Sql::Real(*r),
        WireValue::Text(text) => Sql::Text(text.clone()),
        WireValue::Bytes(bytes) => Sql::Blob(bytes.clone()),
        WireValue::Timestamp(ts) => Sql::Text(ts.to_rfc3339()),
        WireValue::Json(value) => Sql::Text(value.to_string()),
    }
}
