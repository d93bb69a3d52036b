//! Error types for the data-access layer.
//!
//! Errors are grouped by category: retrieval (polling reads), presence
//! (absence assertions), comparison (delegated verification), materialization
//! (row decoding) and backend (driver/statement failures). Statement errors
//! are never retried or swallowed; read-path emptiness is handled by the
//! polling engine instead of surfacing here immediately.

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use thiserror::Error;

/// The primary error type for all data-access operations.
#[derive(Error, Debug)]
pub enum DbError {
    /// Polling read errors
    #[error(transparent)]
    Retrieval(#[from] RetrievalError),

    /// Absence assertion errors
    #[error(transparent)]
    Presence(#[from] PresenceError),

    /// Verification errors delegated from the comparison engine
    #[error(transparent)]
    Comparison(#[from] ComparisonError),

    /// Row-to-entity materialization errors
    #[error(transparent)]
    Materialize(#[from] MaterializeError),

    /// Backend/statement errors, propagated unmodified
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Errors raised by the polling retrieval engine.
#[derive(Error, Debug)]
pub enum RetrievalError {
    /// No matching rows became visible within the wait budget.
    #[error("timed out after {timeout_ms}ms waiting for {entity} records by: {criteria}")]
    Timeout {
        entity: String,
        criteria: String,
        timeout_ms: u64,
    },

    /// A completed wait produced no row to index into.
    #[error("no {entity} record in result set")]
    NoRows { entity: String },
}

/// Errors raised by absence assertions.
#[derive(Error, Debug)]
pub enum PresenceError {
    /// A row matched when none was expected.
    #[error("unexpected {entity} record by: {criteria}")]
    UnexpectedRecord { entity: String, criteria: String },

    /// A matching row was still visible when the wait budget ran out.
    #[error("{entity} record still present after {timeout_ms}ms by: {criteria}")]
    StillPresent {
        entity: String,
        criteria: String,
        timeout_ms: u64,
    },
}

/// Errors raised by the verification bridge.
#[derive(Error, Debug)]
pub enum ComparisonError {
    /// Actual and expected snapshots differ.
    #[error("{target} mismatch:\n{}", diffs.join("\n"))]
    Mismatch { target: String, diffs: Vec<String> },
}

/// Errors raised while turning a raw row into an entity.
#[derive(Error, Debug)]
pub enum MaterializeError {
    /// The row carried a physical column the model does not declare.
    #[error("unmapped column '{column}' in {entity} row")]
    UnmappedColumn { entity: String, column: String },

    /// A wire value could not be decoded for the field's declared kind.
    #[error("cannot decode field '{field}': {message}")]
    Decode { field: String, message: String },

    /// The decoded map did not satisfy the entity definition
    /// (missing required field, wrong shape).
    #[error("cannot populate {entity}: {message}")]
    Entity { entity: String, message: String },
}

/// Errors originating from the store client.
#[derive(Error, Debug)]
pub enum BackendError {
    /// A statement failed to execute or commit.
    #[error("statement failed on {backend}: {message}")]
    Statement {
        backend: &'static str,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Connection to the store could not be established.
    #[error("connection failed to {backend}: {message}")]
    Connection {
        backend: &'static str,
        message: String,
    },

    /// Connection pool exhausted.
    #[error("connection pool exhausted for {backend}")]
    PoolExhausted { backend: &'static str },

    /// A logical value could not be encoded for the wire.
    #[error("cannot encode value: {message}")]
    Encode { message: String },

    /// The operation is not meaningful for this backend.
    #[error("operation '{operation}' not supported by {backend}")]
    Unsupported {
        backend: &'static str,
        operation: &'static str,
    },
}

/// Result type alias for data-access operations.
pub type DbResult<T> = Result<T, DbError>;

impl From<serde_json::Error> for DbError {
    fn from(err: serde_json::Error) -> Self {
        DbError::Backend(BackendError::Encode {
            message: err.to_string(),
        })
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for DbError {
    fn from(err: rusqlite::Error) -> Self {
        DbError::Backend(BackendError::Statement {
            backend: "sqlite",
            message: err.to_string(),
            source: Some(Box::new(err)),
        })
    }
}

#[cfg(feature = "sqlite")]
impl From<r2d2::Error> for DbError {
    fn from(_err: r2d2::Error) -> Self {
        DbError::Backend(BackendError::PoolExhausted { backend: "sqlite" })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retrieval_timeout_display() {
        let err = RetrievalError::Timeout {
            entity: "Feature".to_string(),
            criteria: "id = 1".to_string(),
            timeout_ms: 3000,
        };
        assert_eq!(
            err.to_string(),
            "timed out after 3000ms waiting for Feature records by: id = 1"
        );
    }

    #[test]
    fn test_presence_error_display() {
        let err = PresenceError::UnexpectedRecord {
            entity: "Feature".to_string(),
            criteria: "name = \"a\"".to_string(),
        };
        assert!(err.to_string().contains("unexpected Feature record"));

        let err = PresenceError::StillPresent {
            entity: "Feature".to_string(),
            criteria: "id = 1".to_string(),
            timeout_ms: 3000,
        };
        assert!(err.to_string().contains("still present after 3000ms"));
    }

    #[test]
    fn test_comparison_mismatch_display() {
        let err = ComparisonError::Mismatch {
            target: "Feature record".to_string(),
            diffs: vec![
                "name: expected \"a\", actual \"b\"".to_string(),
                "id: expected 1, actual 2".to_string(),
            ],
        };
        let text = err.to_string();
        assert!(text.starts_with("Feature record mismatch:"));
        assert!(text.contains("name: expected"));
        assert!(text.contains("id: expected"));
    }

    #[test]
    fn test_materialize_error_display() {
        let err = MaterializeError::UnmappedColumn {
            entity: "Feature".to_string(),
            column: "extra".to_string(),
        };
        assert_eq!(err.to_string(), "unmapped column 'extra' in Feature row");
    }

    #[test]
    fn test_db_error_from_categories() {
        let err: DbError = RetrievalError::NoRows {
            entity: "Feature".to_string(),
        }
        .into();
        assert!(matches!(err, DbError::Retrieval(_)));

        let err: DbError = BackendError::Unsupported {
            backend: "memory",
            operation: "truncate_cascade",
        }
        .into();
        assert!(matches!(err, DbError::Backend(_)));
    }
}
