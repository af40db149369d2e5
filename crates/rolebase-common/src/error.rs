//! Error types for rolebase

use crate::http::HttpStatus;
use thiserror::Error;

/// Result type alias for rolebase operations
pub type Result<T> = std::result::Result<T, RolebaseError>;

/// Unified error type for all rolebase operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RolebaseError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Connection error: {0}")]
    Connection(String),

    /// The pool has not been connected yet, or was already disconnected.
    #[error("Database not connected")]
    NotConnected,

    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Query construction error (caller programming error)
    #[error("Query error: {0}")]
    Query(String),

    /// Invalid caller input, including NOT NULL and CHECK violations
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),

    /// Unique constraint violation (SQLSTATE 23505)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Foreign key constraint violation (SQLSTATE 23503)
    #[error("Foreign key constraint violation: {0}")]
    ForeignKey(String),

    /// Pool acquire timed out
    #[error("Timeout: {0}")]
    Timeout(String),
}

impl RolebaseError {
    /// Returns true if this is a constraint violation reported by the backend
    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            RolebaseError::Conflict(_) | RolebaseError::ForeignKey(_)
        )
    }

    /// Returns true for pool lifecycle failures (not connected, acquire timeout,
    /// unreachable backend).
    pub fn is_pool_error(&self) -> bool {
        matches!(
            self,
            RolebaseError::NotConnected
                | RolebaseError::Timeout(_)
                | RolebaseError::Connection(_)
        )
    }

    /// Maps this error onto a response status category.
    ///
    /// Uniqueness and foreign-key violations are conflicts, NOT NULL / CHECK
    /// violations and construction errors are bad requests, everything else is
    /// an internal error.
    pub fn status(&self) -> HttpStatus {
        match self {
            RolebaseError::Conflict(_) | RolebaseError::ForeignKey(_) => HttpStatus::CONFLICT,
            RolebaseError::Validation(_) | RolebaseError::Query(_) => HttpStatus::BAD_REQUEST,
            _ => HttpStatus::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error mapper entry point for the outermost boundary.
pub fn status_for(err: &RolebaseError) -> HttpStatus {
    err.status()
}

impl From<serde_json::Error> for RolebaseError {
    fn from(err: serde_json::Error) -> Self {
        RolebaseError::Serialization(err.to_string())
    }
}

// PostgreSQL-specific error conversions (when postgres-errors feature is enabled)
#[cfg(feature = "postgres-errors")]
impl From<sqlx::Error> for RolebaseError {
    fn from(err: sqlx::Error) -> Self {
        use sqlx::Error;
        match &err {
            Error::Configuration(_) => RolebaseError::Configuration(err.to_string()),
            Error::Database(db_err) => {
                // See: https://www.postgresql.org/docs/current/errcodes-appendix.html
                if let Some(code) = db_err.code() {
                    if let Some(mapped) = classify_sqlstate(&code, err.to_string()) {
                        return mapped;
                    }
                }
                RolebaseError::Database(err.to_string())
            }
            Error::Io(_) => RolebaseError::Connection(err.to_string()),
            Error::Tls(_) => RolebaseError::Connection(err.to_string()),
            Error::Protocol(_) => RolebaseError::Connection(err.to_string()),
            Error::RowNotFound => RolebaseError::Query("Row not found".to_string()),
            Error::TypeNotFound { .. } => RolebaseError::Deserialization(err.to_string()),
            Error::ColumnIndexOutOfBounds { .. } => RolebaseError::Query(err.to_string()),
            Error::ColumnNotFound(_) => RolebaseError::Query(err.to_string()),
            Error::ColumnDecode { .. } => RolebaseError::Deserialization(err.to_string()),
            Error::Decode(_) => RolebaseError::Deserialization(err.to_string()),
            Error::PoolTimedOut => RolebaseError::Timeout("Connection pool timed out".to_string()),
            Error::PoolClosed => RolebaseError::Connection("Connection pool closed".to_string()),
            Error::WorkerCrashed => RolebaseError::Internal("Worker thread crashed".to_string()),
            _ => RolebaseError::Database(err.to_string()),
        }
    }
}

/// Classifies a PostgreSQL SQLSTATE code. Returns `None` for codes that stay
/// generic database errors.
pub fn classify_sqlstate(code: &str, message: String) -> Option<RolebaseError> {
    match code {
        "23505" => Some(RolebaseError::Conflict(message)),
        "23503" => Some(RolebaseError::ForeignKey(message)),
        "23502" | "23514" => Some(RolebaseError::Validation(message)),
        // Connection exceptions (class 08)
        code if code.starts_with("08") => Some(RolebaseError::Connection(message)),
        // Admin shutdown / crash recovery
        "57P01" | "57P02" | "57P03" => Some(RolebaseError::Connection(message)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_database() {
        let err = RolebaseError::Database("invalid query".to_string());
        assert_eq!(err.to_string(), "Database error: invalid query");
    }

    #[test]
    fn test_error_display_not_connected() {
        assert_eq!(RolebaseError::NotConnected.to_string(), "Database not connected");
    }

    #[test]
    fn test_error_display_conflict() {
        let err = RolebaseError::Conflict("duplicate key value".to_string());
        assert_eq!(err.to_string(), "Conflict: duplicate key value");
    }

    #[test]
    fn test_error_display_foreign_key() {
        let err = RolebaseError::ForeignKey("violates foreign key constraint".to_string());
        assert_eq!(
            err.to_string(),
            "Foreign key constraint violation: violates foreign key constraint"
        );
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: RolebaseError = json_err.into();
        assert!(matches!(err, RolebaseError::Serialization(_)));
    }

    #[test]
    fn test_constraint_errors_map_to_conflict() {
        assert_eq!(
            RolebaseError::Conflict("dup".into()).status(),
            HttpStatus::CONFLICT
        );
        assert_eq!(
            RolebaseError::ForeignKey("fk".into()).status(),
            HttpStatus::CONFLICT
        );
    }

    #[test]
    fn test_input_errors_map_to_bad_request() {
        assert_eq!(
            RolebaseError::Validation("not null".into()).status(),
            HttpStatus::BAD_REQUEST
        );
        assert_eq!(
            RolebaseError::Query("INSERT requires at least one column".into()).status(),
            HttpStatus::BAD_REQUEST
        );
    }

    #[test]
    fn test_everything_else_is_internal() {
        for err in [
            RolebaseError::NotConnected,
            RolebaseError::Timeout("pool".into()),
            RolebaseError::Connection("refused".into()),
            RolebaseError::Database("syntax".into()),
            RolebaseError::Internal("?".into()),
            RolebaseError::Configuration("DB_HOST".into()),
        ] {
            assert_eq!(status_for(&err), HttpStatus::INTERNAL_SERVER_ERROR, "{err}");
        }
    }

    #[test]
    fn test_classify_sqlstate() {
        let msg = || "boom".to_string();
        assert!(matches!(classify_sqlstate("23505", msg()), Some(RolebaseError::Conflict(_))));
        assert!(matches!(classify_sqlstate("23503", msg()), Some(RolebaseError::ForeignKey(_))));
        assert!(matches!(classify_sqlstate("23502", msg()), Some(RolebaseError::Validation(_))));
        assert!(matches!(classify_sqlstate("23514", msg()), Some(RolebaseError::Validation(_))));
        assert!(matches!(classify_sqlstate("08006", msg()), Some(RolebaseError::Connection(_))));
        assert!(classify_sqlstate("42601", msg()).is_none());
    }

    #[test]
    fn test_pool_error_predicate() {
        assert!(RolebaseError::NotConnected.is_pool_error());
        assert!(RolebaseError::Timeout("t".into()).is_pool_error());
        assert!(!RolebaseError::Conflict("c".into()).is_pool_error());
    }

    #[test]
    fn test_is_constraint_violation() {
        assert!(RolebaseError::Conflict("test".to_string()).is_constraint_violation());
        assert!(RolebaseError::ForeignKey("test".to_string()).is_constraint_violation());
        assert!(!RolebaseError::Query("test".to_string()).is_constraint_violation());
    }
}
