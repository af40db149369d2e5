//! Uniform result envelope returned by every executor operation.

use serde::Serialize;

use crate::{HttpStatus, RolebaseError, Row};

/// Outcome of a data-access operation.
///
/// A failed result never carries rows. `cause` keeps the classified error
/// for the outermost layer and is not serialized.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    pub success: bool,
    pub data: Vec<Row>,
    pub message: String,
    pub error: Option<String>,
    pub affected_rows: u64,
    #[serde(skip)]
    pub cause: Option<RolebaseError>,
}

impl QueryResult {
    /// Successful read (or write with RETURNING); `affected_rows` is the row count.
    pub fn rows(data: Vec<Row>, message: impl Into<String>) -> Self {
        let affected_rows = data.len() as u64;
        Self {
            success: true,
            data,
            message: message.into(),
            error: None,
            affected_rows,
            cause: None,
        }
    }

    /// Successful write without returned rows.
    pub fn written(affected_rows: u64, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Vec::new(),
            message: message.into(),
            error: None,
            affected_rows,
            cause: None,
        }
    }

    pub fn failure(message: impl Into<String>, cause: RolebaseError) -> Self {
        Self::partial_failure(message, cause, 0)
    }

    /// Failure that still reports rows touched before the failing statement.
    ///
    /// Those rows were rolled back; the count is diagnostic only.
    pub fn partial_failure(
        message: impl Into<String>,
        cause: RolebaseError,
        affected_rows: u64,
    ) -> Self {
        Self {
            success: false,
            data: Vec::new(),
            message: message.into(),
            error: Some(cause.to_string()),
            affected_rows,
            cause: Some(cause),
        }
    }

    /// Response status for this outcome.
    pub fn status(&self) -> HttpStatus {
        match &self.cause {
            Some(err) => err.status(),
            None if self.success => HttpStatus::OK,
            None => HttpStatus::INTERNAL_SERVER_ERROR,
        }
    }

    /// First row, if any.
    pub fn first(&self) -> Option<&Row> {
        self.data.first()
    }

    /// Converts into `Result`, handing back the classified cause on failure.
    pub fn into_result(self) -> crate::Result<Vec<Row>> {
        if self.success {
            return Ok(self.data);
        }
        Err(self.cause.unwrap_or_else(|| {
            RolebaseError::Internal(self.error.unwrap_or(self.message))
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SqlValue;

    fn row(id: i32) -> Row {
        [("id".to_string(), SqlValue::Int(id))].into_iter().collect()
    }

    #[test]
    fn test_rows_counts_data() {
        let result = QueryResult::rows(vec![row(1), row(2)], "ok");
        assert!(result.success);
        assert_eq!(result.affected_rows, 2);
        assert_eq!(result.status(), HttpStatus::OK);
        assert_eq!(result.first(), Some(&row(1)));
    }

    #[test]
    fn test_failure_has_no_rows() {
        let result = QueryResult::failure(
            "Query execution failed",
            RolebaseError::Conflict("duplicate key".to_string()),
        );
        assert!(!result.success);
        assert!(result.data.is_empty());
        assert_eq!(result.affected_rows, 0);
        assert_eq!(result.error.as_deref(), Some("Conflict: duplicate key"));
        assert_eq!(result.status(), HttpStatus::CONFLICT);
    }

    #[test]
    fn test_partial_failure_keeps_count() {
        let result = QueryResult::partial_failure(
            "Transaction failed",
            RolebaseError::Validation("null value".to_string()),
            3,
        );
        assert_eq!(result.affected_rows, 3);
        assert_eq!(result.status(), HttpStatus::BAD_REQUEST);
    }

    #[test]
    fn test_serialization_skips_cause() {
        let result = QueryResult::failure("failed", RolebaseError::NotConnected);
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["success"], false);
        assert_eq!(value["data"], serde_json::json!([]));
        assert!(value.get("cause").is_none());
    }

    #[test]
    fn test_into_result() {
        assert_eq!(QueryResult::written(1, "ok").into_result().unwrap().len(), 0);
        let err = QueryResult::failure("failed", RolebaseError::NotConnected)
            .into_result()
            .unwrap_err();
        assert_eq!(err, RolebaseError::NotConnected);
    }
}
