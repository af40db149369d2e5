//! Response status categories for the rolebase ecosystem.

use serde::{Deserialize, Serialize};
use std::fmt;

/// HTTP status code wrapper with helper methods.
///
/// The data-access layer never speaks HTTP itself; it only tells the outer
/// layer which category a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HttpStatus(pub u16);

impl HttpStatus {
    pub const OK: Self = Self(200);
    pub const CREATED: Self = Self(201);
    pub const NO_CONTENT: Self = Self(204);
    pub const BAD_REQUEST: Self = Self(400);
    pub const NOT_FOUND: Self = Self(404);
    pub const CONFLICT: Self = Self(409);
    pub const INTERNAL_SERVER_ERROR: Self = Self(500);
    pub const SERVICE_UNAVAILABLE: Self = Self(503);

    /// Returns the status code as u16.
    pub fn code(&self) -> u16 {
        self.0
    }

    /// Returns true if this is a success status (2xx).
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.0)
    }

    /// Returns true if this is a client error status (4xx).
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.0)
    }

    /// Returns true if this is a server error status (5xx).
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.0)
    }

    /// Canonical reason phrase, used as the default envelope message.
    pub fn reason(&self) -> &'static str {
        match self.0 {
            200 => "Success",
            201 => "Resource created successfully",
            204 => "Operation completed successfully",
            400 => "Bad request",
            404 => "Resource not found",
            409 => "Resource already exists",
            503 => "Service unavailable",
            _ if self.is_server_error() => "Internal server error",
            _ => "Unknown status",
        }
    }
}

impl fmt::Display for HttpStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.0, self.reason())
    }
}

impl From<u16> for HttpStatus {
    fn from(code: u16) -> Self {
        Self(code)
    }
}

impl From<HttpStatus> for u16 {
    fn from(status: HttpStatus) -> Self {
        status.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classes() {
        assert!(HttpStatus::OK.is_success());
        assert!(HttpStatus::CREATED.is_success());
        assert!(HttpStatus::CONFLICT.is_client_error());
        assert!(HttpStatus::BAD_REQUEST.is_client_error());
        assert!(HttpStatus::INTERNAL_SERVER_ERROR.is_server_error());
        assert!(!HttpStatus::CONFLICT.is_server_error());
    }

    #[test]
    fn test_reason_phrases() {
        assert_eq!(HttpStatus::CONFLICT.reason(), "Resource already exists");
        assert_eq!(HttpStatus::BAD_REQUEST.reason(), "Bad request");
        assert_eq!(HttpStatus(502).reason(), "Internal server error");
        assert_eq!(HttpStatus::CONFLICT.to_string(), "409 Resource already exists");
    }

    #[test]
    fn test_u16_conversions() {
        let status: HttpStatus = 409.into();
        assert_eq!(status, HttpStatus::CONFLICT);
        let code: u16 = HttpStatus::BAD_REQUEST.into();
        assert_eq!(code, 400);
    }

    #[test]
    fn test_serializes_as_bare_number() {
        let json = serde_json::to_string(&HttpStatus::CONFLICT).unwrap();
        assert_eq!(json, "409");
    }
}
