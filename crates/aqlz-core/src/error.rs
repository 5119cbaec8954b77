//! Error types for AQLZ

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// ArangoDB error number for "query ID not found".
pub const ERROR_QUERY_NOT_FOUND: u32 = 1591;

/// ArangoDB error number for a query parse failure.
pub const ERROR_QUERY_PARSE: u32 = 1501;

/// ArangoDB error number for a missing bind parameter.
pub const ERROR_QUERY_BIND_PARAMETER_MISSING: u32 = 1551;

/// Error details reported by the database server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerErrorInfo {
    /// HTTP status code of the response
    pub http_code: u16,
    /// Server-side error number (`errorNum`), if present
    pub error_num: Option<u32>,
    /// Server-side error message
    pub message: String,
}

impl ServerErrorInfo {
    pub fn new(http_code: u16, error_num: Option<u32>, message: impl Into<String>) -> Self {
        Self {
            http_code,
            error_num,
            message: message.into(),
        }
    }

    /// Whether the server error number is in the AQL query range (1500-1599)
    pub fn is_query_error(&self) -> bool {
        matches!(self.error_num, Some(1500..=1599))
    }
}

impl std::fmt::Display for ServerErrorInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.error_num {
            Some(num) => write!(f, "[HTTP {} / {}] {}", self.http_code, num, self.message),
            None => write!(f, "[HTTP {}] {}", self.http_code, self.message),
        }
    }
}

/// Core error type for AQLZ operations
#[derive(Error, Debug)]
pub enum AqlzError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query error: {0}")]
    Query(ServerErrorInfo),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(ServerErrorInfo),

    #[error("Server error: {0}")]
    Server(ServerErrorInfo),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl AqlzError {
    /// Server details, when the error originated from a server response
    pub fn server_info(&self) -> Option<&ServerErrorInfo> {
        match self {
            AqlzError::Query(info) | AqlzError::NotFound(info) | AqlzError::Server(info) => {
                Some(info)
            }
            _ => None,
        }
    }

    /// Server error number (`errorNum`), if any
    pub fn error_num(&self) -> Option<u32> {
        self.server_info().and_then(|info| info.error_num)
    }

    /// HTTP status code, if the error came from a server response
    pub fn http_code(&self) -> Option<u16> {
        self.server_info().map(|info| info.http_code)
    }

    /// Short category name, used for display and logging
    pub fn kind(&self) -> &'static str {
        match self {
            AqlzError::Connection(_) => "connection",
            AqlzError::Query(_) => "query",
            AqlzError::Validation(_) => "validation",
            AqlzError::NotFound(_) => "not_found",
            AqlzError::Server(_) => "server",
            AqlzError::Configuration(_) => "configuration",
            AqlzError::Io(_) => "io",
            AqlzError::Serialization(_) => "serialization",
            AqlzError::Other(_) => "other",
        }
    }
}

/// Result type alias for AQLZ operations
pub type Result<T> = std::result::Result<T, AqlzError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_exposes_error_num() {
        let err = AqlzError::NotFound(ServerErrorInfo::new(
            404,
            Some(ERROR_QUERY_NOT_FOUND),
            "query ID not found",
        ));
        assert_eq!(err.error_num(), Some(1591));
        assert_eq!(err.http_code(), Some(404));
        assert_eq!(err.kind(), "not_found");
        assert_eq!(
            err.to_string(),
            "Not found: [HTTP 404 / 1591] query ID not found"
        );
    }

    #[test]
    fn test_local_errors_have_no_server_info() {
        let err = AqlzError::Validation("unknown tracking property: foo".into());
        assert!(err.server_info().is_none());
        assert_eq!(err.error_num(), None);
        assert_eq!(err.http_code(), None);
    }

    #[test]
    fn test_query_error_range() {
        assert!(ServerErrorInfo::new(400, Some(ERROR_QUERY_PARSE), "syntax").is_query_error());
        assert!(!ServerErrorInfo::new(400, Some(1203), "collection").is_query_error());
        assert!(!ServerErrorInfo::new(500, None, "boom").is_query_error());
    }
}
