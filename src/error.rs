//! Error types for the Pacuare MCP Server.
//!
//! This module defines all error types using `thiserror` for ergonomic error handling.
//! Execution faults reported by the Pacuare API keep their status code as structured
//! data so the tool layer can translate them without parsing strings.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    /// The Pacuare API rejected the statement. Only the status is shown to callers.
    #[error("query returned status {status}")]
    Execution {
        status: u16,
        /// Response body from the API, kept for logs
        detail: String,
    },

    #[error("Connection failed: {message}")]
    Connection { message: String, suggestion: String },

    #[error("Invalid response from database API: {message}")]
    Decode { message: String },

    #[error("Invalid configuration: {message}")]
    Configuration { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DbError {
    /// Create an execution fault carrying the API status.
    pub fn execution(status: u16, detail: impl Into<String>) -> Self {
        Self::Execution {
            status,
            detail: detail.into(),
        }
    }

    /// Create a connection error with a helpful suggestion.
    pub fn connection(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Status code of an execution fault, if this is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Execution { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Connection { suggestion, .. } => Some(suggestion),
            Self::Decode { .. } => Some("Check that --api-url points at the Pacuare API"),
            _ => None,
        }
    }
}

/// Convert reqwest errors to DbError.
impl From<reqwest::Error> for DbError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return DbError::execution(status.as_u16(), err.to_string());
        }
        if err.is_decode() {
            DbError::decode(err.to_string())
        } else if err.is_timeout() {
            DbError::connection(
                format!("Request timed out: {}", err),
                "Retry the query or simplify it",
            )
        } else if err.is_builder() {
            DbError::internal(format!("Failed to build request: {}", err))
        } else {
            DbError::connection(
                format!("Request to database API failed: {}", err),
                "Check network connectivity and the --api-url setting",
            )
        }
    }
}

/// Result type alias for database operations.
pub type DbResult<T> = Result<T, DbError>;

/// Build suggestion data as JSON value.
fn suggestion_data(suggestion: Option<&str>) -> Option<serde_json::Value> {
    suggestion.map(|s| serde_json::json!({ "suggestion": s }))
}

/// Convert DbError to MCP ErrorData for faults that are not reported as tool errors.
impl From<DbError> for rmcp::ErrorData {
    fn from(err: DbError) -> Self {
        match &err {
            DbError::Configuration { .. } => {
                rmcp::ErrorData::invalid_params(err.to_string(), suggestion_data(err.suggestion()))
            }
            DbError::Execution { status, .. } => rmcp::ErrorData::internal_error(
                err.to_string(),
                Some(serde_json::json!({ "status": status })),
            ),
            DbError::Connection { .. } | DbError::Decode { .. } | DbError::Internal { .. } => {
                rmcp::ErrorData::internal_error(err.to_string(), suggestion_data(err.suggestion()))
            }
        }
    }
}
