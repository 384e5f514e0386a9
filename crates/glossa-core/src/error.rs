//! Error types module
//!
//! This module provides the core error types used throughout the Glossa
//! application. All errors are unified under the `AppError` enum which can
//! represent database, state-machine, quota, and collaborator errors.

use std::io;

use sqlx::Error as SqlxError;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues like quota limits
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented
/// This trait allows errors to self-describe their HTTP response characteristics
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "QUOTA_EXCEEDED")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the client
    fn suggested_action(&self) -> Option<&'static str>;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether details should be hidden in production
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[source] SqlxError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid transition: cannot {operation} while {state}")]
    InvalidTransition { state: String, operation: String },

    #[error("Quiz has already been submitted")]
    AlreadySubmitted,

    #[error("Invalid answer count: expected {expected}, received {received}")]
    InvalidAnswerCount { expected: usize, received: usize },

    #[error("Quota exceeded: {resource} usage {used}/{limit}")]
    QuotaExceeded {
        resource: String,
        used: i64,
        limit: i64,
    },

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Content generation failed: {0}")]
    GenerationFailed(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

// Error conversion implementations
impl From<SqlxError> for AppError {
    fn from(err: SqlxError) -> Self {
        AppError::Database(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput(format!("JSON parsing error: {}", err))
    }
}

impl From<uuid::Error> for AppError {
    fn from(err: uuid::Error) -> Self {
        AppError::InvalidInput(format!("UUID parsing error: {}", err))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::InvalidInput(format!("Validation error: {}", err))
    }
}

/// Static metadata for each variant: (http_status, error_code, recoverable, suggested_action, sensitive, log_level).
/// Reduces duplication in ErrorMetadata impl; client_message stays per-variant for dynamic content.
fn app_error_static_metadata(
    err: &AppError,
) -> (
    u16,
    &'static str,
    bool,
    Option<&'static str>,
    bool,
    LogLevel,
) {
    match err {
        AppError::Database(_) => (
            500,
            "DATABASE_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::NotFound(_) => (
            404,
            "NOT_FOUND",
            false,
            Some("Verify the resource ID exists"),
            false,
            LogLevel::Debug,
        ),
        AppError::InvalidInput(_) => (
            400,
            "INVALID_INPUT",
            false,
            Some("Check request parameters and try again"),
            false,
            LogLevel::Debug,
        ),
        AppError::InvalidTransition { .. } => (
            409,
            "INVALID_TRANSITION",
            false,
            Some("Re-read the resource state before retrying"),
            false,
            LogLevel::Debug,
        ),
        AppError::AlreadySubmitted => (
            409,
            "ALREADY_SUBMITTED",
            false,
            Some("Fetch the quiz to see the recorded score"),
            false,
            LogLevel::Debug,
        ),
        AppError::InvalidAnswerCount { .. } => (
            400,
            "INVALID_ANSWER_COUNT",
            false,
            Some("Submit exactly one answer per question"),
            false,
            LogLevel::Debug,
        ),
        AppError::QuotaExceeded { .. } => (
            402,
            "QUOTA_EXCEEDED",
            false,
            Some("Upgrade plan or wait for the weekly reset"),
            false,
            LogLevel::Warn,
        ),
        AppError::AccessDenied(_) => (
            403,
            "ACCESS_DENIED",
            false,
            Some("Upgrade plan to access this feature"),
            false,
            LogLevel::Debug,
        ),
        AppError::GenerationFailed(_) => (
            502,
            "GENERATION_FAILED",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Warn,
        ),
        AppError::Conflict(_) => (
            409,
            "CONFLICT",
            true,
            Some("Retry the request"),
            false,
            LogLevel::Warn,
        ),
        AppError::ServiceUnavailable(_) => (
            503,
            "SERVICE_UNAVAILABLE",
            true,
            Some("Wait 30-60 seconds and retry"),
            false,
            LogLevel::Warn,
        ),
        AppError::Unauthorized(_) => (
            401,
            "UNAUTHORIZED",
            false,
            Some("Check authentication token"),
            false,
            LogLevel::Debug,
        ),
        AppError::Internal(_) => (
            500,
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::InternalWithSource { .. } => (
            500,
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
    }
}

impl AppError {
    /// Get the error type name for detailed error responses
    pub fn error_type(&self) -> &str {
        match self {
            AppError::Database(_) => "Database",
            AppError::NotFound(_) => "NotFound",
            AppError::InvalidInput(_) => "InvalidInput",
            AppError::InvalidTransition { .. } => "InvalidTransition",
            AppError::AlreadySubmitted => "AlreadySubmitted",
            AppError::InvalidAnswerCount { .. } => "InvalidAnswerCount",
            AppError::QuotaExceeded { .. } => "QuotaExceeded",
            AppError::AccessDenied(_) => "AccessDenied",
            AppError::GenerationFailed(_) => "GenerationFailed",
            AppError::Conflict(_) => "Conflict",
            AppError::ServiceUnavailable(_) => "ServiceUnavailable",
            AppError::Unauthorized(_) => "Unauthorized",
            AppError::Internal(_) => "Internal",
            AppError::InternalWithSource { .. } => "Internal",
        }
    }

    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        // Add source error chain
        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn suggested_action(&self) -> Option<&'static str> {
        app_error_static_metadata(self).3
    }

    fn is_sensitive(&self) -> bool {
        app_error_static_metadata(self).4
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).5
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Database(_) => "Failed to access database".to_string(),
            AppError::NotFound(ref msg) => msg.clone(),
            AppError::InvalidInput(ref msg) => msg.clone(),
            AppError::InvalidTransition { state, operation } => {
                format!("Cannot {} while {}", operation, state)
            }
            AppError::AlreadySubmitted => "Quiz has already been submitted".to_string(),
            AppError::InvalidAnswerCount { expected, received } => {
                format!(
                    "Invalid answer count: expected {}, received {}",
                    expected, received
                )
            }
            AppError::QuotaExceeded {
                resource,
                used,
                limit,
            } => {
                format!("Quota exceeded: {} usage {}/{}", resource, used, limit)
            }
            AppError::AccessDenied(ref msg) => msg.clone(),
            AppError::GenerationFailed(_) => "Content generation failed".to_string(),
            AppError::Conflict(ref msg) => msg.clone(),
            AppError::ServiceUnavailable(ref msg) => msg.clone(),
            AppError::Unauthorized(ref msg) => msg.clone(),
            AppError::Internal(_) => "Internal server error".to_string(),
            AppError::InternalWithSource { .. } => "Internal server error".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_metadata_database() {
        let err = AppError::from(sqlx::Error::PoolClosed);
        assert_eq!(err.http_status_code(), 500);
        assert_eq!(err.error_code(), "DATABASE_ERROR");
        assert!(err.is_recoverable());
        assert_eq!(err.client_message(), "Failed to access database");
        assert!(err.is_sensitive());
        assert_eq!(err.log_level(), LogLevel::Error);
    }

    #[test]
    fn test_error_metadata_not_found() {
        let err = AppError::NotFound("Material not found".to_string());
        assert_eq!(err.http_status_code(), 404);
        assert_eq!(err.error_code(), "NOT_FOUND");
        assert!(!err.is_recoverable());
        assert_eq!(err.client_message(), "Material not found");
        assert!(!err.is_sensitive());
        assert_eq!(err.log_level(), LogLevel::Debug);
    }

    #[test]
    fn test_error_metadata_quota_exceeded() {
        let err = AppError::QuotaExceeded {
            resource: "weekly uploads".to_string(),
            used: 1,
            limit: 1,
        };
        assert_eq!(err.http_status_code(), 402);
        assert_eq!(err.error_code(), "QUOTA_EXCEEDED");
        assert!(!err.is_recoverable());
        assert!(err.client_message().contains("weekly uploads"));
        assert!(err.client_message().contains("1/1"));
        assert_eq!(err.log_level(), LogLevel::Warn);
    }

    #[test]
    fn test_error_metadata_invalid_transition() {
        let err = AppError::InvalidTransition {
            state: "processing".to_string(),
            operation: "start ingestion".to_string(),
        };
        assert_eq!(err.http_status_code(), 409);
        assert_eq!(err.error_code(), "INVALID_TRANSITION");
        assert_eq!(err.client_message(), "Cannot start ingestion while processing");
    }

    #[test]
    fn test_error_metadata_already_submitted() {
        let err = AppError::AlreadySubmitted;
        assert_eq!(err.http_status_code(), 409);
        assert_eq!(err.error_code(), "ALREADY_SUBMITTED");
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_error_metadata_generation_failed_is_sensitive() {
        let err = AppError::GenerationFailed("provider returned 500".to_string());
        assert_eq!(err.http_status_code(), 502);
        assert_eq!(err.error_code(), "GENERATION_FAILED");
        assert!(err.is_recoverable());
        assert!(err.is_sensitive());
        assert_eq!(err.client_message(), "Content generation failed");
    }

    #[test]
    fn test_error_metadata_conflict_is_retryable() {
        let err = AppError::Conflict("flashcard was reviewed concurrently".to_string());
        assert_eq!(err.http_status_code(), 409);
        assert_eq!(err.error_code(), "CONFLICT");
        assert!(err.is_recoverable());
        assert_eq!(err.suggested_action(), Some("Retry the request"));
    }

    #[test]
    fn test_error_metadata_suggested_actions() {
        let err1 = AppError::Database(sqlx::Error::PoolClosed);
        assert_eq!(err1.suggested_action(), Some("Retry after a short delay"));

        let err2 = AppError::NotFound("test".to_string());
        assert_eq!(
            err2.suggested_action(),
            Some("Verify the resource ID exists")
        );

        let err3 = AppError::AccessDenied("chat is a Pro feature".to_string());
        assert_eq!(
            err3.suggested_action(),
            Some("Upgrade plan to access this feature")
        );
    }
}
