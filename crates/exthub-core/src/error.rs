//! Unified application error types for ExtHub.
//!
//! All crates map their internal errors into [`AppError`] for consistent
//! propagation through the ? operator.

use std::fmt;
use thiserror::Error;

/// Top-level error kind categorization used across the entire application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// The requested extension or resource was not found.
    NotFound,
    /// An extension with the same name is already registered.
    DuplicateName,
    /// Required extension metadata fields are missing or malformed.
    InvalidMetadata,
    /// The extension is already running.
    AlreadyRunning,
    /// A mounted route collides with another running extension's routes.
    RouteConflict,
    /// No caller identity was provided where one is required.
    Unauthorized,
    /// The caller does not hold a capability matching the resource/action.
    PermissionDenied,
    /// A per-extension quota ceiling was exceeded.
    QuotaExceeded,
    /// An extension lifecycle entry point (initialize/start/stop) failed.
    Lifecycle,
    /// A schema migration failed.
    Migration,
    /// A rollback targets a version still depended on by a later one.
    DependencyOrder,
    /// Input validation failed.
    Validation,
    /// A configuration error occurred.
    Configuration,
    /// A database error occurred.
    Database,
    /// A storage I/O error occurred.
    Storage,
    /// A serialization/deserialization error occurred.
    Serialization,
    /// An internal server error occurred.
    Internal,
    /// The service is temporarily unavailable.
    ServiceUnavailable,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "NOT_FOUND"),
            Self::DuplicateName => write!(f, "DUPLICATE_NAME"),
            Self::InvalidMetadata => write!(f, "INVALID_METADATA"),
            Self::AlreadyRunning => write!(f, "ALREADY_RUNNING"),
            Self::RouteConflict => write!(f, "ROUTE_CONFLICT"),
            Self::Unauthorized => write!(f, "UNAUTHORIZED"),
            Self::PermissionDenied => write!(f, "PERMISSION_DENIED"),
            Self::QuotaExceeded => write!(f, "QUOTA_EXCEEDED"),
            Self::Lifecycle => write!(f, "LIFECYCLE"),
            Self::Migration => write!(f, "MIGRATION"),
            Self::DependencyOrder => write!(f, "DEPENDENCY_ORDER"),
            Self::Validation => write!(f, "VALIDATION"),
            Self::Configuration => write!(f, "CONFIGURATION"),
            Self::Database => write!(f, "DATABASE"),
            Self::Storage => write!(f, "STORAGE"),
            Self::Serialization => write!(f, "SERIALIZATION"),
            Self::Internal => write!(f, "INTERNAL"),
            Self::ServiceUnavailable => write!(f, "SERVICE_UNAVAILABLE"),
        }
    }
}

/// The unified application error used throughout ExtHub.
///
/// All crate-specific errors are mapped into `AppError` using `From` impls
/// or explicit `.map_err()` calls. This provides a single error type for
/// the entire application boundary.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    /// The category of error.
    pub kind: ErrorKind,
    /// A human-readable error message.
    pub message: String,
    /// Optional underlying cause.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new application error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Create a new application error with an underlying cause.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Create a duplicate-name error.
    pub fn duplicate_name(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::DuplicateName, message)
    }

    /// Create an invalid-metadata error.
    pub fn invalid_metadata(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidMetadata, message)
    }

    /// Create an already-running error.
    pub fn already_running(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::AlreadyRunning, message)
    }

    /// Create a route-conflict error.
    pub fn route_conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RouteConflict, message)
    }

    /// Create an unauthorized error.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, message)
    }

    /// Create a permission-denied error.
    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::PermissionDenied, message)
    }

    /// Create a quota-exceeded error.
    pub fn quota_exceeded(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::QuotaExceeded, message)
    }

    /// Create a lifecycle error.
    pub fn lifecycle(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Lifecycle, message)
    }

    /// Create a migration error.
    pub fn migration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Migration, message)
    }

    /// Create a dependency-order error.
    pub fn dependency_order(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::DependencyOrder, message)
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Create a database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Database, message)
    }

    /// Create a storage error.
    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Storage, message)
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Create a service-unavailable error.
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ServiceUnavailable, message)
    }
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            message: self.message.clone(),
            source: None,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(
            ErrorKind::Serialization,
            format!("JSON serialization error: {err}"),
            err,
        )
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::with_source(ErrorKind::Storage, format!("I/O error: {err}"), err)
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("Configuration error: {err}"),
            err,
        )
    }
}

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        Self::with_source(ErrorKind::Database, format!("Database error: {err}"), err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_display_is_screaming_snake() {
        assert_eq!(ErrorKind::RouteConflict.to_string(), "ROUTE_CONFLICT");
        assert_eq!(ErrorKind::QuotaExceeded.to_string(), "QUOTA_EXCEEDED");
    }

    #[test]
    fn constructors_set_kind() {
        let err = AppError::duplicate_name("extension already registered: webhooks");
        assert_eq!(err.kind, ErrorKind::DuplicateName);
        assert!(err.to_string().contains("webhooks"));
    }
}
