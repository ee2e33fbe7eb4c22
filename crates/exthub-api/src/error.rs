//! Maps domain `AppError` to HTTP responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use exthub_core::error::{AppError, ErrorKind};

/// Standard API error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    /// Machine-readable error code.
    pub error: String,
    /// Human-readable message.
    pub message: String,
}

/// Newtype carrying an `AppError` across the Axum boundary.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

/// HTTP status for a domain error kind.
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::DuplicateName | ErrorKind::AlreadyRunning | ErrorKind::RouteConflict => {
            StatusCode::CONFLICT
        }
        ErrorKind::InvalidMetadata | ErrorKind::Validation | ErrorKind::Configuration => {
            StatusCode::BAD_REQUEST
        }
        ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorKind::PermissionDenied => StatusCode::FORBIDDEN,
        ErrorKind::QuotaExceeded => StatusCode::TOO_MANY_REQUESTS,
        ErrorKind::DependencyOrder => StatusCode::CONFLICT,
        ErrorKind::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::Lifecycle
        | ErrorKind::Migration
        | ErrorKind::Database
        | ErrorKind::Storage
        | ErrorKind::Serialization
        | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(self.0.kind);
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self.0, "Internal server error");
        }

        let body = ApiErrorResponse {
            error: self.0.kind.to_string(),
            message: self.0.message,
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quota_errors_map_to_429() {
        assert_eq!(
            status_for(ErrorKind::QuotaExceeded),
            StatusCode::TOO_MANY_REQUESTS
        );
    }

    #[test]
    fn conflict_kinds_map_to_409() {
        for kind in [
            ErrorKind::DuplicateName,
            ErrorKind::AlreadyRunning,
            ErrorKind::RouteConflict,
            ErrorKind::DependencyOrder,
        ] {
            assert_eq!(status_for(kind), StatusCode::CONFLICT);
        }
    }
}
