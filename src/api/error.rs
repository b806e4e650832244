//! HTTP error responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::pagination::PaginationError;
use crate::services::ServiceError;
use crate::storage::StorageError;

/// JSON body of every error response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub status_code: u16,
    pub error: String,
    pub message: String,
    pub timestamp: String,
    pub path: String,
}

/// Error returned by handlers and extractors.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    path: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            path: path.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message, path)
    }

    /// Map a service failure. Server-side faults are logged here and reach
    /// the client only as a generic message.
    pub fn from_service(err: ServiceError, path: &str) -> Self {
        let status = status_for(&err);

        if status.is_server_error() {
            error!(path = %path, error = %err, "Request failed");
            return Self::new(status, "Internal server error", path);
        }
        Self::new(status, err.to_string(), path)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

/// HTTP status for a service error.
pub fn status_for(err: &ServiceError) -> StatusCode {
    match err {
        ServiceError::Backend(_) => StatusCode::BAD_REQUEST,
        ServiceError::Pagination(e) => pagination_status(e),
        ServiceError::Storage(e) => match e {
            StorageError::NotFound(_) => StatusCode::NOT_FOUND,
            StorageError::AlreadyExists(_) => StatusCode::CONFLICT,
            StorageError::Invalid(_) => StatusCode::BAD_REQUEST,
            StorageError::Pagination(e) => pagination_status(e),
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        },
    }
}

fn pagination_status(err: &PaginationError) -> StatusCode {
    match err {
        PaginationError::InvalidToken(_) | PaginationError::UnsupportedAttribute(_) => {
            StatusCode::BAD_REQUEST
        }
        PaginationError::Encoding(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            status_code: self.status.as_u16(),
            error: self
                .status
                .canonical_reason()
                .unwrap_or("Error")
                .to_string(),
            message: self.message,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            path: self.path,
        };
        (self.status, Json(body)).into_response()
    }
}
