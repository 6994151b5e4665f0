//! Typed errors and the centralized HTTP error response.

use crate::schema::ValidationErrors;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing reference: {kind} '{id}'")]
    MissingReference { kind: &'static str, id: String },
    #[error("duplicate path segment: {0}")]
    DuplicatePathSegment(String),
    #[error("duplicate field '{field}' in collection '{collection}'")]
    DuplicateField { collection: String, field: String },
    #[error("config load: {0}")]
    Load(String),
    #[error("validation: {0}")]
    Validation(String),
}

/// Failures raised by a document store backend.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{0}")]
    Validation(ValidationErrors),
    #[error("Invalid {path}: {value}")]
    Cast { path: String, value: String },
    #[error("duplicate value for '{field}': {value}")]
    Duplicate { field: String, value: String },
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("store lock poisoned")]
    Poisoned,
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    PayloadTooLarge(String),
    /// Forwarded unchanged from the store; classified only here, at the response boundary.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AppError {
    pub fn not_found_id(id: &str) -> Self {
        AppError::NotFound(format!("No document found for this id: {}", id))
    }

    pub fn invalid_input(errors: &ValidationErrors) -> Self {
        AppError::BadRequest(format!("Invalid input: {}", errors.joined()))
    }

    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AppError::PayloadTooLarge(_) => (StatusCode::PAYLOAD_TOO_LARGE, "payload_too_large"),
            AppError::Store(e) => match e {
                StoreError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
                StoreError::Cast { .. } => (StatusCode::BAD_REQUEST, "invalid_id"),
                StoreError::Duplicate { .. } => (StatusCode::CONFLICT, "duplicate"),
                StoreError::Db(_) | StoreError::Poisoned => (StatusCode::INTERNAL_SERVER_ERROR, "database_error"),
            },
        }
    }
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub status: &'static str,
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let message = if status.is_server_error() {
            tracing::error!(error = %self, code, "request failed");
            "Something went wrong".to_string()
        } else {
            tracing::warn!(error = %self, code, status = status.as_u16(), "request rejected");
            self.to_string()
        };
        let body = ErrorBody {
            status: if status.is_client_error() { "fail" } else { "error" },
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };
        (status, Json(body)).into_response()
    }
}
