//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Message sent to clients in place of any 500 error.
pub const INTERNAL_ERROR_MESSAGE: &str = "An unexpected internal error occurred. Please try again.";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid collection name: '{0}'")]
    InvalidCollection(String),
    #[error("invalid dial parameter {name}: {reason}")]
    Dial { name: &'static str, reason: String },
    #[error("collection '{0}' is already mounted")]
    DuplicateCollection(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("missing request context value '{0}'")]
    MissingContext(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl AppError {
    /// Suggested HTTP status for this error when a caller does not pick one.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Db(sqlx::Error::RowNotFound) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Config(_)
            | AppError::Db(_)
            | AppError::Json(_)
            | AppError::MissingContext(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// True for driver errors that mean "no such document".
    pub fn is_not_found(&self) -> bool {
        self.status_code() == StatusCode::NOT_FOUND
    }
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

/// Machine-readable code for a status emitted by the error handler.
pub fn error_code(status: StatusCode) -> &'static str {
    match status {
        StatusCode::BAD_REQUEST => "bad_request",
        StatusCode::UNAUTHORIZED => "unauthorized",
        StatusCode::FORBIDDEN => "forbidden",
        StatusCode::NOT_FOUND => "not_found",
        StatusCode::CONFLICT => "conflict",
        StatusCode::PAYLOAD_TOO_LARGE => "payload_too_large",
        StatusCode::UNPROCESSABLE_ENTITY => "validation_error",
        s if s.is_server_error() => "internal_error",
        _ => "error",
    }
}

/// Builds the JSON error response. 500s never leak the underlying message.
pub fn error_response(status: StatusCode, message: String) -> Response {
    let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
        INTERNAL_ERROR_MESSAGE.to_string()
    } else {
        message
    };
    let body = ErrorBody {
        error: ErrorDetail {
            code: error_code(status).to_string(),
            message,
        },
    };
    (status, Json(body)).into_response()
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "internal error");
        }
        error_response(status, self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_not_found_maps_to_404() {
        assert_eq!(AppError::Db(sqlx::Error::RowNotFound).status_code(), StatusCode::NOT_FOUND);
        assert!(AppError::NotFound("x".into()).is_not_found());
    }

    #[test]
    fn other_driver_errors_map_to_500() {
        let err = AppError::Db(sqlx::Error::PoolTimedOut);
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.is_not_found());
    }

    #[test]
    fn bad_request_maps_to_400() {
        assert_eq!(AppError::BadRequest("nope".into()).status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn error_codes_follow_status() {
        assert_eq!(error_code(StatusCode::NOT_FOUND), "not_found");
        assert_eq!(error_code(StatusCode::BAD_GATEWAY), "internal_error");
        assert_eq!(error_code(StatusCode::IM_A_TEAPOT), "error");
    }
}
