use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::domain::{MoneyError, ValidationError};
use crate::engine::FeeError;
use crate::orchestration::ServiceError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Internal server error: {0}")]
    Internal(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Unprocessable: {0}")]
    Unprocessable(String),
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl From<MoneyError> for AppError {
    fn from(err: MoneyError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl From<FeeError> for AppError {
    fn from(err: FeeError) -> Self {
        match err {
            FeeError::NoApplicableRule { .. } => AppError::Unprocessable(err.to_string()),
            FeeError::NegativeAmount | FeeError::Money(_) => AppError::BadRequest(err.to_string()),
        }
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Validation(e) => e.into(),
            ServiceError::Fee(e) => e.into(),
            ServiceError::NotFound(what) => AppError::NotFound(what),
            ServiceError::AlreadyRecorded(_) | ServiceError::DuplicateReference(_) => {
                AppError::Conflict(err.to_string())
            }
            ServiceError::Db(e) => e.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::Unprocessable(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
        };

        if status.is_server_error() {
            tracing::error!(error = %error_message, "Request failed");
        }

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}
