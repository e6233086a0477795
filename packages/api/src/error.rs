// ABOUTME: Application error type shared by every HTTP handler
// ABOUTME: Maps domain failures to status codes and a structured JSON body carrying the request id

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use prdsmith_ideate::IdeateError;
use prdsmith_storage::StorageError;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info};

use crate::request_context::current_request_id;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Unauthorized")]
    Unauthorized,

    /// Missing, or owned by another account
    #[error("{0} not found")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// Provider failure after the retry policy gave up
    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("Storage error")]
    Storage(StorageError),

    #[error("Internal server error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: ErrorDetail,
    request_id: String,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: String,
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            AppError::Generation(_) => (StatusCode::INTERNAL_SERVER_ERROR, "GENERATION_FAILED"),
            AppError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }

    /// Message safe to return to the caller
    fn user_message(&self) -> String {
        match self {
            AppError::Unauthorized => "Unauthorized".to_string(),
            AppError::NotFound(what) => format!("{} not found", what),
            AppError::Validation(msg) => msg.clone(),
            AppError::Generation(msg) => msg.clone(),
            AppError::Storage(_) => "Data storage error".to_string(),
            AppError::Internal(_) => "Internal Error".to_string(),
        }
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(what) => AppError::NotFound(what),
            StorageError::InvalidInput(msg) => AppError::Validation(msg),
            other => AppError::Storage(other),
        }
    }
}

impl From<IdeateError> for AppError {
    fn from(err: IdeateError) -> Self {
        match err {
            IdeateError::NotFound(what) => AppError::NotFound(what),
            IdeateError::InvalidInput(msg) => AppError::Validation(msg),
            IdeateError::AIService(err) => AppError::Generation(err.user_message()),
            IdeateError::Storage(err) => AppError::Storage(err),
            IdeateError::Prompt(err) => AppError::Internal(err.to_string()),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let request_id = current_request_id();
        let (status, code) = self.status_and_code();

        match &self {
            AppError::Storage(err) => {
                error!(request_id = %request_id, storage_error = %err, "Storage system error");
            }
            AppError::Internal(msg) => {
                error!(request_id = %request_id, error = %msg, "Internal server error occurred");
            }
            AppError::Generation(msg) => {
                error!(request_id = %request_id, error = %msg, "Generation failed");
            }
            _ => {
                info!(request_id = %request_id, error_code = %code, error = %self, "API error response");
            }
        }

        let body = ErrorResponse {
            success: false,
            error: ErrorDetail {
                code,
                message: self.user_message(),
            },
            request_id,
        };

        (status, Json(body)).into_response()
    }
}
