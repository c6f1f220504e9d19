use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

use crate::images::ImageError;
use crate::prediction::PredictionError;
use crate::store::StoreError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Email already registered")]
    DuplicateUser,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Model or encoder not loaded")]
    ModelUnavailable,

    #[error("Encoder not fitted properly")]
    EncoderNotReady,

    #[error("Prediction failed: {0}")]
    PredictionFailed(String),

    #[error("Employee {0} not found")]
    EmployeeNotFound(i64),

    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("Image unavailable: {0}")]
    ImageUnavailable(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<PredictionError> for AppError {
    fn from(err: PredictionError) -> Self {
        match err {
            PredictionError::ModelUnavailable => AppError::ModelUnavailable,
            PredictionError::EncoderNotReady => AppError::EncoderNotReady,
            PredictionError::Failed(msg) => AppError::PredictionFailed(msg),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate => AppError::DuplicateUser,
            StoreError::Database(e) => AppError::Database(e),
        }
    }
}

impl From<ImageError> for AppError {
    fn from(err: ImageError) -> Self {
        AppError::ImageUnavailable(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, details): (StatusCode, &str, String, Option<String>) =
            match &self {
                AppError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone(), None)
                }
                AppError::DuplicateUser => (
                    StatusCode::BAD_REQUEST,
                    "DUPLICATE_USER",
                    self.to_string(),
                    None,
                ),
                AppError::InvalidCredentials => (
                    StatusCode::UNAUTHORIZED,
                    "INVALID_CREDENTIALS",
                    self.to_string(),
                    None,
                ),
                AppError::ModelUnavailable => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "MODEL_UNAVAILABLE",
                    self.to_string(),
                    None,
                ),
                AppError::EncoderNotReady => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "ENCODER_NOT_READY",
                    self.to_string(),
                    None,
                ),
                AppError::PredictionFailed(detail) => {
                    tracing::error!("Prediction failed: {detail}");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "PREDICTION_FAILED",
                        "Prediction failed".to_string(),
                        Some(detail.clone()),
                    )
                }
                AppError::EmployeeNotFound(_) => (
                    StatusCode::NOT_FOUND,
                    "EMPLOYEE_NOT_FOUND",
                    "Employee not found".to_string(),
                    None,
                ),
                AppError::Upload(detail) => {
                    tracing::error!("Upload error: {detail}");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "UPLOAD_FAILED",
                        "Upload failed".to_string(),
                        Some(detail.clone()),
                    )
                }
                AppError::ImageUnavailable(detail) => {
                    tracing::warn!("Image request rejected: {detail}");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "IMAGE_UNAVAILABLE",
                        "Image could not be served".to_string(),
                        Some(detail.clone()),
                    )
                }
                AppError::Database(e) => {
                    tracing::error!("Database error: {e}");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "DATABASE_ERROR",
                        "A database error occurred".to_string(),
                        None,
                    )
                }
                AppError::Internal(e) => {
                    tracing::error!("Internal error: {e:?}");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL_ERROR",
                        "An internal server error occurred".to_string(),
                        None,
                    )
                }
            };

        let mut error: Value = json!({
            "code": code,
            "message": message
        });
        if let Some(details) = details {
            error["details"] = Value::String(details);
        }

        let body = Json(json!({
            "success": false,
            "error": error
        }));

        (status, body).into_response()
    }
}
