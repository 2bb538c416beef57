use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::capability::CapabilityDenied;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    /// Missing or malformed request fields. The caller must fix the request.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Extraction succeeded but produced too little text to evaluate.
    #[error("Insufficient text: extracted {0} characters")]
    InsufficientText(usize),

    #[error("Extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("Analysis failed: {0}")]
    AnalysisFailed(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Provider credentials are missing or misconfigured. Operator-fixable.
    #[error("Provider precondition failed: {0}")]
    ProviderPrecondition(String),

    #[error("AI capability denied: {0}")]
    CapabilityDenied(#[from] CapabilityDenied),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Stable machine-readable code rendered in the error body.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::InvalidInput(_) => "INVALID_INPUT",
            AppError::InsufficientText(_) => "INSUFFICIENT_TEXT",
            AppError::ExtractionFailed(_) => "EXTRACTION_FAILED",
            AppError::AnalysisFailed(_) => "ANALYSIS_FAILED",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::ProviderPrecondition(_) => "PROVIDER_PRECONDITION",
            AppError::CapabilityDenied(_) => "CAPABILITY_DENIED",
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::Storage(_) => "STORAGE_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.code();
        let (status, message) = match &self {
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::InsufficientText(_) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "Not enough readable text could be extracted from the resume".to_string(),
            ),
            AppError::ExtractionFailed(msg) => {
                tracing::error!("Extraction error: {msg}");
                (
                    StatusCode::BAD_GATEWAY,
                    "The resume could not be downloaded or read".to_string(),
                )
            }
            AppError::AnalysisFailed(msg) => {
                tracing::error!("Analysis error: {msg}");
                (
                    StatusCode::BAD_GATEWAY,
                    "An AI processing error occurred".to_string(),
                )
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::ProviderPrecondition(msg) => {
                tracing::error!("Provider precondition: {msg}");
                (StatusCode::SERVICE_UNAVAILABLE, msg.clone())
            }
            AppError::CapabilityDenied(reason) => (StatusCode::FORBIDDEN, reason.to_string()),
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "A database error occurred".to_string(),
                )
            }
            AppError::Storage(msg) => {
                tracing::error!("Storage error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "A storage error occurred".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
