use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::candidates::store::StoreError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
///
/// Each variant renders the JSON body clients of the job endpoints already
/// expect, so the shapes differ between the upload errors (`status`/`message`)
/// and the session lookups (`error`).
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid session_id")]
    SessionNotFound,

    #[error("Result not ready")]
    ResultNotReady,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Candidate store error: {0}")]
    Store(#[from] StoreError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                json!({ "status": "error", "message": msg }),
            ),
            AppError::SessionNotFound => (
                StatusCode::NOT_FOUND,
                json!({ "error": "Invalid session_id" }),
            ),
            AppError::ResultNotReady => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "Result not ready" }),
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, json!({ "error": msg })),
            AppError::Store(e) => {
                let e = anyhow::Error::from(e);
                tracing::error!("Candidate store error: {e:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({
                        "status": "error",
                        "message": "A storage error occurred",
                        "details": format!("{e:#}"),
                    }),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({
                        "status": "error",
                        "message": "Internal Server Error",
                        "details": format!("{e:#}"),
                    }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
