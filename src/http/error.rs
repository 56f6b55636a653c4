use crate::refresh::RefreshError;
use crate::storage::StorageError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

/// Everything a handler can fail with. Only not-found and upstream failures are
/// described to the client; the rest collapse into a bare 500.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    NotFound(&'static str),

    #[error(transparent)]
    Refresh(#[from] RefreshError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::NotFound(what) => {
                (StatusCode::NOT_FOUND, Json(json!({ "error": what }))).into_response()
            }
            AppError::Refresh(RefreshError::Upstream(e)) => {
                let details = if e.is_timeout() {
                    "External API timeout".to_string()
                } else {
                    format!("Could not fetch data from {}", e.api())
                };
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    Json(json!({
                        "error": "External data source unavailable",
                        "details": details,
                    })),
                )
                    .into_response()
            }
            other => {
                log::error!("request failed: {other}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Internal Server Error" })),
                )
                    .into_response()
            }
        }
    }
}
