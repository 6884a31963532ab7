use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

/// API errors
#[derive(Debug, Error)]
pub enum ApiError {
    /// No row matches the lookup (404)
    #[error("{0}")]
    NotFound(String),

    /// Store failure (500)
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(message) => {
                warn!("{}", message);
                (StatusCode::NOT_FOUND, message)
            }
            ApiError::Internal(err) => {
                error!("Lookup failed: {:#}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal error".to_string(),
                )
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
