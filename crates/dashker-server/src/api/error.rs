//! HTTP-facing error type.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::warn;

use crate::runtime::RuntimeError;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Lookup matched nothing; answered with an empty object.
    #[error("not found")]
    NotFound,

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::NotFound => (StatusCode::NOT_FOUND, Json(json!({}))).into_response(),
            Self::Runtime(err) => {
                let status = match &err {
                    RuntimeError::InvalidId(_) => StatusCode::BAD_REQUEST,
                    RuntimeError::Api { status, .. } if (400..500).contains(status) => {
                        StatusCode::from_u16(*status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
                    }
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };
                if status.is_server_error() {
                    warn!(error = %err, "Runtime request failed");
                }
                let message = match &err {
                    RuntimeError::Api { message, .. } => message.clone(),
                    other => other.to_string(),
                };
                (status, Json(json!({ "error": message }))).into_response()
            }
        }
    }
}
