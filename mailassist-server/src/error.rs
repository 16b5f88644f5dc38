//! HTTP error responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

pub const QUOTA_MESSAGE: &str = "Daily API quota exceeded. Please try again tomorrow.";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{QUOTA_MESSAGE}")]
    QuotaExceeded { limit: u32, model: String },

    #[error("{0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, json!({ "error": "bad_request", "message": message }))
            }
            ApiError::QuotaExceeded { limit, model } => (
                StatusCode::TOO_MANY_REQUESTS,
                json!({
                    "error": "quota_exceeded",
                    "message": QUOTA_MESSAGE,
                    "limit": limit,
                    "model": model,
                }),
            ),
            ApiError::Internal(message) => {
                (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": "internal_error", "message": message }))
            }
        };
        (status, Json(body)).into_response()
    }
}
