//! API error responses
//!
//! Every error body has the shape `{"status": "error", "message": ...}`;
//! rejected reloads also carry the full `issues` list.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use mspec_common::mapping::{ConfigError, ValidationIssue};
use serde_json::json;
use tracing::error;

#[derive(Debug)]
pub enum ApiError {
    /// Malformed or empty request
    BadRequest(String),
    /// Missing or unconfigured `X-Source`
    InvalidSource { known: Vec<String> },
    NotFound(String),
    /// Mapping reload failed; the previous configuration is still active
    ReloadRejected(ConfigError),
    Internal(anyhow::Error),
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Internal(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, issues): (StatusCode, String, &[ValidationIssue]) = match &self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message.clone(), &[]),
            ApiError::InvalidSource { known } => (
                StatusCode::BAD_REQUEST,
                format!("Invalid or missing X-Source header. Valid sources: [{}]", known.join(", ")),
                &[],
            ),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message.clone(), &[]),
            ApiError::ReloadRejected(err) => (StatusCode::UNPROCESSABLE_ENTITY, err.to_string(), err.issues()),
            ApiError::Internal(err) => {
                error!("Request failed: {:#}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string(), &[])
            }
        };

        let mut body = json!({
            "status": "error",
            "message": message,
        });
        if !issues.is_empty() {
            body["issues"] = json!(issues);
        }

        (status, Json(body)).into_response()
    }
}
