//! HTTP error envelope

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use revise_core::TrackerError;
use serde_json::json;
use tracing::error;

/// Error response: `{status, message}` with a matching HTTP status
#[derive(Debug)]
pub struct ApiError(pub TrackerError);

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self.0 {
            TrackerError::Validation(_) => StatusCode::BAD_REQUEST,
            TrackerError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<TrackerError> for ApiError {
    fn from(e: TrackerError) -> Self {
        ApiError(e)
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        match e.downcast::<TrackerError>() {
            Ok(tracker) => ApiError(tracker),
            Err(other) => ApiError(TrackerError::Internal(format!("{:#}", other))),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let (label, message) = match &self.0 {
            TrackerError::Unauthorized(msg) => ("unauthorized", msg.clone()),
            TrackerError::Validation(msg) => ("error", msg.clone()),
            other => {
                error!("Request failed: {}", other);
                ("error", other.to_string())
            }
        };

        let body = Json(json!({
            "status": label,
            "message": message,
        }));
        (status, body).into_response()
    }
}
