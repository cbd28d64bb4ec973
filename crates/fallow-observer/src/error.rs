//! Error types for the API server.
//!
//! [`OperatorApiError`] unifies all failure modes into a single enum that
//! can be converted into an Axum HTTP response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use fallow_core::engine::GrowthError;

/// Errors that can occur in the API layer.
#[derive(Debug, thiserror::Error)]
pub enum OperatorApiError {
    /// The requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// The request body or parameters were invalid.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A UUID could not be parsed from the request path.
    #[error("invalid UUID: {0}")]
    InvalidUuid(String),

    /// The request conflicts with the state of the run.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The tick loop did not answer in time.
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// An internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<GrowthError> for OperatorApiError {
    fn from(err: GrowthError) -> Self {
        match err {
            GrowthError::WorldNotRunning(_) => Self::NotFound(err.to_string()),
            GrowthError::NoRunningWorld => Self::Conflict(err.to_string()),
            GrowthError::InvalidMinutes(_) => Self::InvalidRequest(err.to_string()),
        }
    }
}

impl IntoResponse for OperatorApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::InvalidRequest(msg) | Self::InvalidUuid(msg) => {
                (StatusCode::BAD_REQUEST, msg.clone())
            }
            Self::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            Self::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone()),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = serde_json::json!({
            "error": message,
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}
