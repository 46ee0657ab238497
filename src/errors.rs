use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

/// Message for a body that parsed but is neither an object nor an array.
pub const INVALID_DATA_FORMAT: &str = "Invalid data format";

/// Standard error response body.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Always "error"
    pub status: String,
    /// Human-readable error message
    pub message: String,
}

/// Request-level failures. Per-reading relay failures are not errors here;
/// they are reported as outcomes inside the aggregate result.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("No data received")]
    EmptyBody,

    #[error("{0}")]
    MalformedInput(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::EmptyBody | AppError::MalformedInput(_) => {
                tracing::debug!("Rejected request: {}", self);
                StatusCode::BAD_REQUEST
            }
            AppError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (
            status,
            axum::Json(ErrorResponse {
                status: "error".to_string(),
                message: self.to_string(),
            }),
        )
            .into_response()
    }
}
