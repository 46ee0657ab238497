//! Folding per-reading outcomes into one response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::services::relay::BatchOutcome;

const ALL_SENT_MESSAGE: &str = "All data sent successfully";
const NONE_SENT_MESSAGE: &str = "Failed to send data";

/// Overall status of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AggregateStatus {
    Success,
    Partial,
    Error,
}

impl AggregateStatus {
    pub fn status_code(self) -> StatusCode {
        match self {
            AggregateStatus::Success => StatusCode::OK,
            AggregateStatus::Partial => StatusCode::MULTI_STATUS,
            AggregateStatus::Error => StatusCode::BAD_REQUEST,
        }
    }
}

/// Response body of an intake request.
#[derive(Debug, Serialize, ToSchema)]
pub struct AggregateResult {
    /// "success", "partial" or "error"
    pub status: AggregateStatus,
    /// Summary message
    pub message: String,
    /// Number of readings in the request
    pub total: usize,
    pub success_count: usize,
    pub failed_count: usize,
    /// Per-reading outcomes, in input order
    pub results: Vec<BatchOutcome>,
}

impl AggregateResult {
    pub fn status_code(&self) -> StatusCode {
        self.status.status_code()
    }
}

impl IntoResponse for AggregateResult {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self)).into_response()
    }
}

/// Combine outcomes into the overall result. An empty list is a success.
pub fn aggregate(outcomes: Vec<BatchOutcome>) -> AggregateResult {
    let success_count = outcomes.iter().filter(|o| o.is_success()).count();
    let failed_count = outcomes.len() - success_count;

    let (status, message) = match (success_count, failed_count) {
        (_, 0) => (AggregateStatus::Success, ALL_SENT_MESSAGE.to_string()),
        (0, _) => (AggregateStatus::Error, NONE_SENT_MESSAGE.to_string()),
        (ok, failed) => (
            AggregateStatus::Partial,
            format!("{} success, {} failed", ok, failed),
        ),
    };

    AggregateResult {
        status,
        message,
        total: outcomes.len(),
        success_count,
        failed_count,
        results: outcomes,
    }
}
