//! Relay status HTTP endpoint.
//!
//! GET /api/v1/relay/status: counters of everything relayed since start.

use axum::extract::State;
use axum::Json;

use crate::services::stats::{RelayStats, SharedRelayStats};

/// Get the current relay counters.
///
/// Returns request, reading, success and failure totals plus the time and
/// overall status of the most recent intake request.
#[utoipa::path(
    get,
    path = "/api/v1/relay/status",
    tag = "Relay",
    responses(
        (status = 200, description = "Current relay counters", body = RelayStats),
    )
)]
pub async fn get_relay_status(State(stats): State<SharedRelayStats>) -> Json<RelayStats> {
    let s = stats.read().await;
    Json(s.clone())
}
