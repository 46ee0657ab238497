//! Intake HTTP endpoints.
//!
//! - POST /api/weather: JSON reading or array of readings
//! - GET|POST /data/report: console-native key-value report

use axum::body::Bytes;
use axum::extract::rejection::{BytesRejection, FormRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::Form;
use chrono::Utc;
use std::collections::HashMap;

use crate::errors::{AppError, ErrorResponse};
use crate::services::aggregate::{aggregate, AggregateResult};
use crate::services::batch::{resolve_batch, Batch};
use crate::services::device::{device_report_to_record, DeviceSettings};
use crate::services::intake::{parse_body, relay_batch};
use crate::services::normalizer::Profile;
use crate::services::relay::RelayClient;
use crate::services::stats::SharedRelayStats;

/// Shared application state for intake endpoints.
#[derive(Clone)]
pub struct AppState {
    pub relay: RelayClient,
    pub profile: Profile,
    /// Maximum in-flight upstream calls per request.
    pub concurrency: usize,
    pub device: DeviceSettings,
    pub stats: SharedRelayStats,
}

/// Relay a batch and fold the outcomes into the response.
async fn run_pipeline(state: &AppState, batch: Batch) -> AggregateResult {
    tracing::info!("Relaying {} reading(s) upstream", batch.len());

    let outcomes = relay_batch(&state.relay, batch, state.profile, state.concurrency).await;
    let result = aggregate(outcomes);

    tracing::info!(
        "Relay finished: {} ({} success, {} failed)",
        result.message,
        result.success_count,
        result.failed_count
    );
    state.stats.write().await.record(&result, Utc::now());

    result
}

/// Relay weather readings upstream.
///
/// Accepts a single reading object or an array of reading objects. Every
/// reading is normalized and relayed exactly once, in input order.
/// Returns 200 when all readings were accepted upstream, 207 when only some
/// were, and 400 when none were or the body itself is unusable.
#[utoipa::path(
    post,
    path = "/api/weather",
    tag = "Intake",
    request_body(
        content = String,
        content_type = "application/json",
        description = "A reading object or an array of reading objects"
    ),
    responses(
        (status = 200, description = "Every reading accepted upstream", body = AggregateResult),
        (status = 207, description = "Some readings accepted upstream", body = AggregateResult),
        (status = 400, description = "Empty or malformed body (ErrorResponse), or no reading accepted (AggregateResult)", body = ErrorResponse),
    )
)]
pub async fn ingest_weather(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<AggregateResult, AppError> {
    let body = body.map_err(|e| AppError::MalformedInput(e.body_text()))?;
    let parsed = parse_body(&body)?;
    let batch = resolve_batch(parsed)?;
    Ok(run_pipeline(&state, batch).await)
}

/// Relay a console report sent as a query string.
#[utoipa::path(
    get,
    path = "/data/report",
    tag = "Intake",
    responses(
        (status = 200, description = "Report accepted upstream", body = AggregateResult),
        (status = 400, description = "Not a weather report, or rejected upstream", body = ErrorResponse),
    )
)]
pub async fn device_report_query(
    State(state): State<AppState>,
    query: Result<Query<HashMap<String, String>>, QueryRejection>,
) -> Result<AggregateResult, AppError> {
    let Query(params) = query.map_err(|e| AppError::MalformedInput(e.body_text()))?;
    relay_device_report(&state, params).await
}

/// Relay a console report sent as a form body. Form fields override
/// query-string fields of the same name.
#[utoipa::path(
    post,
    path = "/data/report",
    tag = "Intake",
    request_body(
        content = String,
        content_type = "application/x-www-form-urlencoded",
        description = "Console key-value report in imperial units"
    ),
    responses(
        (status = 200, description = "Report accepted upstream", body = AggregateResult),
        (status = 400, description = "Not a weather report, or rejected upstream", body = ErrorResponse),
    )
)]
pub async fn device_report_form(
    State(state): State<AppState>,
    query: Result<Query<HashMap<String, String>>, QueryRejection>,
    form: Result<Form<HashMap<String, String>>, FormRejection>,
) -> Result<AggregateResult, AppError> {
    let Query(mut params) = query.map_err(|e| AppError::MalformedInput(e.body_text()))?;
    let Form(fields) = form.map_err(|e| AppError::MalformedInput(e.body_text()))?;
    params.extend(fields);
    relay_device_report(&state, params).await
}

async fn relay_device_report(
    state: &AppState,
    params: HashMap<String, String>,
) -> Result<AggregateResult, AppError> {
    let record = device_report_to_record(&params, &state.device, Utc::now())?;
    Ok(run_pipeline(state, Batch::Single(Some(record))).await)
}
