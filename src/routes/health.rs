use axum::extract::State;
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::routes::intake::AppState;
use crate::services::normalizer::Profile;

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Service status ("ok" whenever the process answers)
    pub status: String,
    /// API version
    pub version: String,
    /// Upstream endpoint readings are relayed to
    pub upstream_url: String,
    /// Active normalization profile
    pub profile: Profile,
}

/// Health check endpoint.
///
/// Reports the API version and relay configuration. Does not contact the
/// upstream API, so an upstream outage does not make this service look down.
#[utoipa::path(
    get,
    path = "/api/v1/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
    )
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        upstream_url: state.relay.upstream_url().to_string(),
        profile: state.profile,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::device::DeviceSettings;
    use crate::services::relay::RelayClient;
    use crate::services::stats::RelayStats;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::RwLock;

    #[tokio::test]
    async fn test_health_check() {
        let state = AppState {
            relay: RelayClient::new("http://upstream.invalid/ingest", Duration::from_secs(1), "test").unwrap(),
            profile: Profile::Passthrough,
            concurrency: 1,
            device: DeviceSettings::default(),
            stats: Arc::new(RwLock::new(RelayStats::default())),
        };

        let Json(health) = health_check(State(state)).await;

        assert_eq!(health.status, "ok");
        assert_eq!(health.version, env!("CARGO_PKG_VERSION"));
        assert_eq!(health.upstream_url, "http://upstream.invalid/ingest");
        assert_eq!(health.profile, Profile::Passthrough);
    }
}
