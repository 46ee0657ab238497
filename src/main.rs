// Weather Relay API v0.1
use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod config;
mod errors;
mod helpers;
mod routes;
mod services;

use config::AppConfig;
use routes::intake::AppState;
use services::device::DeviceSettings;
use services::relay::RelayClient;
use services::stats::{RelayStats, SharedRelayStats};

/// Weather Relay API OpenAPI document.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Weather Relay API",
        version = "0.1.0",
        description = "Telemetry intake for home weather stations. Accepts single readings \
            or batches, normalizes them to the canonical field set and relays each one \
            to a weather-cloud ingestion endpoint, reporting per-reading outcomes.",
        license(name = "MIT"),
    ),
    tags(
        (name = "Health", description = "Service health check"),
        (name = "Intake", description = "Reading intake and upstream relay"),
        (name = "Relay", description = "Relay counters"),
    ),
    paths(
        routes::health::health_check,
        routes::intake::ingest_weather,
        routes::intake::device_report_query,
        routes::intake::device_report_form,
        routes::relay::get_relay_status,
    ),
    components(
        schemas(
            routes::health::HealthResponse,
            services::aggregate::AggregateResult,
            services::aggregate::AggregateStatus,
            services::relay::BatchOutcome,
            services::relay::OutcomeKind,
            services::stats::RelayStats,
            services::normalizer::Profile,
            errors::ErrorResponse,
        )
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() {
    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "weather_relay_api=debug,tower_http=debug".into());
    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let registry = tracing_subscriber::registry().with(filter);
    if json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };
    config.log_config();

    let relay = match RelayClient::new(&config.upstream_url, config.relay_timeout, &config.user_agent) {
        Ok(relay) => relay,
        Err(e) => {
            tracing::error!("Failed to build upstream client: {}", e);
            std::process::exit(1);
        }
    };

    let stats: SharedRelayStats = Arc::new(RwLock::new(RelayStats::default()));

    let app_state = AppState {
        relay,
        profile: config.profile,
        concurrency: config.relay_concurrency,
        device: DeviceSettings {
            station_id: config.device_station_id,
            utc_offset_hours: config.device_utc_offset_hours,
        },
        stats: stats.clone(),
    };

    // Stations post from anywhere on the LAN
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
        .allow_headers(Any);

    // Build router
    // Intake and health routes use AppState; relay status reads the counters directly.
    let intake_routes = Router::new()
        .route("/api/weather", post(routes::intake::ingest_weather))
        .route(
            "/data/report",
            get(routes::intake::device_report_query).post(routes::intake::device_report_form),
        )
        .route("/api/v1/health", get(routes::health::health_check))
        .with_state(app_state);

    let relay_routes = Router::new()
        .route("/api/v1/relay/status", get(routes::relay::get_relay_status))
        .with_state(stats);

    let app = Router::new()
        .merge(intake_routes)
        .merge(relay_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };
    tracing::info!("API server listening on {}", addr);
    tracing::info!(
        "Swagger UI available at http://localhost:{}/swagger-ui/",
        config.port
    );

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server terminated unexpectedly: {}", e);
        std::process::exit(1);
    }
}
