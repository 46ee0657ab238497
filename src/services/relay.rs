//! Upstream weather-cloud relay client.
//!
//! Sends one normalized reading per call as a form-encoded POST to the
//! configured ingestion endpoint. The upstream signals acceptance with
//! HTTP 201 only; everything else is a rejection. Each call is attempted
//! exactly once.

use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use utoipa::ToSchema;

use crate::errors::AppError;
use crate::services::normalizer::WeatherReading;

/// Message used for an accepted reading when the upstream gives none.
const DEFAULT_SUCCESS_MESSAGE: &str = "Success";

/// Message used for a rejected reading with an empty upstream body.
const DEFAULT_ERROR_MESSAGE: &str = "Unknown error";

/// How a single relay attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    /// Upstream answered 201.
    Success,
    /// Upstream answered with any other status.
    UpstreamError,
    /// Upstream could not be reached (connect, DNS, TLS, timeout).
    TransportError,
}

/// Result of relaying one reading.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BatchOutcome {
    /// "success", "upstream_error" or "transport_error"
    #[serde(rename = "status")]
    pub kind: OutcomeKind,
    /// Human-readable outcome message
    pub message: String,
    /// `message` field of the upstream JSON body, when it had one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream_message: Option<String>,
    /// Upstream HTTP status; absent for transport errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_code: Option<u16>,
    /// The normalized reading that was sent
    #[schema(value_type = Object)]
    pub data: WeatherReading,
}

impl BatchOutcome {
    pub fn is_success(&self) -> bool {
        self.kind == OutcomeKind::Success
    }

    fn transport_error(data: WeatherReading, message: String) -> Self {
        Self {
            kind: OutcomeKind::TransportError,
            message,
            upstream_message: None,
            http_code: None,
            data,
        }
    }

    /// Classify an upstream HTTP response.
    pub(crate) fn from_response(data: WeatherReading, status: StatusCode, body: &str) -> Self {
        let upstream_message = extract_message(body);

        if status == StatusCode::CREATED {
            return Self {
                kind: OutcomeKind::Success,
                message: upstream_message
                    .clone()
                    .unwrap_or_else(|| DEFAULT_SUCCESS_MESSAGE.to_string()),
                upstream_message,
                http_code: Some(status.as_u16()),
                data,
            };
        }

        let message = match &upstream_message {
            Some(msg) => msg.clone(),
            None if !body.is_empty() => body.to_string(),
            None => DEFAULT_ERROR_MESSAGE.to_string(),
        };

        Self {
            kind: OutcomeKind::UpstreamError,
            message,
            upstream_message,
            http_code: Some(status.as_u16()),
            data,
        }
    }
}

/// Pull `message` out of a JSON object body. Anything else (plain text,
/// HTML error pages, arrays) yields `None`.
fn extract_message(body: &str) -> Option<String> {
    let parsed: Value = serde_json::from_str(body).ok()?;
    match parsed.as_object()?.get("message")? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Client for the upstream ingestion endpoint.
#[derive(Debug, Clone)]
pub struct RelayClient {
    client: reqwest::Client,
    upstream_url: String,
}

impl RelayClient {
    pub fn new(upstream_url: &str, timeout: Duration, user_agent: &str) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| AppError::InternalError(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            upstream_url: upstream_url.to_string(),
        })
    }

    pub fn upstream_url(&self) -> &str {
        &self.upstream_url
    }

    /// Relay one reading. Never fails: every failure mode becomes an outcome.
    pub async fn relay(&self, reading: WeatherReading) -> BatchOutcome {
        let response = match self
            .client
            .post(&self.upstream_url)
            .form(&reading.to_form())
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Upstream unreachable: {}", e);
                return BatchOutcome::transport_error(
                    reading,
                    format!("Upstream request failed: {}", e),
                );
            }
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!("Failed to read upstream response body (HTTP {}): {}", status, e);
                String::new()
            }
        };

        let outcome = BatchOutcome::from_response(reading, status, &body);
        if outcome.is_success() {
            tracing::debug!("Upstream accepted reading: {}", outcome.message);
        } else {
            tracing::warn!("Upstream rejected reading (HTTP {}): {}", status, outcome.message);
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::normalizer::{normalize, Profile, RawRecord};
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn reading() -> WeatherReading {
        normalize(
            &RawRecord::from_value(json!({ "idws": 44, "temp_out": "21.567" })),
            Profile::Numeric,
        )
    }

    fn client_for(server: &MockServer) -> RelayClient {
        RelayClient::new(
            &format!("{}/ingest", server.uri()),
            Duration::from_secs(2),
            "WeatherRelay/test",
        )
        .unwrap()
    }

    #[test]
    fn test_extract_message() {
        assert_eq!(extract_message(r#"{"message":"stored"}"#), Some("stored".to_string()));
        assert_eq!(extract_message(r#"{"message":42}"#), Some("42".to_string()));
        assert_eq!(extract_message(r#"{"message":null}"#), None);
        assert_eq!(extract_message(r#"{"error":"nope"}"#), None);
        assert_eq!(extract_message(r#"["message"]"#), None);
        assert_eq!(extract_message("<html>Bad Gateway</html>"), None);
        assert_eq!(extract_message(""), None);
    }

    #[test]
    fn test_from_response_created_without_message() {
        let outcome = BatchOutcome::from_response(reading(), StatusCode::CREATED, "");
        assert_eq!(outcome.kind, OutcomeKind::Success);
        assert_eq!(outcome.message, "Success");
        assert_eq!(outcome.http_code, Some(201));
        assert!(outcome.upstream_message.is_none());
    }

    #[test]
    fn test_from_response_ok_is_not_success() {
        let outcome = BatchOutcome::from_response(reading(), StatusCode::OK, r#"{"message":"fine"}"#);
        assert_eq!(outcome.kind, OutcomeKind::UpstreamError);
        assert_eq!(outcome.message, "fine");
        assert_eq!(outcome.http_code, Some(200));
    }

    #[test]
    fn test_from_response_error_message_fallbacks() {
        let raw = BatchOutcome::from_response(reading(), StatusCode::BAD_GATEWAY, "upstream down");
        assert_eq!(raw.message, "upstream down");

        let blank = BatchOutcome::from_response(reading(), StatusCode::BAD_GATEWAY, "  ");
        assert_eq!(blank.message, "  ");

        let empty = BatchOutcome::from_response(reading(), StatusCode::BAD_GATEWAY, "");
        assert_eq!(empty.message, "Unknown error");
        assert_eq!(empty.http_code, Some(502));
    }

    #[tokio::test]
    async fn test_relay_success_with_upstream_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/ingest"))
            .and(header("content-type", "application/x-www-form-urlencoded"))
            .and(body_string_contains("idws=44&"))
            .and(body_string_contains("temp_out=21.57"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "message": "Data stored" })))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = client_for(&server).relay(reading()).await;

        assert_eq!(outcome.kind, OutcomeKind::Success);
        assert_eq!(outcome.message, "Data stored");
        assert_eq!(outcome.upstream_message.as_deref(), Some("Data stored"));
        assert_eq!(outcome.http_code, Some(201));
        assert_eq!(outcome.data, reading());
    }

    #[tokio::test]
    async fn test_relay_upstream_json_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(422).set_body_json(json!({ "message": "Invalid station" })))
            .mount(&server)
            .await;

        let outcome = client_for(&server).relay(reading()).await;

        assert_eq!(outcome.kind, OutcomeKind::UpstreamError);
        assert_eq!(outcome.message, "Invalid station");
        assert_eq!(outcome.http_code, Some(422));
    }

    #[tokio::test]
    async fn test_relay_upstream_plain_text_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
            .mount(&server)
            .await;

        let outcome = client_for(&server).relay(reading()).await;

        assert_eq!(outcome.kind, OutcomeKind::UpstreamError);
        assert_eq!(outcome.message, "Internal Server Error");
        assert_eq!(outcome.http_code, Some(500));
        assert!(outcome.upstream_message.is_none());
    }

    #[tokio::test]
    async fn test_relay_connection_refused() {
        // Bind then drop a listener to get a port nothing listens on
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = RelayClient::new(
            &format!("http://{}/ingest", addr),
            Duration::from_secs(2),
            "WeatherRelay/test",
        )
        .unwrap();
        let outcome = client.relay(reading()).await;

        assert_eq!(outcome.kind, OutcomeKind::TransportError);
        assert!(outcome.message.starts_with("Upstream request failed:"));
        assert!(outcome.http_code.is_none());
    }

    #[tokio::test]
    async fn test_relay_timeout_is_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let client = RelayClient::new(
            &format!("{}/ingest", server.uri()),
            Duration::from_millis(200),
            "WeatherRelay/test",
        )
        .unwrap();

        let started = std::time::Instant::now();
        let outcome = client.relay(reading()).await;

        assert_eq!(outcome.kind, OutcomeKind::TransportError);
        assert!(outcome.http_code.is_none());
        assert!(started.elapsed() < Duration::from_secs(4));
    }
}
