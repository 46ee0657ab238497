//! Intake pipeline: raw body → batch → normalize → relay.
//!
//! Relay calls for one request may run concurrently up to a configured bound;
//! outcomes always come back in input order.

use futures::stream::{self, StreamExt};
use serde_json::Value;

use crate::errors::AppError;
use crate::services::batch::Batch;
use crate::services::normalizer::{normalize, Profile};
use crate::services::relay::{BatchOutcome, RelayClient};

/// Parse a raw request body. Empty (or whitespace-only) bodies are rejected
/// before the JSON parser sees them.
pub fn parse_body(body: &[u8]) -> Result<Value, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(AppError::EmptyBody);
    }
    serde_json::from_slice(body).map_err(|e| AppError::MalformedInput(format!("Invalid JSON: {}", e)))
}

/// Normalize and relay every reading of a batch, each exactly once.
///
/// `concurrency` bounds in-flight upstream calls; 1 relays strictly in
/// sequence. `buffered` yields results in input order regardless of which
/// call finishes first.
pub async fn relay_batch(
    relay: &RelayClient,
    batch: Batch,
    profile: Profile,
    concurrency: usize,
) -> Vec<BatchOutcome> {
    stream::iter(batch.map(move |raw| normalize(&raw, profile)))
        .map(move |reading| relay.relay(reading))
        .buffered(concurrency.max(1))
        .collect()
        .await
}
