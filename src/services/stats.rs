//! In-memory relay counters, exposed via the status endpoint.
//!
//! State lives for the life of the process only; a restart resets it.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use utoipa::ToSchema;

use crate::services::aggregate::{AggregateResult, AggregateStatus};

/// Counters across every intake request since start.
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct RelayStats {
    pub total_requests: u64,
    pub total_items: u64,
    pub total_success: u64,
    pub total_failed: u64,
    pub last_request_at: Option<DateTime<Utc>>,
    pub last_status: Option<AggregateStatus>,
}

impl RelayStats {
    pub fn record(&mut self, result: &AggregateResult, at: DateTime<Utc>) {
        self.total_requests += 1;
        self.total_items += result.total as u64;
        self.total_success += result.success_count as u64;
        self.total_failed += result.failed_count as u64;
        self.last_request_at = Some(at);
        self.last_status = Some(result.status);
    }
}

/// Shared relay stats handle.
pub type SharedRelayStats = Arc<RwLock<RelayStats>>;
