//! Simulated font metadata backend.
//!
//! Stands in for a remote lookup service that is slow per round-trip but
//! happy to answer many ids at once.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use coalesce_core::{ResolveError, Resolver};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Font metadata returned by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FontItem {
    pub font_id: String,
    pub font_name: String,
    /// Unix timestamp (ms) at which the backend produced this record
    pub update_time: i64,
}

impl FontItem {
    pub fn new(font_id: impl Into<String>) -> Self {
        let font_id = font_id.into();
        Self {
            font_name: format!("font-{font_id}"),
            font_id,
            update_time: chrono::Utc::now().timestamp_millis(),
        }
    }
}

/// Batch resolver with a fixed per-call latency
pub struct FontResolver {
    latency: Duration,
    calls: AtomicUsize,
}

impl FontResolver {
    pub fn new(latency: Duration) -> Self {
        Self { latency, calls: AtomicUsize::new(0) }
    }

    /// Number of round-trips made so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Resolver<String, FontItem> for FontResolver {
    async fn resolve(&self, ids: Vec<String>) -> Result<Vec<FontItem>, ResolveError> {
        let call = self.calls.fetch_add(1, Ordering::Relaxed) + 1;
        info!(call, batch_size = ids.len(), "Fetching font metadata");

        tokio::time::sleep(self.latency).await;
        Ok(ids.into_iter().map(FontItem::new).collect())
    }
}
