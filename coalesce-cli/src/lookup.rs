//! Cached, batched font lookups.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use coalesce_core::BatchScheduler;
use coalesce_store::KeyValueStore;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::fonts::FontItem;

/// Cache entry persisted for each resolved font
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedFont {
    pub id: String,
    /// Unix timestamp (ms) after which the entry is fetched again
    pub revalidate: i64,
    pub data: FontItem,
}

/// Where a lookup result came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Cache,
    Resolver,
}

/// Outcome of a single lookup
#[derive(Debug, Clone, Serialize)]
pub struct LookupResult {
    pub id: String,
    pub source: Source,
    pub font: FontItem,
}

/// Serves fonts from the cache and batches the misses
#[derive(Clone)]
pub struct FontLookup {
    scheduler: BatchScheduler<String, FontItem>,
    store: Option<Arc<dyn KeyValueStore<CachedFont>>>,
    revalidate_after: Duration,
}

impl FontLookup {
    pub fn new(
        scheduler: BatchScheduler<String, FontItem>,
        store: Option<Arc<dyn KeyValueStore<CachedFont>>>,
        revalidate_after: Duration,
    ) -> Self {
        Self { scheduler, store, revalidate_after }
    }

    pub fn scheduler(&self) -> &BatchScheduler<String, FontItem> {
        &self.scheduler
    }

    /// Look up one font id
    pub async fn lookup(&self, id: String) -> anyhow::Result<LookupResult> {
        let now = chrono::Utc::now().timestamp_millis();

        if let Some(store) = &self.store {
            let cached = store
                .get(&id)
                .await
                .with_context(|| format!("Failed to read cache entry for {id}"))?;
            if let Some(cached) = cached.filter(|entry| entry.revalidate > now) {
                debug!(id = %id, "Cache hit");
                return Ok(LookupResult { id, source: Source::Cache, font: cached.data });
            }
        }

        let font = self
            .scheduler
            .schedule(id.clone())
            .await
            .with_context(|| format!("Lookup for {id} was abandoned"))?;

        if let Some(store) = &self.store {
            let ttl_ms = i64::try_from(self.revalidate_after.as_millis()).unwrap_or(i64::MAX);
            let entry = CachedFont {
                id: id.clone(),
                revalidate: now.saturating_add(ttl_ms),
                data: font.clone(),
            };
            store
                .set(&id, entry)
                .await
                .with_context(|| format!("Failed to cache font {id}"))?;
        }

        Ok(LookupResult { id, source: Source::Resolver, font })
    }
}

#[cfg(test)]
mod tests {
    use coalesce_core::SchedulerConfig;
    use coalesce_store::MemoryStore;

    use super::*;
    use crate::fonts::FontResolver;

    fn lookup_with(
        store: Arc<MemoryStore<CachedFont>>,
        revalidate_after: Duration,
    ) -> (FontLookup, Arc<FontResolver>) {
        let scheduler: BatchScheduler<String, FontItem> =
            BatchScheduler::new(SchedulerConfig::default());
        let resolver = Arc::new(FontResolver::new(Duration::from_millis(100)));
        scheduler.attach_resolver(Arc::clone(&resolver));
        let store = store as Arc<dyn KeyValueStore<CachedFont>>;
        (FontLookup::new(scheduler, Some(store), revalidate_after), resolver)
    }

    #[tokio::test(start_paused = true)]
    async fn test_misses_are_batched_and_cached() {
        let store: Arc<MemoryStore<CachedFont>> = Arc::new(MemoryStore::new());
        let (lookup, resolver) = lookup_with(Arc::clone(&store), Duration::from_secs(3600));

        let (a, b) = tokio::join!(lookup.lookup("a".into()), lookup.lookup("b".into()));
        let (a, b) = (a.unwrap(), b.unwrap());
        assert_eq!(a.source, Source::Resolver);
        assert_eq!(b.font.font_name, "font-b");
        assert_eq!(resolver.calls(), 1);

        let cached = store.get("a").await.unwrap().unwrap();
        assert_eq!(cached.data, a.font);

        let again = lookup.lookup("a".into()).await.unwrap();
        assert_eq!(again.source, Source::Cache);
        assert_eq!(resolver.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entry_is_refetched() {
        let store: Arc<MemoryStore<CachedFont>> = Arc::new(MemoryStore::new());
        store
            .set(
                "old",
                CachedFont { id: "old".into(), revalidate: 0, data: FontItem::new("old") },
            )
            .await
            .unwrap();
        let (lookup, resolver) = lookup_with(Arc::clone(&store), Duration::from_secs(60));

        let result = lookup.lookup("old".into()).await.unwrap();
        assert_eq!(result.source, Source::Resolver);
        assert_eq!(resolver.calls(), 1);
        assert!(store.get("old").await.unwrap().unwrap().revalidate > 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_lookup_without_store() {
        let scheduler: BatchScheduler<String, FontItem> =
            BatchScheduler::new(SchedulerConfig::default());
        let resolver = Arc::new(FontResolver::new(Duration::from_millis(10)));
        scheduler.attach_resolver(Arc::clone(&resolver));
        let lookup = FontLookup::new(scheduler, None, Duration::from_secs(60));

        lookup.lookup("x".into()).await.unwrap();
        let second = lookup.lookup("x".into()).await.unwrap();
        assert_eq!(second.source, Source::Resolver);
        assert_eq!(resolver.calls(), 2);
    }
}
