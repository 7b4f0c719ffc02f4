//! A keyed TTL cache shared by the embedding service, the retriever's query
//! cache, and the chat cache. Eviction is TTL-only (no LRU cap) per §9's
//! open-question resolution; a capacity bound is available but unused by
//! default.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;

/// Thin wrapper over `moka::future::Cache<String, V>`. Each call site picks
/// its own TTL (embeddings: 24h, retriever query cache: 1h, chat: provider
/// default) by constructing its own `TtlCache`.
#[derive(Clone)]
pub struct TtlCache<V: Clone + Send + Sync + 'static> {
    inner: Cache<String, V>,
}

impl<V: Clone + Send + Sync + 'static> TtlCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Cache::builder().time_to_live(ttl).build(),
        }
    }

    /// Same as `new`, but bounds the cache to `max_capacity` entries. Not
    /// used by default (§9: no LRU cap), available for callers that need
    /// a bound.
    pub fn with_capacity(ttl: Duration, max_capacity: u64) -> Self {
        Self {
            inner: Cache::builder()
                .time_to_live(ttl)
                .max_capacity(max_capacity)
                .build(),
        }
    }

    pub async fn get(&self, key: &str) -> Option<V> {
        self.inner.get(key).await
    }

    pub async fn insert(&self, key: impl Into<String>, value: V) {
        self.inner.insert(key.into(), value).await;
    }

    pub async fn get_or_try_insert_with<E, F, Fut>(
        &self,
        key: impl Into<String>,
        init: F,
    ) -> Result<V, Arc<E>>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<V, E>>,
        E: Send + Sync + 'static,
    {
        let key = key.into();
        self.inner
            .try_get_with(key, async move { init().await })
            .await
    }

    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }
}

/// Builds the cache key `(query, project_id, top_k)` the retriever's query
/// cache is keyed by.
pub fn retriever_cache_key(query: &str, project_id: i64, top_k: usize) -> String {
    format!("{project_id}:{top_k}:{query}")
}

/// Builds the embedding cache key: exact text, per spec.md's "keyed by
/// exact text" requirement.
pub fn embedding_cache_key(text: &str) -> String {
    text.to_string()
}
