//! In-memory embedding cache keyed by exact chunk text.
//!
//! Unlike the root crate's `moka`-based TTL caches, this cache never expires
//! entries — re-embedding the same chunk text twice within one process
//! lifetime is always wasted work, and the cache is scoped to a single
//! [`SemanticChunkingService`](crate::semantic_chunking::service::SemanticChunkingService) instance.

use std::collections::HashMap;

use parking_lot::Mutex;

/// Caches embeddings by exact text, tracking hit/miss counts for telemetry.
pub struct EmbeddingCache {
    entries: Mutex<HashMap<String, Vec<f32>>>,
    hits: Mutex<u64>,
    misses: Mutex<u64>,
}

impl EmbeddingCache {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            hits: Mutex::new(0),
            misses: Mutex::new(0),
        }
    }

    /// Splits `texts` into already-cached embeddings (in original order,
    /// with `None` for misses) and the list of texts that still need
    /// embedding, and records hit/miss telemetry for the call.
    pub fn partition<'a>(&self, texts: &'a [String]) -> (Vec<Option<Vec<f32>>>, Vec<&'a str>) {
        let entries = self.entries.lock();
        let mut hits = 0u64;
        let mut misses = 0u64;
        let mut found = Vec::with_capacity(texts.len());
        let mut missing = Vec::new();
        for text in texts {
            match entries.get(text) {
                Some(embedding) => {
                    found.push(Some(embedding.clone()));
                    hits += 1;
                }
                None => {
                    found.push(None);
                    missing.push(text.as_str());
                    misses += 1;
                }
            }
        }
        drop(entries);
        *self.hits.lock() += hits;
        *self.misses.lock() += misses;
        (found, missing)
    }

    pub fn insert(&self, text: &str, embedding: Vec<f32>) {
        self.entries.lock().insert(text.to_string(), embedding);
    }

    pub fn hits(&self) -> u64 {
        *self.hits.lock()
    }

    pub fn misses(&self) -> u64 {
        *self.misses.lock()
    }
}

impl Default for EmbeddingCache {
    fn default() -> Self {
        Self::new()
    }
}
