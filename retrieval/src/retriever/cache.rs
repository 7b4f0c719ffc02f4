//! TTL-only query result cache (no LRU, no size bound — results simply
//! expire), keyed by `(project scope, query text, top_k)`.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::retriever::RetrievedItem;

pub struct QueryCache {
    entries: Mutex<HashMap<String, (Instant, Vec<RetrievedItem>)>>,
    ttl: Duration,
}

impl QueryCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    pub fn key(project_scope: &str, query: &str, top_k: usize) -> String {
        format!("{project_scope}\u{0}{query}\u{0}{top_k}")
    }

    pub fn get(&self, key: &str) -> Option<Vec<RetrievedItem>> {
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some((inserted, value)) if inserted.elapsed() < self.ttl => Some(value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, key: String, value: Vec<RetrievedItem>) {
        self.entries.lock().insert(key, (Instant::now(), value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::ChunkRecord;

    fn item(id: &str) -> RetrievedItem {
        RetrievedItem {
            record: ChunkRecord::new(id, "https://example.com", "", 0, "content"),
            score: 1.0,
        }
    }

    #[test]
    fn expired_entries_are_not_returned() {
        let cache = QueryCache::new(Duration::from_millis(1));
        let key = QueryCache::key("proj-1", "query", 5);
        cache.insert(key.clone(), vec![item("a")]);
        std::thread::sleep(Duration::from_millis(5));
        assert!(cache.get(&key).is_none());
    }

    #[test]
    fn fresh_entries_are_returned() {
        let cache = QueryCache::new(Duration::from_secs(60));
        let key = QueryCache::key("proj-1", "query", 5);
        cache.insert(key.clone(), vec![item("a")]);
        assert!(cache.get(&key).is_some());
    }
}
