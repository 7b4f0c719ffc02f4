//! Disk-backed cache for downloaded documents.
//!
//! Ingestion jobs re-run frequently during development and after partial
//! failures; re-downloading every page each time is slow and, for some
//! sources, rate-limited. [`DocumentCache`] stores the raw response body
//! next to a content-derived filename so repeated fetches of the same URL
//! are free once cached.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use tokio::fs;
use url::Url;

use crate::types::RagError;

/// A directory-backed cache keyed by URL.
#[derive(Clone, Debug)]
pub struct DocumentCache {
    dir: PathBuf,
}

impl DocumentCache {
    /// Creates a cache rooted at `dir`. The directory is not created eagerly;
    /// callers create it once (e.g. via `tokio::fs::create_dir_all`) before
    /// the first [`DocumentCache::put`].
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The cache's root directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Default path for a [`super::resume::ResumeTracker`] sharing this cache's directory.
    pub fn state_file(&self) -> PathBuf {
        self.dir.join("resume_state.json")
    }

    fn path_for(&self, url: &Url) -> PathBuf {
        let mut hasher = DefaultHasher::new();
        url.as_str().hash(&mut hasher);
        self.dir.join(format!("{:016x}.html", hasher.finish()))
    }

    /// Returns the cached body for `url`, if present.
    pub async fn get(&self, url: &Url) -> Option<String> {
        let path = self.path_for(url);
        fs::read_to_string(&path).await.ok()
    }

    /// Stores `content` for `url`, creating the cache directory if needed.
    pub async fn put(&self, url: &Url, content: &str) -> Result<(), RagError> {
        if !self.dir.as_os_str().is_empty() {
            fs::create_dir_all(&self.dir).await?;
        }
        let path = self.path_for(url);
        fs::write(&path, content).await?;
        Ok(())
    }
}

/// Result of a single [`fetch_html`] call.
#[derive(Clone, Debug)]
pub struct FetchOutcome {
    /// The response body (HTML or other text content).
    pub content: String,
    /// Whether the content was served from [`DocumentCache`] rather than fetched.
    pub from_cache: bool,
    /// Byte length of `content`.
    pub bytes: usize,
}

/// Fetches `url`'s body, consulting `cache` first and populating it on a miss.
///
/// Passing `None` for `cache` always performs a live request.
pub async fn fetch_html(
    client: &reqwest::Client,
    url: &Url,
    cache: Option<&DocumentCache>,
) -> Result<FetchOutcome, RagError> {
    if let Some(cache) = cache {
        if let Some(content) = cache.get(url).await {
            let bytes = content.len();
            return Ok(FetchOutcome {
                content,
                from_cache: true,
                bytes,
            });
        }
    }

    let response = client.get(url.clone()).send().await?;
    let response = response.error_for_status()?;
    let content = response.text().await?;
    let bytes = content.len();

    if let Some(cache) = cache {
        cache.put(url, &content).await?;
    }

    Ok(FetchOutcome {
        content,
        from_cache: false,
        bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn cache_roundtrips_content() {
        let dir = tempdir().unwrap();
        let cache = DocumentCache::new(dir.path());
        let url = Url::parse("https://example.com/chapter-1").unwrap();

        assert!(cache.get(&url).await.is_none());
        cache.put(&url, "<html>hello</html>").await.unwrap();
        assert_eq!(cache.get(&url).await.unwrap(), "<html>hello</html>");
    }

    #[tokio::test]
    async fn fetch_html_uses_cache_on_hit() {
        let dir = tempdir().unwrap();
        let cache = DocumentCache::new(dir.path());
        let url = Url::parse("https://example.com/cached-page").unwrap();
        cache.put(&url, "cached body").await.unwrap();

        let client = reqwest::Client::new();
        let outcome = fetch_html(&client, &url, Some(&cache)).await.unwrap();
        assert!(outcome.from_cache);
        assert_eq!(outcome.content, "cached body");
        assert_eq!(outcome.bytes, "cached body".len());
    }

    #[tokio::test]
    async fn fetch_html_stores_live_response_in_cache() {
        let server = httpmock::MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(httpmock::Method::GET).path("/doc");
            then.status(200).body("<html>live</html>");
        });

        let dir = tempdir().unwrap();
        let cache = DocumentCache::new(dir.path());
        let url = Url::parse(&server.url("/doc")).unwrap();

        let client = reqwest::Client::new();
        let outcome = fetch_html(&client, &url, Some(&cache)).await.unwrap();
        mock.assert();
        assert!(!outcome.from_cache);
        assert_eq!(outcome.content, "<html>live</html>");

        let second = fetch_html(&client, &url, Some(&cache)).await.unwrap();
        assert!(second.from_cache);
    }

    #[test]
    fn state_file_lives_under_cache_dir() {
        let cache = DocumentCache::new("/tmp/rfp-cache");
        assert_eq!(
            cache.state_file(),
            Path::new("/tmp/rfp-cache/resume_state.json")
        );
    }
}
