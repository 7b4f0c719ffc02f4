//! The query path over an indexed [`Backend`]: optional query expansion,
//! per-variant vector search, optional BM25 + reciprocal-rank-fusion hybrid
//! scoring, optional cross-encoder rerank, and a TTL query cache.
//!
//! Indexing is idempotent per `(project_id, rfp_document_id)` — reindexing a
//! document deletes its previous chunks before inserting the new set, so
//! repeated ingestion of an edited RFP never duplicates chunks.

pub mod bm25;
pub mod cache;
pub mod query_expansion;
pub mod rerank;
pub mod rrf;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::retriever::bm25::Bm25Index;
use crate::retriever::cache::QueryCache;
use crate::retriever::query_expansion::{NoopQueryExpander, QueryExpander};
use crate::retriever::rerank::Reranker;
use crate::retriever::rrf::reciprocal_rank_fusion;
use crate::semantic_chunking::embeddings::EmbeddingProvider;
use crate::semantic_chunking::types::ChunkingOutcome;
use crate::stores::{Backend, ChunkRecord};
use crate::types::RagError;

/// One retrieved chunk with its fused/re-ranked relevance score.
#[derive(Clone, Debug)]
pub struct RetrievedItem {
    pub record: ChunkRecord,
    pub score: f32,
}

/// A query against the indexed corpus for one project scope.
#[derive(Clone, Debug)]
pub struct RetrievalQuery {
    pub project_scope: String,
    pub text: String,
    pub top_k: usize,
    pub use_expansion: bool,
    pub use_rerank: bool,
    pub use_hybrid: bool,
}

impl RetrievalQuery {
    pub fn new(project_scope: impl Into<String>, text: impl Into<String>, top_k: usize) -> Self {
        Self {
            project_scope: project_scope.into(),
            text: text.into(),
            top_k,
            use_expansion: false,
            use_rerank: false,
            use_hybrid: false,
        }
    }

    #[must_use]
    pub fn with_expansion(mut self, enabled: bool) -> Self {
        self.use_expansion = enabled;
        self
    }

    #[must_use]
    pub fn with_rerank(mut self, enabled: bool) -> Self {
        self.use_rerank = enabled;
        self
    }

    #[must_use]
    pub fn with_hybrid(mut self, enabled: bool) -> Self {
        self.use_hybrid = enabled;
        self
    }
}

/// Tunables for one [`Retriever`] instance.
#[derive(Clone, Debug)]
pub struct RetrieverConfig {
    /// RRF smoothing constant; spec default 60.
    pub rrf_k: f64,
    /// Upper bound on query-expansion variants.
    pub expansion_variants: usize,
    /// How long a non-expanded/non-hybrid/non-reranked query result is cached.
    pub query_cache_ttl: Duration,
    /// Vector search fetches `top_k * candidate_multiplier` per variant
    /// before fusion/rerank narrows back down to `top_k`.
    pub candidate_multiplier: usize,
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self {
            rrf_k: 60.0,
            expansion_variants: 3,
            query_cache_ttl: Duration::from_secs(3600),
            candidate_multiplier: 2,
        }
    }
}

/// Builds the composite key chunks are stored under so that one project's
/// multiple RFP documents, and multiple projects, never collide in a
/// [`Backend`] that only indexes by URL.
pub fn composite_key(project_id: &str, rfp_document_id: &str) -> String {
    format!("rfp://{project_id}/{rfp_document_id}")
}

/// The indexing and query path over a [`Backend`] vector store.
pub struct Retriever {
    backend: Arc<dyn Backend>,
    embedder: Arc<dyn EmbeddingProvider>,
    expander: Arc<dyn QueryExpander>,
    reranker: Option<Arc<dyn Reranker>>,
    config: RetrieverConfig,
    query_cache: QueryCache,
}

impl Retriever {
    pub fn new(backend: Arc<dyn Backend>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self::with_config(backend, embedder, RetrieverConfig::default())
    }

    pub fn with_config(
        backend: Arc<dyn Backend>,
        embedder: Arc<dyn EmbeddingProvider>,
        config: RetrieverConfig,
    ) -> Self {
        Self {
            backend,
            embedder,
            expander: Arc::new(NoopQueryExpander),
            reranker: None,
            query_cache: QueryCache::new(config.query_cache_ttl),
            config,
        }
    }

    #[must_use]
    pub fn with_expander(mut self, expander: Arc<dyn QueryExpander>) -> Self {
        self.expander = expander;
        self
    }

    #[must_use]
    pub fn with_reranker(mut self, reranker: Arc<dyn Reranker>) -> Self {
        self.reranker = Some(reranker);
        self
    }

    /// Idempotently (re)indexes one RFP document: deletes any chunks
    /// previously stored under the same `(project_id, rfp_document_id)`
    /// key, then inserts the freshly chunked-and-embedded set. Rejects the
    /// batch with [`RagError::DimensionMismatch`] if any chunk's embedding
    /// width disagrees with the configured embedder.
    pub async fn build_index(
        &self,
        project_id: &str,
        rfp_document_id: &str,
        outcome: &ChunkingOutcome,
    ) -> Result<usize, RagError> {
        let key = composite_key(project_id, rfp_document_id);
        self.backend.delete_chunks_by_url(&key).await?;

        let expected_dim = self.embedder.dimension();
        let mut records = Vec::with_capacity(outcome.chunks.len());
        for (index, chunk) in outcome.chunks.iter().enumerate() {
            let Some(embedding) = chunk.embedding.as_ref() else {
                continue;
            };
            if embedding.len() != expected_dim {
                return Err(RagError::DimensionMismatch {
                    expected: expected_dim,
                    actual: embedding.len(),
                });
            }

            let heading = chunk.metadata.heading_hierarchy.join(" > ");
            let metadata = serde_json::to_value(&chunk.metadata)
                .map_err(|err| RagError::Chunking(err.to_string()))?;

            records.push(
                ChunkRecord::new(chunk.id.to_string(), key.clone(), heading, index, chunk.content.clone())
                    .with_metadata(metadata)
                    .with_embedding(embedding.clone()),
            );
        }

        let count = records.len();
        if count > 0 {
            self.backend.insert_chunks(records).await?;
        }
        Ok(count)
    }

    /// Runs the query path: optional expansion, per-variant vector search,
    /// optional BM25+RRF hybrid fusion, optional rerank, top-k truncation.
    pub async fn query(&self, query: RetrievalQuery) -> Result<Vec<RetrievedItem>, RagError> {
        let bypass_cache = query.use_expansion || query.use_rerank || query.use_hybrid;
        let cache_key = QueryCache::key(&query.project_scope, &query.text, query.top_k);
        if !bypass_cache {
            if let Some(cached) = self.query_cache.get(&cache_key) {
                return Ok(cached);
            }
        }

        let variants = if query.use_expansion {
            self.expander
                .expand(&query.text, self.config.expansion_variants)
                .await?
        } else {
            vec![query.text.clone()]
        };

        let candidate_k = query.top_k.max(1) * self.config.candidate_multiplier.max(1);
        let mut seen: HashMap<String, ChunkRecord> = HashMap::new();
        let mut rankings: Vec<Vec<String>> = Vec::with_capacity(variants.len());

        for variant in &variants {
            let embeddings = self
                .embedder
                .embed_batch(std::slice::from_ref(variant))
                .await
                .map_err(|err| RagError::Embedding(err.to_string()))?;
            let Some(embedding) = embeddings.into_iter().next() else {
                continue;
            };
            let results = self.backend.search_similar(&embedding, candidate_k).await?;
            let ids: Vec<String> = results.iter().map(|(record, _)| record.id.clone()).collect();
            for (record, _) in results {
                seen.entry(record.id.clone()).or_insert(record);
            }
            rankings.push(ids);
        }

        if query.use_hybrid && !seen.is_empty() {
            let bm25 = Bm25Index::build(seen.values().map(|r| (r.id.clone(), r.content.clone())));
            rankings.push(bm25.rank(&query.text));
        }

        let fused = if rankings.len() > 1 {
            reciprocal_rank_fusion(&rankings, self.config.rrf_k)
        } else {
            rankings
                .into_iter()
                .next()
                .unwrap_or_default()
                .into_iter()
                .enumerate()
                .map(|(rank, id)| (id, 1.0 / (rank as f64 + 1.0)))
                .collect()
        };

        let mut items: Vec<RetrievedItem> = fused
            .into_iter()
            .filter_map(|(id, score)| {
                seen.get(&id).map(|record| RetrievedItem {
                    record: record.clone(),
                    score: score as f32,
                })
            })
            .collect();

        if query.use_rerank {
            if let Some(reranker) = &self.reranker {
                let candidates = items.into_iter().map(|item| (item.record, item.score)).collect();
                let reranked = reranker.rerank(&query.text, candidates).await?;
                items = reranked
                    .into_iter()
                    .map(|(record, score)| RetrievedItem { record, score })
                    .collect();
            }
        }

        items.truncate(query.top_k);

        if !bypass_cache {
            self.query_cache.insert(cache_key, items.clone());
        }

        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::semantic_chunking::embeddings::MockEmbeddingProvider;
    use crate::semantic_chunking::types::{ChunkMetadata, SemanticChunk};
    use async_trait::async_trait;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct InMemoryBackend {
        records: Mutex<Vec<ChunkRecord>>,
    }

    fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm_a == 0.0 || norm_b == 0.0 {
            0.0
        } else {
            dot / (norm_a * norm_b)
        }
    }

    #[async_trait]
    impl Backend for InMemoryBackend {
        async fn insert_chunks(&self, chunks: Vec<ChunkRecord>) -> Result<(), RagError> {
            self.records.lock().extend(chunks);
            Ok(())
        }

        async fn get_chunks_by_url(&self, url: &str) -> Result<Vec<ChunkRecord>, RagError> {
            Ok(self.records.lock().iter().filter(|r| r.url == url).cloned().collect())
        }

        async fn get_chunk_by_id(&self, id: &str) -> Result<Option<ChunkRecord>, RagError> {
            Ok(self.records.lock().iter().find(|r| r.id == id).cloned())
        }

        async fn delete_chunks_by_url(&self, url: &str) -> Result<usize, RagError> {
            let mut records = self.records.lock();
            let before = records.len();
            records.retain(|r| r.url != url);
            Ok(before - records.len())
        }

        async fn search_similar(
            &self,
            query_embedding: &[f32],
            top_k: usize,
        ) -> Result<Vec<(ChunkRecord, f32)>, RagError> {
            let mut scored: Vec<(ChunkRecord, f32)> = self
                .records
                .lock()
                .iter()
                .filter_map(|r| r.embedding.as_ref().map(|e| (r.clone(), cosine_similarity(e, query_embedding))))
                .collect();
            scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
            scored.truncate(top_k);
            Ok(scored)
        }

        async fn count(&self) -> Result<usize, RagError> {
            Ok(self.records.lock().len())
        }
    }

    fn chunk(content: &str, embedding: Vec<f32>) -> SemanticChunk {
        let mut c = SemanticChunk::new(content.to_string(), 5, ChunkMetadata::default());
        c.embedding = Some(embedding);
        c
    }

    #[tokio::test]
    async fn build_index_then_query_roundtrips() {
        let backend = Arc::new(InMemoryBackend::default());
        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(MockEmbeddingProvider::with_dimension(4));
        let retriever = Retriever::new(backend.clone(), embedder.clone());

        let outcome = ChunkingOutcome {
            chunks: vec![
                chunk("pricing and commercial terms", vec![1.0, 0.0, 0.0, 0.0]),
                chunk("security and compliance posture", vec![0.0, 1.0, 0.0, 0.0]),
            ],
            trace: None,
            stats: Default::default(),
        };

        let inserted = retriever.build_index("proj-1", "doc-1", &outcome).await.unwrap();
        assert_eq!(inserted, 2);

        let results = retriever
            .query(RetrievalQuery::new(
                composite_key("proj-1", "doc-1"),
                "pricing and commercial terms",
                1,
            ))
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn reindexing_a_document_replaces_its_chunks() {
        let backend = Arc::new(InMemoryBackend::default());
        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(MockEmbeddingProvider::with_dimension(4));
        let retriever = Retriever::new(backend.clone(), embedder);

        let first = ChunkingOutcome {
            chunks: vec![chunk("first version", vec![1.0, 0.0, 0.0, 0.0])],
            trace: None,
            stats: Default::default(),
        };
        retriever.build_index("proj-1", "doc-1", &first).await.unwrap();

        let second = ChunkingOutcome {
            chunks: vec![
                chunk("second version a", vec![1.0, 0.0, 0.0, 0.0]),
                chunk("second version b", vec![0.0, 1.0, 0.0, 0.0]),
            ],
            trace: None,
            stats: Default::default(),
        };
        retriever.build_index("proj-1", "doc-1", &second).await.unwrap();

        assert_eq!(backend.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn dimension_mismatch_is_rejected() {
        let backend = Arc::new(InMemoryBackend::default());
        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(MockEmbeddingProvider::with_dimension(4));
        let retriever = Retriever::new(backend, embedder);

        let outcome = ChunkingOutcome {
            chunks: vec![chunk("mismatched", vec![1.0, 0.0])],
            trace: None,
            stats: Default::default(),
        };

        let err = retriever.build_index("proj-1", "doc-1", &outcome).await.unwrap_err();
        assert!(matches!(err, RagError::DimensionMismatch { expected: 4, actual: 2 }));
    }
}
