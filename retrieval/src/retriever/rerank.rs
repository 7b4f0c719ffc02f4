//! Cross-encoder-style reranking of a candidate set after the initial
//! (vector and/or BM25) retrieval pass.

use std::collections::HashSet;

use async_trait::async_trait;

use crate::retriever::bm25::tokenize;
use crate::stores::ChunkRecord;
use crate::types::RagError;

/// Re-scores and reorders a candidate set against the original query text.
/// Implementations may call out to a cross-encoder model; the default here
/// is a dependency-free lexical-overlap heuristic.
#[async_trait]
pub trait Reranker: Send + Sync {
    async fn rerank(
        &self,
        query: &str,
        candidates: Vec<(ChunkRecord, f32)>,
    ) -> Result<Vec<(ChunkRecord, f32)>, RagError>;
}

/// Scores candidates by the fraction of query terms present in the chunk
/// text. Cheap and dependency-free; a reasonable default when no
/// cross-encoder model is configured.
pub struct LexicalOverlapReranker;

fn overlap_score(query_terms: &HashSet<String>, content: &str) -> f32 {
    if query_terms.is_empty() {
        return 0.0;
    }
    let content_terms: HashSet<String> = tokenize(content).into_iter().collect();
    let overlap = query_terms.intersection(&content_terms).count();
    overlap as f32 / query_terms.len() as f32
}

#[async_trait]
impl Reranker for LexicalOverlapReranker {
    async fn rerank(
        &self,
        query: &str,
        mut candidates: Vec<(ChunkRecord, f32)>,
    ) -> Result<Vec<(ChunkRecord, f32)>, RagError> {
        let query_terms: HashSet<String> = tokenize(query).into_iter().collect();
        candidates.sort_by(|a, b| {
            let score_a = overlap_score(&query_terms, &a.0.content);
            let score_b = overlap_score(&query_terms, &b.0.content);
            score_b.partial_cmp(&score_a).unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(candidates)
    }
}
