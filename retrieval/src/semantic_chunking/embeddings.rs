//! Embedding providers: text → dense vector, batched.
//!
//! [`EmbeddingProvider`] is the seam the rest of the pipeline depends on.
//! [`MockEmbeddingProvider`] is deterministic and dependency-free, used in
//! tests and examples; [`RigEmbeddingProvider`] adapts any `rig-core`
//! [`rig::embeddings::EmbeddingModel`] (OpenAI, Cohere, etc.) to the same
//! trait so the rest of the crate never has to know which vendor is in use.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use async_trait::async_trait;
use rig::embeddings::EmbeddingModel;

use crate::semantic_chunking::types::ChunkingError;

/// Converts batches of text into dense vectors.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embeds a batch of texts, preserving input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ChunkingError>;

    /// The width of vectors this provider returns.
    fn dimension(&self) -> usize;

    /// A short, human-readable name for telemetry (`"mock"`, `"openai/text-embedding-3-small"`, ...).
    fn name(&self) -> &str;
}

/// A deterministic, hash-based embedding provider with no external
/// dependencies. Identical input text always yields an identical vector;
/// distinct texts yield (with overwhelming probability) distinct vectors.
/// Not semantically meaningful — intended for tests and CI.
pub struct MockEmbeddingProvider {
    dimension: usize,
}

impl MockEmbeddingProvider {
    pub fn new() -> Self {
        Self { dimension: 32 }
    }

    pub fn with_dimension(dimension: usize) -> Self {
        Self { dimension }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        (0..self.dimension)
            .map(|i| {
                let mut hasher = DefaultHasher::new();
                i.hash(&mut hasher);
                text.hash(&mut hasher);
                // Map the hash into [-1.0, 1.0] so downstream cosine-distance
                // math sees a plausible normalized-ish vector.
                let bits = hasher.finish();
                ((bits % 2_000_001) as f32 / 1_000_000.0) - 1.0
            })
            .collect()
    }
}

impl Default for MockEmbeddingProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ChunkingError> {
        Ok(texts.iter().map(|text| self.embed_one(text)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Adapts a `rig-core` [`EmbeddingModel`] to [`EmbeddingProvider`].
pub struct RigEmbeddingProvider<E: EmbeddingModel> {
    model: E,
    name: String,
}

impl<E: EmbeddingModel + Clone + Send + Sync + 'static> RigEmbeddingProvider<E> {
    pub fn new(model: E, name: impl Into<String>) -> Self {
        Self {
            model,
            name: name.into(),
        }
    }
}

#[async_trait]
impl<E> EmbeddingProvider for RigEmbeddingProvider<E>
where
    E: EmbeddingModel + Clone + Send + Sync + 'static,
{
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ChunkingError> {
        let embeddings = self
            .model
            .embed_texts(texts.to_vec())
            .await
            .map_err(|err| ChunkingError::Embedding(err.to_string()))?;

        Ok(embeddings
            .into_iter()
            .map(|embedding| embedding.vec.into_iter().map(|value| value as f32).collect())
            .collect())
    }

    fn dimension(&self) -> usize {
        self.model.ndims()
    }

    fn name(&self) -> &str {
        &self.name
    }
}
