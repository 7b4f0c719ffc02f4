//! Top-level chunking pipeline: segment → detect breakpoints → assemble →
//! embed, tying the rest of the `semantic_chunking` module together behind
//! one async entry point.

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::semantic_chunking::assembly::assemble_chunks;
use crate::semantic_chunking::breakpoints::detect_breakpoints;
use crate::semantic_chunking::cache::EmbeddingCache;
use crate::semantic_chunking::config::{ChunkingConfig, ChunkingStrategy, HtmlChunkingConfig, JsonChunkingConfig};
use crate::semantic_chunking::embeddings::{EmbeddingProvider, MockEmbeddingProvider, RigEmbeddingProvider};
use crate::semantic_chunking::segmenter::{segment_html, segment_json, segment_plain_text};
use crate::semantic_chunking::tokenizer::{default_tokenizer, Tokenizer};
use crate::semantic_chunking::types::{ChunkingError, ChunkingOutcome, ChunkingTrace};
use rig::embeddings::EmbeddingModel;

/// The shape of the document handed to [`SemanticChunkingService::chunk_document`].
#[derive(Clone, Debug)]
pub enum ChunkSource {
    Html(String),
    PlainText(String),
    Json(serde_json::Value),
}

impl ChunkSource {
    fn label(&self) -> &'static str {
        match self {
            ChunkSource::Html(_) => "html",
            ChunkSource::PlainText(_) => "plain_text",
            ChunkSource::Json(_) => "json",
        }
    }
}

/// Request to chunk one document, with optional per-call overrides.
#[derive(Clone)]
pub struct ChunkDocumentRequest {
    pub source: ChunkSource,
    pub chunking_config: Option<ChunkingConfig>,
    pub html_config: Option<HtmlChunkingConfig>,
    pub json_config: Option<JsonChunkingConfig>,
    pub embedder: Option<Arc<dyn EmbeddingProvider>>,
}

impl std::fmt::Debug for ChunkDocumentRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkDocumentRequest")
            .field("source", &self.source)
            .field("chunking_config", &self.chunking_config)
            .field("html_config", &self.html_config)
            .field("json_config", &self.json_config)
            .field("embedder", &self.embedder.as_ref().map(|e| e.name().to_string()))
            .finish()
    }
}

impl ChunkDocumentRequest {
    pub fn new(source: ChunkSource) -> Self {
        Self {
            source,
            chunking_config: None,
            html_config: None,
            json_config: None,
            embedder: None,
        }
    }

    #[must_use]
    pub fn with_chunking_config(mut self, config: ChunkingConfig) -> Self {
        self.chunking_config = Some(config);
        self
    }

    #[must_use]
    pub fn with_html_config(mut self, config: HtmlChunkingConfig) -> Self {
        self.html_config = Some(config);
        self
    }

    #[must_use]
    pub fn with_json_config(mut self, config: JsonChunkingConfig) -> Self {
        self.json_config = Some(config);
        self
    }

    #[must_use]
    pub fn with_embedder(mut self, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedder = Some(embedder);
        self
    }
}

/// Diagnostics about one `chunk_document` call, serialized alongside the
/// chunks themselves so callers can surface chunking health without
/// re-deriving it from the raw outcome.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChunkTelemetry {
    pub embedder: String,
    pub source: String,
    pub duration_ms: u64,
    pub fallback_used: bool,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub smoothing_window: Option<usize>,
    pub strategy: String,
    pub chunk_count: usize,
    pub average_tokens: f64,
}

/// The result of chunking one document.
#[derive(Clone, Debug)]
pub struct ChunkDocumentResponse {
    pub outcome: ChunkingOutcome,
    pub telemetry: ChunkTelemetry,
}

/// Minimum segment count below which semantic breakpoint detection is not
/// meaningful; below this the service falls back to fixed-size chunking.
const MIN_SEGMENTS_FOR_SEMANTIC: usize = 3;

/// Segments, embeds, and assembles documents into [`SemanticChunk`](crate::semantic_chunking::types::SemanticChunk)s.
///
/// Cheap to clone-share via `Arc` (as [`ChunkingNode`](crate::nodes::ChunkingNode)
/// does); holds its own embedding cache, so sharing one instance across
/// calls is what makes the cache useful.
pub struct SemanticChunkingService {
    embedder: Arc<dyn EmbeddingProvider>,
    tokenizer: Arc<dyn Tokenizer>,
    default_config: ChunkingConfig,
    cache: EmbeddingCache,
}

impl SemanticChunkingService {
    pub fn builder() -> SemanticChunkingServiceBuilder {
        SemanticChunkingServiceBuilder::default()
    }

    /// Runs the full chunk pipeline for one document.
    pub async fn chunk_document(
        &self,
        request: ChunkDocumentRequest,
    ) -> Result<ChunkDocumentResponse, ChunkingError> {
        let start = Instant::now();
        let config = request.chunking_config.clone().unwrap_or_else(|| self.default_config.clone());
        let source_label = request.source.label();

        let segments = match &request.source {
            ChunkSource::Html(html) => segment_html(html, request.html_config.as_ref()),
            ChunkSource::PlainText(text) => segment_plain_text(text),
            ChunkSource::Json(value) => segment_json(value, request.json_config.as_ref())?,
        };

        if segments.is_empty() {
            return Ok(ChunkDocumentResponse {
                outcome: ChunkingOutcome {
                    chunks: Vec::new(),
                    trace: None,
                    stats: Default::default(),
                },
                telemetry: ChunkTelemetry {
                    embedder: self.embedder.name().to_string(),
                    source: source_label.to_string(),
                    duration_ms: start.elapsed().as_millis() as u64,
                    fallback_used: false,
                    cache_hits: self.cache.hits(),
                    cache_misses: self.cache.misses(),
                    smoothing_window: None,
                    strategy: format!("{:?}", config.strategy),
                    chunk_count: 0,
                    average_tokens: 0.0,
                },
            });
        }

        let embedder = request.embedder.clone().unwrap_or_else(|| self.embedder.clone());

        let use_semantic = matches!(
            config.chunking_strategy,
            ChunkingStrategy::Semantic | ChunkingStrategy::Hierarchical | ChunkingStrategy::Adaptive
        );
        let too_few_segments = segments.len() < MIN_SEGMENTS_FOR_SEMANTIC;
        let fallback_used = !use_semantic || (too_few_segments && config.fallback_to_lexical);

        let (breakpoints, trace) = if fallback_used {
            (Vec::new(), Vec::new())
        } else {
            let segment_texts: Vec<String> = segments.iter().map(|s| s.text.clone()).collect();
            let segment_embeddings = self.embed_with_cache(embedder.as_ref(), &segment_texts).await?;
            detect_breakpoints(&segment_embeddings, &config.strategy)
        };

        let (mut chunks, stats) = assemble_chunks(&segments, &breakpoints, &config, self.tokenizer.as_ref());

        if !chunks.is_empty() {
            let chunk_texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
            let chunk_embeddings = self.embed_with_cache(embedder.as_ref(), &chunk_texts).await?;
            for (chunk, embedding) in chunks.iter_mut().zip(chunk_embeddings) {
                chunk.embedding = Some(embedding);
            }
        }

        let trace = if trace.is_empty() {
            None
        } else {
            Some(ChunkingTrace { breakpoints: trace })
        };

        let telemetry = ChunkTelemetry {
            embedder: embedder.name().to_string(),
            source: source_label.to_string(),
            duration_ms: start.elapsed().as_millis() as u64,
            fallback_used,
            cache_hits: self.cache.hits(),
            cache_misses: self.cache.misses(),
            smoothing_window: if config.buffer_size > 1 {
                Some(config.buffer_size)
            } else {
                None
            },
            strategy: format!("{:?}", config.strategy),
            chunk_count: stats.total_chunks,
            average_tokens: stats.average_tokens,
        };

        Ok(ChunkDocumentResponse {
            outcome: ChunkingOutcome {
                chunks,
                trace,
                stats,
            },
            telemetry,
        })
    }

    async fn embed_with_cache(
        &self,
        embedder: &dyn EmbeddingProvider,
        texts: &[String],
    ) -> Result<Vec<Vec<f32>>, ChunkingError> {
        let (found, missing) = self.cache.partition(texts);

        let missing_owned: Vec<String> = missing.iter().map(|s| s.to_string()).collect();
        let mut fresh_by_text: std::collections::HashMap<&str, Vec<f32>> = std::collections::HashMap::new();
        if !missing_owned.is_empty() {
            let fresh = embedder.embed_batch(&missing_owned).await?;
            for (text, embedding) in missing_owned.iter().zip(fresh.into_iter()) {
                self.cache.insert(text, embedding.clone());
                fresh_by_text.insert(text.as_str(), embedding);
            }
        }

        let mut result = Vec::with_capacity(texts.len());
        for (text, slot) in texts.iter().zip(found.into_iter()) {
            let embedding = match slot {
                Some(embedding) => embedding,
                None => fresh_by_text
                    .get(text.as_str())
                    .cloned()
                    .ok_or_else(|| ChunkingError::Embedding(format!("missing embedding for {text}")))?,
            };
            result.push(embedding);
        }

        Ok(result)
    }
}

impl Default for SemanticChunkingService {
    fn default() -> Self {
        SemanticChunkingServiceBuilder::default().build()
    }
}

/// Builds a [`SemanticChunkingService`].
#[derive(Default)]
pub struct SemanticChunkingServiceBuilder {
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    tokenizer: Option<Arc<dyn Tokenizer>>,
    default_config: Option<ChunkingConfig>,
}

impl SemanticChunkingServiceBuilder {
    #[must_use]
    pub fn with_embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Convenience constructor wrapping a `rig-core` embedding model.
    #[must_use]
    pub fn with_rig_model<E>(mut self, model: E) -> Self
    where
        E: EmbeddingModel + Clone + Send + Sync + 'static,
    {
        let name = format!("rig/{}", std::any::type_name::<E>());
        self.embedding_provider = Some(Arc::new(RigEmbeddingProvider::new(model, name)));
        self
    }

    #[must_use]
    pub fn with_tokenizer(mut self, tokenizer: Arc<dyn Tokenizer>) -> Self {
        self.tokenizer = Some(tokenizer);
        self
    }

    #[must_use]
    pub fn with_default_config(mut self, config: ChunkingConfig) -> Self {
        self.default_config = Some(config);
        self
    }

    pub fn build(self) -> SemanticChunkingService {
        SemanticChunkingService {
            embedder: self
                .embedding_provider
                .unwrap_or_else(|| Arc::new(MockEmbeddingProvider::new())),
            tokenizer: self.tokenizer.unwrap_or_else(default_tokenizer),
            default_config: self.default_config.unwrap_or_default(),
            cache: EmbeddingCache::new(),
        }
    }
}
