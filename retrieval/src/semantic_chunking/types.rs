//! Core value types shared across the semantic chunking pipeline.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Errors specific to segmentation, breakpoint detection, and assembly.
///
/// Kept separate from [`crate::types::RagError`] so the chunking pipeline
/// can be exercised (and tested) without pulling in the storage/network
/// error variants; call sites convert with `.map_err(...)` at the boundary.
#[derive(Debug, Error, Clone)]
pub enum ChunkingError {
    #[error("tokenization failed: {0}")]
    Tokenization(String),

    #[error("embedding provider failed: {0}")]
    Embedding(String),

    #[error("invalid chunking configuration: {0}")]
    InvalidConfig(String),

    #[error("document could not be segmented: {0}")]
    InvalidDocument(String),
}

/// Where a chunk came from in the source document.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct ChunkMetadata {
    /// Heading breadcrumb, outermost first (e.g. `["Chapter 1", "Overview"]`).
    #[serde(default)]
    pub heading_hierarchy: Vec<String>,
    /// Source identifier (URL, file path, or caller-supplied key), if known.
    #[serde(default)]
    pub source: Option<String>,
    /// Section name for structured (JSON) sources.
    #[serde(default)]
    pub section: Option<String>,
    /// Page number for paginated sources.
    #[serde(default)]
    pub page: Option<u32>,
    /// Caller-supplied passthrough metadata (project/document identifiers, etc.).
    #[serde(default)]
    pub extra: serde_json::Value,
}

/// A single chunk produced by the pipeline, with an optional embedding.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SemanticChunk {
    pub id: Uuid,
    pub content: String,
    pub token_count: usize,
    pub embedding: Option<Vec<f32>>,
    pub metadata: ChunkMetadata,
}

impl SemanticChunk {
    pub fn new(content: String, token_count: usize, metadata: ChunkMetadata) -> Self {
        Self {
            id: Uuid::new_v4(),
            content,
            token_count,
            embedding: None,
            metadata,
        }
    }
}

/// Aggregate counts describing a chunking run.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ChunkingStats {
    pub total_segments: usize,
    pub total_chunks: usize,
    pub average_tokens: f64,
}

/// A single detected semantic breakpoint, for diagnostics.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BreakpointTrace {
    /// Index into the segment list immediately before the break.
    pub segment_index: usize,
    /// Distance score that triggered the split.
    pub distance: f64,
    /// Threshold the distance was compared against.
    pub threshold: f64,
}

/// Optional diagnostic trace of how breakpoints were chosen.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ChunkingTrace {
    pub breakpoints: Vec<BreakpointTrace>,
}

/// The full result of chunking one document.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChunkingOutcome {
    pub chunks: Vec<SemanticChunk>,
    pub trace: Option<ChunkingTrace>,
    pub stats: ChunkingStats,
}
