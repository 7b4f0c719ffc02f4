//! Crate-wide error type.
//!
//! Every fallible operation in this crate — fetching, chunking, embedding,
//! and storing — converges on [`RagError`] so callers only need to match on
//! one enum regardless of which stage failed.

use thiserror::Error;

/// Errors surfaced by ingestion, chunking, embedding, and storage.
#[derive(Debug, Error)]
pub enum RagError {
    /// Filesystem or stdio failure.
    #[error("io error: {0}")]
    Io(String),

    /// HTTP transport failure (fetching documents or calling an embedding API).
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The source document could not be parsed or was structurally invalid.
    #[error("invalid document: {0}")]
    InvalidDocument(String),

    /// Segmentation, breakpoint detection, or assembly failed.
    #[error("chunking error: {0}")]
    Chunking(String),

    /// An embedding provider call failed or returned malformed output.
    #[error("embedding error: {0}")]
    Embedding(String),

    /// A storage backend operation failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// An upsert's embedding width does not match the collection's stored
    /// dimension. Callers may recreate the collection and retry once.
    #[error("embedding dimension mismatch: collection expects {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

impl From<std::io::Error> for RagError {
    fn from(err: std::io::Error) -> Self {
        RagError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for RagError {
    fn from(err: serde_json::Error) -> Self {
        RagError::Io(err.to_string())
    }
}

impl From<url::ParseError> for RagError {
    fn from(err: url::ParseError) -> Self {
        RagError::InvalidDocument(err.to_string())
    }
}
