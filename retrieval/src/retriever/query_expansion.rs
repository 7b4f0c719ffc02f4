//! Optional query expansion: turning one user query into several phrasings
//! to widen recall before fusion. Decoupled from any particular LLM so the
//! retrieval crate never needs to depend on `rfpgraph`'s gateway directly —
//! the `rfpgraph-nodes` feature wires a real implementation in.

use async_trait::async_trait;

use crate::types::RagError;

#[async_trait]
pub trait QueryExpander: Send + Sync {
    /// Returns up to `max_variants` alternative phrasings of `query`,
    /// always including the original query itself.
    async fn expand(&self, query: &str, max_variants: usize) -> Result<Vec<String>, RagError>;
}

/// Expands to just the original query; the default when no LLM-backed
/// expander is configured.
pub struct NoopQueryExpander;

#[async_trait]
impl QueryExpander for NoopQueryExpander {
    async fn expand(&self, query: &str, _max_variants: usize) -> Result<Vec<String>, RagError> {
        Ok(vec![query.to_string()])
    }
}
