//! Shared scaffolding for node implementations: the retriever seam nodes
//! depend on (the concrete implementation lives in the sibling
//! `rfpgraph-retrieval` crate and is wired in behind its optional
//! `rfpgraph-nodes` feature, mirroring `rfpgraph-retrieval`'s `rfpgraph-nodes`),
//! the canonical proposal section templates, and small text helpers.

use async_trait::async_trait;

use crate::node::NodeContext;
use crate::workflow::state::PROPOSAL_DRAFT_KEYS;

#[derive(Clone, Debug)]
pub struct RetrievedChunk {
    pub content: String,
    pub heading: String,
    pub score: f32,
}

/// Minimal retrieval contract nodes depend on. The retrieval crate's
/// `Retriever` implements this trait when the `rfpgraph-nodes` feature
/// wires it in; tests use `StubRetriever` instead.
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn search(
        &self,
        project_id: i64,
        query: &str,
        top_k: usize,
        industry: Option<&str>,
    ) -> Vec<RetrievedChunk>;
}

/// A default skeleton sentence per canonical section, used by
/// `OutlineGeneratorNode` to fill any section the LLM's outline omitted.
pub fn default_proposal_templates() -> Vec<(&'static str, &'static str)> {
    PROPOSAL_DRAFT_KEYS
        .iter()
        .map(|key| (*key, default_template_for(key)))
        .collect()
}

fn default_template_for(key: &str) -> &'static str {
    match key {
        "executive_summary" => "Summarize the client's core challenge and our proposed approach.",
        "understanding_client_needs" => "Restate the client's stated needs and business context.",
        "proposed_solution" => "Describe the proposed solution at a high level.",
        "solution_architecture" => "Describe the technical architecture and technology stack.",
        "business_value_use_cases" => "Describe the business value delivered and representative use cases.",
        "benefits_roi" => "Quantify expected benefits and return on investment.",
        "implementation_roadmap" => "Outline the implementation phases and timeline.",
        "change_management_training" => "Describe the change management and training approach.",
        "security_compliance" => "Describe security posture and compliance coverage.",
        "case_studies_credentials" => "Summarize relevant delivery credentials and case studies.",
        "commercial_model" => "Describe pricing, licensing, and commercial terms.",
        "risks_assumptions" => "List key risks, assumptions, and mitigations.",
        "next_steps_cta" => "Propose concrete next steps and a call to action.",
        _ => "Additional content for this section.",
    }
}

/// Truncates `text` to at most `max_chars` characters on a char boundary,
/// used by `AnalyzerNode` when `use_long_context` is disabled.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    text.chars().take(max_chars).collect()
}

/// Best-effort extraction of the first JSON value embedded in `text`,
/// tolerating LLM responses that wrap JSON in prose or code fences.
pub fn extract_json(text: &str) -> Option<serde_json::Value> {
    let trimmed = text.trim();
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        return Some(value);
    }
    let start = trimmed.find(['{', '['])?;
    let end_brace = trimmed.rfind('}');
    let end_bracket = trimmed.rfind(']');
    let end = end_brace.max(end_bracket)?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&trimmed[start..=end]).ok()
}

/// A `NodeContext` backed by a throwaway event hub, for node unit tests
/// that only care about the returned `NodePartial`.
pub fn test_context(node_id: &str) -> NodeContext {
    let hub = crate::event_bus::EventHub::new(16);
    NodeContext {
        node_id: node_id.to_string(),
        step: 1,
        event_emitter: std::sync::Arc::new(hub.emitter()),
    }
}

/// A retriever stub returning a fixed set of chunks regardless of query,
/// for node tests that don't exercise retrieval ranking.
pub struct StubRetriever {
    chunks: Vec<RetrievedChunk>,
}

impl StubRetriever {
    pub fn new(chunks: Vec<RetrievedChunk>) -> Self {
        Self { chunks }
    }

    pub fn empty() -> Self {
        Self { chunks: Vec::new() }
    }
}

#[async_trait]
impl Retriever for StubRetriever {
    async fn search(
        &self,
        _project_id: i64,
        _query: &str,
        _top_k: usize,
        _industry: Option<&str>,
    ) -> Vec<RetrievedChunk> {
        self.chunks.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_templates_cover_all_canonical_keys() {
        let templates = default_proposal_templates();
        assert_eq!(templates.len(), PROPOSAL_DRAFT_KEYS.len());
    }

    #[test]
    fn extracts_json_wrapped_in_prose() {
        let text = "Here is the result:\n```json\n{\"a\": 1}\n```\nThanks.";
        let value = extract_json(text).unwrap();
        assert_eq!(value["a"], 1);
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let text = "héllo world";
        let truncated = truncate_chars(text, 3);
        assert_eq!(truncated.chars().count(), 3);
    }
}
