//! `AnalyzerNode` — the RFP workflow's entry point. Critical: failure here
//! is fatal to the run (spec.md §7), unlike every other node.

use std::sync::Arc;

use async_trait::async_trait;

use crate::node::{Node, NodeContext, NodeError, NodePartial};
use crate::state::StateSnapshot;
use crate::workflow::llm::{LlmGateway, LlmMessage, TaskType};
use crate::workflow::nodes::support::{extract_json, truncate_chars, Retriever};
use crate::workflow::state::{log_entry, WorkflowPatch, WorkflowSnapshotView};

const LONG_CONTEXT_CHAR_LIMIT: usize = 10_000;

pub struct AnalyzerNode {
    llm: Arc<dyn LlmGateway>,
    retriever: Arc<dyn Retriever>,
    use_long_context: bool,
}

impl AnalyzerNode {
    pub fn new(llm: Arc<dyn LlmGateway>, retriever: Arc<dyn Retriever>, use_long_context: bool) -> Self {
        Self {
            llm,
            retriever,
            use_long_context,
        }
    }
}

#[async_trait]
impl Node for AnalyzerNode {
    async fn run(&self, snapshot: StateSnapshot, ctx: NodeContext) -> Result<NodePartial, NodeError> {
        let view = WorkflowSnapshotView::new(&snapshot);
        let rfp_text = view.rfp_text().ok_or(NodeError::MissingInput { what: "rfp_text" })?;
        let project_id = view.project_id().unwrap_or_default();

        let document = if self.use_long_context {
            rfp_text.clone()
        } else {
            truncate_chars(&rfp_text, LONG_CONTEXT_CHAR_LIMIT)
        };

        let retrieved = self
            .retriever
            .search(project_id, "What is this project about?", 5, None)
            .await;
        let context_overview = retrieved
            .iter()
            .map(|c| c.content.clone())
            .collect::<Vec<_>>()
            .join("\n---\n");

        let system = LlmMessage::system(
            "You are an RFP analyst. Given the document (and optional retrieved \
             context), respond with strict JSON: {\"rfp_summary\": string, \
             \"business_objectives\": [string], \"project_scope\": string}.",
        );
        let user = LlmMessage::user(format!(
            "Document:\n{document}\n\nRetrieved context:\n{context_overview}"
        ));

        ctx.emit_node("analyzer", "Analyzing RFP document").ok();

        let completion = self
            .llm
            .complete(TaskType::Analysis, vec![system, user], 0.3, 1200)
            .await
            .map_err(|e| NodeError::Provider {
                provider: "llm",
                message: e.to_string(),
            })?;

        let parsed = extract_json(&completion.text).ok_or_else(|| NodeError::ValidationFailed(
            "analyzer: LLM response was not valid JSON".to_string(),
        ))?;

        let rfp_summary = parsed
            .get("rfp_summary")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        let business_objectives = parsed
            .get("business_objectives")
            .cloned()
            .unwrap_or_else(|| serde_json::json!([]));
        let project_scope = parsed
            .get("project_scope")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();

        let patch = WorkflowPatch::new("analyzer")
            .set("rfp_summary", serde_json::json!(rfp_summary))
            .set("context_overview", serde_json::json!(context_overview))
            .set("business_objectives", business_objectives)
            .set("project_scope", serde_json::json!(project_scope))
            .set("current_step", serde_json::json!("analyzer"))
            .with_log("success", "Generated RFP summary and business objectives");

        Ok(patch.build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::llm::testing::StubLlmGateway;
    use crate::workflow::nodes::support::{RetrievedChunk, StubRetriever};
    use crate::workflow::state::new_initial_state;
    use rustc_hash::FxHashMap;

    #[tokio::test]
    async fn populates_summary_objectives_and_scope() {
        let gateway = Arc::new(StubLlmGateway::with_response(
            "{\"rfp_summary\": \"summary\", \"business_objectives\": [\"grow\"], \"project_scope\": \"scope\"}",
        ));
        let retriever = StubRetriever::new(vec![RetrievedChunk {
            content: "context snippet".to_string(),
            heading: "intro".to_string(),
            score: 0.9,
        }]);
        let node = AnalyzerNode::new(gateway, Arc::new(retriever), false);

        let mut state = new_initial_state(1, 2, "We need a cloud migration.", FxHashMap::default());
        let snapshot = state.snapshot();
        let ctx = crate::workflow::nodes::support::test_context("analyzer");

        let partial = node.run(snapshot, ctx).await.unwrap();
        let extra = partial.extra.unwrap();
        assert_eq!(extra.get("rfp_summary").unwrap(), "summary");
        assert!(extra.contains_key("__log__analyzer"));
        let _ = &mut state;
    }
}
