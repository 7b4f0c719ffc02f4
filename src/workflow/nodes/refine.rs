//! `RefineNode` — rewrites only the sections the critic flagged as weak,
//! then advances `refinement_iterations`. The counter is force-incremented
//! even when there is no draft to refine, guaranteeing the critic/refine
//! cycle terminates; it stops incrementing only once the configured cap has
//! already been reached.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::node::{Node, NodeContext, NodeError, NodePartial};
use crate::state::StateSnapshot;
use crate::workflow::llm::{LlmGateway, LlmMessage, TaskType};
use crate::workflow::nodes::support::extract_json;
use crate::workflow::state::{WorkflowPatch, WorkflowSnapshotView};

pub struct RefineNode {
    llm: Arc<dyn LlmGateway>,
    max_iterations: u32,
}

impl RefineNode {
    pub fn new(llm: Arc<dyn LlmGateway>, max_iterations: u32) -> Self {
        Self {
            llm,
            max_iterations,
        }
    }
}

#[async_trait]
impl Node for RefineNode {
    async fn run(&self, snapshot: StateSnapshot, ctx: NodeContext) -> Result<NodePartial, NodeError> {
        let view = WorkflowSnapshotView::new(&snapshot);
        let iterations = view.refinement_iterations();
        let mut patch = WorkflowPatch::new("refine");

        if iterations < self.max_iterations {
            patch = patch.set("refinement_iterations", serde_json::json!(iterations + 1));
        }

        let Some(draft) = view.proposal_draft() else {
            ctx.emit_node("refine", "No draft to refine; advancing iteration count only").ok();
            return Ok(patch
                .with_log("warning", "No proposal draft available to refine")
                .build());
        };

        let weak_sections: Vec<String> = snapshot
            .extra
            .get("refinement_feedback")
            .and_then(|v| v.get("weak_sections"))
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default();

        if weak_sections.is_empty() {
            ctx.emit_node("refine", "No weak sections flagged; nothing to rewrite").ok();
            return Ok(patch
                .with_log("success", "No weak sections required rewriting")
                .build());
        }

        let mut rewritten = std::collections::HashMap::new();
        for key in &weak_sections {
            let Some(current) = draft.get(key) else {
                continue;
            };
            let system = LlmMessage::system(
                "Rewrite the given proposal section to be clearer, more \
                 complete, and more professional. Respond with strict JSON: \
                 {\"text\": string}.",
            );
            let user = LlmMessage::user(format!("Section `{key}`:\n{current}"));

            match self
                .llm
                .complete(TaskType::Refinement, vec![system, user], 0.4, 800)
                .await
            {
                Ok(completion) => {
                    let text = extract_json(&completion.text)
                        .and_then(|v| v.get("text").and_then(|t| t.as_str()).map(str::to_string))
                        .unwrap_or(completion.text);
                    rewritten.insert(key.clone(), Value::String(text));
                }
                Err(e) => {
                    ctx.emit_diagnostic("refine", format!("rewrite of '{key}' failed: {e}")).ok();
                }
            }
        }

        Ok(patch
            .set("proposal_draft", serde_json::json!(rewritten))
            .with_log(
                "success",
                &format!("Rewrote {} weak section(s)", rewritten.len()),
            )
            .build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::llm::testing::StubLlmGateway;
    use crate::workflow::nodes::support::test_context;
    use crate::workflow::state::new_initial_state;
    use rustc_hash::FxHashMap;

    #[tokio::test]
    async fn increments_iterations_even_without_a_draft() {
        let node = RefineNode::new(Arc::new(StubLlmGateway::with_response("{}")), 3);
        let mut state = new_initial_state(1, 2, "text", FxHashMap::default());
        let snapshot = state.snapshot();
        let partial = node.run(snapshot, test_context("refine")).await.unwrap();
        let extra = partial.extra.unwrap();
        assert_eq!(extra.get("refinement_iterations").unwrap(), &serde_json::json!(1));
        let _ = &mut state;
    }

    #[tokio::test]
    async fn stops_incrementing_once_cap_reached() {
        let node = RefineNode::new(Arc::new(StubLlmGateway::with_response("{}")), 2);
        let mut state = new_initial_state(1, 2, "text", FxHashMap::default());
        state.add_extra("refinement_iterations", serde_json::json!(2));
        let snapshot = state.snapshot();
        let partial = node.run(snapshot, test_context("refine")).await.unwrap();
        let extra = partial.extra.unwrap();
        assert!(!extra.contains_key("refinement_iterations"));
        let _ = &mut state;
    }

    #[tokio::test]
    async fn rewrites_only_weak_sections() {
        let response = serde_json::json!({"text": "Improved text."}).to_string();
        let node = RefineNode::new(Arc::new(StubLlmGateway::with_response(response)), 3);
        let mut state = new_initial_state(1, 2, "text", FxHashMap::default());
        state.add_extra(
            "proposal_draft",
            serde_json::json!({"executive_summary": "weak", "risks_assumptions": "fine"}),
        );
        state.add_extra(
            "refinement_feedback",
            serde_json::json!({"weak_sections": ["executive_summary"]}),
        );
        let snapshot = state.snapshot();
        let partial = node.run(snapshot, test_context("refine")).await.unwrap();
        let extra = partial.extra.unwrap();
        let draft = extra.get("proposal_draft").unwrap().as_object().unwrap();
        assert_eq!(draft.len(), 1);
        assert!(draft.contains_key("executive_summary"));
        let _ = &mut state;
    }
}
