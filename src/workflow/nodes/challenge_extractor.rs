//! `ChallengeExtractorNode` — pulls up to 12 challenges out of the RFP
//! summary/text, each tagged with a type, impact, and category.

use std::sync::Arc;

use async_trait::async_trait;

use crate::node::{Node, NodeContext, NodeError, NodePartial};
use crate::state::StateSnapshot;
use crate::workflow::llm::{LlmGateway, LlmMessage, TaskType};
use crate::workflow::nodes::support::extract_json;
use crate::workflow::state::{Challenge, WorkflowPatch, WorkflowSnapshotView};

const MAX_CHALLENGES: usize = 12;

pub struct ChallengeExtractorNode {
    llm: Arc<dyn LlmGateway>,
}

impl ChallengeExtractorNode {
    pub fn new(llm: Arc<dyn LlmGateway>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl Node for ChallengeExtractorNode {
    async fn run(&self, snapshot: StateSnapshot, ctx: NodeContext) -> Result<NodePartial, NodeError> {
        let view = WorkflowSnapshotView::new(&snapshot);
        let rfp_summary = view.rfp_summary().unwrap_or_default();
        let rfp_text = view.rfp_text().unwrap_or_default();

        let system = LlmMessage::system(
            "Extract up to 12 distinct client challenges from the RFP. Respond with \
             strict JSON: {\"challenges\": [{\"text\": string, \"type\": string, \
             \"impact\": string, \"category\": string}]}.",
        );
        let user = LlmMessage::user(format!("Summary:\n{rfp_summary}\n\nFull text:\n{rfp_text}"));

        let result = self
            .llm
            .complete(TaskType::Analysis, vec![system, user], 0.3, 1200)
            .await;

        let patch = WorkflowPatch::new("challenge_extractor");

        let completion = match result {
            Ok(c) => c,
            Err(e) => {
                ctx.emit_diagnostic("challenge_extractor", format!("LLM call failed: {e}")).ok();
                return Ok(patch
                    .with_warning(&format!("challenge extraction failed: {e}"))
                    .with_log("error", &e.to_string())
                    .build());
            }
        };

        let challenges: Vec<Challenge> = extract_json(&completion.text)
            .and_then(|v| v.get("challenges").cloned())
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default();

        let challenges: Vec<Challenge> = challenges.into_iter().take(MAX_CHALLENGES).collect();

        Ok(patch
            .set("challenges", serde_json::json!(challenges))
            .set("current_step", serde_json::json!("challenge_extractor"))
            .with_log(
                "success",
                &format!("Extracted {} challenges", challenges_count(&completion.text)),
            )
            .build())
    }
}

fn challenges_count(text: &str) -> usize {
    extract_json(text)
        .and_then(|v| v.get("challenges").and_then(|c| c.as_array().cloned()))
        .map(|a| a.len().min(MAX_CHALLENGES))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::llm::testing::StubLlmGateway;
    use crate::workflow::nodes::support::test_context;
    use crate::workflow::state::new_initial_state;
    use rustc_hash::FxHashMap;

    #[tokio::test]
    async fn caps_at_twelve_challenges() {
        let many: Vec<_> = (0..20)
            .map(|i| serde_json::json!({"text": format!("c{i}"), "type": "business", "impact": "high", "category": "ops"}))
            .collect();
        let response = serde_json::json!({ "challenges": many }).to_string();
        let node = ChallengeExtractorNode::new(Arc::new(StubLlmGateway::with_response(response)));

        let mut state = new_initial_state(1, 2, "text", FxHashMap::default());
        let snapshot = state.snapshot();
        let partial = node.run(snapshot, test_context("challenge_extractor")).await.unwrap();
        let extra = partial.extra.unwrap();
        let challenges = extra.get("challenges").unwrap().as_array().unwrap();
        assert_eq!(challenges.len(), MAX_CHALLENGES);
        let _ = &mut state;
    }
}
