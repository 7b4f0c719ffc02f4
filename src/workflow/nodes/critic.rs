//! `CriticNode` — scores the current proposal draft 0-100 across clarity,
//! completeness, relevance, and professionalism, normalizing to
//! `critic_score = overall / 100.0`. When no draft is present yet, yields a
//! neutral `critic_score = 0.5` with empty feedback so the refine guard can
//! still fire rather than getting stuck.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::node::{Node, NodeContext, NodeError, NodePartial};
use crate::state::StateSnapshot;
use crate::workflow::llm::{LlmGateway, LlmMessage, TaskType};
use crate::workflow::nodes::support::extract_json;
use crate::workflow::state::{WorkflowPatch, WorkflowSnapshotView};

const NEUTRAL_SCORE: f32 = 0.5;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RefinementFeedback {
    pub overall: f32,
    pub clarity: f32,
    pub completeness: f32,
    pub relevance: f32,
    pub professionalism: f32,
    #[serde(default)]
    pub weak_sections: Vec<String>,
    #[serde(default)]
    pub suggestions: Vec<String>,
}

pub struct CriticNode {
    llm: Arc<dyn LlmGateway>,
    max_iterations: u32,
    score_threshold: f32,
}

impl CriticNode {
    pub fn new(llm: Arc<dyn LlmGateway>, max_iterations: u32, score_threshold: f32) -> Self {
        Self {
            llm,
            max_iterations,
            score_threshold,
        }
    }
}

#[async_trait]
impl Node for CriticNode {
    async fn run(&self, snapshot: StateSnapshot, ctx: NodeContext) -> Result<NodePartial, NodeError> {
        let view = WorkflowSnapshotView::new(&snapshot);
        let mut patch = WorkflowPatch::new("critic");

        let Some(draft) = view.proposal_draft() else {
            ctx.emit_node("critic", "No draft present; yielding neutral score").ok();
            let feedback = RefinementFeedback::default();
            return Ok(patch
                .set("critic_score", serde_json::json!(NEUTRAL_SCORE))
                .set("refinement_feedback", serde_json::json!(feedback))
                .set("critic_scores_history", serde_json::json!([feedback]))
                .with_log("warning", "No proposal draft to critique")
                .build());
        };

        let draft_text = draft
            .iter()
            .map(|(k, v)| format!("## {k}\n{v}"))
            .collect::<Vec<_>>()
            .join("\n\n");

        let system = LlmMessage::system(
            "Score this proposal draft 0-100 on clarity, completeness, \
             relevance, and professionalism. Respond with strict JSON: \
             {\"clarity\": number, \"completeness\": number, \"relevance\": \
             number, \"professionalism\": number, \"weak_sections\": [string], \
             \"suggestions\": [string]}.",
        );
        let user = LlmMessage::user(format!("Draft:\n{draft_text}"));

        let result = self
            .llm
            .complete(TaskType::Analysis, vec![system, user], 0.2, 900)
            .await;

        let feedback = match result {
            Ok(completion) => parse_feedback(&completion.text),
            Err(e) => {
                ctx.emit_diagnostic("critic", format!("LLM call failed: {e}")).ok();
                RefinementFeedback {
                    overall: NEUTRAL_SCORE * 100.0,
                    ..Default::default()
                }
            }
        };

        let critic_score = feedback.overall / 100.0;

        patch = patch
            .set("critic_score", serde_json::json!(critic_score))
            .set("refinement_feedback", serde_json::json!(feedback))
            .set("critic_scores_history", serde_json::json!([feedback]))
            .with_log("success", &format!("Critic score {:.2}", critic_score));

        if critic_score < self.score_threshold && view.refinement_iterations() >= self.max_iterations {
            patch = patch.with_warning(&format!(
                "Max iterations ({}) reached, ending without further refinement",
                self.max_iterations
            ));
        }

        Ok(patch.build())
    }
}

fn parse_feedback(text: &str) -> RefinementFeedback {
    let Some(parsed) = extract_json(text) else {
        return RefinementFeedback {
            overall: NEUTRAL_SCORE * 100.0,
            ..Default::default()
        };
    };
    let clarity = parsed.get("clarity").and_then(|v| v.as_f64()).unwrap_or(50.0) as f32;
    let completeness = parsed.get("completeness").and_then(|v| v.as_f64()).unwrap_or(50.0) as f32;
    let relevance = parsed.get("relevance").and_then(|v| v.as_f64()).unwrap_or(50.0) as f32;
    let professionalism = parsed
        .get("professionalism")
        .and_then(|v| v.as_f64())
        .unwrap_or(50.0) as f32;
    let overall = (clarity + completeness + relevance + professionalism) / 4.0;
    let weak_sections = parsed
        .get("weak_sections")
        .and_then(|v| serde_json::from_value(v.clone()).ok())
        .unwrap_or_default();
    let suggestions = parsed
        .get("suggestions")
        .and_then(|v| serde_json::from_value(v.clone()).ok())
        .unwrap_or_default();

    RefinementFeedback {
        overall,
        clarity,
        completeness,
        relevance,
        professionalism,
        weak_sections,
        suggestions,
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
    async fn yields_neutral_score_without_a_draft() {
        let node = CriticNode::new(Arc::new(StubLlmGateway::with_response("{}")), 3, 0.9);
        let mut state = new_initial_state(1, 2, "text", FxHashMap::default());
        let snapshot = state.snapshot();
        let partial = node.run(snapshot, test_context("critic")).await.unwrap();
        let extra = partial.extra.unwrap();
        assert_eq!(
            extra.get("critic_score").unwrap().as_f64().unwrap() as f32,
            NEUTRAL_SCORE
        );
        let _ = &mut state;
    }

    #[tokio::test]
    async fn normalizes_zero_to_hundred_score_into_unit_interval() {
        let response = serde_json::json!({
            "clarity": 80, "completeness": 90, "relevance": 85, "professionalism": 95,
            "weak_sections": [], "suggestions": []
        })
        .to_string();
        let node = CriticNode::new(Arc::new(StubLlmGateway::with_response(response)), 3, 0.9);

        let mut state = new_initial_state(1, 2, "text", FxHashMap::default());
        state.add_extra(
            "proposal_draft",
            serde_json::json!({"executive_summary": "Some text."}),
        );
        let snapshot = state.snapshot();
        let partial = node.run(snapshot, test_context("critic")).await.unwrap();
        let extra = partial.extra.unwrap();
        let score = extra.get("critic_score").unwrap().as_f64().unwrap() as f32;
        assert!((score - 0.875).abs() < 0.01);
        let _ = &mut state;
    }

    #[tokio::test]
    async fn logs_warning_when_cap_reached_below_threshold() {
        let response = serde_json::json!({
            "clarity": 50, "completeness": 50, "relevance": 50, "professionalism": 50,
            "weak_sections": ["executive_summary"], "suggestions": []
        })
        .to_string();
        let node = CriticNode::new(Arc::new(StubLlmGateway::with_response(response)), 2, 0.9);

        let mut state = new_initial_state(1, 2, "text", FxHashMap::default());
        state.add_extra(
            "proposal_draft",
            serde_json::json!({"executive_summary": "Some text."}),
        );
        state.add_extra("refinement_iterations", serde_json::json!(2));
        let snapshot = state.snapshot();
        let partial = node.run(snapshot, test_context("critic")).await.unwrap();
        let extra = partial.extra.unwrap();
        assert!(extra.contains_key("__warn__critic"));
        let _ = &mut state;
    }
}
