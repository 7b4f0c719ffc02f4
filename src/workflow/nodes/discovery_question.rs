//! `DiscoveryQuestionNode` — part of the post-`challenge_extractor` parallel
//! fan-out. Groups at least three discovery questions per domain
//! (business/technical/KPI/compliance) to hand to the client during
//! discovery calls.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::node::{Node, NodeContext, NodeError, NodePartial};
use crate::state::StateSnapshot;
use crate::workflow::llm::{LlmGateway, LlmMessage, TaskType};
use crate::workflow::nodes::support::extract_json;
use crate::workflow::state::WorkflowPatch;
use crate::workflow::state::WorkflowSnapshotView;

const MIN_QUESTIONS_PER_DOMAIN: usize = 3;
const DOMAINS: [&str; 4] = ["business", "technical", "kpi", "compliance"];

pub struct DiscoveryQuestionNode {
    llm: Arc<dyn LlmGateway>,
}

impl DiscoveryQuestionNode {
    pub fn new(llm: Arc<dyn LlmGateway>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl Node for DiscoveryQuestionNode {
    async fn run(&self, snapshot: StateSnapshot, ctx: NodeContext) -> Result<NodePartial, NodeError> {
        let view = WorkflowSnapshotView::new(&snapshot);
        let rfp_summary = view.rfp_summary().unwrap_or_default();
        let challenges = view.challenges();
        let challenge_text = challenges
            .iter()
            .map(|c| c.text.clone())
            .collect::<Vec<_>>()
            .join("; ");

        let system = LlmMessage::system(
            "Generate client discovery questions grouped by domain. Respond with \
             strict JSON: {\"business\": [string], \"technical\": [string], \
             \"kpi\": [string], \"compliance\": [string]}. Produce at least 3 \
             questions per domain.",
        );
        let user = LlmMessage::user(format!(
            "RFP summary:\n{rfp_summary}\n\nChallenges:\n{challenge_text}"
        ));

        let patch = WorkflowPatch::new("discovery_question");

        let result = self
            .llm
            .complete(TaskType::FastGeneration, vec![system, user], 0.4, 900)
            .await;

        let completion = match result {
            Ok(c) => c,
            Err(e) => {
                ctx.emit_diagnostic("discovery_question", format!("LLM call failed: {e}")).ok();
                return Ok(patch
                    .with_warning(&format!("discovery question generation failed: {e}"))
                    .with_log("error", &e.to_string())
                    .build());
            }
        };

        let mut grouped = extract_json(&completion.text)
            .and_then(|v| v.as_object().cloned())
            .unwrap_or_default();

        for domain in DOMAINS {
            let entry = grouped.entry(domain.to_string()).or_insert_with(|| Value::Array(vec![]));
            let list = entry.as_array().cloned().unwrap_or_default();
            if list.len() < MIN_QUESTIONS_PER_DOMAIN {
                let mut filled = list;
                while filled.len() < MIN_QUESTIONS_PER_DOMAIN {
                    filled.push(serde_json::json!(format!(
                        "What else should we know about {} considerations for this project?",
                        domain
                    )));
                }
                *entry = Value::Array(filled);
            }
        }
        grouped.retain(|k, _| DOMAINS.contains(&k.as_str()));

        Ok(patch
            .set("discovery_questions", Value::Object(grouped))
            .with_log("success", "Generated grouped discovery questions")
            .build())
    }
}
