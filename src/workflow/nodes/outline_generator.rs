//! `OutlineGeneratorNode` — emits the fixed 13-section proposal outline
//! skeleton. Any section the LLM's proposed outline omits is filled from
//! `default_proposal_templates()`, so the outline is always complete before
//! `human_approval` is reached.

use std::sync::Arc;

use async_trait::async_trait;

use crate::node::{Node, NodeContext, NodeError, NodePartial};
use crate::state::StateSnapshot;
use crate::workflow::events;
use crate::workflow::llm::{LlmGateway, LlmMessage, TaskType};
use crate::workflow::nodes::support::{default_proposal_templates, extract_json};
use crate::workflow::state::{ProposalOutlineSection, WorkflowPatch, WorkflowSnapshotView, PROPOSAL_DRAFT_KEYS};

pub struct OutlineGeneratorNode {
    llm: Arc<dyn LlmGateway>,
}

impl OutlineGeneratorNode {
    pub fn new(llm: Arc<dyn LlmGateway>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl Node for OutlineGeneratorNode {
    async fn run(&self, snapshot: StateSnapshot, ctx: NodeContext) -> Result<NodePartial, NodeError> {
        let view = WorkflowSnapshotView::new(&snapshot);
        let project_id = view.project_id().unwrap_or_default();
        let rfp_summary = view.rfp_summary().unwrap_or_default();

        let system = LlmMessage::system(
            "Propose short section descriptions for a sales proposal outline. \
             Respond with strict JSON: {\"sections\": {<section_key>: <one \
             sentence description>}}. Keys you may use: \
             executive_summary, understanding_client_needs, proposed_solution, \
             solution_architecture, business_value_use_cases, benefits_roi, \
             implementation_roadmap, change_management_training, \
             security_compliance, case_studies_credentials, commercial_model, \
             risks_assumptions, next_steps_cta.",
        );
        let user = LlmMessage::user(format!("RFP summary:\n{rfp_summary}"));

        let descriptions = match self
            .llm
            .complete(TaskType::StructuredOutput, vec![system, user], 0.3, 700)
            .await
        {
            Ok(completion) => extract_json(&completion.text)
                .and_then(|v| v.get("sections").cloned())
                .and_then(|v| v.as_object().cloned())
                .unwrap_or_default(),
            Err(e) => {
                ctx.emit_diagnostic("outline_generator", format!("LLM call failed: {e}")).ok();
                serde_json::Map::new()
            }
        };

        let templates: std::collections::HashMap<_, _> = default_proposal_templates().into_iter().collect();
        let sections: Vec<ProposalOutlineSection> = PROPOSAL_DRAFT_KEYS
            .iter()
            .enumerate()
            .map(|(i, key)| {
                let description = descriptions
                    .get(*key)
                    .and_then(|v| v.as_str())
                    .filter(|s| !s.trim().is_empty())
                    .map(str::to_string)
                    .unwrap_or_else(|| templates.get(key).copied().unwrap_or_default().to_string());
                ProposalOutlineSection {
                    key: key.to_string(),
                    title: crate::workflow::state::proposal_section_title(key).to_string(),
                    description,
                    order: i as u32,
                }
            })
            .collect();

        let outline_json = events::outline_json(&sections);
        ctx.event_emitter
            .emit(events::skeleton(project_id, outline_json.clone()))
            .ok();

        Ok(WorkflowPatch::new("outline_generator")
            .set("proposal_outline", outline_json)
            .set("__replace__proposal_outline", serde_json::json!(true))
            .with_log("success", "Generated proposal outline skeleton")
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
    async fn fills_all_thirteen_sections_even_with_partial_llm_output() {
        let response = serde_json::json!({
            "sections": {"executive_summary": "Custom summary description."}
        })
        .to_string();
        let node = OutlineGeneratorNode::new(Arc::new(StubLlmGateway::with_response(response)));

        let mut state = new_initial_state(1, 2, "text", FxHashMap::default());
        let snapshot = state.snapshot();
        let partial = node
            .run(snapshot, test_context("outline_generator"))
            .await
            .unwrap();
        let extra = partial.extra.unwrap();
        let outline = extra.get("proposal_outline").unwrap().as_array().unwrap();
        assert_eq!(outline.len(), PROPOSAL_DRAFT_KEYS.len());
        assert_eq!(outline[0]["description"], "Custom summary description.");
        let _ = &mut state;
    }
}
