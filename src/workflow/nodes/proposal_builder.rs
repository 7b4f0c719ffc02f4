//! `ProposalBuilderNode` — assembles the proposal draft's 13 canonical
//! sections. Always produces a complete draft: any section the LLM omits,
//! or the entire draft if the LLM call fails outright, falls back to
//! `default_proposal_templates()`. Unlike the original source (whose
//! error-path fallback used a different, non-canonical 6-key draft — see
//! DESIGN.md), every fallback path here uses the same canonical 13 keys,
//! per spec.md §8 invariant 3.

use std::sync::Arc;

use async_trait::async_trait;

use crate::node::{Node, NodeContext, NodeError, NodePartial};
use crate::state::StateSnapshot;
use crate::workflow::llm::{LlmGateway, LlmMessage, TaskType};
use crate::workflow::nodes::support::{default_proposal_templates, extract_json};
use crate::workflow::state::{WorkflowPatch, WorkflowSnapshotView, PROPOSAL_DRAFT_KEYS};

pub struct ProposalBuilderNode {
    llm: Arc<dyn LlmGateway>,
}

impl ProposalBuilderNode {
    pub fn new(llm: Arc<dyn LlmGateway>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl Node for ProposalBuilderNode {
    async fn run(&self, snapshot: StateSnapshot, ctx: NodeContext) -> Result<NodePartial, NodeError> {
        let view = WorkflowSnapshotView::new(&snapshot);
        let rfp_summary = view.rfp_summary().unwrap_or_default();
        let business_objectives = view.business_objectives().join("; ");
        let challenges_text = view
            .challenges()
            .iter()
            .map(|c| c.text.clone())
            .collect::<Vec<_>>()
            .join("; ");
        let case_studies_text = view
            .matching_case_studies()
            .iter()
            .map(|cs| cs.title.clone())
            .collect::<Vec<_>>()
            .join("; ");

        let system = LlmMessage::system(
            "Write the content for each proposal section. Respond with strict \
             JSON: {\"sections\": {<section_key>: <section body text>}}. Use \
             only these keys: executive_summary, understanding_client_needs, \
             proposed_solution, solution_architecture, business_value_use_cases, \
             benefits_roi, implementation_roadmap, change_management_training, \
             security_compliance, case_studies_credentials, commercial_model, \
             risks_assumptions, next_steps_cta.",
        );
        let user = LlmMessage::user(format!(
            "RFP summary:\n{rfp_summary}\n\nBusiness objectives:\n{business_objectives}\n\n\
             Challenges:\n{challenges_text}\n\nMatching case studies:\n{case_studies_text}"
        ));

        let templates: std::collections::HashMap<_, _> = default_proposal_templates().into_iter().collect();

        let sections = match self
            .llm
            .complete(TaskType::HighQuality, vec![system, user], 0.4, 2200)
            .await
        {
            Ok(completion) => extract_json(&completion.text)
                .and_then(|v| v.get("sections").cloned())
                .and_then(|v| v.as_object().cloned())
                .unwrap_or_default(),
            Err(e) => {
                ctx.emit_diagnostic("proposal_builder", format!("LLM call failed, using fallback draft: {e}"))
                    .ok();
                serde_json::Map::new()
            }
        };

        let mut draft = std::collections::HashMap::new();
        for key in PROPOSAL_DRAFT_KEYS {
            let text = sections
                .get(key)
                .and_then(|v| v.as_str())
                .filter(|s| !s.trim().is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| templates.get(key).copied().unwrap_or_default().to_string());
            draft.insert(key.to_string(), text);
        }

        ctx.emit_node("proposal_builder", "Assembled proposal draft").ok();

        Ok(WorkflowPatch::new("proposal_builder")
            .set("proposal_draft", serde_json::json!(draft))
            .set("current_step", serde_json::json!("proposal_builder"))
            .with_log("success", "Assembled complete 13-section proposal draft")
            .build())
    }
}
