//! `CompetitorAnalyzerNode` — part of the post-`challenge_extractor` parallel
//! fan-out, but gated by the **global** `enable_competitor_analysis` config
//! flag rather than `selected_tasks`, mirroring the asymmetry in the
//! original source's `competitor_analyzer_node`. Scans the RFP text for a
//! closed competitor keyword list, case-insensitive, and emits one battle
//! card per hit.

use async_trait::async_trait;

use crate::node::{Node, NodeContext, NodeError, NodePartial};
use crate::state::StateSnapshot;
use crate::workflow::state::{WorkflowPatch, WorkflowSnapshotView};

const COMPETITOR_KEYWORDS: &[&str] = &[
    "accenture",
    "deloitte",
    "capgemini",
    "tcs",
    "infosys",
    "wipro",
    "cognizant",
    "mckinsey",
    "pwc",
    "ey",
    "kpmg",
    "ibm",
];

pub struct CompetitorAnalyzerNode {
    enabled: bool,
}

impl CompetitorAnalyzerNode {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }
}

#[async_trait]
impl Node for CompetitorAnalyzerNode {
    async fn run(&self, snapshot: StateSnapshot, ctx: NodeContext) -> Result<NodePartial, NodeError> {
        let patch = WorkflowPatch::new("competitor_analyzer");

        if !self.enabled {
            ctx.emit_node("competitor_analyzer", "Competitor analysis disabled by config")
                .ok();
            return Ok(patch
                .with_log("skipped", "enable_competitor_analysis is disabled")
                .build());
        }

        let view = WorkflowSnapshotView::new(&snapshot);
        let rfp_text = view.rfp_text().unwrap_or_default();
        let lower = rfp_text.to_lowercase();

        let mut competitors = Vec::new();
        let mut battle_cards = Vec::new();
        for keyword in COMPETITOR_KEYWORDS {
            if lower.contains(keyword) {
                competitors.push(serde_json::json!(keyword));
                battle_cards.push(serde_json::json!({
                    "competitor": keyword,
                    "weaknesses": ["Higher cost of ongoing change requests"],
                    "gaps": ["Less proven domain-specific accelerators"],
                    "recommendations": ["Emphasize faster time-to-value and flexible engagement model"],
                }));
            }
        }

        Ok(patch
            .set("competitors", serde_json::json!(competitors))
            .set("battle_cards", serde_json::json!(battle_cards))
            .with_log(
                "success",
                &format!("Detected {} named competitors", battle_cards.len()),
            )
            .build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::nodes::support::test_context;
    use crate::workflow::state::new_initial_state;
    use rustc_hash::FxHashMap;

    #[tokio::test]
    async fn detects_named_competitors_case_insensitively() {
        let node = CompetitorAnalyzerNode::new(true);
        let mut state = new_initial_state(
            1,
            2,
            "We previously engaged Accenture and IBM for similar work.",
            FxHashMap::default(),
        );
        let snapshot = state.snapshot();
        let partial = node
            .run(snapshot, test_context("competitor_analyzer"))
            .await
            .unwrap();
        let extra = partial.extra.unwrap();
        let competitors = extra.get("competitors").unwrap().as_array().unwrap();
        assert_eq!(competitors.len(), 2);
        let _ = &mut state;
    }

    #[tokio::test]
    async fn skips_entirely_when_disabled() {
        let node = CompetitorAnalyzerNode::new(false);
        let mut state = new_initial_state(1, 2, "Accenture mentioned here.", FxHashMap::default());
        let snapshot = state.snapshot();
        let partial = node
            .run(snapshot, test_context("competitor_analyzer"))
            .await
            .unwrap();
        let extra = partial.extra.unwrap();
        assert!(!extra.contains_key("competitors"));
        let _ = &mut state;
    }
}
