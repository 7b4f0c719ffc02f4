//! End-to-end scenarios for the RFP proposal workflow (spec.md §8's
//! literal S1-S6), exercised through the real compiled graph and
//! `WorkflowManager` rather than individual node unit tests.

use std::sync::Arc;

use rfpgraph::workflow::knowledge_graph::KnowledgeGraph;
use rfpgraph::workflow::llm::testing::{FailingLlmGateway, ScriptedLlmGateway, StubLlmGateway};
use rfpgraph::workflow::llm::{LlmError, TaskType};
use rfpgraph::workflow::manager::{NoopPersistenceSink, RunStatus, WorkflowManager};
use rfpgraph::workflow::nodes::support::StubRetriever;
use rfpgraph::workflow::state::{WorkflowSnapshotView, PROPOSAL_DRAFT_KEYS};
use rfpgraph::workflow::OrchestratorConfig;
use rfpgraph::workflow::errors::WorkflowError;
use rustc_hash::FxHashMap;

fn critic_response(score: f32) -> String {
    serde_json::json!({
        "clarity": score, "completeness": score, "relevance": score, "professionalism": score,
        "weak_sections": if score < 90.0 { vec!["executive_summary"] } else { Vec::<&str>::new() },
        "suggestions": [],
    })
    .to_string()
}

fn manager_with(
    gateway: Arc<dyn rfpgraph::workflow::llm::LlmGateway>,
    config: OrchestratorConfig,
) -> WorkflowManager {
    WorkflowManager::new(
        gateway,
        Arc::new(StubRetriever::empty()),
        Arc::new(KnowledgeGraph::new()),
        config,
        Arc::new(NoopPersistenceSink),
    )
    .expect("graph compiles")
}

fn log_steps(state: &rfpgraph::state::VersionedState) -> Vec<String> {
    let view = WorkflowSnapshotView::new(&state.snapshot());
    view.execution_log().into_iter().map(|e| e.step).collect()
}

/// S1 — happy path: a single critic pass clears the 0.9 threshold, so no
/// refinement is needed and every node in the canonical graph runs once.
#[tokio::test]
async fn s1_happy_path_single_critic_pass() {
    let gateway = Arc::new(
        ScriptedLlmGateway::new("{}").with_queue(
            TaskType::Analysis,
            vec![
                r#"{"rfp_summary": "Cloud CRM to grow sales.", "business_objectives": ["Grow sales 30%"], "project_scope": "CRM rollout"}"#.to_string(),
                r#"{"challenges": [{"text": "Legacy CRM", "type": "technical", "impact": "high", "category": "infra"}]}"#.to_string(),
                critic_response(95.0),
            ],
        ),
    );
    let config = OrchestratorConfig::default().with_require_outline_approval(false);
    let manager = manager_with(gateway, config);

    let state = manager
        .start_run(
            1,
            1,
            "We need a cloud CRM to grow sales 30%.",
            FxHashMap::default(),
        )
        .await
        .expect("run succeeds");

    let view = WorkflowSnapshotView::new(&state.snapshot());
    assert!(view.challenges().len() >= 1);
    assert!(view.has_complete_draft());
    assert!((view.critic_score().unwrap() - 0.95).abs() < 0.01);
    assert_eq!(view.refinement_iterations(), 0);

    let steps = log_steps(&state);
    for expected in [
        "analyzer",
        "challenge_extractor",
        "discovery_question",
        "value_proposition",
        "case_study_matcher",
        "competitor_analyzer",
        "outline_generator",
        "proposal_builder",
        "critic",
    ] {
        assert!(steps.contains(&expected.to_string()), "missing log entry for {expected}: {steps:?}");
    }
    assert!(!steps.contains(&"refine".to_string()));
}

/// S2 — refinement cycle: critic scores 60 and 75 fall below the 0.9
/// threshold so each triggers a refine; the third visit clears the
/// threshold at 95 and the run ends, having refined exactly twice.
#[tokio::test]
async fn s2_refinement_cycle_ends_once_threshold_cleared() {
    let gateway = Arc::new(
        ScriptedLlmGateway::new("{}").with_queue(
            TaskType::Analysis,
            vec![
                r#"{"rfp_summary": "summary", "business_objectives": [], "project_scope": "scope"}"#.to_string(),
                r#"{"challenges": []}"#.to_string(),
                critic_response(60.0),
                critic_response(75.0),
                critic_response(95.0),
            ],
        ),
    );
    let config = OrchestratorConfig::default()
        .with_require_outline_approval(false)
        .with_max_refinement_iterations(3);
    let manager = manager_with(gateway, config);

    let state = manager
        .start_run(2, 1, "We need help with a proposal.", FxHashMap::default())
        .await
        .expect("run succeeds");

    let view = WorkflowSnapshotView::new(&state.snapshot());
    assert_eq!(view.refinement_iterations(), 2);
    assert!((view.critic_score().unwrap() - 0.95).abs() < 0.01);
    assert_eq!(view.critic_scores_history().len(), 3);
}

/// S3 — hits the iteration cap: critic always returns 50 with
/// `max_iterations = 2`; the run refines exactly twice and exits on the
/// cap guard rather than the score threshold.
#[tokio::test]
async fn s3_hits_iteration_cap() {
    let gateway = Arc::new(
        ScriptedLlmGateway::new("{}").with_queue(
            TaskType::Analysis,
            vec![
                r#"{"rfp_summary": "summary", "business_objectives": [], "project_scope": "scope"}"#.to_string(),
                r#"{"challenges": []}"#.to_string(),
                critic_response(50.0),
                critic_response(50.0),
                critic_response(50.0),
            ],
        ),
    );
    let config = OrchestratorConfig::default()
        .with_require_outline_approval(false)
        .with_max_refinement_iterations(2);
    let manager = manager_with(gateway, config);

    let state = manager
        .start_run(3, 1, "We need help with a proposal.", FxHashMap::default())
        .await
        .expect("run succeeds");

    let view = WorkflowSnapshotView::new(&state.snapshot());
    assert_eq!(view.refinement_iterations(), 2);
    assert!((view.critic_score().unwrap() - 0.5).abs() < 0.01);
    assert!(view
        .warnings()
        .iter()
        .any(|w| w.contains("Max iterations") && w.contains("reached")));
}

/// S4 — approval gate blocks: with `require_outline_approval = true` and
/// no approval recorded, the run pauses before `human_approval` and
/// `proposal_builder` never executes.
#[tokio::test]
async fn s4_approval_gate_blocks_proposal_builder() {
    let gateway = Arc::new(StubLlmGateway::with_response("{}"));
    let config = OrchestratorConfig::default().with_require_outline_approval(true);
    let manager = manager_with(gateway, config);

    let state = manager
        .start_run(4, 1, "We need a proposal for a new platform.", FxHashMap::default())
        .await
        .expect("run pauses rather than erroring");

    let view = WorkflowSnapshotView::new(&state.snapshot());
    assert!(!view.has_key("proposal_draft"));
    assert!(view.has_key("proposal_outline"));

    let status = manager
        .get_status_by_project(4)
        .await
        .expect("a run is tracked for project 4");
    assert_eq!(status.status, RunStatus::Pending);
    assert_eq!(status.current_step.as_deref(), Some("human_approval"));
    assert!(!status.progress.proposal_builder);
    assert!(status.progress.outline_generator);

    // Approving unblocks the rest of the run.
    let final_state = manager.approve_outline(4, 1, true).await.expect("approve succeeds");
    let final_view = WorkflowSnapshotView::new(&final_state.snapshot());
    assert!(final_view.has_complete_draft());
}

/// S5 — parallel skips: `selected_tasks.challenges = false` routes the
/// analyzer straight to `proposal_builder`, skipping the entire
/// challenge/discovery/value/case-study/competitor/outline fan-out.
#[tokio::test]
async fn s5_challenges_disabled_skips_fan_out() {
    let gateway = Arc::new(StubLlmGateway::with_response("{}"));
    let config = OrchestratorConfig::default().with_require_outline_approval(false);
    let manager = manager_with(gateway, config);

    let mut selected_tasks = FxHashMap::default();
    selected_tasks.insert("challenges".to_string(), false);

    let state = manager
        .start_run(5, 1, "We need a proposal.", selected_tasks)
        .await
        .expect("run succeeds");

    let view = WorkflowSnapshotView::new(&state.snapshot());
    assert!(view.challenges().is_empty());
    assert!(!view.has_key("discovery_questions"));
    assert!(!view.has_key("value_propositions"));
    assert!(!view.has_key("matching_case_studies"));
    assert!(view.has_complete_draft());

    let steps = log_steps(&state);
    assert!(steps.contains(&"analyzer".to_string()));
    assert!(steps.contains(&"proposal_builder".to_string()));
    assert!(!steps.contains(&"challenge_extractor".to_string()));
}

/// S6 — upstream outage: the LLM gateway's circuit is open for the
/// analyzer's first (and only, since analyzer is critical) call. The run
/// fails with `CircuitOpen` and no run is left completed.
#[tokio::test]
async fn s6_circuit_open_fails_the_run() {
    let gateway = Arc::new(FailingLlmGateway {
        error: LlmError::CircuitOpen {
            provider: "openai".to_string(),
        },
    });
    let config = OrchestratorConfig::default().with_require_outline_approval(false);
    let manager = manager_with(gateway, config);

    let result = manager
        .start_run(6, 1, "We need a proposal for a logistics platform.", FxHashMap::default())
        .await;

    assert!(matches!(result, Err(WorkflowError::CircuitOpen { .. })), "{result:?}");
    assert!(manager.get_state(6, 1).await.is_none());
}

/// Boundary: an empty RFP document fails validation before the analyzer
/// ever runs, rather than propagating an LLM/provider error.
#[tokio::test]
async fn empty_rfp_text_fails_validation_before_analyzer() {
    let gateway = Arc::new(StubLlmGateway::with_response("{}"));
    let manager = manager_with(gateway, OrchestratorConfig::default());

    let result = manager.start_run(7, 1, "   ", FxHashMap::default()).await;
    assert!(matches!(result, Err(WorkflowError::ValidationError(_))), "{result:?}");
}

/// Invariant 3 (spec.md §8): whenever the analyzer succeeds, the final
/// draft always has exactly the 13 canonical keys, with or without a
/// refinement cycle.
#[tokio::test]
async fn proposal_draft_always_has_thirteen_canonical_keys() {
    let gateway = Arc::new(StubLlmGateway::with_response("{}"));
    let config = OrchestratorConfig::default().with_require_outline_approval(false);
    let manager = manager_with(gateway, config);

    let state = manager
        .start_run(8, 1, "A short RFP.", FxHashMap::default())
        .await
        .expect("run succeeds");

    let view = WorkflowSnapshotView::new(&state.snapshot());
    let draft = view.proposal_draft().expect("draft present");
    assert_eq!(draft.len(), PROPOSAL_DRAFT_KEYS.len());
    for key in PROPOSAL_DRAFT_KEYS {
        assert!(!draft.get(key).unwrap().is_empty());
    }
}

/// Idempotence (spec.md §8): approving the outline twice with the same
/// decision does not advance state or re-run the downstream graph.
#[tokio::test]
async fn approving_outline_twice_is_idempotent() {
    let gateway = Arc::new(StubLlmGateway::with_response("{}"));
    let config = OrchestratorConfig::default().with_require_outline_approval(true);
    let manager = manager_with(gateway, config);

    manager
        .start_run(9, 1, "We need a proposal.", FxHashMap::default())
        .await
        .expect("run pauses at human_approval");

    let first = manager.approve_outline(9, 1, true).await.expect("first approval");
    let second = manager.approve_outline(9, 1, true).await.expect("second approval is a no-op");

    let first_log_len = log_steps(&first).len();
    let second_log_len = log_steps(&second).len();
    assert_eq!(first_log_len, second_log_len);
}
