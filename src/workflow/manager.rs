//! Owns one [`AppRunner`] session per `(project_id, rfp_document_id)` pair
//! and drives it to completion or to the human-approval pause point.
//!
//! Ported from `original_source/backend/workflows/workflow_manager.py`,
//! restructured per the "global singletons -> explicit collaborators" note:
//! the original module-level dict of running workflows becomes an
//! explicit `FxHashMap` field, and the module-level KnowledgeGraph/LLM
//! client globals become constructor-injected `Arc`s.

use std::sync::Arc;

use async_trait::async_trait;
use rustc_hash::FxHashMap;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::app::App;
use crate::channels::Channel;
use crate::runtimes::{AppRunner, CheckpointerType};
use crate::state::VersionedState;
use crate::types::NodeKind;
use crate::workflow::config::OrchestratorConfig;
use crate::workflow::errors::WorkflowError;
use crate::workflow::events;
use crate::workflow::knowledge_graph::KnowledgeGraph;
use crate::workflow::llm::LlmGateway;
use crate::workflow::nodes::support::Retriever;
use crate::workflow::state::{
    new_initial_state, proposal_section_title, Challenge, MatchingCaseStudy, WorkflowSnapshotView,
    PROPOSAL_DRAFT_KEYS,
};

/// A single ordered section of an assembled proposal, derived from the
/// canonical 13-key draft.
#[derive(Clone, Debug, Serialize)]
pub struct ProposalSection {
    pub key: String,
    pub title: String,
    pub body: String,
    pub order: u32,
}

/// A proposal ready to persist: the 13 canonical sections in order.
#[derive(Clone, Debug, Serialize)]
pub struct Proposal {
    pub project_id: i64,
    pub rfp_document_id: i64,
    pub sections: Vec<ProposalSection>,
}

/// Analyzer/challenge/proposition/case-study/competitor findings ready to
/// persist, independent of the proposal draft itself.
#[derive(Clone, Debug, Serialize)]
pub struct Insights {
    pub project_id: i64,
    pub rfp_document_id: i64,
    pub rfp_summary: String,
    pub business_objectives: Vec<String>,
    pub challenges: Vec<Challenge>,
    pub value_propositions: Value,
    pub matching_case_studies: Vec<MatchingCaseStudy>,
    pub competitors: Value,
    pub battle_cards: Value,
}

/// Coarse-grained run status, per spec.md §6.1's `get_status_by_project`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    NotStarted,
    Pending,
    Running,
    Error,
    Completed,
}

/// Per-agent completion booleans, derived from which output keys a run's
/// state carries rather than tracked separately — a node's output key is
/// only ever set once that node has run to completion (see each node's
/// early-return failure paths in `src/workflow/nodes`).
#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct WorkflowProgress {
    pub analyzer: bool,
    pub challenge_extractor: bool,
    pub discovery_question: bool,
    pub value_proposition: bool,
    pub case_study_matcher: bool,
    pub competitor_analyzer: bool,
    pub outline_generator: bool,
    pub proposal_builder: bool,
    pub critic: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct WorkflowStatusReport {
    pub status: RunStatus,
    pub current_step: Option<String>,
    pub progress: WorkflowProgress,
    pub errors: Vec<String>,
}

/// Persistence seam. The database schema itself is out of scope (spec's
/// Non-goals); callers supply an implementation backed by whatever store
/// they use.
#[async_trait]
pub trait PersistenceSink: Send + Sync {
    async fn save_insights(&self, insights: Insights) -> Result<(), WorkflowError>;
    async fn save_proposal(&self, proposal: Proposal) -> Result<(), WorkflowError>;
}

/// Discards everything. Useful for tests and for callers that only want
/// in-memory state inspection via `get_state`.
#[derive(Debug, Default)]
pub struct NoopPersistenceSink;

#[async_trait]
impl PersistenceSink for NoopPersistenceSink {
    async fn save_insights(&self, _insights: Insights) -> Result<(), WorkflowError> {
        Ok(())
    }

    async fn save_proposal(&self, _proposal: Proposal) -> Result<(), WorkflowError> {
        Ok(())
    }
}

struct ActiveRun {
    runner: AppRunner,
    session_id: String,
    completed: bool,
}

/// Dependencies a run's compiled graph needs; threaded through to
/// [`crate::workflow::graph::build_rfp_graph`] once, at `WorkflowManager`
/// construction.
pub struct WorkflowManager {
    app: Arc<App>,
    config: OrchestratorConfig,
    sink: Arc<dyn PersistenceSink>,
    runs: Mutex<FxHashMap<(i64, i64), ActiveRun>>,
}

fn human_approval_node() -> NodeKind {
    NodeKind::Custom("human_approval".to_string())
}

/// Recovers the spec's §7 error-kind taxonomy from a `run_step` failure.
///
/// The analyzer is the only node whose errors propagate this far (every
/// other node catches internally, per spec.md §7's "only analyzer and
/// proposal-builder failures are fatal" policy — proposal_builder never
/// actually errors, it always falls back to the canonical template draft).
/// `RunnerError`/`SchedulerError` wrap the failing `NodeError` without
/// reformatting its message, so walking the `source()` chain and matching
/// on `Display` text recovers the same distinction `LlmError`'s variants
/// made, without downcasting across the scheduler boundary.
fn classify_run_error(err: crate::runtimes::RunnerError) -> WorkflowError {
    use std::error::Error as _;

    let mut chain = err.to_string();
    let mut cause = err.source();
    while let Some(source) = cause {
        chain.push_str(": ");
        chain.push_str(&source.to_string());
        cause = source.source();
    }
    let message = chain;
    if message.contains("circuit open") {
        WorkflowError::CircuitOpen {
            provider: "llm".to_string(),
        }
    } else if message.contains("permanent upstream") {
        WorkflowError::PermanentUpstream {
            provider: "llm".to_string(),
            message,
        }
    } else if message.contains("transient upstream") {
        WorkflowError::TransientUpstream {
            provider: "llm".to_string(),
            message,
        }
    } else {
        WorkflowError::Internal(message)
    }
}

impl WorkflowManager {
    pub fn new(
        llm: Arc<dyn LlmGateway>,
        retriever: Arc<dyn Retriever>,
        knowledge_graph: Arc<KnowledgeGraph>,
        config: OrchestratorConfig,
        sink: Arc<dyn PersistenceSink>,
    ) -> Result<Self, crate::graphs::GraphCompileError> {
        let deps = super::graph::GraphDeps {
            llm,
            retriever,
            knowledge_graph,
        };
        let app = super::graph::build_rfp_graph(deps, &config)?;
        Ok(Self {
            app: Arc::new(app),
            config,
            sink,
            runs: Mutex::new(FxHashMap::default()),
        })
    }

    fn session_id(project_id: i64, rfp_document_id: i64) -> String {
        format!("rfp-{project_id}-{rfp_document_id}")
    }

    /// Starts a new run for `(project_id, rfp_document_id)`. Returns
    /// [`WorkflowError::Busy`] if a run for that key is already in flight;
    /// a completed or paused prior run for the same key is replaced.
    pub async fn start_run(
        &self,
        project_id: i64,
        rfp_document_id: i64,
        rfp_text: &str,
        selected_tasks: FxHashMap<String, bool>,
    ) -> Result<VersionedState, WorkflowError> {
        if rfp_text.trim().is_empty() {
            return Err(WorkflowError::ValidationError(
                "rfp_text is empty; nothing to analyze".to_string(),
            ));
        }

        let key = (project_id, rfp_document_id);
        {
            let runs = self.runs.lock().await;
            if let Some(existing) = runs.get(&key) {
                if !existing.completed {
                    return Err(WorkflowError::Busy {
                        project_id,
                        rfp_document_id,
                    });
                }
            }
        }

        let session_id = Self::session_id(project_id, rfp_document_id);
        let mut runner = AppRunner::from_arc(self.app.clone(), CheckpointerType::InMemory).await;
        let initial_state = new_initial_state(project_id, rfp_document_id, rfp_text, selected_tasks);
        runner
            .create_session(session_id.clone(), initial_state)
            .await
            .map_err(|e| WorkflowError::Internal(e.to_string()))?;

        {
            let mut runs = self.runs.lock().await;
            runs.insert(
                key,
                ActiveRun {
                    runner,
                    session_id,
                    completed: false,
                },
            );
        }

        self.drive(key).await
    }

    /// Advances a run until it completes or pauses at the human-approval
    /// gate. Returns the state at whichever point the run stopped.
    async fn drive(&self, key: (i64, i64)) -> Result<VersionedState, WorkflowError> {
        use crate::runtimes::{StepOptions, StepResult};

        loop {
            let mut runs = self.runs.lock().await;
            let run = runs
                .get_mut(&key)
                .ok_or_else(|| WorkflowError::NotFound(format!("{key:?}")))?;

            let awaiting_approval = self.config.require_outline_approval
                && !run
                    .runner
                    .get_session(&run.session_id)
                    .map(|s| WorkflowSnapshotView::new(&s.state.snapshot()).outline_approved().is_approved())
                    .unwrap_or(false);

            let options = if awaiting_approval {
                StepOptions {
                    interrupt_before: vec![human_approval_node()],
                    ..Default::default()
                }
            } else {
                StepOptions::default()
            };

            let result = run
                .runner
                .run_step(&run.session_id, options)
                .await
                .map_err(classify_run_error)?;

            match result {
                StepResult::Paused(report) => {
                    return Ok(report.session_state.state);
                }
                StepResult::Completed(report) => {
                    if report.completed {
                        run.completed = true;
                        let state = run
                            .runner
                            .get_session(&run.session_id)
                            .map(|s| s.state.clone())
                            .ok_or_else(|| WorkflowError::NotFound(format!("{key:?}")))?;
                        return Ok(state);
                    }
                }
            }
        }
    }

    /// Records a human approval/rejection decision for the outline and, if
    /// approved, resumes the paused run. Idempotent: calling with the same
    /// decision the run already recorded is a no-op (no re-emitted event,
    /// no re-driven run).
    pub async fn approve_outline(
        &self,
        project_id: i64,
        rfp_document_id: i64,
        approved: bool,
    ) -> Result<VersionedState, WorkflowError> {
        use crate::workflow::state::{OutlineApproval, WorkflowState};

        let key = (project_id, rfp_document_id);
        let already_matches = {
            let mut runs = self.runs.lock().await;
            let run = runs
                .get_mut(&key)
                .ok_or_else(|| WorkflowError::NotFound(format!("{key:?}")))?;

            let current = run
                .runner
                .get_session(&run.session_id)
                .map(|s| WorkflowSnapshotView::new(&s.state.snapshot()).outline_approved())
                .unwrap_or_default();
            let requested = if approved {
                OutlineApproval::Approved
            } else {
                OutlineApproval::Rejected
            };

            if current == requested {
                true
            } else {
                if let Some(session) = run.runner.get_session_mut(&run.session_id) {
                    WorkflowState::new(&mut session.state).set_outline_approved(requested);
                }
                run.runner
                    .event_emitter()
                    .emit(events::outline_approval(project_id, approved))
                    .ok();
                false
            }
        };

        if approved && !already_matches {
            self.drive(key).await
        } else {
            let runs = self.runs.lock().await;
            let run = runs
                .get(&key)
                .ok_or_else(|| WorkflowError::NotFound(format!("{key:?}")))?;
            run.runner
                .get_session(&run.session_id)
                .map(|s| s.state.clone())
                .ok_or_else(|| WorkflowError::NotFound(format!("{key:?}")))
        }
    }

    /// Returns a clone of the current state for `(project_id,
    /// rfp_document_id)`, whether the run is paused, completed, or mid-flight.
    pub async fn get_state(
        &self,
        project_id: i64,
        rfp_document_id: i64,
    ) -> Option<VersionedState> {
        let runs = self.runs.lock().await;
        let run = runs.get(&(project_id, rfp_document_id))?;
        run.runner.get_session(&run.session_id).map(|s| s.state.clone())
    }

    /// Returns the state of every run currently tracked for `project_id`.
    pub async fn get_state_by_project(&self, project_id: i64) -> Vec<(i64, VersionedState)> {
        let runs = self.runs.lock().await;
        runs.iter()
            .filter(|((pid, _), _)| *pid == project_id)
            .filter_map(|((_, doc_id), run)| {
                run.runner
                    .get_session(&run.session_id)
                    .map(|s| (*doc_id, s.state.clone()))
            })
            .collect()
    }

    /// Status/debug summary for `project_id`'s most recently started run, per
    /// spec.md §6.1's `get_status_by_project`. Picks the run with the
    /// smallest `rfp_document_id` when more than one is tracked, since the
    /// underlying registry doesn't order by start time; callers that care
    /// about a specific document should use `get_state` instead.
    pub async fn get_status_by_project(&self, project_id: i64) -> Option<WorkflowStatusReport> {
        let runs = self.runs.lock().await;
        let run = runs
            .iter()
            .filter(|((pid, _), _)| *pid == project_id)
            .min_by_key(|((_, doc_id), _)| *doc_id)
            .map(|(_, run)| run)?;
        let session = run.runner.get_session(&run.session_id)?;
        let view = WorkflowSnapshotView::new(&session.state.snapshot());

        let awaiting_approval = self.config.require_outline_approval
            && view.has_key("proposal_outline")
            && !view.outline_approved().is_approved();
        let errors = view.errors();
        let status = if run.completed {
            RunStatus::Completed
        } else if awaiting_approval {
            RunStatus::Pending
        } else if !errors.is_empty() {
            RunStatus::Error
        } else {
            RunStatus::Running
        };

        let current_step = if awaiting_approval {
            Some("human_approval".to_string())
        } else {
            session
                .state
                .extra
                .get()
                .get("current_step")
                .and_then(|v| v.as_str())
                .map(str::to_string)
        };

        Some(WorkflowStatusReport {
            status,
            current_step,
            progress: WorkflowProgress {
                analyzer: view.has_key("rfp_summary"),
                challenge_extractor: view.has_key("challenges"),
                discovery_question: view.has_key("discovery_questions"),
                value_proposition: view.has_key("value_propositions"),
                case_study_matcher: view.has_key("matching_case_studies"),
                competitor_analyzer: view.has_key("competitors"),
                outline_generator: view.has_key("proposal_outline"),
                proposal_builder: view.has_key("proposal_draft"),
                critic: view.has_key("critic_score"),
            },
            errors,
        })
    }

    /// Writes the run's insights and (if a complete draft exists) its
    /// assembled proposal through the injected [`PersistenceSink`].
    ///
    /// Section derivation ported from `_convert_proposal_draft_to_sections`
    /// in the original source's `workflow_manager.py`.
    pub async fn persist(&self, project_id: i64, rfp_document_id: i64) -> Result<(), WorkflowError> {
        let state = self
            .get_state(project_id, rfp_document_id)
            .await
            .ok_or_else(|| WorkflowError::NotFound(format!("{project_id}/{rfp_document_id}")))?;

        let extra = state.extra.get();
        let view_challenges: Vec<Challenge> = extra
            .get("challenges")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default();
        let matching_case_studies: Vec<MatchingCaseStudy> = extra
            .get("matching_case_studies")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default();

        let insights = Insights {
            project_id,
            rfp_document_id,
            rfp_summary: extra
                .get("rfp_summary")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
            business_objectives: extra
                .get("business_objectives")
                .and_then(|v| serde_json::from_value(v.clone()).ok())
                .unwrap_or_default(),
            challenges: view_challenges,
            value_propositions: extra.get("value_propositions").cloned().unwrap_or(Value::Null),
            matching_case_studies,
            competitors: extra.get("competitors").cloned().unwrap_or(Value::Null),
            battle_cards: extra.get("battle_cards").cloned().unwrap_or(Value::Null),
        };
        self.sink.save_insights(insights).await?;

        if let Some(draft) = extra
            .get("proposal_draft")
            .and_then(|v| v.as_object())
            .filter(|d| PROPOSAL_DRAFT_KEYS.iter().all(|k| d.contains_key(*k)))
        {
            let sections = PROPOSAL_DRAFT_KEYS
                .iter()
                .enumerate()
                .map(|(order, key)| ProposalSection {
                    key: key.to_string(),
                    title: proposal_section_title(key).to_string(),
                    body: draft
                        .get(*key)
                        .and_then(|v| v.as_str())
                        .unwrap_or_default()
                        .to_string(),
                    order: order as u32,
                })
                .collect();
            self.sink
                .save_proposal(Proposal {
                    project_id,
                    rfp_document_id,
                    sections,
                })
                .await?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::llm::testing::StubLlmGateway;
    use crate::workflow::nodes::support::StubRetriever;

    fn manager() -> WorkflowManager {
        WorkflowManager::new(
            Arc::new(StubLlmGateway::with_response("{}")),
            Arc::new(StubRetriever::new(vec![])),
            Arc::new(KnowledgeGraph::new()),
            OrchestratorConfig::default().with_require_outline_approval(false),
            Arc::new(NoopPersistenceSink),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn second_start_run_for_same_key_is_busy() {
        let manager = manager();
        let runner = AppRunner::from_arc(manager.app.clone(), CheckpointerType::InMemory).await;
        {
            let mut runs = manager.runs.lock().await;
            runs.insert(
                (1, 2),
                ActiveRun {
                    runner,
                    session_id: "existing-in-flight".to_string(),
                    completed: false,
                },
            );
        }

        let result = manager.start_run(1, 2, "We need help.", FxHashMap::default()).await;
        assert!(matches!(result, Err(WorkflowError::Busy { .. })));
    }

    #[tokio::test]
    async fn get_state_returns_none_for_unknown_key() {
        let manager = manager();
        assert!(manager.get_state(99, 99).await.is_none());
    }
}
