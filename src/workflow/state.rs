//! Typed accessors over [`VersionedState`] for the RFP workflow's domain
//! fields. Every field from the data model lives in the `extra` channel as
//! a namespaced JSON value; this module is the only place that knows the
//! key names, so node implementations never touch raw JSON.

use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::channels::Channel;
use crate::state::{StateSnapshot, VersionedState};
use crate::workflow::nodes::critic::RefinementFeedback;

/// The 13 canonical `proposal_draft` section keys, in the order the
/// proposal is assembled and persisted.
pub const PROPOSAL_DRAFT_KEYS: [&str; 13] = [
    "executive_summary",
    "understanding_client_needs",
    "proposed_solution",
    "solution_architecture",
    "business_value_use_cases",
    "benefits_roi",
    "implementation_roadmap",
    "change_management_training",
    "security_compliance",
    "case_studies_credentials",
    "commercial_model",
    "risks_assumptions",
    "next_steps_cta",
];

/// Human-readable titles for the 13 canonical sections, used when deriving
/// a `Proposal`'s ordered sections (see `WorkflowManager::persist`).
pub fn proposal_section_title(key: &str) -> &'static str {
    match key {
        "executive_summary" => "Executive Summary",
        "understanding_client_needs" => "Understanding Client Needs",
        "proposed_solution" => "Proposed Solution",
        "solution_architecture" => "Solution Architecture & Technology Stack",
        "business_value_use_cases" => "Business Value & Use Cases",
        "benefits_roi" => "Benefits & ROI Justification",
        "implementation_roadmap" => "Implementation Roadmap & Timeline",
        "change_management_training" => "Change Management & Training Strategy",
        "security_compliance" => "Security, Compliance & Data Governance",
        "case_studies_credentials" => "Case Studies & Delivery Credentials",
        "commercial_model" => "Commercial Model & Licensing Options",
        "risks_assumptions" => "Risks, Assumptions & Mitigation",
        "next_steps_cta" => "Next Steps & Call-to-Action",
        _ => "Additional Section",
    }
}

/// Tri-state outline approval, per the data model's invariant that
/// `outline_approved` is never simply a bool: it starts unset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutlineApproval {
    #[default]
    Unset,
    Approved,
    Rejected,
}

impl OutlineApproval {
    pub fn is_approved(self) -> bool {
        matches!(self, OutlineApproval::Approved)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Challenge {
    pub text: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub impact: String,
    pub category: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MatchingCaseStudy {
    pub id: String,
    pub title: String,
    pub industry: String,
    pub impact: String,
    pub description: String,
    pub score: f32,
    pub source: String, // "graph" | "rag" | "db"
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProposalOutlineSection {
    pub key: String,
    pub title: String,
    pub description: String,
    pub order: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExecutionLogEntry {
    pub step: String,
    pub status: String, // success | warning | error | pending | skipped
    pub detail: String,
    #[serde(default = "Utc::now")]
    pub at: DateTime<Utc>,
}

/// Typed, read/write view of the RFP `WorkflowState` backed by a
/// [`VersionedState`]'s `extra` channel.
pub struct WorkflowState<'a> {
    inner: &'a mut VersionedState,
}

impl<'a> WorkflowState<'a> {
    pub fn new(inner: &'a mut VersionedState) -> Self {
        Self { inner }
    }

    fn extra(&self) -> &FxHashMap<String, Value> {
        self.inner.extra.get()
    }

    fn extra_mut(&mut self) -> &mut FxHashMap<String, Value> {
        self.inner.extra.get_mut()
    }

    fn get_str(&self, key: &str) -> Option<String> {
        self.extra().get(key).and_then(|v| v.as_str()).map(String::from)
    }

    fn get_list<T: for<'de> Deserialize<'de>>(&self, key: &str) -> Vec<T> {
        self.extra()
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default()
    }

    pub fn project_id(&self) -> Option<i64> {
        self.extra().get("project_id").and_then(|v| v.as_i64())
    }

    pub fn rfp_document_id(&self) -> Option<i64> {
        self.extra().get("rfp_document_id").and_then(|v| v.as_i64())
    }

    pub fn rfp_text(&self) -> Option<String> {
        self.get_str("rfp_text")
    }

    pub fn selected_tasks(&self) -> FxHashMap<String, bool> {
        self.extra()
            .get("selected_tasks")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default()
    }

    /// `selected_tasks.challenges` defaults to enabled when absent, per the
    /// original source's `selected_tasks.get("challenges", True)`.
    pub fn challenges_selected(&self) -> bool {
        self.selected_tasks().get("challenges").copied().unwrap_or(true)
    }

    pub fn current_step(&self) -> Option<String> {
        self.get_str("current_step")
    }

    pub fn set_current_step(&mut self, step: &str) {
        self.extra_mut().insert("current_step".into(), json!(step));
    }

    pub fn rfp_summary(&self) -> Option<String> {
        self.get_str("rfp_summary")
    }

    pub fn challenges(&self) -> Vec<Challenge> {
        self.get_list("challenges")
    }

    pub fn business_objectives(&self) -> Vec<String> {
        self.get_list("business_objectives")
    }

    pub fn matching_case_studies(&self) -> Vec<MatchingCaseStudy> {
        self.get_list("matching_case_studies")
    }

    pub fn proposal_outline(&self) -> Vec<ProposalOutlineSection> {
        self.get_list("proposal_outline")
    }

    pub fn outline_approved(&self) -> OutlineApproval {
        self.extra()
            .get("outline_approved")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default()
    }

    pub fn set_outline_approved(&mut self, approval: OutlineApproval) {
        self.extra_mut()
            .insert("outline_approved".into(), json!(approval));
    }

    pub fn proposal_draft(&self) -> Option<FxHashMap<String, String>> {
        self.extra()
            .get("proposal_draft")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub fn critic_score(&self) -> Option<f32> {
        self.extra().get("critic_score").and_then(|v| v.as_f64()).map(|f| f as f32)
    }

    pub fn refinement_iterations(&self) -> u32 {
        self.extra()
            .get("refinement_iterations")
            .and_then(|v| v.as_u64())
            .unwrap_or(0) as u32
    }

    pub fn critic_scores_history(&self) -> Vec<RefinementFeedback> {
        self.get_list("critic_scores_history")
    }

    /// True once a full 13-key proposal draft is present, per the data
    /// model's invariant that `proposal_draft` is always complete or absent.
    pub fn has_complete_draft(&self) -> bool {
        match self.proposal_draft() {
            Some(map) => PROPOSAL_DRAFT_KEYS.iter().all(|k| map.contains_key(*k)),
            None => false,
        }
    }

    pub fn snapshot(&self) -> StateSnapshot {
        self.inner.snapshot()
    }
}

/// Read-only view over a [`StateSnapshot`]'s `extra` map, for nodes (which
/// only ever see a snapshot, never a mutable `VersionedState`). Mirrors
/// `WorkflowState`'s accessors; kept separate because a snapshot's map is
/// owned, not borrowed through a `Channel`.
pub struct WorkflowSnapshotView<'a> {
    extra: &'a FxHashMap<String, Value>,
}

impl<'a> WorkflowSnapshotView<'a> {
    pub fn new(snapshot: &'a StateSnapshot) -> Self {
        Self {
            extra: &snapshot.extra,
        }
    }

    fn get_str(&self, key: &str) -> Option<String> {
        self.extra.get(key).and_then(|v| v.as_str()).map(String::from)
    }

    fn get_list<T: for<'de> Deserialize<'de>>(&self, key: &str) -> Vec<T> {
        self.extra
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default()
    }

    pub fn project_id(&self) -> Option<i64> {
        self.extra.get("project_id").and_then(|v| v.as_i64())
    }

    pub fn rfp_document_id(&self) -> Option<i64> {
        self.extra.get("rfp_document_id").and_then(|v| v.as_i64())
    }

    pub fn rfp_text(&self) -> Option<String> {
        self.get_str("rfp_text")
    }

    pub fn selected_tasks(&self) -> FxHashMap<String, bool> {
        self.extra
            .get("selected_tasks")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default()
    }

    pub fn challenges_selected(&self) -> bool {
        self.selected_tasks().get("challenges").copied().unwrap_or(true)
    }

    pub fn rfp_summary(&self) -> Option<String> {
        self.get_str("rfp_summary")
    }

    pub fn context_overview(&self) -> Option<String> {
        self.get_str("context_overview")
    }

    pub fn business_objectives(&self) -> Vec<String> {
        self.get_list("business_objectives")
    }

    pub fn challenges(&self) -> Vec<Challenge> {
        self.get_list("challenges")
    }

    pub fn matching_case_studies(&self) -> Vec<MatchingCaseStudy> {
        self.get_list("matching_case_studies")
    }

    pub fn proposal_outline(&self) -> Vec<ProposalOutlineSection> {
        self.get_list("proposal_outline")
    }

    pub fn outline_approved(&self) -> OutlineApproval {
        self.extra
            .get("outline_approved")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default()
    }

    pub fn proposal_draft(&self) -> Option<FxHashMap<String, String>> {
        self.extra
            .get("proposal_draft")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub fn critic_score(&self) -> Option<f32> {
        self.extra.get("critic_score").and_then(|v| v.as_f64()).map(|f| f as f32)
    }

    pub fn refinement_iterations(&self) -> u32 {
        self.extra
            .get("refinement_iterations")
            .and_then(|v| v.as_u64())
            .unwrap_or(0) as u32
    }

    pub fn critic_scores_history(&self) -> Vec<RefinementFeedback> {
        self.get_list("critic_scores_history")
    }

    pub fn has_complete_draft(&self) -> bool {
        match self.proposal_draft() {
            Some(map) => PROPOSAL_DRAFT_KEYS.iter().all(|k| map.contains_key(*k)),
            None => false,
        }
    }

    pub fn has_key(&self, key: &str) -> bool {
        self.extra.contains_key(key)
    }

    pub fn errors(&self) -> Vec<String> {
        self.get_list("errors")
    }

    pub fn warnings(&self) -> Vec<String> {
        self.get_list("warnings")
    }

    pub fn execution_log(&self) -> Vec<ExecutionLogEntry> {
        self.get_list("execution_log")
    }
}

/// Builds the initial [`VersionedState`] for a new run, seeding the
/// identifiers, RFP text, and selected-tasks map that every node depends on.
pub fn new_initial_state(
    project_id: i64,
    rfp_document_id: i64,
    rfp_text: &str,
    selected_tasks: FxHashMap<String, bool>,
) -> VersionedState {
    let mut state = VersionedState::new_with_messages(Vec::new());
    state.add_extra("project_id", json!(project_id));
    state.add_extra("rfp_document_id", json!(rfp_document_id));
    state.add_extra("rfp_text", json!(rfp_text));
    state.add_extra("selected_tasks", json!(selected_tasks));
    state.add_extra("current_step", json!("start"));
    state.add_extra("refinement_iterations", json!(0));
    state
}

/// Builds an `execution_log`-shaped JSON value ready to append via
/// `WorkflowReducer`'s always-append handling.
pub fn log_entry(step: &str, status: &str, detail: &str) -> Value {
    json!({
        "step": step,
        "status": status,
        "detail": detail,
        "at": Utc::now(),
    })
}

/// Staging-key prefixes `WorkflowPatch` writes under and `WorkflowReducer`
/// folds back out. Every node patch stages its log/warning/error
/// contributions under its own node-unique key so the barrier's
/// flatten-by-literal-key step (see `App::apply_barrier`) can never let one
/// concurrently-run node's entry clobber another's.
pub const LOG_STAGING_PREFIX: &str = "__log__";
pub const WARNING_STAGING_PREFIX: &str = "__warn__";
pub const ERROR_STAGING_PREFIX: &str = "__err__";

/// Fluent builder every node uses to construct its [`crate::node::NodePartial`].
/// Hides the staging-key convention `WorkflowReducer` relies on: callers only
/// ever call `set`/`with_log`/`with_warning`/`with_error`.
pub struct WorkflowPatch {
    node_name: String,
    extra: FxHashMap<String, Value>,
}

impl WorkflowPatch {
    pub fn new(node_name: impl Into<String>) -> Self {
        Self {
            node_name: node_name.into(),
            extra: crate::utils::collections::new_extra_map(),
        }
    }

    /// Sets a domain field directly. Safe only for fields this node is the
    /// sole writer of within a single barrier (the parallel fan-out nodes'
    /// disjoint top-level keys); anything every node might write
    /// (`execution_log`, warnings, errors) goes through `with_log`/
    /// `with_warning`/`with_error` instead.
    #[must_use]
    pub fn set(mut self, key: &str, value: Value) -> Self {
        self.extra.insert(key.to_string(), value);
        self
    }

    #[must_use]
    pub fn with_log(mut self, status: &str, detail: &str) -> Self {
        let key = format!("{LOG_STAGING_PREFIX}{}", self.node_name);
        self.extra
            .insert(key, log_entry(&self.node_name, status, detail));
        self
    }

    #[must_use]
    pub fn with_warning(mut self, text: &str) -> Self {
        let key = format!("{WARNING_STAGING_PREFIX}{}", self.node_name);
        self.extra.insert(key, json!(text));
        self
    }

    #[must_use]
    pub fn with_error(mut self, text: &str) -> Self {
        let key = format!("{ERROR_STAGING_PREFIX}{}", self.node_name);
        self.extra.insert(key, json!(text));
        self
    }

    pub fn build(self) -> crate::node::NodePartial {
        crate::node::NodePartial {
            extra: if self.extra.is_empty() {
                None
            } else {
                Some(self.extra)
            },
            ..Default::default()
        }
    }
}
