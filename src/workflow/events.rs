//! Typed constructors for the four RFP domain event shapes, built on top of
//! the teacher's untyped `Event::node_message_with_meta`/`Event::diagnostic`
//! primitives. The wire-level [`Event`](crate::event_bus::Event) enum gains
//! no new variants; each shape below is serialized as JSON and carried as
//! that event's message body.

use serde::Serialize;
use serde_json::json;

use crate::event_bus::Event;

#[derive(Clone, Debug, Serialize)]
pub struct ThoughtPayload {
    pub step: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct SkeletonPayload {
    pub project_id: i64,
    pub outline: serde_json::Value,
}

#[derive(Clone, Debug, Serialize)]
pub struct OutlineApprovalPayload {
    pub project_id: i64,
    pub approved: bool,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

#[derive(Clone, Debug, Serialize)]
pub struct WorkflowProgressPayload {
    pub step: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
}

/// Emits a `thought` event: a step's running commentary, for UIs that show
/// live agent reasoning.
pub fn thought(node_id: &str, step_seq: u64, step: &str, message: &str, detail: Option<&str>) -> Event {
    let payload = ThoughtPayload {
        step: step.to_string(),
        message: message.to_string(),
        detail: detail.map(str::to_string),
    };
    Event::node_message_with_meta(
        node_id,
        step_seq,
        "thought",
        serde_json::to_string(&payload).unwrap_or_default(),
    )
}

/// Emits a `skeleton` event, exactly once, when the proposal outline is
/// first generated.
pub fn skeleton(project_id: i64, outline: serde_json::Value) -> Event {
    let payload = SkeletonPayload { project_id, outline };
    Event::diagnostic(
        "skeleton",
        serde_json::to_string(&payload).unwrap_or_default(),
    )
}

/// Emits an `outline_approval` event when a human approves or rejects the
/// outline.
pub fn outline_approval(project_id: i64, approved: bool) -> Event {
    let payload = OutlineApprovalPayload {
        project_id,
        approved,
        timestamp: chrono::Utc::now(),
    };
    Event::diagnostic(
        "outline_approval",
        serde_json::to_string(&payload).unwrap_or_default(),
    )
}

/// Emits a `workflow_progress` event summarizing a completed step.
pub fn workflow_progress(step: &str, status: &str, score: Option<f32>) -> Event {
    let payload = WorkflowProgressPayload {
        step: step.to_string(),
        status: status.to_string(),
        score,
    };
    Event::diagnostic(
        "workflow_progress",
        serde_json::to_string(&payload).unwrap_or_default(),
    )
}

/// Convenience: builds the JSON outline value `skeleton` expects directly
/// from proposal outline sections.
pub fn outline_json(sections: &[crate::workflow::state::ProposalOutlineSection]) -> serde_json::Value {
    json!(sections)
}
