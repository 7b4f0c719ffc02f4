//! Manager/API-boundary error taxonomy for the RFP workflow.
//!
//! Node and scheduler failures keep flowing through the teacher's
//! [`crate::channels::errors::ErrorEvent`]/`LadderError`/`ErrorScope` machinery
//! unchanged. `WorkflowError` sits one layer up, at the points spec.md §6.1
//! names as the workflow API's failure surface (`WorkflowManager`, the LLM
//! gateway, the retriever).

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum WorkflowError {
    #[error("validation failed: {0}")]
    #[diagnostic(code(rfpgraph::workflow::validation))]
    ValidationError(String),

    #[error("not found: {0}")]
    #[diagnostic(code(rfpgraph::workflow::not_found))]
    NotFound(String),

    #[error("a run is already active for project {project_id} / document {rfp_document_id}")]
    #[diagnostic(
        code(rfpgraph::workflow::busy),
        help("Wait for the in-flight run to finish, or poll get_state for its progress.")
    )]
    Busy {
        project_id: i64,
        rfp_document_id: i64,
    },

    #[error("circuit open for provider {provider}")]
    #[diagnostic(
        code(rfpgraph::workflow::circuit_open),
        help("The LLM gateway tripped its breaker; retry after the cooldown window.")
    )]
    CircuitOpen { provider: String },

    #[error("transient upstream failure ({provider}): {message}")]
    #[diagnostic(code(rfpgraph::workflow::transient_upstream))]
    TransientUpstream { provider: String, message: String },

    #[error("permanent upstream failure ({provider}): {message}")]
    #[diagnostic(code(rfpgraph::workflow::permanent_upstream))]
    PermanentUpstream { provider: String, message: String },

    #[error("failed to parse {what}: {message}")]
    #[diagnostic(code(rfpgraph::workflow::parse_error))]
    ParseError { what: String, message: String },

    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    #[diagnostic(
        code(rfpgraph::workflow::dimension_mismatch),
        help("The vector collection will be recreated and the upsert retried once.")
    )]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("internal error: {0}")]
    #[diagnostic(code(rfpgraph::workflow::internal))]
    Internal(String),
}

impl WorkflowError {
    /// Maps this error onto the teacher's [`ErrorScope`](crate::channels::errors::ErrorScope)
    /// taxonomy so it can be logged through the same ladder-error pipeline as
    /// node/scheduler failures.
    pub fn as_error_event(
        &self,
        step: u64,
    ) -> crate::channels::errors::ErrorEvent {
        use crate::channels::errors::{ErrorEvent, LadderError};

        ErrorEvent::app(LadderError::msg(self.to_string())).with_context(serde_json::json!({
            "step": step,
            "kind": self.kind(),
        }))
    }

    fn kind(&self) -> &'static str {
        match self {
            WorkflowError::ValidationError(_) => "validation_error",
            WorkflowError::NotFound(_) => "not_found",
            WorkflowError::Busy { .. } => "busy",
            WorkflowError::CircuitOpen { .. } => "circuit_open",
            WorkflowError::TransientUpstream { .. } => "transient_upstream",
            WorkflowError::PermanentUpstream { .. } => "permanent_upstream",
            WorkflowError::ParseError { .. } => "parse_error",
            WorkflowError::DimensionMismatch { .. } => "dimension_mismatch",
            WorkflowError::Internal(_) => "internal",
        }
    }
}
