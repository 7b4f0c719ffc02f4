//! RFP proposal workflow: the domain layer built on top of the generic
//! graph executor. Everything here is RFP-specific; the executor itself
//! (graphs, schedulers, reducers, channels) stays domain-agnostic.

pub mod cache;
pub mod chat;
pub mod config;
pub mod errors;
pub mod events;
pub mod graph;
pub mod knowledge_graph;
pub mod llm;
pub mod manager;
pub mod nodes;
pub mod reducer;
pub mod state;

pub use config::OrchestratorConfig;
pub use errors::WorkflowError;
pub use manager::{RunStatus, WorkflowManager, WorkflowProgress, WorkflowStatusReport};
pub use state::{OutlineApproval, WorkflowState, PROPOSAL_DRAFT_KEYS};
