//! Bounded-concurrency dispatch of one superstep's frontier.
//!
//! A superstep runs every eligible node in a frontier concurrently (up to a
//! caller-chosen concurrency limit), skipping nodes whose upstream snapshot
//! hasn't changed since they last ran and always skipping [`NodeKind::End`].
//! The barrier itself (merging outputs back into state) is the caller's job
//! ([`crate::app::App::apply_barrier`]); the scheduler only runs nodes and
//! collects their raw outputs.

use std::sync::Arc;
use std::time::Duration;

use rustc_hash::FxHashMap;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinError;
use tracing::instrument;

use crate::event_bus::EventEmitter;
use crate::node::{Node, NodeContext, NodeError, NodePartial};
use crate::state::StateSnapshot;
use crate::types::NodeKind;

/// Tracks, per node id, the `(messages_version, extra_version)` pair last
/// observed when that node ran. Used to skip redundant re-execution when a
/// node's upstream inputs have not changed since its last run.
#[derive(Debug, Default, Clone)]
pub struct SchedulerState {
    versions_seen: FxHashMap<String, (u32, u32)>,
}

/// Result of running one superstep over a frontier of nodes.
#[derive(Debug, Default)]
pub struct StepRunResult {
    /// Nodes that were actually dispatched, in frontier order.
    pub ran_nodes: Vec<NodeKind>,
    /// Nodes that were skipped (either `NodeKind::End` or version-gated).
    pub skipped_nodes: Vec<NodeKind>,
    /// `(node, patch)` pairs for every node that ran. May arrive in any
    /// completion order; callers that need frontier order should consult
    /// `ran_nodes` instead.
    pub outputs: Vec<(NodeKind, NodePartial)>,
}

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("node {kind} failed at step {step}")]
    NodeRun {
        kind: NodeKind,
        step: u64,
        #[source]
        source: NodeError,
    },
    #[error("failed to join node task: {0}")]
    Join(#[from] JoinError),
}

/// Default per-node soft timeout, per spec: 120 seconds.
pub const DEFAULT_NODE_TIMEOUT: Duration = Duration::from_secs(120);

/// Dispatches a frontier of nodes under a bounded concurrency limit.
#[derive(Debug, Clone)]
pub struct Scheduler {
    concurrency_limit: usize,
    node_timeout: Duration,
}

impl Scheduler {
    /// Creates a scheduler that runs at most `concurrency_limit` nodes at once.
    pub fn new(concurrency_limit: usize) -> Self {
        Self {
            concurrency_limit: concurrency_limit.max(1),
            node_timeout: DEFAULT_NODE_TIMEOUT,
        }
    }

    /// Overrides the per-node soft timeout (default 120s).
    pub fn with_node_timeout(mut self, timeout: Duration) -> Self {
        self.node_timeout = timeout;
        self
    }

    fn node_id(kind: &NodeKind) -> String {
        format!("{:?}", kind)
    }

    /// Returns true if `id` should run again given `snap`: true when there is
    /// no prior record, or when either the messages or extra version has
    /// advanced since the last time this node was recorded as having run.
    pub fn should_run(&self, state: &SchedulerState, id: &str, snap: &StateSnapshot) -> bool {
        match state.versions_seen.get(id) {
            None => true,
            Some(&(seen_msgs, seen_extra)) => {
                snap.messages_version != seen_msgs || snap.extra_version != seen_extra
            }
        }
    }

    /// Records that `id` has now been run against `snap`'s versions.
    pub fn record_seen(&self, state: &mut SchedulerState, id: &str, snap: &StateSnapshot) {
        state
            .versions_seen
            .insert(id.to_string(), (snap.messages_version, snap.extra_version));
    }

    /// Runs one superstep: dispatches every frontier node whose gating check
    /// passes, bounded by `concurrency_limit` concurrent tasks, and returns
    /// once every dispatched node has completed (or errored).
    #[instrument(skip(self, state, nodes, snap, emitter), fields(step = step))]
    pub async fn superstep(
        &self,
        state: &mut SchedulerState,
        nodes: &FxHashMap<NodeKind, Arc<dyn Node>>,
        frontier: Vec<NodeKind>,
        snap: StateSnapshot,
        step: u64,
        emitter: Arc<dyn EventEmitter>,
    ) -> Result<StepRunResult, SchedulerError> {
        let mut result = StepRunResult::default();
        let semaphore = Arc::new(Semaphore::new(self.concurrency_limit));
        let mut handles = Vec::new();

        for kind in frontier.iter() {
            if kind.is_end() {
                result.skipped_nodes.push(kind.clone());
                continue;
            }

            let id = Self::node_id(kind);
            if !self.should_run(state, &id, &snap) {
                result.skipped_nodes.push(kind.clone());
                continue;
            }

            let Some(node) = nodes.get(kind).cloned() else {
                result.skipped_nodes.push(kind.clone());
                continue;
            };

            result.ran_nodes.push(kind.clone());
            self.record_seen(state, &id, &snap);

            let permit = semaphore.clone();
            let snap_clone = snap.clone();
            let ctx = NodeContext {
                node_id: kind.to_string(),
                step,
                event_emitter: emitter.clone(),
            };
            let kind_for_task = kind.clone();
            let timeout = self.node_timeout;

            handles.push(tokio::spawn(async move {
                let _permit = permit.acquire_owned().await.expect("semaphore closed");
                let run = node.run(snap_clone, ctx);
                let outcome = tokio::time::timeout(timeout, run).await;
                (kind_for_task, outcome)
            }));
        }

        for handle in handles {
            let (kind, outcome) = handle.await?;
            match outcome {
                Ok(Ok(partial)) => result.outputs.push((kind, partial)),
                Ok(Err(source)) => {
                    return Err(SchedulerError::NodeRun { kind, step, source });
                }
                Err(_elapsed) => {
                    // Soft timeout: treat as an empty patch: caller-level
                    // error/execution_log bookkeeping happens one layer up.
                    result.outputs.push((kind, NodePartial::default()));
                }
            }
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::testing::create_test_snapshot;

    #[test]
    fn should_run_defaults_true_with_no_record() {
        let sched = Scheduler::new(1);
        let state = SchedulerState::default();
        let snap = create_test_snapshot(1, 1);
        assert!(sched.should_run(&state, "A", &snap));
    }

    #[test]
    fn record_seen_gates_identical_snapshot() {
        let sched = Scheduler::new(1);
        let mut state = SchedulerState::default();
        let snap = create_test_snapshot(1, 1);
        sched.record_seen(&mut state, "A", &snap);
        assert!(!sched.should_run(&state, "A", &snap));
        let bumped = create_test_snapshot(2, 1);
        assert!(sched.should_run(&state, "A", &bumped));
    }
}
