//! Test-only fixtures shared between this crate's unit tests and the
//! integration tests under `tests/`. Kept outside `#[cfg(test)]` so
//! integration tests (which link the crate as a dependency) can use them.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rustc_hash::FxHashMap;

use crate::node::{Node, NodeContext, NodeError, NodePartial};
use crate::state::StateSnapshot;
use crate::types::NodeKind;

/// Builds a bare [`StateSnapshot`] with the given message/extra versions and
/// no content, for scheduler-gating tests that only care about version
/// comparisons.
pub fn create_test_snapshot(messages_version: u32, extra_version: u32) -> StateSnapshot {
    StateSnapshot {
        messages: Vec::new(),
        messages_version,
        extra: FxHashMap::default(),
        extra_version,
        errors: Vec::new(),
        errors_version: 1,
    }
}

/// A node that always fails with `NodeError::MissingInput { what: "test_key" }`.
#[derive(Default)]
pub struct FailingNode;

#[async_trait]
impl Node for FailingNode {
    async fn run(&self, _snapshot: StateSnapshot, _ctx: NodeContext) -> Result<NodePartial, NodeError> {
        Err(NodeError::MissingInput { what: "test_key" })
    }
}

/// A trivial node that returns an empty patch immediately.
struct NoopNode;

#[async_trait]
impl Node for NoopNode {
    async fn run(&self, _snapshot: StateSnapshot, _ctx: NodeContext) -> Result<NodePartial, NodeError> {
        Ok(NodePartial::default())
    }
}

/// A node that sleeps for `delay` before returning an empty patch, used to
/// exercise concurrency and ordering in scheduler tests.
struct DelayedNode {
    delay: Duration,
}

#[async_trait]
impl Node for DelayedNode {
    async fn run(&self, _snapshot: StateSnapshot, _ctx: NodeContext) -> Result<NodePartial, NodeError> {
        tokio::time::sleep(self.delay).await;
        Ok(NodePartial::default())
    }
}

/// A registry with two instantly-resolving nodes, `A` and `B`.
pub fn make_test_registry() -> FxHashMap<NodeKind, Arc<dyn Node>> {
    let mut nodes: FxHashMap<NodeKind, Arc<dyn Node>> = FxHashMap::default();
    nodes.insert(NodeKind::Custom("A".into()), Arc::new(NoopNode));
    nodes.insert(NodeKind::Custom("B".into()), Arc::new(NoopNode));
    nodes
}

/// A registry with two nodes of differing latency, for exercising
/// concurrency-bounded dispatch.
pub fn make_delayed_registry() -> FxHashMap<NodeKind, Arc<dyn Node>> {
    let mut nodes: FxHashMap<NodeKind, Arc<dyn Node>> = FxHashMap::default();
    nodes.insert(
        NodeKind::Custom("A".into()),
        Arc::new(DelayedNode {
            delay: Duration::from_millis(20),
        }),
    );
    nodes.insert(
        NodeKind::Custom("B".into()),
        Arc::new(DelayedNode {
            delay: Duration::from_millis(5),
        }),
    );
    nodes
}
