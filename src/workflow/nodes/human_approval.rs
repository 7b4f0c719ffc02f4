//! `HumanApprovalNode` — no LLM call. Per the Open Question resolution
//! (blocking), this node only records where the run currently stands; the
//! actual pause/resume mechanics live in the graph's
//! `should_continue_after_approval` guard (`StepOptions::interrupt_before`)
//! and in `WorkflowManager::approve_outline`, which is the only thing that
//! can move `outline_approved` from `Unset`/`Rejected` to `Approved`.

use async_trait::async_trait;

use crate::node::{Node, NodeContext, NodeError, NodePartial};
use crate::state::StateSnapshot;
use crate::workflow::state::{OutlineApproval, WorkflowPatch, WorkflowSnapshotView};

pub struct HumanApprovalNode;

#[async_trait]
impl Node for HumanApprovalNode {
    async fn run(&self, snapshot: StateSnapshot, ctx: NodeContext) -> Result<NodePartial, NodeError> {
        let view = WorkflowSnapshotView::new(&snapshot);
        let approval = view.outline_approved();

        let (status, detail) = match approval {
            OutlineApproval::Approved => ("success", "Outline already approved"),
            OutlineApproval::Rejected => ("warning", "Outline rejected; awaiting a re-approval decision"),
            OutlineApproval::Unset => ("pending", "Awaiting human approval of the proposal outline"),
        };

        ctx.emit_node("human_approval", detail).ok();

        Ok(WorkflowPatch::new("human_approval")
            .set("current_step", serde_json::json!("human_approval"))
            .with_log(status, detail)
            .build())
    }
}
