use super::Reducer;
use crate::{channels::Channel, node::NodePartial, state::VersionedState};

/// Appends a node's emitted error events onto the error channel. Never
/// overwrites prior errors: the error log is append-only.
#[derive(Debug, PartialEq, Clone, Hash, Eq)]
pub struct AddErrors;

impl Reducer for AddErrors {
    fn apply(&self, state: &mut VersionedState, update: &NodePartial) {
        if let Some(errors) = &update.errors
            && !errors.is_empty()
        {
            state.errors.get_mut().extend(errors.iter().cloned());
        }
    }
}
