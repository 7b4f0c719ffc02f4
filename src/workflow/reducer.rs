//! The `Extra`-channel [`Reducer`] for the RFP workflow, registered via
//! `GraphBuilder::with_reducer(ChannelType::Extra, Arc::new(WorkflowReducer))`
//! in place of the teacher's default [`crate::reducers::map_merge::MapMerge`].
//!
//! `App::apply_barrier` flattens every node's `NodePartial.extra` into one
//! map by plain literal-key insert *before* any reducer ever runs, so two
//! nodes that ran in the same superstep and happened to write the same key
//! would already have collided by the time this reducer sees them. The
//! parallel fan-out nodes avoid that by construction (each owns a disjoint
//! top-level key), but `execution_log`/warnings/errors entries are written by
//! every node, every step. Those go out under a per-node staging key
//! (`WorkflowPatch::with_log`/`with_warning`/`with_error`) so the flatten
//! step cannot drop one node's entry in favor of another's; this reducer's
//! job is to fold the staged entries back into the canonical arrays.

use serde_json::{json, Value};

use super::state::{ERROR_STAGING_PREFIX, LOG_STAGING_PREFIX, WARNING_STAGING_PREFIX};
use crate::channels::Channel;
use crate::node::NodePartial;
use crate::reducers::Reducer;
use crate::state::VersionedState;

/// Top-level keys the parallel fan-out nodes append to rather than replace.
/// Each node owns a disjoint subset of these, so no literal-key collision can
/// occur at the barrier's flatten step; this reducer still appends rather
/// than overwrites so results accumulate across refinement supersteps.
/// A patch may suppress the append for one key by carrying a sibling
/// `"__replace__<key>": true` marker, in which case the incoming value
/// overwrites rather than extends.
const APPEND_KEYS: &[&str] = &[
    "value_propositions",
    "matching_case_studies",
    "competitors",
    "battle_cards",
    "business_objectives",
    "challenges",
    "proposal_outline",
];

/// Keys appended unconditionally, with no `__replace__` escape hatch — per
/// spec.md §3.1, `critic_scores_history` is append-only and never rewritten
/// in place, unlike the fan-out fields above.
const ALWAYS_APPEND_KEYS: &[&str] = &["critic_scores_history"];

/// Keys whose values are JSON objects merged key-wise (last writer wins per
/// inner key) rather than replaced wholesale or appended as array elements.
const MAPPING_MERGE_KEYS: &[&str] = &["discovery_questions", "proposal_draft"];

fn replace_marker(key: &str) -> String {
    format!("__replace__{key}")
}

#[derive(Debug, Clone, Default)]
pub struct WorkflowReducer;

impl Reducer for WorkflowReducer {
    fn apply(&self, state: &mut VersionedState, update: &NodePartial) {
        let Some(updates) = &update.extra else {
            return;
        };
        if updates.is_empty() {
            return;
        }

        let mut staged_logs = Vec::new();
        let mut staged_warnings = Vec::new();
        let mut staged_errors = Vec::new();

        for (key, value) in updates.iter() {
            if let Some(node) = key.strip_prefix(LOG_STAGING_PREFIX) {
                let _ = node;
                staged_logs.push(value.clone());
                continue;
            }
            if key.strip_prefix(WARNING_STAGING_PREFIX).is_some() {
                staged_warnings.push(value.clone());
                continue;
            }
            if key.strip_prefix(ERROR_STAGING_PREFIX).is_some() {
                staged_errors.push(value.clone());
                continue;
            }
            if key.starts_with("__replace__") {
                continue;
            }

            if ALWAYS_APPEND_KEYS.contains(&key.as_str()) {
                append_into(state, key, value);
            } else if MAPPING_MERGE_KEYS.contains(&key.as_str()) {
                merge_mapping(state, key, value);
            } else if APPEND_KEYS.contains(&key.as_str()) {
                let force_replace = updates
                    .get(&replace_marker(key))
                    .and_then(|v| v.as_bool())
                    .unwrap_or(false);
                if force_replace {
                    state.extra.get_mut().insert(key.clone(), value.clone());
                } else {
                    append_into(state, key, value);
                }
            } else {
                state.extra.get_mut().insert(key.clone(), value.clone());
            }
        }

        if !staged_logs.is_empty() {
            extend_array(state, "execution_log", staged_logs);
        }
        if !staged_warnings.is_empty() {
            extend_array(state, "warnings", staged_warnings);
        }
        if !staged_errors.is_empty() {
            extend_array(state, "errors", staged_errors);
        }
    }
}

fn merge_mapping(state: &mut VersionedState, key: &str, incoming: &Value) {
    let Some(incoming_map) = incoming.as_object() else {
        return;
    };
    let map = state.extra.get_mut();
    let mut existing = match map.get(key).and_then(|v| v.as_object()) {
        Some(obj) => obj.clone(),
        None => serde_json::Map::new(),
    };
    for (k, v) in incoming_map {
        existing.insert(k.clone(), v.clone());
    }
    map.insert(key.to_string(), Value::Object(existing));
}

fn append_into(state: &mut VersionedState, key: &str, incoming: &Value) {
    let incoming_items = match incoming {
        Value::Array(items) => items.clone(),
        other => vec![other.clone()],
    };
    extend_array(state, key, incoming_items);
}

fn extend_array(state: &mut VersionedState, key: &str, items: Vec<Value>) {
    let map = state.extra.get_mut();
    let mut existing = match map.get(key) {
        Some(Value::Array(arr)) => arr.clone(),
        Some(other) => vec![other.clone()],
        None => Vec::new(),
    };
    existing.extend(items);
    map.insert(key.to_string(), json!(existing));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::collections::extra_map_from;

    fn state_with_extra(entries: Vec<(&str, Value)>) -> VersionedState {
        let mut state = VersionedState::new_with_messages(Vec::new());
        for (k, v) in entries {
            state.add_extra(k, v);
        }
        state
    }

    #[test]
    fn appends_disjoint_fan_out_fields_without_clobbering() {
        let mut state = state_with_extra(vec![(
            "matching_case_studies",
            json!(["acme-health"]),
        )]);
        let reducer = WorkflowReducer;
        let update = NodePartial {
            extra: Some(extra_map_from(vec![(
                "matching_case_studies".to_string(),
                json!(["acme-retail"]),
            )])),
            ..Default::default()
        };
        reducer.apply(&mut state, &update);
        let got = state.extra.get().get("matching_case_studies").unwrap();
        assert_eq!(got, &json!(["acme-health", "acme-retail"]));
    }

    #[test]
    fn merges_discovery_questions_mapping_key_wise() {
        let mut state = state_with_extra(vec![(
            "discovery_questions",
            json!({"business": ["what is the budget?"]}),
        )]);
        let reducer = WorkflowReducer;
        let update = NodePartial {
            extra: Some(extra_map_from(vec![(
                "discovery_questions".to_string(),
                json!({"technical": ["what is the stack?"]}),
            )])),
            ..Default::default()
        };
        reducer.apply(&mut state, &update);
        let got = state.extra.get().get("discovery_questions").unwrap();
        assert_eq!(
            got,
            &json!({
                "business": ["what is the budget?"],
                "technical": ["what is the stack?"],
            })
        );
    }

    #[test]
    fn merges_proposal_draft_mapping_key_wise_last_writer_wins() {
        let mut state = state_with_extra(vec![(
            "proposal_draft",
            json!({"executive_summary": "draft v1"}),
        )]);
        let reducer = WorkflowReducer;
        let update = NodePartial {
            extra: Some(extra_map_from(vec![(
                "proposal_draft".to_string(),
                json!({"executive_summary": "draft v2", "risks_assumptions": "none"}),
            )])),
            ..Default::default()
        };
        reducer.apply(&mut state, &update);
        let got = state.extra.get().get("proposal_draft").unwrap();
        assert_eq!(
            got,
            &json!({"executive_summary": "draft v2", "risks_assumptions": "none"})
        );
    }

    #[test]
    fn folds_staged_logs_from_distinct_nodes_without_collision() {
        let mut state = state_with_extra(vec![]);
        let reducer = WorkflowReducer;
        let update = NodePartial {
            extra: Some(extra_map_from(vec![
                (
                    "__log__discovery_question".to_string(),
                    json!({"step": "discovery_question", "status": "success", "detail": "ok"}),
                ),
                (
                    "__log__value_proposition".to_string(),
                    json!({"step": "value_proposition", "status": "success", "detail": "ok"}),
                ),
            ])),
            ..Default::default()
        };
        reducer.apply(&mut state, &update);
        let log = state.extra.get().get("execution_log").unwrap().as_array().unwrap();
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn plain_keys_overwrite_like_default_map_merge() {
        let mut state = state_with_extra(vec![("current_step", json!("start"))]);
        let reducer = WorkflowReducer;
        let update = NodePartial {
            extra: Some(extra_map_from(vec![(
                "current_step".to_string(),
                json!("analyzer"),
            )])),
            ..Default::default()
        };
        reducer.apply(&mut state, &update);
        assert_eq!(state.extra.get().get("current_step").unwrap(), &json!("analyzer"));
    }
}
