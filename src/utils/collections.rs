//! Small conveniences for building the `extra` channel's map type without
//! spelling out `FxHashMap::default()` everywhere.

use rustc_hash::FxHashMap;
use serde_json::Value;

/// Returns an empty extra map, ready to be populated and attached to a
/// [`crate::node::NodePartial`] via `with_extra`.
pub fn new_extra_map() -> FxHashMap<String, Value> {
    FxHashMap::default()
}

/// Builds an extra map from an iterator of key/value pairs.
pub fn extra_map_from<I, K>(entries: I) -> FxHashMap<String, Value>
where
    I: IntoIterator<Item = (K, Value)>,
    K: Into<String>,
{
    entries.into_iter().map(|(k, v)| (k.into(), v)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builds_map_from_pairs() {
        let map = extra_map_from([("a", json!(1)), ("b", json!(2))]);
        assert_eq!(map.get("a"), Some(&json!(1)));
        assert_eq!(map.len(), 2);
    }
}
