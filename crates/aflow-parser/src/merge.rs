//! Shape-directed deep merge of front-matter mappings.
//!
//! The merge rule depends on the value shape at each key:
//! - scalars: last writer wins
//! - mappings: recursive merge (this also covers `tools`, which merges
//!   per tool-id)
//! - sequences: deduplicated union, insertion order preserved (base items
//!   first, then unseen overlay items)

use serde_yaml::{Mapping, Value};

/// Merge `overlay` into `base`. `overlay` is the later writer.
pub fn merge_values(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Mapping(base_map), Value::Mapping(overlay_map)) => {
            Value::Mapping(merge_mappings(base_map, overlay_map))
        }
        (Value::Sequence(base_seq), Value::Sequence(overlay_seq)) => {
            let mut merged: Vec<Value> = Vec::new();
            for item in base_seq.into_iter().chain(overlay_seq) {
                if !merged.contains(&item) {
                    merged.push(item);
                }
            }
            Value::Sequence(merged)
        }
        (_, overlay) => overlay,
    }
}

/// Merge two mappings key by key, preserving base insertion order and
/// appending overlay-only keys in their own order.
pub fn merge_mappings(mut base: Mapping, overlay: Mapping) -> Mapping {
    for (key, overlay_val) in overlay {
        let merged_val = match base.remove(&key) {
            Some(base_val) => merge_values(base_val, overlay_val),
            None => overlay_val,
        };
        base.insert(key, merged_val);
    }
    base
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(s: &str) -> Value {
        serde_yaml::from_str(s).unwrap()
    }

    #[test]
    fn test_scalar_last_writer_wins() {
        let merged = merge_values(yaml("a: 1\nb: x"), yaml("a: 2"));
        assert_eq!(merged, yaml("a: 2\nb: x"));
    }

    #[test]
    fn test_mapping_recursive_merge() {
        let base = yaml("tools:\n  github:\n    mode: remote\n  bash:\n    allowed: [ls]");
        let overlay = yaml("tools:\n  github:\n    version: v2");
        let merged = merge_values(base, overlay);
        let expected = yaml(
            "tools:\n  github:\n    mode: remote\n    version: v2\n  bash:\n    allowed: [ls]",
        );
        assert_eq!(merged, expected);
    }

    #[test]
    fn test_sequence_union_dedup_insertion_order() {
        let merged = merge_values(
            yaml("allowed: [issue_read, add_comment]"),
            yaml("allowed: [add_comment, issue_write]"),
        );
        assert_eq!(merged, yaml("allowed: [issue_read, add_comment, issue_write]"));
    }

    #[test]
    fn test_tool_allowlists_union_per_tool_id() {
        // Scenario from the merge semantics contract: shared file first,
        // local file last; the github allowlist is a deduplicated union.
        let imported = yaml("tools:\n  github:\n    allowed: [issue_read]");
        let local = yaml("tools:\n  github:\n    allowed: [add_comment]");
        let merged = merge_values(imported, local);
        assert_eq!(
            merged,
            yaml("tools:\n  github:\n    allowed: [issue_read, add_comment]")
        );
    }

    #[test]
    fn test_shape_mismatch_overlay_wins() {
        let merged = merge_values(yaml("network: defaults"), yaml("network:\n  allowed: [x.com]"));
        assert_eq!(merged, yaml("network:\n  allowed: [x.com]"));
    }

    #[test]
    fn test_base_key_order_preserved() {
        let merged = merge_values(yaml("a: 1\nb: 2\nc: 3"), yaml("b: 9\nd: 4"));
        let Value::Mapping(m) = merged else { panic!() };
        let keys: Vec<String> = m
            .keys()
            .map(|k| k.as_str().unwrap().to_string())
            .collect();
        assert_eq!(keys, ["a", "b", "c", "d"]);
    }
}
