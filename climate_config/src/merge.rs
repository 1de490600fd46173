//! Structural merge of settings trees.

use crate::value::Value;

/// Overlay `overlay` onto `base`, returning the merged tree.
///
/// Behaviour:
/// - Objects merge key by key. Keys only in `base` pass through, keys only in
///   `overlay` are added and shared keys merge recursively.
/// - Arrays merge position by position up to the longer length. A position
///   holding [`Value::EMPTY`] in `overlay` (or past its end) keeps the `base`
///   item, so a sparse overlay only touches the indices it names.
/// - Anything else, including a type mismatch, takes `overlay` wholesale.
///
/// # Examples
///
/// ```
/// use climate_config::{merge_nested, Value};
/// use serde_json::json;
///
/// let base = Value::from(json!({"a": 1, "b": {"x": 1}}));
/// let merged = merge_nested(&base, &Value::from(json!({"b": {"y": 2}, "c": 3})));
/// assert_eq!(merged.into_json(), json!({"a": 1, "b": {"x": 1, "y": 2}, "c": 3}));
///
/// let sparse = Value::Array(vec![Value::EMPTY, Value::from(json!({"c": 4}))]);
/// let merged = merge_nested(&Value::from(json!([1, {"b": 2}, 3])), &sparse);
/// assert_eq!(merged.into_json(), json!([1, {"b": 2, "c": 4}, 3]));
/// ```
#[must_use]
pub fn merge_nested(base: &Value, overlay: &Value) -> Value {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            let mut merged = base_map.clone();
            for (key, value) in overlay_map {
                let entry = merged
                    .get(key)
                    .map_or_else(|| value.clone(), |existing| merge_nested(existing, value));
                merged.insert(key.clone(), entry);
            }
            Value::Object(merged)
        }
        (Value::Array(base_items), Value::Array(overlay_items)) => {
            Value::Array(merge_positions(base_items, overlay_items))
        }
        _ => overlay.clone(),
    }
}

fn merge_positions(base: &[Value], overlay: &[Value]) -> Vec<Value> {
    let empty = Value::EMPTY;
    let len = base.len().max(overlay.len());
    (0..len)
        .map(|index| {
            let left = base.get(index).unwrap_or(&empty);
            match overlay.get(index) {
                None => left.clone(),
                Some(right) if right.is_empty_slot() => left.clone(),
                Some(right) => merge_nested(left, right),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn v(raw: serde_json::Value) -> Value {
        Value::from(raw)
    }

    #[rstest]
    #[case(json!({"a": 1}), json!({"a": 2}), json!({"a": 2}))]
    #[case(json!({"a": 1}), json!({"b": 2}), json!({"a": 1, "b": 2}))]
    #[case(json!({"a": {"b": 1}}), json!({"a": {"c": 2}}), json!({"a": {"b": 1, "c": 2}}))]
    #[case(json!({"a": {"b": 1}}), json!({"a": 5}), json!({"a": 5}))]
    #[case(json!({"a": 1}), json!([1, 2]), json!([1, 2]))]
    #[case(json!([1, 2]), json!({"a": 1}), json!({"a": 1}))]
    #[case(json!([1, 2, 3]), json!([4]), json!([4, 2, 3]))]
    #[case(json!([1]), json!([4, 5]), json!([4, 5]))]
    #[case(json!("text"), json!(["t", "e"]), json!(["t", "e"]))]
    #[case(json!(1), json!(null), json!(null))]
    fn merges_plain_values(
        #[case] base: serde_json::Value,
        #[case] overlay: serde_json::Value,
        #[case] expected: serde_json::Value,
    ) {
        assert_eq!(merge_nested(&v(base), &v(overlay)).into_json(), expected);
    }

    #[rstest]
    fn sparse_overlay_keeps_untouched_positions() {
        let base = v(json!([1, {"b": 2}, 3]));
        let overlay = Value::Array(vec![Value::EMPTY, v(json!({"c": 4}))]);
        assert_eq!(merge_nested(&base, &overlay), v(json!([1, {"b": 2, "c": 4}, 3])));
    }

    #[rstest]
    fn overlay_past_base_end_fills_with_empty() {
        let overlay = Value::Array(vec![Value::EMPTY, Value::EMPTY, Value::from("x")]);
        let merged = merge_nested(&v(json!([1])), &overlay);
        assert_eq!(
            merged,
            Value::Array(vec![Value::from(1), Value::EMPTY, Value::from("x")])
        );
    }

    #[rstest]
    fn removed_marker_overwrites_like_a_scalar() {
        let base = v(json!({"a": {"b": 1}}));
        let overlay = Value::Object(crate::Map::from([("a".to_owned(), Value::REMOVED)]));
        let merged = merge_nested(&base, &overlay);
        assert_eq!(merged.get_nested(&"a".into()), Some(&Value::REMOVED));
    }

    #[rstest]
    fn inputs_are_left_untouched() {
        let base = v(json!({"a": [1, 2]}));
        let overlay = v(json!({"a": [3]}));
        let _merged = merge_nested(&base, &overlay);
        assert_eq!(base, v(json!({"a": [1, 2]})));
        assert_eq!(overlay, v(json!({"a": [3]})));
    }

    #[rstest]
    fn scalar_folds_are_associative() {
        let a = v(json!({"x": 1, "y": {"z": 1}}));
        let b = v(json!({"x": 2, "y": {"w": 2}}));
        let c = v(json!({"y": {"z": 3}}));
        let left = merge_nested(&merge_nested(&a, &b), &c);
        let right = merge_nested(&a, &merge_nested(&b, &c));
        assert_eq!(left, right);
    }

    #[rstest]
    fn empty_slot_folds_depend_on_grouping() {
        let base = v(json!([1, 2]));
        let scalar = Value::from("s");
        let sparse = Value::Array(vec![Value::EMPTY, Value::from("z")]);

        let left = merge_nested(&merge_nested(&base, &scalar), &sparse);
        let right = merge_nested(&base, &merge_nested(&scalar, &sparse));

        // The scalar erases the base before the sparse overlay lands.
        assert_eq!(left, sparse);
        assert_eq!(right, v(json!([1, "z"])));
    }

    #[rstest]
    fn removed_folds_depend_on_grouping() {
        let base = v(json!({"x": {"k": 1}}));
        let tombstone = Value::Object(crate::Map::from([("x".to_owned(), Value::REMOVED)]));
        let later = v(json!({"x": {"j": 2}}));

        let mut left = merge_nested(&merge_nested(&base, &tombstone), &later);
        let mut right = merge_nested(&base, &merge_nested(&tombstone, &later));
        left.prune_removed();
        right.prune_removed();

        // Folded first, the tombstone drops `k`; grouped with `later` it is replaced.
        assert_eq!(left.into_json(), json!({"x": {"j": 2}}));
        assert_eq!(right.into_json(), json!({"x": {"k": 1, "j": 2}}));
    }

    #[rstest]
    fn trailing_removed_wins_under_any_grouping() {
        let base = v(json!({"x": 1, "y": 1}));
        let middle = v(json!({"x": {"z": 2}}));
        let tombstone = Value::Object(crate::Map::from([("x".to_owned(), Value::REMOVED)]));

        let mut left = merge_nested(&merge_nested(&base, &middle), &tombstone);
        let mut right = merge_nested(&base, &merge_nested(&middle, &tombstone));
        assert_eq!(left, right);
        left.prune_removed();
        right.prune_removed();
        assert_eq!(left.into_json(), json!({"y": 1}));
    }
}
