//! Read and write primitives over the data tree.
//!
//! The tree is a [`serde_json::Value`]. Objects are addressed by key, arrays
//! by decimal index. Writes create missing intermediate objects.

use std::borrow::Cow;

use serde_json::{Map, Value};

use crate::error::ExecutionError;

/// Most nulls a single write may pad an array with.
pub const MAX_ARRAY_GAP: usize = 1024;

/// Splits a path on `separator`. The empty path has no segments.
#[must_use]
pub fn split<'a>(path: &'a str, separator: &str) -> Vec<&'a str> {
    if path.is_empty() {
        return Vec::new();
    }
    path.split(separator).collect()
}

/// Looks up the value at `path`. The empty path is the root.
#[must_use]
pub fn get<'a>(tree: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(tree, |node, key| child(node, key))
}

/// Looks up one child of a container.
#[must_use]
pub fn child<'a>(node: &'a Value, key: &str) -> Option<&'a Value> {
    match node {
        Value::Object(map) => map.get(key),
        Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

/// Writes `value` at `path`, replacing the root for the empty path.
///
/// Missing or null intermediate entries become empty objects. An array index
/// past the end grows the array, padding with at most [`MAX_ARRAY_GAP`]
/// nulls.
///
/// # Errors
///
/// Returns [`ExecutionError::NotAContainer`] when the path descends through a
/// primitive, and [`ExecutionError::InvalidIndex`] when a non-numeric segment
/// addresses an array.
pub fn set(
    tree: &mut Value,
    path: &[&str],
    value: Value,
    separator: &str,
) -> Result<(), ExecutionError> {
    let Some((last, parents)) = path.split_last() else {
        *tree = value;
        return Ok(());
    };

    let mut node = tree;
    for (depth, key) in parents.iter().enumerate() {
        node = slot(node, key, || path[..depth].join(separator))?;
    }
    *slot(node, last, || parents.join(separator))? = value;
    Ok(())
}

/// Returns the slot for `key` inside `node`, creating it when absent. A null
/// `node` becomes an empty object first. `describe` names `node` in errors.
fn slot<'a>(
    node: &'a mut Value,
    key: &str,
    describe: impl Fn() -> String,
) -> Result<&'a mut Value, ExecutionError> {
    if node.is_null() {
        *node = Value::Object(Map::new());
    }
    match node {
        Value::Object(map) => Ok(map.entry(key.to_string()).or_insert(Value::Null)),
        Value::Array(items) => {
            let invalid = || ExecutionError::InvalidIndex {
                path: describe(),
                segment: key.to_string(),
            };
            let index = key.parse::<usize>().map_err(|_| invalid())?;
            if index >= items.len() {
                if index - items.len() > MAX_ARRAY_GAP {
                    return Err(invalid());
                }
                items.resize(index + 1, Value::Null);
            }
            Ok(&mut items[index])
        }
        _ => Err(ExecutionError::NotAContainer { path: describe() }),
    }
}

/// Returns true for objects and arrays.
#[must_use]
pub const fn is_container(value: &Value) -> bool {
    matches!(value, Value::Object(_) | Value::Array(_))
}

/// Returns true for null, booleans, numbers and strings.
#[must_use]
pub const fn is_primitive(value: &Value) -> bool {
    !is_container(value)
}

/// The children of a container as `(key, value)` pairs, in order.
#[must_use]
pub fn children(node: &Value) -> Vec<(Cow<'_, str>, &Value)> {
    match node {
        Value::Object(map) => map
            .iter()
            .map(|(key, value)| (Cow::Borrowed(key.as_str()), value))
            .collect(),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, value)| (Cow::Owned(i.to_string()), value))
            .collect(),
        _ => Vec::new(),
    }
}

/// Joins a relative path onto a base path.
#[must_use]
pub fn join(base: &str, relative: &str, separator: &str) -> String {
    match (base.is_empty(), relative.is_empty()) {
        (true, _) => relative.to_string(),
        (false, true) => base.to_string(),
        (false, false) => format!("{base}{separator}{relative}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_split() {
        assert!(split("", ".").is_empty());
        assert_eq!(split("a.b.c", "."), vec!["a", "b", "c"]);
        assert_eq!(split("a::b", "::"), vec!["a", "b"]);
    }

    #[test]
    fn test_get() {
        let tree = json!({"a": {"b": [10, {"c": 3}]}});
        assert_eq!(get(&tree, &["a", "b", "0"]), Some(&json!(10)));
        assert_eq!(get(&tree, &["a", "b", "1", "c"]), Some(&json!(3)));
        assert_eq!(get(&tree, &["a", "x"]), None);
        assert_eq!(get(&tree, &["a", "b", "x"]), None);
        assert_eq!(get(&tree, &[]), Some(&tree));
    }

    #[test]
    fn test_set_creates_objects() {
        let mut tree = json!({});
        set(&mut tree, &["a", "b", "c"], json!(1), ".").unwrap();
        assert_eq!(tree, json!({"a": {"b": {"c": 1}}}));
    }

    #[test]
    fn test_set_root() {
        let mut tree = json!({"a": 1});
        set(&mut tree, &[], json!([1, 2]), ".").unwrap();
        assert_eq!(tree, json!([1, 2]));
    }

    #[test]
    fn test_set_array_index() {
        let mut tree = json!({"items": [1]});
        set(&mut tree, &["items", "0"], json!(5), ".").unwrap();
        set(&mut tree, &["items", "2"], json!(7), ".").unwrap();
        assert_eq!(tree, json!({"items": [5, null, 7]}));

        set(&mut tree, &["items", "3", "name"], json!("x"), ".").unwrap();
        assert_eq!(tree["items"][3], json!({"name": "x"}));
    }

    #[test]
    fn test_set_through_primitive_fails() {
        let mut tree = json!({"a": 1});
        let err = set(&mut tree, &["a", "b"], json!(2), ".").unwrap_err();
        assert_eq!(err, ExecutionError::NotAContainer { path: "a".to_string() });
    }

    #[test]
    fn test_set_into_null() {
        let mut tree = Value::Null;
        set(&mut tree, &["a", "b"], json!(2), ".").unwrap();
        assert_eq!(tree, json!({"a": {"b": 2}}));
    }

    #[test]
    fn test_set_invalid_index() {
        let mut tree = json!({"items": []});
        let err = set(&mut tree, &["items", "x"], json!(2), ".").unwrap_err();
        assert!(matches!(err, ExecutionError::InvalidIndex { .. }));
    }

    #[test]
    fn test_set_index_too_far_past_end() {
        let mut tree = json!({"items": [1]});
        for key in ["18446744073709551615", "4000000000"] {
            let err = set(&mut tree, &["items", key], json!(2), ".").unwrap_err();
            assert_eq!(
                err,
                ExecutionError::InvalidIndex {
                    path: "items".to_string(),
                    segment: key.to_string(),
                }
            );
        }
        assert_eq!(tree, json!({"items": [1]}));

        let last = (1 + MAX_ARRAY_GAP).to_string();
        set(&mut tree, &["items", &last], json!(2), ".").unwrap();
        assert_eq!(tree["items"].as_array().map(Vec::len), Some(MAX_ARRAY_GAP + 2));
    }

    #[test]
    fn test_children_and_join() {
        let tree = json!({"x": 1, "y": [true]});
        let keys: Vec<_> = children(&tree).into_iter().map(|(k, _)| k.into_owned()).collect();
        assert_eq!(keys, vec!["x", "y"]);
        let items: Vec<_> = children(&tree["y"]).into_iter().map(|(k, _)| k.into_owned()).collect();
        assert_eq!(items, vec!["0"]);
        assert_eq!(join("a", "b.c", "."), "a.b.c");
        assert_eq!(join("", "b", "."), "b");
        assert_eq!(join("a", "", "."), "a");
    }
}
