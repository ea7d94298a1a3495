//! Dotted field-path resolution over semi-structured documents.
//!
//! A path such as `structure.lattice.a` or `tags.0` is split on `.` and walked
//! one token at a time. Objects are indexed by key, arrays by a non-negative
//! integer index. Any failed step makes the whole path absent; resolution
//! never returns an error.

use crate::convert::{coerce_value, Converter};
use serde_json::Value;

/// Walk `path` through `document` and return the raw leaf, if present.
pub fn lookup<'a>(path: &str, document: &'a Value) -> Option<&'a Value> {
    path.split('.').try_fold(document, step)
}

fn step<'a>(node: &'a Value, token: &str) -> Option<&'a Value> {
    match node {
        Value::Object(map) => map.get(token),
        Value::Array(items) => token.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

/// Resolve `path` in `document` and coerce the leaf.
///
/// Returns `None` when the path cannot be walked or when a named converter
/// rejects the leaf.
pub fn resolve(path: &str, document: &Value, converter: Option<Converter>) -> Option<Value> {
    lookup(path, document).and_then(|leaf| coerce_value(leaf, converter).ok())
}

/// Render a resolved value for presentation.
///
/// Absent values and `null` render blank, strings render without quotes and
/// everything else renders as compact JSON.
pub fn display_value(value: &Option<Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Whether a value counts as present for plotting: not null, false, zero or
/// empty.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn material() -> Value {
        json!({
            "formula_pretty": "MoS2",
            "structure": {
                "lattice": {"a": 3.19, "b": 3.19, "c": 14.88}
            },
            "tags": ["x", "y"],
            "sites": [{"species": "Mo"}, {"species": "S"}],
            "task_id": "42"
        })
    }

    #[test]
    fn test_nested_leaf() {
        let doc = material();
        assert_eq!(resolve("structure.lattice.a", &doc, None), Some(json!(3.19)));
        assert_eq!(resolve("formula_pretty", &doc, None), Some(json!("MoS2")));
    }

    #[test]
    fn test_missing_intermediate_is_absent() {
        let doc = material();
        assert_eq!(resolve("structure.cell.a", &doc, None), None);
        assert_eq!(resolve("nothing.here", &doc, None), None);
    }

    #[test]
    fn test_sequence_index() {
        let doc = json!({"tags": ["x", "y"]});
        assert_eq!(resolve("tags.0", &doc, None), Some(json!("x")));
        assert_eq!(resolve("tags.5", &doc, None), None);
        assert_eq!(resolve("tags.first", &doc, None), None);
        assert_eq!(resolve("tags.-1", &doc, None), None);
    }

    #[test]
    fn test_index_then_key() {
        let doc = material();
        assert_eq!(resolve("sites.1.species", &doc, None), Some(json!("S")));
    }

    #[test]
    fn test_descend_into_scalar_is_absent() {
        let doc = material();
        assert_eq!(resolve("formula_pretty.length", &doc, None), None);
        assert_eq!(resolve("structure.lattice.a.b", &doc, None), None);
    }

    #[test]
    fn test_leaf_coercion() {
        let doc = material();
        // Inference turns numeric strings into numbers
        assert_eq!(resolve("task_id", &doc, None), Some(json!(42)));
        assert_eq!(
            resolve("task_id", &doc, Some(Converter::Str)),
            Some(json!("42"))
        );
        assert_eq!(
            resolve("structure.lattice.c", &doc, Some(Converter::Int)),
            Some(json!(14))
        );
        // A converter that rejects the leaf yields absent
        assert_eq!(resolve("formula_pretty", &doc, Some(Converter::Float)), None);
    }

    #[test]
    fn test_lookup_is_raw() {
        let doc = material();
        assert_eq!(lookup("task_id", &doc), Some(&json!("42")));
        assert_eq!(lookup("structure.lattice", &doc).map(Value::is_object), Some(true));
    }

    #[test]
    fn test_display_value() {
        assert_eq!(display_value(&None), "");
        assert_eq!(display_value(&Some(json!(null))), "");
        assert_eq!(display_value(&Some(json!("MoS2"))), "MoS2");
        assert_eq!(display_value(&Some(json!(3.5))), "3.5");
        assert_eq!(display_value(&Some(json!([1, 2]))), "[1,2]");
    }

    #[test]
    fn test_truthiness() {
        assert!(is_truthy(&json!(1.5)));
        assert!(is_truthy(&json!("a")));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!("")));
        assert!(!is_truthy(&json!(null)));
        assert!(!is_truthy(&json!([])));
    }
}
