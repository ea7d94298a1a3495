//! Search-string compilation.
//!
//! A search string typed by a user becomes [`Criteria`] in one of three ways,
//! tried in order:
//!
//! 1. A friendly term (an exact literal phrase from the collection settings)
//!    is replaced by the JSON text of its pre-built criteria.
//! 2. The first query rule whose pattern matches the text produces a regex
//!    criterion on the rule's field. Later rules are not consulted.
//! 3. Otherwise the text is a JSON object body, with the braces optional.
//!    Top-level keys that are display names are mapped to field paths.
//!
//! Blank text compiles to empty criteria, which match every document.

use crate::config::{CollectionConfig, QueryRule};
use crate::convert::coerce;
use crate::error::{FlamyngoError, Result};
use crate::types::{Criteria, REGEX_OPERATOR};
use serde_json::Value;
use tracing::debug;

/// Compile a search string against a collection's settings.
pub fn compile(search: &str, config: &CollectionConfig) -> Result<Criteria> {
    let expanded;
    let text = match config.friendly_terms.get(search) {
        Some(tree) => {
            expanded = serde_json::to_string(tree)?;
            debug!(collection = %config.name, term = %search, "Expanded friendly term");
            expanded.as_str()
        }
        None => search,
    };

    if text.trim().is_empty() {
        return Ok(Criteria::new());
    }

    if let Some(rule) = config.matching_rule(text) {
        debug!(
            collection = %config.name,
            field = %rule.field,
            pattern = %rule.pattern(),
            "Search text matched rule"
        );
        return regex_criteria(rule, text);
    }

    parse_body(text, config)
}

/// Build `{ field: { "$regex": text } }` for a matched rule.
///
/// The text goes through the rule's converter first and is then rendered back
/// to a string.
pub fn regex_criteria(rule: &QueryRule, text: &str) -> Result<Criteria> {
    let converted = coerce(text, rule.converter).map_err(|e| FlamyngoError::query(e.to_string()))?;
    let pattern = match converted {
        Value::String(s) => s,
        other => other.to_string(),
    };

    let mut condition = Criteria::new();
    condition.insert(REGEX_OPERATOR.to_string(), Value::String(pattern));

    let mut criteria = Criteria::new();
    criteria.insert(rule.field.clone(), Value::Object(condition));
    Ok(criteria)
}

fn parse_body(text: &str, config: &CollectionConfig) -> Result<Criteria> {
    let trimmed = text.trim();
    let wrapped;
    let body = if trimmed.starts_with('{') && trimmed.ends_with('}') {
        trimmed
    } else {
        wrapped = format!("{{{}}}", trimmed);
        wrapped.as_str()
    };

    let parsed: Value =
        serde_json::from_str(body).map_err(|e| FlamyngoError::query(e.to_string()))?;

    match parsed {
        Value::Object(map) => Ok(map
            .into_iter()
            .map(|(key, value)| (config.aliases.field_for(&key).to_string(), value))
            .collect()),
        other => Err(FlamyngoError::query(format!(
            "query must be a JSON object, got {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigStore, Settings};
    use serde_json::json;

    fn materials() -> CollectionConfig {
        let settings: Settings = serde_json::from_value(json!({
            "collections": [{
                "name": "materials",
                "query": [
                    ["task_id", "mp-\\d+", "str"],
                    ["nelements", "\\d+$", null],
                    ["formula_pretty", "[A-Z][a-z]?\\d*", null],
                    ["chemsys", "[A-Z]", null]
                ],
                "aliases": {"Formula": "formula_pretty", "Band gap": "bandgap"},
                "autocomplete_friendly_terms": {
                    "direct gaps": {"bandstructure.is_gap_direct": true},
                    "small cells": {"Band gap": {"$lt": 1}}
                },
                "unique_key": "task_id"
            }]
        }))
        .unwrap();
        let store = ConfigStore::from_settings(settings, None).unwrap();
        store.get("materials").unwrap().clone()
    }

    #[test]
    fn test_empty_is_match_all() {
        let config = materials();
        assert!(compile("", &config).unwrap().is_empty());
        assert!(compile("   ", &config).unwrap().is_empty());
        assert!(compile("{}", &config).unwrap().is_empty());
    }

    #[test]
    fn test_first_matching_rule_wins() {
        let config = materials();

        let criteria = compile("MoS2", &config).unwrap();
        assert_eq!(
            Value::Object(criteria),
            json!({"formula_pretty": {"$regex": "MoS2"}})
        );

        // Matches both formula_pretty and chemsys; the earlier rule is used
        let criteria = compile("Fe", &config).unwrap();
        assert!(criteria.contains_key("formula_pretty"));
        assert!(!criteria.contains_key("chemsys"));
    }

    #[test]
    fn test_rule_converter_applied() {
        let config = materials();

        let criteria = compile("mp-149", &config).unwrap();
        assert_eq!(Value::Object(criteria), json!({"task_id": {"$regex": "mp-149"}}));

        // Inferred numbers are rendered back to text
        let criteria = compile("03", &config).unwrap();
        assert_eq!(Value::Object(criteria), json!({"nelements": {"$regex": "3"}}));
    }

    #[test]
    fn test_braces_optional() {
        let config = materials();
        let bare = compile(r#""a": 1"#, &config).unwrap();
        let braced = compile(r#"{"a": 1}"#, &config).unwrap();
        assert_eq!(bare, braced);
        assert_eq!(Value::Object(bare), json!({"a": 1}));
    }

    #[test]
    fn test_alias_remap() {
        let config = materials();
        let criteria = compile(r#"{"Formula": "X"}"#, &config).unwrap();
        assert_eq!(Value::Object(criteria), json!({"formula_pretty": "X"}));

        let criteria = compile(r#"{"Band gap": {"$gt": 1.5}, "nsites": 4}"#, &config).unwrap();
        assert_eq!(
            Value::Object(criteria),
            json!({"bandgap": {"$gt": 1.5}, "nsites": 4})
        );
    }

    #[test]
    fn test_friendly_term_expands() {
        let config = materials();
        let criteria = compile("direct gaps", &config).unwrap();
        assert_eq!(
            Value::Object(criteria),
            json!({"bandstructure.is_gap_direct": true})
        );

        // Expanded text still goes through alias remapping
        let criteria = compile("small cells", &config).unwrap();
        assert_eq!(Value::Object(criteria), json!({"bandgap": {"$lt": 1}}));
    }

    #[test]
    fn test_friendly_term_needs_exact_match() {
        let config = materials();
        assert!(compile("direct", &config).is_err());
    }

    #[test]
    fn test_malformed_body() {
        let config = materials();
        let err = compile("{bad json", &config).unwrap_err();
        assert!(matches!(err, FlamyngoError::QueryError { .. }));
        assert!(err.is_request_error());

        assert!(compile(r#"{"a": }"#, &config).is_err());
    }

    #[test]
    fn test_regex_criteria_conversion_failure() {
        let rule = QueryRule::new("nelements", "\\d", Some(crate::convert::Converter::Int)).unwrap();
        let err = regex_criteria(&rule, "1.5").unwrap_err();
        assert!(matches!(err, FlamyngoError::QueryError { .. }));
    }
}
