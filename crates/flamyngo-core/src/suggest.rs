//! Autocomplete for partially typed search strings.
//!
//! Exactly one mode applies to a partial string, chosen in this order:
//!
//! - **Field value**: the text matches a query rule; suggest the distinct
//!   values of the rule's field found by querying the store.
//! - **Friendly term**: the text does not start with `{"`; suggest every
//!   friendly term containing the text.
//! - **Key name**: the text is an unfinished query object with the cursor
//!   inside a key (odd number of `"`); suggest the text completed with each
//!   matching autocomplete key followed by `":`.

use crate::compile::regex_criteria;
use crate::config::CollectionConfig;
use crate::error::{FlamyngoError, Result};
use crate::resolve::{display_value, lookup};
use crate::types::{Criteria, Document};
use std::collections::BTreeSet;
use tracing::debug;

/// Which autocomplete strategy applies to a partial string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuggestMode {
    FieldValue,
    FriendlyTerm,
    KeyName,
}

impl SuggestMode {
    /// Pick the mode for `partial`.
    pub fn detect(partial: &str, config: &CollectionConfig) -> SuggestMode {
        if config.matching_rule(partial).is_some() {
            SuggestMode::FieldValue
        } else if !partial.starts_with("{\"") {
            SuggestMode::FriendlyTerm
        } else {
            SuggestMode::KeyName
        }
    }
}

/// Propose completions for `partial`.
///
/// `query` is only called in field-value mode, with the rule's regex criteria
/// and a projection of the rule's field. Bounding the scan is up to `query`.
pub fn suggest<F>(partial: &str, config: &CollectionConfig, query: F) -> Result<BTreeSet<String>>
where
    F: FnOnce(&Criteria, &[String]) -> Result<Vec<Document>>,
{
    let mode = SuggestMode::detect(partial, config);
    debug!(collection = %config.name, ?mode, "Autocomplete");

    let suggestions = match mode {
        SuggestMode::FieldValue => field_values(partial, config, query)?,
        SuggestMode::FriendlyTerm => friendly_terms(partial, config),
        SuggestMode::KeyName => key_names(partial, config),
    };
    Ok(suggestions)
}

fn field_values<F>(partial: &str, config: &CollectionConfig, query: F) -> Result<BTreeSet<String>>
where
    F: FnOnce(&Criteria, &[String]) -> Result<Vec<Document>>,
{
    let Some(rule) = config.matching_rule(partial) else {
        return Ok(BTreeSet::new());
    };

    // Text a rule accepts may still be unfinished for its converter ("1." for int)
    let criteria = match regex_criteria(rule, partial) {
        Ok(criteria) => criteria,
        Err(err @ (FlamyngoError::QueryError { .. } | FlamyngoError::ConversionFailed { .. })) => {
            debug!(
                collection = %config.name,
                field = %rule.field,
                error = %err,
                "No value suggestions"
            );
            return Ok(BTreeSet::new());
        }
        Err(err) => return Err(err),
    };
    let projection = [rule.field.clone()];
    let documents = query(&criteria, &projection)?;

    Ok(documents
        .iter()
        .filter_map(|doc| lookup(&rule.field, doc))
        .filter(|value| !value.is_null())
        .map(|value| display_value(&Some(value.clone())))
        .collect())
}

fn friendly_terms(partial: &str, config: &CollectionConfig) -> BTreeSet<String> {
    config
        .friendly_terms
        .keys()
        .filter(|term| term.contains(partial))
        .cloned()
        .collect()
}

fn key_names(partial: &str, config: &CollectionConfig) -> BTreeSet<String> {
    if partial.matches('"').count() % 2 == 0 {
        return BTreeSet::new();
    }

    let Some((prefix, typed)) = partial.rsplit_once('"') else {
        return BTreeSet::new();
    };

    config
        .autocomplete_keys
        .iter()
        .filter(|key| key.contains(typed))
        .map(|key| format!("{}\"{}\":", prefix, key))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigStore, Settings};
    use serde_json::{json, Value};
    use std::cell::Cell;

    fn people() -> CollectionConfig {
        let settings: Settings = serde_json::from_value(json!({
            "collections": [{
                "name": "people",
                "query": [["name", "[A-Z][a-z]+$", null], ["age", "\\d", "int"]],
                "autocomplete_keys": ["name", "nationality", "age"],
                "autocomplete_friendly_terms": {
                    "top 10": {"rank": {"$lte": 10}},
                    "top scientists": {"field": "science"},
                    "everyone": {}
                },
                "unique_key": "_id"
            }]
        }))
        .unwrap();
        ConfigStore::from_settings(settings, None)
            .unwrap()
            .get("people")
            .unwrap()
            .clone()
    }

    fn no_query(_: &Criteria, _: &[String]) -> Result<Vec<Document>> {
        panic!("store must not be queried outside field-value mode")
    }

    #[test]
    fn test_mode_detection() {
        let config = people();
        assert_eq!(SuggestMode::detect("Ada", &config), SuggestMode::FieldValue);
        assert_eq!(SuggestMode::detect("top", &config), SuggestMode::FriendlyTerm);
        assert_eq!(SuggestMode::detect("{\"na", &config), SuggestMode::KeyName);
        // A brace without a quote is still treated as a friendly-term search
        assert_eq!(SuggestMode::detect("{na", &config), SuggestMode::FriendlyTerm);
    }

    #[test]
    fn test_key_name_completion() {
        let config = people();
        let suggestions = suggest("{\"na", &config, no_query).unwrap();
        let expected: BTreeSet<String> = ["{\"name\":", "{\"nationality\":"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(suggestions, expected);
    }

    #[test]
    fn test_key_name_after_previous_pair() {
        let config = people();
        let suggestions = suggest("{\"name\": \"Ada\", \"ag", &config, no_query).unwrap();
        assert_eq!(
            suggestions.into_iter().collect::<Vec<_>>(),
            vec!["{\"name\": \"Ada\", \"age\":"]
        );
    }

    #[test]
    fn test_key_name_outside_key() {
        let config = people();
        // Even number of quotes: the cursor is not inside a key
        assert!(suggest("{\"name\": ", &config, no_query).unwrap().is_empty());
    }

    #[test]
    fn test_friendly_term_substring() {
        let config = people();
        let suggestions = suggest("top", &config, no_query).unwrap();
        assert!(suggestions.contains("top 10"));
        assert!(suggestions.contains("top scientists"));
        assert!(!suggestions.contains("everyone"));

        assert!(suggest("zzz", &config, no_query).unwrap().is_empty());
    }

    #[test]
    fn test_field_value_distinct() {
        let config = people();
        let calls = Cell::new(0);
        let suggestions = suggest("Ad", &config, |criteria, projection| {
            calls.set(calls.get() + 1);
            assert_eq!(
                Value::Object(criteria.clone()),
                json!({"name": {"$regex": "Ad"}})
            );
            assert_eq!(projection, ["name".to_string()]);
            Ok(vec![
                json!({"name": "Ada"}),
                json!({"name": "Adam"}),
                json!({"name": "Ada"}),
                json!({"other": 1}),
                json!({"name": null}),
            ])
        })
        .unwrap();

        assert_eq!(calls.get(), 1);
        assert_eq!(suggestions.into_iter().collect::<Vec<_>>(), vec!["Ada", "Adam"]);
    }

    #[test]
    fn test_field_value_query_error_propagates() {
        let config = people();
        let result = suggest("Ada", &config, |_, _| {
            Err(FlamyngoError::backend("find", "unreachable"))
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_field_value_conversion_rejected_is_empty() {
        let config = people();
        assert_eq!(SuggestMode::detect("1.", &config), SuggestMode::FieldValue);
        assert!(suggest("1.", &config, no_query).unwrap().is_empty());
    }
}
