//! In-memory document store.
//!
//! `MemoryStore` keeps each collection as a vector of JSON documents and
//! evaluates criteria trees against them. It understands the subset of the
//! document-database query language that Flamyngo's compiler and friendly
//! terms produce:
//!
//! - Field equality: `{"formula_pretty": "MoS2"}` (matches array elements too)
//! - Comparison: `$eq`, `$ne`, `$gt`, `$gte`, `$lt`, `$lte`
//! - Membership: `$in`, `$nin`
//! - Presence: `$exists`
//! - Pattern: `$regex` (unanchored search) with optional `$options: "i"`
//! - Logical: top-level `$and`, `$or`, `$nor`
//!
//! Dotted field paths descend through objects, numeric tokens index arrays,
//! and other tokens fan out over the objects inside an array.
//!
//! Collections are loaded from JSON array or JSON Lines files.
//!
//! ## Concurrency
//!
//! Collections are stored behind `Arc`, so a running query holds its own
//! snapshot and loading a collection never blocks on readers for long.
//! Unlimited scans over large collections are filtered in parallel with Rayon.
//! A `limit` counts matching documents, so a sparse match still walks the
//! whole collection.

use crate::backend::{DocumentCursor, DocumentStore};
use crate::error::{FlamyngoError, Result};
use crate::types::{Criteria, Document, REGEX_OPERATOR};
use anyhow::{anyhow, bail};
use parking_lot::RwLock;
use rayon::prelude::*;
use regex::{Regex, RegexBuilder};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Collections larger than this are filtered in parallel
const PARALLEL_THRESHOLD: usize = 10_000;

/// A document store that keeps everything in memory.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Arc<Vec<Document>>>>,
}

impl MemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the contents of a collection.
    pub fn load_collection(&self, name: impl Into<String>, documents: Vec<Document>) {
        let name = name.into();
        debug!(collection = %name, documents = documents.len(), "Collection loaded");
        self.collections.write().insert(name, Arc::new(documents));
    }

    /// Load a collection from a JSON array or JSON Lines file.
    ///
    /// Returns the number of documents loaded.
    #[instrument(skip(self, path), fields(path = %path.display()))]
    pub fn load_file(&self, name: &str, path: &Path) -> Result<usize> {
        let contents = fs::read_to_string(path)?;
        let documents = parse_documents(&contents)
            .map_err(|e| FlamyngoError::serialization(format!("{}: {}", path.display(), e)))?;

        let count = documents.len();
        info!(collection = %name, documents = count, "Loaded collection from file");
        self.load_collection(name, documents);
        Ok(count)
    }

    /// Append a document to a collection, creating it if needed.
    pub fn insert(&self, name: &str, document: Document) {
        let mut collections = self.collections.write();
        let entry = collections.entry(name.to_string()).or_default();
        Arc::make_mut(entry).push(document);
    }

    /// Number of documents in a collection (0 if it does not exist).
    pub fn len(&self, name: &str) -> usize {
        self.collections.read().get(name).map_or(0, |docs| docs.len())
    }

    /// Names of all loaded collections, sorted.
    pub fn collection_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.collections.read().keys().cloned().collect();
        names.sort();
        names
    }

    fn snapshot(&self, name: &str) -> Arc<Vec<Document>> {
        self.collections
            .read()
            .get(name)
            .cloned()
            .unwrap_or_default()
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("collections", &self.collection_names())
            .finish()
    }
}

impl DocumentStore for MemoryStore {
    fn find<'a>(
        &'a self,
        collection: &str,
        criteria: &Criteria,
        projection: Option<&[String]>,
        limit: Option<usize>,
    ) -> anyhow::Result<DocumentCursor<'a>> {
        let filter = Filter::compile(criteria)?;
        let documents = self.snapshot(collection);
        let projection: Option<Vec<String>> = projection.map(<[String]>::to_vec);

        debug!(
            collection = %collection,
            documents = documents.len(),
            limit = ?limit,
            "Scanning collection"
        );

        if limit.is_none() && documents.len() > PARALLEL_THRESHOLD {
            let matched: Vec<Document> = documents
                .par_iter()
                .filter(|doc| filter.matches(doc))
                .map(|doc| project(doc, projection.as_deref()))
                .collect();
            return Ok(Box::new(matched.into_iter()));
        }

        let cursor = (0..documents.len())
            .filter_map(move |i| {
                let doc = &documents[i];
                if filter.matches(doc) {
                    Some(project(doc, projection.as_deref()))
                } else {
                    None
                }
            })
            .take(limit.unwrap_or(usize::MAX));

        Ok(Box::new(cursor))
    }

    fn find_one(&self, collection: &str, criteria: &Criteria) -> anyhow::Result<Option<Document>> {
        Ok(self.find(collection, criteria, None, Some(1))?.next())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

fn parse_documents(contents: &str) -> std::result::Result<Vec<Document>, String> {
    let trimmed = contents.trim_start();
    if trimmed.starts_with('[') {
        let items: Vec<Value> = serde_json::from_str(trimmed).map_err(|e| e.to_string())?;
        return Ok(items
            .into_iter()
            .enumerate()
            .filter_map(|(index, document)| {
                if document.is_object() {
                    Some(document)
                } else {
                    warn!(index, "Skipping non-object document");
                    None
                }
            })
            .collect());
    }

    let mut documents = Vec::new();
    for (number, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let document: Value =
            serde_json::from_str(line).map_err(|e| format!("line {}: {}", number + 1, e))?;
        if !document.is_object() {
            warn!(line = number + 1, "Skipping non-object document");
            continue;
        }
        documents.push(document);
    }
    Ok(documents)
}

/// Keep only the top-level fields named by the projection (and `_id`).
///
/// Whole top-level subtrees are kept, so nested paths still resolve.
fn project(document: &Document, fields: Option<&[String]>) -> Document {
    match (fields, document) {
        (Some(fields), Value::Object(map)) => {
            let keep: HashSet<&str> = fields
                .iter()
                .map(|f| f.split('.').next().unwrap_or(f.as_str()))
                .collect();
            Value::Object(
                map.iter()
                    .filter(|(key, _)| key.as_str() == "_id" || keep.contains(key.as_str()))
                    .map(|(key, value)| (key.clone(), value.clone()))
                    .collect(),
            )
        }
        _ => document.clone(),
    }
}

// === Criteria Evaluation ===

/// A compiled criteria tree.
enum Filter {
    All(Vec<Filter>),
    Any(Vec<Filter>),
    Nor(Vec<Filter>),
    Field {
        path: String,
        conditions: Vec<Condition>,
    },
}

enum Condition {
    Eq(Value),
    Ne(Value),
    Cmp(Ordering, bool, Value),
    In(Vec<Value>),
    Nin(Vec<Value>),
    Exists(bool),
    Regex(Regex),
}

impl Filter {
    fn compile(criteria: &Criteria) -> anyhow::Result<Filter> {
        let mut parts = Vec::with_capacity(criteria.len());

        for (key, value) in criteria {
            let part = match key.as_str() {
                "$and" => Filter::All(Self::compile_list(key, value)?),
                "$or" => Filter::Any(Self::compile_list(key, value)?),
                "$nor" => Filter::Nor(Self::compile_list(key, value)?),
                op if op.starts_with('$') => bail!("unsupported top-level operator {}", op),
                path => Filter::Field {
                    path: path.to_string(),
                    conditions: Condition::compile(value)?,
                },
            };
            parts.push(part);
        }

        Ok(Filter::All(parts))
    }

    fn compile_list(op: &str, value: &Value) -> anyhow::Result<Vec<Filter>> {
        let items = value
            .as_array()
            .ok_or_else(|| anyhow!("{} expects an array", op))?;
        items
            .iter()
            .map(|item| match item {
                Value::Object(criteria) => Filter::compile(criteria),
                _ => bail!("{} expects an array of objects", op),
            })
            .collect()
    }

    fn matches(&self, document: &Value) -> bool {
        match self {
            Filter::All(parts) => parts.iter().all(|p| p.matches(document)),
            Filter::Any(parts) => parts.iter().any(|p| p.matches(document)),
            Filter::Nor(parts) => !parts.iter().any(|p| p.matches(document)),
            Filter::Field { path, conditions } => {
                let tokens: Vec<&str> = path.split('.').collect();
                let mut candidates = Vec::new();
                values_at(document, &tokens, &mut candidates);
                conditions.iter().all(|c| c.matches(&candidates))
            }
        }
    }
}

impl Condition {
    fn compile(value: &Value) -> anyhow::Result<Vec<Condition>> {
        let operators = match value {
            Value::Object(map) if !map.is_empty() && map.keys().all(|k| k.starts_with('$')) => map,
            other => return Ok(vec![Condition::Eq(other.clone())]),
        };

        let case_insensitive = operators
            .get("$options")
            .and_then(Value::as_str)
            .map_or(false, |opts| opts.contains('i'));

        let mut conditions = Vec::with_capacity(operators.len());
        for (op, operand) in operators {
            let condition = match op.as_str() {
                "$eq" => Condition::Eq(operand.clone()),
                "$ne" => Condition::Ne(operand.clone()),
                "$gt" => Condition::Cmp(Ordering::Greater, false, operand.clone()),
                "$gte" => Condition::Cmp(Ordering::Greater, true, operand.clone()),
                "$lt" => Condition::Cmp(Ordering::Less, false, operand.clone()),
                "$lte" => Condition::Cmp(Ordering::Less, true, operand.clone()),
                "$in" => Condition::In(list_operand(op, operand)?),
                "$nin" => Condition::Nin(list_operand(op, operand)?),
                "$exists" => Condition::Exists(operand.as_bool().unwrap_or(true)),
                REGEX_OPERATOR => {
                    let pattern = operand
                        .as_str()
                        .ok_or_else(|| anyhow!("$regex expects a string"))?;
                    let regex = RegexBuilder::new(pattern)
                        .case_insensitive(case_insensitive)
                        .build()
                        .map_err(|e| anyhow!("invalid $regex {}: {}", pattern, e))?;
                    Condition::Regex(regex)
                }
                "$options" => continue,
                other => bail!("unsupported operator {}", other),
            };
            conditions.push(condition);
        }

        Ok(conditions)
    }

    fn matches(&self, candidates: &[&Value]) -> bool {
        match self {
            Condition::Eq(expected) => matches_eq(candidates, expected),
            Condition::Ne(expected) => !matches_eq(candidates, expected),
            Condition::Cmp(direction, inclusive, bound) => any_scalar(candidates, |v| {
                compare(v, bound).map_or(false, |ord| {
                    ord == *direction || (*inclusive && ord == Ordering::Equal)
                })
            }),
            Condition::In(options) => options.iter().any(|o| matches_eq(candidates, o)),
            Condition::Nin(options) => !options.iter().any(|o| matches_eq(candidates, o)),
            Condition::Exists(expected) => candidates.is_empty() != *expected,
            Condition::Regex(regex) => {
                any_scalar(candidates, |v| v.as_str().map_or(false, |s| regex.is_match(s)))
            }
        }
    }
}

fn list_operand(op: &str, operand: &Value) -> anyhow::Result<Vec<Value>> {
    operand
        .as_array()
        .cloned()
        .ok_or_else(|| anyhow!("{} expects an array", op))
}

/// Collect every value reachable by `tokens`, fanning out over arrays.
fn values_at<'a>(node: &'a Value, tokens: &[&str], out: &mut Vec<&'a Value>) {
    let Some((token, rest)) = tokens.split_first() else {
        out.push(node);
        return;
    };

    match node {
        Value::Object(map) => {
            if let Some(child) = map.get(*token) {
                values_at(child, rest, out);
            }
        }
        Value::Array(items) => {
            if let Ok(index) = token.parse::<usize>() {
                if let Some(child) = items.get(index) {
                    values_at(child, rest, out);
                }
            } else {
                for item in items.iter().filter(|item| item.is_object()) {
                    values_at(item, tokens, out);
                }
            }
        }
        _ => {}
    }
}

fn matches_eq(candidates: &[&Value], expected: &Value) -> bool {
    if expected.is_null() && candidates.is_empty() {
        return true;
    }
    candidates.iter().any(|value| {
        values_equal(value, expected)
            || value
                .as_array()
                .map_or(false, |items| items.iter().any(|item| values_equal(item, expected)))
    })
}

/// Apply `test` to each candidate, and to the elements of array candidates.
fn any_scalar(candidates: &[&Value], test: impl Fn(&Value) -> bool) -> bool {
    candidates.iter().any(|value| match value {
        Value::Array(items) => items.iter().any(&test),
        other => test(other),
    })
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}
