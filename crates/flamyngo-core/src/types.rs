//! Core data types for Flamyngo.
//!
//! Documents and criteria are plain JSON trees. The `serde_json` map keeps
//! insertion order, so criteria built from user input or configuration keep
//! the order in which they were written.

use crate::resolve::display_value;
use serde::Serialize;
use serde_json::{Map, Value};

/// A document as returned by the document store: a tree of maps, sequences
/// and scalars.
pub type Document = Value;

/// A structured query, consumed by [`DocumentStore::find`].
///
/// An empty map matches every document.
///
/// [`DocumentStore::find`]: crate::backend::DocumentStore::find
pub type Criteria = Map<String, Value>;

/// Operator key used for regular-expression criteria
pub const REGEX_OPERATOR: &str = "$regex";

/// A displayed column of a summary query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    /// Internal field path (e.g. `structure.lattice.a`)
    pub field: String,

    /// Display name (the alias of `field`, or `field` itself)
    pub name: String,
}

/// One result row: a value per column, `None` where the field was absent.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub values: Vec<Option<Value>>,
}

impl Row {
    /// Render every cell for presentation; absent cells become blank.
    pub fn rendered(&self) -> Vec<String> {
        self.values.iter().map(display_value).collect()
    }
}

/// The outcome of a summary query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResults {
    /// Columns in configured summary order
    pub columns: Vec<Column>,

    /// Rows in document-store order
    pub rows: Vec<Row>,
}

impl QueryResults {
    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when the query matched nothing
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Convert rows into JSON objects keyed by display name.
    ///
    /// Absent values are rendered as empty strings.
    pub fn to_json_rows(&self) -> Vec<Value> {
        self.rows
            .iter()
            .map(|row| {
                let mut object = Map::new();
                for (column, value) in self.columns.iter().zip(&row.values) {
                    let cell = value
                        .clone()
                        .unwrap_or_else(|| Value::String(String::new()));
                    object.insert(column.name.clone(), cell);
                }
                Value::Object(object)
            })
            .collect()
    }
}

/// An `(x, y)` pair extracted for plotting.
pub type PlotPoint = (Value, Value);
