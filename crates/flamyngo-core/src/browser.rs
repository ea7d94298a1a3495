//! Request-level operations over a configured document store.
//!
//! `Browser` ties the pieces together: it looks up the collection settings,
//! compiles the search string, runs the query through the [`DocumentStore`]
//! and resolves the configured summary fields of every returned document.
//!
//! A `Browser` is immutable after construction and can be shared between
//! threads; each call is independent of every other.

use crate::backend::DocumentStore;
use crate::compile::compile;
use crate::config::ConfigStore;
use crate::convert::coerce;
use crate::error::{FlamyngoError, Result};
use crate::resolve::{is_truthy, resolve};
use crate::suggest::suggest;
use crate::types::{Criteria, Document, PlotPoint, QueryResults, Row};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Shared entry point for query, autocomplete and document requests.
#[derive(Clone)]
pub struct Browser {
    config: Arc<ConfigStore>,
    store: Arc<dyn DocumentStore>,
}

impl std::fmt::Debug for Browser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Browser")
            .field("collections", &self.config.len())
            .field("store", &self.store.name())
            .finish()
    }
}

impl Browser {
    /// Create a browser over a validated configuration and a store.
    pub fn new(config: Arc<ConfigStore>, store: Arc<dyn DocumentStore>) -> Self {
        Browser { config, store }
    }

    /// The configuration this browser serves
    pub fn config(&self) -> &ConfigStore {
        &self.config
    }

    /// Run a summary query.
    ///
    /// Each row holds one value per configured summary column; fields that
    /// cannot be resolved are `None`. Blank search text matches everything.
    #[instrument(skip(self))]
    pub fn query(&self, collection: &str, search: &str) -> Result<QueryResults> {
        let settings = self.config.get(collection)?;
        let criteria = compile(search, settings).map_err(|e| request_failed(collection, e))?;
        let projection = settings.projection();

        let limit = match self.config.general().max_results {
            0 => None,
            n => Some(n),
        };

        let rows: Vec<Row> = self
            .store
            .find(collection, &criteria, Some(&projection), limit)
            .map_err(|e| FlamyngoError::backend("find", e))?
            .map(|doc| Row {
                values: settings
                    .summary
                    .iter()
                    .map(|s| resolve(&s.field, &doc, s.converter))
                    .collect(),
            })
            .collect();

        debug!(collection = %collection, rows = rows.len(), "Query complete");

        Ok(QueryResults {
            columns: settings.columns(),
            rows,
        })
    }

    /// Suggest completions for a partially typed search string.
    ///
    /// Field-value suggestions read at most `general.autocomplete_limit`
    /// matching documents.
    #[instrument(skip(self))]
    pub fn autocomplete(&self, collection: &str, partial: &str) -> Result<BTreeSet<String>> {
        let settings = self.config.get(collection)?;
        let limit = self.config.general().autocomplete_limit;

        suggest(partial, settings, |criteria, projection| {
            Ok(self
                .store
                .find(collection, criteria, Some(projection), Some(limit))
                .map_err(|e| FlamyngoError::backend("find", e))?
                .collect())
        })
        .map_err(|e| request_failed(collection, e))
    }

    /// Fetch one document by its unique key.
    ///
    /// The identifier is converted with the collection's `unique_key_type`
    /// before the lookup.
    #[instrument(skip(self))]
    pub fn fetch_document(&self, collection: &str, uid: &str) -> Result<Option<Document>> {
        let settings = self.config.get(collection)?;
        let key = coerce(uid, settings.unique_key_type).map_err(|e| request_failed(collection, e))?;

        let mut criteria = Criteria::new();
        criteria.insert(settings.unique_key.clone(), key);

        self.store
            .find_one(collection, &criteria)
            .map_err(|e| FlamyngoError::backend("find_one", e))
    }

    /// Every document in a collection, unfiltered.
    #[instrument(skip(self))]
    pub fn all_documents(&self, collection: &str) -> Result<Vec<Document>> {
        self.config.get(collection)?;
        Ok(self
            .store
            .find(collection, &Criteria::new(), None, None)
            .map_err(|e| FlamyngoError::backend("find", e))?
            .collect())
    }

    /// Extract `(x, y)` pairs for plotting.
    ///
    /// Axes may be display names. A document contributes a point only when
    /// both values are present and truthy. Blank search text yields no data.
    #[instrument(skip(self))]
    pub fn plot_data(
        &self,
        collection: &str,
        search: &str,
        x_axis: &str,
        y_axis: &str,
    ) -> Result<Vec<PlotPoint>> {
        let settings = self.config.get(collection)?;
        if search.trim().is_empty() {
            return Ok(Vec::new());
        }

        let x_field = settings.aliases.field_for(x_axis);
        let y_field = settings.aliases.field_for(y_axis);
        let criteria = compile(search, settings).map_err(|e| request_failed(collection, e))?;
        let projection = [x_field.to_string(), y_field.to_string()];

        Ok(self
            .store
            .find(collection, &criteria, Some(&projection), None)
            .map_err(|e| FlamyngoError::backend("find", e))?
            .filter_map(|doc| {
                let x = resolve(x_field, &doc, None).filter(is_truthy)?;
                let y = resolve(y_field, &doc, None).filter(is_truthy)?;
                Some((x, y))
            })
            .collect())
    }
}

fn request_failed(collection: &str, err: FlamyngoError) -> FlamyngoError {
    if err.is_request_error() {
        warn!(collection = %collection, error = %err, "Request rejected");
    }
    err
}
