//! Document store traits.
//!
//! This module defines the abstract interface to the document database. The
//! compiler, resolver and suggester never talk to a database directly; the
//! [`Browser`](crate::browser::Browser) hands compiled criteria to a
//! `DocumentStore` and formats whatever comes back.
//!
//! ## Implementing a New Store
//!
//! 1. Implement `DocumentStore` for your database client
//! 2. Translate [`Criteria`] into the database's native query form
//! 3. Apply timeouts and cancellation inside the implementation; callers
//!    do not bound the duration of a call

use crate::types::{Criteria, Document};

/// Lazily produced query results.
pub type DocumentCursor<'a> = Box<dyn Iterator<Item = Document> + Send + 'a>;

/// Abstract trait for document databases.
///
/// ## Thread Safety
///
/// Implementations must be `Send + Sync`; one store is shared by every
/// concurrent request and calls carry no cross-request state.
pub trait DocumentStore: Send + Sync {
    /// Find documents in `collection` matching `criteria`.
    ///
    /// When `projection` is given, only those field paths need to be
    /// present in the returned documents. `limit` caps the number of
    /// documents produced.
    fn find<'a>(
        &'a self,
        collection: &str,
        criteria: &Criteria,
        projection: Option<&[String]>,
        limit: Option<usize>,
    ) -> anyhow::Result<DocumentCursor<'a>>;

    /// Find the first document in `collection` matching `criteria`.
    fn find_one(&self, collection: &str, criteria: &Criteria) -> anyhow::Result<Option<Document>>;

    /// Get the store name (e.g., "memory")
    fn name(&self) -> &'static str;
}
