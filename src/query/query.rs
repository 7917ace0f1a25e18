//! Base query trait and common query functionality.

use std::any::Any;
use std::collections::HashSet;
use std::fmt::Debug;
use std::sync::Arc;

use crate::error::Result;
use crate::index::reader::IndexReader;
use crate::query::weight::Weight;
use crate::search::searcher::IndexSearcher;

/// A field/term pair extracted from a query tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Term {
    /// The field the term occurs in.
    pub field: String,
    /// The term text.
    pub text: String,
}

impl Term {
    /// Create a new term.
    pub fn new<F, T>(field: F, text: T) -> Self
    where
        F: Into<String>,
        T: Into<String>,
    {
        Term {
            field: field.into(),
            text: text.into(),
        }
    }
}

/// Trait for search queries.
///
/// Query trees are immutable and shared through `Arc`, which is what makes
/// the rewrite identity contract observable: a no-op rewrite returns the
/// same `Arc`, never an equal copy.
pub trait Query: Send + Sync + Debug {
    /// Rewrite this query into a simpler form against the given reader.
    ///
    /// Returns the same `Arc` when nothing changes.
    fn rewrite(self: Arc<Self>, reader: &dyn IndexReader) -> Result<Arc<dyn Query>>;

    /// Add the terms this query matches on to `terms`.
    fn extract_terms(&self, terms: &mut HashSet<Term>);

    /// Compile this query into a weight for one search execution.
    fn create_weight(&self, searcher: &IndexSearcher) -> Result<Box<dyn Weight>>;

    /// Get a human-readable description of this query.
    fn description(&self) -> String;

    /// Structural equality against another query.
    fn query_eq(&self, other: &dyn Query) -> bool;

    /// Structural hash, consistent with [`Query::query_eq`].
    fn hash_code(&self) -> u64;

    /// Get this query as Any for downcasting.
    fn as_any(&self) -> &dyn Any;
}

impl PartialEq for dyn Query {
    fn eq(&self, other: &Self) -> bool {
        self.query_eq(other)
    }
}

impl Eq for dyn Query {}

/// Rewrite a query until it reaches a fixpoint.
pub fn rewrite_fully(
    query: Arc<dyn Query>,
    reader: &dyn IndexReader,
) -> Result<Arc<dyn Query>> {
    let mut current = query;
    loop {
        let next = Arc::clone(&current).rewrite(reader)?;
        if Arc::ptr_eq(&next, &current) {
            return Ok(current);
        }
        current = next;
    }
}
