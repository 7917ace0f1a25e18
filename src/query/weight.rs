//! Per-execution query weights.
//!
//! A weight is compiled once per search execution from a query and a
//! searcher snapshot, then produces one scorer per segment.

use std::fmt::Debug;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::index::reader::LeafContext;
use crate::query::scorer::Scorer;

/// Trait for compiled query weights.
pub trait Weight: Send + Sync + Debug {
    /// The value used by the searcher to compute a query norm.
    fn value_for_normalization(&self) -> f32;

    /// Apply the query norm and top-level boost computed by the searcher.
    fn normalize(&mut self, norm: f32, top_level_boost: f32);

    /// Build a scorer over one segment.
    ///
    /// Returns `Ok(None)` when the query matches nothing in this segment;
    /// absence is not an error.
    fn scorer(&self, leaf: &LeafContext<'_>) -> Result<Option<Box<dyn Scorer>>>;

    /// Whether the scorer may deliver documents out of increasing doc order.
    fn scores_out_of_order(&self) -> bool {
        false
    }

    /// Explain how the score for one local document of a segment arises.
    fn explain(&self, leaf: &LeafContext<'_>, doc: u32) -> Result<Explanation>;
}

/// A human-readable breakdown of a document's score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Explanation {
    /// Whether the document matched at all.
    pub matched: bool,
    /// The score contribution.
    pub value: f32,
    /// What produced the value.
    pub description: String,
    /// Contributions of sub-queries.
    pub details: Vec<Explanation>,
}

impl Explanation {
    /// Create an explanation for a matching document.
    pub fn matched<S: Into<String>>(value: f32, description: S) -> Self {
        Explanation {
            matched: true,
            value,
            description: description.into(),
            details: Vec::new(),
        }
    }

    /// Create an explanation for a non-matching document.
    pub fn no_match<S: Into<String>>(description: S) -> Self {
        Explanation {
            matched: false,
            value: 0.0,
            description: description.into(),
            details: Vec::new(),
        }
    }

    /// Attach sub-query contributions.
    pub fn with_details(mut self, details: Vec<Explanation>) -> Self {
        self.details = details;
        self
    }
}
