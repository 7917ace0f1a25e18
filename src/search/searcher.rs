//! Sequential search execution.

use std::sync::Arc;

use crate::error::Result;
use crate::index::reader::{IndexReader, MemoryIndex};
use crate::query::collector::{
    Collector, CountCollector, SearchResults, TaggedTopDocsCollector,
};
use crate::query::query::{Query, rewrite_fully};
use crate::query::weight::{Explanation, Weight};

/// Collection-level statistics for one term.
#[derive(Debug, Clone, Copy)]
pub struct TermStatistics {
    /// Number of documents containing the term.
    pub doc_freq: u32,
    /// Total number of occurrences of the term.
    pub total_freq: u64,
}

/// Executes queries against a snapshot of an index.
///
/// The searcher rewrites the query to a fixpoint, compiles it into a weight
/// tree once per execution, and drives one scorer tree per segment into a
/// collector.
#[derive(Debug, Clone)]
pub struct IndexSearcher {
    index: Arc<MemoryIndex>,
}

impl IndexSearcher {
    /// Create a searcher over an index snapshot.
    pub fn new(index: Arc<MemoryIndex>) -> Self {
        IndexSearcher { index }
    }

    /// Get the underlying index.
    pub fn reader(&self) -> &MemoryIndex {
        &self.index
    }

    /// Get collection-level statistics for a term.
    pub fn term_statistics(&self, field: &str, term: &str) -> TermStatistics {
        TermStatistics {
            doc_freq: self.index.term_doc_freq(field, term),
            total_freq: self.index.total_term_freq(field, term),
        }
    }

    /// Rewrite a query, compile it, and apply the query norm.
    pub fn create_normalized_weight(&self, query: Arc<dyn Query>) -> Result<Box<dyn Weight>> {
        let rewritten = rewrite_fully(query, self.index.as_ref())?;
        let mut weight = rewritten.create_weight(self)?;
        let value = weight.value_for_normalization();
        let norm = if value > 0.0 && value.is_finite() {
            1.0 / value.sqrt()
        } else {
            1.0
        };
        weight.normalize(norm, 1.0);
        Ok(weight)
    }

    /// Search for the `limit` best hits.
    pub fn search(&self, query: Arc<dyn Query>, limit: usize) -> Result<SearchResults> {
        let mut collector = TaggedTopDocsCollector::new(limit);
        self.search_with(query, &mut collector)?;
        Ok(collector.into_results())
    }

    /// Search with a caller-provided collector.
    pub fn search_with(
        &self,
        query: Arc<dyn Query>,
        collector: &mut dyn Collector,
    ) -> Result<()> {
        let weight = self.create_normalized_weight(query)?;
        for leaf in self.index.leaves() {
            collector.set_segment(leaf.doc_base);
            if let Some(mut scorer) = weight.scorer(&leaf)? {
                while !scorer.is_exhausted() {
                    collector.collect(scorer.doc_id(), scorer.as_mut())?;
                    scorer.next()?;
                }
            }
        }
        Ok(())
    }

    /// Count the documents matching a query.
    pub fn count(&self, query: Arc<dyn Query>) -> Result<u64> {
        let mut collector = CountCollector::new();
        self.search_with(query, &mut collector)?;
        Ok(collector.count())
    }

    /// Explain the score of one global document id.
    pub fn explain(&self, query: Arc<dyn Query>, doc: u32) -> Result<Explanation> {
        let weight = self.create_normalized_weight(query)?;
        match self.index.leaf_for_doc(doc) {
            Some(leaf) => weight.explain(&leaf, doc - leaf.doc_base),
            None => Ok(Explanation::no_match(format!(
                "doc {doc} is outside the index"
            ))),
        }
    }
}
