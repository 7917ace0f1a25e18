//! Collector implementations for gathering search results.
//!
//! A collector consumes a scorer's output across one or more segments.
//! Collection passes the scorer to [`Collector::collect`] explicitly; the
//! collector pulls the score for the current document, which is also the
//! call that makes annotated sub-scorers report their tags.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt::Debug;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SigilError};
use crate::query::annotation::TagBuffer;
use crate::query::scorer::Scorer;

/// Trait for collecting search results.
pub trait Collector: Send + Debug {
    /// Begin collecting a new segment whose documents start at `doc_base`.
    fn set_segment(&mut self, doc_base: u32);

    /// Collect the scorer's current document, given by its local id.
    fn collect(&mut self, doc: u32, scorer: &mut dyn Scorer) -> Result<()>;

    /// Whether documents may be delivered out of increasing doc order
    /// within a segment.
    fn accepts_docs_out_of_order(&self) -> bool;

    /// Get the total number of candidates seen, retained or not.
    fn total_hits(&self) -> u64;
}

/// A search hit with the tags of every sub-query that contributed to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaggedHit {
    /// The global document ID.
    pub doc_id: u32,
    /// The relevance score.
    pub score: f32,
    /// The originating shard, set by a shard-level merge.
    pub shard_index: Option<u32>,
    /// Tags in the order they were reported; duplicates preserved.
    pub tags: Vec<String>,
}

impl TaggedHit {
    /// Render the tags with a separator, for external consumption.
    pub fn joined_tags(&self, separator: &str) -> String {
        self.tags.join(separator)
    }
}

/// Search results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResults {
    /// The retained hits, best first.
    pub hits: Vec<TaggedHit>,
    /// Total number of matching documents, including non-retained ones.
    pub total_hits: u64,
    /// Maximum score in the results.
    pub max_score: f32,
}

impl SearchResults {
    /// Create empty results.
    pub fn empty() -> Self {
        SearchResults {
            hits: Vec::new(),
            total_hits: 0,
            max_score: 0.0,
        }
    }
}

/// A retained candidate in the bounded queue.
#[derive(Debug, Clone)]
struct RankedEntry {
    doc_id: u32,
    score: f32,
    tags: Vec<String>,
}

impl PartialEq for RankedEntry {
    fn eq(&self, other: &Self) -> bool {
        self.score == other.score && self.doc_id == other.doc_id
    }
}

impl Eq for RankedEntry {}

impl PartialOrd for RankedEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RankedEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // The heap's top is the worst retained entry: lowest score, then
        // highest doc id among score ties.
        other
            .score
            .partial_cmp(&self.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| self.doc_id.cmp(&other.doc_id))
    }
}

/// A collector that keeps the `k` best tagged hits across segments.
///
/// Admission orders candidates by score descending, then document id
/// ascending, so results are identical for any arrival order of the same
/// candidates. NaN scores are refused as a defect of the scorer tree.
#[derive(Debug)]
pub struct TaggedTopDocsCollector {
    limit: usize,
    queue: BinaryHeap<RankedEntry>,
    doc_base: u32,
    doc_tags: TagBuffer,
    total_hits: u64,
}

impl TaggedTopDocsCollector {
    /// Create a collector retaining at most `limit` hits.
    pub fn new(limit: usize) -> Self {
        TaggedTopDocsCollector {
            limit,
            queue: BinaryHeap::with_capacity(limit),
            doc_base: 0,
            doc_tags: TagBuffer::new(),
            total_hits: 0,
        }
    }

    /// Get the retention limit.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Finalize collection and extract the results, best hit first.
    pub fn into_results(self) -> SearchResults {
        let hits: Vec<TaggedHit> = self
            .queue
            .into_sorted_vec()
            .into_iter()
            .map(|entry| TaggedHit {
                doc_id: entry.doc_id,
                score: entry.score,
                shard_index: None,
                tags: entry.tags,
            })
            .collect();
        let max_score = hits.first().map(|hit| hit.score).unwrap_or(0.0);
        SearchResults {
            hits,
            total_hits: self.total_hits,
            max_score,
        }
    }
}

impl Collector for TaggedTopDocsCollector {
    fn set_segment(&mut self, doc_base: u32) {
        self.doc_base = doc_base;
    }

    fn collect(&mut self, doc: u32, scorer: &mut dyn Scorer) -> Result<()> {
        self.doc_tags.clear();
        let score = scorer.score(&mut self.doc_tags)?;

        // This collector cannot rank NaN.
        if score.is_nan() {
            return Err(SigilError::invalid_operation(format!(
                "scorer produced NaN score for doc {doc}"
            )));
        }

        self.total_hits += 1;

        let doc_id = doc + self.doc_base;

        if self.queue.len() < self.limit {
            self.queue.push(RankedEntry {
                doc_id,
                score,
                tags: self.doc_tags.take(),
            });
            return Ok(());
        }

        let Some(worst) = self.queue.peek() else {
            // Zero-capacity collector only counts.
            return Ok(());
        };
        if score < worst.score {
            // Doesn't compete with the bottom entry.
            return Ok(());
        }
        if score == worst.score && doc_id > worst.doc_id {
            // Break score tie by doc id: lower doc wins.
            return Ok(());
        }

        self.queue.pop();
        self.queue.push(RankedEntry {
            doc_id,
            score,
            tags: self.doc_tags.take(),
        });
        Ok(())
    }

    fn accepts_docs_out_of_order(&self) -> bool {
        true
    }

    fn total_hits(&self) -> u64 {
        self.total_hits
    }
}

/// A collector that only counts matching documents, without scoring them.
#[derive(Debug, Default)]
pub struct CountCollector {
    count: u64,
}

impl CountCollector {
    /// Create a new count collector.
    pub fn new() -> Self {
        CountCollector::default()
    }

    /// Get the current count.
    pub fn count(&self) -> u64 {
        self.count
    }
}

impl Collector for CountCollector {
    fn set_segment(&mut self, _doc_base: u32) {}

    fn collect(&mut self, _doc: u32, _scorer: &mut dyn Scorer) -> Result<()> {
        self.count += 1;
        Ok(())
    }

    fn accepts_docs_out_of_order(&self) -> bool {
        true
    }

    fn total_hits(&self) -> u64 {
        self.count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::annotation::TagSink;
    use crate::query::scorer::NO_MORE_DOCS;

    /// Scripted scorer for driving collectors directly in tests.
    #[derive(Debug)]
    struct ScriptedScorer {
        score: f32,
        tags: Vec<String>,
    }

    impl ScriptedScorer {
        fn new(score: f32) -> Self {
            ScriptedScorer {
                score,
                tags: Vec::new(),
            }
        }

        fn with_tags(score: f32, tags: &[&str]) -> Self {
            ScriptedScorer {
                score,
                tags: tags.iter().map(|t| t.to_string()).collect(),
            }
        }
    }

    impl Scorer for ScriptedScorer {
        fn doc_id(&self) -> u32 {
            NO_MORE_DOCS
        }

        fn next(&mut self) -> Result<bool> {
            Ok(false)
        }

        fn skip_to(&mut self, _target: u32) -> Result<bool> {
            Ok(false)
        }

        fn score(&mut self, tags: &mut dyn TagSink) -> Result<f32> {
            for tag in &self.tags {
                tags.append_tag(tag);
            }
            Ok(self.score)
        }

        fn freq(&self) -> u32 {
            1
        }

        fn cost(&self) -> u64 {
            1
        }
    }

    fn collect_all(collector: &mut TaggedTopDocsCollector, candidates: &[(u32, f32)]) {
        for &(doc, score) in candidates {
            collector
                .collect(doc, &mut ScriptedScorer::new(score))
                .unwrap();
        }
    }

    #[test]
    fn test_bounded_k_invariant() {
        let candidates: Vec<(u32, f32)> = vec![
            (0, 0.5),
            (1, 2.0),
            (2, 1.5),
            (3, 0.1),
            (4, 3.0),
            (5, 0.9),
            (6, 2.5),
        ];

        let mut collector = TaggedTopDocsCollector::new(3);
        collect_all(&mut collector, &candidates);

        let results = collector.into_results();
        assert_eq!(results.total_hits, 7);
        assert_eq!(results.hits.len(), 3);
        assert_eq!(results.max_score, 3.0);

        let docs: Vec<u32> = results.hits.iter().map(|h| h.doc_id).collect();
        assert_eq!(docs, vec![4, 6, 1]);
    }

    #[test]
    fn test_fewer_candidates_than_limit() {
        let mut collector = TaggedTopDocsCollector::new(10);
        collect_all(&mut collector, &[(3, 1.0), (7, 2.0)]);

        let results = collector.into_results();
        assert_eq!(results.total_hits, 2);
        assert_eq!(results.hits.len(), 2);
        assert_eq!(results.hits[0].doc_id, 7);
        assert_eq!(results.hits[1].doc_id, 3);
    }

    #[test]
    fn test_tie_break_keeps_lower_doc() {
        let mut collector = TaggedTopDocsCollector::new(1);
        collect_all(&mut collector, &[(5, 1.0), (3, 1.0)]);

        let results = collector.into_results();
        assert_eq!(results.hits.len(), 1);
        assert_eq!(results.hits[0].doc_id, 3);

        // Same outcome with the other arrival order.
        let mut collector = TaggedTopDocsCollector::new(1);
        collect_all(&mut collector, &[(3, 1.0), (5, 1.0)]);

        let results = collector.into_results();
        assert_eq!(results.hits[0].doc_id, 3);
    }

    #[test]
    fn test_result_order_breaks_ties_by_doc() {
        let mut collector = TaggedTopDocsCollector::new(5);
        collect_all(&mut collector, &[(9, 1.0), (2, 2.0), (4, 1.0), (1, 1.0)]);

        let results = collector.into_results();
        let docs: Vec<u32> = results.hits.iter().map(|h| h.doc_id).collect();
        assert_eq!(docs, vec![2, 1, 4, 9]);
    }

    #[test]
    fn test_out_of_order_delivery_is_invariant() {
        let candidates: Vec<(u32, f32)> = vec![
            (0, 1.0),
            (1, 2.0),
            (2, 2.0),
            (3, 0.5),
            (4, 1.5),
            (5, 2.0),
            (6, 0.5),
        ];
        let mut reversed = candidates.clone();
        reversed.reverse();
        let mut interleaved: Vec<(u32, f32)> = Vec::new();
        for i in 0..candidates.len() {
            let index = (i * 3 + 1) % candidates.len();
            interleaved.push(candidates[index]);
        }

        let mut expected = None;
        for order in [candidates, reversed, interleaved] {
            let mut collector = TaggedTopDocsCollector::new(4);
            collect_all(&mut collector, &order);
            let results = collector.into_results();
            let outcome: Vec<(u32, u32)> = results
                .hits
                .iter()
                .map(|h| (h.doc_id, h.score.to_bits()))
                .collect();
            match &expected {
                None => expected = Some(outcome),
                Some(expected) => assert_eq!(&outcome, expected),
            }
        }
    }

    #[test]
    fn test_nan_score_is_an_error() {
        let mut collector = TaggedTopDocsCollector::new(2);
        let err = collector
            .collect(0, &mut ScriptedScorer::new(f32::NAN))
            .unwrap_err();
        assert!(matches!(err, SigilError::InvalidOperation(_)));

        // The refused candidate is not counted.
        assert_eq!(collector.total_hits(), 0);
    }

    #[test]
    fn test_rejected_candidates_still_count() {
        let mut collector = TaggedTopDocsCollector::new(1);
        collect_all(&mut collector, &[(0, 2.0), (1, 1.0), (2, 0.5)]);

        assert_eq!(collector.total_hits(), 3);
        let results = collector.into_results();
        assert_eq!(results.total_hits, 3);
        assert_eq!(results.hits.len(), 1);
    }

    #[test]
    fn test_doc_base_rebasing() {
        let mut collector = TaggedTopDocsCollector::new(10);

        collector.set_segment(0);
        collector
            .collect(1, &mut ScriptedScorer::new(1.0))
            .unwrap();

        collector.set_segment(100);
        collector
            .collect(1, &mut ScriptedScorer::new(2.0))
            .unwrap();

        let results = collector.into_results();
        assert_eq!(results.hits[0].doc_id, 101);
        assert_eq!(results.hits[1].doc_id, 1);
    }

    #[test]
    fn test_tags_captured_per_document() {
        let mut collector = TaggedTopDocsCollector::new(2);

        collector
            .collect(0, &mut ScriptedScorer::with_tags(1.0, &["a"]))
            .unwrap();
        collector
            .collect(1, &mut ScriptedScorer::with_tags(2.0, &["a", "d", "a"]))
            .unwrap();

        let results = collector.into_results();
        assert_eq!(results.hits[0].doc_id, 1);
        assert_eq!(results.hits[0].tags, vec!["a", "d", "a"]);
        assert_eq!(results.hits[0].joined_tags(","), "a,d,a");
        assert_eq!(results.hits[1].tags, vec!["a"]);
    }

    #[test]
    fn test_replacement_replaces_tags() {
        let mut collector = TaggedTopDocsCollector::new(1);

        collector
            .collect(0, &mut ScriptedScorer::with_tags(1.0, &["low"]))
            .unwrap();
        collector
            .collect(1, &mut ScriptedScorer::with_tags(2.0, &["high"]))
            .unwrap();

        let results = collector.into_results();
        assert_eq!(results.hits.len(), 1);
        assert_eq!(results.hits[0].tags, vec!["high"]);
    }

    #[test]
    fn test_zero_limit_only_counts() {
        let mut collector = TaggedTopDocsCollector::new(0);
        collect_all(&mut collector, &[(0, 1.0), (1, 2.0)]);

        let results = collector.into_results();
        assert_eq!(results.total_hits, 2);
        assert!(results.hits.is_empty());
        assert_eq!(results.max_score, 0.0);
    }

    #[test]
    fn test_accepts_out_of_order() {
        let collector = TaggedTopDocsCollector::new(1);
        assert!(collector.accepts_docs_out_of_order());
    }

    #[test]
    fn test_count_collector() {
        let mut collector = CountCollector::new();
        assert_eq!(collector.count(), 0);

        collector
            .collect(0, &mut ScriptedScorer::new(1.0))
            .unwrap();
        collector
            .collect(1, &mut ScriptedScorer::new(0.5))
            .unwrap();

        assert_eq!(collector.count(), 2);
        assert_eq!(collector.total_hits(), 2);
    }
}
