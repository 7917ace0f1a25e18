//! Segment-parallel search execution.
//!
//! Each segment is scored by its own task owning its own collector and its
//! own scorer tree; nothing mutable is shared across threads. Per-segment
//! results are merged with the same score/doc tie-break the collector uses.

use std::cmp::Ordering;
use std::sync::Arc;

use rayon::prelude::*;

use crate::error::Result;
use crate::query::collector::{Collector, SearchResults, TaggedHit, TaggedTopDocsCollector};
use crate::query::query::Query;
use crate::search::searcher::IndexSearcher;

impl IndexSearcher {
    /// Search for the `limit` best hits, scoring segments in parallel.
    ///
    /// Equivalent to [`IndexSearcher::search`]; tag-bit allocation must be
    /// complete before this call since scoring happens concurrently.
    pub fn search_parallel(&self, query: Arc<dyn Query>, limit: usize) -> Result<SearchResults> {
        let weight = self.create_normalized_weight(query)?;
        let leaves: Vec<_> = self.reader().leaves().collect();

        let per_segment: Vec<SearchResults> = leaves
            .into_par_iter()
            .map(|leaf| -> Result<SearchResults> {
                let mut collector = TaggedTopDocsCollector::new(limit);
                collector.set_segment(leaf.doc_base);
                if let Some(mut scorer) = weight.scorer(&leaf)? {
                    while !scorer.is_exhausted() {
                        collector.collect(scorer.doc_id(), scorer.as_mut())?;
                        scorer.next()?;
                    }
                }
                Ok(collector.into_results())
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(merge_segment_results(per_segment, limit))
    }
}

fn hit_rank(a: &TaggedHit, b: &TaggedHit) -> Ordering {
    b.score
        .partial_cmp(&a.score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.doc_id.cmp(&b.doc_id))
}

/// Merge per-segment results into a global top-k.
///
/// Document ids are already global (rebased during collection), so ties
/// resolve on score descending, then doc id ascending.
pub(crate) fn merge_segment_results(
    results: Vec<SearchResults>,
    limit: usize,
) -> SearchResults {
    let total_hits = results.iter().map(|r| r.total_hits).sum();
    let mut hits: Vec<TaggedHit> = results.into_iter().flat_map(|r| r.hits).collect();
    hits.sort_by(hit_rank);
    hits.truncate(limit);
    let max_score = hits.first().map(|hit| hit.score).unwrap_or(0.0);
    SearchResults {
        hits,
        total_hits,
        max_score,
    }
}

/// Merge top-k results from independent shards into a global top-k.
///
/// Each hit is stamped with the ordinal of its shard; score ties resolve by
/// shard ordinal ascending, then doc id ascending, so the merge is
/// deterministic even when shards report overlapping doc ids.
pub fn merge_shard_results(shards: Vec<SearchResults>, limit: usize) -> SearchResults {
    let total_hits = shards.iter().map(|r| r.total_hits).sum();
    let mut hits: Vec<TaggedHit> = shards
        .into_iter()
        .enumerate()
        .flat_map(|(shard, results)| {
            results.hits.into_iter().map(move |mut hit| {
                hit.shard_index = Some(shard as u32);
                hit
            })
        })
        .collect();
    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.shard_index.cmp(&b.shard_index))
            .then_with(|| a.doc_id.cmp(&b.doc_id))
    });
    hits.truncate(limit);
    let max_score = hits.first().map(|hit| hit.score).unwrap_or(0.0);
    SearchResults {
        hits,
        total_hits,
        max_score,
    }
}
