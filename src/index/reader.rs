//! Index readers spanning one or more segments.

use std::fmt::Debug;

use crate::index::segment::SegmentReader;

/// Read-only view over a whole index, used during query rewriting and for
/// collection-level statistics.
pub trait IndexReader: Send + Sync + Debug {
    /// Get the number of documents in the index.
    fn doc_count(&self) -> u32;

    /// Get one past the highest global document id.
    fn max_doc(&self) -> u32;

    /// Get the number of documents containing a term, across all segments.
    fn term_doc_freq(&self, field: &str, term: &str) -> u32;

    /// Get the total number of occurrences of a term, across all segments.
    fn total_term_freq(&self, field: &str, term: &str) -> u64;

    /// Get the average length of a field, across all segments.
    fn avg_field_length(&self, field: &str) -> f32;
}

/// One segment of an index together with its global document-number offset.
#[derive(Debug, Clone, Copy)]
pub struct LeafContext<'a> {
    /// Position of the segment within the index.
    pub ord: usize,
    /// Offset added to local document ids to obtain global ids.
    pub doc_base: u32,
    /// The segment itself.
    pub reader: &'a SegmentReader,
}

/// An in-memory index over a fixed list of segments.
#[derive(Debug, Default)]
pub struct MemoryIndex {
    segments: Vec<SegmentReader>,
    doc_bases: Vec<u32>,
    max_doc: u32,
}

impl MemoryIndex {
    /// Create an index from already-built segments.
    pub fn new(segments: Vec<SegmentReader>) -> Self {
        let mut doc_bases = Vec::with_capacity(segments.len());
        let mut max_doc = 0u32;
        for segment in &segments {
            doc_bases.push(max_doc);
            max_doc += segment.max_doc();
        }
        MemoryIndex {
            segments,
            doc_bases,
            max_doc,
        }
    }

    /// Iterate over the segments with their doc bases.
    pub fn leaves(&self) -> impl Iterator<Item = LeafContext<'_>> {
        self.segments
            .iter()
            .zip(self.doc_bases.iter())
            .enumerate()
            .map(|(ord, (reader, &doc_base))| LeafContext {
                ord,
                doc_base,
                reader,
            })
    }

    /// Get the leaf containing a global document id.
    pub fn leaf_for_doc(&self, doc: u32) -> Option<LeafContext<'_>> {
        self.leaves()
            .find(|leaf| doc >= leaf.doc_base && doc < leaf.doc_base + leaf.reader.max_doc())
    }
}

impl IndexReader for MemoryIndex {
    fn doc_count(&self) -> u32 {
        self.segments.iter().map(|s| s.doc_count()).sum()
    }

    fn max_doc(&self) -> u32 {
        self.max_doc
    }

    fn term_doc_freq(&self, field: &str, term: &str) -> u32 {
        self.segments
            .iter()
            .filter_map(|s| s.term_stats(field, term))
            .map(|stats| stats.doc_freq)
            .sum()
    }

    fn total_term_freq(&self, field: &str, term: &str) -> u64 {
        self.segments
            .iter()
            .filter_map(|s| s.term_stats(field, term))
            .map(|stats| stats.total_freq)
            .sum()
    }

    fn avg_field_length(&self, field: &str) -> f32 {
        let mut doc_count = 0u64;
        let mut total_terms = 0u64;
        for segment in &self.segments {
            if let Some(stats) = segment.field_stats(field) {
                doc_count += u64::from(stats.doc_count);
                total_terms += stats.total_terms;
            }
        }
        if doc_count == 0 {
            0.0
        } else {
            total_terms as f32 / doc_count as f32
        }
    }
}
