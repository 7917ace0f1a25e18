//! In-memory index segments.
//!
//! A segment is an immutable, independently-searchable partition of the
//! index. Documents are numbered locally from zero within each segment.

use std::sync::Arc;

use ahash::AHashMap;

use crate::index::postings::VecPostingIterator;

/// Statistics for a term within one segment.
#[derive(Debug, Clone, Copy)]
pub struct TermStats {
    /// Number of documents containing this term.
    pub doc_freq: u32,
    /// Total number of occurrences of this term.
    pub total_freq: u64,
}

/// Statistics for a field within one segment.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldStats {
    /// Number of documents with this field.
    pub doc_count: u32,
    /// Total number of term occurrences in this field.
    pub total_terms: u64,
}

#[derive(Debug, Default)]
struct PostingList {
    doc_ids: Vec<u32>,
    term_freqs: Vec<u32>,
}

#[derive(Debug)]
struct FieldData {
    postings: AHashMap<String, PostingList>,
    stats: FieldStats,
    /// Field length per local document id (0 for documents without the field).
    lengths: Arc<Vec<u32>>,
}

/// A read-only view over one segment.
#[derive(Debug, Default)]
pub struct SegmentReader {
    max_doc: u32,
    fields: AHashMap<String, FieldData>,
}

impl SegmentReader {
    /// Get the number of documents in this segment.
    pub fn doc_count(&self) -> u32 {
        self.max_doc
    }

    /// Get one past the highest local document id.
    pub fn max_doc(&self) -> u32 {
        self.max_doc
    }

    /// Get statistics for a term, if the segment contains it.
    pub fn term_stats(&self, field: &str, term: &str) -> Option<TermStats> {
        let list = self.fields.get(field)?.postings.get(term)?;
        Some(TermStats {
            doc_freq: list.doc_ids.len() as u32,
            total_freq: list.term_freqs.iter().map(|&f| u64::from(f)).sum(),
        })
    }

    /// Get a posting iterator for a term, or `None` when the segment does
    /// not contain it.
    pub fn postings(&self, field: &str, term: &str) -> Option<VecPostingIterator> {
        let list = self.fields.get(field)?.postings.get(term)?;
        Some(VecPostingIterator::from_aligned(
            list.doc_ids.clone(),
            list.term_freqs.clone(),
        ))
    }

    /// Get statistics for a field, if any document carries it.
    pub fn field_stats(&self, field: &str) -> Option<FieldStats> {
        self.fields.get(field).map(|data| data.stats)
    }

    /// Get per-document lengths for a field.
    pub fn field_lengths(&self, field: &str) -> Option<Arc<Vec<u32>>> {
        self.fields.get(field).map(|data| Arc::clone(&data.lengths))
    }
}

#[derive(Debug, Default)]
struct FieldBuilder {
    postings: AHashMap<String, PostingList>,
    stats: FieldStats,
    lengths: Vec<u32>,
}

/// Builder accumulating documents into a [`SegmentReader`].
///
/// Field text is split on whitespace; terms are indexed verbatim, so any
/// normalization has to happen upstream.
#[derive(Debug, Default)]
pub struct SegmentBuilder {
    max_doc: u32,
    fields: AHashMap<String, FieldBuilder>,
}

impl SegmentBuilder {
    /// Create a new empty segment builder.
    pub fn new() -> Self {
        SegmentBuilder::default()
    }

    /// Add a document and return its local id.
    pub fn add_document(&mut self, fields: &[(&str, &str)]) -> u32 {
        let doc = self.max_doc;
        for &(field, text) in fields {
            let data = self.fields.entry(field.to_string()).or_default();

            let mut freqs: AHashMap<&str, u32> = AHashMap::new();
            let mut length = 0u32;
            for token in text.split_whitespace() {
                *freqs.entry(token).or_insert(0) += 1;
                length += 1;
            }

            for (term, freq) in freqs {
                let list = data.postings.entry(term.to_string()).or_default();
                list.doc_ids.push(doc);
                list.term_freqs.push(freq);
            }

            data.stats.doc_count += 1;
            data.stats.total_terms += u64::from(length);
            data.lengths.resize(doc as usize, 0);
            data.lengths.push(length);
        }
        self.max_doc += 1;
        doc
    }

    /// Freeze the builder into an immutable segment.
    pub fn build(self) -> SegmentReader {
        let max_doc = self.max_doc;
        let fields = self
            .fields
            .into_iter()
            .map(|(name, mut builder)| {
                builder.lengths.resize(max_doc as usize, 0);
                let data = FieldData {
                    postings: builder.postings,
                    stats: builder.stats,
                    lengths: Arc::new(builder.lengths),
                };
                (name, data)
            })
            .collect();
        SegmentReader { max_doc, fields }
    }
}
