//! Posting-list iteration primitives.

use std::fmt::Debug;

use crate::error::Result;

/// Sentinel document id returned once an iterator is exhausted.
pub const NO_MORE_DOCS: u32 = u32::MAX;

/// Iterator over the documents of one posting list.
pub trait PostingIterator: Send + Debug {
    /// Get the current document ID.
    fn doc_id(&self) -> u32;

    /// Get the term frequency in the current document.
    fn term_freq(&self) -> u32;

    /// Move to the next document.
    fn next(&mut self) -> Result<bool>;

    /// Skip to the first document >= target.
    fn skip_to(&mut self, target: u32) -> Result<bool>;

    /// Get the cost of iterating through this posting list.
    fn cost(&self) -> u64;
}

/// A posting iterator backed by parallel vectors of doc ids and frequencies.
///
/// The iterator starts positioned on the first document.
#[derive(Debug)]
pub struct VecPostingIterator {
    doc_ids: Vec<u32>,
    term_freqs: Vec<u32>,
    position: usize,
}

impl VecPostingIterator {
    /// Create a new posting iterator.
    ///
    /// `doc_ids` must be strictly increasing and the same length as
    /// `term_freqs`.
    pub fn new(doc_ids: Vec<u32>, term_freqs: Vec<u32>) -> Result<Self> {
        if doc_ids.len() != term_freqs.len() {
            return Err(crate::error::SigilError::index(
                "doc_ids and term_freqs must have the same length",
            ));
        }
        Ok(VecPostingIterator {
            doc_ids,
            term_freqs,
            position: 0,
        })
    }

    /// Build from lists already known to be aligned.
    pub(crate) fn from_aligned(doc_ids: Vec<u32>, term_freqs: Vec<u32>) -> Self {
        debug_assert_eq!(doc_ids.len(), term_freqs.len());
        VecPostingIterator {
            doc_ids,
            term_freqs,
            position: 0,
        }
    }

    /// Create an exhausted posting iterator.
    pub fn empty() -> Self {
        VecPostingIterator {
            doc_ids: Vec::new(),
            term_freqs: Vec::new(),
            position: 0,
        }
    }

    fn exhausted(&self) -> bool {
        self.position >= self.doc_ids.len()
    }
}

impl PostingIterator for VecPostingIterator {
    fn doc_id(&self) -> u32 {
        if self.exhausted() {
            NO_MORE_DOCS
        } else {
            self.doc_ids[self.position]
        }
    }

    fn term_freq(&self) -> u32 {
        if self.exhausted() {
            0
        } else {
            self.term_freqs[self.position]
        }
    }

    fn next(&mut self) -> Result<bool> {
        if self.exhausted() {
            return Ok(false);
        }
        self.position += 1;
        Ok(!self.exhausted())
    }

    fn skip_to(&mut self, target: u32) -> Result<bool> {
        while !self.exhausted() && self.doc_ids[self.position] < target {
            self.position += 1;
        }
        Ok(!self.exhausted())
    }

    fn cost(&self) -> u64 {
        self.doc_ids.len() as u64
    }
}
