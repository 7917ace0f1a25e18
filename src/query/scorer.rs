//! Scorer protocol and scoring math.
//!
//! A scorer is a forward-only iterator over the matching documents of one
//! segment that can also score its current document. Scoring threads an
//! explicit tag sink down the scorer tree, so annotated sub-scorers report
//! their tag exactly when their `score` runs for a document.

use std::fmt::Debug;

use crate::error::Result;
use crate::query::annotation::TagSink;

pub use crate::index::postings::NO_MORE_DOCS;

/// Trait for document scorers.
///
/// Scorers are positioned on their first matching document at construction
/// time, or exhausted immediately when the segment has no match.
pub trait Scorer: Send + Debug {
    /// Get the current document ID, or [`NO_MORE_DOCS`].
    fn doc_id(&self) -> u32;

    /// Move to the next matching document.
    fn next(&mut self) -> Result<bool>;

    /// Skip to the first matching document >= target.
    fn skip_to(&mut self, target: u32) -> Result<bool>;

    /// Score the current document, reporting annotation tags to `tags`.
    fn score(&mut self, tags: &mut dyn TagSink) -> Result<f32>;

    /// Get the match frequency within the current document.
    fn freq(&self) -> u32;

    /// Get the cost of iterating through this scorer.
    fn cost(&self) -> u64;

    /// Check if this scorer is exhausted.
    fn is_exhausted(&self) -> bool {
        self.doc_id() == NO_MORE_DOCS
    }
}

/// BM25 parameters shared by term weights.
#[derive(Debug, Clone)]
pub struct Bm25Similarity {
    /// Term-frequency saturation parameter.
    k1: f32,
    /// Length-normalization parameter.
    b: f32,
}

impl Bm25Similarity {
    /// Create a similarity with the standard parameters.
    pub fn new() -> Self {
        Bm25Similarity { k1: 1.2, b: 0.75 }
    }

    /// Create a similarity with custom parameters.
    pub fn with_params(k1: f32, b: f32) -> Self {
        Bm25Similarity { k1, b }
    }

    /// Get the k1 parameter.
    pub fn k1(&self) -> f32 {
        self.k1
    }

    /// Get the b parameter.
    pub fn b(&self) -> f32 {
        self.b
    }

    /// Calculate the IDF (Inverse Document Frequency) component.
    pub fn idf(&self, doc_freq: u64, doc_count: u64) -> f32 {
        if doc_freq == 0 || doc_count == 0 {
            return 0.0;
        }

        let n = doc_count as f32;
        let df = doc_freq as f32;

        // IDF = log(1 + (N - df + 0.5) / (df + 0.5))
        ((n - df + 0.5) / (df + 0.5) + 1.0).ln()
    }

    /// Calculate the TF (Term Frequency) component.
    pub fn tf(&self, term_freq: f32, field_length: f32, avg_field_length: f32) -> f32 {
        if term_freq == 0.0 {
            return 0.0;
        }

        let norm_factor = if avg_field_length > 0.0 {
            1.0 - self.b + self.b * (field_length / avg_field_length)
        } else {
            1.0
        };

        // TF = (tf * (k1 + 1)) / (tf + k1 * norm_factor)
        (term_freq * (self.k1 + 1.0)) / (term_freq + self.k1 * norm_factor)
    }
}

impl Default for Bm25Similarity {
    fn default() -> Self {
        Self::new()
    }
}
