//! Term query implementation for exact term matching.

use std::collections::HashSet;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::Arc;

use crate::error::Result;
use crate::index::postings::PostingIterator;
use crate::index::reader::{IndexReader, LeafContext};
use crate::query::annotation::TagSink;
use crate::query::query::{Query, Term};
use crate::query::scorer::{Bm25Similarity, Scorer};
use crate::query::weight::{Explanation, Weight};
use crate::search::searcher::IndexSearcher;

/// A query that matches documents containing a specific term.
///
/// Terms are matched exactly and are not analyzed; normalize query strings
/// upstream before constructing a `TermQuery`.
#[derive(Debug, Clone)]
pub struct TermQuery {
    term: Term,
    boost: f32,
}

impl TermQuery {
    /// Create a new term query.
    pub fn new<F, T>(field: F, text: T) -> Self
    where
        F: Into<String>,
        T: Into<String>,
    {
        TermQuery {
            term: Term::new(field, text),
            boost: 1.0,
        }
    }

    /// Set the boost factor.
    pub fn with_boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }

    /// Get the term.
    pub fn term(&self) -> &Term {
        &self.term
    }

    /// Get the field name.
    pub fn field(&self) -> &str {
        &self.term.field
    }

    /// Get the term text.
    pub fn text(&self) -> &str {
        &self.term.text
    }

    /// Get the boost factor.
    pub fn boost(&self) -> f32 {
        self.boost
    }
}

impl Query for TermQuery {
    fn rewrite(self: Arc<Self>, _reader: &dyn IndexReader) -> Result<Arc<dyn Query>> {
        Ok(self)
    }

    fn extract_terms(&self, terms: &mut HashSet<Term>) {
        terms.insert(self.term.clone());
    }

    fn create_weight(&self, searcher: &IndexSearcher) -> Result<Box<dyn Weight>> {
        Ok(Box::new(TermWeight::new(self, searcher)))
    }

    fn description(&self) -> String {
        if self.boost == 1.0 {
            format!("{}:{}", self.term.field, self.term.text)
        } else {
            format!("{}:{}^{}", self.term.field, self.term.text, self.boost)
        }
    }

    fn query_eq(&self, other: &dyn Query) -> bool {
        match other.as_any().downcast_ref::<TermQuery>() {
            Some(other) => self.term == other.term && self.boost == other.boost,
            None => false,
        }
    }

    fn hash_code(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        "term".hash(&mut hasher);
        self.term.hash(&mut hasher);
        self.boost.to_bits().hash(&mut hasher);
        hasher.finish()
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

/// Weight for a [`TermQuery`], carrying collection-level statistics.
#[derive(Debug)]
pub struct TermWeight {
    term: Term,
    boost: f32,
    idf: f32,
    avg_field_length: f32,
    similarity: Bm25Similarity,
    norm: f32,
}

impl TermWeight {
    fn new(query: &TermQuery, searcher: &IndexSearcher) -> Self {
        let similarity = Bm25Similarity::new();
        let stats = searcher.term_statistics(&query.term.field, &query.term.text);
        let doc_count = searcher.reader().doc_count();
        let idf = similarity.idf(u64::from(stats.doc_freq), u64::from(doc_count));
        let avg_field_length = searcher.reader().avg_field_length(&query.term.field);
        TermWeight {
            term: query.term.clone(),
            boost: query.boost,
            idf,
            avg_field_length,
            similarity,
            norm: 1.0,
        }
    }

    fn weight_value(&self) -> f32 {
        self.boost * self.idf * self.norm
    }
}

impl Weight for TermWeight {
    fn value_for_normalization(&self) -> f32 {
        let weight = self.idf * self.boost;
        weight * weight
    }

    fn normalize(&mut self, norm: f32, top_level_boost: f32) {
        self.norm = norm * top_level_boost;
    }

    fn scorer(&self, leaf: &LeafContext<'_>) -> Result<Option<Box<dyn Scorer>>> {
        let Some(postings) = leaf.reader.postings(&self.term.field, &self.term.text) else {
            return Ok(None);
        };
        let lengths = leaf.reader.field_lengths(&self.term.field);
        Ok(Some(Box::new(TermScorer {
            postings: Box::new(postings),
            weight_value: self.weight_value(),
            avg_field_length: self.avg_field_length,
            similarity: self.similarity.clone(),
            lengths,
        })))
    }

    fn explain(&self, leaf: &LeafContext<'_>, doc: u32) -> Result<Explanation> {
        let Some(mut scorer) = self.scorer(leaf)? else {
            return Ok(Explanation::no_match(format!(
                "no matching term {}:{}",
                self.term.field, self.term.text
            )));
        };
        scorer.skip_to(doc)?;
        if scorer.doc_id() != doc {
            return Ok(Explanation::no_match(format!(
                "no matching term {}:{}",
                self.term.field, self.term.text
            )));
        }
        let freq = scorer.freq();
        let score = scorer.score(&mut crate::query::annotation::DiscardTags)?;
        Ok(Explanation::matched(
            score,
            format!("weight({}:{}), product of:", self.term.field, self.term.text),
        )
        .with_details(vec![
            Explanation::matched(self.idf, "idf"),
            Explanation::matched(freq as f32, "freq"),
        ]))
    }
}

/// Scorer for a [`TermQuery`] over one segment.
#[derive(Debug)]
pub struct TermScorer {
    postings: Box<dyn PostingIterator>,
    weight_value: f32,
    avg_field_length: f32,
    similarity: Bm25Similarity,
    lengths: Option<Arc<Vec<u32>>>,
}

impl Scorer for TermScorer {
    fn doc_id(&self) -> u32 {
        self.postings.doc_id()
    }

    fn next(&mut self) -> Result<bool> {
        self.postings.next()
    }

    fn skip_to(&mut self, target: u32) -> Result<bool> {
        self.postings.skip_to(target)
    }

    fn score(&mut self, _tags: &mut dyn TagSink) -> Result<f32> {
        let freq = self.postings.term_freq() as f32;
        let field_length = self
            .lengths
            .as_ref()
            .and_then(|lengths| lengths.get(self.postings.doc_id() as usize))
            .map(|&len| len as f32)
            .unwrap_or(self.avg_field_length);
        let tf = self
            .similarity
            .tf(freq, field_length, self.avg_field_length);
        Ok(self.weight_value * tf)
    }

    fn freq(&self) -> u32 {
        self.postings.term_freq()
    }

    fn cost(&self) -> u64 {
        self.postings.cost()
    }
}
