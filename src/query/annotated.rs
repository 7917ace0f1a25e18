//! Annotated query decoration.
//!
//! An [`AnnotatedQuery`] wraps any sub-query with an [`Annotation`] without
//! changing which documents match or how they score. The decoration is
//! carried through weight compilation and per-segment scorer construction,
//! and surfaces either as a tag reported during scoring (`Tag` variant) or
//! as a bitmask readable off the scorer (`BitMask` variant).

use std::collections::HashSet;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::Arc;

use crate::error::Result;
use crate::index::reader::{IndexReader, LeafContext};
use crate::query::annotation::{Annotation, TagSink};
use crate::query::query::{Query, Term};
use crate::query::scorer::Scorer;
use crate::query::weight::{Explanation, Weight};
use crate::search::searcher::IndexSearcher;

/// A query wrapping a sub-query with an annotation.
#[derive(Debug)]
pub struct AnnotatedQuery {
    inner: Arc<dyn Query>,
    annotation: Annotation,
}

impl AnnotatedQuery {
    /// Wrap a query with an annotation.
    pub fn new(inner: Arc<dyn Query>, annotation: Annotation) -> Self {
        AnnotatedQuery { inner, annotation }
    }

    /// Wrap a query with a bitmask annotation.
    pub fn mask(inner: Arc<dyn Query>, bits: u64) -> Self {
        AnnotatedQuery::new(inner, Annotation::mask(bits))
    }

    /// Wrap a query with a tag annotation.
    pub fn tag<S: Into<String>>(inner: Arc<dyn Query>, name: S) -> Self {
        AnnotatedQuery::new(inner, Annotation::tag(name))
    }

    /// Get the wrapped query.
    pub fn inner(&self) -> &Arc<dyn Query> {
        &self.inner
    }

    /// Get the annotation.
    pub fn annotation(&self) -> &Annotation {
        &self.annotation
    }
}

impl Query for AnnotatedQuery {
    fn rewrite(self: Arc<Self>, reader: &dyn IndexReader) -> Result<Arc<dyn Query>> {
        let rewritten = Arc::clone(&self.inner).rewrite(reader)?;
        if Arc::ptr_eq(&rewritten, &self.inner) {
            // No-op rewrites preserve identity, not just equality.
            Ok(self)
        } else {
            Ok(Arc::new(AnnotatedQuery::new(
                rewritten,
                self.annotation.clone(),
            )))
        }
    }

    fn extract_terms(&self, terms: &mut HashSet<Term>) {
        // The annotation contributes no terms.
        self.inner.extract_terms(terms);
    }

    fn create_weight(&self, searcher: &IndexSearcher) -> Result<Box<dyn Weight>> {
        // Inner construction failures propagate unchanged.
        let inner_weight = self.inner.create_weight(searcher)?;
        Ok(Box::new(AnnotatedWeight {
            inner: inner_weight,
            annotation: self.annotation.clone(),
        }))
    }

    fn description(&self) -> String {
        format!("{}{}", self.annotation, self.inner.description())
    }

    fn query_eq(&self, other: &dyn Query) -> bool {
        match other.as_any().downcast_ref::<AnnotatedQuery>() {
            Some(other) => {
                self.annotation == other.annotation
                    && self.inner.query_eq(other.inner.as_ref())
            }
            None => false,
        }
    }

    fn hash_code(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        "annotated".hash(&mut hasher);
        self.annotation.hash(&mut hasher);
        self.inner.hash_code().hash(&mut hasher);
        hasher.finish()
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

/// Weight wrapping a sub-query's weight with an annotation.
///
/// Normalization and explanation delegate unchanged: the annotation never
/// affects scoring arithmetic.
#[derive(Debug)]
pub struct AnnotatedWeight {
    inner: Box<dyn Weight>,
    annotation: Annotation,
}

impl AnnotatedWeight {
    /// Get the annotation.
    pub fn annotation(&self) -> &Annotation {
        &self.annotation
    }
}

impl Weight for AnnotatedWeight {
    fn value_for_normalization(&self) -> f32 {
        self.inner.value_for_normalization()
    }

    fn normalize(&mut self, norm: f32, top_level_boost: f32) {
        self.inner.normalize(norm, top_level_boost);
    }

    fn scorer(&self, leaf: &LeafContext<'_>) -> Result<Option<Box<dyn Scorer>>> {
        match self.inner.scorer(leaf)? {
            // No matches in this segment; nothing to wrap.
            None => Ok(None),
            Some(inner_scorer) => Ok(Some(Box::new(AnnotatedScorer {
                inner: inner_scorer,
                annotation: self.annotation.clone(),
            }))),
        }
    }

    fn scores_out_of_order(&self) -> bool {
        self.inner.scores_out_of_order()
    }

    fn explain(&self, leaf: &LeafContext<'_>, doc: u32) -> Result<Explanation> {
        self.inner.explain(leaf, doc)
    }
}

/// Scorer wrapping a sub-query's scorer with an annotation.
///
/// Iteration forwards verbatim to the inner scorer. Scoring a document with
/// the `Tag` variant first reports the tag to the sink, then returns the
/// inner score; the `BitMask` variant is a pure pass-through whose mask is
/// readable through [`AnnotatedScorer::bitmask`].
#[derive(Debug)]
pub struct AnnotatedScorer {
    inner: Box<dyn Scorer>,
    annotation: Annotation,
}

impl AnnotatedScorer {
    /// Create an annotated scorer around an existing scorer.
    pub fn new(inner: Box<dyn Scorer>, annotation: Annotation) -> Self {
        AnnotatedScorer { inner, annotation }
    }

    /// Get the annotation.
    pub fn annotation(&self) -> &Annotation {
        &self.annotation
    }

    /// Get the bitmask payload, if this scorer carries a bitmask annotation.
    pub fn bitmask(&self) -> Option<u64> {
        self.annotation.bitmask()
    }
}

impl Scorer for AnnotatedScorer {
    fn doc_id(&self) -> u32 {
        self.inner.doc_id()
    }

    fn next(&mut self) -> Result<bool> {
        self.inner.next()
    }

    fn skip_to(&mut self, target: u32) -> Result<bool> {
        self.inner.skip_to(target)
    }

    fn score(&mut self, tags: &mut dyn TagSink) -> Result<f32> {
        if let Annotation::Tag(tag) = &self.annotation {
            tags.append_tag(tag);
        }
        self.inner.score(tags)
    }

    fn freq(&self) -> u32 {
        self.inner.freq()
    }

    fn cost(&self) -> u64 {
        self.inner.cost()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::reader::MemoryIndex;
    use crate::index::segment::SegmentBuilder;
    use crate::query::annotation::{DiscardTags, TagBuffer};
    use crate::query::boolean::BooleanQueryBuilder;
    use crate::query::query::rewrite_fully;
    use crate::query::term::TermQuery;

    fn abc_index() -> Arc<MemoryIndex> {
        let mut builder = SegmentBuilder::new();
        builder.add_document(&[("field", "a b")]);
        builder.add_document(&[("field", "a c d")]);
        builder.add_document(&[("field", "a c")]);
        Arc::new(MemoryIndex::new(vec![builder.build()]))
    }

    fn term(text: &str) -> Arc<dyn Query> {
        Arc::new(TermQuery::new("field", text))
    }

    #[test]
    fn test_rewrite_identity_law() {
        let index = abc_index();
        // A term query rewrites to itself, so the wrapper must too.
        let query: Arc<dyn Query> = Arc::new(AnnotatedQuery::mask(term("a"), 2));

        let rewritten = Arc::clone(&query).rewrite(index.as_ref()).unwrap();
        assert!(Arc::ptr_eq(&rewritten, &query));
    }

    #[test]
    fn test_rewrite_propagation_law() {
        let index = abc_index();
        // A single-SHOULD boolean collapses under rewrite, so the wrapper
        // must produce a fresh AnnotatedQuery around the collapsed inner.
        let inner = term("a");
        let boolean: Arc<dyn Query> = Arc::new(
            BooleanQueryBuilder::new().should(Arc::clone(&inner)).build(),
        );
        let query: Arc<dyn Query> =
            Arc::new(AnnotatedQuery::new(boolean, Annotation::tag("why")));

        let rewritten = rewrite_fully(Arc::clone(&query), index.as_ref()).unwrap();
        assert!(!Arc::ptr_eq(&rewritten, &query));

        let annotated = rewritten
            .as_any()
            .downcast_ref::<AnnotatedQuery>()
            .unwrap();
        assert_eq!(annotated.annotation(), &Annotation::tag("why"));
        assert!(Arc::ptr_eq(annotated.inner(), &inner));
    }

    #[test]
    fn test_equality_law() {
        let a: Arc<dyn Query> = Arc::new(AnnotatedQuery::mask(term("a"), 2));
        let b: Arc<dyn Query> = Arc::new(AnnotatedQuery::mask(term("a"), 2));
        let different_mask: Arc<dyn Query> = Arc::new(AnnotatedQuery::mask(term("a"), 4));
        let different_inner: Arc<dyn Query> = Arc::new(AnnotatedQuery::mask(term("c"), 2));
        let different_variant: Arc<dyn Query> =
            Arc::new(AnnotatedQuery::tag(term("a"), "2"));

        assert!(a.query_eq(b.as_ref()));
        assert_eq!(a.hash_code(), b.hash_code());
        assert!(!a.query_eq(different_mask.as_ref()));
        assert!(!a.query_eq(different_inner.as_ref()));
        assert!(!a.query_eq(different_variant.as_ref()));
        assert!(!a.query_eq(term("a").as_ref()));
    }

    #[test]
    fn test_extract_terms_delegates() {
        let query = AnnotatedQuery::tag(term("a"), "why");
        let mut terms = HashSet::new();
        query.extract_terms(&mut terms);

        assert_eq!(terms.len(), 1);
        assert!(terms.contains(&Term::new("field", "a")));
    }

    #[test]
    fn test_description_renders_annotation_syntax() {
        let query = AnnotatedQuery::mask(term("a"), 4);
        assert_eq!(query.description(), "{mask m=4}field:a");

        let query = AnnotatedQuery::tag(term("a"), "why");
        assert_eq!(query.description(), "{tag t=why}field:a");
    }

    #[test]
    fn test_absence_propagates() {
        let index = abc_index();
        let searcher = IndexSearcher::new(Arc::clone(&index));
        let query = AnnotatedQuery::tag(term("zzz"), "why");
        let weight = query.create_weight(&searcher).unwrap();

        let leaf = index.leaves().next().unwrap();
        assert!(weight.scorer(&leaf).unwrap().is_none());
        assert!(!weight.scores_out_of_order());
    }

    #[test]
    fn test_mask_scorer_is_score_transparent() {
        let index = abc_index();
        let searcher = IndexSearcher::new(Arc::clone(&index));
        let leaf = index.leaves().next().unwrap();

        let plain = term("c");
        let masked = AnnotatedQuery::mask(Arc::clone(&plain), 8);

        let mut plain_scorer = plain
            .create_weight(&searcher)
            .unwrap()
            .scorer(&leaf)
            .unwrap()
            .unwrap();
        let mut masked_scorer = masked
            .create_weight(&searcher)
            .unwrap()
            .scorer(&leaf)
            .unwrap()
            .unwrap();

        let mut buffer = TagBuffer::new();
        while !plain_scorer.is_exhausted() {
            assert_eq!(masked_scorer.doc_id(), plain_scorer.doc_id());
            let expected = plain_scorer.score(&mut DiscardTags).unwrap();
            let actual = masked_scorer.score(&mut buffer).unwrap();
            assert_eq!(actual, expected);
            plain_scorer.next().unwrap();
            masked_scorer.next().unwrap();
        }
        assert!(masked_scorer.is_exhausted());
        // Bitmask annotations never emit tags.
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_bitmask_accessor() {
        let index = abc_index();
        let searcher = IndexSearcher::new(Arc::clone(&index));
        let leaf = index.leaves().next().unwrap();

        let weight = AnnotatedQuery::mask(term("a"), 6)
            .create_weight(&searcher)
            .unwrap();
        let inner_scorer = weight.scorer(&leaf).unwrap().unwrap();

        let scorer = AnnotatedScorer::new(inner_scorer, Annotation::mask(6));
        assert_eq!(scorer.bitmask(), Some(6));

        let tagged = AnnotatedScorer::new(
            Box::new(scorer),
            Annotation::tag("why"),
        );
        assert_eq!(tagged.bitmask(), None);
    }

    #[test]
    fn test_tag_reported_on_score() {
        let index = abc_index();
        let searcher = IndexSearcher::new(Arc::clone(&index));
        let leaf = index.leaves().next().unwrap();

        let query = AnnotatedQuery::tag(term("c"), "why");
        let weight = query.create_weight(&searcher).unwrap();
        let mut scorer = weight.scorer(&leaf).unwrap().unwrap();

        let mut buffer = TagBuffer::new();
        assert_eq!(scorer.doc_id(), 1);
        let score = scorer.score(&mut buffer).unwrap();
        assert!(score > 0.0);
        assert_eq!(buffer.tags(), &["why"]);

        // The tag is reported once per score call, not once per scorer.
        buffer.clear();
        scorer.next().unwrap();
        scorer.score(&mut buffer).unwrap();
        assert_eq!(buffer.tags(), &["why"]);
    }

    #[test]
    fn test_nested_annotations_accumulate_in_order() {
        let index = abc_index();
        let searcher = IndexSearcher::new(Arc::clone(&index));
        let leaf = index.leaves().next().unwrap();

        let inner: Arc<dyn Query> = Arc::new(AnnotatedQuery::tag(term("c"), "inner"));
        let outer = AnnotatedQuery::tag(inner, "outer");
        let weight = outer.create_weight(&searcher).unwrap();
        let mut scorer = weight.scorer(&leaf).unwrap().unwrap();

        let mut buffer = TagBuffer::new();
        scorer.score(&mut buffer).unwrap();
        assert_eq!(buffer.tags(), &["outer", "inner"]);
    }
}
