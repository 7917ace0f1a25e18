//! Boolean query implementation for combining multiple queries.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::Arc;

use crate::error::Result;
use crate::index::reader::{IndexReader, LeafContext};
use crate::query::annotation::TagSink;
use crate::query::query::{Query, Term};
use crate::query::scorer::{NO_MORE_DOCS, Scorer};
use crate::query::weight::{Explanation, Weight};
use crate::search::searcher::IndexSearcher;

/// Occurrence requirements for boolean clauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Occur {
    /// The clause must match (equivalent to AND).
    Must,
    /// The clause should match (equivalent to OR).
    Should,
    /// The clause must not match (equivalent to NOT).
    MustNot,
}

/// A clause in a boolean query.
#[derive(Debug, Clone)]
pub struct BooleanClause {
    /// The query for this clause.
    pub query: Arc<dyn Query>,
    /// The occurrence requirement.
    pub occur: Occur,
}

impl BooleanClause {
    /// Create a new boolean clause.
    pub fn new(query: Arc<dyn Query>, occur: Occur) -> Self {
        BooleanClause { query, occur }
    }

    /// Create a MUST clause.
    pub fn must(query: Arc<dyn Query>) -> Self {
        BooleanClause::new(query, Occur::Must)
    }

    /// Create a SHOULD clause.
    pub fn should(query: Arc<dyn Query>) -> Self {
        BooleanClause::new(query, Occur::Should)
    }

    /// Create a MUST_NOT clause.
    pub fn must_not(query: Arc<dyn Query>) -> Self {
        BooleanClause::new(query, Occur::MustNot)
    }
}

/// A boolean query that combines multiple queries with boolean logic.
///
/// A query with only MUST_NOT clauses, or no clauses at all, matches
/// nothing.
#[derive(Debug, Clone)]
pub struct BooleanQuery {
    clauses: Vec<BooleanClause>,
    boost: f32,
}

impl BooleanQuery {
    /// Create a new empty boolean query.
    pub fn new() -> Self {
        BooleanQuery {
            clauses: Vec::new(),
            boost: 1.0,
        }
    }

    /// Add a clause to this boolean query.
    pub fn add_clause(&mut self, clause: BooleanClause) {
        self.clauses.push(clause);
    }

    /// Add a MUST clause.
    pub fn add_must(&mut self, query: Arc<dyn Query>) {
        self.add_clause(BooleanClause::must(query));
    }

    /// Add a SHOULD clause.
    pub fn add_should(&mut self, query: Arc<dyn Query>) {
        self.add_clause(BooleanClause::should(query));
    }

    /// Add a MUST_NOT clause.
    pub fn add_must_not(&mut self, query: Arc<dyn Query>) {
        self.add_clause(BooleanClause::must_not(query));
    }

    /// Set the boost factor.
    pub fn with_boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }

    /// Get the clauses.
    pub fn clauses(&self) -> &[BooleanClause] {
        &self.clauses
    }

    /// Get the boost factor.
    pub fn boost(&self) -> f32 {
        self.boost
    }

    /// Check if this query has no clauses.
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }
}

impl Default for BooleanQuery {
    fn default() -> Self {
        Self::new()
    }
}

impl Query for BooleanQuery {
    fn rewrite(self: Arc<Self>, reader: &dyn IndexReader) -> Result<Arc<dyn Query>> {
        // A single non-prohibited clause with a neutral boost collapses to
        // its sub-query.
        if self.clauses.len() == 1
            && self.boost == 1.0
            && self.clauses[0].occur != Occur::MustNot
        {
            return Arc::clone(&self.clauses[0].query).rewrite(reader);
        }

        let mut changed = false;
        let mut clauses = Vec::with_capacity(self.clauses.len());
        for clause in &self.clauses {
            let rewritten = Arc::clone(&clause.query).rewrite(reader)?;
            if !Arc::ptr_eq(&rewritten, &clause.query) {
                changed = true;
            }
            clauses.push(BooleanClause {
                query: rewritten,
                occur: clause.occur,
            });
        }

        if changed {
            Ok(Arc::new(BooleanQuery {
                clauses,
                boost: self.boost,
            }))
        } else {
            Ok(self)
        }
    }

    fn extract_terms(&self, terms: &mut HashSet<Term>) {
        for clause in &self.clauses {
            if clause.occur != Occur::MustNot {
                clause.query.extract_terms(terms);
            }
        }
    }

    fn create_weight(&self, searcher: &IndexSearcher) -> Result<Box<dyn Weight>> {
        let mut weights = Vec::with_capacity(self.clauses.len());
        for clause in &self.clauses {
            weights.push((clause.occur, clause.query.create_weight(searcher)?));
        }
        Ok(Box::new(BooleanWeight {
            weights,
            boost: self.boost,
        }))
    }

    fn description(&self) -> String {
        if self.clauses.is_empty() {
            return "()".to_string();
        }

        let mut parts = Vec::new();
        for clause in &self.clauses {
            let clause_desc = match clause.occur {
                Occur::Must => format!("+{}", clause.query.description()),
                Occur::Should => clause.query.description(),
                Occur::MustNot => format!("-{}", clause.query.description()),
            };
            parts.push(clause_desc);
        }

        let result = format!("({})", parts.join(" "));
        if self.boost == 1.0 {
            result
        } else {
            format!("{}^{}", result, self.boost)
        }
    }

    fn query_eq(&self, other: &dyn Query) -> bool {
        let Some(other) = other.as_any().downcast_ref::<BooleanQuery>() else {
            return false;
        };
        self.boost == other.boost
            && self.clauses.len() == other.clauses.len()
            && self
                .clauses
                .iter()
                .zip(other.clauses.iter())
                .all(|(a, b)| a.occur == b.occur && a.query.query_eq(b.query.as_ref()))
    }

    fn hash_code(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        "boolean".hash(&mut hasher);
        self.boost.to_bits().hash(&mut hasher);
        for clause in &self.clauses {
            clause.occur.hash(&mut hasher);
            clause.query.hash_code().hash(&mut hasher);
        }
        hasher.finish()
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

/// Weight for a [`BooleanQuery`], holding one weight per clause.
#[derive(Debug)]
pub struct BooleanWeight {
    weights: Vec<(Occur, Box<dyn Weight>)>,
    boost: f32,
}

impl Weight for BooleanWeight {
    fn value_for_normalization(&self) -> f32 {
        let sum: f32 = self
            .weights
            .iter()
            .filter(|(occur, _)| *occur != Occur::MustNot)
            .map(|(_, weight)| weight.value_for_normalization())
            .sum();
        sum * self.boost * self.boost
    }

    fn normalize(&mut self, norm: f32, top_level_boost: f32) {
        let boost = top_level_boost * self.boost;
        for (_, weight) in &mut self.weights {
            weight.normalize(norm, boost);
        }
    }

    fn scorer(&self, leaf: &LeafContext<'_>) -> Result<Option<Box<dyn Scorer>>> {
        let mut required = Vec::new();
        let mut optional = Vec::new();
        let mut prohibited = Vec::new();

        for (occur, weight) in &self.weights {
            let scorer = weight.scorer(leaf)?;
            match occur {
                Occur::Must => match scorer {
                    // A required clause without matches empties the whole
                    // conjunction for this segment.
                    None => return Ok(None),
                    Some(scorer) => required.push(scorer),
                },
                Occur::Should => {
                    if let Some(scorer) = scorer {
                        optional.push(scorer);
                    }
                }
                Occur::MustNot => {
                    if let Some(scorer) = scorer {
                        prohibited.push(scorer);
                    }
                }
            }
        }

        let positive: Box<dyn Scorer> = match (required.is_empty(), optional.is_empty()) {
            (true, true) => return Ok(None),
            (false, true) => combine_conjunction(required),
            (false, false) => Box::new(ReqOptScorer::new(
                combine_conjunction(required),
                combine_disjunction(optional),
            )),
            (true, false) => combine_disjunction(optional),
        };

        if prohibited.is_empty() {
            Ok(Some(positive))
        } else {
            Ok(Some(Box::new(ExclusionScorer::new(positive, prohibited))))
        }
    }

    fn explain(&self, leaf: &LeafContext<'_>, doc: u32) -> Result<Explanation> {
        let mut details = Vec::new();
        let mut total = 0.0;
        let mut missing_required = false;
        let mut prohibited_hit = false;

        for (occur, weight) in &self.weights {
            let sub = weight.explain(leaf, doc)?;
            match occur {
                Occur::MustNot => {
                    if sub.matched {
                        prohibited_hit = true;
                    }
                }
                Occur::Must => {
                    if sub.matched {
                        total += sub.value;
                        details.push(sub);
                    } else {
                        missing_required = true;
                    }
                }
                Occur::Should => {
                    if sub.matched {
                        total += sub.value;
                        details.push(sub);
                    }
                }
            }
        }

        if prohibited_hit {
            return Ok(Explanation::no_match("match prohibited by MUST_NOT clause"));
        }
        if missing_required {
            return Ok(Explanation::no_match("missing required clause"));
        }
        if details.is_empty() {
            return Ok(Explanation::no_match("no matching clause"));
        }
        Ok(Explanation::matched(total, "sum of:").with_details(details))
    }
}

fn combine_conjunction(mut scorers: Vec<Box<dyn Scorer>>) -> Box<dyn Scorer> {
    if scorers.len() == 1 {
        scorers.swap_remove(0)
    } else {
        Box::new(ConjunctionScorer::new(scorers))
    }
}

fn combine_disjunction(mut scorers: Vec<Box<dyn Scorer>>) -> Box<dyn Scorer> {
    if scorers.len() == 1 {
        scorers.swap_remove(0)
    } else {
        Box::new(DisjunctionScorer::new(scorers))
    }
}

/// A scorer matching documents that match all sub-scorers.
///
/// The score of a document is the sum over all clauses; every clause is
/// scored for every collected document, so annotation tags from required
/// clauses are always complete.
#[derive(Debug)]
pub struct ConjunctionScorer {
    scorers: Vec<Box<dyn Scorer>>,
    current_doc: u32,
    exhausted: bool,
    cost: u64,
}

impl ConjunctionScorer {
    /// Create a new conjunction scorer from multiple scorers.
    pub fn new(scorers: Vec<Box<dyn Scorer>>) -> Self {
        if scorers.is_empty() {
            return ConjunctionScorer {
                scorers: vec![],
                current_doc: NO_MORE_DOCS,
                exhausted: true,
                cost: 0,
            };
        }

        let cost = scorers.iter().map(|s| s.cost()).sum();
        let mut scorer = ConjunctionScorer {
            scorers,
            current_doc: 0,
            exhausted: false,
            cost,
        };

        // Advance to the first aligned document.
        match scorer.advance_to_alignment() {
            Ok(true) => {}
            _ => {
                scorer.exhausted = true;
                scorer.current_doc = NO_MORE_DOCS;
            }
        }

        scorer
    }

    /// Advance all scorers until they agree on one document.
    fn advance_to_alignment(&mut self) -> Result<bool> {
        loop {
            let mut max_doc = 0;
            for scorer in &self.scorers {
                let doc_id = scorer.doc_id();
                if doc_id == NO_MORE_DOCS {
                    self.exhausted = true;
                    self.current_doc = NO_MORE_DOCS;
                    return Ok(false);
                }
                if doc_id > max_doc {
                    max_doc = doc_id;
                }
            }

            let mut all_aligned = true;
            for scorer in &mut self.scorers {
                if scorer.doc_id() < max_doc {
                    if !scorer.skip_to(max_doc)? {
                        self.exhausted = true;
                        self.current_doc = NO_MORE_DOCS;
                        return Ok(false);
                    }
                    if scorer.doc_id() != max_doc {
                        all_aligned = false;
                    }
                }
            }

            if all_aligned {
                self.current_doc = max_doc;
                return Ok(true);
            }
        }
    }
}

impl Scorer for ConjunctionScorer {
    fn doc_id(&self) -> u32 {
        self.current_doc
    }

    fn next(&mut self) -> Result<bool> {
        if self.exhausted {
            return Ok(false);
        }
        if !self.scorers[0].next()? {
            self.exhausted = true;
            self.current_doc = NO_MORE_DOCS;
            return Ok(false);
        }
        self.advance_to_alignment()
    }

    fn skip_to(&mut self, target: u32) -> Result<bool> {
        if self.exhausted {
            return Ok(false);
        }
        if target <= self.current_doc {
            return Ok(true);
        }
        for scorer in &mut self.scorers {
            if !scorer.skip_to(target)? {
                self.exhausted = true;
                self.current_doc = NO_MORE_DOCS;
                return Ok(false);
            }
        }
        self.advance_to_alignment()
    }

    fn score(&mut self, tags: &mut dyn TagSink) -> Result<f32> {
        let mut total = 0.0;
        for scorer in &mut self.scorers {
            total += scorer.score(tags)?;
        }
        Ok(total)
    }

    fn freq(&self) -> u32 {
        self.scorers.len() as u32
    }

    fn cost(&self) -> u64 {
        self.cost
    }
}

/// A helper struct for tracking scorers in the disjunction heap.
#[derive(Debug)]
struct ScorerEntry {
    scorer: Box<dyn Scorer>,
}

impl PartialEq for ScorerEntry {
    fn eq(&self, other: &Self) -> bool {
        self.scorer.doc_id() == other.scorer.doc_id()
    }
}

impl Eq for ScorerEntry {}

impl PartialOrd for ScorerEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScorerEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap: lower doc IDs come first
        other.scorer.doc_id().cmp(&self.scorer.doc_id())
    }
}

/// A scorer matching documents that match at least one sub-scorer.
///
/// The score of a document is the sum over the sub-scorers positioned on
/// it; only those branches are scored, so annotation tags reflect exactly
/// the matching sub-queries.
#[derive(Debug)]
pub struct DisjunctionScorer {
    /// Min-heap of active scorers, ordered by current doc_id.
    heap: BinaryHeap<ScorerEntry>,
    current_doc: u32,
    exhausted: bool,
    cost: u64,
}

impl DisjunctionScorer {
    /// Create a new disjunction scorer from multiple scorers.
    pub fn new(scorers: Vec<Box<dyn Scorer>>) -> Self {
        let mut heap = BinaryHeap::new();
        let mut cost = 0;

        for scorer in scorers {
            if !scorer.is_exhausted() {
                cost += scorer.cost();
                heap.push(ScorerEntry { scorer });
            }
        }

        let current_doc = heap
            .peek()
            .map(|entry| entry.scorer.doc_id())
            .unwrap_or(NO_MORE_DOCS);
        let exhausted = heap.is_empty();

        DisjunctionScorer {
            heap,
            current_doc,
            exhausted,
            cost,
        }
    }

    /// Pop every scorer positioned on the current document.
    fn pop_matching(&mut self) -> Vec<ScorerEntry> {
        let mut matching = Vec::new();
        while let Some(entry) = self.heap.pop() {
            if entry.scorer.doc_id() == self.current_doc {
                matching.push(entry);
            } else {
                self.heap.push(entry);
                break;
            }
        }
        matching
    }

    fn update_current(&mut self) {
        if let Some(entry) = self.heap.peek() {
            self.current_doc = entry.scorer.doc_id();
            self.exhausted = false;
        } else {
            self.current_doc = NO_MORE_DOCS;
            self.exhausted = true;
        }
    }
}

impl Scorer for DisjunctionScorer {
    fn doc_id(&self) -> u32 {
        self.current_doc
    }

    fn next(&mut self) -> Result<bool> {
        if self.exhausted {
            return Ok(false);
        }

        // Advance every scorer positioned on the current document.
        let matching = self.pop_matching();
        for mut entry in matching {
            if entry.scorer.next()? {
                self.heap.push(entry);
            }
        }
        self.update_current();
        Ok(!self.exhausted)
    }

    fn skip_to(&mut self, target: u32) -> Result<bool> {
        if self.exhausted || target <= self.current_doc {
            return Ok(!self.exhausted);
        }

        let mut survivors = Vec::new();
        while let Some(mut entry) = self.heap.pop() {
            if entry.scorer.skip_to(target)? {
                survivors.push(entry);
            }
        }
        for entry in survivors {
            self.heap.push(entry);
        }
        self.update_current();
        Ok(!self.exhausted)
    }

    fn score(&mut self, tags: &mut dyn TagSink) -> Result<f32> {
        let mut matching = self.pop_matching();
        let mut total = 0.0;
        for entry in &mut matching {
            total += entry.scorer.score(tags)?;
        }
        for entry in matching {
            self.heap.push(entry);
        }
        Ok(total)
    }

    fn freq(&self) -> u32 {
        self.heap
            .iter()
            .filter(|entry| entry.scorer.doc_id() == self.current_doc)
            .count() as u32
    }

    fn cost(&self) -> u64 {
        self.cost
    }
}

/// A scorer driven by a required clause, with an optional clause adding to
/// the score when it matches the same document.
#[derive(Debug)]
pub struct ReqOptScorer {
    required: Box<dyn Scorer>,
    optional: Box<dyn Scorer>,
}

impl ReqOptScorer {
    /// Create a new required/optional scorer.
    pub fn new(required: Box<dyn Scorer>, optional: Box<dyn Scorer>) -> Self {
        ReqOptScorer { required, optional }
    }

    fn optional_matches(&mut self) -> Result<bool> {
        let doc = self.required.doc_id();
        if self.optional.is_exhausted() {
            return Ok(false);
        }
        if self.optional.doc_id() < doc {
            self.optional.skip_to(doc)?;
        }
        Ok(self.optional.doc_id() == doc)
    }
}

impl Scorer for ReqOptScorer {
    fn doc_id(&self) -> u32 {
        self.required.doc_id()
    }

    fn next(&mut self) -> Result<bool> {
        self.required.next()
    }

    fn skip_to(&mut self, target: u32) -> Result<bool> {
        self.required.skip_to(target)
    }

    fn score(&mut self, tags: &mut dyn TagSink) -> Result<f32> {
        let mut total = self.required.score(tags)?;
        if self.optional_matches()? {
            total += self.optional.score(tags)?;
        }
        Ok(total)
    }

    fn freq(&self) -> u32 {
        self.required.freq()
    }

    fn cost(&self) -> u64 {
        self.required.cost()
    }
}

/// A scorer matching documents of a positive scorer that are not matched
/// by any prohibited scorer.
///
/// Prohibited scorers are never scored, so their annotations never reach
/// the sink.
#[derive(Debug)]
pub struct ExclusionScorer {
    positive: Box<dyn Scorer>,
    negatives: Vec<Box<dyn Scorer>>,
    current_doc: u32,
    exhausted: bool,
}

impl ExclusionScorer {
    /// Create a new exclusion scorer.
    pub fn new(positive: Box<dyn Scorer>, negatives: Vec<Box<dyn Scorer>>) -> Self {
        let mut scorer = ExclusionScorer {
            positive,
            negatives,
            current_doc: 0,
            exhausted: false,
        };

        match scorer.advance_to_next_valid() {
            Ok(true) => {}
            _ => {
                scorer.exhausted = true;
                scorer.current_doc = NO_MORE_DOCS;
            }
        }

        scorer
    }

    /// Check if a document is matched by any prohibited scorer.
    fn is_excluded(&mut self, doc_id: u32) -> Result<bool> {
        for negative in &mut self.negatives {
            if negative.doc_id() < doc_id {
                negative.skip_to(doc_id)?;
            }
            if negative.doc_id() == doc_id {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Advance to the next positive document that is not excluded.
    fn advance_to_next_valid(&mut self) -> Result<bool> {
        loop {
            if self.positive.is_exhausted() {
                self.exhausted = true;
                self.current_doc = NO_MORE_DOCS;
                return Ok(false);
            }
            let doc_id = self.positive.doc_id();
            if !self.is_excluded(doc_id)? {
                self.current_doc = doc_id;
                return Ok(true);
            }
            if !self.positive.next()? {
                self.exhausted = true;
                self.current_doc = NO_MORE_DOCS;
                return Ok(false);
            }
        }
    }
}

impl Scorer for ExclusionScorer {
    fn doc_id(&self) -> u32 {
        self.current_doc
    }

    fn next(&mut self) -> Result<bool> {
        if self.exhausted {
            return Ok(false);
        }
        if !self.positive.next()? {
            self.exhausted = true;
            self.current_doc = NO_MORE_DOCS;
            return Ok(false);
        }
        self.advance_to_next_valid()
    }

    fn skip_to(&mut self, target: u32) -> Result<bool> {
        if self.exhausted {
            return Ok(false);
        }
        if target <= self.current_doc {
            return Ok(true);
        }
        if !self.positive.skip_to(target)? {
            self.exhausted = true;
            self.current_doc = NO_MORE_DOCS;
            return Ok(false);
        }
        self.advance_to_next_valid()
    }

    fn score(&mut self, tags: &mut dyn TagSink) -> Result<f32> {
        self.positive.score(tags)
    }

    fn freq(&self) -> u32 {
        self.positive.freq()
    }

    fn cost(&self) -> u64 {
        self.positive.cost()
    }
}

/// Builder for creating boolean queries.
#[derive(Debug, Default)]
pub struct BooleanQueryBuilder {
    query: BooleanQuery,
}

impl BooleanQueryBuilder {
    /// Create a new boolean query builder.
    pub fn new() -> Self {
        BooleanQueryBuilder {
            query: BooleanQuery::new(),
        }
    }

    /// Add a MUST clause.
    pub fn must(mut self, query: Arc<dyn Query>) -> Self {
        self.query.add_must(query);
        self
    }

    /// Add a SHOULD clause.
    pub fn should(mut self, query: Arc<dyn Query>) -> Self {
        self.query.add_should(query);
        self
    }

    /// Add a MUST_NOT clause.
    pub fn must_not(mut self, query: Arc<dyn Query>) -> Self {
        self.query.add_must_not(query);
        self
    }

    /// Set the boost factor.
    pub fn boost(mut self, boost: f32) -> Self {
        self.query = self.query.with_boost(boost);
        self
    }

    /// Build the boolean query.
    pub fn build(self) -> BooleanQuery {
        self.query
    }
}
