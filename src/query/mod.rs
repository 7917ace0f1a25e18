//! Query system: query trees, annotation decoration, weights, scorers,
//! and collectors.

pub mod annotated;
pub mod annotation;
pub mod boolean;
pub mod collector;
#[allow(clippy::module_inception)]
pub mod query;
pub mod scorer;
pub mod term;
pub mod weight;

pub use self::annotated::{AnnotatedQuery, AnnotatedScorer, AnnotatedWeight};
pub use self::annotation::{
    Annotation, DiscardTags, MAX_TAG_BITS, TagBitAllocator, TagBuffer, TagSink,
};
pub use self::boolean::{
    BooleanClause, BooleanQuery, BooleanQueryBuilder, BooleanWeight, Occur,
};
pub use self::collector::{
    Collector, CountCollector, SearchResults, TaggedHit, TaggedTopDocsCollector,
};
pub use self::query::{Query, Term, rewrite_fully};
pub use self::scorer::{Bm25Similarity, NO_MORE_DOCS, Scorer};
pub use self::term::TermQuery;
pub use self::weight::{Explanation, Weight};
