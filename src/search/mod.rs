//! Search execution over an index.

pub mod parallel;
pub mod searcher;

pub use self::parallel::merge_shard_results;
pub use self::searcher::{IndexSearcher, TermStatistics};
