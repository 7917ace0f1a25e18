//! Minimal in-memory segmented index used to execute queries.
//!
//! Documents are numbered locally within a segment and rebased to a global
//! id via the segment's doc base during collection.

pub mod postings;
pub mod reader;
pub mod segment;

pub use self::postings::{PostingIterator, VecPostingIterator};
pub use self::reader::{IndexReader, LeafContext, MemoryIndex};
pub use self::segment::{FieldStats, SegmentBuilder, SegmentReader, TermStats};
