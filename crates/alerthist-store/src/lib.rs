//! Alert history store: one bucket of chronologically ordered occurrences per
//! signature, plus the merge that folds new occurrences into it.

pub mod bucket;
pub mod merge;
pub mod store;

pub use bucket::HistoryBucket;
pub use merge::{InsertionPolicy, MergeSummary};
pub use store::HistoryStore;
