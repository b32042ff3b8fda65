//! Merge policy and result types.

use serde::{Deserialize, Serialize};

/// Where the chronological scan starts when a signature already has a bucket.
///
/// Both policies place a new occurrence before the first existing occurrence
/// whose timestamp is strictly greater, so equal timestamps keep arrival
/// order. They differ only in whether the head takes part in the comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsertionPolicy {
    /// Never compare against the head: an occurrence older than the head is
    /// placed right after it (`[100, 300] + 50 -> [100, 50, 300]`). Produces
    /// the same sequences as histories written by the legacy preprocessor.
    Legacy,
    /// Compare against every occurrence, head included
    /// (`[100, 300] + 50 -> [50, 100, 300]`).
    #[default]
    Chronological,
}

/// What a merge did to the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeSummary {
    /// Occurrences folded in.
    pub merged: usize,
    /// Buckets created for previously unseen signatures.
    pub new_buckets: usize,
}
