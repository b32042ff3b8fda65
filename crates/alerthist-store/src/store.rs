use alerthist_error::{HistoryError, Result};
use alerthist_types::{Occurrence, SignatureKey};
use hashbrown::HashMap;
use tracing::{debug, trace};

use crate::bucket::HistoryBucket;
use crate::merge::{InsertionPolicy, MergeSummary};

/// Keyed index of [`HistoryBucket`]s.
///
/// Buckets are kept in first-insertion order, which is also the order they
/// are serialized in; a decoded store therefore re-encodes its buckets in
/// the order the file listed them. `index` maps each key to its position in
/// `buckets`.
#[derive(Debug, Clone, Default)]
pub struct HistoryStore {
    buckets: Vec<HistoryBucket>,
    index: HashMap<SignatureKey, usize>,
}

impl HistoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store with room for `buckets` signatures.
    ///
    /// # Errors
    /// `OutOfMemory` if the reservation fails.
    pub fn try_with_capacity(buckets: usize) -> Result<Self> {
        let mut store = Self::new();
        store
            .buckets
            .try_reserve(buckets)
            .map_err(|_| HistoryError::OutOfMemory)?;
        store
            .index
            .try_reserve(buckets)
            .map_err(|_| HistoryError::OutOfMemory)?;
        Ok(store)
    }

    /// Number of distinct signatures.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Sum of all bucket counts.
    #[must_use]
    pub fn total_occurrences(&self) -> u64 {
        self.buckets
            .iter()
            .map(|bucket| u64::from(bucket.total_count()))
            .sum()
    }

    #[must_use]
    pub fn get(&self, key: &SignatureKey) -> Option<&HistoryBucket> {
        self.index.get(key).map(|&slot| &self.buckets[slot])
    }

    #[must_use]
    pub fn contains_key(&self, key: &SignatureKey) -> bool {
        self.index.contains_key(key)
    }

    /// Buckets in serialization order.
    #[must_use]
    pub fn buckets(&self) -> &[HistoryBucket] {
        &self.buckets
    }

    /// Add a complete bucket for a key not yet present.
    ///
    /// # Errors
    /// `Malformed` if the key already has a bucket.
    pub fn insert_bucket(&mut self, bucket: HistoryBucket) -> Result<()> {
        let key = bucket.key();
        if self.index.contains_key(&key) {
            return Err(HistoryError::malformed(format!(
                "duplicate bucket for signature {key}"
            )));
        }
        self.index.insert(key, self.buckets.len());
        self.buckets.push(bucket);
        Ok(())
    }

    /// Fold `occurrences` into the store, in iteration order.
    ///
    /// An unseen signature gets a new single-occurrence bucket. A known one
    /// has the occurrence inserted chronologically per `policy`. Merging the
    /// same batch twice records every occurrence twice.
    ///
    /// # Errors
    /// `CountOverflow` if a bucket already holds `u32::MAX` occurrences.
    /// Occurrences before the failing one remain merged.
    pub fn merge<I>(&mut self, occurrences: I, policy: InsertionPolicy) -> Result<MergeSummary>
    where
        I: IntoIterator<Item = Occurrence>,
    {
        let mut summary = MergeSummary::default();
        for occurrence in occurrences {
            if self.merge_one(occurrence, policy)? {
                summary.new_buckets += 1;
            }
            summary.merged += 1;
        }
        debug!(
            merged = summary.merged,
            new_buckets = summary.new_buckets,
            buckets = self.buckets.len(),
            ?policy,
            "merged occurrences into alert history"
        );
        Ok(summary)
    }

    /// Returns `true` when a new bucket was created.
    fn merge_one(&mut self, occurrence: Occurrence, policy: InsertionPolicy) -> Result<bool> {
        let Occurrence { key, timestamp } = occurrence;
        if let Some(&slot) = self.index.get(&key) {
            let position = self.buckets[slot].insert(timestamp, policy)?;
            trace!(%key, timestamp, position, "occurrence inserted");
            Ok(false)
        } else {
            self.index.insert(key, self.buckets.len());
            self.buckets.push(HistoryBucket::new(key, timestamp));
            trace!(%key, timestamp, "bucket created");
            Ok(true)
        }
    }

    /// Drop every bucket and its occurrences.
    pub fn release_all(&mut self) {
        let released = self.buckets.len();
        self.buckets.clear();
        self.index.clear();
        debug!(released, "alert history released");
    }
}

impl PartialEq for HistoryStore {
    fn eq(&self, other: &Self) -> bool {
        self.buckets == other.buckets
    }
}

impl Eq for HistoryStore {}
