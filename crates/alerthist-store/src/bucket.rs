use alerthist_error::{HistoryError, Result};
use alerthist_types::{Occurrence, SignatureKey, Timestamp};

use crate::merge::InsertionPolicy;

/// Aggregate record for one signature.
///
/// The occurrence count is the length of `timestamps`; it is never stored
/// separately, so it cannot drift from the sequence it describes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryBucket {
    key: SignatureKey,
    timestamps: Vec<Timestamp>,
}

impl HistoryBucket {
    /// Bucket holding a single occurrence.
    #[must_use]
    pub fn new(key: SignatureKey, timestamp: Timestamp) -> Self {
        Self {
            key,
            timestamps: vec![timestamp],
        }
    }

    /// Bucket adopting an already ordered timestamp sequence.
    ///
    /// # Errors
    /// `Malformed` if `timestamps` is empty, `CountOverflow` if it is longer
    /// than the on-disk `u32` count can express.
    pub fn from_timestamps(key: SignatureKey, timestamps: Vec<Timestamp>) -> Result<Self> {
        if timestamps.is_empty() {
            return Err(HistoryError::malformed(format!(
                "bucket for signature {key} has no occurrences"
            )));
        }
        if u32::try_from(timestamps.len()).is_err() {
            return Err(HistoryError::CountOverflow {
                key: key.to_string(),
            });
        }
        Ok(Self { key, timestamps })
    }

    #[must_use]
    pub const fn key(&self) -> SignatureKey {
        self.key
    }

    /// Number of occurrences recorded for this signature.
    #[must_use]
    pub fn total_count(&self) -> u32 {
        // Bounded by `insert` and `from_timestamps`.
        u32::try_from(self.timestamps.len()).unwrap_or(u32::MAX)
    }

    /// Timestamps in stored order.
    #[must_use]
    pub fn timestamps(&self) -> &[Timestamp] {
        &self.timestamps
    }

    /// The head occurrence's timestamp.
    #[must_use]
    pub fn first_timestamp(&self) -> Timestamp {
        self.timestamps[0]
    }

    #[must_use]
    pub fn last_timestamp(&self) -> Timestamp {
        self.timestamps[self.timestamps.len() - 1]
    }

    /// Occurrences in stored order.
    pub fn occurrences(&self) -> impl ExactSizeIterator<Item = Occurrence> + '_ {
        self.timestamps
            .iter()
            .map(move |&timestamp| Occurrence::new(self.key, timestamp))
    }

    /// Insert one timestamp before the first stored timestamp strictly greater
    /// than it, or at the tail if there is none. Under
    /// [`InsertionPolicy::Legacy`] the head is skipped by the scan.
    ///
    /// Returns the index the timestamp landed at.
    pub(crate) fn insert(&mut self, timestamp: Timestamp, policy: InsertionPolicy) -> Result<usize> {
        if self.timestamps.len() >= u32::MAX as usize {
            return Err(HistoryError::CountOverflow {
                key: self.key.to_string(),
            });
        }
        let scan_from = match policy {
            InsertionPolicy::Legacy => 1,
            InsertionPolicy::Chronological => 0,
        };
        let position = self.timestamps[scan_from..]
            .iter()
            .position(|&existing| existing > timestamp)
            .map_or(self.timestamps.len(), |offset| scan_from + offset);
        self.timestamps.insert(position, timestamp);
        Ok(position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: SignatureKey = SignatureKey::new(1, 1, 1);

    fn bucket(timestamps: &[Timestamp]) -> HistoryBucket {
        HistoryBucket::from_timestamps(KEY, timestamps.to_vec()).expect("non-empty bucket")
    }

    #[test]
    fn test_insert_between() {
        for policy in [InsertionPolicy::Legacy, InsertionPolicy::Chronological] {
            let mut b = bucket(&[100, 300]);
            assert_eq!(b.insert(200, policy).expect("insert"), 1);
            assert_eq!(b.timestamps(), &[100, 200, 300]);
            assert_eq!(b.total_count(), 3);
        }
    }

    #[test]
    fn test_insert_before_head_legacy_keeps_head() {
        let mut b = bucket(&[100, 300]);
        b.insert(50, InsertionPolicy::Legacy).expect("insert");
        assert_eq!(b.timestamps(), &[100, 50, 300]);
    }

    #[test]
    fn test_insert_before_head_chronological() {
        let mut b = bucket(&[100, 300]);
        assert_eq!(b.insert(50, InsertionPolicy::Chronological).expect("insert"), 0);
        assert_eq!(b.timestamps(), &[50, 100, 300]);
    }

    #[test]
    fn test_insert_single_element_bucket() {
        let mut legacy = bucket(&[10]);
        legacy.insert(5, InsertionPolicy::Legacy).expect("insert");
        assert_eq!(legacy.timestamps(), &[10, 5]);

        let mut chrono = bucket(&[10]);
        chrono.insert(5, InsertionPolicy::Chronological).expect("insert");
        assert_eq!(chrono.timestamps(), &[5, 10]);
    }

    #[test]
    fn test_equal_timestamps_append_after() {
        for policy in [InsertionPolicy::Legacy, InsertionPolicy::Chronological] {
            let mut b = bucket(&[100, 200]);
            assert_eq!(b.insert(200, policy).expect("insert"), 2);
            assert_eq!(b.insert(100, policy).expect("insert"), 1);
            assert_eq!(b.timestamps(), &[100, 100, 200, 200]);
        }
    }

    #[test]
    fn test_equal_to_head_lands_after_head() {
        let mut b = bucket(&[100, 300]);
        assert_eq!(b.insert(100, InsertionPolicy::Chronological).expect("insert"), 1);
        assert_eq!(b.timestamps(), &[100, 100, 300]);
    }

    #[test]
    fn test_insert_at_tail() {
        let mut b = bucket(&[1, 2, 3]);
        assert_eq!(b.insert(4, InsertionPolicy::Legacy).expect("insert"), 3);
        assert_eq!(b.last_timestamp(), 4);
        assert_eq!(b.first_timestamp(), 1);
    }

    #[test]
    fn test_empty_bucket_rejected() {
        let err = HistoryBucket::from_timestamps(KEY, Vec::new()).expect_err("empty bucket");
        assert!(matches!(err, HistoryError::Malformed { .. }));
    }

    #[test]
    fn test_occurrences_carry_bucket_key() {
        let b = bucket(&[7, 8]);
        let occs: Vec<Occurrence> = b.occurrences().collect();
        assert_eq!(occs, vec![Occurrence::new(KEY, 7), Occurrence::new(KEY, 8)]);
    }
}
