use alerthist_error::{HistoryError, Result};
use alerthist_store::{HistoryBucket, HistoryStore};
use alerthist_types::{ByteOrder, SignatureKey, Timestamp};
use tracing::{debug, warn};

/// Size of the leading bucket count.
pub const BUCKET_COUNT_BYTES: usize = 4;
/// Size of the per-bucket occurrence count.
pub const OCCURRENCE_COUNT_BYTES: usize = 4;
/// Size of one occurrence record: three `i32` key fields and an `i64`.
pub const OCCURRENCE_RECORD_BYTES: usize = 3 * 4 + 8;

/// Smallest possible encoding of one bucket (a single occurrence).
const MIN_BUCKET_BYTES: usize = OCCURRENCE_COUNT_BYTES + OCCURRENCE_RECORD_BYTES;

/// Exact encoded size of `store`.
#[must_use]
pub fn encoded_len(store: &HistoryStore) -> usize {
    BUCKET_COUNT_BYTES
        + store
            .buckets()
            .iter()
            .map(|bucket| OCCURRENCE_COUNT_BYTES + bucket.timestamps().len() * OCCURRENCE_RECORD_BYTES)
            .sum::<usize>()
}

/// Serialize the whole store, buckets in store order.
///
/// # Errors
/// `TooManySignatures` if the store holds more buckets than the `u32` bucket
/// count can describe.
pub fn encode(store: &HistoryStore, order: ByteOrder) -> Result<Vec<u8>> {
    let bucket_count = bucket_count_field(store.len())?;

    let mut bytes = Vec::with_capacity(encoded_len(store));
    bytes.extend_from_slice(&order.u32_to_bytes(bucket_count));
    for bucket in store.buckets() {
        bytes.extend_from_slice(&order.u32_to_bytes(bucket.total_count()));
        let key = bucket.key();
        for &timestamp in bucket.timestamps() {
            append_record(&mut bytes, key, timestamp, order);
        }
    }

    debug!(
        buckets = bucket_count,
        occurrences = store.total_occurrences(),
        bytes = bytes.len(),
        ?order,
        "encoded alert history"
    );
    Ok(bytes)
}

fn bucket_count_field(buckets: usize) -> Result<u32> {
    u32::try_from(buckets).map_err(|_| HistoryError::TooManySignatures { count: buckets })
}

/// Rebuild a store from its encoding.
///
/// Decoding is all-or-nothing. Besides truncation, a bucket that declares
/// zero occurrences, a record whose key differs from its bucket's first
/// record, and a key listed in two buckets are rejected as malformed.
/// Bytes after the last declared bucket are ignored.
///
/// # Errors
/// `Malformed` for any of the conditions above, `OutOfMemory` if the
/// declared sizes cannot be reserved.
pub fn decode(bytes: &[u8], order: ByteOrder) -> Result<HistoryStore> {
    let mut cursor = 0usize;
    let bucket_count = read_u32(bytes, &mut cursor, order, "bucket count")?;
    let bucket_count_usize = usize::try_from(bucket_count)
        .map_err(|_| HistoryError::malformed(format!("bucket count {bucket_count} does not fit in usize")))?;
    ensure_remaining(
        bytes,
        cursor,
        bucket_count_usize,
        MIN_BUCKET_BYTES,
        || format!("{bucket_count} buckets"),
    )?;

    let mut store = HistoryStore::try_with_capacity(bucket_count_usize)?;
    for bucket_index in 0..bucket_count {
        let bucket = decode_bucket(bytes, &mut cursor, order, bucket_index)?;
        store.insert_bucket(bucket)?;
    }

    if cursor < bytes.len() {
        warn!(
            trailing = bytes.len() - cursor,
            consumed = cursor,
            "ignoring bytes after the last declared history bucket"
        );
    }
    debug!(
        buckets = store.len(),
        occurrences = store.total_occurrences(),
        bytes = cursor,
        ?order,
        "decoded alert history"
    );
    Ok(store)
}

fn decode_bucket(
    bytes: &[u8],
    cursor: &mut usize,
    order: ByteOrder,
    bucket_index: u32,
) -> Result<HistoryBucket> {
    let occurrence_count = read_u32(bytes, cursor, order, "occurrence count")?;
    if occurrence_count == 0 {
        return Err(HistoryError::malformed(format!(
            "bucket {bucket_index} declares zero occurrences"
        )));
    }
    let occurrence_count_usize = usize::try_from(occurrence_count).map_err(|_| {
        HistoryError::malformed(format!(
            "occurrence count {occurrence_count} does not fit in usize"
        ))
    })?;
    ensure_remaining(
        bytes,
        *cursor,
        occurrence_count_usize,
        OCCURRENCE_RECORD_BYTES,
        || format!("bucket {bucket_index} with {occurrence_count} occurrences"),
    )?;

    let mut timestamps: Vec<Timestamp> = Vec::new();
    timestamps
        .try_reserve_exact(occurrence_count_usize)
        .map_err(|_| HistoryError::OutOfMemory)?;

    let (bucket_key, first_timestamp) = read_record(bytes, cursor, order)?;
    timestamps.push(first_timestamp);
    for record_index in 1..occurrence_count {
        let (key, timestamp) = read_record(bytes, cursor, order)?;
        if key != bucket_key {
            return Err(HistoryError::malformed(format!(
                "bucket {bucket_index} record {record_index} has signature {key}, expected {bucket_key}"
            )));
        }
        timestamps.push(timestamp);
    }

    HistoryBucket::from_timestamps(bucket_key, timestamps)
}

/// Fail before allocating if `count` items of at least `item_bytes` each
/// cannot possibly follow `cursor`.
fn ensure_remaining(
    bytes: &[u8],
    cursor: usize,
    count: usize,
    item_bytes: usize,
    what: impl FnOnce() -> String,
) -> Result<()> {
    let remaining = bytes.len().saturating_sub(cursor);
    let needed = count.checked_mul(item_bytes);
    if needed.is_none_or(|needed| needed > remaining) {
        return Err(HistoryError::malformed(format!(
            "{} requires at least {} bytes at offset {cursor}, only {remaining} remain",
            what(),
            needed.map_or_else(|| "more than usize::MAX".to_owned(), |n| n.to_string()),
        )));
    }
    Ok(())
}

fn append_record(buf: &mut Vec<u8>, key: SignatureKey, timestamp: Timestamp, order: ByteOrder) {
    buf.extend_from_slice(&order.i32_to_bytes(key.generator_id));
    buf.extend_from_slice(&order.i32_to_bytes(key.signature_id));
    buf.extend_from_slice(&order.i32_to_bytes(key.revision));
    buf.extend_from_slice(&order.i64_to_bytes(timestamp));
}

fn read_record(
    bytes: &[u8],
    cursor: &mut usize,
    order: ByteOrder,
) -> Result<(SignatureKey, Timestamp)> {
    let generator_id = order.i32_from_bytes(read_array::<4>(bytes, cursor, "generator id")?);
    let signature_id = order.i32_from_bytes(read_array::<4>(bytes, cursor, "signature id")?);
    let revision = order.i32_from_bytes(read_array::<4>(bytes, cursor, "revision")?);
    let timestamp = order.i64_from_bytes(read_array::<8>(bytes, cursor, "timestamp")?);
    Ok((
        SignatureKey::new(generator_id, signature_id, revision),
        timestamp,
    ))
}

fn read_u32(bytes: &[u8], cursor: &mut usize, order: ByteOrder, field: &str) -> Result<u32> {
    Ok(order.u32_from_bytes(read_array::<4>(bytes, cursor, field)?))
}

fn read_array<const N: usize>(bytes: &[u8], cursor: &mut usize, field: &str) -> Result<[u8; N]> {
    let end = cursor
        .checked_add(N)
        .ok_or_else(|| HistoryError::malformed(format!("overflow reading history field {field}")))?;
    if end > bytes.len() {
        return Err(HistoryError::malformed(format!(
            "history field {field} out of bounds: need {N} bytes at offset {}, total {}",
            *cursor,
            bytes.len()
        )));
    }
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes[*cursor..end]);
    *cursor = end;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use alerthist_store::InsertionPolicy;
    use alerthist_types::Occurrence;

    use super::*;

    fn sample_store() -> HistoryStore {
        let mut store = HistoryStore::new();
        store
            .merge(
                [
                    Occurrence::new(SignatureKey::new(1, 1000, 2), 1_285_000_000),
                    Occurrence::new(SignatureKey::new(1, 1000, 2), 1_285_000_060),
                    Occurrence::new(SignatureKey::new(116, 150, 1), 1_285_000_030),
                ],
                InsertionPolicy::Chronological,
            )
            .expect("sample merge");
        store
    }

    fn record(order: ByteOrder, gid: i32, sid: i32, rev: i32, ts: i64) -> Vec<u8> {
        let mut out = Vec::new();
        append_record(&mut out, SignatureKey::new(gid, sid, rev), ts, order);
        out
    }

    #[test]
    fn test_record_layout_little_endian() {
        let bytes = encode(&sample_store(), ByteOrder::Little).expect("encode");
        assert_eq!(bytes.len(), 4 + (4 + 2 * 20) + (4 + 20));
        assert_eq!(bytes.len(), encoded_len(&sample_store()));
        assert_eq!(&bytes[0..4], &[2, 0, 0, 0]);
        assert_eq!(&bytes[4..8], &[2, 0, 0, 0]);
        assert_eq!(&bytes[8..12], &1_i32.to_le_bytes());
        assert_eq!(&bytes[12..16], &1000_i32.to_le_bytes());
        assert_eq!(&bytes[16..20], &2_i32.to_le_bytes());
        assert_eq!(&bytes[20..28], &1_285_000_000_i64.to_le_bytes());
        // Second record repeats the key.
        assert_eq!(&bytes[28..40], &bytes[8..20]);
    }

    #[test]
    fn test_big_endian_layout() {
        let bytes = encode(&sample_store(), ByteOrder::Big).expect("encode");
        assert_eq!(&bytes[0..4], &[0, 0, 0, 2]);
        let decoded = decode(&bytes, ByteOrder::Big).expect("decode");
        assert_eq!(decoded, sample_store());
    }

    #[test]
    fn test_empty_store_encoding() {
        let bytes = encode(&HistoryStore::new(), ByteOrder::Little).expect("encode");
        assert_eq!(bytes, vec![0, 0, 0, 0]);
        assert!(decode(&bytes, ByteOrder::Little).expect("decode").is_empty());
    }

    #[test]
    fn test_decode_keeps_file_order() {
        let order = ByteOrder::Little;
        let mut bytes = order.u32_to_bytes(2).to_vec();
        bytes.extend_from_slice(&order.u32_to_bytes(2));
        bytes.extend(record(order, 7, 7, 7, 300));
        bytes.extend(record(order, 7, 7, 7, 100));
        bytes.extend_from_slice(&order.u32_to_bytes(1));
        bytes.extend(record(order, 3, 3, 3, 5));

        let store = decode(&bytes, order).expect("decode");
        let first = &store.buckets()[0];
        assert_eq!(first.key(), SignatureKey::new(7, 7, 7));
        // Stored order wins even when it is not chronological.
        assert_eq!(first.timestamps(), &[300, 100]);
        assert_eq!(first.total_count(), 2);
        assert_eq!(store.buckets()[1].key(), SignatureKey::new(3, 3, 3));
        assert_eq!(encode(&store, order).expect("encode"), bytes);
    }

    #[test]
    fn test_decode_empty_input_is_malformed() {
        let err = decode(&[], ByteOrder::Little).expect_err("empty input");
        assert!(matches!(err, HistoryError::Malformed { .. }), "{err}");
    }

    #[test]
    fn test_decode_bucket_count_exceeds_bytes() {
        let order = ByteOrder::Little;
        let mut bytes = order.u32_to_bytes(3).to_vec();
        bytes.extend_from_slice(&order.u32_to_bytes(1));
        bytes.extend(record(order, 1, 1, 1, 1));
        let err = decode(&bytes, order).expect_err("declared buckets missing");
        assert!(matches!(err, HistoryError::Malformed { .. }), "{err}");
    }

    #[test]
    fn test_decode_truncated_record() {
        let mut bytes = encode(&sample_store(), ByteOrder::Little).expect("encode");
        bytes.truncate(bytes.len() - 3);
        let err = decode(&bytes, ByteOrder::Little).expect_err("truncated");
        assert!(matches!(err, HistoryError::Malformed { .. }), "{err}");
    }

    #[test]
    fn test_decode_every_truncation_fails() {
        let bytes = encode(&sample_store(), ByteOrder::Little).expect("encode");
        for len in 0..bytes.len() {
            let result = decode(&bytes[..len], ByteOrder::Little);
            assert!(
                matches!(result, Err(HistoryError::Malformed { .. })),
                "prefix of {len} bytes should be malformed"
            );
        }
    }

    #[test]
    fn test_decode_huge_counts_fail_without_allocating() {
        let order = ByteOrder::Little;
        let bytes = order.u32_to_bytes(u32::MAX).to_vec();
        assert!(matches!(
            decode(&bytes, order),
            Err(HistoryError::Malformed { .. })
        ));

        let mut bytes = order.u32_to_bytes(1).to_vec();
        bytes.extend_from_slice(&order.u32_to_bytes(u32::MAX));
        bytes.extend(record(order, 1, 1, 1, 1));
        assert!(matches!(
            decode(&bytes, order),
            Err(HistoryError::Malformed { .. })
        ));
    }

    #[test]
    fn test_decode_zero_occurrence_bucket() {
        let order = ByteOrder::Little;
        let mut bytes = order.u32_to_bytes(1).to_vec();
        bytes.extend_from_slice(&order.u32_to_bytes(0));
        bytes.extend(record(order, 1, 1, 1, 1));
        let err = decode(&bytes, order).expect_err("zero occurrences");
        assert!(err.to_string().contains("zero occurrences"), "{err}");
    }

    #[test]
    fn test_decode_mixed_keys_in_bucket() {
        let order = ByteOrder::Little;
        let mut bytes = order.u32_to_bytes(1).to_vec();
        bytes.extend_from_slice(&order.u32_to_bytes(2));
        bytes.extend(record(order, 1, 1, 1, 1));
        bytes.extend(record(order, 1, 1, 2, 2));
        let err = decode(&bytes, order).expect_err("mixed keys");
        assert!(err.to_string().contains("expected 1:1:1"), "{err}");
    }

    #[test]
    fn test_decode_duplicate_bucket_key() {
        let order = ByteOrder::Little;
        let mut bytes = order.u32_to_bytes(2).to_vec();
        for ts in [1, 2] {
            bytes.extend_from_slice(&order.u32_to_bytes(1));
            bytes.extend(record(order, 9, 9, 9, ts));
        }
        let err = decode(&bytes, order).expect_err("duplicate key");
        assert!(matches!(err, HistoryError::Malformed { .. }), "{err}");
    }

    #[test]
    fn test_decode_ignores_trailing_bytes() {
        let mut bytes = encode(&sample_store(), ByteOrder::Little).expect("encode");
        bytes.extend_from_slice(&[0xde, 0xad]);
        let store = decode(&bytes, ByteOrder::Little).expect("decode");
        assert_eq!(store, sample_store());
    }

    #[test]
    fn test_bucket_count_field_limit() {
        assert_eq!(bucket_count_field(0).expect("zero fits"), 0);
        assert_eq!(
            bucket_count_field(u32::MAX as usize).expect("u32::MAX fits"),
            u32::MAX
        );
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_bucket_count_overflow_is_too_many_signatures() {
        let err = bucket_count_field(u32::MAX as usize + 1).expect_err("does not fit u32");
        assert!(
            matches!(err, HistoryError::TooManySignatures { count } if count == u32::MAX as usize + 1),
            "{err}"
        );
    }

    #[test]
    fn test_negative_fields_survive() {
        let order = ByteOrder::Little;
        let mut bytes = order.u32_to_bytes(1).to_vec();
        bytes.extend_from_slice(&order.u32_to_bytes(1));
        bytes.extend(record(order, -1, i32::MIN, i32::MAX, -42));
        let store = decode(&bytes, order).expect("decode");
        let bucket = &store.buckets()[0];
        assert_eq!(bucket.key(), SignatureKey::new(-1, i32::MIN, i32::MAX));
        assert_eq!(bucket.timestamps(), &[-42]);
    }
}
