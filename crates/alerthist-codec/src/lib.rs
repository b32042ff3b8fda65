//! Alert history file codec.
//!
//! The file is positional: no magic, version or checksum. All integers use
//! one [`ByteOrder`](alerthist_types::ByteOrder) chosen by the caller.
//!
//! ```text
//! u32 bucket_count
//! bucket_count x {
//!     u32 occurrence_count
//!     occurrence_count x { i32 gid, i32 sid, i32 rev, i64 timestamp }
//! }
//! ```
//!
//! The key triple is repeated in every occurrence record.

pub mod codec;
pub mod file;

pub use codec::{
    BUCKET_COUNT_BYTES, OCCURRENCE_COUNT_BYTES, OCCURRENCE_RECORD_BYTES, decode, encode,
    encoded_len,
};
pub use file::{read_history_file, write_history_file};
