//! Public API facade for the alert history.
//!
//! A [`HistoryService`] owns one [`HistoryStore`]: it loads the configured
//! file on first use, merges each batch of alerts into it and rewrites the
//! whole file. [`SharedHistory`] wraps a service for use from several
//! threads.

pub mod config;
pub mod service;
pub mod shared;

pub use alerthist_error::{ErrorKind, HistoryError, Result};
pub use alerthist_store::{HistoryBucket, HistoryStore, InsertionPolicy, MergeSummary};
pub use alerthist_types::{
    ByteOrder, Occurrence, ParseAlertError, RawAlert, SignatureKey, Timestamp,
};
pub use config::HistoryConfig;
pub use service::{HistoryService, record_alerts};
pub use shared::SharedHistory;
