//! Load-merge-persist orchestration.

use std::path::Path;

use alerthist_codec::{read_history_file, write_history_file};
use alerthist_error::Result;
use alerthist_store::{HistoryStore, MergeSummary};
use alerthist_types::{Occurrence, RawAlert};
use tracing::{info, warn};

use crate::config::HistoryConfig;

/// Owns the in-memory history for one history file.
///
/// The store is loaded lazily: the first write reads the file, later writes
/// reuse the in-memory copy until [`release_all`](Self::release_all). No
/// internal locking; see [`SharedHistory`](crate::SharedHistory) for that.
#[derive(Debug)]
pub struct HistoryService {
    config: HistoryConfig,
    store: HistoryStore,
    loaded: bool,
}

impl HistoryService {
    #[must_use]
    pub fn new(config: HistoryConfig) -> Self {
        Self {
            config,
            store: HistoryStore::new(),
            loaded: false,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &HistoryConfig {
        &self.config
    }

    #[must_use]
    pub const fn store(&self) -> &HistoryStore {
        &self.store
    }

    /// Whether the file has been read since construction or the last
    /// release.
    #[must_use]
    pub const fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Read the history file unless it has already been read.
    ///
    /// A missing file yields an empty store. The file is decoded into a
    /// fresh store that only replaces the current one on success.
    ///
    /// # Errors
    /// Any error from [`read_history_file`]; the in-memory store is left
    /// unchanged.
    pub fn ensure_loaded(&mut self) -> Result<()> {
        if self.loaded {
            return Ok(());
        }
        self.load_from_disk()
    }

    /// Read the history file again even if it was already loaded, dropping
    /// the in-memory copy.
    ///
    /// # Errors
    /// Any error from [`read_history_file`]; the in-memory store and its
    /// loaded state are left unchanged.
    pub fn reload(&mut self) -> Result<()> {
        self.load_from_disk()
    }

    fn load_from_disk(&mut self) -> Result<()> {
        let path = self.config.history_file.as_path();
        match read_history_file(path, self.config.byte_order) {
            Ok(Some(store)) => self.store = store,
            Ok(None) => {
                info!(path = %path.display(), "starting a new alert history");
                self.store.release_all();
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "failed to load alert history");
                return Err(err);
            }
        }
        self.loaded = true;
        Ok(())
    }

    /// Load if needed, merge `occurrences`, then rewrite the whole file.
    ///
    /// # Errors
    /// Load, merge and write errors, unrecovered. A failed merge or write
    /// releases the in-memory store, so the next call reloads the file and
    /// the failed batch is never written.
    pub fn record_and_persist<I>(&mut self, occurrences: I) -> Result<MergeSummary>
    where
        I: IntoIterator<Item = Occurrence>,
    {
        self.ensure_loaded()?;
        let outcome = self
            .store
            .merge(occurrences, self.config.insertion)
            .and_then(|summary| self.write_store().map(|()| summary));
        if let Err(err) = &outcome {
            warn!(
                path = %self.config.history_file.display(),
                error = %err,
                "alert batch not recorded; releasing in-memory history"
            );
            self.release_all();
        }
        outcome
    }

    /// Record a batch of pipeline alerts, in batch order.
    ///
    /// # Errors
    /// As [`record_and_persist`](Self::record_and_persist).
    pub fn record_alerts(&mut self, batch: &[RawAlert]) -> Result<MergeSummary> {
        let summary = self.record_and_persist(batch.iter().map(Occurrence::from))?;
        info!(
            alerts = batch.len(),
            new_signatures = summary.new_buckets,
            signatures = self.store.len(),
            "alerts recorded to history"
        );
        Ok(summary)
    }

    /// Load if needed, then rewrite the history file from the in-memory
    /// store. A history that has not been read is never overwritten.
    ///
    /// # Errors
    /// Any error from [`ensure_loaded`](Self::ensure_loaded) or
    /// [`write_history_file`].
    pub fn persist(&mut self) -> Result<()> {
        self.ensure_loaded()?;
        self.write_store()
    }

    fn write_store(&self) -> Result<()> {
        write_history_file(
            &self.config.history_file,
            &self.store,
            self.config.byte_order,
        )
    }

    /// Drop every bucket. The next write reloads the file.
    pub fn release_all(&mut self) {
        self.store.release_all();
        self.loaded = false;
    }

    /// Release the store and adopt a new configuration.
    pub fn reconfigure(&mut self, config: HistoryConfig) {
        self.release_all();
        self.config = config;
    }
}

/// One-shot load, merge and rewrite of the history at `history_file`, using
/// default byte order and insertion policy.
///
/// # Errors
/// `CannotRead`/`CannotWrite` for I/O failures, `Malformed` for a damaged
/// existing file, `NotARegularFile` if the path is not a regular file.
pub fn record_alerts(batch: &[RawAlert], history_file: &Path) -> Result<MergeSummary> {
    HistoryService::new(HistoryConfig::new(history_file)).record_alerts(batch)
}
