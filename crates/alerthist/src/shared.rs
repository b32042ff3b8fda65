use std::sync::Arc;

use alerthist_error::Result;
use alerthist_store::{HistoryStore, MergeSummary};
use alerthist_types::RawAlert;
use parking_lot::Mutex;

use crate::config::HistoryConfig;
use crate::service::HistoryService;

/// Cloneable handle to one [`HistoryService`], serialized by a mutex.
///
/// Every method holds the lock for its whole duration, file I/O included,
/// so concurrent batches are applied one after the other. This orders
/// writers inside one process only; nothing guards the file against other
/// processes.
#[derive(Debug, Clone)]
pub struct SharedHistory {
    inner: Arc<Mutex<HistoryService>>,
}

impl SharedHistory {
    #[must_use]
    pub fn new(config: HistoryConfig) -> Self {
        Self::from_service(HistoryService::new(config))
    }

    #[must_use]
    pub fn from_service(service: HistoryService) -> Self {
        Self {
            inner: Arc::new(Mutex::new(service)),
        }
    }

    /// See [`HistoryService::record_alerts`].
    pub fn record_alerts(&self, batch: &[RawAlert]) -> Result<MergeSummary> {
        self.inner.lock().record_alerts(batch)
    }

    /// See [`HistoryService::release_all`].
    pub fn release_all(&self) {
        self.inner.lock().release_all();
    }

    /// See [`HistoryService::reconfigure`].
    pub fn reconfigure(&self, config: HistoryConfig) {
        self.inner.lock().reconfigure(config);
    }

    /// Run `f` against the in-memory store while holding the lock.
    pub fn with_store<R>(&self, f: impl FnOnce(&HistoryStore) -> R) -> R {
        f(self.inner.lock().store())
    }
}
