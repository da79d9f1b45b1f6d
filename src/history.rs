//! Rolling classification memory
//!
//! Past (snippet, category) decisions are replayed to the classifier as
//! in-context examples. The log is append-with-dedup: the current run's
//! entries go to the front, older duplicates (by snippet) are dropped, the
//! log is truncated to the entry cap, and finally evicted from the tail until
//! its serialized form fits the store's per-item byte quota. Over-quota never
//! fails a run; in the worst case the log degrades to empty.

use tracing::{debug, warn};

use crate::error::Result;
use crate::models::HistoryEntry;
use crate::store::{KeyValueStore, StateStore, QUOTA_BYTES_PER_ITEM};

pub struct CategorizationMemory {
    max_entries: usize,
    byte_quota: usize,
}

impl CategorizationMemory {
    pub fn new(max_entries: usize) -> Self {
        Self {
            max_entries,
            byte_quota: QUOTA_BYTES_PER_ITEM,
        }
    }

    /// Override the byte quota (tests)
    pub fn with_byte_quota(max_entries: usize, byte_quota: usize) -> Self {
        Self {
            max_entries,
            byte_quota,
        }
    }

    /// Merge the run's entries into the existing log, newest first
    ///
    /// A new entry replaces any older entry with the same snippet.
    fn compose(
        &self,
        existing: Vec<HistoryEntry>,
        new_entries: Vec<HistoryEntry>,
    ) -> Vec<HistoryEntry> {
        let mut log: Vec<HistoryEntry> = Vec::with_capacity(existing.len() + new_entries.len());

        for entry in new_entries.into_iter().chain(existing) {
            if log.iter().any(|e| e.snippet == entry.snippet) {
                continue;
            }
            log.push(entry);
        }

        log.truncate(self.max_entries);
        log
    }

    /// Drop oldest entries until the serialized log fits the byte quota
    fn enforce_quota(&self, log: &mut Vec<HistoryEntry>) -> Result<()> {
        loop {
            let size = serde_json::to_string(&log)?.len();
            if size <= self.byte_quota {
                return Ok(());
            }
            if log.pop().is_none() {
                return Ok(());
            }
            warn!(
                "History over byte quota ({} > {}), evicting oldest entry",
                size, self.byte_quota
            );
        }
    }

    /// Persist a new history snapshot composed from this run's results
    ///
    /// Returns the number of retained entries. One persisted write.
    pub async fn record<S: KeyValueStore>(
        &self,
        state: &StateStore<S>,
        new_entries: Vec<HistoryEntry>,
    ) -> Result<usize> {
        let existing = state.load_history().await?;
        let mut log = self.compose(existing, new_entries);
        self.enforce_quota(&mut log)?;

        state.save_history(&log).await?;
        debug!("Recorded history snapshot with {} entries", log.len());
        Ok(log.len())
    }

    /// Read the current log, newest first
    pub async fn recall<S: KeyValueStore>(
        &self,
        state: &StateStore<S>,
    ) -> Result<Vec<HistoryEntry>> {
        state.load_history().await
    }
}
