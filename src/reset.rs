//! Bulk undo of all label actions
//!
//! For every Gmail label whose name matches a known category, move all of its
//! messages back to the inbox in rate-limited batches, delete the label, and
//! finally clear category and history state. Shares the run lock with the
//! sorting pass and fails fast if one is active; a reset is never queued
//! behind a run.

use std::time::Duration;
use tracing::{debug, info, warn};

use crate::batch::{self, BatchOptions};
use crate::config::Config;
use crate::error::{Result, SorterError};
use crate::gateway::{MailGateway, INBOX_LABEL_ID};
use crate::lock::RunLock;
use crate::models::{LabelInfo, ResetSummary};
use crate::store::{KeyValueStore, StateStore};

pub struct ResetCoordinator<G, S> {
    gateway: G,
    state: StateStore<S>,
    config: Config,
    lock: RunLock,
}

impl<G, S> ResetCoordinator<G, S>
where
    G: MailGateway,
    S: KeyValueStore,
{
    pub fn new(gateway: G, state: StateStore<S>, config: Config, lock: RunLock) -> Self {
        Self {
            gateway,
            state,
            config,
            lock,
        }
    }

    /// Undo every label action and clear classification state
    pub async fn run(&self) -> Result<ResetSummary> {
        let _guard = self
            .lock
            .try_acquire()
            .ok_or(SorterError::LockContention)?;

        let categories = self.state.load_categories().await?;
        if categories.is_empty() {
            info!("Nothing to reset: no categories configured");
            return Ok(ResetSummary::default());
        }

        let labels = self.gateway.list_labels().await?;
        let matching: Vec<LabelInfo> = labels
            .into_iter()
            .filter(|l| categories.iter().any(|c| c.name == l.name))
            .collect();

        let mut summary = ResetSummary {
            labels_matched: matching.len(),
            ..Default::default()
        };

        if matching.is_empty() {
            // Labels already gone; treat as reset and clear state anyway
            info!("No matching labels found, clearing state");
            self.state.clear_classification_state().await?;
            return Ok(summary);
        }

        info!("Resetting {} label(s)", matching.len());
        for label in &matching {
            let message_ids = self.collect_label_messages(label).await;

            let (moved, move_failures) = self.move_to_inbox(&label.id, message_ids).await;
            summary.messages_moved += moved;
            summary.failures += move_failures;

            match self.gateway.delete_label(&label.id).await {
                Ok(()) => {
                    info!("Deleted label '{}' ({})", label.name, label.id);
                    summary.labels_deleted += 1;
                }
                Err(e) => {
                    warn!("Failed to delete label '{}': {}", label.name, e);
                    summary.failures += 1;
                }
            }
        }

        // One persisted write covering categories and history
        self.state.clear_classification_state().await?;

        info!(
            "Reset complete: {} message(s) moved, {}/{} label(s) deleted, {} failure(s)",
            summary.messages_moved, summary.labels_deleted, summary.labels_matched, summary.failures
        );
        Ok(summary)
    }

    /// Walk every page of message ids for one label
    ///
    /// A failed page stops pagination for this label only; whatever was
    /// collected so far is still processed.
    async fn collect_label_messages(&self, label: &LabelInfo) -> Vec<String> {
        let mut ids = Vec::new();
        let mut page_token: Option<String> = None;
        let page_delay = Duration::from_millis(self.config.batch.inter_chunk_delay_ms);

        loop {
            match self
                .gateway
                .list_messages_with_label(&label.id, page_token.as_deref())
                .await
            {
                Ok(page) => {
                    ids.extend(page.ids);
                    page_token = page.next_page_token;
                }
                Err(e) => {
                    warn!(
                        "Failed to list messages for label '{}', processing partial list: {}",
                        label.name, e
                    );
                    break;
                }
            }

            if page_token.is_none() {
                break;
            }
            if !page_delay.is_zero() {
                tokio::time::sleep(page_delay).await;
            }
        }

        debug!("Label '{}' carries {} message(s)", label.name, ids.len());
        ids
    }

    /// Move messages back to the inbox in rate-limited batches
    ///
    /// Returns (moved, failed). Individual failures are logged and do not
    /// abort the loop over remaining messages.
    async fn move_to_inbox(&self, label_id: &str, message_ids: Vec<String>) -> (usize, usize) {
        if message_ids.is_empty() {
            return (0, 0);
        }

        let options = BatchOptions::new(
            self.config.batch.chunk_size,
            Duration::from_millis(self.config.batch.inter_chunk_delay_ms),
        );

        let results = batch::run_chunked(message_ids, options, |id| async move {
            self.gateway
                .modify_message(
                    &id,
                    &[INBOX_LABEL_ID.to_string()],
                    &[label_id.to_string()],
                )
                .await
        })
        .await;

        let mut moved = 0;
        let mut failed = 0;
        for result in results {
            match result {
                Ok(()) => moved += 1,
                Err(e) => {
                    warn!("Failed to move message back to inbox: {}", e);
                    failed += 1;
                }
            }
        }
        (moved, failed)
    }
}
