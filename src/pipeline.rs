//! The sorting pass
//!
//! One pass: acquire the run lock, list the inbox, fetch snippets in
//! rate-limited chunks, classify the whole batch with one model call, then
//! per message admit the category, reconcile the label, and optionally emit a
//! notification. A new history snapshot is persisted from the run's results
//! before the lock guard drops.
//!
//! Failure semantics: a per-message fetch or labeling failure is logged and
//! that message is skipped; a failure listing the inbox, calling the
//! classifier, or parsing its reply aborts the whole pass. The lock is
//! released on every path because the guard lives on this stack frame.

use chrono::Utc;
use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::batch::{self, BatchOptions};
use crate::classifier::{self, Classifier};
use crate::config::Config;
use crate::error::Result;
use crate::gateway::MailGateway;
use crate::history::CategorizationMemory;
use crate::labeler::LabelReconciler;
use crate::lock::RunLock;
use crate::models::{HistoryEntry, MessageSummary, RunOutcome, RunSummary, SkipReason};
use crate::notify::Notifier;
use crate::registry;
use crate::store::{KeyValueStore, StateStore};

pub struct Processor<G, C, S, N> {
    gateway: G,
    classifier: C,
    state: StateStore<S>,
    notifier: N,
    config: Config,
    lock: RunLock,
}

impl<G, C, S, N> Processor<G, C, S, N>
where
    G: MailGateway,
    C: Classifier,
    S: KeyValueStore,
    N: Notifier,
{
    pub fn new(
        gateway: G,
        classifier: C,
        state: StateStore<S>,
        notifier: N,
        config: Config,
        lock: RunLock,
    ) -> Self {
        Self {
            gateway,
            classifier,
            state,
            notifier,
            config,
            lock,
        }
    }

    /// Run one sorting pass
    pub async fn run(&self) -> Result<RunOutcome> {
        // The trigger can fire while a previous pass is in flight; the lock
        // is the authoritative guard, not the trigger period.
        let _guard = match self.lock.try_acquire() {
            Some(guard) => guard,
            None => {
                debug!("Skipping pass: another run is in progress");
                return Ok(RunOutcome::Skipped(SkipReason::AlreadyRunning));
            }
        };

        if !self.config.general.enabled {
            debug!("Skipping pass: sorter is disabled");
            return Ok(RunOutcome::Skipped(SkipReason::Disabled));
        }

        let started_at = Utc::now();

        let message_ids = self.gateway.list_inbox().await?;
        if message_ids.is_empty() {
            debug!("Skipping pass: inbox is empty");
            return Ok(RunOutcome::Skipped(SkipReason::NoNewMail));
        }

        let mut categories = self.state.load_categories().await?;
        if categories.is_empty() && !self.config.categories.auto_create {
            debug!("Skipping pass: no categories and auto-creation is off");
            return Ok(RunOutcome::Skipped(SkipReason::NoCategories));
        }

        info!("Starting sorting pass over {} message(s)", message_ids.len());
        let mut summary = RunSummary::new(started_at);

        // Detail fetch in rate-limited chunks; failed fetches are skipped
        let total_listed = message_ids.len();
        let fetch_results = batch::run_chunked(
            message_ids,
            self.batch_options(),
            |id| async move { self.gateway.get_message(&id).await },
        )
        .await;

        let mut messages: Vec<MessageSummary> = Vec::with_capacity(fetch_results.len());
        for result in fetch_results {
            match result {
                Ok(message) => messages.push(message),
                Err(e) => {
                    warn!("Failed to fetch message detail, skipping: {}", e);
                    summary.skipped += 1;
                }
            }
        }

        if messages.is_empty() {
            warn!("All {} detail fetches failed", total_listed);
            summary.finished_at = Utc::now();
            return Ok(RunOutcome::Completed(summary));
        }

        // One classifier call per pass; categories and history as they
        // existed at this point are the batch's classification context
        let memory = CategorizationMemory::new(self.config.history.max_entries);
        let history = memory.recall(&self.state).await?;
        let category_names: Vec<String> = categories.iter().map(|c| c.name.clone()).collect();

        let prompt = classifier::build_prompt(&category_names, &history, &messages);
        let raw_reply = self.classifier.classify(&prompt).await?;
        let decisions = classifier::parse_reply(&raw_reply)?;
        debug!("Classifier returned {} decision(s)", decisions.len());

        let snippets: HashMap<&str, &str> = messages
            .iter()
            .map(|m| (m.id.as_str(), m.snippet.as_str()))
            .collect();

        let mut reconciler = LabelReconciler::new(&self.gateway);
        let mut new_entries: Vec<HistoryEntry> = Vec::new();

        for decision in decisions {
            let Some(snippet) = snippets.get(decision.id.as_str()) else {
                warn!(
                    "Classifier returned unknown message id '{}', ignoring",
                    decision.id
                );
                continue;
            };

            let admission =
                registry::admit(&decision.category, &mut categories, &self.config.categories);
            if admission.created {
                // Persist immediately so a crash mid-pass cannot lose the
                // admission later messages already observed
                self.state.save_categories(&categories).await?;
                summary.auto_created += 1;
            }

            match reconciler
                .file_message(&decision.id, &admission.final_name)
                .await
            {
                Ok(()) => {
                    summary.processed += 1;
                    new_entries.push(HistoryEntry {
                        snippet: snippet.to_string(),
                        category: admission.final_name.clone(),
                    });

                    let should_notify = categories
                        .iter()
                        .any(|c| c.name == admission.final_name && c.notify);
                    if should_notify {
                        self.notifier
                            .notify(&format!("New email in {}", admission.final_name), snippet);
                        summary.notifications += 1;
                    }
                }
                Err(e) => {
                    warn!(
                        "Failed to file message {} under '{}': {}",
                        decision.id, admission.final_name, e
                    );
                    summary.skipped += 1;
                }
            }
        }

        memory.record(&self.state, new_entries).await?;

        summary.finished_at = Utc::now();
        info!(
            "Sorting pass complete: {} processed, {} skipped, {} categories auto-created",
            summary.processed, summary.skipped, summary.auto_created
        );
        Ok(RunOutcome::Completed(summary))
    }

    fn batch_options(&self) -> BatchOptions {
        BatchOptions::new(
            self.config.batch.chunk_size,
            std::time::Duration::from_millis(self.config.batch.inter_chunk_delay_ms),
        )
    }
}
