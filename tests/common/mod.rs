//! Shared test doubles: an in-memory Gmail account and a scripted classifier

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use gmail_sorter::error::{Result, SorterError};
use gmail_sorter::gateway::{MailGateway, INBOX_LABEL_ID};
use gmail_sorter::models::{LabelInfo, MessagePage, MessageSummary};

pub const PAGE_SIZE: usize = 100;

#[derive(Debug, Clone)]
pub struct FakeMessage {
    pub snippet: String,
    pub labels: HashSet<String>,
}

#[derive(Default)]
struct AccountState {
    /// User labels only; INBOX is implicit
    labels: Vec<LabelInfo>,
    /// Keyed by message id; BTreeMap keeps listings deterministic
    messages: BTreeMap<String, FakeMessage>,
    next_label: usize,
}

/// In-memory Gmail account with injectable failures
#[derive(Default)]
pub struct FakeGateway {
    state: Mutex<AccountState>,
    pub fail_list_inbox: Mutex<bool>,
    /// Message ids whose detail fetch fails
    pub fail_get: Mutex<HashSet<String>>,
    /// Message ids whose modify fails
    pub fail_modify: Mutex<HashSet<String>>,
    /// Label ids whose deletion fails
    pub fail_delete_label: Mutex<HashSet<String>>,
    /// Label ids whose second and later pages fail
    pub fail_later_pages: Mutex<HashSet<String>>,
    pub create_label_calls: AtomicUsize,
    pub list_label_calls: AtomicUsize,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a message to the inbox
    pub fn seed_inbox_message(&self, id: &str, snippet: &str) {
        let mut state = self.state.lock().unwrap();
        state.messages.insert(
            id.to_string(),
            FakeMessage {
                snippet: snippet.to_string(),
                labels: HashSet::from([INBOX_LABEL_ID.to_string()]),
            },
        );
    }

    /// Create a label and return its id
    pub fn seed_label(&self, name: &str) -> String {
        let mut state = self.state.lock().unwrap();
        state.next_label += 1;
        let id = format!("Label_{}", state.next_label);
        state.labels.push(LabelInfo {
            id: id.clone(),
            name: name.to_string(),
        });
        id
    }

    /// Add a message filed under a label (not in the inbox)
    pub fn seed_labeled_message(&self, id: &str, snippet: &str, label_id: &str) {
        let mut state = self.state.lock().unwrap();
        state.messages.insert(
            id.to_string(),
            FakeMessage {
                snippet: snippet.to_string(),
                labels: HashSet::from([label_id.to_string()]),
            },
        );
    }

    pub fn inbox_ids(&self) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state
            .messages
            .iter()
            .filter(|(_, m)| m.labels.contains(INBOX_LABEL_ID))
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub fn message_labels(&self, id: &str) -> HashSet<String> {
        let state = self.state.lock().unwrap();
        state
            .messages
            .get(id)
            .map(|m| m.labels.clone())
            .unwrap_or_default()
    }

    pub fn label_names(&self) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state.labels.iter().map(|l| l.name.clone()).collect()
    }

    pub fn label_id_for(&self, name: &str) -> Option<String> {
        let state = self.state.lock().unwrap();
        state
            .labels
            .iter()
            .find(|l| l.name == name)
            .map(|l| l.id.clone())
    }
}

#[async_trait]
impl MailGateway for FakeGateway {
    async fn list_inbox(&self) -> Result<Vec<String>> {
        if *self.fail_list_inbox.lock().unwrap() {
            return Err(SorterError::ServerError {
                status: 500,
                message: "inbox listing failed".to_string(),
            });
        }
        Ok(self.inbox_ids())
    }

    async fn get_message(&self, id: &str) -> Result<MessageSummary> {
        if self.fail_get.lock().unwrap().contains(id) {
            return Err(SorterError::NetworkError(format!("fetch failed for {}", id)));
        }
        let state = self.state.lock().unwrap();
        state
            .messages
            .get(id)
            .map(|m| MessageSummary {
                id: id.to_string(),
                snippet: m.snippet.clone(),
            })
            .ok_or_else(|| SorterError::NotFound(id.to_string()))
    }

    async fn list_labels(&self) -> Result<Vec<LabelInfo>> {
        self.list_label_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.state.lock().unwrap().labels.clone())
    }

    async fn create_label(&self, name: &str) -> Result<String> {
        self.create_label_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.seed_label(name))
    }

    async fn delete_label(&self, label_id: &str) -> Result<()> {
        if self.fail_delete_label.lock().unwrap().contains(label_id) {
            return Err(SorterError::ServerError {
                status: 500,
                message: format!("delete failed for {}", label_id),
            });
        }
        let mut state = self.state.lock().unwrap();
        state.labels.retain(|l| l.id != label_id);
        for message in state.messages.values_mut() {
            message.labels.remove(label_id);
        }
        Ok(())
    }

    async fn modify_message(
        &self,
        message_id: &str,
        add_label_ids: &[String],
        remove_label_ids: &[String],
    ) -> Result<()> {
        if self.fail_modify.lock().unwrap().contains(message_id) {
            return Err(SorterError::ServerError {
                status: 500,
                message: format!("modify failed for {}", message_id),
            });
        }
        let mut state = self.state.lock().unwrap();
        let message = state
            .messages
            .get_mut(message_id)
            .ok_or_else(|| SorterError::NotFound(message_id.to_string()))?;
        for id in add_label_ids {
            message.labels.insert(id.clone());
        }
        for id in remove_label_ids {
            message.labels.remove(id);
        }
        Ok(())
    }

    async fn list_messages_with_label(
        &self,
        label_id: &str,
        page_token: Option<&str>,
    ) -> Result<MessagePage> {
        let offset: usize = page_token.map(|t| t.parse().unwrap_or(0)).unwrap_or(0);

        if offset > 0 && self.fail_later_pages.lock().unwrap().contains(label_id) {
            return Err(SorterError::ServerError {
                status: 503,
                message: format!("page fetch failed for {}", label_id),
            });
        }

        let state = self.state.lock().unwrap();
        let all: Vec<String> = state
            .messages
            .iter()
            .filter(|(_, m)| m.labels.contains(label_id))
            .map(|(id, _)| id.clone())
            .collect();

        let page: Vec<String> = all.iter().skip(offset).take(PAGE_SIZE).cloned().collect();
        let next = if offset + PAGE_SIZE < all.len() {
            Some((offset + PAGE_SIZE).to_string())
        } else {
            None
        };

        Ok(MessagePage {
            ids: page,
            next_page_token: next,
        })
    }
}

/// Classifier double returning a scripted reply (or error) per call
#[derive(Default)]
pub struct FakeClassifier {
    replies: Mutex<Vec<Result<String>>>,
    pub calls: AtomicUsize,
    pub last_prompt: Mutex<String>,
}

impl FakeClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replying(reply: &str) -> Self {
        let classifier = Self::default();
        classifier.push_reply(reply);
        classifier
    }

    pub fn failing(error: SorterError) -> Self {
        let classifier = Self::default();
        classifier.replies.lock().unwrap().push(Err(error));
        classifier
    }

    pub fn push_reply(&self, reply: &str) {
        self.replies.lock().unwrap().push(Ok(reply.to_string()));
    }
}

#[async_trait]
impl gmail_sorter::classifier::Classifier for FakeClassifier {
    async fn classify(&self, prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_prompt.lock().unwrap() = prompt.to_string();
        let mut replies = self.replies.lock().unwrap();
        if replies.is_empty() {
            return Err(SorterError::ClassificationError(
                "no scripted reply".to_string(),
            ));
        }
        replies.remove(0)
    }
}

/// Notifier double recording emitted notifications
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<(String, String)>>,
}

impl gmail_sorter::notify::Notifier for RecordingNotifier {
    fn notify(&self, title: &str, body: &str) {
        self.sent
            .lock()
            .unwrap()
            .push((title.to_string(), body.to_string()));
    }
}

/// A config with no batch delays, suitable for fast tests
pub fn fast_config() -> gmail_sorter::config::Config {
    let mut config = gmail_sorter::config::Config::default();
    config.batch.inter_chunk_delay_ms = 0;
    config.batch.chunk_size = 20;
    config
}
