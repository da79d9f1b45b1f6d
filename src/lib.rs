//! Gmail Sorter
//!
//! A periodic inbox sorter: messages are classified into user-defined
//! categories by an LLM and filed under matching Gmail labels, with a
//! bulk-undo path that puts everything back.
//!
//! # Overview
//!
//! Each pass acquires a process-wide run lock, lists the inbox, fetches
//! message snippets in rate-limited chunks, classifies the whole batch with
//! one model call, and reconciles each message's labels with the decision.
//! Recent decisions are kept as a bounded history log and replayed to the
//! classifier as in-context examples. Reset reverses every label action and
//! clears the stored state.
//!
//! # Module Organization
//!
//! - [`auth`] - OAuth2 authentication and Gmail hub initialization
//! - [`batch`] - Rate-limited chunked execution of independent operations
//! - [`classifier`] - Prompt building, Gemini client, and reply parsing
//! - [`cli`] - Command-line interface and the watch loop
//! - [`config`] - Configuration management
//! - [`error`] - Error types and result alias
//! - [`gateway`] - Gmail API access behind the [`gateway::MailGateway`] trait
//! - [`history`] - Bounded classification memory with byte-quota eviction
//! - [`labeler`] - Category-to-label reconciliation
//! - [`lock`] - Mutual exclusion between sorting and reset passes
//! - [`models`] - Core data structures
//! - [`notify`] - Notification emission
//! - [`pipeline`] - The sorting pass coordinator
//! - [`registry`] - Category admission rules
//! - [`reset`] - Bulk undo of all label actions
//! - [`store`] - Quota-bounded key-value state persistence

pub mod auth;
pub mod batch;
pub mod classifier;
pub mod cli;
pub mod config;
pub mod error;
pub mod gateway;
pub mod history;
pub mod labeler;
pub mod lock;
pub mod models;
pub mod notify;
pub mod pipeline;
pub mod registry;
pub mod reset;
pub mod store;

// Re-export commonly used types for convenience
pub use error::{Result, SorterError};

pub use models::{
    Category, HistoryEntry, LabelInfo, MessagePage, MessageSummary, ResetSummary, RunOutcome,
    RunSummary, SkipReason,
};

pub use batch::{run_chunked, BatchOptions};
pub use classifier::{Classifier, Decision, GeminiClassifier};
pub use config::Config;
pub use gateway::{GmailApiGateway, MailGateway, INBOX_LABEL_ID};
pub use history::CategorizationMemory;
pub use labeler::LabelReconciler;
pub use lock::{RunGuard, RunLock};
pub use notify::{LogNotifier, Notifier, NullNotifier};
pub use pipeline::Processor;
pub use registry::UNCATEGORIZED;
pub use reset::ResetCoordinator;
pub use store::{FileStore, KeyValueStore, MemoryStore, StateStore};
