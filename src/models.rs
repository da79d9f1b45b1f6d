use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A classification bucket, mapped 1:1 to a Gmail label by name.
///
/// Names are unique and case-sensitive within the registry. Auto-generated
/// categories are created from classifier suggestions and bounded by the
/// configured cap.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Category {
    pub name: String,
    #[serde(default)]
    pub notify: bool,
    #[serde(default)]
    pub auto_generated: bool,
}

impl Category {
    /// A user-defined category with notifications off
    pub fn user(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            notify: false,
            auto_generated: false,
        }
    }

    /// A category admitted from a classifier suggestion
    pub fn auto_generated(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            notify: false,
            auto_generated: true,
        }
    }
}

/// One past classification decision, replayed to the classifier as an
/// in-context example on later runs
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryEntry {
    pub snippet: String,
    pub category: String,
}

/// Ephemeral per-run view of an inbox message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageSummary {
    pub id: String,
    pub snippet: String,
}

/// Label info returned from the Gmail API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelInfo {
    pub id: String,
    pub name: String,
}

/// One page of message ids carrying a given label
#[derive(Debug, Clone, Default)]
pub struct MessagePage {
    pub ids: Vec<String>,
    pub next_page_token: Option<String>,
}

/// Outcome of a single sorting pass
#[derive(Debug, Clone)]
pub enum RunOutcome {
    /// The pass ran to completion
    Completed(RunSummary),
    /// The pass was skipped without side effects
    Skipped(SkipReason),
}

/// Why a sorting pass did nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Another sort or reset pass holds the run lock
    AlreadyRunning,
    /// The master toggle is off
    Disabled,
    /// The inbox listing came back empty
    NoNewMail,
    /// No categories configured and auto-creation is off
    NoCategories,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let reason = match self {
            SkipReason::AlreadyRunning => "already running",
            SkipReason::Disabled => "disabled",
            SkipReason::NoNewMail => "no new emails",
            SkipReason::NoCategories => "no categories configured",
        };
        f.write_str(reason)
    }
}

/// Counters for one completed sorting pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Messages successfully classified and filed out of the inbox
    pub processed: usize,
    /// Messages skipped due to per-message fetch or labeling failures
    pub skipped: usize,
    /// Categories admitted from classifier suggestions during this pass
    pub auto_created: usize,
    /// Notifications emitted for categories with notify enabled
    pub notifications: usize,
}

impl RunSummary {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            started_at,
            finished_at: started_at,
            processed: 0,
            skipped: 0,
            auto_created: 0,
            notifications: 0,
        }
    }
}

/// Counters for one reset pass
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResetSummary {
    pub labels_matched: usize,
    pub labels_deleted: usize,
    pub messages_moved: usize,
    /// Moves or deletes that failed and were left as-is
    pub failures: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_constructors() {
        let user = Category::user("Work");
        assert_eq!(user.name, "Work");
        assert!(!user.notify);
        assert!(!user.auto_generated);

        let auto = Category::auto_generated("Travel");
        assert!(auto.auto_generated);
        assert!(!auto.notify);
    }

    #[test]
    fn test_category_serialization_defaults() {
        // Older stored payloads carried only the name
        let cat: Category = serde_json::from_str(r#"{"name":"Receipts"}"#).unwrap();
        assert_eq!(cat.name, "Receipts");
        assert!(!cat.notify);
        assert!(!cat.auto_generated);
    }

    #[test]
    fn test_history_entry_roundtrip() {
        let entry = HistoryEntry {
            snippet: "Your order has shipped".to_string(),
            category: "Shopping".to_string(),
        };
        let json = serde_json::to_string(&entry).unwrap();
        let back: HistoryEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(entry, back);
    }

    #[test]
    fn test_skip_reason_display() {
        assert_eq!(SkipReason::AlreadyRunning.to_string(), "already running");
        assert_eq!(SkipReason::NoNewMail.to_string(), "no new emails");
    }
}
