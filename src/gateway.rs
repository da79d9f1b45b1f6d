//! Gmail API gateway
//!
//! Thin request/response mapping between the sorter and the Gmail message and
//! label endpoints. The trait is the seam the coordinators are written
//! against; the production implementation wraps the `google-gmail1` hub with
//! retry logic and per-call timeouts.

use async_trait::async_trait;
use google_gmail1::{
    api::{Label, ModifyMessageRequest},
    hyper_rustls, hyper_util, Gmail,
};
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{Result, SorterError};
use crate::models::{LabelInfo, MessagePage, MessageSummary};

/// The INBOX system label id
pub const INBOX_LABEL_ID: &str = "INBOX";

/// Gmail operations the sort and reset coordinators depend on
#[async_trait]
pub trait MailGateway: Send + Sync {
    /// List ids of all messages currently in the inbox
    async fn list_inbox(&self) -> Result<Vec<String>>;

    /// Fetch id and snippet for one message
    async fn get_message(&self, id: &str) -> Result<MessageSummary>;

    /// List all labels in the account
    async fn list_labels(&self) -> Result<Vec<LabelInfo>>;

    /// Create a label, returning its id
    async fn create_label(&self, name: &str) -> Result<String>;

    /// Delete a label by id
    async fn delete_label(&self, label_id: &str) -> Result<()>;

    /// Add and remove labels on a message in one call
    async fn modify_message(
        &self,
        message_id: &str,
        add_label_ids: &[String],
        remove_label_ids: &[String],
    ) -> Result<()>;

    /// Fetch one page of message ids carrying a label
    async fn list_messages_with_label(
        &self,
        label_id: &str,
        page_token: Option<&str>,
    ) -> Result<MessagePage>;
}

#[async_trait]
impl<T: MailGateway + ?Sized> MailGateway for std::sync::Arc<T> {
    async fn list_inbox(&self) -> Result<Vec<String>> {
        (**self).list_inbox().await
    }

    async fn get_message(&self, id: &str) -> Result<MessageSummary> {
        (**self).get_message(id).await
    }

    async fn list_labels(&self) -> Result<Vec<LabelInfo>> {
        (**self).list_labels().await
    }

    async fn create_label(&self, name: &str) -> Result<String> {
        (**self).create_label(name).await
    }

    async fn delete_label(&self, label_id: &str) -> Result<()> {
        (**self).delete_label(label_id).await
    }

    async fn modify_message(
        &self,
        message_id: &str,
        add_label_ids: &[String],
        remove_label_ids: &[String],
    ) -> Result<()> {
        (**self)
            .modify_message(message_id, add_label_ids, remove_label_ids)
            .await
    }

    async fn list_messages_with_label(
        &self,
        label_id: &str,
        page_token: Option<&str>,
    ) -> Result<MessagePage> {
        (**self).list_messages_with_label(label_id, page_token).await
    }
}

type Connector = hyper_rustls::HttpsConnector<hyper_util::client::legacy::connect::HttpConnector>;

/// Production gateway over the Gmail API hub
pub struct GmailApiGateway {
    hub: Gmail<Connector>,
}

impl GmailApiGateway {
    pub fn new(hub: Gmail<Connector>) -> Self {
        Self { hub }
    }

    fn should_retry(error: &SorterError) -> bool {
        error.is_transient()
    }

    /// Execute an async operation with exponential backoff retry
    async fn with_retry<T, F, Fut>(
        operation_name: &str,
        max_retries: u32,
        mut operation: F,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let mut delay = Duration::from_secs(1);
        let mut attempts = 0;

        loop {
            attempts += 1;
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) if Self::should_retry(&e) && attempts <= max_retries => {
                    warn!(
                        "{} failed (attempt {}/{}): {}. Retrying in {:?}...",
                        operation_name,
                        attempts,
                        max_retries + 1,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    delay = std::cmp::min(delay * 2, Duration::from_secs(30));
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Wrap an API call in a timeout so a hung request cannot pin the run
    /// lock indefinitely
    async fn with_timeout<T, Fut>(operation_name: &str, call: Fut) -> Result<T>
    where
        Fut: std::future::Future<Output = std::result::Result<T, google_gmail1::Error>>,
    {
        let timeout_duration = Duration::from_secs(30);
        match tokio::time::timeout(timeout_duration, call).await {
            Ok(result) => Ok(result?),
            Err(_) => {
                warn!(
                    "Gmail API {} call timed out after {:?}",
                    operation_name, timeout_duration
                );
                Err(SorterError::NetworkError(format!(
                    "{} timed out after {:?}",
                    operation_name, timeout_duration
                )))
            }
        }
    }
}

#[async_trait]
impl MailGateway for GmailApiGateway {
    async fn list_inbox(&self) -> Result<Vec<String>> {
        Self::with_retry("list_inbox", 3, || async {
            let mut all_ids = Vec::new();
            let mut page_token: Option<String> = None;

            loop {
                let mut call = self
                    .hub
                    .users()
                    .messages_list("me")
                    .q("in:inbox")
                    .max_results(100);

                if let Some(token) = page_token.as_ref() {
                    call = call.page_token(token);
                }

                let (_, response) = Self::with_timeout(
                    "list_inbox",
                    call.add_scope("https://www.googleapis.com/auth/gmail.modify")
                        .doit(),
                )
                .await?;

                if let Some(messages) = response.messages {
                    all_ids.extend(messages.into_iter().filter_map(|m| m.id));
                }

                page_token = response.next_page_token;
                if page_token.is_none() {
                    break;
                }
            }

            debug!("Found {} message(s) in inbox", all_ids.len());
            Ok(all_ids)
        })
        .await
    }

    async fn get_message(&self, id: &str) -> Result<MessageSummary> {
        let (_, msg) = Self::with_timeout(
            "get_message",
            self.hub
                .users()
                .messages_get("me", id)
                .format("minimal")
                .add_scope("https://www.googleapis.com/auth/gmail.modify")
                .doit(),
        )
        .await?;

        let id = msg
            .id
            .ok_or_else(|| SorterError::ApiError("Message response missing id".to_string()))?;
        Ok(MessageSummary {
            id,
            snippet: msg.snippet.unwrap_or_default(),
        })
    }

    async fn list_labels(&self) -> Result<Vec<LabelInfo>> {
        Self::with_retry("list_labels", 3, || async {
            let (_, response) = Self::with_timeout(
                "list_labels",
                self.hub
                    .users()
                    .labels_list("me")
                    .add_scope("https://www.googleapis.com/auth/gmail.labels")
                    .doit(),
            )
            .await?;

            let labels: Vec<LabelInfo> = response
                .labels
                .unwrap_or_default()
                .into_iter()
                .filter_map(|label| match (label.id, label.name) {
                    (Some(id), Some(name)) => Some(LabelInfo { id, name }),
                    _ => None,
                })
                .collect();

            debug!("Listed {} labels", labels.len());
            Ok(labels)
        })
        .await
    }

    async fn create_label(&self, name: &str) -> Result<String> {
        let name = name.to_string();
        Self::with_retry("create_label", 3, || async {
            let label = Label {
                name: Some(name.clone()),
                message_list_visibility: Some("show".to_string()),
                label_list_visibility: Some("labelShow".to_string()),
                ..Default::default()
            };

            let (_, created) = Self::with_timeout(
                "create_label",
                self.hub
                    .users()
                    .labels_create(label, "me")
                    .add_scope("https://www.googleapis.com/auth/gmail.labels")
                    .doit(),
            )
            .await?;

            created
                .id
                .ok_or_else(|| SorterError::LabelError("Created label has no ID".to_string()))
        })
        .await
    }

    async fn delete_label(&self, label_id: &str) -> Result<()> {
        Self::with_timeout(
            "delete_label",
            self.hub
                .users()
                .labels_delete("me", label_id)
                .add_scope("https://www.googleapis.com/auth/gmail.labels")
                .doit(),
        )
        .await?;
        Ok(())
    }

    async fn modify_message(
        &self,
        message_id: &str,
        add_label_ids: &[String],
        remove_label_ids: &[String],
    ) -> Result<()> {
        let request = ModifyMessageRequest {
            add_label_ids: if add_label_ids.is_empty() {
                None
            } else {
                Some(add_label_ids.to_vec())
            },
            remove_label_ids: if remove_label_ids.is_empty() {
                None
            } else {
                Some(remove_label_ids.to_vec())
            },
        };

        Self::with_timeout(
            "modify_message",
            self.hub
                .users()
                .messages_modify(request, "me", message_id)
                .add_scope("https://www.googleapis.com/auth/gmail.modify")
                .doit(),
        )
        .await?;
        Ok(())
    }

    async fn list_messages_with_label(
        &self,
        label_id: &str,
        page_token: Option<&str>,
    ) -> Result<MessagePage> {
        let mut call = self
            .hub
            .users()
            .messages_list("me")
            .add_label_ids(label_id)
            .max_results(100);

        if let Some(token) = page_token {
            call = call.page_token(token);
        }

        let (_, response) = Self::with_timeout(
            "list_messages_with_label",
            call.add_scope("https://www.googleapis.com/auth/gmail.modify")
                .doit(),
        )
        .await?;

        Ok(MessagePage {
            ids: response
                .messages
                .unwrap_or_default()
                .into_iter()
                .filter_map(|m| m.id)
                .collect(),
            next_page_token: response.next_page_token,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_retry_transient() {
        assert!(GmailApiGateway::should_retry(&SorterError::ServerError {
            status: 503,
            message: "unavailable".to_string(),
        }));
        assert!(GmailApiGateway::should_retry(
            &SorterError::RateLimitExceeded { retry_after: 5 }
        ));
        assert!(GmailApiGateway::should_retry(&SorterError::NetworkError(
            "reset".to_string()
        )));
    }

    #[test]
    fn test_should_not_retry_permanent() {
        assert!(!GmailApiGateway::should_retry(&SorterError::AuthError(
            "bad token".to_string()
        )));
        assert!(!GmailApiGateway::should_retry(&SorterError::ParseError(
            "garbage".to_string()
        )));
    }

    #[tokio::test]
    async fn test_with_retry_succeeds_after_transient_error() {
        use std::sync::atomic::{AtomicU32, Ordering};
        use std::sync::Arc;

        let attempt_count = Arc::new(AtomicU32::new(0));
        let attempt_count_clone = Arc::clone(&attempt_count);

        let result = GmailApiGateway::with_retry("test_op", 3, || {
            let count = Arc::clone(&attempt_count_clone);
            async move {
                let current = count.fetch_add(1, Ordering::SeqCst);
                if current < 2 {
                    Err(SorterError::NetworkError("Connection timeout".to_string()))
                } else {
                    Ok("success".to_string())
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "success");
        assert_eq!(attempt_count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_with_retry_fails_on_permanent_error() {
        use std::sync::atomic::{AtomicU32, Ordering};
        use std::sync::Arc;

        let attempt_count = Arc::new(AtomicU32::new(0));
        let attempt_count_clone = Arc::clone(&attempt_count);

        let result = GmailApiGateway::with_retry("test_op", 3, || {
            let count = Arc::clone(&attempt_count_clone);
            async move {
                count.fetch_add(1, Ordering::SeqCst);
                Err::<String, _>(SorterError::AuthError("Invalid credentials".to_string()))
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(attempt_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_with_retry_exhausts_all_retries() {
        use std::sync::atomic::{AtomicU32, Ordering};
        use std::sync::Arc;

        let attempt_count = Arc::new(AtomicU32::new(0));
        let attempt_count_clone = Arc::clone(&attempt_count);

        let result = GmailApiGateway::with_retry("test_op", 2, || {
            let count = Arc::clone(&attempt_count_clone);
            async move {
                count.fetch_add(1, Ordering::SeqCst);
                Err::<String, _>(SorterError::NetworkError("down".to_string()))
            }
        })
        .await;

        assert!(result.is_err());
        // Initial attempt plus two retries
        assert_eq!(attempt_count.load(Ordering::SeqCst), 3);
    }
}
