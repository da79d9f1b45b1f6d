//! Label reconciliation
//!
//! Maps a category name to a durable Gmail label id (creating the label if
//! absent) and files a message under it with a single modify call that also
//! removes it from the inbox. Resolved ids are cached for the lifetime of the
//! reconciler (one run), so repeated categories cost one label listing at
//! most and never a second create.

use std::collections::HashMap;
use tracing::{debug, info};

use crate::error::Result;
use crate::gateway::{MailGateway, INBOX_LABEL_ID};

pub struct LabelReconciler<'a, G: MailGateway + ?Sized> {
    gateway: &'a G,
    resolved: HashMap<String, String>,
}

impl<'a, G: MailGateway + ?Sized> LabelReconciler<'a, G> {
    pub fn new(gateway: &'a G) -> Self {
        Self {
            gateway,
            resolved: HashMap::new(),
        }
    }

    /// Resolve a category name to a label id, creating the label if needed
    ///
    /// The provider does not enforce name uniqueness; the first match wins.
    /// A create racing another create can still produce a duplicate name,
    /// which is an accepted limitation.
    pub async fn resolve(&mut self, category_name: &str) -> Result<String> {
        if let Some(id) = self.resolved.get(category_name) {
            return Ok(id.clone());
        }

        let labels = self.gateway.list_labels().await?;
        let label_id = match labels.into_iter().find(|l| l.name == category_name) {
            Some(label) => {
                debug!("Found existing label '{}' ({})", category_name, label.id);
                label.id
            }
            None => {
                let id = self.gateway.create_label(category_name).await?;
                info!("Created label '{}' ({})", category_name, id);
                id
            }
        };

        self.resolved
            .insert(category_name.to_string(), label_id.clone());
        Ok(label_id)
    }

    /// File a message under a category: add its label, remove INBOX
    ///
    /// The combined modify both moves and files the message; there is no
    /// separate un-inbox step. On failure the message is left unmodified in
    /// the inbox and is not retried within the run.
    pub async fn file_message(&mut self, message_id: &str, category_name: &str) -> Result<()> {
        let label_id = self.resolve(category_name).await?;

        self.gateway
            .modify_message(
                message_id,
                &[label_id],
                &[INBOX_LABEL_ID.to_string()],
            )
            .await?;

        debug!("Filed message {} under '{}'", message_id, category_name);
        Ok(())
    }
}
