//! Batch email classification via the Gemini API
//!
//! The sorter sends one classification request per pass: the configured
//! category names, recent history entries as in-context examples, and the
//! batch of (id, snippet) pairs. The model is asked for a JSON array of
//! `{"id", "category"}` records; replies are routinely wrapped in markdown
//! code fences, so the parser strips those before deserializing.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::error::{Result, SorterError};
use crate::models::{HistoryEntry, MessageSummary};

/// One classification decision for one message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Decision {
    pub id: String,
    pub category: String,
}

/// External text classifier, consumed as a collaborator
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Send a prompt, returning the raw model text
    async fn classify(&self, prompt: &str) -> Result<String>;
}

#[async_trait]
impl<T: Classifier + ?Sized> Classifier for std::sync::Arc<T> {
    async fn classify(&self, prompt: &str) -> Result<String> {
        (**self).classify(prompt).await
    }
}

/// Build the batch classification prompt
pub fn build_prompt(
    category_names: &[String],
    history: &[HistoryEntry],
    messages: &[MessageSummary],
) -> String {
    let mut prompt = String::new();

    prompt.push_str(
        "Classify each of the following emails into one of these categories: ",
    );
    prompt.push_str(&category_names.join(", "));
    prompt.push_str(
        ".\nIf none of the categories fits an email logically, you may propose a new \
         short category name.\nRespond with only a JSON array of objects of the form \
         {\"id\": \"<message id>\", \"category\": \"<category name>\"}, one per email, \
         with no other text.\n",
    );

    if !history.is_empty() {
        prompt.push_str("\nPast classifications for reference:\n");
        for entry in history {
            prompt.push_str(&format!("- \"{}\" -> {}\n", entry.snippet, entry.category));
        }
    }

    prompt.push_str("\nEmails:\n");
    for message in messages {
        prompt.push_str(&format!("[{}] {}\n", message.id, message.snippet));
    }

    prompt
}

static CODE_FENCE: Lazy<Regex> = Lazy::new(|| {
    // Opening fence with optional language tag, body, closing fence
    Regex::new(r"(?s)^```[a-zA-Z]*\s*\n?(.*?)\n?```$").unwrap()
});

/// Strip a surrounding markdown code fence, if present
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    match CODE_FENCE.captures(trimmed) {
        Some(caps) => caps.get(1).map(|m| m.as_str().trim()).unwrap_or(trimmed),
        None => trimmed,
    }
}

/// Parse the raw classifier reply into per-message decisions
///
/// A malformed reply is a hard error for the pass; there is no decision to
/// act on without it.
pub fn parse_reply(raw: &str) -> Result<Vec<Decision>> {
    let body = strip_code_fence(raw);
    let decisions: Vec<Decision> = serde_json::from_str(body).map_err(|e| {
        SorterError::ParseError(format!(
            "expected a JSON array of {{id, category}} records: {} (reply: {:.120})",
            e, body
        ))
    })?;

    if decisions.iter().any(|d| d.id.is_empty()) {
        return Err(SorterError::ParseError(
            "classifier reply contains a record with an empty id".to_string(),
        ));
    }

    Ok(decisions)
}

#[derive(Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
}

#[derive(Serialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Serialize, Deserialize)]
struct GeminiPart {
    text: String,
}

#[derive(Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
    error: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: GeminiCandidateContent,
}

#[derive(Deserialize)]
struct GeminiCandidateContent {
    parts: Vec<GeminiPart>,
}

/// Gemini generateContent client
pub struct GeminiClassifier {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl GeminiClassifier {
    pub const DEFAULT_BASE_URL: &'static str =
        "https://generativelanguage.googleapis.com/v1beta";

    pub fn new(model: impl Into<String>, api_key: impl Into<String>, timeout: Duration) -> Self {
        Self::with_base_url(Self::DEFAULT_BASE_URL, model, api_key, timeout)
    }

    /// Point the client at a different endpoint (used by tests)
    pub fn with_base_url(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            base_url: base_url.into(),
            model: model.into(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl Classifier for GeminiClassifier {
    async fn classify(&self, prompt: &str) -> Result<String> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );

        let request = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart {
                    text: prompt.to_string(),
                }],
            }],
        };

        debug!("Sending classification request to model {}", self.model);
        let response = self.client.post(&url).json(&request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = format!("HTTP {}: {:.200}", status.as_u16(), body);
            return Err(match status.as_u16() {
                401 | 403 => SorterError::AuthError(message),
                429 => SorterError::RateLimitExceeded { retry_after: 5 },
                500..=599 => SorterError::ServerError {
                    status: status.as_u16(),
                    message,
                },
                _ => SorterError::ClassificationError(message),
            });
        }

        let parsed: GeminiResponse = response.json().await?;

        if let Some(error) = parsed.error {
            return Err(SorterError::ClassificationError(error.to_string()));
        }

        parsed
            .candidates
            .and_then(|mut c| {
                if c.is_empty() {
                    None
                } else {
                    c.remove(0).content.parts.into_iter().next()
                }
            })
            .map(|part| part.text)
            .ok_or_else(|| {
                SorterError::ClassificationError(
                    "No candidate or text part in response".to_string(),
                )
            })
    }
}
