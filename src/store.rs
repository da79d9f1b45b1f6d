//! Persisted category and history state
//!
//! The sorter keeps its durable state (category list, classification history)
//! in a small key-value store with a hard per-item byte quota, matching the
//! sync-storage backend the settings UI writes to. The store itself is a
//! collaborator: this module defines the interface, a JSON-file
//! implementation, and an in-memory implementation for tests and dry runs.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{Result, SorterError};
use crate::models::{Category, HistoryEntry};

/// Hard per-item quota enforced by the backing store (8 KiB)
pub const QUOTA_BYTES_PER_ITEM: usize = 8192;

/// Storage key for the category list
pub const KEY_CATEGORIES: &str = "categories";
/// Storage key for the classification history log
pub const KEY_HISTORY: &str = "categorizationHistory";

/// Minimal key-value store interface
///
/// `set` must reject any value whose serialized form exceeds
/// [`QUOTA_BYTES_PER_ITEM`] with [`SorterError::QuotaExceeded`].
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>>;
    async fn set(&self, key: &str, value: Value) -> Result<()>;
    /// Write several keys as one persisted update
    async fn set_many(&self, entries: Vec<(String, Value)>) -> Result<()>;
}

fn check_item_quota(key: &str, value: &Value) -> Result<usize> {
    let size = serde_json::to_string(value)?.len();
    if size > QUOTA_BYTES_PER_ITEM {
        return Err(SorterError::QuotaExceeded(format!(
            "item '{}' is {} bytes, quota is {}",
            key, size, QUOTA_BYTES_PER_ITEM
        )));
    }
    Ok(size)
}

/// JSON-document store persisted to a single file
///
/// All keys live in one object; every write persists the whole document,
/// so multi-key updates are atomic with respect to the file contents.
pub struct FileStore {
    path: PathBuf,
    cache: Mutex<Option<HashMap<String, Value>>>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: Mutex::new(None),
        }
    }

    async fn load_document(&self) -> Result<HashMap<String, Value>> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| SorterError::StorageError(format!("Failed to read state file: {}", e)))?;
        if content.trim().is_empty() {
            return Ok(HashMap::new());
        }
        serde_json::from_str(&content)
            .map_err(|e| SorterError::StorageError(format!("Corrupt state file: {}", e)))
    }

    async fn persist(&self, doc: &HashMap<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(doc)?;
        tokio::fs::write(&self.path, json)
            .await
            .map_err(|e| SorterError::StorageError(format!("Failed to write state file: {}", e)))?;
        debug!("Persisted state to {:?}", self.path);
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let mut cache = self.cache.lock().await;
        if cache.is_none() {
            *cache = Some(self.load_document().await?);
        }
        Ok(cache.as_ref().and_then(|doc| doc.get(key).cloned()))
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        self.set_many(vec![(key.to_string(), value)]).await
    }

    async fn set_many(&self, entries: Vec<(String, Value)>) -> Result<()> {
        for (key, value) in &entries {
            check_item_quota(key, value)?;
        }
        let mut cache = self.cache.lock().await;
        let mut doc = match cache.take() {
            Some(doc) => doc,
            None => self.load_document().await?,
        };
        for (key, value) in entries {
            doc.insert(key, value);
        }
        self.persist(&doc).await?;
        *cache = Some(doc);
        Ok(())
    }
}

/// In-memory store for tests and dry runs
#[derive(Default, Clone)]
pub struct MemoryStore {
    items: Arc<Mutex<HashMap<String, Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.items.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        check_item_quota(key, &value)?;
        self.items.lock().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn set_many(&self, entries: Vec<(String, Value)>) -> Result<()> {
        for (key, value) in &entries {
            check_item_quota(key, value)?;
        }
        let mut items = self.items.lock().await;
        for (key, value) in entries {
            items.insert(key, value);
        }
        Ok(())
    }
}

/// Typed accessors over the raw key-value store
pub struct StateStore<S> {
    store: S,
}

impl<S: KeyValueStore> StateStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn inner(&self) -> &S {
        &self.store
    }

    pub async fn load_categories(&self) -> Result<Vec<Category>> {
        match self.store.get(KEY_CATEGORIES).await? {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => Ok(Vec::new()),
        }
    }

    pub async fn save_categories(&self, categories: &[Category]) -> Result<()> {
        self.store
            .set(KEY_CATEGORIES, serde_json::to_value(categories)?)
            .await
    }

    pub async fn load_history(&self) -> Result<Vec<HistoryEntry>> {
        match self.store.get(KEY_HISTORY).await? {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => Ok(Vec::new()),
        }
    }

    pub async fn save_history(&self, history: &[HistoryEntry]) -> Result<()> {
        self.store
            .set(KEY_HISTORY, serde_json::to_value(history)?)
            .await
    }

    /// Clear categories and history in a single persisted write
    pub async fn clear_classification_state(&self) -> Result<()> {
        self.store
            .set_many(vec![
                (KEY_CATEGORIES.to_string(), Value::Array(Vec::new())),
                (KEY_HISTORY.to_string(), Value::Array(Vec::new())),
            ])
            .await
    }
}
