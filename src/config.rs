use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Result, SorterError};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub categories: CategoryConfig,
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Master toggle. When off, a triggered pass is skipped without side effects.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_credentials_path")]
    pub credentials_path: String,
    #[serde(default = "default_token_cache_path")]
    pub token_cache_path: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            credentials_path: default_credentials_path(),
            token_cache_path: default_token_cache_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Seconds between sorting passes in watch mode
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Seconds before the first pass after startup
    #[serde(default = "default_initial_delay_secs")]
    pub initial_delay_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            initial_delay_secs: default_initial_delay_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Gemini model name
    #[serde(default = "default_model")]
    pub model: String,
    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Per-call timeout in seconds
    #[serde(default = "default_classifier_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_classifier_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryConfig {
    /// Admit unseen category names proposed by the classifier
    #[serde(default)]
    pub auto_create: bool,
    /// Cap on the number of auto-generated categories
    #[serde(default = "default_auto_create_limit")]
    pub auto_create_limit: usize,
}

impl Default for CategoryConfig {
    fn default() -> Self {
        Self {
            auto_create: false,
            auto_create_limit: default_auto_create_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Operations run concurrently per chunk
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Pause between chunks (and between label pages during reset)
    #[serde(default = "default_inter_chunk_delay_ms")]
    pub inter_chunk_delay_ms: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            inter_chunk_delay_ms: default_inter_chunk_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Maximum retained history entries
    #[serde(default = "default_history_max_entries")]
    pub max_entries: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_entries: default_history_max_entries(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path of the JSON state document (categories and history)
    #[serde(default = "default_state_path")]
    pub state_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            state_path: default_state_path(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_credentials_path() -> String {
    "credentials.json".to_string()
}

fn default_token_cache_path() -> String {
    ".gmail-sorter/token.json".to_string()
}

fn default_interval_secs() -> u64 {
    120
}

fn default_initial_delay_secs() -> u64 {
    60
}

fn default_model() -> String {
    "gemini-2.0-flash-lite".to_string()
}

fn default_api_key_env() -> String {
    "GEMINI_API_KEY".to_string()
}

fn default_classifier_timeout_secs() -> u64 {
    30
}

fn default_auto_create_limit() -> usize {
    10
}

fn default_chunk_size() -> usize {
    10
}

fn default_inter_chunk_delay_ms() -> u64 {
    1000
}

fn default_history_max_entries() -> usize {
    50
}

fn default_state_path() -> String {
    ".gmail-sorter/state.json".to_string()
}

impl Config {
    pub async fn load(path: &Path) -> Result<Self> {
        // If file doesn't exist, return default config with warning
        if !path.exists() {
            tracing::warn!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| SorterError::ConfigError(format!("Failed to read config file: {}", e)))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| SorterError::ConfigError(format!("Failed to parse config file: {}", e)))?;

        config.validate()?;

        tracing::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                SorterError::ConfigError(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| SorterError::ConfigError(format!("Failed to serialize config: {}", e)))?;

        tokio::fs::write(path, content)
            .await
            .map_err(|e| SorterError::ConfigError(format!("Failed to write config file: {}", e)))?;

        tracing::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.schedule.interval_secs == 0 {
            return Err(SorterError::ConfigError(
                "schedule.interval_secs must be at least 1".to_string(),
            ));
        }

        if self.batch.chunk_size == 0 {
            return Err(SorterError::ConfigError(
                "batch.chunk_size must be at least 1".to_string(),
            ));
        }
        // Per-message fetches cost 5 quota units each against Gmail's
        // 250 units/sec budget
        if self.batch.chunk_size > 50 {
            return Err(SorterError::ConfigError(
                "batch.chunk_size cannot exceed 50 (to stay under Gmail API rate limits)"
                    .to_string(),
            ));
        }

        if self.classifier.model.is_empty() {
            return Err(SorterError::ConfigError(
                "classifier.model cannot be empty".to_string(),
            ));
        }
        if self.classifier.timeout_secs == 0 {
            return Err(SorterError::ConfigError(
                "classifier.timeout_secs must be at least 1".to_string(),
            ));
        }

        if self.history.max_entries == 0 {
            return Err(SorterError::ConfigError(
                "history.max_entries must be at least 1".to_string(),
            ));
        }

        tracing::debug!("Configuration validation passed");
        Ok(())
    }

    /// Create an example configuration file
    pub async fn create_example(path: &Path) -> Result<()> {
        let config = Self::default();
        config.save(path).await
    }
}
