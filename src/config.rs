use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::engine::ActionPolicy;
use crate::error::{GmailError, Result};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub rules: RulesConfig,
    #[serde(default)]
    pub execution: ExecutionConfig,
    #[serde(default)]
    pub labels: LabelConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Gmail search query used when listing messages; empty lists everything
    #[serde(default)]
    pub query: String,
    #[serde(default = "default_max_results")]
    pub max_results: u32,
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_requests: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            query: String::new(),
            max_results: default_max_results(),
            max_concurrent_requests: default_max_concurrent(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RulesConfig {
    #[serde(default = "default_rules_path")]
    pub path: PathBuf,
    #[serde(default)]
    pub action_policy: ActionPolicy,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            path: default_rules_path(),
            action_policy: ActionPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default = "default_max_concurrent_messages")]
    pub max_concurrent_messages: usize,
    #[serde(default = "default_action_timeout_secs")]
    pub action_timeout_secs: u64,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            max_concurrent_messages: default_max_concurrent_messages(),
            action_timeout_secs: default_action_timeout_secs(),
        }
    }
}

impl ExecutionConfig {
    pub fn action_timeout(&self) -> Duration {
        Duration::from_secs(self.action_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LabelConfig {
    /// Create `move_message` destinations that do not exist yet
    #[serde(default)]
    pub create_missing: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

fn default_max_results() -> u32 {
    100
}

fn default_max_concurrent() -> usize {
    40
}

fn default_rules_path() -> PathBuf {
    PathBuf::from("rules.json")
}

fn default_max_concurrent_messages() -> usize {
    8
}

fn default_action_timeout_secs() -> u64 {
    30
}

fn default_store_path() -> PathBuf {
    PathBuf::from(".gmail-rules/emails.db")
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
            .map_err(|e| GmailError::ConfigError(format!("Failed to read config file: {}", e)))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| GmailError::ConfigError(format!("Failed to parse config file: {}", e)))?;

        config.validate()?;

        tracing::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                GmailError::ConfigError(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| GmailError::ConfigError(format!("Failed to serialize config: {}", e)))?;

        tokio::fs::write(path, content)
            .await
            .map_err(|e| GmailError::ConfigError(format!("Failed to write config file: {}", e)))?;

        tracing::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        // Gmail pages messages.list at 500
        if self.sync.max_results == 0 {
            return Err(GmailError::ConfigError(
                "sync.max_results must be at least 1".to_string(),
            ));
        }
        if self.sync.max_results > 500 {
            return Err(GmailError::ConfigError(
                "sync.max_results cannot exceed 500".to_string(),
            ));
        }

        if self.sync.max_concurrent_requests == 0 {
            return Err(GmailError::ConfigError(
                "sync.max_concurrent_requests must be at least 1".to_string(),
            ));
        }
        if self.sync.max_concurrent_requests > 50 {
            return Err(GmailError::ConfigError(
                "sync.max_concurrent_requests cannot exceed 50 (to stay under Gmail API rate limits of 250 units/sec)".to_string(),
            ));
        }

        if self.rules.path.as_os_str().is_empty() {
            return Err(GmailError::ConfigError(
                "rules.path cannot be empty".to_string(),
            ));
        }

        if self.execution.max_concurrent_messages == 0 {
            return Err(GmailError::ConfigError(
                "execution.max_concurrent_messages must be at least 1".to_string(),
            ));
        }
        if self.execution.max_concurrent_messages > 64 {
            return Err(GmailError::ConfigError(
                "execution.max_concurrent_messages cannot exceed 64".to_string(),
            ));
        }

        if self.execution.action_timeout_secs == 0 {
            return Err(GmailError::ConfigError(
                "execution.action_timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.store.path.as_os_str().is_empty() {
            return Err(GmailError::ConfigError(
                "store.path cannot be empty".to_string(),
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

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.sync.query, "");
        assert_eq!(config.sync.max_results, 100);
        assert_eq!(config.sync.max_concurrent_requests, 40);

        assert_eq!(config.rules.path, PathBuf::from("rules.json"));
        assert_eq!(config.rules.action_policy, ActionPolicy::AllRules);

        assert!(!config.execution.dry_run);
        assert_eq!(config.execution.max_concurrent_messages, 8);
        assert_eq!(config.execution.action_timeout(), Duration::from_secs(30));

        assert!(!config.labels.create_missing);
        assert_eq!(config.store.path, PathBuf::from(".gmail-rules/emails.db"));
    }

    #[test]
    fn test_config_validation_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_config_validation_max_results_bounds() {
        let mut config = Config::default();

        config.sync.max_results = 0;
        assert!(config.validate().unwrap_err().to_string().contains("at least 1"));

        config.sync.max_results = 501;
        assert!(config.validate().unwrap_err().to_string().contains("cannot exceed 500"));

        config.sync.max_results = 1;
        assert!(config.validate().is_ok());
        config.sync.max_results = 500;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_max_concurrent_zero() {
        let mut config = Config::default();
        config.sync.max_concurrent_requests = 0;
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("at least 1"));
    }

    #[test]
    fn test_config_validation_max_concurrent_too_high() {
        let mut config = Config::default();
        config.sync.max_concurrent_requests = 51;
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("cannot exceed 50"));
    }

    #[test]
    fn test_config_validation_message_concurrency() {
        let mut config = Config::default();

        config.execution.max_concurrent_messages = 0;
        assert!(config.validate().is_err());

        config.execution.max_concurrent_messages = 65;
        assert!(config
            .validate()
            .unwrap_err()
            .to_string()
            .contains("max_concurrent_messages cannot exceed 64"));

        config.execution.max_concurrent_messages = 64;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_zero_timeout() {
        let mut config = Config::default();
        config.execution.action_timeout_secs = 0;
        assert!(config
            .validate()
            .unwrap_err()
            .to_string()
            .contains("action_timeout_secs must be greater than 0"));
    }

    #[test]
    fn test_config_validation_empty_paths() {
        let mut config = Config::default();
        config.rules.path = PathBuf::new();
        assert!(config.validate().unwrap_err().to_string().contains("rules.path"));

        let mut config = Config::default();
        config.store.path = PathBuf::new();
        assert!(config.validate().unwrap_err().to_string().contains("store.path"));
    }

    #[tokio::test]
    async fn test_config_load_save_roundtrip() {
        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path();

        let mut config = Config::default();
        config.sync.query = "in:inbox newer_than:30d".to_string();
        config.rules.action_policy = ActionPolicy::MatchedRules;
        config.save(path).await.unwrap();

        let loaded = Config::load(path).await.unwrap();

        assert_eq!(loaded.sync.query, "in:inbox newer_than:30d");
        assert_eq!(loaded.rules.action_policy, ActionPolicy::MatchedRules);
        assert_eq!(loaded.execution.max_concurrent_messages, 8);
    }

    #[tokio::test]
    async fn test_config_load_nonexistent_returns_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("missing.toml")).await.unwrap();

        assert_eq!(config.sync.max_results, 100);
        assert_eq!(config.sync.max_concurrent_requests, 40);
    }

    #[tokio::test]
    async fn test_config_load_invalid_toml() {
        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path();

        tokio::fs::write(path, "this is not valid toml {[}]")
            .await
            .unwrap();

        let result = Config::load(path).await;
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Failed to parse config file"));
    }

    #[tokio::test]
    async fn test_config_load_unknown_policy() {
        let temp_file = NamedTempFile::new().unwrap();
        tokio::fs::write(temp_file.path(), "[rules]\naction_policy = \"first_match\"\n")
            .await
            .unwrap();

        assert!(matches!(
            Config::load(temp_file.path()).await,
            Err(GmailError::ConfigError(_))
        ));
    }

    #[tokio::test]
    async fn test_config_partial_with_defaults() {
        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path();

        let partial_config = r#"
[rules]
action_policy = "matched_rules"

[execution]
dry_run = true
"#;
        tokio::fs::write(path, partial_config).await.unwrap();

        let config = Config::load(path).await.unwrap();

        assert_eq!(config.rules.action_policy, ActionPolicy::MatchedRules);
        assert!(config.execution.dry_run);

        assert_eq!(config.rules.path, PathBuf::from("rules.json"));
        assert_eq!(config.sync.max_concurrent_requests, 40);
        assert_eq!(config.execution.action_timeout_secs, 30);
    }

    #[tokio::test]
    async fn test_config_create_example() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        Config::create_example(&path).await.unwrap();
        assert!(path.exists());

        let config = Config::load(&path).await.unwrap();
        assert_eq!(config.sync.max_results, 100);
    }
}
