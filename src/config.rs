//! Configuration loader and validator for the capture inbox.
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::inbox::DEFAULT_STORE_KEY;
use crate::model::DEFAULT_MAX_ATTACHMENT_BYTES;
use crate::store::validate_key;

/// Environment variable that overrides `decompose.api_key`.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub app: App,
    #[serde(default)]
    pub decompose: Decompose,
}

/// Storage settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct App {
    pub data_dir: String,
    #[serde(default = "default_store_key")]
    pub store_key: String,
    /// Upper bound on the serialized inbox. Defaults to 5 MiB; an explicit
    /// `null` means unbounded.
    #[serde(default = "default_storage_quota")]
    pub storage_quota_bytes: Option<usize>,
    #[serde(default = "default_max_attachment_bytes")]
    pub max_attachment_bytes: usize,
}

/// Task decomposition service settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Decompose {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_store_key() -> String {
    DEFAULT_STORE_KEY.to_string()
}

fn default_storage_quota() -> Option<usize> {
    Some(5 * 1024 * 1024)
}

fn default_max_attachment_bytes() -> usize {
    DEFAULT_MAX_ATTACHMENT_BYTES
}

fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com/".to_string()
}

fn default_timeout_ms() -> u64 {
    15_000
}

impl Default for App {
    fn default() -> Self {
        Self {
            data_dir: "./data".to_string(),
            store_key: default_store_key(),
            storage_quota_bytes: default_storage_quota(),
            max_attachment_bytes: default_max_attachment_bytes(),
        }
    }
}

impl Default for Decompose {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_model(),
            base_url: default_base_url(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl App {
    /// `data_dir` with a leading `~/` expanded to `$HOME`.
    pub fn resolved_data_dir(&self) -> PathBuf {
        if let Some(rest) = self.data_dir.strip_prefix("~/") {
            if let Ok(home) = std::env::var("HOME") {
                return Path::new(&home).join(rest);
            }
        }
        PathBuf::from(&self.data_dir)
    }
}

impl Decompose {
    /// The configured key, unless `GEMINI_API_KEY` is set.
    pub fn resolved_api_key(&self) -> String {
        std::env::var(API_KEY_ENV)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .unwrap_or_else(|| self.api_key.clone())
    }
}

impl Config {
    /// Ensure required directories exist (creates `app.data_dir` if missing).
    pub fn ensure_dirs(&self) -> Result<(), std::io::Error> {
        if self.app.data_dir.trim().is_empty() {
            return Ok(());
        }
        fs::create_dir_all(self.app.resolved_data_dir())
    }
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, uses `capture-inbox.yaml` in the current working directory.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("capture-inbox.yaml"));
    let content = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&content)?;
    validate(&cfg)?;
    Ok(cfg)
}

/// Load `path` if it exists, otherwise fall back to built-in defaults.
pub fn load_or_default(path: &Path) -> Result<Config, ConfigError> {
    if path.exists() {
        load(Some(path))
    } else {
        Ok(Config::default())
    }
}

/// Validate a configuration instance.
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.app.data_dir.trim().is_empty() {
        return Err(ConfigError::Invalid("app.data_dir must be non-empty"));
    }
    if cfg.app.store_key.trim().is_empty() {
        return Err(ConfigError::Invalid("app.store_key must be non-empty"));
    }
    if validate_key(&cfg.app.store_key).is_err() {
        return Err(ConfigError::Invalid(
            "app.store_key may only contain letters, digits, '_', '-' and '.'",
        ));
    }
    if cfg.app.storage_quota_bytes == Some(0) {
        return Err(ConfigError::Invalid("app.storage_quota_bytes must be > 0 when set"));
    }
    if cfg.app.max_attachment_bytes == 0 {
        return Err(ConfigError::Invalid("app.max_attachment_bytes must be > 0"));
    }

    if cfg.decompose.model.trim().is_empty() {
        return Err(ConfigError::Invalid("decompose.model must be non-empty"));
    }
    if cfg.decompose.base_url.trim().is_empty() {
        return Err(ConfigError::Invalid("decompose.base_url must be non-empty"));
    }
    if cfg.decompose.timeout_ms == 0 {
        return Err(ConfigError::Invalid("decompose.timeout_ms must be > 0"));
    }

    Ok(())
}

/// Example YAML content.
pub fn example() -> &'static str {
    r#"app:
  data_dir: "./data"
  store_key: "spark_capture_inbox"
  storage_quota_bytes: 5242880
  max_attachment_bytes: 3145728

decompose:
  api_key: "YOUR_GEMINI_API_KEY"
  model: "gemini-2.5-flash"
  base_url: "https://generativelanguage.googleapis.com/"
  timeout_ms: 15000
"#
}
