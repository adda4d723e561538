//! quizrun configuration and store factory.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use quizrun_core::recorder::RecorderConfig;
use quizrun_core::traits::AttemptStore;

use crate::json_file::JsonFileStore;
use crate::memory::MemoryStore;

/// Where finished attempts are kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StoreConfig {
    /// Lost when the process exits.
    Memory,
    Json {
        #[serde(default = "default_store_path")]
        path: PathBuf,
    },
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::Json {
            path: default_store_path(),
        }
    }
}

fn default_store_path() -> PathBuf {
    PathBuf::from("quizrun-attempts.json")
}

/// Retry settings for the attempt recorder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecorderSettings {
    /// Retries after a failed write.
    #[serde(default = "default_retries")]
    pub max_retries: u32,
    /// Delay before the first retry in milliseconds; doubles per retry.
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,
}

fn default_retries() -> u32 {
    2
}
fn default_retry_delay() -> u64 {
    200
}

impl Default for RecorderSettings {
    fn default() -> Self {
        Self {
            max_retries: default_retries(),
            retry_delay_ms: default_retry_delay(),
        }
    }
}

impl RecorderSettings {
    pub fn to_recorder_config(&self) -> RecorderConfig {
        RecorderConfig {
            max_retries: self.max_retries,
            retry_delay: Duration::from_millis(self.retry_delay_ms),
        }
    }
}

/// Top-level quizrun configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizrunConfig {
    /// Directory (or single file) quizzes are loaded from.
    #[serde(default = "default_quiz_dir")]
    pub quiz_dir: PathBuf,
    /// Subject id used when none is given on the command line.
    #[serde(default = "default_subject")]
    pub default_subject: String,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub recorder: RecorderSettings,
}

fn default_quiz_dir() -> PathBuf {
    PathBuf::from("quizzes")
}
fn default_subject() -> String {
    "local".to_string()
}

impl Default for QuizrunConfig {
    fn default() -> Self {
        Self {
            quiz_dir: default_quiz_dir(),
            default_subject: default_subject(),
            store: StoreConfig::default(),
            recorder: RecorderSettings::default(),
        }
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
///
/// Substituted values are not expanded again.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    let mut from = 0;
    while let Some(offset) = result[from..].find("${") {
        let start = from + offset;
        let Some(end) = result[start..].find('}') else {
            break;
        };
        let value = std::env::var(&result[start + 2..start + end]).unwrap_or_default();
        result.replace_range(start..start + end + 1, &value);
        from = start + value.len();
    }
    result
}

fn resolve_path(path: &Path) -> PathBuf {
    PathBuf::from(resolve_env_vars(&path.to_string_lossy()))
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `quizrun.toml` in the current directory
/// 2. `~/.config/quizrun/config.toml`
///
/// Environment variable overrides: `QUIZRUN_STORE_PATH`, `QUIZRUN_SUBJECT`.
pub fn load_config() -> Result<QuizrunConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<QuizrunConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("quizrun.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|home| home.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            let config = parse_config(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?;
            tracing::debug!(path = %path.display(), "config loaded");
            config
        }
        None => QuizrunConfig::default(),
    };

    Ok(apply_env_overrides(config, |key| std::env::var(key).ok()))
}

/// Parse a config document and expand `${VAR}` references.
pub fn parse_config(content: &str) -> Result<QuizrunConfig> {
    let mut config: QuizrunConfig = toml::from_str(content)?;
    config.quiz_dir = resolve_path(&config.quiz_dir);
    config.default_subject = resolve_env_vars(&config.default_subject);
    if let StoreConfig::Json { path } = &mut config.store {
        *path = resolve_path(path);
    }
    Ok(config)
}

fn apply_env_overrides(
    mut config: QuizrunConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> QuizrunConfig {
    if let Some(path) = lookup("QUIZRUN_STORE_PATH").filter(|p| !p.is_empty()) {
        config.store = StoreConfig::Json {
            path: PathBuf::from(path),
        };
    }
    if let Some(subject) = lookup("QUIZRUN_SUBJECT").filter(|s| !s.is_empty()) {
        config.default_subject = subject;
    }
    config
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("quizrun"))
}

/// Create a store instance from its configuration.
pub fn create_store(config: &StoreConfig) -> Arc<dyn AttemptStore> {
    match config {
        StoreConfig::Memory => Arc::new(MemoryStore::new()),
        StoreConfig::Json { path } => Arc::new(JsonFileStore::new(path.clone())),
    }
}
