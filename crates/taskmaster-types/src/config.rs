//! Configuration loading for taskmaster.
//!
//! Layered config: defaults -> config file -> env vars -> CLI flags.
//! The default config file lives at ~/.config/taskmaster/config.toml.

use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::error::TaskmasterError;

/// How search terms are normalized before they are looked up.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QueryNormalization {
    /// Query terms go through the same tokenizer as indexed text
    #[default]
    Unified,
    /// Lower-case and trim only; punctuation is kept, so "report," never
    /// matches the indexed token "report"
    TrimOnly,
}

/// Tuning for the in-memory task index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexSettings {
    /// Append a task id at most once per token.
    /// When false, a task whose title and description both contain a word
    /// is listed twice under that word.
    #[serde(default)]
    pub dedupe_postings: bool,

    #[serde(default)]
    pub query_normalization: QueryNormalization,

    /// Minimum length (in characters) a word needs to become a token.
    #[serde(default = "default_min_token_chars")]
    pub min_token_chars: usize,
}

fn default_min_token_chars() -> usize {
    3
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            dedupe_postings: false,
            query_normalization: QueryNormalization::default(),
            min_token_chars: default_min_token_chars(),
        }
    }
}

impl IndexSettings {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), TaskmasterError> {
        if self.min_token_chars == 0 {
            return Err(TaskmasterError::InvalidInput(
                "min_token_chars must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn with_dedupe_postings(mut self, dedupe: bool) -> Self {
        self.dedupe_postings = dedupe;
        self
    }

    pub fn with_query_normalization(mut self, mode: QueryNormalization) -> Self {
        self.query_normalization = mode;
        self
    }
}

/// Credentials accepted by the static verifier.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthSettings {
    /// Bearer token -> user id
    #[serde(default)]
    pub tokens: HashMap<String, String>,
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Path to the JSON task collection
    #[serde(default = "default_tasks_path")]
    pub tasks_path: String,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Include internal error details in responses
    #[serde(default)]
    pub debug_mode: bool,

    #[serde(default)]
    pub index: IndexSettings,

    #[serde(default)]
    pub auth: AuthSettings,
}

fn default_tasks_path() -> String {
    ProjectDirs::from("", "", "taskmaster")
        .map(|p| p.data_local_dir().join("tasks.json"))
        .unwrap_or_else(|| PathBuf::from("./tasks.json"))
        .to_string_lossy()
        .to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tasks_path: default_tasks_path(),
            log_level: default_log_level(),
            debug_mode: false,
            index: IndexSettings::default(),
            auth: AuthSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings with layered precedence:
    /// 1. Built-in defaults
    /// 2. Config file (~/.config/taskmaster/config.toml)
    /// 3. CLI-specified config file (optional)
    /// 4. Environment variables (TASKMASTER_*, nested keys joined by `__`)
    ///
    /// CLI flags should be applied by the caller after this returns.
    pub fn load(cli_config_path: Option<&str>) -> Result<Self, TaskmasterError> {
        let config_dir = ProjectDirs::from("", "", "taskmaster")
            .map(|p| p.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        let default_config_path = config_dir.join("config");

        let mut builder = Config::builder()
            .set_default("tasks_path", default_tasks_path())
            .map_err(|e| TaskmasterError::Config(e.to_string()))?
            .set_default("log_level", default_log_level())
            .map_err(|e| TaskmasterError::Config(e.to_string()))?
            .set_default("index.min_token_chars", default_min_token_chars() as i64)
            .map_err(|e| TaskmasterError::Config(e.to_string()))?
            .add_source(File::with_name(&default_config_path.to_string_lossy()).required(false));

        if let Some(path) = cli_config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // Format: TASKMASTER_TASKS_PATH, TASKMASTER_INDEX__DEDUPE_POSTINGS, etc.
        builder = builder.add_source(
            Environment::with_prefix("TASKMASTER")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| TaskmasterError::Config(e.to_string()))?;

        let settings: Settings = config
            .try_deserialize()
            .map_err(|e| TaskmasterError::Config(e.to_string()))?;

        settings.index.validate()?;
        Ok(settings)
    }

    /// Expand ~ in tasks_path to the home directory
    pub fn expanded_tasks_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.tasks_path).into_owned())
    }
}
