//! StudyDesk configuration.
//!
//! Precedence: environment (`STUDYDESK__PORT`, `STUDYDESK__ASSISTANT__MODEL`, ...) >
//! TOML file at `STUDYDESK_CONFIG` (default `config/studydesk.toml`) > built-in defaults.
//! The assistant credential is never read from the file; see [`api_key_from_env`].

use crate::catalog::IdAssignment;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Environment variable holding the chat-completion bearer credential.
pub const API_KEY_ENV: &str = "DEEPSEEK_API_KEY";

pub const DEFAULT_API_URL: &str = "https://api.deepseek.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "deepseek-chat";

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    2000
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_min_interval_ms() -> u64 {
    1000
}

/// Assistant client settings (`[assistant]` table).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Nucleus sampling; omitted from the request when unset.
    #[serde(default)]
    pub top_p: Option<f32>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Minimum spacing between two dispatched requests.
    #[serde(default = "default_min_interval_ms")]
    pub min_interval_ms: u64,
    /// When true, a demo-mode answer counts as a dispatch for throttling.
    #[serde(default)]
    pub demo_marks_throttle: bool,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            top_p: None,
            timeout_secs: default_timeout_secs(),
            min_interval_ms: default_min_interval_ms(),
            demo_marks_throttle: false,
        }
    }
}

impl AssistantConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudyConfig {
    pub host: String,
    pub port: u16,
    /// Path of the JSON data file.
    pub data_file: String,
    #[serde(default)]
    pub id_assignment: IdAssignment,
    #[serde(default)]
    pub assistant: AssistantConfig,
}

impl Default for StudyConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            data_file: crate::store::DEFAULT_DATA_FILE.to_string(),
            id_assignment: IdAssignment::default(),
            assistant: AssistantConfig::default(),
        }
    }
}

impl StudyConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config_path = std::env::var("STUDYDESK_CONFIG")
            .unwrap_or_else(|_| "config/studydesk.toml".to_string());
        Self::load_from(Path::new(&config_path))
    }

    /// Loads from `path` (skipped when absent) layered under environment overrides.
    pub fn load_from(path: &Path) -> Result<Self, config::ConfigError> {
        let defaults = Self::default();
        let builder = config::Config::builder()
            .set_default("host", defaults.host)?
            .set_default("port", i64::from(defaults.port))?
            .set_default("data_file", defaults.data_file)?;

        let builder = if path.exists() {
            builder.add_source(config::File::from(path))
        } else {
            builder
        };

        builder
            .add_source(
                config::Environment::with_prefix("STUDYDESK")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Reads the assistant credential. Unset or blank means demo mode.
pub fn api_key_from_env() -> Option<String> {
    std::env::var(API_KEY_ENV)
        .ok()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
}
