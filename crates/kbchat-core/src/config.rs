use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8090";
pub const DEFAULT_PREFIX: &str = "/api/v1";
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 15_000; // non-streaming endpoints only

/// Top-level config (kbchat.toml + KBCHAT_* env overrides).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KbchatConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub chat: ChatDefaults,
}

/// Where the chat backend lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Path prefix shared by every endpoint, e.g. `/api/v1`.
    #[serde(default = "default_prefix")]
    pub prefix: String,
    /// Timeout for simple request/response calls. Streaming chat requests
    /// never get an implicit timeout.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            prefix: default_prefix(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl ApiConfig {
    /// Join `base_url`, `prefix` and `path` without doubling slashes.
    pub fn endpoint(&self, path: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        let prefix = self.prefix.trim_matches('/');
        let path = path.trim_start_matches('/');
        if prefix.is_empty() {
            format!("{base}/{path}")
        } else {
            format!("{base}/{prefix}/{path}")
        }
    }
}

/// Values used when the caller does not pick a model or knowledge base.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatDefaults {
    pub model: Option<String>,
    pub rag_tag: Option<String>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}
fn default_prefix() -> String {
    DEFAULT_PREFIX.to_string()
}
fn default_request_timeout_ms() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_MS
}

impl KbchatConfig {
    /// Load config from a TOML file with KBCHAT_* env var overrides.
    ///
    /// File lookup order:
    ///   1. Explicit path argument
    ///   2. ~/.kbchat/kbchat.toml
    ///
    /// A missing file is not an error; defaults apply.
    pub fn load(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);
        debug!(path = %path, "loading config");

        Self::from_figment(
            Figment::new()
                .merge(Toml::file(&path))
                .merge(Env::prefixed("KBCHAT_").split("__")),
        )
    }

    /// Extract and validate from an already assembled figment.
    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: KbchatConfig = figment
            .extract()
            .map_err(|e| ConfigError::Load(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let base = self.api.base_url.trim();
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(ConfigError::Invalid {
                field: "api.base_url",
                reason: format!("expected an http(s) URL, got {base:?}"),
            });
        }
        if self.api.request_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "api.request_timeout_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.kbchat/kbchat.toml", home)
}
