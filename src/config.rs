//! Tunable parameters for the server and the editor session
//!
//! Defaults mirror the production deployment: 200ms debounce, five
//! suggestions, pg_trgm's 0.3 similarity threshold, port 8080.

use std::time::Duration;

use thiserror::Error;
use url::Url;

pub const DEFAULT_DEBOUNCE_MS: u64 = 200;
/// Longest accepted debounce; larger settings are clamped to it
pub const MAX_DEBOUNCE_MS: u64 = 60_000;
pub const DEFAULT_MAX_SUGGESTIONS: usize = 5;
pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.3;
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_SERVER_URL: &str = "ws://127.0.0.1:8080";

/// Invalid client connection target
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid server url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("unsupported url scheme {0:?}, expected ws or wss")]
    UnsupportedScheme(String),
}

/// Client-side completion tunables `{debounce_ms, max_suggestions}`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuggestConfig {
    /// Quiet period after the last edit before a lookup is sent
    pub debounce_ms: u64,
    /// Upper bound on candidates shown for one word
    pub max_suggestions: usize,
}

impl SuggestConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms.min(MAX_DEBOUNCE_MS))
    }
}

impl Default for SuggestConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            max_suggestions: DEFAULT_MAX_SUGGESTIONS,
        }
    }
}

/// Server process configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    /// 0 binds an ephemeral port
    pub port: u16,
    /// Applied by the vocabulary, see `TrigramVocabulary::for_server`
    pub similarity_threshold: f32,
    pub max_suggestions: usize,
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            max_suggestions: DEFAULT_MAX_SUGGESTIONS,
        }
    }
}

/// Editor session configuration: where to connect plus the completion tunables
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub server_url: Url,
    pub suggest: SuggestConfig,
}

impl ClientConfig {
    pub fn new(server_url: Url) -> Self {
        Self {
            server_url,
            suggest: SuggestConfig::default(),
        }
    }

    /// Parses a `ws://` or `wss://` target
    pub fn from_url(server_url: &str) -> Result<Self, ConfigError> {
        let url = Url::parse(server_url)?;
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(ConfigError::UnsupportedScheme(url.scheme().to_string()));
        }
        Ok(Self::new(url))
    }

    pub fn with_suggest(mut self, suggest: SuggestConfig) -> Self {
        self.suggest = suggest;
        self
    }
}
