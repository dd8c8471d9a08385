//! Pipeline configuration.
//!
//! Use the builder methods to customize behavior:
//!
//! ```
//! use answer_stream::config::PipelineConfig;
//! use std::time::Duration;
//!
//! let config = PipelineConfig::default()
//!     .with_base_url("https://api.example.com")
//!     .with_auth_token("secret")
//!     .with_cooldown(Duration::from_millis(500));
//! assert_eq!(config.stream_url(), "https://api.example.com/v1/stream");
//! ```

use std::time::Duration;

pub use crate::assembler::SourceMerge;
pub use crate::reveal::{RevealConfig, TextUnit};

/// Environment variable overriding the backend base URL.
pub const ENV_BASE_URL: &str = "ANSWER_STREAM_BASE_URL";
/// Environment variable holding the bearer token.
pub const ENV_TOKEN: &str = "ANSWER_STREAM_TOKEN";
/// Environment variable overriding the post-cancel cooldown, in milliseconds.
pub const ENV_COOLDOWN_MS: &str = "ANSWER_STREAM_COOLDOWN_MS";
/// When set (to anything but `0`/`false`), reveals start unpaced.
pub const ENV_NO_PACING: &str = "ANSWER_STREAM_NO_PACING";

const DEFAULT_BASE_URL: &str = "http://localhost:8000";
const DEFAULT_STREAM_PATH: &str = "/v1/stream";

/// Configuration for a [`SessionController`](crate::session::SessionController).
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Backend base URL, without trailing slash
    pub base_url: String,
    /// Path of the streaming answer endpoint
    pub stream_path: String,
    /// Bearer token sent with every request
    pub auth_token: Option<String>,
    /// Quiet window after a cancelled session (default: 300 ms)
    pub cooldown: Duration,
    /// Clear reveal pacing when effects back up behind a running reveal
    pub auto_fast_forward: bool,
    /// Start every session with pacing cleared
    pub start_unpaced: bool,
    pub source_merge: SourceMerge,
    pub reveal: RevealConfig,
    /// Buffered observer events per subscriber before lagging
    pub observer_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            stream_path: DEFAULT_STREAM_PATH.to_string(),
            auth_token: None,
            cooldown: Duration::from_millis(300),
            auto_fast_forward: true,
            start_unpaced: false,
            source_merge: SourceMerge::Concatenate,
            reveal: RevealConfig::default(),
            observer_capacity: 256,
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_stream_path(mut self, path: impl Into<String>) -> Self {
        self.stream_path = path.into();
        self
    }

    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    pub fn with_auto_fast_forward(mut self, enabled: bool) -> Self {
        self.auto_fast_forward = enabled;
        self
    }

    pub fn with_start_unpaced(mut self, unpaced: bool) -> Self {
        self.start_unpaced = unpaced;
        self
    }

    pub fn with_source_merge(mut self, merge: SourceMerge) -> Self {
        self.source_merge = merge;
        self
    }

    pub fn with_reveal(mut self, reveal: RevealConfig) -> Self {
        self.reveal = reveal;
        self
    }

    /// Set the unit reveal slices are measured in.
    pub fn with_text_unit(mut self, unit: TextUnit) -> Self {
        self.reveal.unit = unit;
        self
    }

    pub fn with_observer_capacity(mut self, capacity: usize) -> Self {
        self.observer_capacity = capacity;
        self
    }

    /// Full URL of the streaming endpoint.
    pub fn stream_url(&self) -> String {
        self.endpoint(&self.stream_path)
    }

    /// Join `path` onto the base URL.
    pub fn endpoint(&self, path: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        if path.starts_with('/') {
            format!("{}{}", base, path)
        } else {
            format!("{}/{}", base, path)
        }
    }

    /// Defaults overridden by `ANSWER_STREAM_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env) with a custom variable source.
    ///
    /// Unparseable values are logged and ignored.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup(ENV_BASE_URL).filter(|v| !v.trim().is_empty()) {
            config = config.with_base_url(url.trim());
        }
        if let Some(token) = lookup(ENV_TOKEN).filter(|v| !v.is_empty()) {
            config = config.with_auth_token(token);
        }
        if let Some(raw) = lookup(ENV_COOLDOWN_MS) {
            match raw.trim().parse::<u64>() {
                Ok(ms) => config.cooldown = Duration::from_millis(ms),
                Err(e) => tracing::warn!(
                    var = ENV_COOLDOWN_MS,
                    value = %raw,
                    error = %e,
                    "Ignoring invalid cooldown"
                ),
            }
        }
        if let Some(raw) = lookup(ENV_NO_PACING) {
            let value = raw.trim().to_ascii_lowercase();
            config.start_unpaced = !matches!(value.as_str(), "" | "0" | "false" | "no");
        }

        config
    }
}
