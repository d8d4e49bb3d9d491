use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Connection settings for the transformation service.
#[derive(Clone, Serialize, Deserialize)]
pub struct AssistConfig {
    /// API key sent as the `key` query parameter.
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    /// Base URL up to and including the API version.
    pub endpoint: String,
    pub model: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl AssistConfig {
    /// Load config from environment variables.
    ///
    /// - `FOLIO_API_KEY`, falling back to `GEMINI_API_KEY`
    /// - `FOLIO_ASSIST_ENDPOINT`: base URL (optional)
    /// - `FOLIO_ASSIST_MODEL`: model name (optional)
    /// - `FOLIO_ASSIST_TIMEOUT`: request timeout in seconds (optional)
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        Self {
            api_key: non_empty("FOLIO_API_KEY").or_else(|| non_empty("GEMINI_API_KEY")),
            endpoint: non_empty("FOLIO_ASSIST_ENDPOINT")
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_owned()),
            model: non_empty("FOLIO_ASSIST_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_owned()),
            timeout_secs: non_empty("FOLIO_ASSIST_TIMEOUT")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// URL of the `generateContent` call, without the key.
    pub fn generate_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.endpoint.trim_end_matches('/'),
            self.model
        )
    }
}

impl Default for AssistConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: DEFAULT_ENDPOINT.to_owned(),
            model: DEFAULT_MODEL.to_owned(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

// Keeps the key out of logs.
impl std::fmt::Debug for AssistConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssistConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}
