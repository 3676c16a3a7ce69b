//! Callback configuration
//!
//! Configuration follows a layered approach: explicit constructor arguments
//! win, then environment variables, then the well-known local-server
//! defaults. Falling back to a default URL or key is almost always a sign of
//! a development setup, so both fallbacks log a warning.

use serde::{Deserialize, Serialize};

use crate::errors::AnnologError;

pub const DEFAULT_API_URL: &str = "http://localhost:6900";
pub const DEFAULT_API_KEY: &str = "annolog.apikey";

const API_URL_ENV: &str = "ANNOLOG_API_URL";
const API_KEY_ENV: &str = "ANNOLOG_API_KEY";

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_api_key() -> String {
    DEFAULT_API_KEY.to_string()
}

fn default_guidelines() -> String {
    "You're asked to rate the quality of the response and provide feedback.".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnologConfig {
    /// Name of the remote dataset records are submitted to. Created with the
    /// default feedback schema if it does not exist yet.
    pub dataset_name: String,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_api_key")]
    pub api_key: String,
    /// When enabled, step transcript fragments are accumulated and persisted
    /// in a `transcript` field alongside prompt and response.
    #[serde(default)]
    pub log_transcript: bool,
    /// Annotation guidelines attached to the dataset on creation. Ignored
    /// when the dataset already exists.
    #[serde(default = "default_guidelines")]
    pub guidelines: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl AnnologConfig {
    pub fn new(
        dataset_name: impl Into<String>,
        api_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            dataset_name: dataset_name.into(),
            api_url: api_url.into(),
            api_key: api_key.into(),
            log_transcript: false,
            guidelines: default_guidelines(),
            timeout_secs: default_timeout_secs(),
        }
    }

    /// Builds a config from `ANNOLOG_API_URL` / `ANNOLOG_API_KEY`, warning
    /// when either falls back to the local-server default.
    pub fn from_env(dataset_name: impl Into<String>) -> Self {
        let api_url = std::env::var(API_URL_ENV).unwrap_or_else(|_| {
            log::warn!(
                "Using default api_url='{}'. Set {} to override.",
                DEFAULT_API_URL,
                API_URL_ENV
            );
            default_api_url()
        });
        let api_key = std::env::var(API_KEY_ENV).unwrap_or_else(|_| {
            log::warn!(
                "Using default api_key='{}'. Set {} to override.",
                DEFAULT_API_KEY,
                API_KEY_ENV
            );
            default_api_key()
        });
        Self::new(dataset_name, api_url, api_key)
    }

    pub fn with_transcript(mut self, log_transcript: bool) -> Self {
        self.log_transcript = log_transcript;
        self
    }

    pub fn with_guidelines(mut self, guidelines: impl Into<String>) -> Self {
        self.guidelines = guidelines.into();
        self
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Rejects configurations the callback must not attach with. Runs before
    /// any network call.
    pub fn validate(&self) -> Result<(), AnnologError> {
        if self.dataset_name.trim().is_empty() {
            return Err(AnnologError::Configuration(
                "dataset_name must not be empty".to_string(),
            ));
        }
        if self.api_url.trim().is_empty() {
            return Err(AnnologError::Configuration(
                "api_url must not be empty".to_string(),
            ));
        }
        if self.api_key.trim().is_empty() {
            return Err(AnnologError::Configuration(
                "api_key must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
