//! Error types for annotation callback failures
//!
//! Errors are split by when they can occur: `Configuration`, `Connection` and
//! `SchemaConflict` abort callback attachment and must reach the caller,
//! while `Submission` is raised after the agent's run has already completed
//! and is only ever reported, never allowed to interrupt the run result.

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum AnnologError {
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Failed to connect to annotation server at '{url}': {message}")]
    Connection { url: String, message: String },
    #[error(
        "Dataset '{dataset}' exists with incompatible fields: expected {expected:?}, found {found:?}"
    )]
    SchemaConflict {
        dataset: String,
        expected: Vec<String>,
        found: Vec<String>,
    },
    #[error("Record submission failed: {0}")]
    Submission(String),
}

impl From<reqwest::Error> for AnnologError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            AnnologError::Connection {
                url: err
                    .url()
                    .map(|u| u.to_string())
                    .unwrap_or_else(|| "<unknown>".to_string()),
                message: err.to_string(),
            }
        } else {
            AnnologError::Submission(err.to_string())
        }
    }
}
