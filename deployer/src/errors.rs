//! Error types for the deployer

use http::StatusCode;
use thiserror::Error;

/// Main error type for the deployment step
#[derive(Error, Debug)]
pub enum DeployError {
    #[error("Deployment file missing: {0}")]
    FileMissing(String),

    #[error("Deployment file invalid: {0}")]
    FileInvalid(String),

    #[error("Marathon rejected the update ({status}): {message}")]
    RemoteRejected { status: u16, message: String },

    #[error("Hit max retries ({attempts}) while trying to update Marathon application {app_id}")]
    MaxRetriesExceeded { app_id: String, attempts: u32 },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Sequence violation: {0}")]
    SequenceViolation(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Interrupted: {0}")]
    Interrupted(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl DeployError {
    /// The app is locked by a deployment already in progress
    pub fn is_conflict(&self) -> bool {
        matches!(self, DeployError::RemoteRejected { status, .. } if *status == StatusCode::CONFLICT.as_u16())
    }

    /// Whether the API answered with a client or server error status
    pub fn is_http_error(&self) -> bool {
        matches!(self, DeployError::RemoteRejected { status, .. } if (400..600).contains(status))
    }
}

impl From<reqwest::Error> for DeployError {
    fn from(err: reqwest::Error) -> Self {
        DeployError::Transport(err.to_string())
    }
}

impl From<url::ParseError> for DeployError {
    fn from(err: url::ParseError) -> Self {
        DeployError::ConfigError(err.to_string())
    }
}
