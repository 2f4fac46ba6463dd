//! Finite State Machine for app updates

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::DeployError;

/// Retry settings for conflicting updates
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total submissions allowed while the app is locked
    pub max_attempts: u32,

    /// Fixed delay between submissions
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_secs(5),
        }
    }
}

/// Update state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateState {
    /// Submitting the descriptor
    Attempting,

    /// The API accepted the update
    Succeeded,

    /// The app is locked by another deployment
    ConflictRetry,

    /// Gave up
    FailedTerminal,
}

/// Classified result of one submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    Success,
    Conflict,
    Terminal(String),
}

impl UpdateOutcome {
    /// Only an HTTP error status carrying the conflict code (409) is worth
    /// retrying. Every other error status, transport failures included,
    /// ends the update.
    pub fn classify<T>(result: &Result<T, DeployError>) -> Self {
        match result {
            Ok(_) => UpdateOutcome::Success,
            Err(e) if e.is_http_error() && e.is_conflict() => UpdateOutcome::Conflict,
            Err(e) => UpdateOutcome::Terminal(e.to_string()),
        }
    }
}

/// Update event
#[derive(Debug, Clone)]
pub enum UpdateEvent {
    /// A submission finished
    Submitted(UpdateOutcome),

    /// Backoff elapsed, submit again
    Retry,

    /// No attempts left
    Exhausted,
}

/// Update FSM
#[derive(Debug, Clone)]
pub struct UpdateFsm {
    state: UpdateState,
    error: Option<String>,
    attempts: u32,
    max_attempts: u32,
}

impl UpdateFsm {
    /// Create a new FSM ready to submit
    pub fn new(max_attempts: u32) -> Self {
        Self {
            state: UpdateState::Attempting,
            error: None,
            attempts: 0,
            max_attempts,
        }
    }

    /// Get current state
    pub fn state(&self) -> &UpdateState {
        &self.state
    }

    /// Get error message if any
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Submissions made so far
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Process an event and transition state
    pub fn process(&mut self, event: UpdateEvent) -> Result<(), String> {
        let new_state = match (&self.state, &event) {
            // From Attempting
            (UpdateState::Attempting, UpdateEvent::Submitted(outcome)) => {
                self.attempts += 1;
                match outcome {
                    UpdateOutcome::Success => {
                        self.error = None;
                        UpdateState::Succeeded
                    }
                    UpdateOutcome::Conflict => UpdateState::ConflictRetry,
                    UpdateOutcome::Terminal(err) => {
                        self.error = Some(err.clone());
                        UpdateState::FailedTerminal
                    }
                }
            }

            // From ConflictRetry
            (UpdateState::ConflictRetry, UpdateEvent::Retry) if self.can_retry() => {
                UpdateState::Attempting
            }
            (UpdateState::ConflictRetry, UpdateEvent::Exhausted) => {
                self.error = Some(format!(
                    "max retries exceeded after {} attempts",
                    self.attempts
                ));
                UpdateState::FailedTerminal
            }

            // Invalid transitions
            (state, event) => {
                return Err(format!("Invalid transition: {:?} -> {:?}", state, event));
            }
        };

        self.state = new_state;
        Ok(())
    }

    /// Check if another submission is allowed
    pub fn can_retry(&self) -> bool {
        self.state == UpdateState::ConflictRetry && self.attempts < self.max_attempts
    }

    /// Whether the FSM reached a final state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.state,
            UpdateState::Succeeded | UpdateState::FailedTerminal
        )
    }
}
