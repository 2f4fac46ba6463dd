//! Update executor
//!
//! Submits a finalized descriptor and retries while Marathon reports the app
//! as locked by another deployment.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use marathon_api::{App, DeploymentResult};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::validate::parse_absolute_url;
use crate::deploy::builder::MaterializedDescriptor;
use crate::deploy::fsm::{RetryPolicy, UpdateEvent, UpdateFsm, UpdateOutcome};
use crate::errors::DeployError;
use crate::http::marathon::AppUpdater;

/// Summary of a successful update
#[derive(Debug, Clone, Serialize)]
pub struct UpdateReport {
    pub app_id: String,
    pub attempts: u32,
    pub deployment: DeploymentResult,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Check the descriptor invariants that must hold before submission
pub fn validate_app(app: &App) -> Result<(), DeployError> {
    if app.id.trim().is_empty() {
        return Err(DeployError::ConfigError(
            "application id is empty; set it in the descriptor or the step configuration"
                .to_string(),
        ));
    }

    for fetch in &app.fetch {
        parse_absolute_url(&fetch.uri).map_err(|e| {
            DeployError::ConfigError(format!("'{}' is not a valid URI: {}", fetch.uri, e))
        })?;
    }

    Ok(())
}

/// Update executor
pub struct UpdateExecutor {
    policy: RetryPolicy,
}

impl UpdateExecutor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// Submit `descriptor` until it is accepted, rejected or retries run out.
    ///
    /// `sleep_fn` performs the backoff wait. Resolving `shutdown_signal`
    /// abandons the update before the next submission or during a wait.
    pub async fn execute<S, F>(
        &self,
        updater: &dyn AppUpdater,
        descriptor: &MaterializedDescriptor,
        sleep_fn: S,
        mut shutdown_signal: Pin<Box<dyn Future<Output = ()> + Send>>,
    ) -> Result<UpdateReport, DeployError>
    where
        S: Fn(Duration) -> F,
        F: Future<Output = ()>,
    {
        let app = descriptor.app();
        validate_app(app)?;

        let started_at = Utc::now();
        let mut fsm = UpdateFsm::new(self.policy.max_attempts);

        loop {
            if (&mut shutdown_signal).now_or_never().is_some() {
                return Err(interrupted(app, &fsm));
            }

            debug!(app_id = %app.id, attempt = fsm.attempts() + 1, "Submitting app update");
            let result = updater.update_app(app).await;

            fsm.process(UpdateEvent::Submitted(UpdateOutcome::classify(&result)))
                .map_err(DeployError::SequenceViolation)?;

            let err = match result {
                Ok(deployment) => {
                    info!(
                        app_id = %app.id,
                        attempts = fsm.attempts(),
                        deployment_id = deployment.deployment_id.as_deref().unwrap_or("-"),
                        "Marathon accepted the update"
                    );
                    return Ok(UpdateReport {
                        app_id: app.id.clone(),
                        attempts: fsm.attempts(),
                        deployment,
                        started_at,
                        finished_at: Utc::now(),
                    });
                }
                Err(err) => err,
            };

            if fsm.is_terminal() {
                warn!(
                    app_id = %app.id,
                    attempts = fsm.attempts(),
                    "Update failed: {}",
                    fsm.error().unwrap_or("unknown error")
                );
                return Err(err);
            }

            if !fsm.can_retry() {
                fsm.process(UpdateEvent::Exhausted)
                    .map_err(DeployError::SequenceViolation)?;
                warn!(
                    app_id = %app.id,
                    attempts = fsm.attempts(),
                    "Giving up: {}",
                    fsm.error().unwrap_or("max retries exceeded")
                );
                return Err(DeployError::MaxRetriesExceeded {
                    app_id: app.id.clone(),
                    attempts: fsm.attempts(),
                });
            }

            warn!(
                app_id = %app.id,
                attempt = fsm.attempts(),
                "App is locked by another deployment, retrying in {:?}: {}",
                self.policy.backoff,
                err
            );

            tokio::select! {
                _ = &mut shutdown_signal => {
                    return Err(interrupted(app, &fsm));
                }
                _ = sleep_fn(self.policy.backoff) => {}
            }

            fsm.process(UpdateEvent::Retry)
                .map_err(DeployError::SequenceViolation)?;
        }
    }
}

fn interrupted(app: &App, fsm: &UpdateFsm) -> DeployError {
    info!(app_id = %app.id, "Update interrupted");
    DeployError::Interrupted(format!(
        "update of '{}' abandoned after {} attempt(s)",
        app.id,
        fsm.attempts()
    ))
}
