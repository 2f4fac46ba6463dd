//! Post-build deployment step
//!
//! Entry point used by the build host once per build.

use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::app::options::StepOptions;
use crate::config::settings::StepConfig;
use crate::deploy::builder::DeploymentBuilder;
use crate::deploy::env::EnvContext;
use crate::deploy::executor::{UpdateExecutor, UpdateReport};
use crate::errors::DeployError;
use crate::filesys::dir::Dir;
use crate::http::marathon::{AppUpdater, MarathonClient};

/// Build result as tracked by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildResult {
    Success,
    Unstable,
    Failure,
    Aborted,
}

/// What the host hands to the step
#[derive(Debug, Clone)]
pub struct BuildContext {
    /// Result so far; `None` while the build is still running
    pub result: Option<BuildResult>,

    /// Workspace root
    pub workspace: PathBuf,

    /// Build environment
    pub env: HashMap<String, String>,

    /// Build parameters, overriding `env`
    pub build_variables: HashMap<String, String>,

    pub build_number: Option<u64>,
}

impl BuildContext {
    pub fn new(workspace: impl Into<PathBuf>) -> Self {
        Self {
            result: None,
            workspace: workspace.into(),
            env: HashMap::new(),
            build_variables: HashMap::new(),
            build_number: None,
        }
    }

    /// Deploy only builds that have not failed so far
    pub fn should_deploy(&self) -> bool {
        matches!(self.result, None | Some(BuildResult::Success))
    }

    /// Environment with build variables applied
    pub fn env_context(&self) -> EnvContext {
        EnvContext::new(self.env.clone()).with_overrides(&self.build_variables)
    }

    fn fail(&mut self, err: &DeployError) {
        warn!("{}", err);
        self.result = Some(match err {
            DeployError::Interrupted(_) => BuildResult::Aborted,
            _ => BuildResult::Failure,
        });
    }
}

/// Marathon deployment step
pub struct DeployStep {
    config: StepConfig,
    options: StepOptions,
}

impl DeployStep {
    pub fn new(config: StepConfig, options: StepOptions) -> Self {
        Self { config, options }
    }

    /// Deploy against the configured Marathon.
    ///
    /// Returns whether the build is still successful afterwards. Failures are
    /// recorded on `ctx.result`.
    pub async fn perform(
        &self,
        ctx: &mut BuildContext,
        shutdown_signal: Pin<Box<dyn Future<Output = ()> + Send>>,
    ) -> bool {
        if !ctx.should_deploy() {
            info!("Skipping Marathon deployment, build result is {:?}", ctx.result);
            return false;
        }

        let client = match MarathonClient::from_config(&self.config, &ctx.env_context()) {
            Ok(client) => client,
            Err(e) => {
                ctx.fail(&e);
                return false;
            }
        };

        self.perform_with(ctx, &client, tokio::time::sleep, shutdown_signal)
            .await
    }

    /// Deploy through `updater`, waiting between retries with `sleep_fn`
    pub async fn perform_with<S, F>(
        &self,
        ctx: &mut BuildContext,
        updater: &dyn AppUpdater,
        sleep_fn: S,
        shutdown_signal: Pin<Box<dyn Future<Output = ()> + Send>>,
    ) -> bool
    where
        S: Fn(Duration) -> F,
        F: Future<Output = ()>,
    {
        if !ctx.should_deploy() {
            info!("Skipping Marathon deployment, build result is {:?}", ctx.result);
            return false;
        }

        match self.deploy(ctx, updater, sleep_fn, shutdown_signal).await {
            Ok(report) => {
                info!(
                    "Deployed app '{}' to {} in {} attempt(s)",
                    report.app_id, self.config.url, report.attempts
                );
            }
            Err(e) => ctx.fail(&e),
        }

        ctx.should_deploy()
    }

    async fn deploy<S, F>(
        &self,
        ctx: &BuildContext,
        updater: &dyn AppUpdater,
        sleep_fn: S,
        shutdown_signal: Pin<Box<dyn Future<Output = ()> + Send>>,
    ) -> Result<UpdateReport, DeployError>
    where
        S: Fn(Duration) -> F,
        F: Future<Output = ()>,
    {
        let mut builder = DeploymentBuilder::new(
            Dir::new(&ctx.workspace),
            self.config.clone(),
            ctx.env_context(),
        )
        .with_build_number(ctx.build_number);

        builder.read(self.config.filename.as_deref()).await?;
        builder.build()?;
        let descriptor = builder.materialize().await?;

        UpdateExecutor::new(self.options.retry.clone())
            .execute(updater, &descriptor, sleep_fn, shutdown_signal)
            .await
    }
}
