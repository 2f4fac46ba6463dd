//! Deployment builder
//!
//! Drives the resolver and the overlay in order and renders the final
//! descriptor to the workspace for inspection.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use marathon_api::App;
use tracing::{debug, info};

use crate::config::settings::StepConfig;
use crate::deploy::env::EnvContext;
use crate::deploy::{overlay, resolver};
use crate::errors::DeployError;
use crate::filesys::dir::Dir;
use crate::filesys::file::File;

/// Builder stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStage {
    Empty,
    Read,
    Built,
    Materialized,
}

/// A finalized descriptor written to disk
#[derive(Debug, Clone)]
pub struct MaterializedDescriptor {
    path: PathBuf,
    app: Arc<App>,
}

impl MaterializedDescriptor {
    pub fn new(path: impl Into<PathBuf>, app: App) -> Self {
        Self {
            path: path.into(),
            app: Arc::new(app),
        }
    }

    /// Location of the rendered file
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn app(&self) -> &App {
        &self.app
    }
}

/// Assembles the descriptor for one build
pub struct DeploymentBuilder {
    workspace: Dir,
    config: StepConfig,
    env: EnvContext,
    build_number: Option<u64>,
    stage: BuildStage,
    app: Option<App>,
}

impl DeploymentBuilder {
    pub fn new(workspace: Dir, config: StepConfig, env: EnvContext) -> Self {
        Self {
            workspace,
            config,
            env,
            build_number: None,
            stage: BuildStage::Empty,
            app: None,
        }
    }

    /// Tag the rendered file with the build number
    pub fn with_build_number(mut self, build_number: Option<u64>) -> Self {
        self.build_number = build_number;
        self
    }

    pub fn stage(&self) -> BuildStage {
        self.stage
    }

    /// Read the descriptor file from the workspace
    pub async fn read(&mut self, filename: Option<&str>) -> Result<&mut Self, DeployError> {
        self.expect_stage(BuildStage::Empty, "read")?;

        let app = resolver::read_descriptor(&self.workspace, filename).await?;
        self.app = Some(app);
        self.stage = BuildStage::Read;
        Ok(self)
    }

    /// Apply the configured overrides
    pub fn build(&mut self) -> Result<&App, DeployError> {
        self.expect_stage(BuildStage::Read, "build")?;

        let app = self
            .app
            .take()
            .ok_or_else(|| DeployError::SequenceViolation("no descriptor was read".to_string()))?;
        let app = overlay::apply(app, &self.config, &self.env);
        self.stage = BuildStage::Built;

        let app: &App = self.app.insert(app);
        Ok(app)
    }

    /// Finalized descriptor as pretty JSON
    pub fn to_json(&self) -> Result<String, DeployError> {
        let app = self.built_app("to_json")?;
        Ok(serde_json::to_string_pretty(app)?)
    }

    /// Path the descriptor is rendered to
    pub fn rendered_path(&self) -> PathBuf {
        let name = match self.build_number {
            Some(number) => format!("marathon-rendered-{}.json", number),
            None => "marathon-rendered.json".to_string(),
        };
        self.workspace.path().join(name)
    }

    /// Write the finalized descriptor and hand it over for submission
    pub async fn materialize(&mut self) -> Result<MaterializedDescriptor, DeployError> {
        let app = self.built_app("materialize")?.clone();
        let rendered = self.to_json()?;

        let file = File::new(self.rendered_path());
        file.write_string(&rendered).await?;
        self.stage = BuildStage::Materialized;

        info!("Rendered app '{}' to {}", app.id, file.path().display());
        debug!("Rendered descriptor:\n{}", rendered);

        Ok(MaterializedDescriptor::new(file.path(), app))
    }

    fn built_app(&self, operation: &str) -> Result<&App, DeployError> {
        match (self.stage, self.app.as_ref()) {
            (BuildStage::Built | BuildStage::Materialized, Some(app)) => Ok(app),
            (stage, _) => Err(DeployError::SequenceViolation(format!(
                "{} called in stage {:?}; build must run first",
                operation, stage
            ))),
        }
    }

    fn expect_stage(&self, expected: BuildStage, operation: &str) -> Result<(), DeployError> {
        if self.stage != expected {
            return Err(DeployError::SequenceViolation(format!(
                "{} called in stage {:?}, expected {:?}",
                operation, self.stage, expected
            )));
        }
        Ok(())
    }
}
