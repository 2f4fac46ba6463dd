//! Persisted step configuration

use marathon_api::FetchUri;
use serde::{Deserialize, Serialize};

use crate::errors::DeployError;
use crate::filesys::file::File;

/// Configuration of one deployment step
///
/// Every override is optional. When present it takes precedence over the
/// value found in the descriptor file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepConfig {
    /// Orchestration endpoint, e.g. `http://marathon.mesos:8080`
    pub url: String,

    /// Descriptor filename relative to the workspace
    #[serde(default)]
    pub filename: Option<String>,

    /// Application id override
    #[serde(default)]
    pub app_id: Option<String>,

    /// Docker image override
    #[serde(default)]
    pub docker: Option<String>,

    /// Ask Mesos to pull the image even when cached
    #[serde(default)]
    pub docker_force_pull: bool,

    /// Override a deployment lock held by another deployment
    #[serde(default)]
    pub force_update: bool,

    /// Additional fetch URIs
    #[serde(default)]
    pub uris: Vec<FetchUri>,

    /// Additional labels
    #[serde(default)]
    pub labels: Vec<LabelOverride>,

    /// Which flavour of the API to talk to
    #[serde(default)]
    pub api: ApiVariant,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for StepConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            filename: None,
            app_id: None,
            docker: None,
            docker_force_pull: false,
            force_update: false,
            uris: Vec::new(),
            labels: Vec::new(),
            api: ApiVariant::default(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl StepConfig {
    /// Configuration targeting `url` with no overrides
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Load from a JSON file
    pub async fn load(file: &File) -> Result<Self, DeployError> {
        file.read_json::<StepConfig>().await.map_err(|e| {
            DeployError::ConfigError(format!(
                "Unable to read step configuration {}: {}",
                file.path().display(),
                e
            ))
        })
    }
}

/// A label supplied by the step configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelOverride {
    pub name: String,
    pub value: String,
}

impl LabelOverride {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Orchestration API flavour
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ApiVariant {
    /// Standalone Marathon. Optional basic auth credentials (`user:password`)
    /// are read from the named build variable.
    Marathon {
        #[serde(default)]
        credentials_var: Option<String>,
    },

    /// Marathon behind the DC/OS admin router. The ACS token is read from the
    /// named build variable.
    Dcos { token_var: String },
}

impl Default for ApiVariant {
    fn default() -> Self {
        ApiVariant::Marathon {
            credentials_var: None,
        }
    }
}
