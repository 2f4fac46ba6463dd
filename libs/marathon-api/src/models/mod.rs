//! API models

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Marathon application definition
///
/// Only the fields the deployer touches are typed. Everything else in the
/// definition is carried through `extra` untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct App {
    /// Application id, e.g. `/team/web`
    #[serde(default)]
    pub id: String,

    /// Container settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container: Option<Container>,

    /// Resources fetched into the sandbox before launch
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fetch: Vec<FetchUri>,

    /// Legacy plain URI list. Folded into `fetch` by [`App::normalize`].
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub uris: Vec<String>,

    /// Application labels
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl App {
    /// Parse an app definition and normalize legacy fields
    pub fn from_json(contents: &str) -> Result<Self, serde_json::Error> {
        let mut app: App = serde_json::from_str(contents)?;
        app.normalize();
        Ok(app)
    }

    /// Move legacy `uris` entries into `fetch`.
    ///
    /// Marathon rejects definitions carrying both, so after this call only
    /// `fetch` is populated. Legacy entries keep their order ahead of any
    /// existing fetch entries.
    pub fn normalize(&mut self) {
        if self.uris.is_empty() {
            return;
        }

        let mut fetch: Vec<FetchUri> = self.uris.drain(..).map(FetchUri::new).collect();
        fetch.append(&mut self.fetch);
        self.fetch = fetch;
    }

    /// Docker image, if the app runs in a Docker container
    pub fn docker_image(&self) -> Option<&str> {
        self.container
            .as_ref()
            .and_then(|c| c.docker.as_ref())
            .map(|d| d.image.as_str())
            .filter(|image| !image.is_empty())
    }

    /// Set the Docker image, creating the container blocks when missing
    pub fn set_docker_image(&mut self, image: impl Into<String>) -> &mut DockerContainer {
        let container = self.container.get_or_insert_with(|| Container {
            kind: Some("DOCKER".to_string()),
            ..Default::default()
        });
        let docker = container.docker.get_or_insert_with(DockerContainer::default);
        docker.image = image.into();
        docker
    }

    /// Path segment for this app under `/v2/apps`
    pub fn path_id(&self) -> &str {
        self.id.trim_start_matches('/')
    }
}

/// Container block of an app definition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    /// Container type: `DOCKER` or `MESOS`
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docker: Option<DockerContainer>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Docker settings of a container
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DockerContainer {
    #[serde(default)]
    pub image: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub force_pull_image: Option<bool>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A fetched resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchUri {
    /// Absolute URL of the resource
    pub uri: String,

    /// Extract archives after download
    #[serde(default = "default_true")]
    pub extract: bool,

    /// Mark the downloaded file executable
    #[serde(default)]
    pub executable: bool,

    /// Use the Mesos fetcher cache
    #[serde(default)]
    pub cache: bool,
}

fn default_true() -> bool {
    true
}

impl FetchUri {
    /// Fetch entry with Marathon's default flags
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            extract: true,
            executable: false,
            cache: false,
        }
    }
}

/// Body returned when an update is accepted
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentResult {
    #[serde(default)]
    pub version: Option<String>,

    #[serde(default)]
    pub deployment_id: Option<String>,
}

/// Reference to a running deployment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentRef {
    pub id: String,
}

/// Error response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(default)]
    pub message: Option<String>,

    #[serde(default)]
    pub details: Option<Value>,

    /// Deployments locking the app (409 responses)
    #[serde(default)]
    pub deployments: Option<Vec<DeploymentRef>>,
}

impl ErrorResponse {
    /// Human readable summary for operators
    pub fn summary(&self) -> Option<String> {
        let message = self.message.as_deref()?;
        let mut summary = message.to_string();

        if let Some(deployments) = self.deployments.as_ref().filter(|d| !d.is_empty()) {
            let ids: Vec<&str> = deployments.iter().map(|d| d.id.as_str()).collect();
            summary.push_str(&format!(" (deployments: {})", ids.join(", ")));
        }
        if let Some(details) = self.details.as_ref().filter(|d| !d.is_null()) {
            summary.push_str(&format!(" {}", details));
        }

        Some(summary)
    }
}
