//! Marathon apps API

use std::time::Duration;

use async_trait::async_trait;
use marathon_api::{App, DeploymentResult};
use secrecy::SecretString;
use tracing::debug;
use url::Url;

use crate::config::settings::{ApiVariant, StepConfig};
use crate::deploy::env::EnvContext;
use crate::errors::DeployError;
use crate::http::client::{Auth, HttpClient};

/// Path prefix of Marathon behind the DC/OS admin router
const DCOS_MARATHON_PREFIX: &str = "/service/marathon";

/// Submits app definitions to an orchestration API
#[async_trait]
pub trait AppUpdater: Send + Sync {
    /// Create or replace the app, returning the started deployment
    async fn update_app(&self, app: &App) -> Result<DeploymentResult, DeployError>;
}

/// Marathon client for one API flavour
pub struct MarathonClient {
    http: HttpClient,
    prefix: &'static str,
    force: bool,
}

impl MarathonClient {
    /// Select the API flavour from the step configuration.
    ///
    /// Credentials named by the configuration are looked up in `env`.
    pub fn from_config(config: &StepConfig, env: &EnvContext) -> Result<Self, DeployError> {
        let url = Url::parse(&config.url)?;

        let (prefix, auth) = match &config.api {
            ApiVariant::Marathon { credentials_var } => {
                let auth = match credentials_var {
                    Some(var) => basic_auth(var, env)?,
                    None => Auth::None,
                };
                ("", auth)
            }
            ApiVariant::Dcos { token_var } => {
                let token = env.get(token_var).filter(|t| !t.is_empty()).ok_or_else(|| {
                    DeployError::ConfigError(format!("token variable {} is not set", token_var))
                })?;
                (
                    DCOS_MARATHON_PREFIX,
                    Auth::Token(SecretString::from(token.to_string())),
                )
            }
        };

        let http = HttpClient::new(url.as_str(), Duration::from_secs(config.timeout_secs))?
            .with_auth(auth);

        Ok(Self {
            http,
            prefix,
            force: config.force_update,
        })
    }

    /// Request path for updating `app`
    pub fn app_path(&self, app: &App) -> String {
        let mut path = format!("{}/v2/apps/{}", self.prefix, app.path_id());
        if self.force {
            path.push_str("?force=true");
        }
        path
    }
}

#[async_trait]
impl AppUpdater for MarathonClient {
    async fn update_app(&self, app: &App) -> Result<DeploymentResult, DeployError> {
        let path = self.app_path(app);
        debug!("Updating app '{}' at {}{}", app.id, self.http.base_url(), path);
        self.http.put(&path, app).await
    }
}

fn basic_auth(var: &str, env: &EnvContext) -> Result<Auth, DeployError> {
    let credentials = env.get(var).ok_or_else(|| {
        DeployError::ConfigError(format!("credentials variable {} is not set", var))
    })?;
    let (username, password) = credentials.split_once(':').ok_or_else(|| {
        DeployError::ConfigError(format!("credentials variable {} must be user:password", var))
    })?;

    Ok(Auth::Basic {
        username: username.to_string(),
        password: SecretString::from(password.to_string()),
    })
}
