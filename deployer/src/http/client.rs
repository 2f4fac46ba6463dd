//! HTTP client implementation

use std::time::Duration;

use marathon_api::ErrorResponse;
use reqwest::{header, Client, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, error};

use crate::errors::DeployError;

/// Credentials attached to every request
#[derive(Debug, Default)]
pub enum Auth {
    #[default]
    None,

    /// HTTP basic auth
    Basic {
        username: String,
        password: SecretString,
    },

    /// DC/OS ACS token
    Token(SecretString),
}

/// HTTP client for the orchestration API
pub struct HttpClient {
    client: Client,
    base_url: String,
    auth: Auth,
}

impl HttpClient {
    /// Create a new HTTP client
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, DeployError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth: Auth::None,
        })
    }

    /// Attach credentials
    pub fn with_auth(mut self, auth: Auth) -> Self {
        self.auth = auth;
        self
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Make a PUT request
    ///
    /// Non-success statuses become [`DeployError::RemoteRejected`] carrying the
    /// status code and the API's message.
    pub async fn put<T: DeserializeOwned + Default, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, DeployError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("PUT {}", url);

        let request = self.authorize(self.client.put(&url).json(body));
        let response = request.send().await?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();

        if !status.is_success() {
            error!("HTTP PUT failed: {} - {}", status, text);
            return Err(DeployError::RemoteRejected {
                status: status.as_u16(),
                message: error_message(status, &text),
            });
        }

        if text.trim().is_empty() {
            return Ok(T::default());
        }
        match serde_json::from_str(&text) {
            Ok(body) => Ok(body),
            Err(e) => {
                debug!("Ignoring unexpected response body ({}): {}", e, text);
                Ok(T::default())
            }
        }
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.auth {
            Auth::None => request,
            Auth::Basic { username, password } => {
                request.basic_auth(username, Some(password.expose_secret()))
            }
            Auth::Token(token) => request.header(
                header::AUTHORIZATION,
                format!("token={}", token.expose_secret()),
            ),
        }
    }
}

fn error_message(status: reqwest::StatusCode, body: &str) -> String {
    serde_json::from_str::<ErrorResponse>(body)
        .ok()
        .and_then(|e| e.summary())
        .or_else(|| Some(body.trim().to_string()).filter(|b| !b.is_empty()))
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_string()
        })
}
