//! Marathon client tests against a local mock API

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, Method, StatusCode, Uri},
    Json, Router,
};
use deployer::config::settings::{ApiVariant, StepConfig};
use deployer::deploy::builder::MaterializedDescriptor;
use deployer::deploy::env::EnvContext;
use deployer::deploy::executor::UpdateExecutor;
use deployer::deploy::fsm::RetryPolicy;
use deployer::errors::DeployError;
use deployer::http::marathon::{AppUpdater, MarathonClient};
use marathon_api::App;
use serde_json::{json, Value};
use tokio::net::TcpListener;

use crate::common::{no_shutdown, recording_sleep};

/// A request seen by the mock API
#[derive(Debug, Clone)]
struct Recorded {
    method: Method,
    path: String,
    query: Option<String>,
    authorization: Option<String>,
    body: Value,
}

#[derive(Clone, Default)]
struct MockMarathon {
    statuses: Arc<Mutex<VecDeque<u16>>>,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl MockMarathon {
    fn with_statuses(statuses: &[u16]) -> Self {
        let mock = Self::default();
        mock.statuses.lock().unwrap().extend(statuses.iter().copied());
        mock
    }

    fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    async fn serve(&self) -> SocketAddr {
        let app = Router::new().fallback(handle).with_state(self.clone());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }
}

async fn handle(
    State(mock): State<MockMarathon>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, Json<Value>) {
    mock.requests.lock().unwrap().push(Recorded {
        method,
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        authorization: headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body: serde_json::from_slice(&body).unwrap_or(Value::Null),
    });

    let status = mock.statuses.lock().unwrap().pop_front().unwrap_or(200);
    let body = match status {
        200 | 201 => json!({"version": "2025-01-01T00:00:00.000Z", "deploymentId": "d-42"}),
        409 => json!({
            "message": "App is locked by one or more deployments.",
            "deployments": [{"id": "d-0"}]
        }),
        _ => json!({"message": "boom"}),
    };
    (StatusCode::from_u16(status).unwrap(), Json(body))
}

fn app(id: &str) -> App {
    App::from_json(&format!(
        r#"{{"id":"{}","cpus":0.1,"uris":["http://a/x.tgz"]}}"#,
        id
    ))
    .unwrap()
}

#[tokio::test]
async fn test_update_puts_descriptor() {
    let mock = MockMarathon::with_statuses(&[200]);
    let addr = mock.serve().await;

    let config = StepConfig::new(format!("http://{}", addr));
    let client = MarathonClient::from_config(&config, &EnvContext::default()).unwrap();

    let deployment = client.update_app(&app("/team/web")).await.unwrap();
    assert_eq!(deployment.deployment_id.as_deref(), Some("d-42"));

    let requests = mock.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, Method::PUT);
    assert_eq!(requests[0].path, "/v2/apps/team/web");
    assert_eq!(requests[0].query, None);
    assert_eq!(requests[0].authorization, None);
    assert_eq!(requests[0].body["id"], "/team/web");
    assert_eq!(requests[0].body["cpus"], 0.1);
    assert_eq!(requests[0].body["fetch"][0]["uri"], "http://a/x.tgz");
    assert!(requests[0].body.get("uris").is_none());
}

#[tokio::test]
async fn test_rejection_carries_status_and_message() {
    let mock = MockMarathon::with_statuses(&[422]);
    let addr = mock.serve().await;

    let config = StepConfig::new(format!("http://{}", addr));
    let client = MarathonClient::from_config(&config, &EnvContext::default()).unwrap();

    match client.update_app(&app("/web")).await {
        Err(DeployError::RemoteRejected { status, message }) => {
            assert_eq!(status, 422);
            assert_eq!(message, "boom");
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[tokio::test]
async fn test_conflict_is_retried_against_api() {
    let mock = MockMarathon::with_statuses(&[409, 409, 200]);
    let addr = mock.serve().await;

    let config = StepConfig::new(format!("http://{}", addr));
    let client = MarathonClient::from_config(&config, &EnvContext::default()).unwrap();
    let descriptor = MaterializedDescriptor::new("marathon-rendered.json", app("/web"));
    let (sleeps, sleep_fn) = recording_sleep();

    let report = UpdateExecutor::new(RetryPolicy::default())
        .execute(&client, &descriptor, sleep_fn, no_shutdown())
        .await
        .unwrap();

    assert_eq!(report.attempts, 3);
    assert_eq!(mock.requests().len(), 3);
    assert_eq!(sleeps.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_dcos_variant_sends_token_and_force() {
    let mock = MockMarathon::with_statuses(&[200]);
    let addr = mock.serve().await;

    let mut config = StepConfig::new(format!("http://{}", addr));
    config.api = ApiVariant::Dcos {
        token_var: "DCOS_TOKEN".to_string(),
    };
    config.force_update = true;
    let env = EnvContext::from_iter([("DCOS_TOKEN", "abc")]);
    let client = MarathonClient::from_config(&config, &env).unwrap();

    client.update_app(&app("/web")).await.unwrap();

    let requests = mock.requests();
    assert_eq!(requests[0].path, "/service/marathon/v2/apps/web");
    assert_eq!(requests[0].query.as_deref(), Some("force=true"));
    assert_eq!(requests[0].authorization.as_deref(), Some("token=abc"));
}

#[tokio::test]
async fn test_marathon_basic_auth() {
    let mock = MockMarathon::with_statuses(&[201]);
    let addr = mock.serve().await;

    let mut config = StepConfig::new(format!("http://{}", addr));
    config.api = ApiVariant::Marathon {
        credentials_var: Some("MARATHON_CREDENTIALS".to_string()),
    };
    let env = EnvContext::from_iter([("MARATHON_CREDENTIALS", "user:pass")]);
    let client = MarathonClient::from_config(&config, &env).unwrap();

    client.update_app(&app("/web")).await.unwrap();

    assert_eq!(
        mock.requests()[0].authorization.as_deref(),
        Some("Basic dXNlcjpwYXNz")
    );
}

#[tokio::test]
async fn test_unreachable_api_is_transport_failure() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let config = StepConfig::new(format!("http://{}", addr));
    let client = MarathonClient::from_config(&config, &EnvContext::default()).unwrap();

    let err = client.update_app(&app("/web")).await.unwrap_err();
    assert!(matches!(err, DeployError::Transport(_)));
}
