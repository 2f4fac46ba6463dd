//! Update executor tests

use std::time::Duration;

use deployer::deploy::builder::MaterializedDescriptor;
use deployer::deploy::executor::UpdateExecutor;
use deployer::deploy::fsm::RetryPolicy;
use deployer::errors::DeployError;
use marathon_api::{App, FetchUri};

use crate::common::{no_shutdown, recording_sleep, shutdown_now, FakeUpdater, Reply};

fn descriptor(id: &str) -> MaterializedDescriptor {
    MaterializedDescriptor::new(
        "marathon-rendered.json",
        App {
            id: id.to_string(),
            fetch: vec![FetchUri::new("http://a/x.tgz")],
            ..Default::default()
        },
    )
}

fn executor() -> UpdateExecutor {
    UpdateExecutor::new(RetryPolicy::default())
}

#[tokio::test]
async fn test_accepted_on_first_attempt() {
    let updater = FakeUpdater::always(Reply::Accept);
    let (sleeps, sleep_fn) = recording_sleep();

    let report = executor()
        .execute(&updater, &descriptor("/app"), sleep_fn, no_shutdown())
        .await
        .unwrap();

    assert_eq!(report.app_id, "/app");
    assert_eq!(report.attempts, 1);
    assert_eq!(report.deployment.deployment_id.as_deref(), Some("d-1"));
    assert!(report.finished_at >= report.started_at);
    assert_eq!(updater.calls(), 1);
    assert!(sleeps.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_constant_conflict_stops_after_three_attempts() {
    let updater = FakeUpdater::always(Reply::Status(409));
    let (sleeps, sleep_fn) = recording_sleep();

    let err = executor()
        .execute(&updater, &descriptor("/app"), sleep_fn, no_shutdown())
        .await
        .unwrap_err();

    assert_eq!(updater.calls(), 3);
    assert!(matches!(err, DeployError::MaxRetriesExceeded { attempts: 3, .. }));
    assert!(err.to_string().contains("max retries"));

    // Waits happen between attempts only
    assert_eq!(
        *sleeps.lock().unwrap(),
        vec![Duration::from_secs(5), Duration::from_secs(5)]
    );
}

#[tokio::test]
async fn test_conflict_then_accept() {
    let updater = FakeUpdater::scripted(vec![Reply::Status(409)], Reply::Accept);
    let (sleeps, sleep_fn) = recording_sleep();

    let report = executor()
        .execute(&updater, &descriptor("/app"), sleep_fn, no_shutdown())
        .await
        .unwrap();

    assert_eq!(report.attempts, 2);
    assert_eq!(updater.calls(), 2);
    assert_eq!(sleeps.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_server_error_is_not_retried() {
    let updater = FakeUpdater::always(Reply::Status(500));
    let (sleeps, sleep_fn) = recording_sleep();

    let err = executor()
        .execute(&updater, &descriptor("/app"), sleep_fn, no_shutdown())
        .await
        .unwrap_err();

    assert_eq!(updater.calls(), 1);
    assert!(matches!(err, DeployError::RemoteRejected { status: 500, .. }));
    assert!(sleeps.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_unavailable_is_not_retried() {
    let updater = FakeUpdater::scripted(vec![Reply::Status(409), Reply::Status(503)], Reply::Accept);
    let (_, sleep_fn) = recording_sleep();

    let err = executor()
        .execute(&updater, &descriptor("/app"), sleep_fn, no_shutdown())
        .await
        .unwrap_err();

    assert_eq!(updater.calls(), 2);
    assert!(matches!(err, DeployError::RemoteRejected { status: 503, .. }));
}

#[tokio::test]
async fn test_transport_failure_is_not_retried() {
    let updater = FakeUpdater::always(Reply::Transport);
    let (_, sleep_fn) = recording_sleep();

    let err = executor()
        .execute(&updater, &descriptor("/app"), sleep_fn, no_shutdown())
        .await
        .unwrap_err();

    assert_eq!(updater.calls(), 1);
    assert!(matches!(err, DeployError::Transport(_)));
}

#[tokio::test]
async fn test_empty_app_id_makes_no_calls() {
    let updater = FakeUpdater::always(Reply::Accept);
    let (_, sleep_fn) = recording_sleep();

    let err = executor()
        .execute(&updater, &descriptor(""), sleep_fn, no_shutdown())
        .await
        .unwrap_err();

    assert_eq!(updater.calls(), 0);
    assert!(matches!(err, DeployError::ConfigError(_)));
}

#[tokio::test]
async fn test_pending_shutdown_prevents_submission() {
    let updater = FakeUpdater::always(Reply::Accept);
    let (_, sleep_fn) = recording_sleep();

    let err = executor()
        .execute(&updater, &descriptor("/app"), sleep_fn, shutdown_now())
        .await
        .unwrap_err();

    assert_eq!(updater.calls(), 0);
    assert!(matches!(err, DeployError::Interrupted(_)));
}

#[tokio::test]
async fn test_shutdown_cuts_backoff_short() {
    let updater = FakeUpdater::always(Reply::Status(409));
    let shutdown = Box::pin(tokio::time::sleep(Duration::from_millis(20)));

    // The backoff never finishes on its own
    let err = executor()
        .execute(
            &updater,
            &descriptor("/app"),
            |_| std::future::pending::<()>(),
            shutdown,
        )
        .await
        .unwrap_err();

    assert_eq!(updater.calls(), 1);
    assert!(matches!(err, DeployError::Interrupted(_)));
}

#[test]
fn test_custom_policy_is_honoured() {
    let updater = FakeUpdater::always(Reply::Status(409));
    let (sleeps, sleep_fn) = recording_sleep();
    let policy = RetryPolicy {
        max_attempts: 5,
        backoff: Duration::from_millis(250),
    };

    let err = tokio_test::block_on(UpdateExecutor::new(policy).execute(
        &updater,
        &descriptor("/app"),
        sleep_fn,
        no_shutdown(),
    ))
    .unwrap_err();

    assert!(matches!(err, DeployError::MaxRetriesExceeded { attempts: 5, .. }));
    assert_eq!(updater.calls(), 5);
    assert_eq!(
        *sleeps.lock().unwrap(),
        vec![Duration::from_millis(250); 4]
    );
}
