//! Hub construction and broadcast aggregation over mock sessions.

mod common;

use cloudcast::testing::mocks::{MockSession, MockSessionFactory};
use cloudcast::{DeviceConfig, Message, MessageHub, ProviderConfig};
use serde_json::json;
use std::sync::Arc;
use tempfile::NamedTempFile;
use tokio_test::assert_ok;

fn three_provider_config() -> (DeviceConfig, Vec<NamedTempFile>) {
    let (aws, mut files) = common::aws_arguments();
    let (azure, azure_files) = common::azure_arguments();
    let (google, google_files) = common::google_arguments();
    files.extend(azure_files);
    files.extend(google_files);

    let config = DeviceConfig {
        device_name: "d1".to_string(),
        providers: vec![
            ProviderConfig::Aws(aws),
            ProviderConfig::Azure(azure),
            ProviderConfig::Google(google),
        ],
        reconnect_backoff_ms: None,
    };
    (config, files)
}

fn telemetry() -> Message {
    let mut message = Message::new();
    message.insert("temperature".to_string(), json!(21));
    message
}

#[tokio::test]
async fn test_one_adapter_per_record_in_order() {
    let (config, _files) = three_provider_config();
    let sessions = Arc::new(MockSessionFactory::new());

    let hub = MessageHub::with_session_factory(config, sessions.clone())
        .await
        .unwrap();

    assert_eq!(hub.adapters().len(), 3);
    assert_eq!(hub.provider_names(), vec!["aws", "azure", "google"]);
    assert_eq!(sessions.created_handles().len(), 3);

    // The google session was created with the fully qualified client path.
    let google = sessions.created_handles()[2].clone();
    assert_eq!(
        google.options().unwrap().client_id,
        "projects/my-project/locations/europe-west1/registries/my-registry/devices/d1"
    );
}

#[tokio::test]
async fn test_broadcast_publishes_to_every_provider_topic() {
    let (config, _files) = three_provider_config();
    let sessions = Arc::new(MockSessionFactory::new());
    let hub = MessageHub::with_session_factory(config, sessions.clone())
        .await
        .unwrap();

    let message = telemetry();
    assert!(hub.broadcast(&message).await);

    let expected_payload = serde_json::to_vec(&message).unwrap();
    let handles = sessions.created_handles();
    assert_eq!(
        handles[0].published(),
        vec![("devices/d1/events".to_string(), expected_payload.clone())]
    );
    assert_eq!(
        handles[1].published(),
        vec![(
            "devices/d1/messages/events".to_string(),
            expected_payload.clone()
        )]
    );
    assert_eq!(
        handles[2].published(),
        vec![("/devices/d1/events".to_string(), expected_payload)]
    );
}

#[tokio::test]
async fn test_broadcast_to_subtopic_uses_cloud_conventions() {
    let (config, _files) = three_provider_config();
    let sessions = Arc::new(MockSessionFactory::new());
    let hub = MessageHub::with_session_factory(config, sessions.clone())
        .await
        .unwrap();

    let mut message = Message::new();
    message.insert("a".to_string(), json!(1));
    assert!(hub.broadcast_to_subtopic(&message, "status").await);

    let handles = sessions.created_handles();
    assert_eq!(handles[0].published()[0].0, "devices/d1/events/status");
    assert_eq!(
        handles[1].published()[0].0,
        "devices/d1/messages/events/topic=status"
    );
    assert_eq!(handles[2].published()[0].0, "/devices/d1/events/status");
}

#[tokio::test]
async fn test_single_failing_provider_flips_aggregate_without_blocking_others() {
    let (aws, mut files) = common::aws_arguments();
    let (azure, azure_files) = common::azure_arguments();
    files.extend(azure_files);

    let config = DeviceConfig {
        device_name: "d1".to_string(),
        providers: vec![ProviderConfig::Aws(aws), ProviderConfig::Azure(azure)],
        reconnect_backoff_ms: None,
    };

    let sessions = Arc::new(MockSessionFactory::new());
    sessions.push_session(MockSession::new());
    sessions.push_session(MockSession::failing_publish());

    let hub = MessageHub::with_session_factory(config, sessions.clone())
        .await
        .unwrap();

    let message = telemetry();
    assert!(!hub.broadcast(&message).await);

    let handles = sessions.created_handles();
    // AWS accepted the message, Azure did not.
    assert_eq!(handles[0].published().len(), 1);
    assert!(handles[1].published().is_empty());
}

#[tokio::test]
async fn test_empty_hub_broadcasts_vacuously_true() {
    let config = DeviceConfig {
        device_name: "d1".to_string(),
        providers: Vec::new(),
        reconnect_backoff_ms: None,
    };
    let sessions = Arc::new(MockSessionFactory::new());
    let hub = MessageHub::with_session_factory(config, sessions.clone())
        .await
        .unwrap();

    let mut message = Message::new();
    message.insert("x".to_string(), json!(1));
    assert!(hub.broadcast(&message).await);

    // No sessions were created, so no network calls could have happened.
    assert!(sessions.created_handles().is_empty());
}

#[tokio::test]
async fn test_failing_initial_connect_fails_whole_hub() {
    let (aws, _files) = common::aws_arguments();
    let config = DeviceConfig {
        device_name: "d1".to_string(),
        providers: vec![ProviderConfig::Aws(aws)],
        reconnect_backoff_ms: None,
    };

    let sessions = Arc::new(MockSessionFactory::new());
    sessions.push_session(MockSession::failing_connect());

    let result = MessageHub::with_session_factory(config, sessions).await;
    match result {
        Err(cloudcast::HubError::ProviderInstantiation { provider, .. }) => {
            assert_eq!(provider, "aws");
        }
        Err(other) => panic!("unexpected error kind: {other}"),
        Ok(_) => panic!("expected hub construction to fail"),
    }
}

#[tokio::test]
async fn test_concurrent_broadcasts_all_land() {
    let (config, _files) = three_provider_config();
    let sessions = Arc::new(MockSessionFactory::new());
    let hub =
        tokio_test::assert_ok!(MessageHub::with_session_factory(config, sessions.clone()).await);

    let message = telemetry();
    let results =
        futures::future::join_all((0..10).map(|_| hub.broadcast(&message))).await;
    assert!(results.into_iter().all(|published| published));

    for handle in sessions.created_handles() {
        assert_eq!(handle.published().len(), 10);
    }
}

#[tokio::test]
async fn test_shutdown_disconnects_all_sessions() {
    let (config, _files) = three_provider_config();
    let sessions = Arc::new(MockSessionFactory::new());
    let hub = MessageHub::with_session_factory(config, sessions.clone())
        .await
        .unwrap();

    hub.shutdown().await;
    for handle in sessions.created_handles() {
        assert!(!handle.is_connected());
    }

    // Publishing after shutdown fails without raising.
    assert!(!hub.broadcast(&telemetry()).await);
}
