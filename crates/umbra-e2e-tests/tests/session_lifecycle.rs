//! Session lifecycle: reconnect after loss, fresh tokens per cycle,
//! shutdown, and event publishing through the ready latch.

mod helpers;

use std::sync::Arc;

use helpers::{TestHarness, wait_until};
use serde_json::json;
use umbra_protocol::document::EventKind;
use umbra_transport::TransportError;

#[tokio::test]
async fn connection_level_update_failure_triggers_reconnect() {
    let harness = TestHarness::start("").await;
    let first = harness.connection();
    wait_until("initial report", || first.update_count() >= 1).await;

    // Fail the acknowledgement of the next power delta at connection
    // level: the session must be presumed dead.
    first.fail_next_update(TransportError::Connection("broker reset".into()));
    first.send_delta(json!({"state": {"powerOn": 1}})).await;

    wait_until("reconnect", || harness.transport.connect_count() >= 2).await;
    wait_until("old session disconnected", || first.is_disconnected()).await;

    let second = harness.connection();
    assert!(!Arc::ptr_eq(&first, &second), "a fresh session was opened");

    // Fresh tokens and store: the new session's initial report carries
    // session-start defaults again.
    wait_until("fresh initial report", || second.update_count() >= 1).await;
    let update: serde_json::Value =
        serde_json::from_slice(&second.updates()[0].payload).unwrap();
    assert_eq!(update["state"]["reported"]["powerOn"], 0);
    assert_eq!(update["state"]["reported"]["temperature"], 35);

    harness.handle.request_shutdown();
}

#[tokio::test]
async fn transport_loss_notification_triggers_reconnect() {
    let harness = TestHarness::start("").await;
    let first = harness.connection();
    wait_until("initial report", || first.update_count() >= 1).await;

    first.drop_connection("link down").await;

    wait_until("reconnect", || harness.transport.connect_count() >= 2).await;
    wait_until("old session disconnected", || first.is_disconnected()).await;

    harness.handle.request_shutdown();
}

#[tokio::test]
async fn shutdown_stops_the_reconnect_loop() {
    let mut harness = TestHarness::start("").await;
    let conn = harness.connection();

    harness.handle.request_shutdown();
    harness.handle.join().await.unwrap();

    assert!(conn.is_disconnected());
    assert_eq!(harness.transport.connect_count(), 1);
}

#[tokio::test]
async fn one_shot_session_ends_without_reconnect() {
    let mut harness = TestHarness::start("continuous = false").await;
    let conn = harness.connection();
    wait_until("initial report", || conn.update_count() >= 1).await;

    conn.drop_connection("link down").await;

    harness.handle.join().await.unwrap();
    assert_eq!(harness.transport.connect_count(), 1);
    assert!(conn.is_disconnected());
}

#[tokio::test]
async fn event_publish_reaches_device_topic() {
    let harness = TestHarness::start("").await;

    harness.handle.publish_event(EventKind::Click).await.unwrap();
    harness.handle.publish_event(EventKind::Hold).await.unwrap();

    let conn = harness.connection();
    let events = conn.published_to("umbra/a4cf12057f30/events/notify");
    assert_eq!(events.len(), 2);

    let first: serde_json::Value = serde_json::from_slice(&events[0].payload).unwrap();
    assert_eq!(first["serialNumber"], "a4cf12057f30");
    assert_eq!(first["clickType"], "SINGLE");
    let second: serde_json::Value = serde_json::from_slice(&events[1].payload).unwrap();
    assert_eq!(second["clickType"], "HOLD");

    assert_eq!(events[0].retry.limit, 10);

    harness.handle.request_shutdown();
}

#[tokio::test]
async fn event_publish_failure_does_not_tear_down_session() {
    let harness = TestHarness::start("").await;
    let conn = harness.connection();

    conn.fail_next_publish(TransportError::Publish("queue full".into()));
    let err = harness.handle.publish_event(EventKind::Click).await;
    assert!(err.is_err());

    // The session is untouched: same connection, and publishing works
    // again.
    harness.handle.publish_event(EventKind::Click).await.unwrap();
    assert_eq!(harness.transport.connect_count(), 1);
    assert!(!conn.is_disconnected());

    harness.handle.request_shutdown();
}

#[tokio::test]
async fn event_publish_blocks_until_a_session_is_ready() {
    // First connect attempt fails; the reconnect loop brings up the
    // session on the second attempt while a caller is already waiting.
    let transport = Arc::new(umbra_transport::MockTransport::new());
    transport.fail_next_connect(TransportError::Connect("refused".into()));

    let handle = umbra_agent::engine::Engine::start(
        umbra_protocol::DeviceIdentity::from_hex(helpers::DEVICE_HEX).unwrap(),
        helpers::test_config(""),
        transport.clone(),
    );

    handle.publish_event(EventKind::Click).await.unwrap();

    assert_eq!(transport.connect_count(), 2);
    let conn = transport.last_connection().unwrap();
    assert_eq!(
        conn.published_to("umbra/a4cf12057f30/events/notify").len(),
        1
    );

    handle.request_shutdown();
}
