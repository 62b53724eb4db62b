//! Integration tests for the callback server.
//!
//! These tests start a real HTTP server, send actual NOTIFY requests,
//! and verify what comes out of the notification channel.

use callback_server::{CallbackServer, NotificationPayload};
use reqwest::Method;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;

const EVENT_XML: &str = r#"<?xml version="1.0"?>
<e:propertyset xmlns:e="urn:schemas-upnp-org:event-1-0">
    <e:property>
        <LastChange>&lt;Event&gt;&lt;InstanceID val="0"&gt;&lt;Volume Channel="Master" val="6"/&gt;&lt;/InstanceID&gt;&lt;/Event&gt;</LastChange>
    </e:property>
</e:propertyset>"#;

fn notify() -> Method {
    Method::from_bytes(b"NOTIFY").unwrap()
}

async fn start() -> (CallbackServer, mpsc::UnboundedReceiver<NotificationPayload>) {
    let (tx, rx) = mpsc::unbounded_channel::<NotificationPayload>();
    let server = CallbackServer::new((0, 0), tx)
        .await
        .expect("Failed to create callback server");
    (server, rx)
}

fn url(server: &CallbackServer, path: &str) -> String {
    server.callback_url("127.0.0.1".parse().unwrap(), path)
}

#[tokio::test]
async fn test_notify_is_routed_by_path() {
    let (server, mut rx) = start().await;
    server.router().register("kitchen".to_string()).await;
    server.router().register("bath".to_string()).await;

    let client = reqwest::Client::new();
    let response = client
        .request(notify(), url(&server, "kitchen"))
        .header("SID", "uuid:sub-kitchen")
        .header("NT", "upnp:event")
        .header("NTS", "upnp:propchange")
        .header("Content-Type", "text/xml")
        .body(EVENT_XML)
        .send()
        .await
        .expect("Failed to send NOTIFY");
    assert_eq!(response.status(), 200);

    let notification = timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("Timeout waiting for notification")
        .expect("No notification received");

    assert_eq!(notification.path, "kitchen");
    assert_eq!(notification.sid.as_deref(), Some("uuid:sub-kitchen"));
    assert!(notification.event_xml.contains("LastChange"));

    server.shutdown().await;
}

#[tokio::test]
async fn test_notify_without_upnp_headers_is_accepted() {
    let (server, mut rx) = start().await;
    server.router().register("kitchen".to_string()).await;

    let response = reqwest::Client::new()
        .request(notify(), url(&server, "kitchen"))
        .body(EVENT_XML)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let notification = timeout(Duration::from_secs(1), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(notification.sid, None);

    server.shutdown().await;
}

#[tokio::test]
async fn test_unregistered_path_is_not_found() {
    let (server, mut rx) = start().await;
    server.router().register("kitchen".to_string()).await;

    let client = reqwest::Client::new();
    for path in ["bath", "kitchen/extra", ""] {
        let response = client
            .request(notify(), url(&server, path))
            .body("<event/>")
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 404, "path {path:?}");
    }

    let nothing = timeout(Duration::from_millis(100), rx.recv()).await;
    assert!(nothing.is_err(), "unregistered paths must not produce notifications");

    server.shutdown().await;
}

#[tokio::test]
async fn test_bad_notification_headers_are_rejected() {
    let (server, mut rx) = start().await;
    server.router().register("kitchen".to_string()).await;

    let response = reqwest::Client::new()
        .request(notify(), url(&server, "kitchen"))
        .header("NT", "upnp:event")
        .header("NTS", "ssdp:alive")
        .body(EVENT_XML)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    assert!(timeout(Duration::from_millis(100), rx.recv()).await.is_err());

    server.shutdown().await;
}

#[tokio::test]
async fn test_other_methods_are_refused() {
    let (server, _rx) = start().await;
    server.router().register("kitchen".to_string()).await;

    let response = reqwest::Client::new()
        .post(url(&server, "kitchen"))
        .body(EVENT_XML)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 405);

    server.shutdown().await;
}

#[tokio::test]
async fn test_unregister_stops_routing() {
    let (server, mut rx) = start().await;
    server.router().register("kitchen".to_string()).await;
    server.router().unregister("kitchen").await;

    let response = reqwest::Client::new()
        .request(notify(), url(&server, "kitchen"))
        .body(EVENT_XML)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
    assert!(timeout(Duration::from_millis(100), rx.recv()).await.is_err());

    server.shutdown().await;
}

#[tokio::test]
async fn test_shutdown_closes_listener() {
    let (server, _rx) = start().await;
    let target = url(&server, "kitchen");
    server.shutdown().await;

    let result = reqwest::Client::new()
        .request(notify(), target)
        .timeout(Duration::from_secs(1))
        .send()
        .await;
    assert!(result.is_err());
}
