//! Path-based routing for callback notifications.
//!
//! Every device registers one path segment (normally its id). A `NOTIFY` on
//! a registered path is forwarded to the channel; anything else is refused.

use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};

/// A notification accepted by the callback server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationPayload {
    /// The registered path the notification arrived on, without slashes
    pub path: String,
    /// The SID header, if the device sent one
    pub sid: Option<String>,
    /// The raw XML body
    pub event_xml: String,
}

/// Routes notifications from registered callback paths to a channel.
#[derive(Clone)]
pub struct EventRouter {
    paths: Arc<RwLock<HashSet<String>>>,
    event_sender: mpsc::UnboundedSender<NotificationPayload>,
}

impl EventRouter {
    /// Create a router that forwards into `event_sender`.
    ///
    /// ```
    /// use tokio::sync::mpsc;
    /// use callback_server::router::{EventRouter, NotificationPayload};
    ///
    /// let (tx, _rx) = mpsc::unbounded_channel::<NotificationPayload>();
    /// let router = EventRouter::new(tx);
    /// ```
    pub fn new(event_sender: mpsc::UnboundedSender<NotificationPayload>) -> Self {
        Self {
            paths: Arc::new(RwLock::new(HashSet::new())),
            event_sender,
        }
    }

    /// Accept notifications on `path`.
    pub async fn register(&self, path: String) {
        let mut paths = self.paths.write().await;
        if paths.insert(path.clone()) {
            tracing::debug!(%path, "callback path registered");
        }
    }

    /// Stop accepting notifications on `path`.
    pub async fn unregister(&self, path: &str) {
        let mut paths = self.paths.write().await;
        if paths.remove(path) {
            tracing::debug!(%path, "callback path unregistered");
        }
    }

    pub async fn is_registered(&self, path: &str) -> bool {
        self.paths.read().await.contains(path)
    }

    /// Currently registered paths, sorted
    pub async fn registered(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.paths.read().await.iter().cloned().collect();
        paths.sort();
        paths
    }

    /// Forward a notification if its path is registered.
    ///
    /// Returns `false` when the path is unknown; the payload is dropped.
    pub async fn route_event(&self, path: String, sid: Option<String>, event_xml: String) -> bool {
        let paths = self.paths.read().await;
        if !paths.contains(&path) {
            return false;
        }

        let payload = NotificationPayload {
            path,
            sid,
            event_xml,
        };
        if self.event_sender.send(payload).is_err() {
            tracing::warn!("notification receiver dropped; discarding event");
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_event_router_register_and_route() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let router = EventRouter::new(tx);

        router.register("kitchen".to_string()).await;

        let routed = router
            .route_event(
                "kitchen".to_string(),
                Some("uuid:sub-1".to_string()),
                "<event>test</event>".to_string(),
            )
            .await;
        assert!(routed);

        let payload = rx.recv().await.unwrap();
        assert_eq!(payload.path, "kitchen");
        assert_eq!(payload.sid.as_deref(), Some("uuid:sub-1"));
        assert_eq!(payload.event_xml, "<event>test</event>");
    }

    #[tokio::test]
    async fn test_event_router_unregister() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let router = EventRouter::new(tx);

        router.register("kitchen".to_string()).await;
        router.unregister("kitchen").await;
        assert!(!router.is_registered("kitchen").await);

        let routed = router
            .route_event("kitchen".to_string(), None, "<event/>".to_string())
            .await;
        assert!(!routed);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_event_router_unknown_path() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let router = EventRouter::new(tx);
        router.register("kitchen".to_string()).await;

        let routed = router
            .route_event("bath".to_string(), None, "<event/>".to_string())
            .await;
        assert!(!routed);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_registered_is_sorted() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let router = EventRouter::new(tx);
        for path in ["c", "a", "b", "a"] {
            router.register(path.to_string()).await;
        }
        assert_eq!(router.registered().await, vec!["a", "b", "c"]);
    }
}
