//! Shared NOTIFY listener feeding decoded events into a channel.

use std::net::IpAddr;
use std::sync::Arc;

use callback_server::{CallbackServer, EventRouter, NotificationPayload};
use raumfeld_api::decode_notification;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::types::{SpeakerEvent, SpeakerId};

/// One HTTP listener for all speakers.
///
/// Notifications are decoded on a task of their own; a payload that does not
/// decode is logged and dropped without affecting later ones.
pub struct NotificationListener {
    server: CallbackServer,
    decode_task: JoinHandle<()>,
}

impl NotificationListener {
    /// Bind the first free port in `port_range` and start decoding into `sink`.
    pub async fn start(
        port_range: (u16, u16),
        sink: mpsc::UnboundedSender<SpeakerEvent>,
    ) -> Result<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        let server = CallbackServer::new(port_range, tx).await?;
        let decode_task = tokio::spawn(decode_loop(rx, sink));

        Ok(Self {
            server,
            decode_task,
        })
    }

    pub fn port(&self) -> u16 {
        self.server.port()
    }

    pub fn router(&self) -> Arc<EventRouter> {
        self.server.router().clone()
    }

    /// Callback URL for `speaker_id`, reachable via `local_addr`
    pub fn callback_url(&self, local_addr: IpAddr, speaker_id: &SpeakerId) -> String {
        self.server.callback_url(local_addr, speaker_id.as_str())
    }

    /// Serve until `cancel` fires, then shut down.
    pub async fn run(self, cancel: CancellationToken) {
        cancel.cancelled().await;
        self.shutdown().await;
    }

    /// Stop serving and stop decoding.
    ///
    /// Notifications still queued for the decoder are dropped.
    pub async fn shutdown(self) {
        self.server.shutdown().await;
        // Router clones handed out to managers keep the channel open
        self.decode_task.abort();
        match self.decode_task.await {
            Err(e) if e.is_panic() => tracing::warn!(error = %e, "decode task panicked"),
            _ => {}
        }
    }
}

async fn decode_loop(
    mut rx: mpsc::UnboundedReceiver<NotificationPayload>,
    sink: mpsc::UnboundedSender<SpeakerEvent>,
) {
    while let Some(notification) = rx.recv().await {
        let speaker_id = SpeakerId::new(notification.path);

        let changes = match decode_notification(&notification.event_xml) {
            Ok(changes) => changes,
            Err(e) => {
                tracing::warn!(
                    %speaker_id,
                    sid = ?notification.sid,
                    error = %e,
                    "dropping undecodable notification"
                );
                continue;
            }
        };

        for change in changes {
            tracing::debug!(%speaker_id, kind = change.kind(), "property changed");
            let event = SpeakerEvent {
                speaker_id: speaker_id.clone(),
                change,
            };
            if sink.send(event).is_err() {
                tracing::debug!("event sink closed; stopping decoder");
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use raumfeld_api::PropertyChange;

    #[tokio::test]
    async fn test_decode_loop_skips_malformed_payloads() {
        let (tx, rx) = mpsc::unbounded_channel();
        let (sink, mut events) = mpsc::unbounded_channel();
        let task = tokio::spawn(decode_loop(rx, sink));

        tx.send(NotificationPayload {
            path: "kitchen".to_string(),
            sid: None,
            event_xml: "<propertyset><property>".to_string(),
        })
        .unwrap();
        tx.send(NotificationPayload {
            path: "bath".to_string(),
            sid: None,
            event_xml: r#"<propertyset><property><LastChange>&lt;Event&gt;&lt;InstanceID val="0"&gt;&lt;PowerState val="ACTIVE"/&gt;&lt;/InstanceID&gt;&lt;/Event&gt;</LastChange></property></propertyset>"#.to_string(),
        })
        .unwrap();
        drop(tx);

        let event = events.recv().await.unwrap();
        assert_eq!(event.speaker_id, SpeakerId::new("bath"));
        assert_eq!(
            event.change,
            PropertyChange::PowerStateChanged {
                state: "ACTIVE".to_string()
            }
        );

        task.await.unwrap();
        assert!(events.recv().await.is_none());
    }
}
