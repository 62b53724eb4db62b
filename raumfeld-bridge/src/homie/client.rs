//! MQTT transport.
//!
//! Everything is published retained with QoS 1. Inbound `set` commands are
//! acknowledged by the client as they arrive, whatever their handler later
//! makes of them.

use std::time::Duration;

use async_trait::async_trait;
use rumqttc::{
    AsyncClient, ConnectionError, Event, EventLoop, LastWill, MqttOptions, Outgoing, Packet, QoS,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::BrokerAddress;
use crate::error::{BridgeError, Result};
use crate::homie::model::DeviceState;
use crate::homie::topic::{Message, Topics};

const REQUESTS_CAP: usize = 64;
const KEEP_ALIVE: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const RECONNECT_DELAY: Duration = Duration::from_secs(2);
const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// Publishes retained messages
#[async_trait]
pub trait Publisher: Send + Sync + 'static {
    async fn publish(&self, message: &Message) -> Result<()>;
}

/// rumqttc-backed publisher.
///
/// The event loop runs on its own task and reconnects by itself; command
/// subscriptions are renewed after every reconnect.
#[derive(Clone)]
pub struct MqttPublisher {
    client: AsyncClient,
    topics: Topics,
    closing: CancellationToken,
    stopped: CancellationToken,
}

impl MqttPublisher {
    /// Connect to `broker` and subscribe to the command topics below
    /// `topics`.
    ///
    /// Fails when no connection is acknowledged within a few seconds.
    /// Received commands arrive on the returned channel.
    pub async fn connect(
        broker: &BrokerAddress,
        topics: Topics,
    ) -> Result<(Self, mpsc::UnboundedReceiver<Message>)> {
        let mut options = MqttOptions::new(
            format!("raumfeld-bridge-{}", std::process::id()),
            broker.host.clone(),
            broker.port,
        );
        options.set_keep_alive(KEEP_ALIVE);
        options.set_last_will(LastWill::new(
            topics.device_attr("$state"),
            DeviceState::Lost.as_str(),
            QoS::AtLeastOnce,
            true,
        ));
        if let Some((user, password)) = &broker.credentials {
            options.set_credentials(user.clone(), password.clone());
        }

        let (client, mut event_loop) = AsyncClient::new(options, REQUESTS_CAP);

        tokio::time::timeout(CONNECT_TIMEOUT, wait_for_connack(&mut event_loop))
            .await
            .map_err(|_| BridgeError::Broker(format!("No answer from {} within {:?}", broker, CONNECT_TIMEOUT)))?
            .map_err(|e| BridgeError::Broker(format!("Failed to connect to {}: {}", broker, e)))?;
        tracing::info!(%broker, "connected to broker");

        subscribe_commands(&client, &topics);

        let (tx, rx) = mpsc::unbounded_channel();
        let publisher = Self {
            client: client.clone(),
            topics: topics.clone(),
            closing: CancellationToken::new(),
            stopped: CancellationToken::new(),
        };
        tokio::spawn(drive(
            event_loop,
            client,
            topics,
            tx,
            publisher.closing.clone(),
            publisher.stopped.clone(),
        ));

        Ok((publisher, rx))
    }

    /// Announce `$state = disconnected` and close the connection cleanly.
    pub async fn close(&self) -> Result<()> {
        let state = Message::new(
            self.topics.device_attr("$state"),
            DeviceState::Disconnected.as_str(),
        );
        let published = self.publish(&state).await;

        self.closing.cancel();
        self.client
            .disconnect()
            .await
            .map_err(|e| BridgeError::Broker(format!("Failed to disconnect: {}", e)))?;

        if tokio::time::timeout(CLOSE_TIMEOUT, self.stopped.cancelled())
            .await
            .is_err()
        {
            tracing::warn!("broker connection did not close in time");
        }
        published
    }
}

#[async_trait]
impl Publisher for MqttPublisher {
    async fn publish(&self, message: &Message) -> Result<()> {
        tracing::trace!(topic = %message.topic, payload = %message.payload, "publish");
        self.client
            .publish(
                message.topic.clone(),
                QoS::AtLeastOnce,
                true,
                message.payload.clone().into_bytes(),
            )
            .await
            .map_err(|e| BridgeError::Broker(e.to_string()))
    }
}

async fn wait_for_connack(event_loop: &mut EventLoop) -> std::result::Result<(), ConnectionError> {
    loop {
        if let Event::Incoming(Packet::ConnAck(_)) = event_loop.poll().await? {
            return Ok(());
        }
    }
}

fn subscribe_commands(client: &AsyncClient, topics: &Topics) {
    let filter = topics.set_filter();
    match client.try_subscribe(filter.clone(), QoS::AtLeastOnce) {
        Ok(()) => tracing::debug!(%filter, "subscribed to commands"),
        Err(e) => tracing::warn!(%filter, error = %e, "could not subscribe to commands"),
    }
}

async fn drive(
    mut event_loop: EventLoop,
    client: AsyncClient,
    topics: Topics,
    commands: mpsc::UnboundedSender<Message>,
    closing: CancellationToken,
    stopped: CancellationToken,
) {
    loop {
        match event_loop.poll().await {
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                match String::from_utf8(publish.payload.to_vec()) {
                    Ok(payload) => {
                        let _ = commands.send(Message::new(publish.topic, payload));
                    }
                    Err(_) => {
                        tracing::warn!(topic = %publish.topic, "ignoring non UTF-8 payload");
                    }
                }
            }
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                tracing::info!("reconnected to broker");
                subscribe_commands(&client, &topics);
            }
            Ok(Event::Outgoing(Outgoing::Disconnect)) => break,
            Ok(_) => {}
            Err(_) if closing.is_cancelled() => break,
            Err(e) => {
                tracing::warn!(error = %e, "broker connection lost; retrying");
                tokio::time::sleep(RECONNECT_DELAY).await;
            }
        }
    }
    tracing::debug!("broker event loop stopped");
    stopped.cancel();
}
