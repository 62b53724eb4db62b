//! The `homie-bridge` command: wiring and lifecycle.
//!
//! ```text
//!  discovery / --location ──> registry ──> definitions ──┐
//!                                │                        ├──> MQTT
//!  speakers ── NOTIFY ──> listener ──> events ───────────┘
//!     ^                                                    │
//!     └──────── control calls <── translator <── set ──────┘
//! ```
//!
//! Five tasks share one cancellation token: the notification listener,
//! lease renewal (which also re-discovers), periodic republication, the
//! event pump and the command pump. A task ending on its own cancels the
//! others.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use raumfeld_api::RaumfeldClient;
use raumfeld_discovery::Device;
use raumfeld_stream::{
    run_renewal_loop, NotificationListener, SpeakerEvent, StreamConfig, SubscriptionManager,
    TargetSource, UpnpSubscriber,
};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::config::BridgeConfig;
use crate::control::SpeakerControl;
use crate::error::{BridgeError, Result};
use crate::homie::{Message, MqttPublisher, Publisher, Topics};
use crate::registry::DeviceRegistry;
use crate::translator::Translator;

/// Where the speakers come from
#[derive(Debug, Clone)]
pub enum DeviceSource {
    /// SSDP search on every cycle
    Discover { timeout: Duration },
    /// Fixed description URLs
    Pinned { locations: Vec<Url>, timeout: Duration },
}

impl DeviceSource {
    pub fn from_config(config: &BridgeConfig) -> Self {
        if config.locations.is_empty() {
            DeviceSource::Discover {
                timeout: config.discovery_timeout,
            }
        } else {
            DeviceSource::Pinned {
                locations: config.locations.clone(),
                timeout: config.discovery_timeout,
            }
        }
    }

    /// Load the speakers on the blocking pool.
    pub async fn load(&self) -> Result<Vec<Device>> {
        let source = self.clone();
        tokio::task::spawn_blocking(move || source.load_blocking())
            .await
            .map_err(|e| BridgeError::TaskFailed(e.to_string()))?
    }

    fn load_blocking(&self) -> Result<Vec<Device>> {
        match self {
            DeviceSource::Discover { timeout } => {
                let devices = raumfeld_discovery::discover(*timeout)?;
                tracing::info!(count = devices.len(), "discovered speakers");
                Ok(devices)
            }
            DeviceSource::Pinned { locations, timeout } => {
                let mut devices = Vec::with_capacity(locations.len());
                let mut last_error = None;
                for location in locations {
                    match raumfeld_discovery::from_location(location, *timeout) {
                        Ok(device) => {
                            tracing::debug!(%location, speaker_id = %device.id, "connected to pinned speaker");
                            devices.push(device);
                        }
                        Err(e) => {
                            tracing::warn!(%location, error = %e, "pinned speaker unavailable");
                            last_error = Some(e);
                        }
                    }
                }

                match last_error {
                    Some(e) if devices.is_empty() => Err(e.into()),
                    _ => Ok(devices),
                }
            }
        }
    }
}

/// Supplies the speakers for one discovery cycle
#[async_trait]
pub trait DeviceLoader: Send + Sync + 'static {
    async fn load_devices(&self) -> Result<Vec<Device>>;

    /// Whether found speakers are worth logging as `--location` candidates
    fn suggests_pins(&self) -> bool {
        false
    }
}

#[async_trait]
impl DeviceLoader for DeviceSource {
    async fn load_devices(&self) -> Result<Vec<Device>> {
        self.load().await
    }

    fn suggests_pins(&self) -> bool {
        matches!(self, DeviceSource::Discover { .. })
    }
}

/// Reloads the registry on every renewal tick and hands the speakers to
/// the subscription manager. Definitions go out before any lease is
/// (re)established, so values never precede their node.
pub struct RegistryTargets<L: DeviceLoader, P: Publisher, C: SpeakerControl> {
    source: L,
    translator: Arc<Translator<P, C>>,
}

impl<L: DeviceLoader, P: Publisher, C: SpeakerControl> RegistryTargets<L, P, C> {
    pub fn new(source: L, translator: Arc<Translator<P, C>>) -> Self {
        Self { source, translator }
    }
}

#[async_trait]
impl<L: DeviceLoader, P: Publisher, C: SpeakerControl> TargetSource for RegistryTargets<L, P, C> {
    type Error = BridgeError;

    async fn targets(&self) -> std::result::Result<Vec<Device>, BridgeError> {
        let devices = self.source.load_devices().await?;
        let (snapshot, changed) = self.translator.registry().replace(devices);

        if changed {
            if self.source.suggests_pins() {
                for device in snapshot.devices() {
                    tracing::info!(
                        speaker_id = %device.id,
                        name = %device.name,
                        location = %device.location,
                        "consider pinning with --location"
                    );
                }
            }
            if let Err(e) = self.translator.publish_definitions().await {
                tracing::warn!(error = %e, "publishing definitions failed; retrying on next republish");
            }
        }

        Ok(snapshot.devices().map(|device| Device::clone(device)).collect())
    }
}

/// Run the bridge until `cancel` fires.
///
/// Fails only when the broker or the notification listener cannot be set
/// up; everything after that is retried.
pub async fn run(config: BridgeConfig, cancel: CancellationToken) -> Result<()> {
    let topics = Topics::new(config.base_topic.clone());
    let (publisher, commands) = MqttPublisher::connect(&config.broker, topics.clone()).await?;
    let publisher = Arc::new(publisher);

    let stream_config = StreamConfig {
        callback_port_range: config.port_range,
        lease_duration: config.lease_duration,
        renewal_interval: config.renew_interval,
    };
    let (event_tx, events) = mpsc::unbounded_channel();
    let listener = NotificationListener::start(stream_config.callback_port_range, event_tx).await?;
    let manager = Arc::new(SubscriptionManager::for_listener(
        UpnpSubscriber::default(),
        &listener,
        stream_config,
    ));

    let translator = Arc::new(Translator::new(
        publisher.clone(),
        Arc::new(RaumfeldClient::new()),
        Arc::new(DeviceRegistry::new()),
        topics,
        config.name.clone(),
    ));

    let mut tasks = JoinSet::new();
    tasks.spawn(run_renewal_loop(
        manager,
        RegistryTargets::new(DeviceSource::from_config(&config), translator.clone()),
        config.renew_interval,
        cancel.clone(),
    ));
    tasks.spawn(republish_loop(
        translator.clone(),
        config.republish_interval,
        cancel.clone(),
    ));
    tasks.spawn(event_pump(translator.clone(), events, cancel.clone()));
    tasks.spawn(command_pump(translator, commands, cancel.clone()));
    tasks.spawn(listener.run(cancel.clone()));

    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            tracing::info!("shutting down");
        }
        Some(result) = tasks.join_next() => {
            match result {
                Err(e) => tracing::error!(error = %e, "bridge task failed"),
                Ok(()) => tracing::error!("bridge task stopped unexpectedly"),
            }
            cancel.cancel();
        }
    }

    while let Some(result) = tasks.join_next().await {
        if let Err(e) = result {
            tracing::warn!(error = %e, "bridge task failed during shutdown");
        }
    }

    if let Err(e) = publisher.close().await {
        tracing::warn!(error = %e, "could not announce disconnect");
    }
    Ok(())
}

/// Republish every definition on `interval`, starting one interval in.
pub async fn republish_loop<P: Publisher, C: SpeakerControl>(
    translator: Arc<Translator<P, C>>,
    interval: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                if let Err(e) = translator.publish_definitions().await {
                    tracing::warn!(error = %e, "republishing definitions failed");
                }
            }
        }
    }
}

/// Publish every decoded event until cancelled or the stream ends.
pub async fn event_pump<P: Publisher, C: SpeakerControl>(
    translator: Arc<Translator<P, C>>,
    mut events: mpsc::UnboundedReceiver<SpeakerEvent>,
    cancel: CancellationToken,
) {
    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => break,
            event = events.recv() => match event {
                Some(event) => event,
                None => break,
            },
        };

        if let Err(e) = translator.publish_event(&event).await {
            tracing::warn!(speaker_id = %event.speaker_id, error = %e, "publishing value failed");
        }
    }
}

/// Run every inbound command on its own task so one slow speaker does not
/// hold up the rest.
pub async fn command_pump<P: Publisher, C: SpeakerControl>(
    translator: Arc<Translator<P, C>>,
    mut commands: mpsc::UnboundedReceiver<Message>,
    cancel: CancellationToken,
) {
    loop {
        let message = tokio::select! {
            _ = cancel.cancelled() => break,
            message = commands.recv() => match message {
                Some(message) => message,
                None => break,
            },
        };

        let translator = translator.clone();
        tokio::spawn(async move { translator.handle_message(&message).await });
    }
}
