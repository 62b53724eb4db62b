//! Subscription lifecycle management
//!
//! The manager keeps one [`Lease`] per speaker and service and refreshes all
//! of them by re-subscribing. Every subscribe runs on its own future, so one
//! unreachable speaker never holds up the others.

use std::collections::{HashMap, HashSet};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use callback_server::EventRouter;
use futures::future::join_all;
use raumfeld_api::Service;
use raumfeld_discovery::Device;
use tokio::sync::RwLock;

use crate::error::{Result, StreamError};
use crate::lease::{Lease, LeaseState};
use crate::listener::NotificationListener;
use crate::subscriber::Subscriber;
use crate::types::{SpeakerId, StreamConfig, SubscriptionKey};

/// Outcome of one [`SubscriptionManager::refresh`] pass
#[derive(Debug, Default)]
pub struct RefreshReport {
    /// Number of subscribe requests issued
    pub attempted: usize,
    /// One entry per lease that could not be (re)established
    pub failures: Vec<StreamError>,
}

impl RefreshReport {
    pub fn succeeded(&self) -> usize {
        self.attempted - self.failures.len()
    }

    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Owns the lease table and the callback paths registered with the listener.
pub struct SubscriptionManager<S: Subscriber> {
    subscriber: Arc<S>,
    leases: Arc<RwLock<HashMap<SubscriptionKey, Lease>>>,
    router: Arc<EventRouter>,
    port: u16,
    config: StreamConfig,
}

impl<S: Subscriber> SubscriptionManager<S> {
    /// Create a manager whose callback URLs point at `port` and whose paths are
    /// registered with `router`.
    pub fn new(subscriber: S, router: Arc<EventRouter>, port: u16, config: StreamConfig) -> Self {
        Self {
            subscriber: Arc::new(subscriber),
            leases: Arc::new(RwLock::new(HashMap::new())),
            router,
            port,
            config,
        }
    }

    /// Create a manager wired to a running listener.
    pub fn for_listener(subscriber: S, listener: &NotificationListener, config: StreamConfig) -> Self {
        Self::new(subscriber, listener.router(), listener.port(), config)
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Callback URL a device reaches us on
    pub fn callback_url(&self, local_addr: IpAddr, speaker_id: &SpeakerId) -> String {
        format!("http://{}/{}", SocketAddr::new(local_addr, self.port), speaker_id)
    }

    /// Subscribe (or re-subscribe) one service of `device`.
    ///
    /// The lease moves to `Subscribing`/`Renewing` before the request and to
    /// `Subscribed` or `Failed` after it.
    pub async fn subscribe(&self, device: &Device, service: Service) -> Result<()> {
        let speaker_id = SpeakerId::new(device.id.clone());
        let key = SubscriptionKey::new(speaker_id.clone(), service);
        let callback_url = self.callback_url(device.local_addr, &speaker_id);

        {
            let mut leases = self.leases.write().await;
            let lease = leases
                .entry(key.clone())
                .or_insert_with(|| Lease::new(key.clone(), callback_url.clone()));
            lease.callback_url = callback_url.clone();
            lease.begin();
            tracing::trace!(%key, state = lease.state().name(), "subscribing");
        }

        let result = self
            .subscriber
            .subscribe(device, service, &callback_url, self.config.lease_seconds())
            .await;

        let mut leases = self.leases.write().await;
        let Some(lease) = leases.get_mut(&key) else {
            // Device went away while the request was in flight
            tracing::debug!(%key, "lease dropped during subscribe");
            return Ok(());
        };

        match result {
            Ok(response) => {
                let renewed = matches!(lease.state(), LeaseState::Renewing { .. });
                lease.complete(
                    response.sid.clone(),
                    Duration::from_secs(u64::from(response.timeout_seconds)),
                    Instant::now(),
                );
                if renewed {
                    tracing::debug!(%key, sid = %response.sid, timeout = response.timeout_seconds, "lease renewed");
                } else {
                    tracing::info!(%key, sid = %response.sid, timeout = response.timeout_seconds, "subscribed");
                }
                Ok(())
            }
            Err(source) => {
                lease.fail(source.to_string());
                tracing::warn!(%key, error = %source, "subscribe failed; retrying next tick");
                Err(StreamError::Subscribe { key, source })
            }
        }
    }

    /// Bring the lease table in line with `devices` and re-subscribe every
    /// speaker/service pair concurrently.
    pub async fn refresh(&self, devices: &[Device]) -> RefreshReport {
        let current: HashSet<SpeakerId> = devices
            .iter()
            .map(|d| SpeakerId::new(d.id.clone()))
            .collect();

        let gone: Vec<SpeakerId> = {
            let mut leases = self.leases.write().await;
            let gone: HashSet<SpeakerId> = leases
                .keys()
                .filter(|key| !current.contains(&key.speaker_id))
                .map(|key| key.speaker_id.clone())
                .collect();
            leases.retain(|key, _| current.contains(&key.speaker_id));
            gone.into_iter().collect()
        };

        for speaker_id in &gone {
            tracing::info!(%speaker_id, "speaker gone; dropping its leases");
            self.router.unregister(speaker_id.as_str()).await;
        }
        for speaker_id in &current {
            self.router.register(speaker_id.to_string()).await;
        }

        let attempts: Vec<_> = devices
            .iter()
            .flat_map(|device| Service::ALL.into_iter().map(move |service| (device, service)))
            .map(|(device, service)| self.subscribe(device, service))
            .collect();

        let attempted = attempts.len();
        let failures: Vec<StreamError> = join_all(attempts)
            .await
            .into_iter()
            .filter_map(|result| result.err())
            .collect();

        tracing::debug!(attempted, failed = failures.len(), "lease refresh finished");
        RefreshReport { attempted, failures }
    }

    /// Current state of one lease
    pub async fn lease_state(&self, key: &SubscriptionKey) -> Option<LeaseState> {
        self.leases.read().await.get(key).map(|lease| lease.state().clone())
    }

    /// All leases, ordered by key
    pub async fn leases(&self) -> Vec<(SubscriptionKey, LeaseState)> {
        let mut leases: Vec<_> = self
            .leases
            .read()
            .await
            .iter()
            .map(|(key, lease)| (key.clone(), lease.state().clone()))
            .collect();
        leases.sort_by(|a, b| a.0.cmp(&b.0));
        leases
    }

    /// Number of leases the devices currently honour
    pub async fn active_count(&self) -> usize {
        let now = Instant::now();
        self.leases
            .read()
            .await
            .values()
            .filter(|lease| lease.is_active(now))
            .count()
    }
}
