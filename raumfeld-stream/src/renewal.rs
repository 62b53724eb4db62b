//! Periodic lease refresh.

use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use raumfeld_discovery::Device;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::manager::SubscriptionManager;
use crate::subscriber::Subscriber;

/// Supplies the speakers whose leases should be kept alive.
///
/// Asked once per tick, so an implementation may rediscover on every call.
#[async_trait]
pub trait TargetSource: Send + Sync {
    type Error: Display + Send;

    async fn targets(&self) -> Result<Vec<Device>, Self::Error>;
}

/// A fixed set of speakers
#[derive(Debug, Clone, Default)]
pub struct StaticTargets(pub Vec<Device>);

#[async_trait]
impl TargetSource for StaticTargets {
    type Error = std::convert::Infallible;

    async fn targets(&self) -> Result<Vec<Device>, Self::Error> {
        Ok(self.0.clone())
    }
}

/// Refresh every lease on `interval` until `cancel` fires.
///
/// The first refresh happens immediately. When the source fails the tick
/// is skipped and existing leases are left alone.
pub async fn run_renewal_loop<S, T>(
    manager: Arc<SubscriptionManager<S>>,
    source: T,
    interval: Duration,
    cancel: CancellationToken,
) where
    S: Subscriber,
    T: TargetSource,
{
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::debug!("renewal loop cancelled");
                break;
            }
            _ = ticker.tick() => {
                let devices = match source.targets().await {
                    Ok(devices) => devices,
                    Err(e) => {
                        tracing::warn!(error = %e, "could not list speakers; keeping current leases");
                        continue;
                    }
                };

                let report = manager.refresh(&devices).await;
                if report.is_ok() {
                    tracing::debug!(leases = report.attempted, "leases refreshed");
                } else {
                    tracing::warn!(
                        succeeded = report.succeeded(),
                        failed = report.failures.len(),
                        "some leases could not be refreshed"
                    );
                }
            }
        }
    }
}
