//! Event subscriptions for Raumfeld speakers.
//!
//! This crate keeps UPnP event leases alive and turns the notifications the
//! speakers send back into a stream of typed [`SpeakerEvent`]s.
//!
//! - [`NotificationListener`]: one HTTP listener for every speaker. Each
//!   speaker is addressed by its own callback path; payloads are decoded on
//!   a separate task and bad ones are dropped with a warning.
//! - [`SubscriptionManager`]: one [`Lease`] per speaker and service, all
//!   refreshed by re-subscribing. Failures stay local to their lease.
//! - [`run_renewal_loop`]: drives [`SubscriptionManager::refresh`] on a
//!   fixed interval until cancelled.
//!
//! ```no_run
//! use std::sync::Arc;
//! use raumfeld_stream::{
//!     run_renewal_loop, NotificationListener, StaticTargets, StreamConfig,
//!     SubscriptionManager, UpnpSubscriber,
//! };
//! use tokio::sync::mpsc;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = StreamConfig::default();
//! let (tx, mut events) = mpsc::unbounded_channel();
//! let listener = NotificationListener::start(config.callback_port_range, tx).await?;
//!
//! let manager = Arc::new(SubscriptionManager::for_listener(
//!     UpnpSubscriber::default(),
//!     &listener,
//!     config.clone(),
//! ));
//!
//! let devices = raumfeld_discovery::discover(std::time::Duration::from_secs(3))?;
//! let cancel = CancellationToken::new();
//! tokio::spawn(run_renewal_loop(
//!     manager,
//!     StaticTargets(devices),
//!     config.renewal_interval,
//!     cancel.clone(),
//! ));
//!
//! while let Some(event) = events.recv().await {
//!     println!("{}: {:?}", event.speaker_id, event.change);
//! }
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod lease;
pub mod listener;
pub mod manager;
pub mod renewal;
pub mod subscriber;
pub mod types;

pub use error::{Result, StreamError};
pub use lease::{Lease, LeaseState};
pub use listener::NotificationListener;
pub use manager::{RefreshReport, SubscriptionManager};
pub use renewal::{run_renewal_loop, StaticTargets, TargetSource};
pub use subscriber::{Subscriber, UpnpSubscriber};
pub use types::{SpeakerEvent, SpeakerId, StreamConfig, SubscriptionKey};
