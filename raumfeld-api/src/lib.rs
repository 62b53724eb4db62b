//! Raumfeld speaker control and event decoding
//!
//! This crate provides typed UPnP operations for the handful of actions the
//! bridge needs (volume, mute, standby), event subscriptions, and the decoder
//! that turns GENA notification bodies into [`PropertyChange`] events.
//!
//! ```no_run
//! use raumfeld_api::{decode_notification, RaumfeldClient};
//! # fn device() -> raumfeld_discovery::Device { unimplemented!() }
//!
//! let client = RaumfeldClient::new();
//! client.set_volume(&device(), 25)?;
//!
//! let changes = decode_notification("<propertyset/>")?;
//! assert!(changes.is_empty());
//! # Ok::<(), raumfeld_api::ApiError>(())
//! ```

pub mod client;
pub mod error;
pub mod events;
pub mod operation;
pub mod operations;
pub mod service;

pub use client::RaumfeldClient;
pub use error::{ApiError, Result};
pub use events::{decode_notification, PropertyChange};
pub use operation::RaumfeldOperation;
pub use operations::av_transport::MANUAL_STANDBY;
pub use service::Service;
pub use soap_client::SubscriptionResponse;
