//! Raumfeld speakers as a Homie device.
//!
//! Every speaker becomes a node of one Homie device with three settable
//! properties:
//!
//! | property | datatype | values |
//! |---|---|---|
//! | `onoff` | boolean | `false` in manual standby |
//! | `volume` | float `0:1` | percent / 100 |
//! | `mute` | boolean | |
//!
//! Values are published whenever a speaker reports a change. Messages on
//! `<base>/<speaker>/<property>/set` are turned into control calls; the
//! published value only changes once the speaker confirms it.

pub mod bridge;
pub mod config;
pub mod control;
pub mod discover;
pub mod error;
pub mod homie;
pub mod logging;
pub mod registry;
pub mod translator;

pub use config::{BridgeConfig, BrokerAddress, Cli, Command};
pub use control::SpeakerControl;
pub use error::{BridgeError, CommandError, PublishError, Result};
pub use registry::{DeviceRegistry, Snapshot};
pub use translator::Translator;
