//! Homie 4 convention: device model, topic layout and the MQTT transport.
//!
//! The bridge is one Homie device; every speaker is one of its nodes.

pub mod client;
pub mod model;
pub mod topic;

pub use client::{MqttPublisher, Publisher};
pub use model::{Datatype, DeviceState, HomieDevice, Node, Property};
pub use topic::{Message, Topics};

/// Homie convention version announced in `$homie`
pub const HOMIE_VERSION: &str = "4.0.0";
