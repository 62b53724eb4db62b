//! Device, node and property definitions.

use raumfeld_discovery::Device;

use crate::homie::topic::{Message, Topics};
use crate::homie::HOMIE_VERSION;

pub const IMPLEMENTATION: &str = env!("CARGO_PKG_REPOSITORY");

pub const PROPERTY_ONOFF: &str = "onoff";
pub const PROPERTY_VOLUME: &str = "volume";
pub const PROPERTY_MUTE: &str = "mute";

/// Homie device lifecycle states this bridge publishes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    Ready,
    Disconnected,
    Lost,
}

impl DeviceState {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceState::Ready => "ready",
            DeviceState::Disconnected => "disconnected",
            DeviceState::Lost => "lost",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Datatype {
    Boolean,
    Float,
}

impl Datatype {
    pub fn as_str(&self) -> &'static str {
        match self {
            Datatype::Boolean => "boolean",
            Datatype::Float => "float",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    pub id: &'static str,
    pub name: &'static str,
    pub datatype: Datatype,
    pub format: &'static str,
    pub unit: &'static str,
    pub settable: bool,
    pub retained: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub id: String,
    pub name: String,
    pub node_type: &'static str,
    pub properties: Vec<Property>,
}

/// The bridge itself
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HomieDevice {
    pub name: String,
    pub implementation: &'static str,
    pub nodes: Vec<Node>,
}

/// Properties every speaker exposes
pub fn speaker_properties() -> Vec<Property> {
    vec![
        Property {
            id: PROPERTY_ONOFF,
            name: "On/Off",
            datatype: Datatype::Boolean,
            format: "",
            unit: "",
            settable: true,
            retained: true,
        },
        Property {
            id: PROPERTY_VOLUME,
            name: "Volume",
            datatype: Datatype::Float,
            format: "0:1",
            unit: "",
            settable: true,
            retained: true,
        },
        Property {
            id: PROPERTY_MUTE,
            name: "Mute",
            datatype: Datatype::Boolean,
            format: "",
            unit: "",
            settable: true,
            retained: true,
        },
    ]
}

impl Node {
    pub fn speaker(device: &Device) -> Self {
        Self {
            id: device.id.clone(),
            name: device.name.clone(),
            node_type: "Speaker",
            properties: speaker_properties(),
        }
    }

    /// Property ids, sorted
    pub fn property_ids(&self) -> Vec<&'static str> {
        let mut ids: Vec<_> = self.properties.iter().map(|p| p.id).collect();
        ids.sort_unstable();
        ids
    }

    /// Attribute messages of the node and its properties, properties first
    pub fn messages(&self, topics: &Topics) -> Vec<Message> {
        let mut messages = Vec::new();
        for property in &self.properties {
            let attr = |name: &str, value: &str| {
                Message::new(topics.property_attr(&self.id, property.id, name), value)
            };
            messages.push(attr("$name", property.name));
            messages.push(attr("$datatype", property.datatype.as_str()));
            messages.push(attr("$format", property.format));
            messages.push(attr("$unit", property.unit));
            messages.push(attr("$settable", &property.settable.to_string()));
            messages.push(attr("$retained", &property.retained.to_string()));
        }

        messages.push(Message::new(topics.node_attr(&self.id, "$name"), &self.name));
        messages.push(Message::new(topics.node_attr(&self.id, "$type"), self.node_type));
        messages.push(Message::new(
            topics.node_attr(&self.id, "$properties"),
            &self.property_ids().join(","),
        ));
        messages
    }
}

impl HomieDevice {
    pub fn new<'a>(name: impl Into<String>, devices: impl IntoIterator<Item = &'a Device>) -> Self {
        Self {
            name: name.into(),
            implementation: IMPLEMENTATION,
            nodes: devices.into_iter().map(Node::speaker).collect(),
        }
    }

    /// Every definition message: nodes first, then the device attributes
    /// ending with `$state = ready`.
    pub fn messages(&self, topics: &Topics) -> Vec<Message> {
        let mut messages: Vec<Message> = self
            .nodes
            .iter()
            .flat_map(|node| node.messages(topics))
            .collect();

        let node_ids: Vec<&str> = self.nodes.iter().map(|n| n.id.as_str()).collect();
        messages.push(Message::new(topics.device_attr("$homie"), HOMIE_VERSION));
        messages.push(Message::new(topics.device_attr("$name"), &self.name));
        messages.push(Message::new(
            topics.device_attr("$implementation"),
            self.implementation,
        ));
        messages.push(Message::new(topics.device_attr("$nodes"), &node_ids.join(",")));
        messages.push(Message::new(
            topics.device_attr("$state"),
            DeviceState::Ready.as_str(),
        ));
        messages
    }
}
