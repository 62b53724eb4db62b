//! GENA notification decoding.
//!
//! A notification body is a `propertyset` whose `property` children may carry
//! a `LastChange` value. That value is itself an escaped XML document:
//!
//! ```xml
//! <Event xmlns="urn:schemas-upnp-org:metadata-1-0/RCS/">
//!   <InstanceID val="0">
//!     <Volume Channel="Master" val="6"/>
//!   </InstanceID>
//! </Event>
//! ```
//!
//! Decoding is all or nothing: if the envelope or any fragment is malformed
//! the whole notification is rejected.

pub mod xml_utils;

use serde::{Deserialize, Serialize};

use crate::{ApiError, Result};
use xml_utils::{parse, ValueAttribute};

/// A single observed state change on a speaker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropertyChange {
    /// Volume in percent, 0-100
    VolumeChanged { percent: u8, channel: String },
    MuteChanged { muted: bool, channel: String },
    /// Raw power state literal, e.g. `ACTIVE` or `MANUAL_STANDBY`
    PowerStateChanged { state: String },
}

impl PropertyChange {
    /// Short kind name for logs
    pub fn kind(&self) -> &'static str {
        match self {
            PropertyChange::VolumeChanged { .. } => "volume",
            PropertyChange::MuteChanged { .. } => "mute",
            PropertyChange::PowerStateChanged { .. } => "power_state",
        }
    }
}

#[derive(Debug, Deserialize)]
struct PropertySet {
    #[serde(rename = "property", default)]
    properties: Vec<Property>,
}

#[derive(Debug, Deserialize)]
struct Property {
    #[serde(rename = "LastChange", default)]
    last_change: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LastChangeEvent {
    #[serde(rename = "InstanceID", default)]
    instances: Vec<InstanceState>,
}

#[derive(Debug, Default, Deserialize)]
struct InstanceState {
    #[serde(rename = "Volume", default)]
    volume: Vec<ChannelValue>,
    #[serde(rename = "Mute", default)]
    mute: Vec<ChannelValue>,
    #[serde(rename = "PowerState", default)]
    power_state: Option<ValueAttribute>,
}

#[derive(Debug, Deserialize)]
struct ChannelValue {
    #[serde(rename = "@Channel", default)]
    channel: String,
    #[serde(rename = "@val")]
    val: i64,
}

/// Decode a notification body into the changes it reports.
///
/// Changes come out fragment by fragment and instance by instance in
/// document order; within one instance volume changes precede mute changes,
/// which precede the power state. Repeated elements need not be adjacent.
/// A fragment without any of these yields nothing.
pub fn decode_notification(xml: &str) -> Result<Vec<PropertyChange>> {
    let envelope: PropertySet = parse(xml)?;
    let mut changes = Vec::new();

    for fragment in envelope
        .properties
        .iter()
        .filter_map(|p| p.last_change.as_deref())
        .filter(|f| !f.trim().is_empty())
    {
        decode_fragment(fragment, &mut changes)?;
    }

    Ok(changes)
}

fn decode_fragment(fragment: &str, changes: &mut Vec<PropertyChange>) -> Result<()> {
    let event: LastChangeEvent = parse(fragment)?;
    for instance in event.instances {
        decode_instance(instance, changes)?;
    }
    Ok(())
}

fn decode_instance(instance: InstanceState, changes: &mut Vec<PropertyChange>) -> Result<()> {
    for volume in instance.volume {
        let percent = u8::try_from(volume.val)
            .ok()
            .filter(|p| *p <= 100)
            .ok_or_else(|| ApiError::ParseError(format!("volume {} out of range", volume.val)))?;
        changes.push(PropertyChange::VolumeChanged {
            percent,
            channel: volume.channel,
        });
    }

    for mute in instance.mute {
        changes.push(PropertyChange::MuteChanged {
            muted: mute.val != 0,
            channel: mute.channel,
        });
    }

    if let Some(power) = instance.power_state {
        changes.push(PropertyChange::PowerStateChanged { state: power.val });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(fragments: &[&str]) -> String {
        let properties: String = fragments
            .iter()
            .map(|f| {
                format!(
                    "<e:property><LastChange>{}</LastChange></e:property>",
                    escape(f)
                )
            })
            .collect();
        format!(
            r#"<?xml version="1.0"?><e:propertyset xmlns:e="urn:schemas-upnp-org:event-1-0">{}</e:propertyset>"#,
            properties
        )
    }

    fn escape(s: &str) -> String {
        s.replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;")
            .replace('"', "&quot;")
    }

    #[test]
    fn test_single_volume_fragment() {
        let xml = envelope(&[
            r#"<Event xmlns="urn:schemas-upnp-org:metadata-1-0/RCS/"><InstanceID val="0"><Volume Channel="Master" val="6"/></InstanceID></Event>"#,
        ]);

        let changes = decode_notification(&xml).unwrap();
        assert_eq!(
            changes,
            vec![PropertyChange::VolumeChanged {
                percent: 6,
                channel: "Master".to_string()
            }]
        );
    }

    #[test]
    fn test_fragment_without_known_children_yields_nothing() {
        let xml = envelope(&[
            r#"<Event xmlns="urn:schemas-upnp-org:metadata-1-0/AVT/"><InstanceID val="0"><TransportState val="PLAYING"/></InstanceID></Event>"#,
        ]);
        assert!(decode_notification(&xml).unwrap().is_empty());

        let xml = envelope(&[r#"<Event/>"#]);
        assert!(decode_notification(&xml).unwrap().is_empty());
    }

    #[test]
    fn test_fixed_order_within_fragment() {
        let xml = envelope(&[
            r#"<Event><InstanceID val="0"><PowerState val="ACTIVE"/><Mute Channel="Master" val="1"/><Volume Channel="Master" val="30"/></InstanceID></Event>"#,
        ]);

        let kinds: Vec<_> = decode_notification(&xml)
            .unwrap()
            .iter()
            .map(PropertyChange::kind)
            .collect();
        assert_eq!(kinds, vec!["volume", "mute", "power_state"]);
    }

    #[test]
    fn test_mute_nonzero_is_muted() {
        let xml = envelope(&[
            r#"<Event><InstanceID val="0"><Mute Channel="Master" val="0"/></InstanceID></Event>"#,
            r#"<Event><InstanceID val="0"><Mute Channel="Master" val="2"/></InstanceID></Event>"#,
        ]);

        let changes = decode_notification(&xml).unwrap();
        assert_eq!(
            changes,
            vec![
                PropertyChange::MuteChanged {
                    muted: false,
                    channel: "Master".to_string()
                },
                PropertyChange::MuteChanged {
                    muted: true,
                    channel: "Master".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_power_state() {
        let xml = envelope(&[
            r#"<Event xmlns="urn:schemas-upnp-org:metadata-1-0/AVT/"><InstanceID val="0"><PowerState val="MANUAL_STANDBY"/></InstanceID></Event>"#,
        ]);
        assert_eq!(
            decode_notification(&xml).unwrap(),
            vec![PropertyChange::PowerStateChanged {
                state: "MANUAL_STANDBY".to_string()
            }]
        );
    }

    #[test]
    fn test_properties_without_last_change_are_skipped() {
        let xml = r#"<e:propertyset xmlns:e="urn:schemas-upnp-org:event-1-0"><e:property><PresetNameList>FactoryDefaults</PresetNameList></e:property><e:property><LastChange></LastChange></e:property></e:propertyset>"#;
        assert!(decode_notification(xml).unwrap().is_empty());
    }

    #[test]
    fn test_interleaved_channels_are_all_decoded() {
        let xml = envelope(&[
            r#"<Event><InstanceID val="0"><Volume Channel="Master" val="10"/><Mute Channel="Master" val="0"/><Volume Channel="LF" val="20"/></InstanceID></Event>"#,
        ]);

        assert_eq!(
            decode_notification(&xml).unwrap(),
            vec![
                PropertyChange::VolumeChanged {
                    percent: 10,
                    channel: "Master".to_string()
                },
                PropertyChange::VolumeChanged {
                    percent: 20,
                    channel: "LF".to_string()
                },
                PropertyChange::MuteChanged {
                    muted: false,
                    channel: "Master".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_every_instance_is_decoded() {
        let xml = envelope(&[
            r#"<Event><InstanceID val="0"><PowerState val="ACTIVE"/></InstanceID><InstanceID val="1"><Volume Channel="Master" val="55"/></InstanceID></Event>"#,
        ]);

        assert_eq!(
            decode_notification(&xml).unwrap(),
            vec![
                PropertyChange::PowerStateChanged {
                    state: "ACTIVE".to_string()
                },
                PropertyChange::VolumeChanged {
                    percent: 55,
                    channel: "Master".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_malformed_envelope_is_error() {
        let err = decode_notification("<e:propertyset><e:property>").unwrap_err();
        assert!(matches!(err, ApiError::ParseError(_)));
    }

    #[test]
    fn test_malformed_fragment_drops_whole_notification() {
        let xml = envelope(&[
            r#"<Event><InstanceID val="0"><Volume Channel="Master" val="10"/></InstanceID></Event>"#,
            r#"<Event><InstanceID val="0"><Volume Channel="Master" val="loud"/></InstanceID></Event>"#,
        ]);
        assert!(matches!(
            decode_notification(&xml),
            Err(ApiError::ParseError(_))
        ));
    }

    #[test]
    fn test_volume_out_of_range_is_error() {
        let xml = envelope(&[
            r#"<Event><InstanceID val="0"><Volume Channel="Master" val="101"/></InstanceID></Event>"#,
        ]);
        assert!(decode_notification(&xml).is_err());
    }

    proptest::proptest! {
        #[test]
        fn prop_every_percent_decodes(percent in 0u8..=100, channel in "(Master|LF|RF)") {
            let fragment = format!(
                r#"<Event><InstanceID val="0"><Volume Channel="{}" val="{}"/></InstanceID></Event>"#,
                channel, percent
            );
            let changes = decode_notification(&envelope(&[&fragment])).unwrap();
            proptest::prop_assert_eq!(
                changes,
                vec![PropertyChange::VolumeChanged { percent, channel }]
            );
        }
    }
}
