//! Mapping between speaker state and Homie topics.
//!
//! Outbound, speakers become nodes and property changes become retained
//! value messages. Inbound, `<node>/<property>/set` messages become control
//! calls. A command never touches published state; the speaker's own event
//! reports the outcome.

use std::sync::Arc;

use raumfeld_api::{PropertyChange, MANUAL_STANDBY};
use raumfeld_stream::SpeakerEvent;

use crate::control::SpeakerControl;
use crate::error::{CommandError, PublishError};
use crate::homie::model::{HomieDevice, PROPERTY_MUTE, PROPERTY_ONOFF, PROPERTY_VOLUME};
use crate::homie::{Message, Publisher, Topics};
use crate::registry::DeviceRegistry;

/// A parsed `set` command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    SetVolume(u8),
    SetMute(bool),
    SetPower(bool),
}

/// Broker representation of a volume percentage: `percent / 100`
pub fn format_volume(percent: u8) -> String {
    (f64::from(percent) / 100.0).to_string()
}

/// Parse a `0..=1` float into a percentage, truncating toward zero.
pub fn parse_volume(payload: &str) -> Result<u8, CommandError> {
    let value: f64 = payload
        .trim()
        .parse()
        .map_err(|e: std::num::ParseFloatError| CommandError::InvalidPayload {
            property: PROPERTY_VOLUME.to_string(),
            payload: payload.to_string(),
            reason: e.to_string(),
        })?;

    if !(0.0..=1.0).contains(&value) {
        return Err(CommandError::OutOfRange(value));
    }
    Ok((value * 100.0) as u8)
}

/// Only the exact string `true` is true
pub fn parse_bool(payload: &str) -> bool {
    payload == "true"
}

pub fn parse_command(property: &str, payload: &str) -> Result<Command, CommandError> {
    match property {
        PROPERTY_VOLUME => parse_volume(payload).map(Command::SetVolume),
        PROPERTY_MUTE => Ok(Command::SetMute(parse_bool(payload))),
        PROPERTY_ONOFF => Ok(Command::SetPower(parse_bool(payload))),
        other => Err(CommandError::UnknownProperty(other.to_string())),
    }
}

/// Property id and payload a change is published as
pub fn property_value(change: &PropertyChange) -> (&'static str, String) {
    match change {
        PropertyChange::VolumeChanged { percent, .. } => (PROPERTY_VOLUME, format_volume(*percent)),
        PropertyChange::MuteChanged { muted, .. } => (PROPERTY_MUTE, muted.to_string()),
        PropertyChange::PowerStateChanged { state } => {
            (PROPERTY_ONOFF, (state != MANUAL_STANDBY).to_string())
        }
    }
}

/// Publishes definitions and values, and dispatches commands.
pub struct Translator<P: Publisher, C: SpeakerControl> {
    publisher: Arc<P>,
    control: Arc<C>,
    registry: Arc<DeviceRegistry>,
    topics: Topics,
    name: String,
}

impl<P: Publisher, C: SpeakerControl> Translator<P, C> {
    pub fn new(
        publisher: Arc<P>,
        control: Arc<C>,
        registry: Arc<DeviceRegistry>,
        topics: Topics,
        name: impl Into<String>,
    ) -> Self {
        Self {
            publisher,
            control,
            registry,
            topics,
            name: name.into(),
        }
    }

    pub fn topics(&self) -> &Topics {
        &self.topics
    }

    pub fn registry(&self) -> &Arc<DeviceRegistry> {
        &self.registry
    }

    /// Publish the bridge and one node per speaker in the current registry.
    pub async fn publish_definitions(&self) -> Result<(), PublishError> {
        let snapshot = self.registry.snapshot();
        let device = HomieDevice::new(self.name.clone(), snapshot.devices().map(|d| d.as_ref()));

        tracing::info!(nodes = snapshot.len(), "publishing homie definitions");
        self.publish_all(device.messages(&self.topics)).await
    }

    /// Publish the value carried by one event.
    pub async fn publish_event(&self, event: &SpeakerEvent) -> Result<(), PublishError> {
        let (property, payload) = property_value(&event.change);
        tracing::info!(
            speaker_id = %event.speaker_id,
            property,
            value = %payload,
            "speaker state changed"
        );

        let message = Message::new(self.topics.value(event.speaker_id.as_str(), property), payload);
        self.publish_all(vec![message]).await
    }

    /// Attempt every message; failures are collected, not short-circuited.
    pub async fn publish_all(&self, messages: Vec<Message>) -> Result<(), PublishError> {
        let mut errors = PublishError::default();
        for message in &messages {
            if let Err(e) = self.publisher.publish(message).await {
                errors.push(message.topic.clone(), e);
            }
        }
        errors.into_result()
    }

    /// Resolve and run one command.
    ///
    /// The device is looked up first, then the payload is parsed; nothing is
    /// sent to a speaker unless both succeed.
    pub async fn dispatch(
        &self,
        node_id: &str,
        property: &str,
        payload: &str,
    ) -> Result<Command, CommandError> {
        let device = self
            .registry
            .get(node_id)
            .ok_or_else(|| CommandError::UnknownDevice(node_id.to_string()))?;
        let command = parse_command(property, payload)?;

        tracing::info!(speaker_id = node_id, ?command, "executing command");
        let control = self.control.clone();
        tokio::task::spawn_blocking(move || match command {
            Command::SetVolume(percent) => control.set_volume(&device, percent),
            Command::SetMute(muted) => control.set_mute(&device, muted),
            Command::SetPower(on) => control.set_power(&device, on),
        })
        .await
        .map_err(|e| CommandError::TaskFailed(e.to_string()))??;

        Ok(command)
    }

    /// Handle one inbound broker message; errors are logged and dropped.
    pub async fn handle_message(&self, message: &Message) {
        let Some((node_id, property)) = self.topics.parse_set(&message.topic) else {
            tracing::debug!(topic = %message.topic, "ignoring message outside command topics");
            return;
        };

        if let Err(e) = self.dispatch(node_id, property, &message.payload).await {
            tracing::warn!(
                topic = %message.topic,
                payload = %message.payload,
                error = %e,
                "command dropped"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BridgeError;
    use async_trait::async_trait;
    use proptest::prelude::*;
    use raumfeld_api::ApiError;
    use raumfeld_discovery::Device;
    use raumfeld_stream::SpeakerId;
    use rstest::rstest;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingPublisher {
        messages: Mutex<Vec<Message>>,
        fail_on: Option<&'static str>,
    }

    #[async_trait]
    impl Publisher for RecordingPublisher {
        async fn publish(&self, message: &Message) -> crate::error::Result<()> {
            if self.fail_on.map_or(false, |s| message.topic.ends_with(s)) {
                return Err(BridgeError::Broker("not connected".to_string()));
            }
            self.messages.lock().unwrap().push(message.clone());
            Ok(())
        }
    }

    impl RecordingPublisher {
        fn published(&self) -> Vec<(String, String)> {
            self.messages
                .lock()
                .unwrap()
                .iter()
                .map(|m| (m.topic.clone(), m.payload.clone()))
                .collect()
        }
    }

    #[derive(Default)]
    struct RecordingControl {
        calls: Mutex<Vec<(String, Command)>>,
        fail: bool,
    }

    impl RecordingControl {
        fn record(&self, device: &Device, command: Command) -> Result<(), ApiError> {
            self.calls.lock().unwrap().push((device.id.clone(), command));
            if self.fail {
                Err(ApiError::SoapFault(501))
            } else {
                Ok(())
            }
        }
    }

    impl SpeakerControl for RecordingControl {
        fn set_volume(&self, device: &Device, percent: u8) -> Result<(), ApiError> {
            self.record(device, Command::SetVolume(percent))
        }
        fn set_mute(&self, device: &Device, muted: bool) -> Result<(), ApiError> {
            self.record(device, Command::SetMute(muted))
        }
        fn set_power(&self, device: &Device, on: bool) -> Result<(), ApiError> {
            self.record(device, Command::SetPower(on))
        }
    }

    fn device(id: &str) -> Device {
        Device {
            id: id.to_string(),
            udn: format!("uuid:{}", id),
            name: format!("Speaker {}", id),
            location: "http://10.0.0.5:52441/desc.xml".parse().unwrap(),
            local_addr: "10.0.0.2".parse().unwrap(),
            services: HashMap::new(),
        }
    }

    fn translator(
        publisher: RecordingPublisher,
        control: RecordingControl,
    ) -> Translator<RecordingPublisher, RecordingControl> {
        let registry = Arc::new(DeviceRegistry::new());
        registry.replace(vec![device("kitchen")]);
        Translator::new(
            Arc::new(publisher),
            Arc::new(control),
            registry,
            Topics::new("homie/rf"),
            "Bridge",
        )
    }

    fn event(change: PropertyChange) -> SpeakerEvent {
        SpeakerEvent {
            speaker_id: SpeakerId::new("kitchen"),
            change,
        }
    }

    #[rstest]
    #[case(PropertyChange::VolumeChanged { percent: 6, channel: "Master".into() }, "volume", "0.06")]
    #[case(PropertyChange::VolumeChanged { percent: 100, channel: "Master".into() }, "volume", "1")]
    #[case(PropertyChange::VolumeChanged { percent: 0, channel: "Master".into() }, "volume", "0")]
    #[case(PropertyChange::MuteChanged { muted: true, channel: "Master".into() }, "mute", "true")]
    #[case(PropertyChange::MuteChanged { muted: false, channel: "Master".into() }, "mute", "false")]
    #[case(PropertyChange::PowerStateChanged { state: "MANUAL_STANDBY".into() }, "onoff", "false")]
    #[case(PropertyChange::PowerStateChanged { state: "ACTIVE".into() }, "onoff", "true")]
    #[case(PropertyChange::PowerStateChanged { state: "AUTOMATIC_STANDBY".into() }, "onoff", "true")]
    fn test_property_value(
        #[case] change: PropertyChange,
        #[case] property: &str,
        #[case] payload: &str,
    ) {
        assert_eq!(property_value(&change), (property, payload.to_string()));
    }

    #[rstest]
    #[case("0", 0)]
    #[case("0.5", 50)]
    #[case("0.25", 25)]
    #[case("1", 100)]
    #[case(" 0.75 ", 75)]
    fn test_parse_volume(#[case] payload: &str, #[case] percent: u8) {
        assert_eq!(parse_volume(payload).unwrap(), percent);
    }

    #[rstest]
    #[case("1.5")]
    #[case("-0.1")]
    #[case("NaN")]
    fn test_volume_out_of_range(#[case] payload: &str) {
        assert!(matches!(parse_volume(payload), Err(CommandError::OutOfRange(_))));
    }

    #[rstest]
    #[case("")]
    #[case("loud")]
    #[case("50%")]
    fn test_volume_not_a_number(#[case] payload: &str) {
        assert!(matches!(
            parse_volume(payload),
            Err(CommandError::InvalidPayload { .. })
        ));
    }

    proptest! {
        #[test]
        fn prop_volume_round_trip(percent in 0u8..=100) {
            let payload = format_volume(percent);
            prop_assert_eq!(&payload, &(f64::from(percent) / 100.0).to_string());

            // Truncation may lose at most one step on the way back
            let parsed = parse_volume(&payload).unwrap();
            prop_assert!(parsed == percent || parsed + 1 == percent, "{} -> {} -> {}", percent, payload, parsed);
        }

        #[test]
        fn prop_volume_parse_truncates(value in 0.0f64..=1.0) {
            prop_assert_eq!(parse_volume(&value.to_string()).unwrap(), (value * 100.0) as u8);
        }

        #[test]
        fn prop_lenient_bool(payload in ".*") {
            prop_assume!(payload != "true");
            prop_assert!(!parse_bool(&payload));
            prop_assert_eq!(parse_command("mute", &payload).unwrap(), Command::SetMute(false));
            prop_assert_eq!(parse_command("onoff", &payload).unwrap(), Command::SetPower(false));
        }
    }

    #[rstest]
    #[case("1")]
    #[case("")]
    #[case("True")]
    #[case("TRUE")]
    #[case("yes")]
    fn test_only_exact_true_is_true(#[case] payload: &str) {
        assert!(!parse_bool(payload));
        assert!(parse_bool("true"));
    }

    #[tokio::test]
    async fn test_dispatch_invokes_control() {
        let translator = translator(RecordingPublisher::default(), RecordingControl::default());

        assert_eq!(
            translator.dispatch("kitchen", "volume", "0.5").await.unwrap(),
            Command::SetVolume(50)
        );
        assert_eq!(
            translator.dispatch("kitchen", "onoff", "true").await.unwrap(),
            Command::SetPower(true)
        );
        assert_eq!(
            translator.dispatch("kitchen", "mute", "1").await.unwrap(),
            Command::SetMute(false)
        );

        let calls = translator.control.calls.lock().unwrap().clone();
        assert_eq!(
            calls,
            vec![
                ("kitchen".to_string(), Command::SetVolume(50)),
                ("kitchen".to_string(), Command::SetPower(true)),
                ("kitchen".to_string(), Command::SetMute(false)),
            ]
        );
    }

    #[tokio::test]
    async fn test_unknown_device_or_property_has_no_side_effect() {
        let translator = translator(RecordingPublisher::default(), RecordingControl::default());

        let err = translator.dispatch("attic", "volume", "0.5").await.unwrap_err();
        assert!(matches!(err, CommandError::UnknownDevice(ref id) if id == "attic"));

        let err = translator.dispatch("kitchen", "bass", "0.5").await.unwrap_err();
        assert!(matches!(err, CommandError::UnknownProperty(ref p) if p == "bass"));

        let err = translator.dispatch("kitchen", "volume", "2").await.unwrap_err();
        assert!(matches!(err, CommandError::OutOfRange(_)));

        assert!(translator.control.calls.lock().unwrap().is_empty());
        assert!(translator.publisher.published().is_empty());
    }

    #[tokio::test]
    async fn test_control_failure_propagates_without_publishing() {
        let translator = translator(
            RecordingPublisher::default(),
            RecordingControl {
                fail: true,
                ..Default::default()
            },
        );

        let err = translator.dispatch("kitchen", "mute", "true").await.unwrap_err();
        assert!(matches!(err, CommandError::Device(ApiError::SoapFault(501))));
        assert!(translator.publisher.published().is_empty());
    }

    #[tokio::test]
    async fn test_handle_message_routes_set_topics_only() {
        let translator = translator(RecordingPublisher::default(), RecordingControl::default());

        translator
            .handle_message(&Message::new("homie/rf/kitchen/volume/set", "0.25"))
            .await;
        translator
            .handle_message(&Message::new("homie/rf/kitchen/volume", "0.75"))
            .await;
        translator
            .handle_message(&Message::new("homie/rf/attic/volume/set", "0.75"))
            .await;

        let calls = translator.control.calls.lock().unwrap().clone();
        assert_eq!(calls, vec![("kitchen".to_string(), Command::SetVolume(25))]);
    }

    #[tokio::test]
    async fn test_publish_event() {
        let translator = translator(RecordingPublisher::default(), RecordingControl::default());
        translator
            .publish_event(&event(PropertyChange::PowerStateChanged {
                state: "MANUAL_STANDBY".to_string(),
            }))
            .await
            .unwrap();

        assert_eq!(
            translator.publisher.published(),
            vec![("homie/rf/kitchen/onoff".to_string(), "false".to_string())]
        );
    }

    #[tokio::test]
    async fn test_publish_definitions() {
        let translator = translator(RecordingPublisher::default(), RecordingControl::default());
        translator.publish_definitions().await.unwrap();

        let published = translator.publisher.published();
        assert!(published.contains(&("homie/rf/$nodes".to_string(), "kitchen".to_string())));
        assert!(published.contains(&("homie/rf/kitchen/$name".to_string(), "Speaker kitchen".to_string())));
        assert_eq!(
            published.last().unwrap(),
            &("homie/rf/$state".to_string(), "ready".to_string())
        );
    }

    #[tokio::test]
    async fn test_publish_failures_are_aggregated() {
        let translator = translator(
            RecordingPublisher {
                fail_on: Some("/$datatype"),
                ..Default::default()
            },
            RecordingControl::default(),
        );

        let err = translator.publish_definitions().await.unwrap_err();
        assert_eq!(err.failures.len(), 3);

        // Everything else still went out
        let published = translator.publisher.published();
        assert!(published.iter().any(|(topic, _)| topic == "homie/rf/$state"));
        assert_eq!(published.len(), 3 * 6 + 3 + 5 - 3);
    }
}
