//! Core types for the raumfeld-stream crate.

use std::time::Duration;

use raumfeld_api::{PropertyChange, Service};

/// Unique identifier for a Raumfeld speaker, the device id from discovery.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct SpeakerId(pub String);

impl SpeakerId {
    /// Create a new speaker ID from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the speaker ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SpeakerId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for SpeakerId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl std::fmt::Display for SpeakerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One lease is kept per speaker and service.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct SubscriptionKey {
    pub speaker_id: SpeakerId,
    pub service: Service,
}

impl SubscriptionKey {
    pub fn new(speaker_id: impl Into<SpeakerId>, service: Service) -> Self {
        Self {
            speaker_id: speaker_id.into(),
            service,
        }
    }
}

impl std::fmt::Display for SubscriptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.speaker_id, self.service)
    }
}

/// A decoded change, tagged with the speaker it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeakerEvent {
    pub speaker_id: SpeakerId,
    pub change: PropertyChange,
}

/// Configuration for subscriptions and the notification listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamConfig {
    /// Port range for the callback server (start, end), inclusive
    pub callback_port_range: (u16, u16),
    /// Lease duration requested from the device
    pub lease_duration: Duration,
    /// How often every lease is refreshed by re-subscribing
    pub renewal_interval: Duration,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            callback_port_range: (3400, 3500),
            lease_duration: Duration::from_secs(1800), // 30 minutes
            renewal_interval: Duration::from_secs(300), // 5 minutes
        }
    }
}

impl StreamConfig {
    /// Lease duration in whole seconds, as sent in the TIMEOUT header
    pub fn lease_seconds(&self) -> u32 {
        u32::try_from(self.lease_duration.as_secs()).unwrap_or(u32::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscription_key_display() {
        let key = SubscriptionKey::new("kitchen", Service::RenderingControl);
        assert_eq!(key.to_string(), "kitchen/RenderingControl");
    }

    #[test]
    fn test_default_config_renews_well_inside_lease() {
        let config = StreamConfig::default();
        assert_eq!(config.callback_port_range, (3400, 3500));
        assert_eq!(config.lease_seconds(), 1800);
        assert!(config.renewal_interval < config.lease_duration);
    }
}
