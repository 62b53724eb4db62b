//! Error types for the bridge.

use raumfeld_api::ApiError;
use raumfeld_discovery::DiscoveryError;
use raumfeld_stream::StreamError;

/// Errors raised while running the bridge
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// Invalid arguments or environment
    #[error("Configuration error: {0}")]
    Config(String),

    /// The MQTT transport failed
    #[error("Broker error: {0}")]
    Broker(String),

    #[error("Discovery error: {0}")]
    Discovery(#[from] DiscoveryError),

    #[error("Subscription error: {0}")]
    Stream(#[from] StreamError),

    #[error(transparent)]
    Publish(#[from] PublishError),

    /// A blocking task panicked or was cancelled
    #[error("Task failed: {0}")]
    TaskFailed(String),
}

/// Errors raised while handling an inbound `set` command.
///
/// None of these are fatal; the command is logged and dropped.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Unknown device: {0}")]
    UnknownDevice(String),

    #[error("Unknown property: {0}")]
    UnknownProperty(String),

    #[error("Invalid payload {payload:?} for {property}: {reason}")]
    InvalidPayload {
        property: String,
        payload: String,
        reason: String,
    },

    /// Volume outside `0..=1`
    #[error("Volume out of range: {0}")]
    OutOfRange(f64),

    /// The speaker refused or did not answer
    #[error("Device error: {0}")]
    Device(#[from] ApiError),

    #[error("Command task failed: {0}")]
    TaskFailed(String),
}

/// Every publish in a batch is attempted; the failures are collected here.
#[derive(Debug, Default)]
pub struct PublishError {
    pub failures: Vec<(String, BridgeError)>,
}

impl PublishError {
    pub fn push(&mut self, topic: impl Into<String>, error: BridgeError) {
        self.failures.push((topic.into(), error));
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    /// `Ok(())` when nothing failed
    pub fn into_result(self) -> std::result::Result<(), PublishError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl std::fmt::Display for PublishError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} publish(es) failed", self.failures.len())?;
        for (i, (topic, error)) in self.failures.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{}{}: {}", sep, topic, error)?;
        }
        Ok(())
    }
}

impl std::error::Error for PublishError {}

/// Convenience type alias for Results using BridgeError.
pub type Result<T> = std::result::Result<T, BridgeError>;
