//! Error types for the discovery system.

use thiserror::Error;

/// Error type for discovery operations.
///
/// Represents the failure modes of a discovery cycle or of connecting to a
/// pinned device location.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// Network-related errors (socket creation, HTTP requests, etc.)
    #[error("Network error: {0}")]
    NetworkError(String),
    /// Parsing errors (XML, SSDP response, URLs)
    #[error("Parse error: {0}")]
    ParseError(String),
    /// The device description does not describe a usable speaker
    #[error("Invalid device: {0}")]
    InvalidDevice(String),
}

/// Convenience Result type alias for discovery operations.
pub type Result<T> = std::result::Result<T, DiscoveryError>;
