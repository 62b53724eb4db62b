use thiserror::Error;

/// Errors raised while starting the callback server
#[derive(Debug, Error)]
pub enum CallbackError {
    /// Every port in the configured range is taken
    #[error("No available port in range {start}-{end}")]
    NoAvailablePort { start: u16, end: u16 },

    /// The configured range is empty
    #[error("Invalid port range {start}-{end}")]
    InvalidPortRange { start: u16, end: u16 },
}
