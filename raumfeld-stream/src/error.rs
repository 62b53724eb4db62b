//! Error types for the raumfeld-stream crate.

use callback_server::CallbackError;
use raumfeld_api::ApiError;

use crate::types::SubscriptionKey;

/// Errors raised by subscription management and the notification listener.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// The notification listener could not be started
    #[error("Callback server error: {0}")]
    CallbackServer(#[from] CallbackError),

    /// A subscribe request for one lease failed
    #[error("Subscription failed for {key}: {source}")]
    Subscribe {
        key: SubscriptionKey,
        #[source]
        source: ApiError,
    },

    /// A blocking subscribe call could not be completed
    #[error("Subscription task failed: {0}")]
    TaskFailed(String),
}

/// Convenience type alias for Results using StreamError.
pub type Result<T> = std::result::Result<T, StreamError>;

#[cfg(test)]
mod tests {
    use super::*;
    use raumfeld_api::Service;

    #[test]
    fn test_stream_error_display() {
        let error = StreamError::Subscribe {
            key: SubscriptionKey::new("kitchen", Service::AVTransport),
            source: ApiError::SubscriptionRejected(412),
        };
        assert_eq!(
            error.to_string(),
            "Subscription failed for kitchen/AVTransport: Subscription rejected: HTTP 412"
        );

        let error = StreamError::from(CallbackError::NoAvailablePort {
            start: 3400,
            end: 3500,
        });
        assert_eq!(
            error.to_string(),
            "Callback server error: No available port in range 3400-3500"
        );
    }
}
