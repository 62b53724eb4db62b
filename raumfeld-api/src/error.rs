use soap_client::SoapError;
use thiserror::Error;

/// Errors returned by Raumfeld control operations and event decoding
#[derive(Debug, Error)]
pub enum ApiError {
    /// The device could not be reached or the connection broke
    #[error("Network error: {0}")]
    NetworkError(String),

    /// A response or event payload could not be decoded
    #[error("Parse error: {0}")]
    ParseError(String),

    /// The device answered with a SOAP fault
    #[error("SOAP fault: error code {0}")]
    SoapFault(u16),

    /// The device refused an event subscription
    #[error("Subscription rejected: HTTP {0}")]
    SubscriptionRejected(u16),

    /// The device description does not list the service an operation needs
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// An operation parameter is out of range
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Type alias for results that can return an ApiError
pub type Result<T> = std::result::Result<T, ApiError>;

impl From<SoapError> for ApiError {
    fn from(error: SoapError) -> Self {
        match error {
            SoapError::Network(msg) => ApiError::NetworkError(msg),
            SoapError::Parse(msg) => ApiError::ParseError(msg),
            SoapError::Fault(code) => ApiError::SoapFault(code),
            SoapError::Rejected(status) => ApiError::SubscriptionRejected(status),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_soap_error_conversion() {
        let api_error: ApiError = SoapError::Network("connection timeout".to_string()).into();
        assert!(matches!(api_error, ApiError::NetworkError(_)));

        let api_error: ApiError = SoapError::Parse("invalid XML".to_string()).into();
        assert!(matches!(api_error, ApiError::ParseError(_)));

        let api_error: ApiError = SoapError::Fault(501).into();
        assert!(matches!(api_error, ApiError::SoapFault(501)));

        let api_error: ApiError = SoapError::Rejected(412).into();
        assert!(matches!(api_error, ApiError::SubscriptionRejected(412)));
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            ApiError::NetworkError("connection failed".to_string()).to_string(),
            "Network error: connection failed"
        );
        assert_eq!(ApiError::SoapFault(402).to_string(), "SOAP fault: error code 402");
        assert_eq!(
            ApiError::SubscriptionRejected(412).to_string(),
            "Subscription rejected: HTTP 412"
        );
    }
}
