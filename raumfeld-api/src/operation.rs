use serde::{Deserialize, Serialize};
use xmltree::Element;

use crate::error::ApiError;
use crate::service::Service;

/// Base trait for all Raumfeld control operations
///
/// Operations are stateless descriptions of one SOAP action: which service
/// it belongs to, how the request becomes the action's argument list and how
/// the action response is read back.
pub trait RaumfeldOperation {
    /// The request type for this operation
    type Request: Serialize;

    /// The response type for this operation
    type Response: for<'de> Deserialize<'de>;

    /// The UPnP service this operation belongs to
    const SERVICE: Service;

    /// The SOAP action name for this operation
    const ACTION: &'static str;

    /// Reject requests the device would refuse anyway
    fn validate(_request: &Self::Request) -> Result<(), ApiError> {
        Ok(())
    }

    /// Build the argument elements placed inside the action element
    fn build_payload(request: &Self::Request) -> String;

    /// Parse the `<Action>Response` element into the typed response
    fn parse_response(xml: &Element) -> Result<Self::Response, ApiError>;
}
