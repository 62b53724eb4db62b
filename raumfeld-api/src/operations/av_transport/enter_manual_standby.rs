//! EnterManualStandby operation for AVTransport service

use serde::{Deserialize, Serialize};
use xmltree::Element;

use crate::{ApiError, RaumfeldOperation, Service};

/// EnterManualStandby operation
pub struct EnterManualStandbyOperation;

/// Request for EnterManualStandby operation
#[derive(Debug, Serialize)]
pub struct EnterManualStandbyRequest {
    pub instance_id: u32,
}

/// Response for EnterManualStandby operation
#[derive(Debug, Deserialize)]
pub struct EnterManualStandbyResponse;

impl RaumfeldOperation for EnterManualStandbyOperation {
    type Request = EnterManualStandbyRequest;
    type Response = EnterManualStandbyResponse;

    const SERVICE: Service = Service::AVTransport;
    const ACTION: &'static str = "EnterManualStandby";

    fn build_payload(request: &Self::Request) -> String {
        format!("<InstanceID>{}</InstanceID>", request.instance_id)
    }

    fn parse_response(_xml: &Element) -> Result<Self::Response, ApiError> {
        Ok(EnterManualStandbyResponse)
    }
}
