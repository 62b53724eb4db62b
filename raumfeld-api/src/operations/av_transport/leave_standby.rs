//! LeaveStandby operation for AVTransport service

use serde::{Deserialize, Serialize};
use xmltree::Element;

use crate::{ApiError, RaumfeldOperation, Service};

/// LeaveStandby operation
pub struct LeaveStandbyOperation;

/// Request for LeaveStandby operation
#[derive(Debug, Serialize)]
pub struct LeaveStandbyRequest {
    pub instance_id: u32,
}

/// Response for LeaveStandby operation
#[derive(Debug, Deserialize)]
pub struct LeaveStandbyResponse;

impl RaumfeldOperation for LeaveStandbyOperation {
    type Request = LeaveStandbyRequest;
    type Response = LeaveStandbyResponse;

    const SERVICE: Service = Service::AVTransport;
    const ACTION: &'static str = "LeaveStandby";

    fn build_payload(request: &Self::Request) -> String {
        format!("<InstanceID>{}</InstanceID>", request.instance_id)
    }

    fn parse_response(_xml: &Element) -> Result<Self::Response, ApiError> {
        Ok(LeaveStandbyResponse)
    }
}
