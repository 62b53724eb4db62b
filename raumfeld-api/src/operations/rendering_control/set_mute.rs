//! SetMute operation for RenderingControl service

use serde::{Deserialize, Serialize};
use xmltree::Element;

use crate::{ApiError, RaumfeldOperation, Service};

/// SetMute operation
pub struct SetMuteOperation;

/// Request for SetMute operation
#[derive(Debug, Serialize)]
pub struct SetMuteRequest {
    pub instance_id: u32,
    pub channel: String,
    pub desired_mute: bool,
}

/// Response for SetMute operation
#[derive(Debug, Deserialize)]
pub struct SetMuteResponse;

impl RaumfeldOperation for SetMuteOperation {
    type Request = SetMuteRequest;
    type Response = SetMuteResponse;

    const SERVICE: Service = Service::RenderingControl;
    const ACTION: &'static str = "SetMute";

    fn build_payload(request: &Self::Request) -> String {
        format!(
            "<InstanceID>{}</InstanceID><Channel>{}</Channel><DesiredMute>{}</DesiredMute>",
            request.instance_id,
            request.channel,
            if request.desired_mute { "1" } else { "0" }
        )
    }

    fn parse_response(_xml: &Element) -> Result<Self::Response, ApiError> {
        Ok(SetMuteResponse)
    }
}
