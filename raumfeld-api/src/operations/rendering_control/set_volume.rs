//! SetVolume operation for RenderingControl service

use serde::{Deserialize, Serialize};
use xmltree::Element;

use crate::{ApiError, RaumfeldOperation, Service};

/// SetVolume operation
pub struct SetVolumeOperation;

/// Request for SetVolume operation
#[derive(Debug, Serialize)]
pub struct SetVolumeRequest {
    pub instance_id: u32,
    pub channel: String,
    /// Volume in percent, 0-100
    pub desired_volume: u8,
}

/// Response for SetVolume operation
#[derive(Debug, Deserialize)]
pub struct SetVolumeResponse;

impl RaumfeldOperation for SetVolumeOperation {
    type Request = SetVolumeRequest;
    type Response = SetVolumeResponse;

    const SERVICE: Service = Service::RenderingControl;
    const ACTION: &'static str = "SetVolume";

    fn validate(request: &Self::Request) -> Result<(), ApiError> {
        if request.desired_volume > 100 {
            return Err(ApiError::InvalidParameter(format!(
                "volume {} is out of range [0, 100]",
                request.desired_volume
            )));
        }
        Ok(())
    }

    fn build_payload(request: &Self::Request) -> String {
        format!(
            "<InstanceID>{}</InstanceID><Channel>{}</Channel><DesiredVolume>{}</DesiredVolume>",
            request.instance_id, request.channel, request.desired_volume
        )
    }

    fn parse_response(_xml: &Element) -> Result<Self::Response, ApiError> {
        Ok(SetVolumeResponse)
    }
}
