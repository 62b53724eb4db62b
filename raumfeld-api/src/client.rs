use raumfeld_discovery::{Device, ServiceEndpoint};
use soap_client::{SoapClient, SubscriptionResponse};

use crate::operations::av_transport::{
    EnterManualStandbyOperation, EnterManualStandbyRequest, LeaveStandbyOperation,
    LeaveStandbyRequest,
};
use crate::operations::rendering_control::{
    SetMuteOperation, SetMuteRequest, SetVolumeOperation, SetVolumeRequest, MASTER_CHANNEL,
};
use crate::{ApiError, RaumfeldOperation, Result, Service};

/// Instance addressed by RenderingControl actions on Raumfeld renderers
const RENDERING_INSTANCE_ID: u32 = 1;
/// Instance addressed by AVTransport standby actions
const TRANSPORT_INSTANCE_ID: u32 = 0;

/// A client for executing Raumfeld operations against discovered devices
///
/// Endpoints are taken from the device's own service table, so the client
/// itself is stateless apart from the underlying HTTP agent. All calls block;
/// async callers should run them on a blocking pool.
#[derive(Debug, Clone, Default)]
pub struct RaumfeldClient {
    soap_client: SoapClient,
}

impl RaumfeldClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Execute an operation against a device
    pub fn execute<Op: RaumfeldOperation>(
        &self,
        device: &Device,
        request: &Op::Request,
    ) -> Result<Op::Response> {
        Op::validate(request)?;
        let endpoint = endpoint(device, Op::SERVICE)?;
        let service_type = if endpoint.service_type.is_empty() {
            Op::SERVICE.service_type()
        } else {
            endpoint.service_type.as_str()
        };

        let payload = Op::build_payload(request);
        tracing::debug!(
            speaker_id = %device.id,
            service = %Op::SERVICE,
            action = Op::ACTION,
            "executing action"
        );

        let xml = self
            .soap_client
            .call(endpoint.control_url.as_str(), service_type, Op::ACTION, &payload)?;

        Op::parse_response(&xml)
    }

    /// Subscribe `callback_url` to the device's events for `service`
    ///
    /// Each call creates a fresh lease; renewing means calling this again.
    pub fn subscribe(
        &self,
        device: &Device,
        service: Service,
        callback_url: &str,
        timeout_seconds: u32,
    ) -> Result<SubscriptionResponse> {
        let endpoint = endpoint(device, service)?;
        let response = self.soap_client.subscribe(
            endpoint.event_sub_url.as_str(),
            callback_url,
            timeout_seconds,
        )?;

        tracing::debug!(
            speaker_id = %device.id,
            %service,
            sid = %response.sid,
            timeout = response.timeout_seconds,
            "subscribed"
        );
        Ok(response)
    }

    /// Set the Master volume in percent (0-100)
    pub fn set_volume(&self, device: &Device, percent: u8) -> Result<()> {
        self.execute::<SetVolumeOperation>(
            device,
            &SetVolumeRequest {
                instance_id: RENDERING_INSTANCE_ID,
                channel: MASTER_CHANNEL.to_string(),
                desired_volume: percent,
            },
        )?;
        Ok(())
    }

    /// Mute or unmute the Master channel
    pub fn set_mute(&self, device: &Device, muted: bool) -> Result<()> {
        self.execute::<SetMuteOperation>(
            device,
            &SetMuteRequest {
                instance_id: RENDERING_INSTANCE_ID,
                channel: MASTER_CHANNEL.to_string(),
                desired_mute: muted,
            },
        )?;
        Ok(())
    }

    /// Switch the speaker on (`LeaveStandby`) or off (`EnterManualStandby`)
    pub fn set_power(&self, device: &Device, on: bool) -> Result<()> {
        if on {
            self.execute::<LeaveStandbyOperation>(
                device,
                &LeaveStandbyRequest {
                    instance_id: TRANSPORT_INSTANCE_ID,
                },
            )?;
        } else {
            self.execute::<EnterManualStandbyOperation>(
                device,
                &EnterManualStandbyRequest {
                    instance_id: TRANSPORT_INSTANCE_ID,
                },
            )?;
        }
        Ok(())
    }
}

fn endpoint(device: &Device, service: Service) -> Result<&ServiceEndpoint> {
    device.service(service.service_id()).ok_or_else(|| {
        ApiError::ServiceUnavailable(format!("{} has no {} service", device.id, service))
    })
}
