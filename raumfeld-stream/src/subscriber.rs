//! The seam between lease bookkeeping and the network.

use async_trait::async_trait;
use raumfeld_api::{ApiError, RaumfeldClient, Service, SubscriptionResponse};
use raumfeld_discovery::Device;

/// Issues one subscribe request for a speaker's service.
#[async_trait]
pub trait Subscriber: Send + Sync + 'static {
    async fn subscribe(
        &self,
        device: &Device,
        service: Service,
        callback_url: &str,
        timeout_seconds: u32,
    ) -> Result<SubscriptionResponse, ApiError>;
}

/// Subscribes over UPnP GENA using the blocking SOAP client.
#[derive(Debug, Clone, Default)]
pub struct UpnpSubscriber {
    client: RaumfeldClient,
}

impl UpnpSubscriber {
    pub fn new(client: RaumfeldClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Subscriber for UpnpSubscriber {
    async fn subscribe(
        &self,
        device: &Device,
        service: Service,
        callback_url: &str,
        timeout_seconds: u32,
    ) -> Result<SubscriptionResponse, ApiError> {
        let client = self.client.clone();
        let device = device.clone();
        let callback_url = callback_url.to_string();

        tokio::task::spawn_blocking(move || {
            client.subscribe(&device, service, &callback_url, timeout_seconds)
        })
        .await
        .map_err(|e| ApiError::NetworkError(format!("subscribe task failed: {}", e)))?
    }
}
