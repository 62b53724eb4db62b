//! Discovery iterator.
//!
//! One M-SEARCH per iterator: the SSDP answers are collected up front, then
//! each unique location is turned into a [`Device`] lazily as the caller
//! pulls events.

use std::collections::HashSet;
use std::time::Duration;

use url::Url;

use crate::device::{local_addr_towards, Root};
use crate::error::{DiscoveryError, Result};
use crate::ssdp::{SsdpClient, SsdpResponse};
use crate::{Device, DeviceEvent, RAUMFELD_GENERATOR_URN};

/// Iterator over the Raumfeld devices answering a single search.
///
/// Devices whose description cannot be fetched or parsed are logged and
/// skipped; they do not end the iteration.
pub struct DiscoveryIterator {
    responses: std::vec::IntoIter<SsdpResponse>,
    seen_locations: HashSet<String>,
    seen_udns: HashSet<String>,
    http_client: reqwest::blocking::Client,
}

impl DiscoveryIterator {
    /// Run the SSDP search and prepare to resolve its answers.
    ///
    /// Fails when the search itself cannot be performed, e.g. when no
    /// socket can be bound or the multicast send is refused.
    pub fn new(timeout: Duration) -> Result<Self> {
        let http_client = http_client(timeout)?;
        let ssdp_client = SsdpClient::new(timeout)?;

        let mut responses = Vec::new();
        for result in ssdp_client.search(RAUMFELD_GENERATOR_URN)? {
            responses.push(result?);
        }
        tracing::debug!(count = responses.len(), "SSDP search finished");

        Ok(Self {
            responses: responses.into_iter(),
            seen_locations: HashSet::new(),
            seen_udns: HashSet::new(),
            http_client,
        })
    }
}

impl Iterator for DiscoveryIterator {
    type Item = DeviceEvent;

    fn next(&mut self) -> Option<Self::Item> {
        for response in self.responses.by_ref() {
            if !self.seen_locations.insert(response.location.clone()) {
                continue;
            }

            let location = match Url::parse(&response.location) {
                Ok(location) => location,
                Err(e) => {
                    tracing::warn!(location = %response.location, error = %e, "ignoring SSDP answer with bad location");
                    continue;
                }
            };

            match fetch_device(&self.http_client, &location) {
                Ok(device) => {
                    if !self.seen_udns.insert(device.udn.clone()) {
                        continue;
                    }
                    tracing::debug!(device = %device.id, name = %device.name, %location, "device found");
                    return Some(DeviceEvent::Found(device));
                }
                Err(e) => {
                    tracing::warn!(%location, error = %e, "skipping device");
                }
            }
        }
        None
    }
}

pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::blocking::Client> {
    reqwest::blocking::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| DiscoveryError::NetworkError(format!("Failed to create HTTP client: {}", e)))
}

/// Fetch the description at `location` and build the device record.
pub(crate) fn fetch_device(client: &reqwest::blocking::Client, location: &Url) -> Result<Device> {
    let response = client
        .get(location.as_str())
        .send()
        .map_err(|e| DiscoveryError::NetworkError(format!("Failed to fetch device description: {}", e)))?;

    if !response.status().is_success() {
        return Err(DiscoveryError::NetworkError(format!(
            "Device description request returned {}",
            response.status()
        )));
    }

    let xml = response
        .text()
        .map_err(|e| DiscoveryError::NetworkError(format!("Failed to read response body: {}", e)))?;

    let root = Root::from_xml(&xml)?;
    let local_addr = local_addr_towards(location)?;
    root.to_device(location, local_addr)
}
