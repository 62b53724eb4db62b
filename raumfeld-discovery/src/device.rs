//! Device description parsing.
//!
//! Turns the UPnP device description XML served at a device's location into
//! the immutable [`Device`] record used by the rest of the bridge.

use std::collections::HashMap;
use std::net::{IpAddr, UdpSocket};

use serde::Deserialize;
use url::Url;

use crate::error::{DiscoveryError, Result};
use crate::{Device, ServiceEndpoint};

/// Service id of the AVTransport service (power state lives here).
pub const AV_TRANSPORT_SERVICE_ID: &str = "urn:upnp-org:serviceId:AVTransport";
/// Service id of the RenderingControl service (volume and mute).
pub const RENDERING_CONTROL_SERVICE_ID: &str = "urn:upnp-org:serviceId:RenderingControl";

const FRIENDLY_NAME_PREFIX: &str = "Speaker ";

/// UPnP device description root element.
#[derive(Debug, Deserialize)]
pub struct Root {
    #[serde(rename = "URLBase", default)]
    pub url_base: Option<String>,
    pub device: DeviceDescription,
}

/// Device element of a description, possibly with embedded devices.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceDescription {
    pub device_type: String,
    pub friendly_name: String,
    #[serde(default)]
    pub manufacturer: Option<String>,
    #[serde(default)]
    pub model_name: Option<String>,
    #[serde(rename = "UDN")]
    pub udn: String,
    #[serde(default)]
    pub service_list: Option<ServiceList>,
    #[serde(default)]
    pub device_list: Option<DeviceList>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ServiceList {
    #[serde(rename = "service", default)]
    pub services: Vec<ServiceDescription>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DeviceList {
    #[serde(rename = "device", default)]
    pub devices: Vec<DeviceDescription>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDescription {
    pub service_type: String,
    pub service_id: String,
    #[serde(rename = "controlURL")]
    pub control_url: String,
    #[serde(rename = "eventSubURL")]
    pub event_sub_url: String,
}

impl Root {
    /// Parse a device description document.
    pub fn from_xml(xml: &str) -> Result<Self> {
        quick_xml::de::from_str(xml)
            .map_err(|e| DiscoveryError::ParseError(format!("Failed to parse device XML: {}", e)))
    }

    /// Build the bridge's device record.
    ///
    /// Relative service URLs are resolved against `URLBase` when present and
    /// against the description's own location otherwise. Services of embedded
    /// devices are collected too; the root device wins on duplicate ids.
    pub fn to_device(&self, location: &Url, local_addr: IpAddr) -> Result<Device> {
        let base = match &self.url_base {
            Some(base) => Url::parse(base.trim())
                .map_err(|e| DiscoveryError::ParseError(format!("Invalid URLBase {:?}: {}", base, e)))?,
            None => location.clone(),
        };

        let mut services = HashMap::new();
        collect_services(&self.device, &base, &mut services)?;

        for required in [AV_TRANSPORT_SERVICE_ID, RENDERING_CONTROL_SERVICE_ID] {
            if !services.contains_key(required) {
                return Err(DiscoveryError::InvalidDevice(format!(
                    "{} does not offer {}",
                    self.device.udn, required
                )));
            }
        }

        Ok(Device {
            id: device_id_from_udn(&self.device.udn),
            udn: self.device.udn.clone(),
            name: friendly_name(&self.device.friendly_name),
            location: location.clone(),
            local_addr,
            services,
        })
    }
}

fn collect_services(
    device: &DeviceDescription,
    base: &Url,
    services: &mut HashMap<String, ServiceEndpoint>,
) -> Result<()> {
    if let Some(list) = &device.service_list {
        for service in &list.services {
            if services.contains_key(&service.service_id) {
                continue;
            }
            let endpoint = ServiceEndpoint {
                service_type: service.service_type.trim().to_string(),
                control_url: join(base, &service.control_url)?,
                event_sub_url: join(base, &service.event_sub_url)?,
            };
            services.insert(service.service_id.trim().to_string(), endpoint);
        }
    }

    if let Some(list) = &device.device_list {
        for embedded in &list.devices {
            collect_services(embedded, base, services)?;
        }
    }

    Ok(())
}

fn join(base: &Url, path: &str) -> Result<Url> {
    base.join(path.trim())
        .map_err(|e| DiscoveryError::ParseError(format!("Invalid service URL {:?}: {}", path, e)))
}

fn friendly_name(raw: &str) -> String {
    let raw = raw.trim();
    raw.strip_prefix(FRIENDLY_NAME_PREFIX).unwrap_or(raw).to_string()
}

/// Derive the stable device identifier from a UDN.
///
/// Strips the `uuid:` prefix, keeps everything up to the first `:` and turns
/// the rest into a lowercase slug of `[a-z0-9-]`.
pub fn device_id_from_udn(udn: &str) -> String {
    let udn = udn.trim();
    let udn = udn.strip_prefix("uuid:").unwrap_or(udn);
    let head = udn.split(':').next().unwrap_or_default();
    slugify(head)
}

/// Normalize text into a topic-safe slug.
///
/// Only ASCII letters and digits survive, lowercased. Every other run of
/// characters, including `_` and non-ASCII letters, collapses into a single
/// `-`, and leading or trailing dashes are dropped. There is no
/// transliteration: `"ÄBC"` becomes `"bc"`.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_dash = false;

    for c in input.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }

    slug
}

/// Find the local address used to reach the device at `location`.
///
/// Connecting a UDP socket sends nothing; it only asks the OS for a route.
pub fn local_addr_towards(location: &Url) -> Result<IpAddr> {
    let host = location
        .host_str()
        .ok_or_else(|| DiscoveryError::ParseError(format!("Location {} has no host", location)))?;
    let port = location.port_or_known_default().unwrap_or(80);

    let socket = UdpSocket::bind("0.0.0.0:0")
        .map_err(|e| DiscoveryError::NetworkError(format!("Failed to bind UDP socket: {}", e)))?;
    socket
        .connect((host, port))
        .map_err(|e| DiscoveryError::NetworkError(format!("No route to {}: {}", host, e)))?;

    socket
        .local_addr()
        .map(|addr| addr.ip())
        .map_err(|e| DiscoveryError::NetworkError(format!("Failed to read local address: {}", e)))
}
