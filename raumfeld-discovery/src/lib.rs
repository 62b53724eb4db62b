//! Raumfeld device discovery library
//!
//! Finds Raumfeld speakers on the local network with an SSDP search for the
//! Raumfeld generator service and turns their UPnP device descriptions into
//! [`Device`] records: a stable id, a display name, the local address the
//! device can reach us on, and the service endpoints the bridge talks to.
//!
//! ```no_run
//! use raumfeld_discovery::discover;
//! use std::time::Duration;
//!
//! let devices = discover(Duration::from_secs(3))?;
//! for device in devices {
//!     println!("{} ({}) at {}", device.name, device.id, device.location);
//! }
//! # Ok::<(), raumfeld_discovery::DiscoveryError>(())
//! ```
//!
//! Devices can also be pinned by their description URL, which skips SSDP
//! entirely:
//!
//! ```no_run
//! use raumfeld_discovery::from_location;
//! use std::time::Duration;
//!
//! let location = "http://192.168.1.40:52441/desc.xml".parse()?;
//! let device = from_location(&location, Duration::from_secs(3))?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod error;
mod ssdp;
pub mod device;
mod discovery;

pub use device::{
    device_id_from_udn, slugify, AV_TRANSPORT_SERVICE_ID, RENDERING_CONTROL_SERVICE_ID,
};
pub use discovery::DiscoveryIterator;
pub use error::{DiscoveryError, Result};

use std::collections::HashMap;
use std::net::IpAddr;
use std::time::Duration;

use url::Url;

/// Search target answered by every Raumfeld speaker. The service offers no
/// controls; it only identifies the devices.
pub const RAUMFELD_GENERATOR_URN: &str = "urn:schemas-raumfeld-com:service:RaumfeldGenerator:1";

/// Control and eventing endpoints of one UPnP service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEndpoint {
    /// Service type URN, used as SOAP namespace
    pub service_type: String,
    /// Absolute SOAP control URL
    pub control_url: Url,
    /// Absolute GENA event subscription URL
    pub event_sub_url: Url,
}

/// A discovered Raumfeld speaker.
///
/// Immutable once built; rediscovery produces fresh records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    /// Topic-safe id derived from the UDN, e.g. `3f8a2a30-0c3f-4d5e-b1a2-7d2f3c4b5a69`
    pub id: String,
    /// Raw UDN as announced by the device
    pub udn: String,
    /// Friendly name without the `Speaker ` prefix
    pub name: String,
    /// Description URL
    pub location: Url,
    /// Local address the device can reach us on
    pub local_addr: IpAddr,
    /// Endpoints keyed by service id
    pub services: HashMap<String, ServiceEndpoint>,
}

impl Device {
    /// Endpoints of the service with the given id
    pub fn service(&self, service_id: &str) -> Option<&ServiceEndpoint> {
        self.services.get(service_id)
    }

    /// Event subscription URL of the service with the given id
    pub fn event_url(&self, service_id: &str) -> Option<&Url> {
        self.service(service_id).map(|s| &s.event_sub_url)
    }
}

/// Events emitted during device discovery.
#[derive(Debug, Clone)]
pub enum DeviceEvent {
    /// A Raumfeld device answered and its description was usable
    Found(Device),
}

/// Discover all Raumfeld devices answering within `timeout`.
///
/// The search itself failing is an error; individual devices that cannot be
/// described are skipped.
pub fn discover(timeout: Duration) -> Result<Vec<Device>> {
    Ok(DiscoveryIterator::new(timeout)?
        .map(|event| match event {
            DeviceEvent::Found(device) => device,
        })
        .collect())
}

/// Build a device from a known description URL without searching.
pub fn from_location(location: &Url, timeout: Duration) -> Result<Device> {
    let client = discovery::http_client(timeout)?;
    discovery::fetch_device(&client, location)
}
