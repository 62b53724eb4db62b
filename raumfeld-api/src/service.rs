/// The UPnP services the bridge uses on a Raumfeld speaker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Service {
    /// AVTransport service - carries the power state and standby actions
    AVTransport,

    /// RenderingControl service - volume and mute
    RenderingControl,
}

impl Service {
    /// Every service the bridge subscribes to, in subscription order
    pub const ALL: [Service; 2] = [Service::AVTransport, Service::RenderingControl];

    /// Short service name, used in logs and subscription keys
    pub fn name(&self) -> &'static str {
        match self {
            Service::AVTransport => "AVTransport",
            Service::RenderingControl => "RenderingControl",
        }
    }

    /// Service id as listed in the device description
    pub fn service_id(&self) -> &'static str {
        match self {
            Service::AVTransport => raumfeld_discovery::AV_TRANSPORT_SERVICE_ID,
            Service::RenderingControl => raumfeld_discovery::RENDERING_CONTROL_SERVICE_ID,
        }
    }

    /// Service type URN, the SOAP namespace when the description omits one
    pub fn service_type(&self) -> &'static str {
        match self {
            Service::AVTransport => "urn:schemas-upnp-org:service:AVTransport:1",
            Service::RenderingControl => "urn:schemas-upnp-org:service:RenderingControl:1",
        }
    }
}

impl std::fmt::Display for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
