//! Speaker capabilities the translator drives.

use raumfeld_api::{ApiError, RaumfeldClient};
use raumfeld_discovery::Device;

/// Blocking control calls against one speaker.
///
/// Callers run these on the blocking pool.
pub trait SpeakerControl: Send + Sync + 'static {
    fn set_volume(&self, device: &Device, percent: u8) -> Result<(), ApiError>;
    fn set_mute(&self, device: &Device, muted: bool) -> Result<(), ApiError>;
    fn set_power(&self, device: &Device, on: bool) -> Result<(), ApiError>;
}

impl SpeakerControl for RaumfeldClient {
    fn set_volume(&self, device: &Device, percent: u8) -> Result<(), ApiError> {
        RaumfeldClient::set_volume(self, device, percent)
    }

    fn set_mute(&self, device: &Device, muted: bool) -> Result<(), ApiError> {
        RaumfeldClient::set_mute(self, device, muted)
    }

    fn set_power(&self, device: &Device, on: bool) -> Result<(), ApiError> {
        RaumfeldClient::set_power(self, device, on)
    }
}
