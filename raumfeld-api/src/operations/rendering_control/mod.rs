//! RenderingControl service operations
//!
//! Volume and mute on the speaker's Master channel.

mod set_mute;
mod set_volume;

pub use set_mute::{SetMuteOperation, SetMuteRequest, SetMuteResponse};
pub use set_volume::{SetVolumeOperation, SetVolumeRequest, SetVolumeResponse};

/// Channel the bridge reads and writes
pub const MASTER_CHANNEL: &str = "Master";
