//! Raumfeld control operations organized by service

pub mod av_transport;
pub mod rendering_control;

pub use av_transport::{EnterManualStandbyOperation, LeaveStandbyOperation};
pub use rendering_control::{SetMuteOperation, SetVolumeOperation};
