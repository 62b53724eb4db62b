//! AVTransport service operations
//!
//! Raumfeld exposes power control as standby actions on AVTransport.

mod enter_manual_standby;
mod leave_standby;

pub use enter_manual_standby::{
    EnterManualStandbyOperation, EnterManualStandbyRequest, EnterManualStandbyResponse,
};
pub use leave_standby::{LeaveStandbyOperation, LeaveStandbyRequest, LeaveStandbyResponse};

/// Power state reported while the speaker is in manual standby
pub const MANUAL_STANDBY: &str = "MANUAL_STANDBY";
