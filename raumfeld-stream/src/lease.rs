//! Per speaker/service lease state.
//!
//! ```text
//! Unsubscribed -> Subscribing -> Subscribed -> Renewing -> Subscribed ...
//!                      |                          |
//!                      +--------> Failed <--------+
//!                                   |
//!                                   +--> Subscribing (next tick)
//! ```

use std::time::{Duration, Instant};

use crate::types::SubscriptionKey;

/// Where a lease is in its lifecycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeaseState {
    Unsubscribed,
    Subscribing,
    Subscribed { sid: String, expires_at: Instant },
    Renewing { sid: String, expires_at: Instant },
    Failed { error: String },
}

impl LeaseState {
    /// A lease is active while the device still considers it valid
    pub fn is_active(&self, now: Instant) -> bool {
        match self {
            LeaseState::Subscribed { expires_at, .. } | LeaseState::Renewing { expires_at, .. } => {
                *expires_at > now
            }
            _ => false,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            LeaseState::Unsubscribed => "unsubscribed",
            LeaseState::Subscribing => "subscribing",
            LeaseState::Subscribed { .. } => "subscribed",
            LeaseState::Renewing { .. } => "renewing",
            LeaseState::Failed { .. } => "failed",
        }
    }
}

/// A time-bounded event grant for one speaker and service
#[derive(Debug, Clone)]
pub struct Lease {
    pub key: SubscriptionKey,
    pub callback_url: String,
    state: LeaseState,
}

impl Lease {
    pub fn new(key: SubscriptionKey, callback_url: String) -> Self {
        Self {
            key,
            callback_url,
            state: LeaseState::Unsubscribed,
        }
    }

    pub fn state(&self) -> &LeaseState {
        &self.state
    }

    pub fn is_active(&self, now: Instant) -> bool {
        self.state.is_active(now)
    }

    /// A subscribe request is about to be sent
    pub fn begin(&mut self) {
        self.state = match std::mem::replace(&mut self.state, LeaseState::Unsubscribed) {
            LeaseState::Subscribed { sid, expires_at } | LeaseState::Renewing { sid, expires_at } => {
                LeaseState::Renewing { sid, expires_at }
            }
            _ => LeaseState::Subscribing,
        };
    }

    /// The device granted the lease for `granted`
    pub fn complete(&mut self, sid: String, granted: Duration, now: Instant) {
        self.state = LeaseState::Subscribed {
            sid,
            expires_at: now + granted,
        };
    }

    /// The subscribe request failed; retried on the next tick
    pub fn fail(&mut self, error: impl Into<String>) {
        self.state = LeaseState::Failed {
            error: error.into(),
        };
    }
}
