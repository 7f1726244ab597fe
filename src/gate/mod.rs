//! Gate evaluation and per-principal throttle state.

mod clock;
mod identity;
mod throttle;

pub use clock::{Clock, ManualClock, SystemClock};
pub use identity::{AuthGate, IdentityStore};
pub use throttle::{RateLimiter, ThrottleDecision, ThrottleGate, DEFAULT_WINDOW};

use std::time::Duration;

use crate::event::Event;

/// Outcome of a single gate evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The event may proceed to the next gate or the downstream handler.
    Admit,
    /// The event is rejected.
    Deny(Denial),
}

/// Why a gate rejected an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    /// The principal is not in the authorized set, or the event has none.
    Forbidden,
    /// The principal acted again inside the cooldown window.
    Throttled {
        /// Time left until the next action will be admitted
        remaining: Duration,
    },
}

/// A pipeline stage that may admit or deny an event before it reaches
/// downstream logic.
///
/// Gate decisions run on every inbound event, including ones that end up
/// denied, so implementations must be fast and must not block.
pub trait Gate: Send + Sync {
    /// Evaluate the event, possibly updating internal state.
    fn evaluate(&self, event: &Event) -> Decision;
}
