//! Per-principal fixed-window throttling.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, trace};

use crate::event::{Event, Principal};

use super::{Clock, Decision, Denial, Gate, SystemClock};

/// Default cooldown between admitted actions from one principal.
pub const DEFAULT_WINDOW: Duration = Duration::from_millis(500);

/// Outcome of a throttle check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleDecision {
    /// The action was admitted and the principal's record updated.
    Admitted,
    /// The action arrived inside the cooldown window.
    Throttled {
        /// Time left until the window reopens
        remaining: Duration,
    },
}

/// Tracks the last admitted action per principal and enforces a fixed
/// cooldown window between admissions.
///
/// The per-principal read-decide-write runs under the map's entry guard, so
/// two concurrent checks for the same principal cannot both admit inside one
/// window. Checks for distinct principals proceed independently.
pub struct RateLimiter {
    /// Last-admitted instant per principal
    registry: DashMap<Principal, Instant>,
    /// Cooldown window between admitted actions
    window: Duration,
    /// Monotonic time source
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    /// Create a limiter with the given window, using the system clock.
    pub fn new(window: Duration) -> Self {
        Self::with_clock(window, Arc::new(SystemClock))
    }

    /// Create a limiter with an explicit clock.
    pub fn with_clock(window: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            registry: DashMap::new(),
            window,
            clock,
        }
    }

    /// Check the principal against the cooldown window at the clock's
    /// current instant.
    pub fn check(&self, principal: Principal) -> ThrottleDecision {
        self.check_at(principal, self.clock.now())
    }

    /// Check the principal against the cooldown window at `now`.
    ///
    /// Admission records `now` as the principal's last action. Denial leaves
    /// the stored timestamp untouched, so a burst of denied checks never
    /// extends the window: the next admission is still measured from the
    /// last admitted action.
    pub fn check_at(&self, principal: Principal, now: Instant) -> ThrottleDecision {
        match self.registry.entry(principal) {
            Entry::Vacant(slot) => {
                trace!(principal = %principal, "First action, admitting");
                slot.insert(now);
                ThrottleDecision::Admitted
            }
            Entry::Occupied(mut record) => {
                // Saturates to zero if the clock ran backwards
                let elapsed = now.saturating_duration_since(*record.get());
                if elapsed >= self.window {
                    record.insert(now);
                    ThrottleDecision::Admitted
                } else {
                    let remaining = self.window - elapsed;
                    debug!(
                        principal = %principal,
                        remaining_ms = remaining.as_millis() as u64,
                        "Action throttled"
                    );
                    ThrottleDecision::Throttled { remaining }
                }
            }
        }
    }

    /// The configured cooldown window.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Number of principals currently tracked.
    pub fn tracked_principals(&self) -> usize {
        self.registry.len()
    }

    /// Drop records whose last admission is older than `max_idle`.
    ///
    /// A record older than the window can never cause a denial, so sweeping
    /// with `max_idle >= window` does not change admission outcomes. Returns
    /// the number of records removed.
    pub fn sweep_idle(&self, max_idle: Duration) -> usize {
        let now = self.clock.now();
        let before = self.registry.len();
        self.registry
            .retain(|_, last| now.saturating_duration_since(*last) < max_idle);
        let evicted = before.saturating_sub(self.registry.len());
        if evicted > 0 {
            debug!(
                evicted,
                remaining = self.registry.len(),
                "Swept idle throttle records"
            );
        }
        evicted
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

/// Gate adapter over [`RateLimiter`].
///
/// Events without a principal bypass this gate: there is no key to track,
/// and the identity gate downstream rejects them anyway.
pub struct ThrottleGate {
    limiter: Arc<RateLimiter>,
}

impl ThrottleGate {
    /// Create a throttle gate over the given limiter.
    pub fn new(limiter: Arc<RateLimiter>) -> Self {
        Self { limiter }
    }
}

impl Gate for ThrottleGate {
    fn evaluate(&self, event: &Event) -> Decision {
        let Some(principal) = event.principal() else {
            return Decision::Admit;
        };

        match self.limiter.check(principal) {
            ThrottleDecision::Admitted => Decision::Admit,
            ThrottleDecision::Throttled { remaining } => {
                Decision::Deny(Denial::Throttled { remaining })
            }
        }
    }
}
