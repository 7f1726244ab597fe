//! Monotonic time sources for the throttle gate.

use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Source of monotonic time.
///
/// The throttle gate is the only consumer; abstracting the clock keeps the
/// window arithmetic testable without sleeping.
pub trait Clock: Send + Sync {
    /// Current instant on a monotonic timeline.
    fn now(&self) -> Instant;
}

/// Production clock backed by `Instant::now()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Manually advanced clock for tests.
pub struct ManualClock {
    current: Mutex<Instant>,
}

impl ManualClock {
    /// Create a clock pinned to the current instant.
    pub fn new() -> Self {
        Self {
            current: Mutex::new(Instant::now()),
        }
    }

    /// Move the clock forward by `step`.
    pub fn advance(&self, step: Duration) {
        *self.current.lock() += step;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.current.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_is_monotonic() {
        let clock = SystemClock;
        let t1 = clock.now();
        let t2 = clock.now();

        assert!(t2 >= t1);
    }

    #[test]
    fn test_manual_clock_advances_only_on_request() {
        let clock = ManualClock::new();
        let t1 = clock.now();

        assert_eq!(clock.now(), t1);

        clock.advance(Duration::from_secs(5));
        assert_eq!(clock.now(), t1 + Duration::from_secs(5));
    }
}
