//! Monotonic time source for request latency.

use std::time::Instant;

/// Where request timestamps come from.
///
/// [`SystemClock`] is what you want outside of tests. Tests inject a clock
/// that advances by a known amount so logged durations are deterministic.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> Instant;
}

/// [`Instant::now`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}
