//! Hand-driven clock for deterministic window tests.

use crate::application::ports::Clock;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Clock that only moves when a test moves it.
///
/// Clones share the same reading, so a test can hand one clone to a gate and
/// keep another to advance time. Requires the `test-helpers` feature
/// outside this crate:
///
/// ```ignore
/// use rate_gate::infrastructure::mocks::MockClock;
/// use rate_gate::{RateGate, WindowUnit};
/// use std::sync::Arc;
/// use std::time::{Duration, Instant};
///
/// let clock = MockClock::new(Instant::now());
/// let gate = RateGate::builder()
///     .with_request_limit(1)
///     .with_window_unit(WindowUnit::Seconds)
///     .with_clock(Arc::new(clock.clone()))
///     .build()
///     .unwrap();
///
/// gate.acquire();
/// assert!(gate.try_acquire().is_err());
///
/// clock.advance(Duration::from_secs(1));
/// assert!(gate.try_acquire().is_ok());
/// ```
///
/// Blocked callers still park on real time. A caller waiting on a gate
/// driven by a `MockClock` re-reads the mock after at most the remaining
/// window length, measured in real time.
#[derive(Debug, Clone)]
pub struct MockClock {
    current: Arc<Mutex<Instant>>,
}

impl MockClock {
    /// Create a mock clock reading `start`.
    pub fn new(start: Instant) -> Self {
        Self {
            current: Arc::new(Mutex::new(start)),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, duration: Duration) {
        *self.current.lock() += duration;
    }

    /// Set the reading, which may be earlier than the current one.
    pub fn set(&self, instant: Instant) {
        *self.current.lock() = instant;
    }
}

impl Clock for MockClock {
    fn now(&self) -> Instant {
        *self.current.lock()
    }
}
