//! Production clock adapter.
//!
//! Windows are measured on [`Instant`], which is monotonic: NTP corrections
//! or wall-clock changes on the host never move a window start backward.
//!
//! # Testing
//!
//! See `MockClock` (in `crate::infrastructure::mocks`) for a clock that
//! tests advance by hand. Available with the `test-helpers` feature or in
//! this crate's own test builds.

use crate::application::ports::Clock;
use std::time::Instant;

/// Monotonic system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}
