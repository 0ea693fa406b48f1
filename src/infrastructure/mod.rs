//! Infrastructure layer - adapters behind the application ports.
//!
//! This layer provides:
//! - The production clock (monotonic system time)
//! - Test doubles for the clock and for `tracing` output

pub mod clock;

/// Mock implementations for testing.
///
/// Only available with the `test-helpers` feature or during this crate's own
/// test builds. To use them from another crate's tests:
/// ```toml
/// [dev-dependencies]
/// rate-gate = { version = "*", features = ["test-helpers"] }
/// ```
#[cfg(any(test, feature = "test-helpers"))]
pub mod mocks;
