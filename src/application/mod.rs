//! Application layer - coordination of callers around the domain logic.
//!
//! This layer owns the runtime behavior:
//! - Rate gate (locking, blocking and wake-ups)
//! - Metrics (admission and wait counters)
//! - Throttled transport wrapper
//!
//! ## Ports
//!
//! The application layer defines ports (traits) that infrastructure
//! adapters or callers implement: the [`Clock`](ports::Clock) that drives
//! window accounting and the [`Transport`](ports::Transport) that carries
//! admitted requests.

pub mod gate;
pub mod metrics;
pub mod ports;
pub mod throttled;
