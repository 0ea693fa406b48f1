//! Ports (interfaces) for the application layer.
//!
//! The gate depends on a clock to measure windows; callers plug their
//! network client in through the transport port. Infrastructure provides
//! the production clock, callers provide the transport.

use std::fmt::Debug;
use std::time::Instant;

/// Port for obtaining current time.
///
/// Window accounting only ever reads this clock. Implementations must be
/// monotonic for the gate's window-start invariant to hold; a reading that
/// goes backward is treated as zero elapsed time rather than as a negative
/// interval.
pub trait Clock: Send + Sync + Debug {
    /// Get the current instant.
    fn now(&self) -> Instant;
}

/// Port for the outbound call a gate protects.
///
/// The crate never builds, signs or parses requests itself. A transport
/// implementation owns the HTTP client, serializer and credentials; the
/// [`Throttled`](crate::Throttled) wrapper only makes sure every `send` is
/// preceded by an admission.
pub trait Transport: Send + Sync {
    /// Outbound payload.
    type Request;
    /// Successful result of a call.
    type Response;
    /// Failure of a call. Failures do not refund the admission.
    type Error;

    /// Issue one call.
    fn send(&self, request: Self::Request) -> Result<Self::Response, Self::Error>;
}
