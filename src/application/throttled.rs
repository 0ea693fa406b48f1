//! Transport wrapper that takes an admission before every call.

use tracing::trace;

use crate::application::gate::RateGate;
use crate::application::ports::Transport;
use crate::domain::policy::{AdmissionPolicy, Policy};

/// A transport whose calls are throttled by a [`RateGate`].
///
/// `send` blocks in [`RateGate::acquire`] and only then hands the request to
/// the transport. The admission stays counted whether the call succeeds or
/// fails.
///
/// # Example
/// ```
/// use rate_gate::{RateGate, Throttled, Transport};
/// use std::time::Duration;
///
/// struct Echo;
///
/// impl Transport for Echo {
///     type Request = String;
///     type Response = String;
///     type Error = std::convert::Infallible;
///
///     fn send(&self, request: String) -> Result<String, Self::Error> {
///         Ok(request)
///     }
/// }
///
/// let gate = RateGate::new(Duration::from_secs(1), 6).unwrap();
/// let client = Throttled::new(gate, Echo);
/// assert_eq!(client.send("doc".to_string()).unwrap(), "doc");
/// assert_eq!(client.gate().snapshot().count, 1);
/// ```
#[derive(Debug)]
pub struct Throttled<T, P = Policy> {
    gate: RateGate<P>,
    transport: T,
}

impl<T, P> Throttled<T, P>
where
    T: Transport,
    P: AdmissionPolicy,
{
    pub fn new(gate: RateGate<P>, transport: T) -> Self {
        Self { gate, transport }
    }

    /// Wait for an admission, then issue the call.
    pub fn send(&self, request: T::Request) -> Result<T::Response, T::Error> {
        let admission = self.gate.acquire();
        trace!(
            window = admission.window,
            position = admission.position,
            "dispatching throttled request"
        );
        self.transport.send(request)
    }

    pub fn gate(&self) -> &RateGate<P> {
        &self.gate
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Split back into the gate and the transport.
    pub fn into_parts(self) -> (RateGate<P>, T) {
        (self.gate, self.transport)
    }
}
