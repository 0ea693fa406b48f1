//! The rate gate: admission control shared by concurrent callers.
//!
//! All window state sits behind one mutex. A caller that finds the window
//! full parks on a condition variable for at most the remaining window time,
//! without holding the lock, and re-runs the admission check when it wakes.
//! Whoever observes a rollover wakes every parked caller so they can compete
//! for the fresh window.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, trace};

use crate::application::metrics::Metrics;
use crate::application::ports::Clock;
use crate::domain::config::{ConfigError, GateConfig, WindowMode, WindowUnit};
use crate::domain::policy::{Admission, AdmissionPolicy, Policy, PolicyDecision};
use crate::infrastructure::clock::SystemClock;

/// Error returned by the non-infallible admission calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AcquireError {
    /// `try_acquire` found the window full.
    #[error("rate gate at capacity, retry after {retry_after:?}")]
    Exhausted {
        /// Time until the window releases capacity.
        retry_after: Duration,
    },

    /// `acquire_timeout` gave up before a slot was available.
    #[error("no admission within {waited:?}")]
    TimedOut {
        /// How long the caller was held.
        waited: Duration,
    },
}

/// Point-in-time view of a gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateSnapshot {
    /// Current window sequence number.
    pub window: u64,
    /// Admissions counting toward the limit right now.
    pub count: u32,
    pub request_limit: u32,
    pub window_duration: Duration,
    /// Time until capacity is released (zero if a slot is free).
    pub retry_after: Duration,
}

impl GateSnapshot {
    /// Slots that can be taken without blocking.
    pub fn available(&self) -> u32 {
        self.request_limit.saturating_sub(self.count)
    }

    /// Whether the next `acquire` would block.
    pub fn is_at_limit(&self) -> bool {
        self.count >= self.request_limit
    }
}

/// Blocking admission gate.
///
/// At most `request_limit` admissions are granted per window; excess callers
/// block until the window rolls over. Clones share the same window.
///
/// # Example
/// ```
/// use rate_gate::RateGate;
/// use std::time::Duration;
///
/// let gate = RateGate::new(Duration::from_secs(1), 6).unwrap();
///
/// // Called by the transport right before each outbound request
/// let admission = gate.acquire();
/// assert_eq!(admission.position, 1);
/// assert_eq!(gate.available(), 5);
/// ```
#[derive(Debug)]
pub struct RateGate<P = Policy> {
    inner: Arc<Shared<P>>,
}

#[derive(Debug)]
struct Shared<P> {
    policy: Mutex<P>,
    released: Condvar,
    #[cfg(feature = "async")]
    released_async: tokio::sync::Notify,
    clock: Arc<dyn Clock>,
    metrics: Metrics,
    request_limit: u32,
    window: Duration,
}

impl<P> Clone for RateGate<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl RateGate<Policy> {
    /// Create a fixed-window gate on the system clock.
    ///
    /// # Errors
    /// Returns [`ConfigError`] if `request_limit` or `window` is zero.
    pub fn new(window: Duration, request_limit: u32) -> Result<Self, ConfigError> {
        Ok(Self::from_config(GateConfig::new(window, request_limit)?))
    }

    /// Create a gate allowing `request_limit` admissions per one `unit` of time.
    ///
    /// # Errors
    /// Returns [`ConfigError::ZeroRequestLimit`] if `request_limit` is zero.
    pub fn per_unit(unit: WindowUnit, request_limit: u32) -> Result<Self, ConfigError> {
        Ok(Self::from_config(GateConfig::per_unit(unit, request_limit)?))
    }

    /// Create a gate on the system clock from a validated config.
    pub fn from_config(config: GateConfig) -> Self {
        Self::with_policy(config.policy(), Arc::new(SystemClock::new()))
    }

    /// Create a builder for configuring the gate.
    pub fn builder() -> RateGateBuilder {
        RateGateBuilder::default()
    }
}

impl<P: AdmissionPolicy> RateGate<P> {
    /// Create a gate around a custom policy.
    ///
    /// The policy's window is restarted at the clock's current instant.
    pub fn with_policy(mut policy: P, clock: Arc<dyn Clock>) -> Self {
        policy.reset(clock.now());
        let request_limit = policy.limit();
        let window = policy.window();

        Self {
            inner: Arc::new(Shared {
                policy: Mutex::new(policy),
                released: Condvar::new(),
                #[cfg(feature = "async")]
                released_async: tokio::sync::Notify::new(),
                clock,
                metrics: Metrics::new(),
                request_limit,
                window,
            }),
        }
    }

    /// Block until a slot is available, reserve it and return.
    ///
    /// Never returns without having reserved a slot. Blocked callers are
    /// admitted in no particular order.
    pub fn acquire(&self) -> Admission {
        let mut policy = self.inner.policy.lock();
        let mut blocked = false;

        loop {
            match self.poll(&mut policy) {
                PolicyDecision::Admit(admission) => return admission,
                PolicyDecision::Wait(retry_after) => {
                    if !blocked {
                        blocked = true;
                        self.record_blocked(retry_after);
                    }
                    // Timeouts and spurious wakeups both lead back to the check
                    self.inner.released.wait_for(&mut policy, retry_after);
                }
            }
        }
    }

    /// Reserve a slot if one is free right now.
    ///
    /// # Errors
    /// Returns [`AcquireError::Exhausted`] when the window is full.
    pub fn try_acquire(&self) -> Result<Admission, AcquireError> {
        let mut policy = self.inner.policy.lock();
        match self.poll(&mut policy) {
            PolicyDecision::Admit(admission) => Ok(admission),
            PolicyDecision::Wait(retry_after) => {
                self.inner.metrics.record_rejection();
                Err(AcquireError::Exhausted { retry_after })
            }
        }
    }

    /// Like [`acquire`](Self::acquire), but give up after `timeout`.
    ///
    /// A caller that times out holds no slot and leaves the window count
    /// untouched. The deadline is measured on the host's monotonic clock,
    /// independent of the gate's [`Clock`].
    ///
    /// # Errors
    /// Returns [`AcquireError::TimedOut`] if no slot freed up in time.
    pub fn acquire_timeout(&self, timeout: Duration) -> Result<Admission, AcquireError> {
        let started = Instant::now();
        let Some(deadline) = started.checked_add(timeout) else {
            return Ok(self.acquire());
        };

        let mut policy = self.inner.policy.lock();
        let mut blocked = false;

        loop {
            match self.poll(&mut policy) {
                PolicyDecision::Admit(admission) => return Ok(admission),
                PolicyDecision::Wait(retry_after) => {
                    let now = Instant::now();
                    if now >= deadline {
                        let waited = now - started;
                        self.inner.metrics.record_timeout();
                        debug!(
                            waited_ms = waited.as_millis() as u64,
                            "rate gate wait timed out"
                        );
                        return Err(AcquireError::TimedOut { waited });
                    }
                    if !blocked {
                        blocked = true;
                        self.record_blocked(retry_after);
                    }
                    self.inner
                        .released
                        .wait_for(&mut policy, retry_after.min(deadline - now));
                }
            }
        }
    }

    /// Task-based [`acquire`](Self::acquire).
    ///
    /// Suspends the task instead of the thread. Dropping the future (for
    /// example through `tokio::time::timeout` or `select!`) abandons the wait
    /// without reserving a slot.
    #[cfg(feature = "async")]
    pub async fn acquire_async(&self) -> Admission {
        let mut blocked = false;

        loop {
            // Register interest before checking so a rollover between the
            // check and the await is not missed.
            let released = self.inner.released_async.notified();
            tokio::pin!(released);
            released.as_mut().enable();

            let retry_after = match self.poll_locked() {
                PolicyDecision::Admit(admission) => return admission,
                PolicyDecision::Wait(retry_after) => retry_after,
            };
            if !blocked {
                blocked = true;
                self.record_blocked(retry_after);
            }

            tokio::select! {
                _ = &mut released => {}
                _ = tokio::time::sleep(retry_after) => {}
            }
        }
    }

    /// Current window state.
    pub fn snapshot(&self) -> GateSnapshot {
        let policy = self.inner.policy.lock();
        let now = self.inner.clock.now();
        GateSnapshot {
            window: policy.generation(),
            count: policy.current(now),
            request_limit: self.inner.request_limit,
            window_duration: self.inner.window,
            retry_after: policy.retry_after(now),
        }
    }

    /// Slots that can be taken without blocking.
    pub fn available(&self) -> u32 {
        self.snapshot().available()
    }

    pub fn request_limit(&self) -> u32 {
        self.inner.request_limit
    }

    pub fn window_duration(&self) -> Duration {
        self.inner.window
    }

    /// Get a reference to the metrics.
    pub fn metrics(&self) -> &Metrics {
        &self.inner.metrics
    }

    /// Run one admission check. Must be called with the policy lock held.
    fn poll(&self, policy: &mut P) -> PolicyDecision {
        let now = self.inner.clock.now();
        let generation = policy.generation();
        let decision = policy.register(now);

        if policy.generation() != generation {
            self.inner.metrics.record_rollover();
            debug!(window = policy.generation(), "rate gate window rolled over");
            self.inner.released.notify_all();
            #[cfg(feature = "async")]
            self.inner.released_async.notify_waiters();
        }

        if let PolicyDecision::Admit(admission) = decision {
            self.inner.metrics.record_admission();
            trace!(
                window = admission.window,
                position = admission.position,
                "rate gate admission granted"
            );
        }

        decision
    }

    #[cfg(feature = "async")]
    fn poll_locked(&self) -> PolicyDecision {
        let mut policy = self.inner.policy.lock();
        self.poll(&mut policy)
    }

    fn record_blocked(&self, retry_after: Duration) {
        self.inner.metrics.record_wait();
        debug!(
            retry_after_ms = retry_after.as_millis() as u64,
            "rate gate at capacity, caller blocked"
        );
    }
}

/// Builder for constructing a [`RateGate`].
///
/// ```
/// use rate_gate::{RateGate, WindowMode, WindowUnit};
///
/// let gate = RateGate::builder()
///     .with_request_limit(100)
///     .with_window_unit(WindowUnit::Minutes)
///     .with_mode(WindowMode::Sliding)
///     .build()
///     .unwrap();
/// assert_eq!(gate.request_limit(), 100);
/// ```
#[derive(Debug, Default)]
pub struct RateGateBuilder {
    request_limit: u32,
    window: Duration,
    mode: WindowMode,
    clock: Option<Arc<dyn Clock>>,
}

impl RateGateBuilder {
    /// Set the maximum admissions per window.
    pub fn with_request_limit(mut self, request_limit: u32) -> Self {
        self.request_limit = request_limit;
        self
    }

    /// Set the window length.
    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    /// Set the window to one unit of time.
    pub fn with_window_unit(mut self, unit: WindowUnit) -> Self {
        self.window = unit.as_duration();
        self
    }

    /// Select fixed (default) or sliding window accounting.
    pub fn with_mode(mut self, mode: WindowMode) -> Self {
        self.mode = mode;
        self
    }

    /// Use a custom clock (defaults to [`SystemClock`]).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Build the gate.
    ///
    /// # Errors
    /// Returns [`ConfigError`] if the limit or window was left at zero.
    pub fn build(self) -> Result<RateGate, ConfigError> {
        let config = GateConfig::new(self.window, self.request_limit)?.with_mode(self.mode);
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock::new()));
        Ok(RateGate::with_policy(config.policy(), clock))
    }
}
