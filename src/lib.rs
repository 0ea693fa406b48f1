//! # rate-gate
//!
//! Client-side admission control for outbound API calls.
//!
//! A [`RateGate`] lets at most `request_limit` calls through per window of
//! `window` length. Callers past the limit are **blocked, not rejected**:
//! [`RateGate::acquire`] parks the calling thread until the window rolls
//! over, then reserves a slot and returns.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rate_gate::{RateGate, WindowUnit};
//!
//! // Six calls per second
//! let gate = RateGate::per_unit(WindowUnit::Seconds, 6).unwrap();
//!
//! // Share across threads; clones see the same window
//! let worker_gate = gate.clone();
//! std::thread::spawn(move || {
//!     worker_gate.acquire();
//!     // ... issue the request ...
//! });
//!
//! gate.acquire();
//! // ... issue the request ...
//! ```
//!
//! ## Window Semantics
//!
//! The default fixed window is counted from a moving reset point:
//!
//! 1. The first call at least `window` after the current window start
//!    opens a new window at that call's instant and resets the count.
//! 2. A call is admitted while the count is below the limit.
//! 3. Otherwise the caller sleeps for the rest of the window (or until
//!    another caller observes the rollover) and checks again.
//!
//! | Calls | Limit 6, window 1 s |
//! |-------|---------------------|
//! | 6 callers at t = 0 ms | all admitted immediately, window 0 |
//! | 7th caller at t = 100 ms | blocks until ≈ 1000 ms, admitted as #1 of window 1 |
//!
//! A fixed window bounds each window, not every interval: up to twice the
//! limit can pass across a window boundary. When every interval of length
//! `window` must stay under the limit, use [`WindowMode::Sliding`]:
//!
//! ```rust
//! use rate_gate::{RateGate, WindowMode};
//! use std::time::Duration;
//!
//! let gate = RateGate::builder()
//!     .with_request_limit(100)
//!     .with_window(Duration::from_secs(60))
//!     .with_mode(WindowMode::Sliding)
//!     .build()
//!     .unwrap();
//! ```
//!
//! ## Bounded Waits
//!
//! ```rust
//! use rate_gate::{AcquireError, RateGate};
//! use std::time::Duration;
//!
//! let gate = RateGate::new(Duration::from_secs(60), 1).unwrap();
//! gate.acquire();
//!
//! // Non-blocking
//! assert!(matches!(gate.try_acquire(), Err(AcquireError::Exhausted { .. })));
//!
//! // Blocking with a deadline; a timed-out caller holds no slot
//! let err = gate.acquire_timeout(Duration::from_millis(10)).unwrap_err();
//! assert!(matches!(err, AcquireError::TimedOut { .. }));
//! assert_eq!(gate.snapshot().count, 1);
//! ```
//!
//! With the `async` feature, [`RateGate::acquire_async`] suspends the task
//! instead of the thread. Dropping its future cancels the wait.
//!
//! ## Guarding a Transport
//!
//! The gate knows nothing about requests. Implement [`Transport`] for your
//! client and wrap it in [`Throttled`] so that every call goes through
//! [`RateGate::acquire`] first. Failed calls keep their admission.
//!
//! ## Observability
//!
//! The gate logs through `tracing` (no subscriber is installed):
//! - `TRACE` for each admission, with `window` and `position`
//! - `DEBUG` when a window rolls over, a caller blocks, or a timed wait gives up
//!
//! Counters are available without locking the gate:
//!
//! ```rust
//! # use rate_gate::RateGate;
//! # use std::time::Duration;
//! # let gate = RateGate::new(Duration::from_secs(1), 6).unwrap();
//! let snapshot = gate.metrics().snapshot();
//! println!("admitted: {}, waited: {}", snapshot.admissions, snapshot.waits);
//! println!("wait rate: {:.2}%", snapshot.wait_rate() * 100.0);
//! ```
//!
//! ## Features
//!
//! | Feature | Enables |
//! |---------|---------|
//! | `async` | `RateGate::acquire_async` (tokio) |
//! | `serde` | `Serialize`/`Deserialize` for `GateConfig` |
//! | `test-helpers` | `infrastructure::mocks` (`MockClock`, `MockCaptureLayer`) |

// Domain layer - pure window accounting
pub mod domain;

// Application layer - locking, blocking and coordination
pub mod application;

// Infrastructure layer - clock adapters and test doubles
pub mod infrastructure;

pub use domain::{
    config::{ConfigError, GateConfig, WindowMode, WindowUnit},
    policy::{
        Admission, AdmissionPolicy, FixedWindowPolicy, Policy, PolicyDecision,
        SlidingWindowPolicy,
    },
};

pub use application::{
    gate::{AcquireError, GateSnapshot, RateGate, RateGateBuilder},
    metrics::{Metrics, MetricsSnapshot},
    ports::{Clock, Transport},
    throttled::Throttled,
};

pub use infrastructure::clock::SystemClock;
