//! Domain layer - pure admission logic with no locking or I/O.
//!
//! This layer contains the core concepts and invariants of the gate:
//! - Window accounting policies (fixed and sliding)
//! - Admission records
//! - Configuration and its validation
//!
//! Every type here takes the current instant as an argument, so all of it
//! is testable without a clock.

pub mod config;
pub mod policy;
