//! Deterministic simulation harness for vetKeys client testing.
//!
//! [`SimEnv`] replaces the wall clock and OS entropy; [`SimBackend`] replaces
//! the key derivation service and timelock storage. Together they make every
//! client flow reproducible from a seed, including the passage of time that
//! unlocks timelocks.
//!
//! # Fault Injection
//!
//! [`SimBackend::fail_next`] scripts backend errors per operation,
//! [`SimBackend::rotate_master_key`] makes cached public keys stale, and
//! [`Misbehavior`] makes the backend issue envelopes that a correct client
//! must reject.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod sim_backend;
pub mod sim_env;

pub use sim_backend::{
    IBE_ENCRYPTION_CONTEXT, Misbehavior, SYMMETRIC_KEY_CONTEXT, SimBackend, TIMELOCK_CONTEXT,
};
pub use sim_env::{DEFAULT_START_SECS, SimEnv};
