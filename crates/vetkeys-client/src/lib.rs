//! vetKeys Client
//!
//! Async request/response flows on top of [`vetkeys_crypto`]: fetching and
//! verifying derived keys, symmetric encryption with them, identity-based
//! encryption, and the timelock message lifecycle.
//!
//! # Architecture
//!
//! The backend is a collaborator behind the [`Backend`] trait and the
//! environment (clock, randomness) sits behind [`Environment`], so every flow
//! runs unchanged against a deterministic simulation in tests.
//!
//! ```text
//! TransportSecretKey ──► Backend (encrypted key, hex)
//!                              │
//!                              ▼
//!            decrypt ──► verify(derived public key, identity)
//!                              │
//!               ┌──────────────┴──────────────┐
//!               ▼                             ▼
//!      DerivedKeyMaterial               IbeCiphertext::decrypt
//! ```
//!
//! # Components
//!
//! - [`VetKeyClient`]: key material, symmetric and IBE flows
//! - [`TimelockClient`]: create, fill, list and decrypt timelocks
//! - [`ClientConfig`]: symmetric context and [`MasterKeyPolicy`]
//! - [`VetKeyError`]: one variant per failure class
//!
//! Suspension points are exactly the backend calls. Key material is returned
//! to the caller; the client has no "current key" slot.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod backend;
mod client;
mod config;
mod env;
mod error;
mod key_cache;
mod principal;
mod timelock;
mod validation;

pub use backend::{Backend, BackendError, TimelockInfo};
pub use client::VetKeyClient;
pub use config::{ClientConfig, DEFAULT_SYMMETRIC_CONTEXT, MasterKeyPolicy};
pub use env::Environment;
pub use error::{ErrorKind, StateViolation, VetKeyError};
pub use key_cache::KeyPurpose;
pub use principal::{MAX_PRINCIPAL_LEN, Principal};
pub use timelock::{DecryptedTimelock, Timelock, TimelockClient, TimelockState};
pub use validation::{TimelockRequest, parse_unlock_datetime};
pub use vetkeys_crypto::DerivedKeyMaterial;
