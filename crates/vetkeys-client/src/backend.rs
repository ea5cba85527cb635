//! Backend collaborator interface.
//!
//! The backend holds the master derivation keys and the timelock records.
//! Every call is one request/response round trip; keys and envelopes travel
//! as lowercase hex strings. Transport (RPC framing, authentication,
//! timeouts) belongs to the implementation.

use std::future::Future;

use thiserror::Error;

use crate::principal::Principal;

/// Application-level errors reported by the backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Requested record does not exist
    #[error("timelock message not found")]
    NotFound,

    /// Caller does not own the record
    #[error("access denied")]
    AccessDenied,

    /// Key issuance refused because the unlock time has not been reached
    #[error("timelock not yet expired")]
    NotYetUnlocked,

    /// Record exists but holds no encrypted content
    #[error("timelock content not found")]
    ContentNotFound,

    /// Request was rejected by backend validation
    #[error("rejected: {0}")]
    Rejected(String),

    /// Backend could not be reached or failed internally
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

impl BackendError {
    /// Returns true if the same request may succeed later unchanged.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::NotYetUnlocked)
    }
}

/// Listing entry for one of the caller's timelocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelockInfo {
    /// Record id
    pub id: String,
    /// Trimmed title
    pub title: String,
    /// Unix seconds at which the record unlocks
    pub unlock_timestamp: u64,
    /// Backend's view of `now >= unlock_timestamp`
    pub is_expired: bool,
}

/// RPC surface of a vetKeys backend.
///
/// "For caller" methods derive keys for the authenticated principal returned
/// by [`Backend::caller`]. Methods returning `String` return lowercase hex
/// unless noted otherwise.
pub trait Backend: Send + Sync {
    /// Principal the backend authenticates this client as.
    fn caller(&self) -> Principal;

    /// Caller's symmetric vetKey, encrypted to `transport_public_key`.
    fn encrypted_symmetric_key_for_caller(
        &self,
        transport_public_key: &[u8],
    ) -> impl Future<Output = Result<String, BackendError>> + Send;

    /// Derived public key for the symmetric context.
    fn symmetric_key_verification_key(
        &self,
    ) -> impl Future<Output = Result<String, BackendError>> + Send;

    /// Derived public key for the IBE context.
    fn ibe_encryption_key(&self) -> impl Future<Output = Result<String, BackendError>> + Send;

    /// Caller's IBE decryption key, encrypted to `transport_public_key`.
    fn encrypted_ibe_decryption_key_for_caller(
        &self,
        transport_public_key: &[u8],
    ) -> impl Future<Output = Result<String, BackendError>> + Send;

    /// Derived public key for the timelock context.
    fn timelock_encryption_key(&self) -> impl Future<Output = Result<String, BackendError>> + Send;

    /// Allocate a timelock record. Returns the record id.
    fn create_timelock_message(
        &self,
        content: &str,
        unlock_timestamp: u64,
        title: &str,
    ) -> impl Future<Output = Result<String, BackendError>> + Send;

    /// Canonical IBE identity string for a record (plain UTF-8, not hex).
    fn get_timelock_identity(
        &self,
        record_id: &str,
    ) -> impl Future<Output = Result<String, BackendError>> + Send;

    /// Replace a record's encrypted content.
    fn update_timelock_content(
        &self,
        record_id: &str,
        ciphertext_hex: &str,
    ) -> impl Future<Output = Result<(), BackendError>> + Send;

    /// Caller's timelocks.
    fn get_my_timelocks(
        &self,
    ) -> impl Future<Output = Result<Vec<TimelockInfo>, BackendError>> + Send;

    /// Record's decryption key, encrypted to `transport_public_key`.
    ///
    /// Refused with [`BackendError::NotYetUnlocked`] before the unlock time.
    fn get_timelock_decryption_key(
        &self,
        record_id: &str,
        transport_public_key: &[u8],
    ) -> impl Future<Output = Result<String, BackendError>> + Send;

    /// Record's encrypted content.
    fn get_timelock_content(
        &self,
        record_id: &str,
    ) -> impl Future<Output = Result<String, BackendError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_and_locked_are_transient() {
        assert!(BackendError::Unavailable("timeout".into()).is_transient());
        assert!(BackendError::NotYetUnlocked.is_transient());
    }

    #[test]
    fn application_errors_are_not_transient() {
        assert!(!BackendError::NotFound.is_transient());
        assert!(!BackendError::AccessDenied.is_transient());
        assert!(!BackendError::ContentNotFound.is_transient());
        assert!(!BackendError::Rejected("title cannot be empty".into()).is_transient());
    }
}
