//! Error types for vetKeys cryptographic operations

use thiserror::Error;

/// Errors from key transport, verification, symmetric and IBE operations.
///
/// Decryption and verification failures are deliberately separate variants:
/// the first means "this payload could not be opened with this key", the
/// second means "the key opened fine but was not derived for the identity we
/// asked about".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// Input was not valid lowercase/uppercase hex with an even length
    #[error("invalid hex encoding: {reason}")]
    InvalidHex {
        /// What was wrong with the input
        reason: String,
    },

    /// Key or point bytes had the wrong length or were not a valid encoding
    #[error("invalid {what}: {reason}")]
    InvalidKey {
        /// Which kind of key was being parsed
        what: &'static str,
        /// Reason the bytes were rejected
        reason: String,
    },

    /// Envelope or ciphertext could not be opened with the given key
    #[error("decryption failed: {reason}")]
    DecryptionFailed {
        /// Reason for decryption failure
        reason: String,
    },

    /// Decrypted key is not valid for the expected (public key, identity)
    #[error("verification failed: {reason}")]
    VerificationFailed {
        /// Reason for verification failure
        reason: String,
    },

    /// Symmetric ciphertext was tampered with or used under another context
    #[error("authentication failed: {reason}")]
    AuthenticationFailed {
        /// Reason for authentication failure
        reason: String,
    },
}

impl CryptoError {
    /// Returns true if this error indicates a key that opened correctly but
    /// does not belong to the claimed identity or public key.
    pub fn is_verification_failure(&self) -> bool {
        matches!(self, Self::VerificationFailed { .. })
    }

    pub(crate) fn invalid_key(what: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidKey { what, reason: reason.into() }
    }

    pub(crate) fn decryption(reason: impl Into<String>) -> Self {
        Self::DecryptionFailed { reason: reason.into() }
    }
}
