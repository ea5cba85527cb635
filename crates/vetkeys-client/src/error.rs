//! Error types for client flows.
//!
//! Every failure aborts the flow it happened in and is returned to the
//! caller. The variants map one-to-one onto the questions a caller has to
//! answer: did the backend fail, did the payload not open, was the key not
//! ours, was the input bad, or is the record not in a usable state.

use thiserror::Error;
use vetkeys_crypto::CryptoError;

use crate::backend::BackendError;

/// Errors returned by [`VetKeyClient`](crate::VetKeyClient) and
/// [`TimelockClient`](crate::TimelockClient).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VetKeyError {
    /// Backend call failed or returned an application error
    #[error("{operation} failed: {source}")]
    Transport {
        /// Backend operation that failed
        operation: &'static str,
        /// Error reported by the backend
        #[source]
        source: BackendError,
    },

    /// Envelope or ciphertext could not be opened
    #[error("decryption failed: {reason}")]
    Decryption {
        /// Reason for decryption failure
        reason: String,
    },

    /// Decrypted key is not valid for the expected identity and public key
    #[error("verification failed: {reason}")]
    Verification {
        /// Reason for verification failure
        reason: String,
    },

    /// Client-side input validation failed; nothing was sent
    #[error("invalid {field}: {reason}")]
    Validation {
        /// Input that was rejected
        field: &'static str,
        /// Why it was rejected
        reason: String,
    },

    /// Operation is not possible in the record's current state
    #[error("timelock {record_id}: {violation}")]
    State {
        /// Record the operation targeted
        record_id: String,
        /// What about the record's state prevented the operation
        violation: StateViolation,
    },

    /// Symmetric ciphertext failed authentication
    #[error("authentication failed: {reason}")]
    Authentication {
        /// Reason for authentication failure
        reason: String,
    },

    /// Malformed hex or key bytes
    #[error("encoding error: {reason}")]
    Encoding {
        /// What was malformed
        reason: String,
    },
}

/// Why a timelock record cannot be used for the requested operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateViolation {
    /// Record exists but its encrypted content was never filled
    #[error("content not found (record was never filled)")]
    ContentNotFound,

    /// Record was created but filling it failed; it stays in
    /// [`TimelockState::Created`](crate::TimelockState::Created) until
    /// [`TimelockClient::encrypt_and_fill`](crate::TimelockClient::encrypt_and_fill)
    /// succeeds on it
    #[error("created but not filled: {cause}")]
    Unfilled {
        /// Error that aborted the fill
        cause: Box<VetKeyError>,
    },

    /// Unlock time has not been reached
    #[error("still locked until {unlock_timestamp}")]
    Locked {
        /// Unix seconds at which the record unlocks
        unlock_timestamp: u64,
    },

    /// Record is not among the caller's timelocks
    #[error("not found among caller's timelocks")]
    UnknownRecord,
}

/// Coarse classification of a [`VetKeyError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`VetKeyError::Transport`]
    Transport,
    /// See [`VetKeyError::Decryption`]
    Decryption,
    /// See [`VetKeyError::Verification`]
    Verification,
    /// See [`VetKeyError::Validation`]
    Validation,
    /// See [`VetKeyError::State`]
    State,
    /// See [`VetKeyError::Authentication`]
    Authentication,
    /// See [`VetKeyError::Encoding`]
    Encoding,
}

impl VetKeyError {
    pub(crate) fn transport(operation: &'static str, source: BackendError) -> Self {
        Self::Transport { operation, source }
    }

    pub(crate) fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation { field, reason: reason.into() }
    }

    pub(crate) fn state(record_id: &str, violation: StateViolation) -> Self {
        Self::State { record_id: record_id.to_string(), violation }
    }

    /// Classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport { .. } => ErrorKind::Transport,
            Self::Decryption { .. } => ErrorKind::Decryption,
            Self::Verification { .. } => ErrorKind::Verification,
            Self::Validation { .. } => ErrorKind::Validation,
            Self::State { .. } => ErrorKind::State,
            Self::Authentication { .. } => ErrorKind::Authentication,
            Self::Encoding { .. } => ErrorKind::Encoding,
        }
    }

    /// Returns true if re-running the whole operation may succeed.
    ///
    /// Decryption failures are retryable from scratch (new transport key);
    /// the client never retries on its own. Unavailable backends and records
    /// that are still locked may succeed later. An unfilled record is
    /// retried with `encrypt_and_fill` on its id, not by creating another.
    /// Everything else is a fixed property of the input or the key.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Decryption { .. } => true,
            Self::Transport { source, .. } => source.is_transient(),
            Self::State { violation: StateViolation::Unfilled { cause }, .. } => {
                cause.is_retryable()
            },
            Self::State { violation, .. } => matches!(violation, StateViolation::Locked { .. }),
            Self::Verification { .. }
            | Self::Validation { .. }
            | Self::Authentication { .. }
            | Self::Encoding { .. } => false,
        }
    }

    /// Returns true if the error indicates a key or payload that is not
    /// what it claims to be.
    ///
    /// Worth surfacing to an operator: a backend handing out keys that do
    /// not verify is either misconfigured or malicious.
    pub fn is_security_relevant(&self) -> bool {
        matches!(self, Self::Verification { .. } | Self::Authentication { .. })
    }

    /// Returns true for the never-filled timelock case.
    pub fn is_content_not_found(&self) -> bool {
        matches!(self, Self::State { violation: StateViolation::ContentNotFound, .. })
    }

    /// Id of the record left in `Created` by a failed fill, if that is what
    /// this error reports.
    pub fn unfilled_record(&self) -> Option<&str> {
        match self {
            Self::State { record_id, violation: StateViolation::Unfilled { .. } } => {
                Some(record_id)
            },
            _ => None,
        }
    }
}

/// Convert vetkeys-crypto errors at the crate boundary
impl From<CryptoError> for VetKeyError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::InvalidHex { reason } => Self::Encoding { reason },
            CryptoError::InvalidKey { what, reason } => {
                Self::Encoding { reason: format!("{what}: {reason}") }
            },
            CryptoError::DecryptionFailed { reason } => Self::Decryption { reason },
            CryptoError::VerificationFailed { reason } => Self::Verification { reason },
            CryptoError::AuthenticationFailed { reason } => Self::Authentication { reason },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crypto_errors_map_to_matching_kinds() {
        let cases = [
            (CryptoError::InvalidHex { reason: "odd".into() }, ErrorKind::Encoding),
            (
                CryptoError::InvalidKey { what: "derived public key", reason: "short".into() },
                ErrorKind::Encoding,
            ),
            (CryptoError::DecryptionFailed { reason: "tag".into() }, ErrorKind::Decryption),
            (CryptoError::VerificationFailed { reason: "pairing".into() }, ErrorKind::Verification),
            (CryptoError::AuthenticationFailed { reason: "tag".into() }, ErrorKind::Authentication),
        ];

        for (crypto, kind) in cases {
            assert_eq!(VetKeyError::from(crypto).kind(), kind);
        }
    }

    #[test]
    fn verification_is_security_relevant_and_final() {
        let err = VetKeyError::Verification { reason: "mismatch".into() };
        assert!(err.is_security_relevant());
        assert!(!err.is_retryable());
    }

    #[test]
    fn decryption_is_retryable_but_not_security_relevant() {
        let err = VetKeyError::Decryption { reason: "wrong transport key".into() };
        assert!(err.is_retryable());
        assert!(!err.is_security_relevant());
    }

    #[test]
    fn transport_retryability_follows_backend_error() {
        let unavailable =
            VetKeyError::transport("ibe_encryption_key", BackendError::Unavailable("down".into()));
        let denied = VetKeyError::transport("get_timelock_content", BackendError::AccessDenied);

        assert!(unavailable.is_retryable());
        assert!(!denied.is_retryable());
    }

    #[test]
    fn content_not_found_is_distinguishable() {
        let err = VetKeyError::state("timelock_x", StateViolation::ContentNotFound);
        assert!(err.is_content_not_found());
        assert_eq!(err.kind(), ErrorKind::State);
        assert_eq!(
            err.to_string(),
            "timelock timelock_x: content not found (record was never filled)"
        );
    }

    #[test]
    fn unfilled_record_carries_id_and_cause() {
        let cause = VetKeyError::transport(
            "update_timelock_content",
            BackendError::Unavailable("net".into()),
        );
        let err = VetKeyError::state(
            "timelock_ab_1_1",
            StateViolation::Unfilled { cause: Box::new(cause) },
        );

        assert_eq!(err.unfilled_record(), Some("timelock_ab_1_1"));
        assert!(err.is_retryable());
        assert_eq!(
            err.to_string(),
            "timelock timelock_ab_1_1: created but not filled: \
             update_timelock_content failed: backend unavailable: net"
        );
        assert_eq!(VetKeyError::state("x", StateViolation::UnknownRecord).unfilled_record(), None);
    }

    #[test]
    fn unfilled_record_with_permanent_cause_is_not_retryable() {
        let cause = VetKeyError::transport("update_timelock_content", BackendError::AccessDenied);
        let err =
            VetKeyError::state("timelock_x", StateViolation::Unfilled { cause: Box::new(cause) });
        assert!(!err.is_retryable());
    }

    #[test]
    fn transport_display_names_operation() {
        let err =
            VetKeyError::transport("get_timelock_decryption_key", BackendError::NotYetUnlocked);
        assert_eq!(
            err.to_string(),
            "get_timelock_decryption_key failed: timelock not yet expired"
        );
    }
}
