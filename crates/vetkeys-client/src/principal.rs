//! Caller identity as seen by the backend.

use std::fmt;

use crate::error::VetKeyError;

/// Maximum length of a principal's canonical encoding
pub const MAX_PRINCIPAL_LEN: usize = 29;

/// Canonical encoding of the anonymous principal
const ANONYMOUS: [u8; 1] = [0x04];

/// Authenticated caller identity.
///
/// Opaque bytes; the non-timelock flows use them verbatim as the key
/// derivation input, so two callers with equal bytes share keys.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Principal {
    bytes: Vec<u8>,
}

impl Principal {
    /// Principal from its canonical bytes.
    ///
    /// # Errors
    ///
    /// - `Validation`: longer than [`MAX_PRINCIPAL_LEN`] bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self, VetKeyError> {
        if bytes.len() > MAX_PRINCIPAL_LEN {
            return Err(VetKeyError::Validation {
                field: "principal",
                reason: format!(
                    "principal must be at most {MAX_PRINCIPAL_LEN} bytes, got {}",
                    bytes.len()
                ),
            });
        }
        Ok(Self { bytes: bytes.to_vec() })
    }

    /// The anonymous principal (unauthenticated caller).
    pub fn anonymous() -> Self {
        Self { bytes: ANONYMOUS.to_vec() }
    }

    /// Whether this is the anonymous principal.
    pub fn is_anonymous(&self) -> bool {
        self.bytes == ANONYMOUS
    }

    /// Canonical bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&vetkeys_crypto::hex_codec::encode(&self.bytes))
    }
}

impl fmt::Debug for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Principal({self})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_is_recognised() {
        assert!(Principal::anonymous().is_anonymous());
        assert!(!Principal::from_slice(&[1, 2, 3]).unwrap().is_anonymous());
    }

    #[test]
    fn rejects_oversized_principal() {
        let err = Principal::from_slice(&[0u8; 30]).unwrap_err();
        assert!(matches!(err, VetKeyError::Validation { field: "principal", .. }));
    }

    #[test]
    fn accepts_maximum_length() {
        assert!(Principal::from_slice(&[7u8; MAX_PRINCIPAL_LEN]).is_ok());
    }

    #[test]
    fn displays_as_hex() {
        let principal = Principal::from_slice(&[0xAB, 0x01]).unwrap();
        assert_eq!(principal.to_string(), "ab01");
        assert_eq!(format!("{principal:?}"), "Principal(ab01)");
    }
}
