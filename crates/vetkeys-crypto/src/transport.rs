//! Ephemeral transport keys
//!
//! A transport keypair exists for exactly one key fetch: the public half is
//! sent to the backend, the backend encrypts the derived key to it, and the
//! secret half opens that one envelope. [`TransportSecretKey`] is consumed by
//! [`crate::EncryptedVetKey::decrypt`] (and `decrypt_and_verify`), so the
//! type system enforces single use.

use ic_bls12_381::{G1Affine, Scalar};
use zeroize::Zeroize;

use crate::{
    error::CryptoError,
    hash::{TRANSPORT_LABEL, hash_to_scalar},
};

/// Size of a compressed G1 transport public key
pub const TRANSPORT_PUBLIC_KEY_SIZE: usize = 48;

/// Size of the caller-provided randomness for key generation
pub const TRANSPORT_SEED_SIZE: usize = 32;

/// Secret half of a transport keypair. Never serialized.
pub struct TransportSecretKey {
    secret: Scalar,
    public_key: [u8; TRANSPORT_PUBLIC_KEY_SIZE],
}

impl TransportSecretKey {
    /// Generate a transport keypair from caller-provided random bytes.
    ///
    /// Caller MUST provide cryptographically secure random bytes in
    /// production; the seed is zeroized after the scalar is derived.
    pub fn generate(mut seed: [u8; TRANSPORT_SEED_SIZE]) -> Self {
        let secret = hash_to_scalar(TRANSPORT_LABEL, &[&seed]);
        seed.zeroize();

        let public_key = G1Affine::from(G1Affine::generator() * secret).to_compressed();
        Self { secret, public_key }
    }

    /// Compressed public key to send to the backend.
    pub fn public_key_bytes(&self) -> [u8; TRANSPORT_PUBLIC_KEY_SIZE] {
        self.public_key
    }

    pub(crate) fn secret(&self) -> &Scalar {
        &self.secret
    }
}

impl Drop for TransportSecretKey {
    fn drop(&mut self) {
        self.secret.zeroize();
    }
}

impl std::fmt::Debug for TransportSecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportSecretKey")
            .field("public_key", &crate::hex_codec::encode(self.public_key))
            .finish_non_exhaustive()
    }
}

/// Parse a transport public key received over the wire.
///
/// Used on the deriving side to encrypt a vetKey to the requester.
///
/// # Errors
///
/// - `InvalidKey`: wrong length, not a G1 point, or the identity element
pub fn parse_transport_public_key(bytes: &[u8]) -> Result<G1Affine, CryptoError> {
    let array: &[u8; TRANSPORT_PUBLIC_KEY_SIZE] = bytes.try_into().map_err(|_| {
        CryptoError::invalid_key(
            "transport public key",
            format!("expected {TRANSPORT_PUBLIC_KEY_SIZE} bytes, got {}", bytes.len()),
        )
    })?;

    let point = Option::<G1Affine>::from(G1Affine::from_compressed(array))
        .ok_or_else(|| CryptoError::invalid_key("transport public key", "not a G1 point"))?;

    if bool::from(point.is_identity()) {
        return Err(CryptoError::invalid_key("transport public key", "identity element"));
    }

    Ok(point)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_key_is_a_valid_point() {
        let tsk = TransportSecretKey::generate([7u8; TRANSPORT_SEED_SIZE]);
        let parsed = parse_transport_public_key(&tsk.public_key_bytes()).unwrap();
        assert_eq!(parsed.to_compressed(), tsk.public_key_bytes());
    }

    #[test]
    fn generation_is_deterministic_in_seed() {
        let a = TransportSecretKey::generate([1u8; TRANSPORT_SEED_SIZE]);
        let b = TransportSecretKey::generate([1u8; TRANSPORT_SEED_SIZE]);
        let c = TransportSecretKey::generate([2u8; TRANSPORT_SEED_SIZE]);

        assert_eq!(a.public_key_bytes(), b.public_key_bytes());
        assert_ne!(a.public_key_bytes(), c.public_key_bytes());
    }

    #[test]
    fn secret_scalar_zeroizes_to_zero() {
        let tsk = TransportSecretKey::generate([7u8; TRANSPORT_SEED_SIZE]);
        let mut secret = *tsk.secret();
        assert_ne!(secret, Scalar::zero());

        // Same call the Drop impl makes
        secret.zeroize();
        assert_eq!(secret, Scalar::zero());
    }

    #[test]
    fn debug_does_not_print_secret() {
        let tsk = TransportSecretKey::generate([3u8; TRANSPORT_SEED_SIZE]);
        let rendered = format!("{tsk:?}");
        assert!(rendered.contains("public_key"));
        assert!(!rendered.contains("secret"));
    }

    #[test]
    fn rejects_short_public_key() {
        let err = parse_transport_public_key(&[1, 2, 3]).unwrap_err();
        assert_eq!(err.to_string(), "invalid transport public key: expected 48 bytes, got 3");
    }

    #[test]
    fn rejects_identity_public_key() {
        let identity = G1Affine::identity().to_compressed();
        assert!(parse_transport_public_key(&identity).is_err());
    }
}
