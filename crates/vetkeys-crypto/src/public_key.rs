//! Derived public keys
//!
//! A derived public key is a G2 point. The backend publishes one per
//! derivation context (symmetric keys, IBE, timelocks); it is the key that
//! vetKeys verify against and that IBE ciphertexts are encrypted to.

use ic_bls12_381::{G2Affine, G2Projective};

use crate::{
    error::CryptoError,
    hash::{CONTEXT_LABEL, hash_to_scalar},
};

/// Size of a compressed G2 point
pub const DERIVED_PUBLIC_KEY_SIZE: usize = 96;

/// Public key for a derivation context (the "master public key" of a feature).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DerivedPublicKey {
    point: G2Affine,
}

impl DerivedPublicKey {
    /// Parse a compressed G2 point.
    ///
    /// # Errors
    ///
    /// - `InvalidKey`: wrong length, not on the curve, or the identity element
    pub fn deserialize(bytes: &[u8]) -> Result<Self, CryptoError> {
        let array: &[u8; DERIVED_PUBLIC_KEY_SIZE] = bytes.try_into().map_err(|_| {
            CryptoError::invalid_key(
                "derived public key",
                format!("expected {DERIVED_PUBLIC_KEY_SIZE} bytes, got {}", bytes.len()),
            )
        })?;

        let point = Option::<G2Affine>::from(G2Affine::from_compressed(array))
            .ok_or_else(|| CryptoError::invalid_key("derived public key", "not a G2 point"))?;

        if bool::from(point.is_identity()) {
            return Err(CryptoError::invalid_key("derived public key", "identity element"));
        }

        Ok(Self { point })
    }

    /// Compressed 96-byte encoding.
    pub fn serialize(&self) -> [u8; DERIVED_PUBLIC_KEY_SIZE] {
        self.point.to_compressed()
    }

    /// Derive the public key of a sub-context.
    ///
    /// `pk' = pk + g2 * H(pk || context)`. The matching secret key is derived
    /// the same way by [`crate::MasterSecretKey::derived_secret`], so clients
    /// can compute per-context keys from one master key without a round trip.
    pub fn derive_sub_key(&self, context: &[u8]) -> Self {
        let offset = hash_to_scalar(CONTEXT_LABEL, &[&self.serialize(), context]);
        let point = G2Projective::from(self.point) + G2Affine::generator() * offset;
        Self { point: G2Affine::from(point) }
    }

    pub(crate) fn point(&self) -> &G2Affine {
        &self.point
    }

    pub(crate) fn from_point(point: G2Affine) -> Self {
        Self { point }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_key() -> DerivedPublicKey {
        DerivedPublicKey::from_point(G2Affine::from(G2Affine::generator() * offset_scalar()))
    }

    fn offset_scalar() -> ic_bls12_381::Scalar {
        hash_to_scalar(b"test", &[b"sample"])
    }

    #[test]
    fn serialize_deserialize_preserves_key() {
        let key = sample_key();
        let parsed = DerivedPublicKey::deserialize(&key.serialize()).unwrap();
        assert_eq!(parsed, key);
    }

    #[test]
    fn rejects_wrong_length() {
        let err = DerivedPublicKey::deserialize(&[0u8; 48]).unwrap_err();
        assert!(matches!(err, CryptoError::InvalidKey { .. }));
    }

    #[test]
    fn rejects_garbage_bytes() {
        let err = DerivedPublicKey::deserialize(&[0x5a; DERIVED_PUBLIC_KEY_SIZE]).unwrap_err();
        assert!(matches!(err, CryptoError::InvalidKey { .. }));
    }

    #[test]
    fn rejects_identity() {
        let identity = G2Affine::identity().to_compressed();
        let err = DerivedPublicKey::deserialize(&identity).unwrap_err();
        assert!(err.to_string().contains("identity"));
    }

    #[test]
    fn sub_keys_differ_per_context() {
        let key = sample_key();
        let a = key.derive_sub_key(b"symmetric_key");
        let b = key.derive_sub_key(b"ibe_encryption");

        assert_ne!(a, b);
        assert_ne!(a, key);
        assert_eq!(a, key.derive_sub_key(b"symmetric_key"));
    }
}
