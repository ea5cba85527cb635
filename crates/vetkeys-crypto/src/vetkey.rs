//! Verified derived keys (vetKeys)
//!
//! A vetKey is a BLS signature in G1 over `derived_public_key || input`
//! under the backend's derived secret key. It can be checked by anyone who
//! knows the derived public key, which is what lets the client reject keys
//! issued for the wrong identity.

use ic_bls12_381::{G1Affine, G2Affine, pairing};
use zeroize::Zeroize;

use crate::{
    error::CryptoError, hash::hash_to_g1, key_material::DerivedKeyMaterial,
    public_key::DerivedPublicKey,
};

/// Size of a compressed vetKey
pub const VETKEY_SIZE: usize = 48;

/// A derived key that has been verified for a specific (public key, input).
#[derive(Clone, PartialEq, Eq)]
pub struct VetKey {
    point: G1Affine,
}

impl VetKey {
    /// Check the key against `(derived_public_key, input)`.
    ///
    /// Verifies `e(k, g2) == e(H(dpk || input), dpk)`.
    ///
    /// # Errors
    ///
    /// - `VerificationFailed`: the key was derived for another identity or
    ///   under another public key
    pub fn verify(
        &self,
        derived_public_key: &DerivedPublicKey,
        input: &[u8],
    ) -> Result<(), CryptoError> {
        if bool::from(self.point.is_identity()) {
            return Err(CryptoError::VerificationFailed { reason: "identity element".into() });
        }

        let message = hash_to_g1(&derived_public_key.serialize(), input);
        let lhs = pairing(&self.point, &G2Affine::generator());
        let rhs = pairing(&message, derived_public_key.point());

        if lhs == rhs {
            Ok(())
        } else {
            Err(CryptoError::VerificationFailed {
                reason: "key does not match the expected public key and identity".into(),
            })
        }
    }

    /// Parse and verify a vetKey in one step.
    ///
    /// # Errors
    ///
    /// - `InvalidKey`: bytes are not a compressed G1 point
    /// - `VerificationFailed`: see [`VetKey::verify`]
    pub fn deserialize_verified(
        bytes: &[u8],
        derived_public_key: &DerivedPublicKey,
        input: &[u8],
    ) -> Result<Self, CryptoError> {
        let array: &[u8; VETKEY_SIZE] = bytes.try_into().map_err(|_| {
            CryptoError::invalid_key(
                "vetKey",
                format!("expected {VETKEY_SIZE} bytes, got {}", bytes.len()),
            )
        })?;
        let point = Option::<G1Affine>::from(G1Affine::from_compressed(array))
            .ok_or_else(|| CryptoError::invalid_key("vetKey", "not a G1 point"))?;

        let key = Self { point };
        key.verify(derived_public_key, input)?;
        Ok(key)
    }

    /// Compressed 48-byte encoding.
    pub fn serialize(&self) -> [u8; VETKEY_SIZE] {
        self.point.to_compressed()
    }

    /// Symmetric key material for authenticated encryption.
    pub fn as_derived_key_material(&self) -> DerivedKeyMaterial {
        DerivedKeyMaterial::from_vetkey_bytes(&self.serialize())
    }

    pub(crate) fn point(&self) -> &G1Affine {
        &self.point
    }

    pub(crate) fn from_point(point: G1Affine) -> Self {
        Self { point }
    }
}

impl Drop for VetKey {
    fn drop(&mut self) {
        self.point.zeroize();
    }
}

impl std::fmt::Debug for VetKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("VetKey(..)")
    }
}
