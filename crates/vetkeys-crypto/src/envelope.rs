//! Encrypted key envelopes
//!
//! The backend never returns a vetKey in the clear. It blinds the key with
//! the requester's transport public key:
//!
//! ```text
//! c1 = g1 * r
//! c2 = g2 * r
//! c3 = k + tpk * r
//! tag = H(tpk || c1 || tpk * r)
//! ```
//!
//! Opening is a two-stage check. Stage one proves the envelope was made for
//! this transport key (`c1 * tsk == tpk * r`, confirmed by the tag) and is
//! well formed (`e(c1, g2) == e(g1, c2)`); any failure is a decryption
//! error. Stage two verifies the unblinded key against the expected derived
//! public key and identity; a failure there is a verification error.
//!
//! Wire layout: `c1 (48) || c2 (96) || c3 (48) || tag (32)`.

use ic_bls12_381::{G1Affine, G1Projective, G2Affine, Scalar, pairing};
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use crate::{
    error::CryptoError,
    hash::{CONFIRMATION_LABEL, ENVELOPE_LABEL, expand, hash_to_scalar},
    public_key::DerivedPublicKey,
    transport::{TransportSecretKey, parse_transport_public_key},
    vetkey::VetKey,
};

/// Size of a serialized envelope
pub const ENCRYPTED_VETKEY_SIZE: usize = 48 + 96 + 48 + 32;

/// Size of the caller-provided blinding randomness
pub const ENVELOPE_SEED_SIZE: usize = 32;

/// A vetKey encrypted to one transport public key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedVetKey {
    c1: G1Affine,
    c2: G2Affine,
    c3: G1Affine,
    tag: [u8; 32],
}

impl EncryptedVetKey {
    /// Parse the wire form of an envelope.
    ///
    /// # Errors
    ///
    /// - `DecryptionFailed`: wrong length or a component is not a valid point
    pub fn deserialize(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != ENCRYPTED_VETKEY_SIZE {
            return Err(CryptoError::decryption(format!(
                "envelope must be {ENCRYPTED_VETKEY_SIZE} bytes, got {}",
                bytes.len()
            )));
        }

        let (c1, rest) = bytes.split_at(48);
        let (c2, rest) = rest.split_at(96);
        let (c3, tag) = rest.split_at(48);

        Ok(Self {
            c1: parse_g1(c1, "c1")?,
            c2: parse_g2(c2)?,
            c3: parse_g1(c3, "c3")?,
            tag: tag.try_into().map_err(|_| CryptoError::decryption("malformed tag"))?,
        })
    }

    /// Wire form of the envelope.
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(ENCRYPTED_VETKEY_SIZE);
        out.extend_from_slice(&self.c1.to_compressed());
        out.extend_from_slice(&self.c2.to_compressed());
        out.extend_from_slice(&self.c3.to_compressed());
        out.extend_from_slice(&self.tag);
        out
    }

    /// Open the envelope and verify the key it carries.
    ///
    /// Consumes the transport secret key: one keypair opens one envelope.
    ///
    /// # Errors
    ///
    /// - `DecryptionFailed`: the envelope was made for another transport key
    ///   or is malformed
    /// - `VerificationFailed`: the key does not validate against
    ///   `(derived_public_key, input)`
    pub fn decrypt_and_verify(
        &self,
        transport_secret: TransportSecretKey,
        derived_public_key: &DerivedPublicKey,
        input: &[u8],
    ) -> Result<VetKey, CryptoError> {
        self.decrypt(transport_secret)?.verify(derived_public_key, input)
    }

    /// Stage one only: unblind the key without verifying it.
    ///
    /// The result cannot be used until [`UnverifiedVetKey::verify`] succeeds.
    /// Splitting the stages lets a caller retry verification against a
    /// refreshed public key without a second key request.
    ///
    /// # Errors
    ///
    /// - `DecryptionFailed`: the envelope was made for another transport key
    ///   or is malformed
    pub fn decrypt(
        &self,
        transport_secret: TransportSecretKey,
    ) -> Result<UnverifiedVetKey, CryptoError> {
        let mut shared = G1Affine::from(self.c1 * transport_secret.secret());
        let expected_tag =
            confirmation_tag(&transport_secret.public_key_bytes(), &self.c1, &shared);

        if !bool::from(expected_tag.as_slice().ct_eq(self.tag.as_slice())) {
            shared.zeroize();
            return Err(CryptoError::decryption(
                "envelope was not encrypted to this transport key",
            ));
        }

        let blinding_consistent = pairing(&self.c1, &G2Affine::generator())
            == pairing(&G1Affine::generator(), &self.c2);
        if !blinding_consistent {
            shared.zeroize();
            return Err(CryptoError::decryption("inconsistent envelope blinding"));
        }

        let key = G1Affine::from(G1Projective::from(self.c3) - G1Projective::from(shared));
        shared.zeroize();
        Ok(UnverifiedVetKey { point: key })
    }

    /// Encrypt a vetKey to a transport public key.
    ///
    /// This is the deriving side of the protocol, used by backends and
    /// simulations. Caller MUST provide fresh random bytes in production.
    ///
    /// # Errors
    ///
    /// - `InvalidKey`: the transport public key is not a valid G1 point
    pub fn encrypt(
        vetkey: &VetKey,
        transport_public_key: &[u8],
        seed: [u8; ENVELOPE_SEED_SIZE],
    ) -> Result<Self, CryptoError> {
        let tpk = parse_transport_public_key(transport_public_key)?;
        let r: Scalar = hash_to_scalar(ENVELOPE_LABEL, &[&seed, transport_public_key]);

        let c1 = G1Affine::from(G1Affine::generator() * r);
        let c2 = G2Affine::from(G2Affine::generator() * r);
        let shared = G1Affine::from(tpk * r);
        let c3 = G1Affine::from(G1Projective::from(*vetkey.point()) + G1Projective::from(shared));
        let tag = confirmation_tag(&tpk.to_compressed(), &c1, &shared);

        Ok(Self { c1, c2, c3, tag })
    }
}

/// A key taken out of an envelope that has not been verified yet.
pub struct UnverifiedVetKey {
    point: G1Affine,
}

impl UnverifiedVetKey {
    /// Verify against `(derived_public_key, input)`.
    ///
    /// Borrows `self` so a failed check can be repeated with another public
    /// key.
    ///
    /// # Errors
    ///
    /// - `VerificationFailed`: see [`VetKey::verify`]
    pub fn verify(
        &self,
        derived_public_key: &DerivedPublicKey,
        input: &[u8],
    ) -> Result<VetKey, CryptoError> {
        let vetkey = VetKey::from_point(self.point);
        vetkey.verify(derived_public_key, input)?;
        Ok(vetkey)
    }
}

impl Drop for UnverifiedVetKey {
    fn drop(&mut self) {
        self.point.zeroize();
    }
}

impl std::fmt::Debug for UnverifiedVetKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("UnverifiedVetKey(..)")
    }
}

fn confirmation_tag(transport_public_key: &[u8], c1: &G1Affine, shared: &G1Affine) -> [u8; 32] {
    expand(
        CONFIRMATION_LABEL,
        &[transport_public_key, &c1.to_compressed(), &shared.to_compressed()],
    )
}

fn parse_g1(bytes: &[u8], what: &str) -> Result<G1Affine, CryptoError> {
    let array: &[u8; 48] =
        bytes.try_into().map_err(|_| CryptoError::decryption(format!("malformed {what}")))?;
    Option::<G1Affine>::from(G1Affine::from_compressed(array))
        .ok_or_else(|| CryptoError::decryption(format!("{what} is not a G1 point")))
}

fn parse_g2(bytes: &[u8]) -> Result<G2Affine, CryptoError> {
    let array: &[u8; 96] =
        bytes.try_into().map_err(|_| CryptoError::decryption("malformed c2"))?;
    Option::<G2Affine>::from(G2Affine::from_compressed(array))
        .ok_or_else(|| CryptoError::decryption("c2 is not a G2 point"))
}
