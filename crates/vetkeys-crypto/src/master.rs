//! Deriving side of the protocol
//!
//! Real deployments split the master secret across backend replicas and
//! combine threshold shares. [`MasterSecretKey`] is the single-holder
//! equivalent: it produces exactly the same public keys, vetKeys and
//! envelopes, which is what simulations and tests need.

use ic_bls12_381::{G1Affine, G2Affine, Scalar};
use zeroize::Zeroize;

use crate::{
    envelope::{ENVELOPE_SEED_SIZE, EncryptedVetKey},
    error::CryptoError,
    hash::{CONTEXT_LABEL, hash_to_g1, hash_to_scalar},
    public_key::DerivedPublicKey,
    vetkey::VetKey,
};

/// Label for expanding a seed into the master secret scalar
const MASTER_LABEL: &[u8] = b"vetkeys-master-secret";

/// Master secret key held by a (simulated) deriving backend.
pub struct MasterSecretKey {
    secret: Scalar,
    public_key: DerivedPublicKey,
}

impl MasterSecretKey {
    /// Deterministically create a master key from a 32-byte seed.
    pub fn from_seed(mut seed: [u8; 32]) -> Self {
        let secret = hash_to_scalar(MASTER_LABEL, &[&seed]);
        seed.zeroize();

        let public_key =
            DerivedPublicKey::from_point(G2Affine::from(G2Affine::generator() * secret));
        Self { secret, public_key }
    }

    /// The root public key (before any context derivation).
    pub fn public_key(&self) -> DerivedPublicKey {
        self.public_key
    }

    /// Public key for a derivation context.
    ///
    /// Equal to `self.public_key().derive_sub_key(context)`.
    pub fn derived_public_key(&self, context: &[u8]) -> DerivedPublicKey {
        self.public_key.derive_sub_key(context)
    }

    /// Compute the vetKey for `input` under `context`.
    pub fn derive_vetkey(&self, context: &[u8], input: &[u8]) -> VetKey {
        let derived_public_key = self.derived_public_key(context);
        let mut secret = self.derived_secret(context);
        let message = hash_to_g1(&derived_public_key.serialize(), input);

        let point = G1Affine::from(message * secret);
        secret.zeroize();
        VetKey::from_point(point)
    }

    /// Derive the vetKey for `input` and encrypt it to a transport key.
    ///
    /// # Errors
    ///
    /// - `InvalidKey`: the transport public key is malformed
    pub fn encrypt_vetkey(
        &self,
        context: &[u8],
        input: &[u8],
        transport_public_key: &[u8],
        seed: [u8; ENVELOPE_SEED_SIZE],
    ) -> Result<EncryptedVetKey, CryptoError> {
        let vetkey = self.derive_vetkey(context, input);
        EncryptedVetKey::encrypt(&vetkey, transport_public_key, seed)
    }

    /// Secret scalar matching [`DerivedPublicKey::derive_sub_key`].
    fn derived_secret(&self, context: &[u8]) -> Scalar {
        let offset = hash_to_scalar(CONTEXT_LABEL, &[&self.public_key.serialize(), context]);
        self.secret + offset
    }
}

impl Drop for MasterSecretKey {
    fn drop(&mut self) {
        self.secret.zeroize();
    }
}

impl std::fmt::Debug for MasterSecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MasterSecretKey")
            .field("public_key", &self.public_key)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_public_key_matches_sub_key_derivation() {
        let msk = MasterSecretKey::from_seed([3u8; 32]);
        assert_eq!(msk.derived_public_key(b"ctx"), msk.public_key().derive_sub_key(b"ctx"));
    }

    #[test]
    fn same_seed_same_keys() {
        let a = MasterSecretKey::from_seed([3u8; 32]);
        let b = MasterSecretKey::from_seed([3u8; 32]);

        assert_eq!(a.public_key(), b.public_key());
        assert_eq!(a.derive_vetkey(b"ctx", b"in"), b.derive_vetkey(b"ctx", b"in"));
    }

    #[test]
    fn different_seeds_different_keys() {
        let a = MasterSecretKey::from_seed([3u8; 32]);
        let b = MasterSecretKey::from_seed([4u8; 32]);
        assert_ne!(a.public_key(), b.public_key());
    }

    #[test]
    fn derived_vetkey_verifies_against_derived_public_key() {
        let msk = MasterSecretKey::from_seed([3u8; 32]);
        let key = msk.derive_vetkey(b"timelock_encryption", b"timelock_abc");
        let dpk = msk.derived_public_key(b"timelock_encryption");
        assert!(key.verify(&dpk, b"timelock_abc").is_ok());
    }
}
