//! Identity-based encryption
//!
//! Boneh-Franklin style IBE over BLS12-381 with a Fujisaki-Okamoto check.
//! The identity point is the same `H(dpk || identity)` the backend signs, so
//! a vetKey derived for an identity is exactly its IBE decryption key.
//!
//! ```text
//! t    = H(seed || msg)
//! c1   = g2 * t
//! c2   = seed XOR H(e(H(dpk || id), dpk)^t)
//! body = AEAD(H(seed), msg)
//! ```
//!
//! Decryption recovers the seed with `e(k, c1)`, opens the body and
//! re-derives `t`; if `g2 * t != c1` the key belonged to another identity or
//! master key and the ciphertext is rejected.
//!
//! Wire layout: `"VETK-IBE" (8) || c1 (96) || c2 (32) || body`.

use chacha20poly1305::{
    XChaCha20Poly1305, XNonce,
    aead::{Aead, KeyInit, Payload},
};
use ic_bls12_381::{G1Affine, G2Affine, pairing};
use zeroize::Zeroize;

use crate::{
    error::CryptoError,
    hash::{
        IBE_EXPONENT_LABEL, IBE_MASK_LABEL, IBE_PAYLOAD_LABEL, expand, hash_to_g1, hash_to_scalar,
    },
    public_key::DerivedPublicKey,
    vetkey::VetKey,
};

/// Format header for IBE ciphertexts
const HEADER: &[u8; 8] = b"VETK-IBE";

/// Size of the encryption seed
pub const IBE_SEED_SIZE: usize = 32;

/// Size of the compressed G2 component
const C1_SIZE: usize = 96;

/// Poly1305 tag size (16 bytes)
const POLY1305_TAG_SIZE: usize = 16;

/// Smallest well-formed ciphertext (empty plaintext)
const MIN_CIPHERTEXT_SIZE: usize = HEADER.len() + C1_SIZE + IBE_SEED_SIZE + POLY1305_TAG_SIZE;

/// The payload key is single-use (fresh seed per ciphertext), so a fixed
/// nonce is sound.
const PAYLOAD_NONCE: [u8; 24] = [0u8; 24];

/// Identity an IBE ciphertext is bound to.
///
/// Opaque bytes: a principal's canonical encoding or an application token
/// such as a timelock identity string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IbeIdentity {
    bytes: Vec<u8>,
}

impl IbeIdentity {
    /// Identity from raw bytes.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self { bytes: bytes.into() }
    }

    /// Identity of a principal, from its canonical byte encoding.
    ///
    /// Matches the input the backend uses when deriving a key "for caller".
    pub fn from_principal(principal: &[u8]) -> Self {
        Self::from_bytes(principal)
    }

    /// Identity from a UTF-8 string (encoded as its bytes).
    pub fn from_string(identity: &str) -> Self {
        Self::from_bytes(identity.as_bytes())
    }

    /// Raw identity bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Randomness for one IBE encryption.
pub struct IbeSeed {
    bytes: [u8; IBE_SEED_SIZE],
}

impl IbeSeed {
    /// Seed from caller-provided random bytes.
    ///
    /// Caller MUST provide cryptographically secure random bytes in
    /// production; reusing a seed for the same message reproduces the
    /// ciphertext.
    pub fn from_bytes(bytes: [u8; IBE_SEED_SIZE]) -> Self {
        Self { bytes }
    }
}

impl Drop for IbeSeed {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

/// Serialized-form IBE ciphertext.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IbeCiphertext {
    c1: G2Affine,
    c2: [u8; IBE_SEED_SIZE],
    body: Vec<u8>,
}

impl IbeCiphertext {
    /// Encrypt `plaintext` to `identity` under `derived_public_key`.
    pub fn encrypt(
        derived_public_key: &DerivedPublicKey,
        identity: &IbeIdentity,
        plaintext: &[u8],
        seed: &IbeSeed,
    ) -> Self {
        let t = hash_to_scalar(IBE_EXPONENT_LABEL, &[&seed.bytes, plaintext]);
        let c1 = G2Affine::from(G2Affine::generator() * t);

        let identity_point = hash_to_g1(&derived_public_key.serialize(), identity.as_bytes());
        let mut shared = pairing(&G1Affine::from(identity_point * t), derived_public_key.point());

        let mut mask: [u8; IBE_SEED_SIZE] =
            expand(IBE_MASK_LABEL, &[&shared.to_bytes(), &c1.to_compressed()]);
        shared.zeroize();
        let c2 = xor(&seed.bytes, &mask);
        mask.zeroize();

        let body = seal_payload(&seed.bytes, &c1, plaintext);
        Self { c1, c2, body }
    }

    /// Decrypt with the vetKey derived for this ciphertext's identity.
    ///
    /// # Errors
    ///
    /// - `DecryptionFailed`: the key was derived for another identity or
    ///   master key, or the ciphertext was modified
    pub fn decrypt(&self, vetkey: &VetKey) -> Result<Vec<u8>, CryptoError> {
        let mut shared = pairing(vetkey.point(), &self.c1);
        let mut mask: [u8; IBE_SEED_SIZE] =
            expand(IBE_MASK_LABEL, &[&shared.to_bytes(), &self.c1.to_compressed()]);
        shared.zeroize();
        let mut seed = xor(&self.c2, &mask);
        mask.zeroize();

        let opened = open_payload(&seed, &self.c1, &self.body);
        let result = opened.and_then(|plaintext| {
            let t = hash_to_scalar(IBE_EXPONENT_LABEL, &[&seed, &plaintext]);
            if G2Affine::from(G2Affine::generator() * t) == self.c1 {
                Ok(plaintext)
            } else {
                Err(CryptoError::decryption("ciphertext does not match recovered seed"))
            }
        });

        seed.zeroize();
        result
    }

    /// Wire form of the ciphertext.
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER.len() + C1_SIZE + IBE_SEED_SIZE + self.body.len());
        out.extend_from_slice(HEADER);
        out.extend_from_slice(&self.c1.to_compressed());
        out.extend_from_slice(&self.c2);
        out.extend_from_slice(&self.body);
        out
    }

    /// Parse the wire form of a ciphertext.
    ///
    /// # Errors
    ///
    /// - `DecryptionFailed`: truncated input, unknown header or an invalid
    ///   G2 component
    pub fn deserialize(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() < MIN_CIPHERTEXT_SIZE {
            return Err(CryptoError::decryption(format!(
                "IBE ciphertext too short: {} bytes, need at least {MIN_CIPHERTEXT_SIZE}",
                bytes.len()
            )));
        }

        let (header, rest) = bytes.split_at(HEADER.len());
        if header != HEADER {
            return Err(CryptoError::decryption("unknown IBE ciphertext header"));
        }

        let (c1, rest) = rest.split_at(C1_SIZE);
        let (c2, body) = rest.split_at(IBE_SEED_SIZE);

        let c1: &[u8; C1_SIZE] =
            c1.try_into().map_err(|_| CryptoError::decryption("malformed c1"))?;
        let c1 = Option::<G2Affine>::from(G2Affine::from_compressed(c1))
            .ok_or_else(|| CryptoError::decryption("c1 is not a G2 point"))?;

        Ok(Self {
            c1,
            c2: c2.try_into().map_err(|_| CryptoError::decryption("malformed c2"))?,
            body: body.to_vec(),
        })
    }
}

fn xor(a: &[u8; IBE_SEED_SIZE], b: &[u8; IBE_SEED_SIZE]) -> [u8; IBE_SEED_SIZE] {
    let mut out = [0u8; IBE_SEED_SIZE];
    for i in 0..IBE_SEED_SIZE {
        out[i] = a[i] ^ b[i];
    }
    out
}

fn payload_cipher(seed: &[u8; IBE_SEED_SIZE]) -> XChaCha20Poly1305 {
    let mut key: [u8; 32] = expand(IBE_PAYLOAD_LABEL, &[seed]);
    let cipher = XChaCha20Poly1305::new((&key).into());
    key.zeroize();
    cipher
}

fn seal_payload(seed: &[u8; IBE_SEED_SIZE], c1: &G2Affine, plaintext: &[u8]) -> Vec<u8> {
    let aad = c1.to_compressed();
    let payload = Payload { msg: plaintext, aad: &aad };

    let Ok(body) = payload_cipher(seed).encrypt(XNonce::from_slice(&PAYLOAD_NONCE), payload) else {
        unreachable!("XChaCha20-Poly1305 encryption cannot fail with valid inputs");
    };
    body
}

fn open_payload(
    seed: &[u8; IBE_SEED_SIZE],
    c1: &G2Affine,
    body: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let aad = c1.to_compressed();
    let payload = Payload { msg: body, aad: &aad };

    payload_cipher(seed)
        .decrypt(XNonce::from_slice(&PAYLOAD_NONCE), payload)
        .map_err(|_| CryptoError::decryption("key does not open this IBE ciphertext"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MasterSecretKey;

    const CONTEXT: &[u8] = b"ibe_encryption";

    fn setup() -> (MasterSecretKey, DerivedPublicKey) {
        let msk = MasterSecretKey::from_seed([11u8; 32]);
        let dpk = msk.derived_public_key(CONTEXT);
        (msk, dpk)
    }

    #[test]
    fn encrypt_decrypt_roundtrip() {
        let (msk, dpk) = setup();
        let identity = IbeIdentity::from_string("alice");

        let ciphertext =
            IbeCiphertext::encrypt(&dpk, &identity, b"hello alice", &IbeSeed::from_bytes([1; 32]));
        let key = msk.derive_vetkey(CONTEXT, identity.as_bytes());

        assert_eq!(ciphertext.decrypt(&key).unwrap(), b"hello alice");
    }

    #[test]
    fn encrypt_decrypt_empty_plaintext() {
        let (msk, dpk) = setup();
        let identity = IbeIdentity::from_bytes(vec![0x04]);

        let ciphertext =
            IbeCiphertext::encrypt(&dpk, &identity, b"", &IbeSeed::from_bytes([2; 32]));
        let key = msk.derive_vetkey(CONTEXT, identity.as_bytes());

        assert_eq!(ciphertext.serialize().len(), MIN_CIPHERTEXT_SIZE);
        assert_eq!(ciphertext.decrypt(&key).unwrap(), b"");
    }

    #[test]
    fn different_seeds_produce_different_ciphertexts() {
        let (_, dpk) = setup();
        let identity = IbeIdentity::from_string("alice");

        let a = IbeCiphertext::encrypt(&dpk, &identity, b"same", &IbeSeed::from_bytes([1; 32]));
        let b = IbeCiphertext::encrypt(&dpk, &identity, b"same", &IbeSeed::from_bytes([2; 32]));

        assert_ne!(a.serialize(), b.serialize());
    }

    #[test]
    fn key_for_other_identity_fails() {
        let (msk, dpk) = setup();
        let ciphertext = IbeCiphertext::encrypt(
            &dpk,
            &IbeIdentity::from_string("alice"),
            b"for alice only",
            &IbeSeed::from_bytes([3; 32]),
        );

        let bob_key = msk.derive_vetkey(CONTEXT, b"bob");
        let err = ciphertext.decrypt(&bob_key).unwrap_err();
        assert!(matches!(err, CryptoError::DecryptionFailed { .. }));
    }

    #[test]
    fn key_under_other_master_fails() {
        let (_, dpk) = setup();
        let identity = IbeIdentity::from_string("alice");
        let ciphertext =
            IbeCiphertext::encrypt(&dpk, &identity, b"secret", &IbeSeed::from_bytes([4; 32]));

        let other = MasterSecretKey::from_seed([12u8; 32]);
        let key = other.derive_vetkey(CONTEXT, identity.as_bytes());
        assert!(ciphertext.decrypt(&key).is_err());
    }

    #[test]
    fn serialize_deserialize_preserves_ciphertext() {
        let (_, dpk) = setup();
        let ciphertext = IbeCiphertext::encrypt(
            &dpk,
            &IbeIdentity::from_string("alice"),
            b"payload",
            &IbeSeed::from_bytes([5; 32]),
        );

        let parsed = IbeCiphertext::deserialize(&ciphertext.serialize()).unwrap();
        assert_eq!(parsed, ciphertext);
    }

    #[test]
    fn tampered_body_fails() {
        let (msk, dpk) = setup();
        let identity = IbeIdentity::from_string("alice");
        let mut bytes =
            IbeCiphertext::encrypt(&dpk, &identity, b"payload", &IbeSeed::from_bytes([6; 32]))
                .serialize();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x80;

        let ciphertext = IbeCiphertext::deserialize(&bytes).unwrap();
        let key = msk.derive_vetkey(CONTEXT, identity.as_bytes());
        assert!(ciphertext.decrypt(&key).is_err());
    }

    #[test]
    fn truncated_input_is_rejected() {
        let err = IbeCiphertext::deserialize(&[0u8; 20]).unwrap_err();
        assert!(err.to_string().contains("too short"));
    }

    #[test]
    fn unknown_header_is_rejected() {
        let (_, dpk) = setup();
        let mut bytes = IbeCiphertext::encrypt(
            &dpk,
            &IbeIdentity::from_string("alice"),
            b"payload",
            &IbeSeed::from_bytes([7; 32]),
        )
        .serialize();
        bytes[0] ^= 0xFF;

        let err = IbeCiphertext::deserialize(&bytes).unwrap_err();
        assert!(err.to_string().contains("header"));
    }
}
