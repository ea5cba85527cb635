//! Symmetric key material derived from a vetKey
//!
//! All functions are pure - the nonce must be provided by the caller.
//!
//! Each context string selects an independent `XChaCha20-Poly1305` key via
//! HKDF, and the context is also bound as associated data. A ciphertext made
//! for one application context therefore never authenticates under another.
//!
//! Ciphertext layout:
//!
//! ```text
//! "VETK-AE1" (8) || nonce (24) || ciphertext + Poly1305 tag (16)
//! ```

use chacha20poly1305::{
    XChaCha20Poly1305, XNonce,
    aead::{Aead, KeyInit, Payload},
};
use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::Zeroize;

use crate::error::CryptoError;

/// Size of the caller-provided nonce
pub const MESSAGE_NONCE_SIZE: usize = 24;

/// Format header for symmetric ciphertexts
const HEADER: &[u8; 8] = b"VETK-AE1";

/// HKDF salt for turning vetKey bytes into key material
const MATERIAL_SALT: &[u8] = b"vetkeys-derived-key-material-v1";

/// Prefix of the HKDF info for per-context message keys
const MESSAGE_KEY_LABEL: &[u8] = b"vetkeys-message-key:";

/// Poly1305 tag size (16 bytes)
const POLY1305_TAG_SIZE: usize = 16;

/// Smallest well-formed ciphertext (empty plaintext)
const MIN_CIPHERTEXT_SIZE: usize = HEADER.len() + MESSAGE_NONCE_SIZE + POLY1305_TAG_SIZE;

/// Usable symmetric key obtained from a verified vetKey.
///
/// Holds the HKDF pseudo-random key; per-context AEAD keys are derived on
/// demand and zeroized after each call.
#[derive(Clone)]
pub struct DerivedKeyMaterial {
    prk: [u8; 32],
}

impl DerivedKeyMaterial {
    pub(crate) fn from_vetkey_bytes(vetkey: &[u8]) -> Self {
        let (prk, _) = Hkdf::<Sha256>::extract(Some(MATERIAL_SALT), vetkey);
        Self { prk: prk.into() }
    }

    /// Encrypt `plaintext` under the key for `context`.
    ///
    /// Caller MUST provide a fresh random nonce per message in production.
    pub fn encrypt_message(
        &self,
        plaintext: &[u8],
        context: &str,
        nonce: [u8; MESSAGE_NONCE_SIZE],
    ) -> Vec<u8> {
        let cipher = self.cipher_for(context);
        let payload = Payload { msg: plaintext, aad: context.as_bytes() };

        let Ok(body) = cipher.encrypt(XNonce::from_slice(&nonce), payload) else {
            unreachable!("XChaCha20-Poly1305 encryption cannot fail with valid inputs");
        };

        let mut out = Vec::with_capacity(HEADER.len() + MESSAGE_NONCE_SIZE + body.len());
        out.extend_from_slice(HEADER);
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&body);
        out
    }

    /// Decrypt a ciphertext produced by [`Self::encrypt_message`].
    ///
    /// # Errors
    ///
    /// - `AuthenticationFailed`: truncated input, unknown header, tampered
    ///   ciphertext, wrong key, or a different context string
    pub fn decrypt_message(
        &self,
        ciphertext: &[u8],
        context: &str,
    ) -> Result<Vec<u8>, CryptoError> {
        if ciphertext.len() < MIN_CIPHERTEXT_SIZE {
            return Err(CryptoError::AuthenticationFailed {
                reason: format!(
                    "ciphertext too short: {} bytes, need at least {MIN_CIPHERTEXT_SIZE}",
                    ciphertext.len()
                ),
            });
        }

        let (header, rest) = ciphertext.split_at(HEADER.len());
        if header != HEADER {
            return Err(CryptoError::AuthenticationFailed { reason: "unknown header".into() });
        }

        let (nonce, body) = rest.split_at(MESSAGE_NONCE_SIZE);
        let cipher = self.cipher_for(context);
        let payload = Payload { msg: body, aad: context.as_bytes() };

        cipher.decrypt(XNonce::from_slice(nonce), payload).map_err(|_| {
            CryptoError::AuthenticationFailed { reason: "authentication tag mismatch".into() }
        })
    }

    fn cipher_for(&self, context: &str) -> XChaCha20Poly1305 {
        let Ok(hkdf) = Hkdf::<Sha256>::from_prk(&self.prk) else {
            unreachable!("a 32-byte PRK is valid for HKDF-SHA256");
        };

        let mut info = Vec::with_capacity(MESSAGE_KEY_LABEL.len() + context.len());
        info.extend_from_slice(MESSAGE_KEY_LABEL);
        info.extend_from_slice(context.as_bytes());

        let mut key = [0u8; 32];
        let Ok(()) = hkdf.expand(&info, &mut key) else {
            unreachable!("32 bytes is a valid HKDF-SHA256 output length");
        };

        let cipher = XChaCha20Poly1305::new((&key).into());
        key.zeroize();
        cipher
    }
}

impl Drop for DerivedKeyMaterial {
    fn drop(&mut self) {
        self.prk.zeroize();
    }
}

impl std::fmt::Debug for DerivedKeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DerivedKeyMaterial(..)")
    }
}
