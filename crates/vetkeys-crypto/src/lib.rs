//! vetKeys Cryptographic Primitives
//!
//! Client-side building blocks for verifiably encrypted threshold keys over
//! BLS12-381. Pure functions with deterministic outputs. Callers provide
//! random bytes for deterministic testing.
//!
//! # Key Flow
//!
//! A client asks a backend for the key bound to some identity. The backend
//! never sees the key in the clear on the way out: it encrypts it to a
//! one-time transport key the client generated for this request.
//!
//! ```text
//! TransportSecretKey::generate(seed)
//!        │  public_key_bytes()
//!        ▼
//! Backend: encrypt vetKey to transport key → EncryptedVetKey (hex)
//!        │
//!        ▼
//! decrypt_and_verify(tsk, derived_public_key, identity) → VetKey
//!        │
//!        ├─► as_derived_key_material() → XChaCha20-Poly1305 per context
//!        └─► IbeCiphertext::decrypt()
//! ```
//!
//! # Security
//!
//! Verification:
//! - A vetKey is a BLS signature over `derived_public_key || identity`
//! - Every key is checked with a pairing before it is used
//! - A key for another identity or master key fails verification, never
//!   silently decrypts garbage
//!
//! Transport:
//! - Transport secret keys are single use and zeroized on drop, as are
//!   vetKeys and intermediate pairing outputs
//! - Envelopes carry a confirmation tag, so "wrong transport key" is a
//!   decryption error distinct from "wrong identity"
//!
//! Symmetric layer:
//! - HKDF separates key material per application context
//! - The context is bound as associated data
//!
//! IBE:
//! - Anyone can encrypt to an identity with only the derived public key
//! - Only the vetKey for that identity decrypts
//! - Ciphertexts are re-checked after decryption (Fujisaki-Okamoto style)

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod envelope;
pub mod error;
mod hash;
pub mod hex_codec;
pub mod ibe;
pub mod key_material;
pub mod master;
pub mod public_key;
pub mod transport;
pub mod vetkey;

pub use envelope::{ENCRYPTED_VETKEY_SIZE, ENVELOPE_SEED_SIZE, EncryptedVetKey, UnverifiedVetKey};
pub use error::CryptoError;
pub use ibe::{IBE_SEED_SIZE, IbeCiphertext, IbeIdentity, IbeSeed};
pub use key_material::{DerivedKeyMaterial, MESSAGE_NONCE_SIZE};
pub use master::MasterSecretKey;
pub use public_key::{DERIVED_PUBLIC_KEY_SIZE, DerivedPublicKey};
pub use transport::{
    TRANSPORT_PUBLIC_KEY_SIZE, TRANSPORT_SEED_SIZE, TransportSecretKey, parse_transport_public_key,
};
pub use vetkey::{VETKEY_SIZE, VetKey};
