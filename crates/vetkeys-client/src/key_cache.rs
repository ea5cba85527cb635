//! Derived public key cache.
//!
//! One slot per purpose. The lock is only held to read or replace a slot,
//! never across a backend call.
//!
//! Concurrent flows race on a slot and the last write wins. A flow that
//! fetched before a rotation can overwrite a newer key with the old one;
//! under `CacheWithRefetch` the next flow to fail verification refetches
//! and repairs the slot, under `CacheStrict` it fails until an encryption
//! path refreshes it.

use std::{
    collections::HashMap,
    fmt,
    sync::{Mutex, PoisonError},
};

use vetkeys_crypto::DerivedPublicKey;

/// Which derived public key an operation needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyPurpose {
    /// Symmetric key verification key
    Symmetric,
    /// IBE encryption key
    Ibe,
    /// Timelock encryption key
    Timelock,
}

impl KeyPurpose {
    /// Backend operation that returns this key.
    pub fn operation(self) -> &'static str {
        match self {
            Self::Symmetric => "symmetric_key_verification_key",
            Self::Ibe => "ibe_encryption_key",
            Self::Timelock => "timelock_encryption_key",
        }
    }
}

impl fmt::Display for KeyPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Symmetric => "symmetric",
            Self::Ibe => "ibe",
            Self::Timelock => "timelock",
        };
        f.write_str(name)
    }
}

#[derive(Default)]
pub(crate) struct MasterKeyCache {
    slots: Mutex<HashMap<KeyPurpose, DerivedPublicKey>>,
}

impl MasterKeyCache {
    pub(crate) fn get(&self, purpose: KeyPurpose) -> Option<DerivedPublicKey> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner).get(&purpose).copied()
    }

    /// Store `key`, returning the key it replaced.
    pub(crate) fn store(
        &self,
        purpose: KeyPurpose,
        key: DerivedPublicKey,
    ) -> Option<DerivedPublicKey> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner).insert(purpose, key)
    }
}

#[cfg(test)]
mod tests {
    use vetkeys_crypto::MasterSecretKey;

    use super::*;

    #[test]
    fn slots_are_independent_per_purpose() {
        let msk = MasterSecretKey::from_seed([1u8; 32]);
        let cache = MasterKeyCache::default();

        cache.store(KeyPurpose::Ibe, msk.derived_public_key(b"ibe_encryption"));

        assert_eq!(cache.get(KeyPurpose::Ibe), Some(msk.derived_public_key(b"ibe_encryption")));
        assert_eq!(cache.get(KeyPurpose::Timelock), None);
    }

    #[test]
    fn store_returns_replaced_key() {
        let old = MasterSecretKey::from_seed([1u8; 32]).derived_public_key(b"ctx");
        let new = MasterSecretKey::from_seed([2u8; 32]).derived_public_key(b"ctx");
        let cache = MasterKeyCache::default();

        assert_eq!(cache.store(KeyPurpose::Symmetric, old), None);
        assert_eq!(cache.store(KeyPurpose::Symmetric, new), Some(old));
        assert_eq!(cache.get(KeyPurpose::Symmetric), Some(new));
    }

    #[test]
    fn operation_names_match_backend_surface() {
        assert_eq!(KeyPurpose::Symmetric.operation(), "symmetric_key_verification_key");
        assert_eq!(KeyPurpose::Ibe.operation(), "ibe_encryption_key");
        assert_eq!(KeyPurpose::Timelock.operation(), "timelock_encryption_key");
    }
}
