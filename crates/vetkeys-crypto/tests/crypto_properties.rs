//! Property-based tests for vetKeys primitives
//!
//! Pairing-based checks are expensive in debug builds, so those properties
//! run fewer cases than the purely symmetric ones.

use proptest::prelude::*;
use vetkeys_crypto::{
    CryptoError, EncryptedVetKey, IbeCiphertext, IbeIdentity, IbeSeed, MasterSecretKey,
    TransportSecretKey, hex_codec,
};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property: hex decoding inverts encoding for any byte string
    #[test]
    fn prop_hex_roundtrip(bytes in prop::collection::vec(any::<u8>(), 0..512)) {
        let text = hex_codec::encode(&bytes);

        prop_assert_eq!(text.len(), bytes.len() * 2);
        prop_assert_eq!(hex_codec::decode(&text)?, bytes);
    }

    /// Property: symmetric encryption round-trips for any message and context
    #[test]
    fn prop_symmetric_roundtrip(
        key_seed in any::<[u8; 32]>(),
        plaintext in prop::collection::vec(any::<u8>(), 0..1024),
        context in "[a-z_-]{0,24}",
        nonce in any::<[u8; 24]>(),
    ) {
        let material = MasterSecretKey::from_seed(key_seed)
            .derive_vetkey(b"symmetric_key", b"caller")
            .as_derived_key_material();

        let ciphertext = material.encrypt_message(&plaintext, &context, nonce);
        prop_assert_eq!(material.decrypt_message(&ciphertext, &context)?, plaintext);
    }

    /// Property: a ciphertext never authenticates under a different context
    #[test]
    fn prop_symmetric_context_separation(
        plaintext in prop::collection::vec(any::<u8>(), 0..256),
        context in "[a-z]{1,16}",
        other in "[a-z]{1,16}",
        nonce in any::<[u8; 24]>(),
    ) {
        prop_assume!(context != other);

        let material = MasterSecretKey::from_seed([1u8; 32])
            .derive_vetkey(b"symmetric_key", b"caller")
            .as_derived_key_material();

        let ciphertext = material.encrypt_message(&plaintext, &context, nonce);
        let result = material.decrypt_message(&ciphertext, &other);
        prop_assert!(matches!(result, Err(CryptoError::AuthenticationFailed { .. })), "result: {:?}", result);
    }

    /// Property: any single-bit flip in a symmetric ciphertext is rejected
    #[test]
    fn prop_symmetric_bit_flip_rejected(
        plaintext in prop::collection::vec(any::<u8>(), 1..128),
        flip in any::<prop::sample::Index>(),
        bit in 0u8..8,
    ) {
        let material = MasterSecretKey::from_seed([2u8; 32])
            .derive_vetkey(b"symmetric_key", b"caller")
            .as_derived_key_material();

        let mut ciphertext = material.encrypt_message(&plaintext, "ctx", [7u8; 24]);
        let position = flip.index(ciphertext.len());
        ciphertext[position] ^= 1 << bit;

        prop_assert!(material.decrypt_message(&ciphertext, "ctx").is_err());
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// Property: an envelope opens to exactly the key the backend derived
    #[test]
    fn prop_envelope_roundtrip(
        master_seed in any::<[u8; 32]>(),
        transport_seed in any::<[u8; 32]>(),
        blinding in any::<[u8; 32]>(),
        input in prop::collection::vec(any::<u8>(), 0..64),
    ) {
        let msk = MasterSecretKey::from_seed(master_seed);
        let dpk = msk.derived_public_key(b"symmetric_key");
        let tsk = TransportSecretKey::generate(transport_seed);

        let envelope =
            msk.encrypt_vetkey(b"symmetric_key", &input, &tsk.public_key_bytes(), blinding)?;
        let parsed = EncryptedVetKey::deserialize(&envelope.serialize())?;
        let key = parsed.decrypt_and_verify(tsk, &dpk, &input)?;

        prop_assert_eq!(key, msk.derive_vetkey(b"symmetric_key", &input));
    }

    /// Property: IBE round-trips for any identity and message
    #[test]
    fn prop_ibe_roundtrip(
        identity in prop::collection::vec(any::<u8>(), 0..32),
        plaintext in prop::collection::vec(any::<u8>(), 0..512),
        seed in any::<[u8; 32]>(),
    ) {
        let msk = MasterSecretKey::from_seed([3u8; 32]);
        let dpk = msk.derived_public_key(b"ibe_encryption");
        let identity = IbeIdentity::from_bytes(identity);

        let ciphertext =
            IbeCiphertext::encrypt(&dpk, &identity, &plaintext, &IbeSeed::from_bytes(seed));
        let parsed = IbeCiphertext::deserialize(&ciphertext.serialize())?;
        let key = msk.derive_vetkey(b"ibe_encryption", identity.as_bytes());

        prop_assert_eq!(parsed.decrypt(&key)?, plaintext);
    }

    /// Property: an IBE ciphertext is unreadable with another identity's key
    #[test]
    fn prop_ibe_identity_binding(
        alice in "[a-z]{1,12}",
        bob in "[a-z]{1,12}",
        plaintext in prop::collection::vec(any::<u8>(), 0..64),
    ) {
        prop_assume!(alice != bob);

        let msk = MasterSecretKey::from_seed([4u8; 32]);
        let dpk = msk.derived_public_key(b"ibe_encryption");

        let ciphertext = IbeCiphertext::encrypt(
            &dpk,
            &IbeIdentity::from_string(&alice),
            &plaintext,
            &IbeSeed::from_bytes([9u8; 32]),
        );
        let bob_key = msk.derive_vetkey(b"ibe_encryption", bob.as_bytes());

        let result = ciphertext.decrypt(&bob_key);
        prop_assert!(matches!(result, Err(CryptoError::DecryptionFailed { .. })), "result: {:?}", result);
    }
}
