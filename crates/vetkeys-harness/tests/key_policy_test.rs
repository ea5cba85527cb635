//! Derived public key caching policies.
//!
//! Rotation of the simulated master key stands in for a backend whose key
//! changed between operations.

use vetkeys_client::{
    Backend, ClientConfig, Environment, MasterKeyPolicy, Principal, VetKeyClient, VetKeyError,
};
use vetkeys_harness::{Misbehavior, SimBackend, SimEnv};

fn client_with(
    policy: MasterKeyPolicy,
    seed: u64,
) -> (SimEnv, SimBackend, VetKeyClient<SimBackend, SimEnv>) {
    let env = SimEnv::with_seed(seed);
    let caller = Principal::from_slice(&[0xC0, 0xFF, 0xEE]).unwrap();
    let backend = SimBackend::new(env.clone(), [1u8; 32], caller);
    let config = ClientConfig { master_key_policy: policy, ..ClientConfig::default() };
    let client = VetKeyClient::with_config(backend.clone(), env.clone(), config);
    (env, backend, client)
}

#[tokio::test]
async fn always_fetch_follows_rotation() {
    let (_, backend, client) = client_with(MasterKeyPolicy::AlwaysFetch, 1);

    client.fetch_derived_key_material().await.unwrap();
    backend.rotate_master_key([2u8; 32]);
    client.fetch_derived_key_material().await.unwrap();

    assert_eq!(backend.call_count("symmetric_key_verification_key"), 2);
}

#[tokio::test]
async fn strict_cache_fetches_public_key_once() {
    let (_, backend, client) = client_with(MasterKeyPolicy::CacheStrict, 2);

    for _ in 0..3 {
        client.fetch_derived_key_material().await.unwrap();
    }

    assert_eq!(backend.call_count("symmetric_key_verification_key"), 1);
    assert_eq!(backend.call_count("encrypted_symmetric_key_for_caller"), 3);
}

#[tokio::test]
async fn strict_cache_reports_stale_key_as_verification_error() {
    let (_, backend, client) = client_with(MasterKeyPolicy::CacheStrict, 3);

    client.fetch_derived_key_material().await.unwrap();
    backend.rotate_master_key([2u8; 32]);

    let err = client.fetch_derived_key_material().await.unwrap_err();
    assert!(matches!(err, VetKeyError::Verification { .. }), "got {err:?}");
    assert_eq!(backend.call_count("symmetric_key_verification_key"), 1);
}

#[tokio::test]
async fn refetch_policy_recovers_from_rotation() {
    let (_, backend, client) = client_with(MasterKeyPolicy::CacheWithRefetch, 4);

    client.fetch_derived_key_material().await.unwrap();
    backend.rotate_master_key([2u8; 32]);

    client.fetch_derived_key_material().await.unwrap();
    assert_eq!(backend.call_count("symmetric_key_verification_key"), 2);
    // Only one envelope per fetch: the same envelope was re-verified.
    assert_eq!(backend.call_count("encrypted_symmetric_key_for_caller"), 2);

    // The refreshed key is cached again.
    client.fetch_derived_key_material().await.unwrap();
    assert_eq!(backend.call_count("symmetric_key_verification_key"), 2);
}

#[tokio::test]
async fn refetch_policy_still_rejects_wrong_identity() {
    let (_, backend, client) = client_with(MasterKeyPolicy::CacheWithRefetch, 5);

    client.fetch_derived_key_material().await.unwrap();
    backend.set_misbehavior(Misbehavior::WrongIdentity);

    let err = client.fetch_derived_key_material().await.unwrap_err();
    assert!(matches!(err, VetKeyError::Verification { .. }), "got {err:?}");
    // One refetch, which returned the same key.
    assert_eq!(backend.call_count("symmetric_key_verification_key"), 2);
}

#[tokio::test]
async fn concurrent_fetches_across_rotation_converge() {
    let (_, backend, client) = client_with(MasterKeyPolicy::CacheWithRefetch, 7);

    client.fetch_derived_key_material().await.unwrap();
    backend.rotate_master_key([2u8; 32]);

    let (a, b, c) = tokio::join!(
        client.fetch_derived_key_material(),
        client.fetch_derived_key_material(),
        client.fetch_derived_key_material()
    );
    let (a, b, c) = (a.unwrap(), b.unwrap(), c.unwrap());

    let ciphertext = client.encrypt_symmetric(&a, b"rotated");
    assert_eq!(client.decrypt_symmetric(&b, &ciphertext).unwrap(), b"rotated");
    assert_eq!(client.decrypt_symmetric(&c, &ciphertext).unwrap(), b"rotated");

    // Every flow that saw the stale key refetched once, and at least one did.
    let refetches = backend.call_count("symmetric_key_verification_key") - 1;
    assert!((1..=3).contains(&refetches), "refetches = {refetches}");

    // Whichever write landed last, the slot holds the rotated key.
    let before = backend.call_count("symmetric_key_verification_key");
    client.fetch_derived_key_material().await.unwrap();
    assert_eq!(backend.call_count("symmetric_key_verification_key"), before);
}

#[tokio::test]
async fn stale_write_is_repaired_by_next_refetch() {
    let (_, backend, client) = client_with(MasterKeyPolicy::CacheWithRefetch, 8);

    client.fetch_derived_key_material().await.unwrap();
    backend.rotate_master_key([2u8; 32]);
    client.fetch_derived_key_material().await.unwrap();

    // Rolling back leaves the slot holding a key the backend no longer
    // uses, which is what a late write from a slow flow looks like.
    backend.rotate_master_key([1u8; 32]);

    client.fetch_derived_key_material().await.unwrap();
    assert_eq!(backend.call_count("symmetric_key_verification_key"), 3);
}

#[tokio::test]
async fn encryption_always_uses_fresh_key() {
    let (env, backend, client) = client_with(MasterKeyPolicy::CacheStrict, 6);
    let recipient = backend.caller();

    client.ibe_encrypt(&recipient, b"one").await.unwrap();
    backend.rotate_master_key([2u8; 32]);
    let ciphertext = client.ibe_encrypt(&recipient, b"two").await.unwrap();
    assert_eq!(backend.call_count("ibe_encryption_key"), 2);

    // Timelock filling is an encryption path too.
    let created = client
        .timelocks()
        .create_timelock("t", "c", env.wall_clock_secs() + 10)
        .await
        .unwrap();
    client.timelocks().encrypt_and_fill(&created.id, "c2").await.unwrap();
    assert_eq!(backend.call_count("timelock_encryption_key"), 2);

    // The strict cache holds the key fetched for the last encryption.
    assert_eq!(client.ibe_decrypt(&ciphertext).await.unwrap(), b"two");
    assert_eq!(backend.call_count("ibe_encryption_key"), 2);
}
