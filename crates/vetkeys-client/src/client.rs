//! Key fetch, symmetric and IBE flows.
//!
//! Every flow is a straight sequence of backend calls with local crypto in
//! between. Nothing is kept between flows except (optionally) derived public
//! keys; key material is returned to the caller and never stored here.

use vetkeys_crypto::{
    DerivedKeyMaterial, DerivedPublicKey, EncryptedVetKey, IbeCiphertext, IbeIdentity, IbeSeed,
    TransportSecretKey, VetKey, hex_codec,
};

use crate::{
    backend::Backend,
    config::{ClientConfig, MasterKeyPolicy},
    env::Environment,
    error::VetKeyError,
    key_cache::{KeyPurpose, MasterKeyCache},
    principal::Principal,
    timelock::TimelockClient,
};

/// Client for the vetKeys protocol against one backend.
///
/// Holds no key material. Safe to share between concurrent flows: all
/// methods take `&self`.
pub struct VetKeyClient<B: Backend, E: Environment> {
    backend: B,
    env: E,
    config: ClientConfig,
    cache: MasterKeyCache,
}

impl<B: Backend, E: Environment> VetKeyClient<B, E> {
    /// Create a client with the default configuration.
    pub fn new(backend: B, env: E) -> Self {
        Self::with_config(backend, env, ClientConfig::default())
    }

    /// Create a client with an explicit configuration.
    pub fn with_config(backend: B, env: E, config: ClientConfig) -> Self {
        Self { backend, env, config, cache: MasterKeyCache::default() }
    }

    /// Backend this client talks to.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Environment used for randomness and time.
    pub fn env(&self) -> &E {
        &self.env
    }

    /// Active configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Timelock operations on this client.
    pub fn timelocks(&self) -> TimelockClient<'_, B, E> {
        TimelockClient::new(self)
    }

    /// Fetch, decrypt and verify the caller's symmetric vetKey.
    ///
    /// Each call uses a new transport keypair; the returned material is the
    /// same for every call by the same caller.
    ///
    /// # Errors
    ///
    /// - `Transport`: a backend call failed
    /// - `Encoding`: the backend returned malformed hex or key bytes
    /// - `Decryption`: the envelope does not open with our transport key
    /// - `Verification`: the key was not derived for this caller
    pub async fn fetch_derived_key_material(&self) -> Result<DerivedKeyMaterial, VetKeyError> {
        let caller = self.backend.caller();
        let transport_key = self.transport_key();

        tracing::debug!(%caller, "requesting encrypted symmetric key");
        let envelope = self
            .backend
            .encrypted_symmetric_key_for_caller(&transport_key.public_key_bytes())
            .await
            .map_err(|e| VetKeyError::transport("encrypted_symmetric_key_for_caller", e))?;

        let vetkey = self
            .open_envelope(KeyPurpose::Symmetric, &envelope, transport_key, caller.as_slice())
            .await?;

        tracing::info!(%caller, "fetched derived key material");
        Ok(vetkey.as_derived_key_material())
    }

    /// Encrypt under the configured symmetric context. Returns lowercase hex.
    pub fn encrypt_symmetric(&self, material: &DerivedKeyMaterial, plaintext: &[u8]) -> String {
        let nonce = self.env.random_array();
        let ciphertext =
            material.encrypt_message(plaintext, &self.config.symmetric_context, nonce);
        hex_codec::encode(ciphertext)
    }

    /// Decrypt hex produced by [`Self::encrypt_symmetric`].
    ///
    /// # Errors
    ///
    /// - `Encoding`: not valid hex
    /// - `Authentication`: tampered, wrong key, or another context
    pub fn decrypt_symmetric(
        &self,
        material: &DerivedKeyMaterial,
        ciphertext_hex: &str,
    ) -> Result<Vec<u8>, VetKeyError> {
        let ciphertext = hex_codec::decode(ciphertext_hex)?;
        Ok(material.decrypt_message(&ciphertext, &self.config.symmetric_context)?)
    }

    /// IBE-encrypt `plaintext` to `recipient`. Returns lowercase hex.
    ///
    /// Only needs the public IBE key; the recipient does not have to exist
    /// yet.
    ///
    /// # Errors
    ///
    /// - `Transport`: fetching the IBE public key failed
    /// - `Encoding`: the backend returned a malformed key
    pub async fn ibe_encrypt(
        &self,
        recipient: &Principal,
        plaintext: &[u8],
    ) -> Result<String, VetKeyError> {
        let public_key = self.fresh_master_key(KeyPurpose::Ibe).await?;
        let identity = IbeIdentity::from_principal(recipient.as_slice());

        let seed = IbeSeed::from_bytes(self.env.random_array());
        let ciphertext = IbeCiphertext::encrypt(&public_key, &identity, plaintext, &seed);

        tracing::info!(%recipient, len = plaintext.len(), "IBE-encrypted message");
        Ok(hex_codec::encode(ciphertext.serialize()))
    }

    /// Decrypt an IBE ciphertext addressed to the caller.
    ///
    /// The ciphertext is parsed before any backend call, so malformed input
    /// costs no key request.
    ///
    /// # Errors
    ///
    /// - `Encoding`: not valid hex
    /// - `Transport`: a backend call failed
    /// - `Decryption`: malformed ciphertext, envelope, or not addressed to the
    ///   caller
    /// - `Verification`: the backend issued a key for someone else
    pub async fn ibe_decrypt(&self, ciphertext_hex: &str) -> Result<Vec<u8>, VetKeyError> {
        let ciphertext = IbeCiphertext::deserialize(&hex_codec::decode(ciphertext_hex)?)?;

        let caller = self.backend.caller();
        let transport_key = self.transport_key();

        tracing::debug!(%caller, "requesting encrypted IBE decryption key");
        let envelope = self
            .backend
            .encrypted_ibe_decryption_key_for_caller(&transport_key.public_key_bytes())
            .await
            .map_err(|e| VetKeyError::transport("encrypted_ibe_decryption_key_for_caller", e))?;

        let vetkey =
            self.open_envelope(KeyPurpose::Ibe, &envelope, transport_key, caller.as_slice()).await?;
        let plaintext = ciphertext.decrypt(&vetkey)?;

        tracing::info!(%caller, len = plaintext.len(), "IBE-decrypted message");
        Ok(plaintext)
    }

    /// New single-use transport keypair.
    pub(crate) fn transport_key(&self) -> TransportSecretKey {
        TransportSecretKey::generate(self.env.random_array())
    }

    /// Fetch a derived public key from the backend, bypassing the cache.
    ///
    /// Refreshes the cache slot when the policy caches.
    pub(crate) async fn fresh_master_key(
        &self,
        purpose: KeyPurpose,
    ) -> Result<DerivedPublicKey, VetKeyError> {
        tracing::debug!(%purpose, "fetching derived public key");
        let key_hex = match purpose {
            KeyPurpose::Symmetric => self.backend.symmetric_key_verification_key().await,
            KeyPurpose::Ibe => self.backend.ibe_encryption_key().await,
            KeyPurpose::Timelock => self.backend.timelock_encryption_key().await,
        }
        .map_err(|e| VetKeyError::transport(purpose.operation(), e))?;

        let key = DerivedPublicKey::deserialize(&hex_codec::decode(&key_hex)?)?;

        if self.config.master_key_policy.caches() {
            let previous = self.cache.store(purpose, key);
            if previous.is_some_and(|previous| previous != key) {
                tracing::warn!(%purpose, "derived public key changed since last fetch");
            }
        }

        Ok(key)
    }

    /// Key to verify against, and whether it came from the cache.
    async fn verification_key(
        &self,
        purpose: KeyPurpose,
    ) -> Result<(DerivedPublicKey, bool), VetKeyError> {
        if self.config.master_key_policy.caches()
            && let Some(key) = self.cache.get(purpose)
        {
            return Ok((key, true));
        }
        Ok((self.fresh_master_key(purpose).await?, false))
    }

    /// Decrypt an envelope with `transport_key` and verify the key for
    /// `input`, applying the configured master key policy.
    pub(crate) async fn open_envelope(
        &self,
        purpose: KeyPurpose,
        envelope_hex: &str,
        transport_key: TransportSecretKey,
        input: &[u8],
    ) -> Result<VetKey, VetKeyError> {
        let envelope = EncryptedVetKey::deserialize(&hex_codec::decode(envelope_hex)?)?;
        let unverified = envelope.decrypt(transport_key)?;

        let (public_key, from_cache) = self.verification_key(purpose).await?;
        let err = match unverified.verify(&public_key, input) {
            Ok(vetkey) => return Ok(vetkey),
            Err(err) => err,
        };

        let may_refetch =
            from_cache && self.config.master_key_policy == MasterKeyPolicy::CacheWithRefetch;
        if !may_refetch {
            tracing::warn!(%purpose, from_cache, "derived key failed verification");
            return Err(err.into());
        }

        tracing::warn!(%purpose, "verification failed with cached public key, refetching");
        let fresh = self.fresh_master_key(purpose).await?;
        if fresh == public_key {
            tracing::warn!(%purpose, "derived key failed verification against current public key");
            return Err(err.into());
        }

        Ok(unverified.verify(&fresh, input)?)
    }
}
