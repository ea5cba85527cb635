//! Timelock message lifecycle.
//!
//! A timelock is a backend record whose content is IBE-encrypted to an
//! identity derived from the record id. The backend refuses to issue that
//! identity's key before the unlock time, which is the entire lock.
//!
//! ```text
//! create_timelock:  validate → create (empty) → encrypt_and_fill
//!                                   │                 │
//!                                Created          Encrypted
//!                                                     │
//!                          now < unlock ─► Locked     │
//!                          now ≥ unlock ─► Unlockable ┘
//!                                             │
//! decrypt_timelock:  key → verify → content → IBE decrypt ─► Decrypted
//! ```
//!
//! Nothing is rolled back. A record whose fill failed stays `Created`; the
//! error names it, [`TimelockClient::inspect_timelock`] reports it as such,
//! and `encrypt_and_fill` can be re-run on it. Every re-run overwrites the
//! content. Decryption never modifies the record.

use vetkeys_crypto::{IbeCiphertext, IbeIdentity, IbeSeed, hex_codec};

use crate::{
    backend::{Backend, BackendError, TimelockInfo},
    client::VetKeyClient,
    env::Environment,
    error::{StateViolation, VetKeyError},
    key_cache::KeyPurpose,
    validation::TimelockRequest,
};

/// Lifecycle state of a timelock as seen by this client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimelockState {
    /// Record allocated, content not filled yet
    Created,
    /// Content filled with an IBE ciphertext
    Encrypted,
    /// Filled and before its unlock time
    Locked,
    /// Unlock time reached; the backend will issue the key
    Unlockable,
    /// Plaintext recovered locally (the record itself is unchanged)
    Decrypted,
}

/// Client view of one timelock record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timelock {
    /// Record id
    pub id: String,
    /// Title
    pub title: String,
    /// Unix seconds at which the record unlocks
    pub unlock_timestamp: u64,
    /// Lifecycle state
    pub state: TimelockState,
}

impl From<TimelockInfo> for Timelock {
    fn from(info: TimelockInfo) -> Self {
        let state =
            if info.is_expired { TimelockState::Unlockable } else { TimelockState::Locked };
        Self { id: info.id, title: info.title, unlock_timestamp: info.unlock_timestamp, state }
    }
}

/// A decrypted timelock and its plaintext.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptedTimelock {
    /// Record, in state [`TimelockState::Decrypted`]
    pub timelock: Timelock,
    /// Recovered plaintext
    pub content: String,
}

/// Timelock operations, borrowed from a [`VetKeyClient`].
///
/// Cheap to create; all state lives in the client and the backend.
pub struct TimelockClient<'a, B: Backend, E: Environment> {
    client: &'a VetKeyClient<B, E>,
}

impl<'a, B: Backend, E: Environment> TimelockClient<'a, B, E> {
    pub(crate) fn new(client: &'a VetKeyClient<B, E>) -> Self {
        Self { client }
    }

    /// Create a timelock and fill it with `content` encrypted to its
    /// identity.
    ///
    /// The record is allocated with empty content so that the plaintext
    /// never reaches the backend. If filling fails the record remains in
    /// [`TimelockState::Created`] and the error carries its id, so
    /// [`Self::encrypt_and_fill`] can be retried on exactly that record.
    ///
    /// # Errors
    ///
    /// - `Validation`: empty title or content, or unlock time not in the
    ///   future (no backend call is made)
    /// - `Transport`: allocating the record failed (nothing was created)
    /// - `State` with [`StateViolation::Unfilled`]: the record exists but
    ///   filling it failed; see [`VetKeyError::unfilled_record`]
    pub async fn create_timelock(
        &self,
        title: &str,
        content: &str,
        unlock_timestamp: u64,
    ) -> Result<Timelock, VetKeyError> {
        let now = self.client.env().wall_clock_secs();
        let request = TimelockRequest::new(title, content, unlock_timestamp, now)?;

        tracing::debug!(unlock_timestamp, "creating timelock record");
        let id = self
            .client
            .backend()
            .create_timelock_message("", request.unlock_timestamp, &request.title)
            .await
            .map_err(|e| VetKeyError::transport("create_timelock_message", e))?;

        if let Err(err) = self.encrypt_and_fill(&id, &request.content).await {
            tracing::warn!(record_id = %id, error = %err, "timelock left unfilled");
            return Err(VetKeyError::state(&id, StateViolation::Unfilled { cause: Box::new(err) }));
        }

        tracing::info!(record_id = %id, unlock_timestamp, "created timelock");
        Ok(Timelock {
            id,
            title: request.title,
            unlock_timestamp: request.unlock_timestamp,
            state: TimelockState::Encrypted,
        })
    }

    /// Encrypt `content` to the record's identity and store it.
    ///
    /// Idempotent in effect: each call replaces the stored ciphertext, and a
    /// later decrypt returns the most recent content.
    ///
    /// # Errors
    ///
    /// - `Validation`: empty record id or content
    /// - `Transport`: a backend call failed (record keeps its old content)
    /// - `Encoding`: the backend returned a malformed key
    pub async fn encrypt_and_fill(
        &self,
        record_id: &str,
        content: &str,
    ) -> Result<(), VetKeyError> {
        let record_id = validate_record_id(record_id)?;
        let content = content.trim();
        if content.is_empty() {
            return Err(VetKeyError::validation("content", "content cannot be empty"));
        }

        let public_key = self.client.fresh_master_key(KeyPurpose::Timelock).await?;
        let identity = self.identity(record_id).await?;

        let seed = IbeSeed::from_bytes(self.client.env().random_array());
        let ciphertext = IbeCiphertext::encrypt(
            &public_key,
            &IbeIdentity::from_string(&identity),
            content.as_bytes(),
            &seed,
        );

        tracing::debug!(record_id, "uploading timelock ciphertext");
        self.client
            .backend()
            .update_timelock_content(record_id, &hex_codec::encode(ciphertext.serialize()))
            .await
            .map_err(|e| VetKeyError::transport("update_timelock_content", e))
    }

    /// The caller's timelocks with their lock status.
    ///
    /// The listing only carries unlock times, so every record is reported
    /// as `Locked` or `Unlockable`. Use [`Self::inspect_timelock`] to tell
    /// an unfilled record apart.
    ///
    /// # Errors
    ///
    /// - `Transport`: the backend call failed
    pub async fn list_timelocks(&self) -> Result<Vec<Timelock>, VetKeyError> {
        let infos = self
            .client
            .backend()
            .get_my_timelocks()
            .await
            .map_err(|e| VetKeyError::transport("get_my_timelocks", e))?;

        Ok(infos.into_iter().map(Timelock::from).collect())
    }

    /// One of the caller's timelocks, in [`TimelockState::Created`] if its
    /// content was never filled.
    ///
    /// Costs a listing and a content fetch; no key is requested.
    ///
    /// # Errors
    ///
    /// - `Validation`: empty record id
    /// - `State`: record is not among the caller's timelocks
    /// - `Transport`: a backend call failed
    pub async fn inspect_timelock(&self, record_id: &str) -> Result<Timelock, VetKeyError> {
        let record_id = validate_record_id(record_id)?;
        let listed = self.listed(record_id).await?;

        let filled = match self.client.backend().get_timelock_content(record_id).await {
            Ok(hex) => !hex.is_empty(),
            Err(BackendError::ContentNotFound) => false,
            Err(e) => return Err(VetKeyError::transport("get_timelock_content", e)),
        };

        if filled {
            return Ok(listed);
        }
        Ok(Timelock { state: TimelockState::Created, ..listed })
    }

    /// Decrypt an unlocked timelock.
    ///
    /// Uses a fresh transport keypair and only read-only backend calls, so
    /// concurrent decrypts of one record are independent.
    ///
    /// # Errors
    ///
    /// - `Validation`: empty record id
    /// - `State`: record unknown, still locked, or never filled
    /// - `Transport`: a backend call failed, including a key refusal
    /// - `Decryption`: envelope or ciphertext did not open
    /// - `Verification`: issued key is not the record's key
    pub async fn decrypt_timelock(
        &self,
        record_id: &str,
    ) -> Result<DecryptedTimelock, VetKeyError> {
        let record_id = validate_record_id(record_id)?;
        let listed = self.listed(record_id).await?;

        if listed.state == TimelockState::Locked {
            return Err(VetKeyError::state(
                record_id,
                StateViolation::Locked { unlock_timestamp: listed.unlock_timestamp },
            ));
        }

        let transport_key = self.client.transport_key();

        tracing::debug!(record_id, "requesting timelock decryption key");
        let envelope = self
            .client
            .backend()
            .get_timelock_decryption_key(record_id, &transport_key.public_key_bytes())
            .await
            .map_err(|e| VetKeyError::transport("get_timelock_decryption_key", e))?;

        let identity = self.identity(record_id).await?;
        let vetkey = self
            .client
            .open_envelope(KeyPurpose::Timelock, &envelope, transport_key, identity.as_bytes())
            .await?;

        let content_hex = match self.client.backend().get_timelock_content(record_id).await {
            Ok(hex) if hex.is_empty() => None,
            Ok(hex) => Some(hex),
            Err(BackendError::ContentNotFound) => None,
            Err(e) => return Err(VetKeyError::transport("get_timelock_content", e)),
        }
        .ok_or_else(|| VetKeyError::state(record_id, StateViolation::ContentNotFound))?;

        let ciphertext = IbeCiphertext::deserialize(&hex_codec::decode(&content_hex)?)?;
        let plaintext = ciphertext.decrypt(&vetkey)?;
        let content = String::from_utf8(plaintext).map_err(|_| VetKeyError::Encoding {
            reason: "timelock content is not UTF-8".to_string(),
        })?;

        tracing::info!(record_id, "decrypted timelock");
        Ok(DecryptedTimelock {
            timelock: Timelock { state: TimelockState::Decrypted, ..listed },
            content,
        })
    }

    async fn listed(&self, record_id: &str) -> Result<Timelock, VetKeyError> {
        self.list_timelocks()
            .await?
            .into_iter()
            .find(|timelock| timelock.id == record_id)
            .ok_or_else(|| VetKeyError::state(record_id, StateViolation::UnknownRecord))
    }

    async fn identity(&self, record_id: &str) -> Result<String, VetKeyError> {
        self.client
            .backend()
            .get_timelock_identity(record_id)
            .await
            .map_err(|e| VetKeyError::transport("get_timelock_identity", e))
    }
}

fn validate_record_id(record_id: &str) -> Result<&str, VetKeyError> {
    let record_id = record_id.trim();
    if record_id.is_empty() {
        return Err(VetKeyError::validation("record id", "record id cannot be empty"));
    }
    Ok(record_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_maps_expiry_to_state() {
        let info = |is_expired| TimelockInfo {
            id: "timelock_ab_1_0".into(),
            title: "Test".into(),
            unlock_timestamp: 100,
            is_expired,
        };

        assert_eq!(Timelock::from(info(false)).state, TimelockState::Locked);
        assert_eq!(Timelock::from(info(true)).state, TimelockState::Unlockable);
    }

    #[test]
    fn record_id_is_trimmed_and_required() {
        assert_eq!(validate_record_id("  timelock_x ").unwrap(), "timelock_x");
        assert!(matches!(
            validate_record_id("   "),
            Err(VetKeyError::Validation { field: "record id", .. })
        ));
    }
}
