//! In-memory simulated backend.
//!
//! Single-node stand-in for the threshold key derivation service. It holds
//! one [`MasterSecretKey`] and derives per-context keys from it exactly as a
//! real deployment would, so client verification runs against real
//! cryptography. Timelock records live in a `HashMap`.
//!
//! Fault injection follows the chaos-wrapper pattern: failures are scripted
//! per operation, and [`Misbehavior`] makes the backend produce envelopes a
//! correct client must reject.

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex, MutexGuard},
};

use vetkeys_client::{Backend, BackendError, Environment, Principal, TimelockInfo};
use vetkeys_crypto::{MasterSecretKey, hex_codec};

use crate::sim_env::SimEnv;

/// Derivation context for per-caller symmetric keys
pub const SYMMETRIC_KEY_CONTEXT: &[u8] = b"symmetric_key";

/// Derivation context for IBE
pub const IBE_ENCRYPTION_CONTEXT: &[u8] = b"ibe_encryption";

/// Derivation context for timelocks
pub const TIMELOCK_CONTEXT: &[u8] = b"timelock_encryption";

/// Ways the simulated backend can deviate from the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Misbehavior {
    /// Follow the protocol
    #[default]
    None,
    /// Issue keys derived for a different identity
    WrongIdentity,
    /// Flip a byte in every issued envelope
    CorruptEnvelope,
    /// Encrypt issued keys to a transport key the client does not hold
    WrongTransportKey,
    /// Issue timelock keys regardless of unlock time
    IgnoreUnlockTime,
}

/// Backend-side timelock record.
#[derive(Debug, Clone)]
struct TimelockRecord {
    id: String,
    creator: Principal,
    title: String,
    encrypted_content: String,
    unlock_timestamp: u64,
    identity: String,
}

struct SimState {
    master: MasterSecretKey,
    records: HashMap<String, TimelockRecord>,
    records_by_creator: HashMap<Principal, Vec<String>>,
    next_record: u64,
    scripted_failures: HashMap<&'static str, VecDeque<BackendError>>,
    misbehavior: Misbehavior,
    call_counts: HashMap<&'static str, usize>,
}

/// Simulated [`Backend`] with shared state.
///
/// Clones share records and keys; [`SimBackend::as_caller`] gives a view
/// authenticated as another principal.
#[derive(Clone)]
pub struct SimBackend {
    state: Arc<Mutex<SimState>>,
    env: SimEnv,
    caller: Principal,
}

impl SimBackend {
    /// Backend with a master key derived from `master_seed`, authenticating
    /// requests as `caller`.
    pub fn new(env: SimEnv, master_seed: [u8; 32], caller: Principal) -> Self {
        let state = SimState {
            master: MasterSecretKey::from_seed(master_seed),
            records: HashMap::new(),
            records_by_creator: HashMap::new(),
            next_record: 0,
            scripted_failures: HashMap::new(),
            misbehavior: Misbehavior::None,
            call_counts: HashMap::new(),
        };

        Self { state: Arc::new(Mutex::new(state)), env, caller }
    }

    /// Same backend, authenticated as `caller`.
    pub fn as_caller(&self, caller: Principal) -> Self {
        Self { state: Arc::clone(&self.state), env: self.env.clone(), caller }
    }

    /// Replace the master key. Previously issued public keys go stale.
    pub fn rotate_master_key(&self, master_seed: [u8; 32]) {
        tracing::debug!("rotating simulated master key");
        self.state().master = MasterSecretKey::from_seed(master_seed);
    }

    /// Make the next call to `operation` fail with `error`.
    ///
    /// Multiple scripted failures for one operation are consumed in order.
    pub fn fail_next(&self, operation: &'static str, error: BackendError) {
        self.state().scripted_failures.entry(operation).or_default().push_back(error);
    }

    /// Set how the backend deviates from the protocol.
    pub fn set_misbehavior(&self, misbehavior: Misbehavior) {
        self.state().misbehavior = misbehavior;
    }

    /// Number of calls made to `operation` (including failed ones).
    pub fn call_count(&self, operation: &str) -> usize {
        self.state().call_counts.get(operation).copied().unwrap_or(0)
    }

    /// Number of calls across all operations.
    pub fn total_calls(&self) -> usize {
        self.state().call_counts.values().sum()
    }

    /// Raw stored content of a record, if it exists.
    pub fn stored_content(&self, record_id: &str) -> Option<String> {
        self.state().records.get(record_id).map(|record| record.encrypted_content.clone())
    }

    /// Master key currently in use.
    pub fn master_public_key(&self, context: &[u8]) -> vetkeys_crypto::DerivedPublicKey {
        self.state().master.derived_public_key(context)
    }

    fn state(&self) -> MutexGuard<'_, SimState> {
        #[allow(clippy::expect_used)]
        self.state.lock().expect("SimBackend state mutex poisoned")
    }

    /// Count the call and pop a scripted failure, if any.
    fn enter(&self, state: &mut SimState, operation: &'static str) -> Result<(), BackendError> {
        *state.call_counts.entry(operation).or_default() += 1;
        tracing::debug!(operation, caller = %self.caller, "simulated backend call");

        match state.scripted_failures.get_mut(operation).and_then(VecDeque::pop_front) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn public_key(&self, operation: &'static str, context: &[u8]) -> Result<String, BackendError> {
        let mut state = self.state();
        self.enter(&mut state, operation)?;
        Ok(hex_codec::encode(state.master.derived_public_key(context).serialize()))
    }

    /// Derive the key for `(context, input)` and encrypt it to the caller's
    /// transport key, applying any configured misbehavior.
    fn issue_key(
        &self,
        state: &SimState,
        context: &[u8],
        input: &[u8],
        transport_public_key: &[u8],
    ) -> Result<String, BackendError> {
        let seed = self.env.random_array();

        let envelope = match state.misbehavior {
            Misbehavior::WrongIdentity => {
                let mut wrong = input.to_vec();
                wrong.push(0xFF);
                state.master.encrypt_vetkey(context, &wrong, transport_public_key, seed)
            },
            Misbehavior::WrongTransportKey => {
                let other = vetkeys_crypto::TransportSecretKey::generate(self.env.random_array());
                state.master.encrypt_vetkey(context, input, &other.public_key_bytes(), seed)
            },
            Misbehavior::None | Misbehavior::CorruptEnvelope | Misbehavior::IgnoreUnlockTime => {
                state.master.encrypt_vetkey(context, input, transport_public_key, seed)
            },
        }
        .map_err(|e| BackendError::Rejected(format!("Failed to derive key: {e}")))?;

        let mut bytes = envelope.serialize();
        if state.misbehavior == Misbehavior::CorruptEnvelope {
            // Last byte is inside the confirmation tag.
            if let Some(last) = bytes.last_mut() {
                *last ^= 0x01;
            }
        }

        Ok(hex_codec::encode(bytes))
    }

    fn owned_record<'s>(
        &self,
        state: &'s SimState,
        record_id: &str,
    ) -> Result<&'s TimelockRecord, BackendError> {
        let record = state.records.get(record_id).ok_or(BackendError::NotFound)?;
        if record.creator != self.caller {
            return Err(BackendError::AccessDenied);
        }
        Ok(record)
    }
}

impl std::fmt::Debug for SimBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimBackend").field("caller", &self.caller).finish_non_exhaustive()
    }
}

impl Backend for SimBackend {
    fn caller(&self) -> Principal {
        self.caller.clone()
    }

    async fn encrypted_symmetric_key_for_caller(
        &self,
        transport_public_key: &[u8],
    ) -> Result<String, BackendError> {
        let mut state = self.state();
        self.enter(&mut state, "encrypted_symmetric_key_for_caller")?;
        self.issue_key(&state, SYMMETRIC_KEY_CONTEXT, self.caller.as_slice(), transport_public_key)
    }

    async fn symmetric_key_verification_key(&self) -> Result<String, BackendError> {
        self.public_key("symmetric_key_verification_key", SYMMETRIC_KEY_CONTEXT)
    }

    async fn ibe_encryption_key(&self) -> Result<String, BackendError> {
        self.public_key("ibe_encryption_key", IBE_ENCRYPTION_CONTEXT)
    }

    async fn encrypted_ibe_decryption_key_for_caller(
        &self,
        transport_public_key: &[u8],
    ) -> Result<String, BackendError> {
        let mut state = self.state();
        self.enter(&mut state, "encrypted_ibe_decryption_key_for_caller")?;
        self.issue_key(&state, IBE_ENCRYPTION_CONTEXT, self.caller.as_slice(), transport_public_key)
    }

    async fn timelock_encryption_key(&self) -> Result<String, BackendError> {
        self.public_key("timelock_encryption_key", TIMELOCK_CONTEXT)
    }

    async fn create_timelock_message(
        &self,
        content: &str,
        unlock_timestamp: u64,
        title: &str,
    ) -> Result<String, BackendError> {
        let mut state = self.state();
        self.enter(&mut state, "create_timelock_message")?;

        let now = self.env.wall_clock_secs();
        if unlock_timestamp <= now {
            return Err(BackendError::Rejected("Unlock timestamp must be in the future".into()));
        }
        let title = title.trim();
        if title.is_empty() {
            return Err(BackendError::Rejected("Title cannot be empty".into()));
        }

        let counter = state.next_record;
        state.next_record += 1;

        let id = format!("timelock_{}_{now}_{counter}", self.caller);
        let record = TimelockRecord {
            id: id.clone(),
            creator: self.caller.clone(),
            title: title.to_string(),
            encrypted_content: content.to_string(),
            unlock_timestamp,
            identity: format!("timelock_{id}"),
        };

        state.records.insert(id.clone(), record);
        state.records_by_creator.entry(self.caller.clone()).or_default().push(id.clone());
        Ok(id)
    }

    async fn get_timelock_identity(&self, record_id: &str) -> Result<String, BackendError> {
        let mut state = self.state();
        self.enter(&mut state, "get_timelock_identity")?;
        Ok(self.owned_record(&state, record_id)?.identity.clone())
    }

    async fn update_timelock_content(
        &self,
        record_id: &str,
        ciphertext_hex: &str,
    ) -> Result<(), BackendError> {
        let mut state = self.state();
        self.enter(&mut state, "update_timelock_content")?;
        self.owned_record(&state, record_id)?;

        if let Some(record) = state.records.get_mut(record_id) {
            record.encrypted_content = ciphertext_hex.to_string();
        }
        Ok(())
    }

    async fn get_my_timelocks(&self) -> Result<Vec<TimelockInfo>, BackendError> {
        let mut state = self.state();
        self.enter(&mut state, "get_my_timelocks")?;

        let now = self.env.wall_clock_secs();
        let Some(ids) = state.records_by_creator.get(&self.caller) else {
            return Ok(Vec::new());
        };

        Ok(ids
            .iter()
            .filter_map(|id| state.records.get(id))
            .map(|record| TimelockInfo {
                id: record.id.clone(),
                title: record.title.clone(),
                unlock_timestamp: record.unlock_timestamp,
                is_expired: now >= record.unlock_timestamp,
            })
            .collect())
    }

    async fn get_timelock_decryption_key(
        &self,
        record_id: &str,
        transport_public_key: &[u8],
    ) -> Result<String, BackendError> {
        let mut state = self.state();
        self.enter(&mut state, "get_timelock_decryption_key")?;

        let record = self.owned_record(&state, record_id)?;
        let locked = self.env.wall_clock_secs() < record.unlock_timestamp;
        if locked && state.misbehavior != Misbehavior::IgnoreUnlockTime {
            return Err(BackendError::NotYetUnlocked);
        }

        let identity = record.identity.clone();
        self.issue_key(&state, TIMELOCK_CONTEXT, identity.as_bytes(), transport_public_key)
    }

    async fn get_timelock_content(&self, record_id: &str) -> Result<String, BackendError> {
        let mut state = self.state();
        self.enter(&mut state, "get_timelock_content")?;

        let record = self.owned_record(&state, record_id)?;
        if record.encrypted_content.is_empty() {
            return Err(BackendError::ContentNotFound);
        }
        Ok(record.encrypted_content.clone())
    }
}
