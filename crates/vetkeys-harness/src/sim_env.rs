//! Simulated environment with a seeded RNG and a virtual wall clock.
//!
//! Clones share both the RNG and the clock, so a client and a simulated
//! backend built from the same `SimEnv` agree on the time and draw from one
//! reproducible random stream.

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicU64, Ordering},
};

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use vetkeys_client::Environment;

/// Virtual start time (2023-11-14T22:13:20Z)
pub const DEFAULT_START_SECS: u64 = 1_700_000_000;

/// Deterministic [`Environment`] for tests and demos.
#[derive(Clone)]
pub struct SimEnv {
    rng: Arc<Mutex<ChaCha20Rng>>,
    clock: Arc<AtomicU64>,
}

impl SimEnv {
    /// Environment with seed 0.
    pub fn new() -> Self {
        Self::with_seed(0)
    }

    /// Environment whose random stream is fixed by `seed`.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Arc::new(Mutex::new(ChaCha20Rng::seed_from_u64(seed))),
            clock: Arc::new(AtomicU64::new(DEFAULT_START_SECS)),
        }
    }

    /// Move the wall clock forward.
    pub fn advance(&self, secs: u64) {
        self.clock.fetch_add(secs, Ordering::SeqCst);
    }

    /// Set the wall clock.
    pub fn set_time(&self, secs: u64) {
        self.clock.store(secs, Ordering::SeqCst);
    }
}

impl Default for SimEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment for SimEnv {
    fn wall_clock_secs(&self) -> u64 {
        self.clock.load(Ordering::SeqCst)
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        #[allow(clippy::expect_used)]
        self.rng.lock().expect("SimEnv RNG mutex poisoned").fill_bytes(buffer);
    }
}
