//! Environment abstraction for deterministic testing.
//!
//! Decouples client flows from system resources (wall clock, randomness).
//! Simulations use a virtual clock and a seeded RNG; production uses the
//! system clock and OS entropy.

/// Abstract environment providing wall-clock time and randomness.
///
/// # Safety
///
/// Implementations MUST guarantee:
///
/// - `random_bytes()` uses cryptographically secure entropy in production
/// - Methods are infallible except in exceptional circumstances (e.g., OS
///   entropy exhaustion). Entropy failure is fatal: a client without working
///   randomness cannot generate transport keys.
pub trait Environment: Clone + Send + Sync + 'static {
    /// Current wall-clock time as Unix seconds.
    ///
    /// Used for validating unlock times and deriving timelock status. Not
    /// required to be monotonic.
    fn wall_clock_secs(&self) -> u64;

    /// Fills the provided buffer with random bytes.
    ///
    /// # Invariants
    ///
    /// - Given the same RNG seed, this produces the same sequence of bytes
    /// - Uses cryptographically secure RNG
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Random fixed-size array.
    ///
    /// Convenience for seeds and nonces.
    fn random_array<const N: usize>(&self) -> [u8; N] {
        let mut bytes = [0u8; N];
        self.random_bytes(&mut bytes);
        bytes
    }
}
