//! Client configuration.

/// Default application context for symmetric encryption
pub const DEFAULT_SYMMETRIC_CONTEXT: &str = "vetkd-demo";

/// How the client obtains derived public keys for verification.
///
/// Encryption paths always use a freshly fetched key regardless of policy; a
/// stale key there would produce ciphertexts nobody can open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MasterKeyPolicy {
    /// Fetch the public key for every operation.
    #[default]
    AlwaysFetch,

    /// Fetch once per purpose and reuse. A rotated backend key surfaces as a
    /// verification error.
    CacheStrict,

    /// Reuse the cached key; on a verification failure refetch once and, if
    /// the key changed, verify the same envelope again.
    CacheWithRefetch,
}

impl MasterKeyPolicy {
    /// Whether this policy keeps keys between operations.
    pub fn caches(self) -> bool {
        !matches!(self, Self::AlwaysFetch)
    }
}

/// Configuration for [`VetKeyClient`](crate::VetKeyClient).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Domain-separation string for symmetric message encryption.
    pub symmetric_context: String,

    /// Derived public key caching.
    pub master_key_policy: MasterKeyPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            symmetric_context: DEFAULT_SYMMETRIC_CONTEXT.to_string(),
            master_key_policy: MasterKeyPolicy::default(),
        }
    }
}
