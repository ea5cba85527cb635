//! Hex wire encoding
//!
//! Every binary payload (keys, envelopes, ciphertexts) crosses the backend
//! boundary as lowercase hex, two characters per byte, no separators.

use crate::error::CryptoError;

/// Encode bytes as a lowercase hex string.
pub fn encode(bytes: impl AsRef<[u8]>) -> String {
    hex::encode(bytes)
}

/// Decode a hex string into bytes.
///
/// # Errors
///
/// - `InvalidHex`: odd length or a character outside `[0-9a-fA-F]`
pub fn decode(text: &str) -> Result<Vec<u8>, CryptoError> {
    hex::decode(text).map_err(|e| CryptoError::InvalidHex { reason: e.to_string() })
}

/// Decode a hex string into a fixed-size array.
///
/// # Errors
///
/// - `InvalidHex`: malformed hex
/// - `InvalidKey`: decoded length differs from `N`
pub fn decode_array<const N: usize>(
    text: &str,
    what: &'static str,
) -> Result<[u8; N], CryptoError> {
    let bytes = decode(text)?;
    let len = bytes.len();
    bytes
        .try_into()
        .map_err(|_| CryptoError::invalid_key(what, format!("expected {N} bytes, got {len}")))
}
