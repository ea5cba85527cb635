//! Hash functions onto the BLS12-381 groups and HKDF helpers
//!
//! All labels live here so that every derivation in the crate is domain
//! separated from every other one.

use hkdf::Hkdf;
use ic_bls12_381::{
    G1Affine, G1Projective, Scalar,
    hash_to_curve::{ExpandMsgXmd, HashToCurve},
};
use sha2::Sha256;

/// DST for hashing `derived_public_key || input` to G1 (augmented BLS scheme)
const G1_AUGMENTED_DST: &[u8] = b"BLS_SIG_BLS12381G1_XMD:SHA-256_SSWU_RO_AUG_";

/// Salt for every hash-to-scalar derivation in this crate
const SCALAR_SALT: &[u8] = b"vetkeys-hash-to-scalar-v1";

/// Label binding a derivation context to a master public key
pub(crate) const CONTEXT_LABEL: &[u8] = b"vetkeys-context";

/// Label for expanding transport key randomness into a scalar
pub(crate) const TRANSPORT_LABEL: &[u8] = b"vetkeys-transport-secret";

/// Label for the per-envelope blinding scalar
pub(crate) const ENVELOPE_LABEL: &[u8] = b"vetkeys-envelope-blinding";

/// Label for the envelope transport-key confirmation tag
pub(crate) const CONFIRMATION_LABEL: &[u8] = b"vetkeys-envelope-confirmation";

/// Label for the IBE encryption exponent
pub(crate) const IBE_EXPONENT_LABEL: &[u8] = b"vetkeys-ibe-exponent";

/// Label for masking the IBE seed with the pairing output
pub(crate) const IBE_MASK_LABEL: &[u8] = b"vetkeys-ibe-seed-mask";

/// Label for the IBE payload key
pub(crate) const IBE_PAYLOAD_LABEL: &[u8] = b"vetkeys-ibe-payload-key";

/// Hash `derived_public_key || input` to a G1 point.
///
/// The same point is signed by the backend (producing the vetKey) and used as
/// the IBE identity point, which is what makes a vetKey an IBE decryption key.
pub(crate) fn hash_to_g1(derived_public_key: &[u8], input: &[u8]) -> G1Affine {
    let mut message = Vec::with_capacity(derived_public_key.len() + input.len());
    message.extend_from_slice(derived_public_key);
    message.extend_from_slice(input);

    let point = <G1Projective as HashToCurve<ExpandMsgXmd<Sha256>>>::hash_to_curve(
        &message,
        G1_AUGMENTED_DST,
    );
    G1Affine::from(point)
}

/// Hash arbitrary parts to a uniformly distributed scalar.
///
/// Expands 64 bytes with HKDF-SHA256 and reduces modulo the group order, so
/// the bias is negligible.
pub(crate) fn hash_to_scalar(label: &[u8], parts: &[&[u8]]) -> Scalar {
    let wide: [u8; 64] = expand(label, parts);
    Scalar::from_bytes_wide(&wide)
}

/// HKDF-SHA256 over the concatenation of `parts`, labelled by `label`.
pub(crate) fn expand<const N: usize>(label: &[u8], parts: &[&[u8]]) -> [u8; N] {
    let ikm: Vec<u8> = parts.iter().flat_map(|p| p.iter().copied()).collect();
    let hkdf = Hkdf::<Sha256>::new(Some(SCALAR_SALT), &ikm);

    let mut out = [0u8; N];
    let Ok(()) = hkdf.expand(label, &mut out) else {
        unreachable!("outputs used in this crate are far below the HKDF-SHA256 limit");
    };
    out
}
