#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]

//! SP 800-56C: HMAC-based Extract-and-Expand Key Derivation (HKDF)
//!
//! HKDF-SHA256 via aws-lc-rs. Output keying material is returned in zeroizing
//! containers.

use aws_lc_rs::hkdf::{HKDF_SHA256, KeyType, Salt};
use tracing::instrument;
use zeroize::Zeroize;

use crate::error::{PrimitiveError, Result};
use crate::security::{SYMMETRIC_KEY_LEN, SecretBytes, SymmetricKey};

/// Largest output HKDF-SHA256 can produce (255 * HashLen).
pub const HKDF_SHA256_MAX_OUTPUT: usize = 255 * 32;

/// Custom output length type for aws-lc-rs HKDF
struct HkdfOutputLen(usize);

impl KeyType for HkdfOutputLen {
    fn len(&self) -> usize {
        self.0
    }
}

/// Full HKDF-SHA256 (extract then expand) producing `length` bytes.
///
/// An empty `salt` is treated as a string of HashLen zeros, per RFC 5869.
///
/// # Errors
///
/// Returns [`PrimitiveError::KeyDerivation`] if `length` is zero or exceeds
/// [`HKDF_SHA256_MAX_OUTPUT`].
#[instrument(level = "debug", skip(ikm, salt, info), fields(ikm_len = ikm.len(), info_len = info.len(), length))]
pub fn hkdf_sha256(ikm: &[u8], salt: &[u8], info: &[u8], length: usize) -> Result<SecretBytes> {
    if length == 0 || length > HKDF_SHA256_MAX_OUTPUT {
        return Err(PrimitiveError::KeyDerivation(format!(
            "output length {} outside 1..={}",
            length, HKDF_SHA256_MAX_OUTPUT
        )));
    }

    let prk = Salt::new(HKDF_SHA256, salt).extract(ikm);
    let info_refs: [&[u8]; 1] = [info];
    let okm = prk
        .expand(&info_refs, HkdfOutputLen(length))
        .map_err(|_e| PrimitiveError::KeyDerivation("HKDF expansion failed".to_string()))?;

    let mut out = vec![0u8; length];
    if okm.fill(&mut out).is_err() {
        out.zeroize();
        return Err(PrimitiveError::KeyDerivation("HKDF fill failed".to_string()));
    }
    Ok(SecretBytes::new(out))
}

/// HKDF-SHA256 with an empty salt, producing a 256-bit [`SymmetricKey`].
///
/// # Errors
///
/// Returns [`PrimitiveError::KeyDerivation`] if expansion fails.
pub fn hkdf_sha256_symmetric_key(ikm: &[u8], info: &[u8]) -> Result<SymmetricKey> {
    let okm = hkdf_sha256(ikm, &[], info, SYMMETRIC_KEY_LEN)?;
    let mut key = [0u8; SYMMETRIC_KEY_LEN];
    key.copy_from_slice(okm.as_slice());
    let symmetric = SymmetricKey::from_bytes(key);
    key.zeroize();
    Ok(symmetric)
}
