//! FIPS 140-3 Pairwise Consistency Tests (PCT)
//!
//! A PCT is a conditional self-test performed immediately after key generation
//! to detect a corrupted key pair before it is ever used (FIPS 140-3 IG 10.3.A).
//!
//! - ML-DSA: sign a fixed message with the new secret key, verify with the public key
//! - ML-KEM: encapsulate to the new public key, decapsulate with the secret key and
//!   compare the shared secrets in constant time

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]

use crate::error::{PrimitiveError, Result};
use crate::kem::{KemAlgorithm, ml_kem};
use crate::sig::{SignatureAlgorithm, ml_dsa};

/// Fixed test message for PCT operations
pub const PCT_TEST_MESSAGE: &[u8] = b"FIPS PCT test";

/// Performs a Pairwise Consistency Test for an ML-DSA key pair.
///
/// # Errors
///
/// Returns [`PrimitiveError::PairwiseConsistency`] if the signature does not verify,
/// or the underlying signing error if signing fails.
pub fn pct_ml_dsa(algorithm: SignatureAlgorithm, public_key: &[u8], secret_key: &[u8]) -> Result<()> {
    let signature = ml_dsa::sign(algorithm, PCT_TEST_MESSAGE, secret_key)?;
    if ml_dsa::verify(algorithm, PCT_TEST_MESSAGE, &signature, public_key)? {
        Ok(())
    } else {
        Err(PrimitiveError::PairwiseConsistency(algorithm.name()))
    }
}

/// Performs a Pairwise Consistency Test for an ML-KEM key pair.
///
/// # Errors
///
/// Returns [`PrimitiveError::PairwiseConsistency`] if the decapsulated secret differs
/// from the encapsulated one.
pub fn pct_ml_kem(algorithm: KemAlgorithm, public_key: &[u8], secret_key: &[u8]) -> Result<()> {
    let (shared_secret, ciphertext) = ml_kem::encapsulate(algorithm, public_key)?;
    let recovered = ml_kem::decapsulate(algorithm, &ciphertext, secret_key)?;
    if shared_secret == recovered {
        Ok(())
    } else {
        Err(PrimitiveError::PairwiseConsistency(algorithm.name()))
    }
}
