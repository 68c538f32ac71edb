#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]

//! ML-KEM (FIPS 203) Key Encapsulation
//!
//! Thin byte-oriented wrappers over the `fips203` crate. Keys and ciphertexts
//! cross this boundary as plain byte slices so that they can be stored and
//! versioned by callers; secret keys and shared secrets are returned inside
//! [`SecretBytes`].
//!
//! Decapsulation uses implicit rejection: a tampered ciphertext of the right
//! length decapsulates to an unrelated pseudo-random secret rather than
//! failing, so tampering is detected by the AEAD layer above.

use fips203::traits::{Decaps, Encaps, KeyGen, SerDes};
use fips203::{ml_kem_512, ml_kem_768, ml_kem_1024};
use tracing::instrument;
use zeroize::Zeroize;

use super::KemAlgorithm;
use crate::error::{PrimitiveError, Result};
use crate::security::SecretBytes;

/// Runs `$body` with `$m` bound to the `fips203` module of the parameter set.
macro_rules! with_parameter_set {
    ($algorithm:expr, $m:ident => $body:block) => {
        match $algorithm {
            KemAlgorithm::MlKem512 => {
                use ml_kem_512 as $m;
                $body
            }
            KemAlgorithm::MlKem768 => {
                use ml_kem_768 as $m;
                $body
            }
            KemAlgorithm::MlKem1024 => {
                use ml_kem_1024 as $m;
                $body
            }
        }
    };
}

/// Generate an ML-KEM key pair.
///
/// Returns `(encapsulation_key, decapsulation_key)`.
///
/// # Errors
///
/// Returns [`PrimitiveError::KeyGeneration`] if the OS RNG fails.
#[instrument(level = "debug", fields(algorithm = %algorithm))]
pub fn generate_keypair(algorithm: KemAlgorithm) -> Result<(Vec<u8>, SecretBytes)> {
    with_parameter_set!(algorithm, m => {
        let (ek, dk) = m::KG::try_keygen().map_err(|e| {
            PrimitiveError::KeyGeneration(format!("{} key generation failed: {}", algorithm, e))
        })?;
        let mut dk_bytes = dk.into_bytes();
        let secret = SecretBytes::from_slice(&dk_bytes);
        dk_bytes.zeroize();
        Ok((ek.into_bytes().to_vec(), secret))
    })
}

/// Encapsulate a fresh shared secret to `public_key`.
///
/// Returns `(shared_secret, ciphertext)`.
///
/// # Errors
///
/// Returns [`PrimitiveError::InvalidKeyLength`] if the key has the wrong size for
/// `algorithm`, or [`PrimitiveError::Encapsulation`] if the key fails the FIPS 203
/// modulus check.
#[instrument(level = "debug", skip(public_key), fields(algorithm = %algorithm, pk_len = public_key.len()))]
pub fn encapsulate(algorithm: KemAlgorithm, public_key: &[u8]) -> Result<(SecretBytes, Vec<u8>)> {
    with_parameter_set!(algorithm, m => {
        let ek_bytes: [u8; m::EK_LEN] = public_key.try_into().map_err(|_e| {
            PrimitiveError::InvalidKeyLength {
                algorithm: algorithm.name(),
                key_type: "public key",
                expected: m::EK_LEN,
                actual: public_key.len(),
            }
        })?;
        let ek = m::EncapsKey::try_from_bytes(ek_bytes).map_err(|e| {
            PrimitiveError::Encapsulation(format!("invalid {} public key: {}", algorithm, e))
        })?;
        let (ssk, ct) = ek.try_encaps().map_err(|e| {
            PrimitiveError::Encapsulation(format!("{} encapsulation failed: {}", algorithm, e))
        })?;
        let mut ss_bytes = ssk.into_bytes();
        let shared_secret = SecretBytes::from_slice(&ss_bytes);
        ss_bytes.zeroize();
        Ok((shared_secret, ct.into_bytes().to_vec()))
    })
}

/// Recover the shared secret from `ciphertext` with `secret_key`.
///
/// # Errors
///
/// Returns [`PrimitiveError::InvalidKeyLength`] or
/// [`PrimitiveError::InvalidCiphertextLength`] on size mismatches, or
/// [`PrimitiveError::Decapsulation`] if the secret key fails validation.
#[instrument(level = "debug", skip(ciphertext, secret_key), fields(algorithm = %algorithm, ct_len = ciphertext.len()))]
pub fn decapsulate(
    algorithm: KemAlgorithm,
    ciphertext: &[u8],
    secret_key: &[u8],
) -> Result<SecretBytes> {
    with_parameter_set!(algorithm, m => {
        let ct_bytes: [u8; m::CT_LEN] = ciphertext.try_into().map_err(|_e| {
            PrimitiveError::InvalidCiphertextLength {
                algorithm: algorithm.name(),
                expected: m::CT_LEN,
                actual: ciphertext.len(),
            }
        })?;
        let mut dk_bytes: [u8; m::DK_LEN] = secret_key.try_into().map_err(|_e| {
            PrimitiveError::InvalidKeyLength {
                algorithm: algorithm.name(),
                key_type: "secret key",
                expected: m::DK_LEN,
                actual: secret_key.len(),
            }
        })?;
        let dk = m::DecapsKey::try_from_bytes(dk_bytes);
        dk_bytes.zeroize();
        let dk = dk.map_err(|e| {
            PrimitiveError::Decapsulation(format!("invalid {} secret key: {}", algorithm, e))
        })?;
        let ct = m::CipherText::try_from_bytes(ct_bytes).map_err(|e| {
            PrimitiveError::Decapsulation(format!("invalid {} ciphertext: {}", algorithm, e))
        })?;
        let ssk = dk.try_decaps(&ct).map_err(|e| {
            PrimitiveError::Decapsulation(format!("{} decapsulation failed: {}", algorithm, e))
        })?;
        let mut ss_bytes = ssk.into_bytes();
        let shared_secret = SecretBytes::from_slice(&ss_bytes);
        ss_bytes.zeroize();
        Ok(shared_secret)
    })
}
