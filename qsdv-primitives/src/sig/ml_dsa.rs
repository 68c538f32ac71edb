#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]

//! ML-DSA (FIPS 204) Digital Signatures
//!
//! Byte-oriented wrappers over the `fips204` crate. Signatures are produced
//! with the hedged (randomized) signing variant and an empty context string.

use fips204::{
    ml_dsa_44, ml_dsa_65, ml_dsa_87,
    traits::{SerDes, Signer, Verifier},
};
use tracing::instrument;
use zeroize::Zeroize;

use super::SignatureAlgorithm;
use crate::error::{PrimitiveError, Result};
use crate::security::SecretBytes;

/// Context string passed to every sign and verify call.
pub const SIGNING_CONTEXT: &[u8] = &[];

/// Runs `$body` with `$m` bound to the `fips204` module of the parameter set and
/// `$pk`, `$sk`, `$sig` bound to its public key, secret key and signature sizes.
macro_rules! with_parameter_set {
    ($algorithm:expr, ($m:ident, $pk:ident, $sk:ident, $sig:ident) => $body:block) => {
        match $algorithm {
            SignatureAlgorithm::MlDsa44 => {
                use ml_dsa_44 as $m;
                const $pk: usize = 1312;
                const $sk: usize = 2560;
                const $sig: usize = 2420;
                $body
            }
            SignatureAlgorithm::MlDsa65 => {
                use ml_dsa_65 as $m;
                const $pk: usize = 1952;
                const $sk: usize = 4032;
                const $sig: usize = 3309;
                $body
            }
            SignatureAlgorithm::MlDsa87 => {
                use ml_dsa_87 as $m;
                const $pk: usize = 2592;
                const $sk: usize = 4896;
                const $sig: usize = 4627;
                $body
            }
        }
    };
}

/// Generate an ML-DSA key pair.
///
/// Returns `(public_key, secret_key)`.
///
/// # Errors
///
/// Returns [`PrimitiveError::KeyGeneration`] if the OS RNG fails.
#[instrument(level = "debug", fields(algorithm = %algorithm))]
pub fn generate_keypair(algorithm: SignatureAlgorithm) -> Result<(Vec<u8>, SecretBytes)> {
    with_parameter_set!(algorithm, (m, _PK, _SK, _SIG) => {
        let (pk, sk) = m::try_keygen().map_err(|e| {
            PrimitiveError::KeyGeneration(format!("{} key generation failed: {}", algorithm, e))
        })?;
        let mut sk_bytes = sk.into_bytes();
        let secret = SecretBytes::from_slice(&sk_bytes);
        sk_bytes.zeroize();
        Ok((pk.into_bytes().to_vec(), secret))
    })
}

/// Sign `message` with `secret_key`.
///
/// # Errors
///
/// Returns [`PrimitiveError::InvalidKeyLength`] if the key has the wrong size, or
/// [`PrimitiveError::Signing`] if the key cannot be decoded or signing fails.
#[instrument(level = "debug", skip(message, secret_key), fields(algorithm = %algorithm, message_len = message.len()))]
pub fn sign(algorithm: SignatureAlgorithm, message: &[u8], secret_key: &[u8]) -> Result<Vec<u8>> {
    with_parameter_set!(algorithm, (m, _PK, SK_LEN, _SIG) => {
        let mut sk_bytes: [u8; SK_LEN] = secret_key.try_into().map_err(|_e| {
            PrimitiveError::InvalidKeyLength {
                algorithm: algorithm.name(),
                key_type: "secret key",
                expected: SK_LEN,
                actual: secret_key.len(),
            }
        })?;
        let sk = m::PrivateKey::try_from_bytes(sk_bytes);
        sk_bytes.zeroize();
        let sk = sk.map_err(|e| {
            PrimitiveError::Signing(format!("failed to decode {} secret key: {}", algorithm, e))
        })?;
        let signature = sk.try_sign(message, SIGNING_CONTEXT).map_err(|e| {
            PrimitiveError::Signing(format!("{} signing failed: {}", algorithm, e))
        })?;
        Ok(signature.to_vec())
    })
}

/// Verify `signature` over `message` under `public_key`.
///
/// A signature of the wrong length is reported as `Ok(false)`; only a public key
/// that cannot be decoded is an error.
///
/// # Errors
///
/// Returns [`PrimitiveError::InvalidKeyLength`] or [`PrimitiveError::Verification`]
/// if the public key is malformed.
#[instrument(level = "debug", skip(message, signature, public_key), fields(algorithm = %algorithm, signature_len = signature.len()))]
pub fn verify(
    algorithm: SignatureAlgorithm,
    message: &[u8],
    signature: &[u8],
    public_key: &[u8],
) -> Result<bool> {
    with_parameter_set!(algorithm, (m, PK_LEN, _SK, SIG_LEN) => {
        let pk_bytes: [u8; PK_LEN] = public_key.try_into().map_err(|_e| {
            PrimitiveError::InvalidKeyLength {
                algorithm: algorithm.name(),
                key_type: "public key",
                expected: PK_LEN,
                actual: public_key.len(),
            }
        })?;
        let pk = m::PublicKey::try_from_bytes(pk_bytes).map_err(|e| {
            PrimitiveError::Verification(format!("failed to decode {} public key: {}", algorithm, e))
        })?;
        let Ok(sig_bytes) = <[u8; SIG_LEN]>::try_from(signature) else {
            return Ok(false);
        };
        Ok(pk.verify(message, &sig_bytes, SIGNING_CONTEXT))
    })
}
