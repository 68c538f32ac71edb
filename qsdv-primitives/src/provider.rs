//! Crypto provider interface
//!
//! [`CryptoProvider`] is the capability set the key manager and envelope codec
//! are written against: KEM, signature and AEAD operations over plain byte
//! slices, with the algorithm named explicitly on every call. The core never
//! links a particular library; it holds an `Arc<dyn CryptoProvider>` chosen at
//! construction time.
//!
//! [`DefaultProvider`] backs the interface with `fips203` (ML-KEM), `fips204`
//! (ML-DSA) and `aws-lc-rs` (AES-256-GCM). Every freshly generated key pair
//! passes a pairwise consistency test before it is returned.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::aead::{AesGcm256, Iv};
use crate::error::Result;
use crate::kem::{KemAlgorithm, ml_kem};
use crate::pct;
use crate::security::{SecretBytes, SymmetricKey};
use crate::sig::{SignatureAlgorithm, ml_dsa};

/// The two key families managed independently, each with its own current key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyFamily {
    /// Key encapsulation key pairs
    Kem,
    /// Signature key pairs
    #[serde(rename = "sig")]
    Signature,
}

impl KeyFamily {
    /// Short tag used as the prefix of key versions (`kem`, `sig`).
    #[must_use]
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::Kem => "kem",
            Self::Signature => "sig",
        }
    }
}

impl fmt::Display for KeyFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// An algorithm of either family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Algorithm {
    /// A KEM parameter set
    Kem(KemAlgorithm),
    /// A signature parameter set
    Signature(SignatureAlgorithm),
}

impl Algorithm {
    /// Family this algorithm belongs to.
    #[must_use]
    pub const fn family(&self) -> KeyFamily {
        match self {
            Self::Kem(_) => KeyFamily::Kem,
            Self::Signature(_) => KeyFamily::Signature,
        }
    }

    /// Canonical algorithm name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Kem(alg) => alg.name(),
            Self::Signature(alg) => alg.name(),
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<KemAlgorithm> for Algorithm {
    fn from(alg: KemAlgorithm) -> Self {
        Self::Kem(alg)
    }
}

impl From<SignatureAlgorithm> for Algorithm {
    fn from(alg: SignatureAlgorithm) -> Self {
        Self::Signature(alg)
    }
}

/// Raw output of key generation.
#[derive(Debug)]
pub struct GeneratedKeyPair {
    /// Algorithm the keys belong to
    pub algorithm: Algorithm,
    /// Public key bytes
    pub public_key: Vec<u8>,
    /// Secret key bytes, zeroized on drop
    pub secret_key: SecretBytes,
}

/// Primitive operations required by the key manager and envelope codec.
///
/// Implementations must draw randomness from the OS CSPRNG, must not keep
/// state derived from the keys they are handed, and must report every failure
/// rather than returning partial results.
pub trait CryptoProvider: Send + Sync {
    /// Generate a fresh key pair for `algorithm`.
    ///
    /// # Errors
    /// Returns an error if key generation or its self-test fails.
    fn generate_keypair(&self, algorithm: Algorithm) -> Result<GeneratedKeyPair>;

    /// Encapsulate a fresh shared secret to `public_key`.
    ///
    /// Returns `(shared_secret, encapsulated_key)`.
    ///
    /// # Errors
    /// Returns an error if the public key is malformed.
    fn encapsulate(&self, algorithm: KemAlgorithm, public_key: &[u8]) -> Result<(SecretBytes, Vec<u8>)>;

    /// Recover the shared secret from `encapsulated_key`.
    ///
    /// # Errors
    /// Returns an error if the key or encapsulated key has the wrong length.
    fn decapsulate(
        &self,
        algorithm: KemAlgorithm,
        encapsulated_key: &[u8],
        secret_key: &[u8],
    ) -> Result<SecretBytes>;

    /// Sign `message`.
    ///
    /// # Errors
    /// Returns an error if the secret key is malformed or signing fails.
    fn sign(&self, algorithm: SignatureAlgorithm, message: &[u8], secret_key: &[u8]) -> Result<Vec<u8>>;

    /// Verify `signature` over `message`. A malformed signature is `Ok(false)`.
    ///
    /// # Errors
    /// Returns an error only if the public key is malformed.
    fn verify(
        &self,
        algorithm: SignatureAlgorithm,
        message: &[u8],
        signature: &[u8],
        public_key: &[u8],
    ) -> Result<bool>;

    /// AEAD-encrypt `plaintext` under a fresh random IV. Returns `(ciphertext, iv)`.
    ///
    /// # Errors
    /// Returns an error if the cipher rejects the input.
    fn aead_encrypt(&self, key: &SymmetricKey, plaintext: &[u8]) -> Result<(Vec<u8>, Vec<u8>)>;

    /// AEAD-decrypt `ciphertext`.
    ///
    /// # Errors
    /// Returns [`PrimitiveError::AeadAuthentication`](crate::PrimitiveError::AeadAuthentication)
    /// if the tag does not verify.
    fn aead_decrypt(&self, key: &SymmetricKey, ciphertext: &[u8], iv: &[u8]) -> Result<Vec<u8>>;
}

/// The shipped provider: ML-KEM via `fips203`, ML-DSA via `fips204`,
/// AES-256-GCM via `aws-lc-rs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultProvider;

impl DefaultProvider {
    /// Create the default provider.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl CryptoProvider for DefaultProvider {
    fn generate_keypair(&self, algorithm: Algorithm) -> Result<GeneratedKeyPair> {
        let (public_key, secret_key) = match algorithm {
            Algorithm::Kem(alg) => {
                let (pk, sk) = ml_kem::generate_keypair(alg)?;
                pct::pct_ml_kem(alg, &pk, sk.as_slice())?;
                (pk, sk)
            }
            Algorithm::Signature(alg) => {
                let (pk, sk) = ml_dsa::generate_keypair(alg)?;
                pct::pct_ml_dsa(alg, &pk, sk.as_slice())?;
                (pk, sk)
            }
        };
        Ok(GeneratedKeyPair { algorithm, public_key, secret_key })
    }

    fn encapsulate(&self, algorithm: KemAlgorithm, public_key: &[u8]) -> Result<(SecretBytes, Vec<u8>)> {
        ml_kem::encapsulate(algorithm, public_key)
    }

    fn decapsulate(
        &self,
        algorithm: KemAlgorithm,
        encapsulated_key: &[u8],
        secret_key: &[u8],
    ) -> Result<SecretBytes> {
        ml_kem::decapsulate(algorithm, encapsulated_key, secret_key)
    }

    fn sign(&self, algorithm: SignatureAlgorithm, message: &[u8], secret_key: &[u8]) -> Result<Vec<u8>> {
        ml_dsa::sign(algorithm, message, secret_key)
    }

    fn verify(
        &self,
        algorithm: SignatureAlgorithm,
        message: &[u8],
        signature: &[u8],
        public_key: &[u8],
    ) -> Result<bool> {
        ml_dsa::verify(algorithm, message, signature, public_key)
    }

    fn aead_encrypt(&self, key: &SymmetricKey, plaintext: &[u8]) -> Result<(Vec<u8>, Vec<u8>)> {
        let cipher = AesGcm256::new(key.as_bytes())?;
        let (ciphertext, iv): (Vec<u8>, Iv) = cipher.seal(plaintext)?;
        Ok((ciphertext, iv.to_vec()))
    }

    fn aead_decrypt(&self, key: &SymmetricKey, ciphertext: &[u8], iv: &[u8]) -> Result<Vec<u8>> {
        AesGcm256::new(key.as_bytes())?.open(ciphertext, iv)
    }
}
