#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]

//! KDF adapter: KEM shared secret to AES-256-GCM key.
//!
//! HKDF-SHA256 with an empty salt and
//! `info = label || 0x00 || KEM algorithm name`, so keys derived for different
//! deployments (labels) or parameter sets never coincide.

use qsdv_core::{CoreError, Result};
use qsdv_primitives::kdf::hkdf_sha256_symmetric_key;
use qsdv_primitives::{KemAlgorithm, SecretBytes, SymmetricKey};

/// Derives per-envelope symmetric keys from KEM shared secrets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvelopeKdf {
    label: String,
}

impl EnvelopeKdf {
    /// Create an adapter with a context label.
    ///
    /// # Errors
    /// Returns [`CoreError::ConfigurationError`] if `label` is empty or contains a NUL byte.
    pub fn new(label: impl Into<String>) -> Result<Self> {
        let label = label.into();
        if label.is_empty() || label.contains('\0') {
            return Err(CoreError::ConfigurationError(
                "KDF label must be non-empty and must not contain NUL".to_string(),
            ));
        }
        Ok(Self { label })
    }

    /// The context label.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// HKDF info string for `algorithm`.
    #[must_use]
    pub fn info(&self, algorithm: KemAlgorithm) -> Vec<u8> {
        let mut info = Vec::with_capacity(self.label.len() + 1 + algorithm.name().len());
        info.extend_from_slice(self.label.as_bytes());
        info.push(0x00);
        info.extend_from_slice(algorithm.name().as_bytes());
        info
    }

    /// Derive the AES-256-GCM key for an envelope sealed under `algorithm`.
    ///
    /// # Errors
    /// Returns [`CoreError::PrimitiveFailure`] if HKDF fails.
    pub fn derive(&self, shared_secret: &SecretBytes, algorithm: KemAlgorithm) -> Result<SymmetricKey> {
        Ok(hkdf_sha256_symmetric_key(shared_secret.as_slice(), &self.info(algorithm))?)
    }
}
