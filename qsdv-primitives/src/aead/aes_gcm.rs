#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]

//! AES-256-GCM (Advanced Encryption Standard - Galois/Counter Mode)
//!
//! Uses aws-lc-rs for FIPS 140-3 compliance and hardware acceleration (AES-NI).

use crate::aead::{AES_256_GCM_KEY_LEN, IV_LEN, Iv, TAG_LEN};
use crate::error::{PrimitiveError, Result};
use aws_lc_rs::aead::{AES_256_GCM, Aad, LessSafeKey, Nonce as AwsNonce, UnboundKey};
use rand::RngCore;
use rand::rngs::OsRng;
use tracing::instrument;

/// AES-GCM-256 cipher (256-bit key)
///
/// # Example
///
/// ```rust
/// use qsdv_primitives::aead::AesGcm256;
///
/// let cipher = AesGcm256::new(&[0x42u8; 32])?;
/// let (ciphertext, iv) = cipher.seal(b"secret message")?;
/// let plaintext = cipher.open(&ciphertext, &iv)?;
/// assert_eq!(plaintext, b"secret message");
/// # Ok::<(), qsdv_primitives::PrimitiveError>(())
/// ```
pub struct AesGcm256 {
    key: LessSafeKey,
}

impl AesGcm256 {
    /// Create a cipher from a 32-byte key.
    ///
    /// # Errors
    ///
    /// Returns [`PrimitiveError::InvalidKeyLength`] if `key` is not 32 bytes.
    #[instrument(level = "debug", skip(key), fields(key_len = key.len()))]
    pub fn new(key: &[u8]) -> Result<Self> {
        if key.len() != AES_256_GCM_KEY_LEN {
            return Err(PrimitiveError::InvalidKeyLength {
                algorithm: "AES-256-GCM",
                key_type: "symmetric key",
                expected: AES_256_GCM_KEY_LEN,
                actual: key.len(),
            });
        }
        let unbound_key = UnboundKey::new(&AES_256_GCM, key).map_err(|_e| {
            PrimitiveError::InvalidKeyLength {
                algorithm: "AES-256-GCM",
                key_type: "symmetric key",
                expected: AES_256_GCM_KEY_LEN,
                actual: key.len(),
            }
        })?;
        Ok(Self { key: LessSafeKey::new(unbound_key) })
    }

    /// Generate a random IV
    #[must_use]
    pub fn generate_iv() -> Iv {
        let mut iv = [0u8; IV_LEN];
        OsRng.fill_bytes(&mut iv);
        iv
    }

    /// Encrypt `plaintext` under a fresh random IV.
    ///
    /// Returns `(ciphertext || tag, iv)`.
    ///
    /// # Errors
    ///
    /// Returns [`PrimitiveError::Encryption`] if aws-lc-rs rejects the operation.
    #[instrument(level = "debug", skip(self, plaintext), fields(algorithm = "AES-256-GCM", plaintext_len = plaintext.len()))]
    pub fn seal(&self, plaintext: &[u8]) -> Result<(Vec<u8>, Iv)> {
        let iv = Self::generate_iv();
        let nonce = AwsNonce::try_assume_unique_for_key(&iv)
            .map_err(|_e| PrimitiveError::InvalidIvLength { expected: IV_LEN, actual: iv.len() })?;

        let mut in_out = Vec::with_capacity(plaintext.len().saturating_add(TAG_LEN));
        in_out.extend_from_slice(plaintext);

        self.key
            .seal_in_place_append_tag(nonce, Aad::empty(), &mut in_out)
            .map_err(|e| PrimitiveError::Encryption(e.to_string()))?;

        Ok((in_out, iv))
    }

    /// Decrypt and authenticate `ciphertext` (ciphertext with the tag appended).
    ///
    /// # Errors
    ///
    /// Returns [`PrimitiveError::InvalidIvLength`] for an IV that is not 12 bytes and
    /// [`PrimitiveError::AeadAuthentication`] if the tag does not verify (including
    /// inputs too short to hold a tag).
    #[instrument(level = "debug", skip(self, ciphertext, iv), fields(algorithm = "AES-256-GCM", ciphertext_len = ciphertext.len()))]
    pub fn open(&self, ciphertext: &[u8], iv: &[u8]) -> Result<Vec<u8>> {
        let nonce = AwsNonce::try_assume_unique_for_key(iv)
            .map_err(|_e| PrimitiveError::InvalidIvLength { expected: IV_LEN, actual: iv.len() })?;

        if ciphertext.len() < TAG_LEN {
            return Err(PrimitiveError::AeadAuthentication);
        }

        let mut in_out = ciphertext.to_vec();
        let plaintext = self
            .key
            .open_in_place(nonce, Aad::empty(), &mut in_out)
            .map_err(|_e| PrimitiveError::AeadAuthentication)?;

        Ok(plaintext.to_vec())
    }
}

impl std::fmt::Debug for AesGcm256 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AesGcm256").field("key", &"[REDACTED]").finish()
    }
}
