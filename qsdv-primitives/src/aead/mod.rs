#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]

//! Authenticated Encryption with Additional Data (AEAD)
//!
//! AES-256-GCM (NIST SP 800-38D) with a random 96-bit IV per encryption. The
//! 16-byte authentication tag is appended to the ciphertext.
//!
//! ## AEAD Security Notes
//!
//! - **Nonce Reuse**: NEVER reuse an IV with the same key
//! - **Nonce Prediction**: IVs come from the OS CSPRNG
//! - **Tag Verification**: a tag mismatch is reported as [`PrimitiveError::AeadAuthentication`]
//!   and no plaintext is released
//!
//! [`PrimitiveError::AeadAuthentication`]: crate::error::PrimitiveError::AeadAuthentication

pub mod aes_gcm;

/// AES-GCM IV length
pub const IV_LEN: usize = 12;

/// AEAD authentication tag length
pub const TAG_LEN: usize = 16;

/// AES-256-GCM key length
pub const AES_256_GCM_KEY_LEN: usize = 32;

/// IV type for AES-GCM
pub type Iv = [u8; IV_LEN];

pub use self::aes_gcm::AesGcm256;
