#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]

//! Hybrid post-quantum envelope for QSDV
//!
//! Combines ML-KEM key encapsulation with AES-256-GCM and, optionally, an
//! ML-DSA signature over the ciphertext.
//!
//! # Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                          EnvelopeCodec                           │
//! │                                                                  │
//! │  encrypt: KEM encapsulate ─► HKDF ─► AES-256-GCM ─► ML-DSA sign  │
//! │  decrypt: ML-DSA verify ─► KEM decapsulate ─► HKDF ─► AES open   │
//! └──────────────┬──────────────────────────────────┬────────────────┘
//!                │ keys by version / current        │ primitives
//!                ▼                                  ▼
//!        qsdv-core KeyManager             qsdv-primitives CryptoProvider
//! ```
//!
//! # Modules
//!
//! - [`envelope`] - envelope model, binary and JSON encodings
//! - [`kdf`] - shared secret to symmetric key
//! - [`codec`] - encrypt / decrypt / self-test
//!
//! # Example
//!
//! ```rust,no_run
//! use qsdv_core::{EnvelopeConfig, KeyManager, KeyManagerConfig};
//! use qsdv_hybrid::{EncryptOptions, EncryptedEnvelope, EnvelopeCodec};
//! use qsdv_primitives::DefaultProvider;
//! use std::sync::Arc;
//!
//! let keys = KeyManager::new(Arc::new(DefaultProvider::new()), KeyManagerConfig::default())?;
//! let codec = EnvelopeCodec::new(keys, EnvelopeConfig::default())?;
//!
//! let envelope = codec.encrypt(b"hello", EncryptOptions::new())?;
//! let stored = envelope.to_bytes()?;
//! let restored = EncryptedEnvelope::from_bytes(&stored)?;
//! assert_eq!(codec.decrypt(&restored)?, b"hello");
//! # Ok::<(), qsdv_core::CoreError>(())
//! ```

/// Encrypt/decrypt protocol over the key manager.
pub mod codec;
/// Envelope model and encodings.
pub mod envelope;
/// KDF adapter.
pub mod kdf;

pub use codec::{EncryptOptions, EnvelopeCodec, SelfTestReport};
pub use envelope::{
    ENVELOPE_FORMAT_VERSION, ENVELOPE_MAGIC, EncryptedEnvelope, EnvelopeSignature, SerializableEnvelope,
};
pub use kdf::EnvelopeKdf;
