#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]

//! QSDV - Quantum-Safe Document Vault
//!
//! Protects stored documents against classical and quantum adversaries by
//! combining ML-KEM key encapsulation with AES-256-GCM and, optionally, an
//! ML-DSA signature, under keys that are generated, versioned, cached and
//! expired automatically.
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use qsdv::Vault;
//!
//! let vault = Vault::new()?;
//! let envelope = vault.encrypt(b"hello")?;
//! assert_eq!(vault.decrypt(&envelope)?, b"hello");
//! # Ok::<(), qsdv::CoreError>(())
//! ```
//!
//! ## Storing Envelopes
//!
//! Envelopes are self-describing: they name the algorithms and the exact key
//! versions used, so they remain decryptable after rotation.
//!
//! ```rust,no_run
//! use qsdv::{KeyFamily, Vault};
//!
//! let vault = Vault::new()?;
//! let stored: Vec<u8> = vault.encrypt_to_bytes(b"quarterly report")?;
//!
//! vault.rotate(KeyFamily::Kem)?;
//!
//! assert_eq!(vault.decrypt_bytes(&stored)?, b"quarterly report");
//! # Ok::<(), qsdv::CoreError>(())
//! ```
//!
//! ## Configuration
//!
//! ```rust,no_run
//! use qsdv::{EncryptOptions, Vault};
//!
//! let vault = Vault::from_json(r#"{
//!     "security_level": 5,
//!     "key_rotation_days": 7,
//!     "sign_envelopes": true,
//!     "require_signature": false,
//!     "generation_timeout_ms": 5000
//! }"#)?;
//!
//! // Skip the signature for this call only; allowed because unsigned
//! // envelopes are accepted on decryption.
//! let envelope = vault.encrypt_with(b"cache entry", EncryptOptions::new().with_signing(false))?;
//! assert!(!envelope.is_signed());
//! # Ok::<(), qsdv::CoreError>(())
//! ```
//!
//! ## Observability
//!
//! - `qsdv::logging::init_tracing()` installs a `tracing` subscriber filtered by `RUST_LOG`
//! - every operation produces an [`AuditEvent`]; install a sink with [`Vault::builder`]
//! - errors map to [`FailureClass::Transient`] or [`FailureClass::Permanent`] for callers
//!   that only distinguish "retry" from "give up"

mod vault;

pub use vault::{Vault, VaultBuilder};

pub use qsdv_core::logging;
pub use qsdv_core::{
    AuditEvent, AuditOperation, AuditOutcome, AuditSink, CoreError, EnvelopeConfig, ErrorKind, FailureClass,
    KeyManager, KeyManagerConfig, KeyManagerStatus, KeyPair, KeyRecord, KeyState, MemoryAuditSink, NoopAuditSink,
    PublicKeyInfo, Result, StoredKey, TracingAuditSink, VaultConfig, VaultSettings,
};
pub use qsdv_hybrid::{EncryptOptions, EncryptedEnvelope, EnvelopeCodec, EnvelopeSignature, SelfTestReport};
pub use qsdv_primitives::{
    Algorithm, CryptoProvider, DefaultProvider, KemAlgorithm, KeyFamily, PrimitiveError, SignatureAlgorithm,
};

/// Library version from Cargo.toml.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
