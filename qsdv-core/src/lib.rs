//! # QSDV Core
//!
//! Key lifecycle, configuration, logging and audit for the QSDV hybrid
//! post-quantum envelope.
//!
//! ## Key Features
//!
//! - **Key Manager**: generation, versioning, caching and expiry of ML-KEM and
//!   ML-DSA key pairs, with at most one generation per family in flight
//! - **Error taxonomy**: [`CoreError`] with a stable [`ErrorKind`] and a
//!   transient/permanent [`FailureClass`]
//! - **Audit hook**: one [`AuditEvent`] per operation, delivered to an
//!   [`AuditSink`] that owns all storage
//! - **Structured logging**: `tracing` with correlation IDs and key-lifecycle macros
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use qsdv_core::{KeyManager, KeyManagerConfig};
//! use qsdv_primitives::{DefaultProvider, KeyFamily};
//! use std::sync::Arc;
//!
//! qsdv_core::logging::init_tracing().ok();
//!
//! let manager = KeyManager::new(
//!     Arc::new(DefaultProvider::new()),
//!     KeyManagerConfig::for_security_level(5).build()?,
//! )?;
//! let kem = manager.get_current(KeyFamily::Kem)?;
//! println!("current KEM key: {}", kem.version());
//!
//! let rotated = manager.rotate(KeyFamily::Kem)?;
//! assert!(manager.get_by_version(kem.version()).is_ok());
//! assert_ne!(rotated.version(), kem.version());
//! # Ok::<(), qsdv_core::CoreError>(())
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]

/// Audit events and sinks.
pub mod audit;
/// Configuration types for the key manager and envelope codec.
pub mod config;
/// Error types and result aliases.
pub mod error;
/// Key generation, rotation, expiry and retrieval.
pub mod key_manager;
/// Security-conscious logging utilities.
pub mod logging;
/// Serialization utilities for binary fields.
pub mod serialization;
/// Key pair model.
pub mod types;

pub use audit::{
    AuditEvent, AuditEventBuilder, AuditOperation, AuditOutcome, AuditSink, MemoryAuditSink, NoopAuditSink,
    TracingAuditSink,
};
pub use config::{EnvelopeConfig, KeyManagerConfig, VaultConfig, VaultSettings};
pub use error::{CoreError, ErrorKind, FailureClass, Result};
pub use key_manager::{KeyManager, KeyManagerStatus};
pub use logging::{CorrelationGuard, RotationReason};
pub use types::{KeyPair, KeyRecord, KeyState, PublicKeyInfo, StoredKey};

/// Library version from Cargo.toml.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
