#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]

//! # QSDV Primitives
//!
//! Cryptographic building blocks for the QSDV hybrid envelope, exposed behind
//! the [`CryptoProvider`] capability trait.
//!
//! ## Algorithms
//!
//! ### Post-Quantum (NIST FIPS 203-204)
//!
//! - **kem::ml_kem**: ML-KEM-512/768/1024 (FIPS 203) via the `fips203` crate
//! - **sig::ml_dsa**: ML-DSA-44/65/87 (FIPS 204) via the `fips204` crate
//!
//! ### Symmetric
//!
//! - **aead::aes_gcm**: AES-256-GCM (NIST SP 800-38D) via `aws-lc-rs`
//! - **kdf::hkdf**: HKDF-SHA256 (RFC 5869, NIST SP 800-56C) via `aws-lc-rs`
//!
//! ### Supporting Modules
//!
//! - **pct**: pairwise consistency tests run after every key generation
//! - **security**: zeroizing containers for secret keys, shared secrets and derived keys
//! - **provider**: the [`CryptoProvider`] trait and [`DefaultProvider`]
//!
//! ## Algorithm Names
//!
//! Both families parse their canonical names and the legacy Open Quantum Safe
//! names:
//!
//! ```rust
//! use qsdv_primitives::{KemAlgorithm, SignatureAlgorithm};
//!
//! assert_eq!("Kyber768".parse::<KemAlgorithm>()?, KemAlgorithm::MlKem768);
//! assert_eq!("Dilithium3".parse::<SignatureAlgorithm>()?, SignatureAlgorithm::MlDsa65);
//! # Ok::<(), qsdv_primitives::PrimitiveError>(())
//! ```

pub mod aead;
pub mod error;
pub mod kdf;
pub mod kem;
pub mod pct;
pub mod provider;
pub mod security;
pub mod sig;

pub use error::{PrimitiveError, Result};
pub use kem::KemAlgorithm;
pub use provider::{Algorithm, CryptoProvider, DefaultProvider, GeneratedKeyPair, KeyFamily};
pub use security::{SecretBytes, SymmetricKey};
pub use sig::SignatureAlgorithm;
