#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]

//! Key Derivation Functions
//!
//! - **HKDF-SHA256**: HMAC-based Extract-and-Expand Key Derivation (NIST SP 800-56C, RFC 5869)

pub mod hkdf;

pub use hkdf::{hkdf_sha256, hkdf_sha256_symmetric_key};
