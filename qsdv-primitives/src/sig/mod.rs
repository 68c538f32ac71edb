#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]

//! # Digital Signatures
//!
//! ### ML-DSA (FIPS 204)
//! Module-Lattice-Based Digital Signature Algorithm providing EUF-CMA security.
//!
//! - **ML-DSA-44**: NIST Security Category 2
//!   - Public key: 1312 bytes
//!   - Secret key: 2560 bytes
//!   - Signature: 2420 bytes
//!
//! - **ML-DSA-65**: NIST Security Category 3
//!   - Public key: 1952 bytes
//!   - Secret key: 4032 bytes
//!   - Signature: 3309 bytes
//!
//! - **ML-DSA-87**: NIST Security Category 5
//!   - Public key: 2592 bytes
//!   - Secret key: 4896 bytes
//!   - Signature: 4627 bytes

pub mod ml_dsa;

use crate::error::PrimitiveError;
use crate::kem::normalize_name;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// ML-DSA parameter set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignatureAlgorithm {
    /// ML-DSA-44: NIST security category 2
    #[serde(rename = "ML-DSA-44")]
    MlDsa44,
    /// ML-DSA-65: NIST security category 3
    #[default]
    #[serde(rename = "ML-DSA-65")]
    MlDsa65,
    /// ML-DSA-87: NIST security category 5
    #[serde(rename = "ML-DSA-87")]
    MlDsa87,
}

impl SignatureAlgorithm {
    /// All supported parameter sets, weakest first.
    pub const ALL: [SignatureAlgorithm; 3] = [Self::MlDsa44, Self::MlDsa65, Self::MlDsa87];

    /// Returns the name of the parameter set
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::MlDsa44 => "ML-DSA-44",
            Self::MlDsa65 => "ML-DSA-65",
            Self::MlDsa87 => "ML-DSA-87",
        }
    }

    /// Stable one-byte identifier used in the envelope wire format.
    ///
    /// `0x00` is reserved for "no signature".
    #[must_use]
    pub const fn wire_id(&self) -> u8 {
        match self {
            Self::MlDsa44 => 0x01,
            Self::MlDsa65 => 0x02,
            Self::MlDsa87 => 0x03,
        }
    }

    /// Inverse of [`SignatureAlgorithm::wire_id`].
    #[must_use]
    pub const fn from_wire_id(id: u8) -> Option<Self> {
        match id {
            0x01 => Some(Self::MlDsa44),
            0x02 => Some(Self::MlDsa65),
            0x03 => Some(Self::MlDsa87),
            _ => None,
        }
    }

    /// Returns the public key size in bytes
    #[must_use]
    pub const fn public_key_size(&self) -> usize {
        match self {
            Self::MlDsa44 => 1312,
            Self::MlDsa65 => 1952,
            Self::MlDsa87 => 2592,
        }
    }

    /// Returns the secret key size in bytes
    #[must_use]
    pub const fn secret_key_size(&self) -> usize {
        match self {
            Self::MlDsa44 => 2560,
            Self::MlDsa65 => 4032,
            Self::MlDsa87 => 4896,
        }
    }

    /// Returns the signature size in bytes
    #[must_use]
    pub const fn signature_size(&self) -> usize {
        match self {
            Self::MlDsa44 => 2420,
            Self::MlDsa65 => 3309,
            Self::MlDsa87 => 4627,
        }
    }

    /// Returns the NIST security level
    #[must_use]
    pub const fn security_level(&self) -> u8 {
        match self {
            Self::MlDsa44 => 2,
            Self::MlDsa65 => 3,
            Self::MlDsa87 => 5,
        }
    }

    /// Recommended parameter set for a NIST security level.
    ///
    /// Levels 1 and 2 map to ML-DSA-44, level 5 to ML-DSA-87, anything else to ML-DSA-65.
    #[must_use]
    pub const fn recommended_for_level(level: u8) -> Self {
        match level {
            1 | 2 => Self::MlDsa44,
            5 => Self::MlDsa87,
            _ => Self::MlDsa65,
        }
    }
}

impl fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SignatureAlgorithm {
    type Err = PrimitiveError;

    /// Accepts canonical names and the legacy Dilithium names (`Dilithium2/3/5`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_name(s).as_str() {
            "MLDSA44" | "DILITHIUM2" => Ok(Self::MlDsa44),
            "MLDSA65" | "DILITHIUM3" => Ok(Self::MlDsa65),
            "MLDSA87" | "DILITHIUM5" => Ok(Self::MlDsa87),
            _ => Err(PrimitiveError::UnsupportedAlgorithm(s.to_string())),
        }
    }
}
