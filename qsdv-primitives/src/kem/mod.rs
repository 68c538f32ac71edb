#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]

//! # Key Encapsulation Mechanisms (KEM)
//!
//! ML-KEM (FIPS 203) in its three parameter sets:
//!
//! | Parameter set | NIST category | Public key | Secret key | Ciphertext |
//! |---------------|---------------|------------|------------|------------|
//! | ML-KEM-512    | 1             | 800        | 1632       | 768        |
//! | ML-KEM-768    | 3             | 1184       | 2400       | 1088       |
//! | ML-KEM-1024   | 5             | 1568       | 3168       | 1568       |
//!
//! All parameter sets produce a 32-byte shared secret.
//!
//! ## Module Structure
//!
//! - [`ml_kem`]: key generation, encapsulation and decapsulation via `fips203`

pub mod ml_kem;

use crate::error::PrimitiveError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Length of the ML-KEM shared secret in bytes (all parameter sets).
pub const SHARED_SECRET_LEN: usize = 32;

/// ML-KEM parameter set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KemAlgorithm {
    /// ML-KEM-512: NIST security category 1
    #[serde(rename = "ML-KEM-512")]
    MlKem512,
    /// ML-KEM-768: NIST security category 3
    #[default]
    #[serde(rename = "ML-KEM-768")]
    MlKem768,
    /// ML-KEM-1024: NIST security category 5
    #[serde(rename = "ML-KEM-1024")]
    MlKem1024,
}

impl KemAlgorithm {
    /// All supported parameter sets, weakest first.
    pub const ALL: [KemAlgorithm; 3] = [Self::MlKem512, Self::MlKem768, Self::MlKem1024];

    /// Canonical name, e.g. `ML-KEM-768`.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::MlKem512 => "ML-KEM-512",
            Self::MlKem768 => "ML-KEM-768",
            Self::MlKem1024 => "ML-KEM-1024",
        }
    }

    /// Stable one-byte identifier used in the envelope wire format.
    #[must_use]
    pub const fn wire_id(&self) -> u8 {
        match self {
            Self::MlKem512 => 0x01,
            Self::MlKem768 => 0x02,
            Self::MlKem1024 => 0x03,
        }
    }

    /// Inverse of [`KemAlgorithm::wire_id`].
    #[must_use]
    pub const fn from_wire_id(id: u8) -> Option<Self> {
        match id {
            0x01 => Some(Self::MlKem512),
            0x02 => Some(Self::MlKem768),
            0x03 => Some(Self::MlKem1024),
            _ => None,
        }
    }

    /// NIST security category.
    #[must_use]
    pub const fn security_level(&self) -> u8 {
        match self {
            Self::MlKem512 => 1,
            Self::MlKem768 => 3,
            Self::MlKem1024 => 5,
        }
    }

    /// Encapsulation (public) key size in bytes.
    #[must_use]
    pub const fn public_key_size(&self) -> usize {
        match self {
            Self::MlKem512 => 800,
            Self::MlKem768 => 1184,
            Self::MlKem1024 => 1568,
        }
    }

    /// Decapsulation (secret) key size in bytes.
    #[must_use]
    pub const fn secret_key_size(&self) -> usize {
        match self {
            Self::MlKem512 => 1632,
            Self::MlKem768 => 2400,
            Self::MlKem1024 => 3168,
        }
    }

    /// Ciphertext (encapsulated key) size in bytes.
    #[must_use]
    pub const fn ciphertext_size(&self) -> usize {
        match self {
            Self::MlKem512 => 768,
            Self::MlKem768 => 1088,
            Self::MlKem1024 => 1568,
        }
    }

    /// Recommended parameter set for a NIST security level.
    ///
    /// Levels 1, 3 and 5 map directly; anything else falls back to level 3.
    #[must_use]
    pub const fn recommended_for_level(level: u8) -> Self {
        match level {
            1 => Self::MlKem512,
            5 => Self::MlKem1024,
            _ => Self::MlKem768,
        }
    }
}

impl fmt::Display for KemAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for KemAlgorithm {
    type Err = PrimitiveError;

    /// Accepts canonical names and the legacy Open Quantum Safe Kyber names,
    /// case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_name(s).as_str() {
            "MLKEM512" | "KYBER512" => Ok(Self::MlKem512),
            "MLKEM768" | "KYBER768" => Ok(Self::MlKem768),
            "MLKEM1024" | "KYBER1024" => Ok(Self::MlKem1024),
            _ => Err(PrimitiveError::UnsupportedAlgorithm(s.to_string())),
        }
    }
}

/// Uppercases an algorithm name and strips `-`/`_` separators so that
/// `ML-KEM-768`, `ml_kem_768` and `MLKEM768` compare equal.
pub(crate) fn normalize_name(s: &str) -> String {
    s.trim().chars().filter(|c| *c != '-' && *c != '_').collect::<String>().to_ascii_uppercase()
}
