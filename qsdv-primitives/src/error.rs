//! Error types for qsdv-primitives crate.

/// Errors that can occur in cryptographic primitive operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PrimitiveError {
    /// Key pair generation failed.
    #[error("Key generation failed: {0}")]
    KeyGeneration(String),

    /// KEM encapsulation failed.
    #[error("Encapsulation failed: {0}")]
    Encapsulation(String),

    /// KEM decapsulation failed.
    #[error("Decapsulation failed: {0}")]
    Decapsulation(String),

    /// Signing failed.
    #[error("Signing failed: {0}")]
    Signing(String),

    /// Signature verification could not be carried out (malformed public key).
    #[error("Verification failed: {0}")]
    Verification(String),

    /// A key had the wrong length for its algorithm.
    #[error("Invalid {key_type} length for {algorithm}: expected {expected}, got {actual}")]
    InvalidKeyLength {
        /// Algorithm the key was meant for.
        algorithm: &'static str,
        /// "public key", "secret key" or "symmetric key".
        key_type: &'static str,
        /// Expected length in bytes.
        expected: usize,
        /// Actual length in bytes.
        actual: usize,
    },

    /// A KEM ciphertext had the wrong length for its algorithm.
    #[error("Invalid ciphertext length for {algorithm}: expected {expected}, got {actual}")]
    InvalidCiphertextLength {
        /// Algorithm the ciphertext was meant for.
        algorithm: &'static str,
        /// Expected length in bytes.
        expected: usize,
        /// Actual length in bytes.
        actual: usize,
    },

    /// An AEAD IV had the wrong length.
    #[error("Invalid IV length: expected {expected}, got {actual}")]
    InvalidIvLength {
        /// Expected length in bytes.
        expected: usize,
        /// Actual length in bytes.
        actual: usize,
    },

    /// AEAD tag verification failed: the ciphertext, IV or key do not match.
    #[error("AEAD authentication failed")]
    AeadAuthentication,

    /// AEAD encryption failed for a reason other than authentication.
    #[error("Encryption failed: {0}")]
    Encryption(String),

    /// Key derivation failed.
    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),

    /// Algorithm name or identifier is not supported.
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Pairwise consistency test failed right after key generation.
    #[error("Pairwise consistency test failed for {0}")]
    PairwiseConsistency(&'static str),
}

/// Result type alias for qsdv-primitives operations.
pub type Result<T> = std::result::Result<T, PrimitiveError>;
