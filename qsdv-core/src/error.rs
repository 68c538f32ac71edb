//! Error types for QSDV core operations.
//!
//! [`CoreError`] is the taxonomy every key-manager and envelope operation
//! reports. Callers that only need to decide whether to retry use
//! [`CoreError::failure_class`], whose display text carries no details.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]

use qsdv_primitives::{KeyFamily, PrimitiveError};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors that can occur during QSDV core operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// No key with this version is held by the key manager.
    #[error("Key not found: {version}")]
    KeyNotFound {
        /// The requested key version.
        version: String,
    },

    /// A key was rotated or expired while an operation was using it.
    #[error("Key expired: {version}")]
    KeyExpired {
        /// Version of the key that is no longer usable.
        version: String,
    },

    /// The envelope's declared algorithm or family disagrees with the resolved key.
    #[error("Algorithm mismatch for key {version}: envelope declares {declared}, key is {actual}")]
    AlgorithmMismatch {
        /// Version of the resolved key.
        version: String,
        /// Algorithm (or family) declared by the envelope.
        declared: String,
        /// Algorithm (or family) of the stored key.
        actual: String,
    },

    /// Signature verification or AEAD authentication failed.
    #[error("Authentication failure: {0}")]
    AuthenticationFailure(String),

    /// A primitive operation failed.
    #[error("Primitive failure: {0}")]
    PrimitiveFailure(#[from] PrimitiveError),

    /// Key generation did not finish within the caller's deadline.
    ///
    /// The generation keeps running; a later call observes its result.
    #[error("Key generation for {family} family timed out after {timeout_ms} ms")]
    GenerationTimeout {
        /// Family whose generation was awaited.
        family: KeyFamily,
        /// Deadline that elapsed, in milliseconds.
        timeout_ms: u64,
    },

    /// The key is the current key of its family and cannot be purged.
    #[error("Key in use: {version}")]
    KeyInUse {
        /// Version of the current key.
        version: String,
    },

    /// Envelope bytes or fields are structurally invalid.
    #[error("Malformed envelope: {0}")]
    MalformedEnvelope(String),

    /// Configuration validation error.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Serialization or deserialization error.
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::SerializationError(err.to_string())
    }
}

/// Stable, serializable discriminant of [`CoreError`], used in audit events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// See [`CoreError::KeyNotFound`].
    KeyNotFound,
    /// See [`CoreError::KeyExpired`].
    KeyExpired,
    /// See [`CoreError::AlgorithmMismatch`].
    AlgorithmMismatch,
    /// See [`CoreError::AuthenticationFailure`].
    AuthenticationFailure,
    /// See [`CoreError::PrimitiveFailure`].
    PrimitiveFailure,
    /// See [`CoreError::GenerationTimeout`].
    GenerationTimeout,
    /// See [`CoreError::KeyInUse`].
    KeyInUse,
    /// See [`CoreError::MalformedEnvelope`].
    MalformedEnvelope,
    /// See [`CoreError::ConfigurationError`].
    ConfigurationError,
    /// See [`CoreError::SerializationError`].
    SerializationError,
}

impl ErrorKind {
    /// Snake-case name, matching the serialized form.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::KeyNotFound => "key_not_found",
            Self::KeyExpired => "key_expired",
            Self::AlgorithmMismatch => "algorithm_mismatch",
            Self::AuthenticationFailure => "authentication_failure",
            Self::PrimitiveFailure => "primitive_failure",
            Self::GenerationTimeout => "generation_timeout",
            Self::KeyInUse => "key_in_use",
            Self::MalformedEnvelope => "malformed_envelope",
            Self::ConfigurationError => "configuration_error",
            Self::SerializationError => "serialization_error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse classification for service layers that only distinguish
/// "retry later" from "give up".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    /// The same request may succeed if retried.
    Transient,
    /// Retrying will not help.
    Permanent,
}

impl FailureClass {
    /// Whether a retry may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient)
    }
}

impl fmt::Display for FailureClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transient => f.write_str("Cryptographic operation temporarily unavailable, retry later"),
            Self::Permanent => f.write_str("Cryptographic operation failed"),
        }
    }
}

impl CoreError {
    /// Stable discriminant for audit and metrics.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::KeyNotFound { .. } => ErrorKind::KeyNotFound,
            Self::KeyExpired { .. } => ErrorKind::KeyExpired,
            Self::AlgorithmMismatch { .. } => ErrorKind::AlgorithmMismatch,
            Self::AuthenticationFailure(_) => ErrorKind::AuthenticationFailure,
            Self::PrimitiveFailure(_) => ErrorKind::PrimitiveFailure,
            Self::GenerationTimeout { .. } => ErrorKind::GenerationTimeout,
            Self::KeyInUse { .. } => ErrorKind::KeyInUse,
            Self::MalformedEnvelope(_) => ErrorKind::MalformedEnvelope,
            Self::ConfigurationError(_) => ErrorKind::ConfigurationError,
            Self::SerializationError(_) => ErrorKind::SerializationError,
        }
    }

    /// `KeyExpired` and `GenerationTimeout` are transient; everything else is permanent.
    #[must_use]
    pub const fn failure_class(&self) -> FailureClass {
        match self {
            Self::KeyExpired { .. } | Self::GenerationTimeout { .. } => FailureClass::Transient,
            _ => FailureClass::Permanent,
        }
    }
}

/// A specialized Result type for QSDV core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
