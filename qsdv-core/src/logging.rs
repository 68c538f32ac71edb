//! # QSDV Logging Utilities
//!
//! Structured logging with `tracing` that never records key material.
//!
//! - Key lifecycle macros ([`log_key_generated!`], [`log_key_rotated!`],
//!   [`log_key_purged!`]) emit on `key_lifecycle::*` targets
//! - [`log_crypto_operation!`] emits on `crypto::operation`, tagged with the
//!   current correlation ID
//! - [`log_security_event!`] emits at ERROR with `security_event = true`
//! - [`sanitize_data`] renders byte buffers as a length plus a BLAKE2s
//!   fingerprint, never the contents
//!
//! ## Usage
//!
//! ```rust,no_run
//! use qsdv_core::logging::{init_tracing, sanitize_data};
//!
//! // Sets the global tracing subscriber; call once per process
//! init_tracing().expect("Failed to init tracing");
//!
//! let ciphertext = vec![0u8; 128];
//! tracing::info!("Stored envelope {}", sanitize_data(&ciphertext));
//! ```

use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fmt;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

/// Filter directive used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "qsdv=info,qsdv_core=info,qsdv_hybrid=info,key_lifecycle=info";

// ============================================================================
// Key Lifecycle Event Types
// ============================================================================

/// Why a key was rotated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RotationReason {
    /// The current key passed its expiry time.
    Expiration,
    /// An explicit `rotate` call.
    Manual,
}

impl fmt::Display for RotationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RotationReason::Expiration => write!(f, "Expiration"),
            RotationReason::Manual => write!(f, "Manual"),
        }
    }
}

// ============================================================================
// Correlation ID Infrastructure
// ============================================================================
//
// Each envelope operation runs under a correlation ID so that the primitive,
// key manager and codec events it produces can be grouped.

thread_local! {
    static CORRELATION_ID: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// Generate a new correlation ID (UUID v4).
#[must_use]
pub fn generate_correlation_id() -> String {
    Uuid::new_v4().to_string()
}

/// Get the current thread's correlation ID, if set.
///
/// ```rust
/// use qsdv_core::logging::{CorrelationGuard, current_correlation_id};
///
/// assert_eq!(current_correlation_id(), None);
/// {
///     let _guard = CorrelationGuard::with_id("request-1");
///     assert_eq!(current_correlation_id(), Some("request-1".to_string()));
/// }
/// assert_eq!(current_correlation_id(), None);
/// ```
#[must_use]
pub fn current_correlation_id() -> Option<String> {
    CORRELATION_ID.with(|cell| cell.borrow().clone())
}

fn replace_correlation_id(id: Option<String>) -> Option<String> {
    CORRELATION_ID.with(|cell| std::mem::replace(&mut *cell.borrow_mut(), id))
}

/// RAII guard that sets a correlation ID and restores the previous one on drop.
///
/// Nested guards restore correctly, so an operation started inside a caller's
/// request scope keeps the caller's ID once it finishes.
pub struct CorrelationGuard {
    previous: Option<String>,
}

impl CorrelationGuard {
    /// Scope with a fresh UUID v4.
    #[must_use]
    pub fn new() -> Self {
        Self::with_id(generate_correlation_id())
    }

    /// Scope with a specific ID.
    #[must_use]
    pub fn with_id(id: impl Into<String>) -> Self {
        Self { previous: replace_correlation_id(Some(id.into())) }
    }

    /// Reuse the caller's correlation ID if one is set, otherwise start a new one.
    #[must_use]
    pub fn inherit_or_new() -> Self {
        match current_correlation_id() {
            Some(id) => Self::with_id(id),
            None => Self::new(),
        }
    }

    /// The correlation ID active while this guard lives.
    #[must_use]
    pub fn id(&self) -> Option<String> {
        current_correlation_id()
    }
}

impl Default for CorrelationGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for CorrelationGuard {
    fn drop(&mut self) {
        replace_correlation_id(self.previous.take());
    }
}

// ============================================================================
// Subscriber initialization
// ============================================================================

/// Initialize compact human-readable logging.
///
/// Filtering follows `RUST_LOG`, defaulting to [`DEFAULT_LOG_FILTER`].
///
/// # Errors
///
/// Returns an error if a global subscriber is already set.
pub fn init_tracing() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_thread_names(false)
                .compact(),
        )
        .try_init()?;

    info!("QSDV logging initialized");
    Ok(())
}

/// Initialize JSON logging for log shippers.
///
/// # Errors
///
/// Returns an error if a global subscriber is already set.
pub fn init_tracing_json() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().json().with_current_span(true).with_target(true))
        .try_init()?;

    info!("QSDV JSON logging initialized");
    Ok(())
}

// ============================================================================
// Sanitization
// ============================================================================

/// Render bytes for logs without revealing them.
///
/// ```rust
/// use qsdv_core::logging::sanitize_data;
///
/// assert_eq!(sanitize_data(&[1, 2, 3]).to_string(), "[3 bytes]");
/// assert!(sanitize_data(&[0u8; 64]).to_string().starts_with("[64 bytes, blake2s:"));
/// ```
#[must_use]
pub fn sanitize_data(data: &[u8]) -> SanitizedData<'_> {
    SanitizedData(data)
}

/// Wrapper type for sanitized data display
pub struct SanitizedData<'a>(&'a [u8]);

impl fmt::Display for SanitizedData<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Fingerprint only buffers longer than a key
        if self.0.len() <= 32 {
            write!(f, "[{} bytes]", self.0.len())
        } else {
            let hash = blake2_hash(self.0);
            write!(f, "[{} bytes, blake2s: {}]", self.0.len(), hash.get(..16).unwrap_or(hash.as_str()))
        }
    }
}

impl fmt::Debug for SanitizedData<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Hex BLAKE2s-256 digest used as a content fingerprint.
#[must_use]
pub fn blake2_hash(data: &[u8]) -> String {
    use blake2::{Blake2s256, Digest};
    let mut hasher = Blake2s256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

// ============================================================================
// Key Lifecycle Audit Logging Macros
// ============================================================================

/// Log a key generation event at INFO.
///
/// ```rust,ignore
/// log_key_generated!("kem_v1_20260101_000000_1a2b3c4d", "ML-KEM-768", KeyFamily::Kem);
/// ```
#[macro_export]
macro_rules! log_key_generated {
    ($version:expr, $algorithm:expr, $family:expr) => {
        tracing::info!(
            target: "key_lifecycle::generated",
            key_version = %$version,
            algorithm = %$algorithm,
            family = %$family,
            "Key generated"
        );
    };
}

/// Log a key rotation event at WARN.
///
/// `$old_version` is an `Option`; the first key of a family has no predecessor.
#[macro_export]
macro_rules! log_key_rotated {
    ($old_version:expr, $new_version:expr, $algorithm:expr, $reason:expr) => {
        tracing::warn!(
            target: "key_lifecycle::rotated",
            old_key_version = ?$old_version,
            new_key_version = %$new_version,
            algorithm = %$algorithm,
            reason = %$reason,
            "Key rotated"
        );
    };
}

/// Log a key purge at WARN. The private key is zeroized once the last handle drops.
#[macro_export]
macro_rules! log_key_purged {
    ($version:expr, $algorithm:expr) => {
        tracing::warn!(
            target: "key_lifecycle::purged",
            key_version = %$version,
            algorithm = %$algorithm,
            "Key purged"
        );
    };
}

/// Log a cryptographic operation at DEBUG with the current correlation ID.
///
/// ```rust,ignore
/// log_crypto_operation!("encrypt", key_version = %version, duration_ms = 3u64);
/// ```
#[macro_export]
macro_rules! log_crypto_operation {
    ($op:expr, $($field:tt)*) => {
        tracing::debug!(
            target: "crypto::operation",
            correlation_id = ?$crate::logging::current_correlation_id(),
            operation = $op,
            $($field)*
        );
    };
    ($op:expr) => {
        tracing::debug!(
            target: "crypto::operation",
            correlation_id = ?$crate::logging::current_correlation_id(),
            operation = $op,
        );
    };
}

/// Log security event (always logged at ERROR, never filtered by level)
#[macro_export]
macro_rules! log_security_event {
    ($event:expr) => {
        tracing::event!(
            target: "security",
            tracing::Level::ERROR,
            security_event = true,
            correlation_id = ?$crate::logging::current_correlation_id(),
            "{}",
            $event
        );
    };
    ($event:expr, $($field:tt)*) => {
        tracing::event!(
            target: "security",
            tracing::Level::ERROR,
            security_event = true,
            correlation_id = ?$crate::logging::current_correlation_id(),
            $($field)*,
            "{}",
            $event
        );
    };
}
