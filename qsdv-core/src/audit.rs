//! # Audit Hook
//!
//! Every key-lifecycle and envelope operation produces one [`AuditEvent`]
//! handed to an [`AuditSink`]. The core persists nothing itself: storage,
//! retention and shipping belong to the sink.
//!
//! Shipped sinks:
//!
//! - [`TracingAuditSink`] (default): emits each event on the `audit` tracing target
//! - [`MemoryAuditSink`]: bounded in-memory ring buffer for dashboards and tests
//! - [`NoopAuditSink`]: discards events
//!
//! ## Usage
//!
//! ```rust
//! use qsdv_core::audit::{AuditEvent, AuditOperation, AuditOutcome, AuditSink, MemoryAuditSink};
//!
//! let sink = MemoryAuditSink::new(16);
//! sink.record(
//!     &AuditEvent::builder(AuditOperation::Encrypt, AuditOutcome::Success)
//!         .key_version("kem_v1_20260101_000000_1a2b3c4d")
//!         .duration_ms(4)
//!         .build(),
//! );
//! assert_eq!(sink.len(), 1);
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

use crate::error::{CoreError, ErrorKind};

/// Audited operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOperation {
    /// Envelope encryption.
    Encrypt,
    /// Envelope decryption.
    Decrypt,
    /// Key pair generation (first use or after expiry).
    KeyGenerate,
    /// Explicit key rotation.
    KeyRotate,
    /// Removal of a retained key.
    KeyPurge,
    /// Export of key records, private keys included, for persistence.
    KeyExport,
    /// Load of persisted key records.
    KeyRestore,
    /// Encrypt-then-decrypt diagnostic round trip.
    SelfTest,
}

impl fmt::Display for AuditOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Encrypt => write!(f, "encrypt"),
            Self::Decrypt => write!(f, "decrypt"),
            Self::KeyGenerate => write!(f, "key_generate"),
            Self::KeyRotate => write!(f, "key_rotate"),
            Self::KeyPurge => write!(f, "key_purge"),
            Self::KeyExport => write!(f, "key_export"),
            Self::KeyRestore => write!(f, "key_restore"),
            Self::SelfTest => write!(f, "self_test"),
        }
    }
}

/// Outcome of an audited action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    /// Operation completed successfully.
    Success,
    /// Operation failed due to an error.
    Failure,
}

impl fmt::Display for AuditOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Failure => write!(f, "failure"),
        }
    }
}

/// One audited operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique identifier for this event (UUID v4).
    pub id: String,
    /// Timestamp when the operation finished.
    pub timestamp: DateTime<Utc>,
    /// Operation performed.
    pub operation: AuditOperation,
    /// Primary key version involved (the KEM key for envelope operations).
    pub key_version: Option<String>,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
    /// Outcome of the operation.
    pub outcome: AuditOutcome,
    /// Error discriminant when the outcome is a failure.
    pub error_kind: Option<ErrorKind>,
    /// Correlation ID active when the event was recorded.
    pub correlation_id: Option<String>,
    /// Additional key-value metadata (signature key version, sizes, algorithms).
    pub metadata: BTreeMap<String, String>,
}

impl AuditEvent {
    /// Start building an event.
    #[must_use]
    pub fn builder(operation: AuditOperation, outcome: AuditOutcome) -> AuditEventBuilder {
        AuditEventBuilder::new(operation, outcome)
    }

    /// Whether the operation succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.outcome == AuditOutcome::Success
    }
}

/// Builder for [`AuditEvent`].
pub struct AuditEventBuilder {
    event: AuditEvent,
}

impl AuditEventBuilder {
    /// Create a builder stamped with the current time and correlation ID.
    #[must_use]
    pub fn new(operation: AuditOperation, outcome: AuditOutcome) -> Self {
        Self {
            event: AuditEvent {
                id: Uuid::new_v4().to_string(),
                timestamp: Utc::now(),
                operation,
                key_version: None,
                duration_ms: 0,
                outcome,
                error_kind: None,
                correlation_id: crate::logging::current_correlation_id(),
                metadata: BTreeMap::new(),
            },
        }
    }

    /// Set the key version.
    #[must_use]
    pub fn key_version(mut self, version: impl Into<String>) -> Self {
        self.event.key_version = Some(version.into());
        self
    }

    /// Set the key version if one is known.
    #[must_use]
    pub fn maybe_key_version(mut self, version: Option<impl Into<String>>) -> Self {
        self.event.key_version = version.map(Into::into);
        self
    }

    /// Set the duration in milliseconds.
    #[must_use]
    pub fn duration_ms(mut self, duration_ms: u64) -> Self {
        self.event.duration_ms = duration_ms;
        self
    }

    /// Set the duration from a [`Duration`], saturating at `u64::MAX` ms.
    #[must_use]
    pub fn duration(self, duration: Duration) -> Self {
        let ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        self.duration_ms(ms)
    }

    /// Record the failing error's kind and mark the outcome as a failure.
    #[must_use]
    pub fn error(mut self, error: &CoreError) -> Self {
        self.event.outcome = AuditOutcome::Failure;
        self.event.error_kind = Some(error.kind());
        self
    }

    /// Add metadata.
    #[must_use]
    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.event.metadata.insert(key.into(), value.into());
        self
    }

    /// Build the event.
    #[must_use]
    pub fn build(self) -> AuditEvent {
        self.event
    }
}

/// Receiver of audit events.
///
/// Implementations own all storage. `record` is called on the thread that
/// performed the operation, after the operation finished, and must not block
/// for long.
pub trait AuditSink: Send + Sync {
    /// Record one event.
    fn record(&self, event: &AuditEvent);
}

/// Emits each event as a structured `tracing` event on the `audit` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, event: &AuditEvent) {
        let error_kind = event.error_kind.map(|k| k.as_str());
        match event.outcome {
            AuditOutcome::Success => tracing::info!(
                target: "audit",
                event_id = %event.id,
                operation = %event.operation,
                key_version = ?event.key_version,
                duration_ms = event.duration_ms,
                outcome = %event.outcome,
                correlation_id = ?event.correlation_id,
                metadata = ?event.metadata,
                "audit"
            ),
            AuditOutcome::Failure => tracing::warn!(
                target: "audit",
                event_id = %event.id,
                operation = %event.operation,
                key_version = ?event.key_version,
                duration_ms = event.duration_ms,
                outcome = %event.outcome,
                error_kind = ?error_kind,
                correlation_id = ?event.correlation_id,
                metadata = ?event.metadata,
                "audit"
            ),
        }
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn record(&self, _event: &AuditEvent) {}
}

/// Bounded in-memory buffer keeping the most recent events.
#[derive(Debug)]
pub struct MemoryAuditSink {
    capacity: usize,
    events: Mutex<VecDeque<AuditEvent>>,
}

impl MemoryAuditSink {
    /// Create a buffer holding at most `capacity` events (minimum 1).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { capacity, events: Mutex::new(VecDeque::with_capacity(capacity.min(1024))) }
    }

    /// Snapshot of the buffered events, oldest first.
    #[must_use]
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().iter().cloned().collect()
    }

    /// Buffered events for one operation, oldest first.
    #[must_use]
    pub fn events_for(&self, operation: AuditOperation) -> Vec<AuditEvent> {
        self.events.lock().iter().filter(|e| e.operation == operation).cloned().collect()
    }

    /// Number of buffered events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Whether the buffer is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Drop all buffered events.
    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, event: &AuditEvent) {
        let mut events = self.events.lock();
        if events.len() >= self.capacity {
            events.pop_front();
        }
        events.push_back(event.clone());
    }
}
