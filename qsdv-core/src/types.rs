#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]

//! Key pair model shared by the key manager and envelope codec.
//!
//! A [`KeyPair`] is published once as an `Arc<KeyPair>` and never rebuilt; the
//! only mutable parts are the `active` flag and the advisory usage counters,
//! which are atomics so readers never need the key manager's lock.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use qsdv_primitives::{Algorithm, KemAlgorithm, KeyFamily, SecretBytes, SignatureAlgorithm};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crate::serialization::{base64_bytes, base64_secret};

/// Observable lifecycle state of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyState {
    /// Current and within its lifetime.
    Active,
    /// Superseded by rotation; still usable for decryption and verification.
    Retired,
    /// Past `expires_at`; still usable for decryption and verification.
    Expired,
}

impl fmt::Display for KeyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyState::Active => write!(f, "Active"),
            KeyState::Retired => write!(f, "Retired"),
            KeyState::Expired => write!(f, "Expired"),
        }
    }
}

/// A KEM or signature key pair owned by the key manager.
///
/// The private key never leaves this crate: it is only reachable through
/// `pub(crate)` accessors used by the key manager's decapsulate and sign
/// operations, and it is zeroized when the last `Arc<KeyPair>` drops.
pub struct KeyPair {
    version: String,
    algorithm: Algorithm,
    public_key: Vec<u8>,
    private_key: SecretBytes,
    created_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
    active: AtomicBool,
    usage_count: AtomicU64,
    last_used: Mutex<Option<DateTime<Utc>>>,
}

impl KeyPair {
    pub(crate) fn new(
        version: String,
        algorithm: Algorithm,
        public_key: Vec<u8>,
        private_key: SecretBytes,
        created_at: DateTime<Utc>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            version,
            algorithm,
            public_key,
            private_key,
            created_at,
            expires_at,
            active: AtomicBool::new(true),
            usage_count: AtomicU64::new(0),
            last_used: Mutex::new(None),
        }
    }

    /// Globally unique, immutable version identifier.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Algorithm of this key pair.
    #[must_use]
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Family of this key pair.
    #[must_use]
    pub fn family(&self) -> KeyFamily {
        self.algorithm.family()
    }

    /// KEM algorithm, if this is a KEM key.
    #[must_use]
    pub fn kem_algorithm(&self) -> Option<KemAlgorithm> {
        match self.algorithm {
            Algorithm::Kem(alg) => Some(alg),
            Algorithm::Signature(_) => None,
        }
    }

    /// Signature algorithm, if this is a signature key.
    #[must_use]
    pub fn signature_algorithm(&self) -> Option<SignatureAlgorithm> {
        match self.algorithm {
            Algorithm::Signature(alg) => Some(alg),
            Algorithm::Kem(_) => None,
        }
    }

    /// Public key bytes.
    #[must_use]
    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }

    pub(crate) fn private_key(&self) -> &[u8] {
        self.private_key.as_slice()
    }

    /// Creation time.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Expiry time; `None` means the key never expires.
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Whether the key is still flagged active (not superseded by rotation).
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Whether `now` is at or past the expiry time.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires| now >= expires)
    }

    /// Whether the key may be selected as current at `now`.
    #[must_use]
    pub fn is_usable_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active() && !self.is_expired_at(now)
    }

    /// Lifecycle state at `now`. Retirement takes precedence over expiry.
    #[must_use]
    pub fn state_at(&self, now: DateTime<Utc>) -> KeyState {
        if !self.is_active() {
            KeyState::Retired
        } else if self.is_expired_at(now) {
            KeyState::Expired
        } else {
            KeyState::Active
        }
    }

    /// Number of private-key operations performed with this key.
    #[must_use]
    pub fn usage_count(&self) -> u64 {
        self.usage_count.load(Ordering::Relaxed)
    }

    /// Time of the last private-key operation.
    #[must_use]
    pub fn last_used(&self) -> Option<DateTime<Utc>> {
        *self.last_used.lock()
    }

    pub(crate) fn deactivate(&self) -> bool {
        self.active.swap(false, Ordering::AcqRel)
    }

    pub(crate) fn record_use(&self) {
        self.usage_count.fetch_add(1, Ordering::Relaxed);
        *self.last_used.lock() = Some(Utc::now());
    }

    /// Full persistable copy of this key, private key included.
    pub(crate) fn to_stored(&self) -> StoredKey {
        StoredKey {
            version: self.version.clone(),
            algorithm: self.algorithm,
            public_key: self.public_key.clone(),
            private_key: SecretBytes::from_slice(self.private_key.as_slice()),
            created_at: self.created_at,
            expires_at: self.expires_at,
            active: self.is_active(),
            usage_count: self.usage_count(),
            last_used: self.last_used(),
        }
    }

    /// Rebuild a key from its persisted form. Sizes are checked by the caller.
    pub(crate) fn from_stored(stored: StoredKey) -> Self {
        let StoredKey {
            version,
            algorithm,
            public_key,
            private_key,
            created_at,
            expires_at,
            active,
            usage_count,
            last_used,
        } = stored;
        Self {
            version,
            algorithm,
            public_key,
            private_key,
            created_at,
            expires_at,
            active: AtomicBool::new(active),
            usage_count: AtomicU64::new(usage_count),
            last_used: Mutex::new(last_used),
        }
    }

    /// Read-only public view of this key.
    #[must_use]
    pub fn public_info(&self) -> PublicKeyInfo {
        PublicKeyInfo {
            version: self.version.clone(),
            family: self.family(),
            algorithm: self.algorithm,
            public_key: self.public_key.clone(),
            created_at: self.created_at,
            expires_at: self.expires_at,
        }
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("version", &self.version)
            .field("algorithm", &self.algorithm)
            .field("public_key_len", &self.public_key.len())
            .field("private_key", &"[REDACTED]")
            .field("created_at", &self.created_at)
            .field("expires_at", &self.expires_at)
            .field("active", &self.is_active())
            .field("usage_count", &self.usage_count())
            .finish()
    }
}

/// Public information about a key, safe to hand to dashboards and clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeyInfo {
    /// Key version
    pub version: String,
    /// Key family
    pub family: KeyFamily,
    /// Algorithm
    pub algorithm: Algorithm,
    /// Base64-encoded public key
    #[serde(with = "base64_bytes")]
    pub public_key: Vec<u8>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Expiry time
    pub expires_at: Option<DateTime<Utc>>,
}

/// Status of one retained key, as reported by `KeyManager::status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRecord {
    /// Public view of the key
    #[serde(flatten)]
    pub info: PublicKeyInfo,
    /// Lifecycle state at snapshot time
    pub state: KeyState,
    /// Number of private-key operations
    pub usage_count: u64,
    /// Last private-key operation
    pub last_used: Option<DateTime<Utc>>,
}

/// Persisted form of a key pair, private key included.
///
/// Produced by `KeyManager::export_keys` for an external key store and loaded
/// back with `KeyManager::restore`. The private key stays in a zeroizing
/// container and `Debug` redacts it; the serialized form is as sensitive as
/// the key itself and must be stored encrypted.
#[derive(PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredKey {
    /// Key version
    pub version: String,
    /// Algorithm
    pub algorithm: Algorithm,
    /// Base64-encoded public key
    #[serde(with = "base64_bytes")]
    pub public_key: Vec<u8>,
    /// Base64-encoded private key
    #[serde(with = "base64_secret")]
    pub private_key: SecretBytes,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Expiry time
    pub expires_at: Option<DateTime<Utc>>,
    /// Whether the key was the current key of its family
    pub active: bool,
    /// Number of private-key operations
    #[serde(default)]
    pub usage_count: u64,
    /// Last private-key operation
    #[serde(default)]
    pub last_used: Option<DateTime<Utc>>,
}

impl fmt::Debug for StoredKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredKey")
            .field("version", &self.version)
            .field("algorithm", &self.algorithm)
            .field("private_key", &"[REDACTED]")
            .field("created_at", &self.created_at)
            .field("expires_at", &self.expires_at)
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}
