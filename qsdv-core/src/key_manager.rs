#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]

//! # Key Manager
//!
//! Generates, versions, caches, expires and retrieves KEM and signature key
//! pairs. Each [`KeyFamily`] has at most one current key.
//!
//! ## Concurrency
//!
//! - The key store is a `parking_lot::RwLock`; keys are published as complete
//!   `Arc<KeyPair>` values under the write lock, so readers never see a
//!   partially built key.
//! - Each family has a generation slot (`Mutex` + `Condvar`). At most one
//!   generation per family is in flight; concurrent callers wait for it and
//!   reuse its result, including its error.
//! - A failed generation is not cached: the next call starts a new one.
//! - Callers holding an existing current key never touch the slot.
//!
//! ## Persistence
//!
//! Keys live in memory. [`KeyManager::export_keys`] hands every retained key,
//! private key included, to an external key store as [`StoredKey`] records;
//! [`KeyManager::restore`] loads them into a fresh manager after a restart so
//! stored envelopes keep decrypting.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use qsdv_core::{KeyManager, KeyManagerConfig};
//! use qsdv_primitives::{DefaultProvider, KeyFamily};
//! use std::sync::Arc;
//!
//! let manager = KeyManager::new(Arc::new(DefaultProvider::new()), KeyManagerConfig::default())?;
//! let kem = manager.get_current(KeyFamily::Kem)?;
//! let same = manager.get_by_version(kem.version())?;
//! assert_eq!(kem.version(), same.version());
//! # Ok::<(), qsdv_core::CoreError>(())
//! ```

use chrono::{DateTime, Utc};
use parking_lot::{Condvar, Mutex, RwLock};
use qsdv_primitives::{Algorithm, CryptoProvider, KemAlgorithm, KeyFamily, SecretBytes, SignatureAlgorithm};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::audit::{AuditEvent, AuditOperation, AuditOutcome, AuditSink, TracingAuditSink};
use crate::config::KeyManagerConfig;
use crate::error::{CoreError, Result};
use crate::logging::RotationReason;
use crate::types::{KeyPair, KeyRecord, PublicKeyInfo, StoredKey};

/// Shared handle to the key manager. Cloning is cheap and shares all state.
#[derive(Clone)]
pub struct KeyManager {
    inner: Arc<Inner>,
}

struct Inner {
    provider: Arc<dyn CryptoProvider>,
    config: KeyManagerConfig,
    audit: Arc<dyn AuditSink>,
    store: RwLock<KeyStore>,
    kem_slot: GenerationSlot,
    sig_slot: GenerationSlot,
}

#[derive(Default)]
struct KeyStore {
    keys: HashMap<String, Arc<KeyPair>>,
    current: HashMap<KeyFamily, String>,
}

impl KeyStore {
    fn current(&self, family: KeyFamily) -> Option<&Arc<KeyPair>> {
        self.current.get(&family).and_then(|version| self.keys.get(version))
    }
}

/// Outcome of the most recent generation, shared with the callers that waited on it.
type GenerationOutcome = std::result::Result<Weak<KeyPair>, CoreError>;

#[derive(Default)]
struct GenerationSlot {
    state: Mutex<SlotState>,
    finished: Condvar,
    next_seq: AtomicU64,
}

#[derive(Default)]
struct SlotState {
    in_flight: bool,
    epoch: u64,
    last_outcome: Option<GenerationOutcome>,
}

/// What triggered a generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    /// The family had no current key.
    Initial,
    /// The current key was past its lifetime or no longer active.
    Expired,
    /// An explicit `rotate` call.
    Manual,
}

impl Trigger {
    fn rotation_reason(self) -> Option<RotationReason> {
        match self {
            Trigger::Initial => None,
            Trigger::Expired => Some(RotationReason::Expiration),
            Trigger::Manual => Some(RotationReason::Manual),
        }
    }
}

/// Serializable snapshot of the key manager for status collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyManagerStatus {
    /// KEM algorithm used for new keys
    pub kem_algorithm: KemAlgorithm,
    /// Signature algorithm used for new keys
    pub sig_algorithm: SignatureAlgorithm,
    /// Key lifetime in seconds; `None` when keys never expire
    pub key_lifetime_secs: Option<u64>,
    /// Version of the current KEM key
    pub current_kem_version: Option<String>,
    /// Version of the current signature key
    pub current_sig_version: Option<String>,
    /// Every retained key, oldest first
    pub keys: Vec<KeyRecord>,
}

impl KeyManager {
    /// Create a key manager reporting to the default [`TracingAuditSink`].
    ///
    /// # Errors
    /// Returns [`CoreError::ConfigurationError`] if `config` is invalid.
    pub fn new(provider: Arc<dyn CryptoProvider>, config: KeyManagerConfig) -> Result<Self> {
        Self::with_audit(provider, config, Arc::new(TracingAuditSink))
    }

    /// Create a key manager reporting to `audit`.
    ///
    /// # Errors
    /// Returns [`CoreError::ConfigurationError`] if `config` is invalid.
    pub fn with_audit(
        provider: Arc<dyn CryptoProvider>,
        config: KeyManagerConfig,
        audit: Arc<dyn AuditSink>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            inner: Arc::new(Inner {
                provider,
                config,
                audit,
                store: RwLock::new(KeyStore::default()),
                kem_slot: GenerationSlot::default(),
                sig_slot: GenerationSlot::default(),
            }),
        })
    }

    /// The provider this manager generates keys with.
    #[must_use]
    pub fn provider(&self) -> &Arc<dyn CryptoProvider> {
        &self.inner.provider
    }

    /// The audit sink this manager reports to.
    #[must_use]
    pub fn audit_sink(&self) -> &Arc<dyn AuditSink> {
        &self.inner.audit
    }

    /// The configuration this manager was built with.
    #[must_use]
    pub fn config(&self) -> &KeyManagerConfig {
        &self.inner.config
    }

    /// Return the current key of `family`, generating one if there is none or
    /// the current key expired.
    ///
    /// Blocks while another caller's generation for `family` is in flight and
    /// returns that generation's result.
    ///
    /// # Errors
    /// Returns the generation error if the generation this call started or
    /// waited on failed.
    pub fn get_current(&self, family: KeyFamily) -> Result<Arc<KeyPair>> {
        self.current_or_generate(family, None)
    }

    /// As [`get_current`](Self::get_current), but gives up after `timeout`.
    ///
    /// The generation itself runs on a background thread and is never
    /// cancelled: a later call observes its result.
    ///
    /// # Errors
    /// Returns [`CoreError::GenerationTimeout`] if no usable key is available
    /// within `timeout`, or the generation error.
    pub fn get_current_with_timeout(&self, family: KeyFamily, timeout: Duration) -> Result<Arc<KeyPair>> {
        self.current_or_generate(family, Some(timeout))
    }

    /// Public information about the current key of `family`.
    ///
    /// Read-only: never generates, returns `None` if there is no usable current key.
    #[must_use]
    pub fn get_current_public_info(&self, family: KeyFamily) -> Option<PublicKeyInfo> {
        self.inner.current_usable(family, Utc::now()).map(|key| key.public_info())
    }

    /// Version of the current key of `family`, whether or not it is still usable.
    #[must_use]
    pub fn current_version(&self, family: KeyFamily) -> Option<String> {
        self.inner.store.read().current.get(&family).cloned()
    }

    /// Any key ever generated by this manager and not purged, active or not.
    ///
    /// # Errors
    /// Returns [`CoreError::KeyNotFound`] if no key has this version.
    pub fn get_by_version(&self, version: &str) -> Result<Arc<KeyPair>> {
        self.inner
            .store
            .read()
            .keys
            .get(version)
            .cloned()
            .ok_or_else(|| CoreError::KeyNotFound { version: version.to_string() })
    }

    /// Force a new current key for `family`.
    ///
    /// The previous current key is marked inactive and retained for decryption
    /// and verification. Waits for an in-flight generation of the same family
    /// to finish first.
    ///
    /// # Errors
    /// Returns the generation error; the previous current key stays current.
    #[instrument(level = "debug", skip(self), fields(family = %family))]
    pub fn rotate(&self, family: KeyFamily) -> Result<Arc<KeyPair>> {
        let slot = self.inner.slot(family);
        let mut state = slot.state.lock();
        while state.in_flight {
            slot.finished.wait(&mut state);
        }
        state.in_flight = true;
        drop(state);

        self.inner.run_generation(family, Trigger::Manual)
    }

    /// Remove a retained, non-current key. Its private key is zeroized once the
    /// last outstanding handle drops.
    ///
    /// # Errors
    /// Returns [`CoreError::KeyInUse`] for the current key of its family and
    /// [`CoreError::KeyNotFound`] for an unknown version.
    #[instrument(level = "debug", skip(self))]
    pub fn purge(&self, version: &str) -> Result<()> {
        let started = Instant::now();
        let result = {
            let mut store = self.inner.store.write();
            let in_use = store.current.values().any(|current| current == version);
            if in_use {
                Err(CoreError::KeyInUse { version: version.to_string() })
            } else {
                store
                    .keys
                    .remove(version)
                    .ok_or_else(|| CoreError::KeyNotFound { version: version.to_string() })
            }
        };

        let builder = AuditEvent::builder(AuditOperation::KeyPurge, AuditOutcome::Success)
            .key_version(version)
            .duration(started.elapsed());
        match result {
            Ok(key) => {
                crate::log_key_purged!(version, key.algorithm());
                self.inner.audit.record(&builder.metadata("algorithm", key.algorithm().name()).build());
                Ok(())
            }
            Err(err) => {
                self.inner.audit.record(&builder.error(&err).build());
                Err(err)
            }
        }
    }

    /// Copy every retained key, private keys included, oldest first.
    ///
    /// The records are as sensitive as the keys; persist them encrypted.
    #[must_use]
    pub fn export_keys(&self) -> Vec<StoredKey> {
        let started = Instant::now();
        let mut records: Vec<StoredKey> =
            self.inner.store.read().keys.values().map(|key| key.to_stored()).collect();
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.version.cmp(&b.version)));

        info!(count = records.len(), "Exported key records");
        self.inner.audit.record(
            &AuditEvent::builder(AuditOperation::KeyExport, AuditOutcome::Success)
                .duration(started.elapsed())
                .metadata("count", records.len().to_string())
                .build(),
        );
        records
    }

    /// Load persisted keys into a manager that holds none yet.
    ///
    /// Every record is checked before any is installed. The newest active
    /// record of each family becomes its current key and older active records
    /// of that family are retired. Version numbers continue after the highest
    /// restored sequence number. A restored current key that has expired is
    /// replaced by the next [`get_current`](Self::get_current).
    ///
    /// Returns the number of keys restored.
    ///
    /// # Errors
    /// - [`CoreError::ConfigurationError`] if this manager already holds keys
    ///   or a generation is in flight
    /// - [`CoreError::SerializationError`] for a duplicate version or key
    ///   sizes that do not match the record's algorithm
    #[instrument(level = "debug", skip(self, records), fields(count = records.len()))]
    pub fn restore(&self, records: Vec<StoredKey>) -> Result<usize> {
        let started = Instant::now();
        let result = self.inner.restore(records);

        let builder =
            AuditEvent::builder(AuditOperation::KeyRestore, AuditOutcome::Success).duration(started.elapsed());
        match &result {
            Ok(count) => {
                info!(count, "Restored key records");
                self.inner.audit.record(&builder.metadata("count", count.to_string()).build());
            }
            Err(err) => {
                warn!(error = %err, "Key restore failed");
                self.inner.audit.record(&builder.error(err).build());
            }
        }
        result
    }

    /// Decapsulate `encapsulated_key` with the private half of a KEM `key`.
    ///
    /// # Errors
    /// Returns [`CoreError::AlgorithmMismatch`] if `key` is not a KEM key, or
    /// the primitive error.
    pub fn decapsulate(&self, key: &KeyPair, encapsulated_key: &[u8]) -> Result<SecretBytes> {
        let algorithm = key.kem_algorithm().ok_or_else(|| family_mismatch(key, KeyFamily::Kem))?;
        let shared_secret = self.inner.provider.decapsulate(algorithm, encapsulated_key, key.private_key())?;
        key.record_use();
        Ok(shared_secret)
    }

    /// Sign `message` with the private half of a signature `key`.
    ///
    /// # Errors
    /// Returns [`CoreError::AlgorithmMismatch`] if `key` is not a signature
    /// key, or the primitive error.
    pub fn sign(&self, key: &KeyPair, message: &[u8]) -> Result<Vec<u8>> {
        let algorithm =
            key.signature_algorithm().ok_or_else(|| family_mismatch(key, KeyFamily::Signature))?;
        let signature = self.inner.provider.sign(algorithm, message, key.private_key())?;
        key.record_use();
        Ok(signature)
    }

    /// Verify `signature` over `message` with the public half of `key`.
    ///
    /// # Errors
    /// Returns [`CoreError::AlgorithmMismatch`] if `key` is not a signature
    /// key, or the primitive error for a malformed public key.
    pub fn verify(&self, key: &KeyPair, message: &[u8], signature: &[u8]) -> Result<bool> {
        let algorithm =
            key.signature_algorithm().ok_or_else(|| family_mismatch(key, KeyFamily::Signature))?;
        Ok(self.inner.provider.verify(algorithm, message, signature, key.public_key())?)
    }

    /// Snapshot of configuration, current versions and every retained key.
    #[must_use]
    pub fn status(&self) -> KeyManagerStatus {
        let now = Utc::now();
        let store = self.inner.store.read();
        let mut keys: Vec<KeyRecord> = store
            .keys
            .values()
            .map(|key| KeyRecord {
                info: key.public_info(),
                state: key.state_at(now),
                usage_count: key.usage_count(),
                last_used: key.last_used(),
            })
            .collect();
        keys.sort_by(|a, b| {
            a.info.created_at.cmp(&b.info.created_at).then_with(|| a.info.version.cmp(&b.info.version))
        });

        KeyManagerStatus {
            kem_algorithm: self.inner.config.kem_algorithm,
            sig_algorithm: self.inner.config.sig_algorithm,
            key_lifetime_secs: self.inner.config.key_lifetime.map(|d| d.as_secs()),
            current_kem_version: store.current.get(&KeyFamily::Kem).cloned(),
            current_sig_version: store.current.get(&KeyFamily::Signature).cloned(),
            keys,
        }
    }

    fn current_or_generate(&self, family: KeyFamily, timeout: Option<Duration>) -> Result<Arc<KeyPair>> {
        let deadline = timeout.map(|t| Instant::now() + t);
        loop {
            if let Some(key) = self.inner.current_usable(family, Utc::now()) {
                return Ok(key);
            }

            let slot = self.inner.slot(family);
            let mut state = slot.state.lock();

            if !state.in_flight {
                // A generation may have finished between the lookup above and taking the slot.
                if let Some(key) = self.inner.current_usable(family, Utc::now()) {
                    return Ok(key);
                }
                state.in_flight = true;
                drop(state);

                let trigger = self.inner.trigger_for(family);
                match timeout {
                    None => return self.inner.run_generation(family, trigger),
                    Some(_) => {
                        self.spawn_generation(family, trigger);
                        state = slot.state.lock();
                    }
                }
            }

            let observed = state.epoch;
            while state.in_flight && state.epoch == observed {
                match deadline {
                    None => slot.finished.wait(&mut state),
                    Some(deadline) => {
                        if slot.finished.wait_until(&mut state, deadline).timed_out()
                            && state.in_flight
                            && state.epoch == observed
                        {
                            let timeout_ms = timeout
                                .map(|t| u64::try_from(t.as_millis()).unwrap_or(u64::MAX))
                                .unwrap_or_default();
                            warn!(family = %family, timeout_ms, "Timed out waiting for key generation");
                            return Err(CoreError::GenerationTimeout { family, timeout_ms });
                        }
                    }
                }
            }

            match state.last_outcome.clone() {
                Some(Ok(key)) => {
                    if let Some(key) = key.upgrade() {
                        return Ok(key);
                    }
                    // Purged before we woke up; look again.
                }
                Some(Err(err)) => return Err(err),
                None => {}
            }
        }
    }

    fn spawn_generation(&self, family: KeyFamily, trigger: Trigger) {
        let inner = Arc::clone(&self.inner);
        let spawned = std::thread::Builder::new()
            .name(format!("qsdv-keygen-{}", family.tag()))
            .spawn(move || {
                // The outcome is published through the slot.
                let _ = inner.run_generation(family, trigger);
            });
        if let Err(err) = spawned {
            warn!(family = %family, error = %err, "Could not spawn key generation thread; generating inline");
            let _ = self.inner.run_generation(family, trigger);
        }
    }
}

impl Inner {
    fn slot(&self, family: KeyFamily) -> &GenerationSlot {
        match family {
            KeyFamily::Kem => &self.kem_slot,
            KeyFamily::Signature => &self.sig_slot,
        }
    }

    fn current_usable(&self, family: KeyFamily, now: DateTime<Utc>) -> Option<Arc<KeyPair>> {
        self.store.read().current(family).filter(|key| key.is_usable_at(now)).cloned()
    }

    fn trigger_for(&self, family: KeyFamily) -> Trigger {
        if self.store.read().current(family).is_some() { Trigger::Expired } else { Trigger::Initial }
    }

    fn algorithm_for(&self, family: KeyFamily) -> Algorithm {
        match family {
            KeyFamily::Kem => self.config.kem_algorithm.into(),
            KeyFamily::Signature => self.config.sig_algorithm.into(),
        }
    }

    /// Generate and install a key, then release the slot (which the caller
    /// must have marked in flight) and wake every waiter.
    fn run_generation(&self, family: KeyFamily, trigger: Trigger) -> Result<Arc<KeyPair>> {
        let started = Instant::now();
        let result = self.generate_and_install(family, trigger);
        let elapsed = started.elapsed();

        let operation =
            if trigger == Trigger::Manual { AuditOperation::KeyRotate } else { AuditOperation::KeyGenerate };
        let builder = AuditEvent::builder(operation, AuditOutcome::Success)
            .duration(elapsed)
            .metadata("family", family.tag())
            .metadata("algorithm", self.algorithm_for(family).name());
        match &result {
            Ok((key, previous)) => {
                let mut builder = builder.key_version(key.version());
                if let Some(reason) = trigger.rotation_reason() {
                    builder = builder.metadata("reason", reason.to_string());
                }
                if let Some(previous) = previous {
                    builder = builder.metadata("previous_version", previous.as_str());
                }
                self.audit.record(&builder.build());
            }
            Err(err) => {
                warn!(family = %family, error = %err, "Key generation failed");
                self.audit.record(&builder.error(err).build());
            }
        }

        let result = result.map(|(key, _)| key);
        let slot = self.slot(family);
        let mut state = slot.state.lock();
        state.in_flight = false;
        state.epoch = state.epoch.wrapping_add(1);
        state.last_outcome = Some(result.as_ref().map(Arc::downgrade).map_err(Clone::clone));
        drop(state);
        slot.finished.notify_all();

        result
    }

    fn restore(&self, records: Vec<StoredKey>) -> Result<usize> {
        let mut keys: HashMap<String, Arc<KeyPair>> = HashMap::with_capacity(records.len());
        for record in records {
            check_stored(&record)?;
            if keys.contains_key(&record.version) {
                return Err(CoreError::SerializationError(format!(
                    "duplicate stored key version {}",
                    record.version
                )));
            }
            let key = Arc::new(KeyPair::from_stored(record));
            keys.insert(key.version().to_string(), key);
        }

        let mut current = HashMap::new();
        let mut sequences = Vec::new();
        for family in [KeyFamily::Kem, KeyFamily::Signature] {
            let newest = keys
                .values()
                .filter(|key| key.family() == family && key.is_active())
                .max_by(|a, b| a.created_at().cmp(&b.created_at()).then_with(|| a.version().cmp(b.version())))
                .map(|key| key.version().to_string());
            for key in keys.values().filter(|key| key.family() == family) {
                if newest.as_deref() != Some(key.version()) {
                    key.deactivate();
                }
            }
            if let Some(version) = newest {
                current.insert(family, version);
            }
            let highest = keys
                .values()
                .filter(|key| key.family() == family)
                .filter_map(|key| version_seq(family, key.version()))
                .max();
            sequences.push((family, highest.unwrap_or(0)));
        }

        // Both slots stay locked so no generation can start while the store fills.
        let kem_state = self.kem_slot.state.lock();
        let sig_state = self.sig_slot.state.lock();
        if kem_state.in_flight || sig_state.in_flight {
            return Err(CoreError::ConfigurationError(
                "Keys cannot be restored while a key generation is in flight".to_string(),
            ));
        }
        let mut store = self.store.write();
        if !store.keys.is_empty() {
            return Err(CoreError::ConfigurationError(
                "Keys can only be restored into an empty key manager".to_string(),
            ));
        }
        for (family, seq) in sequences {
            self.slot(family).next_seq.fetch_max(seq, Ordering::Relaxed);
        }
        let count = keys.len();
        store.keys = keys;
        store.current = current;
        Ok(count)
    }

    fn generate_and_install(
        &self,
        family: KeyFamily,
        trigger: Trigger,
    ) -> Result<(Arc<KeyPair>, Option<String>)> {
        let algorithm = self.algorithm_for(family);
        let generated = self.provider.generate_keypair(algorithm)?;

        let created_at = Utc::now();
        let expires_at = match self.config.key_lifetime {
            Some(lifetime) => {
                let lifetime = chrono::Duration::from_std(lifetime)
                    .map_err(|e| CoreError::ConfigurationError(format!("key lifetime out of range: {}", e)))?;
                Some(created_at.checked_add_signed(lifetime).ok_or_else(|| {
                    CoreError::ConfigurationError("key lifetime overflows the calendar".to_string())
                })?)
            }
            None => None,
        };

        let seq = self.slot(family).next_seq.fetch_add(1, Ordering::Relaxed) + 1;
        let version = format_version(family, seq, created_at);
        let key = Arc::new(KeyPair::new(
            version,
            generated.algorithm,
            generated.public_key,
            generated.secret_key,
            created_at,
            expires_at,
        ));

        let previous = {
            let mut store = self.store.write();
            store.keys.insert(key.version().to_string(), Arc::clone(&key));
            let previous = store.current.insert(family, key.version().to_string());
            if let Some(old) = previous.as_ref().and_then(|v| store.keys.get(v)) {
                old.deactivate();
            }
            previous
        };

        crate::log_key_generated!(key.version(), key.algorithm(), family);
        if let Some(reason) = trigger.rotation_reason() {
            crate::log_key_rotated!(previous.as_deref(), key.version(), key.algorithm(), reason);
        }
        debug!(key_version = %key.version(), expires_at = ?expires_at, "Installed current key");

        Ok((key, previous))
    }
}

/// `<family>_v<seq>_<yyyyMMdd_HHmmss>_<8 hex chars>`
fn format_version(family: KeyFamily, seq: u64, created_at: DateTime<Utc>) -> String {
    let suffix = hex::encode(&Uuid::new_v4().as_bytes()[..4]);
    format!("{}_v{}_{}_{}", family.tag(), seq, created_at.format("%Y%m%d_%H%M%S"), suffix)
}

/// Sequence number of a version built by [`format_version`].
fn version_seq(family: KeyFamily, version: &str) -> Option<u64> {
    version.strip_prefix(family.tag())?.strip_prefix("_v")?.split('_').next()?.parse().ok()
}

fn check_stored(record: &StoredKey) -> Result<()> {
    let (public_len, private_len) = match record.algorithm {
        Algorithm::Kem(alg) => (alg.public_key_size(), alg.secret_key_size()),
        Algorithm::Signature(alg) => (alg.public_key_size(), alg.secret_key_size()),
    };
    if record.version.is_empty() {
        return Err(CoreError::SerializationError("stored key has no version".to_string()));
    }
    if record.public_key.len() != public_len || record.private_key.len() != private_len {
        return Err(CoreError::SerializationError(format!(
            "stored key {} does not have {} key sizes",
            record.version, record.algorithm
        )));
    }
    Ok(())
}

fn family_mismatch(key: &KeyPair, expected: KeyFamily) -> CoreError {
    CoreError::AlgorithmMismatch {
        version: key.version().to_string(),
        declared: expected.to_string(),
        actual: key.family().to_string(),
    }
}

impl std::fmt::Debug for KeyManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let store = self.inner.store.read();
        f.debug_struct("KeyManager")
            .field("config", &self.inner.config)
            .field("retained_keys", &store.keys.len())
            .field("current", &store.current)
            .finish()
    }
}
