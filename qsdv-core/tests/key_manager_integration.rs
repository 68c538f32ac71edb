//! Key manager behavior under concurrency, expiry and provider failure.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use qsdv_core::{AuditOperation, CoreError, FailureClass, KeyManager, KeyManagerConfig, KeyState, MemoryAuditSink};
use qsdv_primitives::{
    Algorithm, CryptoProvider, DefaultProvider, GeneratedKeyPair, KemAlgorithm, KeyFamily, PrimitiveError,
    SecretBytes, SignatureAlgorithm, SymmetricKey,
};
use std::ops::Range;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

/// Wraps the default provider: counts generations, delays each one and fails
/// those whose zero-based index falls in `failing`.
struct ScriptedProvider {
    inner: DefaultProvider,
    generations: AtomicUsize,
    delay: Duration,
    failing: Range<usize>,
}

impl ScriptedProvider {
    fn new(delay: Duration, failing: Range<usize>) -> Self {
        Self { inner: DefaultProvider::new(), generations: AtomicUsize::new(0), delay, failing }
    }

    fn generations(&self) -> usize {
        self.generations.load(Ordering::SeqCst)
    }
}

impl CryptoProvider for ScriptedProvider {
    fn generate_keypair(&self, algorithm: Algorithm) -> Result<GeneratedKeyPair, PrimitiveError> {
        let n = self.generations.fetch_add(1, Ordering::SeqCst);
        thread::sleep(self.delay);
        if self.failing.contains(&n) {
            return Err(PrimitiveError::KeyGeneration("scripted failure".to_string()));
        }
        self.inner.generate_keypair(algorithm)
    }

    fn encapsulate(&self, a: KemAlgorithm, pk: &[u8]) -> Result<(SecretBytes, Vec<u8>), PrimitiveError> {
        self.inner.encapsulate(a, pk)
    }

    fn decapsulate(&self, a: KemAlgorithm, ek: &[u8], sk: &[u8]) -> Result<SecretBytes, PrimitiveError> {
        self.inner.decapsulate(a, ek, sk)
    }

    fn sign(&self, a: SignatureAlgorithm, m: &[u8], sk: &[u8]) -> Result<Vec<u8>, PrimitiveError> {
        self.inner.sign(a, m, sk)
    }

    fn verify(&self, a: SignatureAlgorithm, m: &[u8], s: &[u8], pk: &[u8]) -> Result<bool, PrimitiveError> {
        self.inner.verify(a, m, s, pk)
    }

    fn aead_encrypt(&self, k: &SymmetricKey, pt: &[u8]) -> Result<(Vec<u8>, Vec<u8>), PrimitiveError> {
        self.inner.aead_encrypt(k, pt)
    }

    fn aead_decrypt(&self, k: &SymmetricKey, ct: &[u8], iv: &[u8]) -> Result<Vec<u8>, PrimitiveError> {
        self.inner.aead_decrypt(k, ct, iv)
    }
}

fn fast_config() -> KeyManagerConfig {
    KeyManagerConfig::default()
        .with_kem_algorithm(KemAlgorithm::MlKem512)
        .with_sig_algorithm(SignatureAlgorithm::MlDsa44)
}

// ============================================================================
// Exactly-once generation
// ============================================================================

#[test]
fn test_concurrent_get_current_generates_once() {
    let provider = Arc::new(ScriptedProvider::new(Duration::from_millis(100), 0..0));
    let km = KeyManager::new(provider.clone(), fast_config()).unwrap();
    let barrier = Arc::new(Barrier::new(16));

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let km = km.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                km.get_current(KeyFamily::Kem).unwrap().version().to_string()
            })
        })
        .collect();
    let versions: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(provider.generations(), 1);
    assert!(versions.iter().all(|v| v == &versions[0]));
    assert_eq!(km.status().keys.len(), 1);
}

#[test]
fn test_families_generate_in_parallel_without_blocking_each_other() {
    let provider = Arc::new(ScriptedProvider::new(Duration::from_millis(50), 0..0));
    let km = KeyManager::new(provider.clone(), fast_config()).unwrap();

    let kem = {
        let km = km.clone();
        thread::spawn(move || km.get_current(KeyFamily::Kem).unwrap())
    };
    let sig = km.get_current(KeyFamily::Signature).unwrap();
    let kem = kem.join().unwrap();

    assert_eq!(provider.generations(), 2);
    assert_eq!(kem.family(), KeyFamily::Kem);
    assert_eq!(sig.family(), KeyFamily::Signature);
}

// ============================================================================
// Generation failure
// ============================================================================

#[test]
fn test_generation_failure_reaches_waiters_and_is_not_cached() {
    let provider = Arc::new(ScriptedProvider::new(Duration::from_millis(100), 0..1));
    let km = KeyManager::new(provider.clone(), fast_config()).unwrap();
    let barrier = Arc::new(Barrier::new(4));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let km = km.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                km.get_current(KeyFamily::Kem)
            })
        })
        .collect();
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    // Callers that overlapped the failing generation all observe its error;
    // a straggler arriving after it may start the next, succeeding one.
    let failures = results.iter().filter(|r| matches!(r, Err(CoreError::PrimitiveFailure(_)))).count();
    assert!(failures >= 1);
    assert!(provider.generations() <= 2);

    let key = km.get_current(KeyFamily::Kem).unwrap();
    assert!(key.version().starts_with("kem_v1_"));
}

#[test]
fn test_failed_rotation_keeps_previous_current() {
    let provider = Arc::new(ScriptedProvider::new(Duration::ZERO, 1..usize::MAX));
    let km = KeyManager::new(provider, fast_config()).unwrap();
    let current = km.get_current(KeyFamily::Signature).unwrap();

    assert!(matches!(km.rotate(KeyFamily::Signature), Err(CoreError::PrimitiveFailure(_))));
    assert!(current.is_active());
    assert_eq!(km.get_current(KeyFamily::Signature).unwrap().version(), current.version());
    assert_eq!(km.status().keys.len(), 1);
}

// ============================================================================
// Timeouts
// ============================================================================

#[test]
fn test_timeout_leaves_generation_running() {
    let provider = Arc::new(ScriptedProvider::new(Duration::from_millis(400), 0..0));
    let km = KeyManager::new(provider.clone(), fast_config()).unwrap();

    let err = km.get_current_with_timeout(KeyFamily::Kem, Duration::from_millis(20)).unwrap_err();
    assert_eq!(err, CoreError::GenerationTimeout { family: KeyFamily::Kem, timeout_ms: 20 });
    assert_eq!(err.failure_class(), FailureClass::Transient);

    // The background generation completes and is reused, not repeated.
    let key = km.get_current_with_timeout(KeyFamily::Kem, Duration::from_secs(30)).unwrap();
    assert_eq!(provider.generations(), 1);
    assert_eq!(km.get_current_public_info(KeyFamily::Kem).unwrap().version, key.version());
}

#[test]
fn test_timeout_not_hit_when_key_exists() {
    let provider = Arc::new(ScriptedProvider::new(Duration::from_millis(50), 0..0));
    let km = KeyManager::new(provider.clone(), fast_config()).unwrap();
    let key = km.get_current(KeyFamily::Kem).unwrap();
    let again = km.get_current_with_timeout(KeyFamily::Kem, Duration::from_nanos(1)).unwrap();
    assert_eq!(key.version(), again.version());
    assert_eq!(provider.generations(), 1);
}

// ============================================================================
// Expiry
// ============================================================================

#[test]
fn test_expired_key_is_rotated_transparently() {
    let sink = Arc::new(MemoryAuditSink::new(16));
    let config = fast_config().with_key_lifetime(Some(Duration::from_millis(200)));
    let km = KeyManager::with_audit(Arc::new(DefaultProvider::new()), config, sink.clone()).unwrap();

    let first = km.get_current(KeyFamily::Kem).unwrap();
    thread::sleep(Duration::from_millis(300));
    assert!(km.get_current_public_info(KeyFamily::Kem).is_none());

    let second = km.get_current(KeyFamily::Kem).unwrap();
    assert_ne!(first.version(), second.version());
    assert!(!first.is_active());

    // The expired key stays retrievable for decryption.
    let retained = km.get_by_version(first.version()).unwrap();
    assert_eq!(retained.public_key(), first.public_key());
    let states: Vec<_> = km.status().keys.iter().map(|k| k.state).collect();
    assert_eq!(states, vec![KeyState::Retired, KeyState::Active]);

    let generations = sink.events_for(AuditOperation::KeyGenerate);
    assert_eq!(generations.len(), 2);
    assert_eq!(generations[1].metadata.get("reason").map(String::as_str), Some("Expiration"));
}

#[test]
fn test_keys_without_lifetime_never_expire() {
    let km = KeyManager::new(Arc::new(DefaultProvider::new()), fast_config().with_key_lifetime(None)).unwrap();
    let key = km.get_current(KeyFamily::Signature).unwrap();
    assert!(key.expires_at().is_none());
    assert!(km.status().key_lifetime_secs.is_none());
}

// ============================================================================
// Rotation under load
// ============================================================================

#[test]
fn test_rotation_during_reads_keeps_single_current() {
    let km = KeyManager::new(Arc::new(DefaultProvider::new()), fast_config()).unwrap();
    km.get_current(KeyFamily::Kem).unwrap();

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let km = km.clone();
            thread::spawn(move || {
                for _ in 0..50 {
                    let key = km.get_current(KeyFamily::Kem).unwrap();
                    assert!(km.get_by_version(key.version()).is_ok());
                }
            })
        })
        .collect();
    for _ in 0..3 {
        km.rotate(KeyFamily::Kem).unwrap();
    }
    for r in readers {
        r.join().unwrap();
    }

    let status = km.status();
    assert_eq!(status.keys.len(), 4);
    let active = status.keys.iter().filter(|k| k.state == KeyState::Active).count();
    assert_eq!(active, 1);
    assert_eq!(status.keys.last().map(|k| k.info.version.clone()), status.current_kem_version);
}
