//! Provider test doubles shared by the integration tests.

#![allow(dead_code)]

use qsdv::{
    Algorithm, CryptoProvider, DefaultProvider, KemAlgorithm, KeyFamily, KeyManager, PrimitiveError,
    SignatureAlgorithm,
};
use qsdv_primitives::{GeneratedKeyPair, SecretBytes, SymmetricKey};
use std::sync::OnceLock;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

type PResult<T> = Result<T, PrimitiveError>;

/// Counts every primitive call and forwards to the default provider.
#[derive(Default)]
pub struct CountingProvider {
    inner: DefaultProvider,
    pub generations: AtomicUsize,
    pub encapsulations: AtomicUsize,
    pub decapsulations: AtomicUsize,
    pub signs: AtomicUsize,
    pub verifies: AtomicUsize,
    pub aead_encrypts: AtomicUsize,
    pub aead_decrypts: AtomicUsize,
}

impl CountingProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        for counter in [
            &self.generations,
            &self.encapsulations,
            &self.decapsulations,
            &self.signs,
            &self.verifies,
            &self.aead_encrypts,
            &self.aead_decrypts,
        ] {
            counter.store(0, Ordering::SeqCst);
        }
    }
}

impl CryptoProvider for CountingProvider {
    fn generate_keypair(&self, algorithm: Algorithm) -> PResult<GeneratedKeyPair> {
        self.generations.fetch_add(1, Ordering::SeqCst);
        self.inner.generate_keypair(algorithm)
    }

    fn encapsulate(&self, a: KemAlgorithm, pk: &[u8]) -> PResult<(SecretBytes, Vec<u8>)> {
        self.encapsulations.fetch_add(1, Ordering::SeqCst);
        self.inner.encapsulate(a, pk)
    }

    fn decapsulate(&self, a: KemAlgorithm, ek: &[u8], sk: &[u8]) -> PResult<SecretBytes> {
        self.decapsulations.fetch_add(1, Ordering::SeqCst);
        self.inner.decapsulate(a, ek, sk)
    }

    fn sign(&self, a: SignatureAlgorithm, m: &[u8], sk: &[u8]) -> PResult<Vec<u8>> {
        self.signs.fetch_add(1, Ordering::SeqCst);
        self.inner.sign(a, m, sk)
    }

    fn verify(&self, a: SignatureAlgorithm, m: &[u8], s: &[u8], pk: &[u8]) -> PResult<bool> {
        self.verifies.fetch_add(1, Ordering::SeqCst);
        self.inner.verify(a, m, s, pk)
    }

    fn aead_encrypt(&self, k: &SymmetricKey, pt: &[u8]) -> PResult<(Vec<u8>, Vec<u8>)> {
        self.aead_encrypts.fetch_add(1, Ordering::SeqCst);
        self.inner.aead_encrypt(k, pt)
    }

    fn aead_decrypt(&self, k: &SymmetricKey, ct: &[u8], iv: &[u8]) -> PResult<Vec<u8>> {
        self.aead_decrypts.fetch_add(1, Ordering::SeqCst);
        self.inner.aead_decrypt(k, ct, iv)
    }
}

/// Fails the first `failures` key generations, then behaves like the default provider.
pub struct FailingProvider {
    inner: DefaultProvider,
    remaining_failures: AtomicUsize,
    pub attempts: AtomicUsize,
}

impl FailingProvider {
    pub fn new(failures: usize) -> Self {
        Self {
            inner: DefaultProvider::new(),
            remaining_failures: AtomicUsize::new(failures),
            attempts: AtomicUsize::new(0),
        }
    }
}

impl CryptoProvider for FailingProvider {
    fn generate_keypair(&self, algorithm: Algorithm) -> PResult<GeneratedKeyPair> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let failed = self
            .remaining_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(PrimitiveError::KeyGeneration("injected failure".to_string()));
        }
        self.inner.generate_keypair(algorithm)
    }

    fn encapsulate(&self, a: KemAlgorithm, pk: &[u8]) -> PResult<(SecretBytes, Vec<u8>)> {
        self.inner.encapsulate(a, pk)
    }

    fn decapsulate(&self, a: KemAlgorithm, ek: &[u8], sk: &[u8]) -> PResult<SecretBytes> {
        self.inner.decapsulate(a, ek, sk)
    }

    fn sign(&self, a: SignatureAlgorithm, m: &[u8], sk: &[u8]) -> PResult<Vec<u8>> {
        self.inner.sign(a, m, sk)
    }

    fn verify(&self, a: SignatureAlgorithm, m: &[u8], s: &[u8], pk: &[u8]) -> PResult<bool> {
        self.inner.verify(a, m, s, pk)
    }

    fn aead_encrypt(&self, k: &SymmetricKey, pt: &[u8]) -> PResult<(Vec<u8>, Vec<u8>)> {
        self.inner.aead_encrypt(k, pt)
    }

    fn aead_decrypt(&self, k: &SymmetricKey, ct: &[u8], iv: &[u8]) -> PResult<Vec<u8>> {
        self.inner.aead_decrypt(k, ct, iv)
    }
}

/// Delays every key generation by `delay` and counts them.
pub struct SlowProvider {
    inner: DefaultProvider,
    delay: Duration,
    pub generations: AtomicUsize,
}

impl SlowProvider {
    pub fn new(delay: Duration) -> Self {
        Self { inner: DefaultProvider::new(), delay, generations: AtomicUsize::new(0) }
    }
}

impl CryptoProvider for SlowProvider {
    fn generate_keypair(&self, algorithm: Algorithm) -> PResult<GeneratedKeyPair> {
        self.generations.fetch_add(1, Ordering::SeqCst);
        thread::sleep(self.delay);
        self.inner.generate_keypair(algorithm)
    }

    fn encapsulate(&self, a: KemAlgorithm, pk: &[u8]) -> PResult<(SecretBytes, Vec<u8>)> {
        self.inner.encapsulate(a, pk)
    }

    fn decapsulate(&self, a: KemAlgorithm, ek: &[u8], sk: &[u8]) -> PResult<SecretBytes> {
        self.inner.decapsulate(a, ek, sk)
    }

    fn sign(&self, a: SignatureAlgorithm, m: &[u8], sk: &[u8]) -> PResult<Vec<u8>> {
        self.inner.sign(a, m, sk)
    }

    fn verify(&self, a: SignatureAlgorithm, m: &[u8], s: &[u8], pk: &[u8]) -> PResult<bool> {
        self.inner.verify(a, m, s, pk)
    }

    fn aead_encrypt(&self, k: &SymmetricKey, pt: &[u8]) -> PResult<(Vec<u8>, Vec<u8>)> {
        self.inner.aead_encrypt(k, pt)
    }

    fn aead_decrypt(&self, k: &SymmetricKey, ct: &[u8], iv: &[u8]) -> PResult<Vec<u8>> {
        self.inner.aead_decrypt(k, ct, iv)
    }
}

/// Rotates the KEM key from inside `encapsulate`, the way a concurrent
/// rotation lands between key lookup and envelope assembly.
///
/// The first `rotations` encapsulations rotate; pass `usize::MAX` to rotate on
/// every call. Rotation starts once [`RotatingProvider::attach`] is called.
pub struct RotatingProvider {
    inner: DefaultProvider,
    keys: OnceLock<KeyManager>,
    remaining_rotations: AtomicUsize,
    pub encapsulations: AtomicUsize,
    pub rotations: AtomicUsize,
}

impl RotatingProvider {
    pub fn new(rotations: usize) -> Self {
        Self {
            inner: DefaultProvider::new(),
            keys: OnceLock::new(),
            remaining_rotations: AtomicUsize::new(rotations),
            encapsulations: AtomicUsize::new(0),
            rotations: AtomicUsize::new(0),
        }
    }

    /// Rotate keys of `keys`, normally the manager built on this provider.
    pub fn attach(&self, keys: &KeyManager) {
        let _ = self.keys.set(keys.clone());
    }
}

impl CryptoProvider for RotatingProvider {
    fn generate_keypair(&self, algorithm: Algorithm) -> PResult<GeneratedKeyPair> {
        self.inner.generate_keypair(algorithm)
    }

    fn encapsulate(&self, a: KemAlgorithm, pk: &[u8]) -> PResult<(SecretBytes, Vec<u8>)> {
        self.encapsulations.fetch_add(1, Ordering::SeqCst);
        if let Some(keys) = self.keys.get() {
            let rotate = self
                .remaining_rotations
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if rotate {
                keys.rotate(KeyFamily::Kem).map_err(|err| PrimitiveError::KeyGeneration(err.to_string()))?;
                self.rotations.fetch_add(1, Ordering::SeqCst);
            }
        }
        self.inner.encapsulate(a, pk)
    }

    fn decapsulate(&self, a: KemAlgorithm, ek: &[u8], sk: &[u8]) -> PResult<SecretBytes> {
        self.inner.decapsulate(a, ek, sk)
    }

    fn sign(&self, a: SignatureAlgorithm, m: &[u8], sk: &[u8]) -> PResult<Vec<u8>> {
        self.inner.sign(a, m, sk)
    }

    fn verify(&self, a: SignatureAlgorithm, m: &[u8], s: &[u8], pk: &[u8]) -> PResult<bool> {
        self.inner.verify(a, m, s, pk)
    }

    fn aead_encrypt(&self, k: &SymmetricKey, pt: &[u8]) -> PResult<(Vec<u8>, Vec<u8>)> {
        self.inner.aead_encrypt(k, pt)
    }

    fn aead_decrypt(&self, k: &SymmetricKey, ct: &[u8], iv: &[u8]) -> PResult<Vec<u8>> {
        self.inner.aead_decrypt(k, ct, iv)
    }
}
