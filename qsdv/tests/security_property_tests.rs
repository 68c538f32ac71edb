#![deny(unsafe_code)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]
#![allow(clippy::indexing_slicing)]
#![allow(missing_docs)]

//! Security Property Tests
//!
//! Tamper detection on every envelope field, fail-closed ordering of
//! signature verification, and algorithm binding, observed through a
//! provider that counts primitive calls.
//!
//! Run with: `cargo test --package qsdv --test security_property_tests --release -- --nocapture`

mod common;

use common::CountingProvider;
use proptest::prelude::*;
use qsdv::{
    AuditOperation, CoreError, CryptoProvider, DefaultProvider, EncryptOptions, EncryptedEnvelope, EnvelopeConfig,
    ErrorKind, KemAlgorithm, KeyFamily, MemoryAuditSink, SignatureAlgorithm, Vault, VaultConfig,
};
use qsdv_core::config::DEFAULT_KDF_LABEL;
use qsdv_hybrid::EnvelopeKdf;
use std::sync::Arc;

fn counting_vault_with(config: VaultConfig) -> (Vault, Arc<CountingProvider>) {
    let provider = Arc::new(CountingProvider::new());
    let vault = Vault::builder(config).with_provider(provider.clone()).build().unwrap();
    (vault, provider)
}

fn counting_vault() -> (Vault, Arc<CountingProvider>) {
    counting_vault_with(VaultConfig::for_security_level(1))
}

/// Signs by default but also accepts unsigned envelopes.
fn optional_signature_vault() -> (Vault, Arc<CountingProvider>) {
    counting_vault_with(
        VaultConfig::for_security_level(1).with_envelope(EnvelopeConfig::default().with_required_signature(false)),
    )
}

fn count(c: &std::sync::atomic::AtomicUsize) -> usize {
    CountingProvider::count(c)
}

// ============================================================================
// Tamper detection
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_any_bit_flip_fails_authentication(field in 0usize..4, index in any::<usize>(), bit in 0u8..8) {
        let (vault, _) = counting_vault();
        let envelope = vault.encrypt(b"tamper target").unwrap();
        let mut tampered = envelope.clone();
        let target: &mut Vec<u8> = match field {
            0 => &mut tampered.ciphertext,
            1 => &mut tampered.encapsulated_key,
            2 => &mut tampered.iv,
            _ => &mut tampered.signature.as_mut().unwrap().signature,
        };
        let i = index % target.len();
        target[i] ^= 1 << bit;

        let result = vault.decrypt(&tampered);
        prop_assert!(matches!(result, Err(CoreError::AuthenticationFailure(_))), "field {} byte {}: {:?}", field, i, result);
    }
}

#[test]
fn test_tag_truncation_fails() {
    let (vault, _) = optional_signature_vault();
    let mut envelope = vault.encrypt_with(b"hello", EncryptOptions::new().with_signing(false)).unwrap();
    envelope.ciphertext.truncate(envelope.ciphertext.len() - 1);
    assert!(matches!(vault.decrypt(&envelope), Err(CoreError::AuthenticationFailure(_))));
}

// ============================================================================
// Fail-closed signature order
// ============================================================================

#[test]
fn test_bad_signature_stops_before_decapsulation() {
    let (vault, provider) = counting_vault();
    let mut envelope = vault.encrypt(b"hello").unwrap();
    envelope.ciphertext[0] ^= 0x80;
    provider.reset();

    assert!(matches!(vault.decrypt(&envelope), Err(CoreError::AuthenticationFailure(_))));
    assert_eq!(count(&provider.verifies), 1);
    assert_eq!(count(&provider.decapsulations), 0);
    assert_eq!(count(&provider.aead_decrypts), 0);
}

#[test]
fn test_valid_signature_then_full_pipeline() {
    let (vault, provider) = counting_vault();
    let envelope = vault.encrypt(b"hello").unwrap();
    assert_eq!(count(&provider.encapsulations), 1);
    assert_eq!(count(&provider.signs), 1);
    assert_eq!(count(&provider.aead_encrypts), 1);
    provider.reset();

    assert_eq!(vault.decrypt(&envelope).unwrap(), b"hello");
    assert_eq!(count(&provider.verifies), 1);
    assert_eq!(count(&provider.decapsulations), 1);
    assert_eq!(count(&provider.aead_decrypts), 1);
    assert_eq!(count(&provider.generations), 0);
}

#[test]
fn test_unknown_signature_key_stops_before_decapsulation() {
    let (vault, provider) = counting_vault();
    let mut envelope = vault.encrypt(b"hello").unwrap();
    envelope.signature.as_mut().unwrap().key_version = "sig_v42_unknown".to_string();
    provider.reset();

    assert!(matches!(vault.decrypt(&envelope), Err(CoreError::KeyNotFound { .. })));
    assert_eq!(count(&provider.verifies), 0);
    assert_eq!(count(&provider.decapsulations), 0);
}

#[test]
fn test_stripped_signature_fails_before_decapsulation() {
    let (vault, provider) = counting_vault();
    let envelope = vault.encrypt(b"hello").unwrap();
    let stripped = EncryptedEnvelope { signature: None, ..envelope };
    provider.reset();

    assert!(matches!(vault.decrypt(&stripped), Err(CoreError::AuthenticationFailure(_))));
    assert_eq!(count(&provider.verifies), 0);
    assert_eq!(count(&provider.decapsulations), 0);
    assert_eq!(count(&provider.aead_decrypts), 0);
}

#[test]
fn test_envelope_forged_from_public_key_is_rejected() {
    let (vault, provider) = counting_vault();
    vault.encrypt(b"legitimate").unwrap();

    // Anyone holding the published KEM key can build a well-formed unsigned envelope.
    let info = vault.public_info(KeyFamily::Kem).unwrap();
    let kem = KemAlgorithm::MlKem512;
    let outsider = DefaultProvider::new();
    let (shared_secret, encapsulated_key) = outsider.encapsulate(kem, &info.public_key).unwrap();
    let key = EnvelopeKdf::new(DEFAULT_KDF_LABEL).unwrap().derive(&shared_secret, kem).unwrap();
    let (ciphertext, iv) = outsider.aead_encrypt(&key, b"attacker content").unwrap();
    let forged = EncryptedEnvelope {
        ciphertext,
        encapsulated_key,
        iv,
        kem_algorithm: kem,
        kem_key_version: info.version,
        signature: None,
    };
    provider.reset();

    let err = vault.decrypt(&forged).unwrap_err();
    assert!(matches!(err, CoreError::AuthenticationFailure(_)));
    assert_eq!(count(&provider.decapsulations), 0);
    assert_eq!(count(&provider.aead_decrypts), 0);
}

// ============================================================================
// Algorithm binding
// ============================================================================

#[test]
fn test_algorithm_mismatch_attempts_nothing() {
    let (vault, provider) = optional_signature_vault();
    let envelope = vault.encrypt_with(b"hello", EncryptOptions::new().with_signing(false)).unwrap();
    let tampered = EncryptedEnvelope { kem_algorithm: KemAlgorithm::MlKem768, ..envelope };
    provider.reset();

    let err = vault.decrypt(&tampered).unwrap_err();
    assert!(matches!(err, CoreError::AlgorithmMismatch { .. }));
    assert!(err.to_string().contains("ML-KEM-768"));
    assert_eq!(count(&provider.decapsulations), 0);
    assert_eq!(count(&provider.aead_decrypts), 0);
}

#[test]
fn test_signature_algorithm_mismatch_attempts_nothing() {
    let (vault, provider) = counting_vault();
    let mut envelope = vault.encrypt(b"hello").unwrap();
    envelope.signature.as_mut().unwrap().algorithm = SignatureAlgorithm::MlDsa65;
    provider.reset();

    assert!(matches!(vault.decrypt(&envelope), Err(CoreError::AlgorithmMismatch { .. })));
    assert_eq!(count(&provider.verifies), 0);
    assert_eq!(count(&provider.decapsulations), 0);
}

#[test]
fn test_cross_vault_envelope_is_not_found() {
    let (a, _) = counting_vault();
    let (b, _) = counting_vault();
    let envelope = a.encrypt(b"hello").unwrap();
    assert!(matches!(b.decrypt(&envelope), Err(CoreError::KeyNotFound { .. })));
}

// ============================================================================
// Secrets stay out of observable output
// ============================================================================

#[test]
fn test_debug_output_redacts_private_keys() {
    let (vault, _) = counting_vault();
    vault.encrypt(b"x").unwrap();
    let version = vault.status().current_kem_version.unwrap();
    let key = vault.keys().get_by_version(&version).unwrap();
    let rendered = format!("{:?} {:?}", key, vault);
    assert!(rendered.contains("REDACTED"));
}

#[test]
fn test_authentication_failures_reach_audit() {
    let sink = Arc::new(MemoryAuditSink::new(64));
    let vault = Vault::builder(VaultConfig::for_security_level(1)).with_audit(sink.clone()).build().unwrap();
    let mut envelope = vault.encrypt(b"hello").unwrap();
    envelope.iv[0] ^= 1;
    assert!(vault.decrypt(&envelope).is_err());

    let failures: Vec<_> =
        sink.events_for(AuditOperation::Decrypt).into_iter().filter(|e| !e.is_success()).collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].error_kind, Some(ErrorKind::AuthenticationFailure));
}
