#![deny(unsafe_code)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]
#![allow(clippy::indexing_slicing)]
#![allow(missing_docs)]

//! End-to-End Integration Tests
//!
//! Drives the `qsdv` facade the way a document store does: encrypt on upload,
//! persist the envelope, decrypt on download, rotate keys in between.
//!
//! Run with: `cargo test --package qsdv --test e2e_integration --release -- --nocapture`

mod common;

use common::CountingProvider;
use proptest::prelude::*;
use qsdv::{
    CoreError, EncryptOptions, EncryptedEnvelope, FailureClass, KemAlgorithm, KeyFamily, KeyState,
    SignatureAlgorithm, StoredKey, Vault, VaultConfig,
};
use std::sync::Arc;

fn level1_vault() -> Vault {
    Vault::from_config(VaultConfig::for_security_level(1)).expect("vault")
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_hello_round_trip() {
    let vault = Vault::new().unwrap();
    let envelope = vault.encrypt(b"hello").unwrap();
    assert_eq!(vault.decrypt(&envelope).unwrap(), b"hello");
}

#[test]
fn test_corrupt_first_ciphertext_byte() {
    let vault = Vault::new().unwrap();
    let mut envelope = vault.encrypt(b"hello").unwrap();
    envelope.ciphertext[0] ^= 0xFF;
    let err = vault.decrypt(&envelope).unwrap_err();
    assert!(matches!(err, CoreError::AuthenticationFailure(_)));
    assert_eq!(err.failure_class(), FailureClass::Permanent);
}

#[test]
fn test_rotate_then_decrypt() {
    let vault = Vault::new().unwrap();
    let envelope = vault.encrypt(b"hello").unwrap();
    let new_version = vault.rotate(KeyFamily::Kem).unwrap();
    assert_ne!(new_version, envelope.kem_key_version);
    assert_eq!(vault.decrypt(&envelope).unwrap(), b"hello");
}

// ============================================================================
// Security levels
// ============================================================================

#[test]
fn test_round_trip_at_every_security_level() {
    for (level, kem, sig) in [
        (1, KemAlgorithm::MlKem512, SignatureAlgorithm::MlDsa44),
        (3, KemAlgorithm::MlKem768, SignatureAlgorithm::MlDsa65),
        (5, KemAlgorithm::MlKem1024, SignatureAlgorithm::MlDsa87),
    ] {
        let vault = Vault::from_config(VaultConfig::for_security_level(level)).unwrap();
        let envelope = vault.encrypt(b"level test").unwrap();
        assert_eq!(envelope.kem_algorithm, kem);
        assert_eq!(envelope.sig_algorithm(), Some(sig));
        assert_eq!(envelope.encapsulated_key.len(), kem.ciphertext_size());
        assert_eq!(vault.decrypt(&envelope).unwrap(), b"level test");
    }
}

#[test]
fn test_legacy_algorithm_names_in_settings() {
    let vault =
        Vault::from_json(r#"{"kem_algorithm":"Kyber1024","sig_algorithm":"Dilithium2"}"#).unwrap();
    let envelope = vault.encrypt(b"x").unwrap();
    assert_eq!(envelope.kem_algorithm, KemAlgorithm::MlKem1024);
    assert_eq!(envelope.sig_algorithm(), Some(SignatureAlgorithm::MlDsa44));
}

// ============================================================================
// Persistence
// ============================================================================

#[test]
fn test_stored_envelopes_decrypt_across_rotations() {
    let vault = level1_vault();
    let mut stored = Vec::new();
    for i in 0..4u8 {
        let document = vec![i; 100 + usize::from(i)];
        stored.push((document.clone(), vault.encrypt_to_bytes(&document).unwrap()));
        vault.rotate(KeyFamily::Kem).unwrap();
        if i % 2 == 0 {
            vault.rotate(KeyFamily::Signature).unwrap();
        }
    }
    for (document, bytes) in &stored {
        assert_eq!(&vault.decrypt_bytes(bytes).unwrap(), document);
    }
}

#[test]
fn test_json_envelope_round_trip() {
    let vault = level1_vault();
    let envelope = vault.encrypt(b"text column").unwrap();
    let json = envelope.to_json().unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["kem_algorithm"], "ML-KEM-512");
    assert_eq!(value["kem_key_version"], envelope.kem_key_version.as_str());

    let restored = EncryptedEnvelope::from_json(&json).unwrap();
    assert_eq!(restored, envelope);
    assert_eq!(vault.decrypt(&restored).unwrap(), b"text column");
}

#[test]
fn test_malformed_bytes_rejected() {
    let vault = level1_vault();
    let mut bytes = vault.encrypt_to_bytes(b"x").unwrap();
    bytes.truncate(bytes.len() - 1);
    assert!(matches!(vault.decrypt_bytes(&bytes), Err(CoreError::MalformedEnvelope(_))));
    assert!(matches!(vault.decrypt_bytes(b"not an envelope"), Err(CoreError::MalformedEnvelope(_))));
}

#[test]
fn test_unsigned_envelopes() {
    let vault = Vault::from_json(r#"{"security_level":1,"sign_envelopes":false}"#).unwrap();
    let unsigned = vault.encrypt(b"a").unwrap();
    let signed = vault.encrypt_with(b"b", EncryptOptions::new().with_signing(true)).unwrap();
    assert!(!unsigned.is_signed());
    assert!(signed.is_signed());
    assert_eq!(vault.decrypt(&unsigned).unwrap(), b"a");
    assert_eq!(vault.decrypt(&signed).unwrap(), b"b");
}

// ============================================================================
// Status and retention
// ============================================================================

#[test]
fn test_status_and_public_info() {
    let vault = level1_vault();
    assert!(vault.public_info(KeyFamily::Kem).is_none());

    let envelope = vault.encrypt(b"x").unwrap();
    let info = vault.public_info(KeyFamily::Kem).unwrap();
    assert_eq!(info.version, envelope.kem_key_version);
    assert_eq!(info.public_key.len(), KemAlgorithm::MlKem512.public_key_size());

    vault.rotate(KeyFamily::Kem).unwrap();
    let status = vault.status();
    assert_eq!(status.keys.len(), 3);
    let old = status.keys.iter().find(|k| k.info.version == envelope.kem_key_version).unwrap();
    assert_eq!(old.state, KeyState::Retired);
    assert_eq!(old.usage_count, 0);

    vault.decrypt(&envelope).unwrap();
    let old = vault.keys().get_by_version(&envelope.kem_key_version).unwrap();
    assert_eq!(old.usage_count(), 1);

    let json = serde_json::to_value(vault.status()).unwrap();
    assert!(json["keys"].as_array().unwrap().iter().all(|k| k.get("private_key").is_none()));
}

#[test]
fn test_purge_retention() {
    let vault = level1_vault();
    let envelope = vault.encrypt(b"x").unwrap();
    assert!(matches!(vault.purge(&envelope.kem_key_version), Err(CoreError::KeyInUse { .. })));

    vault.rotate(KeyFamily::Kem).unwrap();
    vault.purge(&envelope.kem_key_version).unwrap();
    assert!(matches!(vault.decrypt(&envelope), Err(CoreError::KeyNotFound { .. })));
}

#[test]
fn test_self_test_diagnostics() {
    let vault = Vault::new().unwrap();
    let report = vault.self_test(b"diagnostic payload");
    assert!(report.success);
    assert_eq!(report.encapsulated_key_len, KemAlgorithm::MlKem768.ciphertext_size());
    assert!(report.encrypt_ms >= 0.0 && report.decrypt_ms >= 0.0);
}

// ============================================================================
// Restart from stored keys
// ============================================================================

#[test]
fn test_restored_keys_decrypt_after_restart() {
    let before = level1_vault();
    let first = before.encrypt_to_bytes(b"before rotation").unwrap();
    before.rotate(KeyFamily::Kem).unwrap();
    let second = before.encrypt_to_bytes(b"after rotation").unwrap();
    let saved = serde_json::to_string(&before.export_keys()).unwrap();
    let current = before.keys().current_version(KeyFamily::Kem).unwrap();
    drop(before);

    let provider = Arc::new(CountingProvider::new());
    let after = Vault::builder(VaultConfig::for_security_level(1)).with_provider(provider.clone()).build().unwrap();
    let records: Vec<StoredKey> = serde_json::from_str(&saved).unwrap();
    assert_eq!(after.restore_keys(records).unwrap(), 3);

    assert_eq!(after.decrypt_bytes(&first).unwrap(), b"before rotation");
    assert_eq!(after.decrypt_bytes(&second).unwrap(), b"after rotation");

    let envelope = after.encrypt(b"after restart").unwrap();
    assert_eq!(envelope.kem_key_version, current);
    assert_eq!(CountingProvider::count(&provider.generations), 0);

    assert!(after.rotate(KeyFamily::Kem).unwrap().starts_with("kem_v3_"));
    assert_eq!(after.decrypt(&envelope).unwrap(), b"after restart");
}

#[test]
fn test_exported_keys_carry_private_material_only_in_records() {
    let vault = level1_vault();
    vault.encrypt(b"x").unwrap();

    let records = vault.export_keys();
    let json = serde_json::to_value(&records).unwrap();
    assert!(json.as_array().unwrap().iter().all(|r| r["private_key"].is_string()));
    assert!(!format!("{:?}", records).contains(json[0]["private_key"].as_str().unwrap()));
}

// ============================================================================
// Round-trip property
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_decrypt_inverts_encrypt(
        plaintext in proptest::collection::vec(any::<u8>(), 0..4096),
        sign in any::<bool>(),
    ) {
        let vault = Vault::from_json(r#"{"security_level":1,"require_signature":false}"#).unwrap();
        let envelope = vault.encrypt_with(&plaintext, EncryptOptions::new().with_signing(sign)).unwrap();
        prop_assert_eq!(envelope.is_signed(), sign);
        prop_assert_eq!(vault.decrypt(&envelope).unwrap(), plaintext.clone());

        let bytes = envelope.to_bytes().unwrap();
        prop_assert_eq!(vault.decrypt_bytes(&bytes).unwrap(), plaintext);
    }
}
