#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]

//! Envelope Codec
//!
//! Encryption: current KEM key → encapsulate → HKDF → AES-256-GCM → (optional)
//! current signature key → sign the ciphertext → assemble.
//!
//! Decryption is fail-closed:
//!
//! 1. if signatures are required ([`EnvelopeConfig::requires_signature`]), an
//!    unsigned envelope is rejected outright
//! 2. if signed, resolve the signature key by version and verify over the
//!    ciphertext; an invalid signature fails before anything is decapsulated
//!    or decrypted
//! 3. resolve the KEM key by version and check the declared algorithm
//! 4. decapsulate, derive, AEAD-decrypt; a tag mismatch is an authentication failure
//!
//! Shared secrets and derived keys live in zeroize-on-drop containers and are
//! wiped on every exit path.

use chrono::Utc;
use qsdv_core::logging::{CorrelationGuard, sanitize_data};
use qsdv_core::{
    AuditEvent, AuditOperation, AuditOutcome, CoreError, EnvelopeConfig, ErrorKind, KeyManager, KeyPair, Result,
};
use qsdv_primitives::{KemAlgorithm, KeyFamily, PrimitiveError, SignatureAlgorithm};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, instrument, warn};

use crate::envelope::{EncryptedEnvelope, EnvelopeSignature};
use crate::kdf::EnvelopeKdf;

/// Per-call encryption options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncryptOptions {
    /// Sign the envelope; `None` uses [`EnvelopeConfig::sign_envelopes`].
    pub sign: Option<bool>,
}

impl EncryptOptions {
    /// Use the configured default.
    #[must_use]
    pub const fn new() -> Self {
        Self { sign: None }
    }

    /// Force signing on or off for this call.
    #[must_use]
    pub const fn with_signing(mut self, sign: bool) -> Self {
        self.sign = Some(sign);
        self
    }
}

/// Result of [`EnvelopeCodec::self_test`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelfTestReport {
    /// Round trip produced the original bytes.
    pub success: bool,
    /// Error kind of the failed step, if any.
    pub error_kind: Option<ErrorKind>,
    /// KEM algorithm of the key used.
    pub kem_algorithm: Option<KemAlgorithm>,
    /// Signature algorithm, if the envelope was signed.
    pub sig_algorithm: Option<SignatureAlgorithm>,
    /// KEM key version used.
    pub kem_key_version: Option<String>,
    /// Input size in bytes.
    pub plaintext_len: usize,
    /// Size of the binary envelope.
    pub envelope_len: usize,
    /// Bytes added by ciphertext tag, encapsulated key, IV and signature.
    pub overhead_bytes: usize,
    /// Size of the encapsulated key.
    pub encapsulated_key_len: usize,
    /// Encryption time in milliseconds.
    pub encrypt_ms: f64,
    /// Decryption time in milliseconds.
    pub decrypt_ms: f64,
}

/// Turns plaintext into [`EncryptedEnvelope`]s and back using keys owned by a [`KeyManager`].
#[derive(Debug, Clone)]
pub struct EnvelopeCodec {
    keys: KeyManager,
    config: EnvelopeConfig,
    kdf: EnvelopeKdf,
}

impl EnvelopeCodec {
    /// Create a codec over `keys`.
    ///
    /// # Errors
    /// Returns [`CoreError::ConfigurationError`] if `config` is invalid.
    pub fn new(keys: KeyManager, config: EnvelopeConfig) -> Result<Self> {
        config.validate()?;
        let kdf = EnvelopeKdf::new(config.kdf_label.clone())?;
        Ok(Self { keys, config, kdf })
    }

    /// The key manager backing this codec.
    #[must_use]
    pub fn key_manager(&self) -> &KeyManager {
        &self.keys
    }

    /// The codec configuration.
    #[must_use]
    pub fn config(&self) -> &EnvelopeConfig {
        &self.config
    }

    /// Encrypt `plaintext` with the current KEM key, signing with the current
    /// signature key if enabled.
    ///
    /// If a key used is rotated or expires while the envelope is assembled,
    /// the encryption is retried once with fresh keys.
    ///
    /// # Errors
    /// - [`CoreError::ConfigurationError`] if `options` disable signing while
    ///   this codec requires signatures on decryption
    /// - [`CoreError::KeyExpired`] if the retry raced a rotation too
    /// - [`CoreError::GenerationTimeout`] if key generation exceeded the configured timeout
    /// - [`CoreError::PrimitiveFailure`] if a primitive failed
    #[instrument(level = "debug", skip(self, plaintext), fields(plaintext_len = plaintext.len()))]
    pub fn encrypt(&self, plaintext: &[u8], options: EncryptOptions) -> Result<EncryptedEnvelope> {
        let _correlation = CorrelationGuard::inherit_or_new();
        let started = Instant::now();
        let sign = options.sign.unwrap_or(self.config.sign_envelopes);

        let result = if !sign && self.config.requires_signature() {
            Err(CoreError::ConfigurationError(
                "Unsigned envelopes would be rejected on decryption: signatures are required".to_string(),
            ))
        } else {
            match self.encrypt_once(plaintext, sign) {
                Err(CoreError::KeyExpired { version }) => {
                    debug!(key_version = %version, "Key changed during encryption, retrying once");
                    self.encrypt_once(plaintext, sign)
                }
                other => other,
            }
        };
        let elapsed = started.elapsed();

        let builder = AuditEvent::builder(AuditOperation::Encrypt, AuditOutcome::Success)
            .duration(elapsed)
            .metadata("plaintext_len", plaintext.len().to_string())
            .metadata("signed", sign.to_string());
        match &result {
            Ok(envelope) => {
                qsdv_core::log_crypto_operation!(
                    "encrypt",
                    kem_key_version = %envelope.kem_key_version,
                    sig_key_version = ?envelope.sig_key_version(),
                    plaintext = %sanitize_data(plaintext),
                    duration_us = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX)
                );
                let mut builder = builder.key_version(envelope.kem_key_version.as_str());
                if let Some(sig_version) = envelope.sig_key_version() {
                    builder = builder.metadata("sig_key_version", sig_version);
                }
                self.keys.audit_sink().record(&builder.build());
            }
            Err(err) => {
                warn!(error = %err, "Envelope encryption failed");
                self.keys.audit_sink().record(&builder.error(err).build());
            }
        }
        result
    }

    /// Decrypt `envelope`, resolving keys by the versions it names.
    ///
    /// # Errors
    /// - [`CoreError::AuthenticationFailure`] if the signature or AEAD tag does
    ///   not verify, or the envelope is unsigned while signatures are required
    /// - [`CoreError::KeyNotFound`] if a named key is not retained
    /// - [`CoreError::AlgorithmMismatch`] if a declared algorithm disagrees with the key
    /// - [`CoreError::PrimitiveFailure`] if a primitive rejects its input
    #[instrument(level = "debug", skip(self, envelope), fields(kem_key_version = %envelope.kem_key_version))]
    pub fn decrypt(&self, envelope: &EncryptedEnvelope) -> Result<Vec<u8>> {
        let _correlation = CorrelationGuard::inherit_or_new();
        let started = Instant::now();
        let result = self.decrypt_inner(envelope);
        let elapsed = started.elapsed();

        let mut builder = AuditEvent::builder(AuditOperation::Decrypt, AuditOutcome::Success)
            .key_version(envelope.kem_key_version.as_str())
            .duration(elapsed);
        if let Some(sig_version) = envelope.sig_key_version() {
            builder = builder.metadata("sig_key_version", sig_version);
        }
        match &result {
            Ok(plaintext) => {
                qsdv_core::log_crypto_operation!(
                    "decrypt",
                    kem_key_version = %envelope.kem_key_version,
                    sig_key_version = ?envelope.sig_key_version(),
                    plaintext_len = plaintext.len(),
                    duration_us = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX)
                );
                self.keys.audit_sink().record(&builder.build());
            }
            Err(err) => {
                if let CoreError::AuthenticationFailure(reason) = err {
                    qsdv_core::log_security_event!(
                        "Envelope authentication failed",
                        kem_key_version = %envelope.kem_key_version,
                        sig_key_version = ?envelope.sig_key_version(),
                        reason = %reason
                    );
                } else {
                    warn!(error = %err, "Envelope decryption failed");
                }
                self.keys.audit_sink().record(&builder.error(err).build());
            }
        }
        result
    }

    /// Encrypt-then-decrypt `data` and report timings and sizes.
    ///
    /// Never fails: a failing step is reported through `success` and `error_kind`.
    pub fn self_test(&self, data: &[u8]) -> SelfTestReport {
        let _correlation = CorrelationGuard::inherit_or_new();
        let mut report = SelfTestReport {
            success: false,
            error_kind: None,
            kem_algorithm: None,
            sig_algorithm: None,
            kem_key_version: None,
            plaintext_len: data.len(),
            envelope_len: 0,
            overhead_bytes: 0,
            encapsulated_key_len: 0,
            encrypt_ms: 0.0,
            decrypt_ms: 0.0,
        };

        let started = Instant::now();
        let outcome = self.encrypt(data, EncryptOptions::new()).and_then(|envelope| {
            report.encrypt_ms = started.elapsed().as_secs_f64() * 1000.0;
            report.kem_algorithm = Some(envelope.kem_algorithm);
            report.sig_algorithm = envelope.sig_algorithm();
            report.kem_key_version = Some(envelope.kem_key_version.clone());
            report.envelope_len = envelope.to_bytes()?.len();
            report.overhead_bytes = envelope.overhead(data.len());
            report.encapsulated_key_len = envelope.encapsulated_key.len();

            let decrypt_started = Instant::now();
            let decrypted = self.decrypt(&envelope)?;
            report.decrypt_ms = decrypt_started.elapsed().as_secs_f64() * 1000.0;
            Ok(decrypted)
        });

        let builder = AuditEvent::builder(AuditOperation::SelfTest, AuditOutcome::Success)
            .maybe_key_version(report.kem_key_version.clone())
            .duration(started.elapsed());
        match outcome {
            Ok(decrypted) if decrypted == data => {
                report.success = true;
                self.keys.audit_sink().record(&builder.build());
            }
            Ok(_) => {
                warn!("Self-test round trip returned different bytes");
                self.keys.audit_sink().record(&builder.metadata("mismatch", "true").build());
            }
            Err(err) => {
                report.error_kind = Some(err.kind());
                self.keys.audit_sink().record(&builder.error(&err).build());
            }
        }
        report
    }

    fn current(&self, family: KeyFamily) -> Result<Arc<KeyPair>> {
        match self.config.generation_timeout {
            Some(timeout) => self.keys.get_current_with_timeout(family, timeout),
            None => self.keys.get_current(family),
        }
    }

    fn encrypt_once(&self, plaintext: &[u8], sign: bool) -> Result<EncryptedEnvelope> {
        let kem_key = self.current(KeyFamily::Kem)?;
        let kem_algorithm = kem_key.kem_algorithm().ok_or_else(|| CoreError::AlgorithmMismatch {
            version: kem_key.version().to_string(),
            declared: KeyFamily::Kem.to_string(),
            actual: kem_key.family().to_string(),
        })?;
        let provider = self.keys.provider();

        let (ciphertext, iv, encapsulated_key) = {
            let (shared_secret, encapsulated_key) = provider.encapsulate(kem_algorithm, kem_key.public_key())?;
            let key = self.kdf.derive(&shared_secret, kem_algorithm)?;
            let (ciphertext, iv) = provider.aead_encrypt(&key, plaintext)?;
            (ciphertext, iv, encapsulated_key)
        };

        let signature = if sign {
            let sig_key = self.current(KeyFamily::Signature)?;
            let signature = self.keys.sign(&sig_key, &ciphertext)?;
            Some((sig_key, signature))
        } else {
            None
        };

        let now = Utc::now();
        if !kem_key.is_usable_at(now) {
            return Err(CoreError::KeyExpired { version: kem_key.version().to_string() });
        }
        let signature = match signature {
            Some((sig_key, _)) if !sig_key.is_usable_at(now) => {
                return Err(CoreError::KeyExpired { version: sig_key.version().to_string() });
            }
            Some((sig_key, signature)) => Some(EnvelopeSignature {
                algorithm: sig_key.signature_algorithm().ok_or_else(|| CoreError::AlgorithmMismatch {
                    version: sig_key.version().to_string(),
                    declared: KeyFamily::Signature.to_string(),
                    actual: sig_key.family().to_string(),
                })?,
                key_version: sig_key.version().to_string(),
                signature,
            }),
            None => None,
        };

        Ok(EncryptedEnvelope {
            ciphertext,
            encapsulated_key,
            iv,
            kem_algorithm,
            kem_key_version: kem_key.version().to_string(),
            signature,
        })
    }

    fn decrypt_inner(&self, envelope: &EncryptedEnvelope) -> Result<Vec<u8>> {
        if envelope.signature.is_none() && self.config.requires_signature() {
            return Err(CoreError::AuthenticationFailure("envelope is not signed".to_string()));
        }
        if let Some(sig) = &envelope.signature {
            let sig_key = self.keys.get_by_version(&sig.key_version)?;
            if sig_key.signature_algorithm() != Some(sig.algorithm) {
                return Err(CoreError::AlgorithmMismatch {
                    version: sig_key.version().to_string(),
                    declared: sig.algorithm.name().to_string(),
                    actual: sig_key.algorithm().name().to_string(),
                });
            }
            if !self.keys.verify(&sig_key, &envelope.ciphertext, &sig.signature)? {
                return Err(CoreError::AuthenticationFailure("signature verification failed".to_string()));
            }
        }

        let kem_key = self.keys.get_by_version(&envelope.kem_key_version)?;
        if kem_key.kem_algorithm() != Some(envelope.kem_algorithm) {
            return Err(CoreError::AlgorithmMismatch {
                version: kem_key.version().to_string(),
                declared: envelope.kem_algorithm.name().to_string(),
                actual: kem_key.algorithm().name().to_string(),
            });
        }

        let shared_secret = self.keys.decapsulate(&kem_key, &envelope.encapsulated_key)?;
        let key = self.kdf.derive(&shared_secret, envelope.kem_algorithm)?;
        drop(shared_secret);

        self.keys.provider().aead_decrypt(&key, &envelope.ciphertext, &envelope.iv).map_err(|e| match e {
            PrimitiveError::AeadAuthentication => {
                CoreError::AuthenticationFailure("AEAD tag mismatch".to_string())
            }
            other => CoreError::PrimitiveFailure(other),
        })
    }
}
