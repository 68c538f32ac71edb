#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]

//! [`Vault`]: provider, key manager and envelope codec wired from one configuration.

use qsdv_core::{
    AuditSink, KeyManager, KeyManagerStatus, PublicKeyInfo, Result, StoredKey, TracingAuditSink, VaultConfig,
    VaultSettings,
};
use qsdv_hybrid::{EncryptOptions, EncryptedEnvelope, EnvelopeCodec, SelfTestReport};
use qsdv_primitives::{CryptoProvider, DefaultProvider, KeyFamily};
use std::sync::Arc;
use tracing::info;

/// Hybrid post-quantum document encryption with managed keys.
///
/// Cheap to clone; clones share keys and configuration. There is no global
/// instance: create one per key domain and share it.
///
/// ```rust,no_run
/// use qsdv::Vault;
///
/// let vault = Vault::new()?;
/// let envelope = vault.encrypt(b"hello")?;
/// assert_eq!(vault.decrypt(&envelope)?, b"hello");
/// # Ok::<(), qsdv::CoreError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Vault {
    codec: EnvelopeCodec,
}

/// Builder for [`Vault`] with a custom provider or audit sink.
pub struct VaultBuilder {
    config: VaultConfig,
    provider: Arc<dyn CryptoProvider>,
    audit: Arc<dyn AuditSink>,
}

impl VaultBuilder {
    /// Start from `config` with the default provider and tracing audit sink.
    #[must_use]
    pub fn new(config: VaultConfig) -> Self {
        Self { config, provider: Arc::new(DefaultProvider::new()), audit: Arc::new(TracingAuditSink) }
    }

    /// Use a different primitive provider.
    #[must_use]
    pub fn with_provider(mut self, provider: Arc<dyn CryptoProvider>) -> Self {
        self.provider = provider;
        self
    }

    /// Report audit events to `audit`.
    #[must_use]
    pub fn with_audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// Validate the configuration and build the vault.
    ///
    /// # Errors
    /// Returns [`CoreError::ConfigurationError`](qsdv_core::CoreError::ConfigurationError)
    /// if the configuration is invalid.
    pub fn build(self) -> Result<Vault> {
        self.config.validate()?;
        let keys = KeyManager::with_audit(self.provider, self.config.key_manager.clone(), self.audit)?;
        let codec = EnvelopeCodec::new(keys, self.config.envelope.clone())?;
        info!(
            kem_algorithm = %self.config.key_manager.kem_algorithm,
            sig_algorithm = %self.config.key_manager.sig_algorithm,
            key_lifetime_secs = ?self.config.key_manager.key_lifetime.map(|d| d.as_secs()),
            sign_envelopes = self.config.envelope.sign_envelopes,
            require_signature = self.config.envelope.requires_signature(),
            "Vault initialized"
        );
        Ok(Vault { codec })
    }
}

impl Vault {
    /// Vault with default configuration (ML-KEM-768, ML-DSA-65, 30-day keys, signed envelopes).
    ///
    /// # Errors
    /// Never fails with the default configuration; the `Result` mirrors [`Vault::from_config`].
    pub fn new() -> Result<Self> {
        Self::from_config(VaultConfig::default())
    }

    /// Vault from a runtime configuration.
    ///
    /// # Errors
    /// Returns [`CoreError::ConfigurationError`](qsdv_core::CoreError::ConfigurationError)
    /// if `config` is invalid.
    pub fn from_config(config: VaultConfig) -> Result<Self> {
        VaultBuilder::new(config).build()
    }

    /// Vault from serialized settings.
    ///
    /// # Errors
    /// Returns [`CoreError::ConfigurationError`](qsdv_core::CoreError::ConfigurationError)
    /// for invalid settings.
    pub fn from_settings(settings: VaultSettings) -> Result<Self> {
        Self::from_config(VaultConfig::try_from(settings)?)
    }

    /// Vault from JSON settings.
    ///
    /// # Errors
    /// Returns [`CoreError::SerializationError`](qsdv_core::CoreError::SerializationError)
    /// for malformed JSON and
    /// [`CoreError::ConfigurationError`](qsdv_core::CoreError::ConfigurationError)
    /// for invalid settings.
    pub fn from_json(json: &str) -> Result<Self> {
        Self::from_config(VaultConfig::from_json(json)?)
    }

    /// Builder for a vault with a custom provider or audit sink.
    #[must_use]
    pub fn builder(config: VaultConfig) -> VaultBuilder {
        VaultBuilder::new(config)
    }

    /// Encrypt with the configured signing default.
    ///
    /// # Errors
    /// See [`EnvelopeCodec::encrypt`].
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<EncryptedEnvelope> {
        self.codec.encrypt(plaintext, EncryptOptions::new())
    }

    /// Encrypt with per-call options.
    ///
    /// # Errors
    /// See [`EnvelopeCodec::encrypt`].
    pub fn encrypt_with(&self, plaintext: &[u8], options: EncryptOptions) -> Result<EncryptedEnvelope> {
        self.codec.encrypt(plaintext, options)
    }

    /// Decrypt an envelope.
    ///
    /// # Errors
    /// See [`EnvelopeCodec::decrypt`].
    pub fn decrypt(&self, envelope: &EncryptedEnvelope) -> Result<Vec<u8>> {
        self.codec.decrypt(envelope)
    }

    /// Encrypt straight to the binary envelope format.
    ///
    /// # Errors
    /// See [`EnvelopeCodec::encrypt`] and [`EncryptedEnvelope::to_bytes`].
    pub fn encrypt_to_bytes(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        self.encrypt(plaintext)?.to_bytes()
    }

    /// Decrypt a binary envelope.
    ///
    /// # Errors
    /// [`CoreError::MalformedEnvelope`](qsdv_core::CoreError::MalformedEnvelope)
    /// for undecodable bytes, otherwise see
    /// [`EnvelopeCodec::decrypt`].
    pub fn decrypt_bytes(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        self.decrypt(&EncryptedEnvelope::from_bytes(bytes)?)
    }

    /// Force a new current key for `family`; existing envelopes stay decryptable.
    ///
    /// # Errors
    /// Returns the generation error.
    pub fn rotate(&self, family: KeyFamily) -> Result<String> {
        Ok(self.keys().rotate(family)?.version().to_string())
    }

    /// Remove a retained, non-current key. Envelopes naming it no longer decrypt.
    ///
    /// # Errors
    /// [`CoreError::KeyInUse`](qsdv_core::CoreError::KeyInUse) for a current key,
    /// [`CoreError::KeyNotFound`](qsdv_core::CoreError::KeyNotFound) for an unknown one.
    pub fn purge(&self, version: &str) -> Result<()> {
        self.keys().purge(version)
    }

    /// Every retained key, private keys included, for an external key store.
    ///
    /// See [`KeyManager::export_keys`].
    #[must_use]
    pub fn export_keys(&self) -> Vec<StoredKey> {
        self.keys().export_keys()
    }

    /// Load keys saved with [`Vault::export_keys`] into this fresh vault.
    ///
    /// # Errors
    /// See [`KeyManager::restore`].
    pub fn restore_keys(&self, records: Vec<StoredKey>) -> Result<usize> {
        self.keys().restore(records)
    }

    /// Public information about the current key of `family`; never generates.
    #[must_use]
    pub fn public_info(&self, family: KeyFamily) -> Option<PublicKeyInfo> {
        self.keys().get_current_public_info(family)
    }

    /// Snapshot of key configuration and every retained key.
    #[must_use]
    pub fn status(&self) -> KeyManagerStatus {
        self.keys().status()
    }

    /// Encrypt-then-decrypt diagnostic.
    #[must_use]
    pub fn self_test(&self, data: &[u8]) -> SelfTestReport {
        self.codec.self_test(data)
    }

    /// The underlying key manager.
    #[must_use]
    pub fn keys(&self) -> &KeyManager {
        self.codec.key_manager()
    }

    /// The underlying codec.
    #[must_use]
    pub fn codec(&self) -> &EnvelopeCodec {
        &self.codec
    }
}

impl std::fmt::Debug for VaultBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultBuilder").field("config", &self.config).finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use qsdv_core::{AuditOperation, CoreError, MemoryAuditSink};
    use qsdv_primitives::KemAlgorithm;

    #[test]
    fn test_from_json_settings() {
        let vault = Vault::from_json(r#"{"security_level":1,"sign_envelopes":false}"#).unwrap();
        assert_eq!(vault.keys().config().kem_algorithm, KemAlgorithm::MlKem512);
        assert!(!vault.codec().config().sign_envelopes);
    }

    #[test]
    fn test_invalid_settings_rejected() {
        assert!(matches!(Vault::from_json(r#"{"security_level":9}"#), Err(CoreError::ConfigurationError(_))));
        assert!(matches!(Vault::from_json(r#"{"unknown":1}"#), Err(CoreError::SerializationError(_))));
    }

    #[test]
    fn test_builder_audit_sink_receives_events() {
        let sink = Arc::new(MemoryAuditSink::new(16));
        let vault = Vault::builder(VaultConfig::for_security_level(1)).with_audit(sink.clone()).build().unwrap();
        let bytes = vault.encrypt_to_bytes(b"x").unwrap();
        assert_eq!(vault.decrypt_bytes(&bytes).unwrap(), b"x");
        assert_eq!(sink.events_for(AuditOperation::Encrypt).len(), 1);
        assert_eq!(sink.events_for(AuditOperation::Decrypt).len(), 1);
    }

    #[test]
    fn test_restore_keys_into_used_vault_rejected() {
        let vault = Vault::from_config(VaultConfig::for_security_level(1)).unwrap();
        vault.encrypt(b"x").unwrap();
        let records = vault.export_keys();
        assert_eq!(records.len(), 2);
        assert!(matches!(vault.restore_keys(records), Err(CoreError::ConfigurationError(_))));
    }
}
