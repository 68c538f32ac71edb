//! Configuration types for QSDV.
//!
//! Runtime configuration is builder-style and validated before use:
//!
//! - [`KeyManagerConfig`]: algorithms and key lifetime
//! - [`EnvelopeConfig`]: envelope defaults (signing, signature policy, KDF label,
//!   generation deadline)
//! - [`VaultConfig`]: both of the above
//!
//! [`VaultSettings`] is the serde-facing form, loadable from JSON, using the
//! property names of the deployed service (`kem_algorithm`, `sig_algorithm`,
//! `key_rotation_days`, `security_level`, ...). It accepts legacy algorithm
//! names such as `Kyber768` and is converted with `TryFrom`.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]

use qsdv_primitives::{KemAlgorithm, SignatureAlgorithm};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{CoreError, Result};

/// Default key lifetime: 30 days.
pub const DEFAULT_KEY_LIFETIME: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Default HKDF context label for envelope keys.
pub const DEFAULT_KDF_LABEL: &str = "QSDV-Envelope-v1";

/// Default NIST security level.
pub const DEFAULT_SECURITY_LEVEL: u8 = 3;

/// Longest key lifetime accepted (100 years); keeps expiry arithmetic in range.
const MAX_KEY_LIFETIME: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Key manager configuration.
///
/// # Examples
/// ```rust
/// use qsdv_core::config::KeyManagerConfig;
/// use qsdv_primitives::KemAlgorithm;
/// use std::time::Duration;
///
/// let config = KeyManagerConfig::for_security_level(5)
///     .with_key_lifetime(Some(Duration::from_secs(7 * 24 * 3600)))
///     .build()
///     .expect("valid config");
/// assert_eq!(config.kem_algorithm, KemAlgorithm::MlKem1024);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyManagerConfig {
    /// KEM algorithm for newly generated keys.
    /// Default: ML-KEM-768
    pub kem_algorithm: KemAlgorithm,
    /// Signature algorithm for newly generated keys.
    /// Default: ML-DSA-65
    pub sig_algorithm: SignatureAlgorithm,
    /// How long a key may serve as current; `None` disables expiry.
    /// Default: 30 days
    pub key_lifetime: Option<Duration>,
}

impl Default for KeyManagerConfig {
    fn default() -> Self {
        Self {
            kem_algorithm: KemAlgorithm::default(),
            sig_algorithm: SignatureAlgorithm::default(),
            key_lifetime: Some(DEFAULT_KEY_LIFETIME),
        }
    }
}

impl KeyManagerConfig {
    /// Create a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Recommended algorithms for a NIST security level (unknown levels use level 3).
    #[must_use]
    pub fn for_security_level(level: u8) -> Self {
        Self {
            kem_algorithm: KemAlgorithm::recommended_for_level(level),
            sig_algorithm: SignatureAlgorithm::recommended_for_level(level),
            ..Self::default()
        }
    }

    /// Set the KEM algorithm.
    #[must_use]
    pub fn with_kem_algorithm(mut self, algorithm: KemAlgorithm) -> Self {
        self.kem_algorithm = algorithm;
        self
    }

    /// Set the signature algorithm.
    #[must_use]
    pub fn with_sig_algorithm(mut self, algorithm: SignatureAlgorithm) -> Self {
        self.sig_algorithm = algorithm;
        self
    }

    /// Set the key lifetime; `None` disables expiry.
    #[must_use]
    pub fn with_key_lifetime(mut self, lifetime: Option<Duration>) -> Self {
        self.key_lifetime = lifetime;
        self
    }

    /// Validate and return the configuration.
    ///
    /// # Errors
    ///
    /// See [`KeyManagerConfig::validate`].
    pub fn build(self) -> Result<Self> {
        self.validate()?;
        Ok(self)
    }

    /// Validates the configuration settings.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ConfigurationError`] if the key lifetime is zero or
    /// longer than 100 years.
    pub fn validate(&self) -> Result<()> {
        if let Some(lifetime) = self.key_lifetime {
            if lifetime.is_zero() {
                return Err(CoreError::ConfigurationError("Key lifetime must be non-zero".to_string()));
            }
            if lifetime > MAX_KEY_LIFETIME {
                return Err(CoreError::ConfigurationError(format!(
                    "Key lifetime of {} days exceeds the 100 year maximum",
                    lifetime.as_secs() / 86_400
                )));
            }
        }
        Ok(())
    }
}

/// Envelope codec configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvelopeConfig {
    /// Whether envelopes are signed unless the caller overrides it per call.
    /// Default: `true`
    pub sign_envelopes: bool,
    /// Whether decryption rejects unsigned envelopes; `None` follows
    /// `sign_envelopes`.
    /// Default: `None`
    pub require_signature: Option<bool>,
    /// HKDF context label; the KDF info is `label || 0x00 || KEM algorithm name`.
    /// Default: `QSDV-Envelope-v1`
    pub kdf_label: String,
    /// Deadline for waiting on key generation during encryption; `None` waits
    /// indefinitely.
    /// Default: `None`
    pub generation_timeout: Option<Duration>,
}

impl Default for EnvelopeConfig {
    fn default() -> Self {
        Self {
            sign_envelopes: true,
            require_signature: None,
            kdf_label: DEFAULT_KDF_LABEL.to_string(),
            generation_timeout: None,
        }
    }
}

impl EnvelopeConfig {
    /// Create a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable signing by default.
    #[must_use]
    pub fn with_signing(mut self, enabled: bool) -> Self {
        self.sign_envelopes = enabled;
        self
    }

    /// Require (or stop requiring) a valid signature on every decrypted envelope.
    #[must_use]
    pub fn with_required_signature(mut self, required: bool) -> Self {
        self.require_signature = Some(required);
        self
    }

    /// Effective decrypt policy: whether unsigned envelopes are rejected.
    #[must_use]
    pub fn requires_signature(&self) -> bool {
        self.require_signature.unwrap_or(self.sign_envelopes)
    }

    /// Set the KDF context label.
    #[must_use]
    pub fn with_kdf_label(mut self, label: impl Into<String>) -> Self {
        self.kdf_label = label.into();
        self
    }

    /// Set the generation deadline.
    #[must_use]
    pub fn with_generation_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.generation_timeout = timeout;
        self
    }

    /// Validate and return the configuration.
    ///
    /// # Errors
    ///
    /// See [`EnvelopeConfig::validate`].
    pub fn build(self) -> Result<Self> {
        self.validate()?;
        Ok(self)
    }

    /// Validates the configuration settings.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ConfigurationError`] if the KDF label is empty or
    /// contains a NUL byte, if the generation timeout is zero, or if signatures
    /// are required while envelopes are unsigned by default.
    pub fn validate(&self) -> Result<()> {
        if self.require_signature == Some(true) && !self.sign_envelopes {
            return Err(CoreError::ConfigurationError(
                "Signatures cannot be required when envelopes are unsigned by default".to_string(),
            ));
        }
        if self.kdf_label.is_empty() {
            return Err(CoreError::ConfigurationError("KDF label must not be empty".to_string()));
        }
        if self.kdf_label.as_bytes().contains(&0) {
            return Err(CoreError::ConfigurationError("KDF label must not contain NUL".to_string()));
        }
        if self.generation_timeout.is_some_and(|t| t.is_zero()) {
            return Err(CoreError::ConfigurationError(
                "Generation timeout must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Complete configuration for a vault (key manager plus envelope codec).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VaultConfig {
    /// Key manager settings.
    pub key_manager: KeyManagerConfig,
    /// Envelope codec settings.
    pub envelope: EnvelopeConfig,
}

impl VaultConfig {
    /// Create a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Recommended algorithms for a NIST security level.
    #[must_use]
    pub fn for_security_level(level: u8) -> Self {
        Self { key_manager: KeyManagerConfig::for_security_level(level), envelope: EnvelopeConfig::default() }
    }

    /// Replace the key manager settings.
    #[must_use]
    pub fn with_key_manager(mut self, config: KeyManagerConfig) -> Self {
        self.key_manager = config;
        self
    }

    /// Replace the envelope settings.
    #[must_use]
    pub fn with_envelope(mut self, config: EnvelopeConfig) -> Self {
        self.envelope = config;
        self
    }

    /// Validates both halves.
    ///
    /// # Errors
    ///
    /// Returns the first [`CoreError::ConfigurationError`] found.
    pub fn validate(&self) -> Result<()> {
        self.key_manager.validate()?;
        self.envelope.validate()
    }

    /// Parse [`VaultSettings`] JSON and convert it.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::SerializationError`] for malformed JSON and
    /// [`CoreError::ConfigurationError`] for invalid values.
    pub fn from_json(json: &str) -> Result<Self> {
        VaultSettings::from_json(json)?.try_into()
    }
}

fn default_security_level() -> u8 {
    DEFAULT_SECURITY_LEVEL
}

fn default_rotation_days() -> Option<u32> {
    Some(30)
}

fn default_sign_envelopes() -> bool {
    true
}

/// Serializable settings, mirroring the deployed service's properties.
///
/// Explicit algorithm names take precedence over `security_level`. A
/// `key_rotation_days` of `null` disables expiry.
///
/// ```rust
/// use qsdv_core::config::{VaultConfig, VaultSettings};
///
/// let settings = VaultSettings::from_json(r#"{ "kem_algorithm": "Kyber1024", "key_rotation_days": 7 }"#)?;
/// let config = VaultConfig::try_from(settings)?;
/// assert_eq!(config.key_manager.kem_algorithm.name(), "ML-KEM-1024");
/// # Ok::<(), qsdv_core::CoreError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VaultSettings {
    /// KEM algorithm name (canonical or legacy); defaults from `security_level`.
    #[serde(default)]
    pub kem_algorithm: Option<String>,
    /// Signature algorithm name (canonical or legacy); defaults from `security_level`.
    #[serde(default)]
    pub sig_algorithm: Option<String>,
    /// Key lifetime in days; `null` disables expiry.
    #[serde(default = "default_rotation_days")]
    pub key_rotation_days: Option<u32>,
    /// NIST security level (1-5).
    #[serde(default = "default_security_level")]
    pub security_level: u8,
    /// Whether envelopes are signed by default.
    #[serde(default = "default_sign_envelopes")]
    pub sign_envelopes: bool,
    /// Whether decryption rejects unsigned envelopes; defaults to `sign_envelopes`.
    #[serde(default)]
    pub require_signature: Option<bool>,
    /// Generation deadline in milliseconds.
    #[serde(default)]
    pub generation_timeout_ms: Option<u64>,
}

impl Default for VaultSettings {
    fn default() -> Self {
        Self {
            kem_algorithm: None,
            sig_algorithm: None,
            key_rotation_days: default_rotation_days(),
            security_level: DEFAULT_SECURITY_LEVEL,
            sign_envelopes: true,
            require_signature: None,
            generation_timeout_ms: None,
        }
    }
}

impl VaultSettings {
    /// Parse settings from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::SerializationError`] if the JSON is malformed or has unknown fields.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl TryFrom<VaultSettings> for VaultConfig {
    type Error = CoreError;

    fn try_from(settings: VaultSettings) -> Result<Self> {
        if !(1..=5).contains(&settings.security_level) {
            return Err(CoreError::ConfigurationError(format!(
                "Security level must be between 1 and 5, got {}",
                settings.security_level
            )));
        }

        let kem_algorithm = match settings.kem_algorithm.as_deref() {
            Some(name) => name.parse::<KemAlgorithm>().map_err(|e| CoreError::ConfigurationError(e.to_string()))?,
            None => KemAlgorithm::recommended_for_level(settings.security_level),
        };
        let sig_algorithm = match settings.sig_algorithm.as_deref() {
            Some(name) => {
                name.parse::<SignatureAlgorithm>().map_err(|e| CoreError::ConfigurationError(e.to_string()))?
            }
            None => SignatureAlgorithm::recommended_for_level(settings.security_level),
        };
        let key_lifetime =
            settings.key_rotation_days.map(|days| Duration::from_secs(u64::from(days) * 86_400));

        let config = VaultConfig {
            key_manager: KeyManagerConfig { kem_algorithm, sig_algorithm, key_lifetime },
            envelope: EnvelopeConfig {
                sign_envelopes: settings.sign_envelopes,
                require_signature: settings.require_signature,
                generation_timeout: settings.generation_timeout_ms.map(Duration::from_millis),
                ..EnvelopeConfig::default()
            },
        };
        config.validate()?;
        Ok(config)
    }
}
