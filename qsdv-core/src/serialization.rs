#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]

//! Serialization utilities for binary fields.
//!
//! Binary values (public keys, ciphertexts, signatures) are carried as
//! standard Base64 strings in every JSON form this workspace produces.

use base64::{Engine, engine::general_purpose::STANDARD as BASE64_ENGINE};

use crate::error::{CoreError, Result};

/// Encode bytes as standard Base64.
#[must_use]
pub fn encode_base64(data: &[u8]) -> String {
    BASE64_ENGINE.encode(data)
}

/// Decode a standard Base64 string, naming `field` in the error.
///
/// # Errors
///
/// Returns [`CoreError::SerializationError`] if `encoded` is not valid Base64.
pub fn decode_base64(field: &str, encoded: &str) -> Result<Vec<u8>> {
    BASE64_ENGINE
        .decode(encoded)
        .map_err(|e| CoreError::SerializationError(format!("invalid base64 in {}: {}", field, e)))
}

/// `#[serde(with = "...")]` adapter storing `Vec<u8>` as a Base64 string.
pub mod base64_bytes {
    use base64::{Engine, engine::general_purpose::STANDARD as BASE64_ENGINE};
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serialize bytes as Base64.
    ///
    /// # Errors
    /// Propagates serializer errors.
    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&BASE64_ENGINE.encode(bytes))
    }

    /// Deserialize bytes from Base64.
    ///
    /// # Errors
    /// Fails if the input is not a valid Base64 string.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        BASE64_ENGINE.decode(encoded.as_bytes()).map_err(serde::de::Error::custom)
    }
}

/// `#[serde(with = "...")]` adapter storing [`SecretBytes`](qsdv_primitives::SecretBytes)
/// as a Base64 string. Intermediate encodings are zeroized.
pub mod base64_secret {
    use base64::{Engine, engine::general_purpose::STANDARD as BASE64_ENGINE};
    use qsdv_primitives::SecretBytes;
    use serde::{Deserialize, Deserializer, Serializer};
    use zeroize::Zeroizing;

    /// Serialize secret bytes as Base64.
    ///
    /// # Errors
    /// Propagates serializer errors.
    pub fn serialize<S: Serializer>(secret: &SecretBytes, serializer: S) -> Result<S::Ok, S::Error> {
        let encoded = Zeroizing::new(BASE64_ENGINE.encode(secret.as_slice()));
        serializer.serialize_str(&encoded)
    }

    /// Deserialize secret bytes from Base64.
    ///
    /// # Errors
    /// Fails if the input is not a valid Base64 string.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SecretBytes, D::Error> {
        let encoded = Zeroizing::new(String::deserialize(deserializer)?);
        BASE64_ENGINE.decode(encoded.as_bytes()).map(SecretBytes::new).map_err(serde::de::Error::custom)
    }
}
