#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]

//! Encrypted envelope model and its encodings.
//!
//! # Binary format (big-endian)
//!
//! ```text
//! magic "QSDV" (4) | format version u8 = 1
//! kem algorithm id u8 | signature algorithm id u8 (0 = none)
//! kem key version  : u16 length + UTF-8
//! sig key version  : u16 length + UTF-8 (length 0 = none)
//! encapsulated key : u32 length + bytes
//! iv               : u32 length + bytes
//! ciphertext       : u32 length + bytes
//! signature        : u32 length + bytes (length 0 = none)
//! ```
//!
//! Decoding is strict: bad magic, unknown format version or algorithm ids,
//! partial signature metadata, truncated fields and trailing bytes are all
//! [`CoreError::MalformedEnvelope`].
//!
//! # JSON format
//!
//! [`SerializableEnvelope`] carries the same fields with Base64 byte strings
//! and canonical algorithm names, for collaborators storing envelopes in
//! text columns.

use qsdv_core::serialization::{decode_base64, encode_base64};
use qsdv_core::{CoreError, Result};
use qsdv_primitives::{KemAlgorithm, SignatureAlgorithm};
use serde::{Deserialize, Serialize};

/// Magic prefix of the binary encoding.
pub const ENVELOPE_MAGIC: &[u8; 4] = b"QSDV";

/// Current binary and JSON format version.
pub const ENVELOPE_FORMAT_VERSION: u8 = 1;

/// Signature metadata of a signed envelope.
///
/// Algorithm, key version and signature bytes are present together or not at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvelopeSignature {
    /// Signature algorithm.
    pub algorithm: SignatureAlgorithm,
    /// Version of the signature key that produced `signature`.
    pub key_version: String,
    /// Signature over exactly the envelope ciphertext.
    pub signature: Vec<u8>,
}

/// A self-describing hybrid-encrypted payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedEnvelope {
    /// AES-256-GCM ciphertext with the 16-byte tag appended.
    pub ciphertext: Vec<u8>,
    /// KEM ciphertext encapsulating the shared secret.
    pub encapsulated_key: Vec<u8>,
    /// 12-byte AES-GCM IV.
    pub iv: Vec<u8>,
    /// KEM algorithm used for encapsulation.
    pub kem_algorithm: KemAlgorithm,
    /// Version of the KEM key the shared secret was encapsulated to.
    pub kem_key_version: String,
    /// Signature over `ciphertext`, if the envelope is signed.
    pub signature: Option<EnvelopeSignature>,
}

impl EncryptedEnvelope {
    /// Whether the envelope carries a signature.
    #[must_use]
    pub fn is_signed(&self) -> bool {
        self.signature.is_some()
    }

    /// Version of the signature key, if signed.
    #[must_use]
    pub fn sig_key_version(&self) -> Option<&str> {
        self.signature.as_ref().map(|s| s.key_version.as_str())
    }

    /// Signature algorithm, if signed.
    #[must_use]
    pub fn sig_algorithm(&self) -> Option<SignatureAlgorithm> {
        self.signature.as_ref().map(|s| s.algorithm)
    }

    /// Bytes added on top of the plaintext by the envelope (excluding framing).
    #[must_use]
    pub fn overhead(&self, plaintext_len: usize) -> usize {
        let sig_len = self.signature.as_ref().map_or(0, |s| s.signature.len());
        (self.ciphertext.len() + self.encapsulated_key.len() + self.iv.len() + sig_len)
            .saturating_sub(plaintext_len)
    }

    /// Encode to the binary format.
    ///
    /// # Errors
    /// Returns [`CoreError::MalformedEnvelope`] if a key version is empty or
    /// longer than `u16::MAX` bytes, or a byte field exceeds `u32::MAX` bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        if self.kem_key_version.is_empty() {
            return Err(malformed("empty KEM key version"));
        }
        if self.signature.as_ref().is_some_and(|s| s.key_version.is_empty() || s.signature.is_empty()) {
            return Err(malformed("signed envelope with empty signature key version or signature"));
        }

        let sig = self.signature.as_ref();
        let sig_version = sig.map_or("", |s| s.key_version.as_str());
        let sig_bytes: &[u8] = sig.map_or(&[], |s| s.signature.as_slice());

        let mut out = Vec::with_capacity(
            4 + 3
                + 2 * 2
                + self.kem_key_version.len()
                + sig_version.len()
                + 4 * 4
                + self.encapsulated_key.len()
                + self.iv.len()
                + self.ciphertext.len()
                + sig_bytes.len(),
        );
        out.extend_from_slice(ENVELOPE_MAGIC);
        out.push(ENVELOPE_FORMAT_VERSION);
        out.push(self.kem_algorithm.wire_id());
        out.push(sig.map_or(0, |s| s.algorithm.wire_id()));
        put_short(&mut out, "kem key version", self.kem_key_version.as_bytes())?;
        put_short(&mut out, "sig key version", sig_version.as_bytes())?;
        put_long(&mut out, "encapsulated key", &self.encapsulated_key)?;
        put_long(&mut out, "iv", &self.iv)?;
        put_long(&mut out, "ciphertext", &self.ciphertext)?;
        put_long(&mut out, "signature", sig_bytes)?;
        Ok(out)
    }

    /// Decode from the binary format.
    ///
    /// # Errors
    /// Returns [`CoreError::MalformedEnvelope`] for any structural defect.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut r = Reader::new(bytes);

        if r.take(ENVELOPE_MAGIC.len(), "magic")? != ENVELOPE_MAGIC {
            return Err(malformed("bad magic"));
        }
        let format = r.u8("format version")?;
        if format != ENVELOPE_FORMAT_VERSION {
            return Err(malformed(format!("unsupported format version {}", format)));
        }
        let kem_id = r.u8("kem algorithm id")?;
        let kem_algorithm = KemAlgorithm::from_wire_id(kem_id)
            .ok_or_else(|| malformed(format!("unknown KEM algorithm id {}", kem_id)))?;
        let sig_id = r.u8("signature algorithm id")?;

        let kem_key_version = r.string("kem key version")?;
        if kem_key_version.is_empty() {
            return Err(malformed("empty KEM key version"));
        }
        let sig_key_version = r.string("sig key version")?;
        let encapsulated_key = r.long("encapsulated key")?.to_vec();
        let iv = r.long("iv")?.to_vec();
        let ciphertext = r.long("ciphertext")?.to_vec();
        let signature_bytes = r.long("signature")?.to_vec();
        r.finish()?;

        let signature = match (sig_id, sig_key_version.is_empty(), signature_bytes.is_empty()) {
            (0, true, true) => None,
            (0, _, _) | (_, true, _) | (_, _, true) => {
                return Err(malformed("signature algorithm, key version and bytes must be all present or all absent"));
            }
            (id, false, false) => Some(EnvelopeSignature {
                algorithm: SignatureAlgorithm::from_wire_id(id)
                    .ok_or_else(|| malformed(format!("unknown signature algorithm id {}", id)))?,
                key_version: sig_key_version,
                signature: signature_bytes,
            }),
        };

        Ok(Self { ciphertext, encapsulated_key, iv, kem_algorithm, kem_key_version, signature })
    }

    /// Encode to the JSON form.
    ///
    /// # Errors
    /// Returns [`CoreError::SerializationError`] if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&SerializableEnvelope::from(self))?)
    }

    /// Decode from the JSON form.
    ///
    /// # Errors
    /// Returns [`CoreError::SerializationError`] for invalid JSON or Base64 and
    /// [`CoreError::MalformedEnvelope`] for inconsistent fields.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str::<SerializableEnvelope>(json)?.try_into()
    }
}

/// JSON-friendly envelope: Base64 byte fields and canonical algorithm names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializableEnvelope {
    /// Format version (1).
    pub format_version: u8,
    /// KEM algorithm name.
    pub kem_algorithm: String,
    /// KEM key version.
    pub kem_key_version: String,
    /// Base64-encoded encapsulated key.
    pub encapsulated_key: String,
    /// Base64-encoded IV.
    pub iv: String,
    /// Base64-encoded ciphertext.
    pub ciphertext: String,
    /// Signature algorithm name, if signed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sig_algorithm: Option<String>,
    /// Signature key version, if signed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sig_key_version: Option<String>,
    /// Base64-encoded signature, if signed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

impl From<&EncryptedEnvelope> for SerializableEnvelope {
    fn from(envelope: &EncryptedEnvelope) -> Self {
        let sig = envelope.signature.as_ref();
        Self {
            format_version: ENVELOPE_FORMAT_VERSION,
            kem_algorithm: envelope.kem_algorithm.name().to_string(),
            kem_key_version: envelope.kem_key_version.clone(),
            encapsulated_key: encode_base64(&envelope.encapsulated_key),
            iv: encode_base64(&envelope.iv),
            ciphertext: encode_base64(&envelope.ciphertext),
            sig_algorithm: sig.map(|s| s.algorithm.name().to_string()),
            sig_key_version: sig.map(|s| s.key_version.clone()),
            signature: sig.map(|s| encode_base64(&s.signature)),
        }
    }
}

impl TryFrom<SerializableEnvelope> for EncryptedEnvelope {
    type Error = CoreError;

    fn try_from(value: SerializableEnvelope) -> Result<Self> {
        if value.format_version != ENVELOPE_FORMAT_VERSION {
            return Err(malformed(format!("unsupported format version {}", value.format_version)));
        }
        if value.kem_key_version.is_empty() {
            return Err(malformed("empty KEM key version"));
        }
        let kem_algorithm: KemAlgorithm =
            value.kem_algorithm.parse().map_err(|e| malformed(format!("kem_algorithm: {}", e)))?;

        let signature = match (value.sig_algorithm, value.sig_key_version, value.signature) {
            (None, None, None) => None,
            (Some(algorithm), Some(key_version), Some(signature)) if !key_version.is_empty() => {
                let signature = decode_base64("signature", &signature)?;
                if signature.is_empty() {
                    return Err(malformed("empty signature"));
                }
                Some(EnvelopeSignature {
                    algorithm: algorithm.parse().map_err(|e| malformed(format!("sig_algorithm: {}", e)))?,
                    key_version,
                    signature,
                })
            }
            _ => {
                return Err(malformed("signature algorithm, key version and bytes must be all present or all absent"));
            }
        };

        Ok(Self {
            ciphertext: decode_base64("ciphertext", &value.ciphertext)?,
            encapsulated_key: decode_base64("encapsulated_key", &value.encapsulated_key)?,
            iv: decode_base64("iv", &value.iv)?,
            kem_algorithm,
            kem_key_version: value.kem_key_version,
            signature,
        })
    }
}

fn malformed(reason: impl Into<String>) -> CoreError {
    CoreError::MalformedEnvelope(reason.into())
}

fn put_short(out: &mut Vec<u8>, field: &str, bytes: &[u8]) -> Result<()> {
    let len = u16::try_from(bytes.len()).map_err(|_| malformed(format!("{} too long", field)))?;
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(bytes);
    Ok(())
}

fn put_long(out: &mut Vec<u8>, field: &str, bytes: &[u8]) -> Result<()> {
    let len = u32::try_from(bytes.len()).map_err(|_| malformed(format!("{} too long", field)))?;
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(bytes);
    Ok(())
}

/// Bounds-checked cursor over envelope bytes.
struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take(&mut self, n: usize, field: &str) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(n).filter(|&end| end <= self.buf.len());
        match end.and_then(|end| self.buf.get(self.pos..end)) {
            Some(slice) => {
                self.pos += n;
                Ok(slice)
            }
            None => Err(malformed(format!("truncated {}", field))),
        }
    }

    fn u8(&mut self, field: &str) -> Result<u8> {
        Ok(self.take(1, field)?[0])
    }

    fn short(&mut self, field: &str) -> Result<&'a [u8]> {
        let raw = self.take(2, field)?;
        let len = u16::from_be_bytes([raw[0], raw[1]]);
        self.take(usize::from(len), field)
    }

    fn long(&mut self, field: &str) -> Result<&'a [u8]> {
        let raw = self.take(4, field)?;
        let len = u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]);
        let len = usize::try_from(len).map_err(|_| malformed(format!("{} too long", field)))?;
        self.take(len, field)
    }

    fn string(&mut self, field: &str) -> Result<String> {
        let raw = self.short(field)?;
        String::from_utf8(raw.to_vec()).map_err(|_| malformed(format!("{} is not UTF-8", field)))
    }

    fn finish(self) -> Result<()> {
        if self.pos == self.buf.len() {
            Ok(())
        } else {
            Err(malformed(format!("{} trailing bytes", self.buf.len() - self.pos)))
        }
    }
}
