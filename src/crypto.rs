//! Decryption of the time-keyed XOR envelope returned by Bunkr's `/api/vs`.
//!
//! The key is `SECRET_KEY_` followed by the envelope timestamp truncated to
//! the hour, so an envelope must be decrypted with the timestamp it was
//! issued with. There is no checksum: a stale or wrong key yields garbage
//! rather than an error, and callers treat whatever comes out as the link.

use base64::alphabet;
use base64::engine::general_purpose::GeneralPurposeConfig;
use base64::engine::{DecodePaddingMode, GeneralPurpose};
use base64::Engine;
use serde::Deserialize;
use serde_json::Number;
use thiserror::Error;

pub const SECRET_KEY_PREFIX: &str = "SECRET_KEY_";

/// Standard alphabet, tolerant of missing or present padding.
const ENVELOPE_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Debug, Error)]
pub enum DecryptError {
    #[error("encryption envelope is missing `{0}`")]
    MissingField(&'static str),

    #[error("encrypted url is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// `{"url": <base64>, "timestamp": <unix seconds>}` as returned by the
/// encryption-data endpoint. Both fields are optional on the wire so that a
/// partial response is reported as [`DecryptError::MissingField`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EncryptionEnvelope {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub timestamp: Option<Number>,
}

impl EncryptionEnvelope {
    #[cfg(test)]
    pub fn new(url: impl Into<String>, timestamp: i64) -> Self {
        Self {
            url: Some(url.into()),
            timestamp: Some(Number::from(timestamp)),
        }
    }

    fn timestamp_secs(&self) -> Option<i64> {
        let ts = self.timestamp.as_ref()?;
        ts.as_i64().or_else(|| ts.as_f64().map(|f| f.floor() as i64))
    }
}

/// Key for a given issue time: prefix + `floor(timestamp / 3600)`.
pub fn derive_key(timestamp: i64) -> String {
    format!("{}{}", SECRET_KEY_PREFIX, timestamp.div_euclid(3600))
}

/// XOR `data` with `key`, cycling the key byte-wise. Symmetric.
pub fn xor_cycle(data: &[u8], key: &[u8]) -> Vec<u8> {
    if key.is_empty() {
        return data.to_vec();
    }
    data.iter()
        .zip(key.iter().cycle())
        .map(|(d, k)| d ^ k)
        .collect()
}

/// Recover the direct URL from an envelope.
pub fn decrypt(envelope: &EncryptionEnvelope) -> Result<String, DecryptError> {
    let payload = envelope
        .url
        .as_deref()
        .ok_or(DecryptError::MissingField("url"))?;
    let timestamp = envelope
        .timestamp_secs()
        .ok_or(DecryptError::MissingField("timestamp"))?;

    let encrypted = ENVELOPE_BASE64.decode(payload.trim())?;
    let key = derive_key(timestamp);
    let plain = xor_cycle(&encrypted, key.as_bytes());
    Ok(String::from_utf8_lossy(&plain).into_owned())
}

/// Inverse of [`decrypt`]; used to build fixtures.
#[cfg(test)]
pub(crate) fn encrypt(url: &str, timestamp: i64) -> EncryptionEnvelope {
    let key = derive_key(timestamp);
    let cipher = xor_cycle(url.as_bytes(), key.as_bytes());
    EncryptionEnvelope::new(base64::engine::general_purpose::STANDARD.encode(cipher), timestamp)
}
