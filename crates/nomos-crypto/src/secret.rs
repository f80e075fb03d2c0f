// SPDX-License-Identifier: MIT OR Apache-2.0
//! AES-256-GCM encryption for `Secret`-tagged leaves.
//!
//! Ciphertext is rendered as `base64(nonce‖GCM_ciphertext)`, with a fresh
//! random 12-byte nonce generated per call. Non-string payloads are
//! JSON-serialized (via [`nomos_core::Value::to_json`]) before
//! encryption so the ciphertext always wraps a UTF-8 byte string.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use nomos_core::Value;
use rand::RngCore;
use thiserror::Error;

/// Length of an AES-256 key, in bytes.
pub const KEY_LEN: usize = 32;
/// Length of a GCM nonce, in bytes.
const NONCE_LEN: usize = 12;

/// Errors from secret encryption/decryption.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// The supplied key was not exactly [`KEY_LEN`] bytes.
    #[error("encryption key must be {KEY_LEN} bytes, got {got}")]
    BadKeyLength {
        /// The length actually supplied.
        got: usize,
    },

    /// The ciphertext was not valid base64.
    #[error("ciphertext is not valid base64: {0}")]
    BadBase64(#[from] base64::DecodeError),

    /// The ciphertext was shorter than a nonce.
    #[error("ciphertext too short to contain a nonce")]
    Truncated,

    /// AEAD encryption or decryption failed (wrong key, tampered data).
    #[error("AEAD operation failed")]
    Aead,
}

/// Generate a fresh random 32-byte encryption key.
#[must_use]
pub fn generate_key() -> [u8; KEY_LEN] {
    let mut key = [0u8; KEY_LEN];
    rand::thread_rng().fill_bytes(&mut key);
    key
}

/// Encrypt `plain` under `key`, returning `base64(nonce‖ciphertext)`.
pub fn encrypt(plain: &[u8], key: &[u8]) -> Result<String, CryptoError> {
    let cipher = cipher_from_key(key)?;
    let mut nonce_bytes = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plain)
        .map_err(|_| CryptoError::Aead)?;

    let mut combined = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    combined.extend_from_slice(&nonce_bytes);
    combined.extend_from_slice(&ciphertext);
    Ok(BASE64.encode(combined))
}

/// Decrypt a `base64(nonce‖ciphertext)` string produced by [`encrypt`].
pub fn decrypt(encoded: &str, key: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let cipher = cipher_from_key(key)?;
    let combined = BASE64.decode(encoded)?;
    if combined.len() < NONCE_LEN {
        return Err(CryptoError::Truncated);
    }
    let (nonce_bytes, ciphertext) = combined.split_at(NONCE_LEN);
    let nonce = Nonce::from_slice(nonce_bytes);
    cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| CryptoError::Aead)
}

fn cipher_from_key(key: &[u8]) -> Result<Aes256Gcm, CryptoError> {
    if key.len() != KEY_LEN {
        return Err(CryptoError::BadKeyLength { got: key.len() });
    }
    Ok(Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key)))
}

/// Encrypt a [`Value`] destined for a `Secret` leaf.
///
/// `Value::String` is encrypted directly; every other variant is
/// JSON-serialized first (spec §4.1).
pub fn encrypt_value(value: &Value, key: &[u8]) -> Result<String, CryptoError> {
    let plain = match value {
        Value::String(s) => s.clone().into_bytes(),
        other => serde_json::to_vec(&other.to_json()).expect("Value::to_json never fails"),
    };
    encrypt(&plain, key)
}
