// SPDX-License-Identifier: MIT OR Apache-2.0
//! Secret encryption (spec §4.11, C11): walks a fully resolved value
//! tree, replacing each `Secret` leaf with ciphertext. A tree with no
//! `Secret` leaves is untouched regardless of whether a key was
//! configured; a `Secret` leaf with no key configured is fatal.

use nomos_core::Value;
use nomos_crypto::CryptoError;
use nomos_error::{CodedError, ErrorCode};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors from encrypting secrets in a resolved value tree.
#[derive(Debug, Error)]
pub enum SecretEncryptError {
    /// A `Secret` leaf was found but no `EncryptionKey` was configured.
    #[error("a Secret value is present but no encryption key was configured")]
    MissingKey,

    /// The underlying AEAD encryption failed.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// Encrypting a mapping value failed; `key` is prepended for context.
    #[error("in key {key:?}: {source}")]
    InMapping {
        /// The mapping key being encrypted when the error occurred.
        key: String,
        /// The underlying error.
        #[source]
        source: Box<SecretEncryptError>,
    },

    /// Encrypting a sequence element failed; `index` is prepended.
    #[error("at index {index}: {source}")]
    InSequence {
        /// The sequence index being encrypted when the error occurred.
        index: usize,
        /// The underlying error.
        #[source]
        source: Box<SecretEncryptError>,
    },
}

impl CodedError for SecretEncryptError {
    fn code(&self) -> ErrorCode {
        match self {
            Self::MissingKey => ErrorCode::ValidationMissingEncryptionKey,
            Self::Crypto(_) => ErrorCode::ValidationMissingEncryptionKey,
            Self::InMapping { source, .. } | Self::InSequence { source, .. } => source.code(),
        }
    }
}

/// Replace every `Secret` leaf in `value` with its ciphertext. Maps and
/// sequences are rebuilt rather than mutated in place (spec §4.11).
pub fn encrypt_secrets(value: &Value, key: Option<&[u8]>) -> Result<Value, SecretEncryptError> {
    match value {
        Value::Secret(inner) => {
            let key = key.ok_or(SecretEncryptError::MissingKey)?;
            let ciphertext = nomos_crypto::encrypt_value(inner, key)?;
            Ok(Value::String(ciphertext))
        }
        Value::Mapping(map) => {
            let mut out = BTreeMap::new();
            for (k, v) in map {
                let encrypted =
                    encrypt_secrets(v, key).map_err(|source| SecretEncryptError::InMapping {
                        key: k.clone(),
                        source: Box::new(source),
                    })?;
                out.insert(k.clone(), encrypted);
            }
            Ok(Value::Mapping(out))
        }
        Value::Sequence(items) => {
            let mut out = Vec::with_capacity(items.len());
            for (index, item) in items.iter().enumerate() {
                let encrypted = encrypt_secrets(item, key).map_err(|source| {
                    SecretEncryptError::InSequence {
                        index,
                        source: Box::new(source),
                    }
                })?;
                out.push(encrypted);
            }
            Ok(Value::Sequence(out))
        }
        other => Ok(other.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nomos_crypto::generate_key;

    #[test]
    fn tree_without_secrets_is_untouched_with_no_key() {
        let value = Value::Mapping(BTreeMap::from([("a".to_string(), Value::Int(1))]));
        let result = encrypt_secrets(&value, None).unwrap();
        assert_eq!(result, value);
    }

    #[test]
    fn secret_without_key_is_fatal() {
        let value = Value::Secret(Box::new(Value::String("hunter2".into())));
        let err = encrypt_secrets(&value, None).unwrap_err();
        assert!(matches!(err, SecretEncryptError::MissingKey));
    }

    #[test]
    fn secret_with_key_becomes_ciphertext_string() {
        let key = generate_key();
        let value = Value::Secret(Box::new(Value::String("hunter2".into())));
        let result = encrypt_secrets(&value, Some(&key)).unwrap();
        match result {
            Value::String(ciphertext) => {
                let decrypted = nomos_crypto::decrypt(&ciphertext, &key).unwrap();
                assert_eq!(decrypted, b"hunter2");
            }
            other => panic!("expected string ciphertext, got {other:?}"),
        }
    }

    #[test]
    fn nested_secret_inside_mapping_reports_key_in_error() {
        let map = BTreeMap::from([(
            "password".to_string(),
            Value::Secret(Box::new(Value::String("x".into()))),
        )]);
        let err = encrypt_secrets(&Value::Mapping(map), None).unwrap_err();
        assert!(matches!(err, SecretEncryptError::InMapping { key, .. } if key == "password"));
    }
}
