// SPDX-License-Identifier: MIT OR Apache-2.0
//! Serialization failures (spec §4.13, §7): invalid keys for the target
//! format, and values whose runtime type has no representation in it.

use nomos_error::{CodedError, ErrorCode};
use thiserror::Error;

/// Errors raised while canonicalizing or rendering a [`crate::Target`].
#[derive(Debug, Error)]
pub enum SerializeError {
    /// One or more mapping keys are invalid for the target format.
    /// `keys` is sorted and deduplicated.
    #[error("invalid key(s) for {target} output: {}", keys.join(", "))]
    InvalidKey {
        /// The target format that rejected the keys.
        target: String,
        /// The offending keys, sorted and deduplicated.
        keys: Vec<String>,
    },

    /// A value's runtime type cannot be represented in the target format.
    #[error("unsupported type {type_name:?} at path {path}")]
    UnsupportedType {
        /// Dotted path to the offending leaf, with `[i]` for sequence
        /// indices.
        path: String,
        /// The unsupported value's runtime type name.
        type_name: &'static str,
    },
}

impl CodedError for SerializeError {
    fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidKey { .. } => ErrorCode::SerializationInvalidKey,
            Self::UnsupportedType { .. } => ErrorCode::SerializationUnsupportedType,
        }
    }
}
