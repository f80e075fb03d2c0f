// SPDX-License-Identifier: MIT OR Apache-2.0
//! Unified error taxonomy with stable error codes for the nomos compiler.
//!
//! Every fatal error produced anywhere in the compiler carries an
//! [`ErrorCode`] — a machine-readable, stable string tag — alongside its
//! human-readable message. Per-subsystem error enums (`HostError`,
//! `StoreError`, `ResolveError`, ...) implement [`CodedError`] so that
//! `metadata.errors` in the final snapshot can be rendered consistently
//! regardless of which stage produced the failure.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use serde::{Deserialize, Serialize};
use std::fmt;

/// Broad family that an [`ErrorCode`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Command/usage errors (wrong extension, bad flag combination).
    Usage,
    /// Lockfile/manifest configuration errors.
    Config,
    /// Checksum/crypto integrity errors — always fatal, never recovered.
    Integrity,
    /// Provider process lifecycle errors (spawn, handshake, health).
    Provider,
    /// Reference resolution errors (unknown alias, fetch failure, cycle).
    Resolution,
    /// Semantic validation errors (unresolved reference, dependency cycle).
    Validation,
    /// Serialization errors (invalid key, unsupported type).
    Serialization,
    /// Catch-all for unexpected internal errors.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Usage => "usage",
            Self::Config => "config",
            Self::Integrity => "integrity",
            Self::Provider => "provider",
            Self::Resolution => "resolution",
            Self::Validation => "validation",
            Self::Serialization => "serialization",
            Self::Internal => "internal",
        };
        f.write_str(s)
    }
}

/// Machine-readable, stable error code.
///
/// Each variant serializes to a `SCREAMING_SNAKE_CASE` string that should
/// not change across patch releases, since operators may match on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // -- Usage --
    /// Unrecognized output format name.
    UsageUnknownFormat,
    /// Input path lacks the required `.csl` extension.
    UsageWrongExtension,
    /// Output path was empty where one was required.
    UsageEmptyOutputPath,
    /// The compile input path does not exist on disk.
    UsageInputNotFound,

    // -- Config --
    /// Lockfile or manifest failed structural/semantic validation.
    ConfigInvalid,
    /// Duplicate alias within a lockfile or manifest.
    ConfigDuplicateAlias,
    /// Both GitHub and Local sources were set on one entry.
    ConfigAmbiguousSource,
    /// A required field was missing from an entry.
    ConfigMissingField,
    /// Neither lockfile nor manifest was present.
    ConfigNeitherPresent,

    // -- Integrity --
    /// Lockfile entry carries an empty checksum.
    IntegrityEmptyChecksum,
    /// Checksum string is not `sha256:`+64 hex chars.
    IntegrityBadChecksumFormat,
    /// Checksum did not match the binary on disk.
    IntegrityMismatch,

    // -- Provider --
    /// Provider binary could not be found at the resolved path.
    ProviderBinaryMissing,
    /// Provider type is not present in the lockfile/manifest view.
    ProviderTypeNotFound,
    /// Handshake line was present but malformed.
    ProviderBadHandshake,
    /// Provider exited/closed stdout before sending a handshake.
    ProviderNoHandshake,
    /// Handshake did not arrive within the configured timeout.
    ProviderHandshakeTimeout,
    /// Post-spawn `Health` call failed.
    ProviderHealthFailed,
    /// Provider process exited unexpectedly.
    ProviderExited,
    /// Forced shutdown was required after the graceful deadline elapsed.
    ProviderForcedTerminate,

    // -- Resolution --
    /// Reference names an alias with no registered provider.
    ResolutionUnknownAlias,
    /// A `Fetch` RPC call returned an error.
    ResolutionFetchFailed,
    /// A circular reference chain was detected during resolution.
    ResolutionCircular,

    // -- Validation --
    /// A `Reference` node survived to the validation stage.
    ValidationUnresolvedReference,
    /// A dependency cycle was detected in the reference graph.
    ValidationDependencyCycle,
    /// A `Secret` leaf survived encryption because no key was provided.
    ValidationMissingEncryptionKey,

    // -- Serialization --
    /// A mapping key is invalid for the target serialization format.
    SerializationInvalidKey,
    /// A value's runtime type has no representation in the target format.
    SerializationUnsupportedType,

    // -- Internal --
    /// Unexpected internal error; always a bug if seen.
    InternalUnexpected,
}

impl ErrorCode {
    /// The [`ErrorCategory`] this code belongs to.
    #[must_use]
    pub fn category(self) -> ErrorCategory {
        use ErrorCode::*;
        match self {
            UsageUnknownFormat | UsageWrongExtension | UsageEmptyOutputPath
            | UsageInputNotFound => ErrorCategory::Usage,
            ConfigInvalid
            | ConfigDuplicateAlias
            | ConfigAmbiguousSource
            | ConfigMissingField
            | ConfigNeitherPresent => ErrorCategory::Config,
            IntegrityEmptyChecksum | IntegrityBadChecksumFormat | IntegrityMismatch => {
                ErrorCategory::Integrity
            }
            ProviderBinaryMissing
            | ProviderTypeNotFound
            | ProviderBadHandshake
            | ProviderNoHandshake
            | ProviderHandshakeTimeout
            | ProviderHealthFailed
            | ProviderExited
            | ProviderForcedTerminate => ErrorCategory::Provider,
            ResolutionUnknownAlias | ResolutionFetchFailed | ResolutionCircular => {
                ErrorCategory::Resolution
            }
            ValidationUnresolvedReference
            | ValidationDependencyCycle
            | ValidationMissingEncryptionKey => ErrorCategory::Validation,
            SerializationInvalidKey | SerializationUnsupportedType => ErrorCategory::Serialization,
            InternalUnexpected => ErrorCategory::Internal,
        }
    }

    /// Stable string form, e.g. `"INTEGRITY_MISMATCH"`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        use ErrorCode::*;
        match self {
            UsageUnknownFormat => "USAGE_UNKNOWN_FORMAT",
            UsageWrongExtension => "USAGE_WRONG_EXTENSION",
            UsageEmptyOutputPath => "USAGE_EMPTY_OUTPUT_PATH",
            UsageInputNotFound => "USAGE_INPUT_NOT_FOUND",
            ConfigInvalid => "CONFIG_INVALID",
            ConfigDuplicateAlias => "CONFIG_DUPLICATE_ALIAS",
            ConfigAmbiguousSource => "CONFIG_AMBIGUOUS_SOURCE",
            ConfigMissingField => "CONFIG_MISSING_FIELD",
            ConfigNeitherPresent => "CONFIG_NEITHER_PRESENT",
            IntegrityEmptyChecksum => "INTEGRITY_EMPTY_CHECKSUM",
            IntegrityBadChecksumFormat => "INTEGRITY_BAD_CHECKSUM_FORMAT",
            IntegrityMismatch => "INTEGRITY_MISMATCH",
            ProviderBinaryMissing => "PROVIDER_BINARY_MISSING",
            ProviderTypeNotFound => "PROVIDER_TYPE_NOT_FOUND",
            ProviderBadHandshake => "PROVIDER_BAD_HANDSHAKE",
            ProviderNoHandshake => "PROVIDER_NO_HANDSHAKE",
            ProviderHandshakeTimeout => "PROVIDER_HANDSHAKE_TIMEOUT",
            ProviderHealthFailed => "PROVIDER_HEALTH_FAILED",
            ProviderExited => "PROVIDER_EXITED",
            ProviderForcedTerminate => "PROVIDER_FORCED_TERMINATE",
            ResolutionUnknownAlias => "RESOLUTION_UNKNOWN_ALIAS",
            ResolutionFetchFailed => "RESOLUTION_FETCH_FAILED",
            ResolutionCircular => "RESOLUTION_CIRCULAR",
            ValidationUnresolvedReference => "VALIDATION_UNRESOLVED_REFERENCE",
            ValidationDependencyCycle => "VALIDATION_DEPENDENCY_CYCLE",
            ValidationMissingEncryptionKey => "VALIDATION_MISSING_ENCRYPTION_KEY",
            SerializationInvalidKey => "SERIALIZATION_INVALID_KEY",
            SerializationUnsupportedType => "SERIALIZATION_UNSUPPORTED_TYPE",
            InternalUnexpected => "INTERNAL_UNEXPECTED",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Implemented by every subsystem error enum so that callers can pull a
/// stable [`ErrorCode`] out of any fatal error without downcasting.
pub trait CodedError: std::error::Error {
    /// The stable code for this error value.
    fn code(&self) -> ErrorCode;
}

/// A wire-format-independent source location, attached to errors that
/// originate from a parsed `.csl` construct (references, in particular).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSpan {
    /// Absolute path of the source file.
    pub file: String,
    /// 1-indexed line number.
    pub line: u32,
    /// 1-indexed column number.
    pub col: u32,
}

impl fmt::Display for SourceSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.col)
    }
}
