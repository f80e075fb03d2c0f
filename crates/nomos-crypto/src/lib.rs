// SPDX-License-Identifier: MIT OR Apache-2.0
//! nomos-crypto
#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! Checksum verification and `Secret` leaf encryption (spec §4.1, C1).

/// Streaming SHA-256 checksums in `sha256:<hex>` form.
pub mod checksum;
/// AES-256-GCM encryption for `Secret`-tagged leaves.
pub mod secret;

pub use checksum::{ChecksumError, compute, is_well_formed, validate};
pub use secret::{CryptoError, KEY_LEN, decrypt, encrypt, encrypt_value, generate_key};
