// SPDX-License-Identifier: MIT OR Apache-2.0
//! Streaming SHA-256 checksums in the `sha256:<hex>` form used by the
//! lockfile and the binary-path resolver.

use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use thiserror::Error;

/// Number of bytes read per chunk while hashing a file. Kept small enough
/// to never load an entire binary into memory.
const CHUNK_SIZE: usize = 64 * 1024;

/// Prefix every checksum string carries.
const SHA256_PREFIX: &str = "sha256:";

/// Errors from checksum computation or validation.
#[derive(Debug, Error)]
pub enum ChecksumError {
    /// The file could not be opened or read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// Path that failed to read.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// A checksum was expected but the supplied string was empty.
    ///
    /// Refusing to execute is deliberate: an empty checksum is
    /// indistinguishable from "verification was skipped".
    #[error("checksum is empty; refusing to execute unverified binary")]
    EmptyChecksum,

    /// The checksum string is not `sha256:` followed by 64 hex chars.
    #[error("malformed checksum {value:?}: expected `sha256:`+64 hex chars")]
    BadFormat {
        /// The offending value.
        value: String,
    },

    /// Computed and expected checksums disagree.
    #[error("checksum mismatch: expected {expected}, got {actual}")]
    Mismatch {
        /// The checksum that was expected (from the lockfile).
        expected: String,
        /// The checksum actually computed from the file on disk.
        actual: String,
    },
}

/// Compute `"sha256:" + hex(sha256(file bytes))`, streaming the file in
/// fixed-size chunks.
pub fn compute(path: &Path) -> Result<String, ChecksumError> {
    let mut file = File::open(path).map_err(|source| ChecksumError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let n = file.read(&mut buf).map_err(|source| ChecksumError::Io {
            path: path.display().to_string(),
            source,
        })?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("{SHA256_PREFIX}{:x}", hasher.finalize()))
}

/// Validate that `path`'s content matches `expected`.
///
/// An empty `expected` is always rejected with [`ChecksumError::EmptyChecksum`]
/// — per spec, this is a security-critical, never-recovered failure mode.
pub fn validate(path: &Path, expected: &str) -> Result<(), ChecksumError> {
    if expected.is_empty() {
        return Err(ChecksumError::EmptyChecksum);
    }
    if !is_well_formed(expected) {
        return Err(ChecksumError::BadFormat {
            value: expected.to_string(),
        });
    }
    let actual = compute(path)?;
    if actual != expected {
        return Err(ChecksumError::Mismatch {
            expected: expected.to_string(),
            actual,
        });
    }
    Ok(())
}

/// `true` if `value` is `sha256:` followed by exactly 64 lowercase hex
/// characters.
#[must_use]
pub fn is_well_formed(value: &str) -> bool {
    match value.strip_prefix(SHA256_PREFIX) {
        Some(hex) => hex.len() == 64 && hex.bytes().all(|b| b.is_ascii_hexdigit()),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn compute_is_deterministic_for_identical_content() {
        let dir = tempfile::tempdir().unwrap();
        let p1 = dir.path().join("a.bin");
        let p2 = dir.path().join("b.bin");
        std::fs::write(&p1, b"hello world").unwrap();
        std::fs::write(&p2, b"hello world").unwrap();
        assert_eq!(compute(&p1).unwrap(), compute(&p2).unwrap());
    }

    #[test]
    fn compute_differs_for_different_content() {
        let dir = tempfile::tempdir().unwrap();
        let p1 = dir.path().join("a.bin");
        let p2 = dir.path().join("b.bin");
        std::fs::write(&p1, b"hello").unwrap();
        std::fs::write(&p2, b"world").unwrap();
        assert_ne!(compute(&p1).unwrap(), compute(&p2).unwrap());
    }

    #[test]
    fn validate_rejects_empty_checksum() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("a.bin");
        std::fs::write(&p, b"x").unwrap();
        assert!(matches!(
            validate(&p, ""),
            Err(ChecksumError::EmptyChecksum)
        ));
    }

    #[test]
    fn validate_rejects_bad_format() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("a.bin");
        std::fs::write(&p, b"x").unwrap();
        assert!(matches!(
            validate(&p, "md5:deadbeef"),
            Err(ChecksumError::BadFormat { .. })
        ));
    }

    #[test]
    fn validate_reports_both_hashes_on_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("a.bin");
        std::fs::write(&p, b"x").unwrap();
        let wrong = format!("sha256:{}", "0".repeat(64));
        match validate(&p, &wrong) {
            Err(ChecksumError::Mismatch { expected, actual }) => {
                assert_eq!(expected, wrong);
                assert_ne!(actual, wrong);
            }
            other => panic!("expected mismatch, got {other:?}"),
        }
    }

    #[test]
    fn streaming_hash_handles_file_larger_than_one_chunk() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("big.bin");
        let mut f = std::fs::File::create(&p).unwrap();
        let chunk = vec![7u8; CHUNK_SIZE];
        f.write_all(&chunk).unwrap();
        f.write_all(&chunk).unwrap();
        f.write_all(b"tail").unwrap();
        drop(f);
        let sum = compute(&p).unwrap();
        assert!(is_well_formed(&sum));
    }
}
