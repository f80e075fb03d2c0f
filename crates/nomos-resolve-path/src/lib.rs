// SPDX-License-Identifier: MIT OR Apache-2.0
//! nomos-resolve-path
#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! Combines the lockfile and manifest (spec §4.3, C3) into a single
//! `type -> verified binary path` resolver. Checksum verification is
//! mandatory and never skipped.

use nomos_crypto::ChecksumError;
use nomos_store::{Lockfile, LockfileError, Manifest, ManifestError, Source};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// The merged view of a provider across lockfile and manifest, keyed by
/// alias. Lockfile fields win when both documents describe the same
/// alias; fields only the manifest carries (source hint, default
/// config) are preserved when no lockfile entry overrides them.
#[derive(Debug, Clone, Default)]
pub struct ResolvedProvider {
    /// Alias this provider is registered under.
    pub alias: String,
    /// Provider type name.
    pub r#type: String,
    /// Installed version, empty if this alias has no lockfile entry.
    pub version: String,
    /// Path to the binary (relative to the resolver's `base_dir` unless
    /// absolute), empty if this alias has no lockfile entry.
    pub path: String,
    /// `"sha256:"+hex` checksum, empty if this alias has no lockfile
    /// entry (which `resolve_by_type` always treats as insecure).
    pub checksum: String,
    /// Source hint, preferring the manifest's (lockfile entries may
    /// also carry one; manifest wins here since it is the canonical
    /// place sources are described).
    pub source: Option<Source>,
    /// Default config supplied by the manifest.
    pub config: BTreeMap<String, serde_json::Value>,
}

/// Errors from resolving a provider type to a verified binary path.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Neither the lockfile nor the manifest path exists on disk.
    #[error("neither lockfile nor manifest is present")]
    NeitherPresent,

    /// Failed to load the lockfile.
    #[error(transparent)]
    Lockfile(#[from] LockfileError),

    /// Failed to load the manifest.
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// No entry in the combined view has the requested type.
    #[error("no provider of type {0:?} is installed")]
    TypeNotFound(String),

    /// The resolved binary is missing from disk.
    #[error("provider binary missing at {path}; try re-installing the provider (expected type {type_name:?})")]
    BinaryMissing {
        /// Absolute path that was stat'd.
        path: String,
        /// The provider type being resolved.
        type_name: String,
    },

    /// The lockfile entry has an empty checksum — refusing to execute.
    #[error("lockfile entry for {alias:?} has no checksum; refusing to execute unverified binary")]
    InsecureLockfile {
        /// The alias with the missing checksum.
        alias: String,
    },

    /// The binary on disk does not match the lockfile's checksum.
    #[error("provider binary for {alias:?} has been tampered with: {source}")]
    Tampered {
        /// The alias whose binary failed verification.
        alias: String,
        /// The underlying checksum mismatch.
        #[source]
        source: ChecksumError,
    },
}

/// Resolves a provider type name to a verified, absolute binary path by
/// combining a lockfile and a manifest.
pub struct BinaryResolver {
    base_dir: PathBuf,
    providers: Vec<ResolvedProvider>,
}

impl BinaryResolver {
    /// Load the lockfile and/or manifest at the given paths and build
    /// the combined view. At least one of the two files must exist.
    pub fn load(
        lockfile_path: &Path,
        manifest_path: &Path,
        base_dir: impl Into<PathBuf>,
    ) -> Result<Self, ResolveError> {
        let lockfile_exists = lockfile_path.exists();
        let manifest_exists = manifest_path.exists();
        if !lockfile_exists && !manifest_exists {
            return Err(ResolveError::NeitherPresent);
        }

        let lockfile = if lockfile_exists {
            Some(Lockfile::load(lockfile_path)?)
        } else {
            None
        };
        let manifest = if manifest_exists {
            Some(Manifest::load(manifest_path)?)
        } else {
            None
        };

        Ok(Self::from_parts(lockfile, manifest, base_dir))
    }

    /// Build the combined view directly from already-loaded documents.
    #[must_use]
    pub fn from_parts(
        lockfile: Option<Lockfile>,
        manifest: Option<Manifest>,
        base_dir: impl Into<PathBuf>,
    ) -> Self {
        let mut by_alias: BTreeMap<String, ResolvedProvider> = BTreeMap::new();

        if let Some(manifest) = &manifest {
            for entry in &manifest.providers {
                by_alias.insert(
                    entry.alias.clone(),
                    ResolvedProvider {
                        alias: entry.alias.clone(),
                        r#type: entry.r#type.clone(),
                        source: entry.source.clone(),
                        config: entry.config.clone(),
                        ..Default::default()
                    },
                );
            }
        }

        if let Some(lockfile) = &lockfile {
            for entry in &lockfile.providers {
                let resolved = by_alias.entry(entry.alias.clone()).or_default();
                resolved.alias = entry.alias.clone();
                resolved.r#type = entry.r#type.clone();
                resolved.version = entry.version.clone();
                resolved.path = entry.path.clone();
                resolved.checksum = entry.checksum.clone();
            }
        }

        Self {
            base_dir: base_dir.into(),
            providers: by_alias.into_values().collect(),
        }
    }

    /// Resolve `type_name` to a verified, absolute binary path.
    ///
    /// Scans the combined view for the first entry whose `type` matches;
    /// checksum verification is mandatory and never skipped.
    pub fn resolve_by_type(&self, type_name: &str) -> Result<PathBuf, ResolveError> {
        let entry = self
            .providers
            .iter()
            .find(|p| p.r#type == type_name)
            .ok_or_else(|| ResolveError::TypeNotFound(type_name.to_string()))?;

        let raw_path = Path::new(&entry.path);
        let abs_path = if raw_path.is_absolute() {
            raw_path.to_path_buf()
        } else {
            self.base_dir.join(raw_path)
        };

        if !abs_path.is_file() {
            return Err(ResolveError::BinaryMissing {
                path: abs_path.display().to_string(),
                type_name: type_name.to_string(),
            });
        }

        if entry.checksum.is_empty() {
            return Err(ResolveError::InsecureLockfile {
                alias: entry.alias.clone(),
            });
        }

        nomos_crypto::validate(&abs_path, &entry.checksum).map_err(|source| match source {
            ChecksumError::EmptyChecksum => ResolveError::InsecureLockfile {
                alias: entry.alias.clone(),
            },
            other => ResolveError::Tampered {
                alias: entry.alias.clone(),
                source: other,
            },
        })?;

        debug!(target: "nomos.resolve_path", type_name, path = %abs_path.display(), "resolved verified provider binary");
        Ok(abs_path)
    }

    /// Look up the combined view entry for `alias`, if any.
    #[must_use]
    pub fn find_by_alias(&self, alias: &str) -> Option<&ResolvedProvider> {
        self.providers.iter().find(|p| p.alias == alias)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nomos_store::LockfileEntry;
    use std::fs;
    use std::io::Write;

    fn write_binary(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
        let path = dir.join(name);
        let mut f = fs::File::create(&path).unwrap();
        f.write_all(content).unwrap();
        path
    }

    fn entry(alias: &str, path: &str, checksum: String) -> LockfileEntry {
        LockfileEntry {
            alias: alias.to_string(),
            r#type: "postgres".into(),
            version: "1.0.0".into(),
            os: "linux".into(),
            arch: "amd64".into(),
            source: None,
            path: path.to_string(),
            checksum,
        }
    }

    #[test]
    fn resolves_and_verifies_matching_binary() {
        let dir = tempfile::tempdir().unwrap();
        let bin = write_binary(dir.path(), "provider", b"binary content");
        let checksum = nomos_crypto::compute(&bin).unwrap();
        let lockfile = Lockfile {
            providers: vec![entry("db", "provider", checksum)],
        };
        let resolver = BinaryResolver::from_parts(Some(lockfile), None, dir.path());
        let resolved = resolver.resolve_by_type("postgres").unwrap();
        assert_eq!(resolved, bin);
    }

    #[test]
    fn missing_binary_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let lockfile = Lockfile {
            providers: vec![entry("db", "missing", format!("sha256:{}", "a".repeat(64)))],
        };
        let resolver = BinaryResolver::from_parts(Some(lockfile), None, dir.path());
        assert!(matches!(
            resolver.resolve_by_type("postgres"),
            Err(ResolveError::BinaryMissing { .. })
        ));
    }

    #[test]
    fn empty_checksum_is_insecure() {
        let dir = tempfile::tempdir().unwrap();
        let bin = write_binary(dir.path(), "provider", b"x");
        let _ = bin;
        let lockfile = Lockfile {
            providers: vec![entry("db", "provider", String::new())],
        };
        let resolver = BinaryResolver::from_parts(Some(lockfile), None, dir.path());
        assert!(matches!(
            resolver.resolve_by_type("postgres"),
            Err(ResolveError::InsecureLockfile { .. })
        ));
    }

    #[test]
    fn tampered_binary_never_resolves() {
        let dir = tempfile::tempdir().unwrap();
        let bin = write_binary(dir.path(), "provider", b"original");
        let checksum = nomos_crypto::compute(&bin).unwrap();
        // Tamper after computing the expected checksum.
        fs::write(&bin, b"tampered!").unwrap();
        let lockfile = Lockfile {
            providers: vec![entry("db", "provider", checksum)],
        };
        let resolver = BinaryResolver::from_parts(Some(lockfile), None, dir.path());
        match resolver.resolve_by_type("postgres") {
            Err(ResolveError::Tampered { .. }) => {}
            other => panic!("expected Tampered, got {other:?}"),
        }
    }

    #[test]
    fn unknown_type_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = BinaryResolver::from_parts(Some(Lockfile::default()), None, dir.path());
        assert!(matches!(
            resolver.resolve_by_type("mysql"),
            Err(ResolveError::TypeNotFound(t)) if t == "mysql"
        ));
    }

    #[test]
    fn load_fails_when_neither_file_present() {
        let dir = tempfile::tempdir().unwrap();
        let err = BinaryResolver::load(
            &dir.path().join("providers.lock.json"),
            &dir.path().join("providers.yaml"),
            dir.path(),
        )
        .unwrap_err();
        assert!(matches!(err, ResolveError::NeitherPresent));
    }
}
