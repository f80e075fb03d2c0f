// SPDX-License-Identifier: MIT OR Apache-2.0
//! The lockfile (`.nomos/providers.lock.json`) — pins exact provider
//! binaries, their checksums, and install locations.

use crate::source::Source;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;

/// Directory permission applied to any directory this crate creates.
const CREATED_DIR_MODE: u32 = 0o755;
/// File permission applied to the lockfile when it is written.
const LOCKFILE_MODE: u32 = 0o600;

/// A single pinned provider binary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockfileEntry {
    /// Alias this provider is installed under.
    pub alias: String,
    /// Provider type name.
    pub r#type: String,
    /// Installed version string.
    pub version: String,
    /// Target operating system (e.g. `"linux"`).
    pub os: String,
    /// Target architecture (e.g. `"amd64"`).
    pub arch: String,
    /// Where this binary was obtained from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Source>,
    /// Path to the binary, relative to the install root unless absolute.
    pub path: String,
    /// `"sha256:"+hex` checksum of the binary's content.
    pub checksum: String,
}

/// `.nomos/providers.lock.json` in full.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Lockfile {
    /// All pinned provider entries.
    #[serde(default)]
    pub providers: Vec<LockfileEntry>,
}

/// Errors from loading, validating, or persisting a [`Lockfile`].
#[derive(Debug, Error)]
pub enum LockfileError {
    /// Filesystem I/O failure.
    #[error("lockfile I/O error at {path}: {source}")]
    Io {
        /// Path being read/written.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The lockfile was not valid JSON.
    #[error("failed to parse lockfile: {0}")]
    Parse(#[from] serde_json::Error),

    /// Structural/semantic validation failed.
    #[error("lockfile entry {alias:?} is invalid: {reason}")]
    Invalid {
        /// The offending entry's alias.
        alias: String,
        /// Why validation failed.
        reason: String,
    },

    /// Two entries declared the same alias.
    #[error("duplicate lockfile alias: {0}")]
    DuplicateAlias(String),
}

impl Lockfile {
    /// Load and validate a lockfile from `path`.
    pub fn load(path: &Path) -> Result<Self, LockfileError> {
        let raw = fs::read_to_string(path).map_err(|source| LockfileError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let lockfile: Lockfile = serde_json::from_str(&raw)?;
        lockfile.validate()?;
        Ok(lockfile)
    }

    /// Validate every entry: non-empty required fields, a well-formed
    /// `Source`, and alias uniqueness across the file.
    pub fn validate(&self) -> Result<(), LockfileError> {
        let mut seen = BTreeSet::new();
        for entry in &self.providers {
            if entry.alias.is_empty() {
                return Err(LockfileError::Invalid {
                    alias: entry.alias.clone(),
                    reason: "alias must not be empty".into(),
                });
            }
            if !seen.insert(entry.alias.clone()) {
                return Err(LockfileError::DuplicateAlias(entry.alias.clone()));
            }
            if entry.r#type.is_empty() || entry.version.is_empty() || entry.path.is_empty() {
                return Err(LockfileError::Invalid {
                    alias: entry.alias.clone(),
                    reason: "type, version, and path must all be non-empty".into(),
                });
            }
            if let Some(source) = &entry.source {
                source.validate().map_err(|reason| LockfileError::Invalid {
                    alias: entry.alias.clone(),
                    reason,
                })?;
            }
        }
        Ok(())
    }

    /// Persist this lockfile as pretty-printed, 2-space-indented JSON.
    ///
    /// Creates parent directories (mode `0755`) and writes the file
    /// itself with mode `0600`, since it may contain sensitive provider
    /// source details.
    pub fn save(&self, path: &Path) -> Result<(), LockfileError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| LockfileError::Io {
                path: parent.display().to_string(),
                source,
            })?;
            set_permissions(parent, CREATED_DIR_MODE).map_err(|source| LockfileError::Io {
                path: parent.display().to_string(),
                source,
            })?;
        }
        let mut buf = Vec::new();
        let mut ser = serde_json::Serializer::with_formatter(
            &mut buf,
            serde_json::ser::PrettyFormatter::with_indent(b"  "),
        );
        serde::Serialize::serialize(self, &mut ser)?;
        fs::write(path, &buf).map_err(|source| LockfileError::Io {
            path: path.display().to_string(),
            source,
        })?;
        set_permissions(path, LOCKFILE_MODE).map_err(|source| LockfileError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(())
    }

    /// Find the first entry matching `r#type`, if any.
    #[must_use]
    pub fn find_by_type(&self, type_name: &str) -> Option<&LockfileEntry> {
        self.providers.iter().find(|e| e.r#type == type_name)
    }

    /// Find the entry registered under `alias`, if any.
    #[must_use]
    pub fn find_by_alias(&self, alias: &str) -> Option<&LockfileEntry> {
        self.providers.iter().find(|e| e.alias == alias)
    }
}

#[cfg(unix)]
fn set_permissions(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_permissions(_path: &Path, _mode: u32) -> io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::GitHubSource;

    fn sample_entry(alias: &str) -> LockfileEntry {
        LockfileEntry {
            alias: alias.to_string(),
            r#type: "postgres".into(),
            version: "1.0.0".into(),
            os: "linux".into(),
            arch: "amd64".into(),
            source: Some(Source::Github(GitHubSource {
                owner: "nomos-lang".into(),
                repo: "provider-postgres".into(),
                asset: None,
            })),
            path: "postgres/1.0.0/linux-amd64/provider".into(),
            checksum: format!("sha256:{}", "a".repeat(64)),
        }
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".nomos/providers.lock.json");
        let lockfile = Lockfile {
            providers: vec![sample_entry("db")],
        };
        lockfile.save(&path).unwrap();
        let loaded = Lockfile::load(&path).unwrap();
        assert_eq!(loaded.providers, lockfile.providers);
    }

    #[test]
    fn save_writes_0600_file_permissions() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".nomos/providers.lock.json");
        Lockfile {
            providers: vec![sample_entry("db")],
        }
        .save(&path)
        .unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }

    #[test]
    fn validate_rejects_duplicate_alias() {
        let lockfile = Lockfile {
            providers: vec![sample_entry("db"), sample_entry("db")],
        };
        assert!(matches!(
            lockfile.validate(),
            Err(LockfileError::DuplicateAlias(a)) if a == "db"
        ));
    }

    #[test]
    fn validate_rejects_empty_required_field() {
        let mut entry = sample_entry("db");
        entry.version = String::new();
        let lockfile = Lockfile {
            providers: vec![entry],
        };
        assert!(matches!(lockfile.validate(), Err(LockfileError::Invalid { .. })));
    }

    #[test]
    fn find_by_type_returns_first_match() {
        let lockfile = Lockfile {
            providers: vec![sample_entry("db"), sample_entry("db2")],
        };
        assert_eq!(lockfile.find_by_type("postgres").unwrap().alias, "db");
    }
}
