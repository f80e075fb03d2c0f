// SPDX-License-Identifier: MIT OR Apache-2.0
//! The manifest (`.nomos/providers.yaml`) — describes provider sources
//! and default config, but never versions (those come from the source
//! file's declaration).

use crate::source::Source;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;

/// A single provider source/default-config entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Alias this provider is registered under.
    pub alias: String,
    /// Provider type name.
    pub r#type: String,
    /// Where this provider's binary comes from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Source>,
    /// Default configuration, overridden per-key by the source file's
    /// own declaration (spec SPEC_FULL §C.5).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub config: BTreeMap<String, serde_json::Value>,
}

/// `.nomos/providers.yaml` in full.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    /// All provider entries.
    #[serde(default)]
    pub providers: Vec<ManifestEntry>,
}

/// Errors from loading, validating, or persisting a [`Manifest`].
#[derive(Debug, Error)]
pub enum ManifestError {
    /// Filesystem I/O failure.
    #[error("manifest I/O error at {path}: {source}")]
    Io {
        /// Path being read/written.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The manifest was not valid YAML.
    #[error("failed to parse manifest: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// Structural/semantic validation failed.
    #[error("manifest entry {alias:?} is invalid: {reason}")]
    Invalid {
        /// The offending entry's alias.
        alias: String,
        /// Why validation failed.
        reason: String,
    },

    /// Two entries declared the same alias.
    #[error("duplicate manifest alias: {0}")]
    DuplicateAlias(String),
}

impl Manifest {
    /// Load and validate a manifest from `path`.
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let raw = fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let manifest: Manifest = serde_yaml::from_str(&raw)?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Validate alias uniqueness and per-entry `Source` requirements.
    pub fn validate(&self) -> Result<(), ManifestError> {
        let mut seen = BTreeSet::new();
        for entry in &self.providers {
            if entry.alias.is_empty() {
                return Err(ManifestError::Invalid {
                    alias: entry.alias.clone(),
                    reason: "alias must not be empty".into(),
                });
            }
            if !seen.insert(entry.alias.clone()) {
                return Err(ManifestError::DuplicateAlias(entry.alias.clone()));
            }
            if let Some(source) = &entry.source {
                source.validate().map_err(|reason| ManifestError::Invalid {
                    alias: entry.alias.clone(),
                    reason,
                })?;
            }
        }
        Ok(())
    }

    /// Persist this manifest as block-style YAML.
    pub fn save(&self, path: &Path) -> Result<(), ManifestError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| ManifestError::Io {
                path: parent.display().to_string(),
                source,
            })?;
        }
        let yaml = serde_yaml::to_string(self).map_err(ManifestError::Parse)?;
        fs::write(path, yaml).map_err(|source| ManifestError::Io {
            path: path.display().to_string(),
            source,
        })
    }

    /// Find the entry registered under `alias`, if any.
    #[must_use]
    pub fn find_by_alias(&self, alias: &str) -> Option<&ManifestEntry> {
        self.providers.iter().find(|e| e.alias == alias)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::LocalSource;

    fn sample_entry(alias: &str) -> ManifestEntry {
        ManifestEntry {
            alias: alias.to_string(),
            r#type: "postgres".into(),
            source: Some(Source::Local(LocalSource {
                path: "/opt/providers/postgres".into(),
            })),
            config: BTreeMap::from([("host".to_string(), serde_json::json!("localhost"))]),
        }
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".nomos/providers.yaml");
        let manifest = Manifest {
            providers: vec![sample_entry("db")],
        };
        manifest.save(&path).unwrap();
        let loaded = Manifest::load(&path).unwrap();
        assert_eq!(loaded.providers, manifest.providers);
    }

    #[test]
    fn serialized_form_has_no_version_field() {
        let manifest = Manifest {
            providers: vec![sample_entry("db")],
        };
        let yaml = serde_yaml::to_string(&manifest).unwrap();
        assert!(!yaml.contains("version"));
    }

    #[test]
    fn validate_rejects_duplicate_alias() {
        let manifest = Manifest {
            providers: vec![sample_entry("db"), sample_entry("db")],
        };
        assert!(matches!(
            manifest.validate(),
            Err(ManifestError::DuplicateAlias(a)) if a == "db"
        ));
    }
}
