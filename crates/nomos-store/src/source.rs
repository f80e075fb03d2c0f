// SPDX-License-Identifier: MIT OR Apache-2.0
//! [`Source`] — where a provider binary comes from, shared by lockfile
//! and manifest entries.

use serde::{Deserialize, Serialize};

/// A GitHub release asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitHubSource {
    /// Repository owner.
    pub owner: String,
    /// Repository name.
    pub repo: String,
    /// Release asset name, if pinned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset: Option<String>,
}

/// A filesystem path to a locally-built provider binary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalSource {
    /// Path to the binary, absolute or relative to the install root.
    pub path: String,
}

/// Where a provider's binary originates. `GitHub` and `Local` are
/// mutually exclusive on any one entry — see [`Source::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    /// Downloaded from a GitHub release.
    Github(GitHubSource),
    /// A path to a local build.
    Local(LocalSource),
}

impl Source {
    /// Validate the field requirements for this source kind (spec §4.2/§6):
    /// `Github` requires non-empty `owner`+`repo`; `Local` requires a
    /// non-empty `path`.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Source::Github(gh) => {
                if gh.owner.is_empty() || gh.repo.is_empty() {
                    return Err("github source requires owner and repo".to_string());
                }
                Ok(())
            }
            Source::Local(local) => {
                if local.path.is_empty() {
                    return Err("local source requires a non-empty path".to_string());
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn github_requires_owner_and_repo() {
        let missing = Source::Github(GitHubSource {
            owner: String::new(),
            repo: "repo".into(),
            asset: None,
        });
        assert!(missing.validate().is_err());
    }

    #[test]
    fn local_requires_path() {
        let missing = Source::Local(LocalSource { path: String::new() });
        assert!(missing.validate().is_err());
    }

    #[test]
    fn well_formed_sources_validate() {
        let gh = Source::Github(GitHubSource {
            owner: "o".into(),
            repo: "r".into(),
            asset: None,
        });
        assert!(gh.validate().is_ok());
        let local = Source::Local(LocalSource {
            path: "/bin/x".into(),
        });
        assert!(local.validate().is_ok());
    }
}
