// SPDX-License-Identifier: MIT OR Apache-2.0
//! nomos-store
#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! Lockfile and manifest persistence (spec §4.2, C2).
//!
//! [`Lockfile`] pins exact provider binaries with mandatory checksums;
//! [`Manifest`] describes provider sources and default config but never
//! versions. Both validate themselves at load time.

/// `.nomos/providers.lock.json`.
pub mod lockfile;
/// `.nomos/providers.yaml`.
pub mod manifest;
/// Shared `GitHub`/`Local` source description.
pub mod source;

pub use lockfile::{Lockfile, LockfileEntry, LockfileError};
pub use manifest::{Manifest, ManifestEntry, ManifestError};
pub use source::{GitHubSource, LocalSource, Source};

/// The standard install path layout: `<base>/<type>/<version>/<os>-<arch>/provider`.
///
/// A pure helper for tooling that populates the lockfile; the layout
/// itself is fixed, only the segments vary.
#[must_use]
pub fn install_path(base: &str, r#type: &str, version: &str, os: &str, arch: &str) -> String {
    format!("{base}/{type}/{version}/{os}-{arch}/provider")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn install_path_matches_standard_layout() {
        assert_eq!(
            install_path("/opt/nomos", "postgres", "1.0.0", "linux", "amd64"),
            "/opt/nomos/postgres/1.0.0/linux-amd64/provider"
        );
    }
}
