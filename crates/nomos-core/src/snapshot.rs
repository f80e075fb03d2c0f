// SPDX-License-Identifier: MIT OR Apache-2.0
//! [`Snapshot`] — the deterministic output of a compile run.

use crate::value::Value;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Which source file and provider produced a given top-level key, where
/// determinable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    /// Absolute path of the source file that declared the key.
    pub source: String,
    /// Alias of the provider that resolved the key's references, if any.
    pub provider_alias: Option<String>,
}

/// Metadata accompanying a [`Snapshot`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metadata {
    /// Absolute paths of every `.csl` file that contributed to this run,
    /// sorted lexicographically.
    pub input_files: Vec<String>,
    /// Deduplicated, sorted list of provider aliases used during
    /// resolution.
    pub provider_aliases: Vec<String>,
    /// Wall-clock time the compile run began.
    pub start_time: DateTime<Utc>,
    /// Wall-clock time the compile run completed.
    pub end_time: DateTime<Utc>,
    /// Fatal errors collected during the run, in encounter order.
    pub errors: Vec<String>,
    /// Non-fatal warnings collected during the run, in encounter order.
    pub warnings: Vec<String>,
    /// Provenance of each top-level data key, where determinable.
    pub per_key_provenance: BTreeMap<String, Provenance>,
}

impl Metadata {
    /// A fresh, empty metadata record stamped with `now` as both
    /// `start_time` and `end_time` (the orchestrator updates `end_time`
    /// once the run completes).
    #[must_use]
    pub fn started_at(now: DateTime<Utc>) -> Self {
        Self {
            input_files: Vec::new(),
            provider_aliases: Vec::new(),
            start_time: now,
            end_time: now,
            errors: Vec::new(),
            warnings: Vec::new(),
            per_key_provenance: BTreeMap::new(),
        }
    }

    /// Set `provider_aliases` from an arbitrary iterator, deduplicating
    /// and sorting the result.
    pub fn set_provider_aliases(&mut self, aliases: impl IntoIterator<Item = String>) {
        let mut set: Vec<String> = aliases.into_iter().collect();
        set.sort();
        set.dedup();
        self.provider_aliases = set;
    }
}

/// The deterministic output of a `Compile` run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Fully resolved data, free of `Reference` nodes.
    pub data: BTreeMap<String, Value>,
    /// Metadata describing how this snapshot was produced.
    pub metadata: Metadata,
}

impl Snapshot {
    /// `true` if `metadata.errors` is non-empty — the caller's signal
    /// that compilation should be treated as failed.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.metadata.errors.is_empty()
    }
}
