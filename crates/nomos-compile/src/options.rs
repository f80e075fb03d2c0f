// SPDX-License-Identifier: MIT OR Apache-2.0
//! `Compile`'s recognized options (spec §4.12, §6): `{Path, Vars,
//! AllowMissingProvider, TimeoutPerProvider, MaxConcurrentProviders,
//! EncryptionKey, ProviderRegistry, ProviderTypeRegistry,
//! StrictWarnings}`.

use crate::parser::FileParser;
use nomos_core::Value;
use nomos_registry::TypeRegistry;
use nomos_resolve_path::BinaryResolver;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Default bound on concurrent `Fetch` calls in flight.
pub const DEFAULT_MAX_CONCURRENT_PROVIDERS: usize = 8;
/// Default per-`Fetch` timeout.
pub const DEFAULT_TIMEOUT_PER_PROVIDER: Duration = Duration::from_secs(30);

/// Options accepted by [`crate::compile`].
pub struct CompileOptions {
    /// File or directory of `.csl` sources to compile.
    pub path: PathBuf,
    /// Variables made available to the external parser for
    /// substitution.
    pub vars: BTreeMap<String, Value>,
    /// Convert unknown-alias/fetch-failure resolution errors into
    /// warnings instead of fatal errors.
    pub allow_missing_provider: bool,
    /// Per-`Fetch` call timeout.
    pub timeout_per_provider: Duration,
    /// Bound on concurrent `Fetch` calls in flight across the run.
    pub max_concurrent_providers: usize,
    /// 32-byte AES-256-GCM key used to encrypt `Secret` leaves. `None`
    /// means any `Secret` present is fatal.
    pub encryption_key: Option<Vec<u8>>,
    /// Combined lockfile/manifest view used to resolve external
    /// provider types to binaries. `None` means only in-process (C6)
    /// provider types are available this run.
    pub binary_resolver: Option<Arc<BinaryResolver>>,
    /// In-process provider constructors, consulted before falling back
    /// to `binary_resolver`.
    pub provider_type_registry: Arc<TypeRegistry>,
    /// Elevate warnings to errors at the caller layer.
    pub strict_warnings: bool,
    /// The external parser/AST-producer collaborator.
    pub parser: Arc<dyn FileParser>,
}

impl CompileOptions {
    /// Build options with every optional knob at its spec-default
    /// value: no vars, strict resolution, a 30s per-fetch timeout, 8
    /// concurrent fetches, no encryption, no external binary resolver,
    /// and an empty type registry.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, parser: Arc<dyn FileParser>) -> Self {
        Self {
            path: path.into(),
            vars: BTreeMap::new(),
            allow_missing_provider: false,
            timeout_per_provider: DEFAULT_TIMEOUT_PER_PROVIDER,
            max_concurrent_providers: DEFAULT_MAX_CONCURRENT_PROVIDERS,
            encryption_key: None,
            binary_resolver: None,
            provider_type_registry: Arc::new(TypeRegistry::new()),
            strict_warnings: false,
            parser,
        }
    }
}
