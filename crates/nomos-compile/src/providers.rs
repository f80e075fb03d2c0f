// SPDX-License-Identifier: MIT OR Apache-2.0
//! Wires source declarations to running providers, in-process (C6) or
//! subprocess (C5), and exposes the combined set to the resolver (C9)
//! as a single [`ProviderFetcher`] (spec §4.6/§4.9 integration).

use async_trait::async_trait;
use nomos_core::{SourceDecl, Value};
use nomos_host::ProviderHost;
use nomos_registry::{Provider, TypeRegistry};
use nomos_resolve::ProviderFetcher;
use nomos_resolve_path::{BinaryResolver, ResolveError as BinaryResolveError};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{Mutex, Semaphore};

/// How a registered alias is backed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ProviderKind {
    InProcess,
    Subprocess,
}

/// Errors from initializing a provider during pipeline stage 3.
#[derive(Debug, Error)]
pub enum ProviderInitError {
    /// `decl.type` has no in-process constructor and no binary resolver
    /// was configured to look up an external one.
    #[error("no binary resolver configured; cannot start external provider type {0:?}")]
    NoBinaryResolver(String),

    /// Resolving `decl.type` to a verified binary failed.
    #[error(transparent)]
    Binary(#[from] BinaryResolveError),

    /// Spawning or initializing the subprocess failed.
    #[error(transparent)]
    Host(#[from] nomos_host::HostError),

    /// The in-process provider's own `init` returned an error.
    #[error("in-process provider {alias:?} failed to initialize: {source}")]
    InProcess {
        /// Alias being initialized.
        alias: String,
        /// Underlying provider error.
        #[source]
        source: nomos_registry::ProviderError,
    },
}

/// Owns every provider alias registered during a compile run and
/// answers [`ProviderFetcher`] by dispatching to whichever backend
/// owns that alias.
pub struct CompileProviders {
    type_registry: Arc<TypeRegistry>,
    binary_resolver: Option<Arc<BinaryResolver>>,
    host: Arc<ProviderHost>,
    in_process: Mutex<BTreeMap<String, Box<dyn Provider>>>,
    kind_of: Mutex<BTreeMap<String, ProviderKind>>,
    fetch_limit: Arc<Semaphore>,
    fetch_timeout: Duration,
}

impl CompileProviders {
    /// Build an empty registry, bounding concurrent `Fetch` calls (spec
    /// §4.12 step 5, `MaxConcurrentProviders`) to `max_concurrent_fetches`
    /// and each individual `Fetch` call to `fetch_timeout`
    /// (`TimeoutPerProvider`).
    #[must_use]
    pub fn new(
        type_registry: Arc<TypeRegistry>,
        binary_resolver: Option<Arc<BinaryResolver>>,
        host: Arc<ProviderHost>,
        max_concurrent_fetches: usize,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            type_registry,
            binary_resolver,
            host,
            in_process: Mutex::new(BTreeMap::new()),
            kind_of: Mutex::new(BTreeMap::new()),
            fetch_limit: Arc::new(Semaphore::new(max_concurrent_fetches.max(1))),
            fetch_timeout,
        }
    }

    /// `true` if `alias` has already been registered this run.
    pub async fn is_registered(&self, alias: &str) -> bool {
        self.kind_of.lock().await.contains_key(alias)
    }

    /// Initialize the provider declared by `decl`, registering it under
    /// `decl.alias`. `config` is the already-merged (manifest defaults
    /// overlaid by source-file config, spec `SPEC_FULL.md` §C.5)
    /// configuration to pass to `Init`. Consults the in-process type
    /// registry first, falling back to resolving and spawning an
    /// external binary (spec §4.6).
    pub async fn register(
        &self,
        decl: &SourceDecl,
        config: BTreeMap<String, Value>,
        source_file_path: &str,
    ) -> Result<(), ProviderInitError> {
        if self.type_registry.contains(&decl.r#type) {
            let mut provider = self
                .type_registry
                .construct(&decl.r#type, &config)
                .expect("contains() just confirmed a constructor exists");
            provider
                .init(&decl.alias, &config, source_file_path)
                .await
                .map_err(|source| ProviderInitError::InProcess {
                    alias: decl.alias.clone(),
                    source,
                })?;
            self.in_process
                .lock()
                .await
                .insert(decl.alias.clone(), provider);
            self.kind_of
                .lock()
                .await
                .insert(decl.alias.clone(), ProviderKind::InProcess);
            return Ok(());
        }

        let resolver = self
            .binary_resolver
            .as_ref()
            .ok_or_else(|| ProviderInitError::NoBinaryResolver(decl.r#type.clone()))?;
        let binary_path = resolver.resolve_by_type(&decl.r#type)?;
        self.host.get_provider(&decl.alias, &binary_path).await?;
        self.host.init(&decl.alias, config, source_file_path).await?;
        self.kind_of
            .lock()
            .await
            .insert(decl.alias.clone(), ProviderKind::Subprocess);
        Ok(())
    }

    /// Every alias registered so far, for `Snapshot.metadata.provider_aliases`.
    pub async fn registered_aliases(&self) -> Vec<String> {
        self.kind_of.lock().await.keys().cloned().collect()
    }
}

#[async_trait]
impl ProviderFetcher for CompileProviders {
    fn has_alias(&self, alias: &str) -> bool {
        self.kind_of
            .try_lock()
            .map(|m| m.contains_key(alias))
            .unwrap_or(false)
    }

    async fn fetch(&self, alias: &str, path: &[String]) -> Result<Value, String> {
        let _permit = self
            .fetch_limit
            .acquire()
            .await
            .map_err(|e| e.to_string())?;
        tokio::time::timeout(self.fetch_timeout, self.fetch_inner(alias, path))
            .await
            .map_err(|_| format!("fetch for {alias:?} timed out after {:?}", self.fetch_timeout))?
    }
}

impl CompileProviders {
    async fn fetch_inner(&self, alias: &str, path: &[String]) -> Result<Value, String> {
        let kind = self.kind_of.lock().await.get(alias).copied();
        match kind {
            Some(ProviderKind::InProcess) => {
                let mut providers = self.in_process.lock().await;
                let provider = providers
                    .get_mut(alias)
                    .ok_or_else(|| format!("no in-process provider registered for {alias:?}"))?;
                provider.fetch(path).await.map_err(|e| e.to_string())
            }
            Some(ProviderKind::Subprocess) => self
                .host
                .fetch(alias, path)
                .await
                .map_err(|e| e.to_string()),
            None => Err(format!("alias {alias:?} is not registered")),
        }
    }
}

/// Merge `SourceDecl.config` over `defaults`, source-file config
/// winning at the key level (spec `SPEC_FULL.md` §C.5).
#[must_use]
pub fn merge_config(
    defaults: &BTreeMap<String, serde_json::Value>,
    decl_config: BTreeMap<String, Value>,
) -> BTreeMap<String, Value> {
    let mut merged: BTreeMap<String, Value> = defaults
        .iter()
        .map(|(k, v)| (k.clone(), json_to_value(v)))
        .collect();
    merged.extend(decl_config);
    merged
}

fn json_to_value(v: &serde_json::Value) -> Value {
    match v {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => n
            .as_i64()
            .map(Value::Int)
            .unwrap_or_else(|| Value::Float(n.as_f64().unwrap_or_default())),
        serde_json::Value::String(s) => Value::String(s.clone()),
        serde_json::Value::Array(items) => Value::Sequence(items.iter().map(json_to_value).collect()),
        serde_json::Value::Object(map) => {
            Value::Mapping(map.iter().map(|(k, v)| (k.clone(), json_to_value(v))).collect())
        }
    }
}
