// SPDX-License-Identifier: MIT OR Apache-2.0
//! nomos-registry
#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! The in-process type registry (spec §4.6, C6): maps provider type
//! names to constructors for providers compiled directly into the
//! host, parallel to `nomos-host`'s out-of-process subprocess pool.
//! `Compile` consults this registry first; an unknown type falls back
//! to resolving and spawning an external binary.

use async_trait::async_trait;
use nomos_core::Value;
use std::collections::BTreeMap;
use std::sync::Mutex;
use thiserror::Error;

/// Static identity of a provider, mirroring the RPC `Info` response so
/// in-process and out-of-process providers look the same to `Compile`.
#[derive(Debug, Clone)]
pub struct ProviderInfo {
    /// Alias this provider is registered under.
    pub alias: String,
    /// Provider implementation version.
    pub version: String,
    /// Provider type name.
    pub r#type: String,
}

/// Health status, mirroring the RPC `Health` response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    /// No status has been determined yet.
    Unspecified,
    /// The provider is healthy.
    Ok,
    /// The provider is reachable but degraded.
    Degraded,
    /// The provider is still starting up.
    Starting,
}

/// Errors a compiled-in provider can raise.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The requested path does not exist.
    #[error("path not found: {0}")]
    NotFound(String),
    /// Any other provider-specific failure.
    #[error("{0}")]
    Other(String),
}

/// A provider compiled directly into the host, callable without a
/// subprocess round trip.
///
/// `&mut self` methods are fine here: unlike [`nomos_host`]'s RPC
/// client, an in-process provider is not shared across an `Arc`-backed
/// connection pool — each alias gets its own boxed instance.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Initialize the provider. Called exactly once before the first
    /// `fetch`.
    async fn init(
        &mut self,
        alias: &str,
        config: &BTreeMap<String, Value>,
        source_file_path: &str,
    ) -> Result<(), ProviderError>;

    /// Fetch the value at `path`.
    async fn fetch(&mut self, path: &[String]) -> Result<Value, ProviderError>;

    /// Static identity info.
    fn info(&self) -> ProviderInfo;

    /// Current health.
    async fn health(&self) -> HealthStatus;
}

/// Builds a boxed [`Provider`] from its configuration.
pub type Constructor = Box<dyn Fn(&BTreeMap<String, Value>) -> Box<dyn Provider> + Send + Sync>;

/// Maps provider type names to constructors.
#[derive(Default)]
pub struct TypeRegistry {
    constructors: Mutex<BTreeMap<String, Constructor>>,
}

impl TypeRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a constructor under `type_name`, replacing any
    /// previous registration for that type.
    pub fn register(&self, type_name: impl Into<String>, constructor: Constructor) {
        self.constructors
            .lock()
            .expect("registry lock poisoned")
            .insert(type_name.into(), constructor);
    }

    /// `true` if a constructor is registered for `type_name`.
    #[must_use]
    pub fn contains(&self, type_name: &str) -> bool {
        self.constructors
            .lock()
            .expect("registry lock poisoned")
            .contains_key(type_name)
    }

    /// Construct a provider for `type_name`, if registered.
    #[must_use]
    pub fn construct(
        &self,
        type_name: &str,
        config: &BTreeMap<String, Value>,
    ) -> Option<Box<dyn Provider>> {
        let constructors = self.constructors.lock().expect("registry lock poisoned");
        let ctor = constructors.get(type_name)?;
        Some(ctor(config))
    }
}

/// A provider that answers every `fetch` with [`Value::Null`].
///
/// Registered under the `noop` type so a lockfile alias can point at a
/// type with no real backing implementation (spec §4.6).
pub struct NullProvider {
    alias: String,
}

impl NullProvider {
    /// A constructor suitable for [`TypeRegistry::register`] under `"noop"`.
    #[must_use]
    pub fn constructor() -> Constructor {
        Box::new(|_config| {
            Box::new(NullProvider {
                alias: String::new(),
            })
        })
    }
}

#[async_trait]
impl Provider for NullProvider {
    async fn init(
        &mut self,
        alias: &str,
        _config: &BTreeMap<String, Value>,
        _source_file_path: &str,
    ) -> Result<(), ProviderError> {
        self.alias = alias.to_string();
        Ok(())
    }

    async fn fetch(&mut self, _path: &[String]) -> Result<Value, ProviderError> {
        Ok(Value::Null)
    }

    fn info(&self) -> ProviderInfo {
        ProviderInfo {
            alias: self.alias.clone(),
            version: "0.0.0".into(),
            r#type: "noop".into(),
        }
    }

    async fn health(&self) -> HealthStatus {
        HealthStatus::Ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unregistered_type_does_not_construct() {
        let registry = TypeRegistry::new();
        assert!(!registry.contains("postgres"));
        assert!(registry.construct("postgres", &BTreeMap::new()).is_none());
    }

    #[tokio::test]
    async fn registered_type_constructs_and_runs() {
        let registry = TypeRegistry::new();
        registry.register("noop", NullProvider::constructor());
        assert!(registry.contains("noop"));

        let mut provider = registry.construct("noop", &BTreeMap::new()).unwrap();
        provider.init("db", &BTreeMap::new(), "/tmp/x.csl").await.unwrap();
        assert_eq!(provider.info().alias, "db");
        assert_eq!(provider.fetch(&["a".into()]).await.unwrap(), Value::Null);
        assert_eq!(provider.health().await, HealthStatus::Ok);
    }

    #[tokio::test]
    async fn re_registering_a_type_replaces_the_constructor() {
        let registry = TypeRegistry::new();
        registry.register("noop", NullProvider::constructor());
        registry.register("noop", NullProvider::constructor());
        assert!(registry.contains("noop"));
    }
}
