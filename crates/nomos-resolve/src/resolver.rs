// SPDX-License-Identifier: MIT OR Apache-2.0
//! The reference resolver (spec §4.9, C9): recursively resolves
//! `Reference` leaves in a value tree, honoring the fetch cache,
//! cycle detection, and the `AllowMissingProvider` policy switch.

use crate::cache::FetchCache;
use crate::context::{CircularReferenceError, ResolutionContext};
use async_trait::async_trait;
use nomos_core::{Path as CslPath, Reference, Value};
use nomos_error::{CodedError, ErrorCode, SourceSpan};
use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

/// A backend capable of answering "does this alias exist" and
/// "fetch this path from this alias", decoupling the resolver from
/// `nomos-host`/`nomos-registry` so it can be driven by either (or a
/// fake, in tests).
#[async_trait]
pub trait ProviderFetcher: Send + Sync {
    /// `true` if `alias` names a provider known to this run.
    fn has_alias(&self, alias: &str) -> bool;

    /// Fetch the value at `path` from the provider registered under
    /// `alias`. The returned value has already had any single-key
    /// `"value"` wrapper unwrapped by the transport layer.
    async fn fetch(&self, alias: &str, path: &[String]) -> Result<Value, String>;
}

/// Fatal resolution errors (only raised when `AllowMissingProvider` is
/// off, or regardless of policy for cycles).
#[derive(Debug, Error)]
pub enum ResolveError {
    /// A reference participates in a cycle.
    #[error("{0} (at {span})")]
    Circular(
        #[source] CircularReferenceError,
        /// Source location of the reference that closed the cycle.
        SourceSpan,
    ),

    /// The reference's alias is not a known provider.
    #[error("unknown provider alias {alias:?} at {span}")]
    UnknownAlias {
        /// The unresolved alias.
        alias: String,
        /// Source location of the reference.
        span: SourceSpan,
    },

    /// The provider's `Fetch` call failed.
    #[error("fetch failed for {alias:?} at {path} ({span}): {source}")]
    FetchFailed {
        /// The provider alias.
        alias: String,
        /// The path that was being fetched.
        path: String,
        /// Source location of the reference.
        span: SourceSpan,
        /// The underlying failure message.
        source: String,
    },

    /// Resolving a key inside a mapping failed; `key` is prepended to
    /// the error chain so the offending path is visible.
    #[error("in key {key:?}: {source}")]
    InMapping {
        /// The mapping key being resolved when the error occurred.
        key: String,
        /// The underlying error.
        #[source]
        source: Box<ResolveError>,
    },

    /// Resolving an element inside a sequence failed; `index` is
    /// prepended to the error chain.
    #[error("at index {index}: {source}")]
    InSequence {
        /// The sequence index being resolved when the error occurred.
        index: usize,
        /// The underlying error.
        #[source]
        source: Box<ResolveError>,
    },
}

impl CodedError for ResolveError {
    fn code(&self) -> ErrorCode {
        match self {
            Self::Circular(..) => ErrorCode::ResolutionCircular,
            Self::UnknownAlias { .. } => ErrorCode::ResolutionUnknownAlias,
            Self::FetchFailed { .. } => ErrorCode::ResolutionFetchFailed,
            Self::InMapping { source, .. } | Self::InSequence { source, .. } => source.code(),
        }
    }
}

/// Whether unknown aliases and fetch failures are fatal or merely
/// warned about (with the reference resolving to `Value::Null`).
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolvePolicy {
    /// When `true`, unknown-alias and fetch failures become warnings.
    pub allow_missing_provider: bool,
}

/// Drives recursive reference resolution over a value tree.
pub struct Resolver {
    cache: FetchCache,
    context: ResolutionContext,
    fetcher: Arc<dyn ProviderFetcher>,
    policy: ResolvePolicy,
}

impl Resolver {
    /// Build a resolver with a fresh cache and context, wired to
    /// `fetcher` and `policy`.
    #[must_use]
    pub fn new(fetcher: Arc<dyn ProviderFetcher>, policy: ResolvePolicy) -> Self {
        Self {
            cache: FetchCache::new(),
            context: ResolutionContext::new(),
            fetcher,
            policy,
        }
    }

    /// Resolve every `Reference` leaf reachable from `value`, collecting
    /// non-fatal diagnostics into `warnings`.
    pub fn resolve_value<'a>(
        &'a self,
        value: &'a Value,
        warnings: &'a mut Vec<String>,
    ) -> Pin<Box<dyn Future<Output = Result<Value, ResolveError>> + 'a>> {
        Box::pin(async move {
            match value {
                Value::Reference(r) => self.resolve_reference(r, warnings).await,
                Value::Mapping(map) => {
                    let mut out = BTreeMap::new();
                    for (key, v) in map {
                        let resolved = self.resolve_value(v, warnings).await.map_err(|source| {
                            ResolveError::InMapping {
                                key: key.clone(),
                                source: Box::new(source),
                            }
                        })?;
                        out.insert(key.clone(), resolved);
                    }
                    Ok(Value::Mapping(out))
                }
                Value::Sequence(items) => {
                    let mut out = Vec::with_capacity(items.len());
                    for (index, item) in items.iter().enumerate() {
                        let resolved =
                            self.resolve_value(item, warnings).await.map_err(|source| {
                                ResolveError::InSequence {
                                    index,
                                    source: Box::new(source),
                                }
                            })?;
                        out.push(resolved);
                    }
                    Ok(Value::Sequence(out))
                }
                Value::Secret(inner) => {
                    let resolved = self.resolve_value(inner, warnings).await?;
                    Ok(Value::Secret(Box::new(resolved)))
                }
                other => Ok(other.clone()),
            }
        })
    }

    async fn resolve_reference(
        &self,
        reference: &Reference,
        warnings: &mut Vec<String>,
    ) -> Result<Value, ResolveError> {
        let path_segments = reference.path.segments().to_vec();
        let joined = CslPath::new(path_segments.clone()).joined();

        if let Some(cached) = self.cache.get(&reference.alias, &path_segments).await {
            return Ok(cached);
        }

        self.context
            .push(&reference.alias, &joined)
            .map_err(|e| ResolveError::Circular(e, reference.span.clone()))?;

        let result = self.fetch_and_resolve(reference, &path_segments, warnings).await;
        self.context.pop();
        let value = result?;

        self.cache
            .set(&reference.alias, &path_segments, value.clone())
            .await;
        Ok(value)
    }

    async fn fetch_and_resolve(
        &self,
        reference: &Reference,
        path_segments: &[String],
        warnings: &mut Vec<String>,
    ) -> Result<Value, ResolveError> {
        if !self.fetcher.has_alias(&reference.alias) {
            if self.policy.allow_missing_provider {
                let msg = format!(
                    "unknown provider alias {:?} at {} (treated as null: AllowMissingProvider)",
                    reference.alias, reference.span
                );
                warn!(target: "nomos.resolve", "{msg}");
                warnings.push(msg);
                return Ok(Value::Null);
            }
            return Err(ResolveError::UnknownAlias {
                alias: reference.alias.clone(),
                span: reference.span.clone(),
            });
        }

        let fetched = match self.fetcher.fetch(&reference.alias, path_segments).await {
            Ok(v) => v,
            Err(source) => {
                if self.policy.allow_missing_provider {
                    let msg = format!(
                        "fetch failed for {:?} at {} (treated as null: AllowMissingProvider): {source}",
                        reference.alias, reference.span
                    );
                    warn!(target: "nomos.resolve", "{msg}");
                    warnings.push(msg);
                    return Ok(Value::Null);
                }
                return Err(ResolveError::FetchFailed {
                    alias: reference.alias.clone(),
                    path: path_segments.join("/"),
                    span: reference.span.clone(),
                    source,
                });
            }
        };

        // References inside fetched data are themselves resolved.
        self.resolve_value(&fetched, warnings).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nomos_core::Path as CslPath;
    use std::sync::Mutex as StdMutex;

    struct FakeFetcher {
        values: BTreeMap<String, Value>,
        aliases: Vec<String>,
        calls: StdMutex<u32>,
    }

    #[async_trait]
    impl ProviderFetcher for FakeFetcher {
        fn has_alias(&self, alias: &str) -> bool {
            self.aliases.iter().any(|a| a == alias)
        }

        async fn fetch(&self, alias: &str, path: &[String]) -> Result<Value, String> {
            *self.calls.lock().unwrap() += 1;
            let key = format!("{alias}:{}", path.join("/"));
            self.values
                .get(&key)
                .cloned()
                .ok_or_else(|| format!("no such path {key:?}"))
        }
    }

    fn reference(alias: &str, segments: &[&str]) -> Reference {
        Reference {
            alias: alias.to_string(),
            path: CslPath::new(segments.iter().map(|s| s.to_string()).collect()),
            span: SourceSpan {
                file: "test.csl".into(),
                line: 1,
                col: 1,
            },
        }
    }

    #[tokio::test]
    async fn resolves_a_scalar_reference() {
        let mut values = BTreeMap::new();
        values.insert("db:a".to_string(), Value::Int(42));
        let fetcher = Arc::new(FakeFetcher {
            values,
            aliases: vec!["db".into()],
            calls: StdMutex::new(0),
        });
        let resolver = Resolver::new(fetcher, ResolvePolicy::default());
        let mut warnings = Vec::new();
        let value = Value::Reference(reference("db", &["a"]));
        let resolved = resolver.resolve_value(&value, &mut warnings).await.unwrap();
        assert_eq!(resolved, Value::Int(42));
        assert!(warnings.is_empty());
    }

    #[tokio::test]
    async fn second_fetch_of_same_key_is_served_from_cache() {
        let mut values = BTreeMap::new();
        values.insert("db:a".to_string(), Value::Int(1));
        let fetcher = Arc::new(FakeFetcher {
            values,
            aliases: vec!["db".into()],
            calls: StdMutex::new(0),
        });
        let resolver = Resolver::new(fetcher.clone(), ResolvePolicy::default());
        let mut warnings = Vec::new();
        let value = Value::Reference(reference("db", &["a"]));
        resolver.resolve_value(&value, &mut warnings).await.unwrap();
        resolver.resolve_value(&value, &mut warnings).await.unwrap();
        assert_eq!(*fetcher.calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn unknown_alias_is_fatal_by_default() {
        let fetcher = Arc::new(FakeFetcher {
            values: BTreeMap::new(),
            aliases: vec![],
            calls: StdMutex::new(0),
        });
        let resolver = Resolver::new(fetcher, ResolvePolicy::default());
        let mut warnings = Vec::new();
        let value = Value::Reference(reference("ghost", &["a"]));
        let err = resolver.resolve_value(&value, &mut warnings).await.unwrap_err();
        assert!(matches!(err, ResolveError::UnknownAlias { .. }));
    }

    #[tokio::test]
    async fn unknown_alias_becomes_null_with_allow_missing_provider() {
        let fetcher = Arc::new(FakeFetcher {
            values: BTreeMap::new(),
            aliases: vec![],
            calls: StdMutex::new(0),
        });
        let resolver = Resolver::new(
            fetcher,
            ResolvePolicy {
                allow_missing_provider: true,
            },
        );
        let mut warnings = Vec::new();
        let value = Value::Reference(reference("ghost", &["a"]));
        let resolved = resolver.resolve_value(&value, &mut warnings).await.unwrap();
        assert_eq!(resolved, Value::Null);
        assert_eq!(warnings.len(), 1);
    }

    #[tokio::test]
    async fn mapping_resolves_every_value_and_keeps_keys() {
        let mut values = BTreeMap::new();
        values.insert("db:a".to_string(), Value::Int(1));
        values.insert("db:b".to_string(), Value::Int(2));
        let fetcher = Arc::new(FakeFetcher {
            values,
            aliases: vec!["db".into()],
            calls: StdMutex::new(0),
        });
        let resolver = Resolver::new(fetcher, ResolvePolicy::default());
        let mut warnings = Vec::new();
        let mut map = BTreeMap::new();
        map.insert("x".to_string(), Value::Reference(reference("db", &["a"])));
        map.insert("y".to_string(), Value::Reference(reference("db", &["b"])));
        let resolved = resolver
            .resolve_value(&Value::Mapping(map), &mut warnings)
            .await
            .unwrap();
        match resolved {
            Value::Mapping(m) => {
                assert_eq!(m.get("x"), Some(&Value::Int(1)));
                assert_eq!(m.get("y"), Some(&Value::Int(2)));
            }
            other => panic!("expected mapping, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn fetched_data_containing_a_reference_is_itself_resolved() {
        let mut values = BTreeMap::new();
        values.insert(
            "db:outer".to_string(),
            Value::Reference(reference("db", &["inner"])),
        );
        values.insert("db:inner".to_string(), Value::Int(99));
        let fetcher = Arc::new(FakeFetcher {
            values,
            aliases: vec!["db".into()],
            calls: StdMutex::new(0),
        });
        let resolver = Resolver::new(fetcher, ResolvePolicy::default());
        let mut warnings = Vec::new();
        let value = Value::Reference(reference("db", &["outer"]));
        let resolved = resolver.resolve_value(&value, &mut warnings).await.unwrap();
        assert_eq!(resolved, Value::Int(99));
    }
}
