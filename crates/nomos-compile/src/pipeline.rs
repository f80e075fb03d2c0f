// SPDX-License-Identifier: MIT OR Apache-2.0
//! The pipeline orchestrator (spec §4.12, C12): `compile` runs file
//! discovery, provider initialization, tree merge, reference
//! resolution, validation, and secret encryption in that order,
//! producing a [`Snapshot`] even when some stages reported errors.

use crate::dependency::build_dependency_graph;
use crate::discover::{discover_input_files, DiscoverError};
use crate::options::CompileOptions;
use crate::parser::ParsedFile;
use crate::providers::{merge_config, CompileProviders};
use crate::secrets::encrypt_secrets;
use chrono::Utc;
use nomos_core::{Provenance, SourceDecl, Snapshot, Value};
use nomos_error::{CodedError, ErrorCode};
use nomos_host::ProviderHost;
use nomos_resolve::{ProviderFetcher, ResolvePolicy, Resolver};
use nomos_validate::validate;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// A failure that prevents `compile` from producing any [`Snapshot`] at
/// all. Every other error encountered during a run is instead
/// collected into `Snapshot.metadata.errors`.
#[derive(Debug, Error)]
pub enum CompileError {
    /// File discovery (stage 1) failed outright.
    #[error(transparent)]
    Discover(#[from] DiscoverError),
}

impl CodedError for CompileError {
    fn code(&self) -> ErrorCode {
        match self {
            Self::Discover(e) => e.code(),
        }
    }
}

struct ParsedWithPath {
    path: PathBuf,
    parsed: ParsedFile,
}

/// Run a full compile (spec §4.12 steps 1-9).
pub async fn compile(options: CompileOptions) -> Result<Snapshot, CompileError> {
    let start_time = Utc::now();
    let mut errors: Vec<String> = Vec::new();
    let mut warnings: Vec<String> = Vec::new();

    // Stage 1: discover.
    let input_files = discover_input_files(&options.path).await?;
    info!(target: "nomos.compile", count = input_files.len(), "discovered input files");

    // Stage 2: parse each file. A parse failure is fatal for that file
    // only; the file is dropped from every later stage.
    let mut parsed_files: Vec<ParsedWithPath> = Vec::new();
    for path in &input_files {
        match options.parser.parse(path, &options.vars) {
            Ok(parsed) => parsed_files.push(ParsedWithPath {
                path: path.clone(),
                parsed,
            }),
            Err(e) => {
                warn!(target: "nomos.compile", file = %path.display(), error = %e, "file failed to parse");
                errors.push(e.to_string());
            }
        }
    }

    // Stage 3: initialize providers from every file's source declarations.
    let host = Arc::new(ProviderHost::new());
    let providers = Arc::new(CompileProviders::new(
        Arc::clone(&options.provider_type_registry),
        options.binary_resolver.clone(),
        Arc::clone(&host),
        options.max_concurrent_providers,
        options.timeout_per_provider,
    ));

    let mut all_decls: Vec<SourceDecl> = Vec::new();
    for file in &parsed_files {
        for decl in &file.parsed.source_decls {
            all_decls.push(decl.clone());
            if providers.is_registered(&decl.alias).await {
                continue;
            }
            let defaults = options
                .binary_resolver
                .as_ref()
                .and_then(|resolver| resolver.find_by_alias(&decl.alias))
                .map(|resolved| resolved.config.clone())
                .unwrap_or_default();
            let config = merge_config(&defaults, decl.config_as_values());
            let source_file_path = file.path.display().to_string();
            if let Err(e) = providers.register(decl, config, &source_file_path).await {
                warn!(target: "nomos.compile", alias = %decl.alias, error = %e, "provider failed to initialize");
                errors.push(format!("provider {:?}: {e}", decl.alias));
            }
        }
    }

    // Stage 4: build and merge per-file value trees, last-wins in
    // sorted (already-sorted) file order, tracking per-key provenance.
    let mut merged: BTreeMap<String, Value> = BTreeMap::new();
    let mut per_key_provenance: BTreeMap<String, Provenance> = BTreeMap::new();
    for file in &parsed_files {
        let Value::Mapping(file_map) = &file.parsed.tree else {
            errors.push(format!(
                "{}: top-level value must be a mapping",
                file.path.display()
            ));
            continue;
        };
        let source = file.path.display().to_string();
        for (key, value) in file_map {
            let provider_alias = match value {
                Value::Reference(r) => Some(r.alias.clone()),
                _ => None,
            };
            per_key_provenance.insert(
                key.clone(),
                Provenance {
                    source: source.clone(),
                    provider_alias,
                },
            );
            merged.insert(key.clone(), value.clone());
        }
    }

    // Stage 5: resolve references.
    let fetcher: Arc<dyn ProviderFetcher> = providers.clone();
    let policy = ResolvePolicy {
        allow_missing_provider: options.allow_missing_provider,
    };
    let resolver = Resolver::new(fetcher, policy);
    let merged_tree = Value::Mapping(merged);
    let resolved = resolver.resolve_value(&merged_tree, &mut warnings).await;

    let (data_for_validation, resolve_succeeded) = match &resolved {
        Ok(value) => (value.clone(), true),
        Err(e) => {
            errors.push(e.to_string());
            (merged_tree.clone(), false)
        }
    };

    // Stage 6: validate.
    let registered_aliases = providers.registered_aliases().await;
    let dependency_graph = build_dependency_graph(&all_decls);
    let report = validate(&data_for_validation, &registered_aliases, Some(&dependency_graph));
    for unresolved in &report.unresolved_references {
        errors.push(unresolved.to_string());
    }
    if let Some(cycle) = &report.cycle {
        errors.push(cycle.to_string());
    }

    // Stage 7: encrypt secrets, only meaningful once resolution succeeded.
    let data = if resolve_succeeded {
        match encrypt_secrets(&data_for_validation, options.encryption_key.as_deref()) {
            Ok(encrypted) => encrypted,
            Err(e) => {
                errors.push(e.to_string());
                data_for_validation
            }
        }
    } else {
        data_for_validation
    };

    // Stage 8: assemble the snapshot.
    let Value::Mapping(data_map) = data else {
        errors.push("resolved data tree was not a mapping at the root".to_string());
        BTreeMap::new();
        return Ok(finish(
            BTreeMap::new(),
            input_files,
            registered_aliases,
            per_key_provenance,
            start_time,
            errors,
            warnings,
            options.strict_warnings,
            &host,
        )
        .await);
    };

    Ok(finish(
        data_map,
        input_files,
        registered_aliases,
        per_key_provenance,
        start_time,
        errors,
        warnings,
        options.strict_warnings,
        &host,
    )
    .await)
}

#[allow(clippy::too_many_arguments)]
async fn finish(
    data: BTreeMap<String, Value>,
    input_files: Vec<PathBuf>,
    provider_aliases: Vec<String>,
    per_key_provenance: BTreeMap<String, Provenance>,
    start_time: chrono::DateTime<Utc>,
    mut errors: Vec<String>,
    mut warnings: Vec<String>,
    strict_warnings: bool,
    host: &ProviderHost,
) -> Snapshot {
    if let Err(e) = host.shutdown().await {
        warn!(target: "nomos.compile", error = %e, "provider shutdown reported errors");
        errors.push(e.to_string());
    }

    if strict_warnings {
        errors.append(&mut warnings);
    }

    let mut metadata = nomos_core::Metadata::started_at(start_time);
    metadata.input_files = input_files
        .into_iter()
        .map(|p| p.display().to_string())
        .collect();
    metadata.set_provider_aliases(provider_aliases);
    metadata.end_time = Utc::now();
    metadata.errors = errors;
    metadata.warnings = warnings;
    metadata.per_key_provenance = per_key_provenance;

    Snapshot { data, metadata }
}
