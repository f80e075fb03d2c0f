// SPDX-License-Identifier: MIT OR Apache-2.0
//! nomos-serialize
#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! The deterministic serializer (spec §4.13, C13): renders a
//! [`nomos_core::Snapshot`] as JSON, YAML, or HCL-`tfvars`, with sorted
//! mapping keys, canonical scalars, and per-target key validation.

/// Lowering a `Value` tree into the shared canonical JSON intermediate.
pub mod canon;
/// Serialization error types.
pub mod error;
/// HCL-`tfvars` rendering.
pub mod hcl;
/// Per-target key validation.
pub mod keys;
/// The `json | yaml | tfvars` target enum.
pub mod target;

pub use error::SerializeError;
pub use target::{Target, UnknownTargetError};

use nomos_core::Snapshot;
use serde_json::Map;

/// Render `snapshot` for `target`. When `include_metadata` is `false`,
/// the `data` mapping is emitted at the root with no wrapping object;
/// when `true`, the root is the sorted pair `{data, metadata}` with
/// `metadata`'s own fields in a fixed alphabetical order.
pub fn serialize(
    snapshot: &Snapshot,
    target: Target,
    include_metadata: bool,
) -> Result<Vec<u8>, SerializeError> {
    let data = canon::to_canonical(&nomos_core::Value::Mapping(snapshot.data.clone()), "")?;

    let root = if include_metadata {
        let mut root = Map::new();
        root.insert("data".to_string(), data);
        root.insert("metadata".to_string(), metadata_to_canonical(&snapshot.metadata));
        serde_json::Value::Object(root)
    } else {
        data
    };

    keys::validate_keys(&root, target)?;

    Ok(match target {
        Target::Json => render_json(&root),
        Target::Yaml => render_yaml(&root),
        Target::Tfvars => hcl::render(&root).into_bytes(),
    })
}

fn render_json(value: &serde_json::Value) -> Vec<u8> {
    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(
        &mut buf,
        serde_json::ser::PrettyFormatter::with_indent(b"  "),
    );
    serde::Serialize::serialize(value, &mut ser).expect("canonical value always serializes");
    buf
}

fn render_yaml(value: &serde_json::Value) -> Vec<u8> {
    serde_yaml::to_string(value)
        .expect("canonical value always serializes")
        .into_bytes()
}

/// `Metadata`'s fields rendered in a fixed alphabetical order, with
/// `per_key_provenance` entries similarly alphabetized.
fn metadata_to_canonical(metadata: &nomos_core::Metadata) -> serde_json::Value {
    let mut per_key_provenance = Map::new();
    for (key, provenance) in &metadata.per_key_provenance {
        let mut entry = Map::new();
        entry.insert(
            "provider_alias".to_string(),
            provenance
                .provider_alias
                .clone()
                .map(serde_json::Value::String)
                .unwrap_or(serde_json::Value::Null),
        );
        entry.insert(
            "source".to_string(),
            serde_json::Value::String(provenance.source.clone()),
        );
        per_key_provenance.insert(key.clone(), serde_json::Value::Object(entry));
    }

    let mut out = Map::new();
    out.insert(
        "end_time".to_string(),
        serde_json::Value::String(metadata.end_time.to_rfc3339()),
    );
    out.insert(
        "errors".to_string(),
        serde_json::Value::Array(
            metadata
                .errors
                .iter()
                .map(|e| serde_json::Value::String(e.clone()))
                .collect(),
        ),
    );
    out.insert(
        "input_files".to_string(),
        serde_json::Value::Array(
            metadata
                .input_files
                .iter()
                .map(|f| serde_json::Value::String(f.clone()))
                .collect(),
        ),
    );
    out.insert(
        "per_key_provenance".to_string(),
        serde_json::Value::Object(per_key_provenance),
    );
    out.insert(
        "provider_aliases".to_string(),
        serde_json::Value::Array(
            metadata
                .provider_aliases
                .iter()
                .map(|a| serde_json::Value::String(a.clone()))
                .collect(),
        ),
    );
    out.insert(
        "start_time".to_string(),
        serde_json::Value::String(metadata.start_time.to_rfc3339()),
    );
    out.insert(
        "warnings".to_string(),
        serde_json::Value::Array(
            metadata
                .warnings
                .iter()
                .map(|w| serde_json::Value::String(w.clone()))
                .collect(),
        ),
    );
    serde_json::Value::Object(out)
}
