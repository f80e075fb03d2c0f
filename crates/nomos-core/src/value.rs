// SPDX-License-Identifier: MIT OR Apache-2.0
//! [`Value`] — the recursive union every `.csl` construct is eventually
//! reduced to: `null | bool | int | float | string | Secret(Value) |
//! Reference(alias, Path) | sequence<Value> | mapping<string, Value>`.

use crate::path::Path;
use nomos_error::SourceSpan;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A reference to data owned by a provider: `@alias:a.b.c` in source form.
///
/// A `Reference` surviving past [the validator](`crate::Snapshot`) is an
/// error — see `nomos-validate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    /// Alias of the provider this reference addresses.
    pub alias: String,
    /// Path within the provider's data.
    pub path: Path,
    /// Source location, for error reporting.
    pub span: SourceSpan,
}

/// The recursive value tree.
///
/// `Mapping` is backed by a `BTreeMap` since mappings carry no
/// insertion order at rest — using an already-sorted container means
/// no extra sort step is needed to produce one, and serializers still
/// re-sort explicitly per format to keep that guarantee visible at the
/// call site rather than implicit here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// The null scalar.
    Null,
    /// Boolean scalar.
    Bool(bool),
    /// Signed 64-bit integer scalar.
    Int(i64),
    /// 64-bit float scalar.
    Float(f64),
    /// UTF-8 string scalar.
    String(String),
    /// A leaf tagged for encryption before the value can be emitted.
    Secret(Box<Value>),
    /// An unresolved reference into a provider's data.
    Reference(Reference),
    /// Order-significant sequence of values.
    Sequence(Vec<Value>),
    /// Key-sorted mapping of values.
    Mapping(BTreeMap<String, Value>),
}

impl Value {
    /// Construct an empty mapping.
    #[must_use]
    pub fn empty_mapping() -> Self {
        Value::Mapping(BTreeMap::new())
    }

    /// `true` if this value (or, recursively, any of its children) is or
    /// contains a [`Reference`].
    #[must_use]
    pub fn contains_reference(&self) -> bool {
        match self {
            Value::Reference(_) => true,
            Value::Secret(inner) => inner.contains_reference(),
            Value::Sequence(items) => items.iter().any(Value::contains_reference),
            Value::Mapping(map) => map.values().any(Value::contains_reference),
            _ => false,
        }
    }

    /// `true` if this value (or, recursively, any of its children) is or
    /// contains a [`Value::Secret`].
    #[must_use]
    pub fn contains_secret(&self) -> bool {
        match self {
            Value::Secret(_) => true,
            Value::Reference(_) => false,
            Value::Sequence(items) => items.iter().any(Value::contains_secret),
            Value::Mapping(map) => map.values().any(Value::contains_secret),
            _ => false,
        }
    }

    /// Best-effort JSON rendering of the value, used by providers that
    /// need to serialize a non-string `Secret` payload before encryption.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::json!(i),
            Value::Float(f) => serde_json::json!(f),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Secret(inner) => inner.to_json(),
            Value::Reference(r) => serde_json::json!({"@ref": r.alias, "path": r.path.joined()}),
            Value::Sequence(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Mapping(map) => serde_json::Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }

    /// A short, stable name for this value's runtime type, used in
    /// serialization error messages (`unsupported type at path a.b[2].c`).
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Secret(_) => "secret",
            Value::Reference(_) => "reference",
            Value::Sequence(_) => "sequence",
            Value::Mapping(_) => "mapping",
        }
    }
}
