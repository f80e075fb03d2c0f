// SPDX-License-Identifier: MIT OR Apache-2.0
//! Canonicalization (spec §4.13): lowers a [`nomos_core::Value`] tree
//! into a `serde_json::Value`, the shared intermediate every target
//! renders from. `serde_json::Map` is backed by a `BTreeMap` in this
//! workspace (the `preserve_order` feature is not enabled), so mapping
//! keys come out already in strict lexicographic order with no extra
//! sort step.

use crate::error::SerializeError;
use nomos_core::Value;
use serde_json::{Map, Number};

/// Lower `value` into its canonical JSON representation, or fail if any
/// reachable leaf has no representation in the target format (a
/// `Reference` or `Secret` that survived resolution/encryption).
pub fn to_canonical(value: &Value, path: &str) -> Result<serde_json::Value, SerializeError> {
    match value {
        Value::Null => Ok(serde_json::Value::Null),
        Value::Bool(b) => Ok(serde_json::Value::Bool(*b)),
        Value::Int(i) => Ok(serde_json::json!(i)),
        Value::Float(f) => Number::from_f64(*f).map(serde_json::Value::Number).ok_or(
            SerializeError::UnsupportedType {
                path: path.to_string(),
                type_name: "non-finite float",
            },
        ),
        // `String` is a Rust `String`, already guaranteed valid UTF-8 by
        // the type system, so there is never an invalid byte run to
        // rewrite here.
        Value::String(s) => Ok(serde_json::Value::String(s.clone())),
        Value::Secret(_) => Err(SerializeError::UnsupportedType {
            path: path.to_string(),
            type_name: value.type_name(),
        }),
        Value::Reference(_) => Err(SerializeError::UnsupportedType {
            path: path.to_string(),
            type_name: value.type_name(),
        }),
        Value::Sequence(items) => {
            let mut out = Vec::with_capacity(items.len());
            for (index, item) in items.iter().enumerate() {
                let child_path = format!("{path}[{index}]");
                out.push(to_canonical(item, &child_path)?);
            }
            Ok(serde_json::Value::Array(out))
        }
        Value::Mapping(map) => {
            let mut out = Map::new();
            for (key, v) in map {
                let child_path = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{path}.{key}")
                };
                out.insert(key.clone(), to_canonical(v, &child_path)?);
            }
            Ok(serde_json::Value::Object(out))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn mapping_keys_come_out_sorted() {
        let mut map = BTreeMap::new();
        map.insert("z".to_string(), Value::Int(1));
        map.insert("a".to_string(), Value::Int(2));
        let canonical = to_canonical(&Value::Mapping(map), "").unwrap();
        let keys: Vec<&String> = canonical.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["a", "z"]);
    }

    #[test]
    fn sequence_path_uses_bracket_index() {
        let value = Value::Sequence(vec![Value::Int(1), Value::Reference(nomos_core::Reference {
            alias: "db".into(),
            path: nomos_core::Path::new(["x"]),
            span: nomos_error::SourceSpan {
                file: "a.csl".into(),
                line: 1,
                col: 1,
            },
        })]);
        let err = to_canonical(&value, "a.b").unwrap_err();
        match err {
            SerializeError::UnsupportedType { path, type_name } => {
                assert_eq!(path, "a.b[1]");
                assert_eq!(type_name, "reference");
            }
            other => panic!("expected UnsupportedType, got {other:?}"),
        }
    }

    #[test]
    fn nan_float_is_unsupported() {
        let err = to_canonical(&Value::Float(f64::NAN), "x").unwrap_err();
        assert!(matches!(err, SerializeError::UnsupportedType { .. }));
    }
}
