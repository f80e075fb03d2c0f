// SPDX-License-Identifier: MIT OR Apache-2.0
//! Per-target key validation (spec §4.13): fails fast, before any
//! rendering happens, with every offending key collected in one error.

use crate::error::SerializeError;
use crate::target::Target;
use std::collections::BTreeSet;

/// Validate every mapping key reachable from `value` against `target`'s
/// rules. JSON accepts any string key; YAML rejects `NUL`; HCL-tfvars
/// requires `^[A-Za-z_][A-Za-z0-9_-]*$`.
pub fn validate_keys(value: &serde_json::Value, target: Target) -> Result<(), SerializeError> {
    let mut offending = BTreeSet::new();
    collect_offending_keys(value, target, &mut offending);
    if offending.is_empty() {
        return Ok(());
    }
    Err(SerializeError::InvalidKey {
        target: target.to_string(),
        keys: offending.into_iter().collect(),
    })
}

fn collect_offending_keys(value: &serde_json::Value, target: Target, out: &mut BTreeSet<String>) {
    match value {
        serde_json::Value::Object(map) => {
            for (key, child) in map {
                if !is_valid_key(key, target) {
                    out.insert(key.clone());
                }
                collect_offending_keys(child, target, out);
            }
        }
        serde_json::Value::Array(items) => {
            for item in items {
                collect_offending_keys(item, target, out);
            }
        }
        _ => {}
    }
}

fn is_valid_key(key: &str, target: Target) -> bool {
    match target {
        Target::Json => true,
        Target::Yaml => !key.contains('\0'),
        Target::Tfvars => is_tfvars_identifier(key),
    }
}

fn is_tfvars_identifier(key: &str) -> bool {
    let mut chars = key.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !(first.is_ascii_alphabetic() || first == '_') {
        return false;
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_accepts_anything() {
        assert!(validate_keys(&json!({"my key": 1}), Target::Json).is_ok());
    }

    #[test]
    fn yaml_rejects_nul_byte() {
        let key = format!("bad{}key", '\0');
        let err = validate_keys(&json!({key.clone(): 1}), Target::Yaml).unwrap_err();
        match err {
            SerializeError::InvalidKey { keys, .. } => assert_eq!(keys, vec![key]),
            other => panic!("expected InvalidKey, got {other:?}"),
        }
    }

    #[test]
    fn tfvars_rejects_spaces_and_empty_string() {
        let err = validate_keys(&json!({"my key": 1}), Target::Tfvars).unwrap_err();
        assert!(matches!(err, SerializeError::InvalidKey { .. }));
        assert!(!is_tfvars_identifier(""));
        assert!(is_tfvars_identifier("a"));
        assert!(is_tfvars_identifier("_port-1"));
    }

    #[test]
    fn tfvars_collects_nested_violations_sorted() {
        let err = validate_keys(
            &json!({"ok": {"bad one": 1, "also bad": 2}}),
            Target::Tfvars,
        )
        .unwrap_err();
        match err {
            SerializeError::InvalidKey { keys, .. } => {
                assert_eq!(keys, vec!["also bad".to_string(), "bad one".to_string()])
            }
            other => panic!("expected InvalidKey, got {other:?}"),
        }
    }
}
