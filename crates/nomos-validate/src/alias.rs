// SPDX-License-Identifier: MIT OR Apache-2.0
//! Unresolved-reference detection against the registered-aliases list
//! (spec §4.10, C10).

use nomos_core::{Path, Reference, Value};
use nomos_error::{CodedError, ErrorCode, SourceSpan};
use thiserror::Error;

/// Maximum Levenshtein distance for an alias to be suggested as a
/// likely typo of an unresolved reference's alias.
pub const SUGGESTION_MAX_DISTANCE: usize = 2;

/// A `Reference` survived to the validation stage: either its alias
/// never resolved, or (in principle) resolution was skipped.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unresolved reference to {alias:?}:{path} at {span}{}", render_suggestion(suggestion))]
pub struct UnresolvedReferenceError {
    /// The alias the reference names.
    pub alias: String,
    /// The path within that alias's data.
    pub path: String,
    /// Source location of the reference.
    pub span: SourceSpan,
    /// The closest registered alias, if within [`SUGGESTION_MAX_DISTANCE`].
    pub suggestion: Option<String>,
}

fn render_suggestion(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(s) => format!(" (did you mean {s:?}?)"),
        None => String::new(),
    }
}

impl CodedError for UnresolvedReferenceError {
    fn code(&self) -> ErrorCode {
        ErrorCode::ValidationUnresolvedReference
    }
}

/// The closest alias in `registered` to `alias`, if any is within
/// [`SUGGESTION_MAX_DISTANCE`] edits.
#[must_use]
pub fn suggest_alias(alias: &str, registered: &[String]) -> Option<String> {
    registered
        .iter()
        .map(|candidate| (candidate, strsim::levenshtein(alias, candidate)))
        .filter(|(_, distance)| *distance <= SUGGESTION_MAX_DISTANCE)
        .min_by_key(|(_, distance)| *distance)
        .map(|(candidate, _)| candidate.clone())
}

/// Walk `value`, collecting an [`UnresolvedReferenceError`] for every
/// `Reference` node still present.
#[must_use]
pub fn find_unresolved_references(
    value: &Value,
    registered_aliases: &[String],
) -> Vec<UnresolvedReferenceError> {
    let mut out = Vec::new();
    walk(value, registered_aliases, &mut out);
    out
}

fn walk(value: &Value, registered_aliases: &[String], out: &mut Vec<UnresolvedReferenceError>) {
    match value {
        Value::Reference(r) => out.push(make_error(r, registered_aliases)),
        Value::Secret(inner) => walk(inner, registered_aliases, out),
        Value::Sequence(items) => {
            for item in items {
                walk(item, registered_aliases, out);
            }
        }
        Value::Mapping(map) => {
            for v in map.values() {
                walk(v, registered_aliases, out);
            }
        }
        _ => {}
    }
}

fn make_error(reference: &Reference, registered_aliases: &[String]) -> UnresolvedReferenceError {
    UnresolvedReferenceError {
        alias: reference.alias.clone(),
        path: Path::new(reference.path.segments().to_vec()).joined(),
        span: reference.span.clone(),
        suggestion: suggest_alias(&reference.alias, registered_aliases),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn span() -> SourceSpan {
        SourceSpan {
            file: "a.csl".into(),
            line: 1,
            col: 1,
        }
    }

    fn reference(alias: &str) -> Reference {
        Reference {
            alias: alias.to_string(),
            path: Path::new(["x"]),
            span: span(),
        }
    }

    #[test]
    fn exact_typo_is_suggested() {
        let registered = vec!["postgres".to_string(), "redis".to_string()];
        assert_eq!(
            suggest_alias("postgess", &registered),
            Some("postgres".to_string())
        );
    }

    #[test]
    fn distant_alias_is_not_suggested() {
        let registered = vec!["postgres".to_string()];
        assert_eq!(suggest_alias("completely-different", &registered), None);
    }

    #[test]
    fn fully_resolved_tree_has_no_unresolved_references() {
        let mut map = BTreeMap::new();
        map.insert("a".to_string(), Value::Int(1));
        let issues = find_unresolved_references(&Value::Mapping(map), &[]);
        assert!(issues.is_empty());
    }

    #[test]
    fn a_lone_reference_is_reported_with_a_suggestion() {
        let registered = vec!["db".to_string()];
        let value = Value::Reference(reference("dbb"));
        let issues = find_unresolved_references(&value, &registered);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].suggestion, Some("db".to_string()));
    }

    #[test]
    fn references_nested_in_sequences_and_mappings_are_found() {
        let mut map = BTreeMap::new();
        map.insert(
            "list".to_string(),
            Value::Sequence(vec![Value::Reference(reference("ghost"))]),
        );
        let issues = find_unresolved_references(&Value::Mapping(map), &[]);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].alias, "ghost");
    }
}
