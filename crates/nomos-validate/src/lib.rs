// SPDX-License-Identifier: MIT OR Apache-2.0
//! nomos-validate
#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! The semantic validator (spec §4.10, C10): operates on the value
//! tree after reference resolution. Detects any `Reference` that
//! survived resolution (with Levenshtein-based alias suggestions) and
//! detects cycles in an explicit dependency graph.

/// Unresolved-reference detection and alias suggestion.
pub mod alias;
/// Dependency-cycle detection.
pub mod cycle;

pub use alias::{
    find_unresolved_references, suggest_alias, UnresolvedReferenceError, SUGGESTION_MAX_DISTANCE,
};
pub use cycle::{CycleError, DependencyGraph};

use nomos_core::Value;

/// The result of validating a fully-resolved value tree.
#[derive(Debug, Default)]
pub struct ValidationReport {
    /// References that never resolved.
    pub unresolved_references: Vec<UnresolvedReferenceError>,
    /// A dependency cycle, if the caller supplied a graph to check.
    pub cycle: Option<CycleError>,
}

impl ValidationReport {
    /// `true` if nothing was found.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.unresolved_references.is_empty() && self.cycle.is_none()
    }
}

/// Run both checks: unresolved-reference detection against
/// `registered_aliases`, and (if `dependency_graph` is given)
/// cycle detection.
#[must_use]
pub fn validate(
    tree: &Value,
    registered_aliases: &[String],
    dependency_graph: Option<&DependencyGraph>,
) -> ValidationReport {
    ValidationReport {
        unresolved_references: find_unresolved_references(tree, registered_aliases),
        cycle: dependency_graph.and_then(DependencyGraph::detect_cycle),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn clean_tree_with_no_graph_is_clean() {
        let mut map = BTreeMap::new();
        map.insert("a".to_string(), Value::Int(1));
        let report = validate(&Value::Mapping(map), &[], None);
        assert!(report.is_clean());
    }

    #[test]
    fn a_cycle_makes_the_report_dirty_even_with_a_clean_tree() {
        let mut graph = DependencyGraph::new();
        graph.add_edge("x", "y");
        graph.add_edge("y", "x");
        let report = validate(&Value::Null, &[], Some(&graph));
        assert!(!report.is_clean());
        assert!(report.cycle.is_some());
    }
}
