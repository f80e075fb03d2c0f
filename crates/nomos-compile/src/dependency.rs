// SPDX-License-Identifier: MIT OR Apache-2.0
//! Builds the provider dependency graph validated by `nomos-validate`
//! (C10) from the source declarations collected during stage 3: an
//! edge `alias -> other` means `alias`'s init config references data
//! owned by `other`.

use nomos_core::{Expr, SourceDecl};
use nomos_validate::DependencyGraph;

/// Build a [`DependencyGraph`] over every declared alias, with an edge
/// to every alias referenced anywhere inside that declaration's config.
#[must_use]
pub fn build_dependency_graph(decls: &[SourceDecl]) -> DependencyGraph {
    let mut graph = DependencyGraph::new();
    for decl in decls {
        for expr in decl.config.values() {
            for referenced_alias in referenced_aliases(expr) {
                graph.add_edge(&decl.alias, &referenced_alias);
            }
        }
    }
    graph
}

fn referenced_aliases(expr: &Expr) -> Vec<String> {
    let mut out = Vec::new();
    walk(expr, &mut out);
    out
}

fn walk(expr: &Expr, out: &mut Vec<String>) {
    match expr {
        Expr::ReferenceExpr { alias, .. } => out.push(alias.clone()),
        Expr::Secret(inner) => walk(inner, out),
        Expr::Sequence(items) => {
            for item in items {
                walk(item, out);
            }
        }
        Expr::Mapping(map) => {
            for v in map.values() {
                walk(v, out);
            }
        }
        _ => {}
    }
}
