// SPDX-License-Identifier: MIT OR Apache-2.0
//! [`Expr`] — the parse-tree expression node the external parser produces.
//!
//! The parser itself is an external collaborator (spec §1); this crate
//! only needs to consume its output. `Expr` models exactly the shapes a
//! `.csl` config value or source-file tree can take once parsed, and
//! [`Expr::into_value`] is the single place that lowers it into a
//! [`Value`] — shared by source-declaration config conversion and
//! per-file tree construction (spec §4.12 steps 3 and 4).

use crate::path::Path;
use crate::value::{Reference, Value};
use nomos_error::SourceSpan;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A parsed expression node, prior to reference resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// The literal `null`.
    Null,
    /// A literal boolean.
    Bool(bool),
    /// A literal integer.
    Int(i64),
    /// A literal float.
    Float(f64),
    /// A literal string.
    StringLiteral(String),
    /// A `Secret(...)`-wrapped expression.
    Secret(Box<Expr>),
    /// A `@alias:a.b.c` reference expression.
    ReferenceExpr {
        /// Alias of the referenced provider.
        alias: String,
        /// Path within the provider's data.
        path: Path,
        /// Source location.
        span: SourceSpan,
    },
    /// An ordered sequence of expressions.
    Sequence(Vec<Expr>),
    /// A mapping of expressions.
    Mapping(BTreeMap<String, Expr>),
}

impl Expr {
    /// Lower this expression into a [`Value`].
    ///
    /// `StringLiteral` (and other literals) become their `Value`
    /// counterpart directly; `ReferenceExpr` is preserved verbatim as a
    /// [`Value::Reference`] for later resolution, per spec §4.12 step 3.
    #[must_use]
    pub fn into_value(self) -> Value {
        match self {
            Expr::Null => Value::Null,
            Expr::Bool(b) => Value::Bool(b),
            Expr::Int(i) => Value::Int(i),
            Expr::Float(f) => Value::Float(f),
            Expr::StringLiteral(s) => Value::String(s),
            Expr::Secret(inner) => Value::Secret(Box::new(inner.into_value())),
            Expr::ReferenceExpr { alias, path, span } => {
                Value::Reference(Reference { alias, path, span })
            }
            Expr::Sequence(items) => {
                Value::Sequence(items.into_iter().map(Expr::into_value).collect())
            }
            Expr::Mapping(map) => Value::Mapping(
                map.into_iter()
                    .map(|(k, v)| (k, v.into_value()))
                    .collect(),
            ),
        }
    }
}
