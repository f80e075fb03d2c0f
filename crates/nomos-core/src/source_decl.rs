// SPDX-License-Identifier: MIT OR Apache-2.0
//! [`SourceDecl`] — a provider instantiation request embedded in a
//! parsed `.csl` source file.

use crate::expr::Expr;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A provider declaration parsed from a source file: `source "db" {
/// type = "postgres", ... }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDecl {
    /// Alias this provider will be registered and referenced under.
    pub alias: String,
    /// Provider type name, looked up first in the in-process type
    /// registry and then, on miss, resolved to an external binary.
    pub r#type: String,
    /// Free-form configuration passed to the provider's `Init`.
    pub config: BTreeMap<String, Expr>,
}

impl SourceDecl {
    /// Lower `config` into a resolved-value mapping, preserving any
    /// embedded `ReferenceExpr`s verbatim (spec §4.12 step 3).
    #[must_use]
    pub fn config_as_values(&self) -> BTreeMap<String, crate::value::Value> {
        self.config
            .iter()
            .map(|(k, v)| (k.clone(), v.clone().into_value()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn config_as_values_lowers_each_entry() {
        let decl = SourceDecl {
            alias: "db".into(),
            r#type: "postgres".into(),
            config: BTreeMap::from([("host".to_string(), Expr::StringLiteral("local".into()))]),
        };
        let values = decl.config_as_values();
        assert_eq!(values.get("host"), Some(&Value::String("local".into())));
    }
}
