// SPDX-License-Identifier: MIT OR Apache-2.0
//! The parser boundary (spec §1, §4.12 step 2): the core consumes an
//! already-parsed tree exposing `SourceDecl` and value expressions. The
//! parser itself is an external collaborator; this module only defines
//! the shape `Compile` expects it to produce and the trait used to
//! inject it.

use nomos_core::{SourceDecl, Value};
use std::path::Path;
use thiserror::Error;

/// One source file's parsed contents: the provider declarations it
/// embeds, plus its top-level value tree (pre-merge, pre-resolution).
#[derive(Debug, Clone)]
pub struct ParsedFile {
    /// `source "alias" { type = ..., ... }` declarations found in this
    /// file, in file order.
    pub source_decls: Vec<SourceDecl>,
    /// This file's own data, not yet merged with any other file's.
    pub tree: Value,
}

impl Default for ParsedFile {
    fn default() -> Self {
        Self {
            source_decls: Vec::new(),
            tree: Value::empty_mapping(),
        }
    }
}

/// A parse failure for a single file. Fatal for that file only — per
/// spec §4.12 step 2, other files continue through the pipeline.
#[derive(Debug, Error, Clone)]
#[error("{file}: {message}")]
pub struct ParseError {
    /// Absolute path of the file that failed to parse.
    pub file: String,
    /// Human-readable parse failure description.
    pub message: String,
}

/// The external parser/AST-producer collaborator. `Compile` calls this
/// once per discovered file; it does not implement `.csl` grammar
/// itself (spec §1 names this as out of scope).
pub trait FileParser: Send + Sync {
    /// Parse `path`'s contents, with `vars` available for any
    /// variable substitution the parser performs.
    fn parse(
        &self,
        path: &Path,
        vars: &std::collections::BTreeMap<String, Value>,
    ) -> Result<ParsedFile, ParseError>;
}
