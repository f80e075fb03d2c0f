// SPDX-License-Identifier: MIT OR Apache-2.0
//! nomos-core
#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! The stable data model shared by every other `nomos-*` crate: the
//! [`Value`] tree, [`Path`] addressing, parsed [`Expr`]/[`SourceDecl`]
//! input shapes, and the [`Snapshot`] a compile run produces.
//!
//! If you only take one dependency in a downstream crate, take this one.

/// Parsed expression nodes (the external parser's output shape).
pub mod expr;
/// Ordered path segments used to address values.
pub mod path;
/// Provider instantiation requests embedded in source files.
pub mod source_decl;
/// The compile run's deterministic output.
pub mod snapshot;
/// The recursive value tree and its `Reference` node.
pub mod value;

pub use expr::Expr;
pub use path::Path;
pub use snapshot::{Metadata, Provenance, Snapshot};
pub use source_decl::SourceDecl;
pub use value::{Reference, Value};
