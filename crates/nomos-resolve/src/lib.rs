// SPDX-License-Identifier: MIT OR Apache-2.0
//! nomos-resolve
#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! Reference resolution (spec §4.7–§4.9, C7–C9): the fetch cache, the
//! cycle-detecting resolution context, and the recursive resolver built
//! on top of both.

/// The per-run fetch cache (C7).
pub mod cache;
/// The cycle-detecting resolution context (C8).
pub mod context;
/// The recursive reference resolver (C9).
pub mod resolver;

pub use cache::{cache_key, FetchCache};
pub use context::{CircularReferenceError, ResolutionContext, CYCLE_ARROW};
pub use resolver::{ProviderFetcher, ResolveError, ResolvePolicy, Resolver};
