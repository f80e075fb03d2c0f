// SPDX-License-Identifier: MIT OR Apache-2.0
//! The resolution context (spec §4.8, C8): a mutex-protected stack of
//! in-flight `(alias, path)` frames used to detect circular references.

use std::sync::Mutex;
use thiserror::Error;

/// The arrow used to render a cycle chain. A stable symbol so error
/// messages are diffable across runs.
pub const CYCLE_ARROW: &str = " → ";

/// One frame of in-flight reference resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Frame {
    alias: String,
    path: String,
}

impl Frame {
    fn render(&self) -> String {
        format!("{}:{}", self.alias, self.path)
    }
}

/// A circular reference was detected while resolving.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("circular reference: {chain}")]
pub struct CircularReferenceError {
    /// The full cycle, rendered as `a1:p1 → a2:p2 → …`.
    pub chain: String,
}

/// Mutex-protected stack of in-flight resolution frames.
///
/// Not thread-local: a single resolution tree is conceptually
/// sequential per resolver, but the context itself is safe to share.
#[derive(Default)]
pub struct ResolutionContext {
    stack: Mutex<Vec<Frame>>,
}

impl ResolutionContext {
    /// An empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a new frame for `alias`/`path` (already `/`-joined).
    ///
    /// Fails if an identical frame is already on the stack, returning
    /// the full cycle chain including the newly attempted frame.
    pub fn push(&self, alias: &str, path: &str) -> Result<(), CircularReferenceError> {
        let mut stack = self.stack.lock().expect("context lock poisoned");
        let candidate = Frame {
            alias: alias.to_string(),
            path: path.to_string(),
        };
        if let Some(start) = stack.iter().position(|f| *f == candidate) {
            let mut chain: Vec<String> = stack[start..].iter().map(Frame::render).collect();
            chain.push(candidate.render());
            return Err(CircularReferenceError {
                chain: chain.join(CYCLE_ARROW),
            });
        }
        stack.push(candidate);
        Ok(())
    }

    /// Pop the most recently pushed frame.
    pub fn pop(&self) {
        self.stack.lock().expect("context lock poisoned").pop();
    }

    /// Current stack depth, mostly useful for tests.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.stack.lock().expect("context lock poisoned").len()
    }
}
