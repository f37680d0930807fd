//! Flavor resolution: choose a table-detection strategy per document.
//!
//! Which strategy parses an institution's tables cleanly is a property of
//! that institution's typesetting, so the resolver keys off the
//! institution token embedded in the document path. Rules are checked in
//! their configured priority order; the first token found (case-
//! insensitively) in the path wins, and a path matching no rule falls back
//! to [`Flavor::Lattice`]. A pure function of the path: same path, same
//! strategy, every call.

use crate::config::{Flavor, FlavorRule};
use std::path::Path;

/// Resolves the detection strategy for a document path.
#[derive(Debug, Clone)]
pub struct FlavorResolver {
    rules: Vec<FlavorRule>,
}

impl FlavorResolver {
    pub fn new(rules: Vec<FlavorRule>) -> Self {
        Self { rules }
    }

    /// Strategy for this document. Never fails.
    pub fn resolve(&self, path: &Path) -> Flavor {
        let lower = path.to_string_lossy().to_lowercase();
        self.rules
            .iter()
            .find(|rule| lower.contains(&rule.token.to_lowercase()))
            .map(|rule| rule.flavor)
            .unwrap_or_default()
    }
}
