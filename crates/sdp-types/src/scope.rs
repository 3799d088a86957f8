//! Scope: the materialized set of paths a workstream may change (spec.md
//! §3, §4.5). Glob matching itself lives in `sdp-scope`; this is the value
//! type that crate builds and the checkpoint/evidence layers pass around.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Scope {
    /// Glob patterns, sealed at activation; later growth only via an
    /// explicit `extend`, recorded separately so the original declaration
    /// is never silently rewritten.
    pub globs: Vec<String>,
    pub extensions: Vec<String>,
}

impl Scope {
    #[must_use]
    pub fn sealed(globs: Vec<String>) -> Self {
        Self { globs, extensions: Vec::new() }
    }

    /// All patterns currently in force: the sealed declaration plus any
    /// extensions granted since activation.
    pub fn effective_globs(&self) -> impl Iterator<Item = &str> {
        self.globs.iter().chain(self.extensions.iter()).map(String::as_str)
    }

    pub fn extend(&mut self, glob: String) {
        if !self.globs.contains(&glob) && !self.extensions.contains(&glob) {
            self.extensions.push(glob);
        }
    }
}
