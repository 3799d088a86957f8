//! Loads the two on-disk configuration documents (spec.md §6): the gate
//! policy at `.sdp/policy.yml` and, optionally, ambient runtime settings at
//! `.sdp/config.toml`.
//!
//! Both loaders apply the same rule: a missing file falls back to built-in
//! defaults, a malformed one fails loudly with the file path attached to the
//! error. Neither loader does precedence merging across CLI flags,
//! environment variables, and multiple candidate paths — the fixed
//! `.sdp/` layout from `sdp_utils::paths` is the only place either file is
//! looked for.

mod policy;
mod runtime;

pub use policy::load_policy;
pub use runtime::{load_runtime_config, LogFormat, RuntimeConfig};
