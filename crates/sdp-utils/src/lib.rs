//! Foundation utilities shared by every `sdp` crate.
//!
//! Nothing in this crate touches policy, phases, or worktrees — it only
//! provides the primitives the rest of the workspace builds on: atomic file
//! writes, path conventions, the one typed error enum that crosses component
//! boundaries, exit-code mapping, and logging setup.

pub mod atomic_write;
pub mod error;
pub mod exit_codes;
pub mod ids;
pub mod logging;
pub mod paths;

pub use error::SdpError;
