//! Orchestration layer (spec.md §4): wires the phase state machine, the
//! checkpoint store, the worktree manager, the scope guard, quality gates,
//! hooks, the agent driver, and the external collaborator drivers into the
//! two entry points a caller actually invokes — [`init::init`] and
//! [`advance::advance`].

pub mod advance;
pub mod attestation;
pub mod build_step;
pub mod context;
pub mod declarations;
pub mod git_diff;
pub mod init;

pub use advance::{advance, AdvanceOutcome};
pub use context::OrchestratorContext;
pub use init::init;
