//! Argv-only subprocess execution (spec.md §5).
//!
//! Everything the orchestrator shells out to — hooks, the agent CLI,
//! `git worktree`, custom gate rules — goes through [`CommandSpec`] and a
//! [`ProcessRunner`]. `tokio` is confined to this crate: it exists only to
//! race a child process against a timeout and escalate SIGTERM to SIGKILL
//! after a grace period.

mod cancellation;
mod command_spec;
mod process;
mod runner;

pub use cancellation::CancellationToken;
pub use command_spec::CommandSpec;
pub use process::{ProcessOutput, ProcessRunner};
pub use runner::{TokioProcessRunner, DEFAULT_GRACE_PERIOD};
