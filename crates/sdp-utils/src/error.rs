//! The one typed error enum that crosses component boundaries.
//!
//! Every component in the workspace returns `Result<T, SdpError>` (or wraps
//! one in `anyhow::Context` at the CLI boundary). Each variant carries enough
//! structured context — operation, paths, ids — that a caller can log it as
//! an evidence event without re-deriving what happened.

use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors propagated across `sdp` component boundaries.
///
/// Propagation policy: only [`SdpError::LockTimeout`] is ever retried by a
/// caller (bounded exponential backoff); every other variant is surfaced
/// as-is. No variant is swallowed — see `exit_codes` for the mapping to
/// process exit status.
#[derive(Debug, Error)]
pub enum SdpError {
    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("not found: {what} ({id})")]
    NotFound { what: String, id: String },

    #[error("illegal phase transition: {from} -> {to} ({reason})")]
    IllegalTransition {
        from: String,
        to: String,
        reason: String,
    },

    #[error("cyclic dependencies among workstreams: {cycle:?}")]
    CyclicDependencies { cycle: Vec<String> },

    #[error("scope violation in {workstream_id}: {offending:?}")]
    ScopeViolation {
        workstream_id: String,
        offending: Vec<Utf8PathBuf>,
    },

    #[error("scope collision between {a} and {b}: {overlap:?}")]
    ScopeCollision {
        a: String,
        b: String,
        overlap: Vec<String>,
    },

    #[error("quality gate blocked: {rule_ids:?}")]
    QualityGateBlock { rule_ids: Vec<String> },

    #[error("hook failed: {script} (exit {exit_code})")]
    HookFailed { script: String, exit_code: i32 },

    #[error("worktree corrupt at {path}: {reason}")]
    WorktreeCorrupt { path: Utf8PathBuf, reason: String },

    #[error("lock timeout after {timeout_secs}s acquiring {resource}")]
    LockTimeout { resource: String, timeout_secs: u64 },

    #[error("concurrent modification of {resource}: on-disk is newer than in-memory copy")]
    ConcurrentModification { resource: String },

    #[error("evidence chain broken at event {index} ({event_id}): {reason}")]
    ChainBroken {
        index: u64,
        event_id: String,
        reason: String,
    },

    #[error("invalid evidence event: {reason}")]
    InvalidEvent { reason: String },

    #[error("invalid policy at {path}: {reason}")]
    InvalidPolicy { path: Utf8PathBuf, reason: String },

    #[error("rework exhausted for {workstream_id}: {cycles} cycles (cap {cap})")]
    ReworkExhausted {
        workstream_id: String,
        cycles: u32,
        cap: u32,
    },

    #[error("agent failed: {reason}")]
    AgentFailed { reason: String },

    #[error("process spawn failed for {program}: {reason}")]
    ProcessSpawnFailed { program: String, reason: String },

    #[error("process timed out after {timeout_secs}s: {program}")]
    ProcessTimeout { program: String, timeout_secs: u64 },

    #[error("cancelled")]
    Cancelled,

    #[error("internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SdpError {
    /// `true` for the single variant the retry policy in §5/§7 applies to.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, SdpError::LockTimeout { .. })
    }
}
