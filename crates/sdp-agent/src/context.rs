//! Per-run identity and the fixed environment variables exposed to the
//! agent subprocess (spec.md §6).

use camino::Utf8PathBuf;
use sdp_types::{FeatureId, Phase, WorkstreamId};

/// Everything the Agent Driver needs to know about *which* activation it is
/// running, independent of the packet content or the command to launch.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub feature_id: FeatureId,
    pub workstream_id: WorkstreamId,
    pub phase: Phase,
    pub worktree_path: Utf8PathBuf,
    pub checkpoint_path: Utf8PathBuf,
    pub policy_path: Utf8PathBuf,
    /// Identifier of the model being invoked, recorded in the `generation`
    /// evidence event but never passed as an environment variable (spec.md
    /// §6 fixes the exposed set to the six `SDP_*` variables below).
    pub model_id: String,
}

impl RunContext {
    pub(crate) fn env_vars(&self) -> Vec<(&'static str, String)> {
        vec![
            ("SDP_FEATURE_ID", self.feature_id.to_string()),
            ("SDP_WORKSTREAM_ID", self.workstream_id.to_string()),
            ("SDP_PHASE", self.phase.as_str().to_string()),
            ("SDP_WORKTREE_PATH", self.worktree_path.to_string()),
            ("SDP_CHECKPOINT_PATH", self.checkpoint_path.to_string()),
            ("SDP_POLICY_PATH", self.policy_path.to_string()),
        ]
    }
}
