use sdp_types::FeatureId;
use sdp_utils::SdpError;
use serde_json::Value;

#[derive(Debug, Clone)]
pub struct CiRequest {
    pub feature_id: FeatureId,
    pub pr_number: u64,
}

/// Shaped onto the `CI` phase's `result.status` field (spec.md §6). No
/// third state: a driver that can't yet tell success from failure should
/// block inside `poll` until it can, the same way a hook or agent run
/// blocks on its subprocess.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CiStatus {
    Success,
    Failure,
}

impl CiStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            CiStatus::Success => "success",
            CiStatus::Failure => "failure",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CiOutcome {
    pub status: CiStatus,
}

impl CiOutcome {
    #[must_use]
    pub fn to_result_json(&self) -> Value {
        serde_json::json!({ "status": self.status.as_str() })
    }
}

pub trait CiDriver {
    /// Polls (blocking until a terminal status is reached) the CI run
    /// associated with `request.pr_number`.
    fn poll(&self, request: &CiRequest) -> Result<CiOutcome, SdpError>;
}
