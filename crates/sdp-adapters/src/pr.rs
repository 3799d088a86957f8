use sdp_types::FeatureId;
use sdp_utils::SdpError;
use serde_json::Value;

#[derive(Debug, Clone)]
pub struct PrRequest {
    pub feature_id: FeatureId,
    pub branch: String,
    pub base: String,
    pub title: String,
}

/// Shaped directly onto the `PR` phase's `result` field (spec.md §6): a
/// non-null `pr_number` is the only thing `validate_advance` checks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrOutcome {
    pub pr_number: u64,
}

impl PrOutcome {
    #[must_use]
    pub fn to_result_json(&self) -> Value {
        serde_json::json!({ "pr_number": self.pr_number })
    }
}

pub trait PrDriver {
    /// Opens (or reuses) a pull request for `request.branch` against
    /// `request.base`.
    fn create_pr(&self, request: &PrRequest) -> Result<PrOutcome, SdpError>;
}
