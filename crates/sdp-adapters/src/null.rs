use sdp_utils::SdpError;

use crate::ci::{CiDriver, CiOutcome, CiRequest, CiStatus};
use crate::pr::{PrDriver, PrOutcome, PrRequest};
use crate::review::{ReviewDriver, ReviewOutcome, ReviewRequest};

/// Stub implementation of all three drivers, for `hydrate`/`status` and any
/// test that exercises phase transitions without a live collaborator.
/// Always approves, always mints PR number 0, always reports CI success.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAdapters;

impl ReviewDriver for NullAdapters {
    fn request_review(&self, request: &ReviewRequest) -> Result<ReviewOutcome, SdpError> {
        tracing::debug!(feature_id = %request.feature_id, "null review driver auto-approving");
        Ok(ReviewOutcome { approved: true, rework: vec![] })
    }
}

impl PrDriver for NullAdapters {
    fn create_pr(&self, request: &PrRequest) -> Result<PrOutcome, SdpError> {
        tracing::debug!(feature_id = %request.feature_id, branch = %request.branch, "null PR driver minting stub PR");
        Ok(PrOutcome { pr_number: 0 })
    }
}

impl CiDriver for NullAdapters {
    fn poll(&self, request: &CiRequest) -> Result<CiOutcome, SdpError> {
        tracing::debug!(feature_id = %request.feature_id, "null CI driver reporting success");
        Ok(CiOutcome { status: CiStatus::Success })
    }
}
