use sdp_types::{FeatureId, WorkstreamId};
use sdp_utils::SdpError;
use serde_json::Value;

/// What a review driver needs to render its view of a feature.
#[derive(Debug, Clone)]
pub struct ReviewRequest {
    pub feature_id: FeatureId,
    pub workstream_ids: Vec<WorkstreamId>,
}

/// The reviewer's verdict, shaped directly onto the `REVIEW` phase's
/// `result` field (spec.md §6): `approved=false` always carries the
/// workstreams sent back for rework.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewOutcome {
    pub approved: bool,
    pub rework: Vec<WorkstreamId>,
}

impl ReviewOutcome {
    #[must_use]
    pub fn to_result_json(&self) -> Value {
        serde_json::json!({
            "approved": self.approved,
            "rework": self.rework.iter().map(ToString::to_string).collect::<Vec<_>>(),
        })
    }
}

pub trait ReviewDriver {
    /// Requests review for the given workstreams and blocks until a verdict
    /// is available.
    fn request_review(&self, request: &ReviewRequest) -> Result<ReviewOutcome, SdpError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn approved_outcome_carries_empty_rework_list() {
        let outcome = ReviewOutcome { approved: true, rework: vec![] };
        let json = outcome.to_result_json();
        assert_eq!(json["approved"], true);
        assert_eq!(json["rework"].as_array().unwrap().len(), 0);
    }

    #[test]
    fn rejected_outcome_lists_rework_ids_as_strings() {
        let outcome = ReviewOutcome {
            approved: false,
            rework: vec![WorkstreamId::from_str("00-F001-02").unwrap()],
        };
        let json = outcome.to_result_json();
        assert_eq!(json["approved"], false);
        assert_eq!(json["rework"][0], "00-F001-02");
    }
}
