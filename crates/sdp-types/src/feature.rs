//! Feature record (spec.md §3): the unit of coordinated work.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{FeatureId, Phase, WorkstreamId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Feature {
    pub id: FeatureId,
    /// Declared order of this feature's workstreams, not necessarily the
    /// schedule order — that is computed fresh by `sdp-scheduler`.
    pub workstream_ids: Vec<WorkstreamId>,
    pub phase: Phase,
    pub created_at: DateTime<Utc>,
    pub last_advanced_at: DateTime<Utc>,
}

impl Feature {
    #[must_use]
    pub fn new(id: FeatureId, workstream_ids: Vec<WorkstreamId>, now: DateTime<Utc>) -> Self {
        Self {
            id,
            workstream_ids,
            phase: Phase::Init,
            created_at: now,
            last_advanced_at: now,
        }
    }
}
