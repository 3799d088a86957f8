//! Checkpoint: the durable representation of a feature's full runtime state
//! (spec.md §3, §4.2). One JSON document per feature id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{FeatureId, Phase, WorkstreamId, WorkstreamStatus};

/// Per-workstream status line carried inside a checkpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkstreamStatusLine {
    pub id: WorkstreamId,
    pub status: WorkstreamStatus,
    pub activation_count: u32,
}

/// The current schema version written by this build. Bumped whenever a
/// field is added or removed in a way that breaks old readers.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Checkpoint {
    pub schema_version: u32,
    pub feature_id: FeatureId,
    pub phase: Phase,
    pub workstreams: Vec<WorkstreamStatusLine>,
    pub current_build_ws: Option<WorkstreamId>,
    pub pr_number: Option<u64>,
    pub ci_run_id: Option<String>,
    pub last_event_hash: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl Checkpoint {
    #[must_use]
    pub fn new_init(feature_id: FeatureId, workstreams: Vec<WorkstreamStatusLine>, now: DateTime<Utc>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            feature_id,
            phase: Phase::Init,
            workstreams,
            current_build_ws: None,
            pr_number: None,
            ci_run_id: None,
            last_event_hash: None,
            updated_at: now,
        }
    }

    /// `C.phase = BUILD ⇔ C.current_build_ws ≠ null` (spec.md §8).
    #[must_use]
    pub fn satisfies_build_pointer_invariant(&self) -> bool {
        (self.phase == Phase::Build) == self.current_build_ws.is_some()
    }

    /// Sorted by workstream id, matching the round-trip determinism
    /// required by `save(load(id))` byte-identity.
    pub fn canonicalize(&mut self) {
        self.workstreams.sort_by(|a, b| a.id.cmp(&b.id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn init_checkpoint_has_no_build_pointer() {
        let now = Utc::now();
        let cp = Checkpoint::new_init(FeatureId::from_str("F001").unwrap(), vec![], now);
        assert!(cp.satisfies_build_pointer_invariant());
        assert!(cp.current_build_ws.is_none());
    }

    #[test]
    fn build_phase_without_pointer_violates_invariant() {
        let now = Utc::now();
        let mut cp = Checkpoint::new_init(FeatureId::from_str("F001").unwrap(), vec![], now);
        cp.phase = Phase::Build;
        assert!(!cp.satisfies_build_pointer_invariant());
        cp.current_build_ws = Some(WorkstreamId::from_str("00-F001-01").unwrap());
        assert!(cp.satisfies_build_pointer_invariant());
    }

    #[test]
    fn canonicalize_sorts_workstreams_by_id() {
        let now = Utc::now();
        let mut cp = Checkpoint::new_init(
            FeatureId::from_str("F001").unwrap(),
            vec![
                WorkstreamStatusLine {
                    id: WorkstreamId::from_str("00-F001-02").unwrap(),
                    status: WorkstreamStatus::Pending,
                    activation_count: 0,
                },
                WorkstreamStatusLine {
                    id: WorkstreamId::from_str("00-F001-01").unwrap(),
                    status: WorkstreamStatus::Pending,
                    activation_count: 0,
                },
            ],
            now,
        );
        cp.canonicalize();
        assert_eq!(cp.workstreams[0].id.as_str(), "00-F001-01");
    }
}
