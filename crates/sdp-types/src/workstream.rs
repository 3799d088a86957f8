//! Workstream value record (spec.md §3).
//!
//! Modeled as a value keyed by id with dependencies as id lists — parent
//! feature context is resolved by lookup in `sdp-scheduler`, never a
//! back-pointer, per the cyclic-reference redesign note.

use serde::{Deserialize, Serialize};

use crate::WorkstreamId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SizeClass {
    Small,
    Medium,
    Large,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkstreamStatus {
    Pending,
    Active,
    Complete,
    Blocked,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Workstream {
    pub id: WorkstreamId,
    pub title: String,
    pub size_class: SizeClass,
    /// Ids of sibling workstreams this one depends on. Must form a DAG
    /// within the owning feature; checked by `sdp-scheduler`.
    pub dependencies: Vec<WorkstreamId>,
    /// Declared file-path globs this workstream may create or modify.
    pub declared_scope: Vec<String>,
    pub acceptance_criteria: Vec<String>,
    pub status: WorkstreamStatus,
    /// Incremented each time the workstream re-enters BUILD via rework.
    pub activation_count: u32,
    /// Index in the feature's declared sequence, used as the scheduler's
    /// primary ordering key.
    pub declared_index: u32,
}

impl Workstream {
    /// `true` once every dependency id in `completed` is satisfied and this
    /// workstream itself is still `pending`.
    #[must_use]
    pub fn is_ready(&self, completed: impl Fn(&WorkstreamId) -> bool) -> bool {
        self.status == WorkstreamStatus::Pending && self.dependencies.iter().all(completed)
    }

    #[must_use]
    pub fn has_self_dependency(&self) -> bool {
        self.dependencies.contains(&self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn ws(id: &str, deps: &[&str], status: WorkstreamStatus) -> Workstream {
        Workstream {
            id: WorkstreamId::from_str(id).unwrap(),
            title: "t".into(),
            size_class: SizeClass::Small,
            dependencies: deps.iter().map(|d| WorkstreamId::from_str(d).unwrap()).collect(),
            declared_scope: vec![],
            acceptance_criteria: vec![],
            status,
            activation_count: 0,
            declared_index: 0,
        }
    }

    #[test]
    fn ready_requires_pending_and_satisfied_deps() {
        let w = ws("00-F001-02", &["00-F001-01"], WorkstreamStatus::Pending);
        assert!(w.is_ready(|_| true));
        assert!(!w.is_ready(|_| false));
    }

    #[test]
    fn active_workstream_is_never_ready() {
        let w = ws("00-F001-01", &[], WorkstreamStatus::Active);
        assert!(!w.is_ready(|_| true));
    }

    #[test]
    fn detects_self_dependency() {
        let w = ws("00-F001-01", &["00-F001-01"], WorkstreamStatus::Pending);
        assert!(w.has_self_dependency());
    }
}
