//! Pure phase state machine (spec.md §4.1).
//!
//! No I/O. `validate_advance` returns a structured [`TransitionOutcome`]
//! rather than mutating anything, so the caller can persist an evidence
//! event before deciding whether to apply it via [`advance`].

use std::collections::HashSet;

use sdp_types::{Checkpoint, Phase, Workstream, WorkstreamId, WorkstreamStatus};
use sdp_utils::SdpError;
use serde_json::Value;

/// What `validate_advance` decided should happen, before any mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionOutcome {
    pub from: Phase,
    pub to: Phase,
    /// Workstream id to activate when `to == Phase::Build`.
    pub next_build_ws: Option<WorkstreamId>,
    /// Workstream ids being reopened by a REVIEW -> BUILD rework.
    pub reworked: Vec<WorkstreamId>,
    pub detail: String,
}

fn bool_field(result: &Value, key: &str) -> Option<bool> {
    result.get(key).and_then(Value::as_bool)
}

fn str_field<'a>(result: &'a Value, key: &str) -> Option<&'a str> {
    result.get(key).and_then(Value::as_str)
}

fn id_list_field(result: &Value, key: &str) -> Vec<WorkstreamId> {
    result
        .get(key)
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(Value::as_str)
                .filter_map(|s| s.parse::<WorkstreamId>().ok())
                .collect()
        })
        .unwrap_or_default()
}

/// First workstream that is `pending` with every dependency `complete`,
/// ordered by declared index then id. Independent of (and simpler than)
/// `sdp-scheduler`'s DAG-validated selection, which also handles
/// parallelism and collision downgrades.
fn first_ready(workstreams: &[Workstream]) -> Option<WorkstreamId> {
    let completed: HashSet<&WorkstreamId> = workstreams
        .iter()
        .filter(|w| w.status == WorkstreamStatus::Complete)
        .map(|w| &w.id)
        .collect();

    let mut ready: Vec<&Workstream> = workstreams
        .iter()
        .filter(|w| w.status == WorkstreamStatus::Pending && w.dependencies.iter().all(|d| completed.contains(d)))
        .collect();
    ready.sort_by(|a, b| a.declared_index.cmp(&b.declared_index).then_with(|| a.id.cmp(&b.id)));
    ready.first().map(|w| w.id.clone())
}

fn any_pending_or_blocked(workstreams: &[Workstream]) -> bool {
    workstreams
        .iter()
        .any(|w| matches!(w.status, WorkstreamStatus::Pending | WorkstreamStatus::Blocked))
}

/// Validate the requested transition for `checkpoint` without mutating it.
///
/// `rework_cap` is the configured `rework.max_cycles` (policy default 3);
/// exceeding it on a REVIEW -> BUILD rework surfaces `ReworkExhausted`.
pub fn validate_advance(
    checkpoint: &Checkpoint,
    workstreams: &[Workstream],
    result: &Value,
    rework_cap: u32,
) -> Result<TransitionOutcome, SdpError> {
    match checkpoint.phase {
        Phase::Init => {
            if workstreams.is_empty() {
                return Err(SdpError::IllegalTransition {
                    from: "INIT".into(),
                    to: "BUILD".into(),
                    reason: "feature has zero declared workstreams".into(),
                });
            }
            let first = first_ready(workstreams).ok_or_else(|| SdpError::IllegalTransition {
                from: "INIT".into(),
                to: "BUILD".into(),
                reason: "no workstream is ready".into(),
            })?;
            Ok(TransitionOutcome {
                from: Phase::Init,
                to: Phase::Build,
                next_build_ws: Some(first),
                reworked: vec![],
                detail: format!("activating {first}"),
            })
        }

        Phase::Build => {
            let current = checkpoint.current_build_ws.clone().ok_or_else(|| SdpError::Internal(
                "BUILD phase checkpoint missing current_build_ws".into(),
            ))?;
            let current_complete = workstreams
                .iter()
                .find(|w| w.id == current)
                .map(|w| w.status == WorkstreamStatus::Complete)
                .unwrap_or(false);
            if !current_complete {
                return Err(SdpError::IllegalTransition {
                    from: "BUILD".into(),
                    to: "BUILD/REVIEW".into(),
                    reason: format!("current workstream {current} is not complete"),
                });
            }
            match first_ready(workstreams) {
                Some(next) => Ok(TransitionOutcome {
                    from: Phase::Build,
                    to: Phase::Build,
                    next_build_ws: Some(next),
                    reworked: vec![],
                    detail: format!("advancing to {next}"),
                }),
                None if any_pending_or_blocked(workstreams) => Err(SdpError::IllegalTransition {
                    from: "BUILD".into(),
                    to: "REVIEW".into(),
                    reason: "pending or blocked workstreams remain unready".into(),
                }),
                None => Ok(TransitionOutcome {
                    from: Phase::Build,
                    to: Phase::Review,
                    next_build_ws: None,
                    reworked: vec![],
                    detail: "no ready workstreams remain; entering review".into(),
                }),
            }
        }

        Phase::Review => {
            if bool_field(result, "approved") == Some(true) {
                Ok(TransitionOutcome {
                    from: Phase::Review,
                    to: Phase::Pr,
                    next_build_ws: None,
                    reworked: vec![],
                    detail: "review approved".into(),
                })
            } else if bool_field(result, "approved") == Some(false) {
                let rework = id_list_field(result, "rework");
                if rework.is_empty() {
                    return Err(SdpError::InvalidArgument {
                        message: "approved=false requires a non-empty rework list".into(),
                    });
                }
                for ws_id in &rework {
                    let cycles = workstreams
                        .iter()
                        .find(|w| &w.id == ws_id)
                        .map(|w| w.activation_count + 1)
                        .unwrap_or(1);
                    if cycles > rework_cap {
                        return Err(SdpError::ReworkExhausted {
                            workstream_id: ws_id.to_string(),
                            cycles,
                            cap: rework_cap,
                        });
                    }
                }
                Ok(TransitionOutcome {
                    from: Phase::Review,
                    to: Phase::Build,
                    next_build_ws: rework.first().cloned(),
                    reworked: rework,
                    detail: "review requested rework".into(),
                })
            } else {
                Err(SdpError::InvalidArgument {
                    message: "REVIEW advance requires a boolean `approved` field".into(),
                })
            }
        }

        Phase::Pr => {
            if result.get("pr_number").and_then(Value::as_u64).is_some() {
                Ok(TransitionOutcome {
                    from: Phase::Pr,
                    to: Phase::Ci,
                    next_build_ws: None,
                    reworked: vec![],
                    detail: "pull request created".into(),
                })
            } else {
                Err(SdpError::IllegalTransition {
                    from: "PR".into(),
                    to: "CI".into(),
                    reason: "result did not carry a non-null pr_number".into(),
                })
            }
        }

        Phase::Ci => match str_field(result, "status") {
            Some("success") => Ok(TransitionOutcome {
                from: Phase::Ci,
                to: Phase::Done,
                next_build_ws: None,
                reworked: vec![],
                detail: "CI succeeded".into(),
            }),
            Some("failure") => Ok(TransitionOutcome {
                from: Phase::Ci,
                to: Phase::Pr,
                next_build_ws: None,
                reworked: vec![],
                detail: "CI failed; returning to PR for another attempt".into(),
            }),
            _ => Err(SdpError::InvalidArgument {
                message: "CI advance requires result.status of \"success\" or \"failure\"".into(),
            }),
        },

        Phase::Done => Err(SdpError::IllegalTransition {
            from: "DONE".into(),
            to: "DONE".into(),
            reason: "feature has already reached its terminal phase".into(),
        }),
    }
}

/// Apply a previously validated [`TransitionOutcome`] to `checkpoint` and
/// `workstreams`. Never called without a prior successful `validate_advance`.
pub fn advance(checkpoint: &mut Checkpoint, workstreams: &mut [Workstream], outcome: &TransitionOutcome) {
    for ws_id in &outcome.reworked {
        if let Some(line) = checkpoint.workstreams.iter_mut().find(|w| &w.id == ws_id) {
            line.status = WorkstreamStatus::Pending;
            line.activation_count += 1;
        }
        if let Some(ws) = workstreams.iter_mut().find(|w| &w.id == ws_id) {
            ws.status = WorkstreamStatus::Pending;
            ws.activation_count += 1;
        }
    }

    checkpoint.phase = outcome.to;
    checkpoint.current_build_ws = outcome.next_build_ws.clone();
    if outcome.to == Phase::Pr {
        // pr_number is populated by the PR driver via a later checkpoint write;
        // entering PR itself does not assign one.
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sdp_types::{FeatureId, SizeClass};
    use serde_json::json;
    use std::str::FromStr;

    fn ws(id: &str, deps: &[&str], status: WorkstreamStatus, idx: u32) -> Workstream {
        Workstream {
            id: WorkstreamId::from_str(id).unwrap(),
            title: "t".into(),
            size_class: SizeClass::Small,
            dependencies: deps.iter().map(|d| WorkstreamId::from_str(d).unwrap()).collect(),
            declared_scope: vec![],
            acceptance_criteria: vec![],
            status,
            activation_count: 0,
            declared_index: idx,
        }
    }

    fn checkpoint(phase: Phase, current: Option<&str>) -> Checkpoint {
        Checkpoint::new_init(FeatureId::from_str("F001").unwrap(), vec![], Utc::now()).tap_phase(phase, current)
    }

    trait TapPhase {
        fn tap_phase(self, phase: Phase, current: Option<&str>) -> Self;
    }
    impl TapPhase for Checkpoint {
        fn tap_phase(mut self, phase: Phase, current: Option<&str>) -> Self {
            self.phase = phase;
            self.current_build_ws = current.map(|s| WorkstreamId::from_str(s).unwrap());
            self
        }
    }

    #[test]
    fn init_with_zero_workstreams_is_illegal() {
        let cp = checkpoint(Phase::Init, None);
        let err = validate_advance(&cp, &[], &json!({}), 3).unwrap_err();
        assert!(matches!(err, SdpError::IllegalTransition { .. }));
    }

    #[test]
    fn init_advances_to_build_with_first_ready() {
        let cp = checkpoint(Phase::Init, None);
        let workstreams = vec![ws("00-F001-01", &[], WorkstreamStatus::Pending, 0)];
        let outcome = validate_advance(&cp, &workstreams, &json!({}), 3).unwrap();
        assert_eq!(outcome.to, Phase::Build);
        assert_eq!(outcome.next_build_ws.unwrap().as_str(), "00-F001-01");
    }

    #[test]
    fn build_moves_to_review_when_nothing_ready_and_nothing_pending() {
        let cp = checkpoint(Phase::Build, Some("00-F001-01"));
        let workstreams = vec![ws("00-F001-01", &[], WorkstreamStatus::Complete, 0)];
        let outcome = validate_advance(&cp, &workstreams, &json!({}), 3).unwrap();
        assert_eq!(outcome.to, Phase::Review);
    }

    #[test]
    fn build_rejects_advance_while_current_ws_incomplete() {
        let cp = checkpoint(Phase::Build, Some("00-F001-01"));
        let workstreams = vec![ws("00-F001-01", &[], WorkstreamStatus::Active, 0)];
        let err = validate_advance(&cp, &workstreams, &json!({}), 3).unwrap_err();
        assert!(matches!(err, SdpError::IllegalTransition { .. }));
    }

    #[test]
    fn review_approved_moves_to_pr() {
        let cp = checkpoint(Phase::Review, None);
        let outcome = validate_advance(&cp, &[], &json!({"approved": true}), 3).unwrap();
        assert_eq!(outcome.to, Phase::Pr);
    }

    #[test]
    fn review_rejected_reopens_rework_workstreams() {
        let cp = checkpoint(Phase::Review, None);
        let workstreams = vec![ws("00-F002-02", &[], WorkstreamStatus::Complete, 1)];
        let outcome = validate_advance(
            &cp,
            &workstreams,
            &json!({"approved": false, "rework": ["00-F002-02"]}),
            3,
        )
        .unwrap();
        assert_eq!(outcome.to, Phase::Build);
        assert_eq!(outcome.reworked.len(), 1);
    }

    #[test]
    fn review_rework_past_cap_is_exhausted() {
        let cp = checkpoint(Phase::Review, None);
        let mut w = ws("00-F002-02", &[], WorkstreamStatus::Complete, 1);
        w.activation_count = 3;
        let err = validate_advance(&cp, &[w], &json!({"approved": false, "rework": ["00-F002-02"]}), 3)
            .unwrap_err();
        assert!(matches!(err, SdpError::ReworkExhausted { .. }));
    }

    #[test]
    fn pr_requires_pr_number_to_reach_ci() {
        let cp = checkpoint(Phase::Pr, None);
        assert!(validate_advance(&cp, &[], &json!({}), 3).is_err());
        let outcome = validate_advance(&cp, &[], &json!({"pr_number": 42}), 3).unwrap();
        assert_eq!(outcome.to, Phase::Ci);
    }

    #[test]
    fn ci_success_reaches_done_and_failure_returns_to_pr() {
        let cp = checkpoint(Phase::Ci, None);
        let ok = validate_advance(&cp, &[], &json!({"status": "success"}), 3).unwrap();
        assert_eq!(ok.to, Phase::Done);
        let fail = validate_advance(&cp, &[], &json!({"status": "failure"}), 3).unwrap();
        assert_eq!(fail.to, Phase::Pr);
    }

    #[test]
    fn done_never_advances_further() {
        let cp = checkpoint(Phase::Done, None);
        assert!(validate_advance(&cp, &[], &json!({}), 3).is_err());
    }

    #[test]
    fn advance_applies_rework_reset_to_pending_and_bumps_activation_count() {
        let mut cp = checkpoint(Phase::Review, None);
        cp.workstreams.push(sdp_types::checkpoint::WorkstreamStatusLine {
            id: WorkstreamId::from_str("00-F002-02").unwrap(),
            status: WorkstreamStatus::Complete,
            activation_count: 1,
        });
        let mut workstreams = vec![ws("00-F002-02", &[], WorkstreamStatus::Complete, 1)];
        workstreams[0].activation_count = 1;
        let outcome = validate_advance(
            &cp,
            &workstreams,
            &json!({"approved": false, "rework": ["00-F002-02"]}),
            3,
        )
        .unwrap();
        advance(&mut cp, &mut workstreams, &outcome);
        assert_eq!(cp.phase, Phase::Build);
        assert_eq!(cp.workstreams[0].status, WorkstreamStatus::Pending);
        assert_eq!(cp.workstreams[0].activation_count, 2);
        assert_eq!(workstreams[0].activation_count, 2);
    }
}
