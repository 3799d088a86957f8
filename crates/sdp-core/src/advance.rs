//! `advance` (spec.md §4, §8.1): the single per-invocation control step.
//! Loads the checkpoint, runs (or bypasses, via an explicit `result`) the
//! current phase's work, asks [`sdp_phase::validate_advance`] whether the
//! transition is legal, applies it, and appends the evidence trail.

use std::collections::BTreeMap;

use camino::Utf8Path;
use sdp_types::{
    Actor, Checkpoint, EventType, EvidenceEvent, FeatureId, Phase, Workstream, WorkstreamStatus,
};
use sdp_utils::SdpError;
use sdp_worktree::{GitPorcelain, WorktreeManager};

use crate::context::OrchestratorContext;

pub struct AdvanceOutcome {
    pub checkpoint: Checkpoint,
    pub transition: sdp_phase::TransitionOutcome,
}

/// Runs one `advance` step for `feature_id`. `override_result`, when
/// present, is used verbatim as the phase-transition `result` instead of
/// running the phase's own work (manual/test override, spec.md §8.1).
pub fn advance<G: GitPorcelain>(
    ctx: &OrchestratorContext<'_>,
    worktrees: &WorktreeManager<G>,
    feature_id: &FeatureId,
    override_result: Option<serde_json::Value>,
) -> Result<AdvanceOutcome, SdpError> {
    let lock_path = sdp_utils::paths::checkpoint_lock_path(&ctx.project_root, feature_id);
    let _guard = sdp_checkpoint::lock(&lock_path, feature_id, ctx.lock_timeout)?;

    let checkpoint_path = sdp_utils::paths::checkpoint_path(&ctx.project_root, feature_id);
    let checkpoint = sdp_checkpoint::load(&ctx.project_root, feature_id)?;
    let workstreams = crate::declarations::load_and_reconcile(&ctx.project_root, feature_id, &checkpoint)?;

    let log_path = sdp_utils::paths::evidence_log_path(&ctx.project_root, feature_id);
    let evidence_lock_path = sdp_utils::paths::evidence_log_lock_path(&ctx.project_root, feature_id);

    let mut pending_events: Vec<EvidenceEvent> = Vec::new();
    let (result, mut next_workstreams) = match checkpoint.phase {
        Phase::Build => {
            resolve_build(ctx, worktrees, &checkpoint, &checkpoint_path, &workstreams, override_result, &mut pending_events)?
        }
        Phase::Review => (
            resolve_review(ctx, feature_id, &workstreams, override_result)?,
            workstreams.clone(),
        ),
        Phase::Pr => (
            resolve_pr(ctx, feature_id, override_result)?,
            workstreams.clone(),
        ),
        Phase::Ci => (
            resolve_ci(ctx, feature_id, &checkpoint, override_result)?,
            workstreams.clone(),
        ),
        Phase::Init | Phase::Done => (override_result.unwrap_or(serde_json::Value::Null), workstreams.clone()),
    };

    let transition = sdp_phase::validate_advance(&checkpoint, &next_workstreams, &result, ctx.policy.rework.max_cycles)?;

    apply_transition(&transition, &mut next_workstreams);
    let mut new_checkpoint = checkpoint.clone();
    new_checkpoint.phase = transition.to;
    new_checkpoint.current_build_ws = transition.next_build_ws.clone();
    new_checkpoint.workstreams = next_workstreams
        .iter()
        .map(|w| sdp_types::checkpoint::WorkstreamStatusLine { id: w.id.clone(), status: w.status, activation_count: w.activation_count })
        .collect();
    if transition.to == Phase::Pr {
        if let Some(n) = result.get("pr_number").and_then(serde_json::Value::as_u64) {
            new_checkpoint.pr_number = Some(n);
        }
    }
    new_checkpoint.updated_at = chrono::Utc::now();
    new_checkpoint.canonicalize();

    for event in phase_transition_events(feature_id, &transition, &result) {
        pending_events.push(event);
    }

    if matches!(transition.to, Phase::Build | Phase::Review | Phase::Done) {
        let summary = format!("{:?} -> {:?}: {}", transition.from, transition.to, transition.detail);
        pending_events.push(crate::attestation::build(&log_path, feature_id, transition.to, summary)?);
    }

    for event in pending_events {
        if already_appended(&log_path, &event)? {
            continue;
        }
        sdp_evidence::append(&log_path, &evidence_lock_path, feature_id.as_str(), event, ctx.lock_timeout)?;
    }

    sdp_checkpoint::save(&checkpoint_path, &new_checkpoint)?;

    Ok(AdvanceOutcome { checkpoint: new_checkpoint, transition })
}

#[allow(clippy::too_many_arguments)]
fn resolve_build<G: GitPorcelain>(
    ctx: &OrchestratorContext<'_>,
    worktrees: &WorktreeManager<G>,
    checkpoint: &Checkpoint,
    checkpoint_path: &Utf8Path,
    workstreams: &[Workstream],
    override_result: Option<serde_json::Value>,
    pending_events: &mut Vec<EvidenceEvent>,
) -> Result<(serde_json::Value, Vec<Workstream>), SdpError> {
    let mut next = workstreams.to_vec();
    let current_id = checkpoint.current_build_ws.clone().ok_or_else(|| {
        SdpError::Internal("BUILD phase checkpoint has no current_build_ws pointer".into())
    })?;

    if let Some(result) = override_result {
        if let Some(w) = next.iter_mut().find(|w| w.id == current_id) {
            w.status = WorkstreamStatus::Complete;
        }
        return Ok((result, next));
    }

    let workstream = workstreams
        .iter()
        .find(|w| w.id == current_id)
        .ok_or_else(|| SdpError::NotFound { what: "workstream".into(), id: current_id.to_string() })?
        .clone();

    let base_branch = "main";
    let outcome = crate::build_step::run(ctx, worktrees, checkpoint_path, &workstream, workstreams, base_branch)?;
    pending_events.extend(outcome.events);

    if let Some(w) = next.iter_mut().find(|w| w.id == current_id) {
        w.status = WorkstreamStatus::Complete;
        w.activation_count += 1;
    }

    Ok((serde_json::json!({"ok": true}), next))
}

fn resolve_review(
    ctx: &OrchestratorContext<'_>,
    feature_id: &FeatureId,
    workstreams: &[Workstream],
    override_result: Option<serde_json::Value>,
) -> Result<serde_json::Value, SdpError> {
    if let Some(r) = override_result {
        return Ok(r);
    }
    let outcome = ctx.review.request_review(&review_request(feature_id, workstreams))?;
    Ok(outcome.to_result_json())
}

fn resolve_pr(
    ctx: &OrchestratorContext<'_>,
    feature_id: &FeatureId,
    override_result: Option<serde_json::Value>,
) -> Result<serde_json::Value, SdpError> {
    if let Some(r) = override_result {
        return Ok(r);
    }
    let request = sdp_adapters::PrRequest {
        feature_id: feature_id.clone(),
        branch: format!("sdp/{feature_id}"),
        base: "main".into(),
        title: format!("{feature_id}"),
    };
    let outcome = ctx.pr.create_pr(&request)?;
    Ok(outcome.to_result_json())
}

fn resolve_ci(
    ctx: &OrchestratorContext<'_>,
    feature_id: &FeatureId,
    checkpoint: &Checkpoint,
    override_result: Option<serde_json::Value>,
) -> Result<serde_json::Value, SdpError> {
    if let Some(r) = override_result {
        return Ok(r);
    }
    let request = sdp_adapters::CiRequest { feature_id: feature_id.clone(), pr_number: checkpoint.pr_number.unwrap_or_default() };
    let outcome = ctx.ci.poll(&request)?;
    Ok(outcome.to_result_json())
}

/// Re-running the same transition after a crash/resume must not duplicate
/// evidence (spec.md §8 no-op idempotence law), mirroring
/// `sdp_checkpoint::save`'s on-disk equality pre-check: an event whose type,
/// workstream, phase, and payload already appear in the log is a repeat of
/// work already recorded and is skipped rather than appended again.
fn already_appended(log_path: &camino::Utf8Path, event: &EvidenceEvent) -> Result<bool, SdpError> {
    let filter = sdp_evidence::EventFilter {
        event_type: Some(event.event_type),
        workstream_id: event.workstream_id.clone(),
    };
    let existing = sdp_evidence::query(log_path, &filter)?;
    Ok(existing.iter().any(|e| e.phase == event.phase && e.payload == event.payload))
}

fn review_request(feature_id: &FeatureId, workstreams: &[Workstream]) -> sdp_adapters::ReviewRequest {
    sdp_adapters::ReviewRequest {
        feature_id: feature_id.clone(),
        workstream_ids: workstreams.iter().map(|w| w.id.clone()).collect(),
    }
}

fn apply_transition(transition: &sdp_phase::TransitionOutcome, workstreams: &mut [Workstream]) {
    for id in &transition.reworked {
        if let Some(w) = workstreams.iter_mut().find(|w| &w.id == id) {
            w.status = WorkstreamStatus::Pending;
        }
    }
}

fn phase_transition_events(
    feature_id: &FeatureId,
    transition: &sdp_phase::TransitionOutcome,
    result: &serde_json::Value,
) -> Vec<EvidenceEvent> {
    let event_type = match (transition.from, transition.to) {
        (Phase::Build, Phase::Review) => Some(EventType::PreReview),
        (Phase::Review, Phase::Pr) => Some(EventType::Approval),
        (Phase::Review, Phase::Build) => Some(EventType::Approval),
        (Phase::Pr, Phase::Ci) => Some(EventType::PrCreated),
        (Phase::Ci, Phase::Done) => Some(EventType::CiPassed),
        (Phase::Ci, Phase::Pr) => Some(EventType::CiFailed),
        _ => None,
    };
    let Some(event_type) = event_type else { return Vec::new() };

    let mut payload = BTreeMap::new();
    payload.insert("detail".to_string(), serde_json::Value::String(transition.detail.clone()));
    payload.insert("result".to_string(), result.clone());

    vec![EvidenceEvent {
        event_id: String::new(),
        prev_hash: String::new(),
        event_type,
        feature_id: feature_id.clone(),
        workstream_id: transition.next_build_ws.clone(),
        phase: transition.to,
        actor: Actor::Tool { name: "sdp-core".into() },
        timestamp: chrono::Utc::now(),
        payload,
        hash: String::new(),
    }]
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdp_adapters::NullAdapters;
    use sdp_runner::{CommandSpec, ProcessOutput, ProcessRunner};
    use sdp_worktree::GitPorcelain;
    use std::str::FromStr;
    use std::time::Duration;

    struct FakeRunner;
    impl ProcessRunner for FakeRunner {
        fn run(&self, _cmd: &CommandSpec, _timeout: Duration) -> Result<ProcessOutput, SdpError> {
            Ok(ProcessOutput::new(Vec::new(), Vec::new(), Some(0), false))
        }
    }

    struct FakeGit;
    impl GitPorcelain for FakeGit {
        fn add(&self, _repo_root: &Utf8Path, _path: &Utf8Path, _branch: &str, _base: &str) -> Result<(), SdpError> {
            Ok(())
        }
        fn current_branch(&self, _path: &Utf8Path) -> Result<Option<String>, SdpError> {
            Ok(None)
        }
        fn remove(&self, _repo_root: &Utf8Path, _path: &Utf8Path) -> Result<(), SdpError> {
            Ok(())
        }
        fn prune_stale(&self, _repo_root: &Utf8Path) -> Result<(), SdpError> {
            Ok(())
        }
    }

    fn write_decl(root: &Utf8Path, feature: &str, name: &str, body: &str) {
        let dir = sdp_utils::paths::workstreams_decl_dir(root, &FeatureId::from_str(feature).unwrap());
        std::fs::create_dir_all(dir.as_std_path()).unwrap();
        std::fs::write(dir.join(name).as_std_path(), body).unwrap();
    }

    #[test]
    fn advance_through_init_picks_first_ready_workstream() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap().to_owned();
        write_decl(&root, "F001", "01.yml", "id: 00-F001-01\ntitle: First\nsize_class: SMALL\ndeclared_index: 0\n");
        let feature_id = FeatureId::from_str("F001").unwrap();
        crate::init::init(&root, &feature_id, Duration::from_secs(1)).unwrap();

        let runner = FakeRunner;
        let adapters = NullAdapters;
        let ctx = OrchestratorContext {
            project_root: root.clone(),
            repo_root: root.clone(),
            policy: sdp_types::Policy::default(),
            lock_timeout: Duration::from_secs(1),
            runner: &runner,
            agent: sdp_agent::AgentLaunch::new("true").with_timeout(Duration::from_secs(1)),
            review: &adapters,
            pr: &adapters,
            ci: &adapters,
            cancel: sdp_runner::CancellationToken::new(),
            skip_guard: false,
        };
        let worktrees = WorktreeManager::new(root.clone(), root.clone(), FakeGit);

        let out = advance(&ctx, &worktrees, &feature_id, Some(serde_json::json!(null))).unwrap();
        assert_eq!(out.checkpoint.phase, Phase::Build);
        assert!(out.checkpoint.current_build_ws.is_some());
    }
}
