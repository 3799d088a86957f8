//! Runs one workstream's BUILD activation to completion: pre_build hook,
//! worktree reuse/create, context packet, agent invocation, scope check,
//! quality gates, post_build hook. Every step short-circuits on the first
//! failure; nothing here marks the workstream complete in the checkpoint —
//! that is [`crate::advance::advance`]'s job once this returns `Ok`.

use camino::Utf8PathBuf;
use sdp_agent::{AgentRunRequest, RunContext};
use sdp_packet::{PacketBuilder, PacketInput};
use sdp_scope::DiffSource;
use sdp_types::{EvidenceEvent, Phase, Scope, Workstream, WorkstreamId};
use sdp_utils::SdpError;
use sdp_worktree::{GitPorcelain, WorktreeManager};

use crate::context::OrchestratorContext;
use crate::git_diff::GitDiffSource;

pub struct BuildStepOutcome {
    pub worktree_path: Utf8PathBuf,
    /// In ingestion order: `pre_build`, `generation`, `post_build`.
    pub events: Vec<EvidenceEvent>,
}

/// `predecessor_summaries` is derived by the caller from one-line titles of
/// already-`Complete` dependencies; this function only assembles and runs.
#[allow(clippy::too_many_arguments)]
pub fn run<G: GitPorcelain>(
    ctx: &OrchestratorContext<'_>,
    worktrees: &WorktreeManager<G>,
    checkpoint_path: &camino::Utf8Path,
    workstream: &Workstream,
    all_workstreams: &[Workstream],
    base_branch: &str,
) -> Result<BuildStepOutcome, SdpError> {
    let scope = Scope::sealed(workstream.declared_scope.clone());
    let worktree_path = worktrees.reuse_or_create(&workstream.id, base_branch)?;

    let mut events = Vec::new();

    let hook_ctx = sdp_hooks::HookContext {
        feature_id: workstream.id.feature_id()?,
        workstream_id: Some(workstream.id.clone()),
        phase: Phase::Build,
        worktree_path: worktree_path.clone(),
        checkpoint_path: checkpoint_path.to_owned(),
        policy_path: ctx.policy_path(),
    };
    let pre_results = run_boundary_hooks(ctx, "pre", "build", &hook_ctx)?;
    events.push(hook_event("pre_build", &hook_ctx, &pre_results));

    let predecessor_summaries = predecessor_summaries(workstream, all_workstreams);
    let packet = PacketBuilder::new().build(&PacketInput {
        workstream,
        scope: &scope,
        predecessor_summaries: &predecessor_summaries,
        failure_artifacts: &[],
    })?;

    let run_context = RunContext {
        feature_id: workstream.id.feature_id()?,
        workstream_id: workstream.id.clone(),
        phase: Phase::Build,
        worktree_path: worktree_path.clone(),
        checkpoint_path: checkpoint_path.to_owned(),
        policy_path: ctx.policy_path(),
        model_id: agent_model_id(ctx),
    };
    let request = AgentRunRequest { context: run_context.clone(), packet: &packet };
    let outcome = match sdp_agent::run(&ctx.agent, &request, ctx.runner, &ctx.cancel) {
        Ok(outcome) => outcome,
        Err(SdpError::Cancelled) => {
            persist_cancelled(ctx, &run_context, events)?;
            return Err(SdpError::Cancelled);
        }
        Err(err) => return Err(err),
    };
    events.push(sdp_agent::generation_event(&run_context, &packet.hash, &outcome));

    let diff = GitDiffSource::new(worktree_path.clone(), ctx.runner);
    if !ctx.skip_guard {
        sdp_scope::check(&workstream.id, &scope, &diff)?;
    }

    let changed = diff.staged_and_unstaged_paths()?;
    let report = sdp_gate::evaluate(&ctx.policy.rules, &changed, &worktree_path, ctx.runner)?;
    if report.verdict == sdp_gate::Verdict::Fail {
        let rule_ids = report
            .outcomes
            .iter()
            .filter(|o| !o.passed && o.severity == sdp_types::Severity::Block)
            .map(|o| o.rule_id.clone())
            .collect();
        return Err(SdpError::QualityGateBlock { rule_ids });
    }

    let post_results = run_boundary_hooks(ctx, "post", "build", &hook_ctx)?;
    events.push(hook_event("post_build", &hook_ctx, &post_results));

    Ok(BuildStepOutcome { worktree_path, events })
}

/// A cancellation aborts `run` before `advance`'s own append loop ever runs,
/// so the already-collected hook event and the `cancelled` event (spec.md
/// §4.9) are appended here directly rather than lost with the error.
fn persist_cancelled(ctx: &OrchestratorContext<'_>, run_context: &RunContext, events: Vec<EvidenceEvent>) -> Result<(), SdpError> {
    let log_path = sdp_utils::paths::evidence_log_path(&ctx.project_root, &run_context.feature_id);
    let lock_path = sdp_utils::paths::evidence_log_lock_path(&ctx.project_root, &run_context.feature_id);
    for event in events {
        sdp_evidence::append(&log_path, &lock_path, run_context.feature_id.as_str(), event, ctx.lock_timeout)?;
    }
    sdp_evidence::append(
        &log_path,
        &lock_path,
        run_context.feature_id.as_str(),
        sdp_agent::cancelled_event(run_context),
        ctx.lock_timeout,
    )?;
    Ok(())
}

fn agent_model_id(ctx: &OrchestratorContext<'_>) -> String {
    ctx.policy.agent.as_ref().map(|a| a.command.clone()).unwrap_or_else(|| "unknown-agent".to_string())
}

fn predecessor_summaries(workstream: &Workstream, all: &[Workstream]) -> Vec<(WorkstreamId, String)> {
    workstream
        .dependencies
        .iter()
        .filter_map(|dep_id| all.iter().find(|w| &w.id == dep_id))
        .filter(|w| w.status == sdp_types::WorkstreamStatus::Complete)
        .map(|w| (w.id.clone(), w.title.clone()))
        .collect()
}

fn run_boundary_hooks(
    ctx: &OrchestratorContext<'_>,
    stage: &str,
    boundary: &str,
    hook_ctx: &sdp_hooks::HookContext,
) -> Result<Vec<sdp_hooks::HookResult>, SdpError> {
    let dir = sdp_utils::paths::hooks_boundary_dir(&ctx.project_root, stage, boundary);
    sdp_hooks::run_hooks(&dir, hook_ctx, ctx.runner, sdp_hooks::DEFAULT_HOOK_TIMEOUT)
}

/// Captures each script's stdout/exit code in the event payload (spec.md
/// §4.8); the boundary itself still determines `event_type` so `PreBuild`/
/// `PostBuild` stay distinguishable without a separate `Hook` event per
/// script.
fn hook_event(label: &str, hook_ctx: &sdp_hooks::HookContext, results: &[sdp_hooks::HookResult]) -> EvidenceEvent {
    let event_type = match label {
        "pre_build" => sdp_types::EventType::PreBuild,
        "post_build" => sdp_types::EventType::PostBuild,
        other => unreachable!("unexpected hook boundary label {other}"),
    };
    let mut payload = std::collections::BTreeMap::new();
    payload.insert(
        "scripts".to_string(),
        serde_json::json!(results
            .iter()
            .map(|r| serde_json::json!({
                "script": r.script.to_string(),
                "exit_code": r.exit_code,
                "stdout": r.stdout,
            }))
            .collect::<Vec<_>>()),
    );
    EvidenceEvent {
        event_id: String::new(),
        prev_hash: String::new(),
        event_type,
        feature_id: hook_ctx.feature_id.clone(),
        workstream_id: hook_ctx.workstream_id.clone(),
        phase: hook_ctx.phase,
        actor: sdp_types::Actor::Tool { name: "sdp-hooks".into() },
        timestamp: chrono::Utc::now(),
        payload,
        hash: String::new(),
    }
}
