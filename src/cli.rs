//! Command-line interface for `sdp`.
//!
//! Parses argv, resolves global flags into a project root and timeouts,
//! builds the process runner and collaborator drivers, and dispatches to
//! `sdp-core`. This module owns ALL output, including error text — `main`
//! only maps the returned exit code onto `std::process::exit`.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use sdp_adapters::NullAdapters;
use sdp_runner::{CancellationToken, CommandSpec, ProcessRunner, TokioProcessRunner};
use sdp_types::FeatureId;
use sdp_utils::{exit_codes, SdpError};
use sdp_worktree::{ProcessGitPorcelain, WorktreeManager};

/// sdp - developer-workflow orchestrator driving an AI coding agent through
/// INIT -> BUILD -> REVIEW -> PR -> CI -> DONE.
#[derive(Parser)]
#[command(name = "sdp")]
#[command(about = "Orchestrates an AI coding agent through a scope-guarded, auditable workflow")]
#[command(version)]
struct Cli {
    /// Root of the project this feature lives in.
    #[arg(long, global = true, default_value = ".")]
    project_root: PathBuf,

    /// Override for the checkpoints directory (accepted for interface
    /// compatibility; the fixed `.sdp/checkpoints` layout is always used —
    /// see DESIGN.md).
    #[arg(long, global = true)]
    checkpoints: Option<PathBuf>,

    /// Override for the evidence log path (see `--checkpoints`).
    #[arg(long, global = true)]
    evidence: Option<PathBuf>,

    /// Override for the policy file path (see `--checkpoints`).
    #[arg(long, global = true)]
    policy: Option<PathBuf>,

    /// Timeout, in seconds, for every lock acquisition and subprocess wait.
    #[arg(long, global = true, default_value_t = 30)]
    lock_timeout: u64,

    /// Emit machine-readable JSON instead of human text where supported.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a feature from its declared workstream files and write the
    /// initial checkpoint.
    Init {
        #[arg(long)]
        feature: String,
    },
    /// Attempt to advance the current phase: runs gates, hooks, and the
    /// transition, then persists.
    Advance {
        #[arg(long)]
        feature: String,
        /// Explicit phase-transition result JSON, bypassing the configured
        /// driver / real build pipeline for this step.
        #[arg(long)]
        result: Option<String>,
        /// Bypass the sealed-scope check for this BUILD step.
        #[arg(long)]
        skip_guard: bool,
    },
    /// Produce a context packet for the current (or named) build
    /// workstream without advancing.
    Hydrate {
        #[arg(long)]
        feature: String,
        #[arg(long)]
        ws: Option<String>,
    },
    /// Emit a machine-readable snapshot of the checkpoint.
    Status {
        #[arg(long)]
        feature: String,
    },
    /// Scope-guard standalone operations.
    Guard {
        #[command(subcommand)]
        command: GuardCommands,
    },
    /// Worktree lifecycle operations.
    Worktree {
        #[command(subcommand)]
        command: WorktreeCommands,
    },
}

#[derive(Subcommand)]
enum GuardCommands {
    /// Check the current workstream's changes (from the environment set by
    /// hooks/the agent launch) against its sealed scope.
    Check {
        #[arg(long)]
        staged: bool,
    },
    /// Mark `ws` active in its feature's checkpoint.
    Activate { ws: String },
}

#[derive(Subcommand)]
enum WorktreeCommands {
    Create {
        #[arg(long)]
        feature: String,
        #[arg(long)]
        ws: String,
        #[arg(long, default_value = "main")]
        base: String,
    },
    Release {
        #[arg(long)]
        feature: String,
        #[arg(long)]
        ws: String,
    },
    Prune {
        #[arg(long)]
        feature: String,
    },
}

/// Entry point called by `main`. Returns the process exit code; never
/// panics on a user-facing error path. `cancel` is fired by `main`'s
/// SIGINT/SIGTERM handler, racing an in-flight agent invocation.
#[must_use]
pub fn run(handle: tokio::runtime::Handle, cancel: CancellationToken) -> i32 {
    let cli = Cli::parse();
    sdp_utils::logging::init();

    match dispatch(&cli, handle, cancel) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:?}");
            exit_codes::GENERIC_FAILURE
        }
    }
}

fn dispatch(cli: &Cli, handle: tokio::runtime::Handle, cancel: CancellationToken) -> Result<i32> {
    let project_root = Utf8PathBuf::from_path_buf(cli.project_root.clone())
        .map_err(|p| anyhow::anyhow!("--project-root '{}' is not valid UTF-8", p.display()))?;
    warn_on_unsupported_overrides(cli);
    let lock_timeout = Duration::from_secs(cli.lock_timeout);
    let runner = TokioProcessRunner::new(handle.clone());

    match &cli.command {
        Commands::Init { feature } => Ok(run_init(&project_root, feature, lock_timeout)),
        Commands::Advance { feature, result, skip_guard } => Ok(run_advance(
            &project_root,
            feature,
            result.as_deref(),
            *skip_guard,
            lock_timeout,
            &runner,
            &handle,
            cancel,
        )),
        Commands::Hydrate { feature, ws } => run_hydrate(&project_root, feature, ws.as_deref(), cli.json),
        Commands::Status { feature } => run_status(&project_root, feature),
        Commands::Guard { command } => Ok(run_guard(&project_root, command, &runner)),
        Commands::Worktree { command } => Ok(run_worktree(&project_root, command, &handle)),
    }
}

fn warn_on_unsupported_overrides(cli: &Cli) {
    for (flag, value) in [("--checkpoints", &cli.checkpoints), ("--evidence", &cli.evidence), ("--policy", &cli.policy)] {
        if value.is_some() {
            tracing::warn!(flag, "path overrides are accepted for interface compatibility but not yet honored; the fixed .sdp/ layout under --project-root is always used");
        }
    }
}

fn parse_feature(feature: &str) -> Result<FeatureId, i32> {
    feature.parse::<FeatureId>().map_err(|_| exit_codes::INVALID_FEATURE_ID)
}

fn run_init(project_root: &Utf8PathBuf, feature: &str, lock_timeout: Duration) -> i32 {
    let feature_id = match parse_feature(feature) {
        Ok(id) => id,
        Err(code) => return code,
    };
    match sdp_core::init(project_root, &feature_id, lock_timeout) {
        Ok(checkpoint) => {
            println!("initialized {feature_id}: phase={:?} workstreams={}", checkpoint.phase, checkpoint.workstreams.len());
            exit_codes::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {err}");
            exit_codes::for_init_error(&err)
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn run_advance(
    project_root: &Utf8PathBuf,
    feature: &str,
    result: Option<&str>,
    skip_guard: bool,
    lock_timeout: Duration,
    runner: &dyn ProcessRunner,
    handle: &tokio::runtime::Handle,
    cancel: CancellationToken,
) -> i32 {
    let feature_id = match parse_feature(feature) {
        Ok(id) => id,
        Err(code) => return code,
    };
    let override_result = match result.map(serde_json::from_str::<serde_json::Value>) {
        Some(Ok(v)) => Some(v),
        Some(Err(e)) => {
            eprintln!("error: invalid --result JSON: {e}");
            return exit_codes::GENERIC_FAILURE;
        }
        None => None,
    };

    let policy = match sdp_config::load_policy(&sdp_utils::paths::policy_path(project_root)) {
        Ok(p) => p,
        Err(err) => {
            eprintln!("error: {err}");
            return exit_codes::for_advance_error(&err);
        }
    };

    let porcelain = ProcessGitPorcelain::new(TokioProcessRunner::new(handle.clone()));
    let worktrees = WorktreeManager::new(project_root.clone(), project_root.clone(), porcelain);
    let agent = policy.agent.as_ref().map(sdp_agent::AgentLaunch::from_policy).unwrap_or_else(|| sdp_agent::AgentLaunch::new("sdp-agent"));
    let adapters = NullAdapters;
    let ctx = sdp_core::OrchestratorContext {
        project_root: project_root.clone(),
        repo_root: project_root.clone(),
        policy,
        lock_timeout,
        runner,
        agent,
        review: &adapters,
        pr: &adapters,
        ci: &adapters,
        cancel,
        skip_guard,
    };

    match sdp_core::advance(&ctx, &worktrees, &feature_id, override_result) {
        Ok(outcome) => {
            println!(
                "{feature_id}: {:?} -> {:?} ({})",
                outcome.transition.from, outcome.transition.to, outcome.transition.detail
            );
            exit_codes::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {err}");
            exit_codes::for_advance_error(&err)
        }
    }
}

fn run_hydrate(project_root: &Utf8PathBuf, feature: &str, ws: Option<&str>, json: bool) -> Result<i32> {
    let feature_id = match parse_feature(feature) {
        Ok(id) => id,
        Err(code) => return Ok(code),
    };
    let checkpoint = sdp_checkpoint::load(project_root, &feature_id).context("loading checkpoint")?;
    let workstreams = sdp_core::declarations::load_and_reconcile(project_root, &feature_id, &checkpoint)?;

    let target_id = match ws {
        Some(raw) => raw.parse().context("invalid --ws id")?,
        None => match checkpoint.current_build_ws.clone() {
            Some(id) => id,
            None => {
                eprintln!("error: feature {feature_id} has no current build workstream; pass --ws");
                return Ok(exit_codes::GENERIC_FAILURE);
            }
        },
    };
    let workstream = workstreams
        .iter()
        .find(|w| w.id == target_id)
        .ok_or_else(|| anyhow::anyhow!("workstream {target_id} is not declared for {feature_id}"))?;

    let scope = sdp_types::Scope::sealed(workstream.declared_scope.clone());
    let predecessor_summaries: Vec<_> = workstream
        .dependencies
        .iter()
        .filter_map(|dep| workstreams.iter().find(|w| &w.id == dep))
        .filter(|w| w.status == sdp_types::WorkstreamStatus::Complete)
        .map(|w| (w.id.clone(), w.title.clone()))
        .collect();
    let packet = sdp_packet::PacketBuilder::new().build(&sdp_packet::PacketInput {
        workstream,
        scope: &scope,
        predecessor_summaries: &predecessor_summaries,
        failure_artifacts: &[],
    })?;

    if json {
        let json = serde_json::json!({
            "workstream_id": workstream.id.to_string(),
            "hash": packet.hash,
            "truncated": packet.evidence.truncated,
            "max_bytes": packet.evidence.max_bytes,
            "max_lines": packet.evidence.max_lines,
            "content": packet.content,
        });
        println!("{}", serde_json::to_string_pretty(&json)?);
    } else {
        println!("{}", packet.content);
    }
    Ok(exit_codes::SUCCESS)
}

fn run_status(project_root: &Utf8PathBuf, feature: &str) -> Result<i32> {
    let feature_id = match parse_feature(feature) {
        Ok(id) => id,
        Err(code) => return Ok(code),
    };
    let checkpoint = sdp_checkpoint::load(project_root, &feature_id).context("loading checkpoint")?;
    println!("{}", serde_json::to_string_pretty(&checkpoint)?);
    Ok(exit_codes::SUCCESS)
}

fn run_guard(project_root: &Utf8PathBuf, command: &GuardCommands, runner: &dyn ProcessRunner) -> i32 {
    match command {
        GuardCommands::Check { staged } => run_guard_check(project_root, *staged, runner),
        GuardCommands::Activate { ws } => run_guard_activate(project_root, ws),
    }
}

fn run_guard_check(project_root: &Utf8PathBuf, staged: bool, runner: &dyn ProcessRunner) -> i32 {
    let Ok(workstream_id) = std::env::var("SDP_WORKSTREAM_ID") else {
        eprintln!("error: guard check requires SDP_WORKSTREAM_ID in the environment (set by hooks/the agent launch)");
        return exit_codes::GENERIC_FAILURE;
    };
    let Ok(workstream_id): Result<sdp_types::WorkstreamId, _> = workstream_id.parse() else {
        eprintln!("error: SDP_WORKSTREAM_ID '{workstream_id}' is not a valid workstream id");
        return exit_codes::GENERIC_FAILURE;
    };
    let feature_id = match workstream_id.feature_id() {
        Ok(id) => id,
        Err(err) => {
            eprintln!("error: {err}");
            return exit_codes::GENERIC_FAILURE;
        }
    };

    let checkpoint = match sdp_checkpoint::load(project_root, &feature_id) {
        Ok(c) => c,
        Err(err) => {
            eprintln!("error: {err}");
            return exit_codes::for_advance_error(&err);
        }
    };
    let workstreams = match sdp_core::declarations::load_and_reconcile(project_root, &feature_id, &checkpoint) {
        Ok(w) => w,
        Err(err) => {
            eprintln!("error: {err}");
            return exit_codes::for_advance_error(&err);
        }
    };
    let Some(workstream) = workstreams.iter().find(|w| w.id == workstream_id) else {
        eprintln!("error: workstream {workstream_id} is not declared for {feature_id}");
        return exit_codes::GENERIC_FAILURE;
    };
    let scope = sdp_types::Scope::sealed(workstream.declared_scope.clone());
    let worktree_path = std::env::var("SDP_WORKTREE_PATH").map(Utf8PathBuf::from).unwrap_or_else(|_| project_root.clone());

    let paths = if staged {
        staged_paths(&worktree_path, runner)
    } else {
        let diff = sdp_core::git_diff::GitDiffSource::new(worktree_path, runner);
        use sdp_scope::DiffSource;
        diff.staged_and_unstaged_paths()
    };
    let paths = match paths {
        Ok(p) => p,
        Err(err) => {
            eprintln!("error: {err}");
            return exit_codes::GENERIC_FAILURE;
        }
    };

    match sdp_scope::check(&workstream_id, &scope, &VecDiffSource(paths)) {
        Ok(()) => {
            println!("ok: changes are within {workstream_id}'s sealed scope");
            exit_codes::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {err}");
            exit_codes::for_advance_error(&err)
        }
    }
}

fn run_guard_activate(project_root: &Utf8PathBuf, ws: &str) -> i32 {
    let Ok(workstream_id): Result<sdp_types::WorkstreamId, _> = ws.parse() else {
        eprintln!("error: '{ws}' is not a valid workstream id");
        return exit_codes::GENERIC_FAILURE;
    };
    let feature_id = match workstream_id.feature_id() {
        Ok(id) => id,
        Err(err) => {
            eprintln!("error: {err}");
            return exit_codes::GENERIC_FAILURE;
        }
    };
    let checkpoint_path = sdp_utils::paths::checkpoint_path(project_root, &feature_id);
    let mut checkpoint = match sdp_checkpoint::load(project_root, &feature_id) {
        Ok(c) => c,
        Err(err) => {
            eprintln!("error: {err}");
            return exit_codes::for_advance_error(&err);
        }
    };
    let Some(line) = checkpoint.workstreams.iter_mut().find(|l| l.id == workstream_id) else {
        eprintln!("error: workstream {workstream_id} has no status line in {feature_id}'s checkpoint");
        return exit_codes::GENERIC_FAILURE;
    };
    line.status = sdp_types::WorkstreamStatus::Active;
    checkpoint.updated_at = chrono::Utc::now();
    checkpoint.canonicalize();

    match sdp_checkpoint::save(&checkpoint_path, &checkpoint) {
        Ok(()) => {
            println!("activated {workstream_id}");
            exit_codes::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {err}");
            exit_codes::for_advance_error(&err)
        }
    }
}

fn staged_paths(worktree: &Utf8PathBuf, runner: &dyn ProcessRunner) -> Result<Vec<Utf8PathBuf>, SdpError> {
    let cmd = CommandSpec::new("git").args(["-C", worktree.as_str(), "diff", "--cached", "--name-only", "-z"]);
    let out = runner.run(&cmd, Duration::from_secs(30))?;
    if !out.success() {
        return Err(SdpError::Internal(format!("git diff --cached failed: {}", out.stderr_string().trim())));
    }
    Ok(out.stdout_string().split('\0').filter(|s| !s.is_empty()).map(Utf8PathBuf::from).collect())
}

struct VecDiffSource(Vec<Utf8PathBuf>);

impl sdp_scope::DiffSource for VecDiffSource {
    fn staged_and_unstaged_paths(&self) -> Result<Vec<Utf8PathBuf>, SdpError> {
        Ok(self.0.clone())
    }
}

fn run_worktree(project_root: &Utf8PathBuf, command: &WorktreeCommands, handle: &tokio::runtime::Handle) -> i32 {
    let porcelain = ProcessGitPorcelain::new(TokioProcessRunner::new(handle.clone()));
    let manager = WorktreeManager::new(project_root.clone(), project_root.clone(), porcelain);

    match command {
        WorktreeCommands::Create { ws, base, .. } => {
            let Ok(ws_id) = ws.parse() else {
                eprintln!("error: '{ws}' is not a valid workstream id");
                return exit_codes::GENERIC_FAILURE;
            };
            match manager.reuse_or_create(&ws_id, base) {
                Ok(path) => {
                    println!("{path}");
                    exit_codes::SUCCESS
                }
                Err(err) => {
                    eprintln!("error: {err}");
                    exit_codes::for_advance_error(&err)
                }
            }
        }
        WorktreeCommands::Release { ws, .. } => {
            let Ok(ws_id) = ws.parse() else {
                eprintln!("error: '{ws}' is not a valid workstream id");
                return exit_codes::GENERIC_FAILURE;
            };
            match manager.release(&ws_id) {
                Ok(()) => exit_codes::SUCCESS,
                Err(err) => {
                    eprintln!("error: {err}");
                    exit_codes::for_advance_error(&err)
                }
            }
        }
        WorktreeCommands::Prune { feature } => {
            let Ok(feature_id) = feature.parse::<FeatureId>() else {
                return exit_codes::INVALID_FEATURE_ID;
            };
            match manager.prune(&feature_id) {
                Ok(removed) => {
                    for path in removed {
                        println!("removed {path}");
                    }
                    exit_codes::SUCCESS
                }
                Err(err) => {
                    eprintln!("error: {err}");
                    exit_codes::for_advance_error(&err)
                }
            }
        }
    }
}
