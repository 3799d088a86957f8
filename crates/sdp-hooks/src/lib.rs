//! Hook Runner (spec.md §4.8): discovers and executes scripts at
//! `pre`/`post` boundaries (`build | review | pr | ci | deploy`).

use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use sdp_runner::{CommandSpec, ProcessRunner};
use sdp_types::{FeatureId, Phase, WorkstreamId};
use sdp_utils::SdpError;

/// Default per-hook timeout, used when policy does not override it.
pub const DEFAULT_HOOK_TIMEOUT: Duration = Duration::from_secs(60);

/// Environment exposed to every hook invocation.
#[derive(Debug, Clone)]
pub struct HookContext {
    pub feature_id: FeatureId,
    pub workstream_id: Option<WorkstreamId>,
    pub phase: Phase,
    pub worktree_path: Utf8PathBuf,
    pub checkpoint_path: Utf8PathBuf,
    pub policy_path: Utf8PathBuf,
}

impl HookContext {
    fn envs(&self) -> Vec<(&'static str, String)> {
        let mut vars = vec![
            ("SDP_FEATURE_ID", self.feature_id.to_string()),
            ("SDP_PHASE", self.phase.as_str().to_string()),
            ("SDP_WORKTREE_PATH", self.worktree_path.to_string()),
            ("SDP_CHECKPOINT_PATH", self.checkpoint_path.to_string()),
            ("SDP_POLICY_PATH", self.policy_path.to_string()),
        ];
        if let Some(ws) = &self.workstream_id {
            vars.push(("SDP_WORKSTREAM_ID", ws.to_string()));
        }
        vars
    }
}

/// Outcome of one hook script.
#[derive(Debug, Clone)]
pub struct HookResult {
    pub script: Utf8PathBuf,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

/// Scripts under `dir`, lexical filename order. Non-executable files are
/// skipped on unix; every regular file is taken on platforms with no
/// executable bit.
pub fn discover_scripts(dir: &Utf8Path) -> Result<Vec<Utf8PathBuf>, SdpError> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut scripts = Vec::new();
    for entry in std::fs::read_dir(dir.as_std_path())? {
        let entry = entry?;
        let path = Utf8PathBuf::from_path_buf(entry.path())
            .map_err(|p| SdpError::InvalidArgument { message: format!("non-utf8 hook path: {}", p.display()) })?;
        if !path.is_file() {
            continue;
        }
        if is_executable(&path) {
            scripts.push(path);
        }
    }
    scripts.sort();
    Ok(scripts)
}

#[cfg(unix)]
fn is_executable(path: &Utf8Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path.as_std_path())
        .map(|m| m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(_path: &Utf8Path) -> bool {
    true
}

/// Runs every script discovered under `boundary_dir` in order, aborting on
/// the first non-zero exit. Returns the completed results on success.
pub fn run_hooks(
    boundary_dir: &Utf8Path,
    context: &HookContext,
    runner: &dyn ProcessRunner,
    timeout: Duration,
) -> Result<Vec<HookResult>, SdpError> {
    let scripts = discover_scripts(boundary_dir)?;
    let mut results = Vec::with_capacity(scripts.len());
    for script in scripts {
        let cmd = CommandSpec::new(script.as_str())
            .cwd(&context.worktree_path)
            .envs(context.envs());
        let output = runner.run(&cmd, timeout)?;
        let exit_code = output.exit_code.unwrap_or(-1);
        let result = HookResult {
            script: script.clone(),
            exit_code,
            stdout: output.stdout_string(),
            stderr: output.stderr_string(),
        };
        if !output.success() {
            tracing::warn!(script = %script, exit_code, stderr = %result.stderr, "hook failed");
            return Err(SdpError::HookFailed {
                script: script.to_string(),
                exit_code,
            });
        }
        results.push(result);
    }
    Ok(results)
}
