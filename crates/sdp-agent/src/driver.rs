use std::ffi::OsString;
use std::time::Duration;

use camino::Utf8PathBuf;
use sdp_packet::Packet;
use sdp_runner::{CancellationToken, CommandSpec, ProcessRunner};
use sdp_utils::SdpError;

use crate::artifacts::{self, CapturedArtifacts};
use crate::context::RunContext;
use crate::packet_file;

/// No coding agent finishes instantly; an hour is generous headroom before
/// the orchestrator's own per-step timeout fires.
pub const DEFAULT_AGENT_TIMEOUT: Duration = Duration::from_secs(3600);

/// The command used to launch the agent, independent of any one run.
#[derive(Debug, Clone)]
pub struct AgentLaunch {
    program: OsString,
    base_args: Vec<OsString>,
    timeout: Duration,
}

impl AgentLaunch {
    #[must_use]
    pub fn new(program: impl Into<OsString>) -> Self {
        Self { program: program.into(), base_args: Vec::new(), timeout: DEFAULT_AGENT_TIMEOUT }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.base_args.push(arg.into());
        self
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.base_args.extend(args.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builds a launch spec from the policy document's `agent.command`,
    /// consistent with how `sdp-gate`'s `external_check` treats a
    /// configured command as the whole program with no further splitting.
    #[must_use]
    pub fn from_policy(config: &sdp_types::policy::AgentConfig) -> Self {
        Self::new(config.command.clone())
    }
}

/// Everything needed to drive one workstream activation through the agent.
pub struct AgentRunRequest<'a> {
    pub context: RunContext,
    pub packet: &'a Packet,
}

/// What came back from a successfully completed (non-cancelled,
/// non-timed-out) agent run.
#[derive(Debug, Clone)]
pub struct AgentOutcome {
    pub exit_code: i32,
    pub artifacts: CapturedArtifacts,
    pub stdout: String,
    pub stderr: String,
}

/// Writes the packet into the worktree, launches the agent subprocess, and
/// captures artifacts on a clean exit.
///
/// Returns `Err(SdpError::Cancelled)` if `cancel` fired before the child
/// exited, and `Err(SdpError::ProcessTimeout)` if it ran past
/// `config`'s timeout — in both cases the child has already been
/// terminated by the time this returns. A non-zero exit that is neither of
/// those is `SdpError::AgentFailed`.
pub fn run(
    config: &AgentLaunch,
    request: &AgentRunRequest<'_>,
    runner: &dyn ProcessRunner,
    cancel: &CancellationToken,
) -> Result<AgentOutcome, SdpError> {
    let worktree_path: Utf8PathBuf = request.context.worktree_path.clone();
    request.packet.write_to(&packet_file::packet_path(&worktree_path))?;

    let cmd = CommandSpec::new(config.program.clone())
        .args(config.base_args.clone())
        .cwd(&worktree_path)
        .envs(request.context.env_vars());

    let output = runner.run_cancellable(&cmd, config.timeout, cancel)?;

    if !output.success() {
        return Err(SdpError::AgentFailed {
            reason: format!("agent exited {:?}: {}", output.exit_code, output.stderr_string().trim()),
        });
    }

    tracing::info!(
        feature_id = %request.context.feature_id,
        workstream_id = %request.context.workstream_id,
        "agent run completed"
    );

    let captured = artifacts::capture(runner, &worktree_path)?;
    Ok(AgentOutcome {
        exit_code: output.exit_code.unwrap_or(-1),
        artifacts: captured,
        stdout: output.stdout_string(),
        stderr: output.stderr_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdp_packet::{BudgetUsage, PacketEvidence};
    use std::str::FromStr;

    struct FakeRunner {
        output: Result<sdp_runner::ProcessOutput, ()>,
    }

    impl ProcessRunner for FakeRunner {
        fn run(&self, _cmd: &CommandSpec, _timeout: Duration) -> Result<sdp_runner::ProcessOutput, SdpError> {
            self.output.clone().map_err(|()| SdpError::Internal("boom".into()))
        }

        fn run_cancellable(
            &self,
            cmd: &CommandSpec,
            timeout: Duration,
            cancel: &CancellationToken,
        ) -> Result<sdp_runner::ProcessOutput, SdpError> {
            if cancel.is_cancelled() {
                return Err(SdpError::Cancelled);
            }
            self.run(cmd, timeout)
        }
    }

    fn packet() -> Packet {
        let evidence = PacketEvidence {
            workstream_id: sdp_types::WorkstreamId::from_str("00-F001-01").unwrap(),
            sections: vec![],
            max_bytes: 100,
            max_lines: 10,
            truncated: false,
        };
        Packet::new("packet body".into(), Packet::hash_content("packet body"), evidence, BudgetUsage::new(100, 10))
    }

    fn context(worktree: Utf8PathBuf) -> RunContext {
        RunContext {
            feature_id: sdp_types::FeatureId::from_str("F001").unwrap(),
            workstream_id: sdp_types::WorkstreamId::from_str("00-F001-01").unwrap(),
            phase: sdp_types::Phase::Build,
            worktree_path: worktree,
            checkpoint_path: Utf8PathBuf::from("/tmp/ckpt.json"),
            policy_path: Utf8PathBuf::from("/tmp/policy.yml"),
            model_id: "claude".into(),
        }
    }

    #[test]
    fn successful_run_writes_packet_and_captures_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let worktree = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let packet = packet();
        let request = AgentRunRequest { context: context(worktree.clone()), packet: &packet };
        let runner = FakeRunner { output: Ok(sdp_runner::ProcessOutput::new(b"ok".to_vec(), vec![], Some(0), false)) };
        let cancel = CancellationToken::new();

        let outcome = run(&AgentLaunch::new("whatever-agent-cli"), &request, &runner, &cancel).unwrap();
        assert_eq!(outcome.exit_code, 0);
        assert!(worktree.join("CONTEXT_PACKET.md").exists());
        assert_eq!(std::fs::read_to_string(worktree.join("CONTEXT_PACKET.md").as_std_path()).unwrap(), "packet body");
    }

    #[test]
    fn nonzero_exit_is_agent_failed() {
        let dir = tempfile::tempdir().unwrap();
        let worktree = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let packet = packet();
        let request = AgentRunRequest { context: context(worktree), packet: &packet };
        let runner =
            FakeRunner { output: Ok(sdp_runner::ProcessOutput::new(vec![], b"compile error".to_vec(), Some(1), false)) };
        let cancel = CancellationToken::new();

        let err = run(&AgentLaunch::new("whatever-agent-cli"), &request, &runner, &cancel).unwrap_err();
        assert!(matches!(err, SdpError::AgentFailed { .. }));
    }

    #[test]
    fn pre_cancelled_token_short_circuits_before_capture() {
        let dir = tempfile::tempdir().unwrap();
        let worktree = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let packet = packet();
        let request = AgentRunRequest { context: context(worktree), packet: &packet };
        let runner = FakeRunner { output: Ok(sdp_runner::ProcessOutput::new(vec![], vec![], Some(0), false)) };
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = run(&AgentLaunch::new("whatever-agent-cli"), &request, &runner, &cancel).unwrap_err();
        assert!(matches!(err, SdpError::Cancelled));
    }
}
