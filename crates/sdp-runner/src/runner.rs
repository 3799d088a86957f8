use std::process::Stdio;
use std::time::Duration;

use sdp_utils::SdpError;
use tokio::io::AsyncReadExt;
use tokio::process::Child;

use crate::cancellation::CancellationToken;
use crate::command_spec::CommandSpec;
use crate::process::{ProcessOutput, ProcessRunner};

/// Grace period between SIGTERM and SIGKILL when a command's timeout elapses.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(10);

/// A [`ProcessRunner`] backed by `tokio::process`, used wherever a timeout
/// must race a child process: hooks, the agent CLI, custom gate rules.
///
/// Exposes a synchronous `run` by blocking on a borrowed runtime handle —
/// `tokio` stays an implementation detail of this one crate.
pub struct TokioProcessRunner {
    handle: tokio::runtime::Handle,
    grace_period: Duration,
}

impl TokioProcessRunner {
    #[must_use]
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self {
            handle,
            grace_period: DEFAULT_GRACE_PERIOD,
        }
    }

    #[must_use]
    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }
}

impl ProcessRunner for TokioProcessRunner {
    fn run(&self, cmd: &CommandSpec, timeout: Duration) -> Result<ProcessOutput, SdpError> {
        self.handle.clone().block_on(run_with_timeout(cmd, timeout, self.grace_period))
    }

    fn run_cancellable(
        &self,
        cmd: &CommandSpec,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<ProcessOutput, SdpError> {
        self.handle
            .clone()
            .block_on(run_with_timeout_and_cancel(cmd, timeout, self.grace_period, cancel))
    }
}

async fn run_with_timeout_and_cancel(
    cmd: &CommandSpec,
    timeout: Duration,
    grace_period: Duration,
    cancel: &CancellationToken,
) -> Result<ProcessOutput, SdpError> {
    if cancel.is_cancelled() {
        return Err(SdpError::Cancelled);
    }

    let mut child = cmd
        .to_tokio_command()
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| SdpError::ProcessSpawnFailed {
            program: cmd.program_string(),
            reason: e.to_string(),
        })?;

    let mut stdout = child.stdout.take().expect("stdout piped at spawn");
    let mut stderr = child.stderr.take().expect("stderr piped at spawn");
    let out_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        stdout.read_to_end(&mut buf).await.map(|_| buf)
    });
    let err_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        stderr.read_to_end(&mut buf).await.map(|_| buf)
    });

    enum Outcome {
        Exited(std::io::Result<std::process::ExitStatus>),
        TimedOut,
        Cancelled,
    }

    let outcome = tokio::select! {
        status = child.wait() => Outcome::Exited(status),
        () = tokio::time::sleep(timeout) => Outcome::TimedOut,
        () = cancel.cancelled() => Outcome::Cancelled,
    };

    match outcome {
        Outcome::Exited(status) => {
            let status = status.map_err(SdpError::Io)?;
            let out_buf = join_io(out_task).await?;
            let err_buf = join_io(err_task).await?;
            Ok(ProcessOutput::new(out_buf, err_buf, status.code(), false))
        }
        Outcome::TimedOut => {
            terminate_gracefully(&mut child, grace_period).await;
            out_task.abort();
            err_task.abort();
            Err(SdpError::ProcessTimeout {
                program: cmd.program_string(),
                timeout_secs: timeout.as_secs(),
            })
        }
        Outcome::Cancelled => {
            terminate_gracefully(&mut child, grace_period).await;
            out_task.abort();
            err_task.abort();
            Err(SdpError::Cancelled)
        }
    }
}

async fn run_with_timeout(cmd: &CommandSpec, timeout: Duration, grace_period: Duration) -> Result<ProcessOutput, SdpError> {
    let mut child = cmd
        .to_tokio_command()
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| SdpError::ProcessSpawnFailed {
            program: cmd.program_string(),
            reason: e.to_string(),
        })?;

    let mut stdout = child.stdout.take().expect("stdout piped at spawn");
    let mut stderr = child.stderr.take().expect("stderr piped at spawn");
    let out_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        stdout.read_to_end(&mut buf).await.map(|_| buf)
    });
    let err_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        stderr.read_to_end(&mut buf).await.map(|_| buf)
    });

    let wait_result = tokio::select! {
        status = child.wait() => Some(status),
        () = tokio::time::sleep(timeout) => None,
    };

    match wait_result {
        Some(status) => {
            let status = status.map_err(SdpError::Io)?;
            let out_buf = join_io(out_task).await?;
            let err_buf = join_io(err_task).await?;
            Ok(ProcessOutput::new(out_buf, err_buf, status.code(), false))
        }
        None => {
            terminate_gracefully(&mut child, grace_period).await;
            out_task.abort();
            err_task.abort();
            Err(SdpError::ProcessTimeout {
                program: cmd.program_string(),
                timeout_secs: timeout.as_secs(),
            })
        }
    }
}

async fn join_io(task: tokio::task::JoinHandle<std::io::Result<Vec<u8>>>) -> Result<Vec<u8>, SdpError> {
    task.await
        .map_err(|e| SdpError::Internal(format!("pipe reader task panicked: {e}")))?
        .map_err(SdpError::Io)
}

/// Send SIGTERM (unix) and wait up to `grace_period` for exit; SIGKILL after.
/// Non-unix targets have no graceful-signal equivalent exposed by `std`, so
/// they go straight to `start_kill`.
async fn terminate_gracefully(child: &mut Child, grace_period: Duration) {
    #[cfg(unix)]
    {
        if let Some(pid) = child.id() {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;
            let _ = kill(Pid::from_raw(pid as i32), Signal::SIGTERM);
        }
        if tokio::time::timeout(grace_period, child.wait()).await.is_ok() {
            return;
        }
    }
    let _ = child.start_kill();
    let _ = child.wait().await;
}
