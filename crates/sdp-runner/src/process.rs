use std::time::Duration;

use sdp_utils::SdpError;

use crate::cancellation::CancellationToken;
use crate::command_spec::CommandSpec;

/// Captured output of a completed (or timed-out) subprocess.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub exit_code: Option<i32>,
    pub timed_out: bool,
}

impl ProcessOutput {
    #[must_use]
    pub fn new(stdout: Vec<u8>, stderr: Vec<u8>, exit_code: Option<i32>, timed_out: bool) -> Self {
        Self {
            stdout,
            stderr,
            exit_code,
            timed_out,
        }
    }

    #[must_use]
    pub fn stdout_string(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    #[must_use]
    pub fn stderr_string(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }

    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == Some(0) && !self.timed_out
    }
}

/// Executes a [`CommandSpec`] with a timeout.
///
/// The interface is synchronous: callers never see an async fn in this
/// trait's signature. Implementations are free to drive `tokio` internally
/// (a shared runtime handle, a timeout race against the child) but must not
/// leak that onto the public API.
///
/// # Security
///
/// Implementations MUST execute `cmd` argv-style only — never by handing a
/// joined string to a shell.
pub trait ProcessRunner {
    fn run(&self, cmd: &CommandSpec, timeout: Duration) -> Result<ProcessOutput, SdpError>;

    /// Like [`Self::run`], but also races `cancel`: if it fires before the
    /// child exits or `timeout` elapses, the child is terminated the same
    /// way a timeout would terminate it and this returns `SdpError::Cancelled`.
    ///
    /// Default implementation ignores `cancel` and delegates to `run` —
    /// correct for test doubles and any runner that never sits in a
    /// long-lived blocking wait.
    fn run_cancellable(
        &self,
        cmd: &CommandSpec,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<ProcessOutput, SdpError> {
        let _ = cancel;
        self.run(cmd, timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_requires_zero_exit_and_no_timeout() {
        assert!(ProcessOutput::new(vec![], vec![], Some(0), false).success());
        assert!(!ProcessOutput::new(vec![], vec![], Some(1), false).success());
        assert!(!ProcessOutput::new(vec![], vec![], Some(0), true).success());
        assert!(!ProcessOutput::new(vec![], vec![], None, false).success());
    }

    #[test]
    fn lossy_strings_never_panic_on_invalid_utf8() {
        let out = ProcessOutput::new(vec![0xff, 0xfe], vec![0xff], Some(0), false);
        assert!(!out.stdout_string().is_empty());
        assert!(!out.stderr_string().is_empty());
    }
}
