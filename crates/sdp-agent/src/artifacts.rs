//! Artifact capture after an agent subprocess exits (spec.md §4.9): the
//! modified file list, a test-results digest, and a completion marker.
//!
//! The agent writes its side of the contract into a fixed scratch directory
//! under the worktree root — untracked by git, never committed — so no new
//! environment variable is needed beyond the six `SDP_*` ones already fixed
//! by spec.md §6: the agent already knows `SDP_WORKTREE_PATH`.

use camino::{Utf8Path, Utf8PathBuf};
use sdp_runner::{CommandSpec, ProcessRunner};
use sdp_utils::SdpError;
use sha2::{Digest, Sha256};
use std::time::Duration;

/// Scratch directory, relative to a worktree root, the agent may write
/// completion artifacts into.
pub const ARTIFACTS_SUBDIR: &str = ".sdp-agent";
/// Presence of this file under [`ARTIFACTS_SUBDIR`] marks the run complete.
pub const COMPLETION_MARKER_FILENAME: &str = "DONE";
/// If present under [`ARTIFACTS_SUBDIR`], its digest becomes
/// `test_results_digest` on the `generation` evidence event.
pub const TEST_RESULTS_FILENAME: &str = "test-results.json";

const GIT_STATUS_TIMEOUT: Duration = Duration::from_secs(30);

#[must_use]
pub fn artifacts_dir(worktree: &Utf8Path) -> Utf8PathBuf {
    worktree.join(ARTIFACTS_SUBDIR)
}

/// Artifacts collected from a completed agent run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedArtifacts {
    pub modified_files: Vec<Utf8PathBuf>,
    pub test_results_digest: Option<String>,
    pub completion_marker: bool,
}

pub fn capture(runner: &dyn ProcessRunner, worktree: &Utf8Path) -> Result<CapturedArtifacts, SdpError> {
    let modified_files = modified_files(runner, worktree)?;
    let dir = artifacts_dir(worktree);
    let completion_marker = dir.join(COMPLETION_MARKER_FILENAME).exists();
    let test_results_digest = digest_if_present(&dir.join(TEST_RESULTS_FILENAME))?;

    Ok(CapturedArtifacts { modified_files, test_results_digest, completion_marker })
}

fn digest_if_present(path: &Utf8Path) -> Result<Option<String>, SdpError> {
    if !path.exists() {
        return Ok(None);
    }
    let bytes = std::fs::read(path.as_std_path())?;
    Ok(Some(hex::encode(Sha256::digest(&bytes))))
}

/// `git status --porcelain=v1 -z --no-renames`, parsed into the paths of
/// every tracked-or-untracked file that differs from the worktree's HEAD.
fn modified_files(runner: &dyn ProcessRunner, worktree: &Utf8Path) -> Result<Vec<Utf8PathBuf>, SdpError> {
    let cmd = CommandSpec::new("git").args([
        "-C",
        worktree.as_str(),
        "status",
        "--porcelain=v1",
        "--no-renames",
        "-z",
    ]);
    let out = runner.run(&cmd, GIT_STATUS_TIMEOUT)?;
    if !out.success() {
        return Err(SdpError::Internal(format!(
            "git status failed in {worktree}: {}",
            out.stderr_string().trim()
        )));
    }

    let stdout = out.stdout_string();
    let mut files: Vec<Utf8PathBuf> = stdout
        .split('\0')
        .filter_map(|record| {
            let path = record.get(3..)?;
            if path.is_empty() {
                None
            } else {
                Some(worktree.join(path))
            }
        })
        .collect();
    files.sort();
    files.dedup();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeRunner {
        status_stdout: String,
    }

    impl ProcessRunner for FakeRunner {
        fn run(&self, _cmd: &CommandSpec, _timeout: Duration) -> Result<sdp_runner::ProcessOutput, SdpError> {
            Ok(sdp_runner::ProcessOutput::new(self.status_stdout.clone().into_bytes(), vec![], Some(0), false))
        }
    }

    struct FailingRunner;
    impl ProcessRunner for FailingRunner {
        fn run(&self, _cmd: &CommandSpec, _timeout: Duration) -> Result<sdp_runner::ProcessOutput, SdpError> {
            Ok(sdp_runner::ProcessOutput::new(vec![], b"fatal: not a git repository".to_vec(), Some(128), false))
        }
    }

    #[test]
    fn parses_porcelain_status_into_worktree_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let worktree = Utf8Path::from_path(dir.path()).unwrap();
        let stdout = " M src/lib.rs\0?? new_file.rs\0".to_string();
        let runner = FakeRunner { status_stdout: stdout };
        let files = modified_files(&runner, worktree).unwrap();
        assert_eq!(files, vec![worktree.join("src/lib.rs"), worktree.join("new_file.rs")]);
    }

    #[test]
    fn git_status_failure_is_internal_error() {
        let dir = tempfile::tempdir().unwrap();
        let worktree = Utf8Path::from_path(dir.path()).unwrap();
        let err = modified_files(&FailingRunner, worktree).unwrap_err();
        assert!(matches!(err, SdpError::Internal(_)));
    }

    #[test]
    fn capture_reports_absent_artifacts_when_nothing_written() {
        let dir = tempfile::tempdir().unwrap();
        let worktree = Utf8Path::from_path(dir.path()).unwrap();
        let runner = FakeRunner { status_stdout: String::new() };
        let artifacts = capture(&runner, worktree).unwrap();
        assert!(artifacts.modified_files.is_empty());
        assert!(!artifacts.completion_marker);
        assert!(artifacts.test_results_digest.is_none());
    }

    #[test]
    fn capture_picks_up_completion_marker_and_test_digest() {
        let dir = tempfile::tempdir().unwrap();
        let worktree = Utf8Path::from_path(dir.path()).unwrap();
        let scratch = artifacts_dir(worktree);
        std::fs::create_dir_all(scratch.as_std_path()).unwrap();
        std::fs::write(scratch.join(COMPLETION_MARKER_FILENAME).as_std_path(), b"").unwrap();
        std::fs::write(scratch.join(TEST_RESULTS_FILENAME).as_std_path(), b"{\"passed\":12}").unwrap();

        let runner = FakeRunner { status_stdout: String::new() };
        let artifacts = capture(&runner, worktree).unwrap();
        assert!(artifacts.completion_marker);
        assert_eq!(
            artifacts.test_results_digest.unwrap(),
            hex::encode(Sha256::digest(b"{\"passed\":12}"))
        );
    }
}
