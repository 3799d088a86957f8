use std::time::Duration;

use camino::Utf8Path;
use sdp_runner::{CommandSpec, ProcessRunner};
use sdp_utils::SdpError;

const GIT_TIMEOUT: Duration = Duration::from_secs(30);

/// Git plumbing, narrowed to exactly the porcelain this crate needs.
///
/// Git itself is out of scope (spec.md §1); this trait is the seam, so the
/// manager never shells out directly and a test double never needs a real
/// repository.
pub trait GitPorcelain {
    /// `git -C repo_root worktree add -B branch path base`.
    fn add(&self, repo_root: &Utf8Path, path: &Utf8Path, branch: &str, base: &str) -> Result<(), SdpError>;

    /// `git -C repo_root worktree remove --force path`.
    fn remove(&self, repo_root: &Utf8Path, path: &Utf8Path) -> Result<(), SdpError>;

    /// `None` if `path` is not a git worktree at all; `Some(branch)` otherwise.
    fn current_branch(&self, path: &Utf8Path) -> Result<Option<String>, SdpError>;

    /// `git -C repo_root worktree prune`, dropping administrative entries for
    /// worktrees whose directories are already gone.
    fn prune_stale(&self, repo_root: &Utf8Path) -> Result<(), SdpError>;
}

/// The real implementation, shelling out to `git` argv-style via a
/// [`ProcessRunner`] — never a shell string.
pub struct ProcessGitPorcelain<R> {
    runner: R,
}

impl<R: ProcessRunner> ProcessGitPorcelain<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    fn run(&self, repo_root: &Utf8Path, args: &[&str]) -> Result<sdp_runner::ProcessOutput, SdpError> {
        let cmd = CommandSpec::new("git").arg("-C").arg(repo_root.as_str()).args(args.iter().copied());
        self.runner.run(&cmd, GIT_TIMEOUT)
    }
}

impl<R: ProcessRunner> GitPorcelain for ProcessGitPorcelain<R> {
    fn add(&self, repo_root: &Utf8Path, path: &Utf8Path, branch: &str, base: &str) -> Result<(), SdpError> {
        let out = self.run(repo_root, &["worktree", "add", "-B", branch, path.as_str(), base])?;
        if out.success() {
            Ok(())
        } else {
            Err(SdpError::Internal(format!(
                "git worktree add failed for {path}: {}",
                out.stderr_string().trim()
            )))
        }
    }

    fn remove(&self, repo_root: &Utf8Path, path: &Utf8Path) -> Result<(), SdpError> {
        let out = self.run(repo_root, &["worktree", "remove", "--force", path.as_str()])?;
        if out.success() {
            Ok(())
        } else {
            Err(SdpError::Internal(format!(
                "git worktree remove failed for {path}: {}",
                out.stderr_string().trim()
            )))
        }
    }

    fn current_branch(&self, path: &Utf8Path) -> Result<Option<String>, SdpError> {
        if !path.join(".git").exists() {
            return Ok(None);
        }
        let cmd = CommandSpec::new("git").args(["-C", path.as_str(), "symbolic-ref", "--short", "HEAD"]);
        let out = self.runner.run(&cmd, GIT_TIMEOUT)?;
        if out.success() {
            Ok(Some(out.stdout_string().trim().to_string()))
        } else {
            Ok(None)
        }
    }

    fn prune_stale(&self, repo_root: &Utf8Path) -> Result<(), SdpError> {
        let out = self.run(repo_root, &["worktree", "prune"])?;
        if out.success() {
            Ok(())
        } else {
            Err(SdpError::Internal(format!(
                "git worktree prune failed: {}",
                out.stderr_string().trim()
            )))
        }
    }
}
