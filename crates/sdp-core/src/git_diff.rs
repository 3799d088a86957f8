//! [`DiffSource`] backed by a real `git status` call against a worktree,
//! the same `--porcelain=v1 -z --no-renames` parse `sdp-agent` uses for its
//! own artifact capture, applied here to feed the Scope Guard instead.

use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use sdp_runner::{CommandSpec, ProcessRunner};
use sdp_scope::DiffSource;
use sdp_utils::SdpError;

const GIT_STATUS_TIMEOUT: Duration = Duration::from_secs(30);

pub struct GitDiffSource<'a> {
    worktree: Utf8PathBuf,
    runner: &'a dyn ProcessRunner,
}

impl<'a> GitDiffSource<'a> {
    pub fn new(worktree: Utf8PathBuf, runner: &'a dyn ProcessRunner) -> Self {
        Self { worktree, runner }
    }
}

impl DiffSource for GitDiffSource<'_> {
    fn staged_and_unstaged_paths(&self) -> Result<Vec<Utf8PathBuf>, SdpError> {
        let cmd = CommandSpec::new("git").args([
            "-C",
            self.worktree.as_str(),
            "status",
            "--porcelain=v1",
            "--no-renames",
            "-z",
        ]);
        let out = self.runner.run(&cmd, GIT_STATUS_TIMEOUT)?;
        if !out.success() {
            return Err(SdpError::Internal(format!(
                "git status failed in {}: {}",
                self.worktree,
                out.stderr_string().trim()
            )));
        }

        let stdout = out.stdout_string();
        let mut paths: Vec<Utf8PathBuf> = stdout
            .split('\0')
            .filter_map(|record| {
                let rel = record.get(3..)?;
                if rel.is_empty() {
                    None
                } else {
                    Some(Utf8Path::new(rel).to_path_buf())
                }
            })
            .collect();
        paths.sort();
        paths.dedup();
        Ok(paths)
    }
}
