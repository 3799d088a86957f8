//! Worktree Manager (spec.md §4.4).
//!
//! One git worktree per `(feature, workstream)`, at a path derived purely
//! from the ids so a crash-and-resume orchestrator can always recompute
//! where a workstream's checkout lives without consulting extra state.

mod git;

pub use git::{GitPorcelain, ProcessGitPorcelain};

use camino::{Utf8Path, Utf8PathBuf};
use sdp_types::{FeatureId, WorkstreamId};
use sdp_utils::SdpError;

/// Branch name a workstream's worktree is checked out onto.
#[must_use]
pub fn branch_name(workstream_id: &WorkstreamId) -> String {
    format!("sdp/{workstream_id}")
}

pub struct WorktreeManager<G> {
    project_root: Utf8PathBuf,
    repo_root: Utf8PathBuf,
    porcelain: G,
}

impl<G: GitPorcelain> WorktreeManager<G> {
    pub fn new(project_root: Utf8PathBuf, repo_root: Utf8PathBuf, porcelain: G) -> Self {
        Self {
            project_root,
            repo_root,
            porcelain,
        }
    }

    #[must_use]
    pub fn path_for(&self, workstream_id: &WorkstreamId) -> Utf8PathBuf {
        sdp_utils::paths::worktree_path(&self.project_root, workstream_id.as_str())
    }

    /// Creates a fresh worktree. Fails with `InvalidArgument` if anything
    /// already occupies the deterministic path — callers that want "use it
    /// if it's already there" should call [`Self::reuse_or_create`] instead.
    pub fn create(&self, workstream_id: &WorkstreamId, base_branch: &str) -> Result<Utf8PathBuf, SdpError> {
        let path = self.path_for(workstream_id);
        if path.exists() {
            return Err(SdpError::InvalidArgument {
                message: format!("worktree path {path} already exists; use reuse_or_create"),
            });
        }
        self.porcelain.add(&self.repo_root, &path, &branch_name(workstream_id), base_branch)?;
        tracing::info!(%workstream_id, %path, "worktree created");
        Ok(path)
    }

    /// Reuses an existing valid worktree for `workstream_id`, or creates one.
    ///
    /// An existing directory that is not a valid git worktree checked out
    /// onto the expected branch is a `WorktreeCorrupt` error — it is never
    /// silently repaired; the caller must `prune` first.
    pub fn reuse_or_create(&self, workstream_id: &WorkstreamId, base_branch: &str) -> Result<Utf8PathBuf, SdpError> {
        let path = self.path_for(workstream_id);
        if !path.exists() {
            return self.create(workstream_id, base_branch);
        }
        let expected = branch_name(workstream_id);
        match self.porcelain.current_branch(&path)? {
            Some(branch) if branch == expected => {
                tracing::info!(%workstream_id, %path, "worktree reused");
                Ok(path)
            }
            Some(branch) => Err(SdpError::WorktreeCorrupt {
                path,
                reason: format!("checked out onto '{branch}', expected '{expected}'"),
            }),
            None => Err(SdpError::WorktreeCorrupt {
                path,
                reason: "directory exists but is not a git worktree".into(),
            }),
        }
    }

    /// Hands a worktree back from its owning workstream without deleting it,
    /// so a human can still inspect the checkout. Fails `WorktreeCorrupt` if
    /// the directory no longer looks like the worktree it should be.
    pub fn release(&self, workstream_id: &WorkstreamId) -> Result<(), SdpError> {
        let path = self.path_for(workstream_id);
        let expected = branch_name(workstream_id);
        match self.porcelain.current_branch(&path)? {
            Some(branch) if branch == expected => {
                tracing::info!(%workstream_id, %path, "worktree released");
                Ok(())
            }
            _ => Err(SdpError::WorktreeCorrupt {
                path,
                reason: "not a valid worktree at release time".into(),
            }),
        }
    }

    /// Deletes every worktree belonging to `feature_id`, the only operation
    /// that actually removes worktree directories from disk.
    pub fn prune(&self, feature_id: &FeatureId) -> Result<Vec<Utf8PathBuf>, SdpError> {
        let root = sdp_utils::paths::worktrees_root(&self.project_root);
        let mut removed = Vec::new();
        if !root.exists() {
            return Ok(removed);
        }
        for entry in std::fs::read_dir(root.as_std_path())? {
            let entry = entry?;
            let Ok(path) = Utf8PathBuf::from_path_buf(entry.path()) else {
                continue;
            };
            let Some(name) = path.file_name() else { continue };
            let Ok(ws_id) = name.parse::<WorkstreamId>() else {
                continue;
            };
            let Ok(ws_feature) = ws_id.feature_id() else {
                continue;
            };
            if &ws_feature != feature_id {
                continue;
            }
            if let Err(e) = self.porcelain.remove(&self.repo_root, &path) {
                tracing::warn!(%path, error = %e, "git worktree remove failed, falling back to rmdir");
            }
            if path.exists() {
                std::fs::remove_dir_all(path.as_std_path())?;
            }
            removed.push(path);
        }
        self.porcelain.prune_stale(&self.repo_root)?;
        Ok(removed)
    }
}
