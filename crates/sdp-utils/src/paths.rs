//! On-disk layout conventions under the project's `.sdp/` directory
//! (spec.md §6).
//!
//! Every other crate that touches the filesystem goes through these
//! functions rather than hand-joining path segments, so the layout only
//! needs to change in one place.

use camino::{Utf8Path, Utf8PathBuf};

use crate::ids::FeatureId;

/// Root of sdp's on-disk state, rooted at a project checkout.
#[must_use]
pub fn sdp_home(project_root: &Utf8Path) -> Utf8PathBuf {
    project_root.join(".sdp")
}

#[must_use]
pub fn checkpoints_dir(project_root: &Utf8Path) -> Utf8PathBuf {
    sdp_home(project_root).join("checkpoints")
}

#[must_use]
pub fn checkpoint_path(project_root: &Utf8Path, feature_id: &FeatureId) -> Utf8PathBuf {
    checkpoints_dir(project_root).join(format!("{feature_id}.json"))
}

#[must_use]
pub fn checkpoint_lock_path(project_root: &Utf8Path, feature_id: &FeatureId) -> Utf8PathBuf {
    checkpoints_dir(project_root).join(format!("{feature_id}.lock"))
}

#[must_use]
pub fn log_dir(project_root: &Utf8Path) -> Utf8PathBuf {
    sdp_home(project_root).join("log")
}

#[must_use]
pub fn evidence_log_path(project_root: &Utf8Path, feature_id: &FeatureId) -> Utf8PathBuf {
    log_dir(project_root).join(format!("{feature_id}.events.jsonl"))
}

#[must_use]
pub fn evidence_log_lock_path(project_root: &Utf8Path, feature_id: &FeatureId) -> Utf8PathBuf {
    log_dir(project_root).join(format!("{feature_id}.events.lock"))
}

#[must_use]
pub fn policy_path(project_root: &Utf8Path) -> Utf8PathBuf {
    sdp_home(project_root).join("policy.yml")
}

#[must_use]
pub fn config_path(project_root: &Utf8Path) -> Utf8PathBuf {
    sdp_home(project_root).join("config.toml")
}

/// Directory of declared-workstream documents for one feature, read fresh
/// on every invocation (`init --feature` populates it; `advance` re-reads
/// it since the orchestrator itself holds no long-lived state between
/// runs).
#[must_use]
pub fn workstreams_decl_dir(project_root: &Utf8Path, feature_id: &FeatureId) -> Utf8PathBuf {
    sdp_home(project_root).join("workstreams").join(feature_id.to_string())
}

#[must_use]
pub fn hooks_dir(project_root: &Utf8Path) -> Utf8PathBuf {
    sdp_home(project_root).join("hooks")
}

/// Directory holding scripts for one hook boundary, e.g.
/// `hooks_boundary_dir(root, "pre", "build")` -> `.sdp/hooks/pre_build/`.
#[must_use]
pub fn hooks_boundary_dir(project_root: &Utf8Path, stage: &str, boundary: &str) -> Utf8PathBuf {
    hooks_dir(project_root).join(format!("{stage}_{boundary}"))
}

/// Sibling directory a feature's worktrees are created under, kept outside
/// the main checkout so `git worktree` never nests inside itself.
#[must_use]
pub fn worktrees_root(project_root: &Utf8Path) -> Utf8PathBuf {
    sdp_home(project_root).join("worktrees")
}

#[must_use]
pub fn worktree_path(project_root: &Utf8Path, workstream_id_slug: &str) -> Utf8PathBuf {
    worktrees_root(project_root).join(workstream_id_slug)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn checkpoint_path_is_scoped_under_sdp_home() {
        let root = Utf8PathBuf::from("/repo");
        let fid = FeatureId::from_str("F001").unwrap();
        assert_eq!(checkpoint_path(&root, &fid), Utf8PathBuf::from("/repo/.sdp/checkpoints/F001.json"));
        assert_eq!(checkpoint_lock_path(&root, &fid), Utf8PathBuf::from("/repo/.sdp/checkpoints/F001.lock"));
    }

    #[test]
    fn hooks_boundary_dir_joins_stage_and_boundary() {
        let root = Utf8PathBuf::from("/repo");
        assert_eq!(
            hooks_boundary_dir(&root, "pre", "build"),
            Utf8PathBuf::from("/repo/.sdp/hooks/pre_build")
        );
    }

    #[test]
    fn workstreams_decl_dir_is_scoped_per_feature() {
        let root = Utf8PathBuf::from("/repo");
        let fid = FeatureId::from_str("F001").unwrap();
        assert_eq!(workstreams_decl_dir(&root, &fid), Utf8PathBuf::from("/repo/.sdp/workstreams/F001"));
    }

    #[test]
    fn evidence_log_path_is_per_feature() {
        let root = Utf8PathBuf::from("/repo");
        let fid = FeatureId::from_str("F007").unwrap();
        assert_eq!(
            evidence_log_path(&root, &fid),
            Utf8PathBuf::from("/repo/.sdp/log/F007.events.jsonl")
        );
    }
}
