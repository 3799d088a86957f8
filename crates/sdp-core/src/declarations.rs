//! Declared-workstream loading (spec.md §6: "first workstream list from
//! declared workstream files").
//!
//! The orchestrator is a short-lived process re-invoked per `advance` step,
//! so it never keeps a feature's full workstream definitions in memory
//! between runs — only the checkpoint's terse `{id, status,
//! activation_count}` lines persist. Every invocation re-reads the
//! declarations from `.sdp/workstreams/<feature>/*.yml` and reconciles
//! live status onto them.

use camino::Utf8Path;
use sdp_types::{Checkpoint, FeatureId, SizeClass, Workstream, WorkstreamId, WorkstreamStatus};
use sdp_utils::SdpError;
use serde::Deserialize;

/// One `.sdp/workstreams/<feature>/*.yml` document. Status and activation
/// count are never declared here — they live only in the checkpoint — so
/// this shape is deliberately narrower than [`Workstream`].
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct WorkstreamDecl {
    id: WorkstreamId,
    title: String,
    size_class: SizeClass,
    #[serde(default)]
    dependencies: Vec<WorkstreamId>,
    #[serde(default)]
    declared_scope: Vec<String>,
    #[serde(default)]
    acceptance_criteria: Vec<String>,
    declared_index: u32,
}

impl WorkstreamDecl {
    fn into_workstream(self) -> Workstream {
        Workstream {
            id: self.id,
            title: self.title,
            size_class: self.size_class,
            dependencies: self.dependencies,
            declared_scope: self.declared_scope,
            acceptance_criteria: self.acceptance_criteria,
            status: WorkstreamStatus::Pending,
            activation_count: 0,
            declared_index: self.declared_index,
        }
    }
}

/// Reads every `*.yml`/`*.yaml` file under `dir`, sorted by filename for
/// determinism. An empty or absent directory yields an empty list rather
/// than an error — callers that require at least one workstream (`init`)
/// check that themselves.
pub fn load_declared(dir: &Utf8Path) -> Result<Vec<Workstream>, SdpError> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut paths: Vec<_> = std::fs::read_dir(dir.as_std_path())?
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| matches!(p.extension().and_then(|e| e.to_str()), Some("yml" | "yaml")))
        .collect();
    paths.sort();

    let mut workstreams = Vec::with_capacity(paths.len());
    for path in paths {
        let raw = std::fs::read_to_string(&path)?;
        let decl: WorkstreamDecl = serde_yaml::from_str(&raw).map_err(|e| SdpError::InvalidArgument {
            message: format!("malformed workstream declaration at {}: {e}", path.display()),
        })?;
        workstreams.push(decl.into_workstream());
    }
    Ok(workstreams)
}

/// Overlays the checkpoint's live `{status, activation_count}` onto the
/// freshly re-read declarations. A declared id absent from the checkpoint
/// (the common case: a brand-new feature before its first save) keeps its
/// `Pending`/`0` defaults.
pub fn reconcile(mut declared: Vec<Workstream>, checkpoint: &Checkpoint) -> Vec<Workstream> {
    for ws in &mut declared {
        if let Some(line) = checkpoint.workstreams.iter().find(|l| l.id == ws.id) {
            ws.status = line.status;
            ws.activation_count = line.activation_count;
        }
    }
    declared
}

/// Convenience composing [`load_declared`] + [`reconcile`] against the
/// fixed `.sdp/workstreams/<feature>` layout.
pub fn load_and_reconcile(
    project_root: &Utf8Path,
    feature_id: &FeatureId,
    checkpoint: &Checkpoint,
) -> Result<Vec<Workstream>, SdpError> {
    let dir = sdp_utils::paths::workstreams_decl_dir(project_root, feature_id);
    let declared = load_declared(&dir)?;
    Ok(reconcile(declared, checkpoint))
}
