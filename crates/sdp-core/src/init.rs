//! `init --feature <F###>` (spec.md §6): creates a feature's checkpoint
//! from its declared workstream files. Exit-code mapping (2 for invalid
//! id, 3 for already-initialized) is the binary crate's job; this module
//! only distinguishes the error cases via `SdpError` variants.

use std::time::Duration;

use camino::Utf8Path;
use sdp_types::{Checkpoint, FeatureId};
use sdp_utils::SdpError;

/// Initializes `feature_id`. Fails with `InvalidArgument` if no workstream
/// is declared, `CyclicDependencies` if the declared set isn't a DAG, and
/// `ConcurrentModification` (mapped by the binary to exit 3, "already
/// initialized") if a checkpoint already exists.
pub fn init(
    project_root: &Utf8Path,
    feature_id: &FeatureId,
    lock_timeout: Duration,
) -> Result<Checkpoint, SdpError> {
    let lock_path = sdp_utils::paths::checkpoint_lock_path(project_root, feature_id);
    let _guard = sdp_checkpoint::lock(&lock_path, feature_id, lock_timeout)?;

    let checkpoint_path = sdp_utils::paths::checkpoint_path(project_root, feature_id);
    if checkpoint_path.exists() {
        return Err(SdpError::ConcurrentModification {
            resource: checkpoint_path.to_string(),
        });
    }

    let decl_dir = sdp_utils::paths::workstreams_decl_dir(project_root, feature_id);
    let declared = crate::declarations::load_declared(&decl_dir)?;
    if declared.is_empty() {
        return Err(SdpError::InvalidArgument {
            message: format!("no declared workstreams found for feature {feature_id} under {decl_dir}"),
        });
    }
    sdp_scheduler::validate_dag(&declared)?;

    let now = chrono::Utc::now();
    let status_lines = declared
        .iter()
        .map(|w| sdp_types::checkpoint::WorkstreamStatusLine {
            id: w.id.clone(),
            status: w.status,
            activation_count: w.activation_count,
        })
        .collect();
    let checkpoint = Checkpoint::new_init(feature_id.clone(), status_lines, now);
    sdp_checkpoint::save(&checkpoint_path, &checkpoint)?;

    let log_path = sdp_utils::paths::evidence_log_path(project_root, feature_id);
    let evidence_lock_path = sdp_utils::paths::evidence_log_lock_path(project_root, feature_id);
    let event = sdp_types::EvidenceEvent {
        event_id: String::new(),
        prev_hash: String::new(),
        event_type: sdp_types::EventType::Init,
        feature_id: feature_id.clone(),
        workstream_id: None,
        phase: sdp_types::Phase::Init,
        actor: sdp_types::Actor::Tool { name: "sdp-core".into() },
        timestamp: now,
        payload: std::collections::BTreeMap::new(),
        hash: String::new(),
    };
    sdp_evidence::append(&log_path, &evidence_lock_path, feature_id.as_str(), event, lock_timeout)?;

    Ok(checkpoint)
}
