//! Checkpoint Store: atomic, single-feature persistence (spec.md §4.2).

use std::time::Duration;

use camino::Utf8Path;
use sdp_lock::FileLockGuard;
use sdp_types::{Checkpoint, FeatureId};
use sdp_utils::{atomic_write, SdpError};

/// `load(feature_id)` — returns `NotFound` if no checkpoint exists yet.
/// `project_root` is the resolved `--project-root`; the exact path follows
/// `sdp_utils::paths::checkpoint_path`.
pub fn load(project_root: &Utf8Path, feature_id: &FeatureId) -> Result<Checkpoint, SdpError> {
    load_at(&sdp_utils::paths::checkpoint_path(project_root, feature_id))
}

/// Load from an exact path (used when the caller already resolved a
/// non-default `--checkpoints` directory, rather than re-deriving it here).
pub fn load_at(path: &Utf8Path) -> Result<Checkpoint, SdpError> {
    let bytes = std::fs::read(path.as_std_path()).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            SdpError::NotFound {
                what: "checkpoint".into(),
                id: path.to_string(),
            }
        } else {
            SdpError::Io(e)
        }
    })?;
    serde_json::from_slice(&bytes).map_err(|e| SdpError::InvalidEvent {
        reason: format!("malformed checkpoint at {path}: {e}"),
    })
}

/// `save(checkpoint)` — fails with `ConcurrentModification` if the on-disk
/// copy's `updated_at` is newer than `checkpoint`'s, forcing a reload.
///
/// Equality pre-check: if the on-disk copy is byte-identical to what would
/// be written, nothing is written (spec.md §8 no-op idempotence law).
pub fn save(path: &Utf8Path, checkpoint: &Checkpoint) -> Result<(), SdpError> {
    if let Ok(on_disk) = load_at(path) {
        if on_disk.updated_at > checkpoint.updated_at {
            return Err(SdpError::ConcurrentModification {
                resource: checkpoint.feature_id.to_string(),
            });
        }
        if &on_disk == checkpoint {
            return Ok(());
        }
    }

    let mut canonical = checkpoint.clone();
    canonical.canonicalize();
    let json = serde_json::to_vec_pretty(&canonical).map_err(|e| SdpError::Internal(e.to_string()))?;
    atomic_write::write_atomic(path, &json)?;
    Ok(())
}

/// Acquire the feature's advisory lock, blocking up to `timeout`.
pub fn lock(lock_path: &Utf8Path, feature_id: &FeatureId, timeout: Duration) -> Result<FileLockGuard, SdpError> {
    sdp_lock::acquire(lock_path, feature_id.as_str(), timeout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use chrono::{Duration as ChronoDuration, Utc};
    use std::str::FromStr;

    fn sample(feature: &str, updated_at: chrono::DateTime<Utc>) -> Checkpoint {
        Checkpoint::new_init(FeatureId::from_str(feature).unwrap(), vec![], updated_at)
    }

    #[test]
    fn load_missing_checkpoint_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("F001.json")).unwrap();
        let err = load_at(&path).unwrap_err();
        assert!(matches!(err, SdpError::NotFound { .. }));
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("F001.json")).unwrap();
        let cp = sample("F001", Utc::now());
        save(&path, &cp).unwrap();
        let loaded = load_at(&path).unwrap();
        assert_eq!(loaded.feature_id, cp.feature_id);
    }

    #[test]
    fn save_rejects_stale_write_with_concurrent_modification() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("F001.json")).unwrap();
        let now = Utc::now();
        let newer = sample("F001", now);
        save(&path, &newer).unwrap();

        let stale = sample("F001", now - ChronoDuration::seconds(60));
        let err = save(&path, &stale).unwrap_err();
        assert!(matches!(err, SdpError::ConcurrentModification { .. }));
    }

    #[test]
    fn save_is_a_noop_when_nothing_changed() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("F001.json")).unwrap();
        let cp = sample("F001", Utc::now());
        save(&path, &cp).unwrap();
        let before = std::fs::metadata(path.as_std_path()).unwrap().modified().unwrap();
        std::thread::sleep(std::time::Duration::from_millis(10));
        save(&path, &cp).unwrap();
        let after = std::fs::metadata(path.as_std_path()).unwrap().modified().unwrap();
        assert_eq!(before, after);
    }
}
