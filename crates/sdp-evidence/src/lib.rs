//! Evidence Log (spec.md §4.7): an append-only, hash-chained `events.jsonl`.

mod hash;
mod ulid;

use std::io::{BufRead, Write};
use std::time::Duration;

use camino::Utf8Path;
use sdp_types::{EventType, EvidenceEvent, WorkstreamId};
use sdp_utils::SdpError;

/// Appends `event`, filling in `event_id` (if blank), `prev_hash`, and
/// `hash`. Acquires the feature's evidence-log lock for the duration.
pub fn append(
    log_path: &Utf8Path,
    lock_path: &Utf8Path,
    feature_id_str: &str,
    mut event: EvidenceEvent,
    lock_timeout: Duration,
) -> Result<EvidenceEvent, SdpError> {
    if event.event_id.trim().is_empty() {
        event.event_id = ulid::generate(event.timestamp);
    }

    let _guard = sdp_lock::acquire(lock_path, feature_id_str, lock_timeout)?;

    event.prev_hash = tail_hash(log_path)?;
    event.hash = String::new();
    event.hash = hash::compute(&event)?;

    let line = serde_json::to_string(&event).map_err(|e| SdpError::InvalidEvent { reason: e.to_string() })?;
    append_line(log_path, &line)?;
    Ok(event)
}

fn append_line(log_path: &Utf8Path, line: &str) -> Result<(), SdpError> {
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent.as_std_path())?;
    }
    let mut file = std::fs::OpenOptions::new().create(true).append(true).open(log_path.as_std_path())?;
    file.write_all(line.as_bytes())?;
    file.write_all(b"\n")?;
    file.sync_all()?;
    Ok(())
}

fn tail_hash(log_path: &Utf8Path) -> Result<String, SdpError> {
    match read_events(log_path)?.last() {
        Some(event) => Ok(event.hash.clone()),
        None => Ok(sdp_types::evidence::GENESIS_HASH.to_string()),
    }
}

fn read_events(log_path: &Utf8Path) -> Result<Vec<EvidenceEvent>, SdpError> {
    if !log_path.exists() {
        return Ok(Vec::new());
    }
    let file = std::fs::File::open(log_path.as_std_path())?;
    let reader = std::io::BufReader::new(file);
    let mut events = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let event: EvidenceEvent = serde_json::from_str(&line).map_err(|e| SdpError::InvalidEvent {
            reason: format!("malformed evidence line: {e}"),
        })?;
        events.push(event);
    }
    Ok(events)
}

/// Walks the whole log recomputing every hash. Non-destructive: a mismatch
/// returns `ChainBroken` without truncating or rewriting anything.
pub fn verify(log_path: &Utf8Path) -> Result<(), SdpError> {
    let events = read_events(log_path)?;
    let mut expected_prev = sdp_types::evidence::GENESIS_HASH.to_string();
    for (index, event) in events.iter().enumerate() {
        if event.prev_hash != expected_prev {
            return Err(SdpError::ChainBroken {
                index: index as u64,
                event_id: event.event_id.clone(),
                reason: format!("prev_hash '{}' does not match chain tail '{expected_prev}'", event.prev_hash),
            });
        }
        let mut recomputed = event.clone();
        recomputed.hash = String::new();
        let actual = hash::compute(&recomputed)?;
        if actual != event.hash {
            return Err(SdpError::ChainBroken {
                index: index as u64,
                event_id: event.event_id.clone(),
                reason: "stored hash does not match recomputed hash".into(),
            });
        }
        expected_prev = event.hash.clone();
    }
    Ok(())
}

/// Restricts a [`query`] to events matching all populated fields.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub event_type: Option<EventType>,
    pub workstream_id: Option<WorkstreamId>,
}

impl EventFilter {
    fn matches(&self, event: &EvidenceEvent) -> bool {
        if let Some(t) = self.event_type {
            if event.event_type != t {
                return false;
            }
        }
        if let Some(ws) = &self.workstream_id {
            if event.workstream_id.as_ref() != Some(ws) {
                return false;
            }
        }
        true
    }
}

/// Events in ingestion order matching `filter`, a finite restartable read —
/// every call re-reads the file from the start rather than holding state.
pub fn query(log_path: &Utf8Path, filter: &EventFilter) -> Result<Vec<EvidenceEvent>, SdpError> {
    Ok(read_events(log_path)?.into_iter().filter(|e| filter.matches(e)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use chrono::Utc;
    use sdp_types::{Actor, FeatureId, Phase};
    use std::collections::BTreeMap;
    use std::str::FromStr;

    fn blank_event(event_type: EventType) -> EvidenceEvent {
        EvidenceEvent {
            event_id: String::new(),
            prev_hash: String::new(),
            event_type,
            feature_id: FeatureId::from_str("F001").unwrap(),
            workstream_id: None,
            phase: Phase::Init,
            actor: Actor::Tool { name: "sdp".into() },
            timestamp: Utc::now(),
            payload: BTreeMap::new(),
            hash: String::new(),
        }
    }

    fn paths(dir: &tempfile::TempDir) -> (Utf8PathBuf, Utf8PathBuf) {
        let log = Utf8PathBuf::from_path_buf(dir.path().join("F001.events.jsonl")).unwrap();
        let lock = Utf8PathBuf::from_path_buf(dir.path().join("F001.events.lock")).unwrap();
        (log, lock)
    }

    #[test]
    fn first_event_chains_to_genesis() {
        let dir = tempfile::tempdir().unwrap();
        let (log, lock) = paths(&dir);
        let e = append(&log, &lock, "F001", blank_event(EventType::Init), Duration::from_secs(1)).unwrap();
        assert_eq!(e.prev_hash, sdp_types::evidence::GENESIS_HASH);
        assert!(!e.hash.is_empty());
        assert_eq!(e.event_id.len(), 26);
    }

    #[test]
    fn chain_links_successive_events_and_verifies() {
        let dir = tempfile::tempdir().unwrap();
        let (log, lock) = paths(&dir);
        let first = append(&log, &lock, "F001", blank_event(EventType::Init), Duration::from_secs(1)).unwrap();
        let second = append(&log, &lock, "F001", blank_event(EventType::PreBuild), Duration::from_secs(1)).unwrap();
        assert_eq!(second.prev_hash, first.hash);
        verify(&log).unwrap();
    }

    #[test]
    fn tampered_line_breaks_verification() {
        let dir = tempfile::tempdir().unwrap();
        let (log, lock) = paths(&dir);
        append(&log, &lock, "F001", blank_event(EventType::Init), Duration::from_secs(1)).unwrap();
        append(&log, &lock, "F001", blank_event(EventType::PreBuild), Duration::from_secs(1)).unwrap();

        let mut events = read_events(&log).unwrap();
        events[0].payload.insert("tampered".into(), serde_json::json!(true));
        let rewritten: String = events.iter().map(|e| serde_json::to_string(e).unwrap() + "\n").collect();
        std::fs::write(log.as_std_path(), rewritten).unwrap();

        let err = verify(&log).unwrap_err();
        assert!(matches!(err, SdpError::ChainBroken { index: 0, .. }));
    }

    #[test]
    fn query_filters_by_event_type() {
        let dir = tempfile::tempdir().unwrap();
        let (log, lock) = paths(&dir);
        append(&log, &lock, "F001", blank_event(EventType::Init), Duration::from_secs(1)).unwrap();
        append(&log, &lock, "F001", blank_event(EventType::PreBuild), Duration::from_secs(1)).unwrap();

        let filter = EventFilter {
            event_type: Some(EventType::PreBuild),
            workstream_id: None,
        };
        let results = query(&log, &filter).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].event_type, EventType::PreBuild);
    }
}
