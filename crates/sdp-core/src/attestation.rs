//! Builds the `attestation` evidence event written at build/review/done
//! phase boundaries (spec.md §3, §4.7): a signed-shaped summary over every
//! event appended since the previous attestation for this feature.

use camino::Utf8Path;
use sdp_types::{Actor, Attestation, EventType, EvidenceEvent, FeatureId, Phase};
use sdp_utils::SdpError;

/// Queries the full log, finds the last `attestation` event (if any), and
/// summarizes everything after it. A feature with no prior attestation is
/// summarized from its first event.
pub fn build(log_path: &Utf8Path, feature_id: &FeatureId, phase: Phase, summary: String) -> Result<EvidenceEvent, SdpError> {
    let all = sdp_evidence::query(log_path, &sdp_evidence::EventFilter::default())?;
    let start = all.iter().rposition(|e| e.event_type == EventType::Attestation).map_or(0, |i| i + 1);
    let range = &all[start..];

    let from_event_id = range.first().map(|e| e.event_id.clone()).unwrap_or_default();
    let to_event_id = range.last().map(|e| e.event_id.clone()).unwrap_or_default();

    let attestation = Attestation {
        feature_id: feature_id.clone(),
        phase,
        from_event_id,
        to_event_id,
        event_count: range.len() as u64,
        summary,
        created_at: chrono::Utc::now(),
    };

    let payload = serde_json::to_value(&attestation)
        .map_err(|e| SdpError::Internal(e.to_string()))?
        .as_object()
        .cloned()
        .map(|m| m.into_iter().collect())
        .unwrap_or_default();

    Ok(EvidenceEvent {
        event_id: String::new(),
        prev_hash: String::new(),
        event_type: EventType::Attestation,
        feature_id: feature_id.clone(),
        workstream_id: None,
        phase,
        actor: Actor::Tool { name: "sdp-core".into() },
        timestamp: attestation.created_at,
        payload,
        hash: String::new(),
    })
}
