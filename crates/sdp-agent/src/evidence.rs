//! Builds the `generation` evidence event payload from a completed run
//! (spec.md §4.9): model id, prompt hash, and file list — never the prompt
//! text itself. Appending it to the log (filling `event_id`/`prev_hash`/
//! `hash` and taking the lock) is `sdp-evidence::append`'s job, not this
//! crate's.

use std::collections::BTreeMap;

use chrono::Utc;
use sdp_types::{Actor, EventType, EvidenceEvent};

use crate::context::RunContext;
use crate::driver::AgentOutcome;

#[must_use]
pub fn generation_event(context: &RunContext, packet_hash: &str, outcome: &AgentOutcome) -> EvidenceEvent {
    let mut payload = BTreeMap::new();
    payload.insert("prompt_hash".to_string(), serde_json::json!(packet_hash));
    payload.insert(
        "modified_files".to_string(),
        serde_json::json!(outcome.artifacts.modified_files.iter().map(ToString::to_string).collect::<Vec<_>>()),
    );
    payload.insert("completion_marker".to_string(), serde_json::json!(outcome.artifacts.completion_marker));
    if let Some(digest) = &outcome.artifacts.test_results_digest {
        payload.insert("test_results_digest".to_string(), serde_json::json!(digest));
    }
    payload.insert("exit_code".to_string(), serde_json::json!(outcome.exit_code));

    EvidenceEvent {
        event_id: String::new(),
        prev_hash: String::new(),
        event_type: EventType::Generation,
        feature_id: context.feature_id.clone(),
        workstream_id: Some(context.workstream_id.clone()),
        phase: context.phase,
        actor: Actor::Model { id: context.model_id.clone() },
        timestamp: Utc::now(),
        payload,
        hash: String::new(),
    }
}

/// The `cancelled` event appended when SIGINT/SIGTERM interrupts a run
/// already in flight (spec.md §4.9).
#[must_use]
pub fn cancelled_event(context: &RunContext) -> EvidenceEvent {
    EvidenceEvent {
        event_id: String::new(),
        prev_hash: String::new(),
        event_type: EventType::Cancelled,
        feature_id: context.feature_id.clone(),
        workstream_id: Some(context.workstream_id.clone()),
        phase: context.phase,
        actor: Actor::Tool { name: "sdp-agent".into() },
        timestamp: Utc::now(),
        payload: BTreeMap::new(),
        hash: String::new(),
    }
}
