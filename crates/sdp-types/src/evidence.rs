//! Evidence Event and Attestation value types (spec.md §3, §4.7).
//!
//! Hashing and chaining live in `sdp-evidence`; this module only defines
//! the shape that gets canonicalized and hashed.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{FeatureId, Phase, WorkstreamId};

/// The all-zero digest used as `prev_hash` for the first event in a log.
pub const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Init,
    PreBuild,
    PostBuild,
    Generation,
    ScopeViolation,
    ScopeExtend,
    Verification,
    Hook,
    PreReview,
    Approval,
    PrCreated,
    CiPassed,
    CiFailed,
    Cancelled,
    Error,
    Attestation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Actor {
    Tool { name: String },
    Model { id: String },
    Human { name: String },
}

/// An immutable, hash-chained record of a significant action.
///
/// `prev_hash` and `hash` are populated by `sdp-evidence::append`; a freshly
/// constructed event (before appending) carries both as empty strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceEvent {
    pub event_id: String,
    pub prev_hash: String,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub feature_id: FeatureId,
    pub workstream_id: Option<WorkstreamId>,
    pub phase: Phase,
    pub actor: Actor,
    pub timestamp: DateTime<Utc>,
    pub payload: BTreeMap<String, serde_json::Value>,
    pub hash: String,
}

/// A signed-shaped, immutable summary derived from a contiguous range of
/// evidence events, written at build/review/done transitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attestation {
    pub feature_id: FeatureId,
    pub phase: Phase,
    pub from_event_id: String,
    pub to_event_id: String,
    pub event_count: u64,
    pub summary: String,
    pub created_at: DateTime<Utc>,
}
