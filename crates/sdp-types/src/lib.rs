//! The data model shared by every `sdp` component (spec.md §3).
//!
//! Nothing here performs I/O or enforces policy — it is the set of value
//! types that the rest of the workspace reads, writes, and hashes. On-disk
//! shapes (`Checkpoint`, the `Policy` document `sdp-config` loads from YAML)
//! reject unknown fields at deserialization so a renamed or mistyped key
//! fails loudly at load instead of silently dropping data.

pub mod checkpoint;
pub mod evidence;
pub mod feature;
pub mod phase;
pub mod policy;
pub mod scope;
pub mod workstream;

pub use checkpoint::Checkpoint;
pub use evidence::{Actor, Attestation, EvidenceEvent, EventType};
pub use feature::Feature;
pub use phase::Phase;
pub use policy::{AgentConfig, GateRule, ParallelismConfig, Policy, ReworkConfig, RuleCategory, Severity, WorktreeConfig};
pub use scope::Scope;
pub use workstream::{SizeClass, Workstream, WorkstreamStatus};

pub use sdp_utils::ids::{FeatureId, WorkstreamId};
