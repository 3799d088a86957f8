//! Context packet model, budget enforcement, and rendering (spec.md §4.9).
//!
//! Assembly of the packet's content (the workstream's fields, its
//! acceptance criteria, its sealed scope, predecessor summaries, and prior
//! failure artifacts) happens in [`builder::PacketBuilder`]; this module
//! only ties the pieces into the `Packet` value the Agent Driver writes into
//! a worktree and hashes into a `generation` evidence event.

mod budget;
mod builder;
mod model;
mod render;

use camino::Utf8Path;
use sdp_utils::SdpError;
use sha2::{Digest, Sha256};

pub use budget::BudgetUsage;
pub use builder::{PacketBuilder, PacketInput, DEFAULT_PACKET_MAX_BYTES, DEFAULT_PACKET_MAX_LINES};
pub use model::{PacketEvidence, Section, SectionEvidence, SectionKind};

/// A fully assembled context packet, ready to be written into a worktree.
#[derive(Debug, Clone)]
pub struct Packet {
    pub content: String,
    pub hash: String,
    pub evidence: PacketEvidence,
    pub budget_used: BudgetUsage,
}

impl Packet {
    #[must_use]
    pub fn new(content: String, hash: String, evidence: PacketEvidence, budget_used: BudgetUsage) -> Self {
        Self { content, hash, evidence, budget_used }
    }

    #[must_use]
    pub fn hash_content(content: &str) -> String {
        hex::encode(Sha256::digest(content.as_bytes()))
    }

    /// Writes `self.content` as a single file at `path`, the shape the
    /// Agent Driver puts in a workstream's worktree.
    pub fn write_to(&self, path: &Utf8Path) -> Result<(), SdpError> {
        sdp_utils::atomic_write::write_atomic(path, self.content.as_bytes())?;
        Ok(())
    }

    #[must_use]
    pub fn is_within_budget(&self) -> bool {
        !self.budget_used.is_exceeded()
    }
}
