use sdp_types::{Scope, Workstream, WorkstreamId};
use sdp_utils::SdpError;

use crate::budget::BudgetUsage;
use crate::model::{PacketEvidence, Section, SectionEvidence, SectionKind};
use crate::render::render_all;
use crate::Packet;

/// Default maximum bytes allowed in a packet.
pub const DEFAULT_PACKET_MAX_BYTES: usize = 65_536;

/// Default maximum lines allowed in a packet.
pub const DEFAULT_PACKET_MAX_LINES: usize = 1_200;

/// Everything the Agent Driver gathers before assembling a packet for one
/// workstream activation (spec.md §4.9).
pub struct PacketInput<'a> {
    pub workstream: &'a Workstream,
    pub scope: &'a Scope,
    /// One-line summaries from already-completed predecessor workstreams,
    /// oldest first.
    pub predecessor_summaries: &'a [(WorkstreamId, String)],
    /// Artifacts (e.g. failing test output) from prior activations of this
    /// same workstream, oldest first.
    pub failure_artifacts: &'a [String],
}

#[derive(Debug, Clone, Copy)]
pub struct PacketBuilder {
    max_bytes: usize,
    max_lines: usize,
}

impl Default for PacketBuilder {
    fn default() -> Self {
        Self::with_budget(DEFAULT_PACKET_MAX_BYTES, DEFAULT_PACKET_MAX_LINES)
    }
}

impl PacketBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn with_budget(max_bytes: usize, max_lines: usize) -> Self {
        Self { max_bytes, max_lines }
    }

    /// Assembles a packet from `input`. The workstream file, acceptance
    /// criteria, and sealed scope are essential and always included, even if
    /// that alone exceeds budget. Predecessor summaries and failure
    /// artifacts are evictable: once including the next one would exceed the
    /// budget, every remaining evictable section is dropped and
    /// `evidence.truncated` is set.
    pub fn build(&self, input: &PacketInput<'_>) -> Result<Packet, SdpError> {
        let mut budget = BudgetUsage::new(self.max_bytes, self.max_lines);
        let mut sections = Vec::new();
        let mut section_evidence = Vec::new();

        for section in essential_sections(input) {
            budget.add_content(section.byte_len(), section.line_len());
            section_evidence.push(evidence_of(&section));
            sections.push(section);
        }

        let mut truncated = false;
        for section in evictable_sections(input) {
            if budget.would_exceed(section.byte_len(), section.line_len()) {
                tracing::debug!(section = %section.title, "dropping packet section to stay within budget");
                truncated = true;
                continue;
            }
            budget.add_content(section.byte_len(), section.line_len());
            section_evidence.push(evidence_of(&section));
            sections.push(section);
        }

        let content = render_all(&sections);
        let hash = Packet::hash_content(&content);
        let evidence = PacketEvidence {
            workstream_id: input.workstream.id.clone(),
            sections: section_evidence,
            max_bytes: self.max_bytes,
            max_lines: self.max_lines,
            truncated,
        };

        Ok(Packet::new(content, hash, evidence, budget))
    }
}

fn essential_sections(input: &PacketInput<'_>) -> Vec<Section> {
    let ws = input.workstream;
    let workstream_body = format!(
        "id: {}\ntitle: {}\nsize_class: {:?}\nactivation_count: {}\ndependencies: {:?}",
        ws.id, ws.title, ws.size_class, ws.activation_count, ws.dependencies
    );
    let criteria_body = if ws.acceptance_criteria.is_empty() {
        "(none declared)".to_string()
    } else {
        ws.acceptance_criteria.iter().map(|c| format!("- {c}")).collect::<Vec<_>>().join("\n")
    };
    let scope_globs: Vec<&str> = input.scope.effective_globs().collect();
    let scope_body =
        if scope_globs.is_empty() { "(empty)".to_string() } else { scope_globs.join("\n") };

    vec![
        Section::new(SectionKind::Workstream, "workstream", workstream_body),
        Section::new(SectionKind::AcceptanceCriteria, "acceptance_criteria", criteria_body),
        Section::new(SectionKind::SealedScope, "sealed_scope", scope_body),
    ]
}

fn evictable_sections(input: &PacketInput<'_>) -> Vec<Section> {
    let mut sections = Vec::new();
    for (ws_id, summary) in input.predecessor_summaries {
        sections.push(Section::new(
            SectionKind::PredecessorSummary,
            format!("predecessor_summary:{ws_id}"),
            summary.clone(),
        ));
    }
    for (i, artifact) in input.failure_artifacts.iter().enumerate() {
        sections.push(Section::new(
            SectionKind::FailureArtifact,
            format!("failure_artifact:{i}"),
            artifact.clone(),
        ));
    }
    sections
}

fn evidence_of(section: &Section) -> SectionEvidence {
    SectionEvidence {
        kind: section.kind.as_str(),
        title: section.title.clone(),
        bytes: section.byte_len(),
        lines: section.line_len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdp_types::{SizeClass, WorkstreamStatus};
    use std::str::FromStr;

    fn workstream() -> Workstream {
        Workstream {
            id: WorkstreamId::from_str("00-F001-01").unwrap(),
            title: "Implement thing".into(),
            size_class: SizeClass::Small,
            dependencies: vec![],
            declared_scope: vec!["src/**".into()],
            acceptance_criteria: vec!["tests pass".into()],
            status: WorkstreamStatus::Active,
            activation_count: 1,
            declared_index: 0,
        }
    }

    #[test]
    fn essential_sections_are_always_included() {
        let ws = workstream();
        let scope = Scope::sealed(vec!["src/**".into()]);
        let input = PacketInput { workstream: &ws, scope: &scope, predecessor_summaries: &[], failure_artifacts: &[] };
        let packet = PacketBuilder::new().build(&input).unwrap();
        assert!(packet.content.contains("Implement thing"));
        assert!(packet.content.contains("tests pass"));
        assert!(packet.content.contains("src/**"));
        assert!(!packet.evidence.truncated);
    }

    #[test]
    fn oversized_evictable_sections_are_dropped_with_truncated_flag() {
        let ws = workstream();
        let scope = Scope::sealed(vec!["src/**".into()]);
        let huge = "x".repeat(10_000);
        let artifacts = vec![huge];
        let input = PacketInput {
            workstream: &ws,
            scope: &scope,
            predecessor_summaries: &[],
            failure_artifacts: &artifacts,
        };
        let builder = PacketBuilder::with_budget(200, 20);
        let packet = builder.build(&input).unwrap();
        assert!(packet.evidence.truncated);
        assert!(!packet.content.contains('x'));
    }

    #[test]
    fn predecessor_summaries_are_labeled_by_workstream_id() {
        let ws = workstream();
        let scope = Scope::sealed(vec![]);
        let predecessor = WorkstreamId::from_str("00-F001-00").unwrap();
        let summaries = vec![(predecessor.clone(), "set up scaffolding".to_string())];
        let input = PacketInput {
            workstream: &ws,
            scope: &scope,
            predecessor_summaries: &summaries,
            failure_artifacts: &[],
        };
        let packet = PacketBuilder::new().build(&input).unwrap();
        assert!(packet.content.contains(predecessor.as_str()));
        assert!(packet.content.contains("set up scaffolding"));
    }
}
