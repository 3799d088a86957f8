use sdp_types::WorkstreamId;

/// What a section of the packet represents. The first three are the
/// workstream's essential context and are never dropped for budget reasons;
/// the last two are included best-effort and truncated first when tight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    Workstream,
    AcceptanceCriteria,
    SealedScope,
    PredecessorSummary,
    FailureArtifact,
}

impl SectionKind {
    #[must_use]
    pub fn is_evictable(self) -> bool {
        matches!(self, SectionKind::PredecessorSummary | SectionKind::FailureArtifact)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SectionKind::Workstream => "workstream",
            SectionKind::AcceptanceCriteria => "acceptance_criteria",
            SectionKind::SealedScope => "sealed_scope",
            SectionKind::PredecessorSummary => "predecessor_summary",
            SectionKind::FailureArtifact => "failure_artifact",
        }
    }
}

/// One piece of assembled context, pre-render.
#[derive(Debug, Clone)]
pub struct Section {
    pub kind: SectionKind,
    pub title: String,
    pub body: String,
}

impl Section {
    #[must_use]
    pub fn new(kind: SectionKind, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self { kind, title: title.into(), body: body.into() }
    }

    #[must_use]
    pub fn byte_len(&self) -> usize {
        self.body.len() + self.title.len() + 10
    }

    #[must_use]
    pub fn line_len(&self) -> usize {
        self.body.lines().count() + 2
    }
}

/// Audit record of one section that made it into (or was dropped from) a
/// packet, for the `generation` evidence event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionEvidence {
    pub kind: &'static str,
    pub title: String,
    pub bytes: usize,
    pub lines: usize,
}

/// Evidence of what went into a packet, without the content itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketEvidence {
    pub workstream_id: WorkstreamId,
    pub sections: Vec<SectionEvidence>,
    pub max_bytes: usize,
    pub max_lines: usize,
    /// Set when one or more evictable sections were dropped to stay within
    /// budget.
    pub truncated: bool,
}
