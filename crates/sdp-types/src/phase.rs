//! The feature-level phase enumeration (spec.md §3, §4.1).

use serde::{Deserialize, Serialize};
use std::fmt;

/// `INIT → BUILD → REVIEW → PR → CI → DONE`. Transition legality lives in
/// `sdp-phase`; this type is just the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Phase {
    Init,
    Build,
    Review,
    Pr,
    Ci,
    Done,
}

impl Phase {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Init => "INIT",
            Phase::Build => "BUILD",
            Phase::Review => "REVIEW",
            Phase::Pr => "PR",
            Phase::Ci => "CI",
            Phase::Done => "DONE",
        }
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Done)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_as_uppercase_tag() {
        assert_eq!(serde_json::to_string(&Phase::Build).unwrap(), "\"BUILD\"");
    }

    #[test]
    fn only_done_is_terminal() {
        assert!(Phase::Done.is_terminal());
        assert!(!Phase::Ci.is_terminal());
    }
}
