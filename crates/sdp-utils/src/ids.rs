//! Validated identifier newtypes (spec.md §3).
//!
//! `FeatureId` and `WorkstreamId` are rejected at the parse boundary rather
//! than threaded as bare `String`s, so a malformed id from a CLI arg or a
//! checkpoint file on disk fails loudly at the edge instead of deep inside a
//! handler.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::SdpError;

/// A feature identifier matching `F\d{3}`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FeatureId(String);

impl FeatureId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(s: &str) -> Result<(), SdpError> {
        let digits = s.strip_prefix('F').ok_or_else(|| SdpError::InvalidArgument {
            message: format!("feature id '{s}' must start with 'F'"),
        })?;
        if digits.len() == 3 && digits.bytes().all(|b| b.is_ascii_digit()) {
            Ok(())
        } else {
            Err(SdpError::InvalidArgument {
                message: format!("feature id '{s}' must match F\\d{{3}}"),
            })
        }
    }
}

impl FromStr for FeatureId {
    type Err = SdpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::validate(s)?;
        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for FeatureId {
    type Error = SdpError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::validate(&s)?;
        Ok(Self(s))
    }
}

impl From<FeatureId> for String {
    fn from(id: FeatureId) -> Self {
        id.0
    }
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A workstream identifier matching `PP-FFF-SS`, e.g. `00-F001-02`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WorkstreamId(String);

impl WorkstreamId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The feature this workstream belongs to, parsed out of the id.
    pub fn feature_id(&self) -> Result<FeatureId, SdpError> {
        let middle = self
            .0
            .split('-')
            .nth(1)
            .ok_or_else(|| SdpError::Internal(format!("malformed workstream id '{}'", self.0)))?;
        FeatureId::from_str(middle)
    }

    fn validate(s: &str) -> Result<(), SdpError> {
        let parts: Vec<&str> = s.split('-').collect();
        let bad = || SdpError::InvalidArgument {
            message: format!("workstream id '{s}' must match PP-FFF-SS"),
        };
        if parts.len() != 3 {
            return Err(bad());
        }
        let [pp, fff, ss] = [parts[0], parts[1], parts[2]];
        if pp.len() != 2 || !pp.bytes().all(|b| b.is_ascii_digit()) {
            return Err(bad());
        }
        FeatureId::validate(fff).map_err(|_| bad())?;
        if ss.len() != 2 || !ss.bytes().all(|b| b.is_ascii_digit()) {
            return Err(bad());
        }
        Ok(())
    }
}

impl FromStr for WorkstreamId {
    type Err = SdpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::validate(s)?;
        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for WorkstreamId {
    type Error = SdpError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::validate(&s)?;
        Ok(Self(s))
    }
}

impl From<WorkstreamId> for String {
    fn from(id: WorkstreamId) -> Self {
        id.0
    }
}

impl fmt::Display for WorkstreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
