//! Policy document shape (spec.md §7): `.sdp/policy.yml`, loaded by
//! `sdp-config`, evaluated by `sdp-gate`. Unknown keys are rejected at
//! deserialization so a mistyped field fails loudly at load time.

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleCategory {
    FileSize,
    Coverage,
    Complexity,
    TypeHints,
    ExceptionHandling,
    Architecture,
    Security,
    Custom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warn,
    Block,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GateRule {
    pub id: String,
    pub category: RuleCategory,
    pub severity: Severity,
    #[serde(default)]
    pub params: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParallelismConfig {
    #[serde(default = "ParallelismConfig::default_max_workstreams")]
    pub max_workstreams: usize,
}

impl ParallelismConfig {
    const fn default_max_workstreams() -> usize {
        1
    }
}

impl Default for ParallelismConfig {
    fn default() -> Self {
        Self {
            max_workstreams: Self::default_max_workstreams(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReworkConfig {
    #[serde(default = "ReworkConfig::default_max_cycles")]
    pub max_cycles: u32,
}

impl ReworkConfig {
    const fn default_max_cycles() -> u32 {
        3
    }
}

impl Default for ReworkConfig {
    fn default() -> Self {
        Self {
            max_cycles: Self::default_max_cycles(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorktreeConfig {
    pub base_dir: Utf8PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    pub command: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Policy {
    #[serde(default)]
    pub rules: Vec<GateRule>,
    #[serde(default)]
    pub parallelism: ParallelismConfig,
    #[serde(default)]
    pub rework: ReworkConfig,
    pub worktree: Option<WorktreeConfig>,
    pub agent: Option<AgentConfig>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_sections_are_absent() {
        let policy: Policy = serde_yaml::from_str("rules: []").unwrap();
        assert_eq!(policy.parallelism.max_workstreams, 1);
        assert_eq!(policy.rework.max_cycles, 3);
    }

    #[test]
    fn unknown_top_level_key_is_rejected() {
        let err = serde_yaml::from_str::<Policy>("rules: []\nbogus: true").unwrap_err();
        assert!(err.to_string().contains("bogus") || err.to_string().contains("unknown field"));
    }

    #[test]
    fn rule_round_trips_through_json() {
        let rule = GateRule {
            id: "max-file-size".into(),
            category: RuleCategory::FileSize,
            severity: Severity::Block,
            params: serde_json::json!({ "max_bytes": 100_000 }),
        };
        let json = serde_json::to_string(&rule).unwrap();
        let back: GateRule = serde_json::from_str(&json).unwrap();
        assert_eq!(back, rule);
    }
}
