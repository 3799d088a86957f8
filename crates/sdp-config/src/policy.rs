//! `.sdp/policy.yml` loading (spec.md §7). `sdp_types::Policy` already
//! carries `#[serde(deny_unknown_fields)]` on every section, so a mistyped
//! key surfaces as a parse error here rather than being silently ignored.

use camino::Utf8Path;
use sdp_types::Policy;
use sdp_utils::SdpError;

/// Reads and parses the policy document at `path`.
///
/// A missing file is not an error: it yields [`Policy::default`], which has
/// no rules, one worker of parallelism, and a three-cycle rework cap. A file
/// that exists but fails to parse is [`SdpError::InvalidPolicy`] carrying
/// `path` and the underlying `serde_yaml` message.
pub fn load_policy(path: &Utf8Path) -> Result<Policy, SdpError> {
    let raw = match std::fs::read_to_string(path.as_std_path()) {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(%path, "no policy file found, using defaults");
            return Ok(Policy::default());
        }
        Err(err) => return Err(SdpError::Io(err)),
    };

    serde_yaml::from_str(&raw).map_err(|err| SdpError::InvalidPolicy {
        path: path.to_owned(),
        reason: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use sdp_types::policy::{RuleCategory, Severity};

    fn write(dir: &tempfile::TempDir, name: &str, contents: &str) -> Utf8PathBuf {
        let path = Utf8PathBuf::from_path_buf(dir.path().join(name)).unwrap();
        std::fs::write(path.as_std_path(), contents).unwrap();
        path
    }

    #[test]
    fn missing_file_yields_default_policy() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("absent.yml")).unwrap();
        let policy = load_policy(&path).unwrap();
        assert_eq!(policy, Policy::default());
    }

    #[test]
    fn valid_policy_parses_rules() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "policy.yml",
            r"
rules:
  - id: max-file-size
    category: file_size
    severity: block
    params:
      max_bytes: 100000
parallelism:
  max_workstreams: 4
",
        );
        let policy = load_policy(&path).unwrap();
        assert_eq!(policy.rules.len(), 1);
        assert_eq!(policy.rules[0].category, RuleCategory::FileSize);
        assert_eq!(policy.rules[0].severity, Severity::Block);
        assert_eq!(policy.parallelism.max_workstreams, 4);
    }

    #[test]
    fn unknown_field_is_invalid_policy_with_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "policy.yml", "rules: []\nbogus: true\n");
        let err = load_policy(&path).unwrap_err();
        match err {
            SdpError::InvalidPolicy { path: p, reason } => {
                assert_eq!(p, path);
                assert!(reason.contains("bogus") || reason.to_lowercase().contains("unknown"));
            }
            other => panic!("expected InvalidPolicy, got {other:?}"),
        }
    }

    #[test]
    fn malformed_yaml_is_invalid_policy() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "policy.yml", "rules: [this is not valid\n");
        assert!(matches!(load_policy(&path), Err(SdpError::InvalidPolicy { .. })));
    }
}
