use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use sdp_runner::{CommandSpec, ProcessRunner};
use sdp_types::GateRule;
use sdp_utils::SdpError;

const EXTERNAL_RULE_TIMEOUT: Duration = Duration::from_secs(120);

const DEFAULT_SECRET_PATTERNS: &[&str] = &[
    r"AKIA[0-9A-Z]{16}",
    r"-----BEGIN (RSA|EC|OPENSSH|PGP) PRIVATE KEY-----",
    r"sk-[A-Za-z0-9]{20,}",
    r"ghp_[A-Za-z0-9]{36}",
];

fn param_u64(rule: &GateRule, key: &str, default: u64) -> u64 {
    rule.params.get(key).and_then(serde_json::Value::as_u64).unwrap_or(default)
}

/// `{"max_bytes": N}`, defaults to 1 MiB.
pub fn file_size_check(rule: &GateRule, changed: &[Utf8PathBuf], repo_root: &Utf8Path) -> Result<Vec<String>, SdpError> {
    let max_bytes = param_u64(rule, "max_bytes", 1_048_576);
    let mut offending = Vec::new();
    for path in changed {
        let full = repo_root.join(path);
        if let Ok(meta) = std::fs::metadata(full.as_std_path()) {
            if meta.len() > max_bytes {
                offending.push(format!("{path} ({} bytes > {max_bytes})", meta.len()));
            }
        }
    }
    Ok(offending)
}

/// `{"max_lines": N}`, defaults to 800. Line count is a proxy for
/// cyclomatic/structural complexity, not a substitute for one.
pub fn complexity_check(rule: &GateRule, changed: &[Utf8PathBuf], repo_root: &Utf8Path) -> Result<Vec<String>, SdpError> {
    let max_lines = param_u64(rule, "max_lines", 800);
    let mut offending = Vec::new();
    for path in changed {
        let full = repo_root.join(path);
        if let Ok(contents) = std::fs::read_to_string(full.as_std_path()) {
            let lines = contents.lines().count() as u64;
            if lines > max_lines {
                offending.push(format!("{path} ({lines} lines > {max_lines})"));
            }
        }
    }
    Ok(offending)
}

/// `{"patterns": [String]}`, defaulting to a small set of common secret
/// shapes (cloud access keys, PEM private key headers, vendor tokens).
pub fn security_check(rule: &GateRule, changed: &[Utf8PathBuf], repo_root: &Utf8Path) -> Result<Vec<String>, SdpError> {
    let custom_patterns: Vec<String> = rule
        .params
        .get("patterns")
        .and_then(|v| v.as_array())
        .map(|arr| arr.iter().filter_map(|v| v.as_str().map(String::from)).collect())
        .unwrap_or_default();
    let patterns: Vec<&str> = if custom_patterns.is_empty() {
        DEFAULT_SECRET_PATTERNS.to_vec()
    } else {
        custom_patterns.iter().map(String::as_str).collect()
    };
    let set = regex::RegexSet::new(&patterns).map_err(|e| SdpError::InvalidArgument {
        message: format!("invalid security rule pattern: {e}"),
    })?;

    let mut offending = Vec::new();
    for path in changed {
        let full = repo_root.join(path);
        let Ok(contents) = std::fs::read_to_string(full.as_std_path()) else {
            continue;
        };
        for (lineno, line) in contents.lines().enumerate() {
            if set.is_match(line) {
                offending.push(format!("{path}:{}", lineno + 1));
            }
        }
    }
    Ok(offending)
}

/// Any rule category without a built-in check (`coverage`, `type_hints`,
/// `exception_handling`, `architecture`, and `custom` itself) shells out to
/// `{"command": "..."}` argv-style, piping changed paths on stdin and
/// reading newline-separated offending locations from stdout. Non-zero exit
/// with no stdout is treated as a single opaque offense (the rule id).
pub fn external_check(
    rule: &GateRule,
    changed: &[Utf8PathBuf],
    repo_root: &Utf8Path,
    runner: &dyn ProcessRunner,
) -> Result<Vec<String>, SdpError> {
    let command = rule.params.get("command").and_then(|v| v.as_str()).ok_or_else(|| SdpError::InvalidPolicy {
        path: repo_root.join(".sdp/policy.yml"),
        reason: format!("rule '{}' has no category-specific check and no params.command", rule.id),
    })?;
    let file_list = changed.iter().map(Utf8Path::as_str).collect::<Vec<_>>().join("\n");
    let cmd = CommandSpec::new(command).cwd(repo_root).env("SDP_CHANGED_FILES", file_list);
    let out = runner.run(&cmd, EXTERNAL_RULE_TIMEOUT)?;
    if out.success() {
        Ok(Vec::new())
    } else if out.stdout_string().trim().is_empty() {
        Ok(vec![rule.id.clone()])
    } else {
        Ok(out.stdout_string().lines().map(str::to_string).collect())
    }
}
