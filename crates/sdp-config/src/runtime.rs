//! `.sdp/config.toml` loading: ambient runtime settings that are not part of
//! the gate policy — lock acquisition timeout, log output format. Entirely
//! optional; every field has a default and the file itself need not exist.

use camino::Utf8Path;
use serde::Deserialize;
use sdp_utils::SdpError;

const DEFAULT_LOCK_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Pretty,
    Json,
}

impl Default for LogFormat {
    fn default() -> Self {
        Self::Pretty
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct RuntimeConfig {
    pub lock_timeout_secs: u64,
    pub log_format: LogFormat,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self { lock_timeout_secs: DEFAULT_LOCK_TIMEOUT_SECS, log_format: LogFormat::default() }
    }
}

/// Reads and parses `.sdp/config.toml`.
///
/// A missing file yields [`RuntimeConfig::default`]. A file that exists but
/// fails to parse is `SdpError::InvalidArgument` carrying `path` in the
/// message, since this document sits outside the policy/evidence/phase
/// domain that has its own dedicated error variant.
pub fn load_runtime_config(path: &Utf8Path) -> Result<RuntimeConfig, SdpError> {
    let raw = match std::fs::read_to_string(path.as_std_path()) {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(%path, "no runtime config found, using defaults");
            return Ok(RuntimeConfig::default());
        }
        Err(err) => return Err(SdpError::Io(err)),
    };

    toml::from_str(&raw)
        .map_err(|err| SdpError::InvalidArgument { message: format!("invalid config at {path}: {err}") })
}
