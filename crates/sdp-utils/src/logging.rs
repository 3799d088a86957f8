//! Structured logging setup shared by the `sdp` binary and its subcommands.
//!
//! Format is chosen by `SDP_LOG_FORMAT` (`pretty` default, or `json` for CI
//! and machine consumption); verbosity by `RUST_LOG`/`SDP_LOG`, falling back
//! to `info`.

use std::env;

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info";

/// Initialize the global `tracing` subscriber. Safe to call once per
/// process; a second call is a no-op (the underlying `set_global_default`
/// error is swallowed since tests may initialize repeatedly).
pub fn init() {
    let filter = env::var("SDP_LOG")
        .or_else(|_| env::var("RUST_LOG"))
        .unwrap_or_else(|_| DEFAULT_FILTER.to_string());
    let env_filter = EnvFilter::try_new(&filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let json = env::var("SDP_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let result = if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .try_init()
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .try_init()
    };

    if let Err(err) = result {
        tracing::trace!("tracing subscriber already initialized: {err}");
    }
}
