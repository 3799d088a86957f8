//! Everything one `advance`/`init` invocation needs: resolved paths, the
//! loaded policy, and the collaborators (process runner, agent launch
//! spec, review/PR/CI drivers) it drives. Built once by the binary crate
//! and threaded through every function here by reference.

use std::time::Duration;

use camino::Utf8PathBuf;
use sdp_adapters::{CiDriver, PrDriver, ReviewDriver};
use sdp_runner::{CancellationToken, ProcessRunner};
use sdp_types::Policy;

pub struct OrchestratorContext<'a> {
    pub project_root: Utf8PathBuf,
    pub repo_root: Utf8PathBuf,
    pub policy: Policy,
    pub lock_timeout: Duration,
    pub runner: &'a dyn ProcessRunner,
    pub agent: sdp_agent::AgentLaunch,
    pub review: &'a dyn ReviewDriver,
    pub pr: &'a dyn PrDriver,
    pub ci: &'a dyn CiDriver,
    /// Cancelled by `main`'s SIGINT/SIGTERM handler; `build_step::run` races
    /// the in-flight agent invocation against it.
    pub cancel: CancellationToken,
    /// `advance --skip-guard`: bypasses `sdp_scope::check` in `build_step::run`.
    pub skip_guard: bool,
}

impl OrchestratorContext<'_> {
    #[must_use]
    pub fn policy_path(&self) -> Utf8PathBuf {
        sdp_utils::paths::policy_path(&self.project_root)
    }
}
