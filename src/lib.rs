//! Developer-workflow orchestrator: drives an AI coding agent through
//! INIT -> BUILD -> REVIEW -> PR -> CI -> DONE with scope-guarded worktrees,
//! quality gates, and a tamper-evident evidence log.
//!
//! This crate is a thin binary shell. All orchestration logic lives in
//! `sdp-core` and the crates it wires together; `cli` only parses
//! arguments, builds the collaborators (process runner, drivers, policy),
//! and maps results onto the documented exit codes.

pub mod cli;
