//! Exit-code contract for the `sdp advance` subcommand (spec.md §6).
//!
//! This mapping is part of the external interface and must be preserved
//! bit-for-bit; scripts and CI wrappers depend on it.

use crate::error::SdpError;

pub const SUCCESS: i32 = 0;
pub const GENERIC_FAILURE: i32 = 1;
pub const INVALID_FEATURE_ID: i32 = 2;
pub const ALREADY_INITIALIZED: i32 = 3;
pub const SCOPE_VIOLATION: i32 = 4;
pub const QUALITY_GATE_BLOCK: i32 = 5;
pub const HOOK_FAILURE: i32 = 6;
pub const CANCELLED: i32 = 7;

/// Map an [`SdpError`] reached at the `advance` boundary to its documented
/// exit code. Errors not explicitly named in spec.md §6 fall back to
/// [`GENERIC_FAILURE`].
#[must_use]
pub fn for_advance_error(err: &SdpError) -> i32 {
    match err {
        SdpError::ScopeViolation { .. } => SCOPE_VIOLATION,
        SdpError::QualityGateBlock { .. } => QUALITY_GATE_BLOCK,
        SdpError::HookFailed { .. } => HOOK_FAILURE,
        SdpError::Cancelled => CANCELLED,
        _ => GENERIC_FAILURE,
    }
}

/// Map an [`SdpError`] reached at the `init` boundary to its documented exit
/// code. A feature whose checkpoint already exists surfaces as
/// `ConcurrentModification` (the same "someone already wrote this resource"
/// shape used elsewhere), mapped here to [`ALREADY_INITIALIZED`].
#[must_use]
pub fn for_init_error(err: &SdpError) -> i32 {
    match err {
        SdpError::InvalidArgument { .. } => INVALID_FEATURE_ID,
        SdpError::InvalidEvent { .. } => INVALID_FEATURE_ID,
        SdpError::ConcurrentModification { .. } => ALREADY_INITIALIZED,
        _ => GENERIC_FAILURE,
    }
}
