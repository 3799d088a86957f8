//! Scope Guard (spec.md §4.5).
//!
//! Classifies a worktree's changed paths against a workstream's sealed
//! scope. The diff itself is read through [`DiffSource`] so this crate
//! never shells out to git directly.

use camino::Utf8PathBuf;
use globset::{Glob, GlobSet, GlobSetBuilder};
use sdp_types::{Scope, WorkstreamId};
use sdp_utils::SdpError;

/// Supplies the set of paths changed (staged or unstaged) in a worktree.
pub trait DiffSource {
    fn staged_and_unstaged_paths(&self) -> Result<Vec<Utf8PathBuf>, SdpError>;
}

fn build_globset(scope: &Scope) -> Result<GlobSet, SdpError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in scope.effective_globs() {
        let glob = Glob::new(pattern).map_err(|e| SdpError::InvalidArgument {
            message: format!("invalid scope glob '{pattern}': {e}"),
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|e| SdpError::Internal(e.to_string()))
}

/// Splits `changed` into `(in_scope, out_of_scope)` against `scope`'s
/// effective globs (sealed declaration plus any extensions).
pub fn classify(scope: &Scope, changed: &[Utf8PathBuf]) -> Result<(Vec<Utf8PathBuf>, Vec<Utf8PathBuf>), SdpError> {
    let set = build_globset(scope)?;
    let mut in_scope = Vec::new();
    let mut out_of_scope = Vec::new();
    for path in changed {
        if set.is_match(path.as_str()) {
            in_scope.push(path.clone());
        } else {
            out_of_scope.push(path.clone());
        }
    }
    Ok((in_scope, out_of_scope))
}

/// Checks a workstream's worktree diff against its sealed scope. Returns
/// `ScopeViolation` carrying every offending path, never just the first.
pub fn check(workstream_id: &WorkstreamId, scope: &Scope, diff: &dyn DiffSource) -> Result<(), SdpError> {
    let changed = diff.staged_and_unstaged_paths()?;
    let (_in_scope, out_of_scope) = classify(scope, &changed)?;
    if out_of_scope.is_empty() {
        Ok(())
    } else {
        Err(SdpError::ScopeViolation {
            workstream_id: workstream_id.to_string(),
            offending: out_of_scope,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    struct FixedDiff(Vec<Utf8PathBuf>);

    impl DiffSource for FixedDiff {
        fn staged_and_unstaged_paths(&self) -> Result<Vec<Utf8PathBuf>, SdpError> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn in_scope_changes_pass() {
        let ws = WorkstreamId::from_str("00-F001-01").unwrap();
        let scope = Scope::sealed(vec!["src/a/**".into()]);
        let diff = FixedDiff(vec![Utf8PathBuf::from("src/a/mod.rs")]);
        assert!(check(&ws, &scope, &diff).is_ok());
    }

    #[test]
    fn out_of_scope_change_is_violation() {
        let ws = WorkstreamId::from_str("00-F001-01").unwrap();
        let scope = Scope::sealed(vec!["src/a/**".into()]);
        let diff = FixedDiff(vec![Utf8PathBuf::from("src/a/mod.rs"), Utf8PathBuf::from("src/b/mod.rs")]);
        let err = check(&ws, &scope, &diff).unwrap_err();
        match err {
            SdpError::ScopeViolation { offending, .. } => {
                assert_eq!(offending, vec![Utf8PathBuf::from("src/b/mod.rs")]);
            }
            _ => panic!("expected ScopeViolation"),
        }
    }

    #[test]
    fn extension_widens_allowed_scope() {
        let ws = WorkstreamId::from_str("00-F001-01").unwrap();
        let mut scope = Scope::sealed(vec!["src/a/**".into()]);
        scope.extend("src/b/**".into());
        let diff = FixedDiff(vec![Utf8PathBuf::from("src/b/mod.rs")]);
        assert!(check(&ws, &scope, &diff).is_ok());
    }

    #[test]
    fn classify_splits_changed_paths() {
        let scope = Scope::sealed(vec!["src/a/**".into()]);
        let changed = vec![Utf8PathBuf::from("src/a/x.rs"), Utf8PathBuf::from("README.md")];
        let (in_scope, out_of_scope) = classify(&scope, &changed).unwrap();
        assert_eq!(in_scope, vec![Utf8PathBuf::from("src/a/x.rs")]);
        assert_eq!(out_of_scope, vec![Utf8PathBuf::from("README.md")]);
    }
}
