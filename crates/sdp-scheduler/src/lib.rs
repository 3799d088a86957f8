//! Workstream Scheduler (spec.md §4.3).
//!
//! DAG validation via three-color DFS, readiness filtering, deterministic
//! ordering, and scope-collision detection that downgrades a candidate
//! parallel batch to serial execution.

use std::collections::{HashMap, HashSet};

use globset::{Glob, GlobSetBuilder};
use sdp_types::{Workstream, WorkstreamId, WorkstreamStatus};
use sdp_utils::SdpError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

/// Validate that `workstreams`' declared dependencies form a DAG.
/// Returns the full cyclic id set (not just one offending pair) for
/// diagnosability.
pub fn validate_dag(workstreams: &[Workstream]) -> Result<(), SdpError> {
    let by_id: HashMap<&WorkstreamId, &Workstream> = workstreams.iter().map(|w| (&w.id, w)).collect();
    let mut color: HashMap<&WorkstreamId, Color> = workstreams.iter().map(|w| (&w.id, Color::White)).collect();
    let mut cycle: Vec<WorkstreamId> = Vec::new();

    fn visit<'a>(
        id: &'a WorkstreamId,
        by_id: &HashMap<&'a WorkstreamId, &'a Workstream>,
        color: &mut HashMap<&'a WorkstreamId, Color>,
        stack: &mut Vec<WorkstreamId>,
        cycle: &mut Vec<WorkstreamId>,
    ) -> bool {
        if !cycle.is_empty() {
            return true;
        }
        match color.get(id) {
            Some(Color::Black) => return false,
            Some(Color::Gray) => {
                cycle.extend(stack.iter().cloned());
                cycle.push(id.clone());
                return true;
            }
            _ => {}
        }
        color.insert(id, Color::Gray);
        stack.push(id.clone());
        if let Some(ws) = by_id.get(id) {
            for dep in &ws.dependencies {
                if visit(dep, by_id, color, stack, cycle) {
                    return true;
                }
            }
        }
        stack.pop();
        color.insert(id, Color::Black);
        false
    }

    for w in workstreams {
        if w.has_self_dependency() {
            return Err(SdpError::CyclicDependencies {
                cycle: vec![w.id.to_string()],
            });
        }
        let mut stack = Vec::new();
        if *color.get(&w.id).unwrap_or(&Color::White) == Color::White
            && visit(&w.id, &by_id, &mut color, &mut stack, &mut cycle)
        {
            return Err(SdpError::CyclicDependencies {
                cycle: cycle.iter().map(ToString::to_string).collect(),
            });
        }
    }
    Ok(())
}

/// All workstreams currently ready: `pending` status with every dependency
/// `complete`, ordered by declared index then ascending id.
pub fn ready_workstreams(workstreams: &[Workstream]) -> Result<Vec<&Workstream>, SdpError> {
    validate_dag(workstreams)?;
    let completed: HashSet<&WorkstreamId> = workstreams
        .iter()
        .filter(|w| w.status == WorkstreamStatus::Complete)
        .map(|w| &w.id)
        .collect();

    let mut ready: Vec<&Workstream> = workstreams
        .iter()
        .filter(|w| w.status == WorkstreamStatus::Pending && w.dependencies.iter().all(|d| completed.contains(d)))
        .collect();
    ready.sort_by(|a, b| a.declared_index.cmp(&b.declared_index).then_with(|| a.id.cmp(&b.id)));
    Ok(ready)
}

/// The next single ready workstream, or `None`.
pub fn next_ready(workstreams: &[Workstream]) -> Result<Option<&Workstream>, SdpError> {
    Ok(ready_workstreams(workstreams)?.into_iter().next())
}

/// A batch of workstreams selected for (possibly) parallel dispatch, capped
/// at `parallelism`, downgraded to serial (a single-element batch) if any
/// pair's declared scope globs overlap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchBatch<'a> {
    Parallel(Vec<&'a Workstream>),
    Serial(&'a Workstream),
}

/// Select up to `parallelism` ready workstreams for dispatch, checking
/// pairwise scope collisions and downgrading to serial execution of just
/// the first one if any collision is found.
pub fn next_batch(workstreams: &[Workstream], parallelism: usize) -> Result<Option<DispatchBatch<'_>>, SdpError> {
    let ready = ready_workstreams(workstreams)?;
    let Some(first) = ready.first() else { return Ok(None) };
    if parallelism <= 1 {
        return Ok(Some(DispatchBatch::Serial(first)));
    }

    let candidates: Vec<&Workstream> = ready.into_iter().take(parallelism).collect();
    match scope_collision(&candidates) {
        None => Ok(Some(DispatchBatch::Parallel(candidates))),
        Some(_) => Ok(Some(DispatchBatch::Serial(first))),
    }
}

/// `Some((a_id, b_id, overlap))` for the first pairwise scope collision
/// found among `candidates`, else `None`.
pub fn scope_collision<'a>(candidates: &[&'a Workstream]) -> Option<(WorkstreamId, WorkstreamId, Vec<String>)> {
    for i in 0..candidates.len() {
        for j in (i + 1)..candidates.len() {
            let overlap = glob_overlap(&candidates[i].declared_scope, &candidates[j].declared_scope);
            if !overlap.is_empty() {
                return Some((candidates[i].id.clone(), candidates[j].id.clone(), overlap));
            }
        }
    }
    None
}

/// Patterns shared literally between two glob sets, plus any pattern in one
/// set whose compiled matcher accepts the other's literal pattern string —
/// a conservative, explainable approximation of true glob-intersection.
fn glob_overlap(a: &[String], b: &[String]) -> Vec<String> {
    let mut overlap = Vec::new();
    let set_b = build_globset(b);
    for pattern in a {
        if b.contains(pattern) {
            overlap.push(pattern.clone());
            continue;
        }
        if let Some(set) = &set_b {
            if set.is_match(pattern.trim_end_matches("/**").trim_end_matches('*')) {
                overlap.push(pattern.clone());
            }
        }
    }
    overlap
}

fn build_globset(patterns: &[String]) -> Option<globset::GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for p in patterns {
        builder.add(Glob::new(p).ok()?);
    }
    builder.build().ok()
}
