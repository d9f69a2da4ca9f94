//! Whole-method entry points: analyze, then optionally rewrite.

use indexmap::IndexMap;
use serde::Serialize;
use tracing::debug;

use boxelim_bytecode::{Cfg, MethodBody};

use crate::error::AnalysisError;
use crate::escape::{CallSiteVerdict, SafetyChecker};
use crate::rewrite::Rewriter;
use crate::solver::{FixpointSolver, Frames};

/// Everything the analysis learned about one method body: the stabilized
/// frame at every reachable program point, and a safety verdict for every
/// generic `next()` call site. Consumable by diagnostics without running
/// the rewriter; discarded after one method's compilation.
#[derive(Debug)]
pub struct AnalysisResult {
    pub frames: Frames,
    pub verdicts: IndexMap<usize, CallSiteVerdict>,
}

impl AnalysisResult {
    /// Call sites proven safe to specialize.
    pub fn safe_sites(&self) -> impl Iterator<Item = usize> + '_ {
        self.verdicts
            .iter()
            .filter(|(_, v)| v.safe)
            .map(|(&pc, _)| pc)
    }
}

/// Summary handed back to the surrounding driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PassOutcome {
    /// Total generic `next()` call sites seen.
    pub candidate_sites: usize,
    /// Sites rewritten to the specialized retrieval.
    pub rewritten_sites: usize,
}

/// Run the analysis stages over `body` without mutating it.
pub fn analyze(body: &MethodBody) -> Result<AnalysisResult, AnalysisError> {
    let cfg = Cfg::build(body);
    let frames = FixpointSolver::solve(body, &cfg)?;
    let verdicts = SafetyChecker::check(body, &cfg, &frames);
    Ok(AnalysisResult { frames, verdicts })
}

/// Analyze `body` and rewrite every proven-safe call site in place.
///
/// On any analysis error the body is left exactly as it was; a method is
/// never partially rewritten.
pub fn optimize_body(body: &mut MethodBody) -> Result<PassOutcome, AnalysisError> {
    let result = analyze(body)?;
    let candidate_sites = result.verdicts.len();
    let rewritten_sites = Rewriter::apply(body, &result);
    debug!(candidate_sites, rewritten_sites, "unboxing pass finished");
    Ok(PassOutcome {
        candidate_sites,
        rewritten_sites,
    })
}
