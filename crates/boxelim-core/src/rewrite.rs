//! Instruction-stream rewriting for proven-safe call sites.
//!
//! The only stage with a side effect. Edits are collected against the
//! indices of the original stream from the read-only analysis result, then
//! applied in one reconstruction, so no site's rewrite can invalidate
//! another's verdict or targets.

use tracing::debug;

use boxelim_bytecode::{intrinsics, Insn, MethodBody};

use crate::pass::AnalysisResult;

pub struct Rewriter;

impl Rewriter {
    /// Apply every safe verdict in `result` to `body`. Returns the number
    /// of specialized call sites.
    pub fn apply(body: &mut MethodBody, result: &AnalysisResult) -> usize {
        let mut keep = vec![true; body.len()];
        let mut rewritten = 0usize;

        for (&pc, verdict) in &result.verdicts {
            if !verdict.safe {
                continue;
            }
            // Verdict invariant: a safe site has a kind and is immediately
            // followed by its private unbox call.
            let Some(kind) = verdict.kind else { continue };
            let specialized = intrinsics::specialized_next_ref(kind);
            debug!(pc, %specialized, "specializing next() call");
            body.insns[pc] = Insn::Invoke(specialized);
            keep[pc + 1] = false;
            rewritten += 1;
        }

        if rewritten > 0 {
            body.retain_insns(&keep);
        }
        rewritten
    }
}
