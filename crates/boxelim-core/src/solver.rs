//! Worklist fixpoint over a method's control flow graph.
//!
//! Forward analysis at instruction granularity: the frame stored for each
//! program point is the join over all paths reaching it. Exception-handler
//! entries are extra successors whose incoming frame replaces the operand
//! stack with the thrown reference and joins in the protected instruction's
//! locals. Termination follows from the lattice's finite height; a hard
//! iteration cap turns a non-converging (malformed) body into an error
//! instead of a hang.

use std::collections::VecDeque;

use tracing::{debug, trace};

use boxelim_bytecode::{Cfg, MethodBody};

use crate::error::AnalysisError;
use crate::frame::Frame;
use crate::interp;

/// Stabilized input frames, one per instruction; `None` marks unreachable
/// code, which later stages skip.
pub type Frames = Vec<Option<Frame>>;

pub struct FixpointSolver;

impl FixpointSolver {
    /// Run the analysis to a fixed point over `body`.
    pub fn solve(body: &MethodBody, cfg: &Cfg) -> Result<Frames, AnalysisError> {
        if body.is_empty() {
            return Err(AnalysisError::EmptyBody);
        }
        for (pc, insn) in body.insns.iter().enumerate() {
            if let Some(target) = insn.branch_target() {
                if target >= body.len() {
                    return Err(AnalysisError::BadTarget { pc, target });
                }
            }
        }

        let mut frames: Frames = vec![None; body.len()];
        frames[0] = Some(Frame::entry(body.max_locals));

        // Seed in reverse postorder so loop headers are met before their
        // back edges on the first sweep.
        let mut worklist: VecDeque<usize> = cfg.reverse_postorder().into_iter().collect();
        let mut queued = vec![false; body.len()];
        for &pc in &worklist {
            queued[pc] = true;
        }

        let cap = iteration_cap(body);
        let mut iterations = 0usize;

        while let Some(pc) = worklist.pop_front() {
            queued[pc] = false;
            iterations += 1;
            if iterations > cap {
                return Err(AnalysisError::IterationLimitExceeded { limit: cap });
            }

            let Some(input) = frames[pc].clone() else {
                // Seeded but not yet reached through any edge.
                continue;
            };

            let output = interp::step(pc, &body.insns[pc], &input)?;
            trace!(pc, stack = output.stack.len(), "transfer");

            for &succ in cfg.successors(pc) {
                if Self::flow_into(&mut frames, succ, &output)? && !queued[succ] {
                    worklist.push_back(succ);
                    queued[succ] = true;
                }
            }
            for &entry in cfg.handler_successors(pc) {
                // The handler sees the locals as they were *before* the
                // protected instruction; its stack is just the exception.
                let handler_frame = Frame::handler_entry(input.locals.clone());
                if Self::flow_into(&mut frames, entry, &handler_frame)? && !queued[entry] {
                    worklist.push_back(entry);
                    queued[entry] = true;
                }
            }
        }

        debug!(iterations, insns = body.len(), "fixpoint reached");
        Ok(frames)
    }

    /// Merge `incoming` into the frame at `pc`; true if it changed.
    fn flow_into(frames: &mut Frames, pc: usize, incoming: &Frame) -> Result<bool, AnalysisError> {
        if let Some(existing) = &mut frames[pc] {
            existing.merge(incoming, pc)
        } else {
            frames[pc] = Some(incoming.clone());
            Ok(true)
        }
    }
}

/// Each slot can climb the lattice at most a handful of times, so this cap
/// is far above anything a well-formed body can need.
fn iteration_cap(body: &MethodBody) -> usize {
    let slots = body.max_locals as usize + 8;
    body.len().saturating_mul(slots).saturating_mul(8).max(1024)
}
