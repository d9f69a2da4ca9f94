//! Method bodies: an instruction vector plus exception table.

use serde::{Deserialize, Serialize};

use crate::insn::Insn;

/// One entry of a method's exception table. Instructions in `[start, end)`
/// are protected; a throw inside the range transfers control to `entry`
/// with the operand stack replaced by the thrown exception reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExceptionHandler {
    pub start: usize,
    pub end: usize,
    pub entry: usize,
}

/// A single method body as handed to the optimization passes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodBody {
    pub insns: Vec<Insn>,
    pub max_locals: u16,
    pub handlers: Vec<ExceptionHandler>,
}

impl MethodBody {
    pub fn new(insns: Vec<Insn>, max_locals: u16) -> Self {
        Self {
            insns,
            max_locals,
            handlers: Vec::new(),
        }
    }

    pub fn with_handlers(insns: Vec<Insn>, max_locals: u16, handlers: Vec<ExceptionHandler>) -> Self {
        Self {
            insns,
            max_locals,
            handlers,
        }
    }

    pub fn len(&self) -> usize {
        self.insns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.insns.is_empty()
    }

    /// Exception handlers protecting the instruction at `pc`.
    pub fn handlers_at(&self, pc: usize) -> impl Iterator<Item = &ExceptionHandler> {
        self.handlers.iter().filter(move |h| h.start <= pc && pc < h.end)
    }

    /// Rebuild the body keeping only instructions where `keep[pc]` holds,
    /// remapping branch targets and exception ranges to the new indices.
    ///
    /// A branch or handler boundary pointing at a removed instruction is
    /// redirected to the next kept one; callers must only remove
    /// instructions whose execution has become a no-op.
    pub fn retain_insns(&mut self, keep: &[bool]) {
        debug_assert_eq!(keep.len(), self.insns.len());

        // new_index[pc] = index of the first kept instruction at or after pc.
        let mut new_index = vec![0usize; self.insns.len() + 1];
        let mut next = 0usize;
        for pc in 0..self.insns.len() {
            new_index[pc] = next;
            if keep[pc] {
                next += 1;
            }
        }
        new_index[self.insns.len()] = next;

        let old = std::mem::take(&mut self.insns);
        self.insns = old
            .into_iter()
            .enumerate()
            .filter_map(|(pc, mut insn)| {
                if keep[pc] {
                    insn.map_target(|t| new_index[t]);
                    Some(insn)
                } else {
                    None
                }
            })
            .collect();

        self.handlers.retain_mut(|h| {
            h.start = new_index[h.start];
            h.end = new_index[h.end];
            h.entry = new_index[h.entry];
            h.start < h.end
        });
    }
}
