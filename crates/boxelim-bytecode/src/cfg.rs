//! Control flow graph over a method body's instructions.
//!
//! Nodes are instruction indices. Edges cover fallthrough, explicit jumps
//! and exception-handler entries; the analysis core treats handler edges
//! separately from normal ones, so they are kept in their own lists.

use smallvec::SmallVec;

use crate::insn::Insn;
use crate::method::MethodBody;

/// Edge list for one instruction; two slots cover everything but handler
/// entries with many protected predecessors.
type Edges = SmallVec<[usize; 2]>;

/// Per-instruction successor/predecessor lists for one method body.
#[derive(Debug)]
pub struct Cfg {
    succs: Vec<Edges>,
    preds: Vec<Edges>,
    /// Handler entry points reachable from each instruction (exception edges).
    handler_succs: Vec<Edges>,
    /// For each handler entry, the protected instructions that can reach it.
    handler_preds: Vec<Edges>,
}

impl Cfg {
    /// Build the graph for `body`. Branch targets out of bounds are clamped
    /// away here; the analysis reports them when it walks the body itself.
    pub fn build(body: &MethodBody) -> Self {
        let n = body.insns.len();
        let mut cfg = Self {
            succs: vec![Edges::new(); n],
            preds: vec![Edges::new(); n],
            handler_succs: vec![Edges::new(); n],
            handler_preds: vec![Edges::new(); n],
        };

        for (pc, insn) in body.insns.iter().enumerate() {
            if insn.falls_through() && pc + 1 < n {
                cfg.add_edge(pc, pc + 1);
            }
            if let Some(target) = insn.branch_target() {
                if target < n {
                    cfg.add_edge(pc, target);
                }
            }
            for handler in body.handlers_at(pc) {
                if handler.entry < n {
                    cfg.add_handler_edge(pc, handler.entry);
                }
            }
        }
        cfg
    }

    fn add_edge(&mut self, from: usize, to: usize) {
        if !self.succs[from].contains(&to) {
            self.succs[from].push(to);
            self.preds[to].push(from);
        }
    }

    fn add_handler_edge(&mut self, from: usize, entry: usize) {
        if !self.handler_succs[from].contains(&entry) {
            self.handler_succs[from].push(entry);
            self.handler_preds[entry].push(from);
        }
    }

    pub fn len(&self) -> usize {
        self.succs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.succs.is_empty()
    }

    pub fn successors(&self, pc: usize) -> &[usize] {
        &self.succs[pc]
    }

    pub fn predecessors(&self, pc: usize) -> &[usize] {
        &self.preds[pc]
    }

    pub fn handler_successors(&self, pc: usize) -> &[usize] {
        &self.handler_succs[pc]
    }

    pub fn handler_predecessors(&self, entry: usize) -> &[usize] {
        &self.handler_preds[entry]
    }

    /// Instruction indices in reverse postorder from the entry, following
    /// both normal and exception edges. Unreachable instructions are absent.
    ///
    /// Iterative DFS; a very long straight-line body must not exhaust the
    /// thread stack.
    pub fn reverse_postorder(&self) -> Vec<usize> {
        let mut visited = vec![false; self.len()];
        let mut postorder = Vec::with_capacity(self.len());
        if self.is_empty() {
            return postorder;
        }

        // (pc, index of the next outgoing edge to follow)
        let mut stack: Vec<(usize, usize)> = vec![(0, 0)];
        visited[0] = true;
        while let Some(top) = stack.last_mut() {
            let (pc, edge) = *top;
            let normal = self.succs[pc].len();
            if edge < normal + self.handler_succs[pc].len() {
                top.1 += 1;
                let succ = if edge < normal {
                    self.succs[pc][edge]
                } else {
                    self.handler_succs[pc][edge - normal]
                };
                if !visited[succ] {
                    visited[succ] = true;
                    stack.push((succ, 0));
                }
            } else {
                stack.pop();
                postorder.push(pc);
            }
        }
        postorder.reverse();
        postorder
    }

    /// The unique fallthrough successor of `pc`, if the instruction has
    /// exactly one normal successor and it is `pc + 1`.
    pub fn sole_fallthrough(&self, pc: usize, insns: &[Insn]) -> Option<usize> {
        match (insns[pc].falls_through(), self.succs[pc].as_slice()) {
            (true, [next]) if *next == pc + 1 => Some(*next),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::insn::Insn;
    use crate::method::{ExceptionHandler, MethodBody};

    #[test]
    fn test_linear_edges() {
        let body = MethodBody::new(vec![Insn::Const(1), Insn::Pop, Insn::Return], 0);
        let cfg = Cfg::build(&body);
        assert_eq!(cfg.successors(0), &[1]);
        assert_eq!(cfg.successors(1), &[2]);
        assert!(cfg.successors(2).is_empty());
        assert_eq!(cfg.predecessors(2), &[1]);
    }

    #[test]
    fn test_branch_edges() {
        // 0: IfZero 2 / 1: Goto 0 / 2: Return
        let body = MethodBody::new(vec![Insn::IfZero(2), Insn::Goto(0), Insn::Return], 0);
        let cfg = Cfg::build(&body);
        assert_eq!(cfg.successors(0), &[1, 2]);
        assert_eq!(cfg.successors(1), &[0]);
        assert_eq!(cfg.predecessors(0), &[1]);
    }

    #[test]
    fn test_handler_edges() {
        let body = MethodBody::with_handlers(
            vec![Insn::Const(1), Insn::Pop, Insn::Return, Insn::Return],
            0,
            vec![ExceptionHandler {
                start: 0,
                end: 2,
                entry: 3,
            }],
        );
        let cfg = Cfg::build(&body);
        assert_eq!(cfg.handler_successors(0), &[3]);
        assert_eq!(cfg.handler_successors(1), &[3]);
        assert!(cfg.handler_successors(2).is_empty());
        assert_eq!(cfg.handler_predecessors(3), &[0, 1]);
    }

    #[test]
    fn test_reverse_postorder_starts_at_entry() {
        let body = MethodBody::new(vec![Insn::IfZero(2), Insn::Goto(0), Insn::Return], 0);
        let cfg = Cfg::build(&body);
        let rpo = cfg.reverse_postorder();
        assert_eq!(rpo[0], 0);
        assert_eq!(rpo.len(), 3);
    }

    #[test]
    fn test_rpo_handles_deep_straight_line_bodies() {
        let mut insns = vec![Insn::Nop; 200_000];
        *insns.last_mut().unwrap() = Insn::Return;
        let body = MethodBody::new(insns, 0);
        let cfg = Cfg::build(&body);
        let rpo = cfg.reverse_postorder();
        assert_eq!(rpo.len(), 200_000);
        assert_eq!(rpo[0], 0);
        assert_eq!(rpo[199_999], 199_999);
    }

    #[test]
    fn test_unreachable_excluded_from_rpo() {
        // 2 is dead.
        let body = MethodBody::new(vec![Insn::Goto(3), Insn::Nop, Insn::Nop, Insn::Return], 0);
        let cfg = Cfg::build(&body);
        let rpo = cfg.reverse_postorder();
        assert!(!rpo.contains(&1));
        assert!(!rpo.contains(&2));
        assert!(rpo.contains(&3));
    }
}
