//! Abstract frames: operand stack plus local variable slots at one
//! program point.

use smallvec::SmallVec;

use crate::error::AnalysisError;
use crate::value::AbstractValue;

/// Abstract state at one instruction. Produced and replaced by the solver;
/// equality drives fixpoint detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub stack: SmallVec<[AbstractValue; 8]>,
    pub locals: Vec<AbstractValue>,
}

impl Frame {
    /// Entry frame: empty stack, all locals uninitialized.
    pub fn entry(max_locals: u16) -> Self {
        Self {
            stack: SmallVec::new(),
            locals: vec![AbstractValue::Uninit; max_locals as usize],
        }
    }

    /// Frame at an exception-handler entry reached from a protected
    /// instruction with locals `locals`: the operand stack is replaced by
    /// the single thrown reference.
    pub fn handler_entry(locals: Vec<AbstractValue>) -> Self {
        let mut stack = SmallVec::new();
        stack.push(AbstractValue::Reference);
        Self { stack, locals }
    }

    pub fn push(&mut self, value: AbstractValue) {
        self.stack.push(value);
    }

    pub fn pop(&mut self, pc: usize) -> Result<AbstractValue, AnalysisError> {
        self.stack.pop().ok_or(AnalysisError::StackUnderflow { pc })
    }

    pub fn top(&self) -> Option<AbstractValue> {
        self.stack.last().copied()
    }

    /// Value `depth` slots below the top (`0` = top).
    pub fn peek(&self, depth: usize) -> Option<AbstractValue> {
        let len = self.stack.len();
        if depth < len {
            Some(self.stack[len - 1 - depth])
        } else {
            None
        }
    }

    pub fn local(&self, pc: usize, slot: u16) -> Result<AbstractValue, AnalysisError> {
        self.locals.get(slot as usize).copied().ok_or(AnalysisError::BadLocal {
            pc,
            slot,
            max_locals: self.locals.len() as u16,
        })
    }

    pub fn set_local(&mut self, pc: usize, slot: u16, value: AbstractValue) -> Result<(), AnalysisError> {
        let max_locals = self.locals.len() as u16;
        let cell = self
            .locals
            .get_mut(slot as usize)
            .ok_or(AnalysisError::BadLocal { pc, slot, max_locals })?;
        *cell = value;
        Ok(())
    }

    /// Pointwise join of `other` into `self`, per stack slot and per local
    /// slot. Returns whether anything moved up the lattice. Frames reaching
    /// the same point with different stack heights are malformed input.
    pub fn merge(&mut self, other: &Frame, pc: usize) -> Result<bool, AnalysisError> {
        if self.stack.len() != other.stack.len() {
            return Err(AnalysisError::HeightMismatch {
                pc,
                left: self.stack.len(),
                right: other.stack.len(),
            });
        }
        let mut changed = false;
        for (slot, incoming) in self.stack.iter_mut().zip(other.stack.iter()) {
            let joined = slot.join(*incoming);
            if joined != *slot {
                *slot = joined;
                changed = true;
            }
        }
        for (slot, incoming) in self.locals.iter_mut().zip(other.locals.iter()) {
            let joined = slot.join(*incoming);
            if joined != *slot {
                *slot = joined;
                changed = true;
            }
        }
        Ok(changed)
    }
}
