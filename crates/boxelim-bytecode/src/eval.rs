//! Concrete reference evaluator for method bodies.
//!
//! Executes the recognized runtime surface (ranges, iterators, boxing) over
//! real values. Both the generic `next()` and the specialized `nextInt` family
//! are implemented, so an original body and its rewritten form can be run
//! side by side and their observable results compared.

use indexmap::IndexMap;
use thiserror::Error;

use crate::insn::{BinaryOp, Insn, MethodRef};
use crate::intrinsics::{classify, CallKind};
use crate::kind::PrimitiveKind;
use crate::method::MethodBody;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EvalError {
    #[error("operand stack underflow at pc {pc}")]
    StackUnderflow { pc: usize },
    #[error("local slot {slot} out of bounds at pc {pc}")]
    BadLocal { pc: usize, slot: u16 },
    #[error("branch target {target} out of bounds at pc {pc}")]
    BadTarget { pc: usize, target: usize },
    #[error("type mismatch at pc {pc}: expected {expected}")]
    TypeMismatch { pc: usize, expected: &'static str },
    #[error("unknown method {mref} at pc {pc}")]
    UnknownMethod { pc: usize, mref: MethodRef },
    #[error("progression step must be non-zero")]
    ZeroStep,
    #[error("iterator exhausted at pc {pc}")]
    Exhausted { pc: usize },
    #[error("step budget of {budget} exhausted")]
    StepBudget { budget: usize },
    #[error("fell off the end of the method body")]
    MissingReturn,
}

/// A concrete runtime value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Value {
    Int(i64),
    Ref(usize),
    Null,
}

/// A heap object. Handles index into the evaluator's heap vector.
#[derive(Debug, Clone)]
enum Obj {
    Range {
        kind: PrimitiveKind,
        first: i64,
        last: i64,
        step: i64,
    },
    Iter {
        kind: PrimitiveKind,
        next: i64,
        last: i64,
        step: i64,
    },
    Boxed {
        #[allow(dead_code)]
        kind: PrimitiveKind,
        value: i64,
    },
}

/// Observable outcome of one execution: the returned value (if any) and the
/// final static-field store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecResult {
    pub return_value: Option<Value>,
    pub statics: IndexMap<String, Value>,
}

/// One-shot interpreter for a method body.
pub struct Evaluator {
    stack: Vec<Value>,
    locals: Vec<Value>,
    heap: Vec<Obj>,
    statics: IndexMap<String, Value>,
    step_budget: usize,
}

impl Evaluator {
    pub fn new() -> Self {
        Self::with_budget(1_000_000)
    }

    pub fn with_budget(step_budget: usize) -> Self {
        Self {
            stack: Vec::new(),
            locals: Vec::new(),
            heap: Vec::new(),
            statics: IndexMap::new(),
            step_budget,
        }
    }

    /// Run `body` to completion.
    pub fn run(mut self, body: &MethodBody) -> Result<ExecResult, EvalError> {
        self.locals = vec![Value::Null; body.max_locals as usize];
        let mut pc = 0usize;
        let mut steps = 0usize;

        while pc < body.insns.len() {
            steps += 1;
            if steps > self.step_budget {
                return Err(EvalError::StepBudget {
                    budget: self.step_budget,
                });
            }

            match &body.insns[pc] {
                Insn::Const(n) => self.stack.push(Value::Int(*n)),
                Insn::Load(slot) => {
                    let v = *self
                        .locals
                        .get(*slot as usize)
                        .ok_or(EvalError::BadLocal { pc, slot: *slot })?;
                    self.stack.push(v);
                }
                Insn::Store(slot) => {
                    let v = self.pop(pc)?;
                    let cell = self
                        .locals
                        .get_mut(*slot as usize)
                        .ok_or(EvalError::BadLocal { pc, slot: *slot })?;
                    *cell = v;
                }
                Insn::Dup => {
                    let v = *self.stack.last().ok_or(EvalError::StackUnderflow { pc })?;
                    self.stack.push(v);
                }
                Insn::Pop => {
                    self.pop(pc)?;
                }
                Insn::Binary(op) => {
                    let rhs = self.pop_int(pc)?;
                    let lhs = self.pop_int(pc)?;
                    let result = match op {
                        BinaryOp::Add => lhs.wrapping_add(rhs),
                        BinaryOp::Sub => lhs.wrapping_sub(rhs),
                        BinaryOp::Mul => lhs.wrapping_mul(rhs),
                    };
                    self.stack.push(Value::Int(result));
                }
                Insn::Goto(target) => {
                    pc = self.check_target(pc, *target, body)?;
                    continue;
                }
                Insn::IfZero(target) => {
                    let v = self.pop_int(pc)?;
                    if v == 0 {
                        pc = self.check_target(pc, *target, body)?;
                        continue;
                    }
                }
                Insn::IfRefEq(target) => {
                    let b = self.pop(pc)?;
                    let a = self.pop(pc)?;
                    if a == b {
                        pc = self.check_target(pc, *target, body)?;
                        continue;
                    }
                }
                Insn::GetStatic(fref) => {
                    let key = format!("{}.{}", fref.owner, fref.name);
                    let v = self.statics.get(&key).copied().unwrap_or(Value::Null);
                    self.stack.push(v);
                }
                Insn::PutStatic(fref) => {
                    let v = self.pop(pc)?;
                    let key = format!("{}.{}", fref.owner, fref.name);
                    self.statics.insert(key, v);
                }
                Insn::Invoke(mref) => self.invoke(pc, mref, true)?,
                Insn::InvokeStatic(mref) => self.invoke(pc, mref, false)?,
                Insn::Return => {
                    return Ok(ExecResult {
                        return_value: None,
                        statics: self.statics,
                    });
                }
                Insn::ReturnValue => {
                    let v = self.pop(pc)?;
                    return Ok(ExecResult {
                        return_value: Some(v),
                        statics: self.statics,
                    });
                }
                Insn::Nop => {}
            }
            pc += 1;
        }
        Err(EvalError::MissingReturn)
    }

    fn invoke(&mut self, pc: usize, mref: &MethodRef, virtual_call: bool) -> Result<(), EvalError> {
        let kind = classify(mref).ok_or_else(|| EvalError::UnknownMethod {
            pc,
            mref: mref.clone(),
        })?;
        match (kind, virtual_call) {
            (CallKind::MakeRange(k), false) => {
                let step = if mref.arg_count() == 3 { self.pop_int(pc)? } else { 1 };
                if step == 0 {
                    return Err(EvalError::ZeroStep);
                }
                let last = self.pop_int(pc)?;
                let first = self.pop_int(pc)?;
                let handle = self.alloc(Obj::Range {
                    kind: k,
                    first,
                    last,
                    step,
                });
                self.stack.push(Value::Ref(handle));
            }
            (CallKind::IteratorOf(_), true) => {
                let handle = self.pop_ref(pc)?;
                let (kind, first, last, step) = match self.heap[handle] {
                    Obj::Range {
                        kind,
                        first,
                        last,
                        step,
                    } => (kind, first, last, step),
                    _ => return Err(EvalError::TypeMismatch { pc, expected: "range" }),
                };
                let iter = self.alloc(Obj::Iter {
                    kind,
                    next: first,
                    last,
                    step,
                });
                self.stack.push(Value::Ref(iter));
            }
            (CallKind::HasNext, true) => {
                let handle = self.pop_ref(pc)?;
                let has = self.iter_has_next(pc, handle)?;
                self.stack.push(Value::Int(has as i64));
            }
            (CallKind::Next, true) => {
                let handle = self.pop_ref(pc)?;
                let (kind, value) = self.iter_advance(pc, handle)?;
                let boxed = self.alloc(Obj::Boxed { kind, value });
                self.stack.push(Value::Ref(boxed));
            }
            (CallKind::SpecializedNext(_), true) => {
                let handle = self.pop_ref(pc)?;
                let (_, value) = self.iter_advance(pc, handle)?;
                self.stack.push(Value::Int(value));
            }
            (CallKind::Box(k), false) => {
                let value = self.pop_int(pc)?;
                let boxed = self.alloc(Obj::Boxed { kind: k, value });
                self.stack.push(Value::Ref(boxed));
            }
            (CallKind::Unbox(_), true) => {
                let handle = self.pop_ref(pc)?;
                match self.heap[handle] {
                    Obj::Boxed { value, .. } => self.stack.push(Value::Int(value)),
                    _ => return Err(EvalError::TypeMismatch { pc, expected: "boxed value" }),
                }
            }
            _ => {
                return Err(EvalError::UnknownMethod {
                    pc,
                    mref: mref.clone(),
                })
            }
        }
        Ok(())
    }

    fn iter_has_next(&self, pc: usize, handle: usize) -> Result<bool, EvalError> {
        match self.heap[handle] {
            Obj::Iter { next, last, step, .. } => {
                Ok(if step > 0 { next <= last } else { next >= last })
            }
            _ => Err(EvalError::TypeMismatch { pc, expected: "iterator" }),
        }
    }

    fn iter_advance(&mut self, pc: usize, handle: usize) -> Result<(PrimitiveKind, i64), EvalError> {
        if !self.iter_has_next(pc, handle)? {
            return Err(EvalError::Exhausted { pc });
        }
        match &mut self.heap[handle] {
            Obj::Iter { kind, next, step, .. } => {
                let value = *next;
                *next += *step;
                Ok((*kind, value))
            }
            _ => Err(EvalError::TypeMismatch { pc, expected: "iterator" }),
        }
    }

    fn alloc(&mut self, obj: Obj) -> usize {
        self.heap.push(obj);
        self.heap.len() - 1
    }

    fn pop(&mut self, pc: usize) -> Result<Value, EvalError> {
        self.stack.pop().ok_or(EvalError::StackUnderflow { pc })
    }

    fn pop_int(&mut self, pc: usize) -> Result<i64, EvalError> {
        match self.pop(pc)? {
            Value::Int(n) => Ok(n),
            _ => Err(EvalError::TypeMismatch { pc, expected: "primitive" }),
        }
    }

    fn pop_ref(&mut self, pc: usize) -> Result<usize, EvalError> {
        match self.pop(pc)? {
            Value::Ref(handle) => Ok(handle),
            _ => Err(EvalError::TypeMismatch { pc, expected: "reference" }),
        }
    }

    fn check_target(&self, pc: usize, target: usize, body: &MethodBody) -> Result<usize, EvalError> {
        if target < body.insns.len() {
            Ok(target)
        } else {
            Err(EvalError::BadTarget { pc, target })
        }
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}
