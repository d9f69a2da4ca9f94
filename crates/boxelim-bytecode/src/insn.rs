//! Instruction set for a small JVM-style stack machine.

use serde::{Deserialize, Serialize};

/// A symbolic reference to a method: owner internal name, method name and
/// descriptor (`(args)ret` with JVM type encodings).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodRef {
    pub owner: String,
    pub name: String,
    pub desc: String,
}

impl MethodRef {
    pub fn new(owner: impl Into<String>, name: impl Into<String>, desc: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            desc: desc.into(),
        }
    }

    /// Number of argument slots the call pops, not counting the receiver.
    ///
    /// Descriptors here are single-character primitive encodings or
    /// `L...;` object encodings; arrays do not occur in this subset.
    pub fn arg_count(&self) -> usize {
        let inner = self
            .desc
            .strip_prefix('(')
            .and_then(|rest| rest.split_once(')'))
            .map(|(args, _)| args)
            .unwrap_or("");
        let mut count = 0;
        let mut chars = inner.chars();
        while let Some(c) = chars.next() {
            if c == 'L' {
                for c2 in chars.by_ref() {
                    if c2 == ';' {
                        break;
                    }
                }
            }
            count += 1;
        }
        count
    }

    /// Whether the call pushes a result.
    pub fn returns_value(&self) -> bool {
        !self.desc.ends_with(")V")
    }

    /// Whether the call result is a reference rather than a primitive.
    pub fn returns_reference(&self) -> bool {
        self.desc
            .rsplit_once(')')
            .map(|(_, ret)| ret.starts_with('L'))
            .unwrap_or(false)
    }
}

impl std::fmt::Display for MethodRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}{}", self.owner, self.name, self.desc)
    }
}

/// A symbolic reference to a static field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldRef {
    pub owner: String,
    pub name: String,
    pub desc: String,
}

impl FieldRef {
    pub fn new(owner: impl Into<String>, name: impl Into<String>, desc: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            desc: desc.into(),
        }
    }
}

/// Primitive binary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
}

/// One instruction. Branch targets are indices into the owning method
/// body's instruction vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Insn {
    /// Push an integer constant.
    Const(i64),
    /// Push a local variable slot.
    Load(u16),
    /// Pop into a local variable slot.
    Store(u16),
    /// Duplicate the top of stack.
    Dup,
    /// Discard the top of stack.
    Pop,
    /// Pop two operands, push the primitive result.
    Binary(BinaryOp),
    /// Unconditional jump.
    Goto(usize),
    /// Pop one operand, jump if it is zero.
    IfZero(usize),
    /// Pop two references, jump if they are the same object.
    IfRefEq(usize),
    /// Push a static field.
    GetStatic(FieldRef),
    /// Pop into a static field.
    PutStatic(FieldRef),
    /// Call a virtual method; pops receiver and arguments, pushes the
    /// result if any.
    Invoke(MethodRef),
    /// Call a static method; pops arguments only.
    InvokeStatic(MethodRef),
    /// Return without a value.
    Return,
    /// Pop and return the top of stack.
    ReturnValue,
    Nop,
}

impl Insn {
    /// Whether control can fall through to the next instruction.
    pub fn falls_through(&self) -> bool {
        !matches!(self, Insn::Goto(_) | Insn::Return | Insn::ReturnValue)
    }

    /// Explicit branch target, if any.
    pub fn branch_target(&self) -> Option<usize> {
        match self {
            Insn::Goto(t) | Insn::IfZero(t) | Insn::IfRefEq(t) => Some(*t),
            _ => None,
        }
    }

    /// Rewrite the branch target through `remap` (used after instruction
    /// deletion shifts indices).
    pub fn map_target(&mut self, remap: impl Fn(usize) -> usize) {
        match self {
            Insn::Goto(t) | Insn::IfZero(t) | Insn::IfRefEq(t) => *t = remap(*t),
            _ => {}
        }
    }
}
