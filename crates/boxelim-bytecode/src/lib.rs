//! Bytecode model shared by the boxelim optimization passes.
//!
//! This crate supplies everything the analysis core consumes but does not
//! own: the instruction set and method bodies ([`insn`], [`method`]), control
//! flow graph construction including exception-handler edges ([`cfg`]), the
//! intrinsic recognizer that classifies method references into the recognized
//! range/iterator/boxing operations ([`intrinsics`]), and a small concrete
//! evaluator ([`eval`]) used to check that a rewritten method body behaves
//! exactly like the original.

pub mod cfg;
pub mod eval;
pub mod insn;
pub mod intrinsics;
pub mod kind;
pub mod method;

pub use cfg::Cfg;
pub use eval::{EvalError, Evaluator, ExecResult, Value};
pub use insn::{BinaryOp, FieldRef, Insn, MethodRef};
pub use intrinsics::CallKind;
pub use kind::PrimitiveKind;
pub use method::{ExceptionHandler, MethodBody};
