//! Abstract-interpretation core of the progression-iterator unboxing pass.
//!
//! A method body that iterates a numeric progression through the generic
//! iterator interface pays for a box/unbox pair on every `next()` call. This
//! crate proves, per method, which of those calls can never observe the boxed
//! identity and rewrites them to the kind-specialized primitive retrieval
//! (`nextInt` and friends), deleting the redundant unbox call.
//!
//! Pipeline, stages depending only on stages to their left:
//!
//! 1. [`primitives`]: the once-built table of progression-capable kinds
//! 2. [`value`]: the abstract value lattice
//! 3. [`interp`]: per-instruction transfer function over [`frame::Frame`]s
//! 4. [`solver`]: worklist fixpoint over the control flow graph
//! 5. [`escape`]: per-call-site safety verdicts from the stabilized frames
//! 6. [`rewrite`]: the only stage that mutates the instruction stream

pub mod error;
pub mod escape;
pub mod frame;
pub mod interp;
pub mod pass;
pub mod primitives;
pub mod rewrite;
pub mod solver;
pub mod value;

pub use error::AnalysisError;
pub use escape::{CallSiteVerdict, SafetyChecker, UnsafeReason};
pub use frame::Frame;
pub use pass::{analyze, optimize_body, AnalysisResult, PassOutcome};
pub use solver::FixpointSolver;
pub use value::AbstractValue;
