//! Error taxonomy for one method's analysis.
//!
//! Every variant here means the method body was malformed by an earlier
//! phase; the pass aborts for that method and performs no rewrite. Nothing
//! here escapes to other methods' analyses.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("operand stack underflow at pc {pc}")]
    StackUnderflow { pc: usize },

    #[error("operand stack exceeded {limit} slots at pc {pc}")]
    StackOverflow { pc: usize, limit: usize },

    #[error("local slot {slot} out of bounds at pc {pc} (max_locals {max_locals})")]
    BadLocal { pc: usize, slot: u16, max_locals: u16 },

    #[error("branch target {target} out of bounds at pc {pc}")]
    BadTarget { pc: usize, target: usize },

    #[error("incompatible stack heights ({left} vs {right}) merging into pc {pc}")]
    HeightMismatch { pc: usize, left: usize, right: usize },

    #[error("fixpoint exceeded the iteration cap of {limit}")]
    IterationLimitExceeded { limit: usize },

    #[error("method body has no instructions")]
    EmptyBody,
}
