//! Abstract value lattice for the unboxing analysis.
//!
//! Every stack slot and local variable slot is classified as one of these
//! values at every program point. The lattice is closed and total: every
//! pair of values has a join, `Uninit` is bottom and `Conflict` is top.

use boxelim_bytecode::PrimitiveKind;

use crate::primitives;

/// Abstract classification of one slot.
///
/// Equality between two `Boxed` or `ProgressionIter` values holds iff their
/// kinds are equal; the solver relies on this to detect frame stability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbstractValue {
    /// Freshly declared slot, never written on this path.
    Uninit,
    /// Any value with no further refinement (reference or primitive).
    Reference,
    /// A boxed wrapper of the given primitive kind.
    Boxed(PrimitiveKind),
    /// An iterator known to yield boxed values of the given kind from its
    /// generic `next()`.
    ProgressionIter(PrimitiveKind),
    /// Incompatible refinements met at a control-flow join.
    Conflict,
}

impl AbstractValue {
    /// Least upper bound. Pure, commutative, associative, idempotent.
    pub fn join(self, other: AbstractValue) -> AbstractValue {
        use AbstractValue::*;
        match (self, other) {
            (a, b) if a == b => a,
            (Uninit, v) | (v, Uninit) => v,
            (Conflict, _) | (_, Conflict) => Conflict,
            // Remaining pairs disagree in tag or kind.
            _ => Conflict,
        }
    }

    /// Whether this value carries a kind refinement the rewriter cares about.
    pub fn is_refined(&self) -> bool {
        matches!(self, AbstractValue::Boxed(_) | AbstractValue::ProgressionIter(_))
    }

    /// Kind carried by a refined value.
    pub fn kind(&self) -> Option<PrimitiveKind> {
        match self {
            AbstractValue::Boxed(k) | AbstractValue::ProgressionIter(k) => Some(*k),
            _ => None,
        }
    }

    /// Specialized retrieval method name for a progression iterator
    /// (`"next"` + kind name).
    pub fn specialized_name(&self) -> Option<String> {
        match self {
            AbstractValue::ProgressionIter(k) => Some(format!("next{}", k.type_name())),
            _ => None,
        }
    }

    /// Specialized retrieval descriptor: no arguments, raw primitive return.
    pub fn specialized_desc(&self) -> Option<String> {
        match self {
            AbstractValue::ProgressionIter(k) => {
                Some(format!("(){}", primitives::primitive_descriptor(*k)))
            }
            _ => None,
        }
    }
}
