//! Recognizer for the runtime method references the passes care about.
//!
//! The analysis core never matches on owner/name strings itself; it asks
//! this layer what a call means and falls back to "unknown call" for
//! everything unrecognized.

use crate::insn::MethodRef;
use crate::kind::PrimitiveKind;

/// Meaning of a recognized method reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    /// Static range/progression factory: `IntRange.of(II)` or, with an
    /// explicit step, `IntRange.of(III)`.
    MakeRange(PrimitiveKind),
    /// `iterator()` on a progression-typed receiver.
    IteratorOf(PrimitiveKind),
    /// Generic `next()` returning a boxed value.
    Next,
    /// `hasNext()` on an iterator.
    HasNext,
    /// Static boxing method (`Integer.valueOf` etc.).
    Box(PrimitiveKind),
    /// Unboxing method on the wrapper (`intValue` etc.).
    Unbox(PrimitiveKind),
    /// Kind-specialized retrieval (`nextInt` etc.), the rewriter's output.
    SpecializedNext(PrimitiveKind),
}

/// Classify a method reference, or `None` for unknown code.
pub fn classify(mref: &MethodRef) -> Option<CallKind> {
    for kind in PrimitiveKind::ALL {
        if mref.owner == kind.range_owner() {
            if mref.name == "of" {
                return Some(CallKind::MakeRange(kind));
            }
            if mref.name == "iterator" {
                return Some(CallKind::IteratorOf(kind));
            }
        }
        if mref.owner == kind.box_owner() {
            if mref.name == "valueOf" {
                return Some(CallKind::Box(kind));
            }
            if mref.name == kind.unbox_name() {
                return Some(CallKind::Unbox(kind));
            }
        }
        if mref.owner == kind.iterator_owner() {
            if mref.name == specialized_next_name(kind) {
                return Some(CallKind::SpecializedNext(kind));
            }
            if mref.name == "next" {
                return Some(CallKind::Next);
            }
            if mref.name == "hasNext" {
                return Some(CallKind::HasNext);
            }
        }
    }
    if mref.owner == "lang/collections/Iterator" {
        if mref.name == "next" {
            return Some(CallKind::Next);
        }
        if mref.name == "hasNext" {
            return Some(CallKind::HasNext);
        }
    }
    None
}

/// Name of the specialized retrieval method for `kind`.
pub fn specialized_next_name(kind: PrimitiveKind) -> String {
    format!("next{}", kind.type_name())
}

/// Method reference for the specialized retrieval call of `kind`:
/// no arguments, returns the raw primitive.
pub fn specialized_next_ref(kind: PrimitiveKind) -> MethodRef {
    MethodRef::new(
        kind.iterator_owner(),
        specialized_next_name(kind),
        format!("(){}", kind.descriptor()),
    )
}

/// Convenience constructors for the recognized references, shared by the
/// tests and the reference evaluator.
pub mod refs {
    use super::*;

    pub fn make_range(kind: PrimitiveKind) -> MethodRef {
        let d = kind.descriptor();
        MethodRef::new(kind.range_owner(), "of", format!("({d}{d})L{};", kind.range_owner()))
    }

    pub fn make_range_with_step(kind: PrimitiveKind) -> MethodRef {
        let d = kind.descriptor();
        MethodRef::new(kind.range_owner(), "of", format!("({d}{d}{d})L{};", kind.range_owner()))
    }

    pub fn range_iterator(kind: PrimitiveKind) -> MethodRef {
        MethodRef::new(kind.range_owner(), "iterator", format!("()L{};", kind.iterator_owner()))
    }

    pub fn iterator_next() -> MethodRef {
        MethodRef::new("lang/collections/Iterator", "next", "()Ljava/lang/Object;")
    }

    pub fn iterator_has_next() -> MethodRef {
        MethodRef::new("lang/collections/Iterator", "hasNext", "()Z")
    }

    pub fn box_value(kind: PrimitiveKind) -> MethodRef {
        MethodRef::new(
            kind.box_owner(),
            "valueOf",
            format!("({}){}", kind.descriptor(), kind.box_descriptor()),
        )
    }

    pub fn unbox_value(kind: PrimitiveKind) -> MethodRef {
        MethodRef::new(kind.box_owner(), kind.unbox_name(), format!("(){}", kind.descriptor()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_roundtrip() {
        for kind in PrimitiveKind::ALL {
            assert_eq!(classify(&refs::make_range(kind)), Some(CallKind::MakeRange(kind)));
            assert_eq!(classify(&refs::make_range_with_step(kind)), Some(CallKind::MakeRange(kind)));
            assert_eq!(classify(&refs::range_iterator(kind)), Some(CallKind::IteratorOf(kind)));
            assert_eq!(classify(&refs::box_value(kind)), Some(CallKind::Box(kind)));
            assert_eq!(classify(&refs::unbox_value(kind)), Some(CallKind::Unbox(kind)));
            assert_eq!(
                classify(&specialized_next_ref(kind)),
                Some(CallKind::SpecializedNext(kind))
            );
        }
        assert_eq!(classify(&refs::iterator_next()), Some(CallKind::Next));
        assert_eq!(classify(&refs::iterator_has_next()), Some(CallKind::HasNext));
    }

    #[test]
    fn test_unknown_is_none() {
        let unknown = MethodRef::new("x/Sink", "consume", "(Ljava/lang/Object;)V");
        assert_eq!(classify(&unknown), None);
    }

    #[test]
    fn test_specialized_ref_shape() {
        let mref = specialized_next_ref(PrimitiveKind::Int);
        assert_eq!(mref.name, "nextInt");
        assert_eq!(mref.desc, "()I");
        let mref = specialized_next_ref(PrimitiveKind::Char);
        assert_eq!(mref.name, "nextChar");
        assert_eq!(mref.desc, "()C");
    }
}
