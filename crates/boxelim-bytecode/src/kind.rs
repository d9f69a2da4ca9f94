//! Primitive kinds that support progression iteration.

use serde::{Deserialize, Serialize};

/// A primitive kind over which a numeric progression can be formed.
///
/// This is a closed set: only kinds with a dedicated range type and a
/// primitive iterator in the runtime appear here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrimitiveKind {
    Int,
    Long,
    Char,
}

impl PrimitiveKind {
    pub const ALL: [PrimitiveKind; 3] = [PrimitiveKind::Int, PrimitiveKind::Long, PrimitiveKind::Char];

    /// Display name used to form specialized method names (`nextInt` etc.).
    pub fn type_name(&self) -> &'static str {
        match self {
            PrimitiveKind::Int => "Int",
            PrimitiveKind::Long => "Long",
            PrimitiveKind::Char => "Char",
        }
    }

    /// Raw primitive encoding in method descriptors.
    pub fn descriptor(&self) -> &'static str {
        match self {
            PrimitiveKind::Int => "I",
            PrimitiveKind::Long => "J",
            PrimitiveKind::Char => "C",
        }
    }

    /// Owner of the boxed wrapper type.
    pub fn box_owner(&self) -> &'static str {
        match self {
            PrimitiveKind::Int => "java/lang/Integer",
            PrimitiveKind::Long => "java/lang/Long",
            PrimitiveKind::Char => "java/lang/Character",
        }
    }

    /// Descriptor of the boxed wrapper type.
    pub fn box_descriptor(&self) -> &'static str {
        match self {
            PrimitiveKind::Int => "Ljava/lang/Integer;",
            PrimitiveKind::Long => "Ljava/lang/Long;",
            PrimitiveKind::Char => "Ljava/lang/Character;",
        }
    }

    /// Name of the unboxing method on the wrapper (`intValue` etc.).
    pub fn unbox_name(&self) -> &'static str {
        match self {
            PrimitiveKind::Int => "intValue",
            PrimitiveKind::Long => "longValue",
            PrimitiveKind::Char => "charValue",
        }
    }

    /// Owner of the range type for this kind.
    pub fn range_owner(&self) -> &'static str {
        match self {
            PrimitiveKind::Int => "lang/ranges/IntRange",
            PrimitiveKind::Long => "lang/ranges/LongRange",
            PrimitiveKind::Char => "lang/ranges/CharRange",
        }
    }

    /// Owner of the primitive iterator type yielded by the range.
    pub fn iterator_owner(&self) -> &'static str {
        match self {
            PrimitiveKind::Int => "lang/collections/IntIterator",
            PrimitiveKind::Long => "lang/collections/LongIterator",
            PrimitiveKind::Char => "lang/collections/CharIterator",
        }
    }
}

impl std::fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.type_name())
    }
}
