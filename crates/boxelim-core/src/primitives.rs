//! The primitive-type table: which kinds support progression iteration and
//! how each one is encoded.
//!
//! Built exactly once on first use and immutable afterwards, so concurrent
//! method analyses may query it without synchronization.

use indexmap::IndexMap;
use once_cell::sync::Lazy;

use boxelim_bytecode::PrimitiveKind;

/// Encoding facts for one progression-capable kind.
#[derive(Debug, Clone, Copy)]
pub struct KindInfo {
    pub kind: PrimitiveKind,
    /// Raw primitive encoding used in descriptors.
    pub descriptor: &'static str,
}

static TYPE_NAME_TO_KIND: Lazy<IndexMap<&'static str, KindInfo>> = Lazy::new(|| {
    PrimitiveKind::ALL
        .iter()
        .map(|&kind| {
            (
                kind.type_name(),
                KindInfo {
                    kind,
                    descriptor: kind.descriptor(),
                },
            )
        })
        .collect()
});

/// Whether `kind` supports progression iteration.
pub fn supports_progression(kind: PrimitiveKind) -> bool {
    TYPE_NAME_TO_KIND.contains_key(kind.type_name())
}

/// Look a kind up by its display name ("Int", "Long", "Char").
pub fn kind_by_type_name(name: &str) -> Option<PrimitiveKind> {
    TYPE_NAME_TO_KIND.get(name).map(|info| info.kind)
}

/// Raw primitive encoding for `kind`.
pub fn primitive_descriptor(kind: PrimitiveKind) -> &'static str {
    TYPE_NAME_TO_KIND
        .get(kind.type_name())
        .map(|info| info.descriptor)
        .unwrap_or_else(|| kind.descriptor())
}

/// All progression-capable kinds, in table order.
pub fn supported_kinds() -> impl Iterator<Item = PrimitiveKind> {
    TYPE_NAME_TO_KIND.values().map(|info| info.kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_kind_is_supported() {
        for kind in PrimitiveKind::ALL {
            assert!(supports_progression(kind));
        }
    }

    #[test]
    fn test_lookup_by_name() {
        assert_eq!(kind_by_type_name("Int"), Some(PrimitiveKind::Int));
        assert_eq!(kind_by_type_name("Long"), Some(PrimitiveKind::Long));
        assert_eq!(kind_by_type_name("Char"), Some(PrimitiveKind::Char));
        assert_eq!(kind_by_type_name("Float"), None);
    }

    #[test]
    fn test_descriptor_matches_kind() {
        assert_eq!(primitive_descriptor(PrimitiveKind::Long), "J");
        assert_eq!(supported_kinds().count(), PrimitiveKind::ALL.len());
    }
}
