//! Fact-database type handle.
//!
//! `TypeId` is THE canonical reference to an entry of the loaded type
//! universe. All structural queries go through the universe accessor; the
//! handle itself is a bare 32-bit index.
//!
//! - 32-bit indices cover every type a kernel-sized fact database holds
//! - Equality is O(1) index comparison
//! - Copy, lightweight passing

use std::fmt;

/// A 32-bit index into the loaded type universe.
///
/// Identifiers from the fact database are remapped to dense indices at load
/// time, so a `TypeId` is always a valid index into the universe's type
/// table.
#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct TypeId(u32);

impl TypeId {
    /// Sentinel value indicating no type / invalid index.
    pub const NONE: Self = Self(u32::MAX);

    /// Create an index from a raw u32 value.
    ///
    /// The caller must ensure the index is valid in the universe.
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Get the raw u32 value.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Get the value as a table index.
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Check if this is the NONE sentinel.
    #[inline]
    pub const fn is_none(self) -> bool {
        self.0 == u32::MAX
    }
}

impl fmt::Debug for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            write!(f, "TypeId(NONE)")
        } else {
            write!(f, "TypeId({})", self.0)
        }
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            write!(f, "<none>")
        } else {
            write!(f, "t{}", self.0)
        }
    }
}

crate::static_assert_size!(TypeId, 4);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let id = TypeId::from_raw(42);
        assert_eq!(id.raw(), 42);
        assert_eq!(id.index(), 42);
        assert!(!id.is_none());
    }

    #[test]
    fn test_none_sentinel() {
        assert!(TypeId::NONE.is_none());
        assert_eq!(format!("{}", TypeId::NONE), "<none>");
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", TypeId::from_raw(7)), "t7");
    }

    #[test]
    fn test_hash_distinct() {
        let mut set = std::collections::HashSet::new();
        set.insert(TypeId::from_raw(1));
        set.insert(TypeId::from_raw(1));
        set.insert(TypeId::from_raw(2));
        assert_eq!(set.len(), 2);
    }
}
