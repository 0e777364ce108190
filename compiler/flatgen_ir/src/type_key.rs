//! Recipe identity keys.
//!
//! A generated recipe is keyed by what the emitted C macro is named after:
//! a record tag (`FLATTEN_STRUCT` family) or a typedef name
//! (`FLATTEN_STRUCT_TYPE` family). The same record reached through a tag
//! and through a typedef produces two distinct recipes, exactly as the
//! emitted macros are distinct.

use crate::{Name, StringLookup, TypeId};

/// How the emitted recipe names its subject.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum SubjectKind {
    /// `struct <tag>` recipe.
    Struct,
    /// `union <tag>` recipe.
    Union,
    /// Typedef-named recipe over a struct.
    TypedefStruct,
    /// Typedef-named recipe over a union.
    TypedefUnion,
}

impl SubjectKind {
    /// The C keyword for the underlying record class.
    #[inline]
    pub const fn keyword(self) -> &'static str {
        match self {
            SubjectKind::Struct | SubjectKind::TypedefStruct => "struct",
            SubjectKind::Union | SubjectKind::TypedefUnion => "union",
        }
    }

    /// The macro selector used by the recipe templates.
    #[inline]
    pub const fn macro_tag(self) -> &'static str {
        match self {
            SubjectKind::Struct | SubjectKind::TypedefStruct => "STRUCT",
            SubjectKind::Union | SubjectKind::TypedefUnion => "UNION",
        }
    }

    /// Whether the recipe is named by a typedef instead of a tag.
    #[inline]
    pub const fn is_typedef(self) -> bool {
        matches!(self, SubjectKind::TypedefStruct | SubjectKind::TypedefUnion)
    }

    /// Whether the underlying record is a union.
    #[inline]
    pub const fn is_union(self) -> bool {
        matches!(self, SubjectKind::Union | SubjectKind::TypedefUnion)
    }
}

/// Identity of a recipe in the store.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct TypeKey {
    pub kind: SubjectKind,
    /// Record tag, or typedef name for typedef-named recipes.
    pub name: Name,
}

impl TypeKey {
    #[inline]
    pub const fn new(kind: SubjectKind, name: Name) -> Self {
        Self { kind, name }
    }

    /// Render the key the way diagnostics spell types: `struct foo`,
    /// `union bar`, or the bare typedef name.
    pub fn render(&self, lookup: &impl StringLookup) -> String {
        let name = lookup.lookup(self.name);
        if self.kind.is_typedef() {
            name.to_owned()
        } else {
            format!("{} {}", self.kind.keyword(), name)
        }
    }
}

/// A unit of work for the dependency driver.
///
/// `display` is `Name::EMPTY` for tag-named records; for typedef-named and
/// anonymous subjects it carries the name the recipe will be defined under.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct Subject {
    pub type_id: TypeId,
    pub display: Name,
}

impl Subject {
    #[inline]
    pub const fn record(type_id: TypeId) -> Self {
        Self {
            type_id,
            display: Name::EMPTY,
        }
    }

    #[inline]
    pub const fn named(type_id: TypeId, display: Name) -> Self {
        Self { type_id, display }
    }
}

crate::static_assert_size!(Subject, 8);
