//! Recipe intermediate representation.
//!
//! A recipe is the flattening program for one subject type: an ordered list
//! of nodes, one per member that needs work. Nodes carry resolved targets
//! and count policies but no C text; rendering is the emitter's job.
//!
//! The store is write-once per key. Building is memoized on the key, so a
//! type reached along two paths is built exactly once and a second insert
//! is a logic error surfaced to the caller.

use crate::{CountPolicy, MemberSite, Name, StringLookup, TypeId, TypeKey};
use rustc_hash::FxHashMap;

/// A record target as recipe nodes reference it.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct RecordRef {
    pub key: TypeKey,
    pub type_id: TypeId,
    pub byte_size: u64,
}

/// Element of an array-typed member.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum ElemRef {
    Record(RecordRef),
    Scalar { type_name: Name },
}

/// Why a member was left as a hand-finish stub.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum StubCause {
    /// Pointer member inside a union; the live interpretation is unknown.
    PointerInUnion,
    /// Array shape the generator does not decompose.
    ComplexMember,
    /// Pointer chain the generator could not see through.
    ComplexPointer,
    /// Record storage declared as an incomplete array.
    IncompleteArrayStorage,
    /// Zero-length array that is not the trailing member.
    FlexibleMidRecord,
}

/// Informational note attached at a member position.
///
/// Notes render as comments and do not make a recipe complex.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum RecipeNote {
    /// Pointer member with no recorded dereference.
    NotUsed,
    /// Pointer into user-space memory.
    UserMemory,
    /// Target record has zero size.
    ZeroSizePointee { tag: Name },
    /// Target record is never defined in the database.
    MissingDefinition { tag: Name },
    /// Target record is excluded by the blacklist.
    BlacklistedTarget { tag: Name },
}

/// One member's flattening step.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum RecipeNode {
    /// Record array stored inline; each element flattens in place.
    CopyRecordArray {
        elem: RecordRef,
        elems: u64,
        member: MemberSite,
    },
    /// Follow a pointer to a record, optionally shifted back into an
    /// enclosing object.
    FollowRecordPointer {
        target: RecordRef,
        member: MemberSite,
        count: CountPolicy,
        /// Byte shift applied to the stored address; negative shifts
        /// recover an enclosing object.
        offset_adjust: i64,
        /// Audit trail for a non-zero shift.
        source_exprs: Vec<String>,
    },
    /// Follow a pointer to scalar storage.
    FollowScalarPointer {
        type_name: Name,
        member: MemberSite,
        count: CountPolicy,
    },
    /// Follow a pointer to enum storage.
    FollowEnumPointer {
        type_name: Name,
        byte_size: u64,
        member: MemberSite,
        count: CountPolicy,
    },
    /// Follow an unresolved `void *` as raw bytes.
    FollowOpaquePointer { member: MemberSite, count: CountPolicy },
    /// Copy a NUL-terminated string.
    CString { member: MemberSite },
    /// Record a function pointer without dereferencing it.
    FunctionPointer { member: MemberSite },
    /// Pointer to pointer: copy the pointer cell, then flatten what the
    /// inner pointer reaches.
    PointerChain {
        member: MemberSite,
        /// Rendered C type of the inner pointer cell.
        inner_ctype: Name,
        inner: Box<RecipeNode>,
    },
    /// Walk a circular intrusive list and flatten each enclosing element.
    ListTraversal {
        container: RecordRef,
        /// Byte offset of the link member inside the container.
        link_offset: u64,
        member: MemberSite,
    },
    /// Trailing open-ended array; extent comes from the runtime harness.
    FlexibleArrayTail { elem: ElemRef, member: MemberSite },
    /// Hand-finish marker; renders as a TODO comment.
    Stub { member: MemberSite, cause: StubCause },
    /// Informational comment at the member position.
    Note { member: MemberSite, note: RecipeNote },
}

impl RecipeNode {
    /// The member position this node works on.
    pub fn member(&self) -> &MemberSite {
        match self {
            RecipeNode::CopyRecordArray { member, .. }
            | RecipeNode::FollowRecordPointer { member, .. }
            | RecipeNode::FollowScalarPointer { member, .. }
            | RecipeNode::FollowEnumPointer { member, .. }
            | RecipeNode::FollowOpaquePointer { member, .. }
            | RecipeNode::CString { member }
            | RecipeNode::FunctionPointer { member }
            | RecipeNode::PointerChain { member, .. }
            | RecipeNode::ListTraversal { member, .. }
            | RecipeNode::FlexibleArrayTail { member, .. }
            | RecipeNode::Stub { member, .. }
            | RecipeNode::Note { member, .. } => member,
        }
    }

    /// Record another recipe must exist for, if this node references one.
    pub fn record_dep(&self) -> Option<RecordRef> {
        match self {
            RecipeNode::CopyRecordArray { elem, .. } => Some(*elem),
            RecipeNode::FollowRecordPointer { target, .. } => Some(*target),
            RecipeNode::ListTraversal { container, .. } => Some(*container),
            RecipeNode::FlexibleArrayTail {
                elem: ElemRef::Record(elem),
                ..
            } => Some(*elem),
            RecipeNode::PointerChain { inner, .. } => inner.record_dep(),
            _ => None,
        }
    }

    /// The count policy this node copies under, looking through pointer
    /// chains to the innermost follow.
    pub fn count(&self) -> Option<CountPolicy> {
        match self {
            RecipeNode::FollowRecordPointer { count, .. }
            | RecipeNode::FollowScalarPointer { count, .. }
            | RecipeNode::FollowEnumPointer { count, .. }
            | RecipeNode::FollowOpaquePointer { count, .. } => Some(*count),
            RecipeNode::PointerChain { inner, .. } => inner.count(),
            _ => None,
        }
    }

    /// True when this node disqualifies its recipe from the simple bucket.
    fn complicates(&self) -> bool {
        match self {
            RecipeNode::Stub { .. } | RecipeNode::FollowOpaquePointer { .. } => true,
            RecipeNode::Note {
                note: RecipeNote::MissingDefinition { .. },
                ..
            } => true,
            RecipeNode::PointerChain { inner, .. } => inner.complicates(),
            _ => self.count().is_some_and(|count| !count.is_safe()),
        }
    }
}

bitflags::bitflags! {
    /// Recipe-level condition markers.
    #[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
    pub struct RecipeFlags: u8 {
        /// Subject ends in an open-ended array.
        const FLEXIBLE = 1 << 0;
        /// Subject is a union whose members include pointers.
        const UNION_CHECK = 1 << 1;
        /// A member degraded in a way that needs a human pass.
        const NEEDS_REVIEW = 1 << 2;
        /// Subject is anonymous and named by a generated typedef.
        const ANON = 1 << 3;
        /// Body supplied verbatim by the operator.
        const CUSTOM = 1 << 4;
    }
}

/// The flattening program for one subject type.
#[derive(Clone, Debug)]
pub struct Recipe {
    pub subject: TypeKey,
    pub type_id: TypeId,
    pub byte_size: u64,
    /// Source location of the record definition, `Name::EMPTY` if unknown.
    pub location: Name,
    pub nodes: Vec<RecipeNode>,
    pub flags: RecipeFlags,
    /// Operator-supplied body; when present, `nodes` is empty.
    pub custom_body: Option<String>,
}

impl Recipe {
    /// A simple recipe is fully mechanical: every pointee resolved, every
    /// count trusted, no hand-finish stubs and no operator-supplied body.
    /// Simple recipes share one emitted source file.
    pub fn is_simple(&self) -> bool {
        self.custom_body.is_none() && !self.nodes.iter().any(RecipeNode::complicates)
    }

    /// A recipe needs checking when it does real work.
    pub fn needs_check(&self) -> bool {
        !self.is_simple()
    }
}

/// Error from the write-once store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A recipe for this key was already inserted.
    Duplicate { key: TypeKey },
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Duplicate { key } => {
                write!(f, "recipe already generated for key {key:?}")
            }
        }
    }
}

impl std::error::Error for StoreError {}

/// Write-once recipe store, iterable in insertion order.
#[derive(Default)]
pub struct RecipeStore {
    map: FxHashMap<TypeKey, Recipe>,
    order: Vec<TypeKey>,
}

impl RecipeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a recipe. Rejects a second recipe for the same key.
    pub fn insert(&mut self, recipe: Recipe) -> Result<(), StoreError> {
        let key = recipe.subject;
        if self.map.contains_key(&key) {
            return Err(StoreError::Duplicate { key });
        }
        self.order.push(key);
        self.map.insert(key, recipe);
        Ok(())
    }

    pub fn contains(&self, key: TypeKey) -> bool {
        self.map.contains_key(&key)
    }

    pub fn get(&self, key: TypeKey) -> Option<&Recipe> {
        self.map.get(&key)
    }

    /// Recipes in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Recipe> {
        self.order.iter().filter_map(|key| self.map.get(key))
    }

    /// Recipes sorted by rendered subject name, for deterministic output.
    pub fn iter_sorted<'a>(&'a self, lookup: &impl StringLookup) -> Vec<&'a Recipe> {
        let mut recipes: Vec<&Recipe> = self.iter().collect();
        recipes.sort_by_key(|recipe| recipe.subject.render(lookup));
        recipes
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
