//! Pointer-target classification.
//!
//! What a pointer member actually points at is decided once, from the
//! declared type plus usage evidence, and the decision records which kind
//! of evidence won. Later passes consume the classification; they never
//! re-derive it.

use crate::{Name, TypeId};

/// Which evidence chose the pointee.
///
/// Listed in precedence order: an operator mapping always wins, dataflow
/// evidence beats the declaration, and the declared type is the fallback.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum PointeeEvidence {
    /// Operator-supplied pointer mapping.
    Explicit,
    /// A unique `container_of` use.
    ContainerOf,
    /// A unique cast of a `void *` value.
    VoidCast,
    /// String-function usage of a `char *` value.
    StringUse,
    /// The declared member type.
    Declared,
}

/// A record target, possibly shifted inside an enclosing object.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct RecordTarget {
    /// The full record definition.
    pub record: TypeId,
    /// The typedef the member reached the record through, if any.
    pub typedef: Option<TypeId>,
    /// Byte shift from the stored address back to the start of the target
    /// object; negative for `container_of` style back-pointers.
    pub offset_adjust: i64,
    /// Source expressions that produced the shift evidence, kept for the
    /// emitted audit comment.
    pub source_exprs: Vec<String>,
}

/// What a pointer member points at.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum ResolvedPointee {
    /// A record with a full definition.
    Record(RecordTarget),
    /// A scalar builtin.
    Scalar { ty: TypeId },
    /// An enum.
    Enum { ty: TypeId },
    /// A NUL-terminated character string.
    CString,
    /// A function.
    Function,
    /// A `void *` with no usable cast evidence. `ambiguous` distinguishes
    /// conflicting casts from no casts at all.
    OpaqueVoid { ambiguous: bool },
    /// Target memory is not dereferenceable from the kernel side.
    UserMemory,
    /// A forward-declared record with no definition anywhere in the
    /// database.
    UnresolvedForward { tag: Name },
    /// A record whose definition has zero size; nothing to copy.
    ZeroSized { record: TypeId },
}

/// Outcome of resolving one pointer member.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct PointeeResolution {
    pub target: ResolvedPointee,
    pub evidence: PointeeEvidence,
}

impl PointeeResolution {
    pub fn declared(target: ResolvedPointee) -> Self {
        Self {
            target,
            evidence: PointeeEvidence::Declared,
        }
    }
}
