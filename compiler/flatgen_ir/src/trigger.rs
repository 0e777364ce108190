//! Root triggers.
//!
//! A trigger is the entry point of a generated module: it takes a root
//! address (a global variable or a probed function argument) and kicks off
//! flattening under the runtime harness. The shape mirrors the declared
//! type of the root, peeled one level at a time.

use crate::{Name, RecordRef};

/// What the root address is.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum RootIdentity {
    /// A kernel global, addressed by name (and owning module when the
    /// symbol lives outside the core image). The hash labels the root in
    /// the serialized image.
    Global { name: Name, module: Name, hash: Name },
    /// A probed function argument, read out of the saved register file.
    Argument { function: Name, position: u8 },
}

/// Flattening action applied at the root address.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum TriggerShape {
    /// The root is record storage.
    Record { target: RecordRef, elems: u64 },
    /// The root is scalar storage.
    Scalar { type_name: Name, elems: u64 },
    /// The root is enum storage.
    Compound {
        type_name: Name,
        byte_size: u64,
        elems: u64,
    },
    /// The root is a NUL-terminated string.
    CString,
    /// The root is a function pointer cell.
    FunctionPtr,
    /// The root is a pointer cell (or an array of `elems` of them);
    /// flatten each cell, then what it reaches.
    Pointer {
        inner_ctype: Name,
        elems: u64,
        inner: Box<TriggerShape>,
    },
    /// No mechanical flattening step exists for this root shape. A
    /// non-empty `note` renders as a comment in the handler body.
    Unhandled { note: Name },
}

impl TriggerShape {
    /// Record another recipe must exist for, if the shape reaches one.
    pub fn record_dep(&self) -> Option<RecordRef> {
        match self {
            TriggerShape::Record { target, .. } => Some(*target),
            TriggerShape::Pointer { inner, .. } => inner.record_dep(),
            _ => None,
        }
    }
}

/// One emitted root trigger.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct Trigger {
    pub identity: RootIdentity,
    pub shape: TriggerShape,
    /// Byte size of the root object, for the extended root-pointer frame.
    pub byte_size: u64,
    /// Per-CPU symbol; the address needs a per-CPU translation first.
    pub per_cpu: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{StringInterner, SubjectKind, TypeId, TypeKey};

    #[test]
    fn test_pointer_shape_dep() {
        let interner = StringInterner::new();
        let target = RecordRef {
            key: TypeKey::new(SubjectKind::Struct, interner.intern("net")),
            type_id: TypeId::from_raw(4),
            byte_size: 4096,
        };
        let shape = TriggerShape::Pointer {
            inner_ctype: interner.intern("struct net *"),
            elems: 1,
            inner: Box::new(TriggerShape::Record { target, elems: 1 }),
        };
        assert_eq!(shape.record_dep(), Some(target));
    }

    #[test]
    fn test_scalar_shape_has_no_dep() {
        let interner = StringInterner::new();
        let shape = TriggerShape::Scalar {
            type_name: interner.intern("unsigned long"),
            elems: 4,
        };
        assert_eq!(shape.record_dep(), None);
    }
}
