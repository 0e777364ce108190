//! Element-count decisions for pointer members.
//!
//! Every followed pointer carries a `CountPolicy` stating how many elements
//! the target copy covers and where that number came from. A policy is
//! never silently invented: anything other than hard evidence degrades to a
//! probe with a recorded cause, which the emitter renders as a single
//! element with a not-SAFE marker.

use crate::Name;

/// Where a known element count came from.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum CountOrigin {
    /// Operator-supplied fixed count.
    Config,
    /// No usage evidence against a single element.
    DefaultSingle,
}

/// How a pointer value escaped local analysis.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum EscapeKind {
    /// Stored through an assignment.
    Assigned,
    /// Passed to another function.
    FunctionArg,
    /// Passed through an indirect call.
    IndirectCall,
}

impl EscapeKind {
    pub const fn describe(self) -> &'static str {
        match self {
            EscapeKind::Assigned => "assigned",
            EscapeKind::FunctionArg => "passed as argument",
            EscapeKind::IndirectCall => "passed through indirect call",
        }
    }
}

/// Why a count could not be established statically.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ProbeCause {
    /// The member sits behind another pointer; usage evidence does not
    /// reach through the chain.
    NestedPointer,
    /// The pointer is dereferenced at a non-zero offset.
    OffsetDeref { byte_offset: i64 },
    /// The pointer is indexed with a variable subscript.
    IndexedDeref,
    /// The pointer value escapes before its uses can be seen.
    Escaped(EscapeKind),
}

impl ProbeCause {
    pub fn describe(self) -> String {
        match self {
            ProbeCause::NestedPointer => "nested pointer".to_owned(),
            ProbeCause::OffsetDeref { byte_offset } => {
                format!("dereferenced at offset {byte_offset}")
            }
            ProbeCause::IndexedDeref => "indexed with a variable subscript".to_owned(),
            ProbeCause::Escaped(kind) => format!("escapes: {}", kind.describe()),
        }
    }
}

/// Element count attached to a followed pointer.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum CountPolicy {
    /// A fixed number of elements, with its provenance.
    Known { elems: u64, origin: CountOrigin },
    /// An operator-supplied C expression evaluated in the recipe.
    Expr(Name),
    /// Defer to the runtime harness, which sizes the target allocation.
    RuntimeProbe,
    /// Usage evidence contradicts a single element; copy one and flag it.
    Ambiguous(ProbeCause),
}

impl CountPolicy {
    /// Single element backed by no contrary evidence.
    pub const ONE: Self = CountPolicy::Known {
        elems: 1,
        origin: CountOrigin::DefaultSingle,
    };

    /// True when the copied extent is trusted.
    pub const fn is_safe(&self) -> bool {
        matches!(
            self,
            CountPolicy::Known { .. } | CountPolicy::Expr(_) | CountPolicy::RuntimeProbe
        )
    }

    /// The probe cause, when the count degraded.
    pub const fn probe_cause(&self) -> Option<ProbeCause> {
        match self {
            CountPolicy::Ambiguous(cause) => Some(*cause),
            _ => None,
        }
    }
}
