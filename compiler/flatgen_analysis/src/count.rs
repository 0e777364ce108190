//! Element-count inference for followed pointers.
//!
//! The declared type never states how many elements a pointer covers, so
//! the count comes from configuration or from recorded usage. Absent both,
//! a pointer is one element, and any usage shape that contradicts a single
//! object degrades the count to a flagged probe instead of guessing.

use flatgen_facts::CountSpec;
use flatgen_ir::{CountOrigin, CountPolicy, ProbeCause};

use crate::flatten::FlatMember;
use crate::resolve::evidence_key;
use crate::GenCx;

/// Decide the element count for one followed pointer. `depth` is zero for
/// the member itself and grows down a pointer-to-pointer chain.
///
/// An operator-supplied count applies at any depth. Without one, chain
/// levels below the member degrade immediately: dereference evidence is
/// recorded against the member, not against what it points at.
pub fn infer_count(cx: &GenCx<'_>, flat: &FlatMember, depth: u8) -> CountPolicy {
    let key = evidence_key(cx, flat);

    if let Some(spec) = key.and_then(|k| cx.config.custom_counts.get(&k)) {
        return match spec {
            CountSpec::Fixed(n) => CountPolicy::Known {
                elems: *n,
                origin: CountOrigin::Config,
            },
            CountSpec::Formula(expr) => {
                CountPolicy::Expr(cx.universe.interner().intern(expr))
            }
            CountSpec::Probe => CountPolicy::RuntimeProbe,
        };
    }

    if depth > 0 {
        return CountPolicy::Ambiguous(ProbeCause::NestedPointer);
    }

    if let Some(uses) = key.and_then(|k| cx.config.deref.get(&k)) {
        for use_ in uses {
            if use_.offset != 0 {
                return CountPolicy::Ambiguous(ProbeCause::OffsetDeref {
                    byte_offset: use_.offset,
                });
            }
            if use_.index_vars > 0 {
                return CountPolicy::Ambiguous(ProbeCause::IndexedDeref);
            }
        }
    }

    if let Some(kinds) = key.and_then(|k| cx.config.escape.get(&k)) {
        if let Some(kind) = kinds.first() {
            return CountPolicy::Ambiguous(ProbeCause::Escaped(*kind));
        }
    }

    CountPolicy::ONE
}
