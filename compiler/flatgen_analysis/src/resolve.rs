//! Pointer-target resolution.
//!
//! Decides, once per pointer member, what the pointer actually reaches.
//! Precedence: an operator mapping always wins, then unique
//! `container_of` evidence, then a unique `void *` cast target, then
//! string usage of a `char *`, and finally the declared type.
//!
//! Evidence applies at the member itself; the inner levels of a
//! pointer-to-pointer chain resolve from declarations alone.

use flatgen_facts::{MemberKey, Type};
use flatgen_ir::{PointeeEvidence, RecordTarget, ResolvedPointee, TypeId};

use crate::flatten::FlatMember;
use crate::GenCx;

/// The shape the builder acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PointeeKind {
    Shaped(ResolvedPointee),
    /// The chosen target is itself a pointer; the builder recurses.
    Nested { inner: TypeId },
    /// No flattening strategy exists for the target shape.
    Complex,
}

/// Outcome of resolving one pointer member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberPointee {
    pub kind: PointeeKind,
    pub evidence: PointeeEvidence,
    /// Conflicting `container_of` candidates, rendered for the report.
    pub container_conflict: Option<String>,
}

impl MemberPointee {
    fn new(kind: PointeeKind, evidence: PointeeEvidence) -> Self {
        Self {
            kind,
            evidence,
            container_conflict: None,
        }
    }
}

/// Evidence key of a member: the enclosing record's tag plus the dotted
/// chain within it. Members of anonymous enclosing records have no key.
pub(crate) fn evidence_key(cx: &GenCx<'_>, flat: &FlatMember) -> Option<MemberKey> {
    let universe = cx.universe;
    let Type::Record(rec) = universe.type_of(flat.enclosing) else {
        return None;
    };
    if rec.tag.is_empty() || flat.eref.is_empty() {
        return None;
    }
    let member = if flat.eref.len() == 1 {
        flat.eref[0]
    } else {
        universe.interner().intern_owned(flat.eref_dotted(universe))
    };
    Some(MemberKey::new(rec.tag, member))
}

/// Key for evidence recorded against the member's own name only.
fn leaf_key(cx: &GenCx<'_>, flat: &FlatMember) -> Option<MemberKey> {
    let Type::Record(rec) = cx.universe.type_of(flat.enclosing) else {
        return None;
    };
    let leaf = *flat.eref.last()?;
    if rec.tag.is_empty() {
        return None;
    }
    Some(MemberKey::new(rec.tag, leaf))
}

/// Resolve the pointee of a depth-zero pointer member with full evidence.
pub fn resolve_member_pointee(
    cx: &GenCx<'_>,
    flat: &FlatMember,
    declared: TypeId,
) -> MemberPointee {
    let universe = cx.universe;
    let key = evidence_key(cx, flat);

    if let Some(custom) = key.and_then(|k| cx.config.custom_ptr.get(&k)) {
        return classify(
            cx,
            Choice {
                target: custom.target,
                typedef: custom.typedef,
                evidence: PointeeEvidence::Explicit,
                adjust: 0,
                exprs: Vec::new(),
            },
            false,
        );
    }

    if let Some(attested) = key
        .and_then(|k| cx.config.container_of.get(&k))
        .filter(|v| !v.is_empty())
    {
        let mut pairs: Vec<(TypeId, i64)> = Vec::new();
        for t in attested {
            if !pairs.contains(&(t.record, t.offset)) {
                pairs.push((t.record, t.offset));
            }
        }
        if pairs.iter().all(|&(record, _)| record == pairs[0].0) {
            // One container type; a multi-hop cast chain sums its shifts.
            let shift = -pairs.iter().map(|&(_, off)| off).sum::<i64>();
            let exprs = attested
                .iter()
                .flat_map(|t| t.exprs.iter().cloned())
                .collect();
            return classify(
                cx,
                Choice {
                    target: pairs[0].0,
                    typedef: None,
                    evidence: PointeeEvidence::ContainerOf,
                    adjust: shift,
                    exprs,
                },
                false,
            );
        }
        let conflict = pairs
            .iter()
            .map(|&(record, off)| format!("{}{off:+}", universe.display_type(record)))
            .collect::<Vec<_>>()
            .join(", ");
        let mut out = classify(cx, Choice::declared(declared), false);
        out.container_conflict = Some(conflict);
        return out;
    }

    if universe.is_void(declared) {
        let candidates = leaf_key(cx, flat).and_then(|k| cx.config.pvoid.get(&k));
        if let Some(candidates) = candidates.filter(|v| !v.is_empty()) {
            let mut distinct: Vec<TypeId> = Vec::new();
            for &c in candidates {
                let walked = universe.walk_typedef_chain(c);
                if !distinct.contains(&walked) {
                    distinct.push(walked);
                }
            }
            if let [unique] = distinct.as_slice() {
                return classify(
                    cx,
                    Choice {
                        target: *unique,
                        typedef: None,
                        evidence: PointeeEvidence::VoidCast,
                        adjust: 0,
                        exprs: Vec::new(),
                    },
                    false,
                );
            }
            return MemberPointee::new(
                PointeeKind::Shaped(ResolvedPointee::OpaqueVoid { ambiguous: true }),
                PointeeEvidence::Declared,
            );
        }
        return MemberPointee::new(
            PointeeKind::Shaped(ResolvedPointee::OpaqueVoid { ambiguous: false }),
            PointeeEvidence::Declared,
        );
    }

    let walked = universe.walk_typedef_chain(declared);
    if universe.is_char(walked) {
        let stringy = evidence_key(cx, flat)
            .is_some_and(|k| cx.config.string_members.contains(&k));
        if stringy {
            return MemberPointee::new(
                PointeeKind::Shaped(ResolvedPointee::CString),
                PointeeEvidence::StringUse,
            );
        }
    }

    classify(cx, Choice::declared(declared), false)
}

/// Resolve an inner level of a pointer chain from its declaration.
/// Character cells become strings here; no per-level usage evidence
/// exists to gate them.
pub fn resolve_nested_pointee(cx: &GenCx<'_>, target: TypeId) -> MemberPointee {
    classify(cx, Choice::declared(target), true)
}

struct Choice {
    target: TypeId,
    typedef: Option<TypeId>,
    evidence: PointeeEvidence,
    adjust: i64,
    exprs: Vec<String>,
}

impl Choice {
    fn declared(target: TypeId) -> Self {
        Self {
            target,
            typedef: None,
            evidence: PointeeEvidence::Declared,
            adjust: 0,
            exprs: Vec::new(),
        }
    }
}

fn classify(cx: &GenCx<'_>, choice: Choice, chars_are_strings: bool) -> MemberPointee {
    let universe = cx.universe;
    if universe.user_annotated(choice.target) {
        return MemberPointee::new(
            PointeeKind::Shaped(ResolvedPointee::UserMemory),
            choice.evidence,
        );
    }

    let mut typedef = choice.typedef;
    let mut cur = choice.target;
    loop {
        match universe.type_of(cur) {
            Type::Typedef { target, .. } => {
                if typedef.is_none() {
                    typedef = Some(cur);
                }
                cur = *target;
            }
            Type::Attributed { target, .. } => cur = *target,
            _ => break,
        }
    }

    let shaped = |target: ResolvedPointee| {
        MemberPointee::new(PointeeKind::Shaped(target), choice.evidence)
    };
    match universe.type_of(cur) {
        Type::Record(rec) => {
            if rec.byte_size == 0 {
                shaped(ResolvedPointee::ZeroSized { record: cur })
            } else {
                shaped(ResolvedPointee::Record(RecordTarget {
                    record: cur,
                    typedef,
                    offset_adjust: choice.adjust,
                    source_exprs: choice.exprs,
                }))
            }
        }
        Type::RecordForward { tag, .. } => match universe.record_by_tag(*tag) {
            Ok(full) if universe.size_bytes(full) == 0 => {
                shaped(ResolvedPointee::ZeroSized { record: full })
            }
            Ok(full) => shaped(ResolvedPointee::Record(RecordTarget {
                record: full,
                typedef,
                offset_adjust: choice.adjust,
                source_exprs: choice.exprs,
            })),
            Err(_) => shaped(ResolvedPointee::UnresolvedForward { tag: *tag }),
        },
        Type::Enum { .. } | Type::EnumForward { .. } => shaped(ResolvedPointee::Enum { ty: cur }),
        Type::Builtin { .. } if universe.is_void(cur) => {
            shaped(ResolvedPointee::OpaqueVoid { ambiguous: false })
        }
        Type::Builtin { .. } if chars_are_strings && universe.is_char(cur) => {
            shaped(ResolvedPointee::CString)
        }
        Type::Builtin { .. } => shaped(ResolvedPointee::Scalar { ty: cur }),
        Type::Function => shaped(ResolvedPointee::Function),
        Type::Pointer { target } => {
            MemberPointee::new(PointeeKind::Nested { inner: *target }, choice.evidence)
        }
        Type::ConstArray { .. } | Type::IncompleteArray { .. } => {
            MemberPointee::new(PointeeKind::Complex, choice.evidence)
        }
        Type::Typedef { .. } | Type::Attributed { .. } => {
            MemberPointee::new(PointeeKind::Complex, choice.evidence)
        }
    }
}
