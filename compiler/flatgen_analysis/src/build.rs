//! Recipe construction for one subject type.
//!
//! Takes a subject through flattening, pointee resolution and count
//! inference and assembles the node list of its [`Recipe`]. Every member
//! that cannot be handled mechanically degrades to a stub or a note, and
//! every degradation lands in the report.
//!
//! Building one subject also yields the dependency edges the driver
//! queues: every record a node references must get its own recipe.

use flatgen_facts::{Record, Type};
use flatgen_ir::{
    CountPolicy, ElemRef, GenerationReport, Name, PointeeEvidence, Recipe, RecipeFlags,
    RecipeNode, RecipeNote, RecordRef, RecordTarget, ReportCategory, ResolvedPointee, StubCause,
    Subject, TypeId, TypeKey,
};
use tracing::debug;

use crate::count::infer_count;
use crate::flatten::{flatten_record, named_member_offset, EntryKind, FlatMember};
use crate::resolve::{
    evidence_key, resolve_member_pointee, resolve_nested_pointee, PointeeKind,
};
use crate::{GenCx, GenError};

/// Bridge record for a recipe published under a typedef of a tagged
/// record; the shared header aliases the two spellings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordTypedef {
    pub typedef_name: Name,
    pub tag: Name,
    pub record: TypeId,
}

/// Generated name assigned to an anonymous record or enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnonTypedef {
    pub record: TypeId,
    pub name: Name,
}

/// What building one subject produced.
#[derive(Debug, Default)]
pub struct BuildOutcome {
    /// `None` when the subject has no definition to generate from.
    pub recipe: Option<Recipe>,
    /// Subjects referenced by the recipe; the driver queues each one.
    pub deps: Vec<Subject>,
    pub record_typedefs: Vec<RecordTypedef>,
    pub anon_typedefs: Vec<AnonTypedef>,
}

/// Build the recipe for `subject`.
///
/// Operator-supplied bodies win over everything; blacklisted subjects
/// get an annotated empty recipe so the exclusion is visible in the
/// output; subjects with no reachable definition produce no recipe and a
/// report entry.
pub fn build_recipe(
    cx: &GenCx<'_>,
    subject: Subject,
    report: &mut GenerationReport,
) -> Result<BuildOutcome, GenError> {
    let universe = cx.universe;
    let key = cx.subject_key(subject);
    let label = key.render(universe.interner());

    if let Some(body) = cx.config.custom_recipes.get(&subject.type_id) {
        debug!(subject = %label, "using operator-supplied recipe body");
        return Ok(pinned_outcome(cx, subject, key, Some(body.clone()), Vec::new()));
    }

    let listed = if key.kind.is_typedef() {
        cx.config.blacklist_struct_types.contains(&key.name)
    } else {
        cx.config.blacklist_structs.contains(&key.name)
    };
    if listed {
        let category = if key.kind.is_typedef() {
            ReportCategory::BlacklistedStructType
        } else {
            ReportCategory::BlacklistedStruct
        };
        report.note_subject(category, label);
        let note = RecipeNode::Note {
            member: flatgen_ir::MemberSite::default(),
            note: RecipeNote::BlacklistedTarget { tag: key.name },
        };
        return Ok(pinned_outcome(cx, subject, key, None, vec![note]));
    }

    match universe.type_of(subject.type_id) {
        Type::Record(rec) => {
            let mut outcome = build_record(cx, key, subject.type_id, rec, report)?;
            if rec.tag.is_empty() {
                // A root can land on an anonymous record directly; its
                // generated typedef still has to reach the header.
                outcome.anon_typedefs.push(AnonTypedef {
                    record: subject.type_id,
                    name: subject.display,
                });
            }
            Ok(outcome)
        }
        Type::RecordForward { tag, .. } => match universe.record_by_tag(*tag) {
            Ok(full) => {
                let Type::Record(rec) = universe.type_of(full) else {
                    return Ok(BuildOutcome::default());
                };
                build_record(cx, key, full, rec, report)
            }
            Err(_) => {
                report.note_subject(ReportCategory::MissingDefinition, label);
                Ok(BuildOutcome::default())
            }
        },
        Type::Typedef { .. } => {
            let target = universe.canonical(subject.type_id);
            match universe.type_of(target) {
                Type::Record(rec) => {
                    let mut outcome = build_record(cx, key, target, rec, report)?;
                    bridge_typedef(&mut outcome, key, rec, target);
                    Ok(outcome)
                }
                Type::RecordForward { tag, .. } => match universe.record_by_tag(*tag) {
                    Ok(full) => {
                        let Type::Record(rec) = universe.type_of(full) else {
                            return Ok(BuildOutcome::default());
                        };
                        let mut outcome = build_record(cx, key, full, rec, report)?;
                        bridge_typedef(&mut outcome, key, rec, full);
                        Ok(outcome)
                    }
                    Err(_) => {
                        report.note_subject(
                            ReportCategory::MissingDefinition,
                            universe.display_type(target),
                        );
                        Ok(BuildOutcome::default())
                    }
                },
                _ => {
                    report.note_subject(ReportCategory::NonRecordSubject, label);
                    Ok(BuildOutcome::default())
                }
            }
        }
        _ => {
            report.note_subject(ReportCategory::NonRecordSubject, label);
            Ok(BuildOutcome::default())
        }
    }
}

fn bridge_typedef(outcome: &mut BuildOutcome, key: TypeKey, rec: &Record, record: TypeId) {
    if !rec.tag.is_empty() {
        outcome.record_typedefs.push(RecordTypedef {
            typedef_name: key.name,
            tag: rec.tag,
            record,
        });
    }
}

/// Recipe shell for custom-bodied and blacklisted subjects. The record
/// definition still supplies size and location when one exists.
fn pinned_outcome(
    cx: &GenCx<'_>,
    subject: Subject,
    key: TypeKey,
    custom_body: Option<String>,
    nodes: Vec<RecipeNode>,
) -> BuildOutcome {
    let universe = cx.universe;
    let mut flags = RecipeFlags::empty();
    if custom_body.is_some() {
        flags |= RecipeFlags::CUSTOM;
    }
    let resolved = universe.resolve_record_target(subject.type_id).map(|res| {
        match universe.type_of(res.record) {
            Type::RecordForward { tag, .. } => universe.record_by_tag(*tag).unwrap_or(res.record),
            _ => res.record,
        }
    });
    let (type_id, byte_size, location) = match resolved {
        Some(id) => match universe.type_of(id) {
            Type::Record(rec) => {
                if rec.tag.is_empty() {
                    flags |= RecipeFlags::ANON;
                }
                (id, rec.byte_size, rec.location)
            }
            _ => (subject.type_id, universe.size_bytes(subject.type_id), Name::EMPTY),
        },
        None => (
            subject.type_id,
            universe.size_bytes(subject.type_id),
            Name::EMPTY,
        ),
    };
    BuildOutcome {
        recipe: Some(Recipe {
            subject: key,
            type_id,
            byte_size,
            location,
            nodes,
            flags,
            custom_body,
        }),
        ..BuildOutcome::default()
    }
}

fn build_record(
    cx: &GenCx<'_>,
    key: TypeKey,
    record_id: TypeId,
    rec: &Record,
    report: &mut GenerationReport,
) -> Result<BuildOutcome, GenError> {
    let label = key.render(cx.universe.interner());
    debug!(subject = %label, "building recipe");

    let flat = flatten_record(cx, record_id)?;
    report.stats.members_seen = report
        .stats
        .members_seen
        .saturating_add(u32::try_from(flat.visited).unwrap_or(u32::MAX));

    let mut asm = Assembler {
        cx,
        label,
        report,
        nodes: Vec::new(),
        deps: Vec::new(),
        record_typedefs: Vec::new(),
        anon_typedefs: Vec::new(),
        union_followed: false,
    };
    let last_field = flat
        .members
        .iter()
        .rposition(|m| matches!(m.kind, EntryKind::Field));
    for (idx, m) in flat.members.iter().enumerate() {
        match m.kind {
            EntryKind::Field => asm.field(m, Some(idx) == last_field),
            EntryKind::Anchor => asm.anchor(m),
        }
    }

    let mut flags = RecipeFlags::empty();
    if rec.tag.is_empty() {
        flags |= RecipeFlags::ANON;
    }
    if rec.is_union && asm.union_followed {
        flags |= RecipeFlags::UNION_CHECK;
    }
    if asm
        .nodes
        .iter()
        .any(|n| matches!(n, RecipeNode::FlexibleArrayTail { .. }))
    {
        flags |= RecipeFlags::FLEXIBLE;
    }
    if asm.nodes.iter().any(|n| matches!(n, RecipeNode::Stub { .. })) {
        flags |= RecipeFlags::NEEDS_REVIEW;
    }

    Ok(BuildOutcome {
        recipe: Some(Recipe {
            subject: key,
            type_id: record_id,
            byte_size: rec.byte_size,
            location: rec.location,
            nodes: asm.nodes,
            flags,
            custom_body: None,
        }),
        deps: asm.deps,
        record_typedefs: asm.record_typedefs,
        anon_typedefs: asm.anon_typedefs,
    })
}

/// One built pointer level.
enum PtrStep {
    /// Node embeddable under a chain level, with the rendered C type of
    /// what the pointer at this level reaches.
    Leaf { node: RecipeNode, ctype: String },
    /// Note that replaces the whole member; chain levels are dropped.
    Bare(RecipeNode),
    /// No strategy for the target shape.
    Abort,
}

struct Assembler<'c, 'a, 'r> {
    cx: &'c GenCx<'a>,
    label: String,
    report: &'r mut GenerationReport,
    nodes: Vec<RecipeNode>,
    deps: Vec<Subject>,
    record_typedefs: Vec<RecordTypedef>,
    anon_typedefs: Vec<AnonTypedef>,
    union_followed: bool,
}

impl Assembler<'_, '_, '_> {
    fn path(&self, m: &FlatMember) -> String {
        m.site.dotted(self.cx.universe.interner())
    }

    fn note(&mut self, category: ReportCategory, path: &str) {
        self.report
            .note_member(category, self.label.clone(), path.to_owned());
    }

    fn field(&mut self, m: &FlatMember, is_last: bool) {
        let universe = self.cx.universe;
        let walked = universe.canonical(m.ty);
        match universe.type_of(walked) {
            Type::Pointer { target } => self.pointer(m, *target),
            Type::ConstArray { elem, total_bytes } => self.array(m, *elem, *total_bytes, false, is_last),
            Type::IncompleteArray { elem } => self.array(m, *elem, 0, true, is_last),
            _ => {}
        }
    }

    fn pointer(&mut self, m: &FlatMember, declared: TypeId) {
        self.report.stats.member_recipes += 1;
        let path = self.path(m);
        if !m.used {
            self.report.stats.not_used += 1;
            self.note(ReportCategory::NotUsedMember, &path);
            self.nodes.push(RecipeNode::Note {
                member: m.site.clone(),
                note: RecipeNote::NotUsed,
            });
            return;
        }

        // A pointer under a union only flattens when the operator named
        // its target; the live interpretation is otherwise unknowable.
        let vouched = evidence_key(self.cx, m)
            .is_some_and(|k| self.cx.config.custom_ptr.contains_key(&k));
        if m.site.in_union && !vouched {
            self.note(ReportCategory::PointerInUnion, &path);
            self.nodes.push(RecipeNode::Stub {
                member: m.site.clone(),
                cause: StubCause::PointerInUnion,
            });
            return;
        }

        match self.pointer_step(m, declared, 0) {
            PtrStep::Leaf { node, .. } => {
                if m.site.in_union {
                    self.union_followed = true;
                }
                self.nodes.push(node);
            }
            PtrStep::Bare(node) => self.nodes.push(node),
            PtrStep::Abort => {
                self.note(ReportCategory::ComplexPointerMember, &path);
                self.nodes.push(RecipeNode::Stub {
                    member: m.site.clone(),
                    cause: StubCause::ComplexPointer,
                });
            }
        }
    }

    fn pointer_step(&mut self, m: &FlatMember, declared: TypeId, depth: u8) -> PtrStep {
        let resolved = if depth == 0 {
            resolve_member_pointee(self.cx, m, declared)
        } else {
            resolve_nested_pointee(self.cx, declared)
        };
        if depth == 0 {
            let path = self.path(m);
            let conflicted = resolved.container_conflict.is_some();
            if let Some(detail) = resolved.container_conflict.clone() {
                self.report.note_member_detail(
                    ReportCategory::ContainerOfAmbiguous,
                    self.label.clone(),
                    path.clone(),
                    detail,
                );
            }
            if resolved.evidence == PointeeEvidence::VoidCast {
                self.report.note_member_detail(
                    ReportCategory::VoidResolved,
                    self.label.clone(),
                    path.clone(),
                    self.kind_display(&resolved.kind),
                );
            }
            if let PointeeKind::Shaped(ResolvedPointee::OpaqueVoid { ambiguous }) = &resolved.kind
            {
                if resolved.evidence == PointeeEvidence::Declared && !conflicted {
                    let category = if *ambiguous {
                        ReportCategory::VoidAmbiguous
                    } else {
                        ReportCategory::VoidUnresolved
                    };
                    self.note(category, &path);
                }
            }
        }

        match resolved.kind {
            PointeeKind::Shaped(shape) => {
                self.leaf_step(m, shape, resolved.evidence, declared, depth)
            }
            PointeeKind::Nested { inner } => match self.pointer_step(m, inner, depth + 1) {
                PtrStep::Leaf { node, ctype } => {
                    let cell = format!("{ctype}*");
                    let mut site = m.site.clone();
                    site.depth = depth;
                    let chained = RecipeNode::PointerChain {
                        member: site,
                        inner_ctype: self.cx.universe.interner().intern(&cell),
                        inner: Box::new(node),
                    };
                    PtrStep::Leaf {
                        node: chained,
                        ctype: cell,
                    }
                }
                other => other,
            },
            PointeeKind::Complex => PtrStep::Abort,
        }
    }

    fn leaf_step(
        &mut self,
        m: &FlatMember,
        shape: ResolvedPointee,
        evidence: PointeeEvidence,
        declared: TypeId,
        depth: u8,
    ) -> PtrStep {
        let universe = self.cx.universe;
        let path = self.path(m);
        let mut site = m.site.clone();
        site.depth = depth;
        match shape {
            ResolvedPointee::Record(target) => {
                let count = self.count_policy(m, depth, &path);
                self.note(ReportCategory::StructPointer, &path);
                if count.is_safe() {
                    self.note(ReportCategory::VerifiedStructPointer, &path);
                }
                let (rref, ctype) = self.record_target_ref(&target);
                PtrStep::Leaf {
                    node: RecipeNode::FollowRecordPointer {
                        target: rref,
                        member: site,
                        count,
                        offset_adjust: target.offset_adjust,
                        source_exprs: target.source_exprs,
                    },
                    ctype,
                }
            }
            ResolvedPointee::Scalar { ty } => {
                let count = self.count_policy(m, depth, &path);
                self.note(ReportCategory::BuiltinPointer, &path);
                let type_name = match universe.type_of(ty) {
                    Type::Builtin { name, .. } => *name,
                    _ => universe.interner().intern_owned(universe.display_type(ty)),
                };
                PtrStep::Leaf {
                    node: RecipeNode::FollowScalarPointer {
                        type_name,
                        member: site,
                        count,
                    },
                    ctype: universe.interner().lookup(type_name).to_owned(),
                }
            }
            ResolvedPointee::Enum { ty } => {
                let count = self.count_policy(m, depth, &path);
                self.note(ReportCategory::EnumPointer, &path);
                let text = self.enum_type_name(ty);
                PtrStep::Leaf {
                    node: RecipeNode::FollowEnumPointer {
                        type_name: universe.interner().intern(&text),
                        byte_size: universe.size_bytes(ty),
                        member: site,
                        count,
                    },
                    ctype: text,
                }
            }
            ResolvedPointee::CString => {
                self.note(ReportCategory::CharPointer, &path);
                PtrStep::Leaf {
                    node: RecipeNode::CString { member: site },
                    ctype: String::from("char"),
                }
            }
            ResolvedPointee::Function => PtrStep::Leaf {
                node: RecipeNode::FunctionPointer { member: site },
                ctype: String::from("void"),
            },
            ResolvedPointee::OpaqueVoid { .. } => {
                if depth > 0 {
                    self.note(ReportCategory::VoidUnresolved, &path);
                }
                let count = self.count_policy(m, depth, &path);
                PtrStep::Leaf {
                    node: RecipeNode::FollowOpaquePointer {
                        member: site,
                        count,
                    },
                    ctype: String::from("unsigned char"),
                }
            }
            ResolvedPointee::UserMemory => {
                self.report.stats.user_memory += 1;
                self.note(ReportCategory::UserMemoryPointer, &path);
                PtrStep::Bare(RecipeNode::Note {
                    member: m.site.clone(),
                    note: RecipeNote::UserMemory,
                })
            }
            ResolvedPointee::ZeroSized { record } => {
                self.note(ReportCategory::ZeroSizePointee, &path);
                let tag = self.record_display_name(record);
                PtrStep::Bare(RecipeNode::Note {
                    member: m.site.clone(),
                    note: RecipeNote::ZeroSizePointee { tag },
                })
            }
            ResolvedPointee::UnresolvedForward { tag } => {
                if evidence == PointeeEvidence::Declared {
                    let fwd = universe.walk_typedef_chain(declared);
                    self.deps.push(self.cx.subject_for(fwd));
                }
                let text = format!("struct {}", universe.interner().lookup(tag));
                PtrStep::Leaf {
                    node: RecipeNode::Note {
                        member: site,
                        note: RecipeNote::MissingDefinition { tag },
                    },
                    ctype: text,
                }
            }
        }
    }

    fn array(
        &mut self,
        m: &FlatMember,
        elem: TypeId,
        total_bytes: u64,
        incomplete: bool,
        is_last: bool,
    ) {
        self.report.stats.member_recipes += 1;
        let universe = self.cx.universe;
        let path = self.path(m);

        let mut typedef = None;
        let mut cur = elem;
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

        match universe.type_of(cur) {
            Type::Record(_) | Type::RecordForward { .. } => {
                let record_id = match universe.type_of(cur) {
                    Type::RecordForward { tag, .. } => match universe.record_by_tag(*tag) {
                        Ok(full) => full,
                        Err(_) => {
                            self.nodes.push(RecipeNode::Note {
                                member: m.site.clone(),
                                note: RecipeNote::MissingDefinition { tag: *tag },
                            });
                            self.deps.push(self.cx.subject_for(cur));
                            return;
                        }
                    },
                    _ => cur,
                };
                if incomplete {
                    self.note(ReportCategory::IncompleteArrayStorage, &path);
                    self.nodes.push(RecipeNode::Stub {
                        member: m.site.clone(),
                        cause: StubCause::IncompleteArrayStorage,
                    });
                    return;
                }
                let elem_size = universe.size_bytes(record_id);
                let target = RecordTarget {
                    record: record_id,
                    typedef,
                    offset_adjust: 0,
                    source_exprs: Vec::new(),
                };
                if total_bytes == 0 || elem_size == 0 {
                    let (rref, _) = self.record_target_ref(&target);
                    self.flexible(m, ElemRef::Record(rref), is_last, &path);
                    return;
                }
                let (rref, _) = self.record_target_ref(&target);
                self.nodes.push(RecipeNode::CopyRecordArray {
                    elem: rref,
                    elems: total_bytes / elem_size,
                    member: m.site.clone(),
                });
            }
            Type::Builtin { name, .. } => {
                if incomplete || total_bytes == 0 {
                    self.flexible(m, ElemRef::Scalar { type_name: *name }, is_last, &path);
                }
            }
            Type::Enum { .. } | Type::EnumForward { .. } => {
                if incomplete || total_bytes == 0 {
                    let text = self.enum_type_name(cur);
                    let type_name = universe.interner().intern(&text);
                    self.flexible(m, ElemRef::Scalar { type_name }, is_last, &path);
                }
            }
            _ => {
                self.note(ReportCategory::ComplexMember, &path);
                self.nodes.push(RecipeNode::Stub {
                    member: m.site.clone(),
                    cause: StubCause::ComplexMember,
                });
            }
        }
    }

    fn flexible(&mut self, m: &FlatMember, elem: ElemRef, is_last: bool, path: &str) {
        self.note(ReportCategory::FlexibleArrayMember, path);
        if is_last {
            self.nodes.push(RecipeNode::FlexibleArrayTail {
                elem,
                member: m.site.clone(),
            });
        } else {
            self.nodes.push(RecipeNode::Stub {
                member: m.site.clone(),
                cause: StubCause::FlexibleMidRecord,
            });
        }
    }

    /// Replace the raw link-pointer leaves of a list anchor with one
    /// traversal over the attested element type.
    fn anchor(&mut self, m: &FlatMember) {
        let Some(key) = evidence_key(self.cx, m) else {
            return;
        };
        let Some(link) = self.cx.config.list_links.get(&key).copied() else {
            return;
        };
        let universe = self.cx.universe;
        let Some(link_offset) =
            named_member_offset(universe, link.container, link.link, self.cx.anon_marker)
        else {
            return;
        };
        self.nodes.retain(|n| !under_site(n.member(), &m.site));
        let subject = self.cx.subject_for(link.container);
        let rref = self.cx.record_ref(subject, link.container);
        self.deps.push(subject);
        self.nodes.push(RecipeNode::ListTraversal {
            container: rref,
            link_offset,
            member: m.site.clone(),
        });
    }

    fn count_policy(&mut self, m: &FlatMember, depth: u8, path: &str) -> CountPolicy {
        let count = infer_count(self.cx, m, depth);
        if let Some(cause) = count.probe_cause() {
            self.report.stats.not_safe += 1;
            self.report.note_member_detail(
                ReportCategory::CountAmbiguous,
                self.label.clone(),
                path.to_owned(),
                cause.describe(),
            );
        }
        count
    }

    /// Reference a record target: registers the dependency edge plus any
    /// typedef or generated-name bridge, and yields the rendered C type.
    fn record_target_ref(&mut self, target: &RecordTarget) -> (RecordRef, String) {
        let universe = self.cx.universe;
        let subject = match target.typedef {
            Some(td) => self.cx.subject_for(td),
            None => self.cx.subject_for(target.record),
        };
        let rref = self.cx.record_ref(subject, target.record);
        self.deps.push(subject);

        let ctype = match universe.type_of(target.record) {
            Type::Record(rec) if rec.tag.is_empty() => {
                let name = match target.typedef {
                    Some(_) => subject.display,
                    None => {
                        let name = universe.anon_type_name(target.record);
                        self.anon_typedefs.push(AnonTypedef {
                            record: target.record,
                            name,
                        });
                        name
                    }
                };
                universe.interner().lookup(name).to_owned()
            }
            Type::Record(rec) => match target.typedef {
                Some(_) => {
                    self.record_typedefs.push(RecordTypedef {
                        typedef_name: subject.display,
                        tag: rec.tag,
                        record: target.record,
                    });
                    universe.interner().lookup(subject.display).to_owned()
                }
                None => universe.display_type(target.record),
            },
            _ => universe.display_type(target.record),
        };
        (rref, ctype)
    }

    fn enum_type_name(&mut self, ty: TypeId) -> String {
        let universe = self.cx.universe;
        match universe.type_of(ty) {
            Type::Enum { tag, .. } | Type::EnumForward { tag } if !tag.is_empty() => {
                format!("enum {}", universe.interner().lookup(*tag))
            }
            _ => {
                let name = universe.anon_type_name(ty);
                self.anon_typedefs.push(AnonTypedef { record: ty, name });
                universe.interner().lookup(name).to_owned()
            }
        }
    }

    fn record_display_name(&self, record: TypeId) -> Name {
        let universe = self.cx.universe;
        match universe.type_of(record) {
            Type::Record(rec) if !rec.tag.is_empty() => rec.tag,
            _ => universe.anon_type_name(record),
        }
    }

    fn kind_display(&self, kind: &PointeeKind) -> String {
        let universe = self.cx.universe;
        match kind {
            PointeeKind::Shaped(ResolvedPointee::Record(t)) => universe.display_type(t.record),
            PointeeKind::Shaped(ResolvedPointee::Scalar { ty } | ResolvedPointee::Enum { ty }) => {
                universe.display_type(*ty)
            }
            PointeeKind::Shaped(ResolvedPointee::ZeroSized { record }) => {
                universe.display_type(*record)
            }
            _ => String::from("void"),
        }
    }
}

/// True when `site` lies strictly below `anchor` in the member tree.
fn under_site(site: &flatgen_ir::MemberSite, anchor: &flatgen_ir::MemberSite) -> bool {
    site.path.len() > anchor.path.len()
        && site.path.iter().zip(anchor.path.iter()).all(|(a, b)| a == b)
}
