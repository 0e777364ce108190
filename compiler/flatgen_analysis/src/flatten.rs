//! Record member flattening.
//!
//! Walks a record definition depth-first in declaration order, expanding
//! nested record members in place, and yields one entry per leaf member
//! with its dotted path and absolute byte offset. Pointers, arrays and
//! scalars are leaves here; what to do with each is the builder's call.
//!
//! Two addressing frames travel with every member. The *path* is the true
//! dotted chain from the subject root, used for rendered member names and
//! offsets. The *evidence frame* (`enclosing` + `eref`) is the innermost
//! named record and the chain within it, which is how usage evidence from
//! the source scan keys members: a `container_of` attested on
//! `tasks.next` keys to the outer record when `list_head` is a
//! configured anchor type, and to `list_head` itself otherwise.
//!
//! The member tables carry declaration-only entries that own no offset
//! slot: nested record declarations, and anonymous records that the next
//! entry materializes as its instance type. Both are skipped here; an
//! anonymous declaration *not* picked up by the next entry is a C11
//! anonymous member and is walked like any instance.

use flatgen_facts::{Member, Record, Type, Universe};
use flatgen_ir::{MemberPath, MemberSite, Name, TypeId};
use smallvec::SmallVec;

use crate::{GenCx, GenError};

/// Whether the entry is a leaf member or the re-emission of an anchor
/// member after all of its leaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Field,
    Anchor,
}

/// One entry of a flattened record.
#[derive(Debug, Clone)]
pub struct FlatMember {
    pub kind: EntryKind,
    /// Declared type of the member, aliases not walked.
    pub ty: TypeId,
    /// True dotted path and byte offset from the subject base.
    pub site: MemberSite,
    /// Innermost named record the member keys evidence under.
    pub enclosing: TypeId,
    /// Dotted chain within `enclosing`, ending with the member's own
    /// name; anonymous segments are elided.
    pub eref: MemberPath,
    pub used: bool,
}

impl FlatMember {
    /// Evidence-frame chain as one dotted string.
    pub fn eref_dotted(&self, universe: &Universe) -> String {
        flatgen_ir::render_path(&self.eref, universe)
    }
}

/// A fully flattened record.
#[derive(Debug, Default)]
pub struct Flattened {
    pub members: Vec<FlatMember>,
    /// Members visited during the walk, nested record members included.
    pub visited: u64,
}

/// Flatten the full record `record_id` down to its leaf members.
///
/// Top-level members are filtered by the per-record allow list when the
/// configuration carries one; members named in the global ignore list are
/// dropped wherever they appear, subtree included.
pub fn flatten_record(cx: &GenCx<'_>, record_id: TypeId) -> Result<Flattened, GenError> {
    let universe = cx.universe;
    let Type::Record(rec) = universe.type_of(record_id) else {
        return Ok(Flattened::default());
    };

    let mut walker = Walker {
        cx,
        out: Vec::new(),
        visited: 0,
        stack: SmallVec::new(),
    };
    walker.stack.push(record_id);

    let allowed = cx.config.allowed_members.get(&rec.tag);
    let mut slot = 0usize;
    for (i, member) in rec.members.iter().enumerate() {
        if skip_decl_entry(universe, rec, i, cx.anon_marker) {
            continue;
        }
        let Some(&bits) = rec.offsets_bits.get(slot) else {
            return Err(inconsistent(cx, rec));
        };
        slot += 1;
        if let Some(allowed) = allowed {
            if !allowed.contains(&member.name) {
                continue;
            }
        }
        let mut eref = MemberPath::new();
        if member.name != cx.anon_marker {
            eref.push(member.name);
        }
        walker.push_member(*member, bits, MemberPath::new(), eref, record_id, rec.is_union)?;
    }

    Ok(Flattened {
        members: walker.out,
        visited: walker.visited,
    })
}

/// Byte offset of a named top-level member, assigning offset slots the
/// same way the flattening walk does.
pub(crate) fn named_member_offset(
    universe: &Universe,
    record_id: TypeId,
    name: Name,
    anon_marker: Name,
) -> Option<u64> {
    let Type::Record(rec) = universe.type_of(record_id) else {
        return None;
    };
    let mut slot = 0usize;
    for (i, member) in rec.members.iter().enumerate() {
        if skip_decl_entry(universe, rec, i, anon_marker) {
            continue;
        }
        let bits = *rec.offsets_bits.get(slot)?;
        slot += 1;
        if member.name == name {
            return Some(bits / 8);
        }
    }
    None
}

struct Walker<'c, 'a> {
    cx: &'c GenCx<'a>,
    out: Vec<FlatMember>,
    visited: u64,
    /// Records on the inline expansion path, to cut self-containing
    /// member tables a malformed database could carry.
    stack: SmallVec<[TypeId; 8]>,
}

impl<'a> Walker<'_, 'a> {
    fn push_member(
        &mut self,
        member: Member,
        abs_bits: u64,
        prefix: MemberPath,
        eref: MemberPath,
        enclosing: TypeId,
        in_union: bool,
    ) -> Result<(), GenError> {
        if self.cx.config.ignore_refnames.contains(&member.name) {
            return Ok(());
        }
        self.visited += 1;

        let universe = self.cx.universe;
        let walked = universe.walk_typedef_chain(member.ty);
        if let Type::Record(inner) = universe.type_of(walked) {
            if self.stack.contains(&walked) {
                return Ok(());
            }
            return self.expand_record(member, walked, inner, abs_bits, prefix, eref, enclosing, in_union);
        }

        let mut path = prefix;
        if member.name != self.cx.anon_marker {
            path.push(member.name);
        }
        self.out.push(FlatMember {
            kind: EntryKind::Field,
            ty: member.ty,
            site: MemberSite {
                path,
                byte_offset: abs_bits / 8,
                in_union,
                depth: 0,
            },
            enclosing,
            eref,
            used: member.used,
        });
        Ok(())
    }

    #[expect(clippy::too_many_arguments, reason = "Expansion threads both addressing frames")]
    fn expand_record(
        &mut self,
        member: Member,
        inner_id: TypeId,
        inner: &Record,
        abs_bits: u64,
        prefix: MemberPath,
        eref: MemberPath,
        enclosing: TypeId,
        in_union: bool,
    ) -> Result<(), GenError> {
        let universe = self.cx.universe;
        let is_anon_member = member.name == self.cx.anon_marker;
        let is_anchor =
            !inner.tag.is_empty() && self.cx.config.anchor_types.contains(&inner.tag);

        let mut child_prefix = prefix.clone();
        if !is_anon_member {
            child_prefix.push(member.name);
        }
        // Named non-anchor members re-key the evidence frame to the inner
        // record; anchors and anonymous members keep the outer frame so
        // chains like `tasks.next` stay addressable from the outside.
        let (child_enclosing, base_eref) = if is_anon_member || is_anchor {
            (enclosing, eref.clone())
        } else {
            (inner_id, MemberPath::new())
        };
        let child_union = in_union || inner.is_union;

        self.stack.push(inner_id);
        let mut slot = 0usize;
        for (i, child) in inner.members.iter().enumerate() {
            if skip_decl_entry(universe, inner, i, self.cx.anon_marker) {
                continue;
            }
            let Some(&bits) = inner.offsets_bits.get(slot) else {
                self.stack.pop();
                return Err(inconsistent(self.cx, inner));
            };
            slot += 1;
            let mut child_eref = base_eref.clone();
            if child.name != self.cx.anon_marker {
                child_eref.push(child.name);
            }
            self.push_member(
                *child,
                abs_bits + bits,
                child_prefix.clone(),
                child_eref,
                child_enclosing,
                child_union,
            )?;
        }
        self.stack.pop();

        if is_anchor {
            self.out.push(FlatMember {
                kind: EntryKind::Anchor,
                ty: member.ty,
                site: MemberSite {
                    path: child_prefix,
                    byte_offset: abs_bits / 8,
                    in_union,
                    depth: 0,
                },
                enclosing,
                eref,
                used: member.used,
            });
        }
        Ok(())
    }
}

/// Declaration entries that own no offset slot are dropped: named nested
/// declarations always, anonymous ones only when the next entry
/// materializes them as its instance type.
fn skip_decl_entry(universe: &Universe, rec: &Record, i: usize, anon_marker: Name) -> bool {
    let member = &rec.members[i];
    if !member.decl_only {
        return false;
    }
    if member.name != anon_marker {
        return true;
    }
    rec.members
        .get(i + 1)
        .is_some_and(|next| anon_dependent(universe, member.ty, next.ty))
}

fn anon_dependent(universe: &Universe, decl: TypeId, next: TypeId) -> bool {
    if next == decl {
        return true;
    }
    match universe.type_of(next) {
        Type::ConstArray { elem, .. } | Type::IncompleteArray { elem } => *elem == decl,
        Type::Pointer { target } => *target == decl,
        _ => false,
    }
}

fn inconsistent(cx: &GenCx<'_>, rec: &Record) -> GenError {
    GenError::InconsistentRecord {
        tag: cx.universe.interner().lookup(rec.tag).to_owned(),
        members: rec.members.len(),
        offsets: rec.offsets_bits.len(),
    }
}
