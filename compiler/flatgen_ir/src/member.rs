//! Flattened member addressing.
//!
//! After record flattening every leaf member is addressed by a dotted path
//! from the subject root plus a byte offset. Both travel together through
//! resolution, counting and emission as a [`MemberSite`].

use crate::{Name, StringLookup};
use smallvec::SmallVec;

/// Dotted member path from the subject root, anonymous hops elided.
///
/// Four inline segments cover the nesting depth seen in practice.
pub type MemberPath = SmallVec<[Name; 4]>;

/// Where a flattened member lives inside its subject.
#[derive(Clone, Eq, PartialEq, Debug, Default)]
pub struct MemberSite {
    pub path: MemberPath,
    /// Byte offset from the subject root.
    pub byte_offset: u64,
    /// True when any record on the path down to this member is a union.
    pub in_union: bool,
    /// Pointer-chain nesting level; 0 for a member reached directly.
    pub depth: u8,
}

impl MemberSite {
    pub fn new(path: MemberPath, byte_offset: u64) -> Self {
        Self {
            path,
            byte_offset,
            in_union: false,
            depth: 0,
        }
    }

    /// Render the dotted path, e.g. `stats.rx.bytes`.
    pub fn dotted(&self, lookup: &impl StringLookup) -> String {
        render_path(&self.path, lookup)
    }

    /// Last path segment, the member's own name.
    pub fn leaf(&self) -> Name {
        self.path.last().copied().unwrap_or(Name::EMPTY)
    }
}

/// Join path segments with dots.
pub fn render_path(path: &[Name], lookup: &impl StringLookup) -> String {
    let mut out = String::new();
    for (i, seg) in path.iter().enumerate() {
        if i > 0 {
            out.push('.');
        }
        out.push_str(lookup.lookup(*seg));
    }
    out
}
