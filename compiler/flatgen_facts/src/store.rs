//! The loaded type universe.
//!
//! Types, globals and functions from the fact database, remapped to dense
//! [`TypeId`]s with all strings interned. Read-only for the run; the only
//! interior state is the anonymous-name cache, which hands out stable
//! generated typedef names per anonymous type.

use flatgen_ir::{Name, SharedInterner, StringLookup, TypeId};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::FactsError;

/// Pointer width of the target, in bytes.
pub const POINTER_SIZE: u64 = 8;

/// One record member entry.
///
/// Declaration-only entries are kept so the flattener can apply the
/// offset-slot correction exactly the way the extractor encoded it.
#[derive(Debug, Clone, Copy)]
pub struct Member {
    pub name: Name,
    pub ty: TypeId,
    /// False when the member is never dereferenced anywhere in the
    /// analyzed code.
    pub used: bool,
    /// Entry declares a nested record rather than an instance.
    pub decl_only: bool,
}

/// A struct or union definition.
#[derive(Debug, Clone)]
pub struct Record {
    /// Tag, `Name::EMPTY` for anonymous records.
    pub tag: Name,
    pub is_union: bool,
    pub byte_size: u64,
    /// `file:line` of the definition, `Name::EMPTY` if unknown.
    pub location: Name,
    pub members: Vec<Member>,
    /// Bit offsets, one per member entry that is not skipped by the
    /// declaration rule; shorter than `members`.
    pub offsets_bits: Vec<u64>,
}

/// One entry of the type universe.
#[derive(Debug, Clone)]
pub enum Type {
    Builtin { name: Name, byte_size: u64 },
    Record(Record),
    RecordForward { tag: Name, is_union: bool },
    Enum { tag: Name, byte_size: u64 },
    EnumForward { tag: Name },
    Typedef { name: Name, target: TypeId },
    Pointer { target: TypeId },
    ConstArray { elem: TypeId, total_bytes: u64 },
    IncompleteArray { elem: TypeId },
    Attributed { target: TypeId, user_memory: bool },
    Function,
}

/// A kernel global variable.
#[derive(Debug, Clone)]
pub struct Global {
    pub name: Name,
    pub ty: TypeId,
    /// Defining source file.
    pub file: Name,
    /// Stable symbol hash carried into the generated handler.
    pub hash: Name,
    /// Owning module basename, `vmlinux` when ambiguous or absent.
    pub module: Name,
}

/// A function from the call graph.
#[derive(Debug, Clone)]
pub struct Function {
    pub id: u64,
    pub name: Name,
    pub nargs: u32,
    /// Return type followed by argument types.
    pub types: Vec<TypeId>,
    /// Ids of directly called functions.
    pub calls: Vec<u64>,
}

/// Result of walking wrappers down to a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordResolution {
    /// The record or record-forward reached.
    pub record: TypeId,
    /// The typedef that directly named the record, when the walk ended
    /// through one.
    pub typedef: Option<TypeId>,
}

#[derive(Debug)]
struct AnonNames {
    next: u32,
    cache: FxHashMap<TypeId, Name>,
}

/// The immutable fact universe.
#[derive(Debug)]
pub struct Universe {
    pub(crate) types: Vec<Type>,
    pub(crate) const_flags: Vec<bool>,
    pub(crate) records_by_tag: FxHashMap<Name, SmallVec<[TypeId; 2]>>,
    pub(crate) typedefs_by_name: FxHashMap<Name, SmallVec<[TypeId; 2]>>,
    pub(crate) builtins_by_name: FxHashMap<Name, TypeId>,
    pub(crate) globals: Vec<Global>,
    pub(crate) globals_by_name: FxHashMap<Name, SmallVec<[u32; 2]>>,
    pub(crate) functions: Vec<Function>,
    pub(crate) functions_by_name: FxHashMap<Name, SmallVec<[u32; 2]>>,
    pub(crate) functions_by_id: FxHashMap<u64, u32>,
    pub(crate) interner: SharedInterner,
    anon_names: Mutex<AnonNames>,
}

impl Universe {
    pub(crate) fn new(interner: SharedInterner) -> Self {
        Self {
            types: Vec::new(),
            const_flags: Vec::new(),
            records_by_tag: FxHashMap::default(),
            typedefs_by_name: FxHashMap::default(),
            builtins_by_name: FxHashMap::default(),
            globals: Vec::new(),
            globals_by_name: FxHashMap::default(),
            functions: Vec::new(),
            functions_by_name: FxHashMap::default(),
            functions_by_id: FxHashMap::default(),
            interner,
            anon_names: Mutex::new(AnonNames {
                next: 0,
                cache: FxHashMap::default(),
            }),
        }
    }

    pub fn interner(&self) -> &SharedInterner {
        &self.interner
    }

    pub fn types_count(&self) -> usize {
        self.types.len()
    }

    pub fn type_of(&self, id: TypeId) -> &Type {
        &self.types[id.index()]
    }

    pub fn is_const(&self, id: TypeId) -> bool {
        self.const_flags[id.index()]
    }

    /// Look up the unique full definition of a record tag. The database
    /// carries const-qualified duplicates of many records; those never
    /// shadow the unqualified entry.
    pub fn record_by_tag(&self, tag: Name) -> Result<TypeId, FactsError> {
        let all = self.records_by_tag.get(&tag).map_or(&[] as &[TypeId], SmallVec::as_slice);
        let unqualified: SmallVec<[TypeId; 2]> =
            all.iter().copied().filter(|&id| !self.is_const(id)).collect();
        let pool = if unqualified.is_empty() {
            all
        } else {
            unqualified.as_slice()
        };
        match pool {
            [] => Err(FactsError::RecordNotFound {
                tag: self.interner.lookup(tag).to_owned(),
            }),
            [id] => Ok(*id),
            ids => Err(FactsError::RecordAmbiguous {
                tag: self.interner.lookup(tag).to_owned(),
                count: ids.len(),
            }),
        }
    }

    /// Look up a builtin by its spelling.
    pub fn builtin_by_name(&self, name: Name) -> Option<TypeId> {
        self.builtins_by_name.get(&name).copied()
    }

    /// Look up the unique typedef with this name.
    pub fn typedef_by_name(&self, name: Name) -> Result<TypeId, FactsError> {
        match self.typedefs_by_name.get(&name).map(SmallVec::as_slice) {
            None | Some([]) => Err(FactsError::TypedefNotFound {
                name: self.interner.lookup(name).to_owned(),
            }),
            Some([id]) => Ok(*id),
            Some(ids) => Err(FactsError::TypedefAmbiguous {
                name: self.interner.lookup(name).to_owned(),
                count: ids.len(),
            }),
        }
    }

    /// Follow typedef links to the first non-typedef type.
    pub fn walk_typedef_chain(&self, id: TypeId) -> TypeId {
        let mut cur = id;
        while let Type::Typedef { target, .. } = self.type_of(cur) {
            cur = *target;
        }
        cur
    }

    /// Strip attribute wrappers, keeping the underlying type.
    pub fn non_const(&self, id: TypeId) -> TypeId {
        let mut cur = id;
        while let Type::Attributed { target, .. } = self.type_of(cur) {
            cur = *target;
        }
        cur
    }

    /// Follow both typedef links and attribute wrappers.
    pub fn canonical(&self, id: TypeId) -> TypeId {
        let mut cur = id;
        loop {
            match self.type_of(cur) {
                Type::Typedef { target, .. } | Type::Attributed { target, .. } => cur = *target,
                _ => return cur,
            }
        }
    }

    /// True when any wrapper on the alias chain marks user-space memory.
    pub fn user_annotated(&self, id: TypeId) -> bool {
        let mut cur = id;
        loop {
            match self.type_of(cur) {
                Type::Attributed {
                    target,
                    user_memory,
                } => {
                    if *user_memory {
                        return true;
                    }
                    cur = *target;
                }
                Type::Typedef { target, .. } => cur = *target,
                _ => return false,
            }
        }
    }

    /// Walk pointers, arrays, typedefs and attribute wrappers down to a
    /// record or record-forward, remembering the typedef that directly
    /// named it. Crossing a pointer or array resets the remembered
    /// typedef, since that typedef names the pointer, not the record.
    pub fn resolve_record_target(&self, id: TypeId) -> Option<RecordResolution> {
        let mut cur = id;
        let mut typedef = None;
        loop {
            match self.type_of(cur) {
                Type::Typedef { target, .. } => {
                    typedef = Some(cur);
                    cur = *target;
                }
                Type::Attributed { target, .. } => cur = *target,
                Type::Pointer { target } => {
                    typedef = None;
                    cur = *target;
                }
                Type::ConstArray { elem, .. } | Type::IncompleteArray { elem } => {
                    typedef = None;
                    cur = *elem;
                }
                Type::Record(_) | Type::RecordForward { .. } => {
                    return Some(RecordResolution {
                        record: cur,
                        typedef,
                    });
                }
                _ => return None,
            }
        }
    }

    /// Byte size of a type, through aliases. Unsized shapes report 0.
    pub fn size_bytes(&self, id: TypeId) -> u64 {
        match self.type_of(id) {
            Type::Builtin { byte_size, .. } | Type::Enum { byte_size, .. } => *byte_size,
            Type::Record(record) => record.byte_size,
            Type::RecordForward { tag, .. } => self
                .record_by_tag(*tag)
                .map_or(0, |full| self.size_bytes(full)),
            Type::Typedef { target, .. } | Type::Attributed { target, .. } => {
                self.size_bytes(*target)
            }
            Type::Pointer { .. } => POINTER_SIZE,
            Type::ConstArray { total_bytes, .. } => *total_bytes,
            Type::IncompleteArray { .. } | Type::EnumForward { .. } | Type::Function => 0,
        }
    }

    /// Plain `char` exactly; the string heuristic never fires for the
    /// explicitly signed or unsigned spellings.
    pub fn is_char(&self, id: TypeId) -> bool {
        matches!(self.type_of(id), Type::Builtin { name, .. }
            if self.interner.lookup(*name) == "char")
    }

    pub fn is_void(&self, id: TypeId) -> bool {
        matches!(self.type_of(id), Type::Builtin { name, .. }
            if self.interner.lookup(*name) == "void")
    }

    /// Stable generated typedef name for an anonymous record or enum.
    pub fn anon_type_name(&self, id: TypeId) -> Name {
        let mut guard = self.anon_names.lock();
        if let Some(name) = guard.cache.get(&id) {
            return *name;
        }
        let n = guard.next;
        guard.next += 1;
        let text = match self.type_of(id) {
            Type::Enum { .. } | Type::EnumForward { .. } => format!("anonenum_type_{n}_t"),
            _ => format!("anonstruct_type_{n}_t"),
        };
        let name = self.interner.intern_owned(text);
        guard.cache.insert(id, name);
        name
    }

    /// Find the unique global with this name whose defining file ends with
    /// `file_suffix` (empty suffix matches any file).
    pub fn global_by_name(&self, name: &str, file_suffix: &str) -> Result<&Global, FactsError> {
        let Ok(interned) = self.interner.try_intern(name) else {
            return Err(FactsError::GlobalNotFound {
                name: name.to_owned(),
            });
        };
        let empty = SmallVec::new();
        let candidates = self.globals_by_name.get(&interned).unwrap_or(&empty);
        let matched: Vec<&Global> = candidates
            .iter()
            .map(|&idx| &self.globals[idx as usize])
            .filter(|g| {
                file_suffix.is_empty() || self.interner.lookup(g.file).ends_with(file_suffix)
            })
            .collect();
        match matched.as_slice() {
            [] => Err(FactsError::GlobalNotFound {
                name: name.to_owned(),
            }),
            [global] => Ok(global),
            many => Err(FactsError::GlobalAmbiguous {
                name: name.to_owned(),
                count: many.len(),
            }),
        }
    }

    /// Find the unique function with this name.
    pub fn function_by_name(&self, name: &str) -> Result<&Function, FactsError> {
        let Ok(interned) = self.interner.try_intern(name) else {
            return Err(FactsError::FunctionNotFound {
                name: name.to_owned(),
            });
        };
        match self
            .functions_by_name
            .get(&interned)
            .map(SmallVec::as_slice)
        {
            None | Some([]) => Err(FactsError::FunctionNotFound {
                name: name.to_owned(),
            }),
            Some([idx]) => Ok(&self.functions[*idx as usize]),
            Some(ids) => Err(FactsError::FunctionAmbiguous {
                name: name.to_owned(),
                count: ids.len(),
            }),
        }
    }

    pub fn function_by_id(&self, id: u64) -> Option<&Function> {
        self.functions_by_id
            .get(&id)
            .map(|&idx| &self.functions[idx as usize])
    }

    pub fn functions(&self) -> &[Function] {
        &self.functions
    }

    pub fn globals(&self) -> &[Global] {
        &self.globals
    }

    /// Human-readable spelling for diagnostics.
    pub fn display_type(&self, id: TypeId) -> String {
        match self.type_of(id) {
            Type::Builtin { name, .. } => self.interner.lookup(*name).to_owned(),
            Type::Record(record) => {
                let keyword = if record.is_union { "union" } else { "struct" };
                if record.tag.is_empty() {
                    format!("{keyword} <anonymous>")
                } else {
                    format!("{keyword} {}", self.interner.lookup(record.tag))
                }
            }
            Type::RecordForward { tag, is_union } => {
                let keyword = if *is_union { "union" } else { "struct" };
                format!("{keyword} {}", self.interner.lookup(*tag))
            }
            Type::Enum { tag, .. } | Type::EnumForward { tag } => {
                if tag.is_empty() {
                    "enum <anonymous>".to_owned()
                } else {
                    format!("enum {}", self.interner.lookup(*tag))
                }
            }
            Type::Typedef { name, .. } => self.interner.lookup(*name).to_owned(),
            Type::Pointer { target } => format!("{}*", self.display_type(*target)),
            Type::ConstArray { elem, total_bytes } => {
                let elem_size = self.size_bytes(*elem).max(1);
                format!("{}[{}]", self.display_type(*elem), total_bytes / elem_size)
            }
            Type::IncompleteArray { elem } => format!("{}[]", self.display_type(*elem)),
            Type::Attributed { target, .. } => self.display_type(*target),
            Type::Function => "<function>".to_owned(),
        }
    }
}

impl StringLookup for Universe {
    fn lookup(&self, name: Name) -> &str {
        self.interner.lookup(name)
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::testutil::{tid, UniverseBuilder};

    use super::*;

    #[test]
    fn typedef_chain_stops_at_record() {
        let mut b = UniverseBuilder::new();
        let int = b.builtin("int", 4);
        let rec = b.record("sock", 4, &[("fd", int, 0)]);
        let inner = b.typedef("sock_t", rec);
        let outer = b.typedef("sock_alias_t", inner);
        let u = b.build();

        assert_eq!(u.walk_typedef_chain(tid(outer)), tid(rec));
        assert_eq!(u.walk_typedef_chain(tid(rec)), tid(rec));
    }

    #[test]
    fn record_target_resolves_through_pointer_and_drops_typedef() {
        let mut b = UniverseBuilder::new();
        let int = b.builtin("int", 4);
        let rec = b.record("item", 4, &[("v", int, 0)]);
        let ptr = b.pointer(rec);
        let ptr_td = b.typedef("item_ptr_t", ptr);
        let u = b.build();

        let through_ptr = u.resolve_record_target(tid(ptr_td));
        assert_eq!(
            through_ptr,
            Some(RecordResolution {
                record: tid(rec),
                typedef: None,
            })
        );
    }

    #[test]
    fn record_target_remembers_direct_typedef() {
        let mut b = UniverseBuilder::new();
        let int = b.builtin("int", 4);
        let rec = b.record("item", 4, &[("v", int, 0)]);
        let td = b.typedef("item_t", rec);
        let u = b.build();

        assert_eq!(
            u.resolve_record_target(tid(td)),
            Some(RecordResolution {
                record: tid(rec),
                typedef: Some(tid(td)),
            })
        );
    }

    #[test]
    fn size_follows_aliases_and_forwards() {
        let mut b = UniverseBuilder::new();
        let int = b.builtin("int", 4);
        let rec = b.record("box", 16, &[("v", int, 0)]);
        let fwd = b.record_forward("box");
        let td = b.typedef("box_t", rec);
        let arr = b.const_array(int, 12);
        let inc = b.incomplete_array(int);
        let ptr = b.pointer(rec);
        let u = b.build();

        assert_eq!(u.size_bytes(tid(rec)), 16);
        assert_eq!(u.size_bytes(tid(fwd)), 16);
        assert_eq!(u.size_bytes(tid(td)), 16);
        assert_eq!(u.size_bytes(tid(arr)), 12);
        assert_eq!(u.size_bytes(tid(inc)), 0);
        assert_eq!(u.size_bytes(tid(ptr)), POINTER_SIZE);
    }

    #[test]
    fn ambiguous_record_tag_is_reported() {
        let mut b = UniverseBuilder::new();
        let int = b.builtin("int", 4);
        b.record("dup", 4, &[("a", int, 0)]);
        b.record("dup", 4, &[("b", int, 0)]);
        let u = b.build();

        let tag = u.interner().intern("dup");
        assert!(matches!(
            u.record_by_tag(tag),
            Err(FactsError::RecordAmbiguous { count: 2, .. })
        ));
    }

    #[test]
    fn record_lookup_prefers_unqualified_duplicate() {
        let mut b = UniverseBuilder::new();
        let int = b.builtin("int", 4);
        let rec = b.record("inode", 4, &[("v", int, 0)]);
        b.record_const_dup("inode", 4);
        let u = b.build();

        let tag = u.interner().intern("inode");
        assert_eq!(u.record_by_tag(tag).unwrap(), tid(rec));
    }

    #[test]
    fn anon_names_are_stable_and_kind_aware() {
        let mut b = UniverseBuilder::new();
        let int = b.builtin("int", 4);
        let anon_rec = b.record("", 4, &[("x", int, 0)]);
        let anon_enum = b.enum_type("", 4);
        let u = b.build();

        let first = u.anon_type_name(tid(anon_rec));
        let second = u.anon_type_name(tid(anon_rec));
        assert_eq!(first, second);
        assert_eq!(u.interner().lookup(first), "anonstruct_type_0_t");
        assert_eq!(
            u.interner().lookup(u.anon_type_name(tid(anon_enum))),
            "anonenum_type_1_t"
        );
    }

    #[test]
    fn global_lookup_filters_by_file_suffix() {
        let mut b = UniverseBuilder::new();
        let int = b.builtin("int", 4);
        let rec = b.record("pool", 4, &[("v", int, 0)]);
        let ptr = b.pointer(rec);
        b.global("table", ptr, "lib/random.c");
        b.global("table", ptr, "drivers/char/other.c");
        let u = b.build();

        let g = u.global_by_name("table", "random.c").unwrap();
        assert_eq!(u.interner().lookup(g.file), "lib/random.c");
        assert!(matches!(
            u.global_by_name("table", ""),
            Err(FactsError::GlobalAmbiguous { count: 2, .. })
        ));
        assert!(matches!(
            u.global_by_name("missing", ""),
            Err(FactsError::GlobalNotFound { .. })
        ));
    }

    #[test]
    fn user_annotation_seen_through_typedef() {
        let mut b = UniverseBuilder::new();
        let int = b.builtin("int", 4);
        let user = b.attributed(int, "__attribute__((noderef))");
        let td = b.typedef("user_int_t", user);
        let plain = b.attributed(int, "__attribute__((aligned(8)))");
        let u = b.build();

        assert!(u.user_annotated(tid(td)));
        assert!(!u.user_annotated(tid(plain)));
    }

    #[test]
    fn display_renders_c_spellings() {
        let mut b = UniverseBuilder::new();
        let ch = b.builtin("char", 1);
        let rec = b.record("dentry", 4, &[("c", ch, 0)]);
        let uni = b.union_of("blob", 4, &[("c", ch, 0)]);
        let ptr = b.pointer(rec);
        let arr = b.const_array(ch, 8);
        let u = b.build();

        assert_eq!(u.display_type(tid(rec)), "struct dentry");
        assert_eq!(u.display_type(tid(uni)), "union blob");
        assert_eq!(u.display_type(tid(ptr)), "struct dentry*");
        assert_eq!(u.display_type(tid(arr)), "char[8]");
    }
}
