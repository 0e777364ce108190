//! Builders for in-memory fact databases used across the workspace tests.

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use flatgen_ir::{SharedInterner, TypeId};

use crate::model::{RawDatabase, RawFunction, RawGlobal, RawType};
use crate::store::Universe;

/// Dense id of a builder-allocated type. The builder hands out type ids
/// sequentially from zero, which is exactly the loader's dense order.
pub fn tid(raw: u64) -> TypeId {
    TypeId::from_raw(u32::try_from(raw).unwrap())
}

/// One member entry for [`UniverseBuilder::record_ext`].
#[derive(Debug, Clone)]
pub struct MemberSpec {
    pub name: String,
    pub ty: u64,
    /// Bit offset; `None` for declaration entries that consume no
    /// offset slot.
    pub offset_bits: Option<u64>,
    pub used: bool,
    pub decl: bool,
}

impl MemberSpec {
    /// A plain used member at a byte offset.
    pub fn new(name: &str, ty: u64, byte_offset: u64) -> Self {
        Self {
            name: name.to_owned(),
            ty,
            offset_bits: Some(byte_offset * 8),
            used: true,
            decl: false,
        }
    }

    /// Mark the member as never dereferenced.
    #[must_use]
    pub fn unused(mut self) -> Self {
        self.used = false;
        self
    }

    /// A nested-record declaration entry without an offset slot
    /// (`__!recorddecl__`, or `__!anonrecord__` followed by its
    /// dependent instance).
    pub fn decl_marker(name: &str, ty: u64) -> Self {
        Self {
            name: name.to_owned(),
            ty,
            offset_bits: None,
            used: false,
            decl: true,
        }
    }

    /// A standalone anonymous-record instance: listed in `decls` but
    /// carrying a real offset slot.
    pub fn decl_instance(name: &str, ty: u64, byte_offset: u64) -> Self {
        Self {
            name: name.to_owned(),
            ty,
            offset_bits: Some(byte_offset * 8),
            used: true,
            decl: true,
        }
    }
}

/// Builds a [`Universe`] from synthetic raw entries. Ids are handed out
/// sequentially; cyclic member types go through record forwards exactly
/// as the extractor encodes them.
#[derive(Debug, Default)]
pub struct UniverseBuilder {
    types: Vec<RawType>,
    globals: Vec<RawGlobal>,
    functions: Vec<RawFunction>,
    modules: Vec<String>,
    next_id: u64,
}

impl UniverseBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, mut rt: RawType) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        rt.id = id;
        self.types.push(rt);
        id
    }

    fn blank(class: &str) -> RawType {
        RawType {
            id: 0,
            class: class.to_owned(),
            str: String::new(),
            size: 0,
            refs: Vec::new(),
            refnames: Vec::new(),
            memberoffsets: Vec::new(),
            decls: Vec::new(),
            usedrefs: Vec::new(),
            attrnum: 0,
            is_union: false,
            qualifiers: String::new(),
            location: String::new(),
            attrcore: String::new(),
        }
    }

    pub fn builtin(&mut self, name: &str, bytes: u64) -> u64 {
        let mut rt = Self::blank("builtin");
        rt.str = name.to_owned();
        rt.size = bytes * 8;
        self.push(rt)
    }

    pub fn void(&mut self) -> u64 {
        self.builtin("void", 0)
    }

    pub fn pointer(&mut self, target: u64) -> u64 {
        let mut rt = Self::blank("pointer");
        rt.size = 64;
        rt.refs = vec![target];
        self.push(rt)
    }

    pub fn typedef(&mut self, name: &str, target: u64) -> u64 {
        let mut rt = Self::blank("typedef");
        rt.str = name.to_owned();
        rt.refs = vec![target];
        self.push(rt)
    }

    pub fn enum_type(&mut self, tag: &str, bytes: u64) -> u64 {
        let mut rt = Self::blank("enum");
        rt.str = tag.to_owned();
        rt.size = bytes * 8;
        self.push(rt)
    }

    pub fn record_forward(&mut self, tag: &str) -> u64 {
        let mut rt = Self::blank("record_forward");
        rt.str = tag.to_owned();
        self.push(rt)
    }

    pub fn const_array(&mut self, elem: u64, total_bytes: u64) -> u64 {
        let mut rt = Self::blank("const_array");
        rt.size = total_bytes * 8;
        rt.refs = vec![elem];
        self.push(rt)
    }

    pub fn incomplete_array(&mut self, elem: u64) -> u64 {
        let mut rt = Self::blank("incomplete_array");
        rt.refs = vec![elem];
        self.push(rt)
    }

    pub fn attributed(&mut self, target: u64, attrcore: &str) -> u64 {
        let mut rt = Self::blank("attributed");
        rt.refs = vec![target];
        rt.attrcore = attrcore.to_owned();
        self.push(rt)
    }

    pub fn const_of(&mut self, target: u64) -> u64 {
        let mut rt = Self::blank("attributed");
        rt.refs = vec![target];
        rt.qualifiers = "c".to_owned();
        self.push(rt)
    }

    pub fn function_type(&mut self) -> u64 {
        self.push(Self::blank("function"))
    }

    /// A record with plain used members given as `(name, type, byte
    /// offset)`.
    pub fn record(&mut self, tag: &str, bytes: u64, members: &[(&str, u64, u64)]) -> u64 {
        let specs: Vec<MemberSpec> = members
            .iter()
            .map(|&(name, ty, off)| MemberSpec::new(name, ty, off))
            .collect();
        self.record_ext(tag, bytes, false, &specs)
    }

    /// A union with plain used members.
    pub fn union_of(&mut self, tag: &str, bytes: u64, members: &[(&str, u64, u64)]) -> u64 {
        let specs: Vec<MemberSpec> = members
            .iter()
            .map(|&(name, ty, off)| MemberSpec::new(name, ty, off))
            .collect();
        self.record_ext(tag, bytes, true, &specs)
    }

    /// Full-control record entry; an empty tag makes it anonymous.
    pub fn record_ext(
        &mut self,
        tag: &str,
        bytes: u64,
        is_union: bool,
        members: &[MemberSpec],
    ) -> u64 {
        let mut rt = Self::blank("record");
        rt.str = tag.to_owned();
        rt.size = bytes * 8;
        rt.is_union = is_union;
        rt.location = format!("test.c:{}", self.next_id);
        for (i, m) in members.iter().enumerate() {
            rt.refs.push(m.ty);
            rt.refnames.push(m.name.clone());
            rt.usedrefs.push(if m.used {
                i64::try_from(m.ty).unwrap().max(1)
            } else {
                -1
            });
            if let Some(bits) = m.offset_bits {
                rt.memberoffsets.push(bits);
            }
            if m.decl {
                rt.decls.push(i);
            }
        }
        self.push(rt)
    }

    /// A const-qualified duplicate of a record entry, as the extractor
    /// emits for `const struct` uses of a type defined elsewhere.
    pub fn record_const_dup(&mut self, tag: &str, bytes: u64) -> u64 {
        let mut rt = Self::blank("record");
        rt.str = tag.to_owned();
        rt.size = bytes * 8;
        rt.qualifiers = "c".to_owned();
        self.push(rt)
    }

    pub fn global(&mut self, name: &str, ty: u64, file: &str) {
        self.globals.push(RawGlobal {
            name: name.to_owned(),
            type_id: ty,
            file: file.to_owned(),
            hash: format!("{name}/{file}"),
            mids: Vec::new(),
        });
    }

    pub fn global_in_module(&mut self, name: &str, ty: u64, file: &str, module: &str) {
        let mid = self.modules.len();
        self.modules.push(module.to_owned());
        self.globals.push(RawGlobal {
            name: name.to_owned(),
            type_id: ty,
            file: file.to_owned(),
            hash: format!("{name}/{file}"),
            mids: vec![mid],
        });
    }

    /// Function ids live far above the type id space so type ids stay
    /// dense.
    pub fn function(&mut self, name: &str, nargs: u32, types: &[u64], calls: &[u64]) -> u64 {
        let id = 1_000_000 + u64::try_from(self.functions.len()).unwrap();
        self.functions.push(RawFunction {
            id,
            name: name.to_owned(),
            nargs,
            types: types.to_vec(),
            calls: calls.to_vec(),
        });
        id
    }

    pub fn build(self) -> Universe {
        let raw = RawDatabase {
            version: "test".to_owned(),
            modules: self.modules,
            types: self.types,
            globals: self.globals,
            functions: self.functions,
        };
        Universe::from_raw(raw, SharedInterner::new()).unwrap()
    }
}
