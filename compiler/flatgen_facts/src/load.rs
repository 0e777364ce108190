//! Database loading and conversion into the dense universe.

use std::fs;
use std::path::Path;

use flatgen_ir::{Name, SharedInterner, TypeId};
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::model::{RawDatabase, RawType};
use crate::store::{Function, Global, Member, Record, Type, Universe};
use crate::FactsError;

/// Read and parse a fact database file.
pub fn load_database(path: &Path) -> Result<RawDatabase, FactsError> {
    let text = fs::read_to_string(path).map_err(|source| FactsError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let raw: RawDatabase = serde_json::from_str(&text)?;
    debug!(
        path = %path.display(),
        version = %raw.version,
        types = raw.types.len(),
        globals = raw.globals.len(),
        functions = raw.functions.len(),
        "loaded fact database"
    );
    Ok(raw)
}

impl Universe {
    /// Convert the raw database into the dense universe.
    pub fn from_raw(raw: RawDatabase, interner: SharedInterner) -> Result<Self, FactsError> {
        let mut id_map: FxHashMap<u64, TypeId> =
            FxHashMap::with_capacity_and_hasher(raw.types.len(), rustc_hash::FxBuildHasher);
        for (index, rt) in raw.types.iter().enumerate() {
            let dense = TypeId::from_raw(u32::try_from(index).map_err(|_| {
                FactsError::MalformedType {
                    id: rt.id,
                    detail: "type table too large",
                }
            })?);
            if id_map.insert(rt.id, dense).is_some() {
                return Err(FactsError::DuplicateTypeId { id: rt.id });
            }
        }

        let mut universe = Universe::new(interner);
        universe.types.reserve(raw.types.len());
        universe.const_flags.reserve(raw.types.len());

        for rt in &raw.types {
            let ty = convert_type(rt, &id_map, &universe)?;
            let dense = TypeId::from_raw(
                u32::try_from(universe.types.len()).unwrap_or(u32::MAX),
            );
            match &ty {
                Type::Record(record) if !record.tag.is_empty() => {
                    universe
                        .records_by_tag
                        .entry(record.tag)
                        .or_default()
                        .push(dense);
                }
                Type::Builtin { name, .. } => {
                    universe.builtins_by_name.entry(*name).or_insert(dense);
                }
                Type::Typedef { name, .. } => {
                    universe
                        .typedefs_by_name
                        .entry(*name)
                        .or_default()
                        .push(dense);
                }
                _ => {}
            }
            universe.types.push(ty);
            universe
                .const_flags
                .push(rt.qualifiers.contains('c'));
        }

        let vmlinux = universe.interner.intern("vmlinux");
        let modules: Vec<Name> = raw
            .modules
            .iter()
            .map(|m| {
                let base = m.rsplit('/').next().unwrap_or(m.as_str());
                universe.interner.intern_owned(base.to_owned())
            })
            .collect();

        for rg in &raw.globals {
            let ty = *id_map
                .get(&rg.type_id)
                .ok_or(FactsError::UnknownTypeRef { id: rg.type_id })?;
            let module = match rg.mids.as_slice() {
                [mid] => modules.get(*mid).copied().unwrap_or(vmlinux),
                _ => vmlinux,
            };
            let idx = u32::try_from(universe.globals.len()).unwrap_or(u32::MAX);
            let name = universe.interner.intern_owned(rg.name.clone());
            universe.globals.push(Global {
                name,
                ty,
                file: universe.interner.intern_owned(rg.file.clone()),
                hash: universe.interner.intern_owned(rg.hash.clone()),
                module,
            });
            universe.globals_by_name.entry(name).or_default().push(idx);
        }

        for rf in &raw.functions {
            let mut types = Vec::with_capacity(rf.types.len());
            for raw_ty in &rf.types {
                types.push(
                    *id_map
                        .get(raw_ty)
                        .ok_or(FactsError::UnknownTypeRef { id: *raw_ty })?,
                );
            }
            let idx = u32::try_from(universe.functions.len()).unwrap_or(u32::MAX);
            let name = universe.interner.intern_owned(rf.name.clone());
            universe.functions.push(Function {
                id: rf.id,
                name,
                nargs: rf.nargs,
                types,
                calls: rf.calls.clone(),
            });
            universe
                .functions_by_name
                .entry(name)
                .or_default()
                .push(idx);
            universe.functions_by_id.insert(rf.id, idx);
        }

        debug!(
            types = universe.types.len(),
            records = universe.records_by_tag.len(),
            typedefs = universe.typedefs_by_name.len(),
            "universe ready"
        );
        Ok(universe)
    }
}

fn convert_type(
    rt: &RawType,
    id_map: &FxHashMap<u64, TypeId>,
    universe: &Universe,
) -> Result<Type, FactsError> {
    let resolve = |raw_id: u64| -> Result<TypeId, FactsError> {
        id_map
            .get(&raw_id)
            .copied()
            .ok_or(FactsError::UnknownTypeRef { id: raw_id })
    };
    let first_ref = || -> Result<TypeId, FactsError> {
        let raw_id = *rt.refs.first().ok_or(FactsError::MalformedType {
            id: rt.id,
            detail: "missing referenced type",
        })?;
        resolve(raw_id)
    };
    let intern = |s: &str| universe.interner.intern_owned(s.to_owned());

    Ok(match rt.class.as_str() {
        "builtin" => Type::Builtin {
            name: intern(&rt.str),
            byte_size: rt.size / 8,
        },
        "record" => Type::Record(convert_record(rt, id_map, universe)?),
        "record_forward" => Type::RecordForward {
            tag: intern(&rt.str),
            is_union: rt.is_union,
        },
        "enum" => Type::Enum {
            tag: intern(&rt.str),
            byte_size: rt.size / 8,
        },
        "enum_forward" => Type::EnumForward {
            tag: intern(&rt.str),
        },
        "typedef" => Type::Typedef {
            name: intern(&rt.str),
            target: first_ref()?,
        },
        "pointer" => Type::Pointer {
            target: first_ref()?,
        },
        "const_array" => Type::ConstArray {
            elem: first_ref()?,
            total_bytes: rt.size / 8,
        },
        "incomplete_array" => Type::IncompleteArray { elem: first_ref()? },
        "attributed" => Type::Attributed {
            target: first_ref()?,
            user_memory: rt.attrcore.contains("__attribute__((noderef))"),
        },
        "function" => Type::Function,
        other => {
            debug!(id = rt.id, class = other, "unrecognized type class, kept opaque");
            Type::Builtin {
                name: intern(&rt.str),
                byte_size: rt.size / 8,
            }
        }
    })
}

fn convert_record(
    rt: &RawType,
    id_map: &FxHashMap<u64, TypeId>,
    universe: &Universe,
) -> Result<Record, FactsError> {
    let member_count = rt.refs.len().saturating_sub(rt.attrnum);
    let mut members = Vec::with_capacity(member_count);
    for i in 0..member_count {
        let raw_ref = rt.refs[i];
        let ty = *id_map
            .get(&raw_ref)
            .ok_or(FactsError::UnknownTypeRef { id: raw_ref })?;
        let name_str = rt.refnames.get(i).map_or("", String::as_str);
        members.push(Member {
            name: universe.interner.intern_owned(name_str.to_owned()),
            ty,
            used: rt.usedrefs.get(i).is_none_or(|&ur| ur > 0),
            decl_only: rt.decls.contains(&i),
        });
    }
    Ok(Record {
        tag: universe.interner.intern_owned(rt.str.clone()),
        is_union: rt.is_union,
        byte_size: rt.size / 8,
        location: universe.interner.intern_owned(rt.location.clone()),
        members,
        offsets_bits: rt.memberoffsets.clone(),
    })
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests {
    use flatgen_ir::StringLookup;
    use pretty_assertions::assert_eq;

    use crate::model::RawType;
    use crate::store::Type;
    use crate::testutil::{tid, UniverseBuilder};

    use super::*;

    fn minimal_type(id: u64) -> RawType {
        serde_json::from_str(&format!(
            r#"{{"id": {id}, "class": "builtin", "str": "int", "size": 32}}"#
        ))
        .unwrap()
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let raw = RawDatabase {
            version: String::new(),
            modules: Vec::new(),
            types: vec![minimal_type(7), minimal_type(7)],
            globals: Vec::new(),
            functions: Vec::new(),
        };
        let err = Universe::from_raw(raw, SharedInterner::new()).unwrap_err();
        assert!(matches!(err, FactsError::DuplicateTypeId { id: 7 }));
    }

    #[test]
    fn dangling_refs_are_rejected() {
        let mut ptr = minimal_type(0);
        ptr.class = "pointer".to_owned();
        ptr.refs = vec![99];
        let raw = RawDatabase {
            version: String::new(),
            modules: Vec::new(),
            types: vec![ptr],
            globals: Vec::new(),
            functions: Vec::new(),
        };
        let err = Universe::from_raw(raw, SharedInterner::new()).unwrap_err();
        assert!(matches!(err, FactsError::UnknownTypeRef { id: 99 }));
    }

    #[test]
    fn sizes_convert_from_bits() {
        let mut b = UniverseBuilder::new();
        let int = b.builtin("int", 4);
        let rec = b.record("pair", 8, &[("a", int, 0), ("b", int, 4)]);
        let u = b.build();

        assert_eq!(u.size_bytes(tid(int)), 4);
        let Type::Record(def) = u.type_of(tid(rec)) else {
            panic!("expected a record");
        };
        assert_eq!(def.byte_size, 8);
        assert_eq!(def.offsets_bits, vec![0, 32]);
    }

    #[test]
    fn trailing_attribute_refs_are_trimmed() {
        let int = minimal_type(0);
        let mut attr = minimal_type(1);
        attr.class = "attributed".to_owned();
        attr.refs = vec![0];
        let mut rec = minimal_type(2);
        rec.class = "record".to_owned();
        rec.str = "packed".to_owned();
        rec.refs = vec![0, 1];
        rec.refnames = vec!["v".to_owned(), "__!attribute__".to_owned()];
        rec.memberoffsets = vec![0];
        rec.usedrefs = vec![1, -1];
        rec.attrnum = 1;
        let db = RawDatabase {
            version: String::new(),
            modules: Vec::new(),
            types: vec![int, attr, rec],
            globals: Vec::new(),
            functions: Vec::new(),
        };
        let u = Universe::from_raw(db, SharedInterner::new()).unwrap();

        let rec_id = u.record_by_tag(u.interner().intern("packed")).unwrap();
        let Type::Record(def) = u.type_of(rec_id) else {
            panic!("expected a record");
        };
        assert_eq!(def.members.len(), 1);
        assert_eq!(u.lookup(def.members[0].name), "v");
    }

    #[test]
    fn module_names_keep_basename_only() {
        let mut b = UniverseBuilder::new();
        let int = b.builtin("int", 4);
        let rec = b.record("cfg", 4, &[("v", int, 0)]);
        b.global_in_module("setting", rec, "drivers/tty/vt.c", "drivers/tty/vt.ko");
        b.global("plain", rec, "init/main.c");
        let u = b.build();

        let in_module = u.global_by_name("setting", "").unwrap();
        assert_eq!(u.lookup(in_module.module), "vt.ko");
        let plain = u.global_by_name("plain", "").unwrap();
        assert_eq!(u.lookup(plain.module), "vmlinux");
    }
}
