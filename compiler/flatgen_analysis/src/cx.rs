//! Shared generation context.

use flatgen_facts::{GenConfig, Type, Universe};
use flatgen_ir::{Name, RecordRef, Subject, SubjectKind, TypeId, TypeKey};

/// Read-only state threaded through every generation step: the loaded
/// fact universe plus the resolved operator configuration.
pub struct GenCx<'a> {
    pub universe: &'a Universe,
    pub config: &'a GenConfig,
    pub(crate) anon_marker: Name,
}

impl<'a> GenCx<'a> {
    pub fn new(universe: &'a Universe, config: &'a GenConfig) -> Self {
        let anon_marker = universe.interner().intern("__!anonrecord__");
        Self {
            universe,
            config,
            anon_marker,
        }
    }

    /// The store key this subject's recipe publishes under: the record
    /// tag for tag-named subjects, the typedef or generated name for
    /// typedef-named and anonymous ones.
    pub fn subject_key(&self, subject: Subject) -> TypeKey {
        match self.universe.type_of(subject.type_id) {
            Type::Typedef { name, target } => {
                let kind = if self.is_union_like(*target) {
                    SubjectKind::TypedefUnion
                } else {
                    SubjectKind::TypedefStruct
                };
                TypeKey::new(kind, *name)
            }
            Type::Record(record) => {
                if record.tag.is_empty() {
                    let name = if subject.display.is_empty() {
                        self.universe.anon_type_name(subject.type_id)
                    } else {
                        subject.display
                    };
                    let kind = if record.is_union {
                        SubjectKind::TypedefUnion
                    } else {
                        SubjectKind::TypedefStruct
                    };
                    TypeKey::new(kind, name)
                } else {
                    let kind = if record.is_union {
                        SubjectKind::Union
                    } else {
                        SubjectKind::Struct
                    };
                    TypeKey::new(kind, record.tag)
                }
            }
            Type::RecordForward { tag, is_union } => {
                let kind = if *is_union {
                    SubjectKind::Union
                } else {
                    SubjectKind::Struct
                };
                TypeKey::new(kind, *tag)
            }
            _ => TypeKey::new(SubjectKind::Struct, subject.display),
        }
    }

    /// Subject handle for a dependency edge to `id`, carrying the name
    /// the dependency will be defined under when it is not a plain tag.
    pub fn subject_for(&self, id: TypeId) -> Subject {
        match self.universe.type_of(id) {
            Type::Typedef { name, .. } => Subject::named(id, *name),
            Type::Record(record) if record.tag.is_empty() => {
                Subject::named(id, self.universe.anon_type_name(id))
            }
            _ => Subject::record(id),
        }
    }

    /// Reference to a record another recipe must exist for.
    pub fn record_ref(&self, subject: Subject, record: TypeId) -> RecordRef {
        RecordRef {
            key: self.subject_key(subject),
            type_id: subject.type_id,
            byte_size: self.universe.size_bytes(record),
        }
    }

    fn is_union_like(&self, id: TypeId) -> bool {
        let walked = self.universe.walk_typedef_chain(id);
        match self.universe.type_of(walked) {
            Type::Record(record) => record.is_union,
            Type::RecordForward { is_union, .. } => *is_union,
            _ => false,
        }
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests {
    use flatgen_facts::testutil::{tid, UniverseBuilder};
    use flatgen_facts::GenConfig;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_subject_key_forms() {
        let mut b = UniverseBuilder::new();
        let int = b.builtin("int", 4);
        let rec = b.record("pipe", 4, &[("fd", int, 0)]);
        let uni = b.union_of("mix", 4, &[("v", int, 0)]);
        let td = b.typedef("pipe_t", rec);
        let anon = b.record("", 4, &[("x", int, 0)]);
        let universe = b.build();
        let config = GenConfig::default();
        let cx = GenCx::new(&universe, &config);

        let key = cx.subject_key(Subject::record(tid(rec)));
        assert_eq!(key.kind, SubjectKind::Struct);
        assert_eq!(key.render(&universe), "struct pipe");

        let key = cx.subject_key(Subject::record(tid(uni)));
        assert_eq!(key.kind, SubjectKind::Union);

        let key = cx.subject_key(Subject::record(tid(td)));
        assert_eq!(key.kind, SubjectKind::TypedefStruct);
        assert_eq!(key.render(&universe), "pipe_t");

        let key = cx.subject_key(cx.subject_for(tid(anon)));
        assert_eq!(key.kind, SubjectKind::TypedefStruct);
        assert_eq!(key.render(&universe), "anonstruct_type_0_t");
    }

    #[test]
    fn test_subject_for_names_typedefs_and_anons() {
        let mut b = UniverseBuilder::new();
        let int = b.builtin("int", 4);
        let rec = b.record("node", 4, &[("v", int, 0)]);
        let td = b.typedef("node_t", rec);
        let universe = b.build();
        let config = GenConfig::default();
        let cx = GenCx::new(&universe, &config);

        assert_eq!(cx.subject_for(tid(rec)), Subject::record(tid(rec)));
        let named = cx.subject_for(tid(td));
        assert_eq!(universe.interner().lookup(named.display), "node_t");
    }
}
