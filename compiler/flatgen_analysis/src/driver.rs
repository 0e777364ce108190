//! Fixed-point recipe generation.
//!
//! Seeds a worklist with the root subjects and builds recipes until no new
//! dependency appears. Two subjects that publish under the same key (a
//! record reached both as forward and as full definition, or through const
//! duplicates) are built once.

use rustc_hash::FxHashSet;

use flatgen_ir::{GenerationReport, Name, RecipeStore, Subject, TypeId};
use tracing::{debug, info};

use crate::build::{build_recipe, AnonTypedef, RecordTypedef};
use crate::{GenCx, GenError};

/// Everything a finished generation run produced.
pub struct DriverOutput {
    pub store: RecipeStore,
    pub report: GenerationReport,
    /// Tag-to-typedef bridges the shared header must declare.
    pub record_typedefs: Vec<RecordTypedef>,
    /// Generated names for anonymous records and enums.
    pub anon_typedefs: Vec<AnonTypedef>,
}

/// Worklist driver over [`build_recipe`].
///
/// `run` may be called again after inspection; later rounds only build
/// subjects the store does not cover yet. Trigger construction uses this
/// to pull in types reachable only from entry-point arguments.
pub struct RecipeDriver<'c, 'a> {
    cx: &'c GenCx<'a>,
    store: RecipeStore,
    report: GenerationReport,
    done: FxHashSet<Subject>,
    record_typedefs: Vec<RecordTypedef>,
    anon_typedefs: Vec<AnonTypedef>,
    seen_bridges: FxHashSet<(Name, Name)>,
    seen_anons: FxHashSet<TypeId>,
}

impl<'c, 'a> RecipeDriver<'c, 'a> {
    pub fn new(cx: &'c GenCx<'a>) -> Self {
        Self {
            cx,
            store: RecipeStore::new(),
            report: GenerationReport::new(),
            done: FxHashSet::default(),
            record_typedefs: Vec::new(),
            anon_typedefs: Vec::new(),
            seen_bridges: FxHashSet::default(),
            seen_anons: FxHashSet::default(),
        }
    }

    pub fn store(&self) -> &RecipeStore {
        &self.store
    }

    /// Build recipes for `roots` and everything they reach.
    pub fn run(&mut self, roots: impl IntoIterator<Item = Subject>) -> Result<(), GenError> {
        let mut pending: Vec<Subject> = roots.into_iter().collect();
        let mut cursor = 0;
        let before = self.store.len();
        while cursor < pending.len() {
            let subject = pending[cursor];
            cursor += 1;
            if !self.done.insert(subject) {
                continue;
            }
            if self.store.contains(self.cx.subject_key(subject)) {
                continue;
            }
            let outcome = build_recipe(self.cx, subject, &mut self.report)?;
            if let Some(recipe) = outcome.recipe {
                self.store.insert(recipe)?;
            }
            pending.extend(outcome.deps);
            for bridge in outcome.record_typedefs {
                if self.seen_bridges.insert((bridge.typedef_name, bridge.tag)) {
                    self.record_typedefs.push(bridge);
                }
            }
            for anon in outcome.anon_typedefs {
                if self.seen_anons.insert(anon.record) {
                    self.anon_typedefs.push(anon);
                }
            }
        }
        debug!(
            new = self.store.len() - before,
            total = self.store.len(),
            "worklist drained"
        );
        Ok(())
    }

    pub fn finish(self) -> DriverOutput {
        info!(
            recipes = self.store.len(),
            entries = self.report.entries.len(),
            "generation complete"
        );
        DriverOutput {
            store: self.store,
            report: self.report,
            record_typedefs: self.record_typedefs,
            anon_typedefs: self.anon_typedefs,
        }
    }
}

/// One-shot convenience over [`RecipeDriver`].
pub fn generate_recipes(
    cx: &GenCx<'_>,
    roots: impl IntoIterator<Item = Subject>,
) -> Result<DriverOutput, GenError> {
    let mut driver = RecipeDriver::new(cx);
    driver.run(roots)?;
    Ok(driver.finish())
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests {
    use flatgen_facts::testutil::{tid, UniverseBuilder};
    use flatgen_facts::GenConfig;
    use flatgen_ir::{SubjectKind, TypeKey};
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_transitive_dependencies_get_recipes() {
        let mut b = UniverseBuilder::new();
        let int = b.builtin("int", 4);
        let leaf = b.record("leaf_cfg", 8, &[("v", int, 0)]);
        let leaf_ptr = b.pointer(leaf);
        let mid = b.record("mid_cfg", 8, &[("leaf", leaf_ptr, 0)]);
        let mid_ptr = b.pointer(mid);
        let root = b.record("root_cfg", 8, &[("mid", mid_ptr, 0)]);
        let universe = b.build();
        let config = GenConfig::default();
        let cx = GenCx::new(&universe, &config);

        let out = generate_recipes(&cx, [Subject::record(tid(root))]).unwrap();
        assert_eq!(out.store.len(), 3);
        for tag in ["root_cfg", "mid_cfg", "leaf_cfg"] {
            let key = TypeKey::new(SubjectKind::Struct, universe.interner().intern(tag));
            assert!(out.store.contains(key), "missing recipe for {tag}");
        }
    }

    #[test]
    fn test_mutual_recursion_terminates() {
        let mut b = UniverseBuilder::new();
        let b_fwd = b.record_forward("pong");
        let b_ptr = b.pointer(b_fwd);
        let a = b.record("ping", 8, &[("other", b_ptr, 0)]);
        let a_ptr = b.pointer(a);
        let _b_full = b.record("pong", 8, &[("other", a_ptr, 0)]);
        let universe = b.build();
        let config = GenConfig::default();
        let cx = GenCx::new(&universe, &config);

        let out = generate_recipes(&cx, [Subject::record(tid(a))]).unwrap();
        assert_eq!(out.store.len(), 2);
    }

    #[test]
    fn test_forward_and_full_share_one_recipe() {
        let mut b = UniverseBuilder::new();
        let int = b.builtin("int", 4);
        let fwd = b.record_forward("shared_ctx");
        let full = b.record("shared_ctx", 8, &[("v", int, 0)]);
        let universe = b.build();
        let config = GenConfig::default();
        let cx = GenCx::new(&universe, &config);

        let out = generate_recipes(
            &cx,
            [Subject::record(tid(fwd)), Subject::record(tid(full))],
        )
        .unwrap();
        assert_eq!(out.store.len(), 1);
    }

    #[test]
    fn test_tag_and_typedef_recipes_are_distinct() {
        let mut b = UniverseBuilder::new();
        let int = b.builtin("int", 4);
        let rec = b.record("buf_core", 8, &[("v", int, 0)]);
        let td = b.typedef("buf_t", rec);
        let universe = b.build();
        let config = GenConfig::default();
        let cx = GenCx::new(&universe, &config);

        let subjects = [
            Subject::record(tid(rec)),
            cx.subject_for(tid(td)),
        ];
        let out = generate_recipes(&cx, subjects).unwrap();
        assert_eq!(out.store.len(), 2);
        assert!(out
            .store
            .contains(TypeKey::new(SubjectKind::Struct, universe.interner().intern("buf_core"))));
        assert!(out.store.contains(TypeKey::new(
            SubjectKind::TypedefStruct,
            universe.interner().intern("buf_t")
        )));
        assert_eq!(out.record_typedefs.len(), 1);
    }

    #[test]
    fn test_rerun_extends_without_duplicates() {
        let mut b = UniverseBuilder::new();
        let int = b.builtin("int", 4);
        let first = b.record("warm", 8, &[("v", int, 0)]);
        let second = b.record("late", 8, &[("v", int, 0)]);
        let universe = b.build();
        let config = GenConfig::default();
        let cx = GenCx::new(&universe, &config);

        let mut driver = RecipeDriver::new(&cx);
        driver.run([Subject::record(tid(first))]).unwrap();
        assert_eq!(driver.store().len(), 1);
        driver
            .run([Subject::record(tid(first)), Subject::record(tid(second))])
            .unwrap();
        let out = driver.finish();
        assert_eq!(out.store.len(), 2);
    }

    #[test]
    fn test_bridges_are_deduplicated() {
        let mut b = UniverseBuilder::new();
        let int = b.builtin("int", 4);
        let rec = b.record("span_core", 8, &[("v", int, 0)]);
        let td = b.typedef("span_t", rec);
        let td_ptr = b.pointer(td);
        let host = b.record(
            "twin_host",
            16,
            &[("left", td_ptr, 0), ("right", td_ptr, 8)],
        );
        let universe = b.build();
        let config = GenConfig::default();
        let cx = GenCx::new(&universe, &config);

        let out = generate_recipes(&cx, [Subject::record(tid(host))]).unwrap();
        assert_eq!(out.record_typedefs.len(), 1);
        assert_eq!(
            universe.interner().lookup(out.record_typedefs[0].typedef_name),
            "span_t"
        );
    }

    #[test]
    fn test_stats_accumulate_across_subjects() {
        let mut b = UniverseBuilder::new();
        let int = b.builtin("int", 4);
        let inner = b.record("acc_inner", 8, &[("a", int, 0), ("b", int, 4)]);
        let inner_ptr = b.pointer(inner);
        let outer = b.record("acc_outer", 8, &[("inner", inner_ptr, 0)]);
        let universe = b.build();
        let config = GenConfig::default();
        let cx = GenCx::new(&universe, &config);

        let out = generate_recipes(&cx, [Subject::record(tid(outer))]).unwrap();
        assert_eq!(out.report.stats.members_seen, 3);
        assert_eq!(out.report.stats.member_recipes, 1);
    }
}
