//! Companion log and terminal summary rendering.
//!
//! The `.recipes.log` file enumerates, section by section, every member
//! that took a fallback or manual-review path during generation. Sections
//! follow [`ReportCategory::LOG_ORDER`] so the file diffs cleanly between
//! runs; each heading carries the entry count and the number of distinct
//! subjects involved.

use rustc_hash::FxHashSet;

use flatgen_ir::{GenerationReport, RecipeFlags, RecipeStore, ReportCategory, ReportEntry};

fn render_entry(entry: &ReportEntry, out: &mut String) {
    out.push_str("  ");
    out.push_str(&entry.subject);
    if let Some(member) = &entry.member {
        out.push_str(" -> ");
        out.push_str(member);
    }
    if let Some(detail) = &entry.detail {
        out.push_str(" [");
        out.push_str(detail);
        out.push(']');
    }
    out.push('\n');
}

/// Render the `.recipes.log` report.
pub fn render_log(report: &GenerationReport) -> String {
    let mut out = String::new();
    for &category in ReportCategory::LOG_ORDER {
        let entries: Vec<&ReportEntry> = report.in_category(category).collect();
        let unique: FxHashSet<&str> = entries.iter().map(|e| e.subject.as_str()).collect();
        out.push_str(&format!(
            "# {}: {} [{} unique]\n",
            category.heading(),
            entries.len(),
            unique.len()
        ));
        for entry in entries {
            render_entry(entry, &mut out);
        }
    }
    out
}

/// Render the terminal summary printed at the end of a run.
pub fn render_summary(report: &GenerationReport, store: &RecipeStore) -> String {
    let simple = store.iter().filter(|r| r.is_simple()).count();
    let check = store.iter().filter(|r| r.needs_check()).count();
    let fix = store
        .iter()
        .filter(|r| r.flags.contains(RecipeFlags::NEEDS_REVIEW))
        .count();
    let stats = &report.stats;
    format!(
        "--- Generated recipes: {} (simple: {simple}, to check: {check}, to fix: {fix})\n\
         --- Members visited: {} ({} with flattening nodes)\n\
         --- Members with an unresolved element count: {}\n\
         --- Members never dereferenced (omitted): {}\n\
         --- Members pointing into user memory: {}\n\
         --- Functions reachable from the entry point: {}\n\
         --- Recipes generation stats are available in .recipes.log file\n",
        store.len(),
        stats.members_seen,
        stats.member_recipes,
        stats.not_safe,
        stats.not_used,
        stats.user_memory,
        stats.functions_reachable,
    )
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests {
    use flatgen_ir::{Name, Recipe, StringInterner, SubjectKind, TypeId, TypeKey};
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_log_sections_follow_fixed_order() {
        let mut report = GenerationReport::new();
        report.note_member(
            ReportCategory::CharPointer,
            "struct tty".to_owned(),
            "name".to_owned(),
        );
        report.note_member(
            ReportCategory::CharPointer,
            "struct tty".to_owned(),
            "driver_name".to_owned(),
        );
        report.note_member_detail(
            ReportCategory::ContainerOfAmbiguous,
            "struct kobject".to_owned(),
            "parent".to_owned(),
            "struct device@-16, struct bus_type@0".to_owned(),
        );
        let text = render_log(&report);

        assert!(text.starts_with("# Blacklisted structs: 0 [0 unique]\n"));
        assert!(text.contains(
            "# Pointers to char (strings): 2 [1 unique]\n\
             \x20 struct tty -> name\n\
             \x20 struct tty -> driver_name\n"
        ));
        assert!(text.contains(
            "# Ambiguous container_of targets: 1 [1 unique]\n\
             \x20 struct kobject -> parent [struct device@-16, struct bus_type@0]\n"
        ));
        // Every category appears, populated or not.
        assert_eq!(
            text.matches("# ").count(),
            ReportCategory::LOG_ORDER.len()
        );
    }

    #[test]
    fn test_summary_counts_store_classes() {
        let interner = StringInterner::new();
        let mut store = RecipeStore::new();
        store
            .insert(Recipe {
                subject: TypeKey::new(SubjectKind::Struct, interner.intern("plain")),
                type_id: TypeId::from_raw(0),
                byte_size: 8,
                location: Name::EMPTY,
                nodes: Vec::new(),
                flags: RecipeFlags::empty(),
                custom_body: None,
            })
            .unwrap();
        store
            .insert(Recipe {
                subject: TypeKey::new(SubjectKind::Struct, interner.intern("handwork")),
                type_id: TypeId::from_raw(1),
                byte_size: 8,
                location: Name::EMPTY,
                nodes: Vec::new(),
                flags: RecipeFlags::NEEDS_REVIEW | RecipeFlags::CUSTOM,
                custom_body: Some("/* operator body */".to_owned()),
            })
            .unwrap();

        let mut report = GenerationReport::new();
        report.stats.members_seen = 12;
        report.stats.member_recipes = 5;
        report.stats.not_safe = 2;
        report.stats.functions_reachable = 7;

        assert_eq!(
            render_summary(&report, &store),
            "--- Generated recipes: 2 (simple: 1, to check: 1, to fix: 1)\n\
             --- Members visited: 12 (5 with flattening nodes)\n\
             --- Members with an unresolved element count: 2\n\
             --- Members never dereferenced (omitted): 0\n\
             --- Members pointing into user memory: 0\n\
             --- Functions reachable from the entry point: 7\n\
             --- Recipes generation stats are available in .recipes.log file\n"
        );
    }
}
