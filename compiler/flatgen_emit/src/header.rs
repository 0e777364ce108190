//! Shared header rendering.
//!
//! `common.h` gives every generated source file the same view of the
//! flattened world: resolved location includes, a forward declaration
//! for each record a recipe exists for, typedef bridges so struct-type
//! recipes compile without pulling in the defining headers, and
//! declarations of the generated flatten functions.

use rustc_hash::FxHashSet;

use flatgen_analysis::{AnonTypedef, DriverOutput, RecordTypedef};
use flatgen_facts::{Type, Universe, BUILTIN_STRUCT_TYPE_BLACKLIST};
use flatgen_ir::{StringLookup, TypeId};

use crate::layout::normalize_path;

/// Strip the first matching include directory off a record location,
/// yielding the path a `#include` directive should use. Locations carry
/// a `:line` suffix, which is dropped first.
pub fn resolve_include(location: &str, include_dirs: &[String]) -> Option<String> {
    let file = location.split_once(':').map_or(location, |(path, _)| path);
    let file = normalize_path(file);
    for dir in include_dirs {
        let dir = dir.trim_end_matches('/');
        if dir.is_empty() {
            continue;
        }
        if let Some(rest) = file.strip_prefix(dir) {
            if let Some(rel) = rest.strip_prefix('/') {
                if !rel.is_empty() {
                    return Some(rel.to_owned());
                }
            }
        }
    }
    None
}

fn record_keyword(universe: &Universe, id: TypeId) -> &'static str {
    match universe.type_of(id) {
        Type::Record(record) if record.is_union => "union",
        Type::RecordForward { is_union: true, .. } => "union",
        _ => "struct",
    }
}

fn is_enum(universe: &Universe, id: TypeId) -> bool {
    matches!(
        universe.type_of(id),
        Type::Enum { .. } | Type::EnumForward { .. }
    )
}

/// Render `common.h` for one generation run.
pub fn render_common_header(
    universe: &Universe,
    output: &DriverOutput,
    include_dirs: &[String],
) -> String {
    let lookup = universe.interner();
    let sorted = output.store.iter_sorted(lookup);

    let mut includes: Vec<String> = Vec::new();
    let mut seen_includes: FxHashSet<String> = FxHashSet::default();
    let mut forwards: Vec<String> = Vec::new();
    let mut declares: Vec<String> = Vec::new();
    for recipe in &sorted {
        if !include_dirs.is_empty() && !recipe.location.is_empty() {
            if let Some(rel) = resolve_include(lookup.lookup(recipe.location), include_dirs) {
                if seen_includes.insert(rel.clone()) {
                    includes.push(format!("#include <{rel}>"));
                }
            }
        }
        if recipe.subject.kind.is_typedef() {
            continue;
        }
        let name = lookup.lookup(recipe.subject.name);
        forwards.push(format!("{} {name};", recipe.subject.kind.keyword()));
        declares.push(format!(
            "FUNCTION_DECLARE_FLATTEN_{}_ITER({name});",
            recipe.subject.kind.macro_tag()
        ));
    }
    includes.sort();

    // Typedef bridges are deduplicated by name; declarations stay even
    // when the bridge is suppressed because the headers already provide
    // the type.
    let mut bridges: Vec<String> = Vec::new();
    let mut bridged: FxHashSet<&str> = FxHashSet::default();
    let mut declared: FxHashSet<&str> = FxHashSet::default();
    let mut typedefs: Vec<&RecordTypedef> = output.record_typedefs.iter().collect();
    typedefs.sort_by(|a, b| lookup.lookup(a.typedef_name).cmp(lookup.lookup(b.typedef_name)));
    for bridge in typedefs {
        let name = lookup.lookup(bridge.typedef_name);
        let tag = lookup.lookup(bridge.tag);
        if !BUILTIN_STRUCT_TYPE_BLACKLIST.contains(&name) && bridged.insert(name) {
            let keyword = record_keyword(universe, bridge.record);
            bridges.push(format!("{keyword} {tag};\ntypedef {keyword} {tag} {name};"));
        }
        if declared.insert(name) {
            declares.push(format!("FUNCTION_DECLARE_FLATTEN_STRUCT_TYPE_ITER({name});"));
        }
    }
    let mut anons: Vec<&AnonTypedef> = output.anon_typedefs.iter().collect();
    anons.sort_by(|a, b| lookup.lookup(a.name).cmp(lookup.lookup(b.name)));
    for anon in anons {
        let name = lookup.lookup(anon.name);
        if !bridged.insert(name) {
            continue;
        }
        if is_enum(universe, anon.record) {
            // Enum layouts flatten by value, so a plain integer alias is
            // enough to keep the generated sources compiling.
            bridges.push(format!("typedef unsigned int {name};"));
            continue;
        }
        let base = name.strip_suffix("_t").unwrap_or(name);
        let keyword = record_keyword(universe, anon.record);
        bridges.push(format!("{keyword} {base};\ntypedef {keyword} {base} {name};"));
        if declared.insert(name) {
            declares.push(format!("FUNCTION_DECLARE_FLATTEN_STRUCT_TYPE_ITER({name});"));
        }
    }

    let mut blocks: Vec<String> = Vec::new();
    if !includes.is_empty() {
        blocks.push(includes.join("\n"));
    }
    if !forwards.is_empty() {
        blocks.push(forwards.join("\n"));
    }
    if !bridges.is_empty() {
        blocks.push(bridges.join("\n"));
    }
    if !declares.is_empty() {
        blocks.push(declares.join("\n"));
    }
    if blocks.is_empty() {
        return "#ifndef __COMMON_H__\n#define __COMMON_H__\n\n#endif /* __COMMON_H__ */\n"
            .to_owned();
    }
    format!(
        "#ifndef __COMMON_H__\n#define __COMMON_H__\n\n{}\n\n#endif /* __COMMON_H__ */\n",
        blocks.join("\n\n")
    )
}
