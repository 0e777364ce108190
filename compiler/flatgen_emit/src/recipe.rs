//! Recipe-to-C rendering.
//!
//! Turns a [`Recipe`] into the `FUNCTION_DEFINE_FLATTEN_*` definition the
//! kernel module compiles. Nodes at depth zero render as `AGGREGATE_*`
//! self-contained macros against the enclosing record; nodes under a
//! pointer chain render as plain `FLATTEN_*` macros against the loop
//! variable the surrounding `FOR_POINTER` binds.

use flatgen_ir::{
    CountPolicy, ElemRef, MemberSite, Name, Recipe, RecipeFlags, RecipeNode, RecipeNote,
    RecordRef, StringLookup, StubCause, SubjectKind, TypeKey,
};

use flatgen_facts::POINTER_SIZE;

/// Indentation step inside generated flatten bodies.
const TAB: &str = "  ";

/// Prefix every non-empty line of `text` with `levels` indentation steps.
pub(crate) fn indent(text: &str, levels: usize) -> String {
    let pad = TAB.repeat(levels);
    let mut out = String::with_capacity(text.len() + 16 * pad.len());
    for (i, line) in text.lines().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        if !line.is_empty() {
            out.push_str(&pad);
            out.push_str(line);
        }
    }
    out
}

fn union_marker(site: &MemberSite) -> &'static str {
    if site.in_union {
        "   /* VERIFY union member */"
    } else {
        ""
    }
}

/// The trailing review marker for a follow whose element count could not
/// be settled from the available evidence.
fn safe_marker(count: CountPolicy) -> &'static str {
    if count.is_safe() {
        ""
    } else {
        " /* not SAFE */"
    }
}

/// Loop variable bound for a member at pointer nesting `level`.
fn nested_var(lookup: &impl StringLookup, site: &MemberSite, level: u8) -> String {
    format!("__{}_{}", site.dotted(lookup).replace('.', "_"), level)
}

/// The count slot of a follow macro. Unsafe counts degrade to a single
/// element; runtime probes ask the flatten engine for the allocation
/// size of the pointee.
fn count_text(
    lookup: &impl StringLookup,
    site: &MemberSite,
    count: CountPolicy,
    elem_size: &str,
) -> String {
    match count {
        CountPolicy::Known { elems, .. } => elems.to_string(),
        CountPolicy::Expr(name) => lookup.lookup(name).to_owned(),
        CountPolicy::Ambiguous(_) => "1".to_owned(),
        CountPolicy::RuntimeProbe => {
            let probe = if site.depth == 0 {
                format!(
                    "AGGREGATE_FLATTEN_DETECT_OBJECT_SIZE_SELF_CONTAINED({},{},{elem_size})",
                    site.dotted(lookup),
                    site.byte_offset
                )
            } else {
                format!(
                    "AGGREGATE_FLATTEN_DETECT_OBJECT_SIZE({},{elem_size})",
                    nested_var(lookup, site, site.depth)
                )
            };
            if elem_size == "1" {
                probe
            } else {
                format!("{probe}/{elem_size}")
            }
        }
    }
}

/// Render one recipe node as C text without a trailing newline.
pub fn render_node(lookup: &impl StringLookup, subject: TypeKey, node: &RecipeNode) -> String {
    match node {
        RecipeNode::CopyRecordArray {
            elem,
            elems,
            member,
        } => render_storage(lookup, *elem, *elems, member),
        RecipeNode::FollowRecordPointer {
            target,
            member,
            count,
            offset_adjust,
            source_exprs,
        } => render_record_follow(lookup, *target, member, *count, *offset_adjust, source_exprs),
        RecipeNode::FollowScalarPointer {
            type_name,
            member,
            count,
        } => {
            let ctype = lookup.lookup(*type_name).to_owned();
            let elem_size = format!("sizeof({ctype})");
            render_type_follow(lookup, &ctype, member, *count, &elem_size)
        }
        RecipeNode::FollowOpaquePointer { member, count } => {
            render_type_follow(lookup, "unsigned char", member, *count, "1")
        }
        RecipeNode::FollowEnumPointer {
            type_name,
            byte_size,
            member,
            count,
        } => render_enum_follow(lookup, lookup.lookup(*type_name), *byte_size, member, *count),
        RecipeNode::CString { member } => render_string(lookup, member),
        RecipeNode::FunctionPointer { member } => render_function_pointer(lookup, member),
        RecipeNode::PointerChain {
            member,
            inner_ctype,
            inner,
        } => render_chain(lookup, subject, member, *inner_ctype, inner),
        RecipeNode::ListTraversal {
            container,
            link_offset,
            member,
        } => render_list(lookup, *container, *link_offset, member),
        RecipeNode::FlexibleArrayTail { elem, member } => render_flexible(lookup, elem, member),
        RecipeNode::Stub { member, cause } => render_stub(lookup, member, *cause),
        RecipeNode::Note { member, note } => render_note(lookup, subject, member, note),
    }
}

/// Inline array of records: flatten each element's internal storage in
/// place instead of following a pointer.
fn render_storage(
    lookup: &impl StringLookup,
    elem: RecordRef,
    elems: u64,
    site: &MemberSite,
) -> String {
    let name = lookup.lookup(elem.key.name).to_owned();
    let path = site.dotted(lookup);
    let umark = union_marker(site);
    let off = site.byte_offset;
    let size = elem.byte_size;
    let (ctype, macro_kind, comment_kind) = match elem.key.kind {
        SubjectKind::Struct => (format!("struct {name}"), "STRUCT", "STRUCT"),
        // The commented short form always says STRUCT_STORAGE, union or not.
        SubjectKind::Union => (format!("union {name}"), "UNION", "STRUCT"),
        SubjectKind::TypedefStruct | SubjectKind::TypedefUnion => {
            (name.clone(), "STRUCT_TYPE", "STRUCT_TYPE")
        }
    };
    format!(
        "{{for (int __i=0; __i<{elems}; ++__i) {{\n    const {ctype}* __p = /* ATTR({path}) */ (const {ctype}*)(OFFADDR(unsigned char,{off})+{size}*__i);\n      /* AGGREGATE_FLATTEN_{comment_kind}_STORAGE({name},__p); */\n    AGGREGATE_FLATTEN_{macro_kind}_STORAGE_ITER({name},__p);{umark}\n}}}}"
    )
}

fn render_record_follow(
    lookup: &impl StringLookup,
    target: RecordRef,
    site: &MemberSite,
    count: CountPolicy,
    offset_adjust: i64,
    source_exprs: &[String],
) -> String {
    let name = lookup.lookup(target.key.name).to_owned();
    let size = target.byte_size;
    let cnt = count_text(lookup, site, count, &size.to_string());
    let umark = union_marker(site);
    let smark = safe_marker(count);
    let macro_kind = if target.key.kind.is_typedef() {
        "STRUCT_TYPE"
    } else {
        target.key.kind.macro_tag()
    };
    if site.depth > 0 {
        let var = nested_var(lookup, site, site.depth);
        return format!(
            "FLATTEN_{macro_kind}_ARRAY_ITER_SELF_CONTAINED({name},{size},{var},{cnt});{umark}{smark}"
        );
    }
    let path = site.dotted(lookup);
    let off = site.byte_offset;
    let comment_kind = if target.key.kind.is_typedef() {
        "STRUCT_TYPE"
    } else {
        "STRUCT"
    };
    let mut replaced = String::new();
    if !source_exprs.is_empty() {
        replaced.push_str(
            "  /* Original member pointee type replaced by the type detected from the following 'container_of' invocations:\n",
        );
        for expr in source_exprs {
            replaced.push_str("  *  ");
            replaced.push_str(expr);
            replaced.push('\n');
        }
        replaced.push_str("  */\n");
    }
    format!(
        "  /* AGGREGATE_FLATTEN_{comment_kind}_ARRAY({name},{path},{cnt}); */\n{replaced}AGGREGATE_FLATTEN_{macro_kind}_ARRAY_ITER_SELF_CONTAINED_SHIFTED({name},{size},{path},{off},{cnt},{offset_adjust});{umark}{smark}"
    )
}

/// Follow to a builtin or otherwise sizeless pointee as a plain byte or
/// scalar array.
fn render_type_follow(
    lookup: &impl StringLookup,
    ctype: &str,
    site: &MemberSite,
    count: CountPolicy,
    elem_size: &str,
) -> String {
    let cnt = count_text(lookup, site, count, elem_size);
    let umark = union_marker(site);
    let smark = safe_marker(count);
    if site.depth > 0 {
        let var = nested_var(lookup, site, site.depth);
        return format!("FLATTEN_TYPE_ARRAY({ctype},{var},{cnt});{umark}{smark}");
    }
    let path = site.dotted(lookup);
    let off = site.byte_offset;
    format!(
        "  /* AGGREGATE_FLATTEN_TYPE_ARRAY({ctype},{path},{cnt}); */\nAGGREGATE_FLATTEN_TYPE_ARRAY_SELF_CONTAINED({ctype},{path},{off},{cnt});{umark}{smark}"
    )
}

fn render_enum_follow(
    lookup: &impl StringLookup,
    label: &str,
    byte_size: u64,
    site: &MemberSite,
    count: CountPolicy,
) -> String {
    let cnt = count_text(lookup, site, count, &byte_size.to_string());
    let umark = union_marker(site);
    let smark = safe_marker(count);
    if site.depth > 0 {
        let var = nested_var(lookup, site, site.depth);
        return format!("FLATTEN_COMPOUND_TYPE_ARRAY({label},{byte_size},{var},{cnt});{umark}{smark}");
    }
    let path = site.dotted(lookup);
    let off = site.byte_offset;
    format!(
        "  /* AGGREGATE_FLATTEN_TYPE_ARRAY({label},{path},{cnt}); */\nAGGREGATE_FLATTEN_COMPOUND_TYPE_ARRAY_SELF_CONTAINED({label},{byte_size},{path},{off},{cnt});{umark}{smark}"
    )
}

fn render_string(lookup: &impl StringLookup, site: &MemberSite) -> String {
    let umark = union_marker(site);
    if site.depth > 0 {
        let var = nested_var(lookup, site, site.depth);
        return format!("FLATTEN_STRING({var});{umark}");
    }
    let path = site.dotted(lookup);
    let off = site.byte_offset;
    format!(
        "  /* AGGREGATE_FLATTEN_STRING({path}); */\nAGGREGATE_FLATTEN_STRING_SELF_CONTAINED({path},{off});{umark}"
    )
}

fn render_function_pointer(lookup: &impl StringLookup, site: &MemberSite) -> String {
    let umark = union_marker(site);
    if site.depth > 0 {
        let var = nested_var(lookup, site, site.depth);
        return format!("FLATTEN_FUNCTION_POINTER({var});{umark}");
    }
    let path = site.dotted(lookup);
    let off = site.byte_offset;
    format!(
        "  /* AGGREGATE_FLATTEN_FUNCTION_POINTER({path}); */\nAGGREGATE_FLATTEN_FUNCTION_POINTER_SELF_CONTAINED({path},{off});{umark}"
    )
}

/// A pointer-to-pointer member: register the outer pointer cell, then
/// loop over it and flatten whatever the inner level holds. The pointer
/// cell keeps the member's own offset at every nesting level.
fn render_chain(
    lookup: &impl StringLookup,
    subject: TypeKey,
    site: &MemberSite,
    inner_ctype: Name,
    inner: &RecipeNode,
) -> String {
    let ctype = lookup.lookup(inner_ctype).to_owned();
    let path = site.dotted(lookup);
    let off = site.byte_offset;
    let level = site.depth;
    let next = nested_var(lookup, site, level + 1);
    let source = if level == 0 {
        format!("/*ATTR({path})*/ OFFATTR(void**,{off})")
    } else {
        nested_var(lookup, site, level)
    };
    let umark = union_marker(site);
    let smark = inner.count().map_or("", safe_marker);
    let body = indent(&render_node(lookup, subject, inner), 1);
    format!(
        "AGGREGATE_FLATTEN_TYPE_ARRAY_SELF_CONTAINED({ctype},{path},{off},1);\nFOR_POINTER({ctype},{next},{source},{umark}{smark}\n{body}\n);"
    )
}

/// A `list_head` anchor: follow both link pointers shifted back to the
/// start of the containing object, so every list node flattens as a whole
/// container rather than as a bare pair of pointers.
fn render_list(
    lookup: &impl StringLookup,
    container: RecordRef,
    link_offset: u64,
    site: &MemberSite,
) -> String {
    let name = lookup.lookup(container.key.name).to_owned();
    let size = container.byte_size;
    let path = site.dotted(lookup);
    let umark = union_marker(site);
    let next_off = site.byte_offset;
    let prev_off = site.byte_offset + POINTER_SIZE;
    let shift = 0i64.saturating_sub_unsigned(link_offset);
    let (label, macro_kind) = match container.key.kind {
        SubjectKind::Struct => (format!("struct {name}"), "STRUCT"),
        SubjectKind::Union => (format!("union {name}"), "UNION"),
        SubjectKind::TypedefStruct | SubjectKind::TypedefUnion => (name.clone(), "STRUCT_TYPE"),
    };
    format!(
        "/* Traverse the '{path}' list; each link belongs to a {label} */\nAGGREGATE_FLATTEN_{macro_kind}_ARRAY_ITER_SELF_CONTAINED_SHIFTED({name},{size},{path}.next,{next_off},1,{shift});{umark}\nAGGREGATE_FLATTEN_{macro_kind}_ARRAY_ITER_SELF_CONTAINED_SHIFTED({name},{size},{path}.prev,{prev_off},1,{shift});{umark}"
    )
}

/// A flexible array member at the end of the record: let the flatten
/// engine size the tail from the enclosing allocation.
fn render_flexible(lookup: &impl StringLookup, elem: &ElemRef, site: &MemberSite) -> String {
    let path = site.dotted(lookup);
    let off = site.byte_offset;
    let umark = union_marker(site);
    match elem {
        ElemRef::Record(rec) => {
            let name = lookup.lookup(rec.key.name).to_owned();
            let size = rec.byte_size;
            let macro_kind = match rec.key.kind {
                SubjectKind::Struct => "STRUCT",
                SubjectKind::Union => "UNION",
                SubjectKind::TypedefStruct | SubjectKind::TypedefUnion => "STRUCT_TYPE",
            };
            format!(
                "  /* AGGREGATE_FLATTEN_{macro_kind}_FLEXIBLE({name},{path}); */\nAGGREGATE_FLATTEN_{macro_kind}_FLEXIBLE_SELF_CONTAINED({name},{size},{path},{off});{umark}"
            )
        }
        ElemRef::Scalar { type_name } => {
            let ctype = lookup.lookup(*type_name).to_owned();
            format!(
                "  /* AGGREGATE_FLATTEN_TYPE_ARRAY_FLEXIBLE({ctype},{path}); */\nAGGREGATE_FLATTEN_TYPE_ARRAY_FLEXIBLE_SELF_CONTAINED({ctype},{path},{off});{umark}"
            )
        }
    }
}

fn render_stub(lookup: &impl StringLookup, site: &MemberSite, cause: StubCause) -> String {
    let path = site.dotted(lookup);
    match cause {
        StubCause::PointerInUnion => format!(
            "/* member '{path}' is a pointer inside union; TODO: please write the proper recipe */"
        ),
        StubCause::ComplexMember | StubCause::ComplexPointer => {
            format!("/* TODO: implement flattening member '{path}' */")
        }
        StubCause::IncompleteArrayStorage => format!(
            "/* TODO: implement flattening member '{path}' (save internal structure storage for incomplete array) */"
        ),
        StubCause::FlexibleMidRecord => format!(
            "/* TODO: member '{path}' is a const array of size 0; consider flexible array member */"
        ),
    }
}

fn render_note(
    lookup: &impl StringLookup,
    subject: TypeKey,
    site: &MemberSite,
    note: &RecipeNote,
) -> String {
    let path = site.dotted(lookup);
    match note {
        RecipeNote::NotUsed => format!("/* member '{path}' not used */"),
        RecipeNote::UserMemory => format!("/* Member '{path}' points to __user memory */"),
        RecipeNote::ZeroSizePointee { .. } => {
            format!("/* member '{path}' points to a structure of size 0 */")
        }
        RecipeNote::MissingDefinition { tag } => {
            format!("/* MISSING STRUCT: {} */", lookup.lookup(*tag))
        }
        RecipeNote::BlacklistedTarget { tag } => {
            let name = lookup.lookup(*tag);
            if subject.kind.is_typedef() {
                format!("/* Recipes for struct type {name} have been blacklisted */")
            } else {
                format!(
                    "/* Recipes for {} {name} have been blacklisted */",
                    subject.kind.keyword()
                )
            }
        }
    }
}

fn banner(recipe: &Recipe) -> String {
    let mut attrs: Vec<&str> = Vec::new();
    if recipe.is_simple() {
        attrs.push("SIMPLE");
    }
    if recipe.needs_check() {
        attrs.push("CHECK");
    }
    if recipe.flags.contains(RecipeFlags::UNION_CHECK) {
        attrs.push("UNION");
    }
    if recipe.flags.contains(RecipeFlags::NEEDS_REVIEW) {
        attrs.push("FIX");
    }
    if attrs.is_empty() {
        String::new()
    } else {
        format!("/* {} */\n", attrs.join(" - "))
    }
}

/// Render a complete recipe: the attribute banner followed by the
/// flatten function definition. No trailing newline.
pub fn render_recipe(lookup: &impl StringLookup, recipe: &Recipe) -> String {
    let name = lookup.lookup(recipe.subject.name).to_owned();
    let size = recipe.byte_size;
    let raw = match &recipe.custom_body {
        Some(text) => text.trim().to_owned(),
        None => {
            let lines: Vec<String> = recipe
                .nodes
                .iter()
                .map(|node| render_node(lookup, recipe.subject, node))
                .collect();
            lines.join("\n")
        }
    };
    let body = indent(&raw, 1);
    let definition = if recipe.subject.kind.is_typedef() {
        format!(
            "FUNCTION_DEFINE_FLATTEN_STRUCT_TYPE_ITER_SELF_CONTAINED({name},{size},\n{body}\n);"
        )
    } else {
        format!(
            "FUNCTION_DEFINE_FLATTEN_{}_ITER_SELF_CONTAINED({name},{size},\n{body}\n);",
            recipe.subject.kind.macro_tag()
        )
    };
    format!("{}{definition}", banner(recipe))
}
