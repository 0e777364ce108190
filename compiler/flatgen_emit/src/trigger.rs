//! Probe handler and root-trigger rendering.
//!
//! Every run produces one handler for the entry function. Argument roots
//! cast the saved probe register to the record type and flatten it;
//! global roots look the symbol up by name at runtime, then run the
//! flatten chain their declared type shaped. Both sit inside
//! `FOR_EXTENDED_ROOT_POINTER` so the dump carries a stable root name.

use flatgen_ir::{RootIdentity, StringLookup, SubjectKind, Trigger, TriggerShape};

use crate::recipe::indent;

/// Render the flatten calls for one root shape. `level` is the pointer
/// depth; level zero targets the harness root pointer, deeper levels the
/// loop variable bound by the enclosing `FOREACH_POINTER`.
fn render_shape(
    lookup: &impl StringLookup,
    shape: &TriggerShape,
    root_var: &str,
    level: u32,
) -> String {
    let target = if level == 0 {
        "__root_ptr".to_owned()
    } else {
        format!("__{root_var}_{level}")
    };
    match shape {
        TriggerShape::Record { target: rec, elems } => {
            let name = lookup.lookup(rec.key.name);
            let size = rec.byte_size;
            if rec.key.kind.is_typedef() {
                format!(
                    "FLATTEN_STRUCT_TYPE_ARRAY_ITER_SELF_CONTAINED({name},{size},{target},{elems});"
                )
            } else {
                format!(
                    "FLATTEN_{}_ARRAY_ITER_SELF_CONTAINED({name},{size},{target},{elems});",
                    rec.key.kind.macro_tag()
                )
            }
        }
        TriggerShape::Scalar { type_name, elems } => {
            format!(
                "FLATTEN_TYPE_ARRAY({},{target},{elems});",
                lookup.lookup(*type_name)
            )
        }
        TriggerShape::Compound {
            type_name,
            byte_size,
            elems,
        } => {
            format!(
                "FLATTEN_COMPOUND_TYPE_ARRAY({},{byte_size},{target},{elems});",
                lookup.lookup(*type_name)
            )
        }
        TriggerShape::CString => format!("FLATTEN_STRING({target});"),
        TriggerShape::FunctionPtr => format!("FLATTEN_FUNCTION_POINTER({target});"),
        TriggerShape::Pointer {
            inner_ctype,
            elems,
            inner,
        } => {
            let next = format!("__{root_var}_{}", level + 1);
            let body = indent(&render_shape(lookup, inner, root_var, level + 1), 1);
            format!(
                "FOREACH_POINTER({},{next},{target},{elems},\n{body}\n);",
                lookup.lookup(*inner_ctype)
            )
        }
        TriggerShape::Unhandled { note } => {
            if note.is_empty() {
                String::new()
            } else {
                format!("/* TODO: {} */", lookup.lookup(*note))
            }
        }
    }
}

/// Render the handler block that dumps one root. Argument roots come out
/// as a cast of the probed register, globals as a runtime symbol lookup
/// guarded against modules that are not loaded.
pub fn render_root_dump(lookup: &impl StringLookup, trigger: &Trigger) -> String {
    match &trigger.identity {
        RootIdentity::Argument { position, .. } => render_argument_dump(lookup, trigger, *position),
        RootIdentity::Global { name, module, hash } => {
            let mut var_name = lookup.lookup(*name).to_owned();
            let module_name = lookup.lookup(*module);
            if !module_name.is_empty() && module_name != "vmlinux" {
                var_name.push(':');
                var_name.push_str(module_name);
            }
            let body = render_shape(lookup, &trigger.shape, lookup.lookup(*name), 0)
                .trim()
                .replace('\n', "\n\t\t\t\t");
            let percpu = if trigger.per_cpu {
                "\t\taddr = this_cpu_ptr(addr);\n\n"
            } else {
                ""
            };
            format!(
                "\n\t// Dump global {var_name}\n\tdo {{\n\t\tvoid* addr = flatten_global_address_by_name(\"{var_name}\");\n\t\tif(addr == NULL) {{\n\t\t\tpr_err(\"skipping global {var_name} ...\");\n\t\t\tbreak;\n\t\t}}\n\n{percpu}\t\tFOR_EXTENDED_ROOT_POINTER(addr, \"{}\", {},\n\t\t\tUNDER_ITER_HARNESS(\n\t\t\t\t{body}\n\t\t\t);\n\t\t);\n\t}} while(0);\n",
                lookup.lookup(*hash),
                trigger.byte_size
            )
        }
    }
}

fn render_argument_dump(lookup: &impl StringLookup, trigger: &Trigger, position: u8) -> String {
    let TriggerShape::Record { target, .. } = &trigger.shape else {
        return format!(
            "\n\t// Dump argument no. {position}\n\t/* argument root is not a record; nothing to dump */\n"
        );
    };
    let name = lookup.lookup(target.key.name);
    let (ctype, flatten) = match target.key.kind {
        SubjectKind::Struct => (
            format!("struct {name}"),
            format!("FLATTEN_STRUCT_ITER_SELF_CONTAINED({name}, 1, target);"),
        ),
        SubjectKind::Union => (
            format!("union {name}"),
            format!("FLATTEN_UNION_ITER_SELF_CONTAINED({name}, 1, target);"),
        ),
        SubjectKind::TypedefStruct | SubjectKind::TypedefUnion => (
            name.to_owned(),
            format!("FLATTEN_STRUCT_TYPE_ITER_SELF_CONTAINED({name}, 1, target);"),
        ),
    };
    format!(
        "\n\t// Dump argument no. {position}\n\t{{\n\t\t{ctype} *target = ({ctype}*) regs->arg{position};\n\n\t\tFOR_EXTENDED_ROOT_POINTER(target, \"_func_arg_{position}\", {},\n\t\t\tUNDER_ITER_HARNESS(\n\t\t\t\t{flatten}\n\t\t\t);\n\t\t);\n\t}}\n",
        trigger.byte_size
    )
}

/// Render the probe handler wrapping the argument and global dumps.
pub fn render_handler(entry: &str, args: &str, globals: &str) -> String {
    format!(
        "\nstatic void handler_{entry}(struct kflat* kflat, struct probe_regs* regs) {{\n\t{}\n\n\t{}\n}}\n",
        args.trim(),
        globals.trim()
    )
}
