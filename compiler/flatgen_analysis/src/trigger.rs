//! Root trigger construction.
//!
//! Roots name the places flattening starts: probed function arguments and
//! kernel globals. Specs arrive as command-line positionals and a globals
//! list file; `trigger_list` configuration adds or replaces argument roots
//! for the entry function. Every spec resolves against the universe up
//! front, so a misspelled root fails the run instead of producing an empty
//! module. Shapes are then built by peeling the root's declared type one
//! level at a time, with no member evidence to draw on.

use std::path::Path;

use flatgen_facts::{CountSpec, Type};
use flatgen_ir::{Name, RootIdentity, Subject, Trigger, TriggerShape, TypeId};
use tracing::{debug, warn};

use crate::{GenCx, GenError};

/// One requested root, resolved against the universe but not yet shaped.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RootRequest {
    /// An argument of the probed entry function.
    Argument {
        /// Declared record type of the argument.
        record: TypeId,
        /// The spelling the operator used.
        display: Name,
        /// 1-based position in the saved register file.
        position: u8,
    },
    /// A named global.
    Global {
        /// Declared type, stripped of const qualification.
        ty: TypeId,
        name: Name,
        module: Name,
        hash: Name,
    },
}

impl RootRequest {
    /// Subject seeding the recipe driver for this root.
    pub fn seed(&self, cx: &GenCx<'_>) -> Subject {
        match self {
            RootRequest::Argument { record, .. } => cx.subject_for(*record),
            RootRequest::Global { ty, .. } => cx.subject_for(*ty),
        }
    }

    /// The spelling dry runs print for this root.
    pub fn describe(&self, cx: &GenCx<'_>) -> String {
        let interner = cx.universe.interner();
        match self {
            RootRequest::Argument {
                display, position, ..
            } => format!("{}@{position}", interner.lookup(*display)),
            RootRequest::Global { name, module, .. } => {
                format!("{}:{}", interner.lookup(*name), interner.lookup(*module))
            }
        }
    }
}

/// Triggers plus the record subjects their shapes reach. Recipes must
/// exist for every dep before emission, so the driver runs once more over
/// them after trigger construction.
#[derive(Debug, Default)]
pub struct TriggerSet {
    pub triggers: Vec<Trigger>,
    pub deps: Vec<Subject>,
}

/// Resolve root specs, the globals list file and `trigger_list` overrides
/// into requests. Any lookup failure is fatal.
pub fn parse_roots(
    cx: &GenCx<'_>,
    specs: &[String],
    globals_list: Option<&Path>,
    entry: &str,
) -> Result<Vec<RootRequest>, GenError> {
    let mut requests = Vec::new();
    for spec in specs {
        if let Some((tag, pos)) = spec.split_once('@') {
            let position: u8 = pos.parse().map_err(|_| GenError::BadRootSpec {
                spec: spec.clone(),
                detail: "argument position is not a number",
            })?;
            requests.push(argument_request(cx, spec, tag, position)?);
        } else if let Some((name, suffix)) = spec.split_once(':') {
            requests.push(global_request(cx, name, suffix)?);
        } else {
            requests.push(argument_request(cx, spec, spec, 1)?);
        }
    }
    if let Some(path) = globals_list {
        requests.extend(list_roots(cx, path)?);
    }
    apply_overrides(cx, entry, &mut requests);
    check_positions(cx, entry, &requests)?;
    if requests.is_empty() && cx.config.root_types.is_empty() {
        return Err(GenError::NoSubjects);
    }
    Ok(requests)
}

fn argument_request(
    cx: &GenCx<'_>,
    spec: &str,
    tag: &str,
    position: u8,
) -> Result<RootRequest, GenError> {
    if position == 0 {
        return Err(GenError::BadRootSpec {
            spec: spec.to_owned(),
            detail: "argument positions start at 1",
        });
    }
    let universe = cx.universe;
    let name = universe.interner().intern(tag);
    let record = universe.record_by_tag(name)?;
    debug!(tag, position, "argument root");
    Ok(RootRequest::Argument {
        record,
        display: name,
        position,
    })
}

fn global_request(cx: &GenCx<'_>, name: &str, suffix: &str) -> Result<RootRequest, GenError> {
    let universe = cx.universe;
    let global = universe.global_by_name(name, suffix)?;
    debug!(
        name,
        module = %universe.interner().lookup(global.module),
        "global root"
    );
    Ok(RootRequest::Global {
        ty: universe.non_const(global.ty),
        name: global.name,
        module: global.module,
        hash: global.hash,
    })
}

fn list_roots(cx: &GenCx<'_>, path: &Path) -> Result<Vec<RootRequest>, GenError> {
    let text = std::fs::read_to_string(path).map_err(|source| GenError::GlobalsListIo {
        path: path.to_owned(),
        source,
    })?;
    let mut requests = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (name, suffix) = split_list_entry(line);
        requests.push(global_request(cx, name, &suffix)?);
    }
    Ok(requests)
}

/// A list line is a global hash: the head names the symbol, the last
/// three path segments locate the defining file.
fn split_list_entry(line: &str) -> (&str, String) {
    match line.split_once('/') {
        None => (line, String::new()),
        Some((name, _)) => {
            let segments: Vec<&str> = line.split('/').collect();
            let start = segments.len().saturating_sub(3);
            (name, segments[start..].join("/"))
        }
    }
}

/// `trigger_list` entries for the entry function replace same-position
/// argument requests and add the rest.
fn apply_overrides(cx: &GenCx<'_>, entry: &str, requests: &mut Vec<RootRequest>) {
    let Ok(name) = cx.universe.interner().try_intern(entry) else {
        return;
    };
    let Some(overrides) = cx.config.trigger_list.get(&name) else {
        return;
    };
    requests.retain(|r| match r {
        RootRequest::Argument { position, .. } => {
            !overrides.iter().any(|o| o.position == *position)
        }
        RootRequest::Global { .. } => true,
    });
    for o in overrides {
        debug!(function = entry, position = o.position, "trigger override");
        requests.push(RootRequest::Argument {
            record: o.record,
            display: o.display,
            position: o.position,
        });
    }
}

fn check_positions(cx: &GenCx<'_>, entry: &str, requests: &[RootRequest]) -> Result<(), GenError> {
    if !requests
        .iter()
        .any(|r| matches!(r, RootRequest::Argument { .. }))
    {
        return Ok(());
    }
    let function = cx.universe.function_by_name(entry)?;
    for request in requests {
        if let RootRequest::Argument { position, .. } = request {
            if u32::from(*position) > function.nargs {
                return Err(GenError::ArgOutOfRange {
                    function: entry.to_owned(),
                    position: *position,
                    nargs: function.nargs,
                });
            }
        }
    }
    Ok(())
}

/// Build one trigger per request. Runs after the driver converged on the
/// seeds; the returned deps feed one more driver pass.
pub fn build_triggers(cx: &GenCx<'_>, entry: Name, requests: &[RootRequest]) -> TriggerSet {
    let universe = cx.universe;
    let mut set = TriggerSet::default();
    for request in requests {
        match *request {
            RootRequest::Argument {
                record, position, ..
            } => {
                let subject = cx.subject_for(record);
                let target = cx.record_ref(subject, record);
                set.deps.push(subject);
                set.triggers.push(Trigger {
                    identity: RootIdentity::Argument {
                        function: entry,
                        position,
                    },
                    shape: TriggerShape::Record { target, elems: 1 },
                    byte_size: target.byte_size,
                    per_cpu: false,
                });
            }
            RootRequest::Global {
                ty,
                name,
                module,
                hash,
            } => {
                let mut shape = root_shape(cx, ty, name, &mut set.deps);
                match cx.config.global_counts.get(&name) {
                    Some(CountSpec::Fixed(n)) => override_elems(&mut shape, *n),
                    Some(_) => warn!(
                        global = %universe.interner().lookup(name),
                        "only fixed element counts apply to globals"
                    ),
                    None => {}
                }
                set.triggers.push(Trigger {
                    identity: RootIdentity::Global { name, module, hash },
                    shape,
                    byte_size: universe.size_bytes(ty),
                    per_cpu: cx.config.per_cpu.contains(&name),
                });
            }
        }
    }
    set
}

/// A configured element count replaces the declared one at the outermost
/// level only.
fn override_elems(shape: &mut TriggerShape, n: u64) {
    match shape {
        TriggerShape::Record { elems, .. }
        | TriggerShape::Scalar { elems, .. }
        | TriggerShape::Compound { elems, .. }
        | TriggerShape::Pointer { elems, .. } => *elems = n,
        _ => {}
    }
}

/// One peeled level under a pointer at the root.
enum RootStep {
    /// Usable shape, with the C type of the value the level yields.
    Shaped { shape: TriggerShape, ctype: String },
    /// No mechanical step exists. A non-empty note survives into the
    /// handler as a comment.
    Blocked { note: Name },
}

/// Shape of a global root from its declared type.
fn root_shape(cx: &GenCx<'_>, ty: TypeId, global: Name, deps: &mut Vec<Subject>) -> TriggerShape {
    let universe = cx.universe;
    let mut typedef = None;
    let mut walked = ty;
    if matches!(universe.type_of(walked), Type::Typedef { .. }) {
        typedef = Some(walked);
        walked = universe.walk_typedef_chain(walked);
    }
    let resolved = match universe.type_of(walked) {
        Type::RecordForward { tag, .. } => universe.record_by_tag(*tag).ok(),
        _ => None,
    };
    match universe.type_of(walked) {
        // Zero-sized record storage serializes nothing.
        Type::Record(rec) if rec.byte_size == 0 => {
            return TriggerShape::Unhandled { note: Name::EMPTY };
        }
        Type::RecordForward { .. } => {
            if let Some(full) = resolved {
                if universe.size_bytes(full) == 0 {
                    return TriggerShape::Unhandled { note: Name::EMPTY };
                }
            }
        }
        _ => {}
    }
    let walked = resolved.unwrap_or(walked);
    match universe.type_of(walked) {
        Type::Builtin { name, .. } => TriggerShape::Scalar {
            type_name: *name,
            elems: 1,
        },
        Type::Enum { byte_size, .. } => TriggerShape::Compound {
            type_name: enum_label(cx, walked, typedef),
            byte_size: *byte_size,
            elems: 1,
        },
        Type::Record(_) => match record_step(cx, walked, typedef, 1, deps) {
            RootStep::Shaped { shape, .. } => shape,
            RootStep::Blocked { note } => TriggerShape::Unhandled { note },
        },
        Type::Pointer { target } => match pointer_shape(cx, *target, global, deps) {
            RootStep::Shaped { shape, ctype } => TriggerShape::Pointer {
                inner_ctype: universe.interner().intern_owned(ctype),
                elems: 1,
                inner: Box::new(shape),
            },
            RootStep::Blocked { note } => TriggerShape::Unhandled { note },
        },
        Type::ConstArray { elem, total_bytes } => {
            array_root(cx, *elem, *total_bytes, global, deps)
        }
        _ => {
            debug!(
                global = %universe.interner().lookup(global),
                ty = %universe.display_type(walked),
                "no trigger shape for root type"
            );
            TriggerShape::Unhandled { note: Name::EMPTY }
        }
    }
}

/// Shape of a root that is array storage.
fn array_root(
    cx: &GenCx<'_>,
    elem: TypeId,
    total_bytes: u64,
    global: Name,
    deps: &mut Vec<Subject>,
) -> TriggerShape {
    let universe = cx.universe;
    if total_bytes == 0 {
        return TriggerShape::Unhandled { note: Name::EMPTY };
    }
    let mut typedef = None;
    let mut walked = elem;
    if matches!(universe.type_of(walked), Type::Typedef { .. }) {
        typedef = Some(walked);
        walked = universe.walk_typedef_chain(walked);
    }
    let elem_size = universe.size_bytes(walked);
    if elem_size == 0 {
        warn!(
            global = %universe.interner().lookup(global),
            "array root with zero-sized elements"
        );
        return TriggerShape::Unhandled { note: Name::EMPTY };
    }
    let elems = total_bytes / elem_size;
    match universe.type_of(walked) {
        Type::Builtin { name, .. } => TriggerShape::Scalar {
            type_name: *name,
            elems,
        },
        Type::Enum { .. } => TriggerShape::Compound {
            type_name: enum_label(cx, walked, typedef),
            byte_size: elem_size,
            elems,
        },
        Type::Pointer { target } => match pointer_shape(cx, *target, global, deps) {
            RootStep::Shaped { shape, ctype } => TriggerShape::Pointer {
                inner_ctype: universe.interner().intern_owned(ctype),
                elems,
                inner: Box::new(shape),
            },
            RootStep::Blocked { note } => TriggerShape::Unhandled { note },
        },
        Type::Record(_) => match record_step(cx, walked, typedef, elems, deps) {
            RootStep::Shaped { shape, .. } => shape,
            RootStep::Blocked { note } => TriggerShape::Unhandled { note },
        },
        _ => {
            warn!(
                global = %universe.interner().lookup(global),
                element = %universe.display_type(walked),
                "unsupported array element at root"
            );
            TriggerShape::Unhandled { note: Name::EMPTY }
        }
    }
}

/// Shape of the value one dereference reaches.
fn pointer_shape(
    cx: &GenCx<'_>,
    pointee: TypeId,
    global: Name,
    deps: &mut Vec<Subject>,
) -> RootStep {
    let universe = cx.universe;
    let mut typedef = None;
    let mut walked = pointee;
    loop {
        match universe.type_of(walked) {
            Type::Typedef { .. } => {
                if typedef.is_none() {
                    typedef = Some(walked);
                }
                walked = universe.walk_typedef_chain(walked);
            }
            Type::Attributed {
                target,
                user_memory,
            } => {
                if *user_memory {
                    // Points into user space; nothing of ours to copy.
                    return RootStep::Blocked { note: Name::EMPTY };
                }
                walked = *target;
            }
            _ => break,
        }
    }
    match universe.type_of(walked) {
        Type::Record(_) | Type::RecordForward { .. } => {
            record_step(cx, walked, typedef, 1, deps)
        }
        Type::IncompleteArray { .. } | Type::ConstArray { .. } => RootStep::Blocked {
            note: universe.interner().intern_owned(format!(
                "implement flattening trigger for global '{}'",
                universe.interner().lookup(global)
            )),
        },
        Type::Pointer { target } => match pointer_shape(cx, *target, global, deps) {
            RootStep::Shaped { shape, ctype } => {
                let outer = format!("{ctype}*");
                RootStep::Shaped {
                    shape: TriggerShape::Pointer {
                        inner_ctype: universe.interner().intern_owned(ctype),
                        elems: 1,
                        inner: Box::new(shape),
                    },
                    ctype: outer,
                }
            }
            blocked @ RootStep::Blocked { .. } => blocked,
        },
        Type::Enum { .. } | Type::EnumForward { .. } => {
            let label = enum_label(cx, walked, typedef);
            RootStep::Shaped {
                shape: TriggerShape::Compound {
                    type_name: label,
                    byte_size: universe.size_bytes(walked),
                    elems: 1,
                },
                ctype: format!("{}*", universe.interner().lookup(label)),
            }
        }
        Type::Builtin { .. } if universe.is_char(walked) => RootStep::Shaped {
            shape: TriggerShape::CString,
            ctype: "char*".to_owned(),
        },
        Type::Builtin { .. } if universe.is_void(walked) => RootStep::Shaped {
            shape: TriggerShape::Scalar {
                type_name: universe.interner().intern("unsigned char"),
                elems: 1,
            },
            ctype: "unsigned char*".to_owned(),
        },
        Type::Function => RootStep::Shaped {
            shape: TriggerShape::FunctionPtr,
            ctype: "void*".to_owned(),
        },
        Type::Builtin { name, .. } => RootStep::Shaped {
            shape: TriggerShape::Scalar {
                type_name: *name,
                elems: 1,
            },
            ctype: format!("{}*", universe.interner().lookup(*name)),
        },
        _ => {
            let spelled = universe.display_type(walked);
            RootStep::Shaped {
                shape: TriggerShape::Scalar {
                    type_name: universe.interner().intern_owned(spelled.clone()),
                    elems: 1,
                },
                ctype: format!("{spelled}*"),
            }
        }
    }
}

/// Shape and value type for a record met at or under the root. The
/// record becomes a driver dep so its recipe exists by emission.
fn record_step(
    cx: &GenCx<'_>,
    record: TypeId,
    typedef: Option<TypeId>,
    elems: u64,
    deps: &mut Vec<Subject>,
) -> RootStep {
    let universe = cx.universe;
    let full = match universe.type_of(record) {
        Type::RecordForward { tag, .. } => universe.record_by_tag(*tag).unwrap_or(record),
        _ => record,
    };
    if let Some(td) = typedef {
        let subject = cx.subject_for(td);
        deps.push(subject);
        return RootStep::Shaped {
            shape: TriggerShape::Record {
                target: cx.record_ref(subject, full),
                elems,
            },
            ctype: format!("{}*", universe.interner().lookup(subject.display)),
        };
    }
    match universe.type_of(full) {
        Type::Record(rec) if rec.tag.is_empty() => {
            let subject = cx.subject_for(full);
            deps.push(subject);
            RootStep::Shaped {
                shape: TriggerShape::Record {
                    target: cx.record_ref(subject, full),
                    elems,
                },
                ctype: format!("{}*", universe.interner().lookup(subject.display)),
            }
        }
        Type::Record(rec) => {
            let subject = cx.subject_for(full);
            deps.push(subject);
            let keyword = if rec.is_union { "union" } else { "struct" };
            RootStep::Shaped {
                shape: TriggerShape::Record {
                    target: cx.record_ref(subject, full),
                    elems,
                },
                ctype: format!("{keyword} {}*", universe.interner().lookup(rec.tag)),
            }
        }
        // Forward with no definition anywhere: nothing to size a copy by.
        _ => RootStep::Blocked { note: Name::EMPTY },
    }
}

fn enum_label(cx: &GenCx<'_>, walked: TypeId, typedef: Option<TypeId>) -> Name {
    let universe = cx.universe;
    if let Some(td) = typedef {
        if let Type::Typedef { name, .. } = universe.type_of(td) {
            return *name;
        }
    }
    match universe.type_of(walked) {
        Type::Enum { tag, .. } | Type::EnumForward { tag } => {
            if tag.is_empty() {
                universe.anon_type_name(walked)
            } else {
                universe
                    .interner()
                    .intern_owned(format!("enum {}", universe.interner().lookup(*tag)))
            }
        }
        _ => universe.interner().intern_owned(universe.display_type(walked)),
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests {
    use flatgen_facts::testutil::{tid, UniverseBuilder};
    use flatgen_facts::{GenConfig, RawConfig, Universe};
    use flatgen_ir::SubjectKind;
    use pretty_assertions::assert_eq;

    use super::*;

    fn cx<'a>(universe: &'a Universe, config: &'a GenConfig) -> GenCx<'a> {
        GenCx::new(universe, config)
    }

    fn specs(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn test_parse_argument_specs() {
        let mut b = UniverseBuilder::new();
        let int = b.builtin("int", 4);
        let pipe = b.record("pipe", 16, &[("fd", int, 0)]);
        let task = b.record("task", 8, &[("pid", int, 0)]);
        b.function("probe", 3, &[int, pipe, task, int], &[]);
        let universe = b.build();
        let config = GenConfig::default();
        let cx = cx(&universe, &config);

        let roots = parse_roots(&cx, &specs(&["pipe@2", "task"]), None, "probe").unwrap();
        assert_eq!(roots.len(), 2);
        assert_eq!(
            roots[0],
            RootRequest::Argument {
                record: tid(pipe),
                display: universe.interner().intern("pipe"),
                position: 2,
            }
        );
        assert!(matches!(
            roots[1],
            RootRequest::Argument { position: 1, .. }
        ));
    }

    #[test]
    fn test_parse_rejects_bad_positions() {
        let mut b = UniverseBuilder::new();
        let int = b.builtin("int", 4);
        b.record("pipe", 16, &[("fd", int, 0)]);
        b.function("probe", 2, &[int, int, int], &[]);
        let universe = b.build();
        let config = GenConfig::default();
        let cx = cx(&universe, &config);

        assert!(matches!(
            parse_roots(&cx, &specs(&["pipe@first"]), None, "probe"),
            Err(GenError::BadRootSpec { .. })
        ));
        assert!(matches!(
            parse_roots(&cx, &specs(&["pipe@0"]), None, "probe"),
            Err(GenError::BadRootSpec { .. })
        ));
        assert!(matches!(
            parse_roots(&cx, &specs(&["pipe@3"]), None, "probe"),
            Err(GenError::ArgOutOfRange {
                position: 3,
                nargs: 2,
                ..
            })
        ));
    }

    #[test]
    fn test_parse_unknown_record_is_fatal() {
        let mut b = UniverseBuilder::new();
        let int = b.builtin("int", 4);
        b.function("probe", 1, &[int, int], &[]);
        let universe = b.build();
        let config = GenConfig::default();
        let cx = cx(&universe, &config);

        assert!(matches!(
            parse_roots(&cx, &specs(&["ghost@1"]), None, "probe"),
            Err(GenError::Facts(_))
        ));
    }

    #[test]
    fn test_parse_global_spec() {
        let mut b = UniverseBuilder::new();
        let int = b.builtin("int", 4);
        let stat = b.record("stat", 32, &[("mode", int, 0)]);
        let cstat = b.const_of(stat);
        b.global("init_stat", cstat, "fs/stat.c");
        b.global_in_module("vt_stat", stat, "drivers/tty/vt.c", "drivers/tty/vt.ko");
        let universe = b.build();
        let config = GenConfig::default();
        let cx = cx(&universe, &config);

        let roots = parse_roots(&cx, &specs(&["init_stat:fs/stat.c"]), None, "probe").unwrap();
        let RootRequest::Global {
            ty, name, module, ..
        } = roots[0]
        else {
            panic!("expected a global request");
        };
        assert_eq!(ty, tid(stat));
        assert_eq!(universe.interner().lookup(name), "init_stat");
        assert_eq!(universe.interner().lookup(module), "vmlinux");

        let roots = parse_roots(&cx, &specs(&["vt_stat:vt.c"]), None, "probe").unwrap();
        let RootRequest::Global { module, .. } = roots[0] else {
            panic!("expected a global request");
        };
        assert_eq!(universe.interner().lookup(module), "vt.ko");
    }

    #[test]
    fn test_split_list_entry_suffixes() {
        assert_eq!(
            split_list_entry("jiffies/kernel/time/timer.c"),
            ("jiffies", "kernel/time/timer.c".to_owned())
        );
        assert_eq!(
            split_list_entry("table/random.c"),
            ("table", "table/random.c".to_owned())
        );
        assert_eq!(split_list_entry("jiffies"), ("jiffies", String::new()));
    }

    #[test]
    fn test_missing_globals_list_is_fatal() {
        let mut b = UniverseBuilder::new();
        let int = b.builtin("int", 4);
        b.function("probe", 1, &[int, int], &[]);
        let universe = b.build();
        let config = GenConfig::default();
        let cx = cx(&universe, &config);

        let missing = Path::new("/nonexistent/globals.list");
        assert!(matches!(
            parse_roots(&cx, &[], Some(missing), "probe"),
            Err(GenError::GlobalsListIo { .. })
        ));
    }

    #[test]
    fn test_no_roots_is_fatal() {
        let mut b = UniverseBuilder::new();
        let int = b.builtin("int", 4);
        b.record("pipe", 16, &[("fd", int, 0)]);
        b.function("probe", 1, &[int, int], &[]);
        let universe = b.build();

        let config = GenConfig::default();
        let cx1 = GenCx::new(&universe, &config);
        assert!(matches!(
            parse_roots(&cx1, &[], None, "probe"),
            Err(GenError::NoSubjects)
        ));

        let raw: RawConfig =
            serde_json::from_str(r#"{ "root_types": ["struct pipe"] }"#).unwrap();
        let seeded = GenConfig::resolve(&raw, &universe).unwrap();
        let cx2 = GenCx::new(&universe, &seeded);
        assert_eq!(parse_roots(&cx2, &[], None, "probe").unwrap(), vec![]);
    }

    #[test]
    fn test_trigger_list_overrides_positions() {
        let mut b = UniverseBuilder::new();
        let int = b.builtin("int", 4);
        let task = b.record("task", 8, &[("pid", int, 0)]);
        b.record("msg", 24, &[("len", int, 0)]);
        b.function("probe", 2, &[int, task, task], &[]);
        let universe = b.build();
        let raw: RawConfig = serde_json::from_str(
            r#"{ "trigger_list": { "probe": { "1": "struct msg" } } }"#,
        )
        .unwrap();
        let config = GenConfig::resolve(&raw, &universe).unwrap();
        let cx = cx(&universe, &config);

        let roots = parse_roots(&cx, &specs(&["task@1", "task@2"]), None, "probe").unwrap();
        assert_eq!(roots.len(), 2);
        assert!(matches!(
            roots[0],
            RootRequest::Argument { record, position: 2, .. } if record == tid(task)
        ));
        let RootRequest::Argument {
            display, position, ..
        } = roots[1]
        else {
            panic!("expected the override");
        };
        assert_eq!(position, 1);
        assert_eq!(universe.interner().lookup(display), "msg");
    }

    #[test]
    fn test_argument_trigger_shape() {
        let mut b = UniverseBuilder::new();
        let int = b.builtin("int", 4);
        let pipe = b.record("pipe", 16, &[("fd", int, 0)]);
        let universe = b.build();
        let config = GenConfig::default();
        let cx = cx(&universe, &config);
        let entry = universe.interner().intern("probe");

        let request = RootRequest::Argument {
            record: tid(pipe),
            display: universe.interner().intern("pipe"),
            position: 2,
        };
        let set = build_triggers(&cx, entry, &[request]);
        assert_eq!(set.triggers.len(), 1);
        let trigger = &set.triggers[0];
        assert_eq!(
            trigger.identity,
            RootIdentity::Argument {
                function: entry,
                position: 2
            }
        );
        let TriggerShape::Record { target, elems } = trigger.shape else {
            panic!("expected a record shape");
        };
        assert_eq!(elems, 1);
        assert_eq!(target.byte_size, 16);
        assert_eq!(trigger.byte_size, 16);
        assert!(!trigger.per_cpu);
        assert_eq!(set.deps, vec![Subject::record(tid(pipe))]);
    }

    #[test]
    fn test_record_global_trigger() {
        let mut b = UniverseBuilder::new();
        let int = b.builtin("int", 4);
        let stat = b.record("stat", 32, &[("mode", int, 0)]);
        b.global("init_stat", stat, "fs/stat.c");
        let universe = b.build();
        let config = GenConfig::default();
        let cx = cx(&universe, &config);

        let roots = parse_roots(&cx, &specs(&["init_stat:"]), None, "probe").unwrap();
        let set = build_triggers(&cx, universe.interner().intern("probe"), &roots);
        let trigger = &set.triggers[0];
        let RootIdentity::Global { name, hash, .. } = trigger.identity else {
            panic!("expected a global identity");
        };
        assert_eq!(universe.interner().lookup(name), "init_stat");
        assert_eq!(universe.interner().lookup(hash), "init_stat/fs/stat.c");
        let TriggerShape::Record { target, elems } = trigger.shape else {
            panic!("expected a record shape");
        };
        assert_eq!(elems, 1);
        assert_eq!(target.key.kind, SubjectKind::Struct);
        assert_eq!(trigger.byte_size, 32);
    }

    #[test]
    fn test_pointer_global_chain() {
        let mut b = UniverseBuilder::new();
        let int = b.builtin("int", 4);
        let pkt = b.record("pkt", 64, &[("len", int, 0)]);
        let p1 = b.pointer(pkt);
        let p2 = b.pointer(p1);
        b.global("rx_head", p1, "net/rx.c");
        b.global("rx_table", p2, "net/rx.c");
        let universe = b.build();
        let config = GenConfig::default();
        let cx = cx(&universe, &config);

        let roots =
            parse_roots(&cx, &specs(&["rx_head:", "rx_table:"]), None, "probe").unwrap();
        let set = build_triggers(&cx, universe.interner().intern("probe"), &roots);

        let TriggerShape::Pointer {
            inner_ctype,
            elems,
            ref inner,
        } = set.triggers[0].shape
        else {
            panic!("expected a pointer shape");
        };
        assert_eq!(universe.interner().lookup(inner_ctype), "struct pkt*");
        assert_eq!(elems, 1);
        assert!(matches!(**inner, TriggerShape::Record { elems: 1, .. }));
        assert_eq!(set.triggers[0].byte_size, 8);

        let TriggerShape::Pointer {
            inner_ctype,
            ref inner,
            ..
        } = set.triggers[1].shape
        else {
            panic!("expected a pointer shape");
        };
        assert_eq!(universe.interner().lookup(inner_ctype), "struct pkt**");
        let TriggerShape::Pointer { inner_ctype, .. } = **inner else {
            panic!("expected a nested pointer");
        };
        assert_eq!(universe.interner().lookup(inner_ctype), "struct pkt*");
        assert_eq!(set.deps.len(), 2);
    }

    #[test]
    fn test_string_and_void_pointer_globals() {
        let mut b = UniverseBuilder::new();
        let ch = b.builtin("char", 1);
        let void = b.void();
        let pc = b.pointer(ch);
        let pv = b.pointer(void);
        b.global("banner", pc, "init/main.c");
        b.global("ctx", pv, "init/main.c");
        let universe = b.build();
        let config = GenConfig::default();
        let cx = cx(&universe, &config);

        let roots = parse_roots(&cx, &specs(&["banner:", "ctx:"]), None, "probe").unwrap();
        let set = build_triggers(&cx, universe.interner().intern("probe"), &roots);

        let TriggerShape::Pointer {
            inner_ctype,
            ref inner,
            ..
        } = set.triggers[0].shape
        else {
            panic!("expected a pointer shape");
        };
        assert_eq!(universe.interner().lookup(inner_ctype), "char*");
        assert_eq!(**inner, TriggerShape::CString);

        let TriggerShape::Pointer { ref inner, .. } = set.triggers[1].shape else {
            panic!("expected a pointer shape");
        };
        let TriggerShape::Scalar { type_name, elems } = **inner else {
            panic!("expected raw bytes");
        };
        assert_eq!(universe.interner().lookup(type_name), "unsigned char");
        assert_eq!(elems, 1);
        assert!(set.deps.is_empty());
    }

    #[test]
    fn test_scalar_and_record_array_globals() {
        let mut b = UniverseBuilder::new();
        let ulong = b.builtin("unsigned long", 8);
        let int = b.builtin("int", 4);
        let buf = b.record("buf", 16, &[("len", int, 0)]);
        let tab = b.const_array(ulong, 32);
        let pool = b.const_array(buf, 64);
        b.global("tab", tab, "lib/tab.c");
        b.global("pool", pool, "lib/pool.c");
        let universe = b.build();
        let config = GenConfig::default();
        let cx = cx(&universe, &config);

        let roots = parse_roots(&cx, &specs(&["tab:", "pool:"]), None, "probe").unwrap();
        let set = build_triggers(&cx, universe.interner().intern("probe"), &roots);

        let TriggerShape::Scalar { type_name, elems } = set.triggers[0].shape else {
            panic!("expected scalar storage");
        };
        assert_eq!(universe.interner().lookup(type_name), "unsigned long");
        assert_eq!(elems, 4);
        assert_eq!(set.triggers[0].byte_size, 32);

        let TriggerShape::Record { target, elems } = set.triggers[1].shape else {
            panic!("expected record storage");
        };
        assert_eq!(elems, 4);
        assert_eq!(target.byte_size, 16);
        assert_eq!(set.deps, vec![Subject::record(tid(buf))]);
    }

    #[test]
    fn test_typedef_global_names_the_type() {
        let mut b = UniverseBuilder::new();
        let int = b.builtin("int", 4);
        let core = b.record("timer_core", 24, &[("ticks", int, 0)]);
        let td = b.typedef("timer_core_t", core);
        b.global("boot_timer", td, "kernel/timer.c");
        let universe = b.build();
        let config = GenConfig::default();
        let cx = cx(&universe, &config);

        let roots = parse_roots(&cx, &specs(&["boot_timer:"]), None, "probe").unwrap();
        let set = build_triggers(&cx, universe.interner().intern("probe"), &roots);
        let TriggerShape::Record { target, .. } = set.triggers[0].shape else {
            panic!("expected record storage");
        };
        assert_eq!(target.key.kind, SubjectKind::TypedefStruct);
        assert_eq!(universe.interner().lookup(target.key.name), "timer_core_t");
        assert_eq!(set.deps.len(), 1);
        assert_eq!(
            universe.interner().lookup(set.deps[0].display),
            "timer_core_t"
        );
    }

    #[test]
    fn test_unhandled_roots() {
        let mut b = UniverseBuilder::new();
        let int = b.builtin("int", 4);
        let ghost = b.record_forward("ghost");
        let pg = b.pointer(ghost);
        let zero = b.record("empty", 0, &[]);
        let arr = b.const_array(int, 16);
        let parr = b.pointer(arr);
        b.global("ghost_head", pg, "net/ghost.c");
        b.global("empty_box", zero, "lib/box.c");
        b.global("matrix", parr, "lib/matrix.c");
        let universe = b.build();
        let config = GenConfig::default();
        let cx = cx(&universe, &config);

        let roots = parse_roots(
            &cx,
            &specs(&["ghost_head:", "empty_box:", "matrix:"]),
            None,
            "probe",
        )
        .unwrap();
        let set = build_triggers(&cx, universe.interner().intern("probe"), &roots);

        assert_eq!(
            set.triggers[0].shape,
            TriggerShape::Unhandled { note: Name::EMPTY }
        );
        assert_eq!(
            set.triggers[1].shape,
            TriggerShape::Unhandled { note: Name::EMPTY }
        );
        let TriggerShape::Unhandled { note } = set.triggers[2].shape else {
            panic!("expected an unhandled shape");
        };
        assert_eq!(
            universe.interner().lookup(note),
            "implement flattening trigger for global 'matrix'"
        );
        assert!(set.deps.is_empty());
    }

    #[test]
    fn test_global_count_override_and_per_cpu() {
        let mut b = UniverseBuilder::new();
        let int = b.builtin("int", 4);
        let slot = b.record("slot", 32, &[("v", int, 0)]);
        let ps = b.pointer(slot);
        b.global("slot_table", ps, "kernel/slots.c");
        let universe = b.build();
        let raw: RawConfig = serde_json::from_str(
            r#"{
                "custom_global_element_count_map": { "slot_table": 16 },
                "per_cpu_variables": ["slot_table"]
            }"#,
        )
        .unwrap();
        let config = GenConfig::resolve(&raw, &universe).unwrap();
        let cx = cx(&universe, &config);

        let roots = parse_roots(&cx, &specs(&["slot_table:"]), None, "probe").unwrap();
        let set = build_triggers(&cx, universe.interner().intern("probe"), &roots);
        let trigger = &set.triggers[0];
        assert!(trigger.per_cpu);
        let TriggerShape::Pointer { elems, ref inner, .. } = trigger.shape else {
            panic!("expected a pointer shape");
        };
        assert_eq!(elems, 16);
        assert!(matches!(**inner, TriggerShape::Record { elems: 1, .. }));
    }
}
