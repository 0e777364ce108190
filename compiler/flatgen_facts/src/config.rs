//! Operator configuration.
//!
//! The configuration file carries everything the generator cannot read
//! from the type tables alone: member restrictions, pointer-target
//! overrides, element-count overrides, precomputed usage evidence
//! (container_of casts, void-pointer casts, string uses, dereference and
//! escape sites) and the root/trigger declarations. [`RawConfig`] is the
//! serde view; [`GenConfig`] is the resolved form with every referenced
//! type looked up in the universe and every key interned. Resolution is
//! strict: a config entry naming a type the database does not contain is
//! a fatal error, not a silent no-op.

use std::fs;
use std::path::Path;

use flatgen_ir::{EscapeKind, Name, Subject, TypeId};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Deserialize;
use tracing::debug;

use crate::store::{Type, Universe};
use crate::{ConfigError, FactsError};

/// Record tags the generated module must never build recipes for.
pub const BUILTIN_STRUCT_BLACKLIST: &[&str] = &["kflat", "hrtimer_clock_base"];

/// Typedef names already provided by the headers every generated module
/// includes; `common.h` must not redeclare their bridges.
pub const BUILTIN_STRUCT_TYPE_BLACKLIST: &[&str] = &[
    "kgid_t",
    "kuid_t",
    "Elf64_Sym",
    "pgd_t",
    "cpumask_t",
    "wait_queue_head_t",
    "atomic64_t",
    "atomic_long_t",
    "atomic_t",
    "rwlock_t",
    "seqlock_t",
    "seqcount_t",
    "spinlock_t",
    "kernel_cap_t",
    "arch_spinlock_t",
    "raw_spinlock_t",
    "wait_queue_entry_t",
    "pgprot_t",
    "mm_segment_t",
    "kernel_siginfo_t",
    "nodemask_t",
    "pg_data_t",
    "guid_t",
];

/// Raw JSON configuration document. Every key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawConfig {
    /// Type spec to the member names kept at the top level; members of a
    /// listed type that are absent here are dropped before flattening.
    pub allowed_members: FxHashMap<String, Vec<String>>,
    /// Member names dropped wherever they appear.
    pub ignore_refnames: Vec<String>,
    /// Record tags expanded with anchor handling (list nodes and alike).
    pub anchor_types: Vec<String>,
    /// Type spec to a verbatim replacement recipe body.
    pub custom_recipes: FxHashMap<String, String>,
    /// Member key to the type spec its pointer really targets.
    pub custom_ptr_map: FxHashMap<String, String>,
    /// Member key to an element-count override.
    pub custom_element_count_map: FxHashMap<String, RawCount>,
    /// Global name to an element-count override for its trigger.
    pub custom_global_element_count_map: FxHashMap<String, RawCount>,
    /// Globals that live in per-CPU storage.
    pub per_cpu_variables: Vec<String>,
    /// Anchor member key to the list link description.
    pub listhead_config: FxHashMap<String, RawListLink>,
    /// Member key to attested `container_of` targets.
    pub container_of_map: FxHashMap<String, Vec<RawContainerOf>>,
    /// Member key to attested void-pointer cast targets.
    pub pvoid_map: FxHashMap<String, Vec<String>>,
    /// Member keys attested to flow into string-consuming contexts.
    pub string_members: Vec<String>,
    /// Member key to attested dereference shapes.
    pub deref_map: FxHashMap<String, Vec<RawDerefUse>>,
    /// Member key to attested escape kinds
    /// (`assigned`, `arg`, `indirect-call`).
    pub escape_map: FxHashMap<String, Vec<String>>,
    /// Entry function name to argument-position type overrides.
    pub trigger_list: FxHashMap<String, FxHashMap<String, String>>,
    /// Extra root type specs seeded into the driver.
    pub root_types: Vec<String>,
    /// Record tags blacklisted from recipe generation.
    pub blacklist_structs: Vec<String>,
    /// Typedef names blacklisted from recipe generation.
    pub blacklist_struct_types: Vec<String>,
}

/// Element count as written in the file: a number, `"probe"`, or a C
/// expression evaluated in the recipe.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawCount {
    Fixed(u64),
    Text(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawContainerOf {
    #[serde(rename = "type")]
    pub type_name: String,
    pub offset: i64,
    #[serde(default)]
    pub exprs: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawListLink {
    /// Type spec of the element hanging off the list.
    pub container: String,
    /// Member of the container that is the embedded link.
    pub link: String,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RawDerefUse {
    #[serde(default)]
    pub offset: i64,
    #[serde(default)]
    pub index_vars: u32,
}

impl RawConfig {
    /// Read and parse a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let raw: Self = serde_json::from_str(&text)?;
        debug!(path = %path.display(), "loaded configuration");
        Ok(raw)
    }
}

/// Interned `(type, member-path)` key for per-member evidence and
/// overrides. The member part keeps its dots for nested paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemberKey {
    pub type_name: Name,
    pub member: Name,
}

impl MemberKey {
    pub const fn new(type_name: Name, member: Name) -> Self {
        Self { type_name, member }
    }

    /// Parse `[struct |union ]<type>.<member[.member...]>`. A type part
    /// that names a typedef is normalized to the underlying record tag so
    /// every later lookup can key by tag alone.
    fn parse(key: &str, universe: &Universe) -> Result<Self, ConfigError> {
        let bad = || ConfigError::BadMemberKey {
            key: key.to_owned(),
        };
        let trimmed = key.trim();
        let rest = trimmed
            .strip_prefix("struct ")
            .or_else(|| trimmed.strip_prefix("union "))
            .unwrap_or(trimmed);
        let (type_part, member) = rest.split_once('.').ok_or_else(bad)?;
        if type_part.is_empty() || member.is_empty() {
            return Err(bad());
        }
        let mut type_name = universe.interner().intern(type_part);
        if universe.record_by_tag(type_name).is_err() {
            if let Ok(typedef) = universe.typedef_by_name(type_name) {
                if let Some(resolution) = universe.resolve_record_target(typedef) {
                    if let Type::Record(def) = universe.type_of(resolution.record) {
                        if !def.tag.is_empty() {
                            type_name = def.tag;
                        }
                    }
                }
            }
        }
        Ok(Self {
            type_name,
            member: universe.interner().intern(member),
        })
    }
}

/// Element-count override, resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CountSpec {
    Fixed(u64),
    /// C expression pasted into the recipe.
    Formula(String),
    /// Size the allocation at runtime.
    Probe,
}

impl CountSpec {
    fn from_raw(key: &str, raw: &RawCount) -> Result<Self, ConfigError> {
        match raw {
            RawCount::Fixed(n) => Ok(Self::Fixed(*n)),
            RawCount::Text(text) if text == "probe" => Ok(Self::Probe),
            RawCount::Text(text) if !text.trim().is_empty() => {
                Ok(Self::Formula(text.clone()))
            }
            RawCount::Text(text) => Err(ConfigError::BadCountSpec {
                key: key.to_owned(),
                value: text.clone(),
            }),
        }
    }
}

/// Pointer-target override, resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CustomPointee {
    /// The type the pointer really targets, typedefs walked.
    pub target: TypeId,
    /// Set when the override named a typedef rather than a tag.
    pub typedef: Option<TypeId>,
}

/// One attested `container_of` target for a member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerOfTarget {
    pub record: TypeId,
    /// Offset of the member within the container, in bytes.
    pub offset: i64,
    /// Source expressions that attested the cast.
    pub exprs: Vec<String>,
}

/// One attested dereference shape for a member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DerefUse {
    /// Constant byte offset added to the pointer.
    pub offset: i64,
    /// Number of runtime-computed index terms.
    pub index_vars: u32,
}

/// Resolved list-link description for an anchor member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListLink {
    /// Element type hanging off the list.
    pub container: TypeId,
    /// Member of the container that is the embedded link.
    pub link: Name,
}

/// Argument-type override for an entry function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerOverride {
    /// 1-based argument position.
    pub position: u8,
    pub record: TypeId,
    pub display: Name,
}

/// Fully resolved configuration.
#[derive(Debug, Default)]
pub struct GenConfig {
    pub allowed_members: FxHashMap<Name, FxHashSet<Name>>,
    pub ignore_refnames: FxHashSet<Name>,
    pub anchor_types: FxHashSet<Name>,
    pub custom_recipes: FxHashMap<TypeId, String>,
    pub custom_ptr: FxHashMap<MemberKey, CustomPointee>,
    pub custom_counts: FxHashMap<MemberKey, CountSpec>,
    pub global_counts: FxHashMap<Name, CountSpec>,
    pub per_cpu: FxHashSet<Name>,
    pub list_links: FxHashMap<MemberKey, ListLink>,
    pub container_of: FxHashMap<MemberKey, Vec<ContainerOfTarget>>,
    pub pvoid: FxHashMap<MemberKey, Vec<TypeId>>,
    pub string_members: FxHashSet<MemberKey>,
    pub deref: FxHashMap<MemberKey, Vec<DerefUse>>,
    pub escape: FxHashMap<MemberKey, Vec<EscapeKind>>,
    pub trigger_list: FxHashMap<Name, Vec<TriggerOverride>>,
    pub root_types: Vec<Subject>,
    pub blacklist_structs: FxHashSet<Name>,
    pub blacklist_struct_types: FxHashSet<Name>,
}

impl GenConfig {
    /// Resolve a raw document against the universe.
    pub fn resolve(raw: &RawConfig, universe: &Universe) -> Result<Self, ConfigError> {
        let interner = universe.interner();
        let mut cfg = Self::default();
        for tag in BUILTIN_STRUCT_BLACKLIST {
            cfg.blacklist_structs.insert(interner.intern(tag));
        }

        for (spec, members) in &raw.allowed_members {
            let resolved = resolve_type_spec(universe, spec)?;
            let key = match universe.type_of(resolved.target) {
                Type::Record(def) if !def.tag.is_empty() => def.tag,
                _ => resolved.display,
            };
            let set = members.iter().map(|m| interner.intern(m)).collect();
            cfg.allowed_members.insert(key, set);
        }
        cfg.ignore_refnames = raw
            .ignore_refnames
            .iter()
            .map(|n| interner.intern(n))
            .collect();
        cfg.anchor_types = raw
            .anchor_types
            .iter()
            .map(|n| {
                let stripped = n
                    .strip_prefix("struct ")
                    .or_else(|| n.strip_prefix("union "))
                    .unwrap_or(n);
                interner.intern(stripped)
            })
            .collect();

        for (spec, body) in &raw.custom_recipes {
            let resolved = resolve_type_spec(universe, spec)?;
            cfg.custom_recipes.insert(resolved.subject, body.clone());
        }
        for (key, spec) in &raw.custom_ptr_map {
            let member = MemberKey::parse(key, universe)?;
            let resolved = resolve_type_spec(universe, spec)?;
            cfg.custom_ptr.insert(
                member,
                CustomPointee {
                    target: resolved.target,
                    typedef: resolved.typedef,
                },
            );
        }
        for (key, raw_count) in &raw.custom_element_count_map {
            let member = MemberKey::parse(key, universe)?;
            cfg.custom_counts
                .insert(member, CountSpec::from_raw(key, raw_count)?);
        }
        for (name, raw_count) in &raw.custom_global_element_count_map {
            cfg.global_counts
                .insert(interner.intern(name), CountSpec::from_raw(name, raw_count)?);
        }
        cfg.per_cpu = raw
            .per_cpu_variables
            .iter()
            .map(|n| interner.intern(n))
            .collect();

        for (key, raw_link) in &raw.listhead_config {
            let member = MemberKey::parse(key, universe)?;
            let container = resolve_type_spec(universe, &raw_link.container)?;
            let link = interner.intern(&raw_link.link);
            require_member(universe, container.target, link, &raw_link.container)?;
            cfg.list_links.insert(
                member,
                ListLink {
                    container: container.target,
                    link,
                },
            );
        }
        for (key, targets) in &raw.container_of_map {
            let member = MemberKey::parse(key, universe)?;
            let mut resolved_targets = Vec::with_capacity(targets.len());
            for target in targets {
                let resolved = resolve_type_spec(universe, &target.type_name)?;
                if !matches!(
                    universe.type_of(resolved.target),
                    Type::Record(_) | Type::RecordForward { .. }
                ) {
                    return Err(ConfigError::BadTypeSpec {
                        spec: target.type_name.clone(),
                    });
                }
                resolved_targets.push(ContainerOfTarget {
                    record: resolved.target,
                    offset: target.offset,
                    exprs: target.exprs.clone(),
                });
            }
            cfg.container_of.insert(member, resolved_targets);
        }
        for (key, specs) in &raw.pvoid_map {
            let member = MemberKey::parse(key, universe)?;
            let mut ids = Vec::with_capacity(specs.len());
            for spec in specs {
                ids.push(resolve_type_spec(universe, spec)?.target);
            }
            cfg.pvoid.insert(member, ids);
        }
        for key in &raw.string_members {
            cfg.string_members.insert(MemberKey::parse(key, universe)?);
        }
        for (key, uses) in &raw.deref_map {
            let member = MemberKey::parse(key, universe)?;
            let resolved_uses = uses
                .iter()
                .map(|u| DerefUse {
                    offset: u.offset,
                    index_vars: u.index_vars,
                })
                .collect();
            cfg.deref.insert(member, resolved_uses);
        }
        for (key, kinds) in &raw.escape_map {
            let member = MemberKey::parse(key, universe)?;
            let mut resolved_kinds = Vec::with_capacity(kinds.len());
            for kind in kinds {
                resolved_kinds.push(parse_escape_kind(kind)?);
            }
            cfg.escape.insert(member, resolved_kinds);
        }

        for (func, overrides) in &raw.trigger_list {
            let mut entries = Vec::with_capacity(overrides.len());
            for (pos, spec) in overrides {
                let position =
                    pos.parse::<u8>()
                        .ok()
                        .filter(|&p| p > 0)
                        .ok_or_else(|| ConfigError::BadArgPosition {
                            key: pos.clone(),
                        })?;
                let resolved = resolve_type_spec(universe, spec)?;
                entries.push(TriggerOverride {
                    position,
                    record: resolved.target,
                    display: resolved.display,
                });
            }
            entries.sort_by_key(|e| e.position);
            cfg.trigger_list.insert(interner.intern(func), entries);
        }
        for spec in &raw.root_types {
            let resolved = resolve_type_spec(universe, spec)?;
            cfg.root_types
                .push(Subject::named(resolved.subject, resolved.display));
        }

        for tag in &raw.blacklist_structs {
            cfg.blacklist_structs.insert(interner.intern(tag));
        }
        for name in &raw.blacklist_struct_types {
            cfg.blacklist_struct_types.insert(interner.intern(name));
        }
        Ok(cfg)
    }

    /// Fold `--ignore-structs` names into both blacklists.
    pub fn add_ignored<'a>(&mut self, names: impl IntoIterator<Item = &'a str>, universe: &Universe) {
        for name in names {
            let interned = universe.interner().intern(name.trim());
            self.blacklist_structs.insert(interned);
            self.blacklist_struct_types.insert(interned);
        }
    }
}

struct ResolvedSpec {
    /// What the driver would be handed: the typedef itself for typedef
    /// specs, the underlying type otherwise.
    subject: TypeId,
    /// The underlying type with typedefs walked, forwards upgraded to
    /// their full definition when one exists.
    target: TypeId,
    typedef: Option<TypeId>,
    display: Name,
}

/// Resolve `struct <tag>`, `union <tag>` or a bare typedef/tag/builtin
/// name to a unique type in the universe.
fn resolve_type_spec(universe: &Universe, spec: &str) -> Result<ResolvedSpec, ConfigError> {
    let interner = universe.interner();
    let trimmed = spec.trim();

    let tagged = trimmed
        .strip_prefix("struct ")
        .or_else(|| trimmed.strip_prefix("union "));
    if let Some(tag) = tagged {
        let name = interner.intern(tag);
        let record = map_lookup(universe.record_by_tag(name), spec)?;
        return Ok(ResolvedSpec {
            subject: record,
            target: record,
            typedef: None,
            display: name,
        });
    }
    if trimmed.is_empty() {
        return Err(ConfigError::BadTypeSpec {
            spec: spec.to_owned(),
        });
    }

    let name = interner.intern(trimmed);
    match universe.record_by_tag(name) {
        Ok(record) => {
            return Ok(ResolvedSpec {
                subject: record,
                target: record,
                typedef: None,
                display: name,
            });
        }
        Err(FactsError::RecordAmbiguous { count, .. }) => {
            return Err(ConfigError::AmbiguousType {
                name: spec.to_owned(),
                count,
            });
        }
        Err(_) => {}
    }
    match universe.typedef_by_name(name) {
        Ok(typedef) => {
            let walked = universe.canonical(typedef);
            let target = match universe.type_of(walked) {
                Type::RecordForward { tag, .. } => universe.record_by_tag(*tag).unwrap_or(walked),
                _ => walked,
            };
            return Ok(ResolvedSpec {
                subject: typedef,
                target,
                typedef: Some(typedef),
                display: name,
            });
        }
        Err(FactsError::TypedefAmbiguous { count, .. }) => {
            return Err(ConfigError::AmbiguousType {
                name: spec.to_owned(),
                count,
            });
        }
        Err(_) => {}
    }
    if let Some(builtin) = universe.builtin_by_name(name) {
        return Ok(ResolvedSpec {
            subject: builtin,
            target: builtin,
            typedef: None,
            display: name,
        });
    }
    Err(ConfigError::UnknownType {
        name: spec.to_owned(),
    })
}

fn map_lookup(result: Result<TypeId, FactsError>, spec: &str) -> Result<TypeId, ConfigError> {
    match result {
        Ok(id) => Ok(id),
        Err(
            FactsError::RecordAmbiguous { count, .. }
            | FactsError::TypedefAmbiguous { count, .. },
        ) => Err(ConfigError::AmbiguousType {
            name: spec.to_owned(),
            count,
        }),
        Err(_) => Err(ConfigError::UnknownType {
            name: spec.to_owned(),
        }),
    }
}

fn require_member(
    universe: &Universe,
    record: TypeId,
    member: Name,
    record_spec: &str,
) -> Result<(), ConfigError> {
    if let Type::Record(def) = universe.type_of(record) {
        if def.members.iter().any(|m| m.name == member) {
            return Ok(());
        }
    }
    Err(ConfigError::UnknownMember {
        record: record_spec.to_owned(),
        member: universe.interner().lookup(member).to_owned(),
    })
}

fn parse_escape_kind(kind: &str) -> Result<EscapeKind, ConfigError> {
    match kind {
        "assigned" => Ok(EscapeKind::Assigned),
        "arg" => Ok(EscapeKind::FunctionArg),
        "indirect-call" => Ok(EscapeKind::IndirectCall),
        other => Err(ConfigError::BadEscapeKind {
            kind: other.to_owned(),
        }),
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::testutil::{tid, UniverseBuilder};

    use super::*;

    fn parse_raw(json: &str) -> RawConfig {
        serde_json::from_str(json).unwrap()
    }

    fn list_universe() -> Universe {
        let mut b = UniverseBuilder::new();
        let int = b.builtin("int", 4);
        let head = b.record("list_head", 16, &[("next", int, 0), ("prev", int, 8)]);
        b.record(
            "item",
            24,
            &[("value", int, 0), ("link", head, 8)],
        );
        b.build()
    }

    #[test]
    fn empty_document_resolves_with_builtin_blacklist() {
        let u = list_universe();
        let cfg = GenConfig::resolve(&RawConfig::default(), &u).unwrap();

        for tag in BUILTIN_STRUCT_BLACKLIST {
            assert!(cfg.blacklist_structs.contains(&u.interner().intern(tag)));
        }
        assert!(cfg.blacklist_struct_types.is_empty());
        assert!(cfg.custom_ptr.is_empty());
    }

    #[test]
    fn member_keys_strip_keyword_and_keep_dots() {
        let u = list_universe();
        let key = MemberKey::parse("struct item.link.next", &u).unwrap();
        assert_eq!(u.interner().lookup(key.type_name), "item");
        assert_eq!(u.interner().lookup(key.member), "link.next");

        assert!(MemberKey::parse("item", &u).is_err());
        assert!(MemberKey::parse("struct .x", &u).is_err());
    }

    #[test]
    fn type_specs_resolve_records_typedefs_and_builtins() {
        let mut b = UniverseBuilder::new();
        let int = b.builtin("int", 4);
        let inode = b.record("inode", 4, &[("v", int, 0)]);
        let dentry = b.record("dentry", 4, &[("v", int, 0)]);
        let dentry_td = b.typedef("dentry_t", dentry);
        let u = b.build();

        let raw = parse_raw(
            r#"{
                "custom_ptr_map": {
                    "struct inode.v": "dentry_t",
                    "dentry_t.v": "struct inode"
                },
                "pvoid_map": { "struct inode.v": ["int"] }
            }"#,
        );
        let cfg = GenConfig::resolve(&raw, &u).unwrap();

        let by_typedef = cfg
            .custom_ptr
            .get(&MemberKey::parse("struct inode.v", &u).unwrap())
            .unwrap();
        assert_eq!(by_typedef.target, tid(dentry));
        assert_eq!(by_typedef.typedef, Some(tid(dentry_td)));

        let typedef_key = MemberKey::parse("dentry_t.v", &u).unwrap();
        assert_eq!(u.interner().lookup(typedef_key.type_name), "dentry");
        let by_tag = cfg.custom_ptr.get(&typedef_key).unwrap();
        assert_eq!(by_tag.target, tid(inode));
        assert_eq!(by_tag.typedef, None);

        let pvoid = cfg
            .pvoid
            .get(&MemberKey::parse("struct inode.v", &u).unwrap())
            .unwrap();
        assert_eq!(pvoid.as_slice(), &[tid(int)]);
    }

    #[test]
    fn unknown_and_ambiguous_types_fail_resolution() {
        let mut b = UniverseBuilder::new();
        let int = b.builtin("int", 4);
        b.record("dup", 4, &[("v", int, 0)]);
        b.record("dup", 4, &[("v", int, 0)]);
        let u = b.build();

        let missing = parse_raw(r#"{ "root_types": ["struct nothere"] }"#);
        assert!(matches!(
            GenConfig::resolve(&missing, &u),
            Err(ConfigError::UnknownType { .. })
        ));

        let dup = parse_raw(r#"{ "root_types": ["struct dup"] }"#);
        assert!(matches!(
            GenConfig::resolve(&dup, &u),
            Err(ConfigError::AmbiguousType { count: 2, .. })
        ));
    }

    #[test]
    fn count_specs_parse_numbers_formulas_and_probe() {
        let u = list_universe();
        let raw = parse_raw(
            r#"{
                "custom_element_count_map": {
                    "struct item.value": 4,
                    "struct item.link": "probe"
                },
                "custom_global_element_count_map": {
                    "table": "ATOM(self->len)"
                }
            }"#,
        );
        let cfg = GenConfig::resolve(&raw, &u).unwrap();

        let fixed = cfg
            .custom_counts
            .get(&MemberKey::parse("struct item.value", &u).unwrap())
            .unwrap();
        assert_eq!(*fixed, CountSpec::Fixed(4));
        let probe = cfg
            .custom_counts
            .get(&MemberKey::parse("struct item.link", &u).unwrap())
            .unwrap();
        assert_eq!(*probe, CountSpec::Probe);
        let formula = cfg.global_counts.get(&u.interner().intern("table")).unwrap();
        assert_eq!(*formula, CountSpec::Formula("ATOM(self->len)".to_owned()));
    }

    #[test]
    fn blank_count_spec_is_rejected() {
        let u = list_universe();
        let raw = parse_raw(r#"{ "custom_element_count_map": { "struct item.value": " " } }"#);
        assert!(matches!(
            GenConfig::resolve(&raw, &u),
            Err(ConfigError::BadCountSpec { .. })
        ));
    }

    #[test]
    fn list_links_validate_the_link_member() {
        let u = list_universe();
        let good = parse_raw(
            r#"{
                "listhead_config": {
                    "struct item.link": { "container": "struct item", "link": "link" }
                }
            }"#,
        );
        let cfg = GenConfig::resolve(&good, &u).unwrap();
        let link = cfg
            .list_links
            .get(&MemberKey::parse("struct item.link", &u).unwrap())
            .unwrap();
        assert_eq!(u.interner().lookup(link.link), "link");

        let bad = parse_raw(
            r#"{
                "listhead_config": {
                    "struct item.link": { "container": "struct item", "link": "nope" }
                }
            }"#,
        );
        assert!(matches!(
            GenConfig::resolve(&bad, &u),
            Err(ConfigError::UnknownMember { .. })
        ));
    }

    #[test]
    fn escape_kinds_parse_or_fail_loudly() {
        let u = list_universe();
        let raw = parse_raw(
            r#"{ "escape_map": { "struct item.value": ["assigned", "arg", "indirect-call"] } }"#,
        );
        let cfg = GenConfig::resolve(&raw, &u).unwrap();
        let kinds = cfg
            .escape
            .get(&MemberKey::parse("struct item.value", &u).unwrap())
            .unwrap();
        assert_eq!(
            kinds.as_slice(),
            &[
                EscapeKind::Assigned,
                EscapeKind::FunctionArg,
                EscapeKind::IndirectCall
            ]
        );

        let bad = parse_raw(r#"{ "escape_map": { "struct item.value": ["returned"] } }"#);
        assert!(matches!(
            GenConfig::resolve(&bad, &u),
            Err(ConfigError::BadEscapeKind { .. })
        ));
    }

    #[test]
    fn trigger_overrides_sort_by_position() {
        let u = list_universe();
        let raw = parse_raw(
            r#"{
                "trigger_list": {
                    "probed_entry": { "3": "struct item", "1": "struct list_head" }
                }
            }"#,
        );
        let cfg = GenConfig::resolve(&raw, &u).unwrap();
        let entries = cfg
            .trigger_list
            .get(&u.interner().intern("probed_entry"))
            .unwrap();
        let positions: Vec<u8> = entries.iter().map(|e| e.position).collect();
        assert_eq!(positions, vec![1, 3]);

        let bad = parse_raw(r#"{ "trigger_list": { "f": { "0": "struct item" } } }"#);
        assert!(matches!(
            GenConfig::resolve(&bad, &u),
            Err(ConfigError::BadArgPosition { .. })
        ));
    }

    #[test]
    fn cli_ignores_extend_both_blacklists() {
        let u = list_universe();
        let mut cfg = GenConfig::resolve(&RawConfig::default(), &u).unwrap();
        cfg.add_ignored("task_struct, cred".split(','), &u);

        let task = u.interner().intern("task_struct");
        let cred = u.interner().intern("cred");
        assert!(cfg.blacklist_structs.contains(&task));
        assert!(cfg.blacklist_struct_types.contains(&cred));
    }
}
