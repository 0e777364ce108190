//! Raw serde view of the fact database.
//!
//! Field names and units follow the extractor's output: sizes and member
//! offsets are in **bits**, type cross-references use the extractor's own
//! id space, and anonymous-member entries carry the `__!anonrecord__` /
//! `__!recorddecl__` marker names. Conversion to bytes and to dense ids
//! happens in the loader.

use serde::Deserialize;

/// One entry of the `types` array.
#[derive(Debug, Clone, Deserialize)]
pub struct RawType {
    pub id: u64,
    /// `builtin`, `record`, `record_forward`, `enum`, `enum_forward`,
    /// `typedef`, `pointer`, `const_array`, `incomplete_array`,
    /// `attributed` or `function`.
    pub class: String,
    /// Tag, typedef name or builtin spelling; empty for anonymous types.
    #[serde(default)]
    pub str: String,
    /// Size in bits.
    #[serde(default)]
    pub size: u64,
    /// Referenced type ids; members for records, the target elsewhere.
    #[serde(default)]
    pub refs: Vec<u64>,
    /// Member names parallel to `refs` (records only).
    #[serde(default)]
    pub refnames: Vec<String>,
    /// Member offsets in bits; shorter than `refs` when declaration-only
    /// entries are present.
    #[serde(default)]
    pub memberoffsets: Vec<u64>,
    /// Indices into `refs` that are declarations, not instances.
    #[serde(default)]
    pub decls: Vec<usize>,
    /// Per-member usage marker parallel to `refs`; zero or negative means
    /// the member is never dereferenced.
    #[serde(default)]
    pub usedrefs: Vec<i64>,
    /// Number of trailing `refs` entries that are attribute specifiers.
    #[serde(default)]
    pub attrnum: usize,
    #[serde(default, rename = "union")]
    pub is_union: bool,
    /// Qualifier letters; contains `c` for const.
    #[serde(default)]
    pub qualifiers: String,
    /// `file:line` of the definition.
    #[serde(default)]
    pub location: String,
    /// Raw attribute text for `attributed` wrappers.
    #[serde(default)]
    pub attrcore: String,
}

/// One entry of the `globals` array.
#[derive(Debug, Clone, Deserialize)]
pub struct RawGlobal {
    pub name: String,
    #[serde(rename = "type")]
    pub type_id: u64,
    /// Defining source file.
    #[serde(default)]
    pub file: String,
    /// Stable symbol hash, `name/dir/file` shaped.
    #[serde(default)]
    pub hash: String,
    /// Owning module indices into `modules`.
    #[serde(default)]
    pub mids: Vec<usize>,
}

/// One entry of the `functions` array.
#[derive(Debug, Clone, Deserialize)]
pub struct RawFunction {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub nargs: u32,
    /// Return type followed by argument types.
    #[serde(default)]
    pub types: Vec<u64>,
    /// Ids of directly called functions.
    #[serde(default)]
    pub calls: Vec<u64>,
}

/// Top-level fact database document.
#[derive(Debug, Clone, Deserialize)]
pub struct RawDatabase {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub modules: Vec<String>,
    pub types: Vec<RawType>,
    #[serde(default)]
    pub globals: Vec<RawGlobal>,
    #[serde(default)]
    pub functions: Vec<RawFunction>,
}
