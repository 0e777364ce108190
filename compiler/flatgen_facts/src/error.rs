//! Fatal errors raised while loading facts and configuration.
//!
//! Lookups that can match zero or several entries report that outcome
//! explicitly; nothing in this crate silently picks a candidate.

use std::path::PathBuf;

/// Error loading or querying the fact database.
#[derive(Debug, thiserror::Error)]
pub enum FactsError {
    #[error("failed to read database file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse database JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("duplicate type id {id} in database")]
    DuplicateTypeId { id: u64 },

    #[error("reference to unknown type id {id}")]
    UnknownTypeRef { id: u64 },

    #[error("malformed entry for type id {id}: {detail}")]
    MalformedType { id: u64, detail: &'static str },

    #[error("struct or union '{tag}' not found")]
    RecordNotFound { tag: String },

    #[error("struct or union '{tag}' matches {count} definitions")]
    RecordAmbiguous { tag: String, count: usize },

    #[error("type '{name}' not found")]
    TypedefNotFound { name: String },

    #[error("type '{name}' matches {count} definitions")]
    TypedefAmbiguous { name: String, count: usize },

    #[error("global variable '{name}' not found")]
    GlobalNotFound { name: String },

    #[error("global variable '{name}' matches {count} definitions")]
    GlobalAmbiguous { name: String, count: usize },

    #[error("function '{name}' not found")]
    FunctionNotFound { name: String },

    #[error("function '{name}' matches {count} definitions")]
    FunctionAmbiguous { name: String, count: usize },
}

/// Error loading or resolving the operator configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("config references unknown type '{name}'")]
    UnknownType { name: String },

    #[error("config type '{name}' matches {count} definitions")]
    AmbiguousType { name: String, count: usize },

    #[error("config references unknown member '{member}' of '{record}'")]
    UnknownMember { record: String, member: String },

    #[error("bad member key '{key}': expected '[struct|union ]<type>.<member>'")]
    BadMemberKey { key: String },

    #[error("bad type spec '{spec}'")]
    BadTypeSpec { spec: String },

    #[error("bad element count '{value}' for '{key}'")]
    BadCountSpec { key: String, value: String },

    #[error("bad escape kind '{kind}': expected assigned, arg or indirect-call")]
    BadEscapeKind { kind: String },

    #[error("bad argument position '{key}': expected a 1-based number")]
    BadArgPosition { key: String },
}
