//! Fact-database access for the Flatgen recipe compiler.
//!
//! Loads the JSON fact database produced by the clang-based extractor into
//! an immutable [`Universe`] of interned types, globals and functions, and
//! loads the operator configuration that supplies usage evidence and
//! per-member overrides.
//!
//! Everything here is read-only after load; the analysis passes only ever
//! borrow it.

mod config;
mod error;
mod load;
mod model;
mod store;
pub mod testutil;

pub use config::{
    ContainerOfTarget, CountSpec, CustomPointee, DerefUse, GenConfig, ListLink, MemberKey,
    RawConfig, RawContainerOf, RawCount, RawDerefUse, RawListLink, TriggerOverride,
    BUILTIN_STRUCT_BLACKLIST, BUILTIN_STRUCT_TYPE_BLACKLIST,
};
pub use error::{ConfigError, FactsError};
pub use load::load_database;
pub use model::{RawDatabase, RawFunction, RawGlobal, RawType};
pub use store::{
    Function, Global, Member, Record, RecordResolution, Type, Universe, POINTER_SIZE,
};
