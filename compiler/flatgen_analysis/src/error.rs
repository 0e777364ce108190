//! Fatal errors of the generation phase.

use std::path::PathBuf;

use flatgen_facts::{ConfigError, FactsError};
use flatgen_ir::StoreError;

/// Error raised while turning the fact universe into recipes.
#[derive(Debug, thiserror::Error)]
pub enum GenError {
    #[error(transparent)]
    Facts(#[from] FactsError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("record '{tag}' declares {members} member slots but {offsets} offsets")]
    InconsistentRecord {
        tag: String,
        members: usize,
        offsets: usize,
    },

    #[error("bad root spec '{spec}': {detail}")]
    BadRootSpec { spec: String, detail: &'static str },

    #[error("function '{function}' has {nargs} arguments, cannot dump argument {position}")]
    ArgOutOfRange {
        function: String,
        position: u8,
        nargs: u32,
    },

    #[error("no structures to generate recipes for")]
    NoSubjects,

    #[error("failed to read globals list {path}: {source}")]
    GlobalsListIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
