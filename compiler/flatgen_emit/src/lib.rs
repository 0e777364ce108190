//! C source rendering for the Flatgen recipe compiler.
//!
//! Consumes the recipe store, triggers and report produced by the
//! analysis crate and renders the files a recipe kernel module is
//! built from:
//!
//! - one source file per recipe bucket plus `kflat_recipes_main.c`
//!   carrying the probe handler and the recipe registration
//! - `common.h` with record forwards, typedef bridges and flatten
//!   function declarations
//! - `Kbuild` linking the generated objects into a single module
//! - a `.recipes.log` degradation report plus a terminal run summary
//!
//! Rendering is pure string assembly over the IR. Nothing here consults
//! the fact database beyond name lookups and record classification, so
//! every output is a deterministic function of the analysis results.

mod header;
mod kbuild;
mod layout;
mod log;
mod module;
mod output;
mod recipe;
mod trigger;

pub use header::{render_common_header, resolve_include};
pub use kbuild::render_kbuild;
pub use layout::{bucket_recipes, RecipeBuckets};
pub use log::{render_log, render_summary};
pub use module::{render_module, EmitOptions};
pub use output::{EmitError, ModuleSources, SourceFile};
pub use recipe::{render_node, render_recipe};
pub use trigger::{render_handler, render_root_dump};
