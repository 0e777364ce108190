//! Analysis passes for the Flatgen serialization-recipe compiler.
//!
//! This crate turns loaded facts into recipe IR. The pipeline is:
//!
//! - **Flatten**: expand a record's members through nested anonymous
//!   records into offset-bearing flat entries
//! - **Resolve**: decide what each pointer member really points at, from
//!   declared types plus configured usage evidence
//! - **Count**: attach an element-count policy to each resolved pointer
//! - **Build**: assemble one [`Recipe`](flatgen_ir::Recipe) per subject
//!   record
//! - **Drive**: run build to a fixed point over everything the recipes
//!   reference
//! - **Trigger**: resolve root specs and shape the entry points that
//!   kick off serialization at runtime
//!
//! Every pass borrows the same [`GenCx`]; degradations land in a
//! [`GenerationReport`](flatgen_ir::GenerationReport) instead of
//! aborting the run.

mod build;
mod calltree;
mod count;
mod cx;
mod driver;
mod error;
mod flatten;
mod resolve;
mod trigger;

pub use build::{build_recipe, AnonTypedef, BuildOutcome, RecordTypedef};
pub use calltree::reachable_functions;
pub use cx::GenCx;
pub use driver::{generate_recipes, DriverOutput, RecipeDriver};
pub use error::GenError;
pub use trigger::{build_triggers, parse_roots, RootRequest, TriggerSet};
