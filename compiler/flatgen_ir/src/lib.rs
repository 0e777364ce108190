//! Core IR for the Flatgen serialization-recipe compiler.
//!
//! This crate defines the handle types and the recipe intermediate
//! representation shared by the fact store, the analysis passes, and the
//! source emitter:
//!
//! - **Intern Everything**: member and tag strings → `Name(u32)`,
//!   fact-database types → `TypeId(u32)`
//! - **Recipes are data**: a `Recipe` is a list of `RecipeNode` values,
//!   never C text; rendering lives in the emitter
//! - **Reports are values**: every degradation is a `ReportEntry`, so a
//!   run's outcome can be asserted in tests
//!
//! Handles are 32-bit and `Copy`; anything that needs the original string
//! goes through a [`StringLookup`] implementor.

/// Compile-time assertion that a type has a specific size.
///
/// Used to prevent accidental size regressions in frequently-allocated types.
#[macro_export]
macro_rules! static_assert_size {
    ($ty:ty, $size:expr) => {
        const _: [(); $size] = [(); ::std::mem::size_of::<$ty>()];
    };
}

mod count;
mod interner;
mod member;
mod name;
mod pointee;
mod recipe;
mod report;
mod trigger;
mod type_id;
mod type_key;

pub use count::{CountOrigin, CountPolicy, EscapeKind, ProbeCause};
pub use interner::{InternError, SharedInterner, StringInterner, StringLookup};
pub use member::{render_path, MemberPath, MemberSite};
pub use name::Name;
pub use pointee::{PointeeEvidence, PointeeResolution, RecordTarget, ResolvedPointee};
pub use recipe::{
    ElemRef, Recipe, RecipeFlags, RecipeNode, RecipeNote, RecipeStore, RecordRef, StoreError,
    StubCause,
};
pub use report::{GenerationReport, ReportCategory, ReportEntry, RunStats};
pub use trigger::{RootIdentity, Trigger, TriggerShape};
pub use type_id::TypeId;
pub use type_key::{Subject, SubjectKind, TypeKey};
