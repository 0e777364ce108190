//! Flatgen CLI support library.
//!
//! `main.rs` stays thin: argument parsing lives in [`cli`], the
//! load-analyze-emit pipeline in [`pipeline`]. Keeping both here makes a
//! whole run testable without spawning the binary.

pub mod cli;
pub mod pipeline;

pub use cli::{parse_args, CliError, Options, Parsed};
pub use pipeline::{run, Outcome, PipelineError};
