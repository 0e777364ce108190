//! End-to-end generation pipeline.
//!
//! Loads the fact database and configuration, resolves the requested
//! roots, drives recipe generation to a fixed point, shapes the root
//! triggers, and either lists what was discovered (dry run) or renders
//! and writes the module sources.

use flatgen_analysis::{
    build_triggers, parse_roots, reachable_functions, GenCx, GenError, RecipeDriver,
};
use flatgen_emit::{render_module, render_summary, EmitError, EmitOptions};
use flatgen_facts::{load_database, ConfigError, FactsError, GenConfig, RawConfig, Universe};
use flatgen_ir::SharedInterner;
use tracing::info;

use crate::cli::Options;

/// Any fatal failure of a run; the binary maps it to exit code 1.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Facts(#[from] FactsError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Gen(#[from] GenError),

    #[error(transparent)]
    Emit(#[from] EmitError),
}

/// What one run produced.
#[derive(Debug)]
pub enum Outcome {
    /// `-n`: subjects the driver discovered, rendered and sorted.
    DryRun(Vec<String>),
    /// Sources written; the terminal summary to print.
    Emitted { summary: String },
}

/// Run the whole pipeline for one invocation.
pub fn run(options: &Options) -> Result<Outcome, PipelineError> {
    let raw = load_database(&options.database)?;
    let universe = Universe::from_raw(raw, SharedInterner::new())?;

    let raw_config = match &options.config {
        Some(path) => RawConfig::load(path)?,
        None => RawConfig::default(),
    };
    let mut config = GenConfig::resolve(&raw_config, &universe)?;
    config.add_ignored(options.ignore_structs.iter().map(String::as_str), &universe);

    let reachable = reachable_functions(&universe, &options.entry)?;

    let cx = GenCx::new(&universe, &config);
    let roots = parse_roots(
        &cx,
        &options.roots,
        options.globals_list.as_deref(),
        &options.entry,
    )?;

    let mut driver = RecipeDriver::new(&cx);
    driver.run(
        roots
            .iter()
            .map(|r| r.seed(&cx))
            .chain(config.root_types.iter().copied()),
    )?;
    let set = build_triggers(&cx, universe.interner().intern(&options.entry), &roots);
    driver.run(set.deps.iter().copied())?;
    let mut output = driver.finish();
    output.report.stats.functions_reachable = u32::try_from(reachable.len()).unwrap_or(u32::MAX);

    if options.dry_run {
        let lookup = universe.interner();
        let listing = output
            .store
            .iter_sorted(lookup)
            .iter()
            .map(|recipe| recipe.subject.render(lookup))
            .collect();
        return Ok(Outcome::DryRun(listing));
    }

    let mut emit = EmitOptions::new(options.entry.clone());
    emit.module_name = options.module_name.clone();
    emit.recipe_id = options.recipe_id.clone();
    emit.include_dirs = options.include_dirs.clone();
    let sources = render_module(&universe, &output, &set.triggers, &emit);
    sources.write_to(&options.out_dir)?;
    info!(
        dir = %options.out_dir.display(),
        recipes = output.store.len(),
        "generation finished"
    );
    Ok(Outcome::Emitted {
        summary: render_summary(&output.report, &output.store),
    })
}
