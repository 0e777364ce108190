//! Whole-module assembly.
//!
//! Stitches every rendered piece into the file set a recipe kernel
//! module is built from: the per-bucket recipe sources, the main source
//! with the probe handler and recipe registration, `common.h`, `Kbuild`
//! and the companion log.

use flatgen_analysis::DriverOutput;
use flatgen_facts::Universe;
use flatgen_ir::{RootIdentity, Trigger};
use tracing::debug;

use crate::header::render_common_header;
use crate::kbuild::render_kbuild;
use crate::layout::bucket_recipes;
use crate::log::render_log;
use crate::output::ModuleSources;
use crate::recipe::render_recipe;
use crate::trigger::{render_handler, render_root_dump};

const AUTOGEN_BANNER: &str = "/* This file is autogenerated (with possible requirement of minor modifications). Do it at your own peril! */";

const MODULE_INCLUDES: &str = "#include <linux/module.h>\n\
                               #include <linux/interval_tree_generic.h>\n\
                               \n\
                               #include \"kflat.h\"\n\
                               #include \"kflat_recipe.h\"\n\
                               \n\
                               #include \"common.h\"";

/// Knobs the CLI exposes for emission.
#[derive(Debug, Clone)]
pub struct EmitOptions {
    /// Probed entry function; names the handler.
    pub entry: String,
    /// Module name for Kbuild; defaults to the entry function.
    pub module_name: Option<String>,
    /// Registration id for `KFLAT_RECIPE`; defaults to the entry function.
    pub recipe_id: Option<String>,
    /// Directories record locations resolve against for `common.h`
    /// includes.
    pub include_dirs: Vec<String>,
}

impl EmitOptions {
    pub fn new(entry: impl Into<String>) -> Self {
        Self {
            entry: entry.into(),
            module_name: None,
            recipe_id: None,
            include_dirs: Vec::new(),
        }
    }

    fn module_name(&self) -> &str {
        self.module_name.as_deref().unwrap_or(&self.entry)
    }

    fn recipe_id(&self) -> &str {
        self.recipe_id.as_deref().unwrap_or(&self.entry)
    }
}

/// Render every output file for one generation run.
pub fn render_module(
    universe: &Universe,
    output: &DriverOutput,
    triggers: &[Trigger],
    options: &EmitOptions,
) -> ModuleSources {
    let lookup = universe.interner();
    let buckets = bucket_recipes(lookup, &output.store);
    let mut sources = ModuleSources::default();

    sources.push(
        "common.h",
        render_common_header(universe, output, &options.include_dirs),
    );

    let mut args = String::new();
    let mut globals = String::new();
    for trigger in triggers {
        match trigger.identity {
            RootIdentity::Argument { .. } => args.push_str(&render_root_dump(lookup, trigger)),
            RootIdentity::Global { .. } => globals.push_str(&render_root_dump(lookup, trigger)),
        }
    }
    let handler = render_handler(&options.entry, &args, &globals);
    let register = format!(
        "\tKFLAT_RECIPE(\"{}\", handler_{}),",
        options.recipe_id(),
        options.entry
    );
    sources.push(
        "kflat_recipes_main.c",
        format!(
            "{AUTOGEN_BANNER}\n{MODULE_INCLUDES}\n\n{}\n\nKFLAT_RECIPE_LIST(\n{register}\n);\n\nKFLAT_RECIPE_MODULE(\"Autogenerated kFlat recipe for {}\");\n",
            handler.trim(),
            options.entry
        ),
    );

    for (name, recipes) in &buckets.buckets {
        let body = recipes
            .iter()
            .map(|recipe| render_recipe(lookup, recipe))
            .collect::<Vec<_>>()
            .join("\n\n");
        sources.push(
            format!("{name}.c"),
            format!("{AUTOGEN_BANNER}\n{MODULE_INCLUDES}\n\n{body}\n"),
        );
    }

    sources.push(
        "Kbuild",
        render_kbuild(options.module_name(), &buckets.objects),
    );
    sources.push(".recipes.log", render_log(&output.report));
    debug!(
        files = sources.files.len(),
        buckets = buckets.buckets.len(),
        "module assembled"
    );
    sources
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests {
    use flatgen_analysis::{build_triggers, generate_recipes, parse_roots, GenCx};
    use flatgen_facts::testutil::UniverseBuilder;
    use flatgen_facts::GenConfig;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_module_file_set_and_registration() {
        let mut b = UniverseBuilder::new();
        let int = b.builtin("int", 4);
        let vc = b.record("vc_data", 16, &[("cols", int, 0), ("rows", int, 4)]);
        b.function("vt_ioctl", 1, &[int, vc], &[]);
        let universe = b.build();
        let config = GenConfig::default();
        let cx = GenCx::new(&universe, &config);

        let roots = parse_roots(&cx, &["vc_data@1".to_owned()], None, "vt_ioctl").unwrap();
        let mut driver = flatgen_analysis::RecipeDriver::new(&cx);
        driver.run(roots.iter().map(|r| r.seed(&cx))).unwrap();
        let set = build_triggers(&cx, universe.interner().intern("vt_ioctl"), &roots);
        driver.run(set.deps.clone()).unwrap();
        let output = driver.finish();

        let options = EmitOptions::new("vt_ioctl");
        let sources = render_module(&universe, &output, &set.triggers, &options);

        let names: Vec<&str> = sources.files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "common.h",
                "kflat_recipes_main.c",
                "simple_recipes.c",
                "Kbuild",
                ".recipes.log"
            ]
        );

        let main = &sources.get("kflat_recipes_main.c").unwrap().text;
        assert!(main.starts_with("/* This file is autogenerated"));
        assert!(main.contains("static void handler_vt_ioctl(struct kflat* kflat, struct probe_regs* regs) {"));
        assert!(main.contains("struct vc_data *target = (struct vc_data*) regs->arg1;"));
        assert!(main.contains("KFLAT_RECIPE_LIST(\n\tKFLAT_RECIPE(\"vt_ioctl\", handler_vt_ioctl),\n);"));
        assert!(main.contains("KFLAT_RECIPE_MODULE(\"Autogenerated kFlat recipe for vt_ioctl\");"));

        let simple = &sources.get("simple_recipes.c").unwrap().text;
        assert!(simple.contains(
            "FUNCTION_DEFINE_FLATTEN_STRUCT_ITER_SELF_CONTAINED(vc_data,16,"
        ));

        let kbuild = &sources.get("Kbuild").unwrap().text;
        assert!(kbuild.contains("vt_ioctl_recipes-objs := \\\n    kflat_recipes_main.o \\\n    simple_recipes.o"));
    }

    #[test]
    fn test_overridden_module_and_recipe_names() {
        let mut b = UniverseBuilder::new();
        let int = b.builtin("int", 4);
        let rec = b.record("cfg", 8, &[("v", int, 0)]);
        b.function("probe", 1, &[int, rec], &[]);
        let universe = b.build();
        let config = GenConfig::default();
        let cx = GenCx::new(&universe, &config);

        let roots = parse_roots(&cx, &["cfg@1".to_owned()], None, "probe").unwrap();
        let output = generate_recipes(&cx, roots.iter().map(|r| r.seed(&cx))).unwrap();
        let set = build_triggers(&cx, universe.interner().intern("probe"), &roots);

        let mut options = EmitOptions::new("probe");
        options.module_name = Some("memory_map".to_owned());
        options.recipe_id = Some("custom_id".to_owned());
        let sources = render_module(&universe, &output, &set.triggers, &options);

        let main = &sources.get("kflat_recipes_main.c").unwrap().text;
        assert!(main.contains("KFLAT_RECIPE(\"custom_id\", handler_probe),"));
        let kbuild = &sources.get("Kbuild").unwrap().text;
        assert!(kbuild.contains("obj-m = memory_map_recipes.o"));
    }
}
