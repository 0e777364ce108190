//! End-to-end pipeline runs over a small fact database.

#![expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]

use std::fs;
use std::path::Path;

use flatgenc::cli::Options;
use flatgenc::pipeline::{run, Outcome, PipelineError};
use pretty_assertions::assert_eq;

/// A probed ioctl taking a `struct msg_packet*` in its second argument,
/// one reachable callee, and a `struct msg_stats` global. Sizes and
/// offsets are in bits, as the extractor writes them.
const DATABASE: &str = r#"{
    "version": "1.0",
    "types": [
        { "id": 1, "class": "builtin", "str": "int", "size": 32 },
        { "id": 2, "class": "builtin", "str": "char", "size": 8 },
        { "id": 3, "class": "pointer", "size": 64, "refs": [2] },
        { "id": 4, "class": "record", "str": "msg_packet", "size": 128,
          "refs": [1, 3], "refnames": ["len", "text"],
          "memberoffsets": [0, 64], "usedrefs": [1, 1],
          "location": "drivers/net/msg.c:12" },
        { "id": 5, "class": "record", "str": "msg_stats", "size": 64,
          "refs": [1, 1], "refnames": ["rx", "tx"],
          "memberoffsets": [0, 32], "usedrefs": [1, 1],
          "location": "drivers/net/msg.c:40" }
    ],
    "globals": [
        { "name": "live_stats", "type": 5, "file": "drivers/net/msg.c",
          "hash": "live_stats/drivers/net/msg.c" }
    ],
    "functions": [
        { "id": 100, "name": "msg_ioctl", "nargs": 2,
          "types": [1, 1, 3], "calls": [101] },
        { "id": 101, "name": "msg_log", "nargs": 1,
          "types": [1, 1], "calls": [] }
    ]
}"#;

const CONFIG: &str = r#"{ "string_members": ["struct msg_packet.text"] }"#;

struct Fixture {
    _dir: tempfile::TempDir,
    options: Options,
}

fn fixture() -> Fixture {
    let dir = tempfile::TempDir::new().unwrap();
    let database = dir.path().join("db.json");
    let config = dir.path().join("config.json");
    fs::write(&database, DATABASE).unwrap();
    fs::write(&config, CONFIG).unwrap();

    let mut options = Options::new("msg_ioctl");
    options.roots = vec!["msg_packet@2".to_owned(), "live_stats:".to_owned()];
    options.database = database;
    options.config = Some(config);
    options.out_dir = dir.path().join("recipe_gen");
    Fixture { _dir: dir, options }
}

fn read(out_dir: &Path, name: &str) -> String {
    fs::read_to_string(out_dir.join(name)).unwrap()
}

#[test]
fn test_run_writes_module_sources() {
    let fixture = fixture();
    let outcome = run(&fixture.options).unwrap();
    let Outcome::Emitted { summary } = outcome else {
        panic!("expected an emitting run");
    };

    assert!(summary.contains("--- Generated recipes: 2 (simple: 2, to check: 0, to fix: 0)"));
    assert!(summary.contains("--- Functions reachable from the entry point: 2"));

    let out = &fixture.options.out_dir;
    let main = read(out, "kflat_recipes_main.c");
    assert!(main.starts_with("/* This file is autogenerated"));
    assert!(main.contains(
        "static void handler_msg_ioctl(struct kflat* kflat, struct probe_regs* regs) {"
    ));
    assert!(main.contains("struct msg_packet *target = (struct msg_packet*) regs->arg2;"));
    assert!(main.contains("flatten_global_address_by_name(\"live_stats\")"));
    assert!(main.contains("KFLAT_RECIPE(\"msg_ioctl\", handler_msg_ioctl),"));
    assert!(main.contains("KFLAT_RECIPE_MODULE(\"Autogenerated kFlat recipe for msg_ioctl\");"));

    let common = read(out, "common.h");
    assert!(common.contains("struct msg_packet;"));
    assert!(common.contains("struct msg_stats;"));
    assert!(common.contains("FUNCTION_DECLARE_FLATTEN_STRUCT_ITER(msg_packet);"));

    let simple = read(out, "simple_recipes.c");
    assert!(simple.contains("FUNCTION_DEFINE_FLATTEN_STRUCT_ITER_SELF_CONTAINED(msg_packet,16,"));
    assert!(simple.contains("AGGREGATE_FLATTEN_STRING_SELF_CONTAINED(text,8);"));
    assert!(simple.contains("FUNCTION_DEFINE_FLATTEN_STRUCT_ITER_SELF_CONTAINED(msg_stats,8,"));

    let kbuild = read(out, "Kbuild");
    assert!(kbuild.contains("msg_ioctl_recipes-objs :="));
    assert!(kbuild.contains("obj-m = msg_ioctl_recipes.o"));

    let log = read(out, ".recipes.log");
    assert!(log.contains("# Pointers to char (strings): 1 [1 unique]"));
    assert!(log.contains("  struct msg_packet -> text"));
}

#[test]
fn test_dry_run_lists_subjects_and_writes_nothing() {
    let mut fixture = fixture();
    fixture.options.dry_run = true;

    let outcome = run(&fixture.options).unwrap();
    let Outcome::DryRun(subjects) = outcome else {
        panic!("expected a dry run");
    };
    assert_eq!(
        subjects,
        vec!["struct msg_packet".to_owned(), "struct msg_stats".to_owned()]
    );
    assert!(!fixture.options.out_dir.exists());
}

#[test]
fn test_module_and_recipe_overrides_reach_the_output() {
    let mut fixture = fixture();
    fixture.options.module_name = Some("msg".to_owned());
    fixture.options.recipe_id = Some("net:msg_ioctl".to_owned());

    run(&fixture.options).unwrap();
    let out = &fixture.options.out_dir;
    assert!(read(out, "Kbuild").contains("obj-m = msg_recipes.o"));
    assert!(read(out, "kflat_recipes_main.c")
        .contains("KFLAT_RECIPE(\"net:msg_ioctl\", handler_msg_ioctl),"));
}

#[test]
fn test_unknown_entry_function_is_fatal() {
    let mut fixture = fixture();
    fixture.options.entry = "no_such_probe".to_owned();

    let err = run(&fixture.options).unwrap_err();
    assert!(matches!(err, PipelineError::Gen(_)));
}

#[test]
fn test_bad_config_reference_is_fatal() {
    let fixture = fixture();
    let bad = fixture.options.config.clone().unwrap();
    fs::write(&bad, r#"{ "root_types": ["struct missing_everywhere"] }"#).unwrap();

    let err = run(&fixture.options).unwrap_err();
    assert!(matches!(err, PipelineError::Config(_)));
}
