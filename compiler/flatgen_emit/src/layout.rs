//! Recipe bucketing for output files.
//!
//! Simple recipes all share one source file. Recipes that need review
//! split by subject class: tag-named records bucket by the directory of
//! their defining location so related kernel subsystems land together,
//! while typedef-named and anonymous subjects get one class file each.
//! The main object always leads the link list.

use flatgen_ir::{Recipe, RecipeFlags, RecipeStore, StringLookup};

/// Non-simple recipes grouped into output files, plus the object list
/// for the Kbuild link line.
#[derive(Debug, Default)]
pub struct RecipeBuckets<'a> {
    /// Bucket name to recipes, in first-appearance order.
    pub buckets: Vec<(String, Vec<&'a Recipe>)>,
    /// Objects for the module link line, `kflat_recipes_main.o` first.
    pub objects: Vec<String>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum SubjectClass {
    Record,
    RecordType,
    Typename,
}

fn classify(recipe: &Recipe) -> SubjectClass {
    if recipe.flags.contains(RecipeFlags::ANON) {
        SubjectClass::Typename
    } else if recipe.subject.kind.is_typedef() {
        SubjectClass::RecordType
    } else {
        SubjectClass::Record
    }
}

/// Group every recipe in the store into its output bucket.
pub fn bucket_recipes<'a>(lookup: &impl StringLookup, store: &'a RecipeStore) -> RecipeBuckets<'a> {
    let mut out = RecipeBuckets {
        buckets: Vec::new(),
        objects: vec!["kflat_recipes_main.o".to_owned()],
    };
    for class in [
        SubjectClass::Record,
        SubjectClass::RecordType,
        SubjectClass::Typename,
    ] {
        for recipe in store.iter().filter(|r| classify(r) == class) {
            let bucket = if recipe.is_simple() {
                "simple_recipes".to_owned()
            } else {
                match class {
                    SubjectClass::Record => location_bucket(lookup.lookup(recipe.location)),
                    SubjectClass::RecordType => "record_type_recipes".to_owned(),
                    SubjectClass::Typename => "typename_recipes".to_owned(),
                }
            };
            push(&mut out, bucket, recipe);
        }
    }
    out
}

fn push<'a>(out: &mut RecipeBuckets<'a>, name: String, recipe: &'a Recipe) {
    if let Some((_, recipes)) = out.buckets.iter_mut().find(|(n, _)| *n == name) {
        recipes.push(recipe);
    } else {
        out.objects.push(format!("{name}.o"));
        out.buckets.push((name, vec![recipe]));
    }
}

/// Bucket name for a record location of the form `path/to/file.c:line`.
/// Bare file names keep the whole name with dots flattened; paths keep
/// their first two directory components, or three under `include/linux`
/// so the biggest header tree stays split.
fn location_bucket(location: &str) -> String {
    let token = location.split_whitespace().next().unwrap_or("");
    let token = token.trim_matches('\'');
    let file = token.split(':').next().unwrap_or(token);
    let file = normalize_path(file);
    match file.rsplit_once('/') {
        None => file.replace('.', "_"),
        Some((dir, _)) => {
            let parts: Vec<&str> = dir.split('/').filter(|p| !p.is_empty()).collect();
            if parts.len() == 1 {
                parts[0].to_owned()
            } else if parts.len() > 2 && parts[0] == "include" && parts[1] == "linux" {
                parts[..3].join("__")
            } else {
                parts[..2].join("__")
            }
        }
    }
}

/// Collapse `.`, `..` and empty path components.
pub(crate) fn normalize_path(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for comp in path.split('/') {
        match comp {
            "" | "." => {}
            ".." => {
                if parts.last().is_some_and(|p| *p != "..") {
                    parts.pop();
                } else {
                    parts.push("..");
                }
            }
            other => parts.push(other),
        }
    }
    if parts.is_empty() {
        ".".to_owned()
    } else {
        parts.join("/")
    }
}
