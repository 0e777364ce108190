//! Command-line argument parsing.
//!
//! Positional arguments are root specs: `<type>` dumps the type passed as
//! the first probe argument, `<type>@<pos>` picks another position, and
//! `<global>:<suffix>` names a kernel global with an optional source-file
//! suffix to disambiguate duplicates. Everything else is flags.

use std::path::PathBuf;

/// Argument parsing failure; the binary prints it with the usage text.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("flag '{flag}' expects a value")]
    MissingValue { flag: String },

    #[error("unknown flag '{flag}'")]
    UnknownFlag { flag: String },

    #[error("missing entry function (-f)")]
    MissingEntry,
}

/// One resolved invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// Root specs in the order given.
    pub roots: Vec<String>,
    /// Fact database path.
    pub database: PathBuf,
    /// Directory the generated sources land in.
    pub out_dir: PathBuf,
    /// Optional configuration file.
    pub config: Option<PathBuf>,
    /// Probed entry function.
    pub entry: String,
    /// Optional file listing global hashes, one per line.
    pub globals_list: Option<PathBuf>,
    /// Type names folded into both blacklists.
    pub ignore_structs: Vec<String>,
    /// Include roots record locations resolve against.
    pub include_dirs: Vec<String>,
    /// `KFLAT_RECIPE` registration id; defaults to the entry function.
    pub recipe_id: Option<String>,
    /// Kbuild module name; defaults to the entry function.
    pub module_name: Option<String>,
    /// List discovered types instead of emitting.
    pub dry_run: bool,
    pub verbose: bool,
}

impl Options {
    /// Defaults for one entry function; tests and the parser build on
    /// this.
    pub fn new(entry: impl Into<String>) -> Self {
        Self {
            roots: Vec::new(),
            database: PathBuf::from("db.json"),
            out_dir: PathBuf::from("recipe_gen"),
            config: None,
            entry: entry.into(),
            globals_list: None,
            ignore_structs: Vec::new(),
            include_dirs: Vec::new(),
            recipe_id: None,
            module_name: None,
            dry_run: false,
            verbose: false,
        }
    }
}

/// Outcome of parsing: a run request, or an explicit help request.
#[derive(Debug, PartialEq, Eq)]
pub enum Parsed {
    Run(Options),
    Help,
}

/// Parse the argument list, program name already stripped.
pub fn parse_args(args: &[String]) -> Result<Parsed, CliError> {
    let mut options = Options::new("");
    let mut i = 0;
    while i < args.len() {
        let arg = args[i].as_str();
        let mut value = |flag: &str| -> Result<String, CliError> {
            i += 1;
            args.get(i).cloned().ok_or_else(|| CliError::MissingValue {
                flag: flag.to_owned(),
            })
        };
        match arg {
            "-h" | "--help" => return Ok(Parsed::Help),
            "-n" => options.dry_run = true,
            "-v" => options.verbose = true,
            "-d" => options.database = PathBuf::from(value("-d")?),
            "-o" => options.out_dir = PathBuf::from(value("-o")?),
            "-c" => options.config = Some(PathBuf::from(value("-c")?)),
            "-f" => options.entry = value("-f")?,
            "--globals-list" => {
                options.globals_list = Some(PathBuf::from(value("--globals-list")?));
            }
            "--ignore-structs" => {
                let list = value("--ignore-structs")?;
                options.ignore_structs.extend(
                    list.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_owned),
                );
            }
            "--include-dirs" => {
                let list = value("--include-dirs")?;
                options.include_dirs.extend(
                    list.split(':')
                        .filter(|s| !s.is_empty())
                        .map(str::to_owned),
                );
            }
            "--recipe-id" => options.recipe_id = Some(value("--recipe-id")?),
            "--module-name" => options.module_name = Some(value("--module-name")?),
            flag if flag.starts_with('-') => {
                return Err(CliError::UnknownFlag {
                    flag: flag.to_owned(),
                });
            }
            spec => options.roots.push(spec.to_owned()),
        }
        i += 1;
    }
    if options.entry.is_empty() {
        return Err(CliError::MissingEntry);
    }
    Ok(Parsed::Run(options))
}
