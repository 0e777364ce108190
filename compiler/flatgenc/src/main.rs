//! Flatgen CLI
//!
//! Generates kflat serialization recipes from a kernel fact database.

use flatgenc::cli::{parse_args, Parsed};
use flatgenc::pipeline::{run, Outcome};

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let options = match parse_args(&args) {
        Ok(Parsed::Run(options)) => options,
        Ok(Parsed::Help) => {
            print_usage();
            return;
        }
        Err(err) => {
            eprintln!("error: {err}");
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    };

    if options.verbose {
        init_tracing();
    }

    match run(&options) {
        Ok(Outcome::DryRun(subjects)) => {
            println!("Recipes would be generated for {} types:", subjects.len());
            for subject in subjects {
                println!("  {subject}");
            }
        }
        Ok(Outcome::Emitted { summary }) => {
            print!("{summary}");
        }
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    }
}

fn init_tracing() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_tree::HierarchicalLayer::new(2).with_targets(true))
        .init();
}

fn print_usage() {
    println!("Flatgen recipe generator");
    println!();
    println!("Usage: flatgen -f <function> [options] <spec>...");
    println!();
    println!("Specs:");
    println!("  <type>               Dump <type> passed as the first probe argument");
    println!("  <type>@<pos>         Dump <type> passed as probe argument <pos>");
    println!("  <global>:<suffix>    Dump a kernel global; the source-file suffix");
    println!("                       disambiguates duplicated symbol names");
    println!();
    println!("Options:");
    println!("  -f <function>        Probed entry function (required)");
    println!("  -d <path>            Fact database (default: db.json)");
    println!("  -c <path>            Configuration file");
    println!("  -o <dir>             Output directory (default: recipe_gen)");
    println!("  --globals-list <f>   File with one global hash per line");
    println!("  --ignore-structs <l> Comma-separated type names to blacklist");
    println!("  --include-dirs <l>   Colon-separated include roots for common.h");
    println!("  --recipe-id <id>     Recipe registration id (default: entry function)");
    println!("  --module-name <n>    Kbuild module name (default: entry function)");
    println!("  -n                   Dry run: list discovered types, emit nothing");
    println!("  -v                   Verbose tracing output");
    println!("  -h, --help           Show this help message");
    println!();
    println!("Examples:");
    println!("  flatgen -f vt_ioctl vc_data@2");
    println!("  flatgen -f do_init_module -d facts.json vt_spawn_con: -o vt_recipes");
    println!("  flatgen -f tty_open -c tty.json --include-dirs include -n");
}
