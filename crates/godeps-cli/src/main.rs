//! godeps - Inspect dependencies embedded in compiled Go binaries
//!
//! Every binary built by a Go toolchain carries its build provenance: main
//! module, toolchain version, resolved dependencies with checksums and
//! replace directives, and build settings. This tool decodes that record
//! from local files or remote URLs and prints it as a table or as JSON.

mod print;

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use godeps_core::{BinaryInfo, Dependency};
use tracing::{debug, Level};
use tracing_subscriber::EnvFilter;

/// Inspect dependencies embedded in compiled Go binaries
#[derive(Parser, Debug)]
#[command(name = "godeps")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path or URL of the Go binary to inspect
    binary: Option<String>,

    #[command(flatten)]
    source: SourceOpts,

    /// Filter out standard library dependencies
    #[arg(short = 's', long)]
    nostdlib: bool,

    /// Only show dependencies that have been replaced
    #[arg(short = 'r', long)]
    replaced: bool,

    /// Output in JSON format
    #[arg(short = 'j', long, global = true)]
    json: bool,

    /// Verbosity (-v adds checksums and build settings, -vv/-vvv add debug logs)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Args, Debug)]
struct SourceOpts {
    /// Treat the argument as a URL and download the binary in full
    #[arg(long, global = true)]
    url: bool,

    /// Treat the argument as a URL and fetch only the needed byte ranges
    #[arg(long, global = true, conflicts_with = "url")]
    remote: bool,

    /// Time budget in seconds for URL-based parsing
    #[arg(long, global = true, default_value_t = 30)]
    timeout: u64,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Find a specific dependency in a Go binary
    Find {
        /// Dependency name or path fragment to search for
        name: String,

        /// Path or URL of the Go binary to inspect
        binary: String,

        /// Match the dependency path exactly instead of by substring
        #[arg(short, long)]
        exact: bool,
    },

    /// Show the standard library packages a binary uses, grouped by prefix
    Stdlib {
        /// Path or URL of the Go binary to inspect
        binary: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = match cli.verbose {
        0 | 1 => Level::WARN,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match &cli.command {
        Some(Command::Find { name, binary, exact }) => run_find(&cli, name, binary, *exact).await,
        Some(Command::Stdlib { binary }) => run_stdlib(&cli, binary).await,
        None => run_root(&cli).await,
    }
}

/// Parses the binary from whichever source the flags select.
async fn load(source: &SourceOpts, binary: &str) -> Result<BinaryInfo> {
    let timeout = Duration::from_secs(source.timeout);
    let is_url = binary.starts_with("http://") || binary.starts_with("https://");

    if (source.url || source.remote) && !is_url {
        bail!("'{binary}' is not an http(s) URL");
    }

    let info = if source.remote {
        godeps_core::parse_remote_with_timeout(binary, timeout).await?
    } else if source.url || is_url {
        godeps_core::parse_url_with_timeout(binary, timeout).await?
    } else {
        godeps_core::parse_file(binary).await?
    };

    debug!(
        source = %info.source,
        kind = %info.source_kind,
        deps = info.dependencies.len(),
        "parsed binary"
    );
    Ok(info)
}

/// Default mode: print the full dependency report.
async fn run_root(cli: &Cli) -> Result<()> {
    let Some(binary) = cli.binary.as_deref() else {
        bail!("a Go binary path or URL is required (see --help)");
    };

    let info = load(&cli.source, binary).await?;

    let mut deps: Vec<&Dependency> = info.dependencies.iter().collect();
    if cli.nostdlib {
        deps.retain(|d| !godeps_core::is_stdlib(&d.path));
    }
    if cli.replaced {
        deps.retain(|d| d.is_replaced());
    }

    let verbose = cli.verbose > 0;
    if cli.json {
        println!("{}", print::render_json(&info, &deps, verbose)?);
    } else {
        print!("{}", print::render_info(&info, &deps, verbose));
    }
    Ok(())
}

/// `find` subcommand: search the dependency list by path.
async fn run_find(cli: &Cli, name: &str, binary: &str, exact: bool) -> Result<()> {
    let info = load(&cli.source, binary).await?;

    let matches: Vec<&Dependency> = if exact {
        info.dependency_by_path(name).into_iter().collect()
    } else {
        info.filter_dependencies(Some(|d: &Dependency| d.path.contains(name)))
    };

    if matches.is_empty() {
        println!("no dependencies matching '{name}' found in {binary}");
        return Ok(());
    }

    let verbose = cli.verbose > 0;
    if cli.json {
        println!("{}", print::render_json(&info, &matches, verbose)?);
    } else {
        println!("found {} dependencies matching '{name}'\n", matches.len());
        print!("{}", print::render_table(&matches, verbose));
    }
    Ok(())
}

/// `stdlib` subcommand: list standard-library packages grouped by prefix.
async fn run_stdlib(cli: &Cli, binary: &str) -> Result<()> {
    let info = load(&cli.source, binary).await?;
    let std_deps = info.filter_stdlib(true);

    if cli.json {
        println!("{}", print::render_json(&info, &std_deps, cli.verbose > 0)?);
        return Ok(());
    }

    println!("standard library packages ({})\n", std_deps.len());
    for (prefix, subpackages) in group_by_prefix(&std_deps) {
        println!("{prefix}");
        for sub in subpackages {
            println!("  \u{251c}\u{2500} {sub}");
        }
    }
    println!("\ntotal: {} standard library packages", std_deps.len());
    Ok(())
}

/// Groups package paths by their first path element, in sorted order.
///
/// `net/http` and `net/url` group under `net`; single-element packages
/// like `fmt` group alone with no subpackage lines.
fn group_by_prefix<'a>(deps: &[&'a Dependency]) -> BTreeMap<&'a str, Vec<&'a str>> {
    let mut groups: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for dep in deps {
        match dep.path.split_once('/') {
            Some((prefix, rest)) => groups.entry(prefix).or_default().push(rest),
            None => {
                groups.entry(&dep.path).or_default();
            }
        }
    }
    groups
}
