//! cargo-importgraph CLI - Import Graph Analysis
//!
//! Builds the import graph of a Rust crate, writes the result as JSON and
//! prints text views of it.
//!
//! Usage:
//!   cargo importgraph analyze [OPTIONS] [PATH]
//!   cargo importgraph show <VIEW> [--data FILE]

use std::io::{BufWriter, Write, stdout};
use std::path::PathBuf;
use std::process;
use std::time::Instant;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use cargo_importgraph::{
    AnalysisData, AnalysisOptions, DepthMode, analyze_project, generate_summary, write_cycles,
    write_files, write_tests,
};

/// cargo-importgraph - Follow the imports, measure the files
#[derive(Parser, Debug)]
#[command(name = "cargo")]
#[command(bin_name = "cargo")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Import graph analysis of a Rust crate
    #[command(subcommand)]
    Importgraph(Importgraph),
}

#[derive(Subcommand, Debug)]
enum Importgraph {
    /// Analyze a crate and write the result as JSON
    Analyze(AnalyzeArgs),
    /// Print a view of a previous result
    Show(ShowArgs),
}

#[derive(Parser, Debug)]
struct AnalyzeArgs {
    /// Package directory or entry file
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Entry file (default: the package's library or first binary target)
    #[arg(long)]
    entry: Option<PathBuf>,

    /// Path to Cargo.toml
    #[arg(long)]
    manifest_path: Option<PathBuf>,

    /// Coverage report (istanbul coverage-summary.json or llvm-cov export)
    #[arg(long)]
    coverage: Option<PathBuf>,

    /// Skip git history
    #[arg(long)]
    no_git: bool,

    /// Only count commits from the last N months
    #[arg(long, value_name = "N")]
    git_months: Option<usize>,

    /// Output file for the JSON result
    #[arg(short, long, default_value = "importgraph.json")]
    output: PathBuf,

    /// Config file path (default: search for .importgraph.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Drop #[cfg(test)] items before analysis
    #[arg(long)]
    exclude_tests: bool,

    /// Score nested constructs one level deeper
    #[arg(long)]
    nested_depth: bool,

    /// Number of threads for parallel processing (default: all CPU cores)
    #[arg(long, short = 'j', value_name = "N")]
    jobs: Option<usize>,

    /// Process files one at a time in discovery order
    #[arg(long)]
    sequential: bool,

    /// Print the summary view after writing the result
    #[arg(short, long)]
    summary: bool,

    /// List source files never reached from the entry
    #[arg(long)]
    unreached: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Show timing information
    #[arg(long)]
    timing: bool,
}

#[derive(Parser, Debug)]
struct ShowArgs {
    /// What to print
    #[arg(value_enum)]
    view: View,

    /// Result file written by `analyze`
    #[arg(long, default_value = "importgraph.json")]
    data: PathBuf,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum View {
    Summary,
    Files,
    Cycles,
    Tests,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let Commands::Importgraph(command) = Cli::parse().command;

    match command {
        Importgraph::Analyze(args) => analyze(args),
        Importgraph::Show(args) => {
            init_tracing(false);
            let data = AnalysisData::load(&args.data)?;
            print_view(&data, args.view)
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn analyze(args: AnalyzeArgs) -> Result<(), Box<dyn std::error::Error>> {
    init_tracing(args.verbose);

    let available_cores = std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(1);

    if let Some(jobs) = args.jobs
        && let Err(e) = rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build_global()
    {
        warn!("Could not set thread count: {}", e);
    }

    if args.timing {
        info!(
            "Using {} thread(s) ({} CPU cores available)",
            args.jobs.unwrap_or(available_cores),
            available_cores
        );
    }

    let options = AnalysisOptions {
        entry: args.entry,
        manifest_path: args.manifest_path,
        config_path: args.config,
        coverage: args.coverage,
        no_history: args.no_git,
        history_months: args.git_months,
        exclude_tests: args.exclude_tests,
        depth_mode: args.nested_depth.then_some(DepthMode::Nested),
        sequential: args.sequential,
        list_unreached: args.unreached,
    };

    eprintln!("Analyzing project at '{}'...", args.path.display());
    let start = Instant::now();
    let data = analyze_project(&args.path, &options)?;
    let elapsed = start.elapsed();

    if args.timing {
        eprintln!(
            "Analysis complete: {} files, {} cycle(s) (took {:.2?}, {:.1} files/sec)",
            data.file_count(),
            data.cycle_count(),
            elapsed,
            data.file_count() as f64 / elapsed.as_secs_f64()
        );
    } else {
        eprintln!(
            "Analysis complete: {} files, {} cycle(s)",
            data.file_count(),
            data.cycle_count()
        );
    }
    if !data.warnings.is_empty() {
        eprintln!("{} warning(s); see the warnings list in the result", data.warnings.len());
    }

    data.save(&args.output)?;
    eprintln!("Result written to: {}", args.output.display());

    if args.summary {
        eprintln!();
        print_view(&data, View::Summary)?;
    }

    Ok(())
}

fn print_view(data: &AnalysisData, view: View) -> Result<(), Box<dyn std::error::Error>> {
    let mut writer = BufWriter::new(stdout());
    match view {
        View::Summary => generate_summary(data, &mut writer)?,
        View::Files => write_files(data, &mut writer)?,
        View::Cycles => write_cycles(data, &mut writer)?,
        View::Tests => write_tests(data, &mut writer)?,
    }
    writer.flush()?;
    Ok(())
}
