use clap::Parser;
use colored::Colorize;
use miette::{IntoDiagnostic, Result, WrapErr};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, warn};

use jvmshrink::cache::GraphStore;
use jvmshrink::config::{Config, KeepEntry, KeepKind};
use jvmshrink::discovery::FileFinder;
use jvmshrink::graph::ClassInput;
use jvmshrink::report::{ReportFormat, Reporter, ShrinkReport};
use jvmshrink::shrinker::{
    FullRunShrinker, IncrementalShrinker, KeepRulesMap, ShrinkerError, ShrinkerOutcome,
};

/// jvmshrink - Reachability-based shrinking for JVM class files
#[derive(Parser, Debug)]
#[command(name = "jvmshrink")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Project root; relative inputs and the default config are resolved against it
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Program inputs: class directories, jars or class files (can be specified multiple times)
    #[arg(short, long)]
    input: Vec<PathBuf>,

    /// Library inputs, never shrunk (can be specified multiple times)
    #[arg(short, long)]
    library: Vec<PathBuf>,

    /// Patterns to exclude (can be specified multiple times)
    #[arg(short, long)]
    exclude: Vec<String>,

    /// Keep a class, or a member as CLASS#name:descriptor (can be specified multiple times)
    #[arg(short, long, value_name = "SPEC")]
    keep: Vec<String>,

    /// Keep every class carrying this annotation type (can be specified multiple times)
    #[arg(long, value_name = "ANNOTATION")]
    keep_annotated: Vec<String>,

    /// Output format
    #[arg(short, long, value_enum)]
    format: Option<OutputFormat>,

    /// Output file (for json format)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Worker threads for loading and analysis (default: one per core)
    #[arg(long)]
    threads: Option<usize>,

    /// Abort on the first malformed class instead of skipping it
    #[arg(long)]
    fail_fast: bool,

    /// Reuse the graph stored by the previous run
    #[arg(long)]
    incremental: bool,

    /// Delete the stored graph before running
    #[arg(long)]
    clear_cache: bool,

    /// Custom graph store path (default: .jvmshrink-graph.json)
    #[arg(long, value_name = "FILE")]
    cache_path: Option<PathBuf>,

    /// Identity of the run; a store from another run is not reused
    #[arg(long)]
    run_id: Option<String>,

    /// Only list pruned classes, not pruned members of kept classes
    #[arg(long)]
    no_members: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Quiet mode - only output results
    #[arg(short, long)]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Debug, Default)]
enum OutputFormat {
    #[default]
    Terminal,
    Json,
}

impl OutputFormat {
    fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Terminal => "terminal",
            OutputFormat::Json => "json",
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.quiet);

    info!("jvmshrink v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&cli)?;
    run(&config, &cli)
}

fn init_logging(verbose: bool, quiet: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = if let Some(config_path) = &cli.config {
        Config::from_file(config_path)?
    } else {
        Config::from_default_locations(&cli.path)?
    };

    // Override with CLI arguments
    if !cli.input.is_empty() {
        config.inputs = cli.input.clone();
    }
    if !cli.library.is_empty() {
        config.libraries = cli.library.clone();
    }
    config.exclude.extend(cli.exclude.iter().cloned());
    config.keep.extend(cli.keep.iter().map(|spec| parse_keep_spec(spec)));
    config.keep_annotated.extend(cli.keep_annotated.iter().cloned());
    if let Some(format) = &cli.format {
        config.report.format = format.as_str().to_string();
    }
    if cli.no_members {
        config.report.show_members = false;
    }
    if cli.threads.is_some() {
        config.threads = cli.threads;
    }
    config.fail_fast |= cli.fail_fast;
    config.incremental.enabled |= cli.incremental;
    if cli.cache_path.is_some() {
        config.incremental.cache_path = cli.cache_path.clone();
    }
    if let Some(run_id) = &cli.run_id {
        config.incremental.run_id = run_id.clone();
    }

    Ok(config)
}

/// `test/Main` keeps a class; `test/Main#run:()V` keeps a member of it
fn parse_keep_spec(spec: &str) -> KeepEntry {
    match spec.split_once('#') {
        Some((class, member)) => KeepEntry {
            class: class.to_string(),
            members: vec![member.to_string()],
            kind: KeepKind::Structure,
        },
        None => KeepEntry {
            class: spec.to_string(),
            members: Vec::new(),
            kind: KeepKind::Structure,
        },
    }
}

fn run(config: &Config, cli: &Cli) -> Result<()> {
    let start_time = Instant::now();

    let format = ReportFormat::parse(&config.report.format)
        .ok_or_else(|| miette::miette!("Unknown report format: {}", config.report.format))?;

    if config.inputs.is_empty() {
        miette::bail!("No program inputs: pass --input or set `inputs` in the config file");
    }

    info!("Discovering class files...");
    let finder = FileFinder::new(config);
    let program = finder.find_classes(&cli.path, &config.inputs)?;
    let library = finder.find_classes(&cli.path, &config.libraries)?;
    info!(
        "Found {} program classes and {} library classes",
        program.len(),
        library.len()
    );

    if program.is_empty() {
        println!("{}", "No class files found.".yellow());
        return Ok(());
    }

    let rules = config.keep_rules::<String>();
    let outcome = if config.incremental.enabled {
        run_incremental(config, cli, &program, &library, &rules)?
    } else {
        FullRunShrinker::new(config.shrinker_options())
            .run(&program, &library, &rules)
            .into_diagnostic()?
    };

    Reporter::new(format, cli.output.clone())
        .with_members(config.report.show_members)
        .report(&ShrinkReport::from_outcome(&outcome))?;

    info!(
        "Shrinking completed in {:.2}s",
        start_time.elapsed().as_secs_f64()
    );
    Ok(())
}

/// Incremental run with fallback: a missing or unusable store gets a full
/// run whose graph becomes the new store.
fn run_incremental(
    config: &Config,
    cli: &Cli,
    program: &[ClassInput],
    library: &[ClassInput],
    rules: &KeepRulesMap<String>,
) -> Result<ShrinkerOutcome<String>> {
    let store_path = config
        .incremental
        .cache_path
        .clone()
        .unwrap_or_else(|| GraphStore::default_path(&cli.path));
    let store = GraphStore::new(store_path);

    if cli.clear_cache {
        store
            .clear()
            .into_diagnostic()
            .wrap_err("Failed to clear graph store")?;
        info!("Graph store cleared");
    }

    let has_store = store.exists();
    let shrinker = IncrementalShrinker::new(
        config.shrinker_options(),
        store,
        config.incremental.run_id.clone(),
    );

    if has_store {
        match shrinker.run(program, library, rules) {
            Ok(outcome) => return Ok(outcome),
            Err(ShrinkerError::InconsistentIncrementalState { reason }) => {
                warn!("{}; falling back to a full run", reason);
            }
            Err(e) => return Err(e).into_diagnostic(),
        }
    } else {
        info!("No graph store found, running a full analysis");
    }

    let outcome = FullRunShrinker::new(config.shrinker_options())
        .run(program, library, rules)
        .into_diagnostic()?;
    shrinker
        .record(&outcome.graph)
        .into_diagnostic()
        .wrap_err_with(|| format!("Failed to save graph store: {}", shrinker.store().path().display()))?;
    Ok(outcome)
}
