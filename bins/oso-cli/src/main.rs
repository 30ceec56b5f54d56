//! oso-cli — score onchain builders and allocate a funding budget.
//!
//! `score` writes the wide results table, `allocate` turns a scores CSV
//! into amounts, and `run` does both from one config.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use oso_allocator::{AllocationSummary, ConstrainedAllocator};
use oso_core::config::ModelConfig;
use oso_core::traits::{BudgetAllocator, MetricSource};
use oso_core::types::Allocation;
use oso_io::config::validate_paths;
use oso_io::{CsvSnapshot, load_model_config, read_scores, write_allocations, write_results};
use oso_scoring::ScoringEngine;
use tracing::{info, warn};

const DEFAULT_CONFIG: &str = "weights/onchain_builders_testing.yaml";

/// Onchain builders impact scoring and budget allocation.
#[derive(Parser)]
#[command(name = "oso-cli")]
#[command(version, about = "Score projects from metric snapshots and allocate a budget")]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Log output format ("text" or "json")
    #[arg(long, global = true, default_value = "text")]
    log_format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score every project and write the results table.
    Score(ScoreArgs),
    /// Allocate the budget from a scores CSV.
    Allocate(AllocateArgs),
    /// Score, then allocate.
    Run(RunArgs),
}

#[derive(Args)]
struct ConfigArg {
    /// Model configuration YAML.
    #[arg(short, long, default_value = DEFAULT_CONFIG)]
    config: PathBuf,
}

#[derive(Args)]
struct ScoreArgs {
    #[command(flatten)]
    config: ConfigArg,

    /// Results CSV (default: <data_dir>/onchain_builders_testing_results.csv).
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct AllocateArgs {
    #[command(flatten)]
    config: ConfigArg,

    /// CSV with `project_id` and `weighted_score` columns.
    #[arg(short, long)]
    scores: PathBuf,

    /// Allocations CSV (default: <data_dir>/onchain_builders_allocations.csv).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Fail if the budget cannot be matched within tolerance.
    #[arg(long)]
    strict: bool,

    /// Print the allocation summary as JSON on stdout.
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct RunArgs {
    #[command(flatten)]
    config: ConfigArg,

    #[arg(long)]
    scores_output: Option<PathBuf>,

    #[arg(long)]
    allocations_output: Option<PathBuf>,

    /// Fail if the budget cannot be matched within tolerance.
    #[arg(long)]
    strict: bool,

    /// Print the allocation summary as JSON on stdout.
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level, &cli.log_format);

    match cli.command {
        Commands::Score(args) => cmd_score(args),
        Commands::Allocate(args) => cmd_allocate(args),
        Commands::Run(args) => cmd_run(args),
    }
}

fn load(path: &Path) -> Result<ModelConfig> {
    let model = load_model_config(path)
        .with_context(|| format!("Failed to load config: {}", path.display()))?;
    info!(config = %path.display(), "oso-cli v{}", env!("CARGO_PKG_VERSION"));
    Ok(model)
}

/// Run the scoring pipeline and write its results. Returns score shares by project id.
fn score(model: &ModelConfig, output: Option<PathBuf>) -> Result<BTreeMap<String, f64>> {
    validate_paths(model).context("Snapshot files missing")?;
    let source = CsvSnapshot::from_config(&model.data_snapshot);
    let observations = source
        .load_observations()
        .context("Failed to load metric snapshot")?;
    if observations.is_empty() {
        warn!("snapshot contains no usable observations");
    }

    let engine = ScoringEngine::new(model.simulation.clone());
    let analysis = engine
        .run_analysis(&observations)
        .context("Scoring failed")?;

    let path = output.unwrap_or_else(|| model.data_snapshot.results_path());
    write_results(&path, &analysis.final_results)
        .with_context(|| format!("Failed to write results: {}", path.display()))?;

    println!("Scored {} projects", analysis.final_results.len());
    for row in analysis.final_results.rows.iter().take(10) {
        println!(
            "  {:<40} {:.6}",
            row.project.display_name, row.weighted_score
        );
    }
    println!("Results written to: {}", path.display());

    Ok(analysis.final_results.shares_by_id())
}

fn allocate(
    model: &ModelConfig,
    scores: &BTreeMap<String, f64>,
    output: Option<PathBuf>,
    strict: bool,
    json: bool,
) -> Result<Allocation> {
    let mut config = model.allocation()?.clone();
    config.strict |= strict;

    let allocator = ConstrainedAllocator::new(config.clone()).context("Invalid allocation config")?;
    let allocation = allocator.allocate(scores).context("Allocation failed")?;

    let path = output.unwrap_or_else(|| model.data_snapshot.allocations_path());
    write_allocations(&path, &allocation)
        .with_context(|| format!("Failed to write allocations: {}", path.display()))?;

    let summary = AllocationSummary::from_allocation(&allocation, &config);
    summary.log();
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!(
            "Allocated {:.2} of {:.2} across {} projects ({} funded, {} below minimum)",
            summary.total, summary.budget, summary.projects, summary.funded, summary.below_min
        );
        if !summary.converged {
            println!("WARNING: allocation did not converge to the budget");
        }
        println!("Allocations written to: {}", path.display());
    }
    Ok(allocation)
}

fn cmd_score(args: ScoreArgs) -> Result<()> {
    let model = load(&args.config.config)?;
    score(&model, args.output)?;
    Ok(())
}

fn cmd_allocate(args: AllocateArgs) -> Result<()> {
    let model = load(&args.config.config)?;
    let scores = read_scores(&args.scores)
        .with_context(|| format!("Failed to read scores: {}", args.scores.display()))?;
    if scores.is_empty() {
        bail!("No scores found in {}", args.scores.display());
    }
    allocate(&model, &scores, args.output, args.strict, args.json)?;
    Ok(())
}

fn cmd_run(args: RunArgs) -> Result<()> {
    let model = load(&args.config.config)?;
    // Fail on a missing allocation section before doing any scoring work.
    model.allocation()?;
    let scores = score(&model, args.scores_output)?;
    allocate(&model, &scores, args.allocations_output, args.strict, args.json)?;
    Ok(())
}

/// Initialize tracing subscriber with the given log level and output format.
///
/// `RUST_LOG` takes precedence over `--log-level`. Pass `format = "json"`
/// for structured JSON output; any other value is human-readable text.
fn init_logging(level_str: &str, format: &str) {
    use tracing_subscriber::filter::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_str));

    // Logs go to stderr so `--json` output on stdout stays parseable.
    if format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}
