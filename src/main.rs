//! Bid-Scout main entry point
//!
//! This is the command-line interface for the Bid-Scout procurement crawler.

use anyhow::Context;
use bid_scout::config::{load_config, load_from_env, validate, Config, StrategyKind};
use bid_scout::crawler::Crawler;
use bid_scout::output::{log_statistics, print_matches, write_artifacts, RunStatistics};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// Bid-Scout: finds requests for proposals on institutional websites
///
/// Bid-Scout crawls each seed site breadth-first within a depth and page
/// budget, asks a language model whether each page advertises an RFP, and
/// writes the results as JSON documents.
#[derive(Parser, Debug)]
#[command(name = "bid-scout")]
#[command(version = "1.0.0")]
#[command(about = "Procurement opportunity crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (defaults plus environment when omitted)
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long)]
    dry_run: bool,

    /// Fetch pages with a headless browser
    #[arg(long)]
    rendered: bool,

    /// Seed URL to crawl; repeat for several (replaces configured seeds)
    #[arg(long = "seed", value_name = "URL")]
    seeds: Vec<String>,

    /// Directory for the result documents
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = resolve_config(&cli)?;

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    handle_crawl(config, cli.quiet).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("bid_scout=info,warn"),
            1 => EnvFilter::new("bid_scout=debug,info"),
            2 => EnvFilter::new("bid_scout=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Loads the configuration and applies command-line overrides
fn resolve_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            load_config(path)
                .with_context(|| format!("failed to load configuration from {}", path.display()))?
        }
        None => {
            tracing::info!("No configuration file given, using defaults and environment");
            load_from_env().context("failed to load configuration from environment")?
        }
    };

    if cli.rendered {
        config.crawler.strategy = StrategyKind::Rendered;
    }
    if !cli.seeds.is_empty() {
        config.seeds = cli.seeds.clone();
    }
    if let Some(dir) = &cli.output_dir {
        config.output.directory = dir.display().to_string();
    }

    validate(&config).context("invalid configuration")?;
    Ok(config)
}

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(config: &Config) {
    println!("=== Bid-Scout Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Max depth: {}", config.crawler.max_depth);
    println!("  Max pages per seed: {}", config.crawler.max_pages);
    println!("  Request delay: {}ms", config.crawler.request_delay_ms);
    println!("  Concurrency: {}", config.crawler.concurrency);
    println!("  Strategy: {:?}", config.crawler.strategy);
    println!("  Min text length: {}", config.crawler.min_text_length);
    println!("  Max links per page: {}", config.crawler.max_links_per_page);
    println!("  Run timeout: {}s", config.crawler.run_timeout_secs);
    println!(
        "  Priority paths: {}",
        config.crawler.priority_paths.join(", ")
    );

    println!("\nClassifier:");
    println!("  Endpoint: {}", config.classifier.endpoint);
    println!("  Model: {}", config.classifier.model);
    println!("  API key variable: {}", config.classifier.api_key_env);

    println!("\nOutput:");
    println!("  Directory: {}", config.output.directory);

    println!("\nSeeds ({}):", config.seeds.len());
    for seed in &config.seeds {
        println!("  - {}", seed);
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, quiet: bool) -> anyhow::Result<()> {
    tracing::info!(
        "Starting crawl of {} seed(s) with {:?} strategy",
        config.seeds.len(),
        config.crawler.strategy
    );

    let started = Instant::now();
    let crawler = Crawler::from_config(&config).await?;

    let cancel = crawler.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing with the pages collected so far");
            cancel.cancel();
        }
    });

    let result = crawler.crawl_all(&config.seeds).await;
    crawler.shutdown().await;
    let result = result?;

    let paths = write_artifacts(&result, Path::new(&config.output.directory))
        .context("failed to write result documents")?;
    tracing::info!("Dashboard summary written to {}", paths.dashboard.display());

    log_statistics(&RunStatistics::from_result(&result), started.elapsed());
    if !quiet {
        print_matches(&result);
    }

    Ok(())
}
