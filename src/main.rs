//! Selector-Scout main entry point
//!
//! This is the command-line interface for the Selector-Scout element crawler.

use anyhow::{bail, Context};
use clap::Parser;
use selector_scout::auth::load_auth_flow;
use selector_scout::config::{load_config_with_hash, CrawlConfig};
use selector_scout::crawler::{CrawlJob, CrawlOrchestrator};
use selector_scout::driver::{Driver, HttpDriver};
use selector_scout::output::{
    format_validation_result, load_statistics, print_statistics, write_reports,
};
use selector_scout::quality::CrossPageValidator;
use selector_scout::storage::{open_store, ElementStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Selector-Scout: durable selector discovery
///
/// Selector-Scout crawls pages, optionally behind a login flow, extracts
/// interactive elements and scores their selectors for durability.
#[derive(Parser, Debug)]
#[command(name = "selector-scout")]
#[command(version)]
#[command(about = "Discovers and scores durable element selectors", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// URL to crawl (repeatable)
    #[arg(long = "url", value_name = "URL")]
    urls: Vec<String>,

    /// File with one URL per line; blank lines and # comments are skipped
    #[arg(long, value_name = "PATH")]
    urls_file: Option<PathBuf>,

    /// Auth flow TOML to log in with before crawling
    #[arg(long, value_name = "PATH")]
    auth_flow: Option<PathBuf>,

    /// Project to store discovered elements under
    #[arg(long, value_name = "ID")]
    project: Option<String>,

    /// Scope within the project
    #[arg(long, value_name = "ID", requires = "project")]
    scope: Option<String>,

    /// Check one selector across the URLs instead of crawling
    #[arg(long, value_name = "SELECTOR", conflicts_with_all = ["dry_run", "stats"])]
    validate: Option<String>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show element statistics from the database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.stats {
        return handle_stats(&config, cli.project.as_deref());
    }

    let urls = collect_urls(&cli.urls, cli.urls_file.as_deref())?;

    if cli.dry_run {
        handle_dry_run(&config, &urls, cli.auth_flow.as_deref())
    } else if let Some(selector) = &cli.validate {
        handle_validate(&config, selector, &urls).await
    } else {
        handle_crawl(&config, &config_hash, &cli, urls).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("selector_scout=info,warn"),
            1 => EnvFilter::new("selector_scout=debug,info"),
            2 => EnvFilter::new("selector_scout=trace,debug"),
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

/// Merges `--url` values with the lines of `--urls-file`
fn collect_urls(urls: &[String], urls_file: Option<&Path>) -> anyhow::Result<Vec<String>> {
    let mut all: Vec<String> = urls.to_vec();

    if let Some(path) = urls_file {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read URL file {}", path.display()))?;
        all.extend(
            content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#'))
                .map(String::from),
        );
    }

    if all.is_empty() {
        bail!("No URLs given; pass --url or --urls-file");
    }
    Ok(all)
}

/// Handles the --dry-run mode: validates inputs and shows what would run
fn handle_dry_run(
    config: &CrawlConfig,
    urls: &[String],
    auth_flow: Option<&Path>,
) -> anyhow::Result<()> {
    println!("=== Selector-Scout Dry Run ===\n");

    println!("Browser:");
    println!("  Headless: {}", config.browser.headless);
    println!("  Args: {}", config.browser.args.join(" "));
    println!("  Navigation timeout: {}ms", config.browser.navigation_timeout_ms);
    println!("  Step timeout: {}ms", config.browser.step_timeout_ms);

    println!("\nRetry:");
    println!("  Max retries: {}", config.retry.max_retries);
    println!("  Delays: {:?}ms", config.retry.retry_delays_ms);
    let retryable: Vec<&str> = config.retry.retryable.iter().map(|k| k.category()).collect();
    println!("  Retryable: {}", retryable.join(", "));

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);
    println!("  Report: {}", config.output.report_path);
    if let Some(json) = &config.output.json_path {
        println!("  JSON: {}", json);
    }

    if let Some(path) = auth_flow {
        let flow = load_auth_flow(path)
            .with_context(|| format!("Invalid auth flow {}", path.display()))?;
        println!("\nAuth Flow '{}' ({} steps):", flow.id, flow.steps.len());
        println!("  Login URL: {}", flow.login_url);
        for (index, step) in flow.steps.iter().enumerate() {
            let marker = if step.optional { " (optional)" } else { "" };
            println!("  - {}{}", step.describe(index), marker);
        }
    }

    println!("\nURLs ({}):", urls.len());
    for url in urls {
        println!("  - {}", url);
    }

    println!("\n✓ Configuration is valid");
    println!("✓ Would crawl {} URLs", urls.len());

    Ok(())
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &CrawlConfig, project: Option<&str>) -> anyhow::Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let store = open_store(Path::new(&config.output.database_path))?;
    let stats = load_statistics(&store, project)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --validate mode: checks one selector across the URLs
async fn handle_validate(config: &CrawlConfig, selector: &str, urls: &[String]) -> anyhow::Result<()> {
    let driver: Arc<dyn Driver> = Arc::new(HttpDriver::new());
    let validator = CrossPageValidator::new(driver, config);

    let result = validator
        .validate_across_pages(selector, urls)
        .await
        .with_context(|| format!("Validation of {} failed", selector))?;

    println!("{}", format_validation_result(&result));
    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(
    config: &CrawlConfig,
    config_hash: &str,
    cli: &Cli,
    urls: Vec<String>,
) -> anyhow::Result<()> {
    let mut job = CrawlJob::new(urls);
    if let Some(path) = &cli.auth_flow {
        let flow = load_auth_flow(path)
            .with_context(|| format!("Invalid auth flow {}", path.display()))?;
        job = job.with_auth_flow(flow);
    }
    if let Some(project) = &cli.project {
        job = job.with_project(project.clone(), cli.scope.clone());
    }

    tracing::info!("Starting job {} with {} URLs", job.id, job.urls.len());

    let store = Arc::new(open_store(Path::new(&config.output.database_path))?);
    let driver: Arc<dyn Driver> = Arc::new(HttpDriver::new());
    let orchestrator =
        CrawlOrchestrator::new(driver, config).with_store(store.clone() as Arc<dyn ElementStore>);

    let report = orchestrator.run(&job).await;

    write_reports(&report, &config.output)?;
    if let Err(e) = store.record_run(&report, job.project_id.as_deref(), config_hash) {
        tracing::warn!("Failed to record run: {}", e);
    }

    println!(
        "Crawled {}/{} URLs, {} elements ({} rejected selectors)",
        report.successful_urls,
        report.total_urls,
        report.elements.len(),
        report.rejected_selectors.values().sum::<usize>()
    );

    if let Some(detail) = &report.job_error {
        bail!("{}: {}", detail.category, detail.message);
    }
    Ok(())
}
