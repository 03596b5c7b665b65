//! POI-Harvest main entry point
//!
//! This is the command-line interface for the POI-Harvest listing crawler.

use anyhow::Context;
use clap::Parser;
use poi_harvest::config::{load_config_with_hash, validate, Config};
use poi_harvest::crawler::run_crawl;
use poi_harvest::output::print_statistics;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// POI-Harvest: a proxy-rotating point-of-interest harvester
///
/// POI-Harvest walks a paginated listing site through a pool of rotating
/// proxies, fetches every marked detail page, and writes the extracted
/// records as a JSON array (and optionally into SQLite).
#[derive(Parser, Debug)]
#[command(name = "poi-harvest")]
#[command(version)]
#[command(about = "A proxy-rotating point-of-interest harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long)]
    dry_run: bool,

    /// Override the area queried on the listing pages
    #[arg(long, value_name = "NAME")]
    area: Option<String>,

    /// Override the first listing page
    #[arg(long, value_name = "N")]
    start_page: Option<u32>,

    /// Override the last listing page
    #[arg(long, value_name = "N")]
    end_page: Option<u32>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    apply_overrides(&mut config, &cli).context("invalid command-line override")?;

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    let stats = run_crawl(&config).await.context("crawl failed")?;
    if !cli.quiet {
        print_statistics(&stats);
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("poi_harvest=info,warn"),
            1 => EnvFilter::new("poi_harvest=debug,info"),
            2 => EnvFilter::new("poi_harvest=trace,debug"),
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

/// Applies CLI overrides on top of the file configuration and re-validates
fn apply_overrides(config: &mut Config, cli: &Cli) -> anyhow::Result<()> {
    if let Some(area) = &cli.area {
        config.site.area_name = area.clone();
    }
    if let Some(start_page) = cli.start_page {
        config.site.start_page = start_page;
    }
    if let Some(end_page) = cli.end_page {
        config.site.end_page = end_page;
    }

    validate(config)?;
    Ok(())
}

/// Handles the --dry-run mode: shows what would be crawled
fn handle_dry_run(config: &Config) {
    println!("=== POI-Harvest Dry Run ===\n");

    println!("Site:");
    println!("  Listing URL: {}", config.site.listing_url);
    println!("  Location API: {}", config.site.location_api);
    println!("  Area: {}", config.site.area_name);
    println!(
        "  Pages: {}..={} ({} items per page)",
        config.site.start_page, config.site.end_page, config.site.items_per_page
    );
    println!("  Link marker: {}", config.site.link_marker);

    println!("\nFetch:");
    println!(
        "  Timeouts: {}s connect, {}s read",
        config.fetch.connect_timeout_secs, config.fetch.read_timeout_secs
    );
    println!("  Max attempts per request: {}", config.fetch.max_attempts);
    println!(
        "  Proxy cost: {} per use, {} per failure",
        config.fetch.use_cost, config.fetch.punish
    );
    match config.fetch.max_validation_retries {
        Some(limit) => println!("  Validation retries: {}", limit),
        None => println!("  Validation retries: unbounded"),
    }
    println!("  User agents: {}", config.fetch.user_agents.len());

    println!("\nProxy pool:");
    println!("  Provisioning API: {}", config.proxy.api_url);
    println!(
        "  Size: {} ({} credits each, region {})",
        config.proxy.pool_size, config.proxy.max_credits, config.proxy.region
    );

    println!("\nCrawl:");
    println!("  Failure threshold: {}", config.crawl.failure_threshold);
    println!("  Geocode attempts: {}", config.crawl.geocode_max_attempts);
    println!("  Flush on abort: {}", config.crawl.flush_on_abort);

    println!("\nOutput:");
    println!("  JSON: {}", config.output.json_path);
    if let Some(database_path) = &config.output.database_path {
        println!("  Database: {}", database_path);
    }

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would crawl {} listing pages",
        config.site.end_page - config.site.start_page + 1
    );
}
