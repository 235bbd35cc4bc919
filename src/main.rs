//! Crawl-Ledger main entry point
//!
//! This is the command-line interface for the crawl frontier and page-state store.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use crawl_ledger::config::{load_config_with_hash, validate, Config};
use crawl_ledger::output::{load_statistics, print_page, print_page_table, print_statistics};
use crawl_ledger::Coordinator;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Crawl-Ledger: crawl frontier and page-state store
///
/// Keeps a durable record of every page of a site: when it was found, whether
/// its last fetch worked, who links to it, which sitemaps list it and what
/// robots.txt says about indexing it.
#[derive(Parser, Debug)]
#[command(name = "crawl-ledger")]
#[command(version)]
#[command(about = "Crawl frontier and page-state store", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (defaults apply when omitted)
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl a site until no page under it is due
    Crawl {
        base_url: String,

        /// Re-crawl window in days; 0 re-crawls anything not crawled today
        #[arg(long)]
        staleness_days: Option<u32>,
    },

    /// Re-crawl every page of a site not crawled today
    Recrawl { base_url: String },

    /// Crawl a single URL now
    RecrawlUrl { url: String },

    /// Re-evaluate robots index/follow flags for a site
    ResolveRobots { base_url: String },

    /// Show the stored record of one URL
    Show { url: String },

    /// List every stored page of a site
    Pages { base_url: String },

    /// Show page statistics for a site
    Stats { base_url: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = load(cli.config.as_ref())?;
    let mut coordinator = Coordinator::open(&config).with_context(|| {
        format!("failed to open page store {}", config.store.database_path)
    })?;

    match cli.command {
        Command::Crawl {
            base_url,
            staleness_days,
        } => {
            let days = staleness_days.unwrap_or(config.crawl.staleness_days);
            let report = coordinator.crawl(&base_url, days).await?;
            println!("{}", report);
        }
        Command::Recrawl { base_url } => {
            let report = coordinator.recrawl(&base_url).await?;
            println!("{}", report);
        }
        Command::RecrawlUrl { url } => {
            let report = coordinator.recrawl_single(&url).await?;
            println!("{}", report);
        }
        Command::ResolveRobots { base_url } => {
            let resolved = coordinator.resolve_indexability(&base_url).await?;
            println!("Robots flags evaluated for {} pages", resolved);
        }
        Command::Show { url } => match coordinator.get_page(&url)? {
            Some(page) => print_page(&page),
            None => bail!("{} is not in the page store", url),
        },
        Command::Pages { base_url } => {
            let pages = coordinator.get_domain_pages(&base_url)?;
            print_page_table(&pages);
        }
        Command::Stats { base_url } => {
            let filter = crawl_ledger::normalize_url(&base_url)?;
            let stats = load_statistics(coordinator.store(), &filter)?;
            print_statistics(&stats);
        }
    }

    Ok(())
}

/// Loads the configuration file, or the defaults when none is given
fn load(path: Option<&PathBuf>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        tracing::info!("No configuration file given, using defaults");
        let config = Config::default();
        validate(&config)?;
        return Ok(config);
    };

    tracing::info!("Loading configuration from: {}", path.display());
    let (config, hash) = load_config_with_hash(path)
        .with_context(|| format!("failed to load configuration {}", path.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);
    Ok(config)
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("crawl_ledger=info,warn"),
            1 => EnvFilter::new("crawl_ledger=debug,info"),
            2 => EnvFilter::new("crawl_ledger=trace,debug"),
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
