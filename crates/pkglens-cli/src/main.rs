//! # pkglens-cli
//!
//! Command line lookups of npm package metadata through the pkglens cache.
//!
//! This is the entry point for the `pkglens` binary. It parses arguments, sets
//! up logging, loads configuration and dispatches to the command handlers.
//! Results are printed to stdout as JSON; logs go to stderr.

use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use pkglens_core::{Error, ResourceKind, Result};
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::CommandContext;
use output::OutputHandler;

/// Cached npm package metadata lookups
#[derive(Debug, Parser)]
#[command(name = "pkglens", version, about = "Cached npm package metadata lookups")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (default: nearest pkglens.toml)
    #[arg(long, global = true, env = "PKGLENS_CONFIG", value_name = "PATH")]
    pub config: Option<Utf8PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Print cache statistics to stderr when done
    #[arg(long, global = true)]
    pub stats: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show the registry manifest of a package
    Manifest { name: String },
    /// Show the readme of a package
    Readme { name: String },
    /// Show last week's download count
    Downloads { name: String },
    /// Show the bundle size of the latest version
    BundleSize { name: String },
    /// Show the quality score
    Score { name: String },
    /// List published versions, newest first
    Versions { name: String },
    /// List known security advisories
    Advisories { name: String },
    /// Show GitHub stars for `owner/repo` or a package's repository
    Stars { target: String },
    /// Search the registry
    Search {
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },
    /// List the most popular packages
    Top {
        #[arg(short = 'n', long, default_value_t = 20)]
        limit: usize,
    },
    /// Pre-populate the cache
    Warm {
        /// Packages to warm (default: [warm].packages)
        packages: Vec<String>,
        /// Also warm the N most popular packages
        #[arg(long, value_name = "N")]
        top: Option<usize>,
        /// Packages warmed at once
        #[arg(long)]
        concurrency: Option<usize>,
        /// Refetch entries that are already cached
        #[arg(long)]
        refresh: bool,
    },
    /// Drop one cached entry
    Invalidate {
        /// Resource kind, e.g. manifest or bundle-size
        kind: ResourceKind,
        /// Identifying parameters, e.g. a package name
        #[arg(required = true, num_args = 1..)]
        params: Vec<String>,
    },
    /// Validate configuration and show the effective settings
    Check,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.log_json);
    debug!("Starting pkglens v{}", env!("CARGO_PKG_VERSION"));

    match run_cli(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            OutputHandler::new().error(&e);
            ExitCode::FAILURE
        },
    }
}

fn run_cli(cli: Cli) -> Result<()> {
    // Create Tokio runtime for async operations
    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| Error::io("Failed to create async runtime", e))?;

    rt.block_on(async {
        let ctx = CommandContext::new(cli.config.as_deref()).await?;
        let result = commands::dispatch_command(cli.command, &ctx).await;

        if cli.stats {
            ctx.output.stats(&ctx.lens.stats());
        }
        result
    })
}

fn setup_logging(verbose: bool, json: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "warn,pkglens={0},pkglens_core={0},pkglens_cache={0},pkglens_config={0},pkglens_registry={0}",
            default_level
        ))
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
