mod cli {
    pub(crate) mod align;
    pub(crate) mod fetch;
    pub(crate) mod interfaces;
}

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use interfacemap::{load_settings, PipelineContext, Settings};
use std::path::PathBuf;
use tracing::{debug, trace};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// TOML settings file; built-in defaults are used for anything it leaves out
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory of cached structure files, overriding the settings file
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    /// Verbosity of the program:
    /// -v for info, -vv for debug, and -vvv for trace
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Retrieve structures into the cache and print their chain sequences
    Fetch(cli::fetch::Args),
    /// Locally align two protein sequences
    Align(cli::align::Args),
    /// Compute interface residues between two groups of chains
    Interfaces(cli::interfaces::Args),
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .init();
}

fn settings(cli: &Cli) -> Result<Settings> {
    let mut settings = match &cli.config {
        Some(path) => load_settings(path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?,
        None => Settings::default(),
    };
    if let Some(dir) = &cli.cache_dir {
        settings.cache.directory = dir.clone();
    }
    debug!("Caching structures in {}", settings.cache.directory.display());
    Ok(settings)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    trace!("{cli:?}");

    match &cli.command {
        Commands::Align(args) => cli::align::run(args),
        Commands::Fetch(args) => {
            let ctx = PipelineContext::new(settings(&cli)?)?;
            let result = cli::fetch::run(args, &ctx);
            ctx.shutdown();
            result
        }
        Commands::Interfaces(args) => {
            let ctx = PipelineContext::new(settings(&cli)?)?;
            let result = cli::interfaces::run(args, &ctx);
            ctx.shutdown();
            result
        }
    }
}
