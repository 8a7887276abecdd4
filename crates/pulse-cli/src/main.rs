mod cmd;
mod output;
mod setup;

use clap::{Parser, Subcommand};
use cmd::{activity::ActivityArgs, cache::CacheSubcommand, config::ConfigSubcommand};
use pulse_core::PulseError;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "pulse",
    about = "Recent activity across a project-tracking workspace and its source host",
    version,
    propagate_version = true
)]
struct Cli {
    /// Config file (default: ~/.pulse/config.yaml)
    #[arg(long, global = true, env = "PULSE_CONFIG")]
    config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    /// Log progress to stderr
    #[arg(long, global = true, short = 'v')]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show what changed in the workspace during a time window
    Activity(ActivityArgs),

    /// Inspect or validate the configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },

    /// Manage cached workspace lookups
    Cache {
        #[command(subcommand)]
        subcommand: CacheSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = cli.config.as_deref();

    let result = match cli.command {
        Commands::Activity(args) => cmd::activity::run(config, args, cli.json),
        Commands::Config { subcommand } => cmd::config::run(config, subcommand, cli.json),
        Commands::Cache { subcommand } => cmd::cache::run(config, subcommand, cli.json),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        let usage = e
            .chain()
            .any(|c| c.downcast_ref::<PulseError>().is_some_and(PulseError::is_usage));
        std::process::exit(if usage { 2 } else { 1 });
    }
}
