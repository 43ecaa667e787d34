//! quiesce - debounced file change notifications

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod cmd;
mod output;

/// quiesce - Watch files and report changes once things settle down
#[derive(Parser)]
#[command(name = "quiesce")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch paths and print merged changes until Ctrl-C
    Watch(cmd::watch::WatchArgs),
    /// Validate a config file and list its targets
    Check {
        /// Config file to validate
        #[arg(short, long)]
        config: std::path::PathBuf,
        /// Print the parsed config as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print an example config file
    Example,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout stays a clean change stream
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Watch(args) => cmd::watch::run(args).await,
        Commands::Check { config, json } => cmd::check::run(&config, json),
        Commands::Example => cmd::example::run(),
    }
}
