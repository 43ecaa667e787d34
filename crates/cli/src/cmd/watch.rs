//! Watch paths and print merged changes

use crate::output;
use anyhow::{bail, Context, Result};
use clap::Args;
use owo_colors::OwoColorize;
use quiesce_core::{ChangeEvent, EngineConfig, ProviderError, WatchConfig, WatchTarget};
use quiesce_watcher::{ChangeHandler, NotifyProvider, WatchLifecycle};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Args, Debug, Default)]
pub struct WatchArgs {
    /// Files or directories to watch, in addition to config targets
    pub paths: Vec<PathBuf>,

    /// Config file with engine settings and targets
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Quiet window in milliseconds (overrides the config)
    #[arg(long, allow_hyphen_values = true)]
    pub quiet_ms: Option<i64>,

    /// Report create-then-modify as modified instead of added
    #[arg(long)]
    pub no_prefer_added: bool,

    /// Watch directory PATHs recursively
    #[arg(short, long)]
    pub recursive: bool,

    /// Print one JSON object per change
    #[arg(long)]
    pub json: bool,
}

pub async fn run(args: WatchArgs) -> Result<()> {
    let (config, targets) = resolve(&args)?;

    let printer = ChangePrinter { json: args.json };
    let lifecycle = WatchLifecycle::new(NotifyProvider::new(), config, printer)
        .context("Failed to set up change delivery")?;

    let report = lifecycle.start(&targets).context("Failed to start watching")?;

    for failure in &report.failures {
        eprintln!("{} {}", "Cannot watch:".red().bold(), failure.error);
    }
    if report.registered.is_empty() {
        lifecycle.stop();
        bail!("None of the {} targets could be watched", targets.len());
    }

    eprintln!(
        "{} {} target(s), quiet window {}ms {}",
        "Watching".green().bold(),
        report.registered.len(),
        config.quiet_window.as_millis(),
        "(Ctrl-C to stop)".dimmed()
    );

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;

    let stop = lifecycle.stop();
    let stats = lifecycle.diagnostics().engine;
    eprintln!(
        "{} {} changes delivered, {} merged away, {} pending dropped",
        "Stopped:".yellow().bold(),
        stats.events_delivered,
        stats.events_coalesced,
        stop.discarded
    );

    Ok(())
}

/// Engine settings and targets from the config file, paths and flags
fn resolve(args: &WatchArgs) -> Result<(EngineConfig, Vec<WatchTarget>)> {
    let file = match &args.config {
        Some(path) => WatchConfig::load(path)
            .with_context(|| format!("Invalid config {}", path.display()))?,
        None => WatchConfig::default(),
    };

    let mut config = file.engine_config()?;
    if let Some(quiet_ms) = args.quiet_ms {
        config
            .set_quiet_window_ms(quiet_ms)
            .context("Invalid --quiet-ms")?;
    }
    if args.no_prefer_added {
        config.prefer_added_on_create_modify = false;
    }

    let mut targets = file.targets;
    targets.extend(args.paths.iter().map(|path| target_for(path, args.recursive)));

    if targets.is_empty() {
        bail!("Nothing to watch: pass one or more PATHs or --config");
    }

    debug!("Resolved {} targets", targets.len());
    Ok((config, targets))
}

/// Existing regular files become file targets; everything else a directory
///
/// Missing paths are left to the provider so they show up as start failures.
fn target_for(path: &Path, recursive: bool) -> WatchTarget {
    if path.is_file() {
        WatchTarget::file(path)
    } else {
        WatchTarget::directory(path, recursive)
    }
}

/// Prints delivered changes to stdout
struct ChangePrinter {
    json: bool,
}

impl ChangeHandler for ChangePrinter {
    fn on_change(&mut self, event: ChangeEvent) {
        let line = if self.json {
            match serde_json::to_string(&event) {
                Ok(line) => line,
                Err(e) => {
                    debug!("Cannot encode {}: {}", event, e);
                    return;
                }
            }
        } else {
            output::change_line(&event)
        };

        let mut stdout = std::io::stdout().lock();
        let _ = writeln!(stdout, "{}", line);
        let _ = stdout.flush();
    }

    fn on_provider_error(&mut self, error: ProviderError) {
        eprintln!("{} {}", "Watch error:".yellow().bold(), error);
    }
}
