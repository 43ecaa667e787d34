//! Validate a config file
//!
//! Loads the file the same way `watch --config` does and lists what would be
//! registered, without touching the watch backend.

use crate::output;
use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use quiesce_core::WatchConfig;
use std::path::Path;

pub fn run(path: &Path, json: bool) -> Result<()> {
    let config = WatchConfig::load(path)
        .with_context(|| format!("Invalid config {}", path.display()))?;

    if json {
        let text = serde_json::to_string_pretty(&config).context("Failed to encode config")?;
        println!("{}", text);
        return Ok(());
    }

    println!("{} {}", "Config OK:".green().bold(), path.display());
    println!();

    println!("{}", "[engine]".yellow());
    println!(
        "  {} = {} {}",
        "quiet_window_ms".cyan(),
        config.engine.quiet_window_ms,
        if config.engine.quiet_window_ms == 0 {
            "(immediate)".dimmed().to_string()
        } else {
            String::new()
        }
    );
    println!(
        "  {} = {}",
        "prefer_added_on_create_modify".cyan(),
        config.engine.prefer_added_on_create_modify
    );
    println!();

    if config.targets.is_empty() {
        println!("{}", "No targets configured".dimmed());
        return Ok(());
    }

    println!("{} ({})", "Targets".bold(), config.targets.len());
    for target in &config.targets {
        let kind = if target.is_file {
            "file"
        } else if target.recursive {
            "tree"
        } else {
            "dir"
        };

        let mut notes = Vec::new();
        if !target.enabled {
            notes.push("disabled");
        }
        if !target.path.exists() {
            notes.push("missing");
        }

        println!(
            "  {:<5} {} {}",
            kind.cyan(),
            target.path.display(),
            if notes.is_empty() {
                String::new()
            } else {
                format!("({})", notes.join(", ")).yellow().to_string()
            }
        );
        println!(
            "        {} {}",
            "interest:".dimmed(),
            output::interest_summary(&target.interest).dimmed()
        );
    }

    Ok(())
}
