use crate::output::print_json;
use anyhow::Context;
use clap::Subcommand;
use handover_core::config::{Config, WarnLevel};
use handover_core::types::HandlerKey;
use std::path::Path;

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Show the resolved configuration
    Show,

    /// Validate the config for common mistakes
    Validate,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(root: &Path, subcmd: ConfigSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ConfigSubcommand::Show => show(root, json),
        ConfigSubcommand::Validate => validate(root, json),
    }
}

// ---------------------------------------------------------------------------
// show
// ---------------------------------------------------------------------------

fn show(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;

    if json {
        print_json(&config)?;
        return Ok(());
    }

    println!("Feature:       {}", config.feature);
    println!("Record:        {}", config.handover_file);
    println!("PRD:           {}", config.planning_artifact_path());
    println!("Architecture:  {}", config.architecture_artifact_path());
    println!("Reports:       {}", config.reports_dir);
    println!(
        "Journal:       {}",
        config.journal_file.as_deref().unwrap_or("(disabled)")
    );
    println!("Max steps:     {}", config.max_steps);
    println!("Credential:    ${}", config.credential_env);
    println!("Handlers:");
    for key in HandlerKey::all() {
        let command = config
            .handler_for(*key)
            .map(|h| h.command.as_str())
            .unwrap_or("(not configured)");
        println!("  {:<16} {}", key.as_str(), command);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

fn validate(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    let warnings = config.validate();

    if json {
        let value = serde_json::json!({
            "warnings": warnings,
        });
        print_json(&value)?;
    } else if warnings.is_empty() {
        println!("Config is valid. No warnings.");
    } else {
        for w in &warnings {
            let prefix = match w.level {
                WarnLevel::Warning => "warning",
                WarnLevel::Error => "error",
            };
            println!("[{prefix}] {}", w.message);
        }
    }

    let has_errors = warnings.iter().any(|w| w.level == WarnLevel::Error);
    if has_errors {
        anyhow::bail!("config validation found errors");
    }

    Ok(())
}
