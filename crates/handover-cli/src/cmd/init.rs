use anyhow::Context;
use handover_core::{
    config::Config,
    io, paths,
    store::seed_record,
    types::HandlerKey,
};
use std::path::Path;

/// Phase a freshly seeded record starts in.
const INITIAL_PHASE: &str = "Planning";

pub fn run(root: &Path, feature: Option<&str>) -> anyhow::Result<()> {
    if let Some(slug) = feature {
        if !paths::is_valid_slug(slug) {
            anyhow::bail!(
                "invalid feature slug '{slug}': use lowercase letters, digits and hyphens"
            );
        }
    }

    println!("Initializing handover workflow in: {}", root.display());

    // 1. .handover/ and config.yaml
    let dir = paths::handover_dir(root);
    io::ensure_dir(&dir).with_context(|| format!("failed to create {}", dir.display()))?;

    let config = if paths::config_path(root).exists() {
        println!("  exists:  {}", paths::CONFIG_FILE);
        let config = Config::load(root).context("failed to load config")?;
        if let Some(slug) = feature {
            if slug != config.feature {
                println!(
                    "  note:    keeping configured feature '{}' (edit {} to change it)",
                    config.feature,
                    paths::CONFIG_FILE
                );
            }
        }
        config
    } else {
        let config = match feature {
            Some(slug) => Config::new(slug),
            None => Config::default(),
        };
        config.save(root).context("failed to write config.yaml")?;
        println!("  created: {}", paths::CONFIG_FILE);
        config
    };

    // 2. Handover record, starting with the PM
    let record = config.handover_path(root);
    let seeded = io::write_if_missing(
        &record,
        seed_record(HandlerKey::Pm, INITIAL_PHASE).as_bytes(),
    )
    .with_context(|| format!("failed to write {}", record.display()))?;
    if seeded {
        println!("  created: {}", config.handover_file);
    } else {
        println!("  exists:  {}", config.handover_file);
    }

    println!("\nNext: configure a command for each persona under `handlers` in {}", paths::CONFIG_FILE);
    Ok(())
}
