use crate::output::print_json;
use anyhow::Context;
use handover_core::{
    config::Config,
    handler::Credential,
    policy::Action,
    registry::PersonaRegistry,
    store::{FileStateStore, StateStore, UNKNOWN},
    types::HandlerKey,
};
use std::path::Path;
use std::time::Instant;

/// Source recorded for actions started by hand rather than by the policy.
const MANUAL_SOURCE: &str = "Manual Invocation";

pub fn run(root: &Path, key: &str, prompt: Option<&str>, json: bool) -> anyhow::Result<()> {
    let key: HandlerKey = key.parse()?;
    let config = Config::load(root).context("failed to load config")?;
    let registry = PersonaRegistry::from_config(
        &config,
        root,
        Credential::from_env(&config.credential_env),
    );

    // The record is read for context only; nothing is persisted.
    let state = FileStateStore::new(config.handover_path(root)).load();
    let action = Action {
        handler: key,
        prompt: prompt
            .map(str::to_string)
            .unwrap_or_else(|| format!("Run the {} phase.", key.title())),
        source_artifact: MANUAL_SOURCE.to_string(),
        next_phase: if state.phase == UNKNOWN {
            key.title().to_string()
        } else {
            state.phase.clone()
        },
    };

    tracing::info!(handler = %key, "running persona");
    let started = Instant::now();
    let output = registry.resolve(key)?.execute(&action)?;
    let duration_ms = started.elapsed().as_millis() as u64;

    if json {
        let value = serde_json::json!({
            "action": action,
            "output": output.output,
            "duration_ms": duration_ms,
        });
        print_json(&value)?;
    } else {
        if !output.output.is_empty() {
            println!("{}", output.output);
        }
        println!("\u{2713} {} ({}) finished in {duration_ms}ms", key.title(), key);
    }
    Ok(())
}
