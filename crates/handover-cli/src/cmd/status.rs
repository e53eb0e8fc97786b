use crate::output::print_json;
use anyhow::Context;
use handover_core::{config::Config, orchestrator::Orchestrator, store::StateStore};
use std::path::Path;

pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    let orchestrator = Orchestrator::for_project(root, &config, None);

    let state = orchestrator.store().load();
    let next = orchestrator.peek();
    let complete = orchestrator.policy().is_terminal(&state);

    if json {
        let value = serde_json::json!({
            "record": config.handover_file,
            "persona": state.persona,
            "phase": state.phase,
            "complete": complete,
            "next": next,
        });
        print_json(&value)?;
        return Ok(());
    }

    println!("Record:   {}", config.handover_file);
    println!("Persona:  {}", state.persona);
    println!("Phase:    {}", state.phase);

    match next {
        Some(action) => {
            println!("Next:     {} \u{2192} {}", action.handler, action.next_phase);
            println!("Source:   {}", action.source_artifact);
            println!("Prompt:   {}", action.prompt);
        }
        None if complete => println!("\nWorkflow complete."),
        None if state.is_unknown() => {
            println!("\nNo handover record found. Run `handover init` to create one.")
        }
        None => println!(
            "\nPersona '{}' is not part of the workflow; nothing to do.",
            state.persona
        ),
    }
    Ok(())
}
