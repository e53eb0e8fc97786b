use crate::output::print_json;
use anyhow::Context;
use handover_core::{
    config::{Config, WarnLevel},
    handler::Credential,
    orchestrator::Orchestrator,
    report::{RunOutcome, RunReport},
};
use std::path::{Path, PathBuf};

pub fn run(root: &Path, max_steps: Option<u32>, no_report: bool, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    check_config(&config)?;

    let credential = Credential::from_env(&config.credential_env);
    if credential.is_none() {
        tracing::warn!(
            env = %config.credential_env,
            "credential not set; handlers will run without it"
        );
    }

    let budget = max_steps.unwrap_or(config.max_steps);
    let mut orchestrator = Orchestrator::for_project(root, &config, credential);
    let outcome = orchestrator.run(budget);

    let report = match &outcome {
        Ok(report) => report,
        Err(e) => &e.report,
    };
    let saved = if no_report {
        None
    } else {
        save_report(report, &config.reports_path(root))
    };

    if json {
        let value = serde_json::json!({
            "summary": report.summarize(),
            "report": report,
            "saved": saved.as_ref().map(|(j, m)| vec![j.display().to_string(), m.display().to_string()]),
        });
        print_json(&value)?;
    } else {
        print!("{}", report.render());
        if let Some((_, md)) = &saved {
            println!("\nReport saved: {}", md.display());
        }
        if report.outcome == RunOutcome::BudgetExceeded {
            println!("\nStep budget reached; run `handover run` again to continue.");
        }
    }

    // Completed and budget-exceeded runs exit 0; a failed step carries its
    // cause through the error chain.
    outcome.map(|_| ()).map_err(Into::into)
}

/// Refuse to start on configuration errors; warnings are logged only.
fn check_config(config: &Config) -> anyhow::Result<()> {
    let mut errors = 0;
    for w in config.validate() {
        match w.level {
            WarnLevel::Warning => tracing::warn!("{}", w.message),
            WarnLevel::Error => {
                tracing::error!("{}", w.message);
                errors += 1;
            }
        }
    }
    if errors > 0 {
        anyhow::bail!(
            "config has {errors} error(s); run `handover config validate` for details"
        );
    }
    Ok(())
}

fn save_report(report: &RunReport, dir: &Path) -> Option<(PathBuf, PathBuf)> {
    match report.save(dir) {
        Ok(paths) => Some(paths),
        Err(e) => {
            tracing::warn!(dir = %dir.display(), error = %e, "failed to save run report");
            None
        }
    }
}
