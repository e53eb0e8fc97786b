use crate::config::Config;
use crate::error::WorkflowError;
use crate::handler::Credential;
use crate::policy::{Action, TransitionPolicy};
use crate::probe::{ArtifactProbe, FsProbe};
use crate::registry::PersonaRegistry;
use crate::report::{RunOutcome, RunReport, StepRecord, StepStatus};
use crate::store::{FileStateStore, StateStore, StateUpdate};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

// ---------------------------------------------------------------------------
// RunOptions
// ---------------------------------------------------------------------------

/// Loop settings beyond the step budget.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Pause between steps.
    pub step_delay: Duration,
    /// Wall-clock budget, checked between steps.
    pub max_duration: Option<Duration>,
    /// Plain-text log of step events.
    pub journal: Option<PathBuf>,
}

impl RunOptions {
    pub fn from_config(config: &Config, root: &Path) -> Self {
        Self {
            step_delay: config.step_delay(),
            max_duration: config.max_duration(),
            journal: config.journal_path(root),
        }
    }
}

// ---------------------------------------------------------------------------
// RunError
// ---------------------------------------------------------------------------

/// A run that stopped on a failed step. Carries the report so the caller can
/// still render it.
#[derive(Debug, thiserror::Error)]
#[error("workflow run stopped at step {}", .report.len())]
pub struct RunError {
    pub report: RunReport,
    #[source]
    pub source: WorkflowError,
}

// ---------------------------------------------------------------------------
// Journal
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
enum JournalLevel {
    Info,
    Warn,
    Error,
}

impl JournalLevel {
    fn as_str(self) -> &'static str {
        match self {
            JournalLevel::Info => "INFO",
            JournalLevel::Warn => "WARN",
            JournalLevel::Error => "ERROR",
        }
    }
}

fn journal_line(level: JournalLevel, message: &str) -> String {
    format!("[{}] [{}] {}\n", Utc::now().to_rfc3339(), level.as_str(), message)
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Drives the workflow: load state, pick the next action, run its handler,
/// record the result, repeat.
pub struct Orchestrator<S, P> {
    store: S,
    probe: P,
    policy: TransitionPolicy,
    registry: PersonaRegistry,
    options: RunOptions,
}

impl Orchestrator<FileStateStore, FsProbe> {
    /// File-backed orchestrator for the project at `root`, with one command
    /// handler per configured persona.
    pub fn for_project(root: &Path, config: &Config, credential: Option<Credential>) -> Self {
        Self::new(
            FileStateStore::new(config.handover_path(root)),
            FsProbe::new(root),
            TransitionPolicy::from_config(config),
            PersonaRegistry::from_config(config, root, credential),
        )
        .with_options(RunOptions::from_config(config, root))
    }
}

impl<S: StateStore, P: ArtifactProbe> Orchestrator<S, P> {
    pub fn new(store: S, probe: P, policy: TransitionPolicy, registry: PersonaRegistry) -> Self {
        Self {
            store,
            probe,
            policy,
            registry,
            options: RunOptions::default(),
        }
    }

    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn policy(&self) -> &TransitionPolicy {
        &self.policy
    }

    /// The action the next step would take, without running anything.
    pub fn peek(&self) -> Option<Action> {
        self.policy.next(&self.store.load(), &self.probe)
    }

    /// Run until the workflow completes, a step fails, or a budget runs out.
    ///
    /// Completion and an exhausted budget are both `Ok`; the report's outcome
    /// tells them apart. A failed step is never retried.
    pub fn run(&mut self, max_steps: u32) -> Result<RunReport, RunError> {
        let mut report = RunReport::new();
        let clock = Instant::now();
        tracing::info!(run_id = %report.run_id, max_steps, "starting workflow run");
        self.journal(
            JournalLevel::Info,
            &format!("run {} started (max {max_steps} steps)", report.run_id),
        );

        if max_steps == 0 {
            return Ok(self.conclude(report, RunOutcome::BudgetExceeded));
        }

        loop {
            let state = self.store.load();
            let Some(action) = self.policy.next(&state, &self.probe) else {
                tracing::info!(persona = %state.persona, phase = %state.phase, "no further action");
                return Ok(self.conclude(report, RunOutcome::Completed));
            };

            let step = report.len() as u32 + 1;
            let started_at = Utc::now();
            let step_clock = Instant::now();
            tracing::info!(
                step,
                handler = %action.handler,
                next_phase = %action.next_phase,
                source = %action.source_artifact,
                "running step"
            );
            self.journal(
                JournalLevel::Info,
                &format!(
                    "step {step}: {} -> {} (from {})",
                    action.handler, action.next_phase, action.source_artifact
                ),
            );

            let handler = match self.registry.resolve(action.handler) {
                Ok(h) => h,
                Err(e) => {
                    report.record(step_record(step, &action, started_at, 0, Err(&e)));
                    return Err(self.fail(report, e));
                }
            };

            let result = handler.execute(&action).and_then(|out| {
                if !out.output.is_empty() {
                    tracing::debug!(step, output = %out.output, "handler output");
                }
                let update = StateUpdate::after(action.handler, action.next_phase.clone());
                self.store.persist(&state, &update)
            });
            let duration_ms = step_clock.elapsed().as_millis() as u64;

            match result {
                Ok(now) => {
                    report.record(step_record(step, &action, started_at, duration_ms, Ok(())));
                    tracing::info!(step, persona = %now.persona, phase = %now.phase, duration_ms, "step completed");
                    self.journal(
                        JournalLevel::Info,
                        &format!("step {step}: {} completed in {duration_ms}ms", action.handler),
                    );
                }
                Err(e) => {
                    report.record(step_record(step, &action, started_at, duration_ms, Err(&e)));
                    return Err(self.fail(report, e));
                }
            }

            if report.len() as u32 >= max_steps {
                tracing::warn!(max_steps, "step budget exhausted");
                self.journal(
                    JournalLevel::Warn,
                    &format!("step budget of {max_steps} exhausted"),
                );
                return Ok(self.conclude(report, RunOutcome::BudgetExceeded));
            }
            if let Some(limit) = self.options.max_duration {
                if clock.elapsed() >= limit {
                    tracing::warn!(limit_secs = limit.as_secs(), "time budget exhausted");
                    self.journal(
                        JournalLevel::Warn,
                        &format!("time budget of {}s exhausted", limit.as_secs()),
                    );
                    return Ok(self.conclude(report, RunOutcome::BudgetExceeded));
                }
            }
            if !self.options.step_delay.is_zero() {
                std::thread::sleep(self.options.step_delay);
            }
        }
    }

    fn conclude(&self, mut report: RunReport, outcome: RunOutcome) -> RunReport {
        report.finish(outcome);
        let summary = report.summarize();
        tracing::info!(
            run_id = %report.run_id,
            outcome = %outcome,
            steps = summary.total_steps,
            "workflow run finished"
        );
        self.journal(
            JournalLevel::Info,
            &format!(
                "run {} finished: {outcome} after {} steps",
                report.run_id, summary.total_steps
            ),
        );
        report
    }

    fn fail(&self, mut report: RunReport, source: WorkflowError) -> RunError {
        report.finish(RunOutcome::FailedStep);
        tracing::error!(run_id = %report.run_id, error = %source, "workflow step failed");
        self.journal(
            JournalLevel::Error,
            &format!("run {} failed at step {}: {source}", report.run_id, report.len()),
        );
        RunError { report, source }
    }

    fn journal(&self, level: JournalLevel, message: &str) {
        let Some(ref path) = self.options.journal else {
            return;
        };
        if let Err(e) = crate::io::append_text(path, &journal_line(level, message)) {
            tracing::warn!(path = %path.display(), error = %e, "journal write failed");
        }
    }
}

fn step_record(
    step: u32,
    action: &Action,
    started_at: DateTime<Utc>,
    duration_ms: u64,
    result: Result<(), &WorkflowError>,
) -> StepRecord {
    let (status, error_message) = match result {
        Ok(()) => (StepStatus::Completed, None),
        Err(e) => (StepStatus::Failed, Some(e.to_string())),
    };
    StepRecord {
        step,
        handler: action.handler,
        started_at,
        duration_ms,
        status,
        error_message,
        source_artifact: action.source_artifact.clone(),
        next_phase: action.next_phase.clone(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
