use crate::error::Result;
use crate::types::HandlerKey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// StepRecord
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Completed,
    Failed,
}

/// One loop iteration attempt. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    /// 1-indexed position in the run.
    pub step: u32,
    pub handler: HandlerKey,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub source_artifact: String,
    pub next_phase: String,
}

// ---------------------------------------------------------------------------
// RunOutcome / RunSummary
// ---------------------------------------------------------------------------

/// How a run ended. Only `FailedStep` is an error; `BudgetExceeded` means the
/// workflow can be resumed by another invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RunOutcome {
    Completed,
    BudgetExceeded,
    FailedStep,
}

impl RunOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            RunOutcome::Completed => "completed",
            RunOutcome::BudgetExceeded => "budgetExceeded",
            RunOutcome::FailedStep => "failedStep",
        }
    }

    pub fn is_success(self) -> bool {
        !matches!(self, RunOutcome::FailedStep)
    }
}

impl std::fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total_steps: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub outcome: RunOutcome,
    /// Percentage of steps that completed; 0 when no steps ran.
    pub success_rate: f64,
    pub total_duration_ms: u64,
}

// ---------------------------------------------------------------------------
// RunReport
// ---------------------------------------------------------------------------

/// Append-only audit trail of one orchestration run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    pub outcome: RunOutcome,
    pub steps: Vec<StepRecord>,
}

impl Default for RunReport {
    fn default() -> Self {
        Self::new()
    }
}

impl RunReport {
    pub fn new() -> Self {
        let started_at = Utc::now();
        let suffix = Uuid::new_v4().simple().to_string();
        Self {
            run_id: format!("run-{}-{}", started_at.format("%Y%m%d%H%M%S"), &suffix[..8]),
            started_at,
            finished_at: None,
            outcome: RunOutcome::Completed,
            steps: Vec::new(),
        }
    }

    pub fn record(&mut self, step: StepRecord) {
        self.steps.push(step);
    }

    /// Number of steps recorded so far; also the next step's index minus one.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Close the report with its final outcome.
    pub fn finish(&mut self, outcome: RunOutcome) {
        self.outcome = outcome;
        self.finished_at = Some(Utc::now());
    }

    pub fn summarize(&self) -> RunSummary {
        let total_steps = self.steps.len();
        let succeeded = self
            .steps
            .iter()
            .filter(|s| s.status == StepStatus::Completed)
            .count();
        let failed = total_steps - succeeded;
        let success_rate = if total_steps == 0 {
            0.0
        } else {
            succeeded as f64 * 100.0 / total_steps as f64
        };
        let total_duration_ms = match self.finished_at {
            Some(end) => (end - self.started_at).num_milliseconds().max(0) as u64,
            None => self.steps.iter().map(|s| s.duration_ms).sum(),
        };
        RunSummary {
            total_steps,
            succeeded,
            failed,
            outcome: self.outcome,
            success_rate,
            total_duration_ms,
        }
    }

    /// Human-readable markdown rendering.
    pub fn render(&self) -> String {
        let summary = self.summarize();
        let mut out = String::new();

        let _ = writeln!(out, "# Workflow Run Report\n");
        let _ = writeln!(out, "## Overview");
        let _ = writeln!(out, "- **Run ID:** {}", self.run_id);
        let _ = writeln!(out, "- **Outcome:** {}", summary.outcome);
        let _ = writeln!(out, "- **Started:** {}", self.started_at.to_rfc3339());
        if let Some(end) = self.finished_at {
            let _ = writeln!(out, "- **Finished:** {}", end.to_rfc3339());
        }
        let _ = writeln!(out, "- **Duration:** {}", format_ms(summary.total_duration_ms));

        let _ = writeln!(out, "\n## Steps\n");
        if self.steps.is_empty() {
            let _ = writeln!(out, "_No steps were taken._");
        }
        for s in &self.steps {
            match s.status {
                StepStatus::Completed => {
                    let _ = writeln!(
                        out,
                        "{}. \u{2713} {} \u{2192} {} ({}) from {}",
                        s.step,
                        s.handler,
                        s.next_phase,
                        format_ms(s.duration_ms),
                        s.source_artifact
                    );
                }
                StepStatus::Failed => {
                    let _ = writeln!(
                        out,
                        "{}. \u{2717} {} ({}): {}",
                        s.step,
                        s.handler,
                        format_ms(s.duration_ms),
                        s.error_message.as_deref().unwrap_or("failed")
                    );
                }
            }
        }

        let _ = writeln!(out, "\n## Metrics");
        let _ = writeln!(out, "- **Total Steps:** {}", summary.total_steps);
        let _ = writeln!(out, "- **Succeeded:** {}", summary.succeeded);
        let _ = writeln!(out, "- **Failed:** {}", summary.failed);
        let _ = writeln!(out, "- **Success Rate:** {:.2}%", summary.success_rate);
        out
    }

    /// Write `<run_id>.json` and `<run_id>.md` into `dir`.
    pub fn save(&self, dir: &Path) -> Result<(PathBuf, PathBuf)> {
        let json_path = dir.join(format!("{}.json", self.run_id));
        let md_path = dir.join(format!("{}.md", self.run_id));
        let json = serde_json::to_string_pretty(self)?;
        crate::io::atomic_write(&json_path, json.as_bytes())?;
        crate::io::atomic_write(&md_path, self.render().as_bytes())?;
        Ok((json_path, md_path))
    }
}

fn format_ms(ms: u64) -> String {
    if ms < 1000 {
        format!("{ms}ms")
    } else {
        format!("{:.1}s", ms as f64 / 1000.0)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
