use crate::config::Config;
use crate::probe::ArtifactProbe;
use crate::store::HandoverState;
use crate::types::HandlerKey;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Action (output)
// ---------------------------------------------------------------------------

/// What the orchestrator should do next. Built fresh on every evaluation and
/// consumed once; only its effect on the handover record is persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub handler: HandlerKey,
    pub prompt: String,
    /// Artifact path, or a sentinel such as `System Init`, the prompt came from.
    pub source_artifact: String,
    pub next_phase: String,
}

// ---------------------------------------------------------------------------
// Artifacts
// ---------------------------------------------------------------------------

/// The precondition documents, by role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Artifact {
    Planning,
    Architecture,
}

/// Artifact paths relative to the project root, resolved from config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub planning: String,
    pub architecture: String,
}

impl ArtifactPaths {
    pub fn from_config(config: &Config) -> Self {
        Self {
            planning: config.planning_artifact_path(),
            architecture: config.architecture_artifact_path(),
        }
    }

    pub fn get(&self, artifact: Artifact) -> &str {
        match artifact {
            Artifact::Planning => &self.planning,
            Artifact::Architecture => &self.architecture,
        }
    }
}

// ---------------------------------------------------------------------------
// Transition table
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub enum BootstrapSource {
    Sentinel(&'static str),
    Artifact(Artifact),
}

/// Action taken when a gate's artifact is missing: re-run the phase that is
/// supposed to produce it instead of stalling the workflow.
#[derive(Debug, Clone, Copy)]
pub struct Bootstrap {
    pub handler: HandlerKey,
    pub prompt: &'static str,
    pub source: BootstrapSource,
    pub next_phase: &'static str,
}

/// A transition guarded by an artifact on disk.
#[derive(Debug, Clone, Copy)]
pub struct Gate {
    pub artifact: Artifact,
    /// Section of the artifact whose text overrides the default prompt.
    pub prompt_section: Option<&'static str>,
    pub bootstrap: Bootstrap,
}

/// One edge of the phase graph. fn-pointer fields keep the table static.
pub struct Transition {
    pub id: &'static str,
    pub from: HandlerKey,
    pub to: HandlerKey,
    pub gate: Option<Gate>,
    /// Source recorded for ungated transitions.
    pub source: &'static str,
    /// Receives the artifact path (gated) or the source sentinel.
    pub default_prompt: fn(&str) -> String,
    pub next_phase: &'static str,
}

/// The seven-persona workflow: PM → Architect → Developer → QA → Security →
/// DevOps → Release Manager. Release Manager is terminal.
pub fn default_transitions() -> Vec<Transition> {
    vec![
        Transition {
            id: "plan_to_architecture",
            from: HandlerKey::Pm,
            to: HandlerKey::Architect,
            gate: Some(Gate {
                artifact: Artifact::Planning,
                prompt_section: Some("Architect Prompt"),
                bootstrap: Bootstrap {
                    handler: HandlerKey::Pm,
                    prompt: "Analyze the issue and create a PRD.",
                    source: BootstrapSource::Sentinel("System Init"),
                    next_phase: "Planning",
                },
            }),
            source: "",
            default_prompt: |_| "Design the system architecture based on the PRD.".to_string(),
            next_phase: "Architecture Design",
        },
        Transition {
            id: "architecture_to_implementation",
            from: HandlerKey::Architect,
            to: HandlerKey::Developer,
            gate: Some(Gate {
                artifact: Artifact::Architecture,
                prompt_section: Some("Developer Prompt"),
                bootstrap: Bootstrap {
                    handler: HandlerKey::Architect,
                    prompt: "Design the system architecture based on the PRD.",
                    source: BootstrapSource::Artifact(Artifact::Planning),
                    next_phase: "Architecture Design",
                },
            }),
            source: "",
            default_prompt: |path| format!("Implement the specification defined in {path}"),
            next_phase: "Implementation",
        },
        Transition {
            id: "implementation_to_qa",
            from: HandlerKey::Developer,
            to: HandlerKey::Qa,
            gate: None,
            source: "Implementation",
            default_prompt: |_| {
                "Verify the implementation against the PRD and Architecture Spec.".to_string()
            },
            next_phase: "Quality Assurance",
        },
        Transition {
            id: "qa_to_security",
            from: HandlerKey::Qa,
            to: HandlerKey::Security,
            gate: None,
            source: "QA Report",
            default_prompt: |_| {
                "Perform a security review of the code and dependencies.".to_string()
            },
            next_phase: "Security Review",
        },
        Transition {
            id: "security_to_deployment",
            from: HandlerKey::Security,
            to: HandlerKey::Devops,
            gate: None,
            source: "Security Audit",
            default_prompt: |_| "Prepare the deployment pipeline and infrastructure.".to_string(),
            next_phase: "DevOps & Deployment",
        },
        Transition {
            id: "deployment_to_release",
            from: HandlerKey::Devops,
            to: HandlerKey::ReleaseManager,
            gate: None,
            source: "Deployment Readiness",
            default_prompt: |_| {
                "Coordinate the final release, close the issue, and publish release notes."
                    .to_string()
            },
            next_phase: "Release Management",
        },
    ]
}

// ---------------------------------------------------------------------------
// TransitionPolicy
// ---------------------------------------------------------------------------

pub struct TransitionPolicy {
    transitions: Vec<Transition>,
    artifacts: ArtifactPaths,
    terminal: HandlerKey,
}

impl TransitionPolicy {
    pub fn new(transitions: Vec<Transition>, artifacts: ArtifactPaths, terminal: HandlerKey) -> Self {
        Self {
            transitions,
            artifacts,
            terminal,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            default_transitions(),
            ArtifactPaths::from_config(config),
            HandlerKey::ReleaseManager,
        )
    }

    pub fn is_terminal(&self, state: &HandoverState) -> bool {
        state.handler() == Some(self.terminal)
    }

    /// Decide the next action for `state`, or `None` when the workflow is
    /// complete or the persona is not part of the graph.
    ///
    /// Depends only on `state` and what `probe` reports, so identical inputs
    /// always produce identical results.
    pub fn next(&self, state: &HandoverState, probe: &dyn ArtifactProbe) -> Option<Action> {
        let Some(current) = state.handler() else {
            tracing::debug!(persona = %state.persona, "persona is not part of the workflow graph");
            return None;
        };
        if current == self.terminal {
            return None;
        }
        let transition = self.transitions.iter().find(|t| t.from == current)?;

        let Some(gate) = transition.gate else {
            return Some(Action {
                handler: transition.to,
                prompt: (transition.default_prompt)(transition.source),
                source_artifact: transition.source.to_string(),
                next_phase: transition.next_phase.to_string(),
            });
        };

        let path = self.artifacts.get(gate.artifact);
        if !probe.exists(path) {
            tracing::info!(
                transition = transition.id,
                artifact = path,
                "precondition artifact missing; re-running {}",
                gate.bootstrap.handler
            );
            return Some(self.bootstrap_action(&gate.bootstrap));
        }

        let prompt = gate
            .prompt_section
            .and_then(|title| probe.extract_section(path, title))
            .unwrap_or_else(|| (transition.default_prompt)(path));

        Some(Action {
            handler: transition.to,
            prompt,
            source_artifact: path.to_string(),
            next_phase: transition.next_phase.to_string(),
        })
    }

    fn bootstrap_action(&self, bootstrap: &Bootstrap) -> Action {
        let source = match bootstrap.source {
            BootstrapSource::Sentinel(s) => s.to_string(),
            BootstrapSource::Artifact(a) => self.artifacts.get(a).to_string(),
        };
        Action {
            handler: bootstrap.handler,
            prompt: bootstrap.prompt.to_string(),
            source_artifact: source,
            next_phase: bootstrap.next_phase.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
