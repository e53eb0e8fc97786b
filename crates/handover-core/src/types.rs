use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// HandlerKey
// ---------------------------------------------------------------------------

/// The closed set of phase handlers (personas) the workflow knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandlerKey {
    Pm,
    Architect,
    Developer,
    Qa,
    Security,
    Devops,
    ReleaseManager,
}

impl HandlerKey {
    /// Workflow order, first to last.
    pub fn all() -> &'static [HandlerKey] {
        &[
            HandlerKey::Pm,
            HandlerKey::Architect,
            HandlerKey::Developer,
            HandlerKey::Qa,
            HandlerKey::Security,
            HandlerKey::Devops,
            HandlerKey::ReleaseManager,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HandlerKey::Pm => "pm",
            HandlerKey::Architect => "architect",
            HandlerKey::Developer => "developer",
            HandlerKey::Qa => "qa",
            HandlerKey::Security => "security",
            HandlerKey::Devops => "devops",
            HandlerKey::ReleaseManager => "releasemanager",
        }
    }

    /// The marker written into the handover record, e.g. `ARCHITECT`.
    pub fn persona(self) -> String {
        self.as_str().to_uppercase()
    }

    /// Case-sensitive lookup of a persona marker read from the handover record.
    pub fn from_persona(persona: &str) -> Option<HandlerKey> {
        HandlerKey::all()
            .iter()
            .copied()
            .find(|k| k.persona() == persona)
    }

    pub fn title(self) -> &'static str {
        match self {
            HandlerKey::Pm => "Project Manager",
            HandlerKey::Architect => "Architect",
            HandlerKey::Developer => "Developer",
            HandlerKey::Qa => "QA",
            HandlerKey::Security => "Security",
            HandlerKey::Devops => "Deployment Ops",
            HandlerKey::ReleaseManager => "Release Manager",
        }
    }
}

impl fmt::Display for HandlerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for HandlerKey {
    type Err = crate::error::WorkflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pm" | "project-manager" | "project_manager" => Ok(HandlerKey::Pm),
            "architect" => Ok(HandlerKey::Architect),
            "developer" => Ok(HandlerKey::Developer),
            "qa" => Ok(HandlerKey::Qa),
            "security" => Ok(HandlerKey::Security),
            "devops" => Ok(HandlerKey::Devops),
            "releasemanager" | "release-manager" | "release_manager" => {
                Ok(HandlerKey::ReleaseManager)
            }
            _ => Err(crate::error::WorkflowError::UnknownHandler(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
