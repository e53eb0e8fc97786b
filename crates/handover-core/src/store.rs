//! The handover record: a human-editable markdown file that names the persona
//! that acted last and the current workflow phase.
//!
//! All parsing and patching of the record lives here. Patches rewrite only the
//! text captured inside the persona and phase markers, so notes, metrics and
//! anything else in the file survive every handover byte for byte.

use crate::error::{Result, WorkflowError};
use crate::types::HandlerKey;
use regex::Regex;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::OnceLock;

/// Sentinel used for a field that could not be read from the record.
pub const UNKNOWN: &str = "UNKNOWN";

// ---------------------------------------------------------------------------
// Marker extraction
// ---------------------------------------------------------------------------

static PERSONA_RE: OnceLock<Regex> = OnceLock::new();
static PHASE_RE: OnceLock<Regex> = OnceLock::new();

fn persona_re() -> &'static Regex {
    PERSONA_RE.get_or_init(|| Regex::new(r"\*\*\[(.*?)\]\*\*").unwrap())
}

fn phase_re() -> &'static Regex {
    PHASE_RE.get_or_init(|| Regex::new(r"Current Phase\s*\n\s*\*\*(.*?)\*\*").unwrap())
}

fn capture<'a>(re: &Regex, raw: &'a str) -> Option<&'a str> {
    re.captures(raw).and_then(|c| c.get(1)).map(|m| m.as_str())
}

/// Replace the first capture group of `re` in `raw` with `value`.
/// Returns `None` when the marker is absent.
fn replace_capture(re: &Regex, raw: &str, value: &str) -> Option<String> {
    let span = re.captures(raw)?.get(1)?.range();
    let mut out = String::with_capacity(raw.len() + value.len());
    out.push_str(&raw[..span.start]);
    out.push_str(value);
    out.push_str(&raw[span.end..]);
    Some(out)
}

fn validate_field(field: &'static str, value: &str) -> Result<()> {
    let bad = value.is_empty()
        || value
            .chars()
            .any(|c| matches!(c, '*' | '[' | ']' | '\n' | '\r'));
    if bad {
        return Err(WorkflowError::InvalidFieldValue {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// HandoverState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HandoverState {
    pub persona: String,
    pub phase: String,
    #[serde(skip)]
    pub raw: String,
}

impl HandoverState {
    /// State for a missing or unreadable record.
    pub fn unknown() -> Self {
        Self {
            persona: UNKNOWN.to_string(),
            phase: UNKNOWN.to_string(),
            raw: String::new(),
        }
    }

    /// Extract persona and phase from record text. Each marker falls back to
    /// `UNKNOWN` on its own; the text is kept verbatim.
    pub fn parse(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let persona = capture(persona_re(), &raw).unwrap_or(UNKNOWN).to_string();
        let phase = capture(phase_re(), &raw).unwrap_or(UNKNOWN).to_string();
        Self {
            persona,
            phase,
            raw,
        }
    }

    /// The handler named by the persona marker, if it is a known one.
    pub fn handler(&self) -> Option<HandlerKey> {
        HandlerKey::from_persona(&self.persona)
    }

    pub fn is_unknown(&self) -> bool {
        self.persona == UNKNOWN && self.phase == UNKNOWN
    }
}

// ---------------------------------------------------------------------------
// StateUpdate
// ---------------------------------------------------------------------------

/// Field updates applied to the record after a successful step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateUpdate {
    pub persona: Option<String>,
    pub phase: Option<String>,
}

impl StateUpdate {
    /// The update written after `handler` completes: its upper-case persona
    /// marker and the phase it moved the workflow into.
    pub fn after(handler: HandlerKey, next_phase: impl Into<String>) -> Self {
        Self {
            persona: Some(handler.persona()),
            phase: Some(next_phase.into()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(ref p) = self.persona {
            validate_field("persona", p)?;
        }
        if let Some(ref p) = self.phase {
            validate_field("phase", p)?;
        }
        Ok(())
    }
}

/// Apply `update` to record text. Each marker is located independently; a
/// field whose marker is missing is skipped and the text left as is.
///
/// Applying the same update twice yields the same text as applying it once.
pub fn apply_update(raw: &str, update: &StateUpdate) -> Result<String> {
    update.validate()?;
    let mut content = raw.to_string();

    if let Some(ref persona) = update.persona {
        match replace_capture(persona_re(), &content, persona) {
            Some(patched) => content = patched,
            None => tracing::debug!("persona marker not found; skipping persona update"),
        }
    }

    if let Some(ref phase) = update.phase {
        match replace_capture(phase_re(), &content, phase) {
            Some(patched) => content = patched,
            None => tracing::debug!("phase marker not found; skipping phase update"),
        }
    }

    Ok(content)
}

/// A fresh record for `handover init`.
pub fn seed_record(persona: HandlerKey, phase: &str) -> String {
    format!(
        "# Handover\n\
         \n\
         ## Current Persona\n\
         \n\
         **[{}]**\n\
         \n\
         ## Current Phase\n\
         \n\
         **{}**\n\
         \n\
         ## Notes\n\
         \n\
         Anything below this line is free-form and is preserved across handovers.\n",
        persona.persona(),
        phase
    )
}

// ---------------------------------------------------------------------------
// StateStore
// ---------------------------------------------------------------------------

/// Durable home of the handover record.
pub trait StateStore {
    /// Never fails: a missing or unreadable record yields [`HandoverState::unknown`].
    fn load(&self) -> HandoverState;

    /// Patch the record and return the state as now stored.
    fn persist(&mut self, state: &HandoverState, update: &StateUpdate) -> Result<HandoverState>;
}

/// The record as a markdown file on disk.
pub struct FileStateStore {
    path: PathBuf,
}

impl FileStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl StateStore for FileStateStore {
    fn load(&self) -> HandoverState {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => HandoverState::parse(raw),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(path = %self.path.display(), "handover record not found");
                HandoverState::unknown()
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "handover record unreadable");
                HandoverState::unknown()
            }
        }
    }

    fn persist(&mut self, state: &HandoverState, update: &StateUpdate) -> Result<HandoverState> {
        update.validate()?;
        // Handlers may append notes to the record while they run; patch what
        // is on disk now rather than the snapshot taken before the step.
        let base = match std::fs::read_to_string(&self.path) {
            Ok(current) => current,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(path = %self.path.display(), error = %e, "re-reading handover record failed");
                }
                state.raw.clone()
            }
        };

        let patched = apply_update(&base, update)?;
        if patched != base || (!self.path.exists() && !patched.is_empty()) {
            crate::io::atomic_write(&self.path, patched.as_bytes())?;
            tracing::debug!(path = %self.path.display(), "handover record updated");
        }
        Ok(HandoverState::parse(patched))
    }
}

/// In-memory record with the same patch semantics, for tests and dry runs.
#[derive(Debug, Clone, Default)]
pub struct MemoryStateStore {
    content: Option<String>,
    writes: usize,
}

impl MemoryStateStore {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            writes: 0,
        }
    }

    /// A store with no record at all.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn content(&self) -> Option<&str> {
        self.content.as_deref()
    }

    /// Number of persist calls that changed the content.
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl StateStore for MemoryStateStore {
    fn load(&self) -> HandoverState {
        match self.content {
            Some(ref raw) => HandoverState::parse(raw.clone()),
            None => HandoverState::unknown(),
        }
    }

    fn persist(&mut self, state: &HandoverState, update: &StateUpdate) -> Result<HandoverState> {
        let base = self.content.clone().unwrap_or_else(|| state.raw.clone());
        let patched = apply_update(&base, update)?;
        if patched != base {
            self.writes += 1;
        }
        if self.content.is_some() || !patched.is_empty() {
            self.content = Some(patched.clone());
        }
        Ok(HandoverState::parse(patched))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
