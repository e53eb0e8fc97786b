use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const HANDOVER_DIR: &str = ".handover";
pub const CONFIG_FILE: &str = ".handover/config.yaml";

pub const DEFAULT_HANDOVER_FILE: &str = ".github/HANDOVER.md";
pub const DEFAULT_REPORTS_DIR: &str = ".github/reports";
pub const DEFAULT_JOURNAL_FILE: &str = ".github/logs/workflow.log";

pub const DEFAULT_PLANNING_ARTIFACT: &str = "docs/planning/PRD-{feature}.md";
pub const DEFAULT_ARCHITECTURE_ARTIFACT: &str = "docs/architecture/SPEC-{feature}.md";

/// Placeholder substituted with the configured feature slug in artifact templates.
pub const FEATURE_PLACEHOLDER: &str = "{feature}";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn handover_dir(root: &Path) -> PathBuf {
    root.join(HANDOVER_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

/// Expand `{feature}` in an artifact path template.
pub fn expand_feature(template: &str, feature: &str) -> String {
    template.replace(FEATURE_PLACEHOLDER, feature)
}

// ---------------------------------------------------------------------------
// Slug validation
// ---------------------------------------------------------------------------

static SLUG_RE: OnceLock<Regex> = OnceLock::new();

fn slug_re() -> &'static Regex {
    SLUG_RE.get_or_init(|| Regex::new(r"^[a-z0-9][a-z0-9\-]*[a-z0-9]$|^[a-z0-9]$").unwrap())
}

pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty() && slug.len() <= 64 && slug_re().is_match(slug)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
