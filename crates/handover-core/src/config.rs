use crate::error::Result;
use crate::paths;
use crate::types::HandlerKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// HandlerConfig
// ---------------------------------------------------------------------------

/// How a persona is executed: a shell command run in the project root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandlerConfig {
    pub command: String,
    /// Kill the handler after this many seconds. `0` means no limit.
    #[serde(default)]
    pub timeout_seconds: u64,
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    /// Feature slug substituted into artifact path templates.
    #[serde(default = "default_feature")]
    pub feature: String,
    #[serde(default = "default_handover_file")]
    pub handover_file: String,
    #[serde(default = "default_planning_artifact")]
    pub planning_artifact: String,
    #[serde(default = "default_architecture_artifact")]
    pub architecture_artifact: String,
    #[serde(default = "default_reports_dir")]
    pub reports_dir: String,
    /// Append-only step journal. `null` disables it.
    #[serde(default = "default_journal_file")]
    pub journal_file: Option<String>,
    #[serde(default = "default_max_steps")]
    pub max_steps: u32,
    #[serde(default)]
    pub step_delay_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_duration_secs: Option<u64>,
    /// Name of the environment variable holding the credential handed to handlers.
    #[serde(default = "default_credential_env")]
    pub credential_env: String,
    /// Keyed by handler string (`pm`, `architect`, ...). Kept as strings so
    /// that a typo surfaces as a validation error instead of a parse failure.
    #[serde(default)]
    pub handlers: BTreeMap<String, HandlerConfig>,
}

fn default_version() -> u32 {
    1
}

fn default_feature() -> String {
    "user-authentication".to_string()
}

fn default_handover_file() -> String {
    paths::DEFAULT_HANDOVER_FILE.to_string()
}

fn default_planning_artifact() -> String {
    paths::DEFAULT_PLANNING_ARTIFACT.to_string()
}

fn default_architecture_artifact() -> String {
    paths::DEFAULT_ARCHITECTURE_ARTIFACT.to_string()
}

fn default_reports_dir() -> String {
    paths::DEFAULT_REPORTS_DIR.to_string()
}

fn default_journal_file() -> Option<String> {
    Some(paths::DEFAULT_JOURNAL_FILE.to_string())
}

fn default_max_steps() -> u32 {
    20
}

fn default_credential_env() -> String {
    "GITHUB_TOKEN".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            feature: default_feature(),
            handover_file: default_handover_file(),
            planning_artifact: default_planning_artifact(),
            architecture_artifact: default_architecture_artifact(),
            reports_dir: default_reports_dir(),
            journal_file: default_journal_file(),
            max_steps: default_max_steps(),
            step_delay_ms: 0,
            max_duration_secs: None,
            credential_env: default_credential_env(),
            handlers: BTreeMap::new(),
        }
    }
}

impl Config {
    pub fn new(feature: impl Into<String>) -> Self {
        Self {
            feature: feature.into(),
            ..Self::default()
        }
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    /// Load `.handover/config.yaml`. A missing file yields the defaults.
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(&path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    // -----------------------------------------------------------------------
    // Resolved paths
    // -----------------------------------------------------------------------

    pub fn handover_path(&self, root: &Path) -> PathBuf {
        root.join(&self.handover_file)
    }

    pub fn reports_path(&self, root: &Path) -> PathBuf {
        root.join(&self.reports_dir)
    }

    pub fn journal_path(&self, root: &Path) -> Option<PathBuf> {
        self.journal_file.as_ref().map(|f| root.join(f))
    }

    /// Planning artifact, relative to the project root.
    pub fn planning_artifact_path(&self) -> String {
        paths::expand_feature(&self.planning_artifact, &self.feature)
    }

    /// Architecture artifact, relative to the project root.
    pub fn architecture_artifact_path(&self) -> String {
        paths::expand_feature(&self.architecture_artifact, &self.feature)
    }

    pub fn step_delay(&self) -> Duration {
        Duration::from_millis(self.step_delay_ms)
    }

    pub fn max_duration(&self) -> Option<Duration> {
        self.max_duration_secs.map(Duration::from_secs)
    }

    /// Configured handlers with a recognised key, in workflow order.
    pub fn handler_entries(&self) -> Vec<(HandlerKey, &HandlerConfig)> {
        let mut entries: Vec<(HandlerKey, &HandlerConfig)> = self
            .handlers
            .iter()
            .filter_map(|(k, v)| k.parse::<HandlerKey>().ok().map(|key| (key, v)))
            .collect();
        entries.sort_by_key(|(k, _)| *k);
        entries
    }

    pub fn handler_for(&self, key: HandlerKey) -> Option<&HandlerConfig> {
        self.handler_entries()
            .into_iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v)
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        // 1. Handler keys must name a known persona; commands must be non-empty
        for (key, handler) in &self.handlers {
            if key.parse::<HandlerKey>().is_err() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!("unknown handler '{key}' in handlers"),
                });
            }
            if handler.command.trim().is_empty() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!("handler '{key}' has an empty command"),
                });
            }
        }

        // 2. Aliases must not configure the same persona twice
        let mut spellings: BTreeMap<HandlerKey, Vec<&str>> = BTreeMap::new();
        for key in self.handlers.keys() {
            if let Ok(parsed) = key.parse::<HandlerKey>() {
                spellings.entry(parsed).or_default().push(key.as_str());
            }
        }
        for (key, names) in &spellings {
            if names.len() > 1 {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!(
                        "handler '{key}' configured more than once ({})",
                        names.join(", ")
                    ),
                });
            }
        }

        // 3. Every persona in the graph should have somewhere to run
        for key in HandlerKey::all() {
            if self.handler_for(*key).is_none() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!(
                        "no command configured for handler '{key}'; runs reaching it will fail"
                    ),
                });
            }
        }

        // 4. A zero budget never advances the workflow
        if self.max_steps == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "max_steps is 0; every run stops before the first step".to_string(),
            });
        }

        // 5. The feature slug ends up in file names
        if !paths::is_valid_slug(&self.feature) {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "feature '{}' is not a lowercase slug (letters, digits, hyphens)",
                    self.feature
                ),
            });
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
