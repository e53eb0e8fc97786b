use crate::config::Config;
use crate::error::{Result, WorkflowError};
use crate::handler::{CommandHandler, Credential, PhaseHandler};
use crate::types::HandlerKey;
use std::collections::BTreeMap;
use std::path::Path;

/// Maps each handler key to the persona that executes it. Populated once at
/// startup and read-only afterwards.
#[derive(Default)]
pub struct PersonaRegistry {
    handlers: BTreeMap<HandlerKey, Box<dyn PhaseHandler>>,
}

impl PersonaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// One `CommandHandler` per configured entry. Unrecognised keys are left
    /// to `Config::validate`; resolving them later fails as usual.
    pub fn from_config(config: &Config, root: &Path, credential: Option<Credential>) -> Self {
        let mut registry = Self::new();
        for (key, handler) in config.handler_entries() {
            registry.register(
                key,
                CommandHandler::from_config(key, handler, root, credential.clone()),
            );
        }
        registry
    }

    /// Register `handler` for `key`, replacing any previous registration.
    pub fn register(&mut self, key: HandlerKey, handler: impl PhaseHandler + 'static) -> &mut Self {
        self.handlers.insert(key, Box::new(handler));
        self
    }

    pub fn with(mut self, key: HandlerKey, handler: impl PhaseHandler + 'static) -> Self {
        self.register(key, handler);
        self
    }

    /// The handler for `key`. Execution errors are the caller's to see; this
    /// only fails when nothing is registered.
    pub fn resolve(&self, key: HandlerKey) -> Result<&dyn PhaseHandler> {
        self.handlers
            .get(&key)
            .map(|h| &**h)
            .ok_or(WorkflowError::HandlerNotRegistered(key))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
