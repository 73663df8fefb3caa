//! Action handler registry

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::migration::{ActionHandler, MigrationAction};
use crate::domain::validation::Validator;

use super::handlers::{DefinitionActionHandler, BUILTIN_ACTIONS};

/// Maps action identifiers to handlers. Structured actions and custom
/// actions live in separate namespaces, so a custom action named like a
/// built-in never reaches the built-in handler.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn ActionHandler>>,
    custom: HashMap<String, Arc<dyn ActionHandler>>,
}

impl HandlerRegistry {
    /// Empty registry; every action is unknown
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in handler bound to every structured action
    pub fn with_builtins(validator: Validator) -> Self {
        let builtin: Arc<dyn ActionHandler> = Arc::new(DefinitionActionHandler::new(validator));
        let mut registry = Self::new();
        for action in BUILTIN_ACTIONS {
            registry.handlers.insert(action.to_string(), Arc::clone(&builtin));
        }
        registry
    }

    /// Register a handler, replacing any previous one. Structured identifiers
    /// override the built-in handler; any other identifier is a custom action
    /// name or a `revert_<name>` inverse.
    pub fn register(&mut self, action: impl Into<String>, handler: Arc<dyn ActionHandler>) {
        let action = action.into();
        if BUILTIN_ACTIONS.contains(&action.as_str()) {
            self.handlers.insert(action, handler);
        } else {
            self.custom.insert(action, handler);
        }
    }

    /// Register a custom action handler, even under a name a structured
    /// action also uses
    pub fn register_custom(&mut self, name: impl Into<String>, handler: Arc<dyn ActionHandler>) {
        self.custom.insert(name.into(), handler);
    }

    pub fn with_handler(mut self, action: impl Into<String>, handler: Arc<dyn ActionHandler>) -> Self {
        self.register(action, handler);
        self
    }

    pub fn resolve(&self, action: &MigrationAction) -> Option<Arc<dyn ActionHandler>> {
        let namespace = match action {
            MigrationAction::Custom { .. } | MigrationAction::Revert { .. } => &self.custom,
            _ => &self.handlers,
        };
        namespace.get(&action.identifier()).cloned()
    }

    /// Registered identifiers, sorted; custom ones are prefixed `custom:`
    pub fn actions(&self) -> Vec<String> {
        let mut actions: Vec<String> = self
            .handlers
            .keys()
            .cloned()
            .chain(self.custom.keys().map(|name| format!("custom:{}", name)))
            .collect();
        actions.sort_unstable();
        actions
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("actions", &self.actions())
            .finish()
    }
}
