//! Action dispatch tables keeping capabilities and handlers in lock-step.
//!
//! Each built-in module constructs an [`ActionTable`] once at creation time.
//! Every entry pairs a [`ModuleCapability`] with the handler that implements
//! it, so the declared capability list is derived from the table and cannot
//! drift from the set of runnable actions. Duplicate action names are caught
//! by an assertion while the table is being built, before the daemon starts
//! serving requests.

use std::collections::HashMap;

use serde_json::Value;

use rootd_protocol::{ModuleCapability, Parameters};

use crate::error::ModuleError;

/// Handler function implementing one declared action of module `M`.
pub type ActionHandler<M> = fn(&M, &Parameters) -> Result<Value, ModuleError>;

struct ActionEntry<M> {
    capability: ModuleCapability,
    handler: ActionHandler<M>,
}

/// Dispatch table mapping declared action names to handlers.
///
/// # Example
///
/// ```
/// use rootd_modules::{ActionTable, ModuleError};
/// use rootd_protocol::{ModuleCapability, Parameters};
/// use serde_json::{Value, json};
///
/// struct Echo;
///
/// fn ping(_module: &Echo, _parameters: &Parameters) -> Result<Value, ModuleError> {
///     Ok(json!({"pong": true}))
/// }
///
/// let table = ActionTable::new("echo")
///     .action(ModuleCapability::new("ping", "Acknowledge"), ping);
/// assert_eq!(table.capabilities().len(), 1);
/// ```
pub struct ActionTable<M> {
    module: String,
    entries: Vec<ActionEntry<M>>,
    index: HashMap<String, usize>,
}

impl<M> ActionTable<M> {
    /// Creates an empty table for the named module.
    #[must_use]
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Adds a capability together with the handler that implements it.
    ///
    /// # Panics
    ///
    /// Panics when an entry with the same action name already exists. Tables
    /// are built once during module construction, so a duplicate is a
    /// programming error caught before the daemon begins serving.
    #[must_use]
    pub fn action(mut self, capability: ModuleCapability, handler: ActionHandler<M>) -> Self {
        let name = capability.name().to_owned();
        assert!(
            !self.index.contains_key(&name),
            "duplicate action '{name}' in module '{}'",
            self.module
        );
        self.index.insert(name, self.entries.len());
        self.entries.push(ActionEntry {
            capability,
            handler,
        });
        self
    }

    /// Returns the declared capabilities in declaration order.
    #[must_use]
    pub fn capabilities(&self) -> Vec<ModuleCapability> {
        self.entries
            .iter()
            .map(|entry| entry.capability.clone())
            .collect()
    }

    /// Returns `true` when the action is declared.
    #[must_use]
    pub fn contains(&self, action: &str) -> bool {
        self.index.contains_key(action)
    }

    /// Looks up and runs the handler for an action.
    ///
    /// # Errors
    ///
    /// Returns [`ModuleError::UnknownAction`] when the action is not in the
    /// table, or whatever error the handler produces.
    pub fn dispatch(
        &self,
        module: &M,
        action: &str,
        parameters: &Parameters,
    ) -> Result<Value, ModuleError> {
        let entry = self
            .index
            .get(action)
            .and_then(|position| self.entries.get(*position))
            .ok_or_else(|| ModuleError::unknown_action(&self.module, action))?;
        (entry.handler)(module, parameters)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    struct Probe;

    fn succeed(_module: &Probe, _parameters: &Parameters) -> Result<Value, ModuleError> {
        Ok(json!({"ok": true}))
    }

    fn fail(_module: &Probe, _parameters: &Parameters) -> Result<Value, ModuleError> {
        Err(ModuleError::execution("probe", "broken", "intentional"))
    }

    fn table() -> ActionTable<Probe> {
        ActionTable::new("probe")
            .action(ModuleCapability::new("works", "Always succeeds"), succeed)
            .action(ModuleCapability::new("broken", "Always fails"), fail)
    }

    #[test]
    fn capabilities_match_entries_in_order() {
        let names: Vec<String> = table()
            .capabilities()
            .iter()
            .map(|capability| capability.name().to_owned())
            .collect();
        assert_eq!(names, vec!["works", "broken"]);
    }

    #[test]
    fn dispatch_runs_the_matching_handler() {
        let result = table()
            .dispatch(&Probe, "works", &Parameters::new())
            .expect("handler runs");
        assert_eq!(result, json!({"ok": true}));
    }

    #[test]
    fn dispatch_propagates_handler_errors() {
        let error = table()
            .dispatch(&Probe, "broken", &Parameters::new())
            .expect_err("handler error");
        assert!(matches!(error, ModuleError::Execution { .. }));
    }

    #[test]
    fn dispatch_rejects_undeclared_actions() {
        let error = table()
            .dispatch(&Probe, "missing", &Parameters::new())
            .expect_err("unknown action");
        assert!(matches!(error, ModuleError::UnknownAction { .. }));
    }

    #[test]
    #[should_panic(expected = "duplicate action 'works'")]
    fn duplicate_actions_are_rejected_at_construction() {
        let _ = table().action(ModuleCapability::new("works", "Duplicate"), succeed);
    }
}
