//! The single trust checkpoint between untrusted requests and module code.
//!
//! The [`CommandDispatcher`] enforces a strict ordering for every
//! [`CommandRequest`]: resolve the module, check the requested action against
//! that module's current declared capabilities, and only then forward the
//! parameters to [`Module::execute`](crate::Module::execute). Untrusted
//! parameters never reach module code before the action is confirmed
//! declared.
//!
//! The declared parameter schemas are introspection metadata; the dispatcher
//! does not type-check individual parameter values against them.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

use rootd_protocol::{CommandRequest, CommandResponse};

use crate::error::ModuleError;
use crate::registry::ModuleRegistry;

const DISPATCH_TARGET: &str = "rootd_modules::dispatcher";

/// Validates command requests against declared capabilities and routes them.
pub struct CommandDispatcher {
    registry: Arc<ModuleRegistry>,
}

impl CommandDispatcher {
    /// Creates a dispatcher over a shared registry.
    #[must_use]
    pub const fn new(registry: Arc<ModuleRegistry>) -> Self {
        Self { registry }
    }

    /// Returns the registry this dispatcher resolves modules from.
    #[must_use]
    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    /// Validates and executes a command request.
    ///
    /// Capability-checkpoint failures and module execution errors are folded
    /// into a failed [`CommandResponse`]; they are caller-visible outcomes,
    /// not daemon faults.
    #[must_use]
    pub fn dispatch(&self, request: &CommandRequest) -> CommandResponse {
        match self.run(request) {
            Ok(result) => CommandResponse::success(result),
            Err(error) => CommandResponse::failure(error.to_string()),
        }
    }

    fn run(&self, request: &CommandRequest) -> Result<Value, ModuleError> {
        let module = self
            .registry
            .get(request.module())
            .ok_or_else(|| ModuleError::not_found(request.module()))?;

        let declared = module.capabilities();
        if !declared
            .iter()
            .any(|capability| capability.name() == request.action())
        {
            debug!(
                target: DISPATCH_TARGET,
                module = request.module(),
                action = request.action(),
                "rejected undeclared action"
            );
            return Err(ModuleError::unknown_action(
                request.module(),
                request.action(),
            ));
        }

        info!(
            target: DISPATCH_TARGET,
            module = request.module(),
            action = request.action(),
            "executing command"
        );
        module.execute(request.action(), request.parameters())
    }
}
