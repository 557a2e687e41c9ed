//! Domain errors raised by module operations.
//!
//! All errors use `thiserror`-derived enums with structured context so the
//! daemon can inspect the failure programmatically. Capability-checkpoint
//! failures ([`ModuleError::NotFound`], [`ModuleError::UnknownAction`]) are
//! ordinary caller-visible outcomes, never daemon-level faults.

use std::io;
use std::sync::Arc;

use thiserror::Error;

/// Errors arising from module registration, dispatch, and execution.
#[derive(Debug, Error)]
pub enum ModuleError {
    /// The requested module is not registered.
    #[error("module not found: {name}")]
    NotFound {
        /// Name that was looked up.
        name: String,
    },

    /// The requested action is not among the module's declared capabilities.
    #[error("unknown action '{action}' for module '{module}'")]
    UnknownAction {
        /// Module that was addressed.
        module: String,
        /// Action that was requested.
        action: String,
    },

    /// A module with the same name is already registered.
    #[error("module '{name}' is already registered")]
    AlreadyRegistered {
        /// Conflicting module name.
        name: String,
    },

    /// The module's one-time initialisation failed.
    #[error("failed to initialise module '{name}': {source}")]
    Initialization {
        /// Module that failed to initialise.
        name: String,
        /// Underlying failure.
        #[source]
        source: Box<ModuleError>,
    },

    /// A required prerequisite of the module is unavailable.
    #[error("{message}")]
    Unavailable {
        /// Description of the missing prerequisite.
        message: String,
    },

    /// A required parameter was not supplied.
    #[error("missing required parameter '{name}'")]
    MissingParameter {
        /// Parameter name.
        name: String,
    },

    /// A parameter was supplied with the wrong JSON type.
    #[error("parameter '{name}' must be a {expected}")]
    InvalidParameter {
        /// Parameter name.
        name: String,
        /// Expected JSON type.
        expected: &'static str,
    },

    /// An external tool could not be started.
    #[error("failed to run '{command}': {message}")]
    ToolSpawn {
        /// Program that failed to start.
        command: String,
        /// Human-readable failure description.
        message: String,
        /// Optional underlying I/O error.
        #[source]
        source: Option<Arc<io::Error>>,
    },

    /// An external tool did not complete within its time budget.
    #[error("'{command}' timed out after {timeout_secs}s")]
    ToolTimeout {
        /// Program that timed out.
        command: String,
        /// Configured timeout in seconds.
        timeout_secs: u64,
    },

    /// An external tool exited with a non-zero status.
    #[error("'{command}' failed with status {status}: {stderr}")]
    ToolFailed {
        /// Program that failed.
        command: String,
        /// Process exit status.
        status: i32,
        /// Captured standard error output.
        stderr: String,
    },

    /// An action failed for a module-specific reason.
    #[error("module '{module}' failed to execute '{action}': {message}")]
    Execution {
        /// Module that was executing.
        module: String,
        /// Action that failed.
        action: String,
        /// Description of the failure.
        message: String,
    },

    /// Invariant violation inside module infrastructure.
    #[error("internal module error: {message}")]
    Internal {
        /// Description of the violation.
        message: String,
    },
}

impl ModuleError {
    /// Creates a module-not-found error.
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }

    /// Creates an unknown-action error.
    pub fn unknown_action(module: impl Into<String>, action: impl Into<String>) -> Self {
        Self::UnknownAction {
            module: module.into(),
            action: action.into(),
        }
    }

    /// Creates an unavailable-prerequisite error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Creates an execution error for a module action.
    pub fn execution(
        module: impl Into<String>,
        action: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Execution {
            module: module.into(),
            action: action.into(),
            message: message.into(),
        }
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_action_names_both_identifiers() {
        let error = ModuleError::unknown_action("systeminfo", "delete_everything");
        let text = error.to_string();
        assert!(text.contains("delete_everything"));
        assert!(text.contains("systeminfo"));
    }

    #[test]
    fn initialization_error_chains_its_source() {
        let error = ModuleError::Initialization {
            name: String::from("firewalld"),
            source: Box::new(ModuleError::unavailable("firewall-cmd not found")),
        };
        assert!(error.to_string().contains("firewalld"));
        assert!(std::error::Error::source(&error).is_some());
    }
}
