//! Module framework for the rootd privilege-separated daemon.
//!
//! The `rootd-modules` crate implements everything between the wire protocol
//! and the operating system: the capability contract every extension module
//! satisfies, the registry that owns module lifecycle, the command
//! dispatcher that checks each request against declared capabilities before
//! any parameter reaches module code, the external-tool runner privileged
//! actions go through, and the built-in modules themselves.
//!
//! # Architecture
//!
//! The daemon holds one [`ModuleRegistry`] built at startup from the
//! compiled-in table in [`builtin`], shares it with every connection worker,
//! and routes each `execute_command` request through a
//! [`CommandDispatcher`]. The dispatcher is the single trust checkpoint: a
//! request for an action a module did not declare is rejected before the
//! module sees it, and modules additionally reject undeclared actions
//! themselves via their [`ActionTable`].
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use rootd_modules::{CommandDispatcher, ModuleRegistry, SystemInfoModule};
//! use rootd_protocol::CommandRequest;
//!
//! let registry = Arc::new(ModuleRegistry::new());
//! registry
//!     .register(Arc::new(SystemInfoModule::new()))
//!     .expect("registration succeeds");
//!
//! let dispatcher = CommandDispatcher::new(registry);
//! let request = CommandRequest::new("systeminfo", "get_hostname", Default::default());
//! assert!(dispatcher.dispatch(&request).is_success());
//! ```

pub mod actions;
pub mod builtin;
pub mod dispatcher;
pub mod error;
pub mod module;
pub mod registry;
pub mod tool;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use self::actions::{ActionHandler, ActionTable};
pub use self::builtin::{FirewalldModule, ModuleConstructor, SystemInfoModule, builtin_modules};
pub use self::dispatcher::CommandDispatcher;
pub use self::error::ModuleError;
pub use self::module::{Module, optional_bool, required_str};
pub use self::registry::ModuleRegistry;
pub use self::tool::{DEFAULT_TOOL_TIMEOUT, ToolCommand, ToolOutput};
