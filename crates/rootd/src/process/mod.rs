//! Daemon process lifecycle: privileges, singleton guard, launch, shutdown.

mod errors;
mod guard;
mod launch;
mod paths;
mod privileges;
mod shutdown;

pub use errors::LaunchError;
pub use launch::run_daemon;

#[cfg(test)]
pub(crate) use launch::run_daemon_with;
#[cfg(test)]
pub(crate) use privileges::test_support::{DeniedPolicy, PermissivePolicy};
#[cfg(test)]
pub(crate) use shutdown::{ShutdownError, ShutdownSignal};

pub(crate) const PROCESS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::process");
