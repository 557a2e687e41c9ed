//! Supervises the daemon launch sequence and runtime orchestration.
//!
//! Startup order is part of the security contract: privileges are verified
//! before anything touches the filesystem, the module set is fixed before
//! the channel opens, and the channel is bound and access-controlled before
//! the first connection can arrive.

use std::sync::Arc;

use tracing::{info, warn};

use rootd_config::Config;
use rootd_modules::{ModuleRegistry, builtin_modules};

use crate::dispatch::{MessageProcessor, RequestConnectionHandler};
use crate::transport::SocketListener;

use super::PROCESS_TARGET;
use super::errors::LaunchError;
use super::guard::ProcessGuard;
use super::paths::ProcessPaths;
use super::privileges::{PrivilegePolicy, RootPrivilegePolicy};
use super::shutdown::{ShutdownSignal, SystemShutdownSignal};

/// Runs the daemon with the production collaborators.
///
/// Blocks until a termination signal arrives and the shutdown sequence has
/// completed.
///
/// # Errors
///
/// Returns a [`LaunchError`] for fatal startup failures: missing root
/// privilege, another live daemon instance, or an unusable channel.
pub fn run_daemon(config: &Config) -> Result<(), LaunchError> {
    run_daemon_with(config, &RootPrivilegePolicy, &SystemShutdownSignal)
}

/// Runs the daemon with injected collaborators.
pub(crate) fn run_daemon_with<P, S>(
    config: &Config,
    privileges: &P,
    shutdown: &S,
) -> Result<(), LaunchError>
where
    P: PrivilegePolicy,
    S: ShutdownSignal,
{
    privileges.ensure_privileged()?;

    config.socket.prepare_filesystem()?;
    let paths = ProcessPaths::from_endpoint(&config.socket)?;
    let guard = ProcessGuard::acquire(paths)?;
    guard.write_pid(std::process::id())?;

    let registry = build_registry(config);

    let listener = SocketListener::bind(&config.socket, &config.client_group)?;
    let handler = Arc::new(RequestConnectionHandler::new(MessageProcessor::new(
        Arc::clone(&registry),
    )));
    let listener_handle = listener.start(handler)?;

    info!(
        target: PROCESS_TARGET,
        endpoint = %config.socket,
        "daemon ready"
    );

    let outcome = shutdown.wait();

    listener_handle.shutdown();
    listener_handle.join()?;
    registry.shutdown_all();
    drop(guard);

    info!(target: PROCESS_TARGET, "shutdown sequence completed");
    outcome.map_err(LaunchError::from)
}

/// Builds the registry from the compiled-in table and the allow-list.
///
/// A module that fails to initialise is logged and skipped; the daemon
/// continues with the remaining modules.
fn build_registry(config: &Config) -> Arc<ModuleRegistry> {
    let registry = ModuleRegistry::new();
    for (name, constructor) in builtin_modules() {
        if !config.modules.iter().any(|enabled| enabled == name) {
            info!(
                target: PROCESS_TARGET,
                module = name,
                "module disabled by configuration"
            );
            continue;
        }
        if let Err(error) = registry.register(constructor()) {
            warn!(
                target: PROCESS_TARGET,
                module = name,
                error = %error,
                "skipping module"
            );
        }
    }
    info!(
        target: PROCESS_TARGET,
        count = registry.len(),
        modules = ?registry.module_names(),
        "modules registered"
    );
    Arc::new(registry)
}
