//! Startup privilege verification.
//!
//! The daemon is only useful with full administrative privileges; starting
//! without them would leave every module action failing at the tool layer,
//! so the check fails fast before any other startup work. The policy is a
//! trait so tests can run the launch sequence unprivileged.

use nix::unistd::Uid;

use super::errors::LaunchError;

/// Decides whether the process holds the privilege the daemon requires.
pub(crate) trait PrivilegePolicy {
    /// Verifies the privilege requirement.
    ///
    /// # Errors
    ///
    /// Returns [`LaunchError::Privilege`] when the requirement is unmet.
    fn ensure_privileged(&self) -> Result<(), LaunchError>;
}

/// Production policy: the effective uid must be root.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct RootPrivilegePolicy;

impl PrivilegePolicy for RootPrivilegePolicy {
    fn ensure_privileged(&self) -> Result<(), LaunchError> {
        let euid = Uid::effective();
        if euid.is_root() {
            Ok(())
        } else {
            Err(LaunchError::Privilege { uid: euid.as_raw() })
        }
    }
}
