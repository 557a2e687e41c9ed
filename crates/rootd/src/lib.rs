//! The rootd privilege-separated system management daemon.
//!
//! `rootd` runs with full administrative privileges and exposes a
//! deliberately constrained, enumerable command surface to a single
//! unprivileged peer over a local socket. Root-level capability is funnelled
//! through an explicit module registry: every action a module can perform is
//! declared up front as a capability, validated before any untrusted
//! parameter reaches module code, and nothing outside the compiled-in module
//! table can be loaded.
//!
//! The channel itself is protected by filesystem access control, not by the
//! protocol: the socket is owned by root with mode `0660` and its group set
//! to the configured client group. A peer that can open the socket is
//! implicitly trusted.
//!
//! # Lifecycle
//!
//! Startup verifies the effective uid, acquires a singleton lock, registers
//! the configured modules (skipping, not aborting on, per-module failures),
//! binds and secures the socket, and serves one request per connection on a
//! dedicated thread until a termination signal arrives. Shutdown stops the
//! accept loop, removes the socket file, and shuts every module down.

pub mod cli;
pub mod telemetry;

mod dispatch;
mod process;
mod transport;

pub use cli::Cli;
pub use process::{LaunchError, run_daemon};

#[cfg(test)]
mod tests;
