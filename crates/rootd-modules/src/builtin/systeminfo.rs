//! Built-in system information module.
//!
//! Always registered, read-only, and free of privileged operations: every
//! action reports kernel, distribution, or uptime facts gathered from system
//! calls and well-known `proc` files. The module holds no mutable state and
//! spawns no subprocesses.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use serde_json::{Value, json};
use tracing::info;

use rootd_protocol::{ModuleCapability, Parameters};

use crate::actions::ActionTable;
use crate::error::ModuleError;
use crate::module::Module;

const MODULE_NAME: &str = "systeminfo";
const MODULE_VERSION: &str = "1.0.0";
const MODULE_DESCRIPTION: &str = "Provides basic system information (hostname, OS, kernel, etc.)";
const SYSTEMINFO_TARGET: &str = "rootd_modules::systeminfo";

/// Provides read-only system information.
pub struct SystemInfoModule {
    actions: ActionTable<Self>,
    os_release_path: PathBuf,
    uptime_path: PathBuf,
}

impl SystemInfoModule {
    /// Creates the module with its full action table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            actions: Self::action_table(),
            os_release_path: PathBuf::from("/etc/os-release"),
            uptime_path: PathBuf::from("/proc/uptime"),
        }
    }

    fn action_table() -> ActionTable<Self> {
        ActionTable::new(MODULE_NAME)
            .action(
                ModuleCapability::new("get_info", "Get comprehensive system information"),
                Self::get_info,
            )
            .action(
                ModuleCapability::new("get_hostname", "Get system hostname"),
                Self::get_hostname,
            )
            .action(
                ModuleCapability::new("get_os_info", "Get operating system information"),
                Self::get_os_info,
            )
            .action(
                ModuleCapability::new("get_kernel_version", "Get kernel version"),
                Self::get_kernel_version,
            )
            .action(
                ModuleCapability::new("get_uptime", "Get system uptime"),
                Self::get_uptime,
            )
    }

    fn get_info(&self, _parameters: &Parameters) -> Result<Value, ModuleError> {
        let identity = os_identity()?;
        let kernel = identity.release.clone();
        Ok(json!({
            "hostname": hostname()?,
            "os": {
                "system": identity.system,
                "release": identity.release,
                "version": identity.version,
                "machine": identity.machine,
            },
            "kernel": kernel,
            "uptime_seconds": self.uptime_seconds(),
            "distribution": self.distribution(),
        }))
    }

    fn get_hostname(&self, _parameters: &Parameters) -> Result<Value, ModuleError> {
        Ok(json!({"hostname": hostname()?}))
    }

    fn get_os_info(&self, _parameters: &Parameters) -> Result<Value, ModuleError> {
        let identity = os_identity()?;
        Ok(json!({
            "system": identity.system,
            "release": identity.release,
            "version": identity.version,
            "machine": identity.machine,
            "distribution": self.distribution(),
        }))
    }

    fn get_kernel_version(&self, _parameters: &Parameters) -> Result<Value, ModuleError> {
        let identity = os_identity()?;
        Ok(json!({"kernel_version": identity.release}))
    }

    fn get_uptime(&self, _parameters: &Parameters) -> Result<Value, ModuleError> {
        Ok(uptime_breakdown(self.uptime_seconds()))
    }

    /// Reads the system uptime, reporting 0 when the source is unreadable.
    fn uptime_seconds(&self) -> u64 {
        fs::read_to_string(&self.uptime_path)
            .ok()
            .as_deref()
            .and_then(parse_uptime)
            .unwrap_or(0)
    }

    /// Reads distribution details, degrading to an unknown marker.
    fn distribution(&self) -> Value {
        fs::read_to_string(&self.os_release_path)
            .ok()
            .map_or_else(
                || json!({"name": "unknown"}),
                |content| {
                    let fields = parse_os_release(&content);
                    json!({
                        "name": fields.get("NAME").map_or("unknown", String::as_str),
                        "version": fields.get("VERSION").map_or("unknown", String::as_str),
                        "id": fields.get("ID").map_or("unknown", String::as_str),
                    })
                },
            )
    }
}

impl Default for SystemInfoModule {
    fn default() -> Self {
        Self::new()
    }
}

impl Module for SystemInfoModule {
    fn name(&self) -> &str {
        MODULE_NAME
    }

    fn version(&self) -> &str {
        MODULE_VERSION
    }

    fn description(&self) -> &str {
        MODULE_DESCRIPTION
    }

    fn capabilities(&self) -> Vec<ModuleCapability> {
        self.actions.capabilities()
    }

    fn initialize(&self) -> Result<(), ModuleError> {
        // No prerequisites to probe.
        info!(target: SYSTEMINFO_TARGET, "system info module initialised");
        Ok(())
    }

    fn shutdown(&self) -> Result<(), ModuleError> {
        info!(target: SYSTEMINFO_TARGET, "system info module shutting down");
        Ok(())
    }

    fn execute(&self, action: &str, parameters: &Parameters) -> Result<Value, ModuleError> {
        self.actions.dispatch(self, action, parameters)
    }
}

struct OsIdentity {
    system: String,
    release: String,
    version: String,
    machine: String,
}

fn os_identity() -> Result<OsIdentity, ModuleError> {
    let utsname = nix::sys::utsname::uname()
        .map_err(|errno| ModuleError::execution(MODULE_NAME, "uname", errno.to_string()))?;
    Ok(OsIdentity {
        system: utsname.sysname().to_string_lossy().into_owned(),
        release: utsname.release().to_string_lossy().into_owned(),
        version: utsname.version().to_string_lossy().into_owned(),
        machine: utsname.machine().to_string_lossy().into_owned(),
    })
}

fn hostname() -> Result<String, ModuleError> {
    nix::unistd::gethostname()
        .map(|name| name.to_string_lossy().into_owned())
        .map_err(|errno| ModuleError::execution(MODULE_NAME, "get_hostname", errno.to_string()))
}

/// Parses the first whole-second value out of `/proc/uptime` content.
fn parse_uptime(content: &str) -> Option<u64> {
    content
        .split_whitespace()
        .next()?
        .parse::<f64>()
        .ok()
        .map(|seconds| seconds.max(0.0) as u64)
}

/// Parses `KEY=VALUE` lines, stripping surrounding quotes from values.
fn parse_os_release(content: &str) -> BTreeMap<String, String> {
    content
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                return None;
            }
            let (key, value) = line.split_once('=')?;
            let value = value.trim().trim_matches('"');
            Some((key.trim().to_owned(), value.to_owned()))
        })
        .collect()
}

/// Splits an uptime into the payload reported by `get_uptime`.
fn uptime_breakdown(uptime_seconds: u64) -> Value {
    let days = uptime_seconds / 86_400;
    let hours = (uptime_seconds % 86_400) / 3_600;
    let minutes = (uptime_seconds % 3_600) / 60;
    json!({
        "uptime_seconds": uptime_seconds,
        "uptime_days": days,
        "uptime_hours": hours,
        "uptime_minutes": minutes,
        "uptime_formatted": format!("{days}d {hours}h {minutes}m"),
    })
}
