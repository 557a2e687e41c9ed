//! Built-in firewall management module wrapping `firewall-cmd`.
//!
//! Covers zone, service, port, and rich-rule management plus the query
//! operations a dashboard needs. Every action forwards to the external tool
//! through the shared [`ToolCommand`] runner with an argv vector, so no user
//! input is ever interpolated into a shell string. The module keeps no state
//! of its own; each call is one tool invocation.

use std::time::Duration;

use serde_json::{Value, json};
use tracing::{info, warn};

use rootd_protocol::{CapabilityParameter, ModuleCapability, ParameterKind, Parameters};

use crate::actions::ActionTable;
use crate::error::ModuleError;
use crate::module::{Module, optional_bool, required_str};
use crate::tool::{DEFAULT_TOOL_TIMEOUT, ToolCommand, ToolOutput};

const MODULE_NAME: &str = "firewalld";
const MODULE_VERSION: &str = "1.0.0";
const MODULE_DESCRIPTION: &str = "Manages firewalld zones, services, ports, and rules";
const FIREWALLD_TARGET: &str = "rootd_modules::firewalld";

/// Time budget for the short probes run during initialisation.
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Manages firewalld configuration through `firewall-cmd`.
pub struct FirewalldModule {
    actions: ActionTable<Self>,
    firewall_cmd: String,
    systemctl: String,
    action_timeout: Duration,
}

impl FirewalldModule {
    /// Creates the module with the stock tool names on `PATH`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            actions: Self::action_table(),
            firewall_cmd: String::from("firewall-cmd"),
            systemctl: String::from("systemctl"),
            action_timeout: DEFAULT_TOOL_TIMEOUT,
        }
    }

    fn action_table() -> ActionTable<Self> {
        let zone = || CapabilityParameter::new("zone", ParameterKind::String, "Zone name").required();
        let permanent = || {
            CapabilityParameter::new(
                "permanent",
                ParameterKind::Boolean,
                "Apply to the permanent configuration",
            )
        };

        ActionTable::new(MODULE_NAME)
            // Query operations
            .action(
                ModuleCapability::new("get_status", "Get firewalld running status"),
                Self::get_status,
            )
            .action(
                ModuleCapability::new("get_version", "Get firewalld version"),
                Self::get_version,
            )
            .action(
                ModuleCapability::new("list_zones", "List all zones"),
                Self::list_zones,
            )
            .action(
                ModuleCapability::new("get_zone", "Get zone configuration").with_parameter(zone()),
                Self::get_zone,
            )
            .action(
                ModuleCapability::new("get_default_zone", "Get default zone"),
                Self::get_default_zone,
            )
            .action(
                ModuleCapability::new("list_services", "List available services"),
                Self::list_services,
            )
            // Zone operations
            .action(
                ModuleCapability::new("set_default_zone", "Set default zone")
                    .with_parameter(zone()),
                Self::set_default_zone,
            )
            // Service operations
            .action(
                ModuleCapability::new("add_service", "Add service to zone")
                    .with_parameter(zone())
                    .with_parameter(
                        CapabilityParameter::new(
                            "service",
                            ParameterKind::String,
                            "Service name",
                        )
                        .required(),
                    )
                    .with_parameter(permanent()),
                Self::add_service,
            )
            .action(
                ModuleCapability::new("remove_service", "Remove service from zone")
                    .with_parameter(zone())
                    .with_parameter(
                        CapabilityParameter::new(
                            "service",
                            ParameterKind::String,
                            "Service name",
                        )
                        .required(),
                    )
                    .with_parameter(permanent()),
                Self::remove_service,
            )
            // Port operations
            .action(
                ModuleCapability::new("add_port", "Add port to zone")
                    .with_parameter(zone())
                    .with_parameter(
                        CapabilityParameter::new(
                            "port",
                            ParameterKind::String,
                            "Port/protocol (e.g. 8080/tcp)",
                        )
                        .required(),
                    )
                    .with_parameter(permanent()),
                Self::add_port,
            )
            .action(
                ModuleCapability::new("remove_port", "Remove port from zone")
                    .with_parameter(zone())
                    .with_parameter(
                        CapabilityParameter::new(
                            "port",
                            ParameterKind::String,
                            "Port/protocol (e.g. 8080/tcp)",
                        )
                        .required(),
                    )
                    .with_parameter(permanent()),
                Self::remove_port,
            )
            // Rich rule operations
            .action(
                ModuleCapability::new("add_rich_rule", "Add rich rule to zone")
                    .with_parameter(zone())
                    .with_parameter(
                        CapabilityParameter::new("rule", ParameterKind::String, "Rich rule")
                            .required(),
                    )
                    .with_parameter(permanent()),
                Self::add_rich_rule,
            )
            .action(
                ModuleCapability::new("remove_rich_rule", "Remove rich rule from zone")
                    .with_parameter(zone())
                    .with_parameter(
                        CapabilityParameter::new("rule", ParameterKind::String, "Rich rule")
                            .required(),
                    )
                    .with_parameter(permanent()),
                Self::remove_rich_rule,
            )
            // Control operations
            .action(
                ModuleCapability::new("reload", "Reload firewalld configuration"),
                Self::reload,
            )
    }

    /// Runs `firewall-cmd` with the given arguments, requiring exit zero.
    fn firewall(&self, args: Vec<String>) -> Result<ToolOutput, ModuleError> {
        ToolCommand::new(&self.firewall_cmd)
            .args(args)
            .timeout(self.action_timeout)
            .run()?
            .require_success(&self.firewall_cmd)
    }

    fn service_state(&self) -> Result<ToolOutput, ModuleError> {
        ToolCommand::new(&self.systemctl)
            .args(["is-active", "firewalld"])
            .timeout(PROBE_TIMEOUT)
            .run()
    }

    fn get_status(&self, _parameters: &Parameters) -> Result<Value, ModuleError> {
        let output = self.service_state()?;
        let status = output.stdout().trim().to_owned();
        Ok(json!({"active": status == "active", "status": status}))
    }

    fn get_version(&self, _parameters: &Parameters) -> Result<Value, ModuleError> {
        let output = self.firewall(vec![String::from("--version")])?;
        Ok(json!({"version": output.stdout().trim()}))
    }

    fn list_zones(&self, _parameters: &Parameters) -> Result<Value, ModuleError> {
        let output = self.firewall(vec![String::from("--get-zones")])?;
        Ok(json!({"zones": split_listing(output.stdout())}))
    }

    fn get_zone(&self, parameters: &Parameters) -> Result<Value, ModuleError> {
        let zone = required_str(parameters, "zone")?;
        let output = self.firewall(vec![
            String::from("--zone"),
            zone.to_owned(),
            String::from("--list-all"),
        ])?;
        Ok(json!({"zone": zone, "config": output.stdout()}))
    }

    fn get_default_zone(&self, _parameters: &Parameters) -> Result<Value, ModuleError> {
        let output = self.firewall(vec![String::from("--get-default-zone")])?;
        Ok(json!({"default_zone": output.stdout().trim()}))
    }

    fn list_services(&self, _parameters: &Parameters) -> Result<Value, ModuleError> {
        let output = self.firewall(vec![String::from("--get-services")])?;
        Ok(json!({"services": split_listing(output.stdout())}))
    }

    fn set_default_zone(&self, parameters: &Parameters) -> Result<Value, ModuleError> {
        let zone = required_str(parameters, "zone")?;
        self.firewall(vec![String::from("--set-default-zone"), zone.to_owned()])?;
        Ok(json!({"default_zone": zone}))
    }

    fn add_service(&self, parameters: &Parameters) -> Result<Value, ModuleError> {
        self.zone_scoped("--add-service", "service", parameters)
    }

    fn remove_service(&self, parameters: &Parameters) -> Result<Value, ModuleError> {
        self.zone_scoped("--remove-service", "service", parameters)
    }

    fn add_port(&self, parameters: &Parameters) -> Result<Value, ModuleError> {
        self.zone_scoped("--add-port", "port", parameters)
    }

    fn remove_port(&self, parameters: &Parameters) -> Result<Value, ModuleError> {
        self.zone_scoped("--remove-port", "port", parameters)
    }

    fn add_rich_rule(&self, parameters: &Parameters) -> Result<Value, ModuleError> {
        self.zone_scoped("--add-rich-rule", "rule", parameters)
    }

    fn remove_rich_rule(&self, parameters: &Parameters) -> Result<Value, ModuleError> {
        self.zone_scoped("--remove-rich-rule", "rule", parameters)
    }

    fn reload(&self, _parameters: &Parameters) -> Result<Value, ModuleError> {
        self.firewall(vec![String::from("--reload")])?;
        Ok(json!({"reloaded": true}))
    }

    /// Shared body of the add/remove operations scoped to a zone.
    fn zone_scoped(
        &self,
        flag: &str,
        parameter: &str,
        parameters: &Parameters,
    ) -> Result<Value, ModuleError> {
        let zone = required_str(parameters, "zone")?;
        let value = required_str(parameters, parameter)?;
        let permanent = optional_bool(parameters, "permanent")?;
        self.firewall(zone_scoped_args(flag, zone, value, permanent))?;

        let mut result = Parameters::new();
        result.insert(String::from("zone"), Value::String(zone.to_owned()));
        result.insert(parameter.to_owned(), Value::String(value.to_owned()));
        result.insert(String::from("permanent"), Value::Bool(permanent));
        Ok(Value::Object(result))
    }
}

impl Default for FirewalldModule {
    fn default() -> Self {
        Self::new()
    }
}

impl Module for FirewalldModule {
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
        let probe = ToolCommand::new(&self.firewall_cmd)
            .arg("--version")
            .timeout(PROBE_TIMEOUT)
            .run()
            .map_err(|_| {
                ModuleError::unavailable("firewall-cmd not found; is firewalld installed?")
            })?;
        if !probe.success() {
            return Err(ModuleError::unavailable(format!(
                "firewall-cmd is not usable: {}",
                probe.stderr().trim()
            )));
        }

        match self.service_state() {
            Ok(state) if state.stdout().trim() == "active" => {}
            Ok(state) => warn!(
                target: FIREWALLD_TARGET,
                status = state.stdout().trim(),
                "firewalld service is not active"
            ),
            Err(probe_error) => warn!(
                target: FIREWALLD_TARGET,
                error = %probe_error,
                "could not query firewalld service state"
            ),
        }

        info!(target: FIREWALLD_TARGET, "firewalld module initialised");
        Ok(())
    }

    fn shutdown(&self) -> Result<(), ModuleError> {
        info!(target: FIREWALLD_TARGET, "firewalld module shutting down");
        Ok(())
    }

    fn execute(&self, action: &str, parameters: &Parameters) -> Result<Value, ModuleError> {
        self.actions.dispatch(self, action, parameters)
    }
}

/// Splits a whitespace-separated tool listing into its entries.
fn split_listing(stdout: &str) -> Vec<String> {
    stdout.split_whitespace().map(String::from).collect()
}

/// Builds the argv tail for an add/remove operation scoped to a zone.
fn zone_scoped_args(flag: &str, zone: &str, value: &str, permanent: bool) -> Vec<String> {
    let mut args = vec![format!("--zone={zone}"), format!("{flag}={value}")];
    if permanent {
        args.push(String::from("--permanent"));
    }
    args
}
