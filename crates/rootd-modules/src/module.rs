//! The capability contract every extension module implements.
//!
//! A module owns one functional domain and publishes a static list of
//! [`ModuleCapability`] entries describing every action it can perform. The
//! daemon's command dispatcher consults that list before any untrusted
//! parameters reach module code; a module therefore cannot acquire
//! capabilities it did not declare up front.

use serde_json::Value;

use rootd_protocol::{ModuleCapability, ModuleInfo, Parameters};

use crate::error::ModuleError;

/// Contract implemented by every extension module.
///
/// Modules are shared across all connection workers, so implementations must
/// be [`Send`] and [`Sync`] and guard any mutable state of their own; the
/// built-in modules sidestep this by holding none.
pub trait Module: Send + Sync {
    /// Unique module name.
    fn name(&self) -> &str;

    /// Module version string.
    fn version(&self) -> &str;

    /// Human-readable module description.
    fn description(&self) -> &str;

    /// Returns the complete list of capabilities this module supports.
    ///
    /// This list is the sole authority the dispatcher consults; it must be
    /// exhaustive and must not change after [`Module::initialize`] succeeds.
    fn capabilities(&self) -> Vec<ModuleCapability>;

    /// Performs one-time setup, verifying prerequisites.
    ///
    /// # Errors
    ///
    /// Returns a descriptive [`ModuleError`] when a prerequisite is unmet.
    /// The registry skips such a module without aborting the daemon.
    fn initialize(&self) -> Result<(), ModuleError>;

    /// Releases module resources during controlled shutdown.
    ///
    /// # Errors
    ///
    /// Returns a [`ModuleError`] describing a partial cleanup; the registry
    /// logs the failure and continues tearing down the remaining modules.
    fn shutdown(&self) -> Result<(), ModuleError>;

    /// Executes an action already confirmed to be declared.
    ///
    /// The dispatcher guarantees `action` is in the declared capability set
    /// before calling this method; implementations still reject unknown
    /// actions as a second line of defence.
    ///
    /// # Errors
    ///
    /// Returns a [`ModuleError`] when the action fails.
    fn execute(&self, action: &str, parameters: &Parameters) -> Result<Value, ModuleError>;

    /// Assembles the module's self-description from the live capability list.
    fn info(&self) -> ModuleInfo {
        ModuleInfo::new(
            self.name(),
            self.version(),
            self.description(),
            self.capabilities(),
        )
    }
}

/// Extracts a required string parameter.
///
/// # Errors
///
/// Returns [`ModuleError::MissingParameter`] when absent and
/// [`ModuleError::InvalidParameter`] when present with another JSON type.
pub fn required_str<'a>(parameters: &'a Parameters, name: &str) -> Result<&'a str, ModuleError> {
    let value = parameters
        .get(name)
        .ok_or_else(|| ModuleError::MissingParameter {
            name: name.to_owned(),
        })?;
    value.as_str().ok_or_else(|| ModuleError::InvalidParameter {
        name: name.to_owned(),
        expected: "string",
    })
}

/// Extracts an optional boolean parameter, defaulting to `false`.
///
/// # Errors
///
/// Returns [`ModuleError::InvalidParameter`] when the parameter is present
/// with a non-boolean value.
pub fn optional_bool(parameters: &Parameters, name: &str) -> Result<bool, ModuleError> {
    match parameters.get(name) {
        None => Ok(false),
        Some(value) => value.as_bool().ok_or_else(|| ModuleError::InvalidParameter {
            name: name.to_owned(),
            expected: "boolean",
        }),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn parameters_from(value: Value) -> Parameters {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn required_str_returns_value() {
        let parameters = parameters_from(json!({"zone": "public"}));
        assert_eq!(required_str(&parameters, "zone").expect("zone"), "public");
    }

    #[test]
    fn required_str_rejects_missing_parameter() {
        let parameters = Parameters::new();
        let error = required_str(&parameters, "zone").expect_err("missing");
        assert!(matches!(error, ModuleError::MissingParameter { .. }));
    }

    #[test]
    fn required_str_rejects_wrong_type() {
        let parameters = parameters_from(json!({"zone": 5}));
        let error = required_str(&parameters, "zone").expect_err("wrong type");
        assert!(matches!(
            error,
            ModuleError::InvalidParameter {
                expected: "string",
                ..
            }
        ));
    }

    #[test]
    fn optional_bool_defaults_to_false() {
        let parameters = Parameters::new();
        assert!(!optional_bool(&parameters, "permanent").expect("default"));
    }

    #[test]
    fn optional_bool_rejects_wrong_type() {
        let parameters = parameters_from(json!({"permanent": "yes"}));
        let error = optional_bool(&parameters, "permanent").expect_err("wrong type");
        assert!(matches!(error, ModuleError::InvalidParameter { .. }));
    }
}
