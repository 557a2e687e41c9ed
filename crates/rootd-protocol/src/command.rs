//! Typed payloads for the `execute_command` exchange.
//!
//! A [`CommandRequest`] names a module, one of its declared actions, and a
//! bag of named parameters. The daemon validates the request shape before the
//! capability checkpoint runs, and folds the outcome into a
//! [`CommandResponse`] that is embedded in the response envelope's payload.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::envelope::Data;
use crate::error::ProtocolError;

/// Named arguments forwarded verbatim to a module action.
pub type Parameters = Map<String, Value>;

/// Request to execute a declared module action.
///
/// # Example
///
/// ```
/// use rootd_protocol::CommandRequest;
///
/// let request = CommandRequest::new("systeminfo", "get_hostname", Default::default());
/// assert_eq!(request.module(), "systeminfo");
/// assert_eq!(request.action(), "get_hostname");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandRequest {
    module: String,
    action: String,
    #[serde(default)]
    parameters: Parameters,
}

impl CommandRequest {
    /// Creates a command request from its parts.
    #[must_use]
    pub fn new(
        module: impl Into<String>,
        action: impl Into<String>,
        parameters: Parameters,
    ) -> Self {
        Self {
            module: module.into(),
            action: action.into(),
            parameters,
        }
    }

    /// Parses a command request out of an envelope payload.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidCommand`] when the payload does not
    /// match the request schema.
    pub fn from_data(data: &Data) -> Result<Self, ProtocolError> {
        serde_json::from_value(Value::Object(data.clone()))
            .map_err(|source| ProtocolError::invalid_command(source.to_string()))
    }

    /// Checks that the module and action identifiers are non-empty.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidCommand`] naming the missing field.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        if self.module.trim().is_empty() {
            return Err(ProtocolError::invalid_command("module name is required"));
        }
        if self.action.trim().is_empty() {
            return Err(ProtocolError::invalid_command("action is required"));
        }
        Ok(())
    }

    /// Returns the target module name.
    #[must_use]
    pub const fn module(&self) -> &str {
        self.module.as_str()
    }

    /// Returns the requested action name.
    #[must_use]
    pub const fn action(&self) -> &str {
        self.action.as_str()
    }

    /// Returns the named parameters.
    #[must_use]
    pub const fn parameters(&self) -> &Parameters {
        &self.parameters
    }
}

/// Outcome of executing a module action.
///
/// Exactly one of `data` and `error` is meaningful, selected by the
/// `success` flag; the other field is omitted from the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandResponse {
    success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl CommandResponse {
    /// Creates a successful response carrying the module's result.
    #[must_use]
    pub const fn success(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// Creates a failed response carrying an error description.
    #[must_use]
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }

    /// Returns whether the action completed successfully.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.success
    }

    /// Returns the result payload, when present.
    #[must_use]
    pub const fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    /// Returns the error description, when present.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Converts the response into an envelope payload object.
    #[must_use]
    pub fn into_data(self) -> Data {
        let mut data = Data::new();
        data.insert(String::from("success"), Value::Bool(self.success));
        if let Some(value) = self.data {
            data.insert(String::from("data"), value);
        }
        if let Some(error) = self.error {
            data.insert(String::from("error"), Value::String(error));
        }
        data
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn data_from(value: Value) -> Data {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn parses_request_from_payload() {
        let data = data_from(json!({
            "module": "firewalld",
            "action": "add_port",
            "parameters": {"zone": "public", "port": "8080/tcp"}
        }));
        let request = CommandRequest::from_data(&data).expect("parse request");
        assert_eq!(request.module(), "firewalld");
        assert_eq!(request.action(), "add_port");
        assert_eq!(request.parameters().get("zone"), Some(&json!("public")));
    }

    #[test]
    fn missing_parameters_default_to_empty() {
        let data = data_from(json!({"module": "systeminfo", "action": "get_info"}));
        let request = CommandRequest::from_data(&data).expect("parse request");
        assert!(request.parameters().is_empty());
    }

    #[test]
    fn rejects_non_object_parameters() {
        let data = data_from(json!({
            "module": "systeminfo",
            "action": "get_info",
            "parameters": "not a map"
        }));
        let error = CommandRequest::from_data(&data).expect_err("scalar parameters");
        assert!(matches!(error, ProtocolError::InvalidCommand { .. }));
    }

    #[test]
    fn validate_rejects_empty_module() {
        let request = CommandRequest::new("", "get_info", Parameters::new());
        let error = request.validate().expect_err("empty module");
        assert!(error.to_string().contains("module name is required"));
    }

    #[test]
    fn validate_rejects_empty_action() {
        let request = CommandRequest::new("systeminfo", "  ", Parameters::new());
        let error = request.validate().expect_err("blank action");
        assert!(error.to_string().contains("action is required"));
    }

    #[test]
    fn success_payload_omits_error_field() {
        let response = CommandResponse::success(json!({"hostname": "venus"}));
        let data = response.into_data();
        assert_eq!(data.get("success"), Some(&json!(true)));
        assert_eq!(data.get("data"), Some(&json!({"hostname": "venus"})));
        assert!(!data.contains_key("error"));
    }

    #[test]
    fn failure_payload_omits_data_field() {
        let response = CommandResponse::failure("tool call failed");
        assert!(!response.is_success());
        let data = response.into_data();
        assert_eq!(data.get("success"), Some(&json!(false)));
        assert_eq!(data.get("error"), Some(&json!("tool call failed")));
        assert!(!data.contains_key("data"));
    }
}
