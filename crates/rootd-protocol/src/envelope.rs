//! Message envelope shared by every request and response.
//!
//! A [`Message`] pairs a closed [`MessageType`] with a caller-supplied request
//! id and a free-form JSON object payload. The daemon echoes the request id
//! verbatim in its response so callers can correlate concurrent requests.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ProtocolError;

/// Payload carried by a message envelope.
///
/// The wire invariant is that `data` is always a JSON object; scalars and
/// arrays are rejected during deserialisation by construction of this type.
pub type Data = Map<String, Value>;

/// Closed set of message types understood by the daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    /// Liveness probe; answered with a `success` acknowledgement.
    Ping,
    /// Request the names of all registered modules.
    ListModules,
    /// Request the full self-description of a single module.
    ModuleInfo,
    /// Convenience shortcut for the system information module's `get_info`.
    SystemInfo,
    /// Execute a declared module action.
    ExecuteCommand,
    /// Response indicating the request was handled successfully.
    Success,
    /// Response indicating the request failed.
    Error,
}

impl MessageType {
    /// Returns the canonical wire string for this type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ping => "ping",
            Self::ListModules => "list_modules",
            Self::ModuleInfo => "module_info",
            Self::SystemInfo => "system_info",
            Self::ExecuteCommand => "execute_command",
            Self::Success => "success",
            Self::Error => "error",
        }
    }

    /// Returns `true` for the response half of the protocol.
    #[must_use]
    pub const fn is_response(self) -> bool {
        matches!(self, Self::Success | Self::Error)
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One framed request or response on the control channel.
///
/// # Example
///
/// ```
/// use rootd_protocol::{Message, MessageType};
///
/// let message = Message::new(MessageType::Ping, "r1", Default::default());
/// assert_eq!(message.kind(), MessageType::Ping);
/// assert_eq!(message.request_id(), "r1");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "type")]
    kind: MessageType,
    request_id: String,
    data: Data,
}

impl Message {
    /// Creates a message from its constituent parts.
    #[must_use]
    pub fn new(kind: MessageType, request_id: impl Into<String>, data: Data) -> Self {
        Self {
            kind,
            request_id: request_id.into(),
            data,
        }
    }

    /// Creates a `success` response echoing the given request id.
    #[must_use]
    pub fn success(request_id: impl Into<String>, data: Data) -> Self {
        Self::new(MessageType::Success, request_id, data)
    }

    /// Creates an `error` response carrying a description of the failure.
    #[must_use]
    pub fn error(request_id: impl Into<String>, description: impl Into<String>) -> Self {
        let mut data = Data::new();
        data.insert(String::from("error"), Value::String(description.into()));
        Self::new(MessageType::Error, request_id, data)
    }

    /// Returns the message type.
    #[must_use]
    pub const fn kind(&self) -> MessageType {
        self.kind
    }

    /// Returns the caller-supplied request id.
    #[must_use]
    pub const fn request_id(&self) -> &str {
        self.request_id.as_str()
    }

    /// Returns the payload object.
    #[must_use]
    pub const fn data(&self) -> &Data {
        &self.data
    }

    /// Checks the envelope invariants.
    ///
    /// The payload is guaranteed to be an object by construction, so the only
    /// runtime check is that the request id is non-empty.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidEnvelope`] when the request id is
    /// empty or whitespace.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        if self.request_id.trim().is_empty() {
            return Err(ProtocolError::invalid_envelope(
                "request_id must not be empty",
                self.request_id.clone(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn serialises_type_with_wire_name() {
        let message = Message::new(MessageType::ListModules, "r1", Data::new());
        let encoded = serde_json::to_string(&message).expect("serialise");
        assert!(encoded.contains(r#""type":"list_modules""#));
        assert!(encoded.contains(r#""request_id":"r1""#));
    }

    #[test]
    fn error_response_carries_description() {
        let message = Message::error("r9", "module not found");
        assert_eq!(message.kind(), MessageType::Error);
        assert_eq!(
            message.data().get("error"),
            Some(&json!("module not found"))
        );
    }

    #[test]
    fn rejects_scalar_data() {
        let result =
            serde_json::from_str::<Message>(r#"{"type":"ping","request_id":"r1","data":42}"#);
        assert!(result.is_err());
    }

    #[test]
    fn rejects_array_data() {
        let result =
            serde_json::from_str::<Message>(r#"{"type":"ping","request_id":"r1","data":[]}"#);
        assert!(result.is_err());
    }

    #[test]
    fn rejects_unknown_type() {
        let result =
            serde_json::from_str::<Message>(r#"{"type":"bogus","request_id":"r1","data":{}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn validate_rejects_empty_request_id() {
        let message = Message::new(MessageType::Ping, "", Data::new());
        let error = message.validate().expect_err("empty id should fail");
        assert!(matches!(error, ProtocolError::InvalidEnvelope { .. }));
    }

    #[test]
    fn response_types_are_classified() {
        assert!(MessageType::Success.is_response());
        assert!(MessageType::Error.is_response());
        assert!(!MessageType::ExecuteCommand.is_response());
    }
}
