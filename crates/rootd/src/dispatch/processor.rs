//! Message processing: the branch on message type.
//!
//! Every decoded request produces exactly one response message. Query types
//! are served from the registry; `execute_command` runs through the command
//! dispatcher's capability checkpoint; the `system_info` type is a
//! compatibility shortcut that behaves exactly like an `execute_command`
//! addressed at the system information module.

use std::sync::Arc;

use serde_json::Value;
use tracing::warn;

use rootd_modules::{CommandDispatcher, ModuleRegistry};
use rootd_protocol::{CommandRequest, Data, Message, MessageType, Parameters};

use super::DISPATCH_TARGET;

/// Module name the `system_info` shortcut is hard-wired to.
const SYSTEM_INFO_MODULE: &str = "systeminfo";
/// Action the `system_info` shortcut executes.
const SYSTEM_INFO_ACTION: &str = "get_info";

/// Serves decoded messages from the shared registry.
pub(crate) struct MessageProcessor {
    registry: Arc<ModuleRegistry>,
    dispatcher: CommandDispatcher,
}

impl MessageProcessor {
    /// Creates a processor over a shared registry.
    pub(crate) fn new(registry: Arc<ModuleRegistry>) -> Self {
        Self {
            dispatcher: CommandDispatcher::new(Arc::clone(&registry)),
            registry,
        }
    }

    /// Processes one request, always returning exactly one response.
    pub(crate) fn process(&self, message: &Message) -> Message {
        let request_id = message.request_id().to_owned();

        if let Err(error) = message.validate() {
            return Message::error(request_id, error.to_string());
        }

        match message.kind() {
            MessageType::Ping => {
                let mut data = Data::new();
                data.insert(String::from("pong"), Value::Bool(true));
                Message::success(request_id, data)
            }
            MessageType::ListModules => {
                let mut data = Data::new();
                data.insert(
                    String::from("modules"),
                    Value::from(self.registry.module_names()),
                );
                Message::success(request_id, data)
            }
            MessageType::ModuleInfo => self.module_info(request_id, message.data()),
            MessageType::SystemInfo => self.system_info(request_id),
            MessageType::ExecuteCommand => self.execute_command(request_id, message.data()),
            MessageType::Success | MessageType::Error => Message::error(
                request_id,
                format!("unsupported message type: {}", message.kind()),
            ),
        }
    }

    fn module_info(&self, request_id: String, data: &Data) -> Message {
        let Some(name) = data.get("module").and_then(Value::as_str) else {
            return Message::error(request_id, "module name is required");
        };
        let Some(module) = self.registry.get(name) else {
            return Message::error(request_id, format!("module not found: {name}"));
        };

        match serde_json::to_value(module.info()) {
            Ok(info) => {
                let mut payload = Data::new();
                payload.insert(String::from("module_info"), info);
                Message::success(request_id, payload)
            }
            Err(error) => {
                warn!(
                    target: DISPATCH_TARGET,
                    module = name,
                    error = %error,
                    "failed to serialise module info"
                );
                Message::error(request_id, format!("failed to describe module: {error}"))
            }
        }
    }

    fn system_info(&self, request_id: String) -> Message {
        if self.registry.get(SYSTEM_INFO_MODULE).is_none() {
            return Message::error(request_id, "system information module not available");
        }
        let request =
            CommandRequest::new(SYSTEM_INFO_MODULE, SYSTEM_INFO_ACTION, Parameters::new());
        self.dispatch_command(request_id, &request)
    }

    fn execute_command(&self, request_id: String, data: &Data) -> Message {
        let request = match CommandRequest::from_data(data) {
            Ok(request) => request,
            Err(error) => return Message::error(request_id, error.to_string()),
        };
        if let Err(error) = request.validate() {
            return Message::error(request_id, error.to_string());
        }
        self.dispatch_command(request_id, &request)
    }

    fn dispatch_command(&self, request_id: String, request: &CommandRequest) -> Message {
        let response = self.dispatcher.dispatch(request);
        let kind = if response.is_success() {
            MessageType::Success
        } else {
            MessageType::Error
        };
        Message::new(kind, request_id, response.into_data())
    }
}
