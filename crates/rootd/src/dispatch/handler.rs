//! Connection handler framing requests and responses.

use tracing::{debug, warn};

use rootd_protocol::{Message, ProtocolError, codec};

use crate::transport::{ConnectionHandler, ConnectionStream};

use super::{DISPATCH_TARGET, MessageProcessor};

/// Handles one connection: read a frame, process it, write the response.
pub(crate) struct RequestConnectionHandler {
    processor: MessageProcessor,
}

impl RequestConnectionHandler {
    /// Creates a handler around a message processor.
    pub(crate) const fn new(processor: MessageProcessor) -> Self {
        Self { processor }
    }

    fn serve(&self, stream: &mut ConnectionStream) {
        let frame = match codec::read_frame(stream) {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                debug!(target: DISPATCH_TARGET, "client disconnected without a request");
                return;
            }
            Err(error) => {
                warn!(target: DISPATCH_TARGET, error = %error, "failed to read request frame");
                write_protocol_error(stream, &error);
                return;
            }
        };

        let message = match codec::decode(&frame) {
            Ok(message) => message,
            Err(error) => {
                warn!(target: DISPATCH_TARGET, error = %error, "malformed request frame");
                write_protocol_error(stream, &error);
                return;
            }
        };

        let response = self.processor.process(&message);
        if let Err(error) = codec::write_message(stream, &response) {
            warn!(target: DISPATCH_TARGET, error = %error, "failed to write response");
        }
    }
}

impl ConnectionHandler for RequestConnectionHandler {
    fn handle(&self, mut stream: ConnectionStream) {
        self.serve(&mut stream);
    }
}

/// Answers a protocol failure with a best-effort error message.
fn write_protocol_error(stream: &mut ConnectionStream, error: &ProtocolError) {
    let response = Message::error(error.request_id(), error.to_string());
    if let Err(write_error) = codec::write_message(stream, &response) {
        warn!(
            target: DISPATCH_TARGET,
            error = %write_error,
            "failed to write protocol error response"
        );
    }
}
