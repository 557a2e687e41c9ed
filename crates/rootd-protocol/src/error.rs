//! Error types raised while encoding or decoding protocol frames.
//!
//! Every decoding failure carries the request id that could be salvaged from
//! the raw frame so the daemon can still answer the caller. When no id can be
//! recovered the sentinel [`UNKNOWN_REQUEST_ID`](crate::codec::UNKNOWN_REQUEST_ID)
//! is used instead.

use std::io;

use thiserror::Error;

use crate::codec::UNKNOWN_REQUEST_ID;

/// Errors surfaced while framing, encoding, or decoding messages.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Frame bytes could not be parsed as a message envelope.
    #[error("malformed frame: {message}")]
    MalformedFrame {
        /// Human-readable description of the parse failure.
        message: String,
        /// Request id salvaged from the raw frame, if any.
        request_id: String,
        /// Underlying JSON error, when one exists.
        #[source]
        source: Option<serde_json::Error>,
    },

    /// The envelope decoded but violates a structural invariant.
    #[error("invalid envelope: {message}")]
    InvalidEnvelope {
        /// Description of the violated invariant.
        message: String,
        /// Request id carried by the offending envelope.
        request_id: String,
    },

    /// A command request payload is structurally invalid.
    #[error("invalid command request: {message}")]
    InvalidCommand {
        /// Description of the validation failure.
        message: String,
    },

    /// Frame exceeds the maximum permitted size.
    #[error("frame of {size} bytes exceeds the {max} byte limit")]
    FrameTooLarge {
        /// Observed frame size in bytes.
        size: usize,
        /// Configured frame size limit.
        max: usize,
    },

    /// A message failed to serialise.
    #[error("failed to serialise message: {0}")]
    Serialize(#[source] serde_json::Error),

    /// An I/O error occurred on the channel.
    #[error("channel I/O error: {0}")]
    Io(#[from] io::Error),
}

impl ProtocolError {
    /// Creates a malformed-frame error with a custom description.
    pub fn malformed(message: impl Into<String>, request_id: impl Into<String>) -> Self {
        Self::MalformedFrame {
            message: message.into(),
            request_id: request_id.into(),
            source: None,
        }
    }

    /// Creates an invalid-envelope error.
    pub fn invalid_envelope(message: impl Into<String>, request_id: impl Into<String>) -> Self {
        Self::InvalidEnvelope {
            message: message.into(),
            request_id: request_id.into(),
        }
    }

    /// Creates an invalid-command error.
    pub fn invalid_command(message: impl Into<String>) -> Self {
        Self::InvalidCommand {
            message: message.into(),
        }
    }

    /// Returns the request id the error response should echo.
    ///
    /// Falls back to the `"unknown"` sentinel for failures where no id could
    /// be recovered from the offending frame.
    #[must_use]
    pub fn request_id(&self) -> &str {
        match self {
            Self::MalformedFrame { request_id, .. } | Self::InvalidEnvelope { request_id, .. } => {
                request_id.as_str()
            }
            Self::InvalidCommand { .. }
            | Self::FrameTooLarge { .. }
            | Self::Serialize(_)
            | Self::Io(_) => UNKNOWN_REQUEST_ID,
        }
    }
}
