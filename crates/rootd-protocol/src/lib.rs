//! Wire protocol for the rootd control channel.
//!
//! The `rootd-protocol` crate defines the message envelope and typed payloads
//! exchanged between the unprivileged client bridge and the privileged daemon
//! over a local stream socket. The encoding is transport-agnostic: each
//! exchange is a single self-describing JSON document terminated by one
//! newline byte, written by one side and read in full by the other before
//! decoding.
//!
//! The protocol carries no authentication or encryption of its own. Access to
//! the channel is controlled entirely by the socket's filesystem permissions;
//! every peer that can open the channel is treated as authorised.
//!
//! # Message flow
//!
//! A client serialises a [`Message`] request, the daemon deframes and decodes
//! it, processes it, and answers with exactly one response [`Message`] whose
//! `request_id` echoes the request verbatim. Malformed frames are answered
//! with an error message built from whatever request id could be salvaged
//! from the raw bytes.

pub mod capability;
pub mod codec;
pub mod command;
pub mod envelope;
pub mod error;

pub use self::capability::{CapabilityParameter, ModuleCapability, ModuleInfo, ParameterKind};
pub use self::codec::{MAX_FRAME_BYTES, UNKNOWN_REQUEST_ID, decode, encode, read_frame, salvage_request_id, write_message};
pub use self::command::{CommandRequest, CommandResponse, Parameters};
pub use self::envelope::{Data, Message, MessageType};
pub use self::error::ProtocolError;
