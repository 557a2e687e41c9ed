//! Per-connection request processing.
//!
//! Each accepted connection carries exactly one framed request. The handler
//! deframes and decodes it, the processor branches on the message type, and
//! exactly one response frame is written back before the connection closes.
//! Malformed input is answered with an error message built from whatever
//! request id could be salvaged; no class of input crashes the daemon or
//! leaves a connection without a reply.

mod handler;
mod processor;

pub(crate) use self::handler::RequestConnectionHandler;
pub(crate) use self::processor::MessageProcessor;

const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");
