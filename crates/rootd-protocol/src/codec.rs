//! Newline-delimited frame codec for the control channel.
//!
//! Each record on the wire is one JSON document followed by a single `\n`
//! byte. The reader accumulates bytes until the separator is observed (or the
//! peer closes the stream with partial data), enforcing a size bound so a
//! misbehaving client cannot exhaust daemon memory. Decoding a malformed
//! record still attempts to recover the caller's `request_id` from the raw
//! bytes so the daemon can address its error response.

use std::io::{self, Read, Write};

use serde_json::Value;

use crate::envelope::Message;
use crate::error::ProtocolError;

/// Maximum size of a single frame in bytes.
pub const MAX_FRAME_BYTES: usize = 64 * 1024;

/// Sentinel request id used when none could be salvaged from a bad frame.
pub const UNKNOWN_REQUEST_ID: &str = "unknown";

/// Serialises a message into a newline-terminated frame.
///
/// # Errors
///
/// Returns [`ProtocolError::Serialize`] when the message cannot be encoded.
pub fn encode(message: &Message) -> Result<Vec<u8>, ProtocolError> {
    let mut frame = serde_json::to_vec(message).map_err(ProtocolError::Serialize)?;
    frame.push(b'\n');
    Ok(frame)
}

/// Writes a message as one frame and flushes the stream.
///
/// # Errors
///
/// Returns [`ProtocolError::Serialize`] when encoding fails or
/// [`ProtocolError::Io`] when the write fails.
pub fn write_message<W: Write>(writer: &mut W, message: &Message) -> Result<(), ProtocolError> {
    let frame = encode(message)?;
    writer.write_all(&frame)?;
    writer.flush()?;
    Ok(())
}

/// Decodes one frame into a message and checks the envelope invariants.
///
/// Trailing ASCII whitespace (including the frame separator) is trimmed
/// before parsing.
///
/// # Errors
///
/// Returns [`ProtocolError::MalformedFrame`] for empty or unparseable input
/// and [`ProtocolError::InvalidEnvelope`] when the decoded envelope violates
/// an invariant. Both carry the salvaged request id.
pub fn decode(frame: &[u8]) -> Result<Message, ProtocolError> {
    let trimmed = trim_trailing_whitespace(frame);
    if trimmed.is_empty() {
        return Err(ProtocolError::malformed("empty frame", UNKNOWN_REQUEST_ID));
    }

    let message: Message =
        serde_json::from_slice(trimmed).map_err(|source| ProtocolError::MalformedFrame {
            message: source.to_string(),
            request_id: salvage_request_id(trimmed),
            source: Some(source),
        })?;
    message.validate()?;
    Ok(message)
}

/// Recovers the request id from a frame that failed envelope decoding.
///
/// The frame is re-parsed as unstructured JSON; if that yields an object with
/// a string `request_id`, the value is returned, otherwise the
/// [`UNKNOWN_REQUEST_ID`] sentinel.
#[must_use]
pub fn salvage_request_id(frame: &[u8]) -> String {
    serde_json::from_slice::<Value>(frame)
        .ok()
        .as_ref()
        .and_then(|value| value.get("request_id"))
        .and_then(Value::as_str)
        .filter(|id| !id.trim().is_empty())
        .map_or_else(|| String::from(UNKNOWN_REQUEST_ID), String::from)
}

/// Reads one bounded frame from the stream.
///
/// Returns `Ok(None)` when the peer disconnects before sending any data and
/// `Ok(Some(bytes))` once a complete line (or EOF with partial data) has been
/// received.
///
/// # Errors
///
/// Returns [`ProtocolError::FrameTooLarge`] when the accumulated frame
/// exceeds [`MAX_FRAME_BYTES`] and [`ProtocolError::Io`] when reading fails.
pub fn read_frame<R: Read>(reader: &mut R) -> Result<Option<Vec<u8>>, ProtocolError> {
    let mut buffer = Vec::new();
    let mut chunk = [0_u8; 1024];

    loop {
        let bytes_read = read_with_retry(reader, &mut chunk)?;

        if bytes_read == 0 {
            return Ok(if buffer.is_empty() {
                None
            } else {
                Some(buffer)
            });
        }

        if let Some(newline_pos) = chunk[..bytes_read].iter().position(|b| *b == b'\n') {
            buffer.extend_from_slice(&chunk[..=newline_pos]);
            enforce_limit(buffer.len())?;
            return Ok(Some(buffer));
        }

        buffer.extend_from_slice(&chunk[..bytes_read]);
        enforce_limit(buffer.len())?;
    }
}

/// Reads from the stream, retrying on interrupts.
fn read_with_retry<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    loop {
        match reader.read(buf) {
            Ok(read) => return Ok(read),
            Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
            Err(error) => return Err(error),
        }
    }
}

/// Enforces the maximum frame size.
fn enforce_limit(size: usize) -> Result<(), ProtocolError> {
    if size > MAX_FRAME_BYTES {
        return Err(ProtocolError::FrameTooLarge {
            size,
            max: MAX_FRAME_BYTES,
        });
    }
    Ok(())
}

/// Trims trailing ASCII whitespace from a byte slice.
fn trim_trailing_whitespace(bytes: &[u8]) -> &[u8] {
    let end = bytes
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(0, |pos| pos + 1);
    &bytes[..end]
}
