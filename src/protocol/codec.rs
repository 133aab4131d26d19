//! Protocol codec
//!
//! Encoding and decoding functions for the wire protocol.
//!
//! Every frame is `tag (1) + payload_len (4, big-endian) + payload`; the
//! tag is a command type for requests and a status for responses.

use std::io::{Read, Write};

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{Result, TlogError};
use super::{Command, CommandType, Response, Status};

/// Header size: 1 byte command/status + 4 bytes length
pub const HEADER_SIZE: usize = 5;

/// Maximum payload size (16 MB)
pub const MAX_PAYLOAD_SIZE: u32 = 16 * 1024 * 1024;

// =============================================================================
// Framing
// =============================================================================

fn encode_frame(tag: u8, payload: &[u8]) -> Bytes {
    let mut frame = BytesMut::with_capacity(HEADER_SIZE + payload.len());
    frame.put_u8(tag);
    frame.put_u32(payload.len() as u32);
    frame.put_slice(payload);
    frame.freeze()
}

fn check_payload_len(len: u32) -> Result<usize> {
    if len > MAX_PAYLOAD_SIZE {
        return Err(TlogError::Protocol(format!(
            "Payload too large: {} bytes (max {})",
            len, MAX_PAYLOAD_SIZE
        )));
    }
    Ok(len as usize)
}

/// Split a complete frame into its tag and payload
fn decode_frame(mut bytes: &[u8]) -> Result<(u8, &[u8])> {
    if bytes.remaining() < HEADER_SIZE {
        return Err(TlogError::Protocol(format!(
            "Incomplete header: expected {} bytes, got {}",
            HEADER_SIZE,
            bytes.remaining()
        )));
    }

    let tag = bytes.get_u8();
    let payload_len = check_payload_len(bytes.get_u32())?;

    if bytes.remaining() < payload_len {
        return Err(TlogError::Protocol(format!(
            "Incomplete payload: expected {} bytes, got {}",
            payload_len,
            bytes.remaining()
        )));
    }

    Ok((tag, &bytes[..payload_len]))
}

/// Read one frame (header + payload) from a stream
fn read_frame<R: Read>(reader: &mut R) -> Result<Bytes> {
    let mut header = [0u8; HEADER_SIZE];
    reader.read_exact(&mut header)?;

    let mut len_bytes = &header[1..];
    let payload_len = check_payload_len(len_bytes.get_u32())?;

    let mut frame = BytesMut::zeroed(HEADER_SIZE + payload_len);
    frame[..HEADER_SIZE].copy_from_slice(&header);
    reader.read_exact(&mut frame[HEADER_SIZE..])?;

    Ok(frame.freeze())
}

fn write_frame<W: Write>(writer: &mut W, frame: &[u8]) -> Result<()> {
    writer.write_all(frame)?;
    writer.flush()?;
    Ok(())
}

// =============================================================================
// Command Encoding/Decoding
// =============================================================================

fn put_key(payload: &mut BytesMut, key: &str) {
    payload.put_u32(key.len() as u32);
    payload.put_slice(key.as_bytes());
}

fn take_text(bytes: &[u8], what: &str) -> Result<String> {
    String::from_utf8(bytes.to_vec())
        .map_err(|_| TlogError::Protocol(format!("{} is not valid UTF-8", what)))
}

/// Take `key_len (4) + key` off the front of a payload
fn take_key(payload: &mut &[u8], command: &str) -> Result<String> {
    if payload.remaining() < 4 {
        return Err(TlogError::Protocol(format!("{} command: missing key length", command)));
    }

    let key_len = payload.get_u32() as usize;
    if payload.remaining() < key_len {
        return Err(TlogError::Protocol(format!(
            "{} command: incomplete key (expected {}, got {})",
            command,
            key_len,
            payload.remaining()
        )));
    }

    let key = take_text(&(*payload)[..key_len], "key")?;
    payload.advance(key_len);
    Ok(key)
}

/// Encode a command to bytes
pub fn encode_command(command: &Command) -> Bytes {
    let mut payload = BytesMut::new();
    match command {
        Command::Get { key } | Command::Delete { key } => put_key(&mut payload, key),
        Command::Put { key, value } => {
            put_key(&mut payload, key);
            payload.put_slice(value.as_bytes());
        }
        Command::Ping => {}
    }
    encode_frame(command.command_type() as u8, &payload)
}

/// Decode a command from a complete frame
pub fn decode_command(bytes: &[u8]) -> Result<Command> {
    let (tag, mut payload) = decode_frame(bytes)?;

    let command_type = CommandType::from_byte(tag)
        .ok_or_else(|| TlogError::Protocol(format!("Unknown command type: 0x{:02x}", tag)))?;

    let key = if command_type.has_key() {
        take_key(&mut payload, command_type.name())?
    } else {
        String::new()
    };

    match command_type {
        CommandType::Get => Ok(Command::Get { key }),
        CommandType::Put => Ok(Command::Put {
            key,
            value: take_text(payload, "value")?,
        }),
        CommandType::Delete => Ok(Command::Delete { key }),
        CommandType::Ping if payload.is_empty() => Ok(Command::Ping),
        CommandType::Ping => Err(TlogError::Protocol(format!(
            "PING command: unexpected payload of {} bytes",
            payload.len()
        ))),
    }
}

// =============================================================================
// Response Encoding/Decoding
// =============================================================================

/// Encode a response to bytes
pub fn encode_response(response: &Response) -> Bytes {
    let payload = response.payload.as_deref().unwrap_or(&[]);
    encode_frame(response.status as u8, payload)
}

/// Decode a response from a complete frame
pub fn decode_response(bytes: &[u8]) -> Result<Response> {
    let (tag, payload) = decode_frame(bytes)?;

    let status = Status::from_byte(tag)
        .ok_or_else(|| TlogError::Protocol(format!("Unknown response status: 0x{:02x}", tag)))?;

    let payload = (!payload.is_empty()).then(|| payload.to_vec());
    Ok(Response { status, payload })
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Read a complete command from a stream
///
/// Blocks until a complete command is received or an error occurs
pub fn read_command<R: Read>(reader: &mut R) -> Result<Command> {
    decode_command(&read_frame(reader)?)
}

/// Write a command to a stream
pub fn write_command<W: Write>(writer: &mut W, command: &Command) -> Result<()> {
    write_frame(writer, &encode_command(command))
}

/// Read a complete response from a stream
pub fn read_response<R: Read>(reader: &mut R) -> Result<Response> {
    decode_response(&read_frame(reader)?)
}

/// Write a response to a stream
pub fn write_response<W: Write>(writer: &mut W, response: &Response) -> Result<()> {
    write_frame(writer, &encode_response(response))
}
