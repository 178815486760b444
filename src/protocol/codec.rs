//! Protocol codec
//!
//! Encoding and decoding of command and response packets.
//!
//! ## Wire Format
//!
//! ### Command Format
//! ```text
//! ┌───────────┬─────────────┬──────────┬──────────┬───────────────────────────┐
//! │ Action(1) │ NameLen (1) │ Name (n) │ Argc (1) │ argc × [ArgLen (1) + Arg] │
//! └───────────┴─────────────┴──────────┴──────────┴───────────────────────────┘
//! ```
//! Strings are UTF-8 without a terminator. Every length is checked against
//! the [`PacketLimits`] of the codec before any bytes are copied.
//!
//! ### Response Format
//! ```text
//! ┌──────────┬──────────────────────────┬──────────────────────────┐
//! │ Code (1) │ Exec Time (8, f64 LE)    │ Output (remaining bytes) │
//! └──────────┴──────────────────────────┴──────────────────────────┘
//! ```
//! Output longer than [`PacketLimits::stdout_len`] is truncated on encode.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{CodecError, CodecResult};
use super::response::sanitize_seconds;
use super::{
    Action, CommandPacket, PacketLimits, ResponsePacket, COMMAND_HEADER_LEN, RESPONSE_HEADER_LEN,
};

// =============================================================================
// Command Codec
// =============================================================================

/// Encodes and decodes command packets for one link profile
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommandCodec {
    limits: PacketLimits,
}

impl CommandCodec {
    /// Create a codec bound to `limits`
    pub fn new(limits: PacketLimits) -> Self {
        Self { limits }
    }

    /// The profile this codec enforces
    pub fn limits(&self) -> &PacketLimits {
        &self.limits
    }

    /// Encode a command
    ///
    /// Fails with `Validation` if a field exceeds its bound and with
    /// `Oversize` if the packet would not fit the MTU. Never truncates.
    pub fn encode(&self, command: &CommandPacket) -> CodecResult<Bytes> {
        command.validate(&self.limits)?;

        let size = command.encoded_len();
        if size > self.limits.mtu() {
            return Err(CodecError::Oversize {
                size,
                max: self.limits.mtu(),
            });
        }

        let mut buf = BytesMut::with_capacity(size);
        buf.put_u8(command.action.tag());
        put_str(&mut buf, &command.command_name);
        buf.put_u8(command.arguments.len() as u8);
        for arg in &command.arguments {
            put_str(&mut buf, arg);
        }

        Ok(buf.freeze())
    }

    /// Decode a command
    ///
    /// Never reads past the end of `bytes`; the argument count is checked
    /// against the profile before any argument is read.
    pub fn decode(&self, bytes: &[u8]) -> CodecResult<CommandPacket> {
        if bytes.len() < COMMAND_HEADER_LEN {
            return Err(CodecError::Malformed(format!(
                "Incomplete header: expected {} bytes, got {}",
                COMMAND_HEADER_LEN,
                bytes.len()
            )));
        }
        if bytes.len() > self.limits.mtu() {
            return Err(CodecError::Oversize {
                size: bytes.len(),
                max: self.limits.mtu(),
            });
        }

        let mut buf = bytes;

        let action = Action::from_tag(take_u8(&mut buf, "action")?)?;

        let name_len = take_u8(&mut buf, "command name length")? as usize;
        if name_len > self.limits.cmd_name_len() {
            return Err(CodecError::Validation(format!(
                "command name is {} bytes (max {})",
                name_len,
                self.limits.cmd_name_len()
            )));
        }
        let command_name = take_str(&mut buf, name_len, "command name")?;

        let argc = take_u8(&mut buf, "argument count")? as usize;
        if argc > self.limits.max_num_args() {
            return Err(CodecError::Validation(format!(
                "{} arguments (max {})",
                argc,
                self.limits.max_num_args()
            )));
        }

        let mut arguments = Vec::with_capacity(argc);
        for index in 0..argc {
            let arg_len = take_u8(&mut buf, "argument length")? as usize;
            if arg_len > self.limits.arg_len() {
                return Err(CodecError::Validation(format!(
                    "argument {} is {} bytes (max {})",
                    index,
                    arg_len,
                    self.limits.arg_len()
                )));
            }
            arguments.push(take_str(&mut buf, arg_len, "argument")?);
        }

        if buf.has_remaining() {
            return Err(CodecError::Malformed(format!(
                "{} trailing bytes after last argument",
                buf.remaining()
            )));
        }

        Ok(CommandPacket {
            action,
            command_name,
            arguments,
        })
    }
}

// =============================================================================
// Response Codec
// =============================================================================

/// Encodes and decodes response packets for one link profile
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResponseCodec {
    limits: PacketLimits,
}

impl ResponseCodec {
    /// Create a codec bound to `limits`
    pub fn new(limits: PacketLimits) -> Self {
        Self { limits }
    }

    /// The profile this codec enforces
    pub fn limits(&self) -> &PacketLimits {
        &self.limits
    }

    /// Encode a response
    ///
    /// Total: output beyond the link budget is truncated at the last UTF-8
    /// character boundary that fits, and a negative or non-finite execution
    /// time is written as zero.
    pub fn encode(&self, response: &ResponsePacket) -> Bytes {
        let output = truncate_output(&response.output, self.limits.stdout_len());
        if output.len() < response.output.len() {
            tracing::debug!(
                "Truncated response output from {} to {} bytes",
                response.output.len(),
                output.len()
            );
        }

        let mut buf = BytesMut::with_capacity(RESPONSE_HEADER_LEN + output.len());
        buf.put_u8(response.return_code);
        buf.put_f64_le(sanitize_seconds(response.execution_time));
        buf.put_slice(output.as_bytes());

        buf.freeze()
    }

    /// Decode a response
    pub fn decode(&self, bytes: &[u8]) -> CodecResult<ResponsePacket> {
        if bytes.len() < RESPONSE_HEADER_LEN {
            return Err(CodecError::Malformed(format!(
                "Incomplete response header: expected {} bytes, got {}",
                RESPONSE_HEADER_LEN,
                bytes.len()
            )));
        }
        if bytes.len() > self.limits.mtu() {
            return Err(CodecError::Oversize {
                size: bytes.len(),
                max: self.limits.mtu(),
            });
        }
        if bytes.len() > self.limits.max_response_len() {
            return Err(CodecError::Validation(format!(
                "output of {} bytes exceeds stdout budget of {}",
                bytes.len() - RESPONSE_HEADER_LEN,
                self.limits.stdout_len()
            )));
        }

        let mut buf = bytes;
        let return_code = buf.get_u8();
        let execution_time = buf.get_f64_le();

        if !execution_time.is_finite() || execution_time < 0.0 {
            return Err(CodecError::Validation(format!(
                "execution time {} is not a non-negative duration",
                execution_time
            )));
        }

        // A peer may have cut the output mid-character; keep what is readable.
        // Replacement characters are wider than the bytes they stand for.
        let lossy = String::from_utf8_lossy(buf);
        let output = truncate_output(&lossy, self.limits.stdout_len()).to_owned();

        Ok(ResponsePacket {
            return_code,
            execution_time,
            output,
        })
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Longest prefix of `output` that fits `max` bytes and ends on a char boundary
pub fn truncate_output(output: &str, max: usize) -> &str {
    if output.len() <= max {
        return output;
    }

    let mut end = max;
    while !output.is_char_boundary(end) {
        end -= 1;
    }
    &output[..end]
}

/// Write a length-prefixed string; the caller has validated the length
fn put_str(buf: &mut BytesMut, value: &str) {
    buf.put_u8(value.len() as u8);
    buf.put_slice(value.as_bytes());
}

fn take_u8(buf: &mut &[u8], field: &str) -> CodecResult<u8> {
    if !buf.has_remaining() {
        return Err(CodecError::Malformed(format!("Missing {}", field)));
    }
    Ok(buf.get_u8())
}

fn take_str(buf: &mut &[u8], len: usize, field: &str) -> CodecResult<String> {
    if buf.remaining() < len {
        return Err(CodecError::Malformed(format!(
            "Incomplete {}: expected {} bytes, got {}",
            field,
            len,
            buf.remaining()
        )));
    }

    let value = std::str::from_utf8(&buf[..len])
        .map_err(|e| CodecError::Malformed(format!("{} is not valid UTF-8: {}", field, e)))?
        .to_owned();
    buf.advance(len);

    Ok(value)
}
