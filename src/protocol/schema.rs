//! Packet schema
//!
//! Field widths, limits and the [`Action`] enumeration shared by both
//! directions of the channel.
//!
//! The `DEFAULT_*` constants describe the stock link profile (250-byte MTU,
//! ten 20-byte arguments). Deployments with a different link build their own
//! [`PacketLimits`] at startup; the codecs never read the constants directly.

use std::fmt;

use crate::error::{CncError, CodecError, CodecResult, Result};

// =============================================================================
// Default Profile
// =============================================================================

/// Default width for name and argument strings
pub const DEFAULT_STR_LEN: usize = 20;

/// Default transport MTU (bytes)
pub const DEFAULT_MTU: usize = 250;

/// Default maximum number of positional arguments
pub const DEFAULT_MAX_NUM_ARGS: usize = 10;

/// Default longest argument the execution engine accepts
pub const DEFAULT_MAX_ARG_LEN: usize = DEFAULT_STR_LEN;

/// Default command name field width
pub const DEFAULT_CMD_NAME_LEN: usize = DEFAULT_STR_LEN;

/// Default argument field width
pub const DEFAULT_ARG_LEN: usize = DEFAULT_STR_LEN;

/// Default bytes reserved in a response for everything except output
pub const DEFAULT_RESPONSE_OVERHEAD: usize = RESPONSE_HEADER_LEN;

/// Default output capacity of a response
pub const DEFAULT_STDOUT_LEN: usize = DEFAULT_MTU - DEFAULT_RESPONSE_OVERHEAD;

// =============================================================================
// Fixed Wire Widths
// =============================================================================

/// Command header: action (1) + name length (1) + argument count (1)
pub const COMMAND_HEADER_LEN: usize = 3;

/// Response header: return code (1) + execution time (8)
pub const RESPONSE_HEADER_LEN: usize = 9;

/// Largest value a single-byte length or count prefix can carry
pub const MAX_FIELD_LEN: usize = u8::MAX as usize;

const _: () = assert!(
    DEFAULT_RESPONSE_OVERHEAD < DEFAULT_MTU,
    "response overhead must leave room for output"
);
const _: () = assert!(DEFAULT_RESPONSE_OVERHEAD >= RESPONSE_HEADER_LEN);
const _: () = assert!(DEFAULT_CMD_NAME_LEN <= MAX_FIELD_LEN);
const _: () = assert!(DEFAULT_ARG_LEN <= MAX_FIELD_LEN);
const _: () = assert!(DEFAULT_MAX_NUM_ARGS <= MAX_FIELD_LEN);
const _: () = assert!(DEFAULT_ARG_LEN <= DEFAULT_MAX_ARG_LEN);

// =============================================================================
// Action
// =============================================================================

/// Operations a node supports
///
/// The discriminant is the wire tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Action {
    /// Run `command_name` with the packet arguments
    Execute = 0,
    /// Report node status
    Status = 1,
    /// Report software version
    Version = 2,
    /// Describe the available actions
    Help = 3,
}

impl Action {
    /// Every action, in wire tag order
    pub const ALL: [Action; 4] = [Action::Execute, Action::Status, Action::Version, Action::Help];

    /// Wire tag for this action
    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Map a wire tag back to an action
    pub fn from_tag(tag: u8) -> CodecResult<Self> {
        match tag {
            0 => Ok(Action::Execute),
            1 => Ok(Action::Status),
            2 => Ok(Action::Version),
            3 => Ok(Action::Help),
            other => Err(CodecError::UnknownAction(other)),
        }
    }

    /// Lowercase name used in help text and on the command line
    pub fn name(self) -> &'static str {
        match self {
            Action::Execute => "execute",
            Action::Status => "status",
            Action::Version => "version",
            Action::Help => "help",
        }
    }

    /// Look up an action by name, ignoring ASCII case
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|action| action.name().eq_ignore_ascii_case(name))
    }
}

impl TryFrom<u8> for Action {
    type Error = CodecError;

    fn try_from(tag: u8) -> CodecResult<Self> {
        Action::from_tag(tag)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Packet Limits
// =============================================================================

/// Validated size profile for one link
///
/// Built once at startup and copied into every codec. A `PacketLimits` value
/// always satisfies:
/// - `response_overhead >= RESPONSE_HEADER_LEN`
/// - `mtu > response_overhead` (so `stdout_len() > 0`)
/// - every width and count fits its single-byte prefix
/// - `arg_len <= max_arg_len`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketLimits {
    mtu: usize,
    max_num_args: usize,
    max_arg_len: usize,
    cmd_name_len: usize,
    arg_len: usize,
    response_overhead: usize,
}

impl PacketLimits {
    /// The stock 250-byte profile
    pub const DEFAULT: PacketLimits = PacketLimits {
        mtu: DEFAULT_MTU,
        max_num_args: DEFAULT_MAX_NUM_ARGS,
        max_arg_len: DEFAULT_MAX_ARG_LEN,
        cmd_name_len: DEFAULT_CMD_NAME_LEN,
        arg_len: DEFAULT_ARG_LEN,
        response_overhead: DEFAULT_RESPONSE_OVERHEAD,
    };

    /// Start a builder from the default profile
    pub fn builder() -> PacketLimitsBuilder {
        PacketLimitsBuilder::default()
    }

    /// Largest buffer the transport carries
    pub fn mtu(&self) -> usize {
        self.mtu
    }

    /// Maximum number of arguments in a command
    pub fn max_num_args(&self) -> usize {
        self.max_num_args
    }

    /// Longest argument the execution engine accepts
    pub fn max_arg_len(&self) -> usize {
        self.max_arg_len
    }

    /// Command name field width
    pub fn cmd_name_len(&self) -> usize {
        self.cmd_name_len
    }

    /// Argument field width
    pub fn arg_len(&self) -> usize {
        self.arg_len
    }

    /// Bytes of a response not available to output
    pub fn response_overhead(&self) -> usize {
        self.response_overhead
    }

    /// Output capacity of a response (`RES_PACKET_STDOUT_LEN`)
    pub fn stdout_len(&self) -> usize {
        self.mtu - self.response_overhead
    }

    /// Encoded size of a command with every field filled to its limit
    pub fn max_command_len(&self) -> usize {
        COMMAND_HEADER_LEN + self.cmd_name_len + self.max_num_args * (1 + self.arg_len)
    }

    /// Largest encoded response
    pub fn max_response_len(&self) -> usize {
        RESPONSE_HEADER_LEN + self.stdout_len()
    }
}

impl Default for PacketLimits {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Builder for PacketLimits
#[derive(Debug, Clone)]
pub struct PacketLimitsBuilder {
    limits: PacketLimits,
}

impl Default for PacketLimitsBuilder {
    fn default() -> Self {
        Self {
            limits: PacketLimits::DEFAULT,
        }
    }
}

impl PacketLimitsBuilder {
    /// Set the transport MTU
    pub fn mtu(mut self, mtu: usize) -> Self {
        self.limits.mtu = mtu;
        self
    }

    /// Set the maximum argument count
    pub fn max_num_args(mut self, count: usize) -> Self {
        self.limits.max_num_args = count;
        self
    }

    /// Set the longest argument the engine accepts
    pub fn max_arg_len(mut self, len: usize) -> Self {
        self.limits.max_arg_len = len;
        self
    }

    /// Set the command name field width
    pub fn cmd_name_len(mut self, len: usize) -> Self {
        self.limits.cmd_name_len = len;
        self
    }

    /// Set the argument field width
    pub fn arg_len(mut self, len: usize) -> Self {
        self.limits.arg_len = len;
        self
    }

    /// Set the response overhead
    pub fn response_overhead(mut self, overhead: usize) -> Self {
        self.limits.response_overhead = overhead;
        self
    }

    /// Validate and produce the profile
    pub fn build(self) -> Result<PacketLimits> {
        let limits = self.limits;

        if limits.response_overhead < RESPONSE_HEADER_LEN {
            return Err(CncError::Config(format!(
                "response overhead {} is smaller than the {}-byte response header",
                limits.response_overhead, RESPONSE_HEADER_LEN
            )));
        }
        if limits.mtu <= limits.response_overhead {
            return Err(CncError::Config(format!(
                "response overhead {} leaves no room for output in mtu {}",
                limits.response_overhead, limits.mtu
            )));
        }
        if limits.mtu < COMMAND_HEADER_LEN {
            return Err(CncError::Config(format!(
                "mtu {} cannot hold the {}-byte command header",
                limits.mtu, COMMAND_HEADER_LEN
            )));
        }

        for (field, value) in [
            ("command name length", limits.cmd_name_len),
            ("argument length", limits.arg_len),
            ("argument count", limits.max_num_args),
        ] {
            if value > MAX_FIELD_LEN {
                return Err(CncError::Config(format!(
                    "{} {} does not fit a one-byte prefix (max {})",
                    field, value, MAX_FIELD_LEN
                )));
            }
        }

        if limits.arg_len > limits.max_arg_len {
            return Err(CncError::Config(format!(
                "argument field width {} exceeds engine argument limit {}",
                limits.arg_len, limits.max_arg_len
            )));
        }

        if limits.max_command_len() > limits.mtu {
            tracing::warn!(
                "Fully populated command needs {} bytes but mtu is {}; such commands will be rejected as oversize",
                limits.max_command_len(),
                limits.mtu
            );
        }

        Ok(limits)
    }
}
